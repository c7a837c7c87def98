// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Command template grammar parser for the telsh command tree.
// Author: Lukas Bower

//! Command template grammar parser.
//!
//! A template is a whitespace-separated sequence of tokens, each of which
//! parses to exactly one node kind:
//!
//! | Surface form | Kind | Matches |
//! |---|---|---|
//! | `word` | literal | the exact string `word` |
//! | `WORD` (all uppercase) | string | any non-empty token |
//! | `<1-10>` | range | a decimal integer within the bounds |
//! | `(on\|off)` | enum | one of the alternatives, case-insensitively |
//! | `[...]` | optional wrapper | zero or one occurrence of the inner token |

use thiserror::Error;

/// Kind of a command-tree node, shared between the grammar parser and the
/// tree. `ModeSwitch` is never produced by template parsing; it is registered
/// synthetically when a child view is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Matches only the exact literal token.
    Literal,
    /// Matches any non-empty token; the text is captured for the handler.
    String,
    /// Matches a decimal integer within `[min, max]`.
    Range {
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// Matches one of the alternatives, case-insensitively.
    Enum {
        /// Allowed values in declaration order.
        values: Vec<String>,
    },
    /// Matches the name of a child view and triggers a view change.
    ModeSwitch,
}

impl NodeKind {
    /// Human-readable kind label used by the tree renderer.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Literal => "Command",
            Self::String => "String",
            Self::Range { .. } => "Range",
            Self::Enum { .. } => "Enum",
            Self::ModeSwitch => "ModeSwitch",
        }
    }

    /// Whether the kind captures its matched token as a handler argument.
    pub fn is_parameter(&self) -> bool {
        matches!(self, Self::String | Self::Range { .. } | Self::Enum { .. })
    }
}

/// One parsed token of a command template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSpec {
    /// Inner surface form: the literal text, `WORD`, `<1-10>`, or `(on|off)`.
    pub text: String,
    /// Node kind derived from the surface form.
    pub kind: NodeKind,
    /// True when the token was wrapped in `[...]`.
    pub optional: bool,
}

impl TokenSpec {
    /// Display key, unique among siblings: the surface form, bracketed when
    /// the token is optional.
    pub fn display(&self) -> String {
        if self.optional {
            format!("[{}]", self.text)
        } else {
            self.text.clone()
        }
    }
}

/// Errors surfaced while parsing a template at registration time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    /// The template contained no tokens.
    #[error("empty command template")]
    EmptyTemplate,
    /// `[]` or `[ ]` with nothing inside.
    #[error("empty optional token in `{0}`")]
    EmptyOptional(String),
    /// A `<...>` token whose bounds are not decimal integers.
    #[error("invalid range bounds in `{0}`")]
    InvalidRange(String),
    /// A `<MIN-MAX>` token with MIN greater than MAX.
    #[error("range minimum exceeds maximum in `{0}`")]
    InvertedRange(String),
    /// A `(...)` token with an empty alternative.
    #[error("empty enum alternative in `{0}`")]
    EmptyEnumValue(String),
    /// A second handler registered on the same terminal node.
    #[error("duplicate registration for `{0}`")]
    DuplicateRegistration(String),
    /// A view-switch name collided with an existing command token.
    #[error("view name `{0}` collides with a registered command")]
    ViewNameConflict(String),
}

/// Parse a whole template into an ordered token list.
pub fn parse_template(template: &str) -> Result<Vec<TokenSpec>, GrammarError> {
    let tokens: Vec<&str> = template.split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return Err(GrammarError::EmptyTemplate);
    }
    tokens.into_iter().map(|tok| parse_token(tok, false)).collect()
}

fn parse_token(token: &str, optional: bool) -> Result<TokenSpec, GrammarError> {
    if let Some(inner) = strip_wrapped(token, '[', ']') {
        let inner = inner.trim();
        if inner.is_empty() {
            return Err(GrammarError::EmptyOptional(token.to_owned()));
        }
        // `[[X]]` collapses to a single optional layer.
        return parse_token(inner, true);
    }

    if let Some(inner) = strip_wrapped(token, '<', '>') {
        return parse_range(token, inner, optional);
    }

    if let Some(inner) = strip_wrapped(token, '(', ')') {
        return parse_enum(token, inner, optional);
    }

    if is_all_uppercase(token) {
        return Ok(TokenSpec {
            text: token.to_owned(),
            kind: NodeKind::String,
            optional,
        });
    }

    Ok(TokenSpec {
        text: token.to_owned(),
        kind: NodeKind::Literal,
        optional,
    })
}

fn parse_range(token: &str, inner: &str, optional: bool) -> Result<TokenSpec, GrammarError> {
    let mut parts = inner.splitn(2, '-');
    let lo = parts.next().unwrap_or("");
    let hi = parts.next().unwrap_or("");
    let min: i64 = lo
        .trim()
        .parse()
        .map_err(|_| GrammarError::InvalidRange(token.to_owned()))?;
    let max: i64 = hi
        .trim()
        .parse()
        .map_err(|_| GrammarError::InvalidRange(token.to_owned()))?;
    if min > max {
        return Err(GrammarError::InvertedRange(token.to_owned()));
    }
    Ok(TokenSpec {
        text: format!("<{min}-{max}>"),
        kind: NodeKind::Range { min, max },
        optional,
    })
}

fn parse_enum(token: &str, inner: &str, optional: bool) -> Result<TokenSpec, GrammarError> {
    let mut values = Vec::new();
    for raw in inner.split('|') {
        let value = raw.trim();
        if value.is_empty() {
            return Err(GrammarError::EmptyEnumValue(token.to_owned()));
        }
        values.push(value.to_owned());
    }
    Ok(TokenSpec {
        text: format!("({})", values.join("|")),
        kind: NodeKind::Enum { values },
        optional,
    })
}

fn strip_wrapped(token: &str, open: char, close: char) -> Option<&str> {
    let rest = token.strip_prefix(open)?;
    rest.strip_suffix(close)
}

fn is_all_uppercase(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_uppercase())
}
