// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Typed prefix tree of command tokens with match and validation logic.
// Author: Lukas Bower

//! Per-view command tree.
//!
//! Nodes are kept in an index arena so parent back-references are plain
//! indices valid for the tree's lifetime. Children are keyed by display key
//! (the surface form for parameters, the literal text otherwise) in a
//! `BTreeMap` so traversal order is deterministic.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use thiserror::Error;

use crate::grammar::{parse_template, GrammarError, NodeKind, TokenSpec};
use crate::CommandHandler;

/// Index of a node inside its tree's arena.
pub type NodeId = usize;

/// One node of the command tree.
#[derive(Clone)]
pub struct Node {
    key: String,
    text: String,
    kind: NodeKind,
    optional: bool,
    description: String,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    handler: Option<CommandHandler>,
}

impl Node {
    fn from_spec(spec: &TokenSpec, parent: NodeId) -> Self {
        Self {
            key: spec.display(),
            text: spec.text.clone(),
            kind: spec.kind.clone(),
            optional: spec.optional,
            description: String::new(),
            parent: Some(parent),
            children: BTreeMap::new(),
            handler: None,
        }
    }

    /// Display key: surface form, bracketed when the node is optional.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Inner surface form (literal text for literal and view-switch nodes).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Node kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// True when the node was declared inside `[...]`.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Short description attached at registration.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// True when a handler is attached, i.e. the node is a terminal.
    pub fn is_terminal(&self) -> bool {
        self.handler.is_some()
    }

    /// Whether `token` is acceptable for this node during matching.
    ///
    /// Enum values also accept a case-insensitive prefix here so that a
    /// partial value still reaches validation, which enforces exact equality
    /// and can then report the allowed alternatives.
    pub(crate) fn accepts(&self, token: &str) -> bool {
        match &self.kind {
            NodeKind::Literal | NodeKind::ModeSwitch => self.text == token,
            NodeKind::String => !token.is_empty(),
            NodeKind::Range { .. } => token.parse::<i64>().is_ok(),
            NodeKind::Enum { values } => values.iter().any(|v| {
                v.eq_ignore_ascii_case(token)
                    || v.to_ascii_lowercase()
                        .starts_with(&token.to_ascii_lowercase())
            }),
        }
    }
}

/// Successful match result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    /// Terminal node reached by the match.
    pub terminal: NodeId,
    /// Input tokens consumed along the way.
    pub path: Vec<String>,
    /// Tokens that matched parameter nodes, in order, plus any surplus.
    pub captured: Vec<String>,
}

/// Errors surfaced while matching an input line against the tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    /// The input stopped short of any terminal node.
    #[error("incomplete command")]
    Incomplete,
    /// A token matched no child at its level.
    #[error("unknown command: {0}")]
    Unknown(String),
}

/// Errors surfaced while validating captured arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Fewer arguments than required parameters.
    #[error("too few arguments for '{path}': expected at least {required}, got {got}")]
    TooFew {
        /// Matched command path.
        path: String,
        /// Number of required parameters.
        required: usize,
        /// Number of arguments supplied.
        got: usize,
    },
    /// More arguments than the parameter nodes can absorb.
    #[error("too many arguments for '{path}': expected at most {max}, got {got}")]
    TooMany {
        /// Matched command path.
        path: String,
        /// Maximum argument count.
        max: usize,
        /// Number of arguments supplied.
        got: usize,
    },
    /// A range argument that is not a decimal integer.
    #[error("invalid number: {value}")]
    InvalidNumber {
        /// Offending argument.
        value: String,
    },
    /// A range argument outside the declared bounds.
    #[error("number out of range: {value}, expected {min}-{max}")]
    OutOfRange {
        /// Parsed argument value.
        value: i64,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// An enum argument not equal to any alternative.
    #[error("invalid value '{value}', expected one of: {allowed}")]
    InvalidEnum {
        /// Offending argument.
        value: String,
        /// Comma-joined allowed values.
        allowed: String,
    },
}

/// Prefix tree of typed command tokens for one view.
#[derive(Clone)]
pub struct CommandTree {
    nodes: Vec<Node>,
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTree {
    /// Create an empty tree containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                key: "root".to_owned(),
                text: "root".to_owned(),
                kind: NodeKind::Literal,
                optional: false,
                description: String::new(),
                parent: None,
                children: BTreeMap::new(),
                handler: None,
            }],
        }
    }

    /// Root node id.
    pub fn root(&self) -> NodeId {
        0
    }

    /// Borrow a node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Child ids of a node in key order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id].children.values().copied()
    }

    /// Look up a child by exact display key.
    pub fn child_by_key(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[id].children.get(key).copied()
    }

    /// Find the literal or view-switch child whose text equals `token`.
    pub fn literal_child(&self, id: NodeId, token: &str) -> Option<NodeId> {
        self.children(id).find(|&c| {
            let node = &self.nodes[c];
            !node.optional
                && matches!(node.kind, NodeKind::Literal | NodeKind::ModeSwitch)
                && node.text == token
        })
    }

    /// Register a command template, creating missing nodes along the path and
    /// attaching the handler and descriptions to the terminal node.
    pub fn register(
        &mut self,
        template: &str,
        short_desc: &str,
        handler: CommandHandler,
        detail: Option<&str>,
    ) -> Result<(), GrammarError> {
        let specs = parse_template(template)?;
        let mut current = self.root();
        let mut path_nodes = Vec::with_capacity(specs.len());
        for spec in &specs {
            let key = spec.display();
            current = match self.nodes[current].children.get(&key) {
                Some(&existing) => existing,
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(Node::from_spec(spec, current));
                    self.nodes[current].children.insert(key, id);
                    id
                }
            };
            path_nodes.push(current);
        }

        let terminal = &mut self.nodes[current];
        if terminal.handler.is_some() {
            return Err(GrammarError::DuplicateRegistration(template.to_owned()));
        }
        terminal.handler = Some(handler);
        terminal.description = short_desc.to_owned();

        if let Some(detail) = detail {
            for (node, line) in path_nodes.iter().zip(detail.lines()) {
                let line = line.trim();
                if !line.is_empty() {
                    self.nodes[*node].description = line.to_owned();
                }
            }
        }
        Ok(())
    }

    /// Register a view-switch command as a child of the root node.
    pub fn register_mode_switch(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<NodeId, GrammarError> {
        if let Some(&existing) = self.nodes[0].children.get(name) {
            if self.nodes[existing].kind == NodeKind::ModeSwitch {
                self.nodes[existing].description = description.to_owned();
                return Ok(existing);
            }
            return Err(GrammarError::ViewNameConflict(name.to_owned()));
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            key: name.to_owned(),
            text: name.to_owned(),
            kind: NodeKind::ModeSwitch,
            optional: false,
            description: description.to_owned(),
            parent: Some(0),
            children: BTreeMap::new(),
            handler: None,
        });
        self.nodes[0].children.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Match a token vector from the root, returning the terminal node, the
    /// consumed path, and the captured parameter arguments.
    pub fn match_tokens(&self, tokens: &[&str]) -> Result<Match, MatchError> {
        let mut path = Vec::new();
        let mut captured = Vec::new();
        let terminal = self.match_at(self.root(), tokens, &mut path, &mut captured)?;
        Ok(Match {
            terminal,
            path,
            captured,
        })
    }

    fn match_at(
        &self,
        id: NodeId,
        tokens: &[&str],
        path: &mut Vec<String>,
        captured: &mut Vec<String>,
    ) -> Result<NodeId, MatchError> {
        let node = &self.nodes[id];
        if tokens.is_empty() {
            if node.is_terminal() || node.kind == NodeKind::ModeSwitch {
                return Ok(id);
            }
            for child in self.children(id) {
                if self.nodes[child].optional {
                    let mark = (path.len(), captured.len());
                    match self.match_at(child, tokens, path, captured) {
                        Ok(found) => return Ok(found),
                        Err(_) => {
                            path.truncate(mark.0);
                            captured.truncate(mark.1);
                        }
                    }
                }
            }
            return Err(MatchError::Incomplete);
        }

        let head = tokens[0];
        let tail = &tokens[1..];

        // Literal and view-switch children pre-empt parameters at this level.
        if let Some(child) = self.literal_child(id, head) {
            path.push(head.to_owned());
            return self.match_at(child, tail, path, captured);
        }

        // Optional children are entered without consuming a token: the full
        // input is re-attempted inside the optional's subtree (skip
        // semantics). An optional node never matches a token directly.
        for child in self.children(id) {
            if !self.nodes[child].optional {
                continue;
            }
            let mark = (path.len(), captured.len());
            match self.match_at(child, tokens, path, captured) {
                Ok(found) => return Ok(found),
                Err(_) => {
                    path.truncate(mark.0);
                    captured.truncate(mark.1);
                }
            }
        }

        // Required parameter children: a strict pass with the kind rule
        // first, then a lenient pass for a final token landing on a
        // terminal, so validation can report the kind-specific error
        // ("number out of range", enum list) instead of an unknown command.
        for strict in [true, false] {
            for child in self.children(id) {
                let child_node = &self.nodes[child];
                if child_node.optional || !child_node.kind.is_parameter() {
                    continue;
                }
                if strict {
                    if !child_node.accepts(head) {
                        continue;
                    }
                } else if !tail.is_empty() || !child_node.is_terminal() {
                    continue;
                }
                let mark = (path.len(), captured.len());
                path.push(head.to_owned());
                captured.push(head.to_owned());
                match self.match_at(child, tail, path, captured) {
                    Ok(found) => return Ok(found),
                    Err(_) => {
                        path.truncate(mark.0);
                        captured.truncate(mark.1);
                    }
                }
            }
        }

        // Fallback: a terminal absorbs surplus tokens so validation can
        // report the arity mismatch against the matched path.
        if node.is_terminal() {
            captured.extend(tokens.iter().map(|t| (*t).to_owned()));
            return Ok(id);
        }

        Err(MatchError::Unknown(head.to_owned()))
    }

    /// Parameter nodes along the root-to-terminal path, in path order.
    fn parameter_path(&self, terminal: NodeId) -> Vec<NodeId> {
        let mut params = Vec::new();
        let mut current = Some(terminal);
        while let Some(id) = current {
            let node = &self.nodes[id];
            if node.kind.is_parameter() {
                params.push(id);
            }
            current = node.parent;
        }
        params.reverse();
        params
    }

    /// Validate captured arguments against the parameter nodes on the path to
    /// `terminal`.
    pub fn validate(&self, m: &Match) -> Result<(), ValidationError> {
        let params = self.parameter_path(m.terminal);
        let required = params.iter().filter(|&&p| !self.nodes[p].optional).count();
        let optional = params.len() - required;
        let path = if m.path.is_empty() {
            self.nodes[m.terminal].text.clone()
        } else {
            m.path.join(" ")
        };

        if m.captured.len() < required {
            return Err(ValidationError::TooFew {
                path,
                required,
                got: m.captured.len(),
            });
        }
        if m.captured.len() > required + optional {
            return Err(ValidationError::TooMany {
                path,
                max: required + optional,
                got: m.captured.len(),
            });
        }

        for (arg, &param) in m.captured.iter().zip(params.iter()) {
            match &self.nodes[param].kind {
                NodeKind::Range { min, max } => {
                    let value: i64 = arg
                        .parse()
                        .map_err(|_| ValidationError::InvalidNumber { value: arg.clone() })?;
                    if value < *min || value > *max {
                        return Err(ValidationError::OutOfRange {
                            value,
                            min: *min,
                            max: *max,
                        });
                    }
                }
                NodeKind::Enum { values } => {
                    if !values.iter().any(|v| v.eq_ignore_ascii_case(arg)) {
                        return Err(ValidationError::InvalidEnum {
                            value: arg.clone(),
                            allowed: values.join(", "),
                        });
                    }
                }
                NodeKind::String => {}
                NodeKind::Literal | NodeKind::ModeSwitch => {}
            }
        }
        Ok(())
    }

    /// Invoke the handler attached to `terminal`.
    pub fn handler(&self, terminal: NodeId) -> Option<&CommandHandler> {
        self.nodes[terminal].handler.as_ref()
    }

    /// Registered templates as `(template, description)` pairs, depth-first
    /// in key order.
    pub fn templates(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.collect_templates(self.root(), &mut Vec::new(), &mut out);
        out
    }

    fn collect_templates(
        &self,
        id: NodeId,
        prefix: &mut Vec<String>,
        out: &mut Vec<(String, String)>,
    ) {
        for child in self.children(id) {
            let node = &self.nodes[child];
            prefix.push(node.key.clone());
            if node.is_terminal() {
                out.push((prefix.join(" "), node.description.clone()));
            }
            self.collect_templates(child, prefix, out);
            prefix.pop();
        }
    }

    /// Render the tree as an ASCII art listing, children sorted by key.
    pub fn render(&self) -> String {
        let mut result = String::new();
        self.render_node(self.root(), "", &mut result);
        result
    }

    fn render_node(&self, id: NodeId, prefix: &str, result: &mut String) {
        let children: Vec<NodeId> = self.children(id).collect();
        for (i, child) in children.iter().enumerate() {
            let node = &self.nodes[*child];
            let last = i == children.len() - 1;
            let branch = if last { "└── " } else { "├── " };
            let marker = if node.is_terminal() { " [handler]" } else { "" };
            let _ = write!(result, "{prefix}{branch}{} ({}){marker}", node.key, node.kind.label());
            if !node.description.is_empty() {
                let _ = write!(result, " - {}", node.description);
            }
            result.push('\n');
            let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
            self.render_node(*child, &child_prefix, result);
        }
    }
}
