// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Tab completion and `?` context help over the command tree.
// Author: Lukas Bower

//! Tab completion and `?` context help.
//!
//! Both operations split the partial input into complete leading tokens plus
//! a stem (empty when the input ends in whitespace), walk the leading tokens
//! through literal and view-switch children only, and inspect the children of
//! the resting node. Completion restricts itself to whole-word candidates;
//! help also lists parameter placeholders by their surface form.

use crate::grammar::NodeKind;
use crate::tree::{CommandTree, NodeId};
use crate::view::{ViewRegistry, ROOT_VIEW};

/// Outcome of a tab-completion request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Nothing to offer; the session rings the terminal bell.
    None,
    /// Replace the whole edit buffer with this line.
    Replace(String),
    /// Show these candidates, then redraw the unchanged buffer.
    Candidates(Vec<String>),
}

/// Split a partial input into leading tokens and the trailing stem.
fn split_stem(input: &str) -> (Vec<&str>, &str) {
    let mut tokens: Vec<&str> = input.split_ascii_whitespace().collect();
    if input.is_empty() || input.ends_with(|c: char| c.is_ascii_whitespace()) {
        (tokens, "")
    } else {
        let stem = tokens.pop().unwrap_or("");
        (tokens, stem)
    }
}

/// Walk leading tokens through literal and view-switch children only.
fn walk_literals(tree: &CommandTree, tokens: &[&str]) -> Option<NodeId> {
    let mut node = tree.root();
    for token in tokens {
        node = tree.literal_child(node, token)?;
    }
    Some(node)
}

fn longest_common_prefix(values: &[String]) -> String {
    let Some(first) = values.first() else {
        return String::new();
    };
    let mut prefix = first.clone();
    for value in &values[1..] {
        while !value.starts_with(prefix.as_str()) {
            prefix.pop();
            if prefix.is_empty() {
                return prefix;
            }
        }
    }
    prefix
}

/// Compute the tab completion for a partial input line.
pub fn complete(tree: &CommandTree, input: &str) -> Completion {
    let (leading, stem) = split_stem(input);
    let Some(node) = walk_literals(tree, &leading) else {
        return Completion::None;
    };

    let mut words: Vec<String> = Vec::new();
    let mut hints: Vec<String> = Vec::new();
    for child in tree.children(node) {
        let child_node = tree.node(child);
        match child_node.kind() {
            NodeKind::Literal | NodeKind::ModeSwitch => {
                if child_node.text().starts_with(stem) {
                    words.push(child_node.text().to_owned());
                }
            }
            _ => hints.push(child_node.key().to_owned()),
        }
    }
    words.sort();

    // Empty buffer: always list every whole-word candidate.
    if leading.is_empty() && stem.is_empty() {
        return if words.is_empty() {
            Completion::None
        } else {
            Completion::Candidates(words)
        };
    }

    match words.len() {
        0 => {
            if hints.is_empty() {
                Completion::None
            } else {
                Completion::Candidates(hints)
            }
        }
        1 => Completion::Replace(join_line(&leading, &words[0])),
        _ => {
            let prefix = longest_common_prefix(&words);
            if prefix.len() > stem.len() {
                Completion::Replace(join_line(&leading, &prefix))
            } else {
                Completion::Candidates(words)
            }
        }
    }
}

fn join_line(leading: &[&str], word: &str) -> String {
    if leading.is_empty() {
        word.to_owned()
    } else {
        format!("{} {}", leading.join(" "), word)
    }
}

fn help_row(name: &str, description: &str) -> String {
    format!("  {name:<15} {description}")
}

/// Compute the `?` help listing for a partial input line.
///
/// Children of the resting node are listed with their display keys, parameter
/// nodes by surface form. At the start-of-line position the listing also
/// contains the view-switch commands (except the current view) and the
/// built-ins. An empty result means "No commands available".
pub fn help_lines(registry: &ViewRegistry, current_view: &str, input: &str) -> Vec<String> {
    let Some(view) = registry.view(current_view) else {
        return Vec::new();
    };
    let tree = view.tree();
    let (leading, stem) = split_stem(input);
    let Some(node) = walk_literals(tree, &leading) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for child in tree.children(node) {
        let child_node = tree.node(child);
        match child_node.kind() {
            NodeKind::Literal | NodeKind::ModeSwitch => {
                if child_node.text().starts_with(stem) {
                    lines.push(help_row(child_node.key(), child_node.description()));
                }
            }
            _ => {
                if stem.is_empty() || child_node.accepts(stem) {
                    lines.push(help_row(child_node.key(), child_node.description()));
                }
            }
        }
    }

    if leading.is_empty() {
        for (name, description) in registry.switches() {
            if name != current_view && name.starts_with(stem) {
                // The root tree already lists its own switch nodes above.
                if current_view != ROOT_VIEW {
                    lines.push(help_row(name, description));
                }
            }
        }
        for (name, description) in builtin_rows(current_view) {
            if name.starts_with(stem) {
                lines.push(help_row(name, description));
            }
        }
        if "help/?".starts_with(stem) {
            lines.push(help_row("help/?", "Show this help message"));
        }
    }
    lines
}

/// The `exit`/`quit` built-ins and their per-view descriptions.
pub fn builtin_rows(current_view: &str) -> Vec<(&'static str, &'static str)> {
    let quit_desc = if current_view == ROOT_VIEW {
        "Exit and close connection"
    } else {
        "Exit to privileged EXEC mode"
    };
    vec![
        ("exit", "Exit and close connection"),
        ("quit", quit_desc),
    ]
}
