// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: View (mode) registry with per-view command trees and prompts.
// Author: Lukas Bower

//! Views (modes) and the view registry.
//!
//! A view is a named scope of commands with its own prompt and command tree.
//! The hierarchy is bounded to two levels: the root view and its direct
//! children. View-switch commands are kept in a table owned by the registry
//! so that every view name is recognised from any view.

use std::collections::BTreeMap;

use crate::grammar::GrammarError;
use crate::tree::CommandTree;

/// Name of the root view.
pub const ROOT_VIEW: &str = "root";

/// Description of the root view, Cisco-style.
pub const ROOT_DESCRIPTION: &str = "privileged EXEC mode";

/// Format a prompt: used verbatim when it already ends in `>` or `#`,
/// otherwise the root view gets `"> "` and a child view gets `"# "`.
pub fn format_prompt(raw: &str, is_root: bool) -> String {
    if raw.ends_with('>') || raw.ends_with('#') {
        return raw.to_owned();
    }
    if is_root {
        format!("{raw}> ")
    } else {
        format!("{}# ", raw.trim())
    }
}

/// One view: a command scope with its own prompt and tree.
#[derive(Clone)]
pub struct View {
    name: String,
    prompt: String,
    description: String,
    parent: Option<String>,
    tree: CommandTree,
}

impl View {
    fn new(name: &str, prompt: &str, description: &str, parent: Option<String>) -> Self {
        Self {
            name: name.to_owned(),
            prompt: format_prompt(prompt, parent.is_none()),
            description: description.to_owned(),
            parent,
            tree: CommandTree::new(),
        }
    }

    /// View name (the view-switch token).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Formatted prompt shown while this view is active.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// View description, used in `Entering ... mode` messages.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parent view name; `None` for the root view.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// The view's command tree.
    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// Mutable access for registration.
    pub(crate) fn tree_mut(&mut self) -> &mut CommandTree {
        &mut self.tree
    }
}

/// Registry of the root view, its children, and the view-switch table.
#[derive(Clone)]
pub struct ViewRegistry {
    root: View,
    children: BTreeMap<String, View>,
    switches: BTreeMap<String, String>,
}

impl ViewRegistry {
    /// Create a registry whose root view uses `prompt`.
    pub fn new(prompt: &str) -> Self {
        Self {
            root: View::new(ROOT_VIEW, prompt, ROOT_DESCRIPTION, None),
            children: BTreeMap::new(),
            switches: BTreeMap::new(),
        }
    }

    /// The root view.
    pub fn root(&self) -> &View {
        &self.root
    }

    /// Re-derive the root prompt from a new raw prompt string.
    pub(crate) fn set_root_prompt(&mut self, prompt: &str) {
        self.root.prompt = format_prompt(prompt, true);
    }

    /// Look up a view by name (the root view included).
    pub fn view(&self, name: &str) -> Option<&View> {
        if name == ROOT_VIEW {
            Some(&self.root)
        } else {
            self.children.get(name)
        }
    }

    /// View-switch table: child view name to switch-command description.
    pub fn switches(&self) -> &BTreeMap<String, String> {
        &self.switches
    }

    /// All views, root first, children in name order.
    pub fn views(&self) -> impl Iterator<Item = &View> {
        std::iter::once(&self.root).chain(self.children.values())
    }

    /// Create a child view of root, or return the existing one. Registers
    /// the synthetic view-switch command in the root tree and the table.
    pub fn create_view(&mut self, name: &str, description: &str) -> Result<(), GrammarError> {
        self.create_view_under(ROOT_VIEW, name, description)
    }

    /// Create a view under an arbitrary parent. Only root children are
    /// reachable by the dispatcher; deeper views exist so the grandchild
    /// clamp can be exercised.
    pub(crate) fn create_view_under(
        &mut self,
        parent: &str,
        name: &str,
        description: &str,
    ) -> Result<(), GrammarError> {
        if self.children.contains_key(name) || name == ROOT_VIEW {
            return Ok(());
        }
        let switch_desc = format!("Enter {description} mode");
        self.root.tree_mut().register_mode_switch(name, &switch_desc)?;
        self.switches.insert(name.to_owned(), switch_desc);
        self.children
            .insert(name.to_owned(), View::new(name, name, description, Some(parent.to_owned())));
        Ok(())
    }

    /// Register a command template on a named view (the root view included),
    /// creating a child view on demand.
    pub fn register(
        &mut self,
        view: &str,
        template: &str,
        description: &str,
        handler: crate::CommandHandler,
        detail: Option<&str>,
    ) -> Result<(), GrammarError> {
        self.view_mut(view)?
            .tree_mut()
            .register(template, description, handler, detail)
    }

    /// Mutable child view for registration, created on demand.
    pub(crate) fn view_mut(&mut self, name: &str) -> Result<&mut View, GrammarError> {
        if name == ROOT_VIEW {
            return Ok(&mut self.root);
        }
        if !self.children.contains_key(name) {
            self.create_view(name, &format!("{name} configuration"))?;
        }
        match self.children.get_mut(name) {
            Some(view) => Ok(view),
            None => Err(GrammarError::ViewNameConflict(name.to_owned())),
        }
    }

    /// Resolve a view-switch target, clamping grandchildren to their parent:
    /// entering a view whose parent is itself a child view lands on the
    /// parent instead.
    pub fn clamp_target<'a>(&'a self, name: &'a str) -> &'a str {
        let Some(view) = self.view(name) else {
            return name;
        };
        match view.parent() {
            Some(parent) if parent != ROOT_VIEW => parent,
            _ => name,
        }
    }
}
