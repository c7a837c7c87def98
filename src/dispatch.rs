// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Command dispatch: tokenise, match, validate, invoke, resolve outcome.
// Author: Lukas Bower

//! Command dispatch for one entered line.
//!
//! Resolution order: built-ins (`exit`, `quit`, `help`), the view-switch
//! table (single-token lines only), then the current view's command tree.
//! Handlers return a typed [`CommandStatus`]; the dispatcher folds that into
//! a [`DispatchOutcome`] the session loop acts on.

use std::io::{self, Write};

use log::warn;

use crate::complete::builtin_rows;
use crate::grammar::NodeKind;
use crate::tree::MatchError;
use crate::view::{ViewRegistry, ROOT_VIEW};
use crate::CommandStatus;

/// What the session loop must do after one dispatched line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Keep reading commands in the current view.
    Continue,
    /// Close the connection.
    Disconnect,
    /// Switch to the named view (already clamped to a valid target).
    Switch(String),
    /// Return to the root view.
    ExitToRoot,
}

/// Dispatch one non-empty command line against the current view.
pub fn dispatch(
    registry: &ViewRegistry,
    current_view: &str,
    line: &str,
    out: &mut dyn Write,
) -> io::Result<DispatchOutcome> {
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    let Some(&first) = tokens.first() else {
        return Ok(DispatchOutcome::Continue);
    };

    if tokens.len() == 1 {
        match first {
            "exit" => return Ok(DispatchOutcome::Disconnect),
            "quit" => {
                if current_view == ROOT_VIEW {
                    return Ok(DispatchOutcome::Disconnect);
                }
                write!(out, "Exiting to privileged EXEC mode\r\n")?;
                return Ok(DispatchOutcome::ExitToRoot);
            }
            "help" => {
                write_help(registry, current_view, out)?;
                return Ok(DispatchOutcome::Continue);
            }
            name if registry.switches().contains_key(name) && name != current_view => {
                return enter_view(registry, name, out);
            }
            _ => {}
        }
    }

    let Some(view) = registry.view(current_view) else {
        return unknown_command(&tokens, out);
    };
    let tree = view.tree();

    let matched = match tree.match_tokens(&tokens) {
        Ok(matched) => matched,
        Err(MatchError::Incomplete) => {
            write!(out, "incomplete command\r\n")?;
            return Ok(DispatchOutcome::Continue);
        }
        Err(MatchError::Unknown(_)) => {
            return unknown_command(&tokens, out);
        }
    };

    if *tree.node(matched.terminal).kind() == NodeKind::ModeSwitch {
        return enter_view(registry, tree.node(matched.terminal).text(), out);
    }

    if let Err(err) = tree.validate(&matched) {
        write!(out, "Error: {err}\r\n")?;
        return Ok(DispatchOutcome::Continue);
    }

    let Some(handler) = tree.handler(matched.terminal) else {
        return unknown_command(&tokens, out);
    };
    match handler(&matched.captured, out) {
        Ok(CommandStatus::Continue) => Ok(DispatchOutcome::Continue),
        Ok(CommandStatus::Disconnect) => Ok(DispatchOutcome::Disconnect),
        Ok(CommandStatus::ExitToRoot) => Ok(DispatchOutcome::ExitToRoot),
        Ok(CommandStatus::EnterView(name)) => enter_view(registry, &name, out),
        Err(err) => {
            warn!("handler for '{}' failed: {err:#}", matched.path.join(" "));
            write!(out, "Error: {err}\r\n")?;
            Ok(DispatchOutcome::Continue)
        }
    }
}

fn enter_view(
    registry: &ViewRegistry,
    name: &str,
    out: &mut dyn Write,
) -> io::Result<DispatchOutcome> {
    let target = registry.clamp_target(name);
    let Some(view) = registry.view(target) else {
        write!(out, "Error: unknown view: {name}\r\n")?;
        return Ok(DispatchOutcome::Continue);
    };
    write!(out, "Entering {} mode\r\n", view.description())?;
    Ok(DispatchOutcome::Switch(target.to_owned()))
}

fn unknown_command(tokens: &[&str], out: &mut dyn Write) -> io::Result<DispatchOutcome> {
    write!(out, "Unknown command: {}\r\n", tokens.join(" "))?;
    write!(out, "Type '?' for available commands\r\n")?;
    Ok(DispatchOutcome::Continue)
}

/// `help` built-in: the current mode header plus every available command.
fn write_help(registry: &ViewRegistry, current_view: &str, out: &mut dyn Write) -> io::Result<()> {
    let Some(view) = registry.view(current_view) else {
        return Ok(());
    };
    write!(out, "Current mode: {}\r\n", view.description())?;
    write!(out, "Available commands:\r\n")?;
    for (template, description) in view.tree().templates() {
        write!(out, "  {template:<15} {description}\r\n")?;
    }
    for (name, description) in registry.switches() {
        if name != current_view {
            write!(out, "  {name:<15} {description}\r\n")?;
        }
    }
    for (name, description) in builtin_rows(current_view) {
        write!(out, "  {name:<15} {description}\r\n")?;
    }
    write!(out, "  help/?          Show this help message\r\n")?;
    Ok(())
}
