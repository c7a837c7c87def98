// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Embeddable Zebra-style hierarchical CLI served over Telnet.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Embeddable Zebra-style hierarchical CLI served over Telnet.
//!
//! A host program registers commands described by typed templates
//! (`set debug2 <1-10> (on|off)`), optionally grouped into views (modes),
//! and starts a Telnet listener. Connected users get character-at-a-time
//! line editing with history, tab completion, and `?` context help; entered
//! lines are matched against the current view's command tree, validated,
//! and dispatched to the host's handler.
//!
//! ```no_run
//! use std::io::Write;
//! use std::sync::Arc;
//! use telsh::{CommandStatus, Config, ShellServer};
//!
//! let mut server = ShellServer::new(Config::default());
//! server
//!     .register_command(
//!         "show running-config",
//!         "Show running system information",
//!         Arc::new(|_args, out| {
//!             writeln!(out, "interface eth0 is up")?;
//!             Ok(CommandStatus::Continue)
//!         }),
//!     )
//!     .expect("template parses");
//! server.start().expect("bind port");
//! ```

use std::io::Write;
use std::sync::Arc;

pub mod complete;
pub mod config;
pub mod dispatch;
pub mod editor;
pub mod grammar;
pub mod history;
pub mod server;
mod session;
pub mod telnet;
pub mod tree;
pub mod view;

pub use config::{Config, ConfigError};
pub use grammar::{GrammarError, NodeKind};
pub use server::{ServerError, ShellServer};

/// Outcome a command handler reports back to the session.
///
/// The typed variants replace the string sentinels (`"__EXIT__"` and
/// friends) that handler conventions of this kind tend to grow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    /// Keep the session in its current view.
    Continue,
    /// Close the connection.
    Disconnect,
    /// Switch the session to the named view.
    EnterView(String),
    /// Return the session to the root view.
    ExitToRoot,
}

/// A command handler: receives the captured parameter arguments in template
/// order and a write sink whose `\n` endings are normalised to `\r\n` on
/// egress. Errors are reported to the user and logged; they never terminate
/// the session.
pub type CommandHandler =
    Arc<dyn Fn(&[String], &mut dyn Write) -> anyhow::Result<CommandStatus> + Send + Sync>;
