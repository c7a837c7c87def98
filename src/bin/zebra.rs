// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Zebra-style demo CLI exercising views, parameters, and completion.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Zebra-style demo binary.
//!
//! Starts a Telnet shell with a root (privileged EXEC) view plus `configure`
//! and `interface` views, populated with router-flavoured commands. Connect
//! with `telnet 127.0.0.1 2323`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use telsh::{CommandHandler, CommandStatus, Config, ShellServer};

/// Zebra-style demo CLI server.
#[derive(Debug, Parser)]
#[command(author = "Lukas Bower", version, about = "Zebra-style Telnet CLI demo", long_about = None)]
struct Cli {
    /// TCP port to listen on (0 binds an ephemeral port).
    #[arg(long, default_value_t = 2323)]
    port: u16,

    /// Root prompt.
    #[arg(long, default_value = "zebra")]
    prompt: String,

    /// Optional TOML configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn echo_args() -> CommandHandler {
    Arc::new(|args, out| {
        writeln!(out, "arg count {}, {:?}", args.len(), args)?;
        Ok(CommandStatus::Continue)
    })
}

fn static_text(text: &'static str) -> CommandHandler {
    Arc::new(move |_args, out| {
        writeln!(out, "{text}")?;
        Ok(CommandStatus::Continue)
    })
}

fn register_root_commands(server: &mut ShellServer) -> Result<()> {
    server.register_command_detailed(
        "show running-config",
        "Show running system information",
        static_text("interface eth0\n ip address 192.168.1.1/24\n no shutdown"),
        "show configuration\ndisplay running config",
    )?;
    server.register_command_detailed(
        "show config",
        "Show running system information",
        static_text("hostname zebra\nlog file /var/log/zebra.log"),
        "show configuration\ndisplay system config",
    )?;
    server.register_command_detailed(
        "ping IP",
        "Send echo messages",
        Arc::new(|args, out| {
            let target = args.first().map(String::as_str).unwrap_or("8.8.8.8");
            writeln!(out, "PING {target}: 64 data bytes")?;
            writeln!(out, "64 bytes from {target}: icmp_seq=0 ttl=57 time=25.3 ms")?;
            Ok(CommandStatus::Continue)
        }),
        "send echo\ntest connectivity",
    )?;
    server.register_command("clear test1", "Reset functions", static_text("Functions cleared"))?;
    server.register_command("clear test2", "Reset functions", static_text("Functions cleared"))?;
    server.register_command("debug", "Debugging functions", static_text("Debugging enabled"))?;
    server.register_command("set debug <1-10>", "Debugging functions", echo_args())?;
    server.register_command("set debug2 <1-10> (on|off)", "Debugging functions", echo_args())?;
    server.register_command("set debug info STRING", "Debugging functions", echo_args())?;
    server.register_command("set name STRING", "Debugging functions", echo_args())?;
    server.register_command("set filter-switch (on|off)", "Debugging functions", echo_args())?;
    server.register_command("set test [STRING]", "Debugging functions", echo_args())?;
    Ok(())
}

fn register_view_commands(server: &mut ShellServer) -> Result<()> {
    server.create_view("configure", "global configuration")?;
    server.register_view_command(
        "configure",
        "router PROTOCOL",
        "Enable a routing process",
        echo_args(),
    )?;
    server.register_view_command(
        "configure",
        "hostname HOSTNAME",
        "Set system's network name",
        echo_args(),
    )?;
    server.register_view_command(
        "configure",
        "banner BANNER",
        "Define a login banner",
        echo_args(),
    )?;
    server.register_view_command("configure", "set debug3 <1-10>", "Debugging functions", echo_args())?;

    server.create_view("interface", "interface configuration")?;
    server.register_view_command(
        "interface",
        "ip IPADDR MASK",
        "Interface Internet Protocol config commands",
        echo_args(),
    )?;
    server.register_view_command(
        "interface",
        "description TEXT",
        "Interface specific description",
        echo_args(),
    )?;
    server.register_view_command(
        "interface",
        "shutdown",
        "Shutdown the selected interface",
        static_text("Interface shutdown"),
    )?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    config.port = cli.port;
    config.prompt = cli.prompt.clone();

    let mut server = ShellServer::new(config);
    register_root_commands(&mut server)?;
    register_view_commands(&mut server)?;

    server.start().context("failed to start shell server")?;
    let addr = server
        .local_addr()
        .context("listener has no local address")?;
    println!("Zebra-style CLI listening on {addr}");
    println!("Press Enter (or close stdin) to stop.");

    let stdin = io::stdin();
    let mut line = String::new();
    let _ = stdin.lock().read_line(&mut line);

    server.stop().context("failed to stop shell server")?;
    println!("Zebra-style CLI stopped");
    Ok(())
}
