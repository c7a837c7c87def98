// Author: Lukas Bower

//! End-to-end Telnet session scenarios over a loopback socket: negotiation,
//! prompts, dispatch, completion, help, history, idle reaping, shutdown.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use telsh::{CommandStatus, Config, ShellServer};

const READ_TIMEOUT: Duration = Duration::from_secs(3);

fn demo_server(config: Config) -> ShellServer {
    let mut server = ShellServer::new(config);
    server
        .register_command(
            "show running-config",
            "Show running system information",
            Arc::new(|_args, out| {
                writeln!(out, "RUNNING-CONFIG-OUTPUT")?;
                Ok(CommandStatus::Continue)
            }),
        )
        .expect("register show running-config");
    server
        .register_command(
            "show config",
            "Show running system information",
            Arc::new(|_args, out| {
                writeln!(out, "CONFIG-OUTPUT")?;
                Ok(CommandStatus::Continue)
            }),
        )
        .expect("register show config");
    server
        .register_command(
            "set debug2 <1-10> (on|off)",
            "Debugging functions",
            Arc::new(|args, out| {
                writeln!(out, "got {:?}", args)?;
                Ok(CommandStatus::Continue)
            }),
        )
        .expect("register set debug2");
    server
        .create_view("configure", "global configuration")
        .expect("create configure");
    server
        .create_view("interface", "interface configuration")
        .expect("create interface");
    server.start().expect("start server");
    server
}

fn started() -> (ShellServer, TcpStream) {
    let mut config = Config::default();
    config.port = 0;
    config.prompt = "zebra".to_owned();
    let server = demo_server(config);
    let stream = connect(&server);
    (server, stream)
}

fn connect(server: &ShellServer) -> TcpStream {
    let port = server.local_addr().expect("local addr").port();
    let stream = TcpStream::connect(("127.0.0.1", port)).expect("connect");
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .expect("read timeout");
    stream
}

/// Consume the fixed-size Telnet negotiation preamble.
fn read_preamble(stream: &mut TcpStream) {
    let mut preamble = [0u8; 9];
    stream.read_exact(&mut preamble).expect("read preamble");
    assert_eq!(
        preamble,
        [0xFF, 0xFB, 0x01, 0xFF, 0xFD, 0x03, 0xFF, 0xFB, 0x03],
        "expected IAC WILL ECHO, IAC DO SGA, IAC WILL SGA"
    );
}

/// Read until the collected output contains `needle`.
fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut collected = String::new();
    let mut buf = [0u8; 512];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => panic!("connection closed while waiting for {needle:?}; got {collected:?}"),
            Ok(n) => {
                collected.push_str(&String::from_utf8_lossy(&buf[..n]));
                if collected.contains(needle) {
                    return collected;
                }
            }
            Err(err) => panic!("timed out waiting for {needle:?}; got {collected:?}: {err}"),
        }
    }
}

/// Read until the server closes the connection.
fn read_until_closed(stream: &mut TcpStream) {
    let mut buf = [0u8; 512];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return,
            Ok(_) => continue,
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
                ) =>
            {
                return;
            }
            Err(err) => panic!("expected the server to close the connection: {err}"),
        }
    }
}

fn send(stream: &mut TcpStream, bytes: &[u8]) {
    stream.write_all(bytes).expect("send");
}

#[test]
fn welcome_banner_then_prompt_then_dispatch() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    let greeting = read_until(&mut stream, "zebra> ");
    assert!(greeting.contains("Welcome to Command Line Interface!"));

    send(&mut stream, b"show running-config\r\n");
    let output = read_until(&mut stream, "zebra> ");
    assert!(output.contains("RUNNING-CONFIG-OUTPUT"));
}

#[test]
fn parameter_validation_round_trip() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, b"set debug2 5 on\r\n");
    let output = read_until(&mut stream, "zebra> ");
    assert!(output.contains(r#"got ["5", "on"]"#), "{output}");

    send(&mut stream, b"set debug2 11 on\r\n");
    let output = read_until(&mut stream, "zebra> ");
    assert!(output.contains("number out of range: 11, expected 1-10"), "{output}");

    send(&mut stream, b"set debug2 5 maybe\r\n");
    let output = read_until(&mut stream, "zebra> ");
    assert!(
        output.contains("invalid value 'maybe', expected one of: on, off"),
        "{output}"
    );
}

#[test]
fn view_switching_updates_the_prompt() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, b"configure\r\n");
    let output = read_until(&mut stream, "configure# ");
    assert!(output.contains("Entering global configuration mode"));

    // A sibling view is reachable directly from the child view.
    send(&mut stream, b"interface\r\n");
    let output = read_until(&mut stream, "interface# ");
    assert!(output.contains("Entering interface configuration mode"));

    send(&mut stream, b"quit\r\n");
    let output = read_until(&mut stream, "zebra> ");
    assert!(output.contains("Exiting to privileged EXEC mode"));
}

#[test]
fn tab_completes_unique_prefix_in_place() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, b"show r\t");
    read_until(&mut stream, "show running-config");
    send(&mut stream, b"\r\n");
    let output = read_until(&mut stream, "zebra> ");
    assert!(output.contains("RUNNING-CONFIG-OUTPUT"));
}

#[test]
fn tab_lists_divergent_candidates() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, b"show \t");
    let output = read_until(&mut stream, "running-config");
    assert!(output.contains("config"), "{output}");
}

#[test]
fn question_mark_lists_available_commands() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, b"?");
    // `help/?` is the last row of the listing.
    let output = read_until(&mut stream, "help/?");
    for expected in ["show", "set", "configure", "interface", "exit", "quit"] {
        assert!(output.contains(expected), "missing {expected}: {output}");
    }
}

#[test]
fn question_mark_shows_parameter_hint_mid_command() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, b"set debug2 ?");
    let output = read_until(&mut stream, "<1-10>");
    // The prompt and pending input are redrawn after the listing.
    assert!(output.contains("set debug2"), "{output}");
}

#[test]
fn empty_line_is_a_noop() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, b"\r\n");
    let output = read_until(&mut stream, "zebra> ");
    assert!(!output.contains("Unknown command"), "{output}");
}

#[test]
fn unknown_command_prints_the_hint() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, b"frobnicate\r\n");
    let output = read_until(&mut stream, "zebra> ");
    assert!(output.contains("Unknown command: frobnicate"));
    assert!(output.contains("Type '?' for available commands"));
}

#[test]
fn up_arrow_recalls_the_previous_command() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, b"show config\r\n");
    read_until(&mut stream, "zebra> ");

    // ESC [ A recalls the line; Enter re-executes it.
    send(&mut stream, &[0x1B, b'[', b'A']);
    read_until(&mut stream, "show config");
    send(&mut stream, b"\r\n");
    let output = read_until(&mut stream, "zebra> ");
    assert!(output.contains("CONFIG-OUTPUT"));
}

#[test]
fn exit_closes_the_connection() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, b"exit\r\n");
    read_until_closed(&mut stream);
}

#[test]
fn ctrl_c_closes_the_connection() {
    let (_server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    send(&mut stream, &[0x03]);
    read_until_closed(&mut stream);
}

#[test]
fn sessions_are_independent() {
    let (server, mut first) = started();
    let mut second = connect(&server);

    read_preamble(&mut first);
    read_until(&mut first, "zebra> ");
    read_preamble(&mut second);
    read_until(&mut second, "zebra> ");

    send(&mut first, b"configure\r\n");
    read_until(&mut first, "configure# ");

    // The second session still dispatches against the root view.
    send(&mut second, b"show config\r\n");
    let output = read_until(&mut second, "zebra> ");
    assert!(output.contains("CONFIG-OUTPUT"));
}

#[test]
fn idle_sessions_are_reaped() {
    let mut config = Config::default();
    config.port = 0;
    config.prompt = "zebra".to_owned();
    config.idle_timeout_ms = 200;
    let server = demo_server(config);
    let mut stream = connect(&server);
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    // No input past the staleness threshold: the sweeper closes the session.
    thread::sleep(Duration::from_millis(700));
    read_until_closed(&mut stream);
}

#[test]
fn active_sessions_survive_the_sweep() {
    let mut config = Config::default();
    config.port = 0;
    config.prompt = "zebra".to_owned();
    config.idle_timeout_ms = 600;
    let server = demo_server(config);
    let mut stream = connect(&server);
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    for _ in 0..4 {
        thread::sleep(Duration::from_millis(200));
        send(&mut stream, b"show config\r\n");
        let output = read_until(&mut stream, "zebra> ");
        assert!(output.contains("CONFIG-OUTPUT"));
    }
}

#[test]
fn stop_closes_connected_sessions() {
    let (mut server, mut stream) = started();
    read_preamble(&mut stream);
    read_until(&mut stream, "zebra> ");

    server
        .stop_with_deadline(Duration::from_secs(2))
        .expect("stop");
    read_until_closed(&mut stream);
}
