// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Per-connection session worker: editor loop, dispatch, redraw.
// Author: Lukas Bower

//! Per-connection session worker.
//!
//! Each accepted connection runs one worker that owns its session state
//! exclusively: the line editor, the history ring, and the current-view
//! pointer. The view registry is shared read-only. The worker suspends only
//! on socket reads; a command is dispatched and flushed before the next byte
//! is consumed.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Mutex;
use std::time::Instant;

use log::debug;

use crate::complete::{complete, help_lines, Completion};
use crate::config::Config;
use crate::dispatch::{dispatch, DispatchOutcome};
use crate::editor::{EditorAction, LineEditor};
use crate::history::History;
use crate::telnet::{CrlfWriter, NEGOTIATION_PREAMBLE};
use crate::view::{ViewRegistry, ROOT_VIEW};

/// Terminal bell, rung when completion has nothing to offer.
const BELL: u8 = 0x07;

/// Run one session until disconnect. `last_active` is shared with the idle
/// reaper, which closes the socket out from under a stale session.
pub(crate) fn run_session(
    stream: TcpStream,
    registry: &ViewRegistry,
    config: &Config,
    last_active: &Mutex<Instant>,
) -> io::Result<()> {
    let mut reader = stream.try_clone()?;
    let mut out = CrlfWriter::new(stream);

    let mut editor = LineEditor::new();
    let mut history = History::new(config.max_history);
    let mut current_view = ROOT_VIEW.to_owned();
    let mut prompt = registry.root().prompt().to_owned();

    out.get_mut().write_all(&NEGOTIATION_PREAMBLE)?;
    out.write_all(config.welcome.as_bytes())?;
    out.write_all(prompt.as_bytes())?;
    out.flush()?;

    let mut buf = [0u8; 1024];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        if let Ok(mut stamp) = last_active.lock() {
            *stamp = Instant::now();
        }

        for &byte in &buf[..n] {
            match editor.feed(byte, &history) {
                EditorAction::None => {}
                EditorAction::Echo(b) => {
                    out.write_all(&[b])?;
                    out.flush()?;
                }
                EditorAction::Redraw => redraw(&mut out, &prompt, editor.buffer())?,
                EditorAction::Complete => {
                    handle_completion(&mut out, registry, &current_view, &mut editor, &prompt)?;
                }
                EditorAction::Help => {
                    handle_help(&mut out, registry, &current_view, &editor, &prompt)?;
                }
                EditorAction::Terminate => {
                    debug!("session terminated by control byte");
                    return Ok(());
                }
                EditorAction::Submit(line) => {
                    out.write_all(b"\r\n")?;
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        history.push(trimmed);
                        match dispatch(registry, &current_view, trimmed, &mut out)? {
                            DispatchOutcome::Continue => {}
                            DispatchOutcome::Disconnect => {
                                out.flush()?;
                                return Ok(());
                            }
                            DispatchOutcome::Switch(name) => {
                                if let Some(view) = registry.view(&name) {
                                    prompt = view.prompt().to_owned();
                                }
                                current_view = name;
                            }
                            DispatchOutcome::ExitToRoot => {
                                current_view = ROOT_VIEW.to_owned();
                                prompt = registry.root().prompt().to_owned();
                            }
                        }
                    }
                    out.write_all(prompt.as_bytes())?;
                    out.flush()?;
                }
            }
        }
    }
}

fn redraw(out: &mut CrlfWriter<TcpStream>, prompt: &str, buffer: &str) -> io::Result<()> {
    out.write_all(b"\r\x1b[K")?;
    out.write_all(prompt.as_bytes())?;
    out.write_all(buffer.as_bytes())?;
    out.flush()
}

fn handle_completion(
    out: &mut CrlfWriter<TcpStream>,
    registry: &ViewRegistry,
    current_view: &str,
    editor: &mut LineEditor,
    prompt: &str,
) -> io::Result<()> {
    let Some(view) = registry.view(current_view) else {
        return Ok(());
    };
    match complete(view.tree(), editor.buffer()) {
        Completion::None => {
            out.write_all(&[BELL])?;
            out.flush()
        }
        Completion::Replace(line) => {
            editor.set_buffer(line);
            redraw(out, prompt, editor.buffer())
        }
        Completion::Candidates(items) => {
            out.write_all(b"\r\n")?;
            for item in items {
                out.write_all(item.as_bytes())?;
                out.write_all(b"\r\n")?;
            }
            redraw(out, prompt, editor.buffer())
        }
    }
}

fn handle_help(
    out: &mut CrlfWriter<TcpStream>,
    registry: &ViewRegistry,
    current_view: &str,
    editor: &LineEditor,
    prompt: &str,
) -> io::Result<()> {
    let lines = help_lines(registry, current_view, editor.buffer());
    out.write_all(b"\r\n")?;
    if lines.is_empty() {
        out.write_all(b"No commands available\r\n")?;
    } else {
        for line in lines {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\r\n")?;
        }
    }
    redraw(out, prompt, editor.buffer())
}
