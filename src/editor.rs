// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Byte-at-a-time line editor state machine for Telnet sessions.
// Author: Lukas Bower

//! Byte-at-a-time line editor.
//!
//! The editor owns the edit buffer and the history cursor and interprets raw
//! inbound bytes one at a time. It performs no I/O itself: every byte maps to
//! an [`EditorAction`] that the session loop turns into echo, redraw,
//! completion, help, or dispatch. Telnet `IAC` triples and `ESC [` sequences
//! are tracked incrementally so they may span socket reads.

use crate::history::History;
use crate::telnet::IAC;

/// Upper bound on the edit buffer; printable input beyond it is discarded.
const MAX_LINE_LEN: usize = 4096;

/// What the session loop must do after feeding one byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorAction {
    /// Nothing to do.
    None,
    /// Echo the byte back to the client.
    Echo(u8),
    /// Redraw the prompt and current buffer.
    Redraw,
    /// A full line was entered; echo CRLF and dispatch it.
    Submit(String),
    /// Run tab completion against the current buffer.
    Complete,
    /// Run `?` help against the current buffer.
    Help,
    /// Ctrl-C / Ctrl-D: terminate the session.
    Terminate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EscState {
    Idle,
    SawEsc,
    SawBracket,
}

/// Line editor state for one session.
#[derive(Debug)]
pub struct LineEditor {
    buffer: String,
    hist_cursor: Option<usize>,
    telnet_skip: u8,
    esc: EscState,
    prev_cr: bool,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    /// Create an editor with an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            hist_cursor: None,
            telnet_skip: 0,
            esc: EscState::Idle,
            prev_cr: false,
        }
    }

    /// Current buffer contents.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Replace the buffer (used by tab completion).
    pub fn set_buffer(&mut self, contents: String) {
        self.buffer = contents;
    }

    /// Interpret one inbound byte.
    pub fn feed(&mut self, byte: u8, history: &History) -> EditorAction {
        if self.telnet_skip > 0 {
            self.telnet_skip -= 1;
            return EditorAction::None;
        }
        if byte == IAC {
            self.telnet_skip = 2;
            return EditorAction::None;
        }

        let after_cr = self.prev_cr;
        self.prev_cr = byte == 0x0D;
        // The LF of an inbound CRLF pair already terminated the line.
        if byte == 0x0A && after_cr {
            return EditorAction::None;
        }

        match self.esc {
            EscState::SawEsc => {
                self.esc = if byte == b'[' {
                    EscState::SawBracket
                } else {
                    EscState::Idle
                };
                return EditorAction::None;
            }
            EscState::SawBracket => {
                self.esc = EscState::Idle;
                return match byte {
                    b'A' => self.history_prev(history),
                    b'B' => self.history_next(history),
                    _ => EditorAction::None,
                };
            }
            EscState::Idle => {}
        }

        match byte {
            0x03 | 0x04 => EditorAction::Terminate,
            0x7F | 0x08 => {
                if self.buffer.pop().is_some() {
                    EditorAction::Redraw
                } else {
                    EditorAction::None
                }
            }
            0x09 => EditorAction::Complete,
            b'?' => EditorAction::Help,
            0x0D | 0x0A => {
                self.hist_cursor = None;
                EditorAction::Submit(std::mem::take(&mut self.buffer))
            }
            0x1B => {
                self.esc = EscState::SawEsc;
                EditorAction::None
            }
            0x20..=0x7E => {
                if self.buffer.len() < MAX_LINE_LEN {
                    self.buffer.push(byte as char);
                    EditorAction::Echo(byte)
                } else {
                    EditorAction::None
                }
            }
            _ => EditorAction::None,
        }
    }

    fn history_prev(&mut self, history: &History) -> EditorAction {
        if history.is_empty() {
            self.buffer.clear();
            return EditorAction::Redraw;
        }
        let cursor = match self.hist_cursor {
            None => history.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.hist_cursor = Some(cursor);
        self.buffer = history.get(cursor).unwrap_or_default().to_owned();
        EditorAction::Redraw
    }

    fn history_next(&mut self, history: &History) -> EditorAction {
        match self.hist_cursor {
            None => EditorAction::None,
            Some(i) if i + 1 < history.len() => {
                self.hist_cursor = Some(i + 1);
                self.buffer = history.get(i + 1).unwrap_or_default().to_owned();
                EditorAction::Redraw
            }
            Some(_) => {
                self.hist_cursor = None;
                self.buffer.clear();
                EditorAction::Redraw
            }
        }
    }
}
