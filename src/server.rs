// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: TCP listener, session registry, idle reaper, and shutdown ordering.
// Author: Lukas Bower

//! Shell server: accept loop, session registry, idle reaping, shutdown.
//!
//! The view registry and command trees are frozen when the listener starts
//! and shared immutably with every worker. The live-session registry is the
//! only shared mutable state, guarded by a single reader-writer lock:
//! writers on accept and close, readers on reaper sweeps.

use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::grammar::GrammarError;
use crate::session::run_session;
use crate::view::{ViewRegistry, ROOT_VIEW};
use crate::CommandHandler;

/// Poll interval of the non-blocking accept loop.
const ACCEPT_POLL: Duration = Duration::from_millis(50);
/// Nominal reaper sweep interval; clamped down for short idle thresholds.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);
/// Default bound on graceful shutdown.
const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

/// Errors surfaced by the server lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `start` on a running server, or `set_config` after `start`.
    #[error("shell server is already running; stop it first")]
    AlreadyRunning,
    /// `stop` on a server that was never started.
    #[error("shell server is not running")]
    NotRunning,
    /// The listen socket could not be bound.
    #[error("failed to bind port {port}")]
    Bind {
        /// Requested port.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A configuration adjustment failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

struct SessionHandle {
    stream: TcpStream,
    last_active: Mutex<Instant>,
    peer: SocketAddr,
}

struct Shared {
    registry: ViewRegistry,
    config: Config,
    sessions: RwLock<HashMap<u64, Arc<SessionHandle>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
    next_id: AtomicU64,
}

struct Running {
    shared: Arc<Shared>,
    accept: JoinHandle<()>,
    reaper: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Network-accessible hierarchical CLI server.
///
/// Commands and views are registered before [`ShellServer::start`]; the
/// registry is frozen at start and shared read-only with every session.
pub struct ShellServer {
    config: Config,
    registry: ViewRegistry,
    running: Option<Running>,
}

impl ShellServer {
    /// Create a server from a configuration bag.
    pub fn new(config: Config) -> Self {
        let registry = ViewRegistry::new(&config.prompt);
        Self {
            config,
            registry,
            running: None,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True while the listener is up.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Adjust one configuration value by string key. Rejected while the
    /// server is running; stop and restart to apply changes.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<(), ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }
        self.config.set(key, value)?;
        if key == "prompt" {
            self.registry.set_root_prompt(&self.config.prompt);
        }
        Ok(())
    }

    /// Register a command on the root view.
    pub fn register_command(
        &mut self,
        template: &str,
        description: &str,
        handler: CommandHandler,
    ) -> Result<(), GrammarError> {
        self.registry
            .register(ROOT_VIEW, template, description, handler, None)
    }

    /// Register a command on the root view with a multi-line detailed
    /// description; line *i* attaches to the path node at depth *i*.
    pub fn register_command_detailed(
        &mut self,
        template: &str,
        description: &str,
        handler: CommandHandler,
        detail: &str,
    ) -> Result<(), GrammarError> {
        self.registry
            .register(ROOT_VIEW, template, description, handler, Some(detail))
    }

    /// Register a command on a named child view, creating it on demand.
    pub fn register_view_command(
        &mut self,
        view: &str,
        template: &str,
        description: &str,
        handler: CommandHandler,
    ) -> Result<(), GrammarError> {
        self.registry
            .register(view, template, description, handler, None)
    }

    /// Register a child-view command with a detailed description.
    pub fn register_view_command_detailed(
        &mut self,
        view: &str,
        template: &str,
        description: &str,
        handler: CommandHandler,
        detail: &str,
    ) -> Result<(), GrammarError> {
        self.registry
            .register(view, template, description, handler, Some(detail))
    }

    /// Create a child view explicitly.
    pub fn create_view(&mut self, name: &str, description: &str) -> Result<(), GrammarError> {
        self.registry.create_view(name, description)
    }

    /// Bind the listener and start the accept and reaper threads.
    pub fn start(&mut self) -> Result<(), ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }
        let port = self.config.port;
        let listener =
            TcpListener::bind(("0.0.0.0", port)).map_err(|source| ServerError::Bind { port, source })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ServerError::Bind { port, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { port, source })?;

        for view in self.registry.views() {
            debug!("command tree for view '{}':\n{}", view.name(), view.tree().render());
        }

        let shared = Arc::new(Shared {
            registry: self.registry.clone(),
            config: self.config.clone(),
            sessions: RwLock::new(HashMap::new()),
            workers: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        });

        let accept_shared = Arc::clone(&shared);
        let accept = thread::spawn(move || accept_loop(listener, accept_shared));
        let reaper_shared = Arc::clone(&shared);
        let reaper = thread::spawn(move || reaper_loop(reaper_shared));

        info!("telnet shell listening on {local_addr}");
        self.running = Some(Running {
            shared,
            accept,
            reaper,
            local_addr,
        });
        Ok(())
    }

    /// Stop with the default shutdown deadline.
    pub fn stop(&mut self) -> Result<(), ServerError> {
        self.stop_with_deadline(DEFAULT_SHUTDOWN_DEADLINE)
    }

    /// Stop the listener, close every session, and join workers until
    /// `deadline` elapses; stragglers are force-closed and detached.
    pub fn stop_with_deadline(&mut self, deadline: Duration) -> Result<(), ServerError> {
        let Some(running) = self.running.take() else {
            return Err(ServerError::NotRunning);
        };
        running.shared.shutdown.store(true, Ordering::SeqCst);
        let _ = running.accept.join();

        if let Ok(sessions) = running.shared.sessions.read() {
            for (id, handle) in sessions.iter() {
                debug!("closing session {id} to {}", handle.peer);
                let _ = handle.stream.shutdown(Shutdown::Both);
            }
        }
        let _ = running.reaper.join();

        let workers = match running.shared.workers.lock() {
            Ok(mut workers) => workers.drain(..).collect::<Vec<_>>(),
            Err(_) => Vec::new(),
        };
        let expiry = Instant::now() + deadline;
        for worker in workers {
            while !worker.is_finished() && Instant::now() < expiry {
                thread::sleep(Duration::from_millis(5));
            }
            if worker.is_finished() {
                let _ = worker.join();
            } else {
                warn!("session worker did not stop before the deadline; detaching");
            }
        }
        info!("telnet shell stopped");
        Ok(())
    }
}

impl Drop for ShellServer {
    fn drop(&mut self) {
        if self.running.is_some() {
            let _ = self.stop_with_deadline(Duration::from_secs(1));
        }
    }
}

fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    while !shared.shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => spawn_session(stream, peer, &shared),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(err) => {
                if shared.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                warn!("accept failed: {err}");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn spawn_session(stream: TcpStream, peer: SocketAddr, shared: &Arc<Shared>) {
    if let Err(err) = stream.set_nonblocking(false) {
        warn!("failed to configure session socket for {peer}: {err}");
        return;
    }
    let control = match stream.try_clone() {
        Ok(clone) => clone,
        Err(err) => {
            warn!("failed to clone session socket for {peer}: {err}");
            return;
        }
    };

    let id = shared.next_id.fetch_add(1, Ordering::SeqCst);
    let handle = Arc::new(SessionHandle {
        stream: control,
        last_active: Mutex::new(Instant::now()),
        peer,
    });
    if let Ok(mut sessions) = shared.sessions.write() {
        sessions.insert(id, Arc::clone(&handle));
    }
    debug!("session {id} connected from {peer}");

    let worker_shared = Arc::clone(shared);
    let worker = thread::spawn(move || {
        let result = run_session(
            stream,
            &worker_shared.registry,
            &worker_shared.config,
            &handle.last_active,
        );
        if let Err(err) = result {
            debug!("session {id} ended with I/O error: {err}");
        }
        if let Ok(mut sessions) = worker_shared.sessions.write() {
            sessions.remove(&id);
        }
        debug!("session {id} closed");
    });
    if let Ok(mut workers) = shared.workers.lock() {
        workers.push(worker);
    }
}

fn reaper_loop(shared: Arc<Shared>) {
    let idle = shared.config.idle_timeout();
    let sweep = SWEEP_INTERVAL
        .min(idle / 2)
        .max(Duration::from_millis(10));
    loop {
        sleep_unless_shutdown(&shared.shutdown, sweep);
        if shared.shutdown.load(Ordering::SeqCst) {
            return;
        }
        let stale: Vec<(u64, Arc<SessionHandle>)> = match shared.sessions.read() {
            Ok(sessions) => sessions
                .iter()
                .filter(|(_, handle)| {
                    handle
                        .last_active
                        .lock()
                        .map(|stamp| stamp.elapsed() > idle)
                        .unwrap_or(false)
                })
                .map(|(id, handle)| (*id, Arc::clone(handle)))
                .collect(),
            Err(_) => Vec::new(),
        };
        for (id, handle) in stale {
            info!("reaping idle session {id} to {}", handle.peer);
            let _ = handle.stream.shutdown(Shutdown::Both);
        }
    }
}

/// Sleep for `total`, waking early when the shutdown flag is set.
fn sleep_unless_shutdown(flag: &AtomicBool, total: Duration) {
    let until = Instant::now() + total;
    while Instant::now() < until {
        if flag.load(Ordering::SeqCst) {
            return;
        }
        thread::sleep(Duration::from_millis(10).min(total));
    }
}
