//! Runs a target under the debugger and captures its output
//!
//! Standard output feeds the debug log and standard error the application
//! log. A target killed by a signal is treated as crashed and, when restart is
//! enabled, launched again. Stopping is always clean: it never counts as a
//! crash and never triggers a restart.

use anyhow::Result;
use ekos_debugger_core::{Invocation, Stream, TargetLogs};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Grace period between SIGTERM and a hard kill
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for pipes to close once the process is gone; orphaned
/// grandchildren can hold them open indefinitely
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Events buffered per subscriber; a crash backtrace arrives as a burst
const EVENT_CAPACITY: usize = 16 * 1024;

/// Lifecycle and output events of a supervised target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Process launched
    Started { pid: Option<u32> },
    /// One line of output
    Output { stream: Stream, line: String },
    /// Process exited on its own
    Exited { code: Option<i32> },
    /// Process was killed by a signal
    Crashed { signal: Option<i32> },
    /// Relaunching after a crash
    Restarting,
    /// Stopped on request
    Stopped,
    /// Process could not be launched
    SpawnFailed(String),
}

/// How a supervised session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Exited(Option<i32>),
    Crashed(Option<i32>),
    Stopped,
}

enum Waited {
    Finished(std::io::Result<ExitStatus>),
    StopRequested,
}

/// Supervisor for one debugger session.
///
/// The event channel closes when the supervisor is dropped, so a subscriber
/// that reads until [`broadcast::error::RecvError::Closed`] sees every event
/// sent before that.
pub struct Supervisor {
    name: String,
    invocation: Invocation,
    restart_on_crash: bool,
    logs: Arc<RwLock<TargetLogs>>,
    event_tx: broadcast::Sender<SessionEvent>,
    stop_tx: watch::Sender<bool>,
}

impl Supervisor {
    /// Create a supervisor; nothing is launched until [`Supervisor::run`]
    pub fn new(name: impl Into<String>, invocation: Invocation, restart_on_crash: bool) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (stop_tx, _) = watch::channel(false);
        Self {
            name: name.into(),
            invocation,
            restart_on_crash,
            logs: Arc::new(RwLock::new(TargetLogs::default())),
            event_tx,
            stop_tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Copy of the logs captured so far
    pub async fn logs(&self) -> TargetLogs {
        self.logs.read().await.clone()
    }

    /// Ask a running session to stop
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Launch the target and supervise it until it exits, crashes without
    /// restart, or is stopped
    pub async fn run(&self) -> Result<SessionOutcome> {
        let mut stop_rx = self.stop_tx.subscribe();
        self.stop_tx.send_replace(false);

        loop {
            let mut child = match self.spawn() {
                Ok(child) => child,
                Err(e) => {
                    warn!(target_name = %self.name, error = %e, "Failed to launch");
                    let _ = self.event_tx.send(SessionEvent::SpawnFailed(e.to_string()));
                    return Err(e.into());
                }
            };

            let pid = child.id();
            info!(target_name = %self.name, ?pid, command = %self.invocation, "Started");
            let _ = self.event_tx.send(SessionEvent::Started { pid });

            let pumps = self.start_pumps(&mut child);

            let waited = tokio::select! {
                status = child.wait() => Waited::Finished(status),
                _ = stop_rx.wait_for(|stop| *stop) => Waited::StopRequested,
            };

            let status = match waited {
                Waited::Finished(status) => status?,
                Waited::StopRequested => {
                    terminate(&mut child).await;
                    drain(pumps).await;
                    info!(target_name = %self.name, "Stopped");
                    let _ = self.event_tx.send(SessionEvent::Stopped);
                    return Ok(SessionOutcome::Stopped);
                }
            };
            drain(pumps).await;

            match crash_signal(&status) {
                Some(signal) => {
                    warn!(target_name = %self.name, signal, "Crashed");
                    let _ = self.event_tx.send(SessionEvent::Crashed {
                        signal: Some(signal),
                    });
                    if self.restart_on_crash && !*stop_rx.borrow() {
                        info!(target_name = %self.name, "Restarting after crash");
                        let _ = self.event_tx.send(SessionEvent::Restarting);
                        continue;
                    }
                    return Ok(SessionOutcome::Crashed(Some(signal)));
                }
                None => {
                    info!(target_name = %self.name, code = ?status.code(), "Exited normally");
                    let _ = self.event_tx.send(SessionEvent::Exited {
                        code: status.code(),
                    });
                    return Ok(SessionOutcome::Exited(status.code()));
                }
            }
        }
    }

    fn spawn(&self) -> std::io::Result<Child> {
        Command::new(&self.invocation.program)
            .args(&self.invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }

    fn start_pumps(&self, child: &mut Child) -> Vec<JoinHandle<()>> {
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump(
                stdout,
                Stream::Debug,
                self.logs.clone(),
                self.event_tx.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump(
                stderr,
                Stream::App,
                self.logs.clone(),
                self.event_tx.clone(),
            )));
        }
        pumps
    }
}

/// Copy lines from a pipe into the logs until it closes
async fn pump<R>(
    reader: R,
    stream: Stream,
    logs: Arc<RwLock<TargetLogs>>,
    events: broadcast::Sender<SessionEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                // Lossy: gdb may print raw inferior bytes
                let line = String::from_utf8_lossy(&buf).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                logs.write().await.append(stream, &line);
                let _ = events.send(SessionEvent::Output { stream, line });
            }
            Err(e) => {
                warn!(?stream, error = %e, "Output pipe read failed");
                break;
            }
        }
    }
}

async fn drain(pumps: Vec<JoinHandle<()>>) {
    for mut pump in pumps {
        match timeout(DRAIN_TIMEOUT, &mut pump).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Output pump ended abnormally"),
            Err(_) => {
                debug!("Output pipe still open after exit, abandoning it");
                pump.abort();
            }
        }
    }
}

/// SIGTERM first so the debugger can take its inferior down, then kill
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            let sent = Command::new("kill")
                .args(["-TERM", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map(|s| s.success())
                .unwrap_or(false);
            if sent && timeout(TERMINATE_TIMEOUT, child.wait()).await.is_ok() {
                return;
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill process");
    }
}

#[cfg(unix)]
fn crash_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn crash_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
