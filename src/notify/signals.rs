//! Process signal handling.
//!
//! Receiving a signal and terminating the process are decoupled: the signal
//! listener only records a [`ShutdownRequest`] on a [`ShutdownController`],
//! the watcher loop observes it through its [`ShutdownSignal`] and returns,
//! and the binary exits with the recorded code.

use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
#[cfg(unix)]
use tokio::signal::unix::SignalKind;

/// Hangup.
#[cfg(unix)]
pub const SIGHUP: i32 = SignalKind::hangup().as_raw_value();
/// Interrupt (Ctrl+C).
#[cfg(unix)]
pub const SIGINT: i32 = SignalKind::interrupt().as_raw_value();
/// Termination request.
#[cfg(unix)]
pub const SIGTERM: i32 = SignalKind::terminate().as_raw_value();

/// Hangup.
#[cfg(not(unix))]
pub const SIGHUP: i32 = 1;
/// Interrupt (Ctrl+C).
#[cfg(not(unix))]
pub const SIGINT: i32 = 2;
/// Termination request.
#[cfg(not(unix))]
pub const SIGTERM: i32 = 15;

/// Exit codes for signal-triggered shutdown are `EXIT_CODE_BASE + signo`.
pub const EXIT_CODE_BASE: i32 = 128;

/// What to do about a received signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Log and keep running.
    Continue,
    /// Stop the watcher and exit with this code.
    Exit(i32),
    /// Not a signal the watcher handles; log and ignore.
    Ignore,
}

/// Map a signal number to the watcher's reaction.
pub fn disposition(signo: i32) -> SignalAction {
    match signo {
        SIGHUP => SignalAction::Continue,
        SIGINT | SIGTERM => SignalAction::Exit(EXIT_CODE_BASE + signo),
        _ => SignalAction::Ignore,
    }
}

fn signal_name(signo: i32) -> &'static str {
    match signo {
        SIGHUP => "SIGHUP",
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        _ => "UNKNOWN",
    }
}

/// A recorded request to stop the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownRequest {
    /// Signal that triggered the request.
    pub signal: i32,
    /// Process exit code to use.
    pub exit_code: i32,
}

/// Create a connected controller/signal pair.
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (tx, rx) = watch::channel(None);
    (
        ShutdownController { tx: Arc::new(tx) },
        ShutdownSignal { rx },
    )
}

/// Records shutdown requests. Cloned into the signal listener.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    tx: Arc<watch::Sender<Option<ShutdownRequest>>>,
}

impl ShutdownController {
    /// React to signal `signo` and return the action taken.
    pub fn handle_signal(&self, signo: i32) -> SignalAction {
        let action = disposition(signo);
        match action {
            SignalAction::Continue => {
                tracing::info!(
                    signal = signo,
                    "signal '{}' is caught and ignoring..",
                    signal_name(signo)
                );
            }
            SignalAction::Exit(exit_code) => {
                tracing::info!(
                    signal = signo,
                    "signal '{}' is caught and exiting...",
                    signal_name(signo)
                );
                self.request(ShutdownRequest {
                    signal: signo,
                    exit_code,
                });
            }
            SignalAction::Ignore => {
                tracing::info!(signal = signo, "invalid signal - ignoring..");
            }
        }
        action
    }

    /// Record a shutdown request. The first request wins.
    pub fn request(&self, request: ShutdownRequest) {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(request);
                true
            } else {
                false
            }
        });
    }

    /// Whether a shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

/// Observes shutdown requests. Passed into the watcher loop.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<ShutdownRequest>>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been requested.
    ///
    /// Never resolves if every controller is dropped without a request.
    pub async fn requested(&mut self) -> ShutdownRequest {
        loop {
            if let Some(request) = *self.rx.borrow_and_update() {
                return request;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drive `future` to completion unless shutdown is requested first.
    ///
    /// Returns the request instead of the output when shutdown wins; a
    /// request already pending wins without polling `future`.
    pub async fn until_requested<F: Future>(
        &mut self,
        future: F,
    ) -> std::result::Result<F::Output, ShutdownRequest> {
        tokio::select! {
            biased;
            request = self.requested() => Err(request),
            output = future => Ok(output),
        }
    }

    /// The pending request, if any, without waiting.
    pub fn peek(&self) -> Option<ShutdownRequest> {
        *self.rx.borrow()
    }
}

/// Listen for SIGHUP, SIGINT, SIGTERM, SIGUSR1 and SIGUSR2 and feed them to
/// `controller`.
///
/// Handlers are installed before this returns, so the default disposition
/// (terminate) no longer applies to these signals.
///
/// # Errors
///
/// Returns an error if a handler cannot be registered.
#[cfg(unix)]
pub fn spawn_signal_listener(
    controller: ShutdownController,
) -> Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::signal;

    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut user1 = signal(SignalKind::user_defined1())?;
    let mut user2 = signal(SignalKind::user_defined2())?;

    Ok(tokio::spawn(async move {
        loop {
            let kind = tokio::select! {
                Some(()) = hangup.recv() => SignalKind::hangup(),
                Some(()) = interrupt.recv() => SignalKind::interrupt(),
                Some(()) = terminate.recv() => SignalKind::terminate(),
                Some(()) = user1.recv() => SignalKind::user_defined1(),
                Some(()) = user2.recv() => SignalKind::user_defined2(),
                else => break,
            };
            controller.handle_signal(kind.as_raw_value());
        }
    }))
}

/// Listen for Ctrl+C and feed it to `controller` as SIGINT.
///
/// # Errors
///
/// Never fails on this platform; the signature matches the unix listener.
#[cfg(not(unix))]
pub fn spawn_signal_listener(
    controller: ShutdownController,
) -> Result<tokio::task::JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            controller.handle_signal(SIGINT);
        }
    }))
}
