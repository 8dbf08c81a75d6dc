use std::fmt;

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A process termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Ctrl+C / SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => write!(f, "interrupt"),
            Signal::Terminate => write!(f, "terminated"),
        }
    }
}

/// Wire process termination requests to `token`.
///
/// One task listens for OS signals and sends them over a channel, a second task
/// cancels the token for every signal it receives.
pub fn arm(token: CancellationToken) -> (JoinHandle<()>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(4);

    let listener = tokio::spawn(listen(tx));
    let forwarder = tokio::spawn(forward(rx, token));

    (listener, forwarder)
}

/// Cancel `token` for every received signal. Cancelling twice is harmless.
pub async fn forward(mut signals: Receiver<Signal>, token: CancellationToken) {
    while let Some(signal) = signals.recv().await {
        if token.is_cancelled() {
            tracing::info!(%signal, "signal received, shutdown already in progress");
        } else {
            tracing::info!(%signal, "signal received, shutdown started");
        }

        token.cancel();
    }
}

async fn listen(tx: Sender<Signal>) {
    let mut signals = match Signals::new() {
        Ok(signals) => signals,
        Err(error) => {
            tracing::error!(%error, "could not listen for termination signals");
            return;
        }
    };

    while let Some(signal) = signals.recv().await {
        if tx.send(signal).await.is_err() {
            break;
        }
    }
}

/// OS signal streams, installed once so no delivery falls between two receives.
#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> Option<Signal> {
        tokio::select! {
            Some(()) = self.interrupt.recv() => Some(Signal::Interrupt),
            Some(()) = self.terminate.recv() => Some(Signal::Terminate),
            else => None,
        }
    }
}

#[cfg(windows)]
struct Signals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl Signals {
    fn new() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> Option<Signal> {
        self.ctrl_c.recv().await.map(|()| Signal::Interrupt)
    }
}
