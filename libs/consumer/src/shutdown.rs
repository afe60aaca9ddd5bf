use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopSignal::Interrupt => f.write_str("SIGINT"),
            StopSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  ShutdownCoordinator
// ═══════════════════════════════════════════════════════════════

/// Merges OS termination signals and an application cancellation token.
///
/// Both channels are level-triggered: once a signal has been delivered or
/// the token cancelled, every later wait resolves immediately. Only the
/// first delivered signal is recorded.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    signal: Arc<watch::Sender<Option<StopSignal>>>,
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(token: CancellationToken) -> Self {
        let (signal, _) = watch::channel(None);
        Self {
            signal: Arc::new(signal),
            token,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Record a termination signal. Returns `false` if one was already recorded.
    pub fn deliver(&self, signal: StopSignal) -> bool {
        self.signal.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(signal);
            true
        })
    }

    /// Signal recorded so far, if any.
    pub fn signal(&self) -> Option<StopSignal> {
        *self.signal.borrow()
    }

    /// Resolves once a termination signal has been delivered.
    pub async fn signalled(&self) -> StopSignal {
        let mut rx = self.signal.subscribe();
        loop {
            if let Some(signal) = *rx.borrow_and_update() {
                return signal;
            }
            if rx.changed().await.is_err() {
                // Sender lives as long as `self`.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Forward SIGINT/SIGTERM into this coordinator from a background task.
    #[cfg(unix)]
    pub fn listen_os_signals(&self) -> std::io::Result<JoinHandle<()>> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let coordinator = self.clone();
        Ok(tokio::spawn(async move {
            loop {
                let sig = tokio::select! {
                    Some(()) = sigint.recv() => StopSignal::Interrupt,
                    Some(()) = sigterm.recv() => StopSignal::Terminate,
                    else => break,
                };
                if coordinator.deliver(sig) {
                    tracing::info!(signal = %sig, "caught signal, draining");
                } else {
                    tracing::info!(signal = %sig, "already draining, signal ignored");
                }
            }
        }))
    }

    #[cfg(not(unix))]
    pub fn listen_os_signals(&self) -> std::io::Result<JoinHandle<()>> {
        let coordinator = self.clone();
        Ok(tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if coordinator.deliver(StopSignal::Interrupt) {
                    tracing::info!("caught ctrl-c, draining");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn first_signal_wins() {
        let coordinator = ShutdownCoordinator::new(CancellationToken::new());
        assert_eq!(coordinator.signal(), None);
        assert!(coordinator.deliver(StopSignal::Terminate));
        assert!(!coordinator.deliver(StopSignal::Interrupt));
        assert_eq!(coordinator.signal(), Some(StopSignal::Terminate));
        assert_eq!(coordinator.signalled().await, StopSignal::Terminate);
    }

    #[tokio::test]
    async fn waiter_wakes_on_later_delivery() {
        let coordinator = ShutdownCoordinator::new(CancellationToken::new());
        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.signalled().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        coordinator.deliver(StopSignal::Interrupt);
        let got = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, StopSignal::Interrupt);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_reaches_the_coordinator() {
        let coordinator = ShutdownCoordinator::new(CancellationToken::new());
        let listener = coordinator.listen_os_signals().unwrap();

        // SAFETY: the listener has replaced the default SIGTERM disposition.
        let rc = unsafe { libc::raise(libc::SIGTERM) };
        assert_eq!(rc, 0);

        let got = tokio::time::timeout(Duration::from_secs(5), coordinator.signalled())
            .await
            .expect("SIGTERM was not forwarded");
        assert_eq!(got, StopSignal::Terminate);
        assert!(!coordinator.token().is_cancelled());
        listener.abort();
    }

    #[tokio::test]
    async fn clones_share_the_token() {
        let coordinator = ShutdownCoordinator::new(CancellationToken::new());
        let other = coordinator.clone();
        coordinator.token().cancel();
        assert!(other.token().is_cancelled());
        assert_eq!(other.signal(), None);
    }
}
