//! Process-wide Ctrl-C handling.
//!
//! One listener is installed at startup and lives for the whole run. It
//! flips a shared `watch` flag, so an interrupt that arrives while nothing
//! is awaiting it (mid-fetch, mid-ingestion) is still seen by the next
//! [`Shutdown::requested`]. A second interrupt exits immediately.

use tokio::sync::watch;
use tracing::warn;

use crate::error::Result;

/// Exit status used when the user forces a quit.
const FORCED_EXIT_CODE: i32 = 130;

/// Cloneable view of the interrupt flag.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// A flag with its sending side, not tied to any signal.
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// Register the SIGINT handler and spawn the task that feeds the flag.
    ///
    /// Must be called from inside the tokio runtime. On Unix the handler is
    /// registered before this returns.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the signal handler cannot be registered.
    pub fn install() -> Result<Self> {
        let (tx, shutdown) = Self::channel();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigint = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                while sigint.recv().await.is_some() {
                    notify(&tx);
                }
            });
        }

        #[cfg(not(unix))]
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                notify(&tx);
            }
        });

        Ok(shutdown)
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once an interrupt has been received, immediately if one
    /// already was.
    pub async fn requested(&mut self) {
        let closed = self.rx.wait_for(|flag| *flag).await.is_err();
        if closed {
            // Sender gone: no interrupt can arrive any more.
            std::future::pending::<()>().await;
        }
    }
}

fn notify(tx: &watch::Sender<bool>) {
    if *tx.borrow() {
        warn!("Second interrupt, exiting now");
        std::process::exit(FORCED_EXIT_CODE);
    }
    warn!("Interrupt received, stopping; press Ctrl-C again to force quit");
    tx.send_replace(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn interrupt_before_waiting_is_not_lost() {
        let (tx, mut shutdown) = Shutdown::channel();
        assert!(!shutdown.is_requested());
        notify(&tx);

        let mut later = shutdown.clone();
        assert!(timeout(Duration::from_millis(100), shutdown.requested()).await.is_ok());
        assert!(timeout(Duration::from_millis(100), later.requested()).await.is_ok());
        assert!(later.is_requested());
    }

    #[tokio::test]
    async fn quiet_flag_keeps_waiting() {
        let (_tx, mut shutdown) = Shutdown::channel();
        assert!(timeout(Duration::from_millis(50), shutdown.requested()).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigint_during_work_is_observed_afterwards() {
        let mut shutdown = Shutdown::install().unwrap();
        let status = std::process::Command::new("kill")
            .args(["-INT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        // Busy with something else while the signal lands.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(timeout(Duration::from_secs(5), shutdown.requested()).await.is_ok());
        assert!(shutdown.is_requested());
    }
}
