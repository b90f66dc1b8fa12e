//! Cancellation for suspending calls
//!
//! An [`AbortController`] owns a watch channel; every [`AbortSignal`] taken
//! from it observes the same flag. Aborting is sticky.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Operation aborted")]
pub struct Aborted;

#[derive(Debug, Clone)]
pub struct AbortController {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl AbortSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_aborted(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the controller aborts. Pending forever otherwise,
    /// including after the controller is dropped.
    pub async fn aborted(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Run `future` unless the signal fires first
    pub async fn race<F: Future>(&self, future: F) -> Result<F::Output, Aborted> {
        if self.is_aborted() {
            return Err(Aborted);
        }
        tokio::select! {
            biased;
            _ = self.aborted() => Err(Aborted),
            output = future => Ok(output),
        }
    }
}
