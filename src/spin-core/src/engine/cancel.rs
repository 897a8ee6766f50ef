// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Cooperative cancellation shared between the controlling side and the
//! run worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Create a connected handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

/// Controlling side. Cloning shares the same flag.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Worker side, checked at every suspension point.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested. Never resolves if the
    /// handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleep for `duration` unless cancelled first.
    /// Returns true when the full duration elapsed.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_completes_without_cancel() {
        let (_handle, mut token) = cancel_pair();
        assert!(token.sleep(Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let (handle, mut token) = cancel_pair();
        let sleeper = tokio::spawn(async move { token.sleep(Duration::from_secs(600)).await });
        handle.cancel();
        let finished = tokio::time::timeout(Duration::from_secs(5), sleeper)
            .await
            .expect("cancel should wake the sleeper")
            .unwrap();
        assert!(!finished);
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_sleep() {
        let (handle, mut token) = cancel_pair();
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(!token.sleep(Duration::from_secs(600)).await);
    }
}
