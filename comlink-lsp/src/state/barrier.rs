//! Gate that holds whole-workspace queries back while a bootstrap runs

use std::sync::Arc;

use tokio::sync::watch;

/// Counts in-flight bootstraps. Cloning shares the counter.
#[derive(Debug, Clone)]
pub struct BootstrapBarrier {
    pending: Arc<watch::Sender<usize>>,
}

impl BootstrapBarrier {
    #[must_use]
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0);
        Self {
            pending: Arc::new(pending),
        }
    }

    /// Mark a bootstrap as started. The barrier opens again once every guard
    /// handed out has been dropped.
    #[must_use = "the barrier reopens as soon as the guard is dropped"]
    pub fn enter(&self) -> BootstrapGuard {
        self.pending.send_modify(|pending| *pending += 1);
        BootstrapGuard {
            pending: Arc::clone(&self.pending),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        *self.pending.borrow() > 0
    }

    /// Resolve once no bootstrap is in flight.
    pub async fn wait(&self) {
        let mut pending = self.pending.subscribe();
        if pending.wait_for(|pending| *pending == 0).await.is_err() {
            tracing::warn!("bootstrap barrier closed while waiting");
        }
    }
}

impl Default for BootstrapBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of one bootstrap.
#[derive(Debug)]
pub struct BootstrapGuard {
    pending: Arc<watch::Sender<usize>>,
}

impl Drop for BootstrapGuard {
    fn drop(&mut self) {
        self.pending
            .send_modify(|pending| *pending = pending.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_without_bootstrap_resolves() {
        let barrier = BootstrapBarrier::new();
        assert!(!barrier.is_pending());
        barrier.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_blocks_until_last_guard_drops() {
        let barrier = BootstrapBarrier::new();
        let first = barrier.enter();
        let second = barrier.enter();

        let waiter = tokio::spawn({
            let barrier = barrier.clone();
            async move { barrier.wait().await }
        });

        drop(first);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        assert!(barrier.is_pending());

        drop(second);
        assert!(tokio::time::timeout(Duration::from_secs(1), waiter).await.is_ok());
        assert!(!barrier.is_pending());
    }
}
