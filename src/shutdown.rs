// shutdown.rs - Tracks running commands so shutdown can wait for them

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct InFlight {
    active: AtomicUsize,
    closed: AtomicBool,
    idle: Notify,
}

/// Held by a running command; dropping it marks the command finished.
#[derive(Debug)]
pub struct InFlightGuard {
    owner: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.owner.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.owner.idle.notify_waiters();
        }
    }
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a command. `None` once shutdown has started.
    pub fn enter(self: &Arc<Self>) -> Option<InFlightGuard> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        // Re-check so a command racing with close() is not left uncounted.
        if self.closed.load(Ordering::SeqCst) {
            if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.idle.notify_waiters();
            }
            return None;
        }
        Some(InFlightGuard {
            owner: Arc::clone(self),
        })
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Stop accepting commands and wait for the running ones, at most `timeout`.
    /// Returns `false` if some were still running at the deadline; they are
    /// left to finish on their own.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.close();
        let wait = async {
            loop {
                let notified = self.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.active() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_with_nothing_running() {
        let in_flight = InFlight::new();
        assert!(in_flight.drain(Duration::from_millis(10)).await);
        assert!(in_flight.enter().is_none());
    }

    #[tokio::test]
    async fn test_drain_waits_for_running_command() {
        let in_flight = InFlight::new();
        let guard = in_flight.enter().unwrap();
        assert_eq!(in_flight.active(), 1);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(guard);
        });

        assert!(in_flight.drain(Duration::from_secs(5)).await);
        assert_eq!(in_flight.active(), 0);
    }

    #[tokio::test]
    async fn test_drain_gives_up_at_deadline() {
        let in_flight = InFlight::new();
        let _guard = in_flight.enter().unwrap();
        assert!(!in_flight.drain(Duration::from_millis(20)).await);
        assert_eq!(in_flight.active(), 1);
    }
}
