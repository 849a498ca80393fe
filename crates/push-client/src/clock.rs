// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Injectable time source for the reconnect backoff and ping loops.
//!
//! Production code always uses [`SystemClock`]; tests that need to assert
//! on ordering without sleeping real wall-clock time can substitute
//! [`ManualClock`].

use std::time::{Duration, Instant};

#[tonic::async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn after(&self, d: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[tonic::async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn after(&self, d: Duration) {
        tokio::time::sleep(d).await;
    }
}

/// A clock driven by an explicit advance, for tests that assert ordering
/// between the backoff loop and other events without real delays. `after`
/// resolves as soon as the waiter registers; callers that need true
/// interleaving control should drive the waiter's task and `advance`
/// concurrently via `tokio::join!`.
#[cfg(test)]
pub mod test_support {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use tokio::sync::Notify;

    use super::Clock;

    #[derive(Default)]
    pub struct ManualClock {
        elapsed_ms: AtomicU64,
        notify: Notify,
        epoch: once_cell_lite::OnceInstant,
    }

    mod once_cell_lite {
        use std::sync::OnceLock;
        use std::time::Instant;

        #[derive(Default)]
        pub struct OnceInstant(OnceLock<Instant>);

        impl OnceInstant {
            pub fn get_or_init(&self) -> Instant {
                *self.0.get_or_init(Instant::now)
            }
        }
    }

    impl ManualClock {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn advance(&self, d: Duration) {
            self.elapsed_ms.fetch_add(d.as_millis() as u64, Ordering::SeqCst);
            self.notify.notify_waiters();
        }
    }

    #[tonic::async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.epoch.get_or_init() + Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
        }

        async fn after(&self, d: Duration) {
            let target = self.elapsed_ms.load(Ordering::SeqCst) + d.as_millis() as u64;
            loop {
                if self.elapsed_ms.load(Ordering::SeqCst) >= target {
                    return;
                }
                self.notify.notified().await;
            }
        }
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
