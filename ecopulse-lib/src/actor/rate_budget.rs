use core::time::Duration;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

const LOG_TARGET: &str = "    budget";

/// Shared request budget for one upstream provider.
///
/// Every worker talking to the same provider goes through the same budget: at most
/// `max_concurrent` requests are in flight, and once any worker hits a rate limit the
/// whole provider is parked until the window reopens. Pauses only ever extend, so
/// two workers reporting the same reset instant do not shorten each other's wait.
#[derive(Debug)]
pub struct RateBudget {
    name: &'static str,
    slots: Arc<Semaphore>,
    resume_at: Mutex<Option<Instant>>,
}

impl RateBudget {
    pub fn new(name: &'static str, max_concurrent: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
            resume_at: Mutex::new(None),
        })
    }

    /// Wait for any active pause to end, then take a request slot.
    ///
    /// The slot is released when the returned permit is dropped.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        loop {
            if let Some(resume_at) = self.pending_pause() {
                tokio::time::sleep_until(resume_at).await;
                continue;
            }

            let permit = Arc::clone(&self.slots)
                .acquire_owned()
                .await
                .expect("budget semaphore is never closed");

            // A pause may have started while we were queued for a slot
            if self.pending_pause().is_some() {
                drop(permit);
                continue;
            }

            return permit;
        }
    }

    /// Park the provider for `duration`. Returns `false` if an equal or longer pause is already active.
    pub fn pause_for(&self, duration: Duration) -> bool {
        let until = Instant::now() + duration;
        let mut guard = self.resume_at.lock().expect("lock not poisoned");

        if guard.is_some_and(|existing| existing >= until) {
            return false;
        }

        *guard = Some(until);
        log::debug!(target: LOG_TARGET, "{} paused for {}ms", self.name, duration.as_millis());
        true
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pending_pause().is_some()
    }

    fn pending_pause(&self) -> Option<Instant> {
        let mut guard = self.resume_at.lock().expect("lock not poisoned");
        match *guard {
            Some(until) if until > Instant::now() => Some(until),
            Some(_) => {
                *guard = None;
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn bounds_concurrent_requests() {
        let budget = RateBudget::new("test", 2);
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let budget = Arc::clone(&budget);
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    let _permit = budget.acquire().await;
                    let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                    _ = max_seen.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    _ = active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        _ = futures_util::future::join_all(tasks).await;

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn pause_holds_back_new_requests() {
        let budget = RateBudget::new("test", 4);
        assert!(budget.pause_for(Duration::from_millis(200)));
        assert!(budget.is_paused());

        let start = Instant::now();
        let _permit = budget.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(150));
        assert!(!budget.is_paused());
    }

    #[tokio::test]
    async fn shorter_pause_does_not_override_longer_one() {
        let budget = RateBudget::new("test", 1);
        assert!(budget.pause_for(Duration::from_secs(60)));
        assert!(!budget.pause_for(Duration::from_secs(1)));
        assert!(budget.pause_for(Duration::from_secs(120)));
    }
}
