// src/cache/coalesce.rs
//! Request coalescing (singleflight pattern)
//!
//! When several workers resolve the same key concurrently, only one of them
//! does the work. The others wait for its result and share it, so two
//! records pointing at the same package or license URL cost one network
//! round-trip.

use crate::error::{Error, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Outcome broadcast from the leader to its waiters
#[derive(Clone)]
enum FlightResult {
    Resolved(String),
    Unresolved,
    Failed(String),
    Canceled,
}

impl FlightResult {
    fn from_result(result: &Result<Option<String>>) -> Self {
        match result {
            Ok(Some(text)) => FlightResult::Resolved(text.clone()),
            Ok(None) => FlightResult::Unresolved,
            Err(Error::Canceled) => FlightResult::Canceled,
            Err(e) => FlightResult::Failed(e.to_string()),
        }
    }
}

/// Request coalescer implementing the singleflight pattern
pub struct RequestCoalescer {
    /// In-flight resolutions (key -> broadcast sender)
    inflight: DashMap<String, broadcast::Sender<FlightResult>>,
    /// Count of coalesced (deduplicated) requests
    coalesced_count: AtomicU64,
}

/// Deregisters the leader's flight, also when the leader is dropped mid-await
struct InflightGuard<'a> {
    inflight: &'a DashMap<String, broadcast::Sender<FlightResult>>,
    key: &'a str,
    finished: bool,
}

impl InflightGuard<'_> {
    fn finish(mut self) -> Option<broadcast::Sender<FlightResult>> {
        self.finished = true;
        self.inflight.remove(self.key).map(|(_, tx)| tx)
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // Dropping the sender wakes waiters with `Closed`; they retry
            self.inflight.remove(self.key);
        }
    }
}

impl RequestCoalescer {
    /// Create a new request coalescer
    pub fn new() -> Self {
        Self {
            inflight: DashMap::new(),
            coalesced_count: AtomicU64::new(0),
        }
    }

    /// Coalesce concurrent resolutions of the same key
    ///
    /// If another task is already resolving `key`, wait for that result.
    /// Otherwise run `resolve` and broadcast its result to any waiters.
    /// A waiter whose leader was canceled or dropped retries, possibly
    /// becoming the leader itself.
    pub async fn coalesce<F, Fut>(&self, key: &str, resolve: F) -> Result<Option<String>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<String>>>,
    {
        loop {
            // The entry API makes "check then register" atomic per key
            let mut rx = match self.inflight.entry(key.to_string()) {
                Entry::Occupied(flight) => flight.get().subscribe(),
                Entry::Vacant(slot) => {
                    let (tx, _rx) = broadcast::channel::<FlightResult>(1);
                    slot.insert(tx);
                    break;
                }
            };

            debug!("Coalescing resolution for {}", key);
            self.coalesced_count.fetch_add(1, Ordering::Relaxed);

            match rx.recv().await {
                Ok(FlightResult::Resolved(text)) => return Ok(Some(text)),
                Ok(FlightResult::Unresolved) => return Ok(None),
                Ok(FlightResult::Failed(msg)) => return Err(Error::Coalesced(msg)),
                Ok(FlightResult::Canceled) | Err(_) => {
                    debug!("Leader for {} went away, retrying", key);
                }
            }
        }

        let guard = InflightGuard {
            inflight: &self.inflight,
            key,
            finished: false,
        };

        let result = resolve().await;

        // Deregister before sending so nobody subscribes after the send
        if let Some(tx) = guard.finish() {
            let _ = tx.send(FlightResult::from_result(&result));
        }

        result
    }

    /// Get the count of coalesced (deduplicated) requests
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced_count.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn inflight_count(&self) -> usize {
        self.inflight.len()
    }
}

impl Default for RequestCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_single_request() {
        let coalescer = RequestCoalescer::new();

        let result = coalescer
            .coalesce("Serilog", || async { Ok(Some("MIT".to_string())) })
            .await;

        assert_eq!(result.unwrap().as_deref(), Some("MIT"));
        assert_eq!(coalescer.coalesced_count(), 0);
    }

    #[tokio::test]
    async fn test_coalesced_requests() {
        let coalescer = Arc::new(RequestCoalescer::new());
        let call_count = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let coalescer = Arc::clone(&coalescer);
            let call_count = Arc::clone(&call_count);

            handles.push(tokio::spawn(async move {
                coalescer
                    .coalesce("https://opensource.org/licenses/MIT", || {
                        let count = Arc::clone(&call_count);
                        async move {
                            sleep(Duration::from_millis(100)).await;
                            count.fetch_add(1, Ordering::SeqCst);
                            Ok(Some("MIT".to_string()))
                        }
                    })
                    .await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap();
            assert_eq!(result.unwrap().as_deref(), Some("MIT"));
        }

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.coalesced_count(), 4);
    }

    #[tokio::test]
    async fn test_different_keys_not_coalesced() {
        let coalescer = RequestCoalescer::new();

        let a = coalescer
            .coalesce("a", || async { Ok(Some("A".to_string())) })
            .await
            .unwrap();
        let b = coalescer.coalesce("b", || async { Ok(None) }).await.unwrap();

        assert_eq!(a.as_deref(), Some("A"));
        assert_eq!(b, None);
        assert_eq!(coalescer.coalesced_count(), 0);
    }

    #[tokio::test]
    async fn test_error_propagation() {
        let coalescer = RequestCoalescer::new();

        let result = coalescer
            .coalesce("a", || async {
                Err(Error::Decode("invalid base64 content".to_string()))
            })
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_inflight_cleanup() {
        let coalescer = RequestCoalescer::new();
        assert_eq!(coalescer.inflight_count(), 0);

        let _ = coalescer.coalesce("a", || async { Ok(None) }).await;
        assert_eq!(coalescer.inflight_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_leader_hands_over() {
        let coalescer = Arc::new(RequestCoalescer::new());

        let leader = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move {
                coalescer
                    .coalesce("k", || async {
                        sleep(Duration::from_secs(60)).await;
                        Ok(Some("never".to_string()))
                    })
                    .await
            })
        };
        while coalescer.inflight_count() == 0 {
            sleep(Duration::from_millis(5)).await;
        }

        let waiter = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move {
                coalescer
                    .coalesce("k", || async { Ok(Some("second".to_string())) })
                    .await
            })
        };
        while coalescer.coalesced_count() == 0 {
            sleep(Duration::from_millis(5)).await;
        }

        leader.abort();
        let result = waiter.await.unwrap().unwrap();
        assert_eq!(result.as_deref(), Some("second"));
        assert_eq!(coalescer.inflight_count(), 0);
    }
}
