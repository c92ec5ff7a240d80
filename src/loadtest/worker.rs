//! Worker task loop for load test execution.
//!
//! A run spawns `min(concurrency, total_requests)` workers. Each worker claims
//! the next unclaimed request slot from a shared [`SlotCounter`], performs one
//! [`sample`] for it, and reports a [`SampleReport`] through the bounded mpsc
//! channel. A worker exits when no slots remain.

use crate::loadtest::config::LoadTestConfig;
use crate::loadtest::metrics::SampleReport;
use crate::loadtest::sampler::{sample, SampleOutcome, Transport};

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Hands out request slots `0..total` exactly once each.
///
/// Claims past the end keep incrementing the inner counter, which is harmless:
/// only claims that observe a previous value below `total` receive a slot.
#[derive(Clone)]
pub struct SlotCounter {
    next: Arc<AtomicU64>,
    total: u64,
}

impl SlotCounter {
    /// Creates a counter for `total` slots.
    pub fn new(total: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(0)),
            total,
        }
    }

    /// Claims the next slot, or `None` when all slots are taken.
    pub fn claim(&self) -> Option<u64> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed);
        (slot < self.total).then_some(slot)
    }

    /// Number of slots this counter hands out.
    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Atomic counter tracking the number of currently running workers.
#[derive(Clone)]
pub struct ActiveWorkerCounter(Arc<AtomicU32>);

impl ActiveWorkerCounter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(Arc::new(AtomicU32::new(0)))
    }

    /// Increments the active worker count by one.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the active worker count by one.
    pub fn decrement(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    /// Returns the current number of active workers.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for ActiveWorkerCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Main worker task loop.
///
/// Returns the number of requests this worker executed. Failures are
/// reported and the worker moves on to its next slot; nothing a single
/// request does stops the loop.
pub async fn worker_loop(
    worker_id: u32,
    config: Arc<LoadTestConfig>,
    transport: Arc<dyn Transport>,
    slots: SlotCounter,
    sample_tx: mpsc::Sender<SampleReport>,
    active_workers: ActiveWorkerCounter,
) -> u64 {
    active_workers.increment();
    let mut executed = 0;

    while let Some(slot) = slots.claim() {
        let outcome = sample(transport.as_ref(), &config).await;
        executed += 1;

        match &outcome {
            SampleOutcome::Success { latency } => {
                tracing::debug!(
                    worker_id,
                    slot,
                    latency_ms = latency.as_secs_f64() * 1000.0,
                    "request succeeded"
                );
            },
            SampleOutcome::Failure { cause } => {
                tracing::warn!(
                    worker_id,
                    slot,
                    category = cause.error_category(),
                    "Error: {cause}"
                );
            },
        }

        if sample_tx
            .send(SampleReport::new(slot, outcome))
            .await
            .is_err()
        {
            // Receiver dropped -- the aggregator is gone, nobody will count this.
            tracing::error!(
                worker_id,
                slot,
                "metrics aggregator stopped before the run finished"
            );
            break;
        }
    }

    tracing::debug!(worker_id, executed, "worker finished");
    active_workers.decrement();
    executed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadtest::config::{HttpMethod, RequestBody};
    use crate::loadtest::error::RequestFailure;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct AlwaysOk;

    #[async_trait]
    impl Transport for AlwaysOk {
        async fn send(
            &self,
            _method: HttpMethod,
            _target: &str,
            _body: Option<&RequestBody>,
        ) -> Result<u16, RequestFailure> {
            Ok(200)
        }
    }

    #[test]
    fn test_slot_counter_hands_out_each_slot_once() {
        let slots = SlotCounter::new(3);
        assert_eq!(slots.claim(), Some(0));
        assert_eq!(slots.claim(), Some(1));
        assert_eq!(slots.claim(), Some(2));
        assert_eq!(slots.claim(), None);
        assert_eq!(slots.claim(), None);
        assert_eq!(slots.total(), 3);
    }

    #[test]
    fn test_slot_counter_shared_across_threads() {
        let slots = SlotCounter::new(1000);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slots = slots.clone();
                std::thread::spawn(move || {
                    let mut claimed = Vec::new();
                    while let Some(slot) = slots.claim() {
                        claimed.push(slot);
                    }
                    claimed
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for slot in handle.join().unwrap() {
                assert!(all.insert(slot), "slot {slot} claimed twice");
            }
        }
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn test_active_worker_counter_increment_decrement() {
        let counter = ActiveWorkerCounter::new();
        assert_eq!(counter.get(), 0);

        counter.increment();
        counter.increment();
        assert_eq!(counter.get(), 2);

        counter.decrement();
        assert_eq!(counter.get(), 1);
    }

    #[tokio::test]
    async fn test_worker_loop_drains_all_slots() {
        let config = Arc::new(LoadTestConfig::new("http://localhost/", 5, 1));
        let (tx, mut rx) = mpsc::channel(16);
        let active = ActiveWorkerCounter::new();

        let executed = worker_loop(
            0,
            config,
            Arc::new(AlwaysOk),
            SlotCounter::new(5),
            tx,
            active.clone(),
        )
        .await;
        assert_eq!(executed, 5);
        assert_eq!(active.get(), 0);

        let mut slots = Vec::new();
        while let Some(report) = rx.recv().await {
            assert!(report.outcome.is_success());
            slots.push(report.slot);
        }
        assert_eq!(slots, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_worker_loop_with_no_slots_exits_immediately() {
        let config = Arc::new(LoadTestConfig::new("http://localhost/", 1, 2));
        let slots = SlotCounter::new(0);
        let (tx, mut rx) = mpsc::channel(1);

        let executed = worker_loop(
            1,
            config,
            Arc::new(AlwaysOk),
            slots,
            tx,
            ActiveWorkerCounter::new(),
        )
        .await;
        assert_eq!(executed, 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_worker_loop_stops_when_receiver_dropped() {
        let config = Arc::new(LoadTestConfig::new("http://localhost/", 10, 1));
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let executed = worker_loop(
            0,
            config,
            Arc::new(AlwaysOk),
            SlotCounter::new(10),
            tx,
            ActiveWorkerCounter::new(),
        )
        .await;
        assert_eq!(executed, 1);
    }
}
