//! Counting admission gate that bounds in-flight work.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admits at most `width` holders at a time and records the high-water mark.
///
/// Cloning shares the same slots and counters.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Slot held while admitted. Released on drop, whatever the work's outcome.
#[derive(Debug)]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl AdmissionGate {
    /// A zero width is raised to one.
    pub fn new(width: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(width.max(1))),
            counters: Arc::default(),
        }
    }

    /// Wait for a free slot.
    pub async fn admit(&self) -> Admission {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("admission gate is never closed");

        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);

        Admission {
            _permit: permit,
            counters: self.counters.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Largest number of simultaneous holders seen so far.
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::task::JoinSet;

    #[tokio::test]
    async fn never_exceeds_width() {
        let gate = AdmissionGate::new(3);
        let mut tasks = JoinSet::new();

        for _ in 0..12 {
            let gate = gate.clone();
            tasks.spawn(async move {
                let _slot = gate.admit().await;
                assert!(gate.in_flight() <= 3);
                tokio::time::sleep(Duration::from_millis(5)).await;
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        assert_eq!(gate.peak(), 3);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn slot_released_when_task_panics() {
        let gate = AdmissionGate::new(1);
        let held = gate.clone();
        let result = tokio::spawn(async move {
            let _slot = held.admit().await;
            panic!("work failed");
        })
        .await;
        assert!(result.is_err());

        assert_eq!(gate.in_flight(), 0);
        let _slot = tokio::time::timeout(Duration::from_secs(1), gate.admit())
            .await
            .expect("slot should be free");
    }

    #[test]
    fn zero_width_admits_one() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.semaphore.available_permits(), 1);
    }
}
