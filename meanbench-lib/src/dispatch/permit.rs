use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use rama::telemetry::tracing;
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError},
    time::Instant,
};

use super::BatchError;

/// Fixed-size pool of admission permits.
///
/// Backed by a [`Semaphore`], so at most `capacity` [`Permit`]s
/// can be alive at any instant. Acquiring from an exhausted pool
/// suspends the caller until another permit is dropped.
///
/// The pool is instrumented: it tracks how many permits are held,
/// the highest count observed and how many acquisitions had to wait.
#[derive(Debug, Clone)]
pub struct PermitPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    counters: Arc<PoolCounters>,
}

#[derive(Debug, Default)]
struct PoolCounters {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    acquired: AtomicU64,
    waited: AtomicU64,
}

/// Snapshot of the [`PermitPool`] instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub capacity: usize,
    pub peak_in_flight: usize,
    pub acquired: u64,
    pub waited: u64,
}

impl PermitPool {
    /// Create a pool with `capacity` permits.
    ///
    /// `capacity` must be at least 1 and at most [`Semaphore::MAX_PERMITS`],
    /// which [`super::BatchConfig`] guarantees.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            counters: Default::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            peak_in_flight: self.counters.peak_in_flight.load(Ordering::Acquire),
            acquired: self.counters.acquired.load(Ordering::Acquire),
            waited: self.counters.waited.load(Ordering::Acquire),
        }
    }

    /// Acquire a permit, suspending while the pool is exhausted.
    pub async fn acquire(&self) -> Result<Permit, BatchError> {
        let (permit, wait) = match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => (permit, Duration::ZERO),
            Err(TryAcquireError::NoPermits) => {
                self.counters.waited.fetch_add(1, Ordering::AcqRel);
                let start = Instant::now();
                let permit = self
                    .semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| BatchError::PoolClosed)?;
                (permit, start.elapsed())
            }
            Err(TryAcquireError::Closed) => return Err(BatchError::PoolClosed),
        };

        let in_flight = self.counters.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        debug_assert!(
            in_flight <= self.capacity,
            "in flight permits ({in_flight}) exceed capacity ({})",
            self.capacity
        );
        self.counters
            .peak_in_flight
            .fetch_max(in_flight, Ordering::AcqRel);
        self.counters.acquired.fetch_add(1, Ordering::AcqRel);

        if !wait.is_zero() {
            tracing::trace!(?wait, %in_flight, "permit acquired after wait");
        }

        Ok(Permit {
            counters: self.counters.clone(),
            wait,
            _permit: permit,
        })
    }

    /// Close the pool: pending and future acquisitions fail with [`BatchError::PoolClosed`].
    ///
    /// Permits already handed out stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// Admission token handed out by a [`PermitPool`].
///
/// Released back to the pool on drop.
#[derive(Debug)]
pub struct Permit {
    counters: Arc<PoolCounters>,
    wait: Duration,
    _permit: OwnedSemaphorePermit,
}

impl Permit {
    /// Time spent waiting for this permit.
    pub fn wait(&self) -> Duration {
        self.wait
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        // runs before the semaphore permit field is dropped,
        // so `in_flight` never counts more than the semaphore allows
        self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{task::yield_now, time};

    #[tokio::test(flavor = "current_thread")]
    async fn acquire_up_to_capacity_without_waiting() {
        let pool = PermitPool::new(3);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        let c = pool.acquire().await.unwrap();

        assert_eq!(pool.in_flight(), 3);
        assert!(a.wait().is_zero());
        assert!(b.wait().is_zero());
        assert!(c.wait().is_zero());

        drop((a, b, c));
        assert_eq!(pool.in_flight(), 0);

        assert_eq!(
            pool.stats(),
            PoolStats {
                capacity: 3,
                peak_in_flight: 3,
                acquired: 3,
                waited: 0,
            }
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn exhausted_pool_suspends_until_release() {
        time::pause();

        let pool = PermitPool::new(1);
        let held = pool.acquire().await.unwrap();

        let h = tokio::spawn({
            let pool = pool.clone();
            async move { pool.acquire().await.map(|permit| permit.wait()) }
        });

        yield_now().await;
        assert!(!h.is_finished());
        assert_eq!(pool.in_flight(), 1);

        time::advance(Duration::from_millis(30)).await;
        yield_now().await;
        assert!(!h.is_finished());

        drop(held);
        let wait = h.await.expect("task join").unwrap();
        assert!(wait >= Duration::from_millis(30), "wait: {wait:?}");

        let stats = pool.stats();
        assert_eq!(stats.peak_in_flight, 1);
        assert_eq!(stats.acquired, 2);
        assert_eq!(stats.waited, 1);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn closed_pool_rejects_waiters() {
        let pool = PermitPool::new(1);
        let held = pool.acquire().await.unwrap();

        let h = tokio::spawn({
            let pool = pool.clone();
            async move { pool.acquire().await.map(|_| ()) }
        });
        yield_now().await;

        pool.close();
        assert_eq!(h.await.expect("task join"), Err(BatchError::PoolClosed));
        assert!(matches!(pool.acquire().await, Err(BatchError::PoolClosed)));

        // permits handed out before closing remain valid
        assert_eq!(pool.in_flight(), 1);
        drop(held);
        assert_eq!(pool.in_flight(), 0);
    }
}
