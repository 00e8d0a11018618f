//! Bounded-concurrency dispatch of simulated requests.
//!
//! A batch fans out one task per request. Each task first acquires a
//! permit from a [`PermitPool`], so no more than `capacity` requests are
//! ever in flight, then runs the [`RequestSimulator`] and releases the
//! permit. Results fan back in over a channel into a single fold loop,
//! which owns the [`AggregateState`] and derives the mean once every
//! request has reported.

use std::{sync::Arc, time::Duration};

use rama::telemetry::tracing;
use tokio::{sync::mpsc, task::JoinSet, time::Instant};

use crate::request::{RandomLatencySimulator, RequestId, RequestResult, RequestSimulator};

mod aggregate;
mod error;
mod permit;

pub use self::{
    aggregate::AggregateState,
    error::{BatchError, InvalidConfigError},
    permit::{Permit, PermitPool, PoolStats},
};

/// Maximum amount of simultaneous connections a simulated server accepts.
pub const MAX_CONNECTIONS: usize = 10;

/// Amount of servers queried in a default batch.
pub const DEFAULT_REQUEST_COUNT: u32 = 100;

/// Validated parameters of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    request_count: u32,
    capacity: usize,
    deadline: Option<Duration>,
}

impl BatchConfig {
    pub fn try_new(request_count: u32, capacity: usize) -> Result<Self, InvalidConfigError> {
        if request_count == 0 {
            return Err(InvalidConfigError::ZeroRequests);
        }
        if request_count > i32::MAX as u32 {
            return Err(InvalidConfigError::TooManyRequests {
                requested: request_count,
            });
        }
        if capacity == 0 {
            return Err(InvalidConfigError::ZeroCapacity);
        }
        Ok(Self {
            request_count,
            capacity,
            deadline: None,
        })
    }

    /// Abort the batch if it takes longer than `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn maybe_with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn request_count(&self) -> u32 {
        self.request_count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            request_count: DEFAULT_REQUEST_COUNT,
            capacity: MAX_CONNECTIONS,
            deadline: None,
        }
    }
}

/// Outcome of a completed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeanResult {
    pub mean: i32,
    pub sum: i64,
    pub count: u64,
    pub elapsed: Duration,
    pub stats: PoolStats,
}

/// A single request which completed and was folded into the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestEvent {
    pub id: RequestId,
    pub result: RequestResult,
    /// Time spent in the simulator, permit wait excluded.
    pub latency: Duration,
    /// Time spent waiting for a permit.
    pub permit_wait: Duration,
    /// Time since the start of the batch.
    pub elapsed: Duration,
}

/// Receives every [`RequestEvent`] of a batch, in completion order.
///
/// Called from the fold loop, one event at a time.
pub trait BatchObserver: Send {
    fn on_result(&mut self, ev: &RequestEvent);
}

impl BatchObserver for () {
    #[inline(always)]
    fn on_result(&mut self, _ev: &RequestEvent) {}
}

/// Runs batches of requests against a [`RequestSimulator`]
/// with at most [`BatchConfig::capacity`] of them in flight.
#[derive(Debug, Clone)]
pub struct BoundedDispatcher<S> {
    simulator: Arc<S>,
    config: BatchConfig,
}

impl<S: RequestSimulator> BoundedDispatcher<S> {
    pub fn new(simulator: S, config: BatchConfig) -> Self {
        Self {
            simulator: Arc::new(simulator),
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run one batch and return the mean of all results.
    pub async fn run_batch(&self) -> Result<MeanResult, BatchError> {
        self.run_batch_with_observer(&mut ()).await
    }

    /// Same as [`Self::run_batch`], reporting each folded request to `observer`.
    ///
    /// Dropping the returned future aborts all requests still running.
    pub async fn run_batch_with_observer<O>(
        &self,
        observer: &mut O,
    ) -> Result<MeanResult, BatchError>
    where
        O: BatchObserver + ?Sized,
    {
        let BatchConfig {
            request_count,
            capacity,
            deadline,
        } = self.config;
        let expected = request_count as u64;

        tracing::debug!(%request_count, %capacity, ?deadline, "dispatch batch");

        let start = Instant::now();

        // permits beyond the request count can never be used
        let pool = PermitPool::new(capacity.min(request_count as usize));
        let (result_tx, mut result_rx) = mpsc::channel(capacity.saturating_mul(8).min(4096));
        let mut tasks = JoinSet::new();

        for id in 0..request_count as RequestId {
            let simulator = self.simulator.clone();
            let pool = pool.clone();
            let result_tx = result_tx.clone();

            tasks.spawn(async move {
                let permit = match pool.acquire().await {
                    Ok(permit) => permit,
                    Err(err) => {
                        tracing::debug!(%id, "drop request: {err}");
                        return;
                    }
                };
                let permit_wait = permit.wait();

                let req_start = Instant::now();
                let result = simulator.simulate(id).await;
                let latency = req_start.elapsed();
                drop(permit);

                if let Err(err) = result_tx
                    .send(RequestEvent {
                        id,
                        result,
                        latency,
                        permit_wait,
                        elapsed: start.elapsed(),
                    })
                    .await
                {
                    tracing::debug!("failed to send request result msg: {err}");
                }
            });
        }
        // the fold loop ends once every task dropped its sender
        drop(result_tx);

        let mut aggregate = AggregateState::new();
        let fold = async {
            while let Some(ev) = result_rx.recv().await {
                aggregate.fold(ev.result);
                observer.on_result(&ev);
            }
        };

        // a deadline beyond what the clock can represent never fires
        let deadline_at = deadline.and_then(|deadline| {
            let at = start.checked_add(deadline);
            if at.is_none() {
                tracing::debug!(?deadline, "deadline out of clock range: ignore");
            }
            at.map(|at| (deadline, at))
        });

        match deadline_at {
            Some((deadline, at)) => {
                if tokio::time::timeout_at(at, fold).await.is_err() {
                    pool.close();
                    tasks.abort_all();
                    tracing::warn!(
                        ?deadline,
                        completed = aggregate.count(),
                        %expected,
                        "batch deadline exceeded: abort outstanding requests",
                    );
                    return Err(BatchError::DeadlineExceeded {
                        completed: aggregate.count(),
                        expected,
                    });
                }
            }
            None => fold.await,
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                tracing::error!("request task failed: {err}");
            }
        }

        let incomplete = BatchError::Incomplete {
            completed: aggregate.count(),
            expected,
        };
        if aggregate.count() != expected {
            return Err(incomplete);
        }
        let mean = aggregate.mean().ok_or(incomplete)?;

        let elapsed = start.elapsed();
        let stats = PoolStats {
            capacity,
            ..pool.stats()
        };

        tracing::info!(
            %mean,
            sum = aggregate.sum(),
            count = aggregate.count(),
            elapsed_ms = elapsed.as_millis() as u64,
            peak_in_flight = stats.peak_in_flight,
            waited = stats.waited,
            "batch complete",
        );

        Ok(MeanResult {
            mean,
            sum: aggregate.sum(),
            count: aggregate.count(),
            elapsed,
            stats,
        })
    }
}

/// Query `request_count` simulated servers with at most `capacity`
/// connections open at once and return the mean of their responses.
pub async fn run_batch(request_count: u32, capacity: usize) -> Result<MeanResult, BatchError> {
    let config = BatchConfig::try_new(request_count, capacity)?;
    BoundedDispatcher::new(RandomLatencySimulator::default(), config)
        .run_batch()
        .await
}
