use std::time::Duration;

use meanbench_lib::{BatchConfig, BatchObserver, MeanResult, RequestEvent};

mod human;
mod json;

pub use self::{human::HumanReporter, json::JsonlReporter};

pub trait Reporter: Send + 'static {
    fn on_start(&mut self, iteration: usize, config: &BatchConfig);
    fn on_result(&mut self, iteration: usize, ev: &RequestEvent);
    fn on_tick(&mut self, now: Duration);
    fn on_batch(&mut self, iteration: usize, result: &MeanResult);
    fn finish(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    total: u64,
    waited: u64,
    max_latency: Duration,
    max_permit_wait: Duration,
}

impl Counters {
    pub(super) fn apply(&mut self, ev: &RequestEvent) {
        self.total += 1;
        if !ev.permit_wait.is_zero() {
            self.waited += 1;
        }
        self.max_latency = self.max_latency.max(ev.latency);
        self.max_permit_wait = self.max_permit_wait.max(ev.permit_wait);
    }
}

/// Feeds the events of a single batch into a [`Reporter`].
pub struct ReportObserver<'a> {
    reporter: &'a mut dyn Reporter,
    iteration: usize,
}

impl<'a> ReportObserver<'a> {
    pub fn new(reporter: &'a mut dyn Reporter, iteration: usize) -> Self {
        Self {
            reporter,
            iteration,
        }
    }
}

impl BatchObserver for ReportObserver<'_> {
    fn on_result(&mut self, ev: &RequestEvent) {
        self.reporter.on_result(self.iteration, ev);
        self.reporter.on_tick(ev.elapsed);
    }
}

/// Summary over all batches of a run.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct RunTotals {
    batches: u64,
    requests: u64,
    total_time: Duration,
    min_time: Option<Duration>,
    max_time: Duration,
}

impl RunTotals {
    pub(super) fn apply(&mut self, result: &MeanResult) {
        self.batches += 1;
        self.requests += result.count;
        self.total_time += result.elapsed;
        self.min_time = Some(
            self.min_time
                .map_or(result.elapsed, |t| t.min(result.elapsed)),
        );
        self.max_time = self.max_time.max(result.elapsed);
    }

    pub(super) fn avg_time(&self) -> Duration {
        if self.batches == 0 {
            return Duration::ZERO;
        }
        self.total_time / self.batches as u32
    }
}
