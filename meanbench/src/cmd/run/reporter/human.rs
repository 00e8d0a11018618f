use std::time::Duration;

use meanbench_lib::{BatchConfig, MeanResult, RequestEvent};

use super::{Counters, Reporter, RunTotals};

pub struct HumanReporter {
    interval: Duration,
    last_tick: Duration,
    interval_counts: Counters,
    batch_counts: Counters,
    last_pos: Option<(usize, i32)>,
    totals: RunTotals,
}

impl HumanReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: Duration::ZERO,
            interval_counts: Counters::default(),
            batch_counts: Counters::default(),
            last_pos: None,
            totals: RunTotals::default(),
        }
    }
}

impl Reporter for HumanReporter {
    fn on_start(&mut self, iteration: usize, config: &BatchConfig) {
        self.last_tick = Duration::ZERO;
        self.interval_counts = Counters::default();
        self.batch_counts = Counters::default();
        self.last_pos = None;

        if iteration == 0 {
            println!("Start calculating mean value...");
        } else {
            println!(
                "Start calculating mean value... (it={iteration} n={} c={})",
                config.request_count(),
                config.capacity(),
            );
        }
    }

    fn on_result(&mut self, iteration: usize, ev: &RequestEvent) {
        self.interval_counts.apply(ev);
        self.batch_counts.apply(ev);
        self.last_pos = Some((iteration, ev.id));
    }

    fn on_tick(&mut self, now: Duration) {
        if now.saturating_sub(self.last_tick) < self.interval {
            return;
        }
        let span = now.saturating_sub(self.last_tick);
        self.last_tick = now;

        let rps = if span.is_zero() {
            0.
        } else {
            self.interval_counts.total as f64 / span.as_secs_f64()
        };
        let (it, id) = self.last_pos.unwrap_or((0, 0));

        println!(
            "t={:.1}s it={} id={} rps={:.1} done={} waited={} max_latency={}ms max_wait={}ms total_done={}",
            now.as_secs_f64(),
            it,
            id,
            rps,
            self.interval_counts.total,
            self.interval_counts.waited,
            self.interval_counts.max_latency.as_millis(),
            self.interval_counts.max_permit_wait.as_millis(),
            self.batch_counts.total,
        );

        self.interval_counts = Counters::default();
    }

    fn on_batch(&mut self, _iteration: usize, result: &MeanResult) {
        self.totals.apply(result);
        println!(
            "Mean value: {} (time: {}ms)!",
            result.mean,
            result.elapsed.as_millis()
        );
        println!(
            "  requests={} capacity={} peak_in_flight={} waited={} max_latency={}ms max_wait={}ms",
            result.count,
            result.stats.capacity,
            result.stats.peak_in_flight,
            result.stats.waited,
            self.batch_counts.max_latency.as_millis(),
            self.batch_counts.max_permit_wait.as_millis(),
        );
    }

    fn finish(&mut self) {
        println!(
            "done batches={} requests={} avg_time={}ms min_time={}ms max_time={}ms",
            self.totals.batches,
            self.totals.requests,
            self.totals.avg_time().as_millis(),
            self.totals.min_time.unwrap_or_default().as_millis(),
            self.totals.max_time.as_millis(),
        );
    }
}
