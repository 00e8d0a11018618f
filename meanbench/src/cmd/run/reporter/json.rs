use std::time::Duration;

use meanbench_lib::{BatchConfig, MeanResult, RequestEvent};

use super::{Counters, Reporter, RunTotals};

pub struct JsonlReporter {
    interval: Duration,
    last_tick: Duration,
    interval_counts: Counters,
    batch_counts: Counters,
    last_pos: Option<(usize, i32)>,
    totals: RunTotals,
    emit_events: bool,
}

impl JsonlReporter {
    pub fn new(interval: Duration, emit_events: bool) -> Self {
        Self {
            interval,
            last_tick: Duration::ZERO,
            interval_counts: Counters::default(),
            batch_counts: Counters::default(),
            last_pos: None,
            totals: RunTotals::default(),
            emit_events,
        }
    }
}

impl Reporter for JsonlReporter {
    fn on_start(&mut self, iteration: usize, config: &BatchConfig) {
        self.last_tick = Duration::ZERO;
        self.interval_counts = Counters::default();
        self.batch_counts = Counters::default();
        self.last_pos = None;

        let line = serde_json::json!({
            "type": "start",
            "iteration": iteration,
            "requests": config.request_count(),
            "capacity": config.capacity(),
            "deadline_ms": config.deadline().map(|d| d.as_millis() as u64),
        });
        println!("{}", line);
    }

    fn on_result(&mut self, iteration: usize, ev: &RequestEvent) {
        self.interval_counts.apply(ev);
        self.batch_counts.apply(ev);
        self.last_pos = Some((iteration, ev.id));

        if self.emit_events {
            let line = serde_json::json!({
                "type": "event",
                "t_ms": ev.elapsed.as_millis() as u64,
                "iteration": iteration,
                "id": ev.id,
                "result": ev.result,
                "latency_ms": ev.latency.as_millis() as u64,
                "permit_wait_ms": ev.permit_wait.as_millis() as u64,
            });
            println!("{}", line);
        }
    }

    fn on_tick(&mut self, now: Duration) {
        if now.saturating_sub(self.last_tick) < self.interval {
            return;
        }
        let span = now.saturating_sub(self.last_tick);
        self.last_tick = now;

        let span_secs = span.as_secs_f64();
        let rps = if span_secs == 0. {
            0.
        } else {
            self.interval_counts.total as f64 / span_secs
        };
        let (iteration, id) = self.last_pos.unwrap_or((0, 0));

        let line = serde_json::json!({
            "type": "summary",
            "t_ms": now.as_millis() as u64,
            "iteration": iteration,
            "id": id,
            "interval_ms": span.as_millis() as u64,
            "rps": rps,
            "interval": {
                "done": self.interval_counts.total,
                "waited": self.interval_counts.waited,
                "max_latency_ms": self.interval_counts.max_latency.as_millis() as u64,
                "max_wait_ms": self.interval_counts.max_permit_wait.as_millis() as u64,
            },
            "batch": {
                "done": self.batch_counts.total,
                "waited": self.batch_counts.waited,
            }
        });
        println!("{}", line);

        self.interval_counts = Counters::default();
    }

    fn on_batch(&mut self, iteration: usize, result: &MeanResult) {
        self.totals.apply(result);

        let line = serde_json::json!({
            "type": "batch",
            "iteration": iteration,
            "mean": result.mean,
            "sum": result.sum,
            "count": result.count,
            "elapsed_ms": result.elapsed.as_millis() as u64,
            "capacity": result.stats.capacity,
            "peak_in_flight": result.stats.peak_in_flight,
            "waited": result.stats.waited,
            "max_latency_ms": self.batch_counts.max_latency.as_millis() as u64,
            "max_wait_ms": self.batch_counts.max_permit_wait.as_millis() as u64,
        });
        println!("{}", line);
    }

    fn finish(&mut self) {
        let line = serde_json::json!({
            "type": "final",
            "batches": self.totals.batches,
            "requests": self.totals.requests,
            "avg_time_ms": self.totals.avg_time().as_millis() as u64,
            "min_time_ms": self.totals.min_time.unwrap_or_default().as_millis() as u64,
            "max_time_ms": self.totals.max_time.as_millis() as u64,
        });
        println!("{}", line);
    }
}
