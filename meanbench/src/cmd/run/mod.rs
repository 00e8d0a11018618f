use std::time::Duration;

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    telemetry::tracing,
};

use clap::Args;
use meanbench_lib::{
    BatchConfig, BoundedDispatcher, DEFAULT_REQUEST_COUNT, MeanResult, RequestSimulator,
    request::{FixedLatencySimulator, LatencyRange, RandomLatencySimulator, RoundTrip},
    utils::env,
};

use crate::config::{BatchArgs, Scenario};

pub mod reporter;

use self::reporter::*;

#[derive(Debug, Clone, Args)]
/// compute the mean of the simulated server responses
pub struct RunCommand {
    #[clap(flatten)]
    config: Option<BatchArgs>,

    #[arg(long)]
    /// Scenario to run,
    /// manually defined parameters overwrite scenario parameters.
    scenario: Option<Scenario>,

    /// Draw a separate latency for the response phase
    /// instead of reusing the connection latency.
    #[arg(long, default_value_t = false)]
    independent_phases: bool,

    /// Abort a batch which takes longer than this (e.g. "5s", "1m 30s").
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    deadline: Option<Duration>,

    /// Amount of batches to run.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    iterations: u64,

    /// report json instead of a human-friendly format
    #[arg(long, default_value_t = false)]
    json: bool,
}

pub async fn exec(guard: ShutdownGuard, args: RunCommand) -> Result<(), BoxError> {
    let merged_cfg = merge_batch_args(args.scenario, args.config);

    let request_count = merged_cfg.requests.unwrap_or(DEFAULT_REQUEST_COUNT);
    let capacity = merged_cfg
        .capacity
        .unwrap_or_else(env::compute_connection_capacity);
    let min_latency = merged_cfg
        .min_latency
        .unwrap_or(LatencyRange::DEFAULT.min_ms());
    let max_latency = merged_cfg
        .max_latency
        .unwrap_or(LatencyRange::DEFAULT.max_ms());
    let round_trip = if args.independent_phases {
        RoundTrip::Independent
    } else {
        RoundTrip::Symmetric
    };

    let latency =
        LatencyRange::try_new(min_latency, max_latency).context("create latency range")?;
    let config = BatchConfig::try_new(request_count, capacity)
        .context("create batch config")?
        .maybe_with_deadline(args.deadline);

    tracing::info!(
        %request_count,
        %capacity,
        %min_latency,
        %max_latency,
        ?round_trip,
        deadline = ?args.deadline,
        "batch config parameters ready",
    );

    let simulator = if latency.min_ms() == latency.max_ms() {
        tracing::debug!("fixed latency range: use deterministic simulator");
        FixedLatencySimulator::new(Duration::from_millis(latency.min_ms() as u64)).into_dyn()
    } else {
        RandomLatencySimulator::new()
            .with_range(latency)
            .with_round_trip(round_trip)
            .into_dyn()
    };
    let dispatcher = BoundedDispatcher::new(simulator, config);

    const REPORT_INTERVAL: Duration = Duration::from_secs(1);

    let mut reporter: Box<dyn Reporter> = if args.json {
        const EMIT_EVENTS: bool = true;
        Box::new(JsonlReporter::new(REPORT_INTERVAL, EMIT_EVENTS))
    } else {
        Box::new(HumanReporter::new(REPORT_INTERVAL))
    };

    let results = run_iterations(
        &dispatcher,
        args.iterations,
        reporter.as_mut(),
        guard.cancelled(),
    )
    .await?;

    tracing::debug!(batches = results.len(), "batch runner done: exit");
    Ok(())
}

/// Run `iterations` batches one after the other,
/// stopping early once `cancelled` resolves.
async fn run_iterations<S: RequestSimulator>(
    dispatcher: &BoundedDispatcher<S>,
    iterations: u64,
    reporter: &mut dyn Reporter,
    cancelled: impl Future,
) -> Result<Vec<MeanResult>, BoxError> {
    let mut cancelled = std::pin::pin!(cancelled);
    let mut results = Vec::new();

    for iteration in 0..iterations as usize {
        reporter.on_start(iteration, dispatcher.config());

        let mut observer = ReportObserver::new(reporter, iteration);
        let result = tokio::select! {
            _ = cancelled.as_mut() => {
                tracing::error!(%iteration, "exit batch runner early: guard shutdown");
                return Ok(results);
            }
            result = dispatcher.run_batch_with_observer(&mut observer) => {
                result.context("run batch")?
            }
        };

        reporter.on_batch(iteration, &result);
        results.push(result);
    }

    reporter.finish();
    Ok(results)
}

fn merge_batch_args(scenario: Option<Scenario>, config: Option<BatchArgs>) -> BatchArgs {
    let scenario_cfg = scenario
        .map(|s| {
            tracing::info!("use scenario to define base config: {s:?}");
            s.batch_args()
        })
        .unwrap_or_else(|| {
            tracing::info!("no scenario defined, use default as base config");
            Default::default()
        });

    let overwrite_cfg = config.unwrap_or_default();

    macro_rules! merge_config {
        ($scenario:ident, $overwrite:ident, {$($property:ident),+ $(,)?}) => {
            BatchArgs {
                $(
                    $property: if let Some(value) = $overwrite.$property {
                        tracing::info!("property '{}': use overwrite: {value}", stringify!($property));
                        Some(value)
                    } else if let Some(value) = $scenario.$property {
                        tracing::info!("property '{}': use scenario: {value}", stringify!($property));
                        Some(value)
                    } else {
                        tracing::info!("property '{}': undefined", stringify!($property));
                        None
                    },
                )+
            }
        };
    }

    merge_config!(
        scenario_cfg, overwrite_cfg,
        {
            requests,
            capacity,
            min_latency,
            max_latency,
        }
    )
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use meanbench_lib::RequestEvent;

    use super::*;

    #[derive(Default)]
    struct RecordingReporter {
        starts: Vec<usize>,
        results: usize,
        batches: Vec<i32>,
        finished: bool,
    }

    impl Reporter for RecordingReporter {
        fn on_start(&mut self, iteration: usize, _config: &BatchConfig) {
            self.starts.push(iteration);
        }

        fn on_result(&mut self, _iteration: usize, _ev: &RequestEvent) {
            self.results += 1;
        }

        fn on_tick(&mut self, _now: Duration) {}

        fn on_batch(&mut self, _iteration: usize, result: &MeanResult) {
            self.batches.push(result.mean);
        }

        fn finish(&mut self) {
            self.finished = true;
        }
    }

    fn instant_dispatcher(n: u32, c: usize) -> BoundedDispatcher<FixedLatencySimulator> {
        BoundedDispatcher::new(
            FixedLatencySimulator::instant(),
            BatchConfig::try_new(n, c).unwrap(),
        )
    }

    #[test]
    fn test_merge_batch_args() {
        for (scenario, overwrite, expected) in [
            (None, None, BatchArgs::default()),
            (
                Some(Scenario::Reference),
                None,
                Scenario::Reference.batch_args(),
            ),
            (
                Some(Scenario::Sequential),
                Some(BatchArgs {
                    requests: Some(5),
                    ..Default::default()
                }),
                BatchArgs {
                    requests: Some(5),
                    capacity: Some(1),
                    min_latency: Some(0),
                    max_latency: Some(1000),
                },
            ),
            (
                Some(Scenario::Instant),
                Some(BatchArgs {
                    capacity: Some(3),
                    max_latency: Some(20),
                    ..Default::default()
                }),
                BatchArgs {
                    requests: Some(DEFAULT_REQUEST_COUNT),
                    capacity: Some(3),
                    min_latency: Some(0),
                    max_latency: Some(20),
                },
            ),
            (
                None,
                Some(BatchArgs {
                    min_latency: Some(10),
                    ..Default::default()
                }),
                BatchArgs {
                    min_latency: Some(10),
                    ..Default::default()
                },
            ),
        ] {
            let result = merge_batch_args(scenario, overwrite.clone());
            assert_eq!(
                result, expected,
                "scenario: {scenario:?}, overwrite: {overwrite:?}"
            );
        }
    }

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        run: RunCommand,
    }

    #[test]
    fn test_parse_iterations() {
        for (args, expected) in [
            (vec![], Some(1)),
            (vec!["--iterations", "1"], Some(1)),
            (vec!["--iterations", "42"], Some(42)),
            (vec!["--iterations", "0"], None),
            (vec!["--iterations", "-3"], None),
        ] {
            let result = Cli::try_parse_from(std::iter::once("meanbench").chain(args.clone()))
                .map(|cli| cli.run.iterations)
                .ok();
            assert_eq!(result, expected, "args: {args:?}");
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn run_iterations_reports_every_batch() {
        let dispatcher = instant_dispatcher(10, 3);
        let mut reporter = RecordingReporter::default();

        let results = run_iterations(&dispatcher, 3, &mut reporter, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(reporter.starts, vec![0, 1, 2]);
        assert_eq!(reporter.results, 30);
        assert_eq!(reporter.batches, vec![4, 4, 4]);
        assert!(reporter.finished);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn run_iterations_stops_when_cancelled() {
        tokio::time::pause();

        let dispatcher = BoundedDispatcher::new(
            FixedLatencySimulator::new(Duration::from_millis(100)),
            BatchConfig::try_new(10, 2).unwrap(),
        );
        let mut reporter = RecordingReporter::default();

        let results = run_iterations(
            &dispatcher,
            5,
            &mut reporter,
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await
        .unwrap();

        assert!(results.is_empty());
        assert_eq!(reporter.starts, vec![0]);
        assert!(reporter.batches.is_empty());
        assert!(!reporter.finished);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn run_iterations_propagates_deadline_error() {
        tokio::time::pause();

        let dispatcher = BoundedDispatcher::new(
            FixedLatencySimulator::new(Duration::from_millis(100)),
            BatchConfig::try_new(10, 1)
                .unwrap()
                .with_deadline(Duration::from_millis(250)),
        );
        let mut reporter = RecordingReporter::default();

        let result =
            run_iterations(&dispatcher, 2, &mut reporter, std::future::pending::<()>()).await;
        assert!(result.is_err());
        assert_eq!(reporter.starts, vec![0]);
        assert!(reporter.batches.is_empty());
        assert!(!reporter.finished);
    }
}
