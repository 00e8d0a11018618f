use meanbench_lib::{DEFAULT_REQUEST_COUNT, MAX_CONNECTIONS, request::LatencyRange};

use super::BatchArgs;

/// Preset batch shapes.
#[derive(Debug, Clone, Copy, clap::ValueEnum, Default, PartialEq, Eq)]
pub enum Scenario {
    /// 100 servers, 10 connections, 0-1000ms latency.
    #[default]
    Reference,

    /// One connection at a time.
    /// Used as the baseline to compare concurrency gains against.
    Sequential,

    /// As many connections as there are servers.
    /// No request ever waits for a permit.
    Unbounded,

    /// Servers answer without any latency.
    /// Measures the overhead of the dispatcher itself.
    Instant,
}

impl Scenario {
    /// Construct the concrete batch configuration
    /// associated with this scenario.
    pub fn batch_args(self) -> BatchArgs {
        let reference_latency = LatencyRange::DEFAULT;
        match self {
            Scenario::Reference => BatchArgs {
                requests: Some(DEFAULT_REQUEST_COUNT),
                capacity: Some(MAX_CONNECTIONS),
                min_latency: Some(reference_latency.min_ms()),
                max_latency: Some(reference_latency.max_ms()),
            },

            Scenario::Sequential => BatchArgs {
                requests: Some(DEFAULT_REQUEST_COUNT),
                capacity: Some(1),
                min_latency: Some(reference_latency.min_ms()),
                max_latency: Some(reference_latency.max_ms()),
            },

            Scenario::Unbounded => BatchArgs {
                requests: Some(DEFAULT_REQUEST_COUNT),
                capacity: Some(DEFAULT_REQUEST_COUNT as usize),
                min_latency: Some(reference_latency.min_ms()),
                max_latency: Some(reference_latency.max_ms()),
            },

            Scenario::Instant => BatchArgs {
                requests: Some(DEFAULT_REQUEST_COUNT),
                capacity: None,
                min_latency: Some(0),
                max_latency: Some(0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenarios_describe_valid_latency_ranges() {
        for scenario in [
            Scenario::Reference,
            Scenario::Sequential,
            Scenario::Unbounded,
            Scenario::Instant,
        ] {
            let args = scenario.batch_args();
            let min = args.min_latency.unwrap();
            let max = args.max_latency.unwrap();
            assert!(
                LatencyRange::try_new(min, max).is_ok(),
                "scenario: {scenario:?}"
            );
        }
    }

    #[test]
    fn unbounded_scenario_never_limits() {
        let args = Scenario::Unbounded.batch_args();
        assert!(args.capacity.unwrap() >= args.requests.unwrap() as usize);
    }
}
