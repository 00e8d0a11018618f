/// Batch shape and simulated server behavior.
///
/// Every field is optional so it can be layered on top of a [`super::Scenario`].
#[derive(Debug, Clone, clap::Args, Default, PartialEq, Eq)]
pub struct BatchArgs {
    /// Amount of servers to request data from.
    #[arg(long, short = 'n', value_name = "N")]
    pub requests: Option<u32>,

    /// Maximum number of simultaneously open connections
    /// (defaults to the MAX_CONNECTIONS env variable or 10).
    #[arg(long, short = 'c', value_name = "N")]
    pub capacity: Option<usize>,

    /// Lower bound (inclusive) of the simulated connection latency.
    #[arg(long, value_name = "MILLISECONDS")]
    pub min_latency: Option<u32>,

    /// Upper bound (exclusive) of the simulated connection latency.
    #[arg(long, value_name = "MILLISECONDS")]
    pub max_latency: Option<u32>,
}
