use std::fmt;

/// Rejected batch or simulator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidConfigError {
    ZeroRequests,
    TooManyRequests { requested: u32 },
    ZeroCapacity,
    InvalidLatencyRange { min_ms: u32, max_ms: u32 },
}

impl fmt::Display for InvalidConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidConfigError::ZeroRequests => {
                write!(f, "InvalidConfigError: request count must be at least 1")
            }
            InvalidConfigError::TooManyRequests { requested } => write!(
                f,
                "InvalidConfigError: request count {requested} exceeds the request id space ({})",
                i32::MAX
            ),
            InvalidConfigError::ZeroCapacity => {
                write!(f, "InvalidConfigError: capacity must be at least 1")
            }
            InvalidConfigError::InvalidLatencyRange { min_ms, max_ms } => write!(
                f,
                "InvalidConfigError: latency range [{min_ms}ms, {max_ms}ms) is inverted"
            ),
        }
    }
}

impl std::error::Error for InvalidConfigError {}

/// Reasons a batch did not produce a mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    InvalidConfig(InvalidConfigError),
    /// The batch deadline expired before every request was folded.
    DeadlineExceeded { completed: u64, expected: u64 },
    /// All request tasks are gone but not every result arrived.
    Incomplete { completed: u64, expected: u64 },
    /// The permit pool was closed while a request was waiting on it.
    PoolClosed,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::InvalidConfig(err) => write!(f, "BatchError: {err}"),
            BatchError::DeadlineExceeded {
                completed,
                expected,
            } => write!(
                f,
                "BatchError: deadline exceeded after {completed}/{expected} results"
            ),
            BatchError::Incomplete {
                completed,
                expected,
            } => write!(
                f,
                "BatchError: batch finished with {completed}/{expected} results"
            ),
            BatchError::PoolClosed => write!(f, "BatchError: permit pool closed"),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchError::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidConfigError> for BatchError {
    fn from(value: InvalidConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}
