#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod dispatch;
pub mod request;
pub mod utils;

pub use self::dispatch::{
    BatchConfig, BatchError, BatchObserver, BoundedDispatcher, DEFAULT_REQUEST_COUNT,
    InvalidConfigError, MAX_CONNECTIONS, MeanResult, PoolStats, RequestEvent, run_batch,
};
pub use self::request::{RequestId, RequestResult, RequestSimulator};
