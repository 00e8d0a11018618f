use crate::dispatch::MAX_CONNECTIONS;

/// Environment variable which overwrites the default connection capacity.
pub const ENV_MAX_CONNECTIONS: &str = "MAX_CONNECTIONS";

/// Default capacity of the permit pool,
/// taken from `MAX_CONNECTIONS` if set to a positive number.
pub fn compute_connection_capacity() -> usize {
    parse_connection_capacity(std::env::var(ENV_MAX_CONNECTIONS).ok().as_deref())
}

fn parse_connection_capacity(value: Option<&str>) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(MAX_CONNECTIONS)
}
