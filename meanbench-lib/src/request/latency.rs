use std::time::Duration;

use rand::RngExt as _;

use crate::dispatch::InvalidConfigError;

/// Latency drawn for a single simulated call, in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct LatencyDraw(u32);

impl LatencyDraw {
    pub const ZERO: Self = Self(0);

    #[inline(always)]
    pub const fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    #[inline(always)]
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub const fn as_duration(self) -> Duration {
        Duration::from_millis(self.0 as u64)
    }

    /// Suspend the current task for the drawn latency.
    ///
    /// A zero draw returns immediately without touching the timer wheel.
    pub async fn wait(self) {
        if self.0 > 0 {
            tokio::time::sleep(self.as_duration()).await;
        }
    }
}

/// Half-open range `[min, max)` in milliseconds that latencies are sampled from.
///
/// A range with `min == max` always draws `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRange {
    min_ms: u32,
    max_ms: u32,
}

impl LatencyRange {
    /// `[0, 1000)`: connection latency of the simulated servers.
    pub const DEFAULT: Self = Self {
        min_ms: 0,
        max_ms: 1000,
    };

    pub fn try_new(min_ms: u32, max_ms: u32) -> Result<Self, InvalidConfigError> {
        if max_ms < min_ms {
            return Err(InvalidConfigError::InvalidLatencyRange { min_ms, max_ms });
        }
        Ok(Self { min_ms, max_ms })
    }

    /// Range which always draws the given latency.
    pub const fn fixed(ms: u32) -> Self {
        Self {
            min_ms: ms,
            max_ms: ms,
        }
    }

    #[inline(always)]
    pub const fn min_ms(&self) -> u32 {
        self.min_ms
    }

    #[inline(always)]
    pub const fn max_ms(&self) -> u32 {
        self.max_ms
    }

    /// Sample a latency uniformly from this range.
    pub fn draw(&self) -> LatencyDraw {
        if self.min_ms == self.max_ms {
            return LatencyDraw(self.min_ms);
        }
        LatencyDraw(rand::rng().random_range(self.min_ms..self.max_ms))
    }
}

impl Default for LatencyRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How the connect and response phases of a call relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundTrip {
    /// One draw is used for both phases.
    #[default]
    Symmetric,
    /// Each phase gets its own draw.
    Independent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_range_draws_below_one_second() {
        let range = LatencyRange::default();
        for _ in 0..10_000 {
            let draw = range.draw();
            assert!(draw.as_millis() < 1000, "draw: {draw:?}");
        }
    }

    #[test]
    fn narrow_range_stays_in_bounds() {
        let range = LatencyRange::try_new(10, 12).unwrap();
        for _ in 0..1_000 {
            let ms = range.draw().as_millis();
            assert!((10..12).contains(&ms), "ms: {ms}");
        }
    }

    #[test]
    fn fixed_range_always_draws_same_value() {
        let range = LatencyRange::fixed(250);
        for _ in 0..100 {
            assert_eq!(range.draw(), LatencyDraw::from_millis(250));
        }
        assert_eq!(LatencyRange::try_new(7, 7).unwrap().draw().as_millis(), 7);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert_eq!(
            LatencyRange::try_new(500, 100),
            Err(InvalidConfigError::InvalidLatencyRange {
                min_ms: 500,
                max_ms: 100
            })
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn zero_draw_does_not_sleep() {
        tokio::time::pause();
        let start = tokio::time::Instant::now();
        LatencyDraw::ZERO.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
