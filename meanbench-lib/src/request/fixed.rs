use std::time::Duration;

use rama::telemetry::tracing;

use super::{RequestId, RequestResult, RequestSimulator};

/// Deterministic stand-in for [`super::RandomLatencySimulator`].
///
/// Waits `phase` for the connection and again for the response.
/// With a zero phase it degrades into an identity function.
#[derive(Debug, Clone, Default)]
pub struct FixedLatencySimulator {
    phase: Duration,
}

impl FixedLatencySimulator {
    pub const fn new(phase: Duration) -> Self {
        Self { phase }
    }

    /// Simulator without any latency.
    pub const fn instant() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl RequestSimulator for FixedLatencySimulator {
    async fn simulate(&self, id: RequestId) -> RequestResult {
        tracing::trace!(
            %id,
            connect_ms = self.phase.as_millis() as u64,
            respond_ms = self.phase.as_millis() as u64,
            "simulate server request",
        );

        if !self.phase.is_zero() {
            tokio::time::sleep(self.phase).await;
            tokio::time::sleep(self.phase).await;
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;
    use tracing_test::traced_test;

    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn instant_simulator_is_identity() {
        tokio::time::pause();

        let sim = FixedLatencySimulator::instant();
        let start = Instant::now();
        for id in [0, 1, -1, i32::MAX, i32::MIN] {
            assert_eq!(sim.simulate(id).await, id);
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fixed_simulator_waits_both_phases() {
        tokio::time::pause();

        let sim = FixedLatencySimulator::new(Duration::from_millis(40));
        let start = Instant::now();
        assert_eq!(sim.simulate(3).await, 3);
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test(flavor = "current_thread")]
    #[traced_test]
    async fn fixed_simulator_logs_latency() {
        tokio::time::pause();

        FixedLatencySimulator::new(Duration::from_millis(25))
            .simulate(9)
            .await;
        assert!(logs_contain("simulate server request"));
        assert!(logs_contain("connect_ms=25"));
    }
}
