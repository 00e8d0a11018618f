use rama::telemetry::tracing;

use super::{LatencyRange, RequestId, RequestResult, RequestSimulator, RoundTrip};

/// Simulates a server round trip with randomized latency.
///
/// The connection latency is drawn from a [`LatencyRange`]
/// and waited for twice: once to build up the connection
/// and once more while waiting for the response.
/// The payload returned is the id of the server itself.
#[derive(Debug, Clone, Default)]
pub struct RandomLatencySimulator {
    range: LatencyRange,
    round_trip: RoundTrip,
}

impl RandomLatencySimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the [`LatencyRange`] used for every draw.
    pub fn with_range(mut self, range: LatencyRange) -> Self {
        self.range = range;
        self
    }

    /// Set the [`RoundTrip`] mode.
    pub fn with_round_trip(mut self, round_trip: RoundTrip) -> Self {
        self.round_trip = round_trip;
        self
    }

    pub fn range(&self) -> LatencyRange {
        self.range
    }
}

impl RequestSimulator for RandomLatencySimulator {
    async fn simulate(&self, id: RequestId) -> RequestResult {
        let connect = self.range.draw();
        let respond = match self.round_trip {
            RoundTrip::Symmetric => connect,
            RoundTrip::Independent => self.range.draw(),
        };

        tracing::trace!(
            %id,
            connect_ms = connect.as_millis(),
            respond_ms = respond.as_millis(),
            "simulate server request",
        );

        connect.wait().await;
        respond.wait().await;

        id
    }
}
