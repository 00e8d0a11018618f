//! Simulated remote calls.
//!
//! A [`RequestSimulator`] stands in for a server round trip:
//! it only consumes wall-clock time and hands back a payload.

use std::{fmt, pin::Pin, sync::Arc};

mod fixed;
mod latency;
mod random;

pub use self::{
    fixed::FixedLatencySimulator,
    latency::{LatencyDraw, LatencyRange, RoundTrip},
    random::RandomLatencySimulator,
};

/// Identifies the logical server a request is sent to.
pub type RequestId = i32;

/// Payload produced by a completed request.
pub type RequestResult = i32;

/// Models a single remote call.
///
/// Implementations never fail: the only observable effect is the time
/// spent before the result is returned.
pub trait RequestSimulator: fmt::Debug + Send + Sync + 'static {
    fn simulate(&self, id: RequestId) -> impl Future<Output = RequestResult> + Send + '_;

    /// Converts this [`RequestSimulator`] into a [`BoxRequestSimulator`] trait object.
    fn into_dyn(self) -> BoxRequestSimulator
    where
        Self: Sized,
    {
        BoxRequestSimulator(Arc::new(self))
    }
}

impl<S: RequestSimulator> RequestSimulator for Arc<S> {
    #[inline(always)]
    fn simulate(&self, id: RequestId) -> impl Future<Output = RequestResult> + Send + '_ {
        (**self).simulate(id)
    }
}

#[derive(Debug, Clone)]
pub struct BoxRequestSimulator(Arc<dyn DynRequestSimulator + Send + Sync + 'static>);

impl RequestSimulator for BoxRequestSimulator {
    #[inline(always)]
    fn simulate(&self, id: RequestId) -> impl Future<Output = RequestResult> + Send + '_ {
        self.0.dyn_simulate(id)
    }

    fn into_dyn(self) -> BoxRequestSimulator {
        self
    }
}

/// Internal trait for dynamic dispatch of [`RequestSimulator`],
/// which cannot be made into a trait object itself
/// because of its `impl Future` return type.
#[allow(clippy::type_complexity)]
pub trait DynRequestSimulator: fmt::Debug {
    fn dyn_simulate(
        &self,
        id: RequestId,
    ) -> Pin<Box<dyn Future<Output = RequestResult> + Send + '_>>;
}

impl<S: RequestSimulator> DynRequestSimulator for S {
    #[inline(always)]
    /// see [`RequestSimulator::simulate`] for more information.
    fn dyn_simulate(
        &self,
        id: RequestId,
    ) -> Pin<Box<dyn Future<Output = RequestResult> + Send + '_>> {
        Box::pin(self.simulate(id))
    }
}
