use crate::request::RequestResult;

/// Running sum and count of the results folded so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateState {
    sum: i64,
    count: u64,
}

impl AggregateState {
    pub const fn new() -> Self {
        Self { sum: 0, count: 0 }
    }

    #[inline(always)]
    pub fn fold(&mut self, result: RequestResult) {
        self.sum += i64::from(result);
        self.count += 1;
    }

    #[inline(always)]
    pub const fn sum(&self) -> i64 {
        self.sum
    }

    #[inline(always)]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Truncating mean of all folded results, `None` if nothing was folded.
    pub fn mean(&self) -> Option<i32> {
        if self.count == 0 {
            return None;
        }
        // mean of i32 values always fits an i32
        Some((self.sum / self.count as i64) as i32)
    }
}
