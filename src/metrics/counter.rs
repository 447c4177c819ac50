//! Module implementing a monotonic counter.
//!
//! See [`Counter`] for details.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter to measure discrete events.
///
/// Single monotonically increasing value metric. Clones share the same
/// underlying value.
///
/// ```
/// # use aws_lambda_exporter::metrics::counter::Counter;
/// let counter: Counter = Counter::default();
/// counter.inc();
/// assert_eq!(1, counter.get());
/// ```
#[derive(Debug)]
pub struct Counter<A = AtomicU64> {
    value: Arc<A>,
}

impl<A> Clone for Counter<A> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<A: Default> Default for Counter<A> {
    fn default() -> Self {
        Counter {
            value: Arc::new(A::default()),
        }
    }
}

impl<A: Atomic> Counter<A> {
    /// Increase the [`Counter`] by 1, returning the previous value.
    pub fn inc(&self) -> A::Number {
        self.value.inc()
    }

    /// Increase the [`Counter`] by `v`, returning the previous value.
    pub fn inc_by(&self, v: A::Number) -> A::Number {
        self.value.inc_by(v)
    }

    /// Get the current value of the [`Counter`].
    pub fn get(&self) -> A::Number {
        self.value.get()
    }
}

/// Atomic operations for a [`Counter`] value store.
pub trait Atomic {
    /// The numeric type associated with this atomic.
    type Number;

    /// Increase the value by `1`.
    fn inc(&self) -> Self::Number;

    /// Increase the value.
    fn inc_by(&self, v: Self::Number) -> Self::Number;

    /// Get the the value.
    fn get(&self) -> Self::Number;
}

impl Atomic for AtomicU64 {
    type Number = u64;

    fn inc(&self) -> Self::Number {
        self.inc_by(1)
    }

    fn inc_by(&self, v: Self::Number) -> Self::Number {
        self.fetch_add(v, Ordering::Relaxed)
    }

    fn get(&self) -> Self::Number {
        self.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inc_and_get() {
        let counter: Counter = Counter::default();
        assert_eq!(0, counter.inc());
        assert_eq!(1, counter.get());
    }

    #[test]
    fn clones_share_state() {
        let counter: Counter = Counter::default();
        let clone = counter.clone();
        clone.inc_by(5);
        assert_eq!(5, counter.get());
    }
}
