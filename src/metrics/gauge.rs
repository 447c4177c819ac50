//! Module implementing a gauge.
//!
//! See [`Gauge`] for details.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Gauge to record current measurements.
///
/// Single increasing, decreasing or constant value metric. Clones share the
/// same underlying value.
///
/// ```
/// # use aws_lambda_exporter::metrics::gauge::Gauge;
/// let gauge: Gauge = Gauge::default();
/// gauge.inc();
/// gauge.inc();
/// gauge.dec();
/// assert_eq!(1, gauge.get());
/// ```
#[derive(Debug)]
pub struct Gauge<A = AtomicI64> {
    value: Arc<A>,
}

impl<A> Clone for Gauge<A> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<A: Default> Default for Gauge<A> {
    fn default() -> Self {
        Self {
            value: Arc::new(A::default()),
        }
    }
}

impl<A: Atomic> Gauge<A> {
    /// Increase the [`Gauge`] by 1, returning the previous value.
    pub fn inc(&self) -> A::Number {
        self.value.inc()
    }

    /// Decrease the [`Gauge`] by 1, returning the previous value.
    pub fn dec(&self) -> A::Number {
        self.value.dec()
    }

    /// Get the current value of the [`Gauge`].
    pub fn get(&self) -> A::Number {
        self.value.get()
    }
}

/// Atomic operations for a [`Gauge`] value store.
pub trait Atomic {
    /// The numeric type associated with this atomic.
    type Number;

    /// Increase the value by `1`.
    fn inc(&self) -> Self::Number;

    /// Decrease the value by `1`.
    fn dec(&self) -> Self::Number;

    /// Get the the value.
    fn get(&self) -> Self::Number;
}

impl Atomic for AtomicI64 {
    type Number = i64;

    fn inc(&self) -> Self::Number {
        self.fetch_add(1, Ordering::Relaxed)
    }

    fn dec(&self) -> Self::Number {
        self.fetch_sub(1, Ordering::Relaxed)
    }

    fn get(&self) -> Self::Number {
        self.load(Ordering::Relaxed)
    }
}
