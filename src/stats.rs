//! Process-wide exporter statistics.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::metrics::counter::Counter;
use crate::metrics::gauge::Gauge;

/// Status codes reported even before the first response carrying them.
const INITIAL_CODES: [u16; 3] = [200, 400, 500];

/// Why a parsed sample was not republished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// No descriptor is registered for the family name.
    UnknownMetric,
    /// The family is a histogram, summary or untyped.
    UnsupportedType,
    /// The sample carries a label absent from the registered descriptor.
    LabelMismatch,
}

impl DropReason {
    /// All reasons, in exposition order.
    pub const ALL: [DropReason; 3] = [
        DropReason::UnknownMetric,
        DropReason::UnsupportedType,
        DropReason::LabelMismatch,
    ];

    /// Label value used when exposing the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::UnknownMetric => "unknown_metric",
            DropReason::UnsupportedType => "unsupported_type",
            DropReason::LabelMismatch => "label_mismatch",
        }
    }
}

/// Scrape phase that invokes the remote function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Learning descriptors.
    Describe,
    /// Emitting samples.
    Collect,
}

impl Phase {
    /// All phases, in exposition order.
    pub const ALL: [Phase; 2] = [Phase::Describe, Phase::Collect];

    /// Label value used when exposing the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Describe => "describe",
            Phase::Collect => "collect",
        }
    }
}

/// Cumulative counters of dropped samples, failed phases and served
/// telemetry requests.
#[derive(Debug)]
pub struct ExporterStats {
    unknown_metric: Counter,
    unsupported_type: Counter,
    label_mismatch: Counter,
    describe_failures: Counter,
    collect_failures: Counter,
    requests: RwLock<BTreeMap<u16, Counter>>,
    in_flight: Gauge,
}

impl Default for ExporterStats {
    fn default() -> Self {
        Self {
            unknown_metric: Counter::default(),
            unsupported_type: Counter::default(),
            label_mismatch: Counter::default(),
            describe_failures: Counter::default(),
            collect_failures: Counter::default(),
            requests: RwLock::new(
                INITIAL_CODES
                    .into_iter()
                    .map(|code| (code, Counter::default()))
                    .collect(),
            ),
            in_flight: Gauge::default(),
        }
    }
}

/// A telemetry request being served, counted as in flight until dropped.
#[derive(Debug)]
pub struct InFlight<'a>(&'a Gauge);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.dec();
    }
}

impl ExporterStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a telemetry request as started.
    pub fn request_started(&self) -> InFlight<'_> {
        self.in_flight.inc();
        InFlight(&self.in_flight)
    }

    /// Telemetry requests currently being served.
    pub fn in_flight(&self) -> i64 {
        self.in_flight.get()
    }

    /// Count one telemetry response with status `code`.
    pub fn record_response(&self, code: u16) {
        if let Some(counter) = self.requests.read().get(&code) {
            counter.inc();
            return;
        }
        self.requests.write().entry(code).or_default().inc();
    }

    /// Telemetry responses so far, by status code in ascending order.
    pub fn responses(&self) -> Vec<(u16, u64)> {
        self.requests
            .read()
            .iter()
            .map(|(code, counter)| (*code, counter.get()))
            .collect()
    }

    /// Count `n` samples dropped for `reason`.
    pub fn record_drops(&self, reason: DropReason, n: u64) {
        self.drop_counter(reason).inc_by(n);
    }

    /// Samples dropped for `reason` so far.
    pub fn dropped(&self, reason: DropReason) -> u64 {
        self.drop_counter(reason).get()
    }

    /// Count one failed invocation of `phase`.
    pub fn record_failure(&self, phase: Phase) {
        self.failure_counter(phase).inc();
    }

    /// Failed invocations of `phase` so far.
    pub fn failures(&self, phase: Phase) -> u64 {
        self.failure_counter(phase).get()
    }

    fn drop_counter(&self, reason: DropReason) -> &Counter {
        match reason {
            DropReason::UnknownMetric => &self.unknown_metric,
            DropReason::UnsupportedType => &self.unsupported_type,
            DropReason::LabelMismatch => &self.label_mismatch,
        }
    }

    fn failure_counter(&self, phase: Phase) -> &Counter {
        match phase {
            Phase::Describe => &self.describe_failures,
            Phase::Collect => &self.collect_failures,
        }
    }
}
