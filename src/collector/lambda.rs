//! Republishes the metrics returned by a Lambda function.
//!
//! A scrape runs two phases against the same [`Target`]. [`describe`]
//! registers the shape of every family the function returns, [`collect`]
//! translates the samples of a second invocation against the registered
//! shapes.
//!
//! [`describe`]: LambdaCollector::describe
//! [`collect`]: LambdaCollector::collect

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::collector::Collector;
use crate::encoding::DescriptorEncoder;
use crate::error::Result;
use crate::invoke::Invoke;
use crate::metrics::MetricType;
use crate::parser::{self, MetricFamily, Sample};
use crate::registry::{Descriptor, DescriptorRegistry};
use crate::stats::{DropReason, ExporterStats, Phase};

/// One function in one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Region the function is deployed in.
    pub region: String,
    /// Name or ARN of the function.
    pub function_name: String,
}

impl Target {
    /// Create new [`Target`].
    pub fn new(region: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            function_name: function_name.into(),
        }
    }
}

/// Collector bound to one [`Target`] for the duration of one scrape.
#[derive(Debug)]
pub struct LambdaCollector {
    target: Target,
    client: Arc<dyn Invoke>,
    registry: Arc<DescriptorRegistry>,
    stats: Arc<ExporterStats>,
}

impl LambdaCollector {
    /// Create new [`LambdaCollector`].
    pub fn new(
        target: Target,
        client: Arc<dyn Invoke>,
        registry: Arc<DescriptorRegistry>,
        stats: Arc<ExporterStats>,
    ) -> Self {
        Self {
            target,
            client,
            registry,
            stats,
        }
    }

    /// Target of the collector.
    pub fn target(&self) -> &Target {
        &self.target
    }

    async fn invoke(&self) -> Result<BTreeMap<String, MetricFamily>> {
        let invocation = self.client.invoke(&self.target.function_name).await?;
        if let Some(log) = &invocation.log_result {
            debug!(
                function_name = %self.target.function_name,
                region = %self.target.region,
                log = %log,
                "function log tail"
            );
        }
        parser::parse_payload(&invocation.into_payload()?)
    }

    /// Invoke the function and register a descriptor for every family it
    /// returns that is not known yet.
    ///
    /// Returns the descriptors in effect for the returned families. A failed
    /// invocation or a malformed payload is logged and counted and yields no
    /// descriptors.
    pub async fn describe(&self) -> Vec<Arc<Descriptor>> {
        match self.invoke().await {
            Ok(families) => families
                .values()
                .map(|family| self.registry.register_family(family))
                .collect(),
            Err(err) => {
                error!(
                    function_name = %self.target.function_name,
                    region = %self.target.region,
                    error = %err,
                    "describe failed"
                );
                self.stats.record_failure(Phase::Describe);
                Vec::new()
            }
        }
    }

    /// Invoke the function and translate its counters and gauges into
    /// samples of registered descriptors.
    ///
    /// Samples of unknown families, of unsupported types and with labels the
    /// descriptor lacks are dropped and counted. A failed invocation or a
    /// malformed payload is logged, counted and returned.
    pub async fn collect(&self) -> Result<Collection> {
        let families = self.invoke().await.inspect_err(|err| {
            error!(
                function_name = %self.target.function_name,
                region = %self.target.region,
                error = %err,
                "collect failed"
            );
            self.stats.record_failure(Phase::Collect);
        })?;

        let mut metrics = Vec::new();
        for family in families.values() {
            self.translate(family, &mut metrics);
        }
        Ok(Collection(metrics))
    }

    fn translate(&self, family: &MetricFamily, metrics: &mut Vec<ConstMetric>) {
        let samples = family.samples().len() as u64;

        let Some(descriptor) = self.registry.lookup(family.name()) else {
            debug!(metric = family.name(), "no descriptor registered, skipping");
            self.stats.record_drops(DropReason::UnknownMetric, samples);
            return;
        };

        if !family.metric_type().is_supported() {
            debug!(
                metric = family.name(),
                metric_type = family.metric_type().as_str(),
                "unsupported metric type, skipping"
            );
            self.stats.record_drops(DropReason::UnsupportedType, samples);
            return;
        }

        for sample in family.samples() {
            match align_labels(descriptor.label_names(), sample) {
                Some(label_values) => metrics.push(ConstMetric {
                    descriptor: descriptor.clone(),
                    metric_type: family.metric_type(),
                    label_values,
                    value: sample.value(),
                }),
                None => {
                    warn!(
                        metric = family.name(),
                        "sample carries labels outside the registered descriptor, dropping"
                    );
                    self.stats.record_drops(DropReason::LabelMismatch, 1);
                }
            }
        }
    }
}

/// Order the label values of `sample` by the sorted `label_names`, padding
/// absent labels with the empty string. `None` if the sample carries a label
/// not in `label_names`.
fn align_labels(label_names: &[String], sample: &Sample) -> Option<Vec<String>> {
    let mut labels: Vec<&(String, String)> = sample.labels().iter().collect();
    labels.sort_by(|a, b| a.0.cmp(&b.0));

    let mut labels = labels.into_iter().peekable();
    let mut values = Vec::with_capacity(label_names.len());
    for name in label_names {
        match labels.peek() {
            Some((label, value)) if label == name => {
                values.push(value.clone());
                labels.next();
            }
            Some((label, _)) if label < name => return None,
            _ => values.push(String::new()),
        }
    }

    match labels.next() {
        Some(_) => None,
        None => Some(values),
    }
}

/// A sample of a registered descriptor with its label values in descriptor
/// order.
#[derive(Debug, Clone)]
pub struct ConstMetric {
    descriptor: Arc<Descriptor>,
    metric_type: MetricType,
    label_values: Vec<String>,
    value: f64,
}

impl ConstMetric {
    /// Descriptor the sample belongs to.
    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }

    /// Label values, positionally matching the descriptor's label names.
    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Sample value.
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Samples produced by one collection phase.
#[derive(Debug, Default)]
pub struct Collection(Vec<ConstMetric>);

impl Collection {
    /// The collected samples, grouped by descriptor.
    pub fn metrics(&self) -> &[ConstMetric] {
        &self.0
    }
}

impl Collector for Collection {
    fn encode(&self, mut encoder: DescriptorEncoder) -> std::result::Result<(), std::fmt::Error> {
        for family in self
            .0
            .chunk_by(|a, b| Arc::ptr_eq(&a.descriptor, &b.descriptor))
        {
            let first = &family[0];
            let descriptor = &first.descriptor;
            let mut metric_encoder = encoder.encode_descriptor(
                descriptor.name(),
                descriptor.help(),
                first.metric_type,
            )?;
            for metric in family {
                let labels = descriptor
                    .label_names()
                    .iter()
                    .map(String::as_str)
                    .zip(metric.label_values.iter().map(String::as_str));
                metric_encoder.encode_sample(labels, &metric.value)?;
            }
        }

        Ok(())
    }
}
