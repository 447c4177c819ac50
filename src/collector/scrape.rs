//! Metrics describing the scrape itself and the exporter's cumulative state.

use std::sync::Arc;
use std::time::Duration;

use crate::collector::{Collector, Target};
use crate::encoding::DescriptorEncoder;
use crate::metrics::MetricType;
use crate::stats::{DropReason, ExporterStats, Phase};

const NAMESPACE: &str = "aws_lambda";

/// Outcome of one scrape of one [`Target`].
#[derive(Debug)]
pub struct ScrapeCollector {
    target: Target,
    up: bool,
    duration: Duration,
    descriptors: usize,
    stats: Arc<ExporterStats>,
}

impl ScrapeCollector {
    /// Create new [`ScrapeCollector`].
    ///
    /// `up` tells whether the collection phase succeeded, `descriptors` is
    /// the size of the descriptor registry after the scrape.
    pub fn new(
        target: Target,
        up: bool,
        duration: Duration,
        descriptors: usize,
        stats: Arc<ExporterStats>,
    ) -> Self {
        Self {
            target,
            up,
            duration,
            descriptors,
            stats,
        }
    }
}

impl Collector for ScrapeCollector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
        let target = [
            ("function_name", self.target.function_name.as_str()),
            ("region", self.target.region.as_str()),
        ];

        let up = format!("{NAMESPACE}_up");
        encoder
            .encode_descriptor(
                &up,
                "Whether the last collection from the function succeeded.",
                MetricType::Gauge,
            )?
            .encode_sample(target, &u64::from(self.up))?;

        let duration = format!("{NAMESPACE}_scrape_duration_seconds");
        encoder
            .encode_descriptor(
                &duration,
                "Time spent invoking the function and translating its metrics.",
                MetricType::Gauge,
            )?
            .encode_sample(target, &self.duration.as_secs_f64())?;

        let descriptors = format!("{NAMESPACE}_exporter_descriptors");
        encoder
            .encode_descriptor(
                &descriptors,
                "Number of metric descriptors learned from functions.",
                MetricType::Gauge,
            )?
            .encode_value(&(self.descriptors as u64))?;

        let dropped = format!("{NAMESPACE}_exporter_samples_dropped_total");
        let mut metric_encoder = encoder.encode_descriptor(
            &dropped,
            "Samples returned by functions that were not republished.",
            MetricType::Counter,
        )?;
        for reason in DropReason::ALL {
            metric_encoder
                .encode_sample([("reason", reason.as_str())], &self.stats.dropped(reason))?;
        }

        let failures = format!("{NAMESPACE}_exporter_phase_failures_total");
        let mut metric_encoder = encoder.encode_descriptor(
            &failures,
            "Failed function invocations by scrape phase.",
            MetricType::Counter,
        )?;
        for phase in Phase::ALL {
            metric_encoder.encode_sample([("phase", phase.as_str())], &self.stats.failures(phase))?;
        }

        encoder
            .encode_descriptor(
                "promhttp_metric_handler_requests_in_flight",
                "Current number of scrapes being served.",
                MetricType::Gauge,
            )?
            .encode_value(&self.stats.in_flight())?;

        let mut metric_encoder = encoder.encode_descriptor(
            "promhttp_metric_handler_requests_total",
            "Total number of scrapes by HTTP status code.",
            MetricType::Counter,
        )?;
        for (code, requests) in self.stats.responses() {
            let code = code.to_string();
            metric_encoder.encode_sample([("code", code.as_str())], &requests)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::text::encode;

    #[test]
    fn encode_scrape_metrics() {
        let stats = Arc::new(ExporterStats::new());
        stats.record_drops(DropReason::LabelMismatch, 2);
        stats.record_failure(Phase::Describe);
        stats.record_response(200);
        stats.record_response(400);
        let _in_flight = stats.request_started();

        let collectors: Vec<Box<dyn Collector>> = vec![Box::new(ScrapeCollector::new(
            Target::new("eu-west-1", "demo"),
            false,
            Duration::from_millis(250),
            3,
            stats.clone(),
        ))];
        let mut buffer = String::new();
        encode(&mut buffer, &collectors).unwrap();

        let expected = concat!(
            "# HELP aws_lambda_up Whether the last collection from the function succeeded.\n",
            "# TYPE aws_lambda_up gauge\n",
            "aws_lambda_up{function_name=\"demo\",region=\"eu-west-1\"} 0\n",
            "# HELP aws_lambda_scrape_duration_seconds Time spent invoking the function and translating its metrics.\n",
            "# TYPE aws_lambda_scrape_duration_seconds gauge\n",
            "aws_lambda_scrape_duration_seconds{function_name=\"demo\",region=\"eu-west-1\"} 0.25\n",
            "# HELP aws_lambda_exporter_descriptors Number of metric descriptors learned from functions.\n",
            "# TYPE aws_lambda_exporter_descriptors gauge\n",
            "aws_lambda_exporter_descriptors 3\n",
            "# HELP aws_lambda_exporter_samples_dropped_total Samples returned by functions that were not republished.\n",
            "# TYPE aws_lambda_exporter_samples_dropped_total counter\n",
            "aws_lambda_exporter_samples_dropped_total{reason=\"unknown_metric\"} 0\n",
            "aws_lambda_exporter_samples_dropped_total{reason=\"unsupported_type\"} 0\n",
            "aws_lambda_exporter_samples_dropped_total{reason=\"label_mismatch\"} 2\n",
            "# HELP aws_lambda_exporter_phase_failures_total Failed function invocations by scrape phase.\n",
            "# TYPE aws_lambda_exporter_phase_failures_total counter\n",
            "aws_lambda_exporter_phase_failures_total{phase=\"describe\"} 1\n",
            "aws_lambda_exporter_phase_failures_total{phase=\"collect\"} 0\n",
            "# HELP promhttp_metric_handler_requests_in_flight Current number of scrapes being served.\n",
            "# TYPE promhttp_metric_handler_requests_in_flight gauge\n",
            "promhttp_metric_handler_requests_in_flight 1\n",
            "# HELP promhttp_metric_handler_requests_total Total number of scrapes by HTTP status code.\n",
            "# TYPE promhttp_metric_handler_requests_total counter\n",
            "promhttp_metric_handler_requests_total{code=\"200\"} 1\n",
            "promhttp_metric_handler_requests_total{code=\"400\"} 1\n",
            "promhttp_metric_handler_requests_total{code=\"500\"} 0\n",
        );
        assert_eq!(expected, buffer);
    }
}
