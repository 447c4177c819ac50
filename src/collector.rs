//! Metric collector implementations.
//!
//! See [`Collector`] for details.

use crate::encoding::DescriptorEncoder;

pub mod lambda;
pub mod process;
pub mod scrape;

pub use lambda::{Collection, ConstMetric, LambdaCollector, Target};
pub use process::ProcessCollector;
pub use scrape::ScrapeCollector;

/// The [`Collector`] abstraction provides metrics and their description on
/// each scrape.
///
/// A scrape response is the concatenation of the output of several
/// collectors, see [`encode`](crate::encoding::text::encode).
///
/// ```
/// # use aws_lambda_exporter::collector::Collector;
/// # use aws_lambda_exporter::encoding::DescriptorEncoder;
/// # use aws_lambda_exporter::metrics::MetricType;
/// #
/// #[derive(Debug)]
/// struct MyCollector {}
///
/// impl Collector for MyCollector {
///     fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
///         let mut metric_encoder = encoder.encode_descriptor(
///             "my_counter",
///             "some help",
///             MetricType::Counter,
///         )?;
///         metric_encoder.encode_value(&42u64)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Collector: std::fmt::Debug + Send + Sync + 'static {
    /// Called once per scrape response that includes this collector.
    fn encode(&self, encoder: DescriptorEncoder) -> Result<(), std::fmt::Error>;
}
