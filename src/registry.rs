//! Descriptor registry implementation.
//!
//! See [`DescriptorRegistry`] for details.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::parser::MetricFamily;

/// Shape of a republished metric: name, help text and sorted label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    help: String,
    label_names: Vec<String>,
}

impl Descriptor {
    /// Create new [`Descriptor`]. Label names are sorted and deduplicated.
    pub fn new<N: Into<String>, H: Into<String>>(
        name: N,
        help: H,
        label_names: impl IntoIterator<Item = String>,
    ) -> Self {
        let label_names: BTreeSet<String> = label_names.into_iter().collect();
        Descriptor {
            name: name.into(),
            help: help.into(),
            label_names: label_names.into_iter().collect(),
        }
    }

    /// Derive the descriptor of a parsed family.
    ///
    /// The label names are the union over all samples of the family. The
    /// bucket bound of histograms and the quantile of summaries are not
    /// dimensions of the family and are left out.
    pub fn from_family(family: &MetricFamily) -> Self {
        let reserved = family.metric_type().reserved_label();
        let label_names = family
            .samples()
            .iter()
            .flat_map(|sample| sample.labels().iter().map(|(name, _)| name))
            .filter(|name| Some(name.as_str()) != reserved)
            .cloned();

        Descriptor::new(family.name(), family.help(), label_names)
    }

    /// Returns the name of the [`Descriptor`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the help text of the [`Descriptor`].
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Returns the lexicographically sorted label names of the [`Descriptor`].
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }
}

/// Process-wide map from metric name to [`Descriptor`].
///
/// Append-only: the first registration of a name wins and is never replaced,
/// widened or narrowed afterwards. Descriptors are handed out as
/// [`Arc`]s, so readers always observe a fully built descriptor.
///
/// ```
/// # use aws_lambda_exporter::metrics::MetricType;
/// # use aws_lambda_exporter::parser::{MetricFamily, Sample};
/// # use aws_lambda_exporter::registry::DescriptorRegistry;
/// #
/// let registry = DescriptorRegistry::new();
///
/// let first = MetricFamily::new("jobs", "Queued jobs.", MetricType::Gauge)
///     .with_sample(Sample::new([("queue", "a")], 1.0));
/// let second = MetricFamily::new("jobs", "Other help.", MetricType::Gauge)
///     .with_sample(Sample::new([("queue", "a"), ("shard", "1")], 1.0));
///
/// registry.register_family(&first);
/// let descriptor = registry.register_family(&second);
///
/// assert_eq!("Queued jobs.", descriptor.help());
/// assert_eq!(descriptor.label_names(), ["queue"]);
/// ```
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    descriptors: RwLock<HashMap<String, Arc<Descriptor>>>,
}

impl DescriptorRegistry {
    /// Creates an empty [`DescriptorRegistry`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the descriptor registered for `name`.
    pub fn lookup(&self, name: &str) -> Option<Arc<Descriptor>> {
        self.descriptors.read().get(name).cloned()
    }

    /// Register the descriptor of `family` unless its name is already known,
    /// returning the descriptor in effect for the name.
    pub fn register_family(&self, family: &MetricFamily) -> Arc<Descriptor> {
        if let Some(descriptor) = self.lookup(family.name()) {
            return descriptor;
        }

        let descriptor = Descriptor::from_family(family);
        self.descriptors
            .write()
            .entry(family.name().to_owned())
            .or_insert_with(|| Arc::new(descriptor))
            .clone()
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    /// Whether no descriptor was registered yet.
    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }
}
