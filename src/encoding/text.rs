//! Prometheus text-based exposition format, version 0.0.4.
//!
//! ```
//! # use aws_lambda_exporter::collector::Collector;
//! # use aws_lambda_exporter::encoding::text::encode;
//! # use aws_lambda_exporter::encoding::DescriptorEncoder;
//! # use aws_lambda_exporter::metrics::MetricType;
//! #
//! #[derive(Debug)]
//! struct Requests;
//!
//! impl Collector for Requests {
//!     fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
//!         let mut metric = encoder.encode_descriptor(
//!             "requests_total",
//!             "Requests served.",
//!             MetricType::Counter,
//!         )?;
//!         metric.encode_sample([("method", "GET")], &7u64)?;
//!         Ok(())
//!     }
//! }
//!
//! let collectors: Vec<Box<dyn Collector>> = vec![Box::new(Requests)];
//! let mut buffer = String::new();
//! encode(&mut buffer, &collectors).unwrap();
//!
//! let expected = "# HELP requests_total Requests served.\n".to_owned()
//!     + "# TYPE requests_total counter\n"
//!     + "requests_total{method=\"GET\"} 7\n";
//! assert_eq!(expected, buffer);
//! ```

use std::fmt::Write;

use crate::collector::Collector;
use crate::encoding::EncodeValue;
use crate::metrics::MetricType;

/// Content type of documents produced by [`encode`].
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Encode the metrics of all given collectors, in order, into the provided
/// [`Write`]r.
pub fn encode<W>(writer: &mut W, collectors: &[Box<dyn Collector>]) -> Result<(), std::fmt::Error>
where
    W: Write,
{
    for collector in collectors {
        collector.encode(DescriptorEncoder::new(&mut *writer))?;
    }

    Ok(())
}

/// Encoder for the `# HELP` / `# TYPE` header of a metric family.
pub struct DescriptorEncoder<'a> {
    writer: &'a mut dyn Write,
}

impl std::fmt::Debug for DescriptorEncoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorEncoder").finish()
    }
}

impl<'a> DescriptorEncoder<'a> {
    pub(crate) fn new(writer: &'a mut dyn Write) -> Self {
        Self { writer }
    }

    /// Write the family header and return an encoder for its samples.
    ///
    /// The `# HELP` line is omitted when `help` is empty.
    pub fn encode_descriptor<'s>(
        &'s mut self,
        name: &'s str,
        help: &str,
        metric_type: MetricType,
    ) -> Result<MetricEncoder<'s>, std::fmt::Error> {
        if !help.is_empty() {
            self.writer.write_str("# HELP ")?;
            self.writer.write_str(name)?;
            self.writer.write_str(" ")?;
            write_escaped_help(&mut *self.writer, help)?;
            self.writer.write_str("\n")?;
        }

        self.writer.write_str("# TYPE ")?;
        self.writer.write_str(name)?;
        self.writer.write_str(" ")?;
        self.writer.write_str(metric_type.as_str())?;
        self.writer.write_str("\n")?;

        Ok(MetricEncoder {
            writer: &mut *self.writer,
            name,
        })
    }
}

/// Encoder for the sample lines of one metric family.
pub struct MetricEncoder<'a> {
    writer: &'a mut dyn Write,
    name: &'a str,
}

impl std::fmt::Debug for MetricEncoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricEncoder")
            .field("name", &self.name)
            .finish()
    }
}

impl MetricEncoder<'_> {
    /// Encode one sample line with the given label pairs.
    pub fn encode_sample<'l, L, V>(&mut self, labels: L, value: &V) -> Result<(), std::fmt::Error>
    where
        L: IntoIterator<Item = (&'l str, &'l str)>,
        V: EncodeValue + ?Sized,
    {
        self.writer.write_str(self.name)?;

        let mut labels = labels.into_iter().peekable();
        if labels.peek().is_some() {
            self.writer.write_str("{")?;
            for (i, (name, label_value)) in labels.enumerate() {
                if i > 0 {
                    self.writer.write_str(",")?;
                }
                self.writer.write_str(name)?;
                self.writer.write_str("=\"")?;
                write_escaped_label_value(&mut *self.writer, label_value)?;
                self.writer.write_str("\"")?;
            }
            self.writer.write_str("}")?;
        }

        self.writer.write_str(" ")?;
        value.encode(&mut *self.writer)?;
        self.writer.write_str("\n")?;

        Ok(())
    }

    /// Encode one sample line without labels.
    pub fn encode_value<V>(&mut self, value: &V) -> Result<(), std::fmt::Error>
    where
        V: EncodeValue + ?Sized,
    {
        self.encode_sample(std::iter::empty(), value)
    }
}

fn write_escaped_help(writer: &mut dyn Write, help: &str) -> Result<(), std::fmt::Error> {
    for c in help.chars() {
        match c {
            '\\' => writer.write_str("\\\\")?,
            '\n' => writer.write_str("\\n")?,
            c => writer.write_char(c)?,
        }
    }
    Ok(())
}

fn write_escaped_label_value(writer: &mut dyn Write, value: &str) -> Result<(), std::fmt::Error> {
    for c in value.chars() {
        match c {
            '\\' => writer.write_str("\\\\")?,
            '"' => writer.write_str("\\\"")?,
            '\n' => writer.write_str("\\n")?,
            c => writer.write_char(c)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed {
        name: &'static str,
        help: &'static str,
        metric_type: MetricType,
        samples: Vec<(Vec<(&'static str, &'static str)>, f64)>,
    }

    impl Collector for Fixed {
        fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
            let mut metric = encoder.encode_descriptor(self.name, self.help, self.metric_type)?;
            for (labels, value) in &self.samples {
                metric.encode_sample(labels.iter().copied(), value)?;
            }
            Ok(())
        }
    }

    fn encode_one(collector: Fixed) -> String {
        let collectors: Vec<Box<dyn Collector>> = vec![Box::new(collector)];
        let mut buffer = String::new();
        encode(&mut buffer, &collectors).unwrap();
        buffer
    }

    #[test]
    fn encode_counter_family() {
        let encoded = encode_one(Fixed {
            name: "demo_total",
            help: "Demo counter.",
            metric_type: MetricType::Counter,
            samples: vec![(vec![("x", "a")], 3.0), (vec![("x", "b")], 5.0)],
        });

        let expected = "# HELP demo_total Demo counter.\n".to_owned()
            + "# TYPE demo_total counter\n"
            + "demo_total{x=\"a\"} 3\n"
            + "demo_total{x=\"b\"} 5\n";
        assert_eq!(expected, encoded);
    }

    #[test]
    fn encode_without_help_or_labels() {
        let encoded = encode_one(Fixed {
            name: "temperature",
            help: "",
            metric_type: MetricType::Gauge,
            samples: vec![(vec![], 21.5)],
        });

        assert_eq!("# TYPE temperature gauge\ntemperature 21.5\n", encoded);
    }

    #[test]
    fn escape_help_and_label_values() {
        let encoded = encode_one(Fixed {
            name: "escaped",
            help: "back\\slash\nnewline",
            metric_type: MetricType::Gauge,
            samples: vec![(vec![("path", "C:\\dir \"quoted\"\n")], 1.0)],
        });

        let expected = "# HELP escaped back\\\\slash\\nnewline\n".to_owned()
            + "# TYPE escaped gauge\n"
            + "escaped{path=\"C:\\\\dir \\\"quoted\\\"\\n\"} 1\n";
        assert_eq!(expected, encoded);
    }

    #[test]
    fn encode_collectors_in_order() {
        let collectors: Vec<Box<dyn Collector>> = vec![
            Box::new(Fixed {
                name: "first",
                help: "",
                metric_type: MetricType::Gauge,
                samples: vec![(vec![], 1.0)],
            }),
            Box::new(Fixed {
                name: "second",
                help: "",
                metric_type: MetricType::Gauge,
                samples: vec![(vec![], 2.0)],
            }),
        ];
        let mut buffer = String::new();
        encode(&mut buffer, &collectors).unwrap();

        assert_eq!(
            "# TYPE first gauge\nfirst 1\n# TYPE second gauge\nsecond 2\n",
            buffer
        );
    }
}
