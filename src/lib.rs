#![deny(dead_code)]
#![deny(missing_docs)]
#![deny(unused)]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Prometheus exporter for metrics computed by AWS Lambda functions.
//!
//! On each scrape the exporter invokes a Lambda function, expects a JSON
//! payload of the form `{"result": "<text exposition>"}`, parses the embedded
//! Prometheus text format and republishes the counters and gauges it contains.
//!
//! Metric shapes are learned once and kept in a process-wide
//! [`DescriptorRegistry`](registry::DescriptorRegistry): the first payload
//! that advertises a metric name fixes its help text and label names for the
//! lifetime of the process.
//!
//! # Examples
//!
//! ```
//! use aws_lambda_exporter::parser::parse_payload;
//! use aws_lambda_exporter::registry::DescriptorRegistry;
//!
//! let payload = br##"{"result": "# TYPE demo_total counter\ndemo_total{x=\"a\"} 3\n"}"##;
//! let families = parse_payload(payload).unwrap();
//!
//! let registry = DescriptorRegistry::new();
//! for family in families.values() {
//!     registry.register_family(family);
//! }
//!
//! let descriptor = registry.lookup("demo_total").unwrap();
//! assert_eq!(descriptor.label_names(), ["x"]);
//! ```

pub mod collector;
pub mod config;
pub mod encoding;
pub mod error;
pub mod invoke;
pub mod metrics;
pub mod parser;
pub mod region;
pub mod registry;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
