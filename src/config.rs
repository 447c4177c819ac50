//! Command line configuration.

use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Output format of the log subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[allow(missing_docs)]
pub enum LogFormat {
    Text,
    Json,
}

/// Prometheus exporter for metrics returned by AWS Lambda functions.
#[derive(Debug, Parser)]
#[command(name = "aws-lambda-exporter", version)]
pub struct Cli {
    /// Address to listen on for web interface and telemetry.
    #[arg(long = "web.listen-address", default_value = "0.0.0.0:9408")]
    pub listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    pub telemetry_path: String,

    /// Override of the Lambda API endpoint, e.g. for a local emulator.
    #[arg(long = "lambda.endpoint")]
    pub lambda_endpoint: Option<String>,

    /// Base URL of the EC2 instance metadata service.
    #[arg(long = "metadata.endpoint", default_value = "http://169.254.169.254")]
    pub metadata_endpoint: String,

    /// Timeout of instance metadata requests in milliseconds.
    #[arg(long = "metadata.timeout-ms", default_value_t = 1000)]
    pub metadata_timeout_ms: u64,

    /// Log output format.
    #[arg(long = "log.format", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Telemetry path with a leading slash.
    pub fn telemetry_path(&self) -> String {
        if self.telemetry_path.starts_with('/') {
            self.telemetry_path.clone()
        } else {
            format!("/{}", self.telemetry_path)
        }
    }

    /// Timeout of instance metadata requests.
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }
}
