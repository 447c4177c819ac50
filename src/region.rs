//! Region discovery.
//!
//! The region is resolved once per process and cached: from the EC2 instance
//! metadata service when it is reachable, else from `AWS_REGION`, else
//! [`DEFAULT_REGION`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::imds;
use aws_sdk_lambda::error::DisplayErrorContext;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Region used when neither instance metadata nor the environment name one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// The parts of the instance metadata service the exporter relies on.
#[async_trait]
pub trait InstanceMetadata: std::fmt::Debug + Send + Sync {
    /// Whether the service answers at all.
    async fn available(&self) -> bool;

    /// Region of the instance.
    async fn region(&self) -> Result<String>;
}

/// Resolves and caches the region of the process.
#[derive(Debug)]
pub struct RegionResolver {
    metadata: Arc<dyn InstanceMetadata>,
    env_region: Option<String>,
    region: OnceCell<String>,
}

impl RegionResolver {
    /// Create a resolver. `env_region` is the value of `AWS_REGION`, if set.
    pub fn new(metadata: Arc<dyn InstanceMetadata>, env_region: Option<String>) -> Self {
        Self {
            metadata,
            env_region: env_region.filter(|region| !region.is_empty()),
            region: OnceCell::new(),
        }
    }

    /// The region, resolving it on first use.
    ///
    /// Concurrent first callers share a single lookup. A failed lookup is
    /// not cached and is retried by the next caller.
    pub async fn resolve(&self) -> Result<String> {
        self.region
            .get_or_try_init(|| self.lookup())
            .await
            .cloned()
    }

    async fn lookup(&self) -> Result<String> {
        if self.metadata.available().await {
            let region = self.metadata.region().await?;
            if region.is_empty() {
                return Err(Error::Metadata("empty region".to_owned()));
            }
            info!(%region, "resolved region from instance metadata");
            return Ok(region);
        }

        let region = match &self.env_region {
            Some(region) => region.clone(),
            None => DEFAULT_REGION.to_owned(),
        };
        info!(%region, "instance metadata unavailable, using fallback region");
        Ok(region)
    }
}

/// Instance metadata read through the SDK's IMDSv2 client, which caches
/// its session token between requests.
#[derive(Debug, Clone)]
pub struct ImdsMetadata {
    client: imds::Client,
}

impl ImdsMetadata {
    /// Create a client for the service at `endpoint`, giving up on requests
    /// after `timeout` without retrying.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = imds::Client::builder()
            .endpoint(endpoint)
            .map_err(|e| Error::Endpoint(format!("{endpoint}: {e}")))?
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .max_attempts(1)
            .build();

        Ok(Self { client })
    }

    async fn get(&self, path: &str) -> Result<String> {
        let value = self
            .client
            .get(path)
            .await
            .map_err(|e| Error::Metadata(DisplayErrorContext(&e).to_string()))?;
        let value: &str = value.as_ref();
        Ok(value.trim().to_owned())
    }
}

#[async_trait]
impl InstanceMetadata for ImdsMetadata {
    async fn available(&self) -> bool {
        match self.get("/latest/meta-data/instance-id").await {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, "instance metadata unavailable");
                false
            }
        }
    }

    async fn region(&self) -> Result<String> {
        self.get("/latest/meta-data/placement/region").await
    }
}
