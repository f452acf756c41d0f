//! Performance target reachability.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{PerfError, PerfResult};

/// Checks that the gateway under test answers before load is driven at it.
#[async_trait]
pub trait TargetProbe: Send + Sync {
    async fn check(&self, url: &str) -> PerfResult<()>;
}

/// HTTP reachability check. Any response short of a 5xx counts as reachable.
#[derive(Debug, Clone)]
pub struct HttpTargetProbe {
    client: Client,
}

impl HttpTargetProbe {
    pub fn new(timeout: Duration) -> PerfResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| PerfError::Driver(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TargetProbe for HttpTargetProbe {
    async fn check(&self, url: &str) -> PerfResult<()> {
        let unreachable = |reason: String| PerfError::TargetUnreachable {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        let status = response.status();
        debug!(url, status = status.as_u16(), "Performance target answered");
        if status.is_server_error() {
            return Err(unreachable(format!("server returned {}", status)));
        }
        Ok(())
    }
}
