//! Health API.

use reqwest::Method;

use crate::client::ChatwireClient;
use crate::error::Result;
use crate::types::HealthResponse;

/// Health API client.
///
/// The health endpoint sits outside `v1/` and needs no credential.
pub struct HealthApi {
    client: ChatwireClient,
}

impl HealthApi {
    pub(crate) fn new(client: ChatwireClient) -> Self {
        Self { client }
    }

    /// Check basic health.
    pub async fn check(&self) -> Result<HealthResponse> {
        let pipeline = self.client.pipeline();
        let request = pipeline.unauthenticated(Method::GET, pipeline.root_url("health")?);
        pipeline.execute(request).await
    }

    /// Simple connectivity check - returns true if the service is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.check().await.is_ok()
    }
}
