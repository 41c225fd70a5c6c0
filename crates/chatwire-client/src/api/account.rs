//! Account API.

use crate::client::ChatwireClient;
use crate::error::Result;
use crate::types::{Balance, UsageReport};

/// Account API client.
pub struct AccountApi {
    client: ChatwireClient,
}

impl AccountApi {
    pub(crate) fn new(client: ChatwireClient) -> Self {
        Self { client }
    }

    /// Current prepaid balance.
    pub async fn balance(&self) -> Result<Balance> {
        self.client.pipeline().get("account/balance").await
    }

    /// Usage between two ISO 8601 dates.
    pub async fn usage(&self, start: &str, end: &str) -> Result<UsageReport> {
        self.client
            .pipeline()
            .get_with_query(
                "account/usage",
                &[("start", start.to_string()), ("end", end.to_string())],
            )
            .await
    }
}
