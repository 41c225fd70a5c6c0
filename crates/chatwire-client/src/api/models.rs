//! Models API.

use crate::client::ChatwireClient;
use crate::error::Result;
use crate::types::{Model, ModelList};

/// Models API client.
pub struct ModelsApi {
    client: ChatwireClient,
}

impl ModelsApi {
    pub(crate) fn new(client: ChatwireClient) -> Self {
        Self { client }
    }

    /// List available models.
    pub async fn list(&self) -> Result<ModelList> {
        self.client.pipeline().get("models").await
    }

    /// Get a model by ID.
    pub async fn get(&self, id: &str) -> Result<Model> {
        self.client.pipeline().get(&format!("models/{}", id)).await
    }
}
