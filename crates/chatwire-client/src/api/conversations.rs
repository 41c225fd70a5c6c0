//! Conversations API.

use crate::client::ChatwireClient;
use crate::error::Result;
use crate::types::{Conversation, ConversationList, ConversationMessages, CreateConversationRequest};

/// Query parameters for listing conversations.
#[derive(Debug, Default, Clone)]
pub struct ListConversationsQuery {
    /// Maximum number of conversations to return.
    pub limit: Option<usize>,
    /// Cursor from a previous page.
    pub cursor: Option<String>,
}

impl ListConversationsQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        pairs
    }
}

/// Conversations API client.
pub struct ConversationsApi {
    client: ChatwireClient,
}

impl ConversationsApi {
    pub(crate) fn new(client: ChatwireClient) -> Self {
        Self { client }
    }

    /// List conversations.
    pub async fn list(&self) -> Result<ConversationList> {
        self.list_with_query(ListConversationsQuery::default()).await
    }

    /// List conversations with paging parameters.
    pub async fn list_with_query(&self, query: ListConversationsQuery) -> Result<ConversationList> {
        self.client
            .pipeline()
            .get_with_query("conversations", &query.pairs())
            .await
    }

    /// Get a conversation by ID.
    pub async fn get(&self, id: &str) -> Result<Conversation> {
        self.client
            .pipeline()
            .get(&format!("conversations/{}", id))
            .await
    }

    /// Create a conversation.
    pub async fn create(&self, request: CreateConversationRequest) -> Result<Conversation> {
        self.client.pipeline().post("conversations", &request).await
    }

    /// Delete a conversation.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .pipeline()
            .delete(&format!("conversations/{}", id))
            .await
    }

    /// Messages of a conversation.
    pub async fn messages(&self, id: &str) -> Result<ConversationMessages> {
        self.client
            .pipeline()
            .get(&format!("conversations/{}/messages", id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_skip_unset() {
        assert!(ListConversationsQuery::default().pairs().is_empty());

        let query = ListConversationsQuery {
            limit: Some(20),
            cursor: Some("c-9".to_string()),
        };
        assert_eq!(
            query.pairs(),
            vec![("limit", "20".to_string()), ("cursor", "c-9".to_string())]
        );
    }
}
