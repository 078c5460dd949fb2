use crate::document::{DocumentStore, ItemKey, Table, decode_all};
use crate::errors::Result;
use crate::models::{
    CHAT_REQUEST_TYPE, ChatRequest, ChatStats, ChatStatus, NewChatRequest,
    normalize_collected_data,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const DEFAULT_FILTERED_LIMIT: usize = 50;

const ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `chat-<unix millis>-<9 random base36 chars>`
fn generate_id() -> String {
    let mut entropy = Uuid::new_v4().as_u128();
    let suffix: String = (0..9)
        .map(|_| {
            let c = ID_ALPHABET[(entropy % 36) as usize] as char;
            entropy /= 36;
            c
        })
        .collect();
    format!("chat-{}-{suffix}", Utc::now().timestamp_millis())
}

#[derive(Clone)]
pub struct ChatRequests {
    documents: Arc<dyn DocumentStore>,
}

impl ChatRequests {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    pub async fn create(&self, website_id: &str, request: NewChatRequest) -> Result<ChatRequest> {
        let now = Utc::now();
        let chat_request = ChatRequest {
            id: generate_id(),
            kind: CHAT_REQUEST_TYPE.to_string(),
            website_id: website_id.to_string(),
            collected_data: normalize_collected_data(request.collected_data),
            backend_api_key: request.backend_api_key.filter(|key| !key.is_empty()),
            status: request.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        self.put(&chat_request).await?;
        tracing::info!(
            chat_request_id = %chat_request.id,
            website_id,
            "Created chat request"
        );
        Ok(chat_request)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ChatRequest>> {
        match self
            .documents
            .get(Table::ChatRequests, &ItemKey::new(id))
            .await?
        {
            Some(item) => Ok(Some(serde_json::from_value(item)?)),
            None => Ok(None),
        }
    }

    /// Newest first, at most `limit` entries.
    pub async fn list(&self, limit: usize) -> Result<Vec<ChatRequest>> {
        self.filtered(limit, |_| true).await
    }

    pub async fn by_status(&self, status: ChatStatus, limit: usize) -> Result<Vec<ChatRequest>> {
        self.filtered(limit, |request| request.status == status)
            .await
    }

    pub async fn by_website(&self, website_id: &str, limit: usize) -> Result<Vec<ChatRequest>> {
        self.filtered(limit, |request| request.website_id == website_id)
            .await
    }

    pub async fn by_backend_api_key(
        &self,
        backend_api_key: &str,
        limit: usize,
    ) -> Result<Vec<ChatRequest>> {
        self.filtered(limit, |request| {
            request.backend_api_key.as_deref() == Some(backend_api_key)
        })
        .await
    }

    pub async fn update_status(&self, id: &str, status: ChatStatus) -> Result<Option<ChatRequest>> {
        let Some(mut chat_request) = self.get(id).await? else {
            return Ok(None);
        };
        chat_request.status = status;
        chat_request.updated_at = Utc::now();
        self.put(&chat_request).await?;
        Ok(Some(chat_request))
    }

    /// Returns whether a chat request was removed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.documents
            .delete(Table::ChatRequests, &ItemKey::new(id))
            .await
    }

    pub async fn stats(&self) -> Result<ChatStats> {
        let mut stats = ChatStats::default();
        for request in self.all().await? {
            stats.record(request.status);
        }
        Ok(stats)
    }

    async fn all(&self) -> Result<Vec<ChatRequest>> {
        decode_all(self.documents.scan(Table::ChatRequests).await?)
    }

    async fn filtered<F>(&self, limit: usize, predicate: F) -> Result<Vec<ChatRequest>>
    where
        F: Fn(&ChatRequest) -> bool,
    {
        let mut requests: Vec<ChatRequest> = self
            .all()
            .await?
            .into_iter()
            .filter(|request| predicate(request))
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests.truncate(limit);
        Ok(requests)
    }

    async fn put(&self, chat_request: &ChatRequest) -> Result<()> {
        self.documents
            .put(
                Table::ChatRequests,
                ItemKey::new(chat_request.id.as_str()),
                serde_json::to_value(chat_request)?,
            )
            .await
    }
}
