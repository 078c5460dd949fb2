use crate::document::{DocumentStore, ItemKey, Table, decode_all};
use crate::errors::Result;
use crate::models::{DEFAULT_CATEGORY, Website, WebsiteCustomData, WebsiteInput, WebsiteStatus};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct Websites {
    documents: Arc<dyn DocumentStore>,
}

impl Websites {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Creates or overwrites a website. A missing id or API key is generated.
    pub async fn save(&self, input: WebsiteInput) -> Result<Website> {
        let now = Utc::now();
        let website = Website {
            id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            website_name: input.website_name.unwrap_or_default(),
            website_url: input.website_url.unwrap_or_default(),
            system_prompt: input.system_prompt.unwrap_or_default(),
            custom_prompt: input.custom_prompt.unwrap_or_default(),
            category: input
                .category
                .unwrap_or_else(|| vec![DEFAULT_CATEGORY.to_string()]),
            urls: input.urls.unwrap_or_default(),
            library: input.library.unwrap_or_default(),
            api_key: input.api_key.unwrap_or_else(|| Uuid::new_v4().to_string()),
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        self.put(&website).await?;
        tracing::info!(website_id = %website.id, "Saved website");
        Ok(website)
    }

    pub async fn list(&self) -> Result<Vec<Website>> {
        decode_all(self.documents.scan(Table::Websites).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Website>> {
        match self.documents.get(Table::Websites, &ItemKey::new(id)).await? {
            Some(item) => Ok(Some(serde_json::from_value(item)?)),
            None => Ok(None),
        }
    }

    /// Finds the website owning a widget API key.
    pub async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Website>> {
        if api_key.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|website| website.api_key == api_key))
    }

    /// Replaces every editable field. Returns `None` if the website does not exist.
    pub async fn update(&self, id: &str, input: WebsiteInput) -> Result<Option<Website>> {
        self.modify(id, |website| input.apply_to(website, Utc::now()))
            .await
    }

    pub async fn update_custom_data(
        &self,
        id: &str,
        data: WebsiteCustomData,
    ) -> Result<Option<Website>> {
        self.modify(id, |website| {
            website.custom_prompt = data.custom_prompt.unwrap_or_default();
            website.urls = data.urls.unwrap_or_default();
            website.library = data.library.or(data.prompt_list).unwrap_or_default();
            website.updated_at = Utc::now();
        })
        .await
    }

    pub async fn update_status(&self, id: &str, status: WebsiteStatus) -> Result<Option<Website>> {
        self.modify(id, |website| {
            website.status = status;
            website.updated_at = Utc::now();
        })
        .await
    }

    /// Returns whether a website was removed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.documents
            .delete(Table::Websites, &ItemKey::new(id))
            .await
    }

    async fn modify<F>(&self, id: &str, change: F) -> Result<Option<Website>>
    where
        F: FnOnce(&mut Website),
    {
        let Some(mut website) = self.get(id).await? else {
            return Ok(None);
        };
        change(&mut website);
        self.put(&website).await?;
        Ok(Some(website))
    }

    async fn put(&self, website: &Website) -> Result<()> {
        self.documents
            .put(
                Table::Websites,
                ItemKey::new(website.id.as_str()),
                serde_json::to_value(website)?,
            )
            .await
    }
}
