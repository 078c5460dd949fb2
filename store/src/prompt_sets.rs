use crate::document::{DocumentStore, ItemKey, Table, decode_all};
use crate::errors::{Result, StoreError};
use crate::models::{PromptSet, PromptSetInput};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Looks up the prompt set a dispatch call runs against.
#[async_trait]
pub trait PromptSetResolver: Send + Sync {
    async fn resolve(&self, website_id: &str, prompt_name: &str) -> Result<Option<PromptSet>>;
}

fn partition_key(website_id: &str) -> String {
    format!("website#{website_id}")
}

fn item_key(website_id: &str, prompt_name: &str) -> ItemKey {
    ItemKey::with_sort(partition_key(website_id), format!("prompt#{prompt_name}"))
}

#[derive(Clone)]
pub struct PromptSets {
    documents: Arc<dyn DocumentStore>,
}

impl PromptSets {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Writes the full prompt set, replacing any existing one with the same name.
    pub async fn save(
        &self,
        website_id: &str,
        prompt_name: &str,
        input: PromptSetInput,
    ) -> Result<PromptSet> {
        let now = Utc::now();
        let mut prompt_set = PromptSet {
            website_id: website_id.to_string(),
            prompt_name: prompt_name.to_string(),
            prompt_list: Vec::new(),
            prompts: Vec::new(),
            urls: Vec::new(),
            api_keys: Vec::new(),
            required_params: None,
            created_at: now,
            updated_at: now,
        };
        input.apply_to(&mut prompt_set, now);

        self.documents
            .put(
                Table::PromptSets,
                item_key(website_id, prompt_name),
                serde_json::to_value(&prompt_set)?,
            )
            .await?;

        tracing::info!(website_id, prompt_name, urls = prompt_set.urls.len(), "Saved prompt set");
        Ok(prompt_set)
    }

    pub async fn get(&self, website_id: &str, prompt_name: &str) -> Result<Option<PromptSet>> {
        match self
            .documents
            .get(Table::PromptSets, &item_key(website_id, prompt_name))
            .await?
        {
            Some(item) => Ok(Some(serde_json::from_value(item)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, website_id: &str) -> Result<Vec<PromptSet>> {
        decode_all(
            self.documents
                .query(Table::PromptSets, &partition_key(website_id))
                .await?,
        )
    }

    /// Overwrites the mutable fields of an existing prompt set.
    pub async fn update(
        &self,
        website_id: &str,
        prompt_name: &str,
        input: PromptSetInput,
    ) -> Result<PromptSet> {
        let (website_id, prompt_name) = (website_id.trim(), prompt_name.trim());

        let mut prompt_set = self
            .get(website_id, prompt_name)
            .await?
            .ok_or_else(|| not_found(website_id, prompt_name))?;
        input.apply_to(&mut prompt_set, Utc::now());

        self.documents
            .put(
                Table::PromptSets,
                item_key(website_id, prompt_name),
                serde_json::to_value(&prompt_set)?,
            )
            .await?;
        Ok(prompt_set)
    }

    /// Moves a prompt set to a new name, keeping every other field.
    ///
    /// The copy is written with a conditional insert, so an existing prompt
    /// set under `new_name` is never overwritten and the original stays put.
    pub async fn rename(
        &self,
        website_id: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<PromptSet> {
        let (website_id, old_name, new_name) = (website_id.trim(), old_name.trim(), new_name.trim());

        let mut prompt_set = self
            .get(website_id, old_name)
            .await?
            .ok_or_else(|| not_found(website_id, old_name))?;

        prompt_set.prompt_name = new_name.to_string();
        prompt_set.updated_at = Utc::now();

        let inserted = self
            .documents
            .put_if_absent(
                Table::PromptSets,
                item_key(website_id, new_name),
                serde_json::to_value(&prompt_set)?,
            )
            .await?;
        if !inserted {
            return Err(StoreError::Conflict(format!(
                "Prompt \"{new_name}\" for website {website_id}"
            )));
        }

        self.documents
            .delete(Table::PromptSets, &item_key(website_id, old_name))
            .await?;

        tracing::info!(website_id, old_name, new_name, "Renamed prompt set");
        Ok(prompt_set)
    }

    /// Returns whether a prompt set was removed.
    pub async fn delete(&self, website_id: &str, prompt_name: &str) -> Result<bool> {
        self.documents
            .delete(
                Table::PromptSets,
                &item_key(website_id.trim(), prompt_name.trim()),
            )
            .await
    }
}

#[async_trait]
impl PromptSetResolver for PromptSets {
    async fn resolve(&self, website_id: &str, prompt_name: &str) -> Result<Option<PromptSet>> {
        self.get(website_id, prompt_name).await
    }
}

fn not_found(website_id: &str, prompt_name: &str) -> StoreError {
    StoreError::NotFound(format!(
        "Prompt \"{prompt_name}\" for website {website_id}"
    ))
}
