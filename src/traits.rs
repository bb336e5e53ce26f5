use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::normalizer::KeyMapping;
use crate::schedule::{ScheduleDraft, ScheduleId};

/// A backend schedules can be read from
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Returns every row this source contains, as the source stores them.
    /// This is a network round-trip for remote sources, that can be long, or that can fail
    async fn fetch_raw(&self) -> Result<Vec<Value>, StoreError>;

    /// The keys rows returned by [`Self::fetch_raw`] use
    fn key_mapping(&self) -> KeyMapping;
}

/// A backend schedules can be read from, and written to
#[async_trait]
pub trait ScheduleStore: ScheduleSource {
    /// Insert a new schedule. Returns the created row (including the id the store picked)
    async fn create(&self, draft: &ScheduleDraft) -> Result<Value, StoreError>;
    /// Replace the content of an existing schedule. Returns the updated row
    async fn update(&self, id: &ScheduleId, draft: &ScheduleDraft) -> Result<Value, StoreError>;
    /// Delete a schedule. Deleting an id that does not exist is a [`StoreError::NotFound`]
    async fn delete(&self, id: &ScheduleId) -> Result<(), StoreError>;
}
