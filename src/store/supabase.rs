use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use crate::error::StoreError;
use crate::normalizer::KeyMapping;
use crate::schedule::{ScheduleDraft, ScheduleId};
use crate::traits::{ScheduleSource, ScheduleStore};
use super::HTTP_CLIENT;

static SELECTED_COLUMNS: &str = "id,institusi,mata_pelajaran,tanggal,peserta";


/// A table of a Supabase project, reached through its PostgREST API.
///
/// Reads use the public (anon) key. Writes need the service-role key: the gateway checks the caller's identity before any write.
#[derive(Clone, Debug)]
pub struct SupabaseStore {
    table_url: Url,
    read_key: String,
    write_key: Option<String>,
}

impl SupabaseStore {
    /// `project_url` is the root URL of the Supabase project (e.g. `https://xyz.supabase.co`)
    pub fn new(project_url: &Url, table: &str, read_key: String, write_key: Option<String>) -> Result<Self, StoreError> {
        let table_url = project_url.join(&format!("rest/v1/{}", table))
            .map_err(|err| StoreError::Backend(format!("Invalid table URL for {}: {}", table, err)))?;
        Ok(Self { table_url, read_key, write_key })
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    /// Whether this store is able to write
    pub fn is_writable(&self) -> bool {
        self.write_key.is_some()
    }

    fn authorized(&self, request: RequestBuilder, key: &str) -> RequestBuilder {
        request
            .header("apikey", key)
            .bearer_auth(key)
    }

    fn write_key(&self) -> Result<&str, StoreError> {
        match &self.write_key {
            Some(key) => Ok(key),
            None => Err(StoreError::Backend("This store has no service-role key, it cannot write".to_string())),
        }
    }

    /// The table URL, restricted to a single id
    fn row_url(&self, id: &ScheduleId) -> Url {
        let mut url = self.table_url.clone();
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));
        url
    }

    /// Send a write request, and return the rows PostgREST sends back
    async fn send_write(&self, request: RequestBuilder) -> Result<Vec<Value>, StoreError> {
        let key = self.write_key()?;
        let response = self.authorized(request, key)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows: Vec<Value> = check_status(response).await?.json().await?;
        Ok(rows)
    }
}

/// PostgREST answers 400 when a row filter does not fit the column type
fn row_error(id: &ScheduleId, err: StoreError) -> StoreError {
    match err {
        StoreError::Rejected { status: 400, message } => {
            log::warn!("Supabase refused the row filter for id {}: {}", id, message);
            StoreError::InvalidId(id.clone())
        },
        err => err,
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() == false {
        let message = response.text().await.unwrap_or_default();
        log::debug!("Supabase answered {}: {}", status, message);
        return Err(StoreError::Rejected { status: status.as_u16(), message });
    }
    Ok(response)
}

#[async_trait]
impl ScheduleSource for SupabaseStore {
    async fn fetch_raw(&self) -> Result<Vec<Value>, StoreError> {
        let mut url = self.table_url.clone();
        url.query_pairs_mut()
            .append_pair("select", SELECTED_COLUMNS)
            .append_pair("order", "tanggal.asc");

        log::debug!("Fetching schedules from {}", self.table_url);
        let response = self.authorized(HTTP_CLIENT.get(url), &self.read_key)
            .send()
            .await?;
        let rows: Vec<Value> = check_status(response).await?.json().await?;
        log::info!("Fetched {} schedules from Supabase", rows.len());
        Ok(rows)
    }

    fn key_mapping(&self) -> KeyMapping {
        KeyMapping::supabase()
    }
}

#[async_trait]
impl ScheduleStore for SupabaseStore {
    async fn create(&self, draft: &ScheduleDraft) -> Result<Value, StoreError> {
        let request = HTTP_CLIENT.post(self.table_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(draft);
        let mut rows = self.send_write(request).await?;
        match rows.pop() {
            Some(row) => {
                log::info!("Created schedule {:?}", row.get("id"));
                Ok(row)
            },
            None => Err(StoreError::Backend("Supabase returned no row after an insert".to_string())),
        }
    }

    async fn update(&self, id: &ScheduleId, draft: &ScheduleDraft) -> Result<Value, StoreError> {
        let request = HTTP_CLIENT.patch(self.row_url(id))
            .header(CONTENT_TYPE, "application/json")
            .json(draft);
        let mut rows = self.send_write(request).await
            .map_err(|err| row_error(id, err))?;
        match rows.pop() {
            Some(row) => {
                log::info!("Updated schedule {}", id);
                Ok(row)
            },
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    async fn delete(&self, id: &ScheduleId) -> Result<(), StoreError> {
        let request = HTTP_CLIENT.delete(self.row_url(id));
        let rows = self.send_write(request).await
            .map_err(|err| row_error(id, err))?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(id.clone()));
        }
        log::info!("Deleted schedule {}", id);
        Ok(())
    }
}
