//! This module provides a client to connect to a schedule gateway

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use url::Url;

use crate::error::StoreError;
use crate::identity::AuthState;
use crate::normalizer::KeyMapping;
use crate::schedule::{ScheduleDraft, ScheduleId};
use crate::store::HTTP_CLIENT;
use crate::traits::{ScheduleSource, ScheduleStore};

pub static LIST_ENDPOINT: &str = "api/getSchedules";
pub static CREATE_ENDPOINT: &str = "api/createSchedule";
pub static UPDATE_ENDPOINT: &str = "api/updateSchedule";
pub static DELETE_ENDPOINT: &str = "api/deleteSchedule";


/// A schedule source that fetches its data from a gateway (see [`crate::gateway`]).
///
/// Writes are only accepted by the gateway with the bearer credential of a logged-in admin.
#[derive(Clone, Debug)]
pub struct Client {
    base_url: Url,
    token: Option<String>,
    key_mapping: KeyMapping,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new<S: AsRef<str>>(url: S) -> Result<Self, StoreError> {
        let mut base_url = Url::parse(url.as_ref())
            .map_err(|err| StoreError::Backend(format!("Invalid gateway URL {:?}: {}", url.as_ref(), err)))?;
        if base_url.path().ends_with('/') == false {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            token: None,
            key_mapping: KeyMapping::supabase(),
        })
    }

    /// Use another row shape (e.g. when the gateway is backed by a spreadsheet)
    pub fn with_key_mapping(mut self, key_mapping: KeyMapping) -> Self {
        self.key_mapping = key_mapping;
        self
    }

    /// Forward the credential of the current user (if any) on write requests
    pub fn set_auth(&mut self, state: &AuthState) {
        self.token = state.bearer_token().map(String::from);
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base_url.join(path)
            .map_err(|err| StoreError::Backend(format!("Invalid endpoint {}: {}", path, err)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, id: Option<&ScheduleId>) -> Result<Response, StoreError> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(StoreError::NotFound(id.clone()));
            }
        }
        let message = match response.json::<Value>().await {
            Ok(body) => body.get("error").and_then(Value::as_str).unwrap_or_default().to_string(),
            Err(_) => String::new(),
        };
        log::warn!("Gateway answered {}: {}", status, message);
        Err(StoreError::Rejected { status: status.as_u16(), message })
    }
}

#[async_trait]
impl ScheduleSource for Client {
    async fn fetch_raw(&self) -> Result<Vec<Value>, StoreError> {
        let url = self.endpoint(LIST_ENDPOINT)?;
        let response = self.send(HTTP_CLIENT.get(url), None).await?;
        let rows: Vec<Value> = response.json().await?;
        log::debug!("Gateway returned {} rows", rows.len());
        Ok(rows)
    }

    fn key_mapping(&self) -> KeyMapping {
        self.key_mapping.clone()
    }
}

#[async_trait]
impl ScheduleStore for Client {
    async fn create(&self, draft: &ScheduleDraft) -> Result<Value, StoreError> {
        let url = self.endpoint(CREATE_ENDPOINT)?;
        let response = self.send(HTTP_CLIENT.post(url).json(draft), None).await?;
        Ok(response.json().await?)
    }

    async fn update(&self, id: &ScheduleId, draft: &ScheduleDraft) -> Result<Value, StoreError> {
        let url = self.endpoint(UPDATE_ENDPOINT)?;
        let body = json!({ "id": id, "data": draft });
        let response = self.send(HTTP_CLIENT.put(url).json(&body), Some(id)).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, id: &ScheduleId) -> Result<(), StoreError> {
        let mut url = self.endpoint(DELETE_ENDPOINT)?;
        url.query_pairs_mut().append_pair("id", &id.to_string());
        self.send(HTTP_CLIENT.delete(url), Some(id)).await?;
        Ok(())
    }
}
