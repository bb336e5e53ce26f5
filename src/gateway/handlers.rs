//! Request handlers
//!
//! Every route follows the same steps, in this order: configuration, method, identity (for writes), payload, store.
//! Each step may end the request with an error. [`execute`] runs these steps, an [`Operation`] only says what each of them means for its route.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::{auth, validation, AppContext};
use crate::error::{GatewayError, StoreError};
use crate::schedule::{ScheduleDraft, ScheduleId};

/// The parts of a request the operations look at
#[derive(Debug)]
pub struct IncomingRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub body: Bytes,
}

/// What a route does
#[async_trait]
pub trait Operation: Default + Send + Sync + 'static {
    /// The validated payload
    type Input: Send;

    /// The only method this route accepts
    const METHOD: &'static str;
    /// Whether this route changes the store. Such routes require an admin
    const WRITES: bool;
    /// What the client is told when the store fails
    const FAILURE: &'static str;
    /// What the client is told when the store cannot use the requested id
    const INVALID_ID: &'static str = "Invalid 'id'. Must be a number.";

    fn validate(&self, request: &IncomingRequest) -> Result<Self::Input, GatewayError>;

    async fn forward(&self, context: &AppContext, input: Self::Input) -> Result<Response, GatewayError>;

    /// Convert a store error into the error of this route
    fn store_error(&self, source: StoreError) -> GatewayError {
        match source {
            StoreError::NotFound(id) => GatewayError::NotFound(id),
            StoreError::InvalidId(_) => GatewayError::Validation(Self::INVALID_ID.to_string()),
            source => GatewayError::Store{ context: Self::FAILURE, source },
        }
    }
}

/// Run the steps every route has in common
pub async fn execute<O: Operation>(operation: &O, context: &AppContext, request: IncomingRequest) -> Result<Response, GatewayError> {
    match O::WRITES {
        true => { context.store()?; context.verifier()?; },
        false => { context.source()?; },
    }

    if request.method.as_str() != O::METHOD {
        return Err(GatewayError::MethodNotAllowed{ allowed: O::METHOD });
    }

    if O::WRITES {
        let verifier = context.verifier()?;
        let user = auth::authorize(&**verifier, &request.headers, context.admin_role()).await?;
        log::info!("{} request from {}", O::METHOD, user.email);
    }

    let input = operation.validate(&request)?;
    operation.forward(context, input).await
}

/// The axum handler of a route
pub async fn handle<O: Operation>(
    State(context): State<Arc<AppContext>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let request = IncomingRequest { method, headers, query, body };
    match execute(&O::default(), &context, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}


#[derive(Debug, Default)]
pub struct ListSchedules;

#[async_trait]
impl Operation for ListSchedules {
    type Input = ();
    const METHOD: &'static str = "GET";
    const WRITES: bool = false;
    const FAILURE: &'static str = "Failed to fetch schedules.";

    fn validate(&self, _request: &IncomingRequest) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn forward(&self, context: &AppContext, _input: ()) -> Result<Response, GatewayError> {
        let rows = context.source()?.fetch_raw().await
            .map_err(|err| self.store_error(err))?;
        log::debug!("Listing {} rows", rows.len());
        Ok(Json(rows).into_response())
    }
}


#[derive(Debug, Default)]
pub struct CreateSchedule;

#[async_trait]
impl Operation for CreateSchedule {
    type Input = ScheduleDraft;
    const METHOD: &'static str = "POST";
    const WRITES: bool = true;
    const FAILURE: &'static str = "Failed to create schedule.";

    fn validate(&self, request: &IncomingRequest) -> Result<ScheduleDraft, GatewayError> {
        let body = validation::parse_body(&request.body)?;
        validation::schedule_fields(&body)
    }

    async fn forward(&self, context: &AppContext, draft: ScheduleDraft) -> Result<Response, GatewayError> {
        let created = context.store()?.create(&draft).await
            .map_err(|err| self.store_error(err))?;
        Ok((StatusCode::CREATED, Json(created)).into_response())
    }
}


#[derive(Debug, Default)]
pub struct UpdateSchedule;

#[async_trait]
impl Operation for UpdateSchedule {
    type Input = (ScheduleId, ScheduleDraft);
    const METHOD: &'static str = "PUT";
    const WRITES: bool = true;
    const FAILURE: &'static str = "Failed to update schedule.";

    fn validate(&self, request: &IncomingRequest) -> Result<(ScheduleId, ScheduleDraft), GatewayError> {
        let body = validation::parse_body(&request.body)?;
        validation::update_body(&body)
    }

    async fn forward(&self, context: &AppContext, input: (ScheduleId, ScheduleDraft)) -> Result<Response, GatewayError> {
        let (id, draft) = input;
        let updated = context.store()?.update(&id, &draft).await
            .map_err(|err| self.store_error(err))?;
        Ok(Json(updated).into_response())
    }
}


#[derive(Debug, Default)]
pub struct DeleteSchedule;

#[async_trait]
impl Operation for DeleteSchedule {
    type Input = ScheduleId;
    const METHOD: &'static str = "DELETE";
    const WRITES: bool = true;
    const FAILURE: &'static str = "Failed to delete schedule.";
    const INVALID_ID: &'static str = "Invalid 'id' query parameter. Must be a number.";

    fn validate(&self, request: &IncomingRequest) -> Result<ScheduleId, GatewayError> {
        validation::delete_target(&request.query)
    }

    async fn forward(&self, context: &AppContext, id: ScheduleId) -> Result<Response, GatewayError> {
        context.store()?.delete(&id).await
            .map_err(|err| self.store_error(err))?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
