//! The CRUD gateway: an HTTP front of a schedule store
//!
//! | Route                     | Method | Success              |
//! |---------------------------|--------|----------------------|
//! | `/api/getSchedules`       | GET    | 200 + JSON array     |
//! | `/api/createSchedule`     | POST   | 201 + created row    |
//! | `/api/updateSchedule`     | PUT    | 200 + updated row    |
//! | `/api/deleteSchedule?id=` | DELETE | 204                  |
//!
//! Write routes require the bearer credential of a user that holds the admin role.
//! Every error is answered with a `{"error": "..."}` JSON body.

use std::sync::Arc;

use axum::routing::any;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::config::{BackendConfig, Config};
use crate::error::{ConfigError, GatewayError};
use crate::store::{MemoryStore, SheetSource, SupabaseStore};
use crate::traits::{ScheduleSource, ScheduleStore};

pub mod auth;
pub mod handlers;
pub mod validation;

use auth::{GoTrueVerifier, IdentityVerifier};
use handlers::{handle, CreateSchedule, DeleteSchedule, ListSchedules, UpdateSchedule};

/// Everything a request handler may need.
///
/// Parts that could not be configured are kept as the reason why, so that only the requests that need them fail.
#[derive(Clone)]
pub struct AppContext {
    source: Result<Arc<dyn ScheduleSource>, String>,
    store: Result<Arc<dyn ScheduleStore>, String>,
    verifier: Result<Arc<dyn IdentityVerifier>, String>,
    admin_role: Option<String>,
}

impl AppContext {
    pub fn new(source: Arc<dyn ScheduleSource>, store: Option<Arc<dyn ScheduleStore>>, verifier: Arc<dyn IdentityVerifier>, admin_role: Option<&str>) -> Self {
        Self {
            source: Ok(source),
            store: store.ok_or_else(|| "this backend is read-only".to_string()),
            verifier: Ok(verifier),
            admin_role: admin_role.map(String::from),
        }
    }

    /// A gateway backed by a [`MemoryStore`]
    pub fn with_memory_store(store: Arc<MemoryStore>, verifier: Arc<dyn IdentityVerifier>, admin_role: Option<&str>) -> Self {
        let source: Arc<dyn ScheduleSource> = store.clone();
        Self::new(source, Some(store as Arc<dyn ScheduleStore>), verifier, admin_role)
    }

    /// A gateway that answers every request with a configuration error
    pub fn misconfigured(error: &ConfigError) -> Self {
        let reason = error.to_string();
        Self {
            source: Err(reason.clone()),
            store: Err(reason.clone()),
            verifier: Err(reason),
            admin_role: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let (source, store): (Result<Arc<dyn ScheduleSource>, String>, Result<Arc<dyn ScheduleStore>, String>) = match &config.backend {
            BackendConfig::Supabase{ url, anon_key, service_key, table } => {
                match SupabaseStore::new(url, table, anon_key.clone(), service_key.clone()) {
                    Err(err) => (Err(err.to_string()), Err(err.to_string())),
                    Ok(supabase) => {
                        let supabase = Arc::new(supabase);
                        let store: Result<Arc<dyn ScheduleStore>, String> = match supabase.is_writable() {
                            true => Ok(supabase.clone() as Arc<dyn ScheduleStore>),
                            false => Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY").to_string()),
                        };
                        (Ok(supabase as Arc<dyn ScheduleSource>), store)
                    },
                }
            },
            BackendConfig::Sheet{ api_url, sheet_id, range, api_key } => {
                match SheetSource::new(api_url, sheet_id, range, api_key) {
                    Err(err) => (Err(err.to_string()), Err(err.to_string())),
                    Ok(sheet) => (Ok(Arc::new(sheet) as Arc<dyn ScheduleSource>), Err("the sheet backend is read-only".to_string())),
                }
            },
            BackendConfig::Memory => {
                let memory = Arc::new(MemoryStore::new());
                (Ok(memory.clone() as Arc<dyn ScheduleSource>), Ok(memory as Arc<dyn ScheduleStore>))
            },
        };

        let verifier: Result<Arc<dyn IdentityVerifier>, String> = match &config.identity_url {
            None => Err(ConfigError::Missing("IDENTITY_URL").to_string()),
            Some(url) => GoTrueVerifier::new(url)
                .map(|v| Arc::new(v) as Arc<dyn IdentityVerifier>)
                .map_err(|err| err.to_string()),
        };

        log::info!("Serving schedules from the {} backend", config.backend.name());
        Self { source, store, verifier, admin_role: config.admin_role.clone() }
    }

    pub fn source(&self) -> Result<&Arc<dyn ScheduleSource>, GatewayError> {
        self.source.as_ref().map_err(|reason| GatewayError::Configuration(reason.clone()))
    }

    pub fn store(&self) -> Result<&Arc<dyn ScheduleStore>, GatewayError> {
        self.store.as_ref().map_err(|reason| GatewayError::Configuration(reason.clone()))
    }

    pub fn verifier(&self) -> Result<&Arc<dyn IdentityVerifier>, GatewayError> {
        self.verifier.as_ref().map_err(|reason| GatewayError::Configuration(reason.clone()))
    }

    pub fn admin_role(&self) -> Option<&str> {
        self.admin_role.as_deref()
    }
}


/// Build the gateway router. Every route accepts every method, so that wrong ones get a proper 405
pub fn router(context: AppContext) -> Router {
    Router::new()
        .route("/api/getSchedules", any(handle::<ListSchedules>))
        .route("/api/createSchedule", any(handle::<CreateSchedule>))
        .route("/api/updateSchedule", any(handle::<UpdateSchedule>))
        .route("/api/deleteSchedule", any(handle::<DeleteSchedule>))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(context))
}

/// Serve the gateway until the process is stopped
pub async fn serve(config: &Config) -> std::io::Result<()> {
    serve_context(config.bind_addr, AppContext::from_config(config)).await
}

pub async fn serve_context(addr: std::net::SocketAddr, context: AppContext) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Gateway listening on {}", addr);
    axum::serve(listener, router(context)).await
}
