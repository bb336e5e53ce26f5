//! Environment-driven configuration of the gateway
//!
//! Every setting is read from a process variable. [`Config::from_lookup`] takes any lookup function, so that tests do not
//! have to touch the process environment.

use std::net::SocketAddr;

use url::Url;

use crate::error::ConfigError;
use crate::store::sheet::DEFAULT_SHEETS_API_URL;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8888";
pub const DEFAULT_TABLE: &str = "schedules";
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1";

/// Where schedules are stored
#[derive(Clone, Debug, PartialEq)]
pub enum BackendConfig {
    /// A Supabase (PostgREST) table. Reads use the anon key, writes the service-role key
    Supabase {
        url: Url,
        anon_key: String,
        service_key: Option<String>,
        table: String,
    },
    /// A Google spreadsheet, read-only
    Sheet {
        api_url: Url,
        sheet_id: String,
        range: String,
        api_key: String,
    },
    /// An in-process store, lost on restart
    Memory,
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Supabase{ .. } => "supabase",
            BackendConfig::Sheet{ .. } => "sheet",
            BackendConfig::Memory => "memory",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub backend: BackendConfig,
    /// Base URL of a GoTrue-compatible identity provider. Writes are refused when this is not set
    pub identity_url: Option<Url>,
    /// Role required to write. `None` accepts any authenticated user
    pub admin_role: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty variables are as good as missing ones
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| v.is_empty() == false);
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::Invalid{ name: "BIND_ADDR", reason: err.to_string() })?;

        let backend = match get("SCHEDULE_BACKEND").as_deref().unwrap_or("supabase") {
            "supabase" => BackendConfig::Supabase {
                url: parse_url("SUPABASE_URL", &require("SUPABASE_URL")?)?,
                anon_key: require("SUPABASE_ANON_KEY")?,
                service_key: get("SUPABASE_SERVICE_ROLE_KEY"),
                table: get("SUPABASE_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            },
            "sheet" => BackendConfig::Sheet {
                api_url: parse_url("SHEETS_API_URL", &get("SHEETS_API_URL").unwrap_or_else(|| DEFAULT_SHEETS_API_URL.to_string()))?,
                sheet_id: require("SHEET_ID")?,
                range: get("SHEET_RANGE").unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
                api_key: require("SHEETS_API_KEY")?,
            },
            "memory" => BackendConfig::Memory,
            other => return Err(ConfigError::Invalid{
                name: "SCHEDULE_BACKEND",
                reason: format!("unknown backend {:?} (expected supabase, sheet or memory)", other),
            }),
        };

        let identity_url = match get("IDENTITY_URL") {
            None => None,
            Some(text) => Some(parse_url("IDENTITY_URL", &text)?),
        };

        let admin_role = match lookup("ADMIN_ROLE") {
            None => Some(crate::identity::ADMIN_ROLE.to_string()),
            Some(role) if role.trim().is_empty() => None,
            Some(role) => Some(role.trim().to_string()),
        };

        Ok(Self { bind_addr, backend, identity_url, admin_role })
    }
}

fn parse_url(name: &'static str, text: &str) -> Result<Url, ConfigError> {
    Url::parse(text).map_err(|err| ConfigError::Invalid{ name, reason: err.to_string() })
}
