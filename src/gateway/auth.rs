//! Identity checks of write requests
//!
//! A write request carries the credential the identity provider gave to the user, as `Authorization: Bearer <token>`.
//! The gateway asks the provider who this token belongs to, and whether they hold the required role.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::error::{GatewayError, StoreError};
use crate::identity::User;
use crate::store::HTTP_CLIENT;

/// Something that knows who owns a bearer token
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Returns `Ok(None)` when the token is not (or no longer) valid.
    /// An `Err` means the verification itself could not be made
    async fn verify(&self, token: &str) -> Result<Option<User>, StoreError>;
}


/// Asks a GoTrue-compatible identity provider (such as Netlify Identity)
#[derive(Clone, Debug)]
pub struct GoTrueVerifier {
    user_url: Url,
}

impl GoTrueVerifier {
    /// `identity_url` is the root of the provider API (e.g. `https://my.site/.netlify/identity`)
    pub fn new(identity_url: &Url) -> Result<Self, StoreError> {
        let mut base = identity_url.clone();
        if base.path().ends_with('/') == false {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let user_url = base.join("user")
            .map_err(|err| StoreError::Backend(format!("Invalid identity URL {}: {}", identity_url, err)))?;
        Ok(Self { user_url })
    }

    pub fn user_url(&self) -> &Url {
        &self.user_url
    }
}

#[async_trait]
impl IdentityVerifier for GoTrueVerifier {
    async fn verify(&self, token: &str) -> Result<Option<User>, StoreError> {
        let response = HTTP_CLIENT.get(self.user_url.clone())
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                log::debug!("Identity provider does not know this token");
                Ok(None)
            },
            status if status.is_success() => {
                let body: Value = response.json().await?;
                let user = User::from_gotrue(&body);
                if user.is_none() {
                    log::warn!("Identity provider returned a user with no email");
                }
                Ok(user)
            },
            status => Err(StoreError::Rejected {
                status: status.as_u16(),
                message: "Unexpected answer from the identity provider".to_string(),
            }),
        }
    }
}


/// A fixed set of tokens. Useful for tests and local runs
#[derive(Clone, Debug, Default)]
pub struct StaticVerifier {
    users: HashMap<String, User>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, user: User) -> Self {
        self.users.insert(token.to_string(), user);
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(token).cloned())
    }
}


/// Extract the token of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") == false {
        return None;
    }
    let token = token.trim();
    match token.is_empty() {
        true => None,
        false => Some(token),
    }
}

/// Check that the request comes from a logged-in user that holds `required_role` (if any).
///
/// No credential, or an unknown one, is a 401. A known user without the role is a 403.
pub async fn authorize(verifier: &dyn IdentityVerifier, headers: &HeaderMap, required_role: Option<&str>) -> Result<User, GatewayError> {
    let token = bearer_token(headers)
        .ok_or_else(|| GatewayError::Unauthorized("You must be logged in.".to_string()))?;

    let user = verifier.verify(token).await
        .map_err(|source| GatewayError::Store{ context: "Failed to verify credentials.", source })?
        .ok_or_else(|| GatewayError::Unauthorized("Invalid or expired credentials.".to_string()))?;

    if let Some(role) = required_role {
        if user.has_role(role) == false {
            log::info!("{} tried to write without the {} role", user.email, role);
            return Err(GatewayError::Forbidden(format!("The '{}' role is required.", role)));
        }
    }
    Ok(user)
}
