//! Who is using the board
//!
//! The identity provider's login/logout callbacks are turned into [`IdentityEvent`]s fed to an [`IdentityHub`].
//! The hub keeps an [`AuthState`] and publishes it on a watch channel, so that any part of the UI can subscribe to it
//! without knowing anything about the provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

/// Role that grants the right to manage schedules
pub const ADMIN_ROLE: &str = "admin";

/// A logged-in user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// The bearer credential to forward on write requests. Not known on the server side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl User {
    pub fn new(email: &str, roles: &[&str]) -> Self {
        Self {
            email: email.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Read the user object of a GoTrue-compatible identity provider (such as Netlify Identity).
    /// Roles are found in `app_metadata.roles`
    pub fn from_gotrue(value: &Value) -> Option<Self> {
        let email = value.get("email")?.as_str()?.to_string();
        let roles = value.get("app_metadata")
            .and_then(|meta| meta.get("roles"))
            .and_then(Value::as_array)
            .map(|roles| roles.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();
        Some(Self { email, roles, token: None })
    }
}


/// Whether someone is logged in
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(User),
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated(user) => Some(user),
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.user().and_then(|u| u.token.as_deref())
    }

    /// Whether the admin tools (schedule form, delete buttons) should be shown
    pub fn can_manage_schedules(&self) -> bool {
        self.user().map(|u| u.has_role(ADMIN_ROLE)).unwrap_or(false)
    }
}

impl Default for AuthState {
    fn default() -> Self {
        AuthState::Anonymous
    }
}

/// What the identity provider reports
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityEvent {
    /// A session was restored when the page loaded (or `None` if there is none)
    Init(Option<User>),
    Login(User),
    Logout,
}


/// Holds the current [`AuthState`] and broadcasts its changes
#[derive(Debug)]
pub struct IdentityHub {
    sender: watch::Sender<AuthState>,
}

impl IdentityHub {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(AuthState::Anonymous);
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.sender.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.sender.borrow().clone()
    }

    /// Apply an event, and return the new state
    pub fn handle(&self, event: IdentityEvent) -> AuthState {
        let new_state = match event {
            IdentityEvent::Init(None) | IdentityEvent::Logout => AuthState::Anonymous,
            IdentityEvent::Init(Some(user)) | IdentityEvent::Login(user) => {
                log::info!("{} is logged in", user.email);
                AuthState::Authenticated(user)
            },
        };
        self.sender.send_replace(new_state.clone());
        new_state
    }

    pub fn login(&self, user: User) -> AuthState {
        self.handle(IdentityEvent::Login(user))
    }

    pub fn logout(&self) -> AuthState {
        self.handle(IdentityEvent::Logout)
    }
}

impl Default for IdentityHub {
    fn default() -> Self {
        Self::new()
    }
}
