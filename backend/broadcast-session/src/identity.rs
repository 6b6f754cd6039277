//! Broadcaster identity as supplied by the (external) login flow

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Source of the current broadcaster identity.
///
/// An empty [`IdentityProvider::basic_token`] means "not authenticated".
pub trait IdentityProvider: Send + Sync {
    fn user_id(&self) -> String;
    fn credential(&self) -> String;
    fn basic_token(&self) -> String;
    /// Application identifier sent along with chat room requests
    fn application(&self) -> String;

    fn is_authenticated(&self) -> bool {
        !self.basic_token().trim().is_empty()
    }
}

/// Fixed identity, e.g. read from the environment by the driver binary
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user_id: String,
    credential: String,
    basic_token: String,
    application: String,
}

impl StaticIdentity {
    pub fn new(
        user_id: impl Into<String>,
        credential: impl Into<String>,
        basic_token: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            credential: credential.into(),
            basic_token: basic_token.into(),
            application: application.into(),
        }
    }

    /// Build an identity whose token is `Basic base64(login:password)`
    pub fn from_login(
        login: &str,
        password: &str,
        user_id: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self::new(user_id, password, basic_auth(login, password), application)
    }

    /// Identity with no token; every prepare attempt is refused
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentity {
    fn user_id(&self) -> String {
        self.user_id.clone()
    }

    fn credential(&self) -> String {
        self.credential.clone()
    }

    fn basic_token(&self) -> String {
        self.basic_token.clone()
    }

    fn application(&self) -> String {
        self.application.clone()
    }
}

pub fn basic_auth(login: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{login}:{password}")))
}
