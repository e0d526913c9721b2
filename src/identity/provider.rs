use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::SharedKv;

/// Keys the identity provider's SDK leaves in durable storage.
pub const PROVIDER_SESSION_KEY: &str = "auth0_session";
pub const PROVIDER_USER_KEY: &str = "auth0_user";

/// User profile reported by the third-party identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderUser {
    #[serde(default, alias = "sub")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Remaining profile claims, passed through
    #[serde(flatten)]
    pub claims: serde_json::Map<String, serde_json::Value>,
}

/// Provider authentication state as observed by one navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderState {
    /// SDK initialisation still outstanding
    Loading,
    Resolved { authenticated: bool, user: Option<ProviderUser> },
}

impl ProviderState {
    pub fn is_loading(&self) -> bool { matches!(self, ProviderState::Loading) }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, ProviderState::Resolved { authenticated: true, .. })
    }

    pub fn user(&self) -> Option<&ProviderUser> {
        match self {
            ProviderState::Resolved { user, .. } => user.as_ref(),
            ProviderState::Loading => None,
        }
    }
}

/// Source of the third-party provider's state.
pub trait IdentityProvider: Send + Sync {
    fn state(&self) -> ProviderState;
}

/// Provider whose state is fixed at construction. Used by tests and by hosts that
/// resolve provider state themselves before asking for a decision.
#[derive(Debug, Clone)]
pub struct StaticProvider(pub ProviderState);

impl StaticProvider {
    pub fn loading() -> Self { Self(ProviderState::Loading) }
    pub fn anonymous() -> Self { Self(ProviderState::Resolved { authenticated: false, user: None }) }
    pub fn signed_in(user: ProviderUser) -> Self {
        Self(ProviderState::Resolved { authenticated: true, user: Some(user) })
    }
}

impl IdentityProvider for StaticProvider {
    fn state(&self) -> ProviderState { self.0.clone() }
}

/// Reads the provider session persisted by the provider SDK. Storage reads are synchronous,
/// so this provider is always resolved.
#[derive(Clone)]
pub struct StoredProvider {
    storage: SharedKv,
}

impl StoredProvider {
    pub fn new(storage: SharedKv) -> Self { Self { storage } }
}

impl IdentityProvider for StoredProvider {
    fn state(&self) -> ProviderState {
        let authenticated = self.storage.get(PROVIDER_SESSION_KEY).map(|v| !v.is_empty()).unwrap_or(false);
        let user = self.storage.get(PROVIDER_USER_KEY).and_then(|raw| {
            serde_json::from_str::<ProviderUser>(&raw)
                .map_err(|e| warn!(target: "facepay::session", "stored provider user is malformed: {}", e))
                .ok()
        });
        ProviderState::Resolved { authenticated, user }
    }
}
