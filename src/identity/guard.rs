//! Per-navigation admission check for protected views.
//!
//! Each navigation gets a fresh [`GuardEvaluation`] that starts in `Loading` and leaves it
//! exactly once, when the identity provider has resolved. Nothing is carried over between
//! navigations, and nothing in here can fail: storage problems surface as an absent facial
//! session from the validator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::access::{is_admitted, AuthSignal};
use super::provider::{IdentityProvider, ProviderState};
use super::validator::FacialSessionValidator;

pub const PUBLIC_ROOT: &str = "/";
pub const DASHBOARD_ROUTE: &str = "/dashboard";

/// Navigation instruction handed to the host router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub to: String,
    /// Replace the current history entry instead of pushing
    pub replace: bool,
}

impl Redirect {
    pub fn replace(to: impl Into<String>) -> Self { Self { to: to.into(), replace: true } }
    pub fn push(to: impl Into<String>) -> Self { Self { to: to.into(), replace: false } }
    pub fn public_root() -> Self { Self::replace(PUBLIC_ROOT) }
}

/// Host router capability.
pub trait Navigator: Send + Sync {
    fn navigate(&self, redirect: &Redirect);
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    /// Render a waiting indicator; no decision made yet
    Loading,
    /// Render the protected content
    Admitted,
    Denied(Redirect),
}

impl GuardState {
    pub fn is_settled(&self) -> bool { !matches!(self, GuardState::Loading) }

    /// Carry out the state against the host router. Returns whether protected content may render.
    pub fn apply(&self, navigator: &dyn Navigator) -> bool {
        match self {
            GuardState::Loading => false,
            GuardState::Admitted => true,
            GuardState::Denied(redirect) => {
                navigator.navigate(redirect);
                false
            }
        }
    }
}

/// Combines the provider and the facial session validator into admission decisions.
#[derive(Clone)]
pub struct RouteGuard {
    provider: Arc<dyn IdentityProvider>,
    validator: FacialSessionValidator,
}

impl RouteGuard {
    pub fn new(provider: Arc<dyn IdentityProvider>, validator: FacialSessionValidator) -> Self {
        Self { provider, validator }
    }

    pub fn validator(&self) -> &FacialSessionValidator { &self.validator }

    /// Start evaluating a navigation to `path`.
    pub fn begin(&self, path: impl Into<String>) -> GuardEvaluation<'_> {
        GuardEvaluation { guard: self, path: path.into(), state: GuardState::Loading }
    }

    /// One-shot evaluation against the provider's current state.
    pub fn evaluate(&self, path: &str) -> GuardState {
        let mut eval = self.begin(path);
        eval.poll();
        eval.state
    }

    fn decide(&self, provider: &ProviderState) -> GuardState {
        let signals = [
            AuthSignal::Provider(provider.is_authenticated()),
            AuthSignal::Facial(self.validator.check_valid()),
        ];
        if is_admitted(&signals) {
            GuardState::Admitted
        } else {
            GuardState::Denied(Redirect::public_root())
        }
    }
}

/// State of one navigation through the guard.
pub struct GuardEvaluation<'a> {
    guard: &'a RouteGuard,
    path: String,
    state: GuardState,
}

impl GuardEvaluation<'_> {
    pub fn state(&self) -> &GuardState { &self.state }
    pub fn path(&self) -> &str { &self.path }

    /// Re-check the provider. Moves out of `Loading` once it has resolved; a settled
    /// evaluation never changes again.
    pub fn poll(&mut self) -> &GuardState {
        if self.state.is_settled() { return &self.state; }
        let provider = self.guard.provider.state();
        if provider.is_loading() { return &self.state; }
        self.state = self.guard.decide(&provider);
        debug!(target: "facepay::guard", "navigation to '{}' settled: {:?}", self.path, self.state);
        &self.state
    }
}
