//! Facial-session authentication and route protection.
//! Keep the public surface thin and split implementation across sub-modules.

mod session;
mod validator;
mod provider;
mod access;
mod guard;
mod login;

pub use session::{
    FacialSession, SessionStore, AUTH_TYPE_FACIAL, AUTH_TYPE_KEY, FACIAL_SESSION_KEY, LAST_ATTENDANCE_KEY,
    USER_AUTHENTICATED_KEY,
};
pub use validator::{Clock, FacialSessionValidator, FixedClock, SystemClock};
pub use provider::{IdentityProvider, ProviderState, ProviderUser, StaticProvider, StoredProvider, PROVIDER_SESSION_KEY, PROVIDER_USER_KEY};
pub use access::{current_user, decide, is_admitted, AuthSignal, AuthType, CurrentUser};
pub use guard::{GuardEvaluation, GuardState, Navigator, Redirect, RouteGuard, DASHBOARD_ROUTE, PUBLIC_ROOT};
pub use login::{FacialLogin, LoginFailure, LoginOutcome, LoginParams, LoginStatus, FAILURE_REDIRECT_DELAY, SUCCESS_REDIRECT_DELAY};

/// Resolve the user to display: a valid facial session first, then the provider's user.
pub fn resolve_current_user(validator: &FacialSessionValidator, provider: &dyn IdentityProvider) -> Option<CurrentUser> {
    let facial = validator.check_valid();
    let state = provider.state();
    current_user(facial.as_ref(), state.user())
}

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{DateTime, Utc};

    use super::FacialSession;

    pub(crate) fn sample_session(at: DateTime<Utc>) -> FacialSession {
        FacialSession {
            employee_id: "emp-7".into(),
            user_id: Some("usr-7".into()),
            name: "Ana Lopez".into(),
            email: Some("ana@example.com".into()),
            employee_code: Some("E007".into()),
            position: Some("Analyst".into()),
            department: Some("Finance".into()),
            contact: serde_json::json!({"phone": "555-0100"}),
            authenticated_at: at,
            token: "tok-abc".into(),
        }
    }
}
