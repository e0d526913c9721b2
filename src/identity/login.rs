use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use super::guard::{Navigator, Redirect, DASHBOARD_ROUTE};
use super::session::{FacialSession, SessionStore};
use super::validator::Clock;
use crate::directory::EmployeeDirectory;

pub const SUCCESS_REDIRECT_DELAY: Duration = Duration::from_millis(1_500);
pub const FAILURE_REDIRECT_DELAY: Duration = Duration::from_secs(4);

/// Query parameters handed over by the facial verification kiosk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginParams {
    pub token: Option<String>,
    pub employee_id: Option<String>,
}

impl LoginParams {
    /// Parse `token` and `employee_id` from a query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let mut out = LoginParams::default();
        for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let v = decode_component(v);
            match decode_component(k).as_str() {
                "token" if out.token.is_none() => out.token = Some(v),
                "employee_id" if out.employee_id.is_none() => out.employee_id = Some(v),
                _ => {}
            }
        }
        out
    }

    fn required(&self) -> Option<(&str, &str)> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        let employee_id = self.employee_id.as_deref().filter(|e| !e.is_empty())?;
        Some((token, employee_id))
    }
}

fn decode_component(s: &str) -> String {
    let plus = s.replace('+', " ");
    urlencoding::decode(&plus).map(|c| c.into_owned()).unwrap_or(plus)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LoginStatus {
    Verifying,
    Succeeded,
    Failed(LoginFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginFailure {
    MissingParameters,
    EmployeeNotFound,
    LookupFailed,
    StorageFailed,
}

impl LoginStatus {
    /// Status line shown on the login screen.
    pub fn text(&self) -> &'static str {
        match self {
            LoginStatus::Verifying => "Verificando...",
            LoginStatus::Succeeded => "Autenticación exitosa. Redirigiendo...",
            LoginStatus::Failed(LoginFailure::MissingParameters) => "Acceso denegado",
            // lookup and storage failures share the screen text; the log carries the cause
            LoginStatus::Failed(_) => "Error en autenticación",
        }
    }
}

/// Result of one facial login attempt, including the delayed redirect to follow.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub status: LoginStatus,
    pub session: Option<FacialSession>,
    pub redirect: Redirect,
    pub delay: Duration,
}

impl LoginOutcome {
    fn failed(reason: LoginFailure) -> Self {
        Self {
            status: LoginStatus::Failed(reason),
            session: None,
            redirect: Redirect::public_root(),
            delay: FAILURE_REDIRECT_DELAY,
        }
    }

    pub fn is_success(&self) -> bool { self.status == LoginStatus::Succeeded }

    /// Wait out the fixed delay, then hand the redirect to the router.
    pub async fn follow(&self, navigator: &dyn Navigator) {
        tokio::time::sleep(self.delay).await;
        navigator.navigate(&self.redirect);
    }
}

/// Turns a verified facial match into a persisted session.
pub struct FacialLogin<D> {
    directory: D,
    store: SessionStore,
    clock: Arc<dyn Clock>,
}

impl<D: EmployeeDirectory> FacialLogin<D> {
    pub fn new(directory: D, store: SessionStore, clock: Arc<dyn Clock>) -> Self {
        Self { directory, store, clock }
    }

    pub async fn authenticate(&self, params: &LoginParams) -> LoginOutcome {
        let Some((token, employee_id)) = params.required() else {
            warn!(target: "facepay::login", "facial login without token or employee_id");
            return LoginOutcome::failed(LoginFailure::MissingParameters);
        };

        let employee = match self.directory.find_employee(employee_id).await {
            Ok(Some(e)) => e,
            Ok(None) => {
                warn!(target: "facepay::login", "facial login for unknown employee '{}'", employee_id);
                return LoginOutcome::failed(LoginFailure::EmployeeNotFound);
            }
            Err(e) => {
                error!(target: "facepay::login", "employee lookup for '{}' failed: {}", employee_id, e);
                return LoginOutcome::failed(LoginFailure::LookupFailed);
            }
        };

        let session = FacialSession {
            name: employee.display_name(),
            employee_id: employee.id,
            user_id: employee.user_id,
            email: employee.email,
            employee_code: employee.employee_code,
            position: employee.position,
            department: employee.department,
            contact: employee.contact,
            authenticated_at: self.clock.now(),
            token: token.to_string(),
        };
        if let Err(e) = self.store.save(&session) {
            error!(target: "facepay::login", "could not persist facial session: {}", e);
            self.store.clear();
            return LoginOutcome::failed(LoginFailure::StorageFailed);
        }
        info!(target: "facepay::login", "facial login succeeded for '{}' ({})", session.name, session.employee_id);
        LoginOutcome {
            status: LoginStatus::Succeeded,
            session: Some(session),
            redirect: Redirect::push(DASHBOARD_ROUTE),
            delay: SUCCESS_REDIRECT_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Employee, StaticDirectory};
    use crate::identity::session::FACIAL_SESSION_KEY;
    use crate::identity::validator::FixedClock;
    use crate::storage::{KeyValueStore, MemoryStore};
    use chrono::{TimeZone, Utc};

    fn login(kv: &MemoryStore) -> FacialLogin<StaticDirectory> {
        let dir = StaticDirectory::new([Employee {
            id: "emp-1".into(),
            first_name: "Pedro".into(),
            last_name: "Garcia".into(),
            employee_code: Some("E010".into()),
            ..Default::default()
        }]);
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 4, 13, 8, 0, 0).unwrap()));
        FacialLogin::new(dir, SessionStore::new(Arc::new(kv.clone())), clock)
    }

    #[test]
    fn query_parsing_decodes_values() {
        let p = LoginParams::from_query("?token=a%2Bb&employee_id=emp+1&x=y");
        assert_eq!(p.token.as_deref(), Some("a+b"));
        assert_eq!(p.employee_id.as_deref(), Some("emp 1"));
        assert_eq!(LoginParams::from_query(""), LoginParams::default());
    }

    #[tokio::test]
    async fn success_persists_session_with_clock_time() {
        let kv = MemoryStore::new();
        let out = login(&kv).authenticate(&LoginParams::from_query("token=t1&employee_id=emp-1")).await;
        assert!(out.is_success());
        assert_eq!(out.status.text(), "Autenticación exitosa. Redirigiendo...");
        assert_eq!(out.redirect, Redirect { to: "/dashboard".into(), replace: false });
        assert_eq!(out.delay, Duration::from_millis(1500));
        let s = out.session.unwrap();
        assert_eq!(s.name, "Pedro Garcia");
        assert_eq!(s.token, "t1");
        assert_eq!(s.authenticated_at, Utc.with_ymd_and_hms(2025, 4, 13, 8, 0, 0).unwrap());
        assert!(kv.get(FACIAL_SESSION_KEY).is_some());
    }

    #[test]
    fn status_texts() {
        assert_eq!(LoginStatus::Verifying.text(), "Verificando...");
        assert_eq!(LoginStatus::Failed(LoginFailure::LookupFailed).text(), "Error en autenticación");
        assert_eq!(LoginStatus::Failed(LoginFailure::StorageFailed).text(), "Error en autenticación");
    }

    #[tokio::test]
    async fn missing_parameters_are_denied() {
        let kv = MemoryStore::new();
        let out = login(&kv).authenticate(&LoginParams::from_query("token=t1")).await;
        assert_eq!(out.status, LoginStatus::Failed(LoginFailure::MissingParameters));
        assert_eq!(out.status.text(), "Acceso denegado");
        assert_eq!(out.redirect, Redirect::public_root());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn unknown_employee_creates_no_session() {
        let kv = MemoryStore::new();
        let out = login(&kv).authenticate(&LoginParams::from_query("token=t1&employee_id=ghost")).await;
        assert_eq!(out.status, LoginStatus::Failed(LoginFailure::EmployeeNotFound));
        assert_eq!(out.status.text(), "Error en autenticación");
        assert_eq!(out.redirect, Redirect::public_root());
        assert_eq!(out.delay, Duration::from_secs(4));
        assert!(out.session.is_none());
        assert!(kv.is_empty());
    }
}
