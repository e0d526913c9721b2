use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::storage::SharedKv;
use crate::tprintln;

pub const FACIAL_SESSION_KEY: &str = "facial_auth_session";
pub const AUTH_TYPE_KEY: &str = "auth_type";
pub const USER_AUTHENTICATED_KEY: &str = "user_authenticated";
pub const LAST_ATTENDANCE_KEY: &str = "last_attendance";
pub const AUTH_TYPE_FACIAL: &str = "facial";

/// Time-limited proof of identity produced by the facial verification step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacialSession {
    pub employee_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub employee_code: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// Opaque, passed through unvalidated
    #[serde(default)]
    pub contact: serde_json::Value,
    pub authenticated_at: DateTime<Utc>,
    pub token: String,
}

impl FacialSession {
    /// Elapsed time since authentication; negative when the stored clock is ahead of ours.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration { now - self.authenticated_at }
}

/// Persists the facial session in the durable store.
///
/// `tab` is the optional tab-scoped store (session storage). It is only ever cleared,
/// so a session copied there by another component does not outlive logout.
#[derive(Clone)]
pub struct SessionStore {
    durable: SharedKv,
    tab: Option<SharedKv>,
}

impl SessionStore {
    pub fn new(durable: SharedKv) -> Self { Self { durable, tab: None } }

    pub fn with_tab_storage(durable: SharedKv, tab: SharedKv) -> Self { Self { durable, tab: Some(tab) } }

    pub fn storage(&self) -> &SharedKv { &self.durable }

    /// Write the session and its kind markers, replacing any prior session.
    pub fn save(&self, session: &FacialSession) -> AppResult<()> {
        let json = serde_json::to_string(session)?;
        self.durable.set(FACIAL_SESSION_KEY, &json)?;
        self.durable.set(AUTH_TYPE_KEY, AUTH_TYPE_FACIAL)?;
        self.durable.set(USER_AUTHENTICATED_KEY, "true")?;
        debug!(target: "facepay::session", "facial session stored for '{}'", session.name);
        Ok(())
    }

    /// Load the stored session. Anything missing, of another kind or unparsable is absent.
    pub fn load(&self) -> Option<FacialSession> {
        if self.durable.get(AUTH_TYPE_KEY).as_deref() != Some(AUTH_TYPE_FACIAL) {
            return None;
        }
        let raw = self.durable.get(FACIAL_SESSION_KEY)?;
        match serde_json::from_str::<FacialSession>(&raw) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(target: "facepay::session", "stored facial session is malformed: {}", e);
                None
            }
        }
    }

    /// Remove the session, its markers and the values cached alongside it.
    ///
    /// Removal is best-effort per key so one failing key does not keep the others alive.
    pub fn clear(&self) {
        for key in [FACIAL_SESSION_KEY, AUTH_TYPE_KEY, USER_AUTHENTICATED_KEY, LAST_ATTENDANCE_KEY] {
            if let Err(e) = self.durable.remove(key) {
                warn!(target: "facepay::session", "failed to remove '{}': {}", key, e);
            }
        }
        if let Some(tab) = &self.tab {
            if let Err(e) = tab.remove(FACIAL_SESSION_KEY) {
                warn!(target: "facepay::session", "failed to remove tab session: {}", e);
            }
        }
        tprintln!("session.clear");
        debug!(target: "facepay::session", "facial session cleared");
    }

    /// Cache the most recent attendance record seen at login.
    pub fn save_last_attendance(&self, record: &serde_json::Value) -> AppResult<()> {
        self.durable.set(LAST_ATTENDANCE_KEY, &serde_json::to_string(record)?)
    }
}
