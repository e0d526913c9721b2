use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderUser;
use super::session::FacialSession;

/// One independent authentication signal.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthSignal {
    /// Third-party provider reports the user as signed in
    Provider(bool),
    /// Output of the facial session validator
    Facial(Option<FacialSession>),
}

impl AuthSignal {
    pub fn grants_access(&self) -> bool {
        match self {
            AuthSignal::Provider(authenticated) => *authenticated,
            AuthSignal::Facial(session) => session.is_some(),
        }
    }
}

/// Route admission: any signal indicating a valid session admits.
pub fn is_admitted(signals: &[AuthSignal]) -> bool {
    signals.iter().any(AuthSignal::grants_access)
}

/// Two-input form of [`is_admitted`].
pub fn decide(provider_authenticated: bool, facial: Option<&FacialSession>) -> bool {
    provider_authenticated || facial.is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Facial,
    Provider,
}

/// Display view of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub employee_code: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub contact: serde_json::Value,
    #[serde(default)]
    pub authenticated_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub auth_type: AuthType,
}

impl From<&FacialSession> for CurrentUser {
    fn from(s: &FacialSession) -> Self {
        Self {
            id: Some(s.employee_id.clone()),
            name: Some(s.name.clone()),
            email: s.email.clone(),
            employee_code: s.employee_code.clone(),
            position: s.position.clone(),
            department: s.department.clone(),
            user_id: s.user_id.clone(),
            contact: s.contact.clone(),
            authenticated_at: Some(s.authenticated_at),
            auth_type: AuthType::Facial,
        }
    }
}

impl From<&ProviderUser> for CurrentUser {
    fn from(u: &ProviderUser) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            employee_code: None,
            position: None,
            department: None,
            user_id: u.id.clone(),
            contact: serde_json::Value::Null,
            authenticated_at: None,
            auth_type: AuthType::Provider,
        }
    }
}

/// Facial identity wins over the provider identity when both exist. Display only;
/// admission never depends on which one is shown.
pub fn current_user(facial: Option<&FacialSession>, provider: Option<&ProviderUser>) -> Option<CurrentUser> {
    facial.map(CurrentUser::from).or_else(|| provider.map(CurrentUser::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::testutil::sample_session;
    use chrono::Utc;

    #[test]
    fn decision_is_boolean_or() {
        let s = sample_session(Utc::now());
        assert!(decide(true, None));
        assert!(decide(true, Some(&s)));
        assert!(decide(false, Some(&s)));
        assert!(!decide(false, None));
    }

    #[test]
    fn signal_list_matches_two_input_form() {
        let s = sample_session(Utc::now());
        for provider in [false, true] {
            for facial in [None, Some(s.clone())] {
                let expected = decide(provider, facial.as_ref());
                let got = is_admitted(&[AuthSignal::Provider(provider), AuthSignal::Facial(facial)]);
                assert_eq!(got, expected);
            }
        }
        assert!(!is_admitted(&[]));
    }

    #[test]
    fn facial_identity_takes_precedence() {
        let s = sample_session(Utc::now());
        let p = ProviderUser { id: Some("auth0|9".into()), name: Some("Provider Name".into()), ..Default::default() };
        let u = current_user(Some(&s), Some(&p)).unwrap();
        assert_eq!(u.auth_type, AuthType::Facial);
        assert_eq!(u.id.as_deref(), Some("emp-7"));
        assert_eq!(u.employee_code.as_deref(), Some("E007"));
        assert_eq!(u.user_id.as_deref(), Some("usr-7"));
        assert_eq!(u.contact, serde_json::json!({"phone": "555-0100"}));
        assert_eq!(u.authenticated_at, Some(s.authenticated_at));

        let u = current_user(None, Some(&p)).unwrap();
        assert_eq!(u.auth_type, AuthType::Provider);
        assert_eq!(u.name.as_deref(), Some("Provider Name"));
        assert_eq!(u.user_id.as_deref(), Some("auth0|9"));
        assert!(u.authenticated_at.is_none());

        assert!(current_user(None, None).is_none());
    }

    #[test]
    fn current_user_serializes_type_tag() {
        let v = serde_json::to_value(CurrentUser::from(&sample_session(Utc::now()))).unwrap();
        assert_eq!(v["type"], "facial");
        assert_eq!(v["employeeCode"], "E007");
        assert_eq!(v["userId"], "usr-7");
        assert_eq!(v["contact"]["phone"], "555-0100");
        assert!(v["authenticatedAt"].is_string());
    }
}
