//! Unified application error model and mapping helpers.
//! This module provides the common error enum used by the storage, directory and realtime
//! layers, along with the mapping a page uses to render an inline error banner.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Auth { code: String, message: String },
    Io { code: String, message: String },
    Transport { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Io { code, .. }
            | AppError::Transport { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Io { message, .. }
            | AppError::Transport { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn transport<S: Into<String>>(code: S, msg: S) -> Self { AppError::Transport { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to the HTTP status the backend would have answered with.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Auth { .. } => 401,
            AppError::Io { .. } => 503,
            AppError::Transport { .. } => 502,
            AppError::Internal { .. } => 500,
        }
    }

    /// Text shown in a page's inline error banner. Every variant is recoverable by retrying.
    pub fn banner(&self) -> String {
        match self {
            AppError::NotFound { message, .. } => format!("Not found: {}", message),
            AppError::Auth { .. } => "Your session is no longer valid, please sign in again".to_string(),
            AppError::Io { message, .. } | AppError::Transport { message, .. } => {
                format!("Could not reach the server ({}). Use Refresh to retry.", message)
            }
            AppError::UserInput { message, .. } | AppError::Internal { message, .. } => message.clone(),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io { code: "io_error".into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::UserInput { code: "invalid_json".into(), message: err.to_string() }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.status().map(|s| s.as_u16() == 404).unwrap_or(false) {
            return AppError::NotFound { code: "not_found".into(), message: err.to_string() };
        }
        AppError::Transport { code: "http_error".into(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
        assert_eq!(AppError::auth("auth", "no").http_status(), 401);
        assert_eq!(AppError::io("io", "io").http_status(), 503);
        assert_eq!(AppError::transport("http_error", "refused").http_status(), 502);
        assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
    }

    #[test]
    fn serializes_with_type_tag() {
        let v = serde_json::to_value(AppError::not_found("employee_not_found", "42")).unwrap();
        assert_eq!(v["type"], "not_found");
        assert_eq!(v["code"], "employee_not_found");
        assert_eq!(v["message"], "42");
    }

    #[test]
    fn banner_text_is_retry_friendly() {
        let b = AppError::transport("http_error", "connection refused").banner();
        assert!(b.contains("connection refused"));
        assert!(b.contains("Refresh"));
        assert_eq!(AppError::user("bad", "Start date is required").banner(), "Start date is required");
    }

    #[test]
    fn io_errors_map_to_io_variant() {
        let e: AppError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(e.code_str(), "io_error");
        assert_eq!(e.to_string(), "io_error: denied");
    }
}
