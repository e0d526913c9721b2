//! Employee directory lookups used by the facial login flow.
//!
//! The backend answers `GET {api_url}/employees/{id}` with a `{ "data": {...} }` envelope;
//! a 404 or a null `data` means the employee does not exist.

use std::collections::HashMap;
use std::future::Future;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub employee_code: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub contact: serde_json::Value,
}

impl Employee {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Lookup capability over the employee records.
pub trait EmployeeDirectory: Send + Sync {
    /// `Ok(None)` when the employee does not exist.
    fn find_employee(&self, id: &str) -> impl Future<Output = AppResult<Option<Employee>>> + Send;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// REST-backed directory.
#[derive(Clone)]
pub struct HttpEmployeeDirectory {
    base: Url,
    client: reqwest::Client,
}

impl HttpEmployeeDirectory {
    pub fn new(api_url: &str) -> AppResult<Self> {
        // join() drops the last path segment unless the base ends with '/'
        let normalized = format!("{}/", api_url.trim_end_matches('/'));
        let base = Url::parse(&normalized)
            .map_err(|e| AppError::UserInput { code: "invalid_api_url".into(), message: format!("{}: {}", api_url, e) })?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base, client })
    }

    pub fn employee_url(&self, id: &str) -> AppResult<Url> {
        self.base
            .join(&format!("employees/{}", urlencoding::encode(id)))
            .map_err(|e| AppError::UserInput { code: "invalid_employee_id".into(), message: e.to_string() })
    }
}

impl EmployeeDirectory for HttpEmployeeDirectory {
    async fn find_employee(&self, id: &str) -> AppResult<Option<Employee>> {
        let url = self.employee_url(id)?;
        debug!(target: "facepay::directory", "GET {}", url);
        let resp = self.client.get(url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status()?;
        let env: Envelope<Employee> = resp.json().await?;
        Ok(env.data)
    }
}

/// Fixed in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    employees: HashMap<String, Employee>,
}

impl StaticDirectory {
    pub fn new<I: IntoIterator<Item = Employee>>(employees: I) -> Self {
        Self { employees: employees.into_iter().map(|e| (e.id.clone(), e)).collect() }
    }
}

impl EmployeeDirectory for StaticDirectory {
    async fn find_employee(&self, id: &str) -> AppResult<Option<Employee>> {
        Ok(self.employees.get(id).cloned())
    }
}
