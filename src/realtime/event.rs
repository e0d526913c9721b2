use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Every notification the bridge can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Connected,
    Error,
    Disconnected,
    EmployeeCreated,
    EmployeeUpdated,
    EmployeeDeleted,
    AttendanceCreated,
    AttendanceUpdated,
    PayrollCalculated,
    DbChange,
}

impl EventKind {
    /// Named backend events the bridge subscribes to.
    pub const SUBSCRIBED: [EventKind; 7] = [
        EventKind::DbChange,
        EventKind::EmployeeCreated,
        EventKind::EmployeeUpdated,
        EventKind::EmployeeDeleted,
        EventKind::AttendanceCreated,
        EventKind::AttendanceUpdated,
        EventKind::PayrollCalculated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Error => "error",
            EventKind::Disconnected => "disconnected",
            EventKind::EmployeeCreated => "employee_created",
            EventKind::EmployeeUpdated => "employee_updated",
            EventKind::EmployeeDeleted => "employee_deleted",
            EventKind::AttendanceCreated => "attendance_created",
            EventKind::AttendanceUpdated => "attendance_updated",
            EventKind::PayrollCalculated => "payroll_calculated",
            EventKind::DbChange => "db_change",
        }
    }

    /// Resolve a backend event name. Lifecycle names are not accepted from the wire.
    pub fn from_wire(name: &str) -> Option<EventKind> {
        EventKind::SUBSCRIBED.iter().copied().find(|k| k.as_str() == name)
    }

    pub fn is_lifecycle(&self) -> bool {
        matches!(self, EventKind::Connected | EventKind::Error | EventKind::Disconnected)
    }

    pub fn is_domain(&self) -> bool { !self.is_lifecycle() }

    pub fn is_employee(&self) -> bool {
        matches!(self, EventKind::EmployeeCreated | EventKind::EmployeeUpdated | EventKind::EmployeeDeleted)
    }

    pub fn is_attendance(&self) -> bool {
        matches!(self, EventKind::AttendanceCreated | EventKind::AttendanceUpdated)
    }

    pub fn is_payroll(&self) -> bool { matches!(self, EventKind::PayrollCalculated) }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One notification; the payload is whatever the backend sent and is not interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub payload: Value,
}

impl RealtimeEvent {
    pub fn new(kind: EventKind, payload: Value) -> Self { Self { kind, payload } }

    pub fn connected() -> Self { Self::new(EventKind::Connected, json!({"message": "Connected"})) }
    pub fn error() -> Self { Self::new(EventKind::Error, json!({"message": "Connection error"})) }
    pub fn disconnected() -> Self { Self::new(EventKind::Disconnected, json!({"message": "Disconnected"})) }
}
