use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::session::{FacialSession, SessionStore};
use crate::config::DEFAULT_SESSION_TTL_HOURS;

/// Wall-clock source, injected so expiry can be tested without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: parking_lot::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self { Self { now: parking_lot::Mutex::new(now) } }
    pub fn set(&self, now: DateTime<Utc>) { *self.now.lock() = now; }
    pub fn advance(&self, by: chrono::Duration) { *self.now.lock() += by; }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> { *self.now.lock() }
}

/// Decides whether the stored facial session is still usable.
#[derive(Clone)]
pub struct FacialSessionValidator {
    store: SessionStore,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl FacialSessionValidator {
    pub fn new(store: SessionStore) -> Self {
        Self { store, clock: Arc::new(SystemClock), ttl: chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self { self.clock = clock; self }
    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self { self.ttl = ttl; self }

    pub fn store(&self) -> &SessionStore { &self.store }
    pub fn clock(&self) -> &Arc<dyn Clock> { &self.clock }
    pub fn ttl(&self) -> chrono::Duration { self.ttl }

    /// Return the stored session if it is still within its TTL.
    ///
    /// Expiry is enforced eagerly: an expired session is purged from storage before
    /// absence is returned. Valid sessions are returned as stored, without writes.
    pub fn check_valid(&self) -> Option<FacialSession> {
        let session = self.store.load()?;
        let age = session.age_at(self.clock.now());
        if age > self.ttl {
            info!(
                target: "facepay::session",
                "facial session for employee '{}' expired after {}m, clearing",
                session.employee_id, age.num_minutes()
            );
            self.store.clear();
            return None;
        }
        Some(session)
    }

    /// Explicit logout.
    pub fn logout(&self) { self.store.clear(); }
}
