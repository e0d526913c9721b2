//! Page-level data ownership.
//!
//! A page refreshes its data on user action and on realtime events, and the two can
//! overlap. Every refresh takes a ticket when it starts; a result is applied only if no
//! later-started refresh has already been applied, so a slow early fetch can never
//! overwrite a newer one. Failures set the inline error banner and keep the last good data.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

impl RefreshTicket {
    pub fn seq(&self) -> u64 { self.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    Failed,
    /// A newer refresh already landed; this result was dropped
    Stale,
}

struct PageState<T> {
    data: Option<T>,
    error: Option<String>,
    issued: u64,
    applied: u64,
    in_flight: usize,
}

/// Data, error banner and refresh sequencing for one page.
pub struct PageData<T> {
    name: String,
    state: parking_lot::Mutex<PageState<T>>,
}

impl<T: Clone> PageData<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: parking_lot::Mutex::new(PageState { data: None, error: None, issued: 0, applied: 0, in_flight: 0 }),
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn data(&self) -> Option<T> { self.state.lock().data.clone() }
    pub fn error(&self) -> Option<String> { self.state.lock().error.clone() }
    pub fn is_loading(&self) -> bool { self.state.lock().in_flight > 0 }

    pub fn begin(&self) -> RefreshTicket {
        let mut st = self.state.lock();
        st.issued += 1;
        st.in_flight += 1;
        RefreshTicket(st.issued)
    }

    pub fn complete(&self, ticket: RefreshTicket, result: AppResult<T>) -> RefreshOutcome {
        let mut st = self.state.lock();
        st.in_flight = st.in_flight.saturating_sub(1);
        if ticket.0 <= st.applied {
            debug!(target: "facepay::page", "{}: dropping stale refresh #{} (applied #{})", self.name, ticket.0, st.applied);
            return RefreshOutcome::Stale;
        }
        st.applied = ticket.0;
        match result {
            Ok(data) => {
                st.data = Some(data);
                st.error = None;
                RefreshOutcome::Applied
            }
            Err(e) => {
                warn!(target: "facepay::page", "{}: refresh #{} failed: {}", self.name, ticket.0, e);
                st.error = Some(e.banner());
                RefreshOutcome::Failed
            }
        }
    }

    /// Run one fetch under a ticket.
    pub async fn refresh_with<F, Fut>(&self, fetch: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let ticket = self.begin();
        let result = fetch().await;
        self.complete(ticket, result)
    }
}

impl<T: Clone + Send + 'static> PageData<T> {
    /// Zero-argument refresh action suitable for a [`RefreshTrigger`](crate::realtime::RefreshTrigger).
    ///
    /// The ticket is taken synchronously when the action runs, so event order decides which
    /// result wins; the fetch itself runs on the tokio runtime. Without a runtime the
    /// refresh is skipped and the page keeps its current data.
    pub fn refresh_action<F, Fut>(self: &Arc<Self>, fetch: F) -> impl FnMut() + Send + 'static
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let page = Arc::clone(self);
        move || {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!(target: "facepay::page", "{}: no async runtime, refresh skipped", page.name);
                return;
            };
            let ticket = page.begin();
            let page = Arc::clone(&page);
            let fut = fetch();
            runtime.spawn(async move {
                let result = fut.await;
                page.complete(ticket, result);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn newer_result_wins_over_slower_older_one() {
        let page: PageData<Vec<u32>> = PageData::new("attendance");
        let manual = page.begin();
        let realtime = page.begin();
        assert!(page.is_loading());
        assert_eq!(page.complete(realtime, Ok(vec![1, 2, 3])), RefreshOutcome::Applied);
        assert_eq!(page.complete(manual, Ok(vec![1])), RefreshOutcome::Stale);
        assert_eq!(page.data(), Some(vec![1, 2, 3]));
        assert!(!page.is_loading());
    }

    #[test]
    fn failure_keeps_data_and_sets_banner() {
        let page: PageData<u32> = PageData::new("payroll");
        let t = page.begin();
        page.complete(t, Ok(7));
        let t = page.begin();
        let out = page.complete(t, Err(AppError::transport("http_error", "connection refused")));
        assert_eq!(out, RefreshOutcome::Failed);
        assert_eq!(page.data(), Some(7));
        assert!(page.error().unwrap().contains("connection refused"));
        let t = page.begin();
        page.complete(t, Ok(8));
        assert_eq!(page.error(), None);
    }

    #[test]
    fn refresh_action_outside_runtime_is_skipped() {
        let page: Arc<PageData<u32>> = Arc::new(PageData::new("reports"));
        let mut action = page.refresh_action(|| async { Ok(1) });
        action();
        assert!(!page.is_loading());
        assert_eq!(page.data(), None);
    }

    #[tokio::test]
    async fn refresh_with_applies_result() {
        let page: PageData<&'static str> = PageData::new("employees");
        let out = page.refresh_with(|| async { Ok("rows") }).await;
        assert_eq!(out, RefreshOutcome::Applied);
        assert_eq!(page.data(), Some("rows"));
    }
}
