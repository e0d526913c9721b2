use super::event::{EventKind, RealtimeEvent};

/// Which events a page cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    Attendance,
    Employee,
    Payroll,
    AnyDomain,
    Only(Vec<EventKind>),
}

impl EventFilter {
    pub fn matches(&self, kind: EventKind) -> bool {
        match self {
            EventFilter::Attendance => kind.is_attendance(),
            EventFilter::Employee => kind.is_employee(),
            EventFilter::Payroll => kind.is_payroll(),
            EventFilter::AnyDomain => kind.is_domain(),
            EventFilter::Only(kinds) => kinds.contains(&kind),
        }
    }
}

/// Calls `action` once for every event whose kind satisfies `predicate`.
///
/// Bursts are not coalesced: three matching events mean three refreshes, in delivery order.
pub struct RefreshTrigger<P, A> {
    predicate: P,
    action: A,
    fired: u64,
}

impl<P, A> RefreshTrigger<P, A>
where
    P: Fn(EventKind) -> bool,
    A: FnMut(),
{
    pub fn new(predicate: P, action: A) -> Self { Self { predicate, action, fired: 0 } }

    /// Returns whether the refresh action ran.
    pub fn handle(&mut self, event: &RealtimeEvent) -> bool {
        if !(self.predicate)(event.kind) { return false; }
        self.fired += 1;
        (self.action)();
        true
    }

    pub fn fired(&self) -> u64 { self.fired }

    /// Adapt into a callback for [`ConnectionManager::connect`](super::ConnectionManager::connect).
    pub fn into_callback(mut self) -> impl FnMut(RealtimeEvent) + Send + 'static
    where
        P: Send + 'static,
        A: Send + 'static,
    {
        move |event| { self.handle(&event); }
    }
}

/// Trigger driven by one of the predefined filters.
pub fn refresh_on<A: FnMut()>(filter: EventFilter, action: A) -> RefreshTrigger<impl Fn(EventKind) -> bool, A> {
    RefreshTrigger::new(move |kind| filter.matches(kind), action)
}
