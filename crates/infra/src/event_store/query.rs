//! Read-side window over the event log.
//!
//! Queries are bounded by a `since` cursor and a page size. Results are ordered
//! by `created_at` then `id`, both ascending.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use chronicle_core::EventId;
use chronicle_events::StoredEvent;

/// Page size used when the caller does not give one.
pub const DEFAULT_LIMIT: u32 = 20;

/// Upper bound on a single page.
pub const MAX_LIMIT: u32 = 1000;

/// How far back the default window reaches.
pub fn default_lookback() -> Duration {
    Duration::hours(1)
}

/// Which slice of the log a query returns.
///
/// An event is inside the window when `created_at >= since`. When `after` is set,
/// events stamped exactly at `since` must also have an id greater than `after`;
/// this lets a caller resume behind the last event of a previous page even when
/// several events share one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub since: DateTime<Utc>,
    pub limit: u32,
    pub after: Option<EventId>,
}

impl Default for EventWindow {
    fn default() -> Self {
        Self {
            since: Utc::now() - default_lookback(),
            limit: DEFAULT_LIMIT,
            after: None,
        }
    }
}

impl EventWindow {
    /// Build a window from optional caller input, filling in defaults.
    pub fn new(since: Option<DateTime<Utc>>, limit: Option<u32>) -> Self {
        Self {
            since: since.unwrap_or_else(|| Utc::now() - default_lookback()),
            limit: limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            after: None,
        }
    }

    /// Window that starts right behind `event`.
    pub fn after_event(event: &StoredEvent, limit: u32) -> Self {
        Self {
            since: event.created_at(),
            limit: limit.min(MAX_LIMIT),
            after: Some(event.id()),
        }
    }

    /// The window for the page following `page`, or `None` if `page` is empty.
    pub fn next(&self, page: &[StoredEvent]) -> Option<Self> {
        page.last().map(|last| Self::after_event(last, self.limit))
    }

    pub fn limit_usize(&self) -> usize {
        self.limit as usize
    }

    /// Whether `event` falls inside this window.
    pub fn admits(&self, event: &StoredEvent) -> bool {
        let at = event.created_at();
        if at < self.since {
            return false;
        }
        match self.after {
            Some(after) => at > self.since || event.id() > after,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::AggregateId;
    use chronicle_events::EventEnvelope;

    fn event(id: i64, at: DateTime<Utc>) -> StoredEvent {
        EventEnvelope::new(
            EventId::new(id).unwrap(),
            AggregateId::new(1).unwrap(),
            "user",
            "UserCreated",
            "v1",
            at,
            b"{}".to_vec(),
        )
    }

    #[test]
    fn default_window_looks_back_one_hour_with_twenty_rows() {
        let before = Utc::now();
        let window = EventWindow::default();
        let after = Utc::now();

        assert_eq!(window.limit, 20);
        assert!(window.since >= before - Duration::hours(1));
        assert!(window.since <= after - Duration::hours(1));
        assert!(window.after.is_none());
    }

    #[test]
    fn new_caps_limit_and_keeps_explicit_values() {
        let since = Utc::now() - Duration::days(3);
        let window = EventWindow::new(Some(since), Some(50_000));
        assert_eq!(window.since, since);
        assert_eq!(window.limit, MAX_LIMIT);

        let zero = EventWindow::new(Some(since), Some(0));
        assert_eq!(zero.limit, 0);
    }

    #[test]
    fn admits_is_inclusive_at_since() {
        let t = Utc::now();
        let window = EventWindow::new(Some(t), None);

        assert!(window.admits(&event(1, t)));
        assert!(window.admits(&event(2, t + Duration::milliseconds(1))));
        assert!(!window.admits(&event(3, t - Duration::milliseconds(1))));
    }

    #[test]
    fn after_skips_only_ties_up_to_the_cursor() {
        let t = Utc::now();
        let first = event(4, t);
        let window = EventWindow::after_event(&first, 10);

        assert!(!window.admits(&event(3, t)));
        assert!(!window.admits(&first));
        assert!(window.admits(&event(5, t)));
        assert!(window.admits(&event(2, t + Duration::seconds(1))));
    }

    #[test]
    fn next_is_none_for_empty_page() {
        let window = EventWindow::default();
        assert!(window.next(&[]).is_none());

        let t = Utc::now();
        let page = vec![event(1, t), event(2, t)];
        let next = window.next(&page).unwrap();
        assert_eq!(next.since, t);
        assert_eq!(next.after, EventId::new(2).ok());
        assert_eq!(next.limit, window.limit);
    }
}
