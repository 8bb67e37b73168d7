// View-side state: loading placeholders, empty states, and stale-response suppression
use crate::models::ApodEntry;
use std::fmt::Display;
use tracing::{debug, warn};

/// What a page is currently showing
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ViewState<T> {
    /// Nothing requested yet
    #[default]
    Idle,
    Loading,
    Loaded(T),
    /// The fetch failed or came back with nothing
    Empty,
}

impl<T> ViewState<T> {
    /// Collapse a fetch result. Errors become `Empty`; the reason is only logged.
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => ViewState::Loaded(value),
            Err(e) => {
                warn!("Fetch failed, showing empty state: {}", e);
                ViewState::Empty
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            ViewState::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> ViewState<Vec<T>> {
    /// Like `from_result`, but an empty list is also `Empty`
    pub fn from_list<E: Display>(result: Result<Vec<T>, E>) -> Self {
        match Self::from_result(result) {
            ViewState::Loaded(items) if items.is_empty() => ViewState::Empty,
            other => other,
        }
    }
}

/// Identifies one fetch issued by a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Hands out increasing tickets and remembers the newest.
///
/// Responses arrive in whatever order the network delivers them; only the
/// one carrying the newest ticket may update the view.
#[derive(Debug, Default)]
pub struct LatestRequest {
    issued: u64,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        ticket.0 == self.issued
    }

    /// `Some(value)` if the ticket is still current, `None` if it was superseded
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_latest(ticket) {
            Some(value)
        } else {
            debug!(
                "Discarding stale response #{} (latest is #{})",
                ticket.0, self.issued
            );
            None
        }
    }
}

/// A page's data slot: its current state plus the request guard feeding it
#[derive(Debug, Default)]
pub struct FetchSlot<T> {
    state: ViewState<T>,
    requests: LatestRequest,
}

impl<T> FetchSlot<T> {
    pub fn new() -> Self {
        Self {
            state: ViewState::Idle,
            requests: LatestRequest::new(),
        }
    }

    /// Start a fetch: show the loading placeholder and hand back its ticket
    pub fn begin(&mut self) -> Ticket {
        self.state = ViewState::Loading;
        self.requests.issue()
    }

    /// Apply a finished fetch. Returns false when the response was stale and dropped.
    pub fn complete(&mut self, ticket: Ticket, state: ViewState<T>) -> bool {
        match self.requests.accept(ticket, state) {
            Some(state) => {
                self.state = state;
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> &ViewState<T> {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = ViewState::Idle;
        // Anything still in flight is now stale
        self.requests.issue();
    }
}

/// Range results arrive oldest first; pages list the newest first
pub fn most_recent_first(mut entries: Vec<ApodEntry>) -> Vec<ApodEntry> {
    entries.reverse();
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;

    fn entry(date: &str) -> ApodEntry {
        ApodEntry {
            date: date.to_string(),
            title: date.to_string(),
            explanation: String::new(),
            media_type: MediaType::Image,
            url: String::new(),
            hd_url: None,
            copyright: None,
        }
    }

    #[test]
    fn test_range_display_order() {
        let fetched = vec![entry("2024-01-01"), entry("2024-01-02"), entry("2024-01-03")];
        let shown: Vec<_> = most_recent_first(fetched)
            .into_iter()
            .map(|e| e.date)
            .collect();
        assert_eq!(shown, vec!["2024-01-03", "2024-01-02", "2024-01-01"]);
    }

    #[test]
    fn test_errors_and_empty_lists_collapse_to_empty() {
        let failed: ViewState<ApodEntry> = ViewState::from_result(Err("network down"));
        assert_eq!(failed, ViewState::Empty);

        let nothing: ViewState<Vec<ApodEntry>> = ViewState::from_list(Ok::<_, String>(Vec::new()));
        assert_eq!(nothing, ViewState::Empty);

        let some: ViewState<Vec<ApodEntry>> =
            ViewState::from_list(Ok::<_, String>(vec![entry("2024-01-01")]));
        assert_eq!(some.loaded().map(Vec::len), Some(1));
    }

    #[test]
    fn test_latest_request_discards_stale_tickets() {
        let mut guard = LatestRequest::new();
        let first = guard.issue();
        let second = guard.issue();

        assert!(first < second);
        assert!(!guard.is_latest(first));
        assert_eq!(guard.accept(first, "old"), None);
        assert_eq!(guard.accept(second, "new"), Some("new"));
    }

    #[test]
    fn test_fetch_slot_out_of_order_responses() {
        let mut slot: FetchSlot<Vec<ApodEntry>> = FetchSlot::new();
        assert_eq!(slot.state(), &ViewState::Idle);

        let slow = slot.begin();
        let fast = slot.begin();
        assert!(slot.state().is_loading());

        // The newer request lands first
        assert!(slot.complete(fast, ViewState::Loaded(vec![entry("2024-02-01")])));
        // The older one shows up late and must not overwrite it
        assert!(!slot.complete(slow, ViewState::Loaded(vec![entry("2024-01-01")])));

        assert_eq!(slot.state().loaded().unwrap()[0].date, "2024-02-01");
    }

    #[test]
    fn test_reset_invalidates_in_flight_requests() {
        let mut slot: FetchSlot<ApodEntry> = FetchSlot::new();
        let ticket = slot.begin();
        slot.reset();

        assert!(!slot.complete(ticket, ViewState::Loaded(entry("2024-01-01"))));
        assert_eq!(slot.state(), &ViewState::Idle);
    }
}
