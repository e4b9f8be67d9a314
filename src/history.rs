use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;
use tokio::sync::mpsc::UnboundedSender;

use crate::db::SessionStore;
use crate::event::AppEvent;
use crate::models::SessionRecord;

pub const RECENT_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryQuery {
    Date(NaiveDate),
    Recent,
}

impl HistoryQuery {
    pub fn title(&self) -> String {
        match self {
            HistoryQuery::Date(date) => date.format("%Y-%m-%d").to_string(),
            HistoryQuery::Recent => "Recent".to_string(),
        }
    }
}

/// History pane state. Every fetch carries the query it was issued for, and a
/// result only lands while that query is still the current selection; anything
/// else is a stale response from a superseded selection and is dropped.
#[derive(Debug)]
pub struct HistoryState {
    pub open: bool,
    pub query: HistoryQuery,
    pub sessions: Vec<SessionRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

impl HistoryState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            open: false,
            query: HistoryQuery::Date(today),
            sessions: Vec::new(),
            loading: false,
            error: None,
        }
    }

    fn begin(&mut self, query: HistoryQuery) -> HistoryQuery {
        self.query = query;
        self.loading = true;
        self.error = None;
        query
    }

    /// Open the pane and refresh the current selection.
    pub fn open(&mut self) -> HistoryQuery {
        self.open = true;
        self.begin(self.query)
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn previous_day(&mut self) -> Option<HistoryQuery> {
        match self.query {
            HistoryQuery::Date(date) => date.pred_opt().map(|d| self.begin(HistoryQuery::Date(d))),
            HistoryQuery::Recent => None,
        }
    }

    pub fn next_day(&mut self) -> Option<HistoryQuery> {
        match self.query {
            HistoryQuery::Date(date) => date.succ_opt().map(|d| self.begin(HistoryQuery::Date(d))),
            HistoryQuery::Recent => None,
        }
    }

    pub fn today(&mut self, today: NaiveDate) -> HistoryQuery {
        self.begin(HistoryQuery::Date(today))
    }

    pub fn recent(&mut self) -> HistoryQuery {
        self.begin(HistoryQuery::Recent)
    }

    /// Land a fetch result. Returns whether it was applied.
    pub fn apply_fetch(
        &mut self,
        query: HistoryQuery,
        result: Result<Vec<SessionRecord>, String>,
    ) -> bool {
        if !self.open || query != self.query {
            debug!("Discarding stale history result for {query:?}");
            return false;
        }

        self.loading = false;
        match result {
            Ok(sessions) => {
                self.sessions = sessions;
                self.error = None;
            }
            Err(message) => {
                self.sessions.clear();
                self.error = Some(message);
            }
        }
        true
    }
}

/// Run the query off the UI loop and post the outcome back as an event.
pub fn spawn_fetch(
    store: Arc<dyn SessionStore>,
    events: UnboundedSender<AppEvent>,
    query: HistoryQuery,
) {
    tokio::spawn(async move {
        let result = match query {
            HistoryQuery::Date(date) => store.sessions_for_date(date).await,
            HistoryQuery::Recent => store.recent_sessions(RECENT_LIMIT).await,
        }
        .map_err(|err| err.to_string());

        if events.send(AppEvent::HistoryLoaded { query, result }).is_err() {
            debug!("History receiver dropped before result delivery");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn day(text: &str) -> NaiveDate {
        text.parse().unwrap()
    }

    fn record(task: &str, started_at: &str) -> SessionRecord {
        let started_at: DateTime<Utc> = started_at.parse().unwrap();
        SessionRecord {
            id: "test".into(),
            task_name: task.into(),
            started_at,
            ended_at: started_at,
            duration_secs: 0,
            completed_cycles: 1,
            is_completed: false,
        }
    }

    #[test]
    fn stale_result_for_superseded_selection_is_discarded() {
        let mut history = HistoryState::new(day("2025-06-02"));
        let first = history.open();
        let second = history.previous_day().unwrap();
        assert_ne!(first, second);

        // The slow first fetch arrives after the selection moved on.
        assert!(!history.apply_fetch(first, Ok(vec![record("late", "2025-06-02T10:00:00Z")])));
        assert!(history.loading);
        assert!(history.sessions.is_empty());

        assert!(history.apply_fetch(second, Ok(vec![record("a", "2025-06-01T10:00:00Z")])));
        assert!(!history.loading);
        assert_eq!(history.sessions.len(), 1);
    }

    #[test]
    fn result_after_close_is_discarded() {
        let mut history = HistoryState::new(day("2025-06-02"));
        let query = history.open();
        history.close();
        assert!(!history.apply_fetch(query, Ok(vec![])));
    }

    #[test]
    fn fetch_error_replaces_the_list() {
        let mut history = HistoryState::new(day("2025-06-02"));
        let query = history.open();
        history.apply_fetch(query, Ok(vec![record("a", "2025-06-02T10:00:00Z")]));

        let query = history.today(day("2025-06-02"));
        assert!(history.apply_fetch(query, Err("store offline".into())));
        assert_eq!(history.error.as_deref(), Some("store offline"));
        assert!(history.sessions.is_empty());
    }

    #[test]
    fn day_navigation_moves_the_selection() {
        let mut history = HistoryState::new(day("2025-06-02"));
        history.open();
        assert_eq!(
            history.previous_day(),
            Some(HistoryQuery::Date(day("2025-06-01")))
        );
        assert_eq!(
            history.next_day(),
            Some(HistoryQuery::Date(day("2025-06-02")))
        );
    }

    #[test]
    fn recent_view_ignores_day_navigation() {
        let mut history = HistoryState::new(day("2025-06-02"));
        history.open();
        history.recent();
        assert_eq!(history.previous_day(), None);
        assert_eq!(history.next_day(), None);
        assert_eq!(history.query, HistoryQuery::Recent);
    }
}
