//! Controller tests with the store and notifier replaced by in-memory
//! doubles. Time is paused, so each virtual second is advanced by hand.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::task::yield_now;
use tokio::time;

use pmo::db::SessionStore;
use pmo::models::SessionRecord;
use pmo::notify::Notifier;
use pmo::timer::{CycleDurations, CyclePhase, TimerController};

#[derive(Default)]
struct RecordingStore {
    completed: Mutex<Vec<String>>,
    partial: Mutex<Vec<(String, u32)>>,
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn save_completed_session(
        &self,
        task_name: &str,
        _started_at: DateTime<Utc>,
        _ended_at: DateTime<Utc>,
    ) -> Result<()> {
        self.completed.lock().unwrap().push(task_name.to_string());
        Ok(())
    }

    async fn save_partial_session(
        &self,
        task_name: &str,
        _started_at: DateTime<Utc>,
        _ended_at: DateTime<Utc>,
        completed_cycles: u32,
    ) -> Result<()> {
        self.partial
            .lock()
            .unwrap()
            .push((task_name.to_string(), completed_cycles));
        Ok(())
    }

    async fn sessions_for_date(&self, _date: NaiveDate) -> Result<Vec<SessionRecord>> {
        Ok(Vec::new())
    }

    async fn recent_sessions(&self, _limit: u32) -> Result<Vec<SessionRecord>> {
        Ok(Vec::new())
    }
}

/// Every call fails, as if the database file were gone.
struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn save_completed_session(
        &self,
        _task_name: &str,
        _started_at: DateTime<Utc>,
        _ended_at: DateTime<Utc>,
    ) -> Result<()> {
        Err(anyhow!("store offline"))
    }

    async fn save_partial_session(
        &self,
        _task_name: &str,
        _started_at: DateTime<Utc>,
        _ended_at: DateTime<Utc>,
        _completed_cycles: u32,
    ) -> Result<()> {
        Err(anyhow!("store offline"))
    }

    async fn sessions_for_date(&self, _date: NaiveDate) -> Result<Vec<SessionRecord>> {
        Err(anyhow!("store offline"))
    }

    async fn recent_sessions(&self, _limit: u32) -> Result<Vec<SessionRecord>> {
        Err(anyhow!("store offline"))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    transitions: Mutex<Vec<(CyclePhase, CyclePhase, String)>>,
}

impl Notifier for RecordingNotifier {
    fn phase_changed(&self, from: CyclePhase, to: CyclePhase, task_name: &str) {
        self.transitions
            .lock()
            .unwrap()
            .push((from, to, task_name.to_string()));
    }
}

fn durations() -> CycleDurations {
    CycleDurations {
        work_secs: 2,
        short_break_secs: 1,
        long_break_secs: 1,
    }
}

/// Move the paused clock forward one second at a time. The leading settle
/// lets a freshly spawned ticker register its interval before the clock
/// moves; the trailing ones let it and any spawned save tasks run.
async fn advance_secs(seconds: u32) {
    settle().await;
    for _ in 0..seconds {
        time::advance(Duration::from_secs(1)).await;
        settle().await;
    }
}

async fn settle() {
    for _ in 0..8 {
        yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn cycle_advances_even_when_the_store_fails() {
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = TimerController::new(durations(), Arc::new(FailingStore), notifier.clone());

    let state = controller.start("read").await;
    assert!(state.is_running);

    advance_secs(2).await;
    let state = controller.snapshot().await;
    assert_eq!(state.phase, CyclePhase::ShortBreak);
    assert_eq!(state.completed_work_periods, 1);
    assert!(state.is_running, "breaks begin counting down on their own");

    // Ride out the rest of the session; every save attempt fails.
    advance_secs(10).await;
    let state = controller.snapshot().await;
    assert!(!state.is_running, "cycle halts after the long break");
    assert_eq!(state.phase, CyclePhase::Work);
    assert_eq!(state.completed_work_periods, 0);
    assert_eq!(state.task_name, "");

    let transitions = notifier.transitions.lock().unwrap();
    assert_eq!(transitions.len(), 8, "every phase change was announced");
    assert_eq!(
        transitions[0],
        (CyclePhase::Work, CyclePhase::ShortBreak, "read".to_string())
    );
    assert_eq!(
        transitions[7],
        (CyclePhase::LongBreak, CyclePhase::Work, "read".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn halted_timer_ignores_further_time() {
    let store = Arc::new(RecordingStore::default());
    let controller = TimerController::new(
        durations(),
        store.clone(),
        Arc::new(RecordingNotifier::default()),
    );

    controller.start("read").await;
    advance_secs(12).await;

    let state = controller.snapshot().await;
    assert!(!state.is_running);

    advance_secs(5).await;
    let state = controller.snapshot().await;
    assert_eq!(state.remaining_secs, durations().work_secs);

    assert_eq!(store.completed.lock().unwrap().as_slice(), ["read"]);
    assert!(store.partial.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reset_mid_cycle_saves_partial_and_restores_defaults() {
    let store = Arc::new(RecordingStore::default());
    let controller = TimerController::new(
        durations(),
        store.clone(),
        Arc::new(RecordingNotifier::default()),
    );

    controller.start("essay").await;
    advance_secs(2).await;

    let state = controller.reset().await;
    settle().await;

    assert_eq!(state.phase, CyclePhase::Work);
    assert_eq!(state.remaining_secs, durations().work_secs);
    assert!(!state.is_running);
    assert_eq!(state.task_name, "");
    assert_eq!(state.completed_work_periods, 0);
    assert!(state.cycle_started_at.is_none());

    assert_eq!(
        store.partial.lock().unwrap().as_slice(),
        [("essay".to_string(), 1)]
    );
    assert!(store.completed.lock().unwrap().is_empty());

    // No ticker left behind.
    advance_secs(3).await;
    let state = controller.snapshot().await;
    assert_eq!(state.remaining_secs, durations().work_secs);
}

#[tokio::test(start_paused = true)]
async fn pause_stops_the_ticker_until_resumed() {
    let controller = TimerController::new(
        durations(),
        Arc::new(RecordingStore::default()),
        Arc::new(RecordingNotifier::default()),
    );

    controller.start("read").await;
    advance_secs(1).await;

    let state = controller.pause().await;
    assert!(!state.is_running);
    assert_eq!(state.remaining_secs, 1);

    advance_secs(5).await;
    let state = controller.snapshot().await;
    assert_eq!(state.remaining_secs, 1, "paused timer must not tick");

    // Resuming mid-cycle needs no task name.
    let state = controller.start("").await;
    assert!(state.is_running);
    assert_eq!(state.task_name, "read");

    advance_secs(1).await;
    let state = controller.snapshot().await;
    assert_eq!(state.phase, CyclePhase::ShortBreak);
}

#[tokio::test(start_paused = true)]
async fn restarting_while_running_does_not_stack_tickers() {
    let controller = TimerController::new(
        durations(),
        Arc::new(RecordingStore::default()),
        Arc::new(RecordingNotifier::default()),
    );

    controller.start("read").await;
    let state = controller.start("read").await;
    assert!(state.is_running);

    advance_secs(1).await;
    let state = controller.snapshot().await;
    assert_eq!(
        state.remaining_secs, 1,
        "a second start must not add a second ticker"
    );
}
