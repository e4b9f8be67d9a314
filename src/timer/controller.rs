use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::{debug, error};
use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::db::SessionStore;
use crate::notify::Notifier;

use super::state::{CycleDurations, Effect, TimerState};

/// Owns the cycle state and the one-second ticker task. All state changes go
/// through the pure transition methods on [`TimerState`]; this layer only
/// schedules ticks and executes the effects they return.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl TimerController {
    pub fn new(
        durations: CycleDurations,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::new(durations))),
            store,
            notifier,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
        }
    }

    pub async fn snapshot(&self) -> TimerState {
        self.state.lock().await.clone()
    }

    pub async fn start(&self, task_name: &str) -> TimerState {
        let (started, snapshot) = {
            let mut guard = self.state.lock().await;
            let started = guard.start(task_name, Utc::now());
            (started, guard.clone())
        };

        if started {
            self.spawn_ticker().await;
        } else if !snapshot.is_running {
            debug!("Start refused: a fresh cycle needs a task name");
        }

        snapshot
    }

    pub async fn pause(&self) -> TimerState {
        let snapshot = {
            let mut guard = self.state.lock().await;
            guard.pause();
            guard.clone()
        };

        self.cancel_ticker().await;
        snapshot
    }

    pub async fn reset(&self) -> TimerState {
        let (effects, snapshot) = {
            let mut guard = self.state.lock().await;
            let effects = guard.reset(Utc::now());
            (effects, guard.clone())
        };

        self.cancel_ticker().await;
        run_effects(&self.store, &self.notifier, effects);
        snapshot
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            // First fire lands one full period after start, not immediately.
            let mut interval = time::interval_at(time::Instant::now() + tick_interval, tick_interval);
            loop {
                interval.tick().await;

                let (effects, still_running) = {
                    let mut guard = state.lock().await;
                    if !guard.is_running {
                        break;
                    }
                    let effects = guard.tick(Utc::now());
                    (effects, guard.is_running)
                };

                run_effects(&store, &notifier, effects);

                if !still_running {
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

/// Persistence is fire-and-forget: a failed save is logged and the cycle
/// keeps moving.
fn run_effects(store: &Arc<dyn SessionStore>, notifier: &Arc<dyn Notifier>, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::SaveCompleted {
                task_name,
                started_at,
                ended_at,
            } => {
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(err) = store
                        .save_completed_session(&task_name, started_at, ended_at)
                        .await
                    {
                        error!("Failed to record completed session: {err}");
                    }
                });
            }
            Effect::SavePartial {
                task_name,
                started_at,
                ended_at,
                completed_cycles,
            } => {
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(err) = store
                        .save_partial_session(&task_name, started_at, ended_at, completed_cycles)
                        .await
                    {
                        error!("Failed to record partial session: {err}");
                    }
                });
            }
            Effect::Notify {
                from,
                to,
                task_name,
            } => {
                notifier.phase_changed(from, to, &task_name);
            }
        }
    }
}
