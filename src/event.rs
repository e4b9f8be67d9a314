//! Unified event channel for the terminal host. Key input, UI ticks, render
//! ticks and history fetch results all arrive as one [`AppEvent`] stream
//! consumed by the main loop.

use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::history::HistoryQuery;
use crate::models::SessionRecord;

#[derive(Debug)]
pub enum AppEvent {
    /// A key press (`KeyEventKind::Press` only; Windows also reports releases).
    Key(KeyEvent),
    Resize(u16, u16),
    /// Refresh cadence for UI-side state (250 ms).
    Tick,
    /// Draw cadence (50 ms).
    Render,
    /// Outcome of a background history fetch, tagged with its query.
    HistoryLoaded {
        query: HistoryQuery,
        result: Result<Vec<SessionRecord>, String>,
    },
}

pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive the event channel from crossterm input plus the two intervals. Runs
/// until the receiver is dropped.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_millis(250));
        let mut render_interval = interval(Duration::from_millis(50));
        let mut reader = EventStream::new();

        loop {
            let tick = tick_interval.tick();
            let render = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            tokio::select! {
                _ = tick => {
                    if tx.send(AppEvent::Tick).is_err() {
                        break;
                    }
                }
                _ = render => {
                    if tx.send(AppEvent::Render).is_err() {
                        break;
                    }
                }
                maybe_event = crossterm_event => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) => {
                            if key.kind == KeyEventKind::Press {
                                let _ = tx.send(AppEvent::Key(key));
                            }
                        }
                        Some(Ok(Event::Resize(w, h))) => {
                            let _ = tx.send(AppEvent::Resize(w, h));
                        }
                        _ => {}
                    }
                }
            }
        }
    });
}
