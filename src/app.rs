use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::history::{HistoryQuery, HistoryState};
use crate::timer::{CycleDurations, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    EditingTask,
}

/// What the main loop should do in response to a key press. Everything async
/// (controller calls, history fetches) happens there; key handling itself
/// stays pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Start,
    Pause,
    Reset,
    Fetch(HistoryQuery),
}

pub struct UiState {
    pub mode: Mode,
    pub task_input: String,
    pub timer: TimerState,
    pub history: HistoryState,
}

impl UiState {
    pub fn new(durations: CycleDurations) -> Self {
        Self {
            mode: Mode::Normal,
            task_input: String::new(),
            timer: TimerState::new(durations),
            history: HistoryState::new(Utc::now().date_naive()),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }

        match self.mode {
            Mode::EditingTask => self.handle_edit_key(key),
            Mode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                Action::None
            }
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                Action::Start
            }
            KeyCode::Backspace => {
                self.task_input.pop();
                Action::None
            }
            KeyCode::Char(c) => {
                self.task_input.push(c);
                Action::None
            }
            _ => Action::None,
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Action {
        if self.history.open {
            match key.code {
                KeyCode::Left => {
                    return self
                        .history
                        .previous_day()
                        .map(Action::Fetch)
                        .unwrap_or(Action::None);
                }
                KeyCode::Right => {
                    return self
                        .history
                        .next_day()
                        .map(Action::Fetch)
                        .unwrap_or(Action::None);
                }
                KeyCode::Char('t') => {
                    return Action::Fetch(self.history.today(Utc::now().date_naive()));
                }
                KeyCode::Char('g') => return Action::Fetch(self.history.recent()),
                KeyCode::Esc | KeyCode::Char('h') => {
                    self.history.close();
                    return Action::None;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('e') | KeyCode::Char('i') => {
                self.mode = Mode::EditingTask;
                Action::None
            }
            KeyCode::Enter => Action::Start,
            KeyCode::Char(' ') => {
                if self.timer.is_running {
                    Action::Pause
                } else {
                    Action::Start
                }
            }
            KeyCode::Char('r') => {
                self.task_input.clear();
                Action::Reset
            }
            KeyCode::Char('h') => Action::Fetch(self.history.open()),
            _ => Action::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state() -> UiState {
        UiState::new(CycleDurations::default())
    }

    #[test]
    fn edit_mode_collects_input_and_enter_starts() {
        let mut app = state();
        assert_eq!(app.handle_key(press(KeyCode::Char('e'))), Action::None);
        assert_eq!(app.mode, Mode::EditingTask);
        app.handle_key(press(KeyCode::Char('r')));
        app.handle_key(press(KeyCode::Char('e')));
        app.handle_key(press(KeyCode::Char('a')));
        app.handle_key(press(KeyCode::Char('d')));
        app.handle_key(press(KeyCode::Backspace));
        assert_eq!(app.task_input, "rea");
        assert_eq!(app.handle_key(press(KeyCode::Enter)), Action::Start);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn space_toggles_between_start_and_pause() {
        let mut app = state();
        assert_eq!(app.handle_key(press(KeyCode::Char(' '))), Action::Start);
        app.timer.is_running = true;
        assert_eq!(app.handle_key(press(KeyCode::Char(' '))), Action::Pause);
    }

    #[test]
    fn reset_clears_the_task_input() {
        let mut app = state();
        app.task_input = "read".into();
        assert_eq!(app.handle_key(press(KeyCode::Char('r'))), Action::Reset);
        assert!(app.task_input.is_empty());
    }

    #[test]
    fn history_keys_route_to_the_pane_while_open() {
        let mut app = state();
        let opened = app.handle_key(press(KeyCode::Char('h')));
        assert!(matches!(opened, Action::Fetch(HistoryQuery::Date(_))));
        assert!(app.history.open);

        assert!(matches!(
            app.handle_key(press(KeyCode::Left)),
            Action::Fetch(HistoryQuery::Date(_))
        ));
        assert_eq!(
            app.handle_key(press(KeyCode::Char('g'))),
            Action::Fetch(HistoryQuery::Recent)
        );
        app.handle_key(press(KeyCode::Char('h')));
        assert!(!app.history.open);
    }

    #[test]
    fn timer_controls_stay_live_while_history_is_open() {
        let mut app = state();
        app.handle_key(press(KeyCode::Char('h')));
        app.timer.is_running = true;
        assert_eq!(app.handle_key(press(KeyCode::Char(' '))), Action::Pause);
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let mut app = state();
        app.mode = Mode::EditingTask;
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(key), Action::Quit);
    }
}
