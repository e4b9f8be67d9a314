use std::{
    process::{Command, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use log::{debug, warn};
use notify_rust::Notification;

use crate::timer::CyclePhase;

/// Presentation side of a phase change. Implementations must not block the
/// ticker and must swallow delivery failures.
pub trait Notifier: Send + Sync {
    fn phase_changed(&self, from: CyclePhase, to: CyclePhase, task_name: &str);
}

const UNNAMED_TASK: &str = "Unnamed Task";

/// Players tried in order until one accepts the completion cue.
const CUE_PLAYERS: &[(&str, &str)] = &[
    ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
    ("aplay", "/usr/share/sounds/alsa/Front_Center.wav"),
    ("afplay", "/System/Library/Sounds/Glass.aiff"),
];

pub struct DesktopNotifier {
    sound_enabled: bool,
    delivery_failed: Arc<AtomicBool>,
}

impl DesktopNotifier {
    pub fn new(sound_enabled: bool) -> Self {
        Self {
            sound_enabled,
            delivery_failed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn phase_changed(&self, from: CyclePhase, to: CyclePhase, task_name: &str) {
        let title = transition_title(from, to);
        let task = if task_name.trim().is_empty() {
            UNNAMED_TASK.to_string()
        } else {
            task_name.to_string()
        };

        let delivery_failed = self.delivery_failed.clone();
        thread::spawn(move || {
            let shown = Notification::new()
                .summary(title)
                .body(&format!("Time's up for task: {task}"))
                .appname("pmo")
                .icon("alarm-clock")
                .show();

            if let Err(err) = shown {
                // Warn once, then stop nagging the log on every transition.
                if !delivery_failed.swap(true, Ordering::Relaxed) {
                    warn!("Desktop notifications unavailable: {err}");
                } else {
                    debug!("Notification delivery failed: {err}");
                }
            }
        });

        if self.sound_enabled {
            play_cue();
        }
    }
}

fn transition_title(from: CyclePhase, to: CyclePhase) -> &'static str {
    match (from, to) {
        (CyclePhase::Work, CyclePhase::ShortBreak) => "Break time!",
        (CyclePhase::Work, CyclePhase::LongBreak) => "Long break! Session almost complete",
        (CyclePhase::LongBreak, CyclePhase::Work) => "Session complete!",
        _ => "Back to work!",
    }
}

fn play_cue() {
    thread::spawn(|| {
        for (player, sound) in CUE_PLAYERS {
            match Command::new(player)
                .arg(sound)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                Ok(status) if status.success() => return,
                Ok(_) => {}
                Err(err) => debug!("Audio cue via {player} failed: {err}"),
            }
        }
        debug!("No available player accepted the completion cue");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_break_title_flags_session_end() {
        assert_eq!(
            transition_title(CyclePhase::Work, CyclePhase::LongBreak),
            "Long break! Session almost complete"
        );
        assert_eq!(
            transition_title(CyclePhase::LongBreak, CyclePhase::Work),
            "Session complete!"
        );
    }
}
