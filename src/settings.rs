use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::timer::CycleDurations;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub durations: CycleDurations,
    pub sound_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            durations: CycleDurations::default(),
            sound_enabled: true,
        }
    }
}

impl Settings {
    /// Load from `path`, materializing the defaults there on first run.
    /// Unreadable contents fall back to defaults rather than failing startup.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            Ok(serde_json::from_str(&contents).unwrap_or_default())
        } else {
            let settings = Self::default();
            settings.persist(path)?;
            Ok(settings)
        }
    }

    fn persist(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_materializes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pmo.json");
        let settings = Settings::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(settings.durations.work_secs, 25 * 60);
        assert!(settings.sound_enabled);

        let reloaded = Settings::load_or_init(&path).unwrap();
        assert_eq!(reloaded.durations, settings.durations);
    }

    #[test]
    fn unreadable_contents_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pmo.json");
        fs::write(&path, "{not json").unwrap();
        let settings = Settings::load_or_init(&path).unwrap();
        assert_eq!(settings.durations, CycleDurations::default());
    }
}
