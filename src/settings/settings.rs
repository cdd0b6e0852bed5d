// Settings management and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest poll slice a worker may sleep before re-checking cancellation
const MAX_POLL_INTERVAL_MS: u64 = 100;

/// Serial link to the controller board
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: if cfg!(windows) { "COM6" } else { "/dev/ttyUSB0" }.to_string(),
            baud_rate: 115_200,
            read_timeout_ms: 1000,
        }
    }
}

/// Where songs and their lyric files live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    pub song_dir: PathBuf,
    pub lyric_dir: PathBuf,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            song_dir: PathBuf::from("audio"),
            lyric_dir: PathBuf::from("lyrics"),
        }
    }
}

/// Character display on the board (16x2 LCD)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub max_line_length: usize,
    pub max_display_lines: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            max_line_length: 16,
            max_display_lines: 2,
        }
    }
}

/// Worker timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub poll_interval_ms: u64,
    pub join_timeout_ms: u64,
    pub min_dwell_ms: u64,
    pub word_dwell_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            join_timeout_ms: 1000,
            min_dwell_ms: 500,
            word_dwell_ms: 250,
        }
    }
}

impl TimingSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// How long a chunk of `word_count` words stays on the display
    pub fn dwell(&self, word_count: usize) -> Duration {
        let per_words = self.word_dwell_ms.saturating_mul(word_count as u64);
        Duration::from_millis(per_words.max(self.min_dwell_ms))
    }
}

/// Main bridge settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub version: i32, // Settings schema version for future migrations
    pub serial: SerialSettings,
    pub library: LibrarySettings,
    pub display: DisplaySettings,
    pub timing: TimingSettings,
}

impl BridgeSettings {
    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no settings file found, using defaults");
            return Ok(Self::default().normalized());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read settings file: {}", e))?;

        let settings: BridgeSettings = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse settings: {}", e))?;

        tracing::info!(path = %path.display(), "loaded settings");
        Ok(settings.normalized())
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(path, content)
            .map_err(|e| format!("Failed to write settings file: {}", e))?;

        tracing::info!(path = %path.display(), "saved settings");
        Ok(())
    }

    /// Clamp values the workers cannot honor
    pub fn normalized(mut self) -> Self {
        if self.timing.poll_interval_ms == 0 || self.timing.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            tracing::warn!(
                poll_interval_ms = self.timing.poll_interval_ms,
                "poll interval out of range, clamping"
            );
            self.timing.poll_interval_ms = self.timing.poll_interval_ms.clamp(1, MAX_POLL_INTERVAL_MS);
        }
        if self.display.max_line_length == 0 {
            tracing::warn!("max_line_length must be at least 1");
            self.display.max_line_length = 1;
        }
        if self.display.max_display_lines == 0 {
            tracing::warn!("max_display_lines must be at least 1");
            self.display.max_display_lines = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = BridgeSettings::load(&dir.path().join("bridge.json")).unwrap();
        assert_eq!(settings.serial.baud_rate, 115_200);
        assert_eq!(settings.display.max_line_length, 16);
        assert_eq!(settings.display.max_display_lines, 2);
        assert_eq!(settings.timing.join_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_file_and_clamping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        fs::write(&path, r#"{"timing": {"poll_interval_ms": 500}, "display": {"max_display_lines": 0}}"#)
            .unwrap();

        let settings = BridgeSettings::load(&path).unwrap();
        assert_eq!(settings.timing.poll_interval_ms, 100);
        assert_eq!(settings.timing.min_dwell_ms, 500);
        assert_eq!(settings.display.max_display_lines, 1);
        assert_eq!(settings.display.max_line_length, 16);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("bridge.json");
        let mut settings = BridgeSettings::default();
        settings.serial.port = "/dev/ttyACM1".to_string();
        settings.save(&path).unwrap();

        let loaded = BridgeSettings::load(&path).unwrap();
        assert_eq!(loaded.serial.port, "/dev/ttyACM1");
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        fs::write(&path, "{not json").unwrap();
        assert!(BridgeSettings::load(&path).is_err());
    }

    #[test]
    fn test_dwell() {
        let timing = TimingSettings::default();
        assert_eq!(timing.dwell(0), Duration::from_millis(500));
        assert_eq!(timing.dwell(2), Duration::from_millis(500));
        assert_eq!(timing.dwell(3), Duration::from_millis(750));
        assert_eq!(timing.dwell(8), Duration::from_millis(2000));
    }
}
