//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across
//! threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ObservationStrategy
// ---------------------------------------------------------------------------

/// Which OS key-observation mechanism the dispatcher installs.
///
/// A startup decision, not a runtime branch: the backend is built once from
/// this value before the engine starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationStrategy {
    /// System-wide low-level keyboard filter (`rdev`).  Sees real key-up
    /// transitions and modifier state; requires input-monitoring /
    /// accessibility permission on some platforms.
    Filter,
    /// OS-reserved hotkey accelerator (`global-hotkey`).  No permission
    /// needed, but only key-down is observable — ups are synthesized.
    Accelerator,
}

impl Default for ObservationStrategy {
    fn default() -> Self {
        Self::Filter
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Hotkey observation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Observation strategy installed at startup.
    pub strategy: ObservationStrategy,
    /// Portable name of the key registered as the primary hotkey at
    /// startup, before the host sends any `registerHotkey` of its own.
    pub key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            strategy: ObservationStrategy::default(),
            key: "F2".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// OverlayConfig
// ---------------------------------------------------------------------------

/// Overlay placement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Distance in logical pixels between the pill and the bottom screen
    /// edge.
    pub bottom_margin: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            bottom_margin: 80.0,
        }
    }
}

// ---------------------------------------------------------------------------
// InjectConfig
// ---------------------------------------------------------------------------

/// Text-injection timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectConfig {
    /// Milliseconds to wait after raising the target window / setting the
    /// clipboard, before the paste chord.
    pub settle_ms: u64,
    /// Milliseconds to wait after the paste chord before restoring the
    /// saved clipboard.
    pub restore_ms: u64,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            settle_ms: 80,
            restore_ms: 200,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Top-level application configuration, persisted as `settings.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hotkey observation settings.
    pub hotkey: HotkeyConfig,
    /// Overlay placement settings.
    pub overlay: OverlayConfig,
    /// Text-injection timing settings.
    pub inject: InjectConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.hotkey.strategy, loaded.hotkey.strategy);
        assert_eq!(original.overlay.bottom_margin, loaded.overlay.bottom_margin);
        assert_eq!(original.inject.settle_ms, loaded.inject.settle_ms);
        assert_eq!(original.inject.restore_ms, loaded.inject.restore_ms);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.hotkey.strategy, ObservationStrategy::Filter);
        assert_eq!(config.hotkey.key, "F2");
        assert_eq!(config.overlay.bottom_margin, 80.0);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut config = AppConfig::default();
        config.hotkey.strategy = ObservationStrategy::Accelerator;
        config.overlay.bottom_margin = 120.0;
        config.inject.settle_ms = 150;
        config.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.hotkey.strategy, ObservationStrategy::Accelerator);
        assert_eq!(loaded.overlay.bottom_margin, 120.0);
        assert_eq!(loaded.inject.settle_ms, 150);
    }

    #[test]
    fn strategy_serializes_lowercase() {
        let toml = toml::to_string(&AppConfig::default()).expect("toml");
        assert!(toml.contains("strategy = \"filter\""));
    }
}
