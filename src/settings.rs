//! Game settings and preferences
//!
//! Stored in the `settings` section of the save document. A small, fixed
//! set of fields can be overridden from `POWDER_*` environment variables.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::persistence::PersistentStore;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }
}

impl FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(QualityPreset::Low),
            "medium" | "med" => Ok(QualityPreset::Medium),
            "high" => Ok(QualityPreset::High),
            _ => Err(format!("unknown quality preset '{s}'")),
        }
    }
}

/// Developer toggles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugFlags {
    /// Draw collision boxes
    pub show_hitboxes: bool,
    /// Obstacle hits are ignored
    pub invincible: bool,
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    pub fullscreen: bool,

    // === Visual Effects ===
    /// Screen shake on crashes
    pub screen_shake: bool,

    // === HUD ===
    /// Show FPS counter
    pub show_fps: bool,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f64,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f64,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f64,

    // === Accessibility ===
    /// Reduced motion (minimize shake, flashes)
    pub reduced_motion: bool,

    pub debug: DebugFlags,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            fullscreen: false,

            screen_shake: true,

            show_fps: false,

            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,

            reduced_motion: false,

            debug: DebugFlags::default(),
        }
    }
}

impl Settings {
    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Sound effect gain after the master fader
    pub fn effective_sfx_volume(&self) -> f64 {
        (self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
    }

    /// Document section key
    const SECTION: &'static str = "settings";

    /// Read settings from the save document
    pub fn load(store: &PersistentStore) -> Self {
        store.section(Self::SECTION)
    }

    /// Write settings into the save document (not to disk)
    pub fn store(&self, store: &mut PersistentStore) {
        store.set_section(Self::SECTION, self);
    }
}

/// Prefix for override variables
pub const ENV_PREFIX: &str = "POWDER_";

/// A setting forced from the environment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingOverride {
    MasterVolume(f64),
    MusicVolume(f64),
    SfxVolume(f64),
    Fullscreen(bool),
    ShowFps(bool),
    ShowHitboxes(bool),
    Invincible(bool),
}

impl SettingOverride {
    /// Parse one variable. `None` if the name is not an override;
    /// `Some(Err)` if the value does not parse.
    pub fn parse(name: &str, raw: &str) -> Option<Result<Self, String>> {
        let key = name.strip_prefix(ENV_PREFIX)?;
        let parsed = match key {
            "MASTER_VOLUME" => parse_volume(raw).map(SettingOverride::MasterVolume),
            "MUSIC_VOLUME" => parse_volume(raw).map(SettingOverride::MusicVolume),
            "SFX_VOLUME" => parse_volume(raw).map(SettingOverride::SfxVolume),
            "FULLSCREEN" => parse_flag(raw).map(SettingOverride::Fullscreen),
            "SHOW_FPS" => parse_flag(raw).map(SettingOverride::ShowFps),
            "SHOW_HITBOXES" => parse_flag(raw).map(SettingOverride::ShowHitboxes),
            "INVINCIBLE" => parse_flag(raw).map(SettingOverride::Invincible),
            _ => return None,
        };
        Some(parsed.map_err(|e| format!("{name}: {e}")))
    }

    /// Dotted document path this override writes
    pub fn path(&self) -> &'static str {
        match self {
            SettingOverride::MasterVolume(_) => "settings.master_volume",
            SettingOverride::MusicVolume(_) => "settings.music_volume",
            SettingOverride::SfxVolume(_) => "settings.sfx_volume",
            SettingOverride::Fullscreen(_) => "settings.fullscreen",
            SettingOverride::ShowFps(_) => "settings.show_fps",
            SettingOverride::ShowHitboxes(_) => "settings.debug.show_hitboxes",
            SettingOverride::Invincible(_) => "settings.debug.invincible",
        }
    }

    pub fn value(&self) -> Value {
        match *self {
            SettingOverride::MasterVolume(v)
            | SettingOverride::MusicVolume(v)
            | SettingOverride::SfxVolume(v) => Value::from(v),
            SettingOverride::Fullscreen(b)
            | SettingOverride::ShowFps(b)
            | SettingOverride::ShowHitboxes(b)
            | SettingOverride::Invincible(b) => Value::Bool(b),
        }
    }
}

fn parse_volume(raw: &str) -> Result<f64, String> {
    let v: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !v.is_finite() {
        return Err(format!("'{raw}' is not a finite number"));
    }
    Ok(v.clamp(0.0, 1.0))
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("'{raw}' is not a boolean")),
    }
}

/// Collect overrides from `(name, value)` pairs, skipping malformed ones
pub fn overrides_from_vars<I, K, V>(vars: I) -> Vec<SettingOverride>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    vars.into_iter()
        .filter_map(|(name, raw)| match SettingOverride::parse(name.as_ref(), raw.as_ref())? {
            Ok(o) => Some(o),
            Err(err) => {
                log::warn!("Ignoring environment override {}", err);
                None
            }
        })
        .collect()
}

/// Overrides present in the process environment
pub fn overrides_from_env() -> Vec<SettingOverride> {
    overrides_from_vars(std::env::vars())
}

/// Write overrides into the document through its dotted-path setter
pub fn apply_overrides(store: &mut PersistentStore, overrides: &[SettingOverride]) {
    for o in overrides {
        log::info!("Override {} = {}", o.path(), o.value());
        store.set(o.path(), o.value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_preset_from_str() {
        assert_eq!("med".parse::<QualityPreset>(), Ok(QualityPreset::Medium));
        assert_eq!("HIGH".parse::<QualityPreset>(), Ok(QualityPreset::High));
        assert!("ultra".parse::<QualityPreset>().is_err());
    }

    #[test]
    fn test_effective_values() {
        let mut settings = Settings::default();
        assert!(settings.effective_screen_shake());
        settings.reduced_motion = true;
        assert!(!settings.effective_screen_shake());
        settings.master_volume = 0.5;
        settings.sfx_volume = 0.5;
        assert!((settings.effective_sfx_volume() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_parse_overrides() {
        assert_eq!(
            SettingOverride::parse("POWDER_MASTER_VOLUME", "0.5"),
            Some(Ok(SettingOverride::MasterVolume(0.5)))
        );
        assert_eq!(
            SettingOverride::parse("POWDER_SFX_VOLUME", "3"),
            Some(Ok(SettingOverride::SfxVolume(1.0)))
        );
        assert_eq!(
            SettingOverride::parse("POWDER_INVINCIBLE", "on"),
            Some(Ok(SettingOverride::Invincible(true)))
        );
        assert_eq!(SettingOverride::parse("HOME", "/root"), None);
        assert_eq!(SettingOverride::parse("POWDER_UNKNOWN", "1"), None);
        assert!(matches!(
            SettingOverride::parse("POWDER_FULLSCREEN", "maybe"),
            Some(Err(_))
        ));
    }

    #[test]
    fn test_overrides_from_vars_skips_malformed() {
        let vars = [
            ("POWDER_SHOW_FPS", "1"),
            ("POWDER_MUSIC_VOLUME", "loud"),
            ("PATH", "/usr/bin"),
            ("POWDER_SHOW_HITBOXES", "false"),
        ];
        assert_eq!(
            overrides_from_vars(vars),
            vec![
                SettingOverride::ShowFps(true),
                SettingOverride::ShowHitboxes(false)
            ]
        );
    }

    #[test]
    fn test_apply_overrides_reaches_typed_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersistentStore::new(dir.path().join("save.json"));
        store.load();
        apply_overrides(
            &mut store,
            &[
                SettingOverride::MasterVolume(0.25),
                SettingOverride::Invincible(true),
            ],
        );
        let settings = Settings::load(&store);
        assert_eq!(settings.master_volume, 0.25);
        assert!(settings.debug.invincible);
        assert!(store.has_unsaved_changes());
    }

    #[test]
    fn test_volumes_stay_readable_in_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersistentStore::new(dir.path().join("save.json"));
        store.load();
        Settings::default().store(&mut store);
        assert_eq!(store.get("settings.master_volume"), Some(&serde_json::json!(0.8)));
        assert_eq!(store.get("settings.music_volume"), Some(&serde_json::json!(0.7)));

        store.set("settings.sfx_volume", 0.35);
        Settings::load(&store).store(&mut store);
        assert_eq!(store.get("settings.sfx_volume"), Some(&serde_json::json!(0.35)));
        assert!(store.save());
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"master_volume\": 0.8,"), "{text}");
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersistentStore::new(dir.path().join("save.json"));
        let mut settings = Settings::default();
        settings.quality = QualityPreset::High;
        settings.store(&mut store);
        assert_eq!(Settings::load(&store), settings);
        assert_eq!(store.get_as::<String>("settings.quality").as_deref(), Some("high"));
    }
}
