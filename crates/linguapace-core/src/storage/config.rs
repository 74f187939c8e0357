//! TOML-based application configuration.
//!
//! Stores the learner's defaults for:
//! - Timed practice sessions (duration, difficulty, feedback timing)
//! - The focus/break cycle (phase lengths, long-break cadence, auto-start)
//!
//! Configuration is stored at `~/.config/linguapace/config.toml`. The engines
//! never touch this file; hosts load it and hand the resulting settings to an
//! engine when a session starts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, ValidationError};
use crate::practice::{Difficulty, FeedbackTiming, SessionSettings};
use crate::timer::IntervalSettings;

/// Practice-session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeConfig {
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u64,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub feedback_timing: FeedbackTiming,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default = "default_true")]
    pub show_explanations: bool,
}

/// Focus/break cycle defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    #[serde(default = "default_focus_duration")]
    pub focus_duration: u32,
    #[serde(default = "default_short_break")]
    pub short_break: u32,
    #[serde(default = "default_long_break")]
    pub long_break: u32,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_focus: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/linguapace/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub practice: PracticeConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
}

fn default_duration_seconds() -> u64 {
    300
}
fn default_focus_duration() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_sessions_until_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            duration_seconds: default_duration_seconds(),
            difficulty: Difficulty::default(),
            feedback_timing: FeedbackTiming::default(),
            shuffle: false,
            show_explanations: true,
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            focus_duration: default_focus_duration(),
            short_break: default_short_break(),
            long_break: default_long_break(),
            sessions_until_long_break: default_sessions_until_long_break(),
            auto_start_breaks: false,
            auto_start_focus: false,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot replace a whole section".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/linguapace"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. The result must still
    /// deserialize, so enum fields only accept their known spellings.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    pub fn session_settings(&self) -> Result<SessionSettings, ValidationError> {
        let settings = SessionSettings {
            duration_seconds: self.practice.duration_seconds,
            difficulty: self.practice.difficulty,
            feedback_timing: self.practice.feedback_timing,
            shuffle: self.practice.shuffle,
            show_explanations: self.practice.show_explanations,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn interval_settings(&self) -> Result<IntervalSettings, ValidationError> {
        let settings = IntervalSettings {
            focus_duration_min: self.cycle.focus_duration,
            short_break_duration_min: self.cycle.short_break,
            long_break_duration_min: self.cycle.long_break,
            sessions_until_long_break: self.cycle.sessions_until_long_break,
            auto_start_breaks: self.cycle.auto_start_breaks,
            auto_start_focus: self.cycle.auto_start_focus,
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.practice.duration_seconds, 300);
        assert_eq!(parsed.cycle.sessions_until_long_break, 4);
        assert_eq!(parsed.practice.feedback_timing, FeedbackTiming::Immediate);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[cycle]\nfocus_duration = 50\n").unwrap();
        assert_eq!(parsed.cycle.focus_duration, 50);
        assert_eq!(parsed.cycle.short_break, 5);
        assert!(parsed.practice.show_explanations);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("cycle.focus_duration").as_deref(), Some("25"));
        assert_eq!(cfg.get("practice.feedback_timing").as_deref(), Some("immediate"));
        assert!(cfg.get("cycle.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("cycle.auto_start_breaks", "true").unwrap();
        cfg.apply("practice.duration_seconds", "90").unwrap();
        cfg.apply("practice.feedback_timing", "delayed").unwrap();
        assert!(cfg.cycle.auto_start_breaks);
        assert_eq!(cfg.practice.duration_seconds, 90);
        assert_eq!(cfg.practice.feedback_timing, FeedbackTiming::Delayed);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.apply("cycle.nonexistent", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn apply_rejects_invalid_type_and_enum_spelling() {
        let mut cfg = Config::default();
        assert!(cfg.apply("cycle.auto_start_focus", "yes").is_err());
        assert!(cfg.apply("practice.difficulty", "impossible").is_err());
        assert_eq!(cfg.practice.difficulty, Difficulty::Medium);
    }

    #[test]
    fn settings_are_validated() {
        let mut cfg = Config::default();
        assert!(cfg.interval_settings().is_ok());
        cfg.cycle.sessions_until_long_break = 1;
        assert!(cfg.interval_settings().is_err());
        cfg.practice.duration_seconds = 0;
        assert!(cfg.session_settings().is_err());
    }
}
