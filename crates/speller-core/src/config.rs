//! TOML-based session configuration.
//!
//! Holds everything a speller session needs up front:
//! - The symbol alphabet and the default training string
//! - Group count and repetition counts
//! - Grid layout and stimulus style (consumed by the rendering surface only)
//! - Every duration, in milliseconds
//!
//! Missing keys fall back to their defaults, so a partial file is merged over
//! the defaults on load. Configuration is stored at
//! `~/.config/p300-speller/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alphabet::Alphabet;
use crate::error::ConfigError;
use crate::sampler::JitterRange;

/// Rounds per block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepetitionsConfig {
    /// Rounds in a training block.
    #[serde(default = "default_train_repetitions")]
    pub train: u32,
    /// Rounds in a test block. 0 means flash until a prediction arrives.
    #[serde(default = "default_test_repetitions")]
    pub test: u32,
}

/// Grid layout. Only the rendering surface reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_columns")]
    pub columns: usize,
    /// Aspect ratio such as `16:9`; empty means fill the available space.
    #[serde(default)]
    pub ratio: String,
    #[serde(default = "default_true")]
    pub borders: bool,
}

/// Stimulus style flags. Only the rendering surface reads these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusStyle {
    /// Replace flashed symbols with a face icon.
    #[serde(default)]
    pub face: bool,
    /// Enlarge flashed symbols.
    #[serde(default = "default_true")]
    pub magnify: bool,
}

/// Durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationsConfig {
    /// 0 skips the eyes-open baseline.
    #[serde(default = "default_baseline")]
    pub baseline_eyes_open: u64,
    /// 0 skips the eyes-closed baseline.
    #[serde(default = "default_baseline")]
    pub baseline_eyes_closed: u64,
    #[serde(default = "default_focus")]
    pub focus: u64,
    #[serde(default = "default_inter_block")]
    pub inter_block: u64,
    /// Interval at which a finished test block checks for a prediction.
    #[serde(default = "default_poll")]
    pub poll: u64,
    #[serde(default = "default_flash")]
    pub flash: JitterRange,
    #[serde(default = "default_inter_flash")]
    pub inter_flash: JitterRange,
}

impl DurationsConfig {
    pub fn baseline_eyes_open(&self) -> Duration {
        Duration::from_millis(self.baseline_eyes_open)
    }

    pub fn baseline_eyes_closed(&self) -> Duration {
        Duration::from_millis(self.baseline_eyes_closed)
    }

    pub fn focus(&self) -> Duration {
        Duration::from_millis(self.focus)
    }

    pub fn inter_block(&self) -> Duration {
        Duration::from_millis(self.inter_block)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll)
    }
}

/// Speller configuration.
///
/// Serialized to/from TOML at `~/.config/p300-speller/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_symbols")]
    pub symbols: String,
    /// Training string, upper-cased before use.
    #[serde(default = "default_targets")]
    pub targets: String,
    /// Number of flash groups. 0 means round(sqrt(symbol count)).
    #[serde(default)]
    pub groups: usize,
    /// Seed for the flash randomization. Unset means seeded from entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub repetitions: RepetitionsConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub stim: StimulusStyle,
    #[serde(default)]
    pub durations: DurationsConfig,
}

// Default functions
fn default_symbols() -> String {
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890".into()
}
fn default_targets() -> String {
    "TIMEFLUX".into()
}
fn default_train_repetitions() -> u32 {
    8
}
fn default_test_repetitions() -> u32 {
    6
}
fn default_columns() -> usize {
    6
}
fn default_true() -> bool {
    true
}
fn default_baseline() -> u64 {
    30_000
}
fn default_focus() -> u64 {
    750
}
fn default_inter_block() -> u64 {
    2_000
}
fn default_poll() -> u64 {
    50
}
fn default_flash() -> JitterRange {
    JitterRange::new(80.0, 60.0, 160.0)
}
fn default_inter_flash() -> JitterRange {
    JitterRange::new(120.0, 80.0, 300.0)
}

impl Default for RepetitionsConfig {
    fn default() -> Self {
        Self {
            train: default_train_repetitions(),
            test: default_test_repetitions(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            ratio: String::new(),
            borders: true,
        }
    }
}

impl Default for StimulusStyle {
    fn default() -> Self {
        Self {
            face: false,
            magnify: true,
        }
    }
}

impl Default for DurationsConfig {
    fn default() -> Self {
        Self {
            baseline_eyes_open: default_baseline(),
            baseline_eyes_closed: default_baseline(),
            focus: default_focus(),
            inter_block: default_inter_block(),
            poll: default_poll(),
            flash: default_flash(),
            inter_flash: default_inter_flash(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            targets: default_targets(),
            groups: 0,
            seed: None,
            repetitions: RepetitionsConfig::default(),
            grid: GridConfig::default(),
            stim: StimulusStyle::default(),
            durations: DurationsConfig::default(),
        }
    }
}

/// Returns `~/.config/p300-speller[-dev]/` based on SPELLER_ENV.
///
/// Set SPELLER_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SPELLER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("p300-speller-dev")
    } else {
        base_dir.join("p300-speller")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
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
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                // `seed` is the only optional key; it is absent when unset.
                let existing = match obj.get(part) {
                    Some(existing) => existing.clone(),
                    None if key == "seed" => serde_json::Value::Null,
                    None => return Err(unknown()),
                };

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) | serde_json::Value::Null => {
                        parse_number(value).ok_or_else(|| {
                            ConfigError::invalid(key, format!("cannot parse '{value}' as number"))
                        })?
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value)
                            .map_err(|e| ConfigError::invalid(key, e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing the defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from an explicit path. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Set a config value by dot-separated key, then re-validate.
    ///
    /// The value is only applied if the resulting configuration is valid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)
            .map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Number of groups after resolving the automatic setting.
    pub fn resolved_groups(&self) -> usize {
        if self.groups == 0 {
            let n = self.symbols.chars().count() as f64;
            (n.sqrt().round() as usize).max(1)
        } else {
            self.groups
        }
    }

    /// Check every value a session depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let alphabet = Alphabet::new(&self.symbols)?;
        if let Err(e) = alphabet.indices(&self.targets.to_uppercase()) {
            return Err(ConfigError::invalid("targets", e.to_string()));
        }
        if self.grid.columns == 0 {
            return Err(ConfigError::invalid("grid.columns", "must be at least 1"));
        }
        if !self.grid.ratio.is_empty() && parse_ratio(&self.grid.ratio).is_none() {
            return Err(ConfigError::invalid(
                "grid.ratio",
                format!("expected 'W:H', got '{}'", self.grid.ratio),
            ));
        }
        if self.durations.poll == 0 {
            return Err(ConfigError::invalid("durations.poll", "must be at least 1 ms"));
        }
        self.durations.flash.validate("durations.flash")?;
        self.durations.inter_flash.validate("durations.inter_flash")?;
        Ok(())
    }

    /// Validate and freeze into the snapshot a session runs with.
    pub fn resolve(&self) -> Result<SessionOptions, ConfigError> {
        self.validate()?;
        let alphabet = Alphabet::new(&self.symbols)?;
        let mut config = self.clone();
        config.groups = self.resolved_groups();
        Ok(SessionOptions { config, alphabet })
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<u64>() {
        Some(serde_json::Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
    }
}

/// Parse an aspect ratio such as `16:9`.
pub fn parse_ratio(ratio: &str) -> Option<(f64, f64)> {
    let (w, h) = ratio.split_once(':')?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    (w > 0.0 && h > 0.0).then_some((w, h))
}

/// Immutable, validated configuration snapshot for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    config: Config,
    alphabet: Alphabet,
}

impl SessionOptions {
    /// The configuration with `groups` resolved.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn groups(&self) -> usize {
        self.config.groups
    }

    pub fn durations(&self) -> &DurationsConfig {
        &self.config.durations
    }

    pub fn repetitions(&self) -> &RepetitionsConfig {
        &self.config.repetitions
    }

    pub fn stim(&self) -> StimulusStyle {
        self.config.stim
    }
}
