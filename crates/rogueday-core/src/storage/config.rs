//! TOML-based engine configuration.
//!
//! Holds the local user id, the energy budget, the failure penalty policy
//! and per-tier overrides of the built-in catalog.
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::tier::{DurationRange, TierCatalog, TierLevel, TierSpec, TimerMode};
use crate::xp::PenaltyPolicy;

/// Energy budget settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Energy every new run starts with
    #[serde(default = "default_max_energy")]
    pub max_energy: u32,
}

/// Partial replacement of one built-in tier. Unset fields keep the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierOverride {
    pub name: Option<String>,
    pub duration_min: Option<u32>,
    pub duration_max: Option<u32>,
    pub base_xp: Option<u32>,
    pub energy_cost: Option<u32>,
    pub unlock_requirement_minutes: Option<u32>,
    pub timer: Option<TimerMode>,
}

impl TierOverride {
    fn apply(&self, mut spec: TierSpec) -> TierSpec {
        if let Some(name) = &self.name {
            spec.name = name.clone();
        }
        spec.duration = DurationRange {
            min: self.duration_min.unwrap_or(spec.duration.min),
            max: self.duration_max.unwrap_or(spec.duration.max),
        };
        spec.base_xp = self.base_xp.unwrap_or(spec.base_xp);
        spec.energy_cost = self.energy_cost.unwrap_or(spec.energy_cost);
        spec.unlock_requirement_minutes = self
            .unlock_requirement_minutes
            .unwrap_or(spec.unlock_requirement_minutes);
        if let Some(timer) = self.timer {
            spec.timer = timer;
        }
        spec
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierOverrides {
    #[serde(default)]
    pub t1: TierOverride,
    #[serde(default)]
    pub t2: TierOverride,
    #[serde(default)]
    pub t3: TierOverride,
}

impl TierOverrides {
    fn get(&self, level: TierLevel) -> &TierOverride {
        match level {
            TierLevel::One => &self.t1,
            TierLevel::Two => &self.t2,
            TierLevel::Three => &self.t3,
        }
    }
}

/// Engine configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub penalty: PenaltyPolicy,
    #[serde(default)]
    pub tiers: TierOverrides,
}

fn default_user_id() -> String {
    "local".to_string()
}

fn default_max_energy() -> u32 {
    50
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            max_energy: default_max_energy(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            economy: EconomyConfig::default(),
            penalty: PenaltyPolicy::default(),
            tiers: TierOverrides::default(),
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
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Unset override: accept JSON, fall back to a plain string
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Path of the config file in the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Like [`Config::load`] with an explicit file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
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

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field. The config is left unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "user_id".into(),
                message: "must not be empty".into(),
            });
        }
        if self.economy.max_energy == 0 {
            return Err(ConfigError::InvalidValue {
                key: "economy.max_energy".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.penalty.fail_penalty_percent > 100 {
            return Err(ConfigError::InvalidValue {
                key: "penalty.fail_penalty_percent".into(),
                message: format!("{} is not in 0..=100", self.penalty.fail_penalty_percent),
            });
        }
        self.tier_catalog().map(|_| ())
    }

    /// Built-in catalog with this config's overrides applied.
    pub fn tier_catalog(&self) -> Result<TierCatalog, ConfigError> {
        TierCatalog::new(
            TierLevel::ALL.map(|level| self.tiers.get(level).apply(TierCatalog::default_tier(level))),
        )
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default config");
            Self::default()
        })
    }
}
