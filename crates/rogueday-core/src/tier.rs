//! Tier catalog.
//!
//! Three difficulty tiers, each defining the allowed task duration, the XP
//! yield, the energy price, the lifetime focus minutes needed to unlock it,
//! and how the tier treats timers. The catalog is immutable once built and
//! safe to share across threads.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfigError, EconomyError};

/// Difficulty class of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TierLevel {
    One,
    Two,
    Three,
}

impl TierLevel {
    pub const ALL: [TierLevel; 3] = [TierLevel::One, TierLevel::Two, TierLevel::Three];

    pub fn as_u8(self) -> u8 {
        match self {
            TierLevel::One => 1,
            TierLevel::Two => 2,
            TierLevel::Three => 3,
        }
    }

    fn index(self) -> usize {
        self.as_u8() as usize - 1
    }
}

impl TryFrom<u8> for TierLevel {
    type Error = EconomyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TierLevel::One),
            2 => Ok(TierLevel::Two),
            3 => Ok(TierLevel::Three),
            other => Err(EconomyError::UnknownTier(other)),
        }
    }
}

impl From<TierLevel> for u8 {
    fn from(level: TierLevel) -> Self {
        level.as_u8()
    }
}

impl fmt::Display for TierLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// How a tier treats the focus timer.
///
/// The no-timer multiplier only exists for `Optional`: `None` tiers never
/// run a timer and `Required` tiers always do, so both pay full XP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerMode {
    None,
    Optional { no_timer_multiplier: f64 },
    Required,
}

impl TimerMode {
    /// Whether `use_timer` is a legal choice for a task of this mode.
    pub fn allows(&self, use_timer: bool) -> bool {
        match self {
            TimerMode::None => !use_timer,
            TimerMode::Optional { .. } => true,
            TimerMode::Required => use_timer,
        }
    }

    /// XP multiplier for a task that did or did not run a timer.
    pub fn xp_multiplier(&self, use_timer: bool) -> f64 {
        match self {
            TimerMode::Optional {
                no_timer_multiplier,
            } if !use_timer => *no_timer_multiplier,
            _ => 1.0,
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerMode::None => write!(f, "none"),
            TimerMode::Optional { .. } => write!(f, "optional"),
            TimerMode::Required => write!(f, "required"),
        }
    }
}

/// Inclusive duration bounds in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    pub min: u32,
    pub max: u32,
}

impl DurationRange {
    pub fn contains(&self, minutes: u32) -> bool {
        (self.min..=self.max).contains(&minutes)
    }
}

/// Configuration of a single tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub level: TierLevel,
    pub name: String,
    pub duration: DurationRange,
    pub base_xp: u32,
    pub energy_cost: u32,
    pub unlock_requirement_minutes: u32,
    pub timer: TimerMode,
}

impl TierSpec {
    /// Check `duration` against this tier's range.
    pub fn check_duration(&self, duration: u32) -> Result<(), EconomyError> {
        if self.duration.contains(duration) {
            Ok(())
        } else {
            Err(EconomyError::InvalidDuration {
                tier: self.level,
                duration,
                min: self.duration.min,
                max: self.duration.max,
            })
        }
    }

    /// Check a timer choice against this tier's timer mode.
    pub fn check_timer(&self, use_timer: bool) -> Result<(), EconomyError> {
        if self.timer.allows(use_timer) {
            Ok(())
        } else {
            Err(EconomyError::TimerModeMismatch {
                tier: self.level,
                mode: self.timer,
                use_timer,
            })
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let key = format!("tiers.t{}", self.level);
        if self.duration.min == 0 {
            return Err(ConfigError::InvalidValue {
                key,
                message: "duration.min must be at least 1 minute".into(),
            });
        }
        if self.duration.min > self.duration.max {
            return Err(ConfigError::InvalidValue {
                key,
                message: format!(
                    "duration.min ({}) exceeds duration.max ({})",
                    self.duration.min, self.duration.max
                ),
            });
        }
        if let TimerMode::Optional {
            no_timer_multiplier,
        } = self.timer
        {
            if !(0.0..=1.0).contains(&no_timer_multiplier) {
                return Err(ConfigError::InvalidValue {
                    key,
                    message: format!("no_timer_multiplier {no_timer_multiplier} is not in 0.0..=1.0"),
                });
            }
        }
        Ok(())
    }
}

/// Read-only table of the three tiers, keyed by level.
///
/// Deserializing goes through [`TierCatalog::new`], so a catalog read from
/// disk is validated the same way as one built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCatalog")]
pub struct TierCatalog {
    tiers: [TierSpec; 3],
}

#[derive(Deserialize)]
struct RawCatalog {
    tiers: [TierSpec; 3],
}

impl TryFrom<RawCatalog> for TierCatalog {
    type Error = ConfigError;

    fn try_from(raw: RawCatalog) -> Result<Self, Self::Error> {
        Self::new(raw.tiers)
    }
}

impl TierCatalog {
    /// Build a catalog, validating each tier.
    ///
    /// # Errors
    /// Returns an error if a tier is listed out of order or has an invalid
    /// duration range or multiplier.
    pub fn new(tiers: [TierSpec; 3]) -> Result<Self, ConfigError> {
        for (spec, expected) in tiers.iter().zip(TierLevel::ALL) {
            if spec.level != expected {
                return Err(ConfigError::InvalidValue {
                    key: format!("tiers.t{expected}"),
                    message: format!("expected tier {expected}, found tier {}", spec.level),
                });
            }
            spec.validate()?;
        }
        Ok(Self { tiers })
    }

    pub fn get(&self, level: TierLevel) -> &TierSpec {
        &self.tiers[level.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TierSpec> {
        self.tiers.iter()
    }

    pub fn default_tier(level: TierLevel) -> TierSpec {
        match level {
            TierLevel::One => TierSpec {
                level,
                name: "Quick".into(),
                duration: DurationRange { min: 2, max: 15 },
                base_xp: 15,
                energy_cost: 0,
                unlock_requirement_minutes: 0,
                timer: TimerMode::None,
            },
            TierLevel::Two => TierSpec {
                level,
                name: "Focus".into(),
                duration: DurationRange { min: 10, max: 60 },
                base_xp: 65,
                energy_cost: 5,
                unlock_requirement_minutes: 60,
                timer: TimerMode::Optional {
                    no_timer_multiplier: 0.8,
                },
            },
            TierLevel::Three => TierSpec {
                level,
                name: "Deep".into(),
                duration: DurationRange { min: 25, max: 120 },
                base_xp: 175,
                energy_cost: 15,
                unlock_requirement_minutes: 300,
                timer: TimerMode::Required,
            },
        }
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self {
            tiers: TierLevel::ALL.map(TierCatalog::default_tier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialized_catalog_is_validated() {
        let mut value = serde_json::to_value(TierCatalog::default()).unwrap();
        let roundtrip: TierCatalog = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(roundtrip, TierCatalog::default());

        value["tiers"][0]["duration"]["min"] = serde_json::json!(0);
        let err = serde_json::from_value::<TierCatalog>(value).unwrap_err();
        assert!(err.to_string().contains("duration.min"));
    }

    #[test]
    fn tier_level_parses_only_known_levels() {
        assert_eq!(TierLevel::try_from(2).unwrap(), TierLevel::Two);
        assert_eq!(TierLevel::try_from(0), Err(EconomyError::UnknownTier(0)));
        assert_eq!(TierLevel::try_from(4), Err(EconomyError::UnknownTier(4)));
    }

    #[test]
    fn tier_level_serializes_as_number() {
        assert_eq!(serde_json::to_string(&TierLevel::Three).unwrap(), "3");
        let level: TierLevel = serde_json::from_str("1").unwrap();
        assert_eq!(level, TierLevel::One);
        assert!(serde_json::from_str::<TierLevel>("7").is_err());
    }

    #[test]
    fn default_catalog_is_valid_and_ordered() {
        let catalog = TierCatalog::default();
        let rebuilt = TierCatalog::new(TierLevel::ALL.map(TierCatalog::default_tier)).unwrap();
        assert_eq!(catalog, rebuilt);
        let levels: Vec<_> = catalog.iter().map(|t| t.level).collect();
        assert_eq!(levels, TierLevel::ALL.to_vec());
    }

    #[test]
    fn timer_mode_gates_timer_choice() {
        assert!(TimerMode::None.allows(false));
        assert!(!TimerMode::None.allows(true));
        assert!(TimerMode::Required.allows(true));
        assert!(!TimerMode::Required.allows(false));
        let optional = TimerMode::Optional {
            no_timer_multiplier: 0.8,
        };
        assert!(optional.allows(true) && optional.allows(false));
    }

    #[test]
    fn multiplier_only_applies_to_optional_without_timer() {
        let optional = TimerMode::Optional {
            no_timer_multiplier: 0.8,
        };
        assert_eq!(optional.xp_multiplier(false), 0.8);
        assert_eq!(optional.xp_multiplier(true), 1.0);
        assert_eq!(TimerMode::None.xp_multiplier(false), 1.0);
        assert_eq!(TimerMode::Required.xp_multiplier(true), 1.0);
    }

    #[test]
    fn check_duration_is_inclusive() {
        let spec = TierCatalog::default_tier(TierLevel::Two);
        assert!(spec.check_duration(10).is_ok());
        assert!(spec.check_duration(60).is_ok());
        assert!(matches!(
            spec.check_duration(61),
            Err(EconomyError::InvalidDuration { min: 10, max: 60, .. })
        ));
        assert!(spec.check_duration(9).is_err());
    }

    #[test]
    fn catalog_rejects_inverted_range() {
        let mut tiers = TierLevel::ALL.map(TierCatalog::default_tier);
        tiers[1].duration = DurationRange { min: 30, max: 20 };
        assert!(matches!(
            TierCatalog::new(tiers),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn catalog_rejects_misplaced_tier() {
        let mut tiers = TierLevel::ALL.map(TierCatalog::default_tier);
        tiers[0].level = TierLevel::Two;
        assert!(TierCatalog::new(tiers).is_err());
    }

    #[test]
    fn timer_mode_toml_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            timer: TimerMode,
        }
        let w: Wrapper =
            toml::from_str("timer = { kind = \"optional\", no_timer_multiplier = 0.5 }").unwrap();
        assert_eq!(
            w.timer,
            TimerMode::Optional {
                no_timer_multiplier: 0.5
            }
        );
    }
}
