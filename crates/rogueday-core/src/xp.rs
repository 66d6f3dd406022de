//! XP calculation and the optional failure penalty.
//!
//! `compute_xp` is used both for previews and for the award recorded on
//! completion, so the two can never disagree.

use serde::{Deserialize, Serialize};

use crate::tier::{TierLevel, TierSpec};

/// XP earned by completing a task of `spec` lasting `duration_minutes`.
///
/// `base_xp * (duration / duration.min) * multiplier`, rounded half away
/// from zero. The multiplier is below 1 only for optional-timer tiers run
/// without a timer.
pub fn compute_xp(spec: &TierSpec, duration_minutes: u32, use_timer: bool) -> u32 {
    let duration_factor = f64::from(duration_minutes) / f64::from(spec.duration.min);
    let multiplier = spec.timer.xp_multiplier(use_timer);
    (f64::from(spec.base_xp) * duration_factor * multiplier).round() as u32
}

/// XP lost from the run when a task of a penalized tier fails.
///
/// Disabled by default (`fail_penalty_percent = 0`), in which case extraction
/// settles exactly the run's daily XP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyPolicy {
    #[serde(default)]
    pub fail_penalty_percent: u32,
    #[serde(default = "default_penalized_tiers")]
    pub penalized_tiers: Vec<TierLevel>,
}

fn default_penalized_tiers() -> Vec<TierLevel> {
    vec![TierLevel::Three]
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self {
            fail_penalty_percent: 0,
            penalized_tiers: default_penalized_tiers(),
        }
    }
}

impl PenaltyPolicy {
    pub fn is_enabled(&self) -> bool {
        self.fail_penalty_percent > 0
    }

    /// Penalty for failing a task of `tier` when the run holds `daily_xp`.
    ///
    /// Never exceeds `daily_xp`.
    pub fn failure_penalty(&self, tier: TierLevel, daily_xp: u32) -> u32 {
        if !self.is_enabled() || !self.penalized_tiers.contains(&tier) {
            return 0;
        }
        let percent = u64::from(self.fail_penalty_percent.min(100));
        (u64::from(daily_xp) * percent / 100) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::{DurationRange, TimerMode};
    use proptest::prelude::*;

    fn tier_one() -> TierSpec {
        TierSpec {
            level: TierLevel::One,
            name: "Quick".into(),
            duration: DurationRange { min: 5, max: 15 },
            base_xp: 10,
            energy_cost: 0,
            unlock_requirement_minutes: 0,
            timer: TimerMode::None,
        }
    }

    fn tier_two() -> TierSpec {
        TierSpec {
            level: TierLevel::Two,
            name: "Focus".into(),
            duration: DurationRange { min: 15, max: 30 },
            base_xp: 20,
            energy_cost: 2,
            unlock_requirement_minutes: 0,
            timer: TimerMode::Optional {
                no_timer_multiplier: 0.8,
            },
        }
    }

    #[test]
    fn tier_one_scales_with_duration() {
        assert_eq!(compute_xp(&tier_one(), 10, false), 20);
        assert_eq!(compute_xp(&tier_one(), 5, false), 10);
    }

    #[test]
    fn optional_timer_without_timer_is_discounted() {
        assert_eq!(compute_xp(&tier_two(), 15, false), 16);
        assert_eq!(compute_xp(&tier_two(), 15, true), 20);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        let mut spec = tier_one();
        spec.base_xp = 3;
        spec.duration.min = 2;
        // 3 * 3/2 = 4.5
        assert_eq!(compute_xp(&spec, 3, false), 5);
    }

    #[test]
    fn default_catalog_values() {
        let catalog = crate::tier::TierCatalog::default();
        assert_eq!(compute_xp(catalog.get(TierLevel::One), 2, false), 15);
        assert_eq!(compute_xp(catalog.get(TierLevel::Two), 20, false), 104);
        assert_eq!(compute_xp(catalog.get(TierLevel::Three), 50, true), 350);
    }

    #[test]
    fn penalty_disabled_by_default() {
        let policy = PenaltyPolicy::default();
        assert_eq!(policy.failure_penalty(TierLevel::Three, 500), 0);
    }

    #[test]
    fn penalty_applies_to_penalized_tiers_only() {
        let policy = PenaltyPolicy {
            fail_penalty_percent: 10,
            penalized_tiers: vec![TierLevel::Three],
        };
        assert_eq!(policy.failure_penalty(TierLevel::Three, 255), 25);
        assert_eq!(policy.failure_penalty(TierLevel::Two, 255), 0);
    }

    #[test]
    fn penalty_never_exceeds_daily_xp() {
        let policy = PenaltyPolicy {
            fail_penalty_percent: 250,
            penalized_tiers: vec![TierLevel::Three],
        };
        assert_eq!(policy.failure_penalty(TierLevel::Three, 40), 40);
    }

    proptest! {
        #[test]
        fn compute_xp_is_deterministic(duration in 15u32..=30, use_timer in any::<bool>()) {
            let spec = tier_two();
            prop_assert_eq!(compute_xp(&spec, duration, use_timer), compute_xp(&spec, duration, use_timer));
        }

        #[test]
        fn timer_never_pays_less(duration in 15u32..=30) {
            let spec = tier_two();
            prop_assert!(compute_xp(&spec, duration, true) >= compute_xp(&spec, duration, false));
        }
    }
}
