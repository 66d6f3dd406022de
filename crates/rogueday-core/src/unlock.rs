//! Tier unlocking from lifetime focus time.

use serde::{Deserialize, Serialize};

use crate::error::EconomyError;
use crate::tier::{TierCatalog, TierLevel, TierSpec};

/// Whether `spec` is available to a user with `lifetime_focus_minutes`.
///
/// Tier 1 is always unlocked, whatever its configured requirement.
pub fn is_tier_unlocked(spec: &TierSpec, lifetime_focus_minutes: u32) -> bool {
    spec.level == TierLevel::One || lifetime_focus_minutes >= spec.unlock_requirement_minutes
}

/// Fail with `TierLocked` unless the tier is unlocked.
pub fn ensure_unlocked(spec: &TierSpec, lifetime_focus_minutes: u32) -> Result<(), EconomyError> {
    if is_tier_unlocked(spec, lifetime_focus_minutes) {
        Ok(())
    } else {
        Err(EconomyError::TierLocked {
            tier: spec.level,
            required_minutes: spec.unlock_requirement_minutes,
            lifetime_minutes: lifetime_focus_minutes,
        })
    }
}

/// Unlock status of one tier, for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierProgress {
    pub tier: TierLevel,
    pub name: String,
    pub unlocked: bool,
    pub required_minutes: u32,
    pub remaining_minutes: u32,
}

/// Unlock status of every tier in catalog order.
pub fn tier_progress(catalog: &TierCatalog, lifetime_focus_minutes: u32) -> Vec<TierProgress> {
    catalog
        .iter()
        .map(|spec| {
            let unlocked = is_tier_unlocked(spec, lifetime_focus_minutes);
            TierProgress {
                tier: spec.level,
                name: spec.name.clone(),
                unlocked,
                required_minutes: spec.unlock_requirement_minutes,
                remaining_minutes: if unlocked {
                    0
                } else {
                    spec.unlock_requirement_minutes - lifetime_focus_minutes
                },
            }
        })
        .collect()
}
