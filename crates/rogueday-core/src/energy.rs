//! Per-run energy budget.
//!
//! Energy starts at `max` when a run opens and only ever goes back up
//! through refunds of deleted pending tasks.

use serde::{Deserialize, Serialize};

use crate::error::EconomyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyLedger {
    pub current: u32,
    pub max: u32,
}

impl EnergyLedger {
    /// A full ledger.
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.current >= cost
    }

    /// Spend `cost`, or fail without touching the balance.
    pub fn debit(&mut self, cost: u32) -> Result<(), EconomyError> {
        if !self.can_afford(cost) {
            return Err(EconomyError::InsufficientEnergy {
                required: cost,
                available: self.current,
            });
        }
        self.current -= cost;
        Ok(())
    }

    /// Give back `cost`, capped at `max`.
    pub fn refund(&mut self, cost: u32) {
        self.current = self.current.saturating_add(cost).min(self.max);
    }

    pub fn spent(&self) -> u32 {
        self.max - self.current
    }
}
