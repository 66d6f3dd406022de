//! # Rogueday Core Library
//!
//! The run economy of a gamified daily task tracker. A day is a bounded
//! *run*: the user spends energy to take on tasks of increasing difficulty,
//! earns XP for finishing them, and *extracts* at the end of the day to bank
//! the result into lifetime stats and a streak.
//!
//! ## Architecture
//!
//! - **Tiers**: three difficulty classes with duration, XP, energy and timer rules
//! - **Run / Task**: the daily run owns its energy ledger and task state machines
//! - **Engine**: [`RunManager`] drives every operation against a [`RunStore`]
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`RunManager`]: Run lifecycle, task operations, templates and presets
//! - [`TierCatalog`]: Immutable tier table
//! - [`SqliteStore`] / [`MemoryStore`]: Persistence collaborators
//! - [`Config`]: Engine configuration management

pub mod energy;
pub mod engine;
pub mod error;
pub mod preset;
pub mod run;
pub mod storage;
pub mod task;
pub mod tier;
pub mod unlock;
pub mod user;
pub mod xp;

pub use energy::EnergyLedger;
pub use engine::{Clock, ManualClock, RunManager, SystemClock};
pub use error::{ConfigError, CoreError, EconomyError, StoreError};
pub use preset::{Preset, PresetApplyReport, PresetUpdate, SkipReason, TaskTemplate, TemplateSource};
pub use run::{Extraction, FailOutcome, Run, RunStatus, TaskDraft, TierBreakdown};
pub use storage::{Config, MemoryStore, RunStore, SqliteStore};
pub use task::{Task, TaskAction, TaskStatus};
pub use tier::{DurationRange, TierCatalog, TierLevel, TierSpec, TimerMode};
pub use unlock::TierProgress;
pub use user::{LifetimeStats, User};
pub use xp::{compute_xp, PenaltyPolicy};
