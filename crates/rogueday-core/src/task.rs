//! Task lifecycle.
//!
//! ```text
//!   PENDING ──start──> ACTIVE ──complete──> COMPLETED
//!      │                  │
//!      │                  └────fail────> FAILED
//!      ├──complete (timer mode none)──> COMPLETED
//!      ├──fail (timer expired before start)──> FAILED
//!      └──delete (removed from the run, energy refunded)
//! ```
//!
//! The task only enforces its own transitions. Energy, daily XP and focus
//! minutes live on the owning run, which applies those side effects after a
//! transition succeeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EconomyError;
use crate::tier::{TierLevel, TierSpec, TimerMode};
use crate::xp::compute_xp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Check if a transition is valid, ignoring tier-specific shortcuts.
    pub fn can_transition_to(&self, to: &TaskStatus) -> bool {
        match self {
            TaskStatus::Pending => matches!(
                to,
                TaskStatus::Active | TaskStatus::Completed | TaskStatus::Failed
            ),
            TaskStatus::Active => matches!(to, TaskStatus::Completed | TaskStatus::Failed),
            TaskStatus::Completed | TaskStatus::Failed => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "active" => Ok(TaskStatus::Active),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// User-facing operation on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
    Start,
    Complete,
    Fail,
    Delete,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Start => write!(f, "start"),
            TaskAction::Complete => write!(f, "complete"),
            TaskAction::Fail => write!(f, "fail"),
            TaskAction::Delete => write!(f, "delete"),
        }
    }
}

/// A task inside a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub run_id: String,
    pub title: String,
    pub tier: TierLevel,
    /// Planned duration in minutes
    pub duration: u32,
    pub status: TaskStatus,
    /// Frozen at completion; 0 for anything not completed
    pub xp_earned: u32,
    /// Captured from the tier at creation
    pub energy_cost: u32,
    pub use_timer: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task priced by `spec`. Validation is the run's job.
    pub fn new(
        run_id: impl Into<String>,
        title: impl Into<String>,
        spec: &TierSpec,
        duration: u32,
        use_timer: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Task {
            id: format!("task-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            run_id: run_id.into(),
            title: title.into(),
            tier: spec.level,
            duration,
            status: TaskStatus::Pending,
            xp_earned: 0,
            energy_cost: spec.energy_cost,
            use_timer,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Actions currently legal for this task under `timer`.
    pub fn available_actions(&self, timer: TimerMode) -> Vec<TaskAction> {
        [
            TaskAction::Start,
            TaskAction::Complete,
            TaskAction::Fail,
            TaskAction::Delete,
        ]
        .into_iter()
        .filter(|action| self.is_legal(*action, timer))
        .collect()
    }

    fn is_legal(&self, action: TaskAction, timer: TimerMode) -> bool {
        match (action, self.status) {
            (TaskAction::Start, TaskStatus::Pending) => true,
            (TaskAction::Complete, TaskStatus::Active) => true,
            (TaskAction::Complete, TaskStatus::Pending) => timer == TimerMode::None,
            (TaskAction::Fail, TaskStatus::Active) => true,
            (TaskAction::Fail, TaskStatus::Pending) => self.use_timer,
            (TaskAction::Delete, TaskStatus::Pending) => true,
            _ => false,
        }
    }

    /// Fail with `InvalidTaskState` unless `action` is legal right now.
    pub fn check(&self, action: TaskAction, timer: TimerMode) -> Result<(), EconomyError> {
        if self.is_legal(action, timer) {
            Ok(())
        } else {
            Err(EconomyError::InvalidTaskState {
                task_id: self.id.clone(),
                status: self.status,
                action,
            })
        }
    }

    /// PENDING → ACTIVE.
    pub fn start(&mut self, spec: &TierSpec, now: DateTime<Utc>) -> Result<(), EconomyError> {
        self.check(TaskAction::Start, spec.timer)?;
        self.status = TaskStatus::Active;
        self.started_at = Some(now);
        Ok(())
    }

    /// → COMPLETED. Returns the XP awarded.
    pub fn complete(&mut self, spec: &TierSpec, now: DateTime<Utc>) -> Result<u32, EconomyError> {
        self.check(TaskAction::Complete, spec.timer)?;
        self.xp_earned = compute_xp(spec, self.duration, self.use_timer);
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
        Ok(self.xp_earned)
    }

    /// → FAILED. Failure forfeits all XP.
    pub fn fail(&mut self, spec: &TierSpec, now: DateTime<Utc>) -> Result<(), EconomyError> {
        self.check(TaskAction::Fail, spec.timer)?;
        self.xp_earned = 0;
        self.status = TaskStatus::Failed;
        self.completed_at = Some(now);
        Ok(())
    }
}
