//! The daily run and its settlement record.
//!
//! A `Run` owns its tasks and its energy ledger; every mutation of either
//! goes through the methods here so a task is never created without its
//! debit, and never deleted without its refund.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::energy::EnergyLedger;
use crate::error::EconomyError;
use crate::task::{Task, TaskAction, TaskStatus};
use crate::tier::{TierCatalog, TierLevel};
use crate::unlock::ensure_unlocked;
use crate::xp::PenaltyPolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Active,
    Extracted,
    Abandoned,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Active => "active",
            RunStatus::Extracted => "extracted",
            RunStatus::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RunStatus::Active),
            "extracted" => Ok(RunStatus::Extracted),
            "abandoned" => Ok(RunStatus::Abandoned),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

/// What the user asks for when adding a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub tier: TierLevel,
    pub duration: u32,
    #[serde(default)]
    pub use_timer: bool,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, tier: TierLevel, duration: u32, use_timer: bool) -> Self {
        Self {
            title: title.into(),
            tier,
            duration,
            use_timer,
        }
    }
}

/// Outcome of failing a task.
#[derive(Debug, Clone, PartialEq)]
pub struct FailOutcome {
    pub task: Task,
    /// XP removed from the run by the penalty policy
    pub penalty_xp: u32,
}

/// One day's bounded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub user_id: String,
    pub run_date: NaiveDate,
    pub daily_xp: u32,
    /// XP removed by failure penalties so far
    #[serde(default)]
    pub penalty_xp: u32,
    pub energy: EnergyLedger,
    pub total_focus_minutes: u32,
    pub status: RunStatus,
    pub tasks: Vec<Task>,
    pub started_at: DateTime<Utc>,
    pub extracted_at: Option<DateTime<Utc>>,
    /// Storage write counter. A store refuses a save whose version is
    /// older than the one it holds.
    #[serde(default)]
    pub version: u64,
}

impl Run {
    /// Open a run with a full energy ledger.
    pub fn new(
        user_id: impl Into<String>,
        run_date: NaiveDate,
        max_energy: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Run {
            id: format!("run-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            user_id: user_id.into(),
            run_date,
            daily_xp: 0,
            penalty_xp: 0,
            energy: EnergyLedger::full(max_energy),
            total_focus_minutes: 0,
            status: RunStatus::Active,
            tasks: Vec::new(),
            started_at: now,
            extracted_at: None,
            version: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RunStatus::Active
    }

    fn ensure_active(&self) -> Result<(), EconomyError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(EconomyError::NoActiveRun)
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    fn task_index(&self, task_id: &str) -> Result<usize, EconomyError> {
        self.tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| EconomyError::TaskNotFound(task_id.to_string()))
    }

    pub fn tasks_with_status(&self, status: TaskStatus) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.status == status)
    }

    /// Validate `draft`, debit its energy and append it as a pending task.
    ///
    /// Checks run in order: title, unlock, duration, timer mode, energy.
    /// Nothing changes unless every check passes.
    pub fn add_task(
        &mut self,
        catalog: &TierCatalog,
        lifetime_focus_minutes: u32,
        draft: &TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<&Task, EconomyError> {
        self.ensure_active()?;
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(EconomyError::EmptyTitle);
        }
        let spec = catalog.get(draft.tier);
        ensure_unlocked(spec, lifetime_focus_minutes)?;
        spec.check_duration(draft.duration)?;
        spec.check_timer(draft.use_timer)?;
        self.energy.debit(spec.energy_cost)?;

        let task = Task::new(
            self.id.clone(),
            title,
            spec,
            draft.duration,
            draft.use_timer,
            now,
        );
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    pub fn start_task(
        &mut self,
        catalog: &TierCatalog,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<&Task, EconomyError> {
        self.ensure_active()?;
        let idx = self.task_index(task_id)?;
        let task = &mut self.tasks[idx];
        task.start(catalog.get(task.tier), now)?;
        Ok(&self.tasks[idx])
    }

    /// Complete a task, crediting its XP and focus minutes to the run.
    pub fn complete_task(
        &mut self,
        catalog: &TierCatalog,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<&Task, EconomyError> {
        self.ensure_active()?;
        let idx = self.task_index(task_id)?;
        let task = &mut self.tasks[idx];
        let xp = task.complete(catalog.get(task.tier), now)?;
        let duration = task.duration;
        self.daily_xp = self.daily_xp.saturating_add(xp);
        self.total_focus_minutes = self.total_focus_minutes.saturating_add(duration);
        Ok(&self.tasks[idx])
    }

    /// Fail a task. Spent energy stays spent and no focus minutes accrue.
    pub fn fail_task(
        &mut self,
        catalog: &TierCatalog,
        penalty: &PenaltyPolicy,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<FailOutcome, EconomyError> {
        self.ensure_active()?;
        let idx = self.task_index(task_id)?;
        let task = &mut self.tasks[idx];
        task.fail(catalog.get(task.tier), now)?;
        let tier = task.tier;
        let penalty_xp = self.apply_penalty(penalty, tier);
        Ok(FailOutcome {
            task: self.tasks[idx].clone(),
            penalty_xp,
        })
    }

    fn apply_penalty(&mut self, penalty: &PenaltyPolicy, tier: TierLevel) -> u32 {
        let lost = penalty.failure_penalty(tier, self.daily_xp);
        self.daily_xp -= lost;
        self.penalty_xp = self.penalty_xp.saturating_add(lost);
        lost
    }

    /// Remove a pending task and refund its energy.
    pub fn delete_task(
        &mut self,
        catalog: &TierCatalog,
        task_id: &str,
    ) -> Result<Task, EconomyError> {
        self.ensure_active()?;
        let idx = self.task_index(task_id)?;
        let task = &self.tasks[idx];
        task.check(TaskAction::Delete, catalog.get(task.tier).timer)?;
        let task = self.tasks.remove(idx);
        self.energy.refund(task.energy_cost);
        Ok(task)
    }

    /// Close the run and produce its extraction record.
    ///
    /// Tasks still active are failed first (with the penalty policy applied);
    /// pending tasks are left as they are and only show up in `tasks_total`.
    pub fn settle(
        &mut self,
        catalog: &TierCatalog,
        penalty: &PenaltyPolicy,
        now: DateTime<Utc>,
    ) -> Result<Extraction, EconomyError> {
        self.ensure_active()?;
        let active: Vec<String> = self
            .tasks_with_status(TaskStatus::Active)
            .map(|t| t.id.clone())
            .collect();
        for task_id in active {
            self.fail_task(catalog, penalty, &task_id, now)?;
        }

        let extraction = Extraction::tally(self, now);
        self.status = RunStatus::Extracted;
        self.extracted_at = Some(now);
        Ok(extraction)
    }

    /// Close the run without crediting anything.
    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<(), EconomyError> {
        self.ensure_active()?;
        self.status = RunStatus::Abandoned;
        self.extracted_at = Some(now);
        Ok(())
    }
}

/// Per-tier counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakdown {
    pub t1: u32,
    pub t2: u32,
    pub t3: u32,
}

impl TierBreakdown {
    pub fn increment(&mut self, tier: TierLevel) {
        match tier {
            TierLevel::One => self.t1 += 1,
            TierLevel::Two => self.t2 += 1,
            TierLevel::Three => self.t3 += 1,
        }
    }

    pub fn get(&self, tier: TierLevel) -> u32 {
        match tier {
            TierLevel::One => self.t1,
            TierLevel::Two => self.t2,
            TierLevel::Three => self.t3,
        }
    }

    pub fn total(&self) -> u32 {
        self.t1 + self.t2 + self.t3
    }
}

/// Append-only settlement record, one per extracted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub id: String,
    pub user_id: String,
    pub run_id: String,
    pub run_date: NaiveDate,
    pub final_xp: u32,
    pub xp_before_penalties: u32,
    pub penalty_xp: u32,
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub tasks_total: u32,
    pub total_focus_minutes: u32,
    pub completed_by_tier: TierBreakdown,
    pub failed_by_tier: TierBreakdown,
    pub completed_with_timer: u32,
    pub completed_without_timer: u32,
    pub created_at: DateTime<Utc>,
}

impl Extraction {
    fn tally(run: &Run, now: DateTime<Utc>) -> Self {
        let mut completed_by_tier = TierBreakdown::default();
        let mut failed_by_tier = TierBreakdown::default();
        let mut completed_with_timer = 0;
        let mut completed_without_timer = 0;

        for task in &run.tasks {
            match task.status {
                TaskStatus::Completed => {
                    completed_by_tier.increment(task.tier);
                    if task.use_timer {
                        completed_with_timer += 1;
                    } else {
                        completed_without_timer += 1;
                    }
                }
                TaskStatus::Failed => failed_by_tier.increment(task.tier),
                TaskStatus::Pending | TaskStatus::Active => {}
            }
        }

        Extraction {
            id: format!("extraction-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            user_id: run.user_id.clone(),
            run_id: run.id.clone(),
            run_date: run.run_date,
            final_xp: run.daily_xp,
            xp_before_penalties: run.daily_xp.saturating_add(run.penalty_xp),
            penalty_xp: run.penalty_xp,
            tasks_completed: completed_by_tier.total(),
            tasks_failed: failed_by_tier.total(),
            tasks_total: run.tasks.len() as u32,
            total_focus_minutes: run.total_focus_minutes,
            completed_by_tier,
            failed_by_tier,
            completed_with_timer,
            completed_without_timer,
            created_at: now,
        }
    }
}
