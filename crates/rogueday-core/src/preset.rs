//! Task templates, presets, and best-effort batch application.
//!
//! Applying a preset is not a transaction: each template is tried in order
//! against the run's current energy and unlock state, so an early template
//! can starve a later one. Templates that do not fit are skipped and
//! counted; the batch itself only fails when there is no run to add to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EconomyError;
use crate::run::{Run, TaskDraft};
use crate::task::Task;
use crate::tier::{TierCatalog, TierLevel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    #[default]
    Manual,
    FromTask,
}

impl TemplateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateSource::Manual => "manual",
            TemplateSource::FromTask => "from_task",
        }
    }
}

impl std::str::FromStr for TemplateSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(TemplateSource::Manual),
            "from_task" => Ok(TemplateSource::FromTask),
            other => Err(format!("unknown template source: {other}")),
        }
    }
}

/// Reusable blueprint for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub tier: TierLevel,
    pub duration: u32,
    pub use_timer: bool,
    pub category: Option<String>,
    pub source: TemplateSource,
    pub times_used: u32,
    pub created_at: DateTime<Utc>,
}

impl TaskTemplate {
    pub fn new(
        user_id: impl Into<String>,
        draft: TaskDraft,
        category: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("template-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            user_id: user_id.into(),
            title: draft.title,
            tier: draft.tier,
            duration: draft.duration,
            use_timer: draft.use_timer,
            category,
            source: TemplateSource::Manual,
            times_used: 0,
            created_at: now,
        }
    }

    /// Copy an existing task's shape into a template.
    pub fn from_task(
        user_id: impl Into<String>,
        task: &Task,
        category: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let draft = TaskDraft::new(task.title.clone(), task.tier, task.duration, task.use_timer);
        Self {
            source: TemplateSource::FromTask,
            ..Self::new(user_id, draft, category, now)
        }
    }

    pub fn draft(&self) -> TaskDraft {
        TaskDraft::new(self.title.clone(), self.tier, self.duration, self.use_timer)
    }
}

/// Named, ordered group of templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub emoji: Option<String>,
    pub is_favorite: bool,
    /// Template ids in application order
    pub template_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Preset {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("preset-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            user_id: user_id.into(),
            name: name.into(),
            emoji: None,
            is_favorite: false,
            template_ids: Vec::new(),
            created_at: now,
        }
    }
}

/// Partial update of a preset; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetUpdate {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub is_favorite: Option<bool>,
    pub template_ids: Option<Vec<String>>,
}

/// Why a template did not become a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientEnergy,
    TierLocked,
    InvalidTemplate,
}

impl SkipReason {
    fn classify(err: &EconomyError) -> Option<Self> {
        match err {
            EconomyError::InsufficientEnergy { .. } => Some(SkipReason::InsufficientEnergy),
            EconomyError::TierLocked { .. } => Some(SkipReason::TierLocked),
            EconomyError::InvalidDuration { .. }
            | EconomyError::TimerModeMismatch { .. }
            | EconomyError::EmptyTitle => Some(SkipReason::InvalidTemplate),
            _ => None,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientEnergy => write!(f, "not enough energy"),
            SkipReason::TierLocked => write!(f, "tier locked"),
            SkipReason::InvalidTemplate => write!(f, "invalid template"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTemplate {
    pub template_id: String,
    pub title: String,
    pub reason: SkipReason,
}

/// Outcome of applying a preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetApplyReport {
    pub tasks_created: u32,
    pub tasks_skipped: u32,
    pub total_energy_cost: u32,
    pub created_task_ids: Vec<String>,
    /// Templates that produced a task, in order
    pub used_template_ids: Vec<String>,
    pub skipped: Vec<SkippedTemplate>,
    pub message: String,
}

/// Try every template in order against `run`.
///
/// Per-template rule violations become skips. `NoActiveRun` aborts the
/// whole batch because nothing could ever be applied.
pub fn apply_templates(
    run: &mut Run,
    catalog: &TierCatalog,
    lifetime_focus_minutes: u32,
    preset_name: &str,
    templates: &[TaskTemplate],
    now: DateTime<Utc>,
) -> Result<PresetApplyReport, EconomyError> {
    if !run.is_active() {
        return Err(EconomyError::NoActiveRun);
    }

    let mut created_task_ids = Vec::new();
    let mut used_template_ids = Vec::new();
    let mut skipped = Vec::new();
    let mut total_energy_cost = 0;

    for template in templates {
        match run.add_task(catalog, lifetime_focus_minutes, &template.draft(), now) {
            Ok(task) => {
                total_energy_cost += task.energy_cost;
                created_task_ids.push(task.id.clone());
                used_template_ids.push(template.id.clone());
            }
            Err(err) => match SkipReason::classify(&err) {
                Some(reason) => {
                    tracing::warn!(
                        template_id = %template.id,
                        title = %template.title,
                        %reason,
                        "skipping template"
                    );
                    skipped.push(SkippedTemplate {
                        template_id: template.id.clone(),
                        title: template.title.clone(),
                        reason,
                    });
                }
                None => return Err(err),
            },
        }
    }

    let tasks_created = created_task_ids.len() as u32;
    let tasks_skipped = skipped.len() as u32;
    let message = summary_message(preset_name, tasks_created, &skipped);
    Ok(PresetApplyReport {
        tasks_created,
        tasks_skipped,
        total_energy_cost,
        created_task_ids,
        used_template_ids,
        skipped,
        message,
    })
}

fn summary_message(preset_name: &str, created: u32, skipped: &[SkippedTemplate]) -> String {
    if skipped.is_empty() {
        return format!("Added {created} tasks from preset «{preset_name}»");
    }
    let mut reasons: Vec<SkipReason> = Vec::new();
    for s in skipped {
        if !reasons.contains(&s.reason) {
            reasons.push(s.reason);
        }
    }
    let reasons = reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("Added {created} tasks. {} skipped ({reasons}).", skipped.len())
}
