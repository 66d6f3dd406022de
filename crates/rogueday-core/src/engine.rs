//! Run lifecycle manager.
//!
//! `RunManager` is the engine's single call surface. It owns its store and
//! is passed around explicitly; every operation loads the active run, applies
//! one domain transition, and writes the result back before returning.
//!
//! Mutations take `&mut self`, so a check-then-debit can never interleave
//! with another mutation of the same manager. Services that share a manager
//! across threads wrap it in `Arc<Mutex<_>>`.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{ConfigError, CoreError, EconomyError, Result};
use crate::preset::{apply_templates, Preset, PresetApplyReport, PresetUpdate, TaskTemplate};
use crate::run::{Extraction, FailOutcome, Run, TaskDraft};
use crate::storage::{Config, RunStore};
use crate::task::Task;
use crate::tier::{TierCatalog, TierLevel};
use crate::unlock::{is_tier_unlocked, tier_progress, TierProgress};
use crate::user::User;
use crate::xp::{compute_xp, PenaltyPolicy};

/// Source of the current time and the user's calendar day.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The day a new run is dated with.
    fn today(&self) -> NaiveDate;
}

/// Wall clock; run dates follow the local calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Settable clock for tests and replays. Days follow UTC.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Noon UTC on `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)) + Duration::hours(12))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

/// Owns one user's runs and drives every economy operation.
pub struct RunManager<S> {
    store: S,
    user_id: String,
    catalog: TierCatalog,
    max_energy: u32,
    penalty: PenaltyPolicy,
    clock: Box<dyn Clock>,
}

impl<S: RunStore> RunManager<S> {
    /// Manager with the built-in catalog, 50 energy and no failure penalty.
    pub fn new(store: S, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            catalog: TierCatalog::default(),
            max_energy: 50,
            penalty: PenaltyPolicy::default(),
            clock: Box::new(SystemClock),
        }
    }

    /// Manager configured from a loaded [`Config`].
    ///
    /// # Errors
    /// Returns an error if the config's tier overrides do not form a valid catalog.
    pub fn from_config(store: S, config: &Config) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(store, config.user_id.clone())
            .with_catalog(config.tier_catalog()?)
            .with_max_energy(config.economy.max_energy)
            .with_penalty(config.penalty.clone()))
    }

    pub fn with_catalog(mut self, catalog: TierCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_max_energy(mut self, max_energy: u32) -> Self {
        self.max_energy = max_energy;
        self
    }

    pub fn with_penalty(mut self, penalty: PenaltyPolicy) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn catalog(&self) -> &TierCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The user's record, or a fresh one if they have never extracted.
    pub fn user(&self) -> Result<User> {
        Ok(self
            .store
            .load_user(&self.user_id)?
            .unwrap_or_else(|| User::new(self.user_id.clone(), self.clock.now())))
    }

    fn lifetime_focus_minutes(&self) -> Result<u32> {
        Ok(self.user()?.stats.total_focus_minutes)
    }

    pub fn current_run(&self) -> Result<Option<Run>> {
        Ok(self.store.current_run(&self.user_id)?)
    }

    fn active_run(&self) -> Result<Run> {
        self.current_run()?
            .ok_or_else(|| EconomyError::NoActiveRun.into())
    }

    // === Run lifecycle ===

    /// Open today's run with a full energy ledger.
    ///
    /// # Errors
    /// `RunAlreadyActive` if the user already has an active run.
    pub fn start_new_run(&mut self) -> Result<Run> {
        if self.current_run()?.is_some() {
            return Err(EconomyError::RunAlreadyActive.into());
        }
        if self.store.load_user(&self.user_id)?.is_none() {
            self.store
                .save_user(&User::new(self.user_id.clone(), self.clock.now()))?;
        }
        let mut run = Run::new(
            self.user_id.clone(),
            self.clock.today(),
            self.max_energy,
            self.clock.now(),
        );
        self.store.save_run(&mut run)?;
        tracing::info!(run_id = %run.id, run_date = %run.run_date, energy = run.energy.max, "run started");
        Ok(run)
    }

    /// Settle the active run into an extraction and credit the user.
    ///
    /// The run, its extraction and the user are committed together, so a
    /// failed write leaves the run active and the call can be retried.
    ///
    /// # Errors
    /// `NoActiveRun` if there is nothing to extract, including a second call
    /// for a run that was just extracted.
    pub fn extract(&mut self) -> Result<Extraction> {
        let mut run = self.active_run()?;
        let extraction = run.settle(&self.catalog, &self.penalty, self.clock.now())?;
        let mut user = self.user()?;
        user.apply_extraction(&extraction);

        self.store.settle_run(&mut run, &extraction, &user)?;
        tracing::info!(
            run_id = %run.id,
            final_xp = extraction.final_xp,
            completed = extraction.tasks_completed,
            failed = extraction.tasks_failed,
            streak = user.stats.current_streak,
            "run extracted"
        );
        Ok(extraction)
    }

    /// Close the active run without credit.
    pub fn abandon(&mut self) -> Result<Run> {
        let mut run = self.active_run()?;
        run.abandon(self.clock.now())?;
        self.store.save_run(&mut run)?;
        tracing::info!(run_id = %run.id, "run abandoned");
        Ok(run)
    }

    /// Abandon the active run if it belongs to an earlier day.
    ///
    /// Returns the abandoned run, or `None` if there was no stale run.
    pub fn abandon_stale_run(&mut self) -> Result<Option<Run>> {
        match self.current_run()? {
            Some(run) if run.run_date < self.clock.today() => {
                tracing::debug!(run_id = %run.id, run_date = %run.run_date, "abandoning stale run");
                self.abandon().map(Some)
            }
            _ => Ok(None),
        }
    }

    // === Tasks ===

    /// Validate, charge and add a task to the active run.
    pub fn add_task(&mut self, draft: &TaskDraft) -> Result<Task> {
        let mut run = self.active_run()?;
        let lifetime = self.lifetime_focus_minutes()?;
        let task = run
            .add_task(&self.catalog, lifetime, draft, self.clock.now())?
            .clone();
        self.store.save_run(&mut run)?;
        tracing::debug!(
            task_id = %task.id,
            tier = %task.tier,
            energy_cost = task.energy_cost,
            energy_left = run.energy.current,
            "task added"
        );
        Ok(task)
    }

    pub fn start_task(&mut self, task_id: &str) -> Result<Task> {
        let mut run = self.active_run()?;
        let task = run
            .start_task(&self.catalog, task_id, self.clock.now())?
            .clone();
        self.store.save_run(&mut run)?;
        tracing::debug!(task_id, "task started");
        Ok(task)
    }

    pub fn complete_task(&mut self, task_id: &str) -> Result<Task> {
        let mut run = self.active_run()?;
        let task = run
            .complete_task(&self.catalog, task_id, self.clock.now())?
            .clone();
        self.store.save_run(&mut run)?;
        tracing::debug!(task_id, xp = task.xp_earned, daily_xp = run.daily_xp, "task completed");
        Ok(task)
    }

    pub fn fail_task(&mut self, task_id: &str) -> Result<FailOutcome> {
        let mut run = self.active_run()?;
        let outcome = run.fail_task(&self.catalog, &self.penalty, task_id, self.clock.now())?;
        self.store.save_run(&mut run)?;
        tracing::debug!(task_id, penalty_xp = outcome.penalty_xp, "task failed");
        Ok(outcome)
    }

    /// Remove a pending task and refund its energy.
    pub fn delete_task(&mut self, task_id: &str) -> Result<Task> {
        let mut run = self.active_run()?;
        let task = run.delete_task(&self.catalog, task_id)?;
        self.store.save_run(&mut run)?;
        tracing::debug!(task_id, refunded = task.energy_cost, "task deleted");
        Ok(task)
    }

    /// XP a task would earn on completion, without creating it.
    pub fn preview_xp(
        &self,
        tier: TierLevel,
        duration: u32,
        use_timer: bool,
    ) -> std::result::Result<u32, EconomyError> {
        let spec = self.catalog.get(tier);
        spec.check_duration(duration)?;
        spec.check_timer(use_timer)?;
        Ok(compute_xp(spec, duration, use_timer))
    }

    // === Stats ===

    pub fn tier_progress(&self) -> Result<Vec<TierProgress>> {
        Ok(tier_progress(&self.catalog, self.lifetime_focus_minutes()?))
    }

    pub fn unlocked_tiers(&self) -> Result<Vec<TierLevel>> {
        let lifetime = self.lifetime_focus_minutes()?;
        Ok(self
            .catalog
            .iter()
            .filter(|spec| is_tier_unlocked(spec, lifetime))
            .map(|spec| spec.level)
            .collect())
    }

    /// Past extractions, newest first.
    pub fn journal(&self) -> Result<Vec<Extraction>> {
        Ok(self.store.list_extractions(&self.user_id)?)
    }

    // === Templates ===

    /// Save a reusable task blueprint.
    ///
    /// The draft must fit its tier's duration range and timer mode; unlock
    /// state is only checked when the template is applied.
    pub fn create_template(
        &mut self,
        draft: TaskDraft,
        category: Option<String>,
    ) -> Result<TaskTemplate> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(EconomyError::EmptyTitle.into());
        }
        let spec = self.catalog.get(draft.tier);
        spec.check_duration(draft.duration)?;
        spec.check_timer(draft.use_timer)?;

        let draft = TaskDraft { title, ..draft };
        let template = TaskTemplate::new(self.user_id.clone(), draft, category, self.clock.now());
        self.store.save_template(&template)?;
        tracing::debug!(template_id = %template.id, "template created");
        Ok(template)
    }

    /// Save a template copying one of the user's tasks.
    pub fn template_from_task(
        &mut self,
        task_id: &str,
        category: Option<String>,
    ) -> Result<TaskTemplate> {
        let task = self
            .store
            .find_task(&self.user_id, task_id)?
            .ok_or_else(|| EconomyError::TaskNotFound(task_id.to_string()))?;
        let template = TaskTemplate::from_task(self.user_id.clone(), &task, category, self.clock.now());
        self.store.save_template(&template)?;
        tracing::debug!(template_id = %template.id, task_id, "template created from task");
        Ok(template)
    }

    /// Templates, most used first.
    pub fn list_templates(&self, category: Option<&str>) -> Result<Vec<TaskTemplate>> {
        Ok(self.store.list_templates(&self.user_id, category)?)
    }

    fn owned_template(&self, template_id: &str) -> Result<TaskTemplate> {
        self.store
            .get_template(template_id)?
            .filter(|t| t.user_id == self.user_id)
            .ok_or_else(|| EconomyError::TemplateNotFound(template_id.to_string()).into())
    }

    pub fn delete_template(&mut self, template_id: &str) -> Result<()> {
        self.owned_template(template_id)?;
        self.store.delete_template(template_id)?;
        Ok(())
    }

    // === Presets ===

    /// Keep the ids that name one of the user's templates, in order.
    fn known_template_ids(&self, ids: Vec<String>) -> Result<Vec<String>> {
        let mut known = Vec::with_capacity(ids.len());
        for id in ids {
            match self.owned_template(&id) {
                Ok(_) => known.push(id),
                Err(CoreError::Economy(EconomyError::TemplateNotFound(_))) => {
                    tracing::warn!(template_id = %id, "dropping unknown template from preset");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(known)
    }

    /// Create a preset over existing templates. Unknown ids are dropped.
    pub fn create_preset(
        &mut self,
        name: &str,
        emoji: Option<String>,
        template_ids: Vec<String>,
    ) -> Result<Preset> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EconomyError::EmptyName.into());
        }
        let mut preset = Preset::new(self.user_id.clone(), name, self.clock.now());
        preset.emoji = emoji;
        preset.template_ids = self.known_template_ids(template_ids)?;
        self.store.save_preset(&preset)?;
        tracing::debug!(preset_id = %preset.id, templates = preset.template_ids.len(), "preset created");
        Ok(preset)
    }

    pub fn get_preset(&self, preset_id: &str) -> Result<Preset> {
        self.store
            .get_preset(preset_id)?
            .filter(|p| p.user_id == self.user_id)
            .ok_or_else(|| EconomyError::PresetNotFound(preset_id.to_string()).into())
    }

    pub fn update_preset(&mut self, preset_id: &str, update: PresetUpdate) -> Result<Preset> {
        let mut preset = self.get_preset(preset_id)?;
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(EconomyError::EmptyName.into());
            }
            preset.name = name.to_string();
        }
        if let Some(emoji) = update.emoji {
            preset.emoji = Some(emoji).filter(|e| !e.is_empty());
        }
        if let Some(is_favorite) = update.is_favorite {
            preset.is_favorite = is_favorite;
        }
        if let Some(ids) = update.template_ids {
            preset.template_ids = self.known_template_ids(ids)?;
        }
        self.store.save_preset(&preset)?;
        Ok(preset)
    }

    /// Presets, favorites first.
    pub fn list_presets(&self) -> Result<Vec<Preset>> {
        Ok(self.store.list_presets(&self.user_id)?)
    }

    pub fn delete_preset(&mut self, preset_id: &str) -> Result<()> {
        self.get_preset(preset_id)?;
        self.store.delete_preset(preset_id)?;
        Ok(())
    }

    /// Add every template of a preset to the active run, best effort.
    ///
    /// Templates that are locked, unaffordable or no longer valid are
    /// skipped and reported; each template that produced a task has its use
    /// count bumped.
    pub fn apply_preset(&mut self, preset_id: &str) -> Result<PresetApplyReport> {
        let preset = self.get_preset(preset_id)?;
        let mut templates = Vec::with_capacity(preset.template_ids.len());
        for id in &preset.template_ids {
            match self.store.get_template(id)? {
                Some(template) => templates.push(template),
                None => tracing::warn!(template_id = %id, preset_id, "preset references missing template"),
            }
        }
        self.apply_batch(&preset.name, &templates)
    }

    /// Add an ad-hoc list of templates to the active run, best effort.
    pub fn apply_templates(
        &mut self,
        label: &str,
        templates: &[TaskTemplate],
    ) -> Result<PresetApplyReport> {
        self.apply_batch(label, templates)
    }

    fn apply_batch(&mut self, label: &str, templates: &[TaskTemplate]) -> Result<PresetApplyReport> {
        let mut run = self.active_run()?;
        let lifetime = self.lifetime_focus_minutes()?;
        let report = apply_templates(
            &mut run,
            &self.catalog,
            lifetime,
            label,
            templates,
            self.clock.now(),
        )?;
        self.store.save_run(&mut run)?;
        for id in &report.used_template_ids {
            self.store.record_template_use(id)?;
        }
        tracing::info!(
            preset = label,
            created = report.tasks_created,
            skipped = report.tasks_skipped,
            energy = report.total_energy_cost,
            "preset applied"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::task::TaskStatus;
    use std::sync::Arc;

    fn manager() -> (RunManager<MemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_date(
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        ));
        let manager = RunManager::new(MemoryStore::new(), "user-1").with_clock(clock.clone());
        (manager, clock)
    }

    fn economy(err: CoreError) -> EconomyError {
        err.as_economy().cloned().expect("economy error")
    }

    #[test]
    fn start_new_run_rejects_second_active_run() {
        let (mut m, _) = manager();
        let run = m.start_new_run().unwrap();
        assert_eq!(run.energy.current, 50);
        assert_eq!(run.run_date, NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
        assert_eq!(economy(m.start_new_run().unwrap_err()), EconomyError::RunAlreadyActive);
    }

    #[test]
    fn task_operations_need_an_active_run() {
        let (mut m, _) = manager();
        let err = m
            .add_task(&TaskDraft::new("Email", TierLevel::One, 5, false))
            .unwrap_err();
        assert_eq!(economy(err), EconomyError::NoActiveRun);
        assert_eq!(economy(m.extract().unwrap_err()), EconomyError::NoActiveRun);
    }

    #[test]
    fn task_changes_are_persisted() {
        let (mut m, _) = manager();
        m.start_new_run().unwrap();
        let task = m
            .add_task(&TaskDraft::new("Email", TierLevel::One, 10, false))
            .unwrap();
        m.complete_task(&task.id).unwrap();

        let run = m.current_run().unwrap().unwrap();
        assert_eq!(run.tasks[0].status, TaskStatus::Completed);
        assert_eq!(run.daily_xp, 75);
        assert_eq!(run.total_focus_minutes, 10);
    }

    #[test]
    fn preview_matches_award() {
        let (mut m, _) = manager();
        m.start_new_run().unwrap();
        let preview = m.preview_xp(TierLevel::One, 7, false).unwrap();
        let task = m
            .add_task(&TaskDraft::new("Tidy", TierLevel::One, 7, false))
            .unwrap();
        let done = m.complete_task(&task.id).unwrap();
        assert_eq!(preview, done.xp_earned);
    }

    #[test]
    fn preview_validates_input() {
        let (m, _) = manager();
        assert!(matches!(
            m.preview_xp(TierLevel::One, 1, false),
            Err(EconomyError::InvalidDuration { .. })
        ));
        assert!(matches!(
            m.preview_xp(TierLevel::Three, 30, false),
            Err(EconomyError::TimerModeMismatch { .. })
        ));
    }

    #[test]
    fn extract_credits_user_once() {
        let (mut m, _) = manager();
        m.start_new_run().unwrap();
        let task = m
            .add_task(&TaskDraft::new("Email", TierLevel::One, 10, false))
            .unwrap();
        m.complete_task(&task.id).unwrap();

        let extraction = m.extract().unwrap();
        assert_eq!(extraction.final_xp, 75);
        assert_eq!(economy(m.extract().unwrap_err()), EconomyError::NoActiveRun);

        let user = m.user().unwrap();
        assert_eq!(user.stats.total_xp, 75);
        assert_eq!(user.stats.total_extractions, 1);
        assert_eq!(user.stats.current_streak, 1);
        assert_eq!(m.journal().unwrap().len(), 1);
    }

    #[test]
    fn stale_run_is_abandoned_on_a_new_day() {
        let (mut m, clock) = manager();
        m.start_new_run().unwrap();
        assert!(m.abandon_stale_run().unwrap().is_none());

        clock.advance_days(1);
        let abandoned = m.abandon_stale_run().unwrap().unwrap();
        assert_eq!(abandoned.status, crate::run::RunStatus::Abandoned);
        assert!(m.current_run().unwrap().is_none());
        assert_eq!(m.user().unwrap().stats.total_extractions, 0);
    }

    #[test]
    fn unlocked_tiers_follow_lifetime_focus() {
        let (m, _) = manager();
        assert_eq!(m.unlocked_tiers().unwrap(), vec![TierLevel::One]);
        let progress = m.tier_progress().unwrap();
        assert_eq!(progress[1].remaining_minutes, 60);
    }

    #[test]
    fn template_from_task_and_apply_preset() {
        let (mut m, _) = manager();
        m.start_new_run().unwrap();
        let task = m
            .add_task(&TaskDraft::new("Stretch", TierLevel::One, 5, false))
            .unwrap();
        let from_task = m.template_from_task(&task.id, None).unwrap();
        let manual = m
            .create_template(TaskDraft::new(" Read ", TierLevel::One, 10, false), Some("home".into()))
            .unwrap();
        assert_eq!(manual.title, "Read");

        let preset = m
            .create_preset(
                "Morning",
                Some("☀".into()),
                vec![from_task.id.clone(), "template-missing".into(), manual.id.clone()],
            )
            .unwrap();
        assert_eq!(preset.template_ids, vec![from_task.id.clone(), manual.id.clone()]);

        let report = m.apply_preset(&preset.id).unwrap();
        assert_eq!(report.tasks_created, 2);
        assert_eq!(report.message, "Added 2 tasks from preset «Morning»");
        assert_eq!(m.current_run().unwrap().unwrap().tasks.len(), 3);

        let templates = m.list_templates(None).unwrap();
        assert!(templates.iter().all(|t| t.times_used == 1));
    }

    #[test]
    fn preset_update_and_delete() {
        let (mut m, _) = manager();
        let preset = m.create_preset("Evening", None, vec![]).unwrap();
        let updated = m
            .update_preset(
                &preset.id,
                PresetUpdate {
                    is_favorite: Some(true),
                    name: Some("Night".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated.is_favorite);
        assert_eq!(updated.name, "Night");

        m.delete_preset(&preset.id).unwrap();
        assert_eq!(
            economy(m.delete_preset(&preset.id).unwrap_err()),
            EconomyError::PresetNotFound(preset.id.clone())
        );
        assert_eq!(economy(m.create_preset(" ", None, vec![]).unwrap_err()), EconomyError::EmptyName);
    }

    #[test]
    fn apply_preset_without_run_fails() {
        let (mut m, _) = manager();
        let preset = m.create_preset("Empty", None, vec![]).unwrap();
        assert_eq!(economy(m.apply_preset(&preset.id).unwrap_err()), EconomyError::NoActiveRun);
    }
}
