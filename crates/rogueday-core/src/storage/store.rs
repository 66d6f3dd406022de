//! The persistence collaborator.
//!
//! The engine reads and writes whole domain objects through this trait and
//! never sees rows or wire formats. A run is always saved together with its
//! tasks so an energy debit and the task it paid for land in one write.
//! Run writes are versioned so two writers that loaded the same run cannot
//! silently overwrite each other.

use crate::error::StoreError;
use crate::preset::{Preset, TaskTemplate};
use crate::run::{Extraction, Run};
use crate::task::Task;
use crate::user::User;

pub trait RunStore {
    fn load_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    fn save_user(&mut self, user: &User) -> Result<(), StoreError>;

    /// The user's single active run, tasks in creation order.
    fn current_run(&self, user_id: &str) -> Result<Option<Run>, StoreError>;

    /// Upsert the run header and replace its task list.
    ///
    /// On success `run.version` is advanced to the stored version. A run
    /// whose version is older than the stored one fails with
    /// `StoreError::StaleWrite` and nothing is written.
    fn save_run(&mut self, run: &mut Run) -> Result<(), StoreError>;

    /// Commit an extracted run, its settlement record and the credited user
    /// as one write. Either all three land or none do.
    fn settle_run(
        &mut self,
        run: &mut Run,
        extraction: &Extraction,
        user: &User,
    ) -> Result<(), StoreError>;

    /// All of the user's runs, newest first.
    fn list_runs(&self, user_id: &str) -> Result<Vec<Run>, StoreError>;

    /// A task from any of the user's runs.
    fn find_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>, StoreError>;

    /// Append a settlement record. A second record for the same run is an error.
    fn save_extraction(&mut self, extraction: &Extraction) -> Result<(), StoreError>;

    /// Settlement records, newest first.
    fn list_extractions(&self, user_id: &str) -> Result<Vec<Extraction>, StoreError>;

    fn save_template(&mut self, template: &TaskTemplate) -> Result<(), StoreError>;

    fn get_template(&self, template_id: &str) -> Result<Option<TaskTemplate>, StoreError>;

    /// Templates ordered by use count, then newest first.
    fn list_templates(
        &self,
        user_id: &str,
        category: Option<&str>,
    ) -> Result<Vec<TaskTemplate>, StoreError>;

    /// Returns false if nothing was deleted. Presets drop the template.
    fn delete_template(&mut self, template_id: &str) -> Result<bool, StoreError>;

    fn record_template_use(&mut self, template_id: &str) -> Result<(), StoreError>;

    fn save_preset(&mut self, preset: &Preset) -> Result<(), StoreError>;

    fn get_preset(&self, preset_id: &str) -> Result<Option<Preset>, StoreError>;

    /// Favorites first, then newest first.
    fn list_presets(&self, user_id: &str) -> Result<Vec<Preset>, StoreError>;

    /// Returns false if nothing was deleted. Templates survive.
    fn delete_preset(&mut self, preset_id: &str) -> Result<bool, StoreError>;
}
