//! In-memory `RunStore` for tests and embedders that persist elsewhere.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::preset::{Preset, TaskTemplate};
use crate::run::{Extraction, Run, RunStatus};
use crate::task::Task;
use crate::user::User;

use super::store::RunStore;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    users: HashMap<String, User>,
    runs: HashMap<String, Run>,
    extractions: Vec<Extraction>,
    templates: HashMap<String, TaskTemplate>,
    presets: HashMap<String, Preset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a run write and return the version it will be stored at.
    fn check_run(&self, run: &Run) -> Result<u64, StoreError> {
        if let Some(stored) = self.runs.get(&run.id) {
            if stored.version != run.version {
                return Err(StoreError::StaleWrite {
                    run_id: run.id.clone(),
                });
            }
        }
        if run.status == RunStatus::Active {
            let other_active = self.runs.values().any(|r| {
                r.user_id == run.user_id && r.status == RunStatus::Active && r.id != run.id
            });
            if other_active {
                return Err(StoreError::QueryFailed(format!(
                    "user {} already has an active run",
                    run.user_id
                )));
            }
        }
        Ok(if self.runs.contains_key(&run.id) {
            run.version + 1
        } else {
            run.version
        })
    }

    fn check_extraction(&self, extraction: &Extraction) -> Result<(), StoreError> {
        if self
            .extractions
            .iter()
            .any(|e| e.run_id == extraction.run_id)
        {
            return Err(StoreError::QueryFailed(format!(
                "run {} already has an extraction",
                extraction.run_id
            )));
        }
        Ok(())
    }
}

impl RunStore for MemoryStore {
    fn load_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(user_id).cloned())
    }

    fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn current_run(&self, user_id: &str) -> Result<Option<Run>, StoreError> {
        Ok(self
            .runs
            .values()
            .filter(|r| r.user_id == user_id && r.status == RunStatus::Active)
            .max_by_key(|r| r.started_at)
            .cloned())
    }

    fn save_run(&mut self, run: &mut Run) -> Result<(), StoreError> {
        let version = self.check_run(run)?;
        run.version = version;
        self.runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    fn settle_run(
        &mut self,
        run: &mut Run,
        extraction: &Extraction,
        user: &User,
    ) -> Result<(), StoreError> {
        let version = self.check_run(run)?;
        self.check_extraction(extraction)?;

        run.version = version;
        self.runs.insert(run.id.clone(), run.clone());
        self.extractions.push(extraction.clone());
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn list_runs(&self, user_id: &str) -> Result<Vec<Run>, StoreError> {
        let mut runs: Vec<Run> = self
            .runs
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    fn find_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self
            .runs
            .values()
            .filter(|r| r.user_id == user_id)
            .find_map(|r| r.task(task_id).cloned()))
    }

    fn save_extraction(&mut self, extraction: &Extraction) -> Result<(), StoreError> {
        self.check_extraction(extraction)?;
        self.extractions.push(extraction.clone());
        Ok(())
    }

    fn list_extractions(&self, user_id: &str) -> Result<Vec<Extraction>, StoreError> {
        let mut list: Vec<Extraction> = self
            .extractions
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        list.reverse();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    fn save_template(&mut self, template: &TaskTemplate) -> Result<(), StoreError> {
        self.templates.insert(template.id.clone(), template.clone());
        Ok(())
    }

    fn get_template(&self, template_id: &str) -> Result<Option<TaskTemplate>, StoreError> {
        Ok(self.templates.get(template_id).cloned())
    }

    fn list_templates(
        &self,
        user_id: &str,
        category: Option<&str>,
    ) -> Result<Vec<TaskTemplate>, StoreError> {
        let mut list: Vec<TaskTemplate> = self
            .templates
            .values()
            .filter(|t| t.user_id == user_id)
            .filter(|t| category.is_none() || t.category.as_deref() == category)
            .cloned()
            .collect();
        list.sort_by(|a, b| {
            b.times_used
                .cmp(&a.times_used)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(list)
    }

    fn delete_template(&mut self, template_id: &str) -> Result<bool, StoreError> {
        let removed = self.templates.remove(template_id).is_some();
        if removed {
            for preset in self.presets.values_mut() {
                preset.template_ids.retain(|id| id != template_id);
            }
        }
        Ok(removed)
    }

    fn record_template_use(&mut self, template_id: &str) -> Result<(), StoreError> {
        if let Some(template) = self.templates.get_mut(template_id) {
            template.times_used += 1;
        }
        Ok(())
    }

    fn save_preset(&mut self, preset: &Preset) -> Result<(), StoreError> {
        self.presets.insert(preset.id.clone(), preset.clone());
        Ok(())
    }

    fn get_preset(&self, preset_id: &str) -> Result<Option<Preset>, StoreError> {
        Ok(self.presets.get(preset_id).cloned())
    }

    fn list_presets(&self, user_id: &str) -> Result<Vec<Preset>, StoreError> {
        let mut list: Vec<Preset> = self
            .presets
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| {
            b.is_favorite
                .cmp(&a.is_favorite)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(list)
    }

    fn delete_preset(&mut self, preset_id: &str) -> Result<bool, StoreError> {
        Ok(self.presets.remove(preset_id).is_some())
    }
}
