//! SQLite-backed `RunStore`.
//!
//! Timestamps are stored as RFC 3339 strings and run dates as `YYYY-MM-DD`.
//! Rows are read into plain structs first and converted afterwards, so a
//! malformed value surfaces as `StoreError::Corrupt` naming its table.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::energy::EnergyLedger;
use crate::error::StoreError;
use crate::preset::{Preset, TaskTemplate, TemplateSource};
use crate::run::{Extraction, Run, RunStatus, TierBreakdown};
use crate::task::{Task, TaskStatus};
use crate::tier::TierLevel;
use crate::user::{LifetimeStats, User};

use super::data_dir;
use super::migrations;
use super::store::RunStore;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How long a writer waits for another process's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database for runs, users, extractions, templates and presets.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/rogueday.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Self::open_at(dir.join("rogueday.db"))
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn load_tasks(&self, run_id: &str) -> Result<Vec<Task>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, title, tier, duration, status, xp_earned, energy_cost,
                    use_timer, created_at, started_at, completed_at
             FROM tasks WHERE run_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map([run_id], TaskRow::read)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_task()?);
        }
        Ok(tasks)
    }

    fn load_runs(&self, sql: &str, user_id: &str) -> Result<Vec<Run>, StoreError> {
        let headers: Vec<RunRow> = {
            let mut stmt = self.conn.prepare(sql)?;
            let rows = stmt.query_map([user_id], RunRow::read)?;
            rows.collect::<Result<_, _>>()?
        };
        let mut runs = Vec::with_capacity(headers.len());
        for header in headers {
            let tasks = self.load_tasks(&header.id)?;
            runs.push(header.into_run(tasks)?);
        }
        Ok(runs)
    }

    fn load_template_ids(&self, preset_id: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT template_id FROM preset_templates WHERE preset_id = ?1 ORDER BY position",
        )?;
        let ids = stmt
            .query_map([preset_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn hydrate_presets(&self, rows: Vec<PresetRow>) -> Result<Vec<Preset>, StoreError> {
        let mut presets = Vec::with_capacity(rows.len());
        for row in rows {
            let template_ids = self.load_template_ids(&row.id)?;
            presets.push(row.into_preset(template_ids)?);
        }
        Ok(presets)
    }
}

const RUN_COLUMNS: &str = "id, user_id, run_date, daily_xp, penalty_xp, current_energy, max_energy,
                           total_focus_minutes, status, started_at, extracted_at, version";

const EXTRACTION_COLUMNS: &str = "id, user_id, run_id, run_date, final_xp, xp_before_penalties,
    penalty_xp, tasks_completed, tasks_failed, tasks_total, total_focus_minutes,
    t1_completed, t2_completed, t3_completed, t1_failed, t2_failed, t3_failed,
    completed_with_timer, completed_without_timer, created_at";

const TEMPLATE_COLUMNS: &str =
    "id, user_id, title, tier, duration, use_timer, category, source, times_used, created_at";

impl RunStore for SqliteStore {
    fn load_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, total_xp, total_extractions, total_tasks_completed, total_focus_minutes,
                        current_streak, best_streak, last_extraction_date, created_at
                 FROM users WHERE id = ?1",
                [user_id],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        stats: LifetimeStats {
                            total_xp: row.get::<_, i64>(1)? as u64,
                            total_extractions: row.get(2)?,
                            total_tasks_completed: row.get(3)?,
                            total_focus_minutes: row.get(4)?,
                            current_streak: row.get(5)?,
                            best_streak: row.get(6)?,
                        },
                        last_extraction_date: row.get(7)?,
                        created_at: row.get(8)?,
                    })
                },
            )
            .optional()?;
        row.map(UserRow::into_user).transpose()
    }

    fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        write_user(&self.conn, user)
    }

    fn current_run(&self, user_id: &str) -> Result<Option<Run>, StoreError> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM runs
             WHERE user_id = ?1 AND status = 'active'
             ORDER BY started_at DESC LIMIT 1"
        );
        Ok(self.load_runs(&sql, user_id)?.into_iter().next())
    }

    fn save_run(&mut self, run: &mut Run) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let version = write_run(&tx, run)?;
        tx.commit()?;
        run.version = version;
        Ok(())
    }

    fn settle_run(
        &mut self,
        run: &mut Run,
        extraction: &Extraction,
        user: &User,
    ) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let version = write_run(&tx, run)?;
        write_extraction(&tx, extraction)?;
        write_user(&tx, user)?;
        tx.commit()?;
        run.version = version;
        Ok(())
    }

    fn list_runs(&self, user_id: &str) -> Result<Vec<Run>, StoreError> {
        let sql = format!("SELECT {RUN_COLUMNS} FROM runs WHERE user_id = ?1 ORDER BY started_at DESC");
        self.load_runs(&sql, user_id)
    }

    fn find_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT t.id, t.run_id, t.title, t.tier, t.duration, t.status, t.xp_earned,
                        t.energy_cost, t.use_timer, t.created_at, t.started_at, t.completed_at
                 FROM tasks t JOIN runs r ON r.id = t.run_id
                 WHERE r.user_id = ?1 AND t.id = ?2",
                [user_id, task_id],
                TaskRow::read,
            )
            .optional()?;
        row.map(TaskRow::into_task).transpose()
    }

    fn save_extraction(&mut self, extraction: &Extraction) -> Result<(), StoreError> {
        write_extraction(&self.conn, extraction)
    }

    fn list_extractions(&self, user_id: &str) -> Result<Vec<Extraction>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EXTRACTION_COLUMNS} FROM extractions
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([user_id], ExtractionRow::read)?;
        let mut list = Vec::new();
        for row in rows {
            list.push(row?.into_extraction()?);
        }
        Ok(list)
    }

    fn save_template(&mut self, t: &TaskTemplate) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO task_templates ({TEMPLATE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    tier = excluded.tier,
                    duration = excluded.duration,
                    use_timer = excluded.use_timer,
                    category = excluded.category,
                    times_used = excluded.times_used"
            ),
            params![
                t.id,
                t.user_id,
                t.title,
                t.tier.as_u8(),
                t.duration,
                t.use_timer,
                t.category,
                t.source.as_str(),
                t.times_used,
                t.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_template(&self, template_id: &str) -> Result<Option<TaskTemplate>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TEMPLATE_COLUMNS} FROM task_templates WHERE id = ?1"),
                [template_id],
                TemplateRow::read,
            )
            .optional()?;
        row.map(TemplateRow::into_template).transpose()
    }

    fn list_templates(
        &self,
        user_id: &str,
        category: Option<&str>,
    ) -> Result<Vec<TaskTemplate>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM task_templates
             WHERE user_id = ?1 AND (?2 IS NULL OR category = ?2)
             ORDER BY times_used DESC, created_at DESC, id"
        ))?;
        let rows = stmt.query_map(params![user_id, category], TemplateRow::read)?;
        let mut list = Vec::new();
        for row in rows {
            list.push(row?.into_template()?);
        }
        Ok(list)
    }

    fn delete_template(&mut self, template_id: &str) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM preset_templates WHERE template_id = ?1",
            [template_id],
        )?;
        let removed = tx.execute("DELETE FROM task_templates WHERE id = ?1", [template_id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn record_template_use(&mut self, template_id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE task_templates SET times_used = times_used + 1 WHERE id = ?1",
            [template_id],
        )?;
        Ok(())
    }

    fn save_preset(&mut self, preset: &Preset) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO presets (id, user_id, name, emoji, is_favorite, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                emoji = excluded.emoji,
                is_favorite = excluded.is_favorite",
            params![
                preset.id,
                preset.user_id,
                preset.name,
                preset.emoji,
                preset.is_favorite,
                preset.created_at.to_rfc3339(),
            ],
        )?;
        tx.execute("DELETE FROM preset_templates WHERE preset_id = ?1", [&preset.id])?;
        for (position, template_id) in preset.template_ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO preset_templates (preset_id, template_id, position) VALUES (?1, ?2, ?3)",
                params![preset.id, template_id, position as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_preset(&self, preset_id: &str) -> Result<Option<Preset>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, name, emoji, is_favorite, created_at FROM presets WHERE id = ?1",
                [preset_id],
                PresetRow::read,
            )
            .optional()?;
        match row {
            Some(row) => Ok(self.hydrate_presets(vec![row])?.pop()),
            None => Ok(None),
        }
    }

    fn list_presets(&self, user_id: &str) -> Result<Vec<Preset>, StoreError> {
        let rows: Vec<PresetRow> = {
            let mut stmt = self.conn.prepare(
                "SELECT id, user_id, name, emoji, is_favorite, created_at FROM presets
                 WHERE user_id = ?1 ORDER BY is_favorite DESC, created_at DESC, id",
            )?;
            let rows = stmt.query_map([user_id], PresetRow::read)?;
            rows.collect::<Result<_, _>>()?
        };
        self.hydrate_presets(rows)
    }

    fn delete_preset(&mut self, preset_id: &str) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM preset_templates WHERE preset_id = ?1", [preset_id])?;
        let removed = tx.execute("DELETE FROM presets WHERE id = ?1", [preset_id])?;
        tx.commit()?;
        Ok(removed > 0)
    }
}

/// Upsert a run and replace its tasks. Returns the run's new version.
///
/// Callers wrap this in a transaction.
fn write_run(conn: &Connection, run: &Run) -> Result<u64, StoreError> {
    let updated = conn.execute(
        "UPDATE runs SET daily_xp = ?3, penalty_xp = ?4, current_energy = ?5, max_energy = ?6,
                         total_focus_minutes = ?7, status = ?8, extracted_at = ?9,
                         version = version + 1
         WHERE id = ?1 AND version = ?2",
        params![
            run.id,
            run.version as i64,
            run.daily_xp,
            run.penalty_xp,
            run.energy.current,
            run.energy.max,
            run.total_focus_minutes,
            run.status.as_str(),
            run.extracted_at.map(|t| t.to_rfc3339()),
        ],
    )?;

    let version = if updated == 1 {
        run.version + 1
    } else {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM runs WHERE id = ?1)",
            [&run.id],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::StaleWrite {
                run_id: run.id.clone(),
            });
        }
        conn.execute(
            "INSERT INTO runs (id, user_id, run_date, daily_xp, penalty_xp, current_energy,
                               max_energy, total_focus_minutes, status, started_at, extracted_at,
                               version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                run.id,
                run.user_id,
                run.run_date.format(DATE_FORMAT).to_string(),
                run.daily_xp,
                run.penalty_xp,
                run.energy.current,
                run.energy.max,
                run.total_focus_minutes,
                run.status.as_str(),
                run.started_at.to_rfc3339(),
                run.extracted_at.map(|t| t.to_rfc3339()),
                run.version as i64,
            ],
        )?;
        run.version
    };

    conn.execute("DELETE FROM tasks WHERE run_id = ?1", [&run.id])?;
    let mut insert = conn.prepare(
        "INSERT INTO tasks (id, run_id, position, title, tier, duration, status, xp_earned,
                            energy_cost, use_timer, created_at, started_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )?;
    for (position, task) in run.tasks.iter().enumerate() {
        insert.execute(params![
            task.id,
            run.id,
            position as i64,
            task.title,
            task.tier.as_u8(),
            task.duration,
            task.status.as_str(),
            task.xp_earned,
            task.energy_cost,
            task.use_timer,
            task.created_at.to_rfc3339(),
            task.started_at.map(|t| t.to_rfc3339()),
            task.completed_at.map(|t| t.to_rfc3339()),
        ])?;
    }
    Ok(version)
}

fn write_extraction(conn: &Connection, e: &Extraction) -> Result<(), StoreError> {
    conn.execute(
        &format!(
            "INSERT INTO extractions ({EXTRACTION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20)"
        ),
        params![
            e.id,
            e.user_id,
            e.run_id,
            e.run_date.format(DATE_FORMAT).to_string(),
            e.final_xp,
            e.xp_before_penalties,
            e.penalty_xp,
            e.tasks_completed,
            e.tasks_failed,
            e.tasks_total,
            e.total_focus_minutes,
            e.completed_by_tier.t1,
            e.completed_by_tier.t2,
            e.completed_by_tier.t3,
            e.failed_by_tier.t1,
            e.failed_by_tier.t2,
            e.failed_by_tier.t3,
            e.completed_with_timer,
            e.completed_without_timer,
            e.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn write_user(conn: &Connection, user: &User) -> Result<(), StoreError> {
    let s = &user.stats;
    conn.execute(
        "INSERT INTO users (id, total_xp, total_extractions, total_tasks_completed,
                            total_focus_minutes, current_streak, best_streak,
                            last_extraction_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
            total_xp = excluded.total_xp,
            total_extractions = excluded.total_extractions,
            total_tasks_completed = excluded.total_tasks_completed,
            total_focus_minutes = excluded.total_focus_minutes,
            current_streak = excluded.current_streak,
            best_streak = excluded.best_streak,
            last_extraction_date = excluded.last_extraction_date",
        params![
            user.id,
            s.total_xp as i64,
            s.total_extractions,
            s.total_tasks_completed,
            s.total_focus_minutes,
            s.current_streak,
            s.best_streak,
            user.last_extraction_date.map(|d| d.format(DATE_FORMAT).to_string()),
            user.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn parse_timestamp(table: &'static str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            table,
            message: format!("bad timestamp {value:?}: {e}"),
        })
}

fn parse_optional_timestamp(
    table: &'static str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    value.map(|v| parse_timestamp(table, &v)).transpose()
}

fn parse_date(table: &'static str, value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| StoreError::Corrupt {
        table,
        message: format!("bad date {value:?}: {e}"),
    })
}

fn parse_tier(table: &'static str, value: u8) -> Result<TierLevel, StoreError> {
    TierLevel::try_from(value).map_err(|e| StoreError::Corrupt {
        table,
        message: e.to_string(),
    })
}

fn corrupt(table: &'static str) -> impl Fn(String) -> StoreError {
    move |message| StoreError::Corrupt { table, message }
}

struct UserRow {
    id: String,
    stats: LifetimeStats,
    last_extraction_date: Option<String>,
    created_at: String,
}

impl UserRow {
    fn into_user(self) -> Result<User, StoreError> {
        Ok(User {
            id: self.id,
            stats: self.stats,
            last_extraction_date: self
                .last_extraction_date
                .map(|d| parse_date("users", &d))
                .transpose()?,
            created_at: parse_timestamp("users", &self.created_at)?,
        })
    }
}

struct RunRow {
    id: String,
    user_id: String,
    run_date: String,
    daily_xp: u32,
    penalty_xp: u32,
    energy: EnergyLedger,
    total_focus_minutes: u32,
    status: String,
    started_at: String,
    extracted_at: Option<String>,
    version: i64,
}

impl RunRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            run_date: row.get(2)?,
            daily_xp: row.get(3)?,
            penalty_xp: row.get(4)?,
            energy: EnergyLedger {
                current: row.get(5)?,
                max: row.get(6)?,
            },
            total_focus_minutes: row.get(7)?,
            status: row.get(8)?,
            started_at: row.get(9)?,
            extracted_at: row.get(10)?,
            version: row.get(11)?,
        })
    }

    fn into_run(self, tasks: Vec<Task>) -> Result<Run, StoreError> {
        Ok(Run {
            run_date: parse_date("runs", &self.run_date)?,
            status: self.status.parse::<RunStatus>().map_err(corrupt("runs"))?,
            started_at: parse_timestamp("runs", &self.started_at)?,
            extracted_at: parse_optional_timestamp("runs", self.extracted_at)?,
            id: self.id,
            user_id: self.user_id,
            daily_xp: self.daily_xp,
            penalty_xp: self.penalty_xp,
            energy: self.energy,
            total_focus_minutes: self.total_focus_minutes,
            tasks,
            version: self.version as u64,
        })
    }
}

struct TaskRow {
    id: String,
    run_id: String,
    title: String,
    tier: u8,
    duration: u32,
    status: String,
    xp_earned: u32,
    energy_cost: u32,
    use_timer: bool,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
}

impl TaskRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            run_id: row.get(1)?,
            title: row.get(2)?,
            tier: row.get(3)?,
            duration: row.get(4)?,
            status: row.get(5)?,
            xp_earned: row.get(6)?,
            energy_cost: row.get(7)?,
            use_timer: row.get(8)?,
            created_at: row.get(9)?,
            started_at: row.get(10)?,
            completed_at: row.get(11)?,
        })
    }

    fn into_task(self) -> Result<Task, StoreError> {
        Ok(Task {
            tier: parse_tier("tasks", self.tier)?,
            status: self.status.parse::<TaskStatus>().map_err(corrupt("tasks"))?,
            created_at: parse_timestamp("tasks", &self.created_at)?,
            started_at: parse_optional_timestamp("tasks", self.started_at)?,
            completed_at: parse_optional_timestamp("tasks", self.completed_at)?,
            id: self.id,
            run_id: self.run_id,
            title: self.title,
            duration: self.duration,
            xp_earned: self.xp_earned,
            energy_cost: self.energy_cost,
            use_timer: self.use_timer,
        })
    }
}

struct ExtractionRow {
    id: String,
    user_id: String,
    run_id: String,
    run_date: String,
    counters: [u32; 15],
    created_at: String,
}

impl ExtractionRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut counters = [0u32; 15];
        for (i, slot) in counters.iter_mut().enumerate() {
            *slot = row.get(4 + i)?;
        }
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            run_id: row.get(2)?,
            run_date: row.get(3)?,
            counters,
            created_at: row.get(19)?,
        })
    }

    fn into_extraction(self) -> Result<Extraction, StoreError> {
        let [final_xp, xp_before_penalties, penalty_xp, tasks_completed, tasks_failed, tasks_total, total_focus_minutes, c1, c2, c3, f1, f2, f3, with_timer, without_timer] =
            self.counters;
        Ok(Extraction {
            run_date: parse_date("extractions", &self.run_date)?,
            created_at: parse_timestamp("extractions", &self.created_at)?,
            id: self.id,
            user_id: self.user_id,
            run_id: self.run_id,
            final_xp,
            xp_before_penalties,
            penalty_xp,
            tasks_completed,
            tasks_failed,
            tasks_total,
            total_focus_minutes,
            completed_by_tier: TierBreakdown {
                t1: c1,
                t2: c2,
                t3: c3,
            },
            failed_by_tier: TierBreakdown {
                t1: f1,
                t2: f2,
                t3: f3,
            },
            completed_with_timer: with_timer,
            completed_without_timer: without_timer,
        })
    }
}

struct TemplateRow {
    id: String,
    user_id: String,
    title: String,
    tier: u8,
    duration: u32,
    use_timer: bool,
    category: Option<String>,
    source: String,
    times_used: u32,
    created_at: String,
}

impl TemplateRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            tier: row.get(3)?,
            duration: row.get(4)?,
            use_timer: row.get(5)?,
            category: row.get(6)?,
            source: row.get(7)?,
            times_used: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_template(self) -> Result<TaskTemplate, StoreError> {
        Ok(TaskTemplate {
            tier: parse_tier("task_templates", self.tier)?,
            source: self
                .source
                .parse::<TemplateSource>()
                .map_err(corrupt("task_templates"))?,
            created_at: parse_timestamp("task_templates", &self.created_at)?,
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            duration: self.duration,
            use_timer: self.use_timer,
            category: self.category,
            times_used: self.times_used,
        })
    }
}

struct PresetRow {
    id: String,
    user_id: String,
    name: String,
    emoji: Option<String>,
    is_favorite: bool,
    created_at: String,
}

impl PresetRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            emoji: row.get(3)?,
            is_favorite: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_preset(self, template_ids: Vec<String>) -> Result<Preset, StoreError> {
        Ok(Preset {
            created_at: parse_timestamp("presets", &self.created_at)?,
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            emoji: self.emoji,
            is_favorite: self.is_favorite,
            template_ids,
        })
    }
}
