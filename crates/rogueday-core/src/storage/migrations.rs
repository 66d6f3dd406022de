//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users, runs, tasks and extractions.
///
/// The partial unique index on `runs` keeps a user to one active run even
/// if two writers race past the engine's own check.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id                    TEXT PRIMARY KEY,
            total_xp              INTEGER NOT NULL DEFAULT 0,
            total_extractions     INTEGER NOT NULL DEFAULT 0,
            total_tasks_completed INTEGER NOT NULL DEFAULT 0,
            total_focus_minutes   INTEGER NOT NULL DEFAULT 0,
            current_streak        INTEGER NOT NULL DEFAULT 0,
            best_streak           INTEGER NOT NULL DEFAULT 0,
            last_extraction_date  TEXT,
            created_at            TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS runs (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL,
            run_date            TEXT NOT NULL,
            daily_xp            INTEGER NOT NULL DEFAULT 0,
            penalty_xp          INTEGER NOT NULL DEFAULT 0,
            current_energy      INTEGER NOT NULL,
            max_energy          INTEGER NOT NULL,
            total_focus_minutes INTEGER NOT NULL DEFAULT 0,
            status              TEXT NOT NULL DEFAULT 'active',
            started_at          TEXT NOT NULL,
            extracted_at        TEXT
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_runs_one_active
            ON runs(user_id) WHERE status = 'active';
        CREATE INDEX IF NOT EXISTS idx_runs_user_started ON runs(user_id, started_at);

        CREATE TABLE IF NOT EXISTS tasks (
            id           TEXT PRIMARY KEY,
            run_id       TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            position     INTEGER NOT NULL,
            title        TEXT NOT NULL,
            tier         INTEGER NOT NULL,
            duration     INTEGER NOT NULL,
            status       TEXT NOT NULL DEFAULT 'pending',
            xp_earned    INTEGER NOT NULL DEFAULT 0,
            energy_cost  INTEGER NOT NULL,
            use_timer    INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL,
            started_at   TEXT,
            completed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_run_position ON tasks(run_id, position);

        CREATE TABLE IF NOT EXISTS extractions (
            id                      TEXT PRIMARY KEY,
            user_id                 TEXT NOT NULL,
            run_id                  TEXT NOT NULL UNIQUE,
            run_date                TEXT NOT NULL,
            final_xp                INTEGER NOT NULL,
            xp_before_penalties     INTEGER NOT NULL,
            penalty_xp              INTEGER NOT NULL,
            tasks_completed         INTEGER NOT NULL,
            tasks_failed            INTEGER NOT NULL,
            tasks_total             INTEGER NOT NULL,
            total_focus_minutes     INTEGER NOT NULL,
            t1_completed            INTEGER NOT NULL DEFAULT 0,
            t2_completed            INTEGER NOT NULL DEFAULT 0,
            t3_completed            INTEGER NOT NULL DEFAULT 0,
            t1_failed               INTEGER NOT NULL DEFAULT 0,
            t2_failed               INTEGER NOT NULL DEFAULT 0,
            t3_failed               INTEGER NOT NULL DEFAULT 0,
            completed_with_timer    INTEGER NOT NULL DEFAULT 0,
            completed_without_timer INTEGER NOT NULL DEFAULT 0,
            created_at              TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_extractions_user_created
            ON extractions(user_id, created_at);",
    )?;

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [1])?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: task templates and presets.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS task_templates (
            id         TEXT PRIMARY KEY,
            user_id    TEXT NOT NULL,
            title      TEXT NOT NULL,
            tier       INTEGER NOT NULL,
            duration   INTEGER NOT NULL,
            use_timer  INTEGER NOT NULL DEFAULT 0,
            category   TEXT,
            source     TEXT NOT NULL DEFAULT 'manual',
            times_used INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_templates_user ON task_templates(user_id);

        CREATE TABLE IF NOT EXISTS presets (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            name        TEXT NOT NULL,
            emoji       TEXT,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS preset_templates (
            preset_id   TEXT NOT NULL REFERENCES presets(id) ON DELETE CASCADE,
            template_id TEXT NOT NULL REFERENCES task_templates(id) ON DELETE CASCADE,
            position    INTEGER NOT NULL,
            PRIMARY KEY (preset_id, position)
        );",
    )?;

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [2])?;
    tx.commit()?;
    Ok(())
}

/// Migration v3: optimistic-lock counter on runs.
///
/// Every run write bumps `version`; a write carrying an older version than
/// the stored one is rejected.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch("ALTER TABLE runs ADD COLUMN version INTEGER NOT NULL DEFAULT 0;")?;
    set_schema_version(&tx, 3)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            > 0
    }

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        for table in [
            "users",
            "runs",
            "tasks",
            "extractions",
            "task_templates",
            "presets",
            "preset_templates",
        ] {
            assert!(table_exists(&conn, table), "missing table {table}");
        }
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn second_active_run_is_rejected_by_schema() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let insert = "INSERT INTO runs (id, user_id, run_date, current_energy, max_energy, status, started_at)
                      VALUES (?1, 'u', '2026-01-01', 50, 50, 'active', '2026-01-01T00:00:00+00:00')";
        conn.execute(insert, ["r1"]).unwrap();
        assert!(conn.execute(insert, ["r2"]).is_err());
    }

    #[test]
    fn v2_database_gains_run_version() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        migrate_v2(&conn).unwrap();
        conn.execute(
            "INSERT INTO runs (id, user_id, run_date, current_energy, max_energy, status, started_at)
             VALUES ('r1', 'u', '2026-01-01', 50, 50, 'active', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 3);
        let version: i64 = conn
            .query_row("SELECT version FROM runs WHERE id = 'r1'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 0);
    }
}
