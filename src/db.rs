// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.studydesk", "Studydesk", "studydesk"));

/// Connection handle shared by the async handlers. Each operation takes the
/// lock, runs its statements, and releases it before anything awaits.
pub type SharedConn = Arc<Mutex<Connection>>;

pub fn shared(conn: Connection) -> SharedConn {
    Arc::new(Mutex::new(conn))
}

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("studydesk.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    open_at(&path)
}

pub fn open_at(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("Open in-memory DB")?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        monthly_budget TEXT NOT NULL,
        current_month TEXT NOT NULL,
        UNIQUE(user_id, current_month)
    );

    CREATE TABLE IF NOT EXISTS expenses(
        id TEXT PRIMARY KEY,
        budget_id INTEGER NOT NULL,
        user_id TEXT NOT NULL,
        category TEXT NOT NULL,
        amount TEXT NOT NULL,
        date TEXT NOT NULL,
        description TEXT,
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_expenses_budget ON expenses(budget_id);

    CREATE TABLE IF NOT EXISTS todos(
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        text TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'todo',
        created_at TEXT NOT NULL,
        updated_at TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_todos_user ON todos(user_id);
    "#,
    )?;
    Ok(())
}
