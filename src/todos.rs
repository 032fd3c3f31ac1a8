// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::SharedConn;
use crate::models::{Todo, TodoStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

/// Partial update; unset fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct TodoUpdate {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub status: Option<TodoStatus>,
}

impl TodoUpdate {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none() && self.status.is_none()
    }
}

/// Per-user todo items. Every operation is scoped by user id; an id that
/// belongs to another user behaves exactly like an id that does not exist.
pub struct TodoStore {
    conn: SharedConn,
}

impl TodoStore {
    pub fn new(conn: SharedConn) -> Self {
        Self { conn }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Todo>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, text, completed, status, created_at, updated_at FROM todos
             WHERE user_id=?1 ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_todo)?;
        let mut todos = Vec::new();
        for row in rows {
            todos.push(row?);
        }
        Ok(todos)
    }

    pub async fn create(
        &self,
        user_id: &str,
        text: String,
        completed: bool,
        status: Option<TodoStatus>,
    ) -> Result<Todo> {
        let todo = Todo {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            text,
            completed,
            status: status.unwrap_or(TodoStatus::Todo),
            created_at: Utc::now(),
            updated_at: None,
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO todos(id, user_id, text, completed, status, created_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                todo.id,
                todo.user_id,
                todo.text,
                todo.completed,
                todo.status.as_str(),
                todo.created_at,
            ],
        )?;
        Ok(todo)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<Todo>> {
        let conn = self.conn.lock().await;
        find_todo(&conn, user_id, id)
    }

    /// Applies `changes` and stamps `updated_at`. Returns the stored item,
    /// or None when no such todo exists for this user.
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        changes: TodoUpdate,
    ) -> Result<Option<Todo>> {
        let conn = self.conn.lock().await;
        let Some(mut todo) = find_todo(&conn, user_id, id)? else {
            return Ok(None);
        };
        if let Some(text) = changes.text {
            todo.text = text;
        }
        if let Some(completed) = changes.completed {
            todo.completed = completed;
        }
        if let Some(status) = changes.status {
            todo.status = status;
        }
        todo.updated_at = Some(Utc::now());
        conn.execute(
            "UPDATE todos SET text=?1, completed=?2, status=?3, updated_at=?4
             WHERE id=?5 AND user_id=?6",
            params![
                todo.text,
                todo.completed,
                todo.status.as_str(),
                todo.updated_at,
                id,
                user_id,
            ],
        )?;
        Ok(Some(todo))
    }

    /// Removes the todo and returns what was deleted, None if it was not there.
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<Option<Todo>> {
        let conn = self.conn.lock().await;
        let Some(todo) = find_todo(&conn, user_id, id)? else {
            return Ok(None);
        };
        conn.execute(
            "DELETE FROM todos WHERE id=?1 AND user_id=?2",
            params![id, user_id],
        )?;
        Ok(Some(todo))
    }
}

fn find_todo(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Todo>> {
    let todo = conn
        .query_row(
            "SELECT id, user_id, text, completed, status, created_at, updated_at FROM todos
             WHERE id=?1 AND user_id=?2",
            params![id, user_id],
            row_to_todo,
        )
        .optional()?;
    Ok(todo)
}

fn row_to_todo(r: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: r.get(0)?,
        user_id: r.get(1)?,
        text: r.get(2)?,
        completed: r.get(3)?,
        status: TodoStatus::parse(&r.get::<_, String>(4)?),
        created_at: r.get::<_, DateTime<Utc>>(5)?,
        updated_at: r.get::<_, Option<DateTime<Utc>>>(6)?,
    })
}
