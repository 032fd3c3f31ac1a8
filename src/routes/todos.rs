// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{Todo, TodoStatus};
use crate::todos::TodoUpdate;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoBody {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub status: Option<TodoStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoBody {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub status: Option<TodoStatus>,
}

pub async fn list_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Todo>>> {
    let todos = state.todos.list(&user).await?;
    Ok(Json(todos))
}

pub async fn create_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    body: Result<Json<CreateTodoBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Todo>)> {
    let Json(body) = body.map_err(|_| ApiError::validation("Invalid JSON body"))?;
    let text = body
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Todo text is required"))?;
    let todo = state
        .todos
        .create(&user, text, body.completed.unwrap_or(false), body.status)
        .await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn get_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Todo>> {
    let todo = state
        .todos
        .get(&user, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Todo not found"))?;
    Ok(Json(todo))
}

pub async fn update_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Result<Json<UpdateTodoBody>, JsonRejection>,
) -> ApiResult<Json<Todo>> {
    let Json(body) = body.map_err(|_| ApiError::validation("Invalid JSON body"))?;
    if let Some(text) = &body.text {
        if text.trim().is_empty() {
            return Err(ApiError::validation("Todo text is required"));
        }
    }
    let changes = TodoUpdate {
        text: body.text,
        completed: body.completed,
        status: body.status,
    };
    if changes.is_empty() {
        return Err(ApiError::validation("Nothing to update"));
    }
    let todo = state
        .todos
        .update(&user, &id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Todo not found"))?;
    Ok(Json(todo))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Todo>> {
    let todo = state
        .todos
        .delete(&user, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Todo not found"))?;
    Ok(Json(todo))
}
