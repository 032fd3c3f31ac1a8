// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::ledger::NewExpense;
use crate::models::Expense;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBudgetBody {
    pub monthly_budget: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddExpenseBody {
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Shape served when the user has no budget record for the month yet.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DefaultBudget {
    monthly_budget: Decimal,
    expenses: Vec<Expense>,
}

pub async fn current_budget_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Response> {
    match state.ledger.current_budget(&user).await? {
        Some(budget) => Ok(Json(budget).into_response()),
        None => Ok(Json(DefaultBudget {
            monthly_budget: state.ledger.default_budget(),
            expenses: Vec::new(),
        })
        .into_response()),
    }
}

pub async fn set_monthly_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    body: Result<Json<SetBudgetBody>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(body) = body.map_err(|_| ApiError::validation("Invalid JSON body"))?;
    let amount = body
        .monthly_budget
        .filter(|a| *a > Decimal::ZERO)
        .ok_or_else(|| ApiError::validation("Invalid monthly budget amount"))?;
    state.ledger.set_monthly_budget(&user, amount).await?;
    Ok(Json(json!({ "message": "Monthly budget updated successfully" })))
}

pub async fn add_expense_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    body: Result<Json<AddExpenseBody>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(body) = body.map_err(|_| ApiError::validation("Invalid JSON body"))?;
    let category = body
        .category
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Invalid expense data"))?;
    let amount = body
        .amount
        .filter(|a| *a > Decimal::ZERO)
        .ok_or_else(|| ApiError::validation("Invalid expense data"))?;
    state
        .ledger
        .add_expense(
            &user,
            NewExpense {
                category,
                amount,
                description: body.description,
                date: body.date,
            },
        )
        .await?;
    Ok(Json(json!({ "message": "Expense added successfully" })))
}

pub async fn expenses_by_category_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Json<BTreeMap<String, Decimal>>> {
    let totals = state.ledger.expenses_by_category(&user).await?;
    Ok(Json(totals))
}

pub async fn total_expenses_handler(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Json<serde_json::Value>> {
    let total = state.ledger.total_expenses(&user).await?;
    Ok(Json(json!({ "total": total })))
}
