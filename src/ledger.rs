// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::SharedConn;
use crate::models::{Budget, Expense};
use crate::utils::{current_month, month_start};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Expense as submitted by a caller; id and budget row are assigned here.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Per-user monthly budgets with their expenses. All reads and writes are
/// scoped to one user and one month; "current" always means the wall-clock
/// month at call time.
pub struct BudgetLedger {
    conn: SharedConn,
    default_budget: Decimal,
}

impl BudgetLedger {
    pub fn new(conn: SharedConn, default_budget: Decimal) -> Self {
        Self { conn, default_budget }
    }

    pub fn default_budget(&self) -> Decimal {
        self.default_budget
    }

    /// The user's budget for the current month, if one exists yet.
    pub async fn current_budget(&self, user_id: &str) -> Result<Option<Budget>> {
        self.budget_for_month(user_id, current_month()).await
    }

    /// `month` may be any day; it is normalized to the month's period key.
    pub async fn budget_for_month(
        &self,
        user_id: &str,
        month: NaiveDate,
    ) -> Result<Option<Budget>> {
        let month = month_start(month);
        let conn = self.conn.lock().await;
        load_budget(&conn, user_id, month)
    }

    /// Creates or replaces the cap on the current month's budget.
    pub async fn set_monthly_budget(&self, user_id: &str, amount: Decimal) -> Result<Budget> {
        self.set_budget_for_month(user_id, current_month(), amount)
            .await
    }

    pub async fn set_budget_for_month(
        &self,
        user_id: &str,
        month: NaiveDate,
        amount: Decimal,
    ) -> Result<Budget> {
        let month = month_start(month);
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO budgets(user_id, monthly_budget, current_month) VALUES (?1,?2,?3)
             ON CONFLICT(user_id, current_month) DO UPDATE SET monthly_budget=excluded.monthly_budget",
            params![user_id, amount.to_string(), month],
        )?;
        load_budget(&conn, user_id, month)?
            .context("Budget row missing right after upsert")
    }

    /// Records an expense against the current month, creating the month's
    /// budget with the default cap when the user has none yet.
    pub async fn add_expense(&self, user_id: &str, expense: NewExpense) -> Result<Expense> {
        self.add_expense_for_month(user_id, current_month(), expense)
            .await
    }

    pub async fn add_expense_for_month(
        &self,
        user_id: &str,
        month: NaiveDate,
        expense: NewExpense,
    ) -> Result<Expense> {
        let month = month_start(month);
        let conn = self.conn.lock().await;
        let budget_id = ensure_budget(&conn, user_id, month, self.default_budget)?;
        let recorded = Expense {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            category: expense.category,
            amount: expense.amount,
            date: expense.date.unwrap_or_else(Utc::now),
            description: expense.description,
        };
        conn.execute(
            "INSERT INTO expenses(id, budget_id, user_id, category, amount, date, description)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                recorded.id,
                budget_id,
                recorded.user_id,
                recorded.category,
                recorded.amount.to_string(),
                recorded.date,
                recorded.description,
            ],
        )?;
        Ok(recorded)
    }

    /// Current-month spending summed per category. Empty when the user has
    /// no budget for the month.
    pub async fn expenses_by_category(&self, user_id: &str) -> Result<BTreeMap<String, Decimal>> {
        self.expenses_by_category_for_month(user_id, current_month())
            .await
    }

    pub async fn expenses_by_category_for_month(
        &self,
        user_id: &str,
        month: NaiveDate,
    ) -> Result<BTreeMap<String, Decimal>> {
        let month = month_start(month);
        let conn = self.conn.lock().await;
        let mut totals = BTreeMap::new();
        let Some(budget_id) = find_budget_id(&conn, user_id, month)? else {
            return Ok(totals);
        };
        let mut stmt =
            conn.prepare("SELECT category, amount FROM expenses WHERE budget_id=?1")?;
        let rows = stmt.query_map(params![budget_id], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (category, amount_s) = row?;
            let amount = parse_amount(&amount_s)?;
            *totals.entry(category).or_insert(Decimal::ZERO) += amount;
        }
        Ok(totals)
    }

    /// Total current-month spending across all categories.
    pub async fn total_expenses(&self, user_id: &str) -> Result<Decimal> {
        self.total_expenses_for_month(user_id, current_month()).await
    }

    pub async fn total_expenses_for_month(
        &self,
        user_id: &str,
        month: NaiveDate,
    ) -> Result<Decimal> {
        let month = month_start(month);
        let conn = self.conn.lock().await;
        let Some(budget_id) = find_budget_id(&conn, user_id, month)? else {
            return Ok(Decimal::ZERO);
        };
        let mut stmt = conn.prepare("SELECT amount FROM expenses WHERE budget_id=?1")?;
        let rows = stmt.query_map(params![budget_id], |r| r.get::<_, String>(0))?;
        let mut total = Decimal::ZERO;
        for row in rows {
            total += parse_amount(&row?)?;
        }
        Ok(total)
    }
}

fn find_budget_id(conn: &Connection, user_id: &str, month: NaiveDate) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM budgets WHERE user_id=?1 AND current_month=?2",
            params![user_id, month],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Finds the month's budget row or creates it with the default cap. The
/// unique key on (user_id, current_month) makes concurrent first calls
/// converge on a single row.
fn ensure_budget(
    conn: &Connection,
    user_id: &str,
    month: NaiveDate,
    default_budget: Decimal,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO budgets(user_id, monthly_budget, current_month) VALUES (?1,?2,?3)
         ON CONFLICT(user_id, current_month) DO NOTHING",
        params![user_id, default_budget.to_string(), month],
    )?;
    find_budget_id(conn, user_id, month)?.context("Budget row missing right after insert")
}

fn load_budget(conn: &Connection, user_id: &str, month: NaiveDate) -> Result<Option<Budget>> {
    let row: Option<(i64, String, NaiveDate)> = conn
        .query_row(
            "SELECT id, monthly_budget, current_month FROM budgets
             WHERE user_id=?1 AND current_month=?2",
            params![user_id, month],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    let Some((id, cap_s, current_month)) = row else {
        return Ok(None);
    };
    Ok(Some(Budget {
        id,
        user_id: user_id.to_string(),
        monthly_budget: parse_amount(&cap_s)?,
        current_month,
        expenses: load_expenses(conn, id)?,
    }))
}

fn load_expenses(conn: &Connection, budget_id: i64) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, category, amount, date, description FROM expenses
         WHERE budget_id=?1 ORDER BY date, id",
    )?;
    let rows = stmt.query_map(params![budget_id], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, DateTime<Utc>>(4)?,
            r.get::<_, Option<String>>(5)?,
        ))
    })?;
    let mut expenses = Vec::new();
    for row in rows {
        let (id, user_id, category, amount_s, date, description) = row?;
        expenses.push(Expense {
            id,
            user_id,
            category,
            amount: parse_amount(&amount_s)?,
            date,
            description,
        });
    }
    Ok(expenses)
}

fn parse_amount(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid stored amount '{}'", s))
}
