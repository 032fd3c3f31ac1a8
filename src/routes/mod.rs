// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod budget;
pub mod todos;

use crate::auth::{require_auth, AuthVerifier};
use crate::config::ServerConfig;
use crate::db::SharedConn;
use crate::error::ApiError;
use crate::ledger::BudgetLedger;
use crate::todos::TodoStore;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<BudgetLedger>,
    pub todos: Arc<TodoStore>,
    pub verifier: Arc<dyn AuthVerifier>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(conn: SharedConn, config: ServerConfig, verifier: Arc<dyn AuthVerifier>) -> Self {
        let ledger = Arc::new(BudgetLedger::new(conn.clone(), config.default_monthly_budget));
        let todos = Arc::new(TodoStore::new(conn));
        Self {
            ledger,
            todos,
            verifier,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/budget/current", get(budget::current_budget_handler))
        .route("/budget/monthly", post(budget::set_monthly_handler))
        .route("/budget/expenses", post(budget::add_expense_handler))
        .route(
            "/budget/expenses/categories",
            get(budget::expenses_by_category_handler),
        )
        .route("/budget/expenses/total", get(budget::total_expenses_handler))
        .route(
            "/todos",
            get(todos::list_handler).post(todos::create_handler),
        )
        .route(
            "/todos/:id",
            get(todos::get_handler)
                .put(todos::update_handler)
                .delete(todos::delete_handler),
        )
        .route_layer(from_fn_with_state(state.verifier.clone(), require_auth));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .fallback(not_found_handler)
        .layer(from_fn_with_state(state.clone(), cors_middleware))
        .layer(from_fn(trace_requests))
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found_handler() -> ApiError {
    ApiError::not_found("not found")
}

/// One span per request; the status line is logged when the response is built.
async fn trace_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let span = tracing::info_span!("http.request", method = %method, path = %path);
    async move {
        let started = Instant::now();
        let response = next.run(req).await;
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request complete"
        );
        response
    }
    .instrument(span)
    .await
}

async fn cors_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        apply_cors(&state, origin.as_deref(), resp.headers_mut());
        return resp;
    }
    let mut resp = next.run(req).await;
    apply_cors(&state, origin.as_deref(), resp.headers_mut());
    resp
}

fn apply_cors(state: &AppState, origin: Option<&str>, headers: &mut HeaderMap) {
    let Some(origin) = origin else { return };
    if !state.config.allows_origin(origin) {
        return;
    }
    if let Ok(v) = HeaderValue::from_str(origin) {
        headers.insert("access-control-allow-origin", v);
    }
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("authorization,content-type"),
    );
}
