// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use studydesk::auth::{AuthVerifier, HmacVerifier, StaticTokenVerifier};
use studydesk::config::ServerConfig;
use studydesk::db;
use studydesk::routes::{build_router, AppState};
use tower::ServiceExt;

fn app() -> Router {
    let conn = db::open_in_memory().unwrap();
    let verifier: Arc<dyn AuthVerifier> = Arc::new(StaticTokenVerifier::new(vec![
        ("t-alice".to_string(), "alice".to_string()),
        ("t-bob".to_string(), "bob".to_string()),
    ]));
    let state = AppState::new(db::shared(conn), ServerConfig::default(), verifier);
    build_router(state)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_responds_without_auth() {
    let app = app();
    let (status, body) = call(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn missing_and_invalid_tokens_get_the_same_401() {
    let app = app();
    let (status, body) = call(&app, get("/budget/current", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "authentication required" }));

    let (status, body) = call(&app, get("/budget/current", Some("nonsense"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "authentication required" }));

    let (status, _) = call(
        &app,
        send_json("POST", "/todos", None, json!({ "text": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn current_budget_defaults_when_unset() {
    let app = app();
    let (status, body) = call(&app, get("/budget/current", Some("t-alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["monthlyBudget"].as_f64(), Some(1000.0));
    assert_eq!(body["expenses"], json!([]));
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn configured_default_cap_flows_into_responses() {
    let conn = db::open_in_memory().unwrap();
    let verifier: Arc<dyn AuthVerifier> = Arc::new(StaticTokenVerifier::new(vec![(
        "t-alice".to_string(),
        "alice".to_string(),
    )]));
    let config = ServerConfig {
        default_monthly_budget: Decimal::from(250),
        ..ServerConfig::default()
    };
    let app = build_router(AppState::new(db::shared(conn), config, verifier));

    // absent record reports the configured cap
    let (_, body) = call(&app, get("/budget/current", Some("t-alice"))).await;
    assert!(body.get("id").is_none());
    assert_eq!(body["monthlyBudget"].as_f64(), Some(250.0));

    // first expense creates the record with the same cap
    let (status, _) = call(
        &app,
        send_json(
            "POST",
            "/budget/expenses",
            Some("t-alice"),
            json!({ "category": "Food", "amount": 5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, get("/budget/current", Some("t-alice"))).await;
    assert!(body.get("id").is_some());
    assert_eq!(body["monthlyBudget"].as_f64(), Some(250.0));
}

#[tokio::test]
async fn set_monthly_budget_roundtrip() {
    let app = app();
    let (status, body) = call(
        &app,
        send_json(
            "POST",
            "/budget/monthly",
            Some("t-alice"),
            json!({ "monthlyBudget": 750 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "message": "Monthly budget updated successfully" })
    );

    let (status, body) = call(&app, get("/budget/current", Some("t-alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["monthlyBudget"].as_f64(), Some(750.0));
    assert_eq!(body["userId"], json!("alice"));
    assert_eq!(body["expenses"], json!([]));
    let month = body["currentMonth"].as_str().unwrap();
    assert!(month.ends_with("-01"), "period key is a first-of-month date");
}

#[tokio::test]
async fn set_monthly_budget_rejects_missing_zero_and_negative() {
    let app = app();
    for payload in [json!({}), json!({ "monthlyBudget": 0 }), json!({ "monthlyBudget": -5 })] {
        let (status, body) = call(
            &app,
            send_json("POST", "/budget/monthly", Some("t-alice"), payload),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid monthly budget amount" }));
    }

    // nothing persisted: still the default payload, no stored record
    let (_, body) = call(&app, get("/budget/current", Some("t-alice"))).await;
    assert!(body.get("id").is_none());
    assert_eq!(body["monthlyBudget"].as_f64(), Some(1000.0));
}

#[tokio::test]
async fn add_expense_and_read_aggregates() {
    let app = app();
    for payload in [
        json!({ "category": "Food", "amount": 12.5, "description": "lunch" }),
        json!({ "category": "Food", "amount": 7.5 }),
        json!({ "category": "Books", "amount": 30 }),
    ] {
        let (status, body) = call(
            &app,
            send_json("POST", "/budget/expenses", Some("t-alice"), payload),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Expense added successfully" }));
    }

    let (status, body) = call(&app, get("/budget/expenses/categories", Some("t-alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Food"].as_f64(), Some(20.0));
    assert_eq!(body["Books"].as_f64(), Some(30.0));

    let (status, body) = call(&app, get("/budget/expenses/total", Some("t-alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"].as_f64(), Some(50.0));

    let (_, body) = call(&app, get("/budget/current", Some("t-alice"))).await;
    assert_eq!(body["expenses"].as_array().unwrap().len(), 3);
    assert_eq!(body["expenses"][0]["description"], json!("lunch"));
    assert_eq!(body["expenses"][0]["userId"], json!("alice"));
}

#[tokio::test]
async fn add_expense_rejects_bad_payloads() {
    let app = app();
    for payload in [
        json!({ "amount": 5 }),
        json!({ "category": "", "amount": 5 }),
        json!({ "category": "Food" }),
        json!({ "category": "Food", "amount": 0 }),
        json!({ "category": "Food", "amount": -2 }),
    ] {
        let (status, body) = call(
            &app,
            send_json("POST", "/budget/expenses", Some("t-alice"), payload),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid expense data" }));
    }

    let (_, body) = call(&app, get("/budget/expenses/total", Some("t-alice"))).await;
    assert_eq!(body["total"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn malformed_json_body_is_400() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/budget/monthly")
        .header("content-type", "application/json")
        .header("authorization", "Bearer t-alice")
        .body(Body::from("not json"))
        .unwrap();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid JSON body" }));
}

#[tokio::test]
async fn budgets_are_separate_per_user() {
    let app = app();
    call(
        &app,
        send_json(
            "POST",
            "/budget/monthly",
            Some("t-alice"),
            json!({ "monthlyBudget": 600 }),
        ),
    )
    .await;
    let (_, body) = call(&app, get("/budget/current", Some("t-bob"))).await;
    assert_eq!(body["monthlyBudget"].as_f64(), Some(1000.0));
    assert_eq!(body["expenses"], json!([]));
}

#[tokio::test]
async fn todos_crud_over_http() {
    let app = app();
    let (status, created) = call(
        &app,
        send_json("POST", "/todos", Some("t-alice"), json!({ "text": "read" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["text"], json!("read"));
    assert_eq!(created["completed"], json!(false));
    assert_eq!(created["status"], json!("todo"));
    assert_eq!(created["userId"], json!("alice"));

    let (status, listed) = call(&app, get("/todos", Some("t-alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, updated) = call(
        &app,
        send_json(
            "PUT",
            &format!("/todos/{id}"),
            Some("t-alice"),
            json!({ "completed": true, "status": "completed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["completed"], json!(true));
    assert_eq!(updated["status"], json!("completed"));
    assert!(updated["updatedAt"].is_string());

    let (status, fetched) = call(&app, get(&format!("/todos/{id}"), Some("t-alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["completed"], json!(true));

    let (status, removed) = call(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/todos/{id}"))
            .header("authorization", "Bearer t-alice")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["id"], json!(id));

    let (status, body) = call(&app, get(&format!("/todos/{id}"), Some("t-alice"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Todo not found" }));
}

#[tokio::test]
async fn todo_create_requires_text() {
    let app = app();
    let (status, body) = call(
        &app,
        send_json("POST", "/todos", Some("t-alice"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Todo text is required" }));
}

#[tokio::test]
async fn todo_update_with_no_fields_is_400() {
    let app = app();
    let (_, created) = call(
        &app,
        send_json("POST", "/todos", Some("t-alice"), json!({ "text": "x" })),
    )
    .await;
    let id = created["id"].as_str().unwrap();
    let (status, body) = call(
        &app,
        send_json("PUT", &format!("/todos/{id}"), Some("t-alice"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Nothing to update" }));
}

#[tokio::test]
async fn todo_update_rejects_blank_text() {
    let app = app();
    let (_, created) = call(
        &app,
        send_json("POST", "/todos", Some("t-alice"), json!({ "text": "draft" })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = call(
        &app,
        send_json(
            "PUT",
            &format!("/todos/{id}"),
            Some("t-alice"),
            json!({ "text": "   " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Todo text is required" }));

    // blank text poisons the whole update, even next to valid fields
    let (status, _) = call(
        &app,
        send_json(
            "PUT",
            &format!("/todos/{id}"),
            Some("t-alice"),
            json!({ "text": "", "completed": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, fetched) = call(&app, get(&format!("/todos/{id}"), Some("t-alice"))).await;
    assert_eq!(fetched["text"], json!("draft"));
    assert_eq!(fetched["completed"], json!(false));
}

#[tokio::test]
async fn another_users_todo_reads_as_missing() {
    let app = app();
    let (_, created) = call(
        &app,
        send_json("POST", "/todos", Some("t-alice"), json!({ "text": "mine" })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = call(&app, get(&format!("/todos/{id}"), Some("t-bob"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = call(&app, get("/todos", Some("t-bob"))).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn unknown_route_is_a_json_404() {
    let app = app();
    let (status, body) = call(&app, get("/nope", Some("t-alice"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "not found" }));
}

#[tokio::test]
async fn cors_preflight_gets_the_origin_echoed() {
    let app = app();
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/budget/current")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
    assert!(response
        .headers()
        .contains_key("access-control-allow-methods"));
}

#[tokio::test]
async fn hmac_tokens_are_accepted_and_tampering_is_not() {
    let conn = db::open_in_memory().unwrap();
    let hmac = HmacVerifier::new("sekrit");
    let token = hmac.sign("carol").unwrap();
    let verifier: Arc<dyn AuthVerifier> = Arc::new(hmac);
    let state = AppState::new(db::shared(conn), ServerConfig::default(), verifier);
    let app = build_router(state);

    let (status, _) = call(&app, get("/budget/current", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let forged = token.replace("carol", "admin");
    let (status, _) = call(&app, get("/budget/current", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
