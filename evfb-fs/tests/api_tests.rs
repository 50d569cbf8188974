//! Integration tests for evfb-fs API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Submission start, step navigation, resume and view
//! - Form editing endpoints
//! - Error mapping (400, 403, 404, 422)

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use evfb_fs::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: Create app over in-memory stores
fn setup_app() -> axum::Router {
    build_router(AppState::in_memory())
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Send a request and return status plus parsed body
async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

/// Create a published two-step form: required "A" on step 1, optional "B" on step 2
async fn setup_form(app: &axum::Router) -> (i64, i64, i64) {
    let (status, form) = send(
        app,
        json_request("POST", "/api/forms", json!({"title": "Form F", "multi_step": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let form_id = form["id"].as_i64().unwrap();

    let (status, a) = send(
        app,
        json_request(
            "POST",
            &format!("/api/forms/{}/fields", form_id),
            json!({"step": 1, "kind": "text", "label": "A", "required": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, b) = send(
        app,
        json_request(
            "POST",
            &format!("/api/forms/{}/fields", form_id),
            json!({"step": 2, "kind": "select", "label": "B", "options": ["Yes", "No"]}),
        ),
    )
    .await;

    let (status, _) = send(
        app,
        json_request(
            "PATCH",
            &format!("/api/forms/{}", form_id),
            json!({"published": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (form_id, a["id"].as_i64().unwrap(), b["id"].as_i64().unwrap())
}

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app();

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "evfb-fs");
    assert!(body["version"].is_string());
}

// =============================================================================
// Submission Tests
// =============================================================================

#[tokio::test]
async fn test_submission_walkthrough() {
    let app = setup_app();
    let (form_id, a, b) = setup_form(&app).await;

    let (status, view) = send(
        &app,
        test_request("POST", &format!("/api/forms/{}/submissions", form_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(view["step"], 1);
    assert_eq!(view["status"], "in_progress");
    assert_eq!(view["fields"][0]["id"], a);
    let key = view["key"].as_str().unwrap().to_string();
    assert_eq!(key.len(), 32);

    let (status, outcome) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/submissions/{}/step", key),
            json!({"action": "next", "answers": {a.to_string(): "x"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["step"], 2);
    assert_eq!(outcome["fields"][0]["id"], b);
    assert!(outcome.get("error").is_none());

    let (_, resumed) = send(&app, test_request("GET", &format!("/api/submissions/{}", key))).await;
    assert_eq!(resumed["step"], 2);

    let (_, done) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/submissions/{}/step", key),
            json!({"action": "complete"}),
        ),
    )
    .await;
    assert_eq!(done["status"], "completed");

    let (status, summary) = send(
        &app,
        test_request("GET", &format!("/api/submissions/{}/view", key)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["form_title"], "Form F");
    assert_eq!(summary["answers"].as_array().unwrap().len(), 1);
    assert_eq!(summary["answers"][0]["value"], "x");
}

#[tokio::test]
async fn test_missing_required_answer_reported_inline() {
    let app = setup_app();
    let (form_id, a, _b) = setup_form(&app).await;

    let (_, view) = send(
        &app,
        test_request("POST", &format!("/api/forms/{}/submissions", form_id)),
    )
    .await;
    let key = view["key"].as_str().unwrap().to_string();

    let (status, outcome) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/submissions/{}/step", key),
            json!({"action": "next", "answers": {a.to_string(): ""}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["step"], 1);
    assert_eq!(outcome["error"]["field_id"], a);
    assert_eq!(outcome["error"]["label"], "A");
}

#[tokio::test]
async fn test_unknown_action_is_bad_request() {
    let app = setup_app();
    let (form_id, _a, _b) = setup_form(&app).await;

    let (_, view) = send(
        &app,
        test_request("POST", &format!("/api/forms/{}/submissions", form_id)),
    )
    .await;
    let key = view["key"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/submissions/{}/step", key),
            json!({"action": "skip"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_and_malformed_keys_are_not_found() {
    let app = setup_app();

    let (status, body) = send(&app, test_request("GET", "/api/submissions/not-a-key")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let unknown = "0123456789abcdef0123456789abcdef";
    let (status, _) = send(&app, test_request("GET", &format!("/api/submissions/{}", unknown))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        test_request("GET", &format!("/api/submissions/{}/view", unknown)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unpublished_form_is_forbidden() {
    let app = setup_app();
    let (_, form) = send(
        &app,
        json_request("POST", "/api/forms", json!({"title": "Draft"})),
    )
    .await;
    let form_id = form["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        test_request("POST", &format!("/api/forms/{}/submissions", form_id)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORM_NOT_PUBLISHED");

    let (status, _) = send(&app, test_request("POST", "/api/forms/999/submissions")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Form Editing Tests
// =============================================================================

#[tokio::test]
async fn test_form_schema_and_field_edits() {
    let app = setup_app();
    let (form_id, a, b) = setup_form(&app).await;

    let (status, schema) = send(&app, test_request("GET", &format!("/api/forms/{}", form_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schema["published"], true);
    assert_eq!(schema["fields"].as_array().unwrap().len(), 2);

    let (status, field) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/fields/{}", b),
            json!({"label": "Would you come again?", "required": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field["label"], "Would you come again?");
    assert_eq!(field["required"], true);

    // Removing A would leave step 1 empty
    let (status, body) = send(&app, test_request("DELETE", &format!("/api/fields/{}", a))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "NON_CONTIGUOUS_STEPS");

    let (status, _) = send(&app, test_request("DELETE", &format!("/api/fields/{}", b))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, test_request("DELETE", &format!("/api/fields/{}", b))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, forms) = send(&app, test_request("GET", "/api/forms")).await;
    assert_eq!(forms.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_field_is_unprocessable() {
    let app = setup_app();
    let (form_id, _a, _b) = setup_form(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/forms/{}/fields", form_id),
            json!({"step": 5, "kind": "text", "label": "Far away"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "NON_CONTIGUOUS_STEPS");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/forms/{}/fields", form_id),
            json!({"kind": "text", "label": ""}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_FIELD");
}

#[tokio::test]
async fn test_step_body_must_name_a_known_action() {
    let app = setup_app();
    let (form_id, a, _b) = setup_form(&app).await;

    let (_, view) = send(
        &app,
        test_request("POST", &format!("/api/forms/{}/submissions", form_id)),
    )
    .await;
    let key = view["key"].as_str().unwrap().to_string();
    let uri = format!("/api/submissions/{}/step", key);

    for body in [
        json!({"answers": {a.to_string(): "x"}}),
        json!({"action": "NEXT"}),
        json!({"action": 1}),
    ] {
        let (status, body) = send(&app, json_request("POST", &uri, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    // Rejected bodies never reach the session
    let (_, resumed) = send(&app, test_request("GET", &uri.replace("/step", ""))).await;
    assert_eq!(resumed["step"], 1);
    assert_eq!(resumed["fields"][0]["value"], Value::Null);
}
