//! Respondent-facing submission endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use evfb_common::db::FormId;
use evfb_common::SubmissionKey;
use serde::Deserialize;

use crate::engine::{Answers, StepAction, StepView, SubmissionSummary, SubmitOutcome};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Body of `POST /api/submissions/:key/step`
#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub action: StepAction,
    #[serde(default)]
    pub answers: Answers,
}

/// Keys that cannot have been issued are reported like unknown ones
fn parse_key(raw: &str) -> ApiResult<SubmissionKey> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("submission".to_string()))
}

/// POST /api/forms/:form_id/submissions
pub async fn start_submission(
    State(state): State<AppState>,
    Path(form_id): Path<FormId>,
) -> ApiResult<(StatusCode, Json<StepView>)> {
    let view = state.engine.start_submission(form_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/submissions/:key/step
///
/// A missing required field is reported in-band through `error` with a 200.
/// Bodies that do not deserialize, including an unknown action, are 400.
pub async fn submit_step(
    State(state): State<AppState>,
    Path(key): Path<String>,
    request: Result<Json<StepRequest>, JsonRejection>,
) -> ApiResult<Json<SubmitOutcome>> {
    let Json(request) = request.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let key = parse_key(&key)?;

    let outcome = state
        .engine
        .submit_step(&key, request.action, &request.answers)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/submissions/:key
pub async fn resume_submission(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<StepView>> {
    let key = parse_key(&key)?;
    Ok(Json(state.engine.resume_submission(&key).await?))
}

/// GET /api/submissions/:key/view
pub async fn view_submission(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<SubmissionSummary>> {
    let key = parse_key(&key)?;
    Ok(Json(state.engine.view_submission(&key).await?))
}

pub fn submission_routes() -> Router<AppState> {
    Router::new()
        .route("/api/forms/:form_id/submissions", post(start_submission))
        .route("/api/submissions/:key", get(resume_submission))
        .route("/api/submissions/:key/step", post(submit_step))
        .route("/api/submissions/:key/view", get(view_submission))
}
