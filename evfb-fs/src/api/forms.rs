//! Form editing endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use evfb_common::db::{FieldDefinition, FieldId, Form, FormId};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::forms::{FieldSpec, FieldUpdate, FormSchema, FormUpdate};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateFormRequest {
    pub title: String,
    #[serde(default)]
    pub multi_step: bool,
}

/// GET /api/forms
pub async fn list_forms(State(state): State<AppState>) -> ApiResult<Json<Vec<Form>>> {
    Ok(Json(state.editor.list_forms().await?))
}

/// POST /api/forms
pub async fn create_form(
    State(state): State<AppState>,
    Json(request): Json<CreateFormRequest>,
) -> ApiResult<(StatusCode, Json<Form>)> {
    let form = state
        .editor
        .create_form(&request.title, request.multi_step)
        .await?;
    Ok((StatusCode::CREATED, Json(form)))
}

/// GET /api/forms/:form_id
pub async fn get_form(
    State(state): State<AppState>,
    Path(form_id): Path<FormId>,
) -> ApiResult<Json<FormSchema>> {
    Ok(Json(state.editor.form_schema(form_id).await?))
}

/// PATCH /api/forms/:form_id
pub async fn update_form(
    State(state): State<AppState>,
    Path(form_id): Path<FormId>,
    Json(update): Json<FormUpdate>,
) -> ApiResult<Json<Form>> {
    Ok(Json(state.editor.update_form(form_id, update).await?))
}

/// POST /api/forms/:form_id/fields
pub async fn add_field(
    State(state): State<AppState>,
    Path(form_id): Path<FormId>,
    Json(spec): Json<FieldSpec>,
) -> ApiResult<(StatusCode, Json<FieldDefinition>)> {
    let field = state.editor.add_field(form_id, spec).await?;
    Ok((StatusCode::CREATED, Json(field)))
}

/// PATCH /api/fields/:field_id
pub async fn update_field(
    State(state): State<AppState>,
    Path(field_id): Path<FieldId>,
    Json(update): Json<FieldUpdate>,
) -> ApiResult<Json<FieldDefinition>> {
    Ok(Json(state.editor.update_field(field_id, update).await?))
}

/// DELETE /api/fields/:field_id
pub async fn delete_field(
    State(state): State<AppState>,
    Path(field_id): Path<FieldId>,
) -> ApiResult<StatusCode> {
    state.editor.delete_field(field_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn form_routes() -> Router<AppState> {
    Router::new()
        .route("/api/forms", get(list_forms).post(create_form))
        .route("/api/forms/:form_id", get(get_form).patch(update_form))
        .route("/api/forms/:form_id/fields", post(add_field))
        .route(
            "/api/fields/:field_id",
            patch(update_field).delete(delete_field),
        )
}
