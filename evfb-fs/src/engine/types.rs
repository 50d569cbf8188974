//! Engine request and result types

use chrono::{DateTime, Utc};
use evfb_common::db::{
    FieldDefinition, FieldId, FieldKind, FormId, SubmissionSession, SubmissionStatus,
};
use evfb_common::SubmissionKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Answers supplied for one step, keyed by field id
pub type Answers = HashMap<FieldId, String>;

/// Empty and whitespace-only answers count as missing
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Navigation requested by the respondent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Next,
    Prev,
    Complete,
}

/// A field ready for rendering, with the value to show in the input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepField {
    #[serde(flatten)]
    pub definition: FieldDefinition,
    pub value: Option<String>,
}

/// What the respondent should see after an operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub key: SubmissionKey,
    pub form_id: FormId,
    pub status: SubmissionStatus,
    pub step: u32,
    /// Fields of `step`; empty once completed
    pub fields: Vec<StepField>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepView {
    pub fn in_progress(session: &SubmissionSession, step: u32, fields: Vec<StepField>) -> Self {
        Self {
            key: session.key.clone(),
            form_id: session.form_id,
            status: SubmissionStatus::InProgress,
            step,
            fields,
            completed_at: None,
        }
    }

    pub fn completed(session: &SubmissionSession) -> Self {
        Self {
            key: session.key.clone(),
            form_id: session.form_id,
            status: SubmissionStatus::Completed,
            step: session.current_step,
            fields: Vec::new(),
            completed_at: session.completed_at,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == SubmissionStatus::Completed
    }
}

/// Inline validation error shown next to the offending field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRequired {
    pub field_id: FieldId,
    pub label: String,
}

/// Result of `submit_step`: the view to render plus an optional inline error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    #[serde(flatten)]
    pub view: StepView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FieldRequired>,
}

impl SubmitOutcome {
    pub fn ok(view: StepView) -> Self {
        Self { view, error: None }
    }
}

/// One recorded answer joined with its field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnsweredField {
    pub field_id: FieldId,
    pub step: u32,
    pub label: String,
    pub kind: FieldKind,
    pub value: String,
}

/// Read-only view of a submission and everything it recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionSummary {
    pub key: SubmissionKey,
    pub form_id: FormId,
    pub form_title: String,
    pub status: SubmissionStatus,
    pub current_step: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub answers: Vec<AnsweredField>,
}
