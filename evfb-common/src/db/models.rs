//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::submission_key::SubmissionKey;
use crate::Error;

pub type FormId = i64;
pub type FieldId = i64;
pub type SubmissionId = i64;

/// Input kind of a form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Email,
    Number,
    Date,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Select => "select",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Email => "email",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
        }
    }

    /// Kinds rendered from the field's option list
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Radio | FieldKind::Checkbox)
    }
}

impl FromStr for FieldKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldKind::Text),
            "textarea" => Ok(FieldKind::Textarea),
            "select" => Ok(FieldKind::Select),
            "radio" => Ok(FieldKind::Radio),
            "checkbox" => Ok(FieldKind::Checkbox),
            "email" => Ok(FieldKind::Email),
            "number" => Ok(FieldKind::Number),
            "date" => Ok(FieldKind::Date),
            other => Err(Error::InvalidInput(format!("Unknown field kind: {}", other))),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: FormId,
    pub title: String,
    /// When false the whole schema is presented as a single step
    pub multi_step: bool,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: FieldId,
    pub form_id: FormId,
    /// 1-based step number
    pub step: u32,
    /// Display order within the step (gaps allowed)
    pub order: i64,
    pub kind: FieldKind,
    pub label: String,
    pub placeholder: String,
    pub options: Vec<String>,
    pub required: bool,
}

impl FieldDefinition {
    /// Sort key for rendering: step, then order, then id to break ties
    pub fn sort_key(&self) -> (u32, i64, FieldId) {
        (self.step, self.order, self.id)
    }
}

/// Sort fields into rendering order
pub fn sort_fields(fields: &mut [FieldDefinition]) {
    fields.sort_by_key(FieldDefinition::sort_key);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    InProgress,
    Completed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::InProgress => "in_progress",
            SubmissionStatus::Completed => "completed",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SubmissionStatus::InProgress),
            "completed" => Ok(SubmissionStatus::Completed),
            other => Err(Error::Internal(format!("Unknown submission status: {}", other))),
        }
    }
}

/// One respondent's pass through a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSession {
    pub id: SubmissionId,
    pub key: SubmissionKey,
    pub form_id: FormId,
    pub status: SubmissionStatus,
    pub current_step: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SubmissionSession {
    pub fn is_completed(&self) -> bool {
        self.status == SubmissionStatus::Completed
    }

    /// Mark completed. The original completion time is kept if already set.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = SubmissionStatus::Completed;
        self.completed_at.get_or_insert(at);
    }
}

/// Field values of a session that does not exist yet
#[derive(Debug, Clone)]
pub struct NewSession {
    pub key: SubmissionKey,
    pub form_id: FormId,
    pub started_at: DateTime<Utc>,
}

/// One persisted answer; unique per (submission, field)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub submission_id: SubmissionId,
    pub field_id: FieldId,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
