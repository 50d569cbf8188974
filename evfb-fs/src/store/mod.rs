//! Storage interfaces consumed by the submission engine and form editor
//!
//! Two implementations are provided:
//! - [`memory`]: in-process maps, used by tests and as a reference
//! - [`sqlite`]: the shared SQLite database used by the service binary

use async_trait::async_trait;
use evfb_common::db::{
    FieldDefinition, FieldId, FieldKind, Form, FormId, NewSession, ResponseRecord, SubmissionId,
    SubmissionSession,
};
use evfb_common::{Result, SubmissionKey};

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryResponseStore, MemorySchemaStore};
pub use sqlite::SqliteStore;

/// Values for a form that has not been stored yet
#[derive(Debug, Clone)]
pub struct NewForm {
    pub title: String,
    pub multi_step: bool,
    pub published: bool,
}

/// Values for a field that has not been stored yet
#[derive(Debug, Clone)]
pub struct NewField {
    pub step: u32,
    pub order: i64,
    pub kind: FieldKind,
    pub label: String,
    pub placeholder: String,
    pub options: Vec<String>,
    pub required: bool,
}

/// Form schema access
///
/// Reads are used by the engine; writes only by the form editor, which is
/// responsible for keeping step numbers contiguous.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    async fn form(&self, form_id: FormId) -> Result<Option<Form>>;

    async fn list_forms(&self) -> Result<Vec<Form>>;

    /// Fields of one step, in display order
    async fn fields_for_step(&self, form_id: FormId, step: u32) -> Result<Vec<FieldDefinition>>;

    /// Every field of the form, ordered by step then display order
    async fn all_fields(&self, form_id: FormId) -> Result<Vec<FieldDefinition>>;

    async fn field(&self, field_id: FieldId) -> Result<Option<FieldDefinition>>;

    /// Unknown forms are reported as unpublished
    async fn is_published(&self, form_id: FormId) -> Result<bool> {
        Ok(self.form(form_id).await?.map_or(false, |form| form.published))
    }

    async fn insert_form(&self, form: NewForm) -> Result<Form>;

    async fn update_form(&self, form: &Form) -> Result<()>;

    async fn insert_field(&self, form_id: FormId, field: NewField) -> Result<FieldDefinition>;

    async fn update_field(&self, field: &FieldDefinition) -> Result<()>;

    async fn delete_field(&self, field_id: FieldId) -> Result<()>;
}

/// Submission session and answer persistence
#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn create_session(&self, session: NewSession) -> Result<SubmissionSession>;

    async fn session_by_key(&self, key: &SubmissionKey) -> Result<Option<SubmissionSession>>;

    /// Persist status, current step and completion time
    async fn save_session(&self, session: &SubmissionSession) -> Result<()>;

    /// Insert or overwrite the answer for (submission, field)
    async fn upsert_response(
        &self,
        submission_id: SubmissionId,
        field_id: FieldId,
        value: &str,
    ) -> Result<()>;

    /// Write a step's answers. Implementations backed by a transactional
    /// store override this so the batch commits all-or-nothing.
    async fn upsert_responses(
        &self,
        submission_id: SubmissionId,
        answers: &[(FieldId, String)],
    ) -> Result<()> {
        for (field_id, value) in answers {
            self.upsert_response(submission_id, *field_id, value).await?;
        }
        Ok(())
    }

    async fn latest_response(
        &self,
        submission_id: SubmissionId,
        field_id: FieldId,
    ) -> Result<Option<String>>;

    /// All answers of a session, ordered by field id
    async fn responses_for_session(&self, submission_id: SubmissionId) -> Result<Vec<ResponseRecord>>;
}
