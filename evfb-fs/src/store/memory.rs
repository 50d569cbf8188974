//! In-memory store implementations

use async_trait::async_trait;
use evfb_common::db::{
    sort_fields, FieldDefinition, FieldId, Form, FormId, NewSession, ResponseRecord, SubmissionId,
    SubmissionSession, SubmissionStatus,
};
use evfb_common::{time, Error, Result, SubmissionKey};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{NewField, NewForm, ResponseStore, SchemaStore};

#[derive(Default)]
struct SchemaTables {
    forms: BTreeMap<FormId, Form>,
    fields: BTreeMap<FieldId, FieldDefinition>,
    next_form_id: FormId,
    next_field_id: FieldId,
}

/// Schema store backed by in-process maps
#[derive(Default)]
pub struct MemorySchemaStore {
    tables: RwLock<SchemaTables>,
}

impl MemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchemaStore for MemorySchemaStore {
    async fn form(&self, form_id: FormId) -> Result<Option<Form>> {
        Ok(self.tables.read().await.forms.get(&form_id).cloned())
    }

    async fn list_forms(&self) -> Result<Vec<Form>> {
        Ok(self.tables.read().await.forms.values().cloned().collect())
    }

    async fn fields_for_step(&self, form_id: FormId, step: u32) -> Result<Vec<FieldDefinition>> {
        let tables = self.tables.read().await;
        let mut fields: Vec<FieldDefinition> = tables
            .fields
            .values()
            .filter(|f| f.form_id == form_id && f.step == step)
            .cloned()
            .collect();
        sort_fields(&mut fields);
        Ok(fields)
    }

    async fn all_fields(&self, form_id: FormId) -> Result<Vec<FieldDefinition>> {
        let tables = self.tables.read().await;
        let mut fields: Vec<FieldDefinition> = tables
            .fields
            .values()
            .filter(|f| f.form_id == form_id)
            .cloned()
            .collect();
        sort_fields(&mut fields);
        Ok(fields)
    }

    async fn field(&self, field_id: FieldId) -> Result<Option<FieldDefinition>> {
        Ok(self.tables.read().await.fields.get(&field_id).cloned())
    }

    async fn insert_form(&self, form: NewForm) -> Result<Form> {
        let mut tables = self.tables.write().await;
        tables.next_form_id += 1;
        let form = Form {
            id: tables.next_form_id,
            title: form.title,
            multi_step: form.multi_step,
            published: form.published,
            created_at: time::now(),
        };
        tables.forms.insert(form.id, form.clone());
        Ok(form)
    }

    async fn update_form(&self, form: &Form) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.forms.get_mut(&form.id) {
            Some(stored) => {
                *stored = form.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("form {}", form.id))),
        }
    }

    async fn insert_field(&self, form_id: FormId, field: NewField) -> Result<FieldDefinition> {
        let mut tables = self.tables.write().await;
        if !tables.forms.contains_key(&form_id) {
            return Err(Error::NotFound(format!("form {}", form_id)));
        }
        tables.next_field_id += 1;
        let field = FieldDefinition {
            id: tables.next_field_id,
            form_id,
            step: field.step,
            order: field.order,
            kind: field.kind,
            label: field.label,
            placeholder: field.placeholder,
            options: field.options,
            required: field.required,
        };
        tables.fields.insert(field.id, field.clone());
        Ok(field)
    }

    async fn update_field(&self, field: &FieldDefinition) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.fields.get_mut(&field.id) {
            Some(stored) => {
                *stored = field.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("field {}", field.id))),
        }
    }

    async fn delete_field(&self, field_id: FieldId) -> Result<()> {
        self.tables.write().await.fields.remove(&field_id);
        Ok(())
    }
}

#[derive(Default)]
struct ResponseTables {
    sessions: HashMap<SubmissionId, SubmissionSession>,
    by_key: HashMap<SubmissionKey, SubmissionId>,
    // Keyed by (submission, field): a second answer replaces the first
    responses: BTreeMap<(SubmissionId, FieldId), ResponseRecord>,
    next_session_id: SubmissionId,
}

/// Response store backed by in-process maps
#[derive(Default)]
pub struct MemoryResponseStore {
    tables: RwLock<ResponseTables>,
}

impl MemoryResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored answers across all sessions
    pub async fn response_count(&self) -> usize {
        self.tables.read().await.responses.len()
    }
}

fn put_response(tables: &mut ResponseTables, submission_id: SubmissionId, field_id: FieldId, value: &str) {
    tables.responses.insert(
        (submission_id, field_id),
        ResponseRecord {
            submission_id,
            field_id,
            value: value.to_string(),
            updated_at: time::now(),
        },
    );
}

#[async_trait]
impl ResponseStore for MemoryResponseStore {
    async fn create_session(&self, session: NewSession) -> Result<SubmissionSession> {
        let mut tables = self.tables.write().await;
        if tables.by_key.contains_key(&session.key) {
            return Err(Error::Internal("Duplicate submission key".to_string()));
        }
        tables.next_session_id += 1;
        let session = SubmissionSession {
            id: tables.next_session_id,
            key: session.key,
            form_id: session.form_id,
            status: SubmissionStatus::InProgress,
            current_step: 1,
            started_at: session.started_at,
            completed_at: None,
        };
        tables.by_key.insert(session.key.clone(), session.id);
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn session_by_key(&self, key: &SubmissionKey) -> Result<Option<SubmissionSession>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_key
            .get(key)
            .and_then(|id| tables.sessions.get(id))
            .cloned())
    }

    async fn save_session(&self, session: &SubmissionSession) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&session.id) {
            Some(stored) => {
                stored.status = session.status;
                stored.current_step = session.current_step;
                stored.completed_at = session.completed_at;
                Ok(())
            }
            None => Err(Error::NotFound(format!("submission {}", session.id))),
        }
    }

    async fn upsert_response(
        &self,
        submission_id: SubmissionId,
        field_id: FieldId,
        value: &str,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        put_response(&mut tables, submission_id, field_id, value);
        Ok(())
    }

    async fn upsert_responses(
        &self,
        submission_id: SubmissionId,
        answers: &[(FieldId, String)],
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        for (field_id, value) in answers {
            put_response(&mut tables, submission_id, *field_id, value);
        }
        Ok(())
    }

    async fn latest_response(
        &self,
        submission_id: SubmissionId,
        field_id: FieldId,
    ) -> Result<Option<String>> {
        Ok(self
            .tables
            .read()
            .await
            .responses
            .get(&(submission_id, field_id))
            .map(|r| r.value.clone()))
    }

    async fn responses_for_session(&self, submission_id: SubmissionId) -> Result<Vec<ResponseRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .responses
            .range((submission_id, FieldId::MIN)..=(submission_id, FieldId::MAX))
            .map(|(_, r)| r.clone())
            .collect())
    }
}
