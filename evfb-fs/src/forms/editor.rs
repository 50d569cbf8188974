//! Form schema editing
//!
//! The submission engine treats "no fields at step N+1" as the end of the
//! form, so every write here keeps the set of used step numbers equal to
//! 1..=N with no gaps. Field edits hold one editor-wide lock across the read,
//! the contiguity check and the write.

use evfb_common::db::{FieldDefinition, FieldId, FieldKind, Form, FormId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::store::{NewField, NewForm, SchemaStore};

pub type EditResult<T> = std::result::Result<T, EditError>;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Form not found: {0}")]
    FormNotFound(FormId),

    #[error("Field not found: {0}")]
    FieldNotFound(FieldId),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Steps would not be contiguous: step {missing_step} would have no fields")]
    NonContiguousSteps { missing_step: u32 },

    #[error("Storage failure: {0}")]
    Storage(#[from] evfb_common::Error),
}

/// Form with its full schema, as shown in the editor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSchema {
    #[serde(flatten)]
    pub form: Form,
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormUpdate {
    pub title: Option<String>,
    pub multi_step: Option<bool>,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    /// Defaults to step 1
    pub step: Option<u32>,
    pub kind: FieldKind,
    pub label: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldUpdate {
    pub step: Option<u32>,
    pub order: Option<i64>,
    pub kind: Option<FieldKind>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub options: Option<Vec<String>>,
    pub required: Option<bool>,
}

/// Returns the first step number missing from 1..=max, if any
pub fn first_gap(steps: impl IntoIterator<Item = u32>) -> Option<u32> {
    let steps: BTreeSet<u32> = steps.into_iter().collect();
    (1u32..)
        .zip(steps.iter())
        .find(|(expected, actual)| expected != *actual)
        .map(|(expected, _)| expected)
}

fn ensure_contiguous(steps: impl IntoIterator<Item = u32>) -> EditResult<()> {
    match first_gap(steps) {
        Some(missing_step) => Err(EditError::NonContiguousSteps { missing_step }),
        None => Ok(()),
    }
}

fn validate_label(label: &str) -> EditResult<String> {
    let label = label.trim();
    if label.is_empty() {
        return Err(EditError::InvalidField("label must not be empty".to_string()));
    }
    Ok(label.to_string())
}

fn validate_step(step: u32) -> EditResult<u32> {
    if step == 0 {
        return Err(EditError::InvalidField("step numbers start at 1".to_string()));
    }
    Ok(step)
}

fn next_order(fields: &[FieldDefinition], step: u32) -> i64 {
    fields
        .iter()
        .filter(|f| f.step == step)
        .map(|f| f.order)
        .max()
        .unwrap_or(0)
        + 1
}

pub struct FormEditor {
    schema: Arc<dyn SchemaStore>,
    field_edits: Mutex<()>,
}

impl FormEditor {
    pub fn new(schema: Arc<dyn SchemaStore>) -> Self {
        Self {
            schema,
            field_edits: Mutex::new(()),
        }
    }

    /// New forms start unpublished
    pub async fn create_form(&self, title: &str, multi_step: bool) -> EditResult<Form> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EditError::InvalidField("title must not be empty".to_string()));
        }

        let form = self
            .schema
            .insert_form(NewForm {
                title: title.to_string(),
                multi_step,
                published: false,
            })
            .await?;

        info!("Created form {} ({:?})", form.id, form.title);
        Ok(form)
    }

    pub async fn list_forms(&self) -> EditResult<Vec<Form>> {
        Ok(self.schema.list_forms().await?)
    }

    pub async fn form_schema(&self, form_id: FormId) -> EditResult<FormSchema> {
        let form = self.require_form(form_id).await?;
        let fields = self.schema.all_fields(form_id).await?;
        Ok(FormSchema { form, fields })
    }

    pub async fn update_form(&self, form_id: FormId, update: FormUpdate) -> EditResult<Form> {
        let mut form = self.require_form(form_id).await?;

        if let Some(title) = update.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(EditError::InvalidField("title must not be empty".to_string()));
            }
            form.title = title.to_string();
        }
        if let Some(multi_step) = update.multi_step {
            form.multi_step = multi_step;
        }
        if let Some(published) = update.published {
            if published != form.published {
                info!("Form {} published = {}", form_id, published);
            }
            form.published = published;
        }

        self.schema.update_form(&form).await?;
        Ok(form)
    }

    /// Append a field to the end of its step
    pub async fn add_field(&self, form_id: FormId, spec: FieldSpec) -> EditResult<FieldDefinition> {
        let _edit = self.field_edits.lock().await;
        self.require_form(form_id).await?;
        let step = validate_step(spec.step.unwrap_or(1))?;
        let label = validate_label(&spec.label)?;

        let fields = self.schema.all_fields(form_id).await?;
        ensure_contiguous(fields.iter().map(|f| f.step).chain([step]))?;

        let field = self
            .schema
            .insert_field(
                form_id,
                NewField {
                    step,
                    order: next_order(&fields, step),
                    kind: spec.kind,
                    label,
                    placeholder: spec.placeholder,
                    options: spec.options,
                    required: spec.required,
                },
            )
            .await?;

        info!("Form {}: added field {} at step {}", form_id, field.id, step);
        Ok(field)
    }

    /// Partial update. Moving a field to another step appends it there
    /// unless an explicit order is given.
    pub async fn update_field(
        &self,
        field_id: FieldId,
        update: FieldUpdate,
    ) -> EditResult<FieldDefinition> {
        let _edit = self.field_edits.lock().await;
        let mut field = self
            .schema
            .field(field_id)
            .await?
            .ok_or(EditError::FieldNotFound(field_id))?;

        if let Some(step) = update.step {
            let step = validate_step(step)?;
            if step != field.step {
                let fields = self.schema.all_fields(field.form_id).await?;
                let others: Vec<FieldDefinition> =
                    fields.into_iter().filter(|f| f.id != field_id).collect();
                ensure_contiguous(others.iter().map(|f| f.step).chain([step]))?;
                field.order = next_order(&others, step);
                field.step = step;
            }
        }
        if let Some(order) = update.order {
            field.order = order;
        }
        if let Some(kind) = update.kind {
            field.kind = kind;
        }
        if let Some(label) = update.label {
            field.label = validate_label(&label)?;
        }
        if let Some(placeholder) = update.placeholder {
            field.placeholder = placeholder;
        }
        if let Some(options) = update.options {
            field.options = options;
        }
        if let Some(required) = update.required {
            field.required = required;
        }

        self.schema.update_field(&field).await?;
        Ok(field)
    }

    /// Remove a field; refused when it is the last field of a non-final step
    pub async fn delete_field(&self, field_id: FieldId) -> EditResult<()> {
        let _edit = self.field_edits.lock().await;
        let field = self
            .schema
            .field(field_id)
            .await?
            .ok_or(EditError::FieldNotFound(field_id))?;

        let fields = self.schema.all_fields(field.form_id).await?;
        ensure_contiguous(fields.iter().filter(|f| f.id != field_id).map(|f| f.step))?;

        self.schema.delete_field(field_id).await?;
        info!("Form {}: deleted field {}", field.form_id, field_id);
        Ok(())
    }

    async fn require_form(&self, form_id: FormId) -> EditResult<Form> {
        self.schema
            .form(form_id)
            .await?
            .ok_or(EditError::FormNotFound(form_id))
    }
}
