//! Demo form for a fresh database

use evfb_common::db::{FieldKind, Form};
use tracing::info;

use super::{EditResult, FieldSpec, FormEditor, FormUpdate};

/// Create a published single-step demo form unless forms already exist
pub async fn seed_demo_form(editor: &FormEditor) -> EditResult<Option<Form>> {
    if !editor.list_forms().await?.is_empty() {
        return Ok(None);
    }

    let form = editor.create_form("Event Feedback", false).await?;

    let fields = [
        FieldSpec {
            step: Some(1),
            kind: FieldKind::Text,
            label: "What did you like most about the event?".to_string(),
            placeholder: String::new(),
            options: Vec::new(),
            required: true,
        },
        FieldSpec {
            step: Some(1),
            kind: FieldKind::Textarea,
            label: "Do you have any suggestions for improvement?".to_string(),
            placeholder: String::new(),
            options: Vec::new(),
            required: false,
        },
        FieldSpec {
            step: Some(1),
            kind: FieldKind::Select,
            label: "How would you rate the event?".to_string(),
            placeholder: String::new(),
            options: ["Excellent", "Good", "Average", "Poor"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            required: true,
        },
    ];
    for spec in fields {
        editor.add_field(form.id, spec).await?;
    }

    let form = editor
        .update_form(
            form.id,
            FormUpdate {
                published: Some(true),
                ..FormUpdate::default()
            },
        )
        .await?;

    info!("Seeded demo form {}", form.id);
    Ok(Some(form))
}
