//! SQLite-backed store
//!
//! One struct implements both store traits over the shared pool. Answers are
//! upserted with `ON CONFLICT(submission_id, field_id) DO UPDATE`, and a
//! step's answers are written in a single transaction.

use async_trait::async_trait;
use evfb_common::db::{
    FieldDefinition, FieldId, Form, FormId, NewSession, ResponseRecord, SubmissionId,
    SubmissionSession, SubmissionStatus,
};
use evfb_common::{time, Error, Result, SubmissionKey};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{NewField, NewForm, ResponseStore, SchemaStore};

const FIELD_COLUMNS: &str =
    "id, form_id, step, field_order, kind, label, placeholder, options, required";

const SESSION_COLUMNS: &str =
    "id, submission_key, form_id, status, current_step, started_at, completed_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn step_from_db(column: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|step| *step >= 1)
        .ok_or_else(|| Error::Internal(format!("Invalid {}: {}", column, value)))
}

fn form_from_row(row: &SqliteRow) -> Result<Form> {
    let created_at: String = row.get("created_at");
    Ok(Form {
        id: row.get("id"),
        title: row.get("title"),
        multi_step: row.get("multi_step"),
        published: row.get("published"),
        created_at: time::from_db("created_at", &created_at)?,
    })
}

fn field_from_row(row: &SqliteRow) -> Result<FieldDefinition> {
    let kind: String = row.get("kind");
    let options: String = row.get("options");
    let options: Vec<String> = serde_json::from_str(&options)
        .map_err(|e| Error::Internal(format!("Failed to deserialize options: {}", e)))?;

    Ok(FieldDefinition {
        id: row.get("id"),
        form_id: row.get("form_id"),
        step: step_from_db("step", row.get("step"))?,
        order: row.get("field_order"),
        kind: kind
            .parse()
            .map_err(|_| Error::Internal(format!("Unknown field kind in database: {}", kind)))?,
        label: row.get("label"),
        placeholder: row.get("placeholder"),
        options,
        required: row.get("required"),
    })
}

fn session_from_row(row: &SqliteRow) -> Result<SubmissionSession> {
    let key: String = row.get("submission_key");
    let status: String = row.get("status");
    let started_at: String = row.get("started_at");
    let completed_at: Option<String> = row.get("completed_at");

    Ok(SubmissionSession {
        id: row.get("id"),
        key: key
            .parse()
            .map_err(|_| Error::Internal("Malformed submission key in database".to_string()))?,
        form_id: row.get("form_id"),
        status: status.parse()?,
        current_step: step_from_db("current_step", row.get("current_step"))?,
        started_at: time::from_db("started_at", &started_at)?,
        completed_at: completed_at
            .map(|s| time::from_db("completed_at", &s))
            .transpose()?,
    })
}

fn options_to_db(options: &[String]) -> Result<String> {
    serde_json::to_string(options)
        .map_err(|e| Error::Internal(format!("Failed to serialize options: {}", e)))
}

const UPSERT_RESPONSE: &str = r#"
    INSERT INTO submission_responses (submission_id, field_id, response, updated_at)
    VALUES (?, ?, ?, ?)
    ON CONFLICT(submission_id, field_id) DO UPDATE SET
        response = excluded.response,
        updated_at = excluded.updated_at
"#;

#[async_trait]
impl SchemaStore for SqliteStore {
    async fn form(&self, form_id: FormId) -> Result<Option<Form>> {
        let row = sqlx::query(
            "SELECT id, title, multi_step, published, created_at FROM forms WHERE id = ?",
        )
        .bind(form_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(form_from_row).transpose()
    }

    async fn list_forms(&self) -> Result<Vec<Form>> {
        let rows = sqlx::query(
            "SELECT id, title, multi_step, published, created_at FROM forms ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(form_from_row).collect()
    }

    async fn fields_for_step(&self, form_id: FormId, step: u32) -> Result<Vec<FieldDefinition>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM form_fields WHERE form_id = ? AND step = ? ORDER BY field_order, id",
            FIELD_COLUMNS
        ))
        .bind(form_id)
        .bind(i64::from(step))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(field_from_row).collect()
    }

    async fn all_fields(&self, form_id: FormId) -> Result<Vec<FieldDefinition>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM form_fields WHERE form_id = ? ORDER BY step, field_order, id",
            FIELD_COLUMNS
        ))
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(field_from_row).collect()
    }

    async fn field(&self, field_id: FieldId) -> Result<Option<FieldDefinition>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM form_fields WHERE id = ?",
            FIELD_COLUMNS
        ))
        .bind(field_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(field_from_row).transpose()
    }

    async fn is_published(&self, form_id: FormId) -> Result<bool> {
        let published: Option<bool> =
            sqlx::query_scalar("SELECT published FROM forms WHERE id = ?")
                .bind(form_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(published.unwrap_or(false))
    }

    async fn insert_form(&self, form: NewForm) -> Result<Form> {
        let created_at = time::now();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO forms (title, multi_step, published, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&form.title)
        .bind(form.multi_step)
        .bind(form.published)
        .bind(time::to_db(&created_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(Form {
            id,
            title: form.title,
            multi_step: form.multi_step,
            published: form.published,
            created_at,
        })
    }

    async fn update_form(&self, form: &Form) -> Result<()> {
        let result = sqlx::query(
            "UPDATE forms SET title = ?, multi_step = ?, published = ? WHERE id = ?",
        )
        .bind(&form.title)
        .bind(form.multi_step)
        .bind(form.published)
        .bind(form.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("form {}", form.id)));
        }
        Ok(())
    }

    async fn insert_field(&self, form_id: FormId, field: NewField) -> Result<FieldDefinition> {
        let options = options_to_db(&field.options)?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO form_fields (
                form_id, step, field_order, kind, label, placeholder, options, required
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(form_id)
        .bind(i64::from(field.step))
        .bind(field.order)
        .bind(field.kind.as_str())
        .bind(&field.label)
        .bind(&field.placeholder)
        .bind(&options)
        .bind(field.required)
        .fetch_one(&self.pool)
        .await?;

        Ok(FieldDefinition {
            id,
            form_id,
            step: field.step,
            order: field.order,
            kind: field.kind,
            label: field.label,
            placeholder: field.placeholder,
            options: field.options,
            required: field.required,
        })
    }

    async fn update_field(&self, field: &FieldDefinition) -> Result<()> {
        let options = options_to_db(&field.options)?;
        let result = sqlx::query(
            r#"
            UPDATE form_fields SET
                step = ?, field_order = ?, kind = ?, label = ?,
                placeholder = ?, options = ?, required = ?
            WHERE id = ?
            "#,
        )
        .bind(i64::from(field.step))
        .bind(field.order)
        .bind(field.kind.as_str())
        .bind(&field.label)
        .bind(&field.placeholder)
        .bind(&options)
        .bind(field.required)
        .bind(field.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("field {}", field.id)));
        }
        Ok(())
    }

    async fn delete_field(&self, field_id: FieldId) -> Result<()> {
        sqlx::query("DELETE FROM form_fields WHERE id = ?")
            .bind(field_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ResponseStore for SqliteStore {
    async fn create_session(&self, session: NewSession) -> Result<SubmissionSession> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO submissions (submission_key, form_id, status, current_step, started_at)
            VALUES (?, ?, ?, 1, ?)
            RETURNING id
            "#,
        )
        .bind(session.key.as_str())
        .bind(session.form_id)
        .bind(SubmissionStatus::InProgress.as_str())
        .bind(time::to_db(&session.started_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(SubmissionSession {
            id,
            key: session.key,
            form_id: session.form_id,
            status: SubmissionStatus::InProgress,
            current_step: 1,
            started_at: session.started_at,
            completed_at: None,
        })
    }

    async fn session_by_key(&self, key: &SubmissionKey) -> Result<Option<SubmissionSession>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM submissions WHERE submission_key = ?",
            SESSION_COLUMNS
        ))
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn save_session(&self, session: &SubmissionSession) -> Result<()> {
        let result = sqlx::query(
            "UPDATE submissions SET status = ?, current_step = ?, completed_at = ? WHERE id = ?",
        )
        .bind(session.status.as_str())
        .bind(i64::from(session.current_step))
        .bind(session.completed_at.as_ref().map(time::to_db))
        .bind(session.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("submission {}", session.id)));
        }
        Ok(())
    }

    async fn upsert_response(
        &self,
        submission_id: SubmissionId,
        field_id: FieldId,
        value: &str,
    ) -> Result<()> {
        sqlx::query(UPSERT_RESPONSE)
            .bind(submission_id)
            .bind(field_id)
            .bind(value)
            .bind(time::to_db(&time::now()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_responses(
        &self,
        submission_id: SubmissionId,
        answers: &[(FieldId, String)],
    ) -> Result<()> {
        let updated_at = time::to_db(&time::now());
        let mut tx = self.pool.begin().await?;

        for (field_id, value) in answers {
            sqlx::query(UPSERT_RESPONSE)
                .bind(submission_id)
                .bind(*field_id)
                .bind(value)
                .bind(&updated_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn latest_response(
        &self,
        submission_id: SubmissionId,
        field_id: FieldId,
    ) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT response FROM submission_responses WHERE submission_id = ? AND field_id = ?",
        )
        .bind(submission_id)
        .bind(field_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn responses_for_session(&self, submission_id: SubmissionId) -> Result<Vec<ResponseRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT submission_id, field_id, response, updated_at
            FROM submission_responses
            WHERE submission_id = ?
            ORDER BY field_id
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let updated_at: String = row.get("updated_at");
                Ok(ResponseRecord {
                    submission_id: row.get("submission_id"),
                    field_id: row.get("field_id"),
                    value: row.get("response"),
                    updated_at: time::from_db("updated_at", &updated_at)?,
                })
            })
            .collect()
    }
}
