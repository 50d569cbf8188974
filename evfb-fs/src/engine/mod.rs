//! Multi-step submission engine
//!
//! Session lifecycle: `start` creates an in-progress session at step 1;
//! `next` validates the current step's required fields, persists its answers
//! and moves forward, completing the session when the following step has no
//! fields; `prev` persists without validating and moves back (never below 1);
//! `complete` persists without validating and finishes the session.
//!
//! Write ordering within one call: answers first, then the session row. A
//! storage failure while writing answers therefore never moves `current_step`.
//!
//! Forms without the multi-step flag are one logical step holding every
//! field, so the first successful `next` completes them.

mod error;
mod locks;
mod types;

pub use error::{EngineError, EngineResult, ErrorKind};
pub use locks::SessionLocks;
pub use types::{
    is_blank, AnsweredField, Answers, FieldRequired, StepAction, StepField, StepView,
    SubmissionSummary, SubmitOutcome,
};

use evfb_common::db::{FieldDefinition, FieldId, Form, FormId, NewSession, SubmissionSession};
use evfb_common::{time, SubmissionKey};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::store::{ResponseStore, SchemaStore};

/// Result of an advance attempt before it is mapped for a caller
enum Advanced {
    Moved(StepView),
    Rejected {
        view: StepView,
        error: FieldRequired,
    },
}

pub struct SubmissionEngine {
    schema: Arc<dyn SchemaStore>,
    responses: Arc<dyn ResponseStore>,
    locks: SessionLocks,
}

impl SubmissionEngine {
    pub fn new(schema: Arc<dyn SchemaStore>, responses: Arc<dyn ResponseStore>) -> Self {
        Self {
            schema,
            responses,
            locks: SessionLocks::new(),
        }
    }

    /// Begin a new submission for a published form
    pub async fn start_submission(&self, form_id: FormId) -> EngineResult<StepView> {
        let form = self
            .schema
            .form(form_id)
            .await?
            .ok_or(EngineError::FormNotFound(form_id))?;

        if !self.schema.is_published(form_id).await? {
            warn!("Rejected submission start for unpublished form {}", form_id);
            return Err(EngineError::FormNotPublished(form_id));
        }

        let session = self
            .responses
            .create_session(NewSession {
                key: SubmissionKey::generate(),
                form_id,
                started_at: time::now(),
            })
            .await?;

        info!("Submission {} started for form {}", session.id, form_id);

        let fields = self.step_fields(&form, 1).await?;
        Ok(StepView::in_progress(
            &session,
            1,
            fields.into_iter().map(|definition| StepField { definition, value: None }).collect(),
        ))
    }

    /// Dispatch one step submission from the web layer
    ///
    /// A missing required field on `Next` is not an error here: the current
    /// step is returned again with the submitted values and `error` set.
    pub async fn submit_step(
        &self,
        key: &SubmissionKey,
        action: StepAction,
        answers: &Answers,
    ) -> EngineResult<SubmitOutcome> {
        match action {
            StepAction::Next => match self.advance_inner(key, answers).await? {
                Advanced::Moved(view) => Ok(SubmitOutcome::ok(view)),
                Advanced::Rejected { view, error } => Ok(SubmitOutcome {
                    view,
                    error: Some(error),
                }),
            },
            StepAction::Prev => self.retreat(key, answers).await.map(SubmitOutcome::ok),
            StepAction::Complete => self.complete(key, answers).await.map(SubmitOutcome::ok),
        }
    }

    /// Validate and persist the current step, then move to the next one
    pub async fn advance(&self, key: &SubmissionKey, answers: &Answers) -> EngineResult<StepView> {
        match self.advance_inner(key, answers).await? {
            Advanced::Moved(view) => Ok(view),
            Advanced::Rejected { error, .. } => Err(EngineError::ValidationFailed {
                field_id: error.field_id,
                label: error.label,
            }),
        }
    }

    async fn advance_inner(&self, key: &SubmissionKey, answers: &Answers) -> EngineResult<Advanced> {
        let _guard = self.locks.lock(key).await;
        let (mut session, form) = self.load(key).await?;

        if session.is_completed() {
            return Ok(Advanced::Moved(StepView::completed(&session)));
        }

        let step = current_step(&form, &session);
        let fields = self.step_fields(&form, step).await?;

        if let Some(missing) = first_missing_required(&fields, answers) {
            warn!(
                "Submission {} step {}: required field {} missing",
                session.id, step, missing.id
            );
            let error = FieldRequired {
                field_id: missing.id,
                label: missing.label.clone(),
            };
            let fields = fields
                .into_iter()
                .map(|definition| {
                    let value = answers.get(&definition.id).cloned();
                    StepField { definition, value }
                })
                .collect();
            return Ok(Advanced::Rejected {
                view: StepView::in_progress(&session, step, fields),
                error,
            });
        }

        self.persist_answers(&session, &fields, answers).await?;

        let next = step + 1;
        let next_fields = if form.multi_step {
            self.schema.fields_for_step(form.id, next).await?
        } else {
            Vec::new()
        };

        if next_fields.is_empty() {
            session.complete(time::now());
            self.responses.save_session(&session).await?;
            info!("Submission {} completed at step {}", session.id, step);
            return Ok(Advanced::Moved(StepView::completed(&session)));
        }

        session.current_step = next;
        self.responses.save_session(&session).await?;
        debug!("Submission {} advanced to step {}", session.id, next);

        let fields = self.with_prefill(&session, next_fields).await?;
        Ok(Advanced::Moved(StepView::in_progress(&session, next, fields)))
    }

    /// Persist whatever was supplied for the current step and move back one
    pub async fn retreat(&self, key: &SubmissionKey, answers: &Answers) -> EngineResult<StepView> {
        let _guard = self.locks.lock(key).await;
        let (mut session, form) = self.load(key).await?;

        if session.is_completed() {
            return Ok(StepView::completed(&session));
        }

        let step = current_step(&form, &session);
        let fields = self.step_fields(&form, step).await?;
        self.persist_answers(&session, &fields, answers).await?;

        let previous = step.saturating_sub(1).max(1);
        if previous != session.current_step {
            session.current_step = previous;
            self.responses.save_session(&session).await?;
            debug!("Submission {} moved back to step {}", session.id, previous);
        }

        let fields = if previous == step {
            fields
        } else {
            self.step_fields(&form, previous).await?
        };
        let fields = self.with_prefill(&session, fields).await?;
        Ok(StepView::in_progress(&session, previous, fields))
    }

    /// Persist whatever was supplied for the current step and finish
    ///
    /// Completing an already completed session changes nothing.
    pub async fn complete(&self, key: &SubmissionKey, answers: &Answers) -> EngineResult<StepView> {
        let _guard = self.locks.lock(key).await;
        let (mut session, form) = self.load(key).await?;

        if session.is_completed() {
            debug!("Submission {} already completed", session.id);
            return Ok(StepView::completed(&session));
        }

        let step = current_step(&form, &session);
        let fields = self.step_fields(&form, step).await?;
        self.persist_answers(&session, &fields, answers).await?;

        session.complete(time::now());
        self.responses.save_session(&session).await?;
        info!("Submission {} completed at step {}", session.id, step);

        Ok(StepView::completed(&session))
    }

    /// Current state of a session, with previously saved answers filled in
    pub async fn resume_submission(&self, key: &SubmissionKey) -> EngineResult<StepView> {
        let _guard = self.locks.lock(key).await;
        let (session, form) = self.load(key).await?;

        if session.is_completed() {
            return Ok(StepView::completed(&session));
        }

        let step = current_step(&form, &session);
        let fields = self.step_fields(&form, step).await?;
        let fields = self.with_prefill(&session, fields).await?;
        Ok(StepView::in_progress(&session, step, fields))
    }

    /// Every recorded answer of a session, in form order
    pub async fn view_submission(&self, key: &SubmissionKey) -> EngineResult<SubmissionSummary> {
        let _guard = self.locks.lock(key).await;
        let (session, form) = self.load(key).await?;

        let mut recorded: HashMap<FieldId, String> = self
            .responses
            .responses_for_session(session.id)
            .await?
            .into_iter()
            .map(|record| (record.field_id, record.value))
            .collect();

        // Answers to fields deleted since are dropped
        let answers = self
            .schema
            .all_fields(form.id)
            .await?
            .into_iter()
            .filter_map(|field| {
                recorded.remove(&field.id).map(|value| AnsweredField {
                    field_id: field.id,
                    step: field.step,
                    label: field.label,
                    kind: field.kind,
                    value,
                })
            })
            .collect();

        Ok(SubmissionSummary {
            key: session.key,
            form_id: form.id,
            form_title: form.title,
            status: session.status,
            current_step: session.current_step,
            started_at: session.started_at,
            completed_at: session.completed_at,
            answers,
        })
    }

    async fn load(&self, key: &SubmissionKey) -> EngineResult<(SubmissionSession, Form)> {
        let session = self
            .responses
            .session_by_key(key)
            .await?
            .ok_or(EngineError::SessionNotFound)?;

        let form = self
            .schema
            .form(session.form_id)
            .await?
            .ok_or(EngineError::FormNotFound(session.form_id))?;

        Ok((session, form))
    }

    async fn step_fields(&self, form: &Form, step: u32) -> EngineResult<Vec<FieldDefinition>> {
        let fields = if form.multi_step {
            self.schema.fields_for_step(form.id, step).await?
        } else {
            self.schema.all_fields(form.id).await?
        };
        Ok(fields)
    }

    /// Write non-blank answers for the given fields as one batch
    async fn persist_answers(
        &self,
        session: &SubmissionSession,
        fields: &[FieldDefinition],
        answers: &Answers,
    ) -> EngineResult<()> {
        let batch: Vec<(FieldId, String)> = fields
            .iter()
            .filter_map(|field| {
                answers
                    .get(&field.id)
                    .filter(|value| !is_blank(value))
                    .map(|value| (field.id, value.clone()))
            })
            .collect();

        if batch.is_empty() {
            return Ok(());
        }

        self.responses.upsert_responses(session.id, &batch).await?;
        debug!("Submission {}: saved {} answers", session.id, batch.len());
        Ok(())
    }

    async fn with_prefill(
        &self,
        session: &SubmissionSession,
        fields: Vec<FieldDefinition>,
    ) -> EngineResult<Vec<StepField>> {
        let mut prefilled = Vec::with_capacity(fields.len());
        for definition in fields {
            let value = self.responses.latest_response(session.id, definition.id).await?;
            prefilled.push(StepField { definition, value });
        }
        Ok(prefilled)
    }
}

/// Single-step forms always sit at step 1
fn current_step(form: &Form, session: &SubmissionSession) -> u32 {
    if form.multi_step {
        session.current_step
    } else {
        1
    }
}

fn first_missing_required<'a>(
    fields: &'a [FieldDefinition],
    answers: &Answers,
) -> Option<&'a FieldDefinition> {
    fields.iter().find(|field| {
        field.required && answers.get(&field.id).map_or(true, |value| is_blank(value))
    })
}
