//! Common dialog contract
//!
//! A dialog is opened against one record snapshot. Submitting validates
//! locally, re-checks the snapshot's status, then makes exactly one call. On
//! failure the dialog stays open with feedback; nothing is retried.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::ReturnStatus;
use crate::domain::events::ReturnEvent;
use crate::domain::value_objects::ReturnId;
use crate::service::{ReturnService, ServiceError};
use crate::workflow::forms::{ActionForm, FormContext, FormErrors};

/// The network half of a form: one call carrying the validated payload.
#[async_trait]
pub trait Transition: ActionForm {
    /// Dialogs that show an inline success state stay open after success.
    const CLOSE_ON_SUCCESS: bool = true;

    async fn send(&self, service: &dyn ReturnService, id: &ReturnId, payload: &Self::Payload) -> Result<(), ServiceError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Feedback {
    /// Client-side validation; nothing was sent.
    Invalid { errors: FormErrors },
    /// The record is no longer in a status this action applies to.
    InvalidStatus { status: String },
    /// The service refused the payload.
    Rejected { message: String },
    Failed { message: String },
}

impl Feedback {
    pub fn message(&self) -> String {
        match self {
            Self::Invalid { errors } => match errors.len() {
                1 => "Please fix the highlighted field".to_string(),
                n => format!("Please fix the {n} highlighted fields"),
            },
            Self::InvalidStatus { status } => format!("Invalid Status: this return is currently {status}"),
            Self::Rejected { message } | Self::Failed { message } => message.clone(),
        }
    }

    pub(crate) fn from_service(err: &ServiceError, status: &ReturnStatus) -> Self {
        match err.status() {
            Some(409) => Self::InvalidStatus { status: status.to_string() },
            _ if err.is_validation() => Self::Rejected { message: err.user_message() },
            _ => Self::Failed { message: err.user_message() },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// The service accepted the transition. The caller should re-read.
    Completed(ReturnEvent),
    /// Moved to the next stage without contacting the service.
    Proceeded,
    /// Nothing changed server-side; the dialog shows `Feedback`.
    Failed(Feedback),
    /// A response arrived after the dialog was closed. It was not applied to
    /// the dialog, but an accepted transition still warrants a re-read.
    Stale { accepted: bool },
    /// A submission is already in flight.
    Busy,
    /// The dialog is not open.
    Closed,
}

impl SubmitOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Stale { accepted: true })
    }
}

/// Validated payload handed out by [`DialogShell::begin`].
#[derive(Debug)]
pub struct Ticket<P> {
    pub submission_id: Uuid,
    pub payload: P,
}

#[derive(Debug)]
pub struct DialogShell<F: ActionForm> {
    return_id: ReturnId,
    status: ReturnStatus,
    pub form: F,
    open: bool,
    in_flight: Option<Uuid>,
    feedback: Option<Feedback>,
    succeeded: bool,
}

impl<F: ActionForm> DialogShell<F> {
    pub fn open(return_id: ReturnId, status: ReturnStatus, form: F) -> Self {
        Self { return_id, status, form, open: true, in_flight: None, feedback: None, succeeded: false }
    }

    pub fn is_open(&self) -> bool { self.open }
    pub fn is_submitting(&self) -> bool { self.in_flight.is_some() }
    pub fn feedback(&self) -> Option<&Feedback> { self.feedback.as_ref() }

    /// Enabled state of the submit control.
    pub fn can_submit(&self) -> bool {
        self.open && self.in_flight.is_none() && !self.succeeded
    }

    /// Dismiss. An in-flight request is not cancelled; its response will be
    /// reported as stale.
    pub fn close(&mut self) {
        self.open = false;
        self.feedback = None;
    }

    /// Validate and mark a submission in flight.
    pub fn begin(&mut self, ctx: &FormContext) -> Result<Ticket<F::Payload>, SubmitOutcome> {
        if !self.open { return Err(SubmitOutcome::Closed); }
        if self.in_flight.is_some() { return Err(SubmitOutcome::Busy); }
        if !F::ACTION.is_legal_from(&self.status) {
            let feedback = Feedback::InvalidStatus { status: self.status.to_string() };
            tracing::warn!(return_id = %self.return_id, action = %F::ACTION, status = %self.status, "action no longer valid for status");
            self.feedback = Some(feedback.clone());
            return Err(SubmitOutcome::Failed(feedback));
        }
        let payload = match self.form.check(ctx) {
            Ok(payload) => payload,
            Err(errors) => {
                let feedback = Feedback::Invalid { errors };
                self.feedback = Some(feedback.clone());
                return Err(SubmitOutcome::Failed(feedback));
            }
        };
        let submission_id = Uuid::new_v4();
        self.in_flight = Some(submission_id);
        self.feedback = None;
        Ok(Ticket { submission_id, payload })
    }
}

impl<F: Transition> DialogShell<F> {
    /// Apply the response for `submission_id`.
    pub fn finish(&mut self, submission_id: Uuid, result: Result<(), ServiceError>) -> SubmitOutcome {
        if self.in_flight == Some(submission_id) {
            self.in_flight = None;
        }
        if !self.open {
            tracing::warn!(return_id = %self.return_id, action = %F::ACTION, accepted = result.is_ok(), "response arrived after dialog closed");
            return SubmitOutcome::Stale { accepted: result.is_ok() };
        }
        match result {
            Ok(()) => {
                tracing::info!(return_id = %self.return_id, action = %F::ACTION, %submission_id, "transition accepted");
                self.succeeded = true;
                self.feedback = None;
                if F::CLOSE_ON_SUCCESS { self.open = false; }
                SubmitOutcome::Completed(ReturnEvent::TransitionAccepted {
                    return_id: self.return_id.clone(),
                    action: F::ACTION,
                    submission_id,
                    from_status: self.status.to_string(),
                    at: Utc::now(),
                })
            }
            Err(err) => {
                tracing::error!(return_id = %self.return_id, action = %F::ACTION, error = %err, "transition failed");
                let feedback = Feedback::from_service(&err, &self.status);
                self.feedback = Some(feedback.clone());
                SubmitOutcome::Failed(feedback)
            }
        }
    }

    pub async fn submit(&mut self, service: &dyn ReturnService, ctx: &FormContext) -> SubmitOutcome {
        let ticket = match self.begin(ctx) {
            Ok(ticket) => ticket,
            Err(outcome) => return outcome,
        };
        let result = self.form.send(service, &self.return_id, &ticket.payload).await;
        self.finish(ticket.submission_id, result)
    }
}
