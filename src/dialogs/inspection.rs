//! Two-stage inspection dialog
//!
//! A confirmation step either starts inspection (record collected) or
//! continues it (record already under inspection). An accepted entry call
//! moves the record under inspection and opens the full inspection form.
//! Callers re-read the record through their own `after_action`.

use chrono::Utc;
use crate::domain::aggregates::{ReturnRequest, ReturnStatus};
use crate::domain::events::ReturnEvent;
use crate::domain::value_objects::ReturnId;
use crate::service::ReturnService;
use crate::workflow::forms::{FormContext, InspectionForm, StartInspectionForm};
use super::shell::{DialogShell, Feedback, SubmitOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InspectionMode {
    Start,
    Continue,
}

#[derive(Debug)]
enum Stage {
    Confirm { mode: InspectionMode, entry: DialogShell<StartInspectionForm> },
    Form(DialogShell<InspectionForm>),
}

#[derive(Debug)]
pub struct InspectionFlow {
    return_id: ReturnId,
    stage: Stage,
}

impl InspectionFlow {
    /// Starts inspection unless the record is already under inspection. The
    /// entry call re-checks the status, so a stale snapshot surfaces there.
    pub fn open(record: &ReturnRequest) -> Self {
        let mode = match record.return_status {
            ReturnStatus::UnderInspection => InspectionMode::Continue,
            _ => InspectionMode::Start,
        };
        let entry = DialogShell::open(record.id.clone(), record.return_status.clone(), StartInspectionForm::default());
        Self { return_id: record.id.clone(), stage: Stage::Confirm { mode, entry } }
    }

    /// Skip confirmation and open the inspection form directly.
    pub fn resume(record: &ReturnRequest) -> Self {
        Self {
            return_id: record.id.clone(),
            stage: Stage::Form(DialogShell::open(record.id.clone(), record.return_status.clone(), InspectionForm::default())),
        }
    }

    /// Staff identifier recorded by the entry call.
    pub fn assign_staff(&mut self, staff_id: impl Into<String>) {
        if let Stage::Confirm { entry, .. } = &mut self.stage {
            entry.form.staff_id = staff_id.into();
        }
    }

    pub fn mode(&self) -> Option<InspectionMode> {
        match &self.stage {
            Stage::Confirm { mode, .. } => Some(*mode),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        match &self.stage {
            Stage::Confirm { entry, .. } => entry.is_open(),
            Stage::Form(shell) => shell.is_open(),
        }
    }

    /// Enabled state of the current stage's submit control.
    pub fn can_submit(&self) -> bool {
        match &self.stage {
            Stage::Confirm { entry, .. } => entry.can_submit(),
            Stage::Form(shell) => shell.can_submit(),
        }
    }

    pub fn in_form_stage(&self) -> bool { matches!(self.stage, Stage::Form(_)) }

    pub fn form_mut(&mut self) -> Option<&mut InspectionForm> {
        match &mut self.stage {
            Stage::Form(shell) => Some(&mut shell.form),
            _ => None,
        }
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        match &self.stage {
            Stage::Confirm { entry, .. } => entry.feedback(),
            Stage::Form(shell) => shell.feedback(),
        }
    }

    pub fn close(&mut self) {
        match &mut self.stage {
            Stage::Confirm { entry, .. } => entry.close(),
            Stage::Form(shell) => shell.close(),
        }
    }

    /// Confirm the first stage. Starting requires an assigned staff id.
    pub async fn confirm(&mut self, service: &dyn ReturnService, ctx: &FormContext) -> SubmitOutcome {
        let (mode, entry) = match &mut self.stage {
            Stage::Confirm { mode, entry } => (*mode, entry),
            _ => return SubmitOutcome::Closed,
        };
        if mode == InspectionMode::Continue {
            if !entry.is_open() { return SubmitOutcome::Closed; }
            let form = DialogShell::open(self.return_id.clone(), ReturnStatus::UnderInspection, InspectionForm::default());
            self.stage = Stage::Form(form);
            return SubmitOutcome::Proceeded;
        }

        let staff = entry.form.staff_id.trim().to_string();
        let outcome = entry.submit(service, ctx).await;
        if !matches!(outcome, SubmitOutcome::Completed(_)) {
            return outcome;
        }
        tracing::info!(return_id = %self.return_id, staff_id = %staff, "inspection started");
        let form = DialogShell::open(self.return_id.clone(), ReturnStatus::UnderInspection, InspectionForm::default());
        self.stage = Stage::Form(form);
        SubmitOutcome::Completed(ReturnEvent::InspectionEntered { return_id: self.return_id.clone(), staff_id: staff, at: Utc::now() })
    }

    /// Submit the inspection result from the form stage.
    pub async fn submit(&mut self, service: &dyn ReturnService, ctx: &FormContext) -> SubmitOutcome {
        match &mut self.stage {
            Stage::Form(shell) => shell.submit(service, ctx).await,
            Stage::Confirm { .. } => SubmitOutcome::Failed(Feedback::Failed {
                message: "Confirm the inspection before submitting the result".into(),
            }),
        }
    }
}
