//! Action dialogs
//!
//! One dialog per transition. Each pairs a pure form from
//! [`crate::workflow::forms`] with the single service call that carries its
//! payload, wired through [`DialogShell`].

pub mod inspection;
pub mod shell;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::domain::aggregates::ReturnRequest;
use crate::domain::value_objects::{ReturnId, TrackingNumber};
use crate::service::{
    BorzoPickupPayload, CompletePickupPayload, InspectionEntryPayload, InspectionPayload, RefundInitiatePayload,
    RejectPayload, ReturnService, SchedulePickupPayload, ServiceError,
};
use crate::workflow::forms::{
    ActionForm, BorzoPickupForm, CompletePickupForm, FormContext, InspectionForm, RefundForm, RejectForm,
    SchedulePickupForm, StartInspectionForm, ValidateForm,
};
use crate::workflow::ReturnAction;

pub use inspection::{InspectionFlow, InspectionMode};
pub use shell::{DialogShell, Feedback, SubmitOutcome, Ticket, Transition};

// =============================================================================
// Transitions
// =============================================================================

#[async_trait]
impl Transition for ValidateForm {
    /// Validation shows an inline success state and waits for the user to close.
    const CLOSE_ON_SUCCESS: bool = false;

    async fn send(&self, service: &dyn ReturnService, id: &ReturnId, _payload: &()) -> Result<(), ServiceError> {
        service.validate_return_request(id).await
    }
}

#[async_trait]
impl Transition for RejectForm {
    async fn send(&self, service: &dyn ReturnService, id: &ReturnId, payload: &RejectPayload) -> Result<(), ServiceError> {
        service.reject_return_request(id, payload).await
    }
}

#[async_trait]
impl Transition for SchedulePickupForm {
    async fn send(&self, service: &dyn ReturnService, id: &ReturnId, payload: &SchedulePickupPayload) -> Result<(), ServiceError> {
        service.schedule_pickup(id, payload).await
    }
}

#[async_trait]
impl Transition for BorzoPickupForm {
    async fn send(&self, service: &dyn ReturnService, id: &ReturnId, payload: &BorzoPickupPayload) -> Result<(), ServiceError> {
        service.initiate_borzo_pickup(id, payload).await
    }
}

#[async_trait]
impl Transition for CompletePickupForm {
    async fn send(&self, service: &dyn ReturnService, id: &ReturnId, payload: &CompletePickupPayload) -> Result<(), ServiceError> {
        service.complete_pickup(id, payload).await
    }
}

#[async_trait]
impl Transition for StartInspectionForm {
    async fn send(&self, service: &dyn ReturnService, id: &ReturnId, payload: &InspectionEntryPayload) -> Result<(), ServiceError> {
        service.inspect_return_request(id, payload).await
    }
}

#[async_trait]
impl Transition for InspectionForm {
    async fn send(&self, service: &dyn ReturnService, id: &ReturnId, payload: &InspectionPayload) -> Result<(), ServiceError> {
        service.start_inspect_return_request(id, payload).await
    }
}

#[async_trait]
impl Transition for RefundForm {
    async fn send(&self, service: &dyn ReturnService, id: &ReturnId, reason: &String) -> Result<(), ServiceError> {
        let payload = RefundInitiatePayload { return_id: id.clone(), reason: reason.clone() };
        service.refund_initiate(&payload).await
    }
}

// =============================================================================
// Dialog dispatch
// =============================================================================

/// An open dialog for one action on one record.
#[derive(Debug)]
pub enum ActionDialog {
    Validate(DialogShell<ValidateForm>),
    Reject(DialogShell<RejectForm>),
    SchedulePickup(DialogShell<SchedulePickupForm>),
    BorzoPickup(DialogShell<BorzoPickupForm>),
    CompletePickup(DialogShell<CompletePickupForm>),
    Inspect(InspectionFlow),
    InitiateRefund(DialogShell<RefundForm>),
}

impl ActionDialog {
    /// Open the dialog for `action` against `record` as last read. Prefills
    /// come from the record; status is re-checked on submit, not here.
    pub fn open(action: ReturnAction, record: &ReturnRequest, ctx: &FormContext) -> Self {
        let id = record.id.clone();
        let status = record.return_status.clone();
        match action {
            ReturnAction::Validate => Self::Validate(DialogShell::open(id, status, ValidateForm::default())),
            ReturnAction::Reject => Self::Reject(DialogShell::open(id, status, RejectForm::default())),
            ReturnAction::SchedulePickup => {
                let form = SchedulePickupForm::prefilled(record.scheduled_pickup_address());
                Self::SchedulePickup(DialogShell::open(id, status, form))
            }
            ReturnAction::InitiateBorzoPickup => Self::BorzoPickup(DialogShell::open(id, status, BorzoPickupForm::default())),
            ReturnAction::CompletePickup => {
                let tracking_number = match record.tracking_number() {
                    Some(existing) => existing.to_string(),
                    None => TrackingNumber::placeholder(ctx.now).as_str().to_string(),
                };
                Self::CompletePickup(DialogShell::open(id, status, CompletePickupForm { tracking_number }))
            }
            ReturnAction::StartInspection | ReturnAction::ContinueInspection => Self::Inspect(InspectionFlow::open(record)),
            ReturnAction::SubmitInspection => Self::Inspect(InspectionFlow::resume(record)),
            ReturnAction::InitiateRefund => Self::InitiateRefund(DialogShell::open(id, status, RefundForm::default())),
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            Self::Validate(d) => d.is_open(),
            Self::Reject(d) => d.is_open(),
            Self::SchedulePickup(d) => d.is_open(),
            Self::BorzoPickup(d) => d.is_open(),
            Self::CompletePickup(d) => d.is_open(),
            Self::Inspect(flow) => flow.is_open(),
            Self::InitiateRefund(d) => d.is_open(),
        }
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        match self {
            Self::Validate(d) => d.feedback(),
            Self::Reject(d) => d.feedback(),
            Self::SchedulePickup(d) => d.feedback(),
            Self::BorzoPickup(d) => d.feedback(),
            Self::CompletePickup(d) => d.feedback(),
            Self::Inspect(flow) => flow.feedback(),
            Self::InitiateRefund(d) => d.feedback(),
        }
    }

    /// Enabled state of the submit control. Pickup scheduling also requires
    /// a complete form before the control enables.
    pub fn can_submit(&self, ctx: &FormContext) -> bool {
        match self {
            Self::Validate(d) => d.can_submit(),
            Self::Reject(d) => d.can_submit(),
            Self::SchedulePickup(d) => d.can_submit() && d.form.is_submittable(ctx),
            Self::BorzoPickup(d) => d.can_submit(),
            Self::CompletePickup(d) => d.can_submit(),
            Self::Inspect(flow) => flow.can_submit(),
            Self::InitiateRefund(d) => d.can_submit(),
        }
    }

    /// Whether submitting the current stage records a staff identifier.
    pub fn needs_staff(&self) -> bool {
        matches!(self, Self::Inspect(flow) if flow.mode() == Some(InspectionMode::Start))
    }

    pub fn assign_staff(&mut self, staff_id: impl Into<String>) {
        if let Self::Inspect(flow) = self {
            flow.assign_staff(staff_id);
        }
    }

    pub fn close(&mut self) {
        match self {
            Self::Validate(d) => d.close(),
            Self::Reject(d) => d.close(),
            Self::SchedulePickup(d) => d.close(),
            Self::BorzoPickup(d) => d.close(),
            Self::CompletePickup(d) => d.close(),
            Self::Inspect(flow) => flow.close(),
            Self::InitiateRefund(d) => d.close(),
        }
    }

    /// Take user input as a JSON object of wire-named fields. `null` leaves
    /// the form as it is.
    pub fn fill(&mut self, body: Value) -> Result<(), serde_json::Error> {
        if body.is_null() { return Ok(()); }
        match self {
            Self::Validate(_) => Ok(()),
            Self::Reject(d) => absorb_json(&mut d.form, body),
            Self::SchedulePickup(d) => absorb_json(&mut d.form, body),
            Self::BorzoPickup(d) => absorb_json(&mut d.form, body),
            Self::CompletePickup(d) => absorb_json(&mut d.form, body),
            Self::Inspect(flow) => match flow.form_mut() {
                Some(form) => absorb_json(form, body),
                None => Ok(()),
            },
            Self::InitiateRefund(d) => absorb_json(&mut d.form, body),
        }
    }

    /// Submit the current stage. For inspection that is either the
    /// confirmation or the result form.
    pub async fn submit(&mut self, service: &dyn ReturnService, ctx: &FormContext) -> SubmitOutcome {
        match self {
            Self::Validate(d) => d.submit(service, ctx).await,
            Self::Reject(d) => d.submit(service, ctx).await,
            Self::SchedulePickup(d) => d.submit(service, ctx).await,
            Self::BorzoPickup(d) => d.submit(service, ctx).await,
            Self::CompletePickup(d) => d.submit(service, ctx).await,
            Self::Inspect(flow) if flow.in_form_stage() => flow.submit(service, ctx).await,
            Self::Inspect(flow) => flow.confirm(service, ctx).await,
            Self::InitiateRefund(d) => d.submit(service, ctx).await,
        }
    }
}

fn absorb_json<F: ActionForm + DeserializeOwned>(form: &mut F, body: Value) -> Result<(), serde_json::Error> {
    let incoming: F = serde_json::from_value(body)?;
    form.absorb(incoming);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::return_request::tests::sample;
    use crate::domain::aggregates::{PickupRequest, ReturnStatus};
    use crate::domain::value_objects::PickupAddress;
    use crate::service::fake::FakeReturnService;
    use crate::workflow::{legal_actions, Role};
    use chrono::NaiveDate;
    use serde_json::json;

    fn ctx() -> FormContext { FormContext::on(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()) }

    #[tokio::test]
    async fn test_validate_confirm_shows_inline_success() {
        let record = sample("r1", ReturnStatus::Requested);
        let fake = FakeReturnService::with_records([record.clone()]);
        let mut dialog = ActionDialog::open(ReturnAction::Validate, &record, &ctx());

        let outcome = dialog.submit(&fake, &ctx()).await;
        assert!(outcome.accepted());
        assert!(dialog.is_open());
        assert!(!dialog.can_submit(&ctx()));
        assert_eq!(fake.calls_named("validate_return_request"), 1);
        assert_eq!(fake.status_of("r1"), Some(ReturnStatus::Validated));
        assert!(legal_actions(&ReturnStatus::Validated, Role::Admin).is_empty());
    }

    #[tokio::test]
    async fn test_schedule_then_complete_on_stale_row() {
        let stale = sample("r2", ReturnStatus::Validated);
        let fake = FakeReturnService::with_records([stale.clone()]);

        let mut schedule = ActionDialog::open(ReturnAction::SchedulePickup, &stale, &ctx());
        assert!(!schedule.can_submit(&ctx()));
        schedule
            .fill(json!({
                "scheduledDate": "2026-10-19",
                "pickupAddress": { "address": "14 MG Road", "city": "Pune", "state": "MH", "pincode": "411001" }
            }))
            .unwrap();
        assert!(schedule.can_submit(&ctx()));
        assert!(schedule.submit(&fake, &ctx()).await.accepted());
        assert!(!schedule.is_open());
        assert_eq!(fake.status_of("r2"), Some(ReturnStatus::PickupScheduled));

        let mutations = fake.mutation_count();
        let mut complete = ActionDialog::open(ReturnAction::CompletePickup, &stale, &ctx());
        let outcome = complete.submit(&fake, &ctx()).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(Feedback::InvalidStatus { ref status }) if status == "Validated"));
        assert!(complete.feedback().unwrap().message().starts_with("Invalid Status"));
        assert_eq!(fake.mutation_count(), mutations);
        assert!(complete.is_open());
    }

    #[test]
    fn test_schedule_prefills_existing_address() {
        let mut record = sample("r3", ReturnStatus::Validated);
        let address = PickupAddress { address: "2 Hill St".into(), city: "Goa".into(), state: "GA".into(), pincode: "403001".into() };
        record.pickup_request = Some(PickupRequest { pickup_address: Some(address.clone()), ..Default::default() });
        match ActionDialog::open(ReturnAction::SchedulePickup, &record, &ctx()) {
            ActionDialog::SchedulePickup(d) => assert_eq!(d.form.pickup_address, address),
            other => panic!("unexpected dialog {other:?}"),
        }
    }

    #[test]
    fn test_complete_pickup_prefill() {
        let mut record = sample("r4", ReturnStatus::PickupScheduled);
        match ActionDialog::open(ReturnAction::CompletePickup, &record, &ctx()) {
            ActionDialog::CompletePickup(d) => assert!(d.form.tracking_number.starts_with("TRK_")),
            other => panic!("unexpected dialog {other:?}"),
        }

        record.pickup_request = Some(PickupRequest { tracking_number: Some("DLV-889".into()), ..Default::default() });
        let mut dialog = ActionDialog::open(ReturnAction::CompletePickup, &record, &ctx());
        match &dialog {
            ActionDialog::CompletePickup(d) => assert_eq!(d.form.tracking_number, "DLV-889"),
            other => panic!("unexpected dialog {other:?}"),
        }
        dialog.fill(json!({ "trackingNumber": "DLV-900" })).unwrap();
        match &dialog {
            ActionDialog::CompletePickup(d) => assert_eq!(d.form.tracking_number, "DLV-900"),
            other => panic!("unexpected dialog {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reject_client_and_server_errors_differ() {
        let record = sample("r5", ReturnStatus::Requested);
        let fake = FakeReturnService::with_records([record.clone()]);
        let mut dialog = ActionDialog::open(ReturnAction::Reject, &record, &ctx());

        dialog.fill(json!({ "rejectionReason": "too short" })).unwrap();
        let client = dialog.submit(&fake, &ctx()).await;
        assert!(matches!(client, SubmitOutcome::Failed(Feedback::Invalid { .. })));
        assert!(fake.calls().is_empty());

        dialog.fill(json!({ "rejectionReason": "Customer used the part" })).unwrap();
        fake.fail_next(ServiceError::Response { status: 422, message: Some("Reason flagged by policy".into()) });
        let server = dialog.submit(&fake, &ctx()).await;
        assert_eq!(server, SubmitOutcome::Failed(Feedback::Rejected { message: "Reason flagged by policy".into() }));
        assert!(dialog.is_open());
        assert_eq!(fake.status_of("r5"), Some(ReturnStatus::Requested));

        let retried = dialog.submit(&fake, &ctx()).await;
        assert!(retried.accepted());
        assert_eq!(fake.calls_named("reject_return_request"), 2);
    }

    #[tokio::test]
    async fn test_connectivity_failure_keeps_dialog_open() {
        let record = sample("r6", ReturnStatus::Approved);
        let fake = FakeReturnService::with_records([record.clone()]);
        let mut dialog = ActionDialog::open(ReturnAction::InitiateRefund, &record, &ctx());
        dialog.fill(json!({ "reason": "QC passed" })).unwrap();

        fake.fail_next(ServiceError::NoResponse("connection refused".into()));
        let outcome = dialog.submit(&fake, &ctx()).await;
        assert_eq!(outcome, SubmitOutcome::Failed(Feedback::Failed { message: crate::service::NO_RESPONSE.into() }));
        assert!(dialog.is_open());

        assert!(dialog.submit(&fake, &ctx()).await.accepted());
        assert_eq!(
            fake.last_call("refund_initiate").unwrap().body,
            json!({ "returnId": "r6", "reason": "QC passed" })
        );
    }

    #[tokio::test]
    async fn test_inspection_through_dialog_dispatch() {
        let record = sample("r7", ReturnStatus::UnderInspection);
        let fake = FakeReturnService::with_records([record.clone()]);
        let mut dialog = ActionDialog::open(ReturnAction::ContinueInspection, &record, &ctx());

        assert_eq!(dialog.submit(&fake, &ctx()).await, SubmitOutcome::Proceeded);
        dialog.fill(json!({ "condition": "Damaged", "isApproved": false, "rejectionReason": "" })).unwrap();
        assert!(matches!(dialog.submit(&fake, &ctx()).await, SubmitOutcome::Failed(Feedback::Invalid { .. })));
        assert!(fake.calls().is_empty());

        dialog.fill(json!({ "condition": "Damaged", "isApproved": false, "rejectionReason": "Cracked seal" })).unwrap();
        assert!(dialog.submit(&fake, &ctx()).await.accepted());
        assert_eq!(fake.calls_named("start_inspect_return_request"), 1);
        assert!(!dialog.is_open());
    }

    #[test]
    fn test_second_submit_while_in_flight_is_busy() {
        let record = sample("r8", ReturnStatus::Approved);
        let mut shell = DialogShell::open(record.id.clone(), record.return_status.clone(), RefundForm { reason: "QC".into() });
        let ticket = shell.begin(&ctx()).unwrap();
        assert!(!shell.can_submit());
        assert!(matches!(shell.begin(&ctx()), Err(SubmitOutcome::Busy)));

        let outcome = shell.finish(ticket.submission_id, Ok(()));
        assert!(outcome.accepted());
        assert!(!shell.is_open());
    }

    #[test]
    fn test_response_after_close_is_stale() {
        let record = sample("r9", ReturnStatus::Requested);
        let mut shell = DialogShell::open(record.id.clone(), record.return_status.clone(), ValidateForm::default());
        let ticket = shell.begin(&ctx()).unwrap();
        shell.close();

        assert_eq!(shell.finish(ticket.submission_id, Ok(())), SubmitOutcome::Stale { accepted: true });
        assert!(shell.feedback().is_none());
        assert!(!shell.is_submitting());

        let mut other = DialogShell::open(record.id.clone(), record.return_status.clone(), ValidateForm::default());
        let ticket = other.begin(&ctx()).unwrap();
        other.close();
        let failed = other.finish(ticket.submission_id, Err(ServiceError::NoResponse("timeout".into())));
        assert_eq!(failed, SubmitOutcome::Stale { accepted: false });
        assert!(!failed.accepted());
    }
}
