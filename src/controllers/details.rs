//! Single return claim view

use serde::Serialize;
use std::sync::Arc;
use crate::dialogs::{ActionDialog, SubmitOutcome};
use crate::domain::aggregates::{ReturnRequest, TimelineEntry};
use crate::domain::value_objects::ReturnId;
use crate::service::{ReturnService, StaffDirectory};
use crate::workflow::forms::FormContext;
use crate::workflow::{legal_actions, resolve_staff_id, AuthContext, ReturnAction, Role};
use crate::ReturnClaimsError;

pub struct ReturnDetails {
    service: Arc<dyn ReturnService>,
    directory: Arc<dyn StaffDirectory>,
    auth: AuthContext,
    role: Role,
    id: ReturnId,
    record: Option<ReturnRequest>,
    loading: bool,
    error: Option<String>,
    not_found: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailView {
    pub record: Option<ReturnRequest>,
    pub actions: Vec<ReturnAction>,
    pub timeline: Vec<TimelineEntry>,
    pub error: Option<String>,
}

impl ReturnDetails {
    /// Fails for a session without a role this workflow serves.
    pub fn new(
        service: Arc<dyn ReturnService>,
        directory: Arc<dyn StaffDirectory>,
        auth: AuthContext,
        id: ReturnId,
    ) -> crate::Result<Self> {
        let role = auth.role.ok_or(ReturnClaimsError::Unauthorized)?;
        Ok(Self { service, directory, auth, role, id, record: None, loading: false, error: None, not_found: false })
    }

    pub fn id(&self) -> &ReturnId { &self.id }
    pub fn record(&self) -> Option<&ReturnRequest> { self.record.as_ref() }
    pub fn is_loading(&self) -> bool { self.loading }
    pub fn error(&self) -> Option<&str> { self.error.as_deref() }
    pub fn is_not_found(&self) -> bool { self.not_found }

    /// Read the record. On failure the previous read is dropped.
    pub async fn load(&mut self) -> bool {
        self.loading = true;
        let result = self.service.get_return_request_by_id(&self.id).await;
        self.loading = false;
        match result {
            Ok(record) => {
                tracing::info!(return_id = %self.id, status = %record.return_status, "loaded return claim");
                self.record = Some(record);
                self.error = None;
                self.not_found = false;
                true
            }
            Err(e) => {
                tracing::error!(return_id = %self.id, error = %e, "failed to load return claim");
                self.record = None;
                self.not_found = e.is_not_found();
                self.error = Some(if self.not_found { ReturnClaimsError::NotFound.to_string() } else { e.user_message() });
                false
            }
        }
    }

    /// Header buttons and the available-actions tab.
    pub fn actions(&self) -> Vec<ReturnAction> {
        self.record.as_ref().map(|r| legal_actions(&r.return_status, self.role)).unwrap_or_default()
    }

    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.record.as_ref().map(|r| r.timestamps.timeline()).unwrap_or_default()
    }

    pub fn view(&self) -> DetailView {
        DetailView {
            record: self.record.clone(),
            actions: self.actions(),
            timeline: self.timeline(),
            error: self.error.clone(),
        }
    }

    /// Open the dialog for `action`. Starting inspection first resolves the
    /// staff identifier to record.
    pub async fn open_action(&self, action: ReturnAction, ctx: &FormContext) -> crate::Result<ActionDialog> {
        if !action.permits(self.role) {
            return Err(ReturnClaimsError::Forbidden { action, role: self.role });
        }
        let record = self.record.as_ref().ok_or(ReturnClaimsError::NotFound)?;
        let mut dialog = ActionDialog::open(action, record, ctx);
        if dialog.needs_staff() {
            let staff_id = resolve_staff_id(&self.auth, self.directory.as_ref()).await?;
            dialog.assign_staff(staff_id);
        }
        Ok(dialog)
    }

    /// Re-read once after an accepted transition.
    pub async fn after_action(&mut self, outcome: &SubmitOutcome) -> bool {
        if !outcome.accepted() {
            return false;
        }
        self.load().await
    }
}
