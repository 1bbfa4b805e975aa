//! Domain events
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::value_objects::ReturnId;
use crate::workflow::ReturnAction;

/// Raised when the return service accepts a transition submission.
///
/// Carries the status the dialog was opened against, never a guessed next
/// status; the next read is the only source for that.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ReturnEvent {
    TransitionAccepted {
        return_id: ReturnId,
        action: ReturnAction,
        submission_id: Uuid,
        from_status: String,
        at: DateTime<Utc>,
    },
    InspectionEntered {
        return_id: ReturnId,
        staff_id: String,
        at: DateTime<Utc>,
    },
}

impl ReturnEvent {
    pub fn return_id(&self) -> &ReturnId {
        match self {
            Self::TransitionAccepted { return_id, .. } | Self::InspectionEntered { return_id, .. } => return_id,
        }
    }
}
