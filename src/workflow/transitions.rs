//! Transition table
//!
//! The return service decides what status a transition leads to. This table
//! only says which actions may be offered for a status and role, and what
//! input each one collects.
//!
//! ```text
//! Requested ──► Validated ──► Pickup_Scheduled ──► Pickup_Completed ──► Under_Inspection
//!     │                                                                   │        │
//!     ▼                                                                   ▼        ▼
//!  Rejected*                                                          Rejected*  Approved
//!                                                                                  │
//!                                      Refund_Failed* ◄── Intiated_Refund ◄────────┘
//!                                                              │
//!                                                              ▼
//!                                                       Refund_Completed*
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::aggregates::ReturnStatus;
use crate::workflow::auth::Role;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnAction {
    Validate,
    Reject,
    SchedulePickup,
    InitiateBorzoPickup,
    CompletePickup,
    StartInspection,
    ContinueInspection,
    SubmitInspection,
    InitiateRefund,
}

impl ReturnAction {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Reject => "reject",
            Self::SchedulePickup => "schedule-pickup",
            Self::InitiateBorzoPickup => "initiate-borzo-pickup",
            Self::CompletePickup => "complete-pickup",
            Self::StartInspection => "start-inspection",
            Self::ContinueInspection => "continue-inspection",
            Self::SubmitInspection => "submit-inspection",
            Self::InitiateRefund => "initiate-refund",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        TRANSITIONS.iter().map(|r| r.action).find(|a| a.slug() == slug)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Validate => "Validate",
            Self::Reject => "Reject",
            Self::SchedulePickup => "Schedule Pickup",
            Self::InitiateBorzoPickup => "Initiate Borzo Pickup",
            Self::CompletePickup => "Complete Pickup",
            Self::StartInspection => "Start Inspection",
            Self::ContinueInspection => "Continue Inspection",
            Self::SubmitInspection => "Submit Inspection",
            Self::InitiateRefund => "Initiate Refund",
        }
    }

    pub fn rule(&self) -> &'static TransitionRule {
        // every action has exactly one row
        TRANSITIONS.iter().find(|r| r.action == *self).unwrap_or(&TRANSITIONS[0])
    }

    pub fn is_legal_from(&self, status: &ReturnStatus) -> bool {
        self.rule().from.contains(status)
    }

    pub fn permits(&self, role: Role) -> bool {
        self.rule().actors.contains(&role)
    }
}

impl fmt::Display for ReturnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.slug()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
    /// Required only when the inspection decision is a rejection.
    RequiredWhenRejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputField {
    pub name: &'static str,
    pub requirement: Requirement,
}

const fn required(name: &'static str) -> InputField { InputField { name, requirement: Requirement::Required } }
const fn optional(name: &'static str) -> InputField { InputField { name, requirement: Requirement::Optional } }

#[derive(Debug)]
pub struct TransitionRule {
    pub action: ReturnAction,
    pub from: &'static [ReturnStatus],
    pub actors: &'static [Role],
    pub inputs: &'static [InputField],
    /// Whether the action appears in row / header menus. Submitting an
    /// inspection happens inside the inspection flow, never from a menu.
    pub menu: bool,
}

const ADMINS: &[Role] = &[Role::SuperAdmin, Role::Admin];
const FULFILLMENT: &[Role] = &[Role::FulfillmentStaff];
const INSPECTORS: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::FulfillmentStaff];

pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        action: ReturnAction::Validate,
        from: &[ReturnStatus::Requested],
        actors: ADMINS,
        inputs: &[],
        menu: true,
    },
    TransitionRule {
        action: ReturnAction::Reject,
        from: &[ReturnStatus::Requested],
        actors: ADMINS,
        inputs: &[required("rejectionReason")],
        menu: true,
    },
    TransitionRule {
        action: ReturnAction::SchedulePickup,
        from: &[ReturnStatus::Validated],
        actors: FULFILLMENT,
        inputs: &[
            required("scheduledDate"),
            required("pickupAddress.address"),
            required("pickupAddress.city"),
            required("pickupAddress.state"),
            required("pickupAddress.pincode"),
        ],
        menu: true,
    },
    TransitionRule {
        action: ReturnAction::InitiateBorzoPickup,
        from: &[ReturnStatus::Validated],
        actors: FULFILLMENT,
        inputs: &[required("securePackageAmount")],
        menu: true,
    },
    TransitionRule {
        action: ReturnAction::CompletePickup,
        from: &[ReturnStatus::PickupScheduled],
        actors: FULFILLMENT,
        inputs: &[required("trackingNumber")],
        menu: true,
    },
    TransitionRule {
        action: ReturnAction::StartInspection,
        from: &[ReturnStatus::PickupCompleted],
        actors: INSPECTORS,
        inputs: &[required("staffId")],
        menu: true,
    },
    TransitionRule {
        action: ReturnAction::ContinueInspection,
        from: &[ReturnStatus::UnderInspection],
        actors: INSPECTORS,
        inputs: &[],
        menu: true,
    },
    TransitionRule {
        action: ReturnAction::SubmitInspection,
        from: &[ReturnStatus::UnderInspection],
        actors: INSPECTORS,
        inputs: &[
            required("skuMatch"),
            required("condition"),
            optional("conditionNotes"),
            optional("inspectionImages"),
            required("isApproved"),
            InputField { name: "rejectionReason", requirement: Requirement::RequiredWhenRejected },
        ],
        menu: false,
    },
    TransitionRule {
        action: ReturnAction::InitiateRefund,
        from: &[ReturnStatus::Approved],
        actors: FULFILLMENT,
        inputs: &[required("reason")],
        menu: true,
    },
];

/// Menu actions to offer for a record in `status` to someone acting as `role`.
///
/// Shared by list rows and the detail header so the two cannot drift. An empty
/// result is the "no actions available" state.
pub fn legal_actions(status: &ReturnStatus, role: Role) -> Vec<ReturnAction> {
    TRANSITIONS
        .iter()
        .filter(|rule| rule.menu && rule.from.contains(status) && rule.actors.contains(&role))
        .map(|rule| rule.action)
        .collect()
}
