//! Return Claims workflow coordinator
//!
//! Drives return requests through their approval pipeline on top of a remote
//! return service. The backend owns the state machine; this crate decides which
//! transitions are legal to offer for a status and role, collects and validates
//! the payload each transition needs, and re-reads the record after every
//! successful submission.
//!
//! ## Features
//! - Declarative transition table with role gating
//! - Per-action dialogs with client-side validation
//! - Role-scoped list controllers (admin, fulfillment staff)
//! - Single-record detail view with lifecycle timeline
//! - JSON gateway over the controllers

pub mod config;
pub mod controllers;
pub mod dialogs;
pub mod domain;
pub mod http;
pub mod service;
pub mod workflow;

use thiserror::Error;

pub use controllers::{AdminReturnClaims, FulfillmentReturnClaims, ReturnClaimsContainer, ReturnDetails};
pub use domain::aggregates::{ReturnRequest, ReturnStatus};
pub use service::{ReturnService, ServiceError, StaffDirectory};
pub use workflow::{legal_actions, AuthContext, ReturnAction, Role};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ReturnClaimsError {
    #[error("Return request not found")]
    NotFound,

    #[error("Action {action} is not permitted for {role}")]
    Forbidden { action: ReturnAction, role: Role },

    #[error("Role is not allowed to manage return claims")]
    Unauthorized,

    #[error("Employee record not found for user {0}")]
    EmployeeNotFound(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ReturnClaimsError>;
