//! Workflow rules: who may do what, from which status, with which input
pub mod auth;
pub mod forms;
pub mod transitions;

pub use auth::{resolve_staff_id, AuthContext, Role};
pub use forms::{FormContext, FormErrors};
pub use transitions::{legal_actions, InputField, Requirement, ReturnAction, TransitionRule, TRANSITIONS};
