//! Session identity passed explicitly into controllers

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::service::StaffDirectory;
use crate::ReturnClaimsError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    SuperAdmin,
    Admin,
    FulfillmentStaff,
}

impl Role {
    /// Accepts the spellings the session store has used (`Super-admin`,
    /// `Fulfillment-Staff`, `fulfillment_staff`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "superadmin" => Some(Self::SuperAdmin),
            "admin" => Some(Self::Admin),
            "fulfillmentstaff" | "fulfilmentstaff" | "fulfillment" => Some(Self::FulfillmentStaff),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool { matches!(self, Self::SuperAdmin | Self::Admin) }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "Super-admin"),
            Self::Admin => write!(f, "Admin"),
            Self::FulfillmentStaff => write!(f, "Fulfillment-Staff"),
        }
    }
}

/// Who is acting. `role` is `None` when the session carries a role this
/// workflow does not serve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Option<Role>,
}

impl AuthContext {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self { user_id: user_id.into(), role: Some(role) }
    }

    pub fn from_session(user_id: impl Into<String>, raw_role: &str) -> Self {
        Self { user_id: user_id.into(), role: Role::parse(raw_role) }
    }
}

/// Staff identifier recorded when inspection starts.
///
/// Super-admins act under their own user id; everyone else must resolve to an
/// employee record first.
pub async fn resolve_staff_id(auth: &AuthContext, directory: &dyn StaffDirectory) -> crate::Result<String> {
    if auth.role == Some(Role::SuperAdmin) {
        return Ok(auth.user_id.clone());
    }
    match directory.employee_for_user(&auth.user_id).await? {
        Some(employee) => Ok(employee.id),
        None => Err(ReturnClaimsError::EmployeeNotFound(auth.user_id.clone())),
    }
}
