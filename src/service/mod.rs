//! Return service boundary
//!
//! Everything the workflow needs from the backend: paginated reads, single
//! reads, and one call per transition. Implementations carry only the fields
//! a transition needs, never the whole record.

pub mod http;
#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use crate::domain::aggregates::{RefundMethod, ReturnRequest, ReturnStatus};
use crate::domain::value_objects::{Condition, PickupAddress, ReturnId};

pub use http::HttpReturnService;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";
pub const NO_RESPONSE: &str = "No response from server. Please check your connection.";

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service answered with a non-success status.
    #[error("Return service responded {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Response { status: u16, message: Option<String> },

    /// The request went out but nothing came back.
    #[error("No response from return service: {0}")]
    NoResponse(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    /// Text fit for a toast or inline banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::Response { message: Some(m), .. } if !m.trim().is_empty() => m.clone(),
            Self::Response { .. } => GENERIC_FAILURE.to_string(),
            Self::NoResponse(_) => NO_RESPONSE.to_string(),
            Self::Decode(_) => GENERIC_FAILURE.to_string(),
            Self::Other(m) if !m.trim().is_empty() => m.clone(),
            Self::Other(_) => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The service rejected the payload itself (as opposed to failing).
    pub fn is_validation(&self) -> bool {
        matches!(self.status(), Some(400) | Some(422))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Server-side list filters. Free-text search is not here; it runs over the
/// fetched page only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReturnStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_method: Option<RefundMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_id: Option<String>,
}

impl ReturnFilters {
    pub fn is_active(&self) -> bool {
        self.status.is_some() || self.refund_method.is_some() || self.dealer_id.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn first(limit: u32) -> Self { Self { page: 1, limit } }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_items: u64,
}

fn first_page() -> u32 { 1 }

impl Default for PageInfo {
    fn default() -> Self { Self { current_page: first_page(), total_pages: 0, total_items: 0 } }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: PageInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStats {
    #[serde(default, alias = "total")]
    pub total_returns: u64,
    #[serde(flatten)]
    pub counters: BTreeMap<String, serde_json::Value>,
}

// =============================================================================
// Transition payloads
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectPayload {
    pub rejection_reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePickupPayload {
    pub scheduled_date: NaiveDate,
    pub pickup_address: PickupAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorzoPickupPayload {
    #[serde(with = "rust_decimal::serde::float")]
    pub secure_package_amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePickupPayload {
    pub tracking_number: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionEntryPayload {
    pub staff_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionPayload {
    pub sku_match: bool,
    pub condition: Condition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_notes: Option<String>,
    pub inspection_images: Vec<String>,
    pub is_approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundInitiatePayload {
    pub return_id: ReturnId,
    pub reason: String,
}

// =============================================================================
// Staff directory
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DealerRef {
    Id(String),
    Embedded {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    },
}

impl DealerRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Embedded { id } => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub assigned_dealers: Vec<DealerRef>,
}

impl Employee {
    pub fn dealer_ids(&self) -> Vec<String> {
        self.assigned_dealers
            .iter()
            .map(|d| d.id().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dealer {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, alias = "dealerName")]
    pub name: Option<String>,
}

// =============================================================================
// Traits
// =============================================================================

#[async_trait]
pub trait ReturnService: Send + Sync {
    async fn get_return_requests(&self, filters: &ReturnFilters, page: Pagination) -> Result<Page<ReturnRequest>, ServiceError>;

    async fn get_return_requests_for_fulfillment_staff(
        &self,
        dealer_ids: &[String],
        filters: &ReturnFilters,
        page: Pagination,
    ) -> Result<Page<ReturnRequest>, ServiceError>;

    async fn get_return_request_by_id(&self, id: &ReturnId) -> Result<ReturnRequest, ServiceError>;

    async fn get_return_stats(&self) -> Result<ReturnStats, ServiceError>;

    async fn validate_return_request(&self, id: &ReturnId) -> Result<(), ServiceError>;

    async fn reject_return_request(&self, id: &ReturnId, payload: &RejectPayload) -> Result<(), ServiceError>;

    async fn schedule_pickup(&self, id: &ReturnId, payload: &SchedulePickupPayload) -> Result<(), ServiceError>;

    /// Logistics-partner pickup kickoff; an alternative to `schedule_pickup`.
    async fn initiate_borzo_pickup(&self, id: &ReturnId, payload: &BorzoPickupPayload) -> Result<(), ServiceError>;

    async fn complete_pickup(&self, id: &ReturnId, payload: &CompletePickupPayload) -> Result<(), ServiceError>;

    /// Moves a collected return into inspection.
    async fn inspect_return_request(&self, id: &ReturnId, payload: &InspectionEntryPayload) -> Result<(), ServiceError>;

    /// Records the inspection outcome.
    async fn start_inspect_return_request(&self, id: &ReturnId, payload: &InspectionPayload) -> Result<(), ServiceError>;

    async fn refund_initiate(&self, payload: &RefundInitiatePayload) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// `Ok(None)` when the user has no employee record.
    async fn employee_for_user(&self, user_id: &str) -> Result<Option<Employee>, ServiceError>;

    async fn list_dealers(&self) -> Result<Vec<Dealer>, ServiceError>;
}
