//! Return Request Aggregate
//!
//! A read projection of one return request as last fetched from the return
//! service. Nothing in this crate mutates `return_status`; a new status only
//! arrives with the next read.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use crate::domain::value_objects::{Condition, PickupAddress, Quantity, ReturnId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[serde(rename = "_id", alias = "id")]
    pub id: ReturnId,
    pub sku: String,
    pub quantity: Quantity,
    #[serde(default)]
    pub return_reason: String,
    pub return_status: ReturnStatus,
    #[serde(rename = "orderId", default)]
    pub order: Option<OrderRef>,
    #[serde(default)]
    pub refund: Option<Refund>,
    #[serde(default)]
    pub pickup_request: Option<PickupRequest>,
    #[serde(default)]
    pub inspection: Option<Inspection>,
    #[serde(default)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub return_images: Vec<String>,
}

/// Lifecycle state as reported by the return service.
///
/// Statuses this crate does not know are kept verbatim in `Other`; such a
/// record offers no actions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReturnStatus {
    Requested,
    Validated,
    PickupScheduled,
    PickupCompleted,
    UnderInspection,
    Approved,
    Rejected,
    InitiatedRefund,
    RefundCompleted,
    RefundFailed,
    Other(String),
}

impl ReturnStatus {
    /// Wire name. `Intiated_Refund` is spelled the way the service spells it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Requested => "Requested",
            Self::Validated => "Validated",
            Self::PickupScheduled => "Pickup_Scheduled",
            Self::PickupCompleted => "Pickup_Completed",
            Self::UnderInspection => "Under_Inspection",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::InitiatedRefund => "Intiated_Refund",
            Self::RefundCompleted => "Refund_Completed",
            Self::RefundFailed => "Refund_Failed",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::RefundCompleted | Self::RefundFailed)
    }

    /// Statuses from which a refund amount carries meaning.
    pub fn has_refund_decision(&self) -> bool {
        matches!(self, Self::Approved | Self::InitiatedRefund | Self::RefundCompleted | Self::RefundFailed)
    }
}

impl From<String> for ReturnStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Requested" => Self::Requested,
            "Validated" => Self::Validated,
            "Pickup_Scheduled" => Self::PickupScheduled,
            "Pickup_Completed" => Self::PickupCompleted,
            "Under_Inspection" => Self::UnderInspection,
            "Approved" => Self::Approved,
            "Rejected" => Self::Rejected,
            "Intiated_Refund" => Self::InitiatedRefund,
            "Refund_Completed" => Self::RefundCompleted,
            "Refund_Failed" => Self::RefundFailed,
            _ => Self::Other(raw),
        }
    }
}

impl From<ReturnStatus> for String {
    fn from(status: ReturnStatus) -> Self { status.as_str().to_string() }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(rename = "orderId", default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Refund {
    pub refund_amount: Option<Decimal>,
    pub refund_method: Option<RefundMethod>,
    pub refund_status: Option<ReturnStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundMethod {
    #[serde(rename = "Manual_Refund", alias = "manual")]
    Manual,
    #[serde(rename = "Original_Payment_Method", alias = "original_payment_method")]
    OriginalPaymentMethod,
    #[serde(other)]
    Unknown,
}

impl RefundMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "Manual_Refund",
            Self::OriginalPaymentMethod => "Original_Payment_Method",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PickupRequest {
    pub pickup_address: Option<PickupAddress>,
    #[serde(deserialize_with = "date_or_datetime")]
    pub scheduled_date: Option<NaiveDate>,
    pub logistics_partner: Option<String>,
    pub tracking_number: Option<String>,
    pub completed_date: Option<DateTime<Utc>>,
}

/// Accepts `2026-10-20` as well as a full RFC 3339 timestamp, taking the UTC date.
fn date_or_datetime<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| {
        DateTime::parse_from_rfc3339(&value)
            .map(|at| at.with_timezone(&Utc).date_naive())
            .or_else(|_| NaiveDate::parse_from_str(&value, "%Y-%m-%d"))
            .map_err(serde::de::Error::custom)
    })
    .transpose()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Inspection {
    pub sku_match: Option<bool>,
    pub condition: Option<Condition>,
    pub condition_notes: Option<String>,
    pub inspection_images: Vec<String>,
    pub is_approved: Option<bool>,
    pub rejection_reason: Option<String>,
    pub inspected_at: Option<DateTime<Utc>>,
    pub inspected_by: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timestamps {
    pub requested_at: Option<DateTime<Utc>>,
    pub validated_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub pickup_scheduled_at: Option<DateTime<Utc>>,
    pub pickup_completed_at: Option<DateTime<Utc>>,
    pub inspection_started_at: Option<DateTime<Utc>>,
    pub inspection_completed_at: Option<DateTime<Utc>>,
    pub refund_initiated_at: Option<DateTime<Utc>>,
    pub refund_completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub label: &'static str,
    pub status: ReturnStatus,
    pub at: DateTime<Utc>,
}

impl Timestamps {
    /// Lifecycle entries in pipeline order, skipping transitions that never happened.
    pub fn timeline(&self) -> Vec<TimelineEntry> {
        let steps = [
            ("Return requested", ReturnStatus::Requested, self.requested_at),
            ("Validated", ReturnStatus::Validated, self.validated_at),
            ("Rejected", ReturnStatus::Rejected, self.rejected_at),
            ("Pickup scheduled", ReturnStatus::PickupScheduled, self.pickup_scheduled_at),
            ("Pickup completed", ReturnStatus::PickupCompleted, self.pickup_completed_at),
            ("Inspection started", ReturnStatus::UnderInspection, self.inspection_started_at),
            ("Inspection completed", ReturnStatus::Approved, self.inspection_completed_at),
            ("Refund initiated", ReturnStatus::InitiatedRefund, self.refund_initiated_at),
            ("Refund completed", ReturnStatus::RefundCompleted, self.refund_completed_at),
        ];
        steps.into_iter()
            .filter_map(|(label, status, at)| at.map(|at| TimelineEntry { label, status, at }))
            .collect()
    }
}

impl ReturnRequest {
    pub fn order_number(&self) -> Option<&str> {
        self.order.as_ref().and_then(|o| o.order_number.as_deref())
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.order.as_ref()
            .and_then(|o| o.customer_details.as_ref())
            .and_then(|c| c.name.as_deref())
    }

    /// Refund amount, only once the return has reached a refund decision.
    pub fn refund_amount(&self) -> Option<Decimal> {
        if !self.return_status.has_refund_decision() { return None; }
        self.refund.as_ref().and_then(|r| r.refund_amount)
    }

    pub fn scheduled_pickup_address(&self) -> Option<&PickupAddress> {
        self.pickup_request.as_ref().and_then(|p| p.pickup_address.as_ref())
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.pickup_request.as_ref()
            .and_then(|p| p.tracking_number.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// Case-insensitive match over id, SKU, order number, customer name and reason.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() { return true; }
        [
            Some(self.id.as_str()),
            Some(self.sku.as_str()),
            self.order_number(),
            self.customer_name(),
            Some(self.return_reason.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn sample(id: &str, status: ReturnStatus) -> ReturnRequest {
        ReturnRequest {
            id: ReturnId::new(id).unwrap(),
            sku: "BRK-PAD-220".into(),
            quantity: Quantity::new(1).unwrap(),
            return_reason: "Wrong fitment for model".into(),
            return_status: status,
            order: Some(OrderRef {
                id: Some("o-1".into()),
                order_number: Some("ORD-1001".into()),
                order_date: None,
                customer_details: Some(CustomerDetails { name: Some("Asha Rao".into()), ..Default::default() }),
            }),
            refund: None,
            pickup_request: None,
            inspection: None,
            timestamps: Timestamps::default(),
            return_images: vec![],
        }
    }

    #[test]
    fn test_status_wire_names() {
        let status: ReturnStatus = serde_json::from_str("\"Intiated_Refund\"").unwrap();
        assert_eq!(status, ReturnStatus::InitiatedRefund);
        assert_eq!(serde_json::to_string(&ReturnStatus::PickupScheduled).unwrap(), "\"Pickup_Scheduled\"");
        let unknown: ReturnStatus = serde_json::from_str("\"Awaiting_Courier\"").unwrap();
        assert_eq!(unknown, ReturnStatus::Other("Awaiting_Courier".into()));
        assert_eq!(unknown.as_str(), "Awaiting_Courier");
    }

    #[test]
    fn test_deserialize_backend_record() {
        let json = serde_json::json!({
            "_id": "665f1c",
            "sku": "OIL-FLT-9",
            "quantity": 2,
            "returnReason": "Damaged in transit",
            "returnStatus": "Pickup_Scheduled",
            "orderId": { "_id": "o9", "orderId": "ORD-77", "customerDetails": { "name": "Vikram" } },
            "pickupRequest": { "trackingNumber": "DLV123", "scheduledDate": "2026-10-20" },
            "timestamps": { "requestedAt": "2026-10-01T10:00:00Z" },
            "returnImages": ["a.jpg"]
        });
        let req: ReturnRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.id.as_str(), "665f1c");
        assert_eq!(req.order_number(), Some("ORD-77"));
        assert_eq!(req.tracking_number(), Some("DLV123"));
        assert_eq!(req.return_status, ReturnStatus::PickupScheduled);
    }

    #[test]
    fn test_scheduled_date_accepts_datetime() {
        let pickup: PickupRequest =
            serde_json::from_value(serde_json::json!({ "scheduledDate": "2026-10-20T00:00:00.000Z" })).unwrap();
        assert_eq!(pickup.scheduled_date, NaiveDate::from_ymd_opt(2026, 10, 20));

        let pickup: PickupRequest = serde_json::from_value(serde_json::json!({ "scheduledDate": null })).unwrap();
        assert_eq!(pickup.scheduled_date, None);
        assert!(serde_json::from_value::<PickupRequest>(serde_json::json!({ "scheduledDate": "next week" })).is_err());

        let record = serde_json::json!({
            "_id": "r1",
            "sku": "SKU-1",
            "quantity": 1,
            "returnReason": "Broken",
            "returnStatus": "Pickup_Scheduled",
            "pickupRequest": { "scheduledDate": "2026-10-20T00:00:00.000Z", "trackingNumber": "DLV9" }
        });
        let req: ReturnRequest = serde_json::from_value(record).unwrap();
        assert_eq!(req.pickup_request.unwrap().scheduled_date, NaiveDate::from_ymd_opt(2026, 10, 20));
    }

    #[test]
    fn test_timeline_skips_missing() {
        let t = Timestamps {
            requested_at: Some(Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap()),
            pickup_scheduled_at: Some(Utc.with_ymd_and_hms(2026, 10, 3, 9, 0, 0).unwrap()),
            ..Default::default()
        };
        let labels: Vec<_> = t.timeline().iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["Return requested", "Pickup scheduled"]);
    }

    #[test]
    fn test_refund_amount_hidden_before_decision() {
        let mut req = sample("r1", ReturnStatus::UnderInspection);
        req.refund = Some(Refund { refund_amount: Some(Decimal::new(1500, 0)), ..Default::default() });
        assert_eq!(req.refund_amount(), None);
        req.return_status = ReturnStatus::Approved;
        assert_eq!(req.refund_amount(), Some(Decimal::new(1500, 0)));
    }

    #[test]
    fn test_search_fields() {
        let req = sample("abc123", ReturnStatus::Requested);
        assert!(req.matches_search("ABC"));
        assert!(req.matches_search("brk-pad"));
        assert!(req.matches_search("ord-1001"));
        assert!(req.matches_search("asha"));
        assert!(req.matches_search("fitment"));
        assert!(req.matches_search("  "));
        assert!(!req.matches_search("gearbox"));
    }
}
