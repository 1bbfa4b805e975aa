//! Value Objects for return claims

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use validator::Validate;

/// Opaque identity of a return request as issued by the return service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReturnId(String);

impl ReturnId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(ValueError::EmptyId); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for ReturnId {
    type Error = ValueError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<ReturnId> for String {
    fn from(id: ReturnId) -> Self { id.0 }
}

impl fmt::Display for ReturnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Number of units being returned. Always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Result<Self, ValueError> {
        if value == 0 { return Err(ValueError::ZeroQuantity); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
}

impl TryFrom<u32> for Quantity {
    type Error = ValueError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

/// Carrier tracking number attached to a pickup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingNumber(String);

impl TrackingNumber {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(ValueError::EmptyTrackingNumber); }
        Ok(Self(value))
    }

    /// Placeholder offered when the pickup record carries no tracking number yet.
    pub fn placeholder(now: chrono::DateTime<chrono::Utc>) -> Self {
        Self(format!("TRK_{}", now.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Where the courier collects the returned item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct PickupAddress {
    #[validate(custom(function = "not_blank", message = "Address is required"))]
    pub address: String,
    #[validate(custom(function = "not_blank", message = "City is required"))]
    pub city: String,
    #[validate(custom(function = "not_blank", message = "State is required"))]
    pub state: String,
    #[validate(custom(function = "not_blank", message = "Pincode is required"))]
    pub pincode: String,
}

impl PickupAddress {
    pub fn is_complete(&self) -> bool {
        [&self.address, &self.city, &self.state, &self.pincode].iter().all(|f| !f.trim().is_empty())
    }
}

pub(crate) fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() { return Err(validator::ValidationError::new("blank")); }
    Ok(())
}

/// Physical condition recorded during inspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    Poor,
    Damaged,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("Return id is empty")]
    EmptyId,
    #[error("Quantity must be positive")]
    ZeroQuantity,
    #[error("Tracking number is empty")]
    EmptyTrackingNumber,
}
