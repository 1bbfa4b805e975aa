//! Per-action input validation
//!
//! Each form checks its own fields and turns into the transport payload for
//! its transition. Nothing here touches the network.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};
use crate::domain::value_objects::{not_blank, Condition, PickupAddress};
use crate::service::{
    BorzoPickupPayload, CompletePickupPayload, InspectionEntryPayload, InspectionPayload, RejectPayload,
    SchedulePickupPayload,
};
use crate::workflow::ReturnAction;

pub const MIN_REJECTION_REASON_CHARS: usize = 10;
pub const MAX_INSPECTION_IMAGES: usize = 10;

/// Clock used by time-relative checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormContext {
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

impl FormContext {
    pub fn current() -> Self {
        Self { today: Local::now().date_naive(), now: Utc::now() }
    }

    pub fn on(today: NaiveDate) -> Self {
        Self { today, now: Utc::now() }
    }

    /// Earliest pickup date the schedule form accepts.
    pub fn earliest_pickup(&self) -> NaiveDate {
        self.today + Duration::days(1)
    }
}

/// Inline messages keyed by wire field name (`pickupAddress.city`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, String>);

impl FormErrors {
    pub fn new() -> Self { Self::default() }
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }
    pub fn get(&self, field: &str) -> Option<&str> { self.0.get(field).map(String::as_str) }
    pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }

    pub fn from_validation(errors: &ValidationErrors) -> Self {
        let mut out = Self::new();
        out.collect(None, errors);
        out
    }

    fn collect(&mut self, prefix: Option<&str>, errors: &ValidationErrors) {
        for (field, kind) in errors.errors() {
            let name = match prefix {
                Some(p) => format!("{p}.{}", camel_case(field)),
                None => camel_case(field),
            };
            match kind {
                ValidationErrorsKind::Field(list) => {
                    if let Some(first) = list.first() {
                        self.insert(name, message_for(first));
                    }
                }
                ValidationErrorsKind::Struct(inner) => self.collect(Some(&name), inner),
                ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        self.collect(Some(&format!("{name}[{index}]")), inner);
                    }
                }
            }
        }
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn message_for(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("Invalid value ({})", error.code),
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' { upper = true; continue; }
        if upper { out.extend(c.to_uppercase()); upper = false; } else { out.push(c); }
    }
    out
}

fn validated(form: &impl Validate) -> FormErrors {
    match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(e) => FormErrors::from_validation(&e),
    }
}

/// A transition's input, checked client-side before anything is sent.
pub trait ActionForm: Send + Sync {
    type Payload: Send + Sync + 'static;
    const ACTION: ReturnAction;

    fn check(&self, ctx: &FormContext) -> Result<Self::Payload, FormErrors>;

    /// Take over user-entered values. Forms with prefilled fields keep the
    /// prefill where the incoming value is blank.
    fn absorb(&mut self, incoming: Self)
    where
        Self: Sized,
    {
        *self = incoming;
    }
}

// =============================================================================
// Validate / Reject
// =============================================================================

/// Validation is a bare confirmation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ValidateForm {}

impl ActionForm for ValidateForm {
    type Payload = ();
    const ACTION: ReturnAction = ReturnAction::Validate;
    fn check(&self, _ctx: &FormContext) -> Result<(), FormErrors> { Ok(()) }
}

fn min_reason_len(value: &str) -> Result<(), ValidationError> {
    if value.trim().chars().count() < MIN_REJECTION_REASON_CHARS {
        return Err(ValidationError::new("too_short"));
    }
    Ok(())
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RejectForm {
    #[validate(custom(function = "min_reason_len", message = "Rejection reason must be at least 10 characters"))]
    pub rejection_reason: String,
}

impl ActionForm for RejectForm {
    type Payload = RejectPayload;
    const ACTION: ReturnAction = ReturnAction::Reject;

    fn check(&self, _ctx: &FormContext) -> Result<RejectPayload, FormErrors> {
        validated(self).into_result()?;
        Ok(RejectPayload { rejection_reason: self.rejection_reason.trim().to_string() })
    }
}

// =============================================================================
// Pickup
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulePickupForm {
    pub scheduled_date: Option<NaiveDate>,
    #[validate]
    pub pickup_address: PickupAddress,
}

impl SchedulePickupForm {
    pub fn prefilled(address: Option<&PickupAddress>) -> Self {
        Self { scheduled_date: None, pickup_address: address.cloned().unwrap_or_default() }
    }

    /// Whether the submit control should be enabled.
    pub fn is_submittable(&self, ctx: &FormContext) -> bool {
        self.pickup_address.is_complete() && self.scheduled_date.is_some_and(|d| d >= ctx.earliest_pickup())
    }
}

impl ActionForm for SchedulePickupForm {
    type Payload = SchedulePickupPayload;
    const ACTION: ReturnAction = ReturnAction::SchedulePickup;

    fn check(&self, ctx: &FormContext) -> Result<SchedulePickupPayload, FormErrors> {
        let mut errors = validated(self);
        match self.scheduled_date {
            None => errors.insert("scheduledDate", "Pickup date is required"),
            Some(d) if d < ctx.earliest_pickup() => {
                errors.insert("scheduledDate", "Pickup date must be tomorrow or later")
            }
            Some(_) => {}
        }
        errors.into_result()?;
        let addr = &self.pickup_address;
        Ok(SchedulePickupPayload {
            scheduled_date: self.scheduled_date.unwrap_or_else(|| ctx.earliest_pickup()),
            pickup_address: PickupAddress {
                address: addr.address.trim().to_string(),
                city: addr.city.trim().to_string(),
                state: addr.state.trim().to_string(),
                pincode: addr.pincode.trim().to_string(),
            },
        })
    }

    fn absorb(&mut self, incoming: Self) {
        if incoming.scheduled_date.is_some() { self.scheduled_date = incoming.scheduled_date; }
        let (mine, theirs) = (&mut self.pickup_address, incoming.pickup_address);
        for (slot, value) in [
            (&mut mine.address, theirs.address),
            (&mut mine.city, theirs.city),
            (&mut mine.state, theirs.state),
            (&mut mine.pincode, theirs.pincode),
        ] {
            if !value.trim().is_empty() { *slot = value; }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BorzoPickupForm {
    pub secure_package_amount: Option<Decimal>,
}

impl ActionForm for BorzoPickupForm {
    type Payload = BorzoPickupPayload;
    const ACTION: ReturnAction = ReturnAction::InitiateBorzoPickup;

    fn check(&self, _ctx: &FormContext) -> Result<BorzoPickupPayload, FormErrors> {
        match self.secure_package_amount {
            Some(amount) if amount >= Decimal::ZERO => Ok(BorzoPickupPayload { secure_package_amount: amount }),
            Some(_) => {
                let mut errors = FormErrors::new();
                errors.insert("securePackageAmount", "Secure package amount cannot be negative");
                Err(errors)
            }
            None => {
                let mut errors = FormErrors::new();
                errors.insert("securePackageAmount", "Secure package amount is required");
                Err(errors)
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletePickupForm {
    #[validate(custom(function = "not_blank", message = "Tracking number is required"))]
    pub tracking_number: String,
}

impl ActionForm for CompletePickupForm {
    type Payload = CompletePickupPayload;
    const ACTION: ReturnAction = ReturnAction::CompletePickup;

    fn check(&self, _ctx: &FormContext) -> Result<CompletePickupPayload, FormErrors> {
        validated(self).into_result()?;
        Ok(CompletePickupPayload { tracking_number: self.tracking_number.trim().to_string() })
    }

    fn absorb(&mut self, incoming: Self) {
        if !incoming.tracking_number.trim().is_empty() { self.tracking_number = incoming.tracking_number; }
    }
}

// =============================================================================
// Inspection
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct StartInspectionForm {
    #[validate(custom(function = "not_blank", message = "Staff identifier is required"))]
    pub staff_id: String,
}

impl ActionForm for StartInspectionForm {
    type Payload = InspectionEntryPayload;
    const ACTION: ReturnAction = ReturnAction::StartInspection;

    fn check(&self, _ctx: &FormContext) -> Result<InspectionEntryPayload, FormErrors> {
        validated(self).into_result()?;
        Ok(InspectionEntryPayload { staff_id: self.staff_id.trim().to_string() })
    }
}

/// One piece of photographic evidence picked during inspection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl EvidenceImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectionForm {
    pub sku_match: bool,
    #[validate(required(message = "Condition is required"))]
    pub condition: Option<Condition>,
    #[validate(length(max = 1000, message = "Condition notes are limited to 1000 characters"))]
    pub condition_notes: String,
    pub inspection_images: Vec<EvidenceImage>,
    pub is_approved: bool,
    pub rejection_reason: String,
}

impl Default for InspectionForm {
    fn default() -> Self {
        Self {
            sku_match: true,
            condition: None,
            condition_notes: String::new(),
            inspection_images: vec![],
            is_approved: true,
            rejection_reason: String::new(),
        }
    }
}

impl ActionForm for InspectionForm {
    type Payload = InspectionPayload;
    const ACTION: ReturnAction = ReturnAction::SubmitInspection;

    fn check(&self, _ctx: &FormContext) -> Result<InspectionPayload, FormErrors> {
        let mut errors = validated(self);
        if !self.is_approved && self.rejection_reason.trim().is_empty() {
            errors.insert("rejectionReason", "Rejection reason is required when the return is not approved");
        }
        if self.inspection_images.len() > MAX_INSPECTION_IMAGES {
            errors.insert("inspectionImages", format!("At most {MAX_INSPECTION_IMAGES} inspection images"));
        }
        for (i, image) in self.inspection_images.iter().enumerate() {
            if !image.content_type.starts_with("image/") {
                errors.insert(format!("inspectionImages[{i}]"), format!("{} is not an image", image.file_name));
            }
        }
        errors.into_result()?;
        let notes = self.condition_notes.trim();
        Ok(InspectionPayload {
            sku_match: self.sku_match,
            condition: self.condition.unwrap_or(Condition::Good),
            condition_notes: (!notes.is_empty()).then(|| notes.to_string()),
            inspection_images: self.inspection_images.iter().map(EvidenceImage::data_url).collect(),
            is_approved: self.is_approved,
            rejection_reason: (!self.is_approved).then(|| self.rejection_reason.trim().to_string()),
        })
    }
}

// =============================================================================
// Refund
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RefundForm {
    #[validate(custom(function = "not_blank", message = "Refund reason is required"))]
    pub reason: String,
}

impl ActionForm for RefundForm {
    type Payload = String;
    const ACTION: ReturnAction = ReturnAction::InitiateRefund;

    fn check(&self, _ctx: &FormContext) -> Result<String, FormErrors> {
        validated(self).into_result()?;
        Ok(self.reason.trim().to_string())
    }
}
