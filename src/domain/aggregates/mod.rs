//! Aggregates module
pub mod return_request;

pub use return_request::{
    CustomerDetails, Inspection, OrderRef, PickupRequest, Refund, RefundMethod, ReturnRequest,
    ReturnStatus, TimelineEntry, Timestamps,
};
