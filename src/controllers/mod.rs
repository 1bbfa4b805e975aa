//! Screen controllers
//!
//! Hold what a view renders: the current page of claims with each row's legal
//! actions, or one claim with its timeline. They never patch records after a
//! transition; they re-read.

pub mod admin;
pub mod container;
pub mod details;
pub mod fulfillment;
pub mod list;

pub use admin::AdminReturnClaims;
pub use container::ReturnClaimsContainer;
pub use details::{DetailView, ReturnDetails};
pub use fulfillment::FulfillmentReturnClaims;
pub use list::{EmptyState, ListState, ListView, ReturnClaimsList, ReturnRow};
