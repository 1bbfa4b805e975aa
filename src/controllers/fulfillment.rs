//! Fulfillment staff return claims list
//!
//! Scoped to the dealers assigned to the signed-in staff member. The chain is
//! session user, then employee record, then assigned dealers. With no dealers
//! the list stays empty and nothing is fetched.

use async_trait::async_trait;
use std::sync::Arc;
use crate::service::{ReturnService, StaffDirectory};
use crate::workflow::{AuthContext, Role};
use super::list::{ListState, ReturnClaimsList};

pub struct FulfillmentReturnClaims {
    service: Arc<dyn ReturnService>,
    directory: Arc<dyn StaffDirectory>,
    auth: AuthContext,
    dealer_ids: Option<Vec<String>>,
    state: ListState,
}

impl FulfillmentReturnClaims {
    pub fn new(service: Arc<dyn ReturnService>, directory: Arc<dyn StaffDirectory>, auth: AuthContext, page_size: u32) -> Self {
        Self { service, directory, auth, dealer_ids: None, state: ListState::new(page_size) }
    }

    /// Dealer ids resolved so far, `None` until an employee record is found.
    pub fn dealer_ids(&self) -> Option<&[String]> {
        self.dealer_ids.as_deref()
    }

    async fn resolve_dealers(&mut self) -> Result<Vec<String>, crate::service::ServiceError> {
        if let Some(ids) = &self.dealer_ids {
            return Ok(ids.clone());
        }
        match self.directory.employee_for_user(&self.auth.user_id).await? {
            Some(employee) => {
                let ids = employee.dealer_ids();
                self.dealer_ids = Some(ids.clone());
                Ok(ids)
            }
            None => {
                tracing::warn!(user_id = %self.auth.user_id, "no employee record for fulfillment user");
                Ok(vec![])
            }
        }
    }
}

#[async_trait]
impl ReturnClaimsList for FulfillmentReturnClaims {
    fn auth(&self) -> &AuthContext { &self.auth }
    fn directory(&self) -> &dyn StaffDirectory { self.directory.as_ref() }
    fn role(&self) -> Role { Role::FulfillmentStaff }
    fn state(&self) -> &ListState { &self.state }
    fn state_mut(&mut self) -> &mut ListState { &mut self.state }

    async fn refresh(&mut self) -> bool {
        self.state.loading = true;
        let dealer_ids = match self.resolve_dealers().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(user_id = %self.auth.user_id, error = %e, "failed to resolve assigned dealers");
                self.state.fail(&e);
                return false;
            }
        };
        if dealer_ids.is_empty() {
            tracing::warn!(user_id = %self.auth.user_id, "no assigned dealers, skipping fetch");
            self.state.clear();
            return true;
        }

        let page = self.state.pagination();
        match self.service.get_return_requests_for_fulfillment_staff(&dealer_ids, &self.state.filters, page).await {
            Ok(result) => {
                tracing::info!(page = page.page, dealers = dealer_ids.len(), count = result.data.len(), "loaded fulfillment return claims");
                self.state.apply(result);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, page = page.page, "failed to load fulfillment return claims");
                self.state.fail(&e);
                false
            }
        }
    }
}
