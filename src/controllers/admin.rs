//! Admin return claims list
//!
//! Fetches across all dealers, optionally narrowed by the dealer filter.

use async_trait::async_trait;
use std::sync::Arc;
use crate::service::{Dealer, ReturnService, StaffDirectory};
use crate::workflow::{AuthContext, Role};
use super::list::{ListState, ReturnClaimsList};

pub struct AdminReturnClaims {
    service: Arc<dyn ReturnService>,
    directory: Arc<dyn StaffDirectory>,
    auth: AuthContext,
    role: Role,
    state: ListState,
}

impl AdminReturnClaims {
    /// Sessions without an admin role are served as `Admin`.
    pub fn new(service: Arc<dyn ReturnService>, directory: Arc<dyn StaffDirectory>, auth: AuthContext, page_size: u32) -> Self {
        let role = auth.role.filter(Role::is_admin).unwrap_or(Role::Admin);
        let auth = AuthContext { role: Some(role), ..auth };
        Self { service, directory, auth, role, state: ListState::new(page_size) }
    }

    /// Choices for the dealer filter. Failure leaves the dropdown empty.
    pub async fn dealer_options(&self) -> Vec<Dealer> {
        match self.directory.list_dealers().await {
            Ok(dealers) => dealers,
            Err(e) => {
                tracing::error!(error = %e, "failed to load dealer options");
                vec![]
            }
        }
    }
}

#[async_trait]
impl ReturnClaimsList for AdminReturnClaims {
    fn auth(&self) -> &AuthContext { &self.auth }
    fn directory(&self) -> &dyn StaffDirectory { self.directory.as_ref() }
    fn role(&self) -> Role { self.role }
    fn state(&self) -> &ListState { &self.state }
    fn state_mut(&mut self) -> &mut ListState { &mut self.state }

    async fn refresh(&mut self) -> bool {
        self.state.loading = true;
        let page = self.state.pagination();
        match self.service.get_return_requests(&self.state.filters, page).await {
            Ok(result) => {
                tracing::info!(page = page.page, count = result.data.len(), total = result.pagination.total_items, "loaded return claims");
                self.state.apply(result);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, page = page.page, "failed to load return claims");
                self.state.fail(&e);
                false
            }
        }
    }
}
