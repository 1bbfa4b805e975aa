//! Role router for the return claims screen

use std::sync::Arc;
use crate::service::{ReturnService, StaffDirectory};
use crate::workflow::{AuthContext, Role};
use super::admin::AdminReturnClaims;
use super::fulfillment::FulfillmentReturnClaims;
use super::list::ReturnClaimsList;

/// Picks the list controller for the session's role.
pub enum ReturnClaimsContainer {
    Admin(AdminReturnClaims),
    Fulfillment(FulfillmentReturnClaims),
    /// The session role has no return claims screen.
    Unauthorized,
}

impl ReturnClaimsContainer {
    pub fn for_session(
        auth: AuthContext,
        service: Arc<dyn ReturnService>,
        directory: Arc<dyn StaffDirectory>,
        page_size: u32,
    ) -> Self {
        match auth.role {
            Some(Role::SuperAdmin | Role::Admin) => {
                Self::Admin(AdminReturnClaims::new(service, directory, auth, page_size))
            }
            Some(Role::FulfillmentStaff) => {
                Self::Fulfillment(FulfillmentReturnClaims::new(service, directory, auth, page_size))
            }
            None => {
                tracing::warn!(user_id = %auth.user_id, "session role has no access to return claims");
                Self::Unauthorized
            }
        }
    }

    pub fn is_authorized(&self) -> bool {
        !matches!(self, Self::Unauthorized)
    }

    pub fn list(&self) -> Option<&dyn ReturnClaimsList> {
        match self {
            Self::Admin(list) => Some(list),
            Self::Fulfillment(list) => Some(list),
            Self::Unauthorized => None,
        }
    }

    pub fn list_mut(&mut self) -> Option<&mut dyn ReturnClaimsList> {
        match self {
            Self::Admin(list) => Some(list),
            Self::Fulfillment(list) => Some(list),
            Self::Unauthorized => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::return_request::tests::sample;
    use crate::domain::aggregates::ReturnStatus;
    use crate::service::fake::FakeReturnService;

    fn route(fake: &Arc<FakeReturnService>, raw_role: &str) -> ReturnClaimsContainer {
        ReturnClaimsContainer::for_session(AuthContext::from_session("u1", raw_role), fake.clone(), fake.clone(), 10)
    }

    #[test]
    fn test_routes_by_role() {
        let fake = Arc::new(FakeReturnService::new());
        assert!(matches!(route(&fake, "Super-admin"), ReturnClaimsContainer::Admin(_)));
        assert!(matches!(route(&fake, "Admin"), ReturnClaimsContainer::Admin(_)));
        assert!(matches!(route(&fake, "Fulfillment-Staff"), ReturnClaimsContainer::Fulfillment(_)));
        let denied = route(&fake, "Dealer");
        assert!(!denied.is_authorized());
        assert!(denied.list().is_none());
    }

    #[tokio::test]
    async fn test_routed_list_uses_scoped_fetch() {
        let fake = Arc::new(FakeReturnService::with_records([sample("r1", ReturnStatus::Requested)]));
        fake.add_employee("u1", "e1", &["d1"]);

        let mut staff = route(&fake, "fulfillment_staff");
        staff.list_mut().unwrap().refresh().await;
        assert_eq!(fake.calls_named("get_return_requests_for_fulfillment_staff"), 1);
        assert_eq!(fake.calls_named("get_return_requests"), 0);

        let mut admin = route(&fake, "Super-admin");
        let list = admin.list_mut().unwrap();
        list.refresh().await;
        assert_eq!(list.role(), Role::SuperAdmin);
        assert_eq!(fake.calls_named("get_return_requests"), 1);
    }
}
