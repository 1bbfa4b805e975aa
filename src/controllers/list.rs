//! Shared list state for the role-scoped controllers

use async_trait::async_trait;
use serde::Serialize;
use crate::dialogs::{ActionDialog, SubmitOutcome};
use crate::domain::aggregates::{RefundMethod, ReturnRequest, ReturnStatus};
use crate::domain::value_objects::ReturnId;
use crate::service::{Page, Pagination, ReturnFilters, ServiceError, StaffDirectory};
use crate::workflow::forms::FormContext;
use crate::workflow::{legal_actions, resolve_staff_id, AuthContext, ReturnAction, Role};
use crate::ReturnClaimsError;

/// Why a list has nothing to show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyState {
    /// The fetch itself returned nothing.
    NoData,
    /// Rows exist but none match the search or filters.
    NoMatches,
}

impl EmptyState {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoData => "No return claims yet",
            Self::NoMatches => "No return claims match your filters",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRow {
    pub record: ReturnRequest,
    pub actions: Vec<ReturnAction>,
}

#[derive(Clone, Debug)]
pub struct ListState {
    pub items: Vec<ReturnRequest>,
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: ReturnFilters,
    /// Client-side, over the current page only.
    pub search: String,
}

impl ListState {
    pub fn new(limit: u32) -> Self {
        Self {
            items: vec![],
            page: 1,
            limit: limit.max(1),
            total_items: 0,
            total_pages: 0,
            loading: false,
            error: None,
            filters: ReturnFilters::default(),
            search: String::new(),
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination { page: self.page.max(1), limit: self.limit }
    }

    pub(crate) fn apply(&mut self, page: Page<ReturnRequest>) {
        self.items = page.data;
        self.page = page.pagination.current_page.max(1);
        self.total_items = page.pagination.total_items;
        self.total_pages = page.pagination.total_pages;
        self.loading = false;
        self.error = None;
    }

    /// Drop everything rather than keep showing a stale page.
    pub(crate) fn fail(&mut self, err: &ServiceError) {
        self.clear();
        self.error = Some(err.user_message());
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.page = 1;
        self.total_items = 0;
        self.total_pages = 0;
        self.loading = false;
        self.error = None;
    }

    pub fn visible(&self) -> Vec<&ReturnRequest> {
        self.items.iter().filter(|r| r.matches_search(&self.search)).collect()
    }

    pub fn rows(&self, role: Role) -> Vec<ReturnRow> {
        self.visible()
            .into_iter()
            .map(|record| ReturnRow { actions: legal_actions(&record.return_status, role), record: record.clone() })
            .collect()
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        if !self.visible().is_empty() {
            return None;
        }
        if self.items.is_empty() && !self.filters.is_active() {
            Some(EmptyState::NoData)
        } else {
            Some(EmptyState::NoMatches)
        }
    }

    pub fn find(&self, id: &ReturnId) -> Option<&ReturnRequest> {
        self.items.iter().find(|r| &r.id == id)
    }

    pub fn view(&self, role: Role) -> ListView {
        ListView {
            rows: self.rows(role),
            page: self.page,
            total_pages: self.total_pages,
            total_items: self.total_items,
            filters: self.filters.clone(),
            empty_state: self.empty_state(),
            error: self.error.clone(),
        }
    }
}

/// Serializable snapshot of a list for the gateway.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub rows: Vec<ReturnRow>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub filters: ReturnFilters,
    pub empty_state: Option<EmptyState>,
    pub error: Option<String>,
}

/// Behaviour common to the admin and fulfillment lists. Every filter or page
/// change re-fetches exactly once; search never fetches.
#[async_trait]
pub trait ReturnClaimsList: Send + Sync {
    fn auth(&self) -> &AuthContext;
    fn directory(&self) -> &dyn StaffDirectory;
    fn role(&self) -> Role;
    fn state(&self) -> &ListState;
    fn state_mut(&mut self) -> &mut ListState;

    /// Fetch the current page. Returns whether the fetch succeeded.
    async fn refresh(&mut self) -> bool;

    async fn set_page(&mut self, page: u32) -> bool {
        self.state_mut().page = page.max(1);
        self.refresh().await
    }

    async fn set_status_filter(&mut self, status: Option<ReturnStatus>) -> bool {
        let state = self.state_mut();
        state.filters.status = status;
        state.page = 1;
        self.refresh().await
    }

    async fn set_refund_method_filter(&mut self, method: Option<RefundMethod>) -> bool {
        let state = self.state_mut();
        state.filters.refund_method = method;
        state.page = 1;
        self.refresh().await
    }

    async fn set_dealer_filter(&mut self, dealer_id: Option<String>) -> bool {
        let state = self.state_mut();
        state.filters.dealer_id = dealer_id.filter(|d| !d.trim().is_empty());
        state.page = 1;
        self.refresh().await
    }

    /// Replace filters and page together, then fetch once.
    async fn query(&mut self, filters: ReturnFilters, page: u32) -> bool {
        let state = self.state_mut();
        state.filters = filters;
        state.page = page.max(1);
        self.refresh().await
    }

    fn set_search(&mut self, term: String) {
        self.state_mut().search = term;
    }

    fn rows(&self) -> Vec<ReturnRow> {
        self.state().rows(self.role())
    }

    fn view(&self) -> ListView {
        self.state().view(self.role())
    }

    /// Open the dialog for `action` on a row of the current page. The row's
    /// status is re-checked when the dialog submits. Starting inspection
    /// resolves the staff identifier first.
    async fn open_action(&self, id: &ReturnId, action: ReturnAction, ctx: &FormContext) -> crate::Result<ActionDialog> {
        let role = self.role();
        if !action.permits(role) {
            return Err(ReturnClaimsError::Forbidden { action, role });
        }
        let record = self.state().find(id).ok_or(ReturnClaimsError::NotFound)?;
        let mut dialog = ActionDialog::open(action, record, ctx);
        if dialog.needs_staff() {
            let staff_id = resolve_staff_id(self.auth(), self.directory()).await?;
            dialog.assign_staff(staff_id);
        }
        Ok(dialog)
    }

    /// Re-read the page once after an accepted transition.
    async fn after_action(&mut self, outcome: &SubmitOutcome) -> bool {
        if !outcome.accepted() {
            return false;
        }
        self.refresh().await
    }
}
