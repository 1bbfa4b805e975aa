//! In-memory return service for tests
//!
//! Plays the backend: records every call, walks the status graph on accepted
//! transitions, and can be told to fail the next call.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use crate::domain::aggregates::{Inspection, PickupRequest, ReturnRequest, ReturnStatus};
use crate::domain::value_objects::ReturnId;
use super::*;

#[derive(Clone, Debug)]
pub(crate) struct Call {
    pub name: &'static str,
    pub id: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct State {
    records: BTreeMap<String, ReturnRequest>,
    calls: Vec<Call>,
    fail_next: Option<ServiceError>,
    fail_on: Option<(&'static str, ServiceError)>,
    employees: HashMap<String, Employee>,
    dealers: Vec<Dealer>,
}

#[derive(Default)]
pub(crate) struct FakeReturnService {
    state: Mutex<State>,
}

impl FakeReturnService {
    pub fn new() -> Self { Self::default() }

    pub fn with_records(records: impl IntoIterator<Item = ReturnRequest>) -> Self {
        let fake = Self::new();
        for r in records { fake.insert(r); }
        fake
    }

    pub fn insert(&self, record: ReturnRequest) {
        self.state.lock().unwrap().records.insert(record.id.as_str().to_string(), record);
    }

    pub fn add_employee(&self, user_id: &str, employee_id: &str, dealers: &[&str]) {
        let employee = Employee {
            id: employee_id.into(),
            assigned_dealers: dealers.iter().map(|d| DealerRef::Id(d.to_string())).collect(),
        };
        self.state.lock().unwrap().employees.insert(user_id.into(), employee);
    }

    pub fn add_dealer(&self, id: &str, name: &str) {
        self.state.lock().unwrap().dealers.push(Dealer { id: id.into(), name: Some(name.into()) });
    }

    pub fn fail_next(&self, err: ServiceError) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    /// Fail the next call to `name` only.
    pub fn fail_on(&self, name: &'static str, err: ServiceError) {
        self.state.lock().unwrap().fail_on = Some((name, err));
    }

    pub fn status_of(&self, id: &str) -> Option<ReturnStatus> {
        self.state.lock().unwrap().records.get(id).map(|r| r.return_status.clone())
    }

    pub fn calls(&self) -> Vec<Call> { self.state.lock().unwrap().calls.clone() }

    pub fn calls_named(&self, name: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| c.name == name).count()
    }

    pub fn last_call(&self, name: &str) -> Option<Call> {
        self.state.lock().unwrap().calls.iter().rev().find(|c| c.name == name).cloned()
    }

    /// Transition calls only, reads excluded.
    pub fn mutation_count(&self) -> usize {
        const READS: [&str; 6] = [
            "get_return_requests",
            "get_return_requests_for_fulfillment_staff",
            "get_return_request_by_id",
            "get_return_stats",
            "employee_for_user",
            "list_dealers",
        ];
        self.state.lock().unwrap().calls.iter().filter(|c| !READS.contains(&c.name)).count()
    }

    fn record_call(&self, name: &'static str, id: Option<&ReturnId>, body: Value) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call { name, id: id.map(|i| i.as_str().to_string()), body });
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        match state.fail_on.take() {
            Some((target, err)) if target == name => Err(err),
            other => {
                state.fail_on = other;
                Ok(())
            }
        }
    }

    fn page(&self, filters: &ReturnFilters, page: Pagination) -> Page<ReturnRequest> {
        let state = self.state.lock().unwrap();
        let matching: Vec<_> = state
            .records
            .values()
            .filter(|r| filters.status.as_ref().map_or(true, |s| &r.return_status == s))
            .cloned()
            .collect();
        let limit = page.limit.max(1) as usize;
        let total = matching.len();
        let start = (page.page.max(1) as usize - 1) * limit;
        Page {
            data: matching.into_iter().skip(start).take(limit).collect(),
            pagination: PageInfo {
                current_page: page.page,
                total_pages: total.div_ceil(limit) as u32,
                total_items: total as u64,
            },
        }
    }

    fn advance(
        &self,
        id: &ReturnId,
        from: &[ReturnStatus],
        apply: impl FnOnce(&mut ReturnRequest),
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .get_mut(id.as_str())
            .ok_or(ServiceError::Response { status: 404, message: Some("Return request not found".into()) })?;
        if !from.contains(&record.return_status) {
            return Err(ServiceError::Response {
                status: 409,
                message: Some(format!("Cannot transition from {}", record.return_status)),
            });
        }
        apply(record);
        Ok(())
    }
}

#[async_trait]
impl ReturnService for FakeReturnService {
    async fn get_return_requests(&self, filters: &ReturnFilters, page: Pagination) -> Result<Page<ReturnRequest>, ServiceError> {
        self.record_call("get_return_requests", None, json!({ "filters": filters, "page": page }))?;
        Ok(self.page(filters, page))
    }

    async fn get_return_requests_for_fulfillment_staff(
        &self,
        dealer_ids: &[String],
        filters: &ReturnFilters,
        page: Pagination,
    ) -> Result<Page<ReturnRequest>, ServiceError> {
        self.record_call(
            "get_return_requests_for_fulfillment_staff",
            None,
            json!({ "dealerIds": dealer_ids, "filters": filters, "page": page }),
        )?;
        Ok(self.page(filters, page))
    }

    async fn get_return_request_by_id(&self, id: &ReturnId) -> Result<ReturnRequest, ServiceError> {
        self.record_call("get_return_request_by_id", Some(id), Value::Null)?;
        self.state
            .lock()
            .unwrap()
            .records
            .get(id.as_str())
            .cloned()
            .ok_or(ServiceError::Response { status: 404, message: Some("Return request not found".into()) })
    }

    async fn get_return_stats(&self) -> Result<ReturnStats, ServiceError> {
        self.record_call("get_return_stats", None, Value::Null)?;
        let state = self.state.lock().unwrap();
        let mut counters = BTreeMap::new();
        for r in state.records.values() {
            let entry = counters.entry(r.return_status.to_string()).or_insert(json!(0));
            *entry = json!(entry.as_u64().unwrap_or(0) + 1);
        }
        Ok(ReturnStats { total_returns: state.records.len() as u64, counters })
    }

    async fn validate_return_request(&self, id: &ReturnId) -> Result<(), ServiceError> {
        self.record_call("validate_return_request", Some(id), Value::Null)?;
        self.advance(id, &[ReturnStatus::Requested], |r| {
            r.return_status = ReturnStatus::Validated;
            r.timestamps.validated_at = Some(Utc::now());
        })
    }

    async fn reject_return_request(&self, id: &ReturnId, payload: &RejectPayload) -> Result<(), ServiceError> {
        self.record_call("reject_return_request", Some(id), json!(payload))?;
        self.advance(id, &[ReturnStatus::Requested], |r| {
            r.return_status = ReturnStatus::Rejected;
            r.timestamps.rejected_at = Some(Utc::now());
        })
    }

    async fn schedule_pickup(&self, id: &ReturnId, payload: &SchedulePickupPayload) -> Result<(), ServiceError> {
        self.record_call("schedule_pickup", Some(id), json!(payload))?;
        let payload = payload.clone();
        self.advance(id, &[ReturnStatus::Validated], move |r| {
            r.return_status = ReturnStatus::PickupScheduled;
            r.pickup_request = Some(PickupRequest {
                pickup_address: Some(payload.pickup_address),
                scheduled_date: Some(payload.scheduled_date),
                ..Default::default()
            });
            r.timestamps.pickup_scheduled_at = Some(Utc::now());
        })
    }

    async fn initiate_borzo_pickup(&self, id: &ReturnId, payload: &BorzoPickupPayload) -> Result<(), ServiceError> {
        self.record_call("initiate_borzo_pickup", Some(id), json!(payload))?;
        self.advance(id, &[ReturnStatus::Validated], |r| {
            r.return_status = ReturnStatus::PickupScheduled;
            r.pickup_request = Some(PickupRequest {
                logistics_partner: Some("Borzo".into()),
                tracking_number: Some("BRZ-1".into()),
                ..Default::default()
            });
        })
    }

    async fn complete_pickup(&self, id: &ReturnId, payload: &CompletePickupPayload) -> Result<(), ServiceError> {
        self.record_call("complete_pickup", Some(id), json!(payload))?;
        let tracking = payload.tracking_number.clone();
        self.advance(id, &[ReturnStatus::PickupScheduled], move |r| {
            r.return_status = ReturnStatus::PickupCompleted;
            let pickup = r.pickup_request.get_or_insert_with(Default::default);
            pickup.tracking_number = Some(tracking);
            pickup.completed_date = Some(Utc::now());
            r.timestamps.pickup_completed_at = Some(Utc::now());
        })
    }

    async fn inspect_return_request(&self, id: &ReturnId, payload: &InspectionEntryPayload) -> Result<(), ServiceError> {
        self.record_call("inspect_return_request", Some(id), json!(payload))?;
        let staff = payload.staff_id.clone();
        self.advance(id, &[ReturnStatus::PickupCompleted, ReturnStatus::UnderInspection], move |r| {
            r.return_status = ReturnStatus::UnderInspection;
            r.inspection = Some(Inspection { inspected_by: Some(staff), ..Default::default() });
            r.timestamps.inspection_started_at = Some(Utc::now());
        })
    }

    async fn start_inspect_return_request(&self, id: &ReturnId, payload: &InspectionPayload) -> Result<(), ServiceError> {
        self.record_call("start_inspect_return_request", Some(id), json!(payload))?;
        let approved = payload.is_approved;
        self.advance(id, &[ReturnStatus::UnderInspection], move |r| {
            r.return_status = if approved { ReturnStatus::Approved } else { ReturnStatus::Rejected };
            r.timestamps.inspection_completed_at = Some(Utc::now());
        })
    }

    async fn refund_initiate(&self, payload: &RefundInitiatePayload) -> Result<(), ServiceError> {
        self.record_call("refund_initiate", Some(&payload.return_id), json!(payload))?;
        self.advance(&payload.return_id, &[ReturnStatus::Approved], |r| {
            r.return_status = ReturnStatus::InitiatedRefund;
            r.timestamps.refund_initiated_at = Some(Utc::now());
        })
    }
}

#[async_trait]
impl StaffDirectory for FakeReturnService {
    async fn employee_for_user(&self, user_id: &str) -> Result<Option<Employee>, ServiceError> {
        self.record_call("employee_for_user", None, json!({ "userId": user_id }))?;
        Ok(self.state.lock().unwrap().employees.get(user_id).cloned())
    }

    async fn list_dealers(&self) -> Result<Vec<Dealer>, ServiceError> {
        self.record_call("list_dealers", None, Value::Null)?;
        Ok(self.state.lock().unwrap().dealers.clone())
    }
}
