//! JSON gateway over the controllers
//!
//! Identity comes from the `x-user-id` and `x-user-role` headers set by the
//! session layer in front of this service.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::controllers::{DetailView, ListView, ReturnClaimsContainer, ReturnDetails};
use crate::dialogs::{Feedback, SubmitOutcome};
use crate::domain::aggregates::{RefundMethod, ReturnStatus};
use crate::domain::value_objects::ReturnId;
use crate::service::{ReturnFilters, ReturnService, ReturnStats, StaffDirectory};
use crate::workflow::forms::FormContext;
use crate::workflow::{AuthContext, ReturnAction};
use crate::ReturnClaimsError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn ReturnService>,
    pub directory: Arc<dyn StaffDirectory>,
    pub page_size: u32,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "message": message.into() })))
}

fn from_claims_error(err: ReturnClaimsError) -> ApiError {
    match err {
        ReturnClaimsError::NotFound => api_error(StatusCode::NOT_FOUND, err.to_string()),
        ReturnClaimsError::Forbidden { .. } | ReturnClaimsError::Unauthorized | ReturnClaimsError::EmployeeNotFound(_) => {
            api_error(StatusCode::FORBIDDEN, err.to_string())
        }
        ReturnClaimsError::Service(e) if e.is_not_found() => api_error(StatusCode::NOT_FOUND, e.user_message()),
        ReturnClaimsError::Service(e) => api_error(StatusCode::BAD_GATEWAY, e.user_message()),
        ReturnClaimsError::Config(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn identity(headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty());
    let user_id = header(USER_ID_HEADER).ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Missing user identity"))?;
    Ok(AuthContext::from_session(user_id, header(USER_ROLE_HEADER).unwrap_or_default()))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "healthy", "service": "return-claims" })) }))
        .route("/api/v1/return-claims", get(list_claims))
        .route("/api/v1/return-claims/stats", get(claim_stats))
        .route("/api/v1/return-claims/:id", get(get_claim))
        .route("/api/v1/return-claims/:id/actions/:action", post(run_action))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub status: Option<String>,
    pub refund_method: Option<RefundMethod>,
    pub dealer_id: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    fn filters(&self) -> ReturnFilters {
        let set = |v: &Option<String>| v.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
        ReturnFilters {
            status: set(&self.status).map(ReturnStatus::from),
            refund_method: self.refund_method.clone(),
            dealer_id: set(&self.dealer_id),
        }
    }
}

async fn list_claims(
    State(s): State<AppState>,
    headers: HeaderMap,
    Query(p): Query<ListParams>,
) -> Result<Json<ListView>, ApiError> {
    let auth = identity(&headers)?;
    let mut container = ReturnClaimsContainer::for_session(auth, s.service.clone(), s.directory.clone(), s.page_size);
    let list = container.list_mut().ok_or_else(|| from_claims_error(ReturnClaimsError::Unauthorized))?;
    list.query(p.filters(), p.page.unwrap_or(1)).await;
    if let Some(term) = p.search {
        list.set_search(term);
    }
    Ok(Json(list.view()))
}

async fn claim_stats(State(s): State<AppState>, headers: HeaderMap) -> Result<Json<ReturnStats>, ApiError> {
    let auth = identity(&headers)?;
    if auth.role.is_none() {
        return Err(from_claims_error(ReturnClaimsError::Unauthorized));
    }
    s.service
        .get_return_stats()
        .await
        .map(Json)
        .map_err(|e| from_claims_error(e.into()))
}

async fn load_details(s: &AppState, headers: &HeaderMap, id: String) -> Result<ReturnDetails, ApiError> {
    let auth = identity(headers)?;
    let id = ReturnId::new(id).map_err(|_| from_claims_error(ReturnClaimsError::NotFound))?;
    let mut details =
        ReturnDetails::new(s.service.clone(), s.directory.clone(), auth, id).map_err(from_claims_error)?;
    if !details.load().await {
        let message = details.error().unwrap_or_default().to_string();
        let status = if details.is_not_found() { StatusCode::NOT_FOUND } else { StatusCode::BAD_GATEWAY };
        return Err(api_error(status, message));
    }
    Ok(details)
}

async fn get_claim(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DetailView>, ApiError> {
    let details = load_details(&s, &headers, id).await?;
    Ok(Json(details.view()))
}

/// Open the dialog against a fresh read, fill it from the body and submit.
/// Continuing inspection goes straight to the result form.
async fn run_action(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path((id, slug)): Path<(String, String)>,
    body: Option<Json<Value>>,
) -> Result<Json<DetailView>, ApiError> {
    let action = match ReturnAction::from_slug(&slug) {
        Some(ReturnAction::ContinueInspection) => ReturnAction::SubmitInspection,
        Some(action) => action,
        None => return Err(api_error(StatusCode::NOT_FOUND, format!("Unknown action {slug}"))),
    };
    let mut details = load_details(&s, &headers, id).await?;
    let ctx = FormContext::current();
    let mut dialog = details.open_action(action, &ctx).await.map_err(from_claims_error)?;
    if let Some(Json(body)) = body {
        dialog.fill(body).map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    }

    let outcome = dialog.submit(s.service.as_ref(), &ctx).await;
    match outcome {
        SubmitOutcome::Completed(ref event) => {
            match serde_json::to_string(event) {
                Ok(json) => tracing::info!(return_id = %event.return_id(), event = %json, "return claim transition"),
                Err(e) => tracing::warn!(error = %e, "failed to serialize transition event"),
            }
            details.after_action(&outcome).await;
            Ok(Json(details.view()))
        }
        SubmitOutcome::Proceeded => Ok(Json(details.view())),
        SubmitOutcome::Failed(feedback) => Err(feedback_error(feedback)),
        SubmitOutcome::Stale { .. } | SubmitOutcome::Busy | SubmitOutcome::Closed => {
            Err(api_error(StatusCode::CONFLICT, "Dialog is no longer accepting submissions"))
        }
    }
}

fn feedback_error(feedback: Feedback) -> ApiError {
    let message = feedback.message();
    match feedback {
        Feedback::Invalid { errors } => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "message": message, "errors": errors })))
        }
        Feedback::InvalidStatus { .. } => api_error(StatusCode::CONFLICT, message),
        Feedback::Rejected { .. } => api_error(StatusCode::UNPROCESSABLE_ENTITY, message),
        Feedback::Failed { .. } => api_error(StatusCode::BAD_GATEWAY, message),
    }
}
