//! `reqwest` client for the return service

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::config::Config;
use crate::domain::aggregates::ReturnRequest;
use crate::domain::value_objects::ReturnId;
use super::{
    BorzoPickupPayload, CompletePickupPayload, Dealer, Employee, InspectionEntryPayload, InspectionPayload, Page,
    Pagination, RefundInitiatePayload, RejectPayload, ReturnFilters, ReturnService, ReturnStats,
    SchedulePickupPayload, ServiceError, StaffDirectory,
};

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "error")]
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery<'a> {
    page: u32,
    limit: u32,
    #[serde(flatten)]
    filters: &'a ReturnFilters,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DealerScope<'a> {
    dealer_ids: &'a [String],
}

#[derive(Clone)]
pub struct HttpReturnService {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpReturnService {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Other(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string(), token })
    }

    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        Self::new(&config.return_service_url, config.return_service_token.clone(), config.request_timeout)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ServiceError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body).ok().and_then(|b| b.message);
        tracing::warn!(status = status.as_u16(), message = ?message, "return service request failed");
        Err(ServiceError::Response { status: status.as_u16(), message })
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ServiceError> {
        let body = self.send(builder).await?.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "failed to decode return service response");
            ServiceError::Decode(e.to_string())
        })
    }

    async fn fetch_data<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ServiceError> {
        self.fetch::<DataEnvelope<T>>(builder).await.map(|e| e.data)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<(), ServiceError> {
        self.send(builder).await.map(|_| ())
    }
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        ServiceError::NoResponse(err.to_string())
    } else if err.is_decode() {
        ServiceError::Decode(err.to_string())
    } else {
        ServiceError::Other(err.to_string())
    }
}

#[async_trait]
impl ReturnService for HttpReturnService {
    async fn get_return_requests(&self, filters: &ReturnFilters, page: Pagination) -> Result<Page<ReturnRequest>, ServiceError> {
        let query = ListQuery { page: page.page, limit: page.limit, filters };
        self.fetch(self.request(Method::GET, "/returns").query(&query)).await
    }

    async fn get_return_requests_for_fulfillment_staff(
        &self,
        dealer_ids: &[String],
        filters: &ReturnFilters,
        page: Pagination,
    ) -> Result<Page<ReturnRequest>, ServiceError> {
        let query = ListQuery { page: page.page, limit: page.limit, filters };
        let builder = self
            .request(Method::POST, "/returns/fulfillment")
            .query(&query)
            .json(&DealerScope { dealer_ids });
        self.fetch(builder).await
    }

    async fn get_return_request_by_id(&self, id: &ReturnId) -> Result<ReturnRequest, ServiceError> {
        self.fetch_data(self.request(Method::GET, &format!("/returns/{id}"))).await
    }

    async fn get_return_stats(&self) -> Result<ReturnStats, ServiceError> {
        self.fetch_data(self.request(Method::GET, "/returns/stats")).await
    }

    async fn validate_return_request(&self, id: &ReturnId) -> Result<(), ServiceError> {
        self.execute(self.request(Method::PUT, &format!("/returns/{id}/validate"))).await
    }

    async fn reject_return_request(&self, id: &ReturnId, payload: &RejectPayload) -> Result<(), ServiceError> {
        self.execute(self.request(Method::PUT, &format!("/returns/{id}/reject")).json(payload)).await
    }

    async fn schedule_pickup(&self, id: &ReturnId, payload: &SchedulePickupPayload) -> Result<(), ServiceError> {
        self.execute(self.request(Method::PUT, &format!("/returns/{id}/schedule-pickup")).json(payload)).await
    }

    async fn initiate_borzo_pickup(&self, id: &ReturnId, payload: &BorzoPickupPayload) -> Result<(), ServiceError> {
        self.execute(self.request(Method::POST, &format!("/returns/{id}/borzo-pickup")).json(payload)).await
    }

    async fn complete_pickup(&self, id: &ReturnId, payload: &CompletePickupPayload) -> Result<(), ServiceError> {
        self.execute(self.request(Method::PUT, &format!("/returns/{id}/complete-pickup")).json(payload)).await
    }

    async fn inspect_return_request(&self, id: &ReturnId, payload: &InspectionEntryPayload) -> Result<(), ServiceError> {
        self.execute(self.request(Method::PUT, &format!("/returns/{id}/inspect")).json(payload)).await
    }

    async fn start_inspect_return_request(&self, id: &ReturnId, payload: &InspectionPayload) -> Result<(), ServiceError> {
        self.execute(self.request(Method::PUT, &format!("/returns/{id}/inspection")).json(payload)).await
    }

    async fn refund_initiate(&self, payload: &RefundInitiatePayload) -> Result<(), ServiceError> {
        self.execute(self.request(Method::POST, "/returns/refund/initiate").json(payload)).await
    }
}

#[async_trait]
impl StaffDirectory for HttpReturnService {
    async fn employee_for_user(&self, user_id: &str) -> Result<Option<Employee>, ServiceError> {
        match self.fetch_data(self.request(Method::GET, &format!("/employees/user/{user_id}"))).await {
            Ok(employee) => Ok(Some(employee)),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND.as_u16()) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_dealers(&self) -> Result<Vec<Dealer>, ServiceError> {
        self.fetch_data(self.request(Method::GET, "/dealers")).await
    }
}
