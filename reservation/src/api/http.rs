//! HTTP implementation of the restaurant services.

use super::models::{DishListPayload, ErrorBody, ListPayload, Payload, SlotDto, VoucherDto};
use super::voucher::quote;
use super::{
    ApiError, ApiErrorKind, ApiFuture, ApiResult, CreateReservationRequest, CreateReservationResponse, DishPage,
    DishQuery, DishService, EventDto, EventService, ReservationService, TableDto, TableService, VoucherQuote,
    VoucherService,
};
use crate::config::ApiConfig;
use crate::types::{DurationMinutes, Money};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Message older backends send instead of a `TABLE_CONFLICT` code
const LEGACY_CONFLICT_MESSAGE: &str = "Table is already reserved";

/// REST client for the restaurant API
///
/// Cloning is cheap; the connection pool is shared.
///
/// # Example
///
/// ```ignore
/// let client = HttpApiClient::new(&config.api)?.with_token("jwt-token");
/// let tables = client.list_tables().await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpApiClient {
    /// Builds a client from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TLS backend cannot be initialised.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::new(ApiErrorKind::Configuration, e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Sets the bearer token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }

    #[tracing::instrument(skip(self, query), name = "api_get")]
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let mut request = self.client.get(self.url(path)).query(query);

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    #[tracing::instrument(skip(self, body), name = "api_post")]
    async fn post<T: DeserializeOwned, B: Serialize + Sync>(&self, path: &str, body: &B) -> ApiResult<T> {
        let mut request = self.client.post(self.url(path)).json(body);

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Vec<T>> {
        let list: ListPayload<T> = self.get(path, query).await?;
        Ok(list.into_vec())
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let message = body.text().map_or_else(|| text.clone(), str::to_string);
            let kind = classify(status, body.code.as_deref(), &message);
            tracing::warn!(%status, %kind, message = %message, "API request failed");
            return Err(ApiError::new(kind, message));
        }

        let payload: Payload<T> = serde_json::from_str(&text)?;
        Ok(payload.into_inner())
    }
}

fn classify(status: StatusCode, code: Option<&str>, message: &str) -> ApiErrorKind {
    if code == Some("TABLE_CONFLICT") || status == StatusCode::CONFLICT || message.contains(LEGACY_CONFLICT_MESSAGE) {
        return ApiErrorKind::TableConflict;
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiErrorKind::Unauthorized,
        StatusCode::NOT_FOUND => ApiErrorKind::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiErrorKind::Validation,
        _ => ApiErrorKind::Server,
    }
}

impl EventService for HttpApiClient {
    fn list_active_events(&self) -> ApiFuture<Vec<EventDto>> {
        let client = self.clone();
        Box::pin(async move {
            let events: Vec<EventDto> = client.get_list("/events/active", &[]).await?;
            tracing::debug!(count = events.len(), "Fetched active events");
            Ok(events)
        })
    }
}

impl TableService for HttpApiClient {
    fn list_tables(&self) -> ApiFuture<Vec<TableDto>> {
        let client = self.clone();
        Box::pin(async move {
            let tables: Vec<TableDto> = client.get_list("/tables", &[]).await?;
            tracing::debug!(count = tables.len(), "Fetched tables");
            Ok(tables)
        })
    }

    fn available_time_slots(
        &self,
        table_id: &str,
        date: NaiveDate,
        duration: DurationMinutes,
    ) -> ApiFuture<Vec<String>> {
        let client = self.clone();
        let table_id = table_id.to_string();
        Box::pin(async move {
            let query = [
                ("date", date.format("%Y-%m-%d").to_string()),
                ("duration_minutes", duration.get().to_string()),
            ];
            let slots: Vec<SlotDto> = client
                .get_list(&format!("/tables/{table_id}/available-slots"), &query)
                .await?;
            let starts: Vec<String> = slots.into_iter().filter_map(SlotDto::into_start).collect();
            tracing::debug!(table_id = %table_id, %date, count = starts.len(), "Fetched time slots");
            Ok(starts)
        })
    }
}

impl DishService for HttpApiClient {
    fn search_dishes(&self, query: DishQuery) -> ApiFuture<DishPage> {
        let client = self.clone();
        Box::pin(async move {
            let payload: DishListPayload = client.get("/dishes", &query.to_query()).await?;
            let page = payload.into_page(query.page);
            tracing::debug!(
                page = page.current_page,
                total_pages = page.total_pages,
                count = page.items.len(),
                "Fetched dishes"
            );
            Ok(page)
        })
    }
}

impl ReservationService for HttpApiClient {
    fn create_reservation(&self, request: CreateReservationRequest) -> ApiFuture<CreateReservationResponse> {
        let client = self.clone();
        Box::pin(async move {
            let response: CreateReservationResponse = client.post("/reservations", &request).await?;
            tracing::info!(
                reservation_id = %response.reservation.id,
                table_id = %request.table_id,
                requires_payment = response.requires_payment,
                "Reservation created"
            );
            Ok(response)
        })
    }
}

impl VoucherService for HttpApiClient {
    fn validate(&self, code: &str, subtotal: Money, today: NaiveDate) -> ApiFuture<VoucherQuote> {
        let client = self.clone();
        let code = code.to_string();
        Box::pin(async move {
            let vouchers: Vec<VoucherDto> = client.get_list("/vouchers/active", &[]).await?;
            quote(&vouchers, &code, subtotal, today)
        })
    }
}
