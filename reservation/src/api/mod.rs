//! Remote services the wizard talks to.
//!
//! Every service is an object-safe trait returning a boxed `Send` future, so the
//! environment can hold `Arc<dyn ...>` and tests can swap in
//! [`mock::MockRestaurantApi`]. [`http::HttpApiClient`] implements all of them
//! against the restaurant REST API.

use crate::types::{DurationMinutes, Money};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use std::fmt;
use thiserror::Error;

pub mod http;
pub mod mock;
pub mod models;
pub mod voucher;

pub use models::{
    CreateReservationRequest, CreateReservationResponse, DishDto, DishPage, DishQuery, DishSort, EventDto,
    PaymentUrl, PreOrderLine, ReservationPreferences, ReservationRecord, TableDto, TableStatus, VoucherDto,
    VoucherQuote,
};

/// Result of a remote call
pub type ApiResult<T> = Result<T, ApiError>;

/// Boxed future returned by every service method
pub type ApiFuture<T> = BoxFuture<'static, ApiResult<T>>;

/// What went wrong, independent of the transport
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The table was booked by someone else for the requested time
    TableConflict,
    /// The voucher does not exist or cannot be used for this order
    InvalidVoucher,
    /// The server rejected the request payload
    Validation,
    /// Missing or expired credentials
    Unauthorized,
    /// Resource does not exist
    NotFound,
    /// Connection failure or timeout
    Network,
    /// Server-side failure
    Server,
    /// Response body could not be decoded
    Decode,
    /// The client could not be constructed
    Configuration,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TableConflict => "TABLE_CONFLICT",
            Self::InvalidVoucher => "INVALID_VOUCHER",
            Self::Validation => "VALIDATION",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::Network => "NETWORK",
            Self::Server => "SERVER",
            Self::Decode => "DECODE",
            Self::Configuration => "CONFIGURATION",
        };
        f.write_str(name)
    }
}

/// Error returned by every service call
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    /// Structured kind the wizard switches on
    pub kind: ApiErrorKind,
    /// Diagnostic message (server text or transport error); not shown to guests verbatim
    pub message: String,
}

impl ApiError {
    /// Creates an error of the given kind
    #[must_use]
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Table booked concurrently
    #[must_use]
    pub fn table_conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::TableConflict, message)
    }

    /// Voucher rejected; `reason` is already guest-facing
    #[must_use]
    pub fn invalid_voucher(reason: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidVoucher, reason)
    }

    /// Transport failure
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    /// Server failure
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Server, message)
    }

    /// Whether the table was taken by another booking
    #[must_use]
    pub fn is_table_conflict(&self) -> bool {
        self.kind == ApiErrorKind::TableConflict
    }

    /// Plain-language Vietnamese message for notifications
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind {
            ApiErrorKind::TableConflict => {
                "Bàn bạn chọn vừa được đặt cho khung giờ này. Vui lòng chọn thời gian khác.".to_string()
            },
            ApiErrorKind::InvalidVoucher => self.message.clone(),
            ApiErrorKind::Validation => "Thông tin đặt bàn chưa hợp lệ. Vui lòng kiểm tra lại.".to_string(),
            ApiErrorKind::Unauthorized => "Phiên đăng nhập đã hết hạn. Vui lòng đăng nhập lại.".to_string(),
            ApiErrorKind::NotFound => "Không tìm thấy dữ liệu yêu cầu.".to_string(),
            ApiErrorKind::Network => "Không thể kết nối tới máy chủ. Vui lòng thử lại.".to_string(),
            ApiErrorKind::Server | ApiErrorKind::Decode | ApiErrorKind::Configuration => {
                "Có lỗi xảy ra. Vui lòng thử lại.".to_string()
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::new(ApiErrorKind::Decode, error.to_string())
        } else {
            Self::network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ApiErrorKind::Decode, error.to_string())
    }
}

/// Promotional and celebration events
pub trait EventService: Send + Sync {
    /// Events currently bookable
    ///
    /// # Errors
    ///
    /// Returns error if the event list cannot be fetched
    fn list_active_events(&self) -> ApiFuture<Vec<EventDto>>;
}

/// Table inventory and availability
pub trait TableService: Send + Sync {
    /// Every table in the restaurant
    ///
    /// # Errors
    ///
    /// Returns error if the table list cannot be fetched
    fn list_tables(&self) -> ApiFuture<Vec<TableDto>>;

    /// Start times (`HH:MM`) at which `table_id` is free for `duration` on `date`
    ///
    /// # Errors
    ///
    /// Returns error if availability cannot be fetched
    fn available_time_slots(
        &self,
        table_id: &str,
        date: NaiveDate,
        duration: DurationMinutes,
    ) -> ApiFuture<Vec<String>>;
}

/// The restaurant menu
pub trait DishService: Send + Sync {
    /// One page of active dishes matching `query`
    ///
    /// # Errors
    ///
    /// Returns error if the menu cannot be fetched
    fn search_dishes(&self, query: DishQuery) -> ApiFuture<DishPage>;
}

/// Reservation creation
pub trait ReservationService: Send + Sync {
    /// Create a reservation from a submitted draft
    ///
    /// # Errors
    ///
    /// Returns [`ApiErrorKind::TableConflict`] when the table was taken concurrently,
    /// other kinds for every other failure
    fn create_reservation(&self, request: CreateReservationRequest) -> ApiFuture<CreateReservationResponse>;
}

/// Voucher validation
pub trait VoucherService: Send + Sync {
    /// Price `code` against an order of `subtotal` placed on `today`
    ///
    /// # Errors
    ///
    /// Returns [`ApiErrorKind::InvalidVoucher`] with a guest-facing reason when the
    /// code cannot be used
    fn validate(&self, code: &str, subtotal: Money, today: NaiveDate) -> ApiFuture<VoucherQuote>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_kind() {
        let error = ApiError::table_conflict("Table is already reserved for this time period");
        assert_eq!(
            error.to_string(),
            "TABLE_CONFLICT: Table is already reserved for this time period"
        );
        assert!(error.is_table_conflict());
    }

    #[test]
    fn user_messages_hide_raw_text() {
        let error = ApiError::server("sequelize: deadlock detected");
        assert!(!error.user_message().contains("sequelize"));

        let voucher = ApiError::invalid_voucher("Mã voucher đã hết hạn");
        assert_eq!(voucher.user_message(), "Mã voucher đã hết hạn");
    }
}
