//! Wire types for the restaurant REST API.
//!
//! The backend is loose about shapes: amounts arrive as numbers or decimal
//! strings, ids as numbers or strings, list fields as arrays or JSON-encoded
//! strings, and lists may or may not be wrapped in a pagination object. The
//! deserializers here absorb those variations so the rest of the crate only
//! sees one shape.

use crate::types::Money;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Responses
// ============================================================================

/// A bookable event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventDto {
    /// Event id
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Flat fee charged for the event
    #[serde(default, alias = "price", deserialize_with = "lenient_money")]
    pub fee: Money,
    /// Services included in the event
    #[serde(default, deserialize_with = "lenient_list")]
    pub inclusions: Vec<String>,
    /// Decoration packages offered with the event
    #[serde(default, deserialize_with = "lenient_list")]
    pub decorations: Vec<String>,
    /// First day the event runs
    #[serde(default)]
    pub start_date: Option<String>,
    /// Last day the event runs
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Operational status of a table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    /// Free
    #[default]
    Available,
    /// Guests seated
    Occupied,
    /// Being cleaned
    Cleaning,
    /// Held by a reservation
    Reserved,
    /// Anything the backend adds later
    #[serde(other)]
    Unknown,
}

impl TableStatus {
    /// Vietnamese label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "Còn trống",
            Self::Occupied => "Đang phục vụ",
            Self::Cleaning => "Đang dọn",
            Self::Reserved => "Đã đặt",
            Self::Unknown => "Không rõ",
        }
    }
}

/// A raw table record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableDto {
    /// Table id
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    /// Number painted on the table
    #[serde(deserialize_with = "lenient_id")]
    pub table_number: String,
    /// Seats
    #[serde(default)]
    pub capacity: u32,
    /// Table-specific deposit
    #[serde(default, deserialize_with = "lenient_money")]
    pub deposit: Money,
    /// Current status
    #[serde(default)]
    pub status: TableStatus,
    /// Location object (`floor`, `area`, `coordinates`), sometimes JSON-encoded as a string
    #[serde(default)]
    pub location: Option<Value>,
    /// Amenities as an array, a JSON-encoded array, a comma list or a flag object
    #[serde(default)]
    pub amenities: Option<Value>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
}

/// A time slot returned by the availability endpoint
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum SlotDto {
    /// `"19:00"` or `"19:00:00"`
    Plain(String),
    /// `{ "start_time": "19:00:00", "available": true }`
    Detailed {
        #[serde(alias = "start_time", alias = "time")]
        start: String,
        #[serde(default)]
        available: Option<bool>,
    },
}

impl SlotDto {
    /// Normalised `HH:MM` start, `None` for unavailable or malformed slots
    pub(crate) fn into_start(self) -> Option<String> {
        let start = match self {
            Self::Plain(start) => start,
            Self::Detailed { available: Some(false), .. } => return None,
            Self::Detailed { start, .. } => start,
        };
        normalize_time(&start)
    }
}

/// `"19:00:00"` / `"19:00"` / `"9:05"` → `"19:00"` / `"19:00"` / `"09:05"`
#[must_use]
pub fn normalize_time(raw: &str) -> Option<String> {
    let raw = raw.trim();
    chrono::NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| chrono::NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
        .map(|time| time.format("%H:%M").to_string())
}

/// Reservation echoed back on creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    /// Reservation id
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    /// Status (`pending`, `confirmed`, ...)
    #[serde(default)]
    pub status: Option<String>,
}

/// Payment gateway hand-off
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUrl {
    /// Where to send the guest
    pub url: String,
    /// Gateway transaction reference
    #[serde(default)]
    pub txn_ref: Option<String>,
}

/// Result of creating a reservation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReservationResponse {
    /// The created reservation
    pub reservation: ReservationRecord,
    /// Whether a deposit must be paid online
    #[serde(default)]
    pub requires_payment: bool,
    /// Gateway hand-off, present when `requires_payment`
    #[serde(default)]
    pub payment_url: Option<PaymentUrl>,
    /// Deposit the server charged
    #[serde(default, deserialize_with = "lenient_optional_money")]
    pub deposit_amount: Option<Money>,
}

/// How a voucher's `value` is applied
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `value` percent of the subtotal
    Percentage,
    /// `value` đồng off
    Fixed,
}

/// A voucher as stored by the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherDto {
    /// Code typed by the guest
    pub code: String,
    /// Percentage or fixed
    pub discount_type: DiscountType,
    /// Percent or đồng depending on `discount_type`
    #[serde(deserialize_with = "lenient_money")]
    pub value: Money,
    /// Last valid day (`YYYY-MM-DD` or RFC 3339)
    #[serde(default)]
    pub expiry_date: Option<String>,
    /// Total redemptions allowed; zero or absent means unlimited
    #[serde(default)]
    pub max_uses: Option<u32>,
    /// Redemptions so far
    #[serde(default)]
    pub current_uses: u32,
    /// Smallest subtotal the voucher applies to
    #[serde(default, deserialize_with = "lenient_money")]
    pub min_order_value: Money,
    /// Switched off by staff when false
    #[serde(default = "default_true")]
    pub active: bool,
}

const fn default_true() -> bool {
    true
}

/// Discount a voucher grants for a given subtotal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherQuote {
    /// Canonical code
    pub code: String,
    /// Discount, never above the subtotal it was priced against
    pub discount: Money,
}

/// A dish on the menu
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishDto {
    /// Dish id
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price
    #[serde(default, deserialize_with = "lenient_money")]
    pub price: Money,
    /// Photos, as an array or a JSON-encoded array
    #[serde(default, deserialize_with = "lenient_list")]
    pub media_urls: Vec<String>,
    /// Switched off by staff when false
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Menu ordering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DishSort {
    /// Alphabetical
    #[default]
    Name,
    /// Cheapest first
    Price,
}

impl DishSort {
    /// Column name the backend sorts on
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
        }
    }
}

/// One page of a menu search
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishQuery {
    /// Name filter; blank matches every dish
    pub name: Option<String>,
    /// Ordering, always ascending
    pub sort: DishSort,
    /// 1-based page
    pub page: u32,
    /// Dishes per page
    pub limit: u32,
}

impl DishQuery {
    /// Dishes per page when browsing the menu
    pub const PAGE_SIZE: u32 = 12;

    /// First page of active dishes matching `name`
    #[must_use]
    pub fn first_page(name: &str, sort: DishSort) -> Self {
        let name = name.trim();
        Self {
            name: (!name.is_empty()).then(|| name.to_string()),
            sort,
            page: 1,
            limit: Self::PAGE_SIZE,
        }
    }

    /// The page after this one
    #[must_use]
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    /// Query-string pairs of `GET /dishes`
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("sortBy", self.sort.column().to_string()),
            ("sortOrder", "ASC".to_string()),
            ("active", "true".to_string()),
        ];
        if let Some(name) = &self.name {
            query.push(("name", name.clone()));
        }
        query
    }
}

/// Dishes of one search page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishPage {
    /// Dishes on this page
    pub items: Vec<DishDto>,
    /// Page number
    pub current_page: u32,
    /// Pages in the whole result
    pub total_pages: u32,
}

impl DishPage {
    /// Whether another page can be fetched
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Guest-supplied preferences attached to a reservation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationPreferences {
    /// Guest name
    pub customer_name: String,
    /// Guest phone
    pub customer_phone: String,
    /// Guest email
    pub customer_email: String,
    /// Free-text requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    /// Event notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_details: Option<String>,
    /// Event services
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub selected_services: Vec<String>,
}

/// One pre-ordered dish on the wire
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreOrderLine {
    /// Dish id
    pub dish_id: String,
    /// Portions
    pub quantity: u32,
}

/// Body of `POST /reservations`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReservationRequest {
    /// Table to book
    pub table_id: String,
    /// Start instant, RFC 3339 in UTC
    pub reservation_time: String,
    /// Length of stay
    pub duration_minutes: u32,
    /// Party size
    pub num_people: u32,
    /// Guest preferences
    pub preferences: ReservationPreferences,
    /// Selected event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Pre-ordered dishes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_order_items: Option<Vec<PreOrderLine>>,
}

// ============================================================================
// Envelopes
// ============================================================================

/// Success body: either `{ "status": "success", "data": T }` or a bare `T`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Payload<T> {
    Enveloped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Enveloped { data } | Self::Bare(data) => data,
        }
    }
}

/// List body: a plain array or a page `{ "data": [...], "pagination": {...} }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListPayload<T> {
    Items(Vec<T>),
    Page { data: Vec<T> },
}

impl<T> ListPayload<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Items(items) | Self::Page { data: items } => items,
        }
    }
}

/// Menu body: `{ "items": [...], "totalPages": n, "currentPage": n }` or a plain array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DishListPayload {
    Paginated {
        items: Vec<DishDto>,
        #[serde(default, alias = "totalPages")]
        total_pages: Option<u32>,
        #[serde(default, alias = "currentPage")]
        current_page: Option<u32>,
    },
    Items(Vec<DishDto>),
}

impl DishListPayload {
    /// The page, trusting the server's numbering when it sends one
    pub(crate) fn into_page(self, requested: u32) -> DishPage {
        match self {
            Self::Paginated {
                items,
                total_pages,
                current_page,
            } => {
                let current_page = current_page.unwrap_or(requested).max(1);
                DishPage {
                    items,
                    current_page,
                    total_pages: total_pages.unwrap_or(current_page).max(current_page),
                }
            },
            Self::Items(items) => DishPage {
                items,
                current_page: requested.max(1),
                total_pages: requested.max(1),
            },
        }
    }
}

/// Error body
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) code: Option<String>,
}

impl ErrorBody {
    pub(crate) fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

// ============================================================================
// Lenient deserializers
// ============================================================================

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

fn money_from_value<E: de::Error>(value: &Value) -> Result<Option<Money>, E> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().and_then(whole_dong))
            .map(Money::from_dong)
            .map(Some)
            .ok_or_else(|| E::custom(format!("invalid amount {n}"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(whole_dong)
            .map(Money::from_dong)
            .map(Some)
            .ok_or_else(|| E::custom(format!("invalid amount {s:?}"))),
        other => Err(E::custom(format!("expected amount, got {other}"))),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_dong(amount: f64) -> Option<u64> {
    (amount.is_finite() && amount >= 0.0).then(|| amount.round() as u64)
}

fn lenient_money<'de, D>(deserializer: D) -> Result<Money, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(money_from_value(&value)?.unwrap_or(Money::ZERO))
}

fn lenient_optional_money<'de, D>(deserializer: D) -> Result<Option<Money>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    money_from_value(&value)
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(string_list(&value))
}

/// Reads a list of names from any of the shapes the backend stores
///
/// Arrays keep their string elements, strings are parsed as JSON or split on
/// commas, and objects contribute the keys whose value is `true`.
#[must_use]
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ (Value::Array(_) | Value::Object(_))) => string_list(&parsed),
            _ => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        },
        Value::Object(flags) => flags
            .iter()
            .filter(|(_, enabled)| enabled.as_bool().unwrap_or(false))
            .map(|(name, _)| name.clone())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_amounts_and_lists_are_lenient() {
        let event: EventDto = serde_json::from_value(json!({
            "id": 7,
            "name": "Sinh nhật",
            "price": "500000.00",
            "inclusions": "[\"Bánh kem\",\"Nến\"]",
            "decorations": "Bóng bay, Hoa tươi"
        }))
        .unwrap();

        assert_eq!(event.id, "7");
        assert_eq!(event.fee, Money::from_dong(500_000));
        assert_eq!(event.inclusions, vec!["Bánh kem", "Nến"]);
        assert_eq!(event.decorations, vec!["Bóng bay", "Hoa tươi"]);
    }

    #[test]
    fn unknown_table_status_does_not_fail() {
        let table: TableDto = serde_json::from_value(json!({
            "id": "t1",
            "table_number": 12,
            "capacity": 4,
            "status": "maintenance"
        }))
        .unwrap();

        assert_eq!(table.status, TableStatus::Unknown);
        assert_eq!(table.table_number, "12");
        assert_eq!(table.deposit, Money::ZERO);
    }

    #[test]
    fn slots_normalise_to_hours_and_minutes() {
        let slots: Vec<SlotDto> = serde_json::from_value(json!([
            "18:00:00",
            { "start_time": "19:30:00", "available": true },
            { "start_time": "20:00:00", "available": false },
            "garbage"
        ]))
        .unwrap();

        let starts: Vec<String> = slots.into_iter().filter_map(SlotDto::into_start).collect();
        assert_eq!(starts, vec!["18:00", "19:30"]);
    }

    #[test]
    fn payload_accepts_envelope_and_bare() {
        let wrapped: Payload<ListPayload<u32>> =
            serde_json::from_value(json!({ "status": "success", "data": { "data": [1, 2], "pagination": {} } }))
                .unwrap();
        assert_eq!(wrapped.into_inner().into_vec(), vec![1, 2]);

        let bare: Payload<ListPayload<u32>> = serde_json::from_value(json!([3])).unwrap();
        assert_eq!(bare.into_inner().into_vec(), vec![3]);
    }

    #[test]
    fn dish_pages_read_backend_pagination() {
        let page: Payload<DishListPayload> = serde_json::from_value(json!({
            "success": true,
            "data": {
                "items": [{ "id": 3, "name": "Phở bò", "price": "85000.00", "media_urls": "[\"pho.jpg\"]" }],
                "totalItems": 14,
                "totalPages": 2,
                "currentPage": 1
            }
        }))
        .unwrap();
        let page = page.into_inner().into_page(1);

        assert_eq!(page.items[0].id, "3");
        assert_eq!(page.items[0].price, Money::from_dong(85_000));
        assert_eq!(page.items[0].media_urls, vec!["pho.jpg"]);
        assert!(page.items[0].active);
        assert!(page.has_more());

        let bare: DishListPayload = serde_json::from_value(json!([])).unwrap();
        assert!(!bare.into_page(3).has_more());
    }

    #[test]
    fn dish_query_skips_a_blank_name() {
        let query = DishQuery::first_page("  ", DishSort::Price);
        let pairs = query.to_query();

        assert!(pairs.contains(&("sortBy", "price".to_string())));
        assert!(pairs.iter().all(|(key, _)| *key != "name"));
        assert_eq!(query.next_page().page, 2);
        assert_eq!(DishQuery::first_page(" phở ", DishSort::Name).name.as_deref(), Some("phở"));
    }

    #[test]
    fn request_omits_empty_optionals() {
        let request = CreateReservationRequest {
            table_id: "t1".into(),
            reservation_time: "2025-01-02T12:00:00.000Z".into(),
            duration_minutes: 90,
            num_people: 2,
            preferences: ReservationPreferences::default(),
            event_id: None,
            pre_order_items: None,
        };
        let body = serde_json::to_value(&request).unwrap();

        assert!(body.get("event_id").is_none());
        assert!(body.get("pre_order_items").is_none());
        assert!(body["preferences"].get("selected_services").is_none());
    }

    #[test]
    fn amenity_flags_object() {
        let list = string_list(&json!({ "vip": true, "window": false, "sofa": true }));
        assert!(list.contains(&"vip".to_string()));
        assert!(list.contains(&"sofa".to_string()));
        assert!(!list.contains(&"window".to_string()));
    }
}
