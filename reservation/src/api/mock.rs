//! In-memory restaurant API for development and testing.
//!
//! [`MockRestaurantApi`] implements every service trait over scripted data and
//! records what the wizard asked for. [`MockRestaurantApi::demo`] seeds a small
//! two-floor restaurant for the offline demo.

use super::models::{DiscountType, ReservationRecord};
use super::voucher::quote;
use super::{
    ApiError, ApiFuture, ApiResult, CreateReservationRequest, CreateReservationResponse, DishDto, DishPage,
    DishQuery, DishService, DishSort, EventDto, EventService, PaymentUrl, ReservationService, TableDto, TableService,
    TableStatus, VoucherDto, VoucherQuote, VoucherService,
};
use crate::environment::{Navigator, WizardEnvironment, WizardSettings};
use crate::types::{DurationMinutes, Money};
use chrono::NaiveDate;
use maison_core::environment::Clock;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// One call to `available_time_slots`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotRequest {
    /// Table asked about
    pub table_id: String,
    /// Date asked about
    pub date: NaiveDate,
    /// Duration asked about
    pub duration_minutes: u32,
}

#[derive(Default)]
struct MockState {
    events: Vec<EventDto>,
    tables: Vec<TableDto>,
    slots: HashMap<String, Vec<String>>,
    vouchers: Vec<VoucherDto>,
    dishes: Vec<DishDto>,
    outcomes: VecDeque<ApiResult<CreateReservationResponse>>,
    event_failure: Option<ApiError>,
    table_failure: Option<ApiError>,
    slot_failure: Option<ApiError>,
    dish_failure: Option<ApiError>,
    slot_delays: VecDeque<Duration>,
    submission_gate: Option<Arc<Notify>>,
    submissions: Vec<CreateReservationRequest>,
    slot_requests: Vec<SlotRequest>,
    dish_queries: Vec<DishQuery>,
    table_fetches: usize,
    event_fetches: usize,
    next_id: u64,
}

/// Scripted restaurant backend
///
/// Without a scripted outcome, submissions succeed with no payment required
/// and ids `RES-1`, `RES-2`, ... Tables without a slot list are free all evening.
#[derive(Default)]
pub struct MockRestaurantApi {
    state: Mutex<MockState>,
}

impl MockRestaurantApi {
    /// Empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Small two-floor restaurant with events, a two-page menu and vouchers
    #[must_use]
    pub fn demo() -> Self {
        let mut vip_room = table("t-06", "06", 8, 2);
        vip_room.location = Some(json!(r#"{"floor": 2, "area": "Phòng riêng"}"#));
        vip_room.amenities = Some(json!("VIP, karaoke"));
        let mut busy = table("t-03", "03", 4, 1);
        busy.status = TableStatus::Occupied;

        let mut birthday = event("evt-birthday", "Sinh nhật", 500_000);
        birthday.inclusions = vec!["Bánh kem".into(), "Trang trí bàn".into()];
        birthday.decorations = vec!["Bóng bay".into(), "Trang trí bàn".into()];
        let mut anniversary = event("evt-anniversary", "Kỷ niệm", 800_000);
        anniversary.inclusions = vec!["Hoa tươi".into(), "Nhạc sống".into()];

        Self::new()
            .with_tables(vec![
                table("t-01", "01", 2, 1),
                table("t-02", "02", 4, 1),
                busy,
                table("t-04", "04", 6, 1),
                table("t-05", "05", 2, 2),
                vip_room,
            ])
            .with_events(vec![
                birthday,
                anniversary,
                event("evt-company", "Tiệc công ty", 1_500_000),
            ])
            .with_dishes(demo_menu())
            .with_vouchers(vec![
                voucher("MAISON20", DiscountType::Percentage, 20),
                VoucherDto {
                    min_order_value: Money::from_dong(300_000),
                    ..voucher("GIAM50K", DiscountType::Fixed, 50_000)
                },
            ])
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the table list
    #[must_use]
    pub fn with_tables(self, tables: Vec<TableDto>) -> Self {
        self.lock().tables = tables;
        self
    }

    /// Replaces the event list
    #[must_use]
    pub fn with_events(self, events: Vec<EventDto>) -> Self {
        self.lock().events = events;
        self
    }

    /// Replaces the voucher catalogue
    #[must_use]
    pub fn with_vouchers(self, vouchers: Vec<VoucherDto>) -> Self {
        self.lock().vouchers = vouchers;
        self
    }

    /// Replaces the menu
    #[must_use]
    pub fn with_dishes(self, dishes: Vec<DishDto>) -> Self {
        self.lock().dishes = dishes;
        self
    }

    /// Free start times of `table_id`, on every date
    #[must_use]
    pub fn with_slots(self, table_id: &str, slots: &[&str]) -> Self {
        self.set_slots(table_id, slots);
        self
    }

    /// Replaces the free start times of `table_id`
    pub fn set_slots(&self, table_id: &str, slots: &[&str]) {
        self.lock()
            .slots
            .insert(table_id.to_string(), slots.iter().map(ToString::to_string).collect());
    }

    /// Queues the result of the next submission
    pub fn respond_next(&self, outcome: ApiResult<CreateReservationResponse>) {
        self.lock().outcomes.push_back(outcome);
    }

    /// Makes every table fetch fail with `error` until cleared with `None`
    pub fn fail_tables(&self, error: Option<ApiError>) {
        self.lock().table_failure = error;
    }

    /// Makes every event fetch fail with `error` until cleared with `None`
    pub fn fail_events(&self, error: Option<ApiError>) {
        self.lock().event_failure = error;
    }

    /// Makes every slot fetch fail with `error` until cleared with `None`
    pub fn fail_slots(&self, error: Option<ApiError>) {
        self.lock().slot_failure = error;
    }

    /// Makes every menu search fail with `error` until cleared with `None`
    pub fn fail_dishes(&self, error: Option<ApiError>) {
        self.lock().dish_failure = error;
    }

    /// Delays the next slot fetch by `delay`; queued delays apply in call order
    pub fn delay_next_slots(&self, delay: Duration) {
        self.lock().slot_delays.push_back(delay);
    }

    /// Holds every submission until the returned gate is notified once per submission
    #[must_use]
    pub fn hold_submissions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().submission_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Requests received by `create_reservation`, in order
    #[must_use]
    pub fn submissions(&self) -> Vec<CreateReservationRequest> {
        self.lock().submissions.clone()
    }

    /// Calls to `available_time_slots`, in order
    #[must_use]
    pub fn slot_requests(&self) -> Vec<SlotRequest> {
        self.lock().slot_requests.clone()
    }

    /// Menu searches received, in order
    #[must_use]
    pub fn dish_queries(&self) -> Vec<DishQuery> {
        self.lock().dish_queries.clone()
    }

    /// Number of table list fetches
    #[must_use]
    pub fn table_fetches(&self) -> usize {
        self.lock().table_fetches
    }

    /// Number of event list fetches
    #[must_use]
    pub fn event_fetches(&self) -> usize {
        self.lock().event_fetches
    }
}

fn evening_slots() -> Vec<String> {
    (17..=21)
        .flat_map(|hour| [format!("{hour:02}:00"), format!("{hour:02}:30")])
        .collect()
}

impl EventService for MockRestaurantApi {
    fn list_active_events(&self) -> ApiFuture<Vec<EventDto>> {
        let result = {
            let mut state = self.lock();
            state.event_fetches += 1;
            state
                .event_failure
                .clone()
                .map_or_else(|| Ok(state.events.clone()), Err)
        };
        Box::pin(async move { result })
    }
}

impl TableService for MockRestaurantApi {
    fn list_tables(&self) -> ApiFuture<Vec<TableDto>> {
        let result = {
            let mut state = self.lock();
            state.table_fetches += 1;
            state
                .table_failure
                .clone()
                .map_or_else(|| Ok(state.tables.clone()), Err)
        };
        Box::pin(async move { result })
    }

    fn available_time_slots(
        &self,
        table_id: &str,
        date: NaiveDate,
        duration: DurationMinutes,
    ) -> ApiFuture<Vec<String>> {
        let (result, delay) = {
            let mut state = self.lock();
            state.slot_requests.push(SlotRequest {
                table_id: table_id.to_string(),
                date,
                duration_minutes: duration.get(),
            });
            let result = state.slot_failure.clone().map_or_else(
                || Ok(state.slots.get(table_id).cloned().unwrap_or_else(evening_slots)),
                Err,
            );
            (result, state.slot_delays.pop_front())
        };
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

impl DishService for MockRestaurantApi {
    fn search_dishes(&self, query: DishQuery) -> ApiFuture<DishPage> {
        let result = {
            let mut state = self.lock();
            state.dish_queries.push(query.clone());
            state
                .dish_failure
                .clone()
                .map_or_else(|| Ok(search(&state.dishes, &query)), Err)
        };
        Box::pin(async move { result })
    }
}

/// Active dishes whose name contains the filter, sorted and paginated like the backend
fn search(dishes: &[DishDto], query: &DishQuery) -> DishPage {
    let needle = query.name.as_deref().map(str::to_lowercase);
    let mut matching: Vec<&DishDto> = dishes
        .iter()
        .filter(|dish| dish.active)
        .filter(|dish| {
            needle
                .as_deref()
                .is_none_or(|needle| dish.name.to_lowercase().contains(needle))
        })
        .collect();
    match query.sort {
        DishSort::Name => matching.sort_by(|a, b| a.name.cmp(&b.name)),
        DishSort::Price => matching.sort_by_key(|dish| dish.price),
    }

    let limit = query.limit.max(1) as usize;
    let page = query.page.max(1);
    let total_pages = u32::try_from(matching.len().div_ceil(limit)).unwrap_or(u32::MAX).max(1);
    let items = matching
        .into_iter()
        .skip((page as usize - 1).saturating_mul(limit))
        .take(limit)
        .cloned()
        .collect();
    DishPage {
        items,
        current_page: page,
        total_pages,
    }
}

impl ReservationService for MockRestaurantApi {
    fn create_reservation(&self, request: CreateReservationRequest) -> ApiFuture<CreateReservationResponse> {
        let (result, gate) = {
            let mut state = self.lock();
            state.submissions.push(request);
            state.next_id += 1;
            let id = format!("RES-{}", state.next_id);
            let result = state.outcomes.pop_front().unwrap_or_else(|| {
                Ok(CreateReservationResponse {
                    reservation: ReservationRecord {
                        id,
                        status: Some("confirmed".into()),
                    },
                    requires_payment: false,
                    payment_url: None,
                    deposit_amount: None,
                })
            });
            (result, state.submission_gate.clone())
        };
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if let Ok(response) = &result {
                tracing::info!(reservation_id = %response.reservation.id, "Mock reservation created");
            }
            result
        })
    }
}

impl VoucherService for MockRestaurantApi {
    fn validate(&self, code: &str, subtotal: Money, today: NaiveDate) -> ApiFuture<VoucherQuote> {
        let result = quote(&self.lock().vouchers, code, subtotal, today);
        Box::pin(async move { result })
    }
}

/// Navigator that remembers where it was sent
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs opened so far
    #[must_use]
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn open(&self, url: &str) {
        tracing::info!(url, "Recorded navigation");
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}

/// Environment over a mock backend with a short payment redirect delay
#[must_use]
pub fn mock_environment(
    api: &Arc<MockRestaurantApi>,
    clock: Arc<dyn Clock>,
    navigator: Arc<RecordingNavigator>,
) -> WizardEnvironment {
    let settings = WizardSettings {
        payment_redirect_delay: Duration::from_millis(10),
        ..WizardSettings::default()
    };
    WizardEnvironment::new(api, clock, navigator, settings)
}

/// Successful response that requires an online deposit
#[must_use]
pub fn payment_required(id: &str, url: &str, deposit: u64) -> CreateReservationResponse {
    CreateReservationResponse {
        reservation: ReservationRecord {
            id: id.to_string(),
            status: Some("pending".into()),
        },
        requires_payment: true,
        payment_url: Some(PaymentUrl {
            url: url.to_string(),
            txn_ref: Some(format!("TXN-{id}")),
        }),
        deposit_amount: Some(Money::from_dong(deposit)),
    }
}

/// Available table on `floor`
#[must_use]
pub fn table(id: &str, number: &str, capacity: u32, floor: u32) -> TableDto {
    TableDto {
        id: id.to_string(),
        table_number: number.to_string(),
        capacity,
        deposit: Money::ZERO,
        status: TableStatus::Available,
        location: Some(json!({ "floor": floor })),
        amenities: None,
        description: None,
    }
}

/// Event without services
#[must_use]
pub fn event(id: &str, name: &str, fee: u64) -> EventDto {
    EventDto {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        fee: Money::from_dong(fee),
        inclusions: Vec::new(),
        decorations: Vec::new(),
        start_date: None,
        end_date: None,
    }
}

/// Active dish without photos
#[must_use]
pub fn dish(id: &str, name: &str, price: u64) -> DishDto {
    DishDto {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        price: Money::from_dong(price),
        media_urls: Vec::new(),
        active: true,
    }
}

pub(crate) fn demo_menu() -> Vec<DishDto> {
    let mut seasonal = dish("lau-cua-dong", "Lẩu cua đồng", 420_000);
    seasonal.active = false;
    vec![
        dish("pho-bo", "Phở bò", 85_000),
        dish("bun-cha", "Bún chả Hà Nội", 65_000),
        dish("goi-cuon", "Gỏi cuốn tôm thịt", 45_000),
        dish("cha-gio", "Chả giò", 55_000),
        dish("bo-luc-lac", "Bò lúc lắc", 180_000),
        dish("ca-kho-to", "Cá kho tộ", 120_000),
        dish("com-tam", "Cơm tấm sườn bì", 70_000),
        dish("banh-xeo", "Bánh xèo", 60_000),
        dish("lau-thai", "Lẩu Thái hải sản", 350_000),
        dish("ga-nuong", "Gà nướng mật ong", 220_000),
        dish("canh-chua", "Canh chua cá lóc", 95_000),
        dish("rau-muong", "Rau muống xào tỏi", 40_000),
        dish("che-ba-mau", "Chè ba màu", 30_000),
        dish("tra-da", "Trà đá", 5_000),
        seasonal,
    ]
}

fn voucher(code: &str, discount_type: DiscountType, value: u64) -> VoucherDto {
    VoucherDto {
        code: code.to_string(),
        discount_type,
        value: Money::from_dong(value),
        expiry_date: None,
        max_uses: None,
        current_uses: 0,
        min_order_value: Money::ZERO,
        active: true,
    }
}
