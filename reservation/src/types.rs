//! Domain types for the reservation wizard.
//!
//! The draft is the single typed record the wizard builds up step by step.
//! Value types here enforce the draft's invariants at construction time:
//! durations are always clamped, pre-order quantities are never zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::num::NonZeroU32;
use std::ops::{Add, Mul};

// ============================================================================
// Value Objects
// ============================================================================

/// Amount of money in Vietnamese đồng (no minor unit)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero đồng
    pub const ZERO: Self = Self(0);

    /// Creates an amount from whole đồng
    #[must_use]
    pub const fn from_dong(dong: u64) -> Self {
        Self(dong)
    }

    /// Whole đồng
    #[must_use]
    pub const fn dong(&self) -> u64 {
        self.0
    }

    /// Whether the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtraction floored at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `percent`% of this amount, rounded half up to whole đồng
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn percent(self, percent: u64) -> Self {
        let scaled = (self.0 as u128 * percent as u128 + 50) / 100;
        if scaled > u64::MAX as u128 {
            Self(u64::MAX)
        } else {
            Self(scaled as u64)
        }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(u64::from(quantity)))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    /// Vietnamese grouping: `1.250.000đ`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        write!(f, "{grouped}đ")
    }
}

/// Reservation length in minutes, always within [`DurationMinutes::MIN`, `DurationMinutes::MAX`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct DurationMinutes(u32);

impl DurationMinutes {
    /// Shortest bookable stay
    pub const MIN: u32 = 30;
    /// Longest bookable stay
    pub const MAX: u32 = 480;
    /// Increment offered by duration pickers
    pub const STEP: u32 = 15;
    /// Default stay for a new draft
    pub const DEFAULT: Self = Self(90);

    /// Clamps any requested value into the bookable range
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamped(minutes: i64) -> Self {
        Self(minutes.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u32)
    }

    /// Minutes
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for DurationMinutes {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for DurationMinutes {
    type Error = std::convert::Infallible;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        Ok(Self::clamped(minutes))
    }
}

impl From<DurationMinutes> for u32 {
    fn from(duration: DurationMinutes) -> Self {
        duration.0
    }
}

/// Supported deposit payment channels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// VNPay gateway
    Vnpay,
    /// MoMo e-wallet
    Momo,
    /// Bank transfer by QR code
    Qr,
}

impl PaymentMethod {
    /// Every supported method, in display order
    pub const ALL: [Self; 3] = [Self::Vnpay, Self::Momo, Self::Qr];

    /// Display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Vnpay => "VNPay",
            Self::Momo => "MoMo",
            Self::Qr => "QR Code",
        }
    }
}

/// One pre-ordered dish
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreOrderItem {
    /// Dish identifier (unique within the list)
    pub dish_id: String,
    /// Dish name, as shown on the menu
    pub dish_name: String,
    /// Portions, never zero
    pub quantity: NonZeroU32,
    /// Unit price
    pub price: Money,
}

impl PreOrderItem {
    /// Price × quantity
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price * self.quantity.get()
    }
}

// ============================================================================
// Draft
// ============================================================================

/// The in-progress reservation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDraft {
    /// Guest name
    pub customer_name: String,
    /// Guest phone number
    pub customer_phone: String,
    /// Guest email
    pub customer_email: String,
    /// Party size; must be positive before leaving the first step
    pub num_people: u32,
    /// Length of stay
    pub duration_minutes: DurationMinutes,
    /// Free-text requests
    pub special_requests: String,
    /// Reservation date (restaurant local)
    pub date: Option<NaiveDate>,
    /// Reservation time as `HH:MM`, empty when unset
    pub time: String,
    /// Floor id (`floor-N`) of the selected table
    pub selected_floor: Option<String>,
    /// Selected table
    pub selected_table_id: Option<String>,
    /// Selected table's number, for display
    pub selected_table_name: Option<String>,
    /// Selected event
    pub event_id: Option<String>,
    /// Duplicate of `event_id` kept for older backends
    pub event_type: Option<String>,
    /// Free-text notes for the event
    pub event_details: Option<String>,
    /// Extra services chosen for the event (no duplicates)
    pub selected_services: Vec<String>,
    /// Pre-ordered dishes, at most one row per dish
    pub pre_orders: Vec<PreOrderItem>,
    /// Applied voucher
    pub voucher_code: Option<String>,
    /// Discount granted by the applied voucher
    pub voucher_discount: Money,
    /// Deposit payment channel
    pub payment_method: Option<PaymentMethod>,
    /// Derived deposit; only the pricing sync writes it
    pub deposit_amount: Money,
}

impl Default for ReservationDraft {
    fn default() -> Self {
        Self {
            customer_name: String::new(),
            customer_phone: String::new(),
            customer_email: String::new(),
            num_people: 2,
            duration_minutes: DurationMinutes::DEFAULT,
            special_requests: String::new(),
            date: None,
            time: String::new(),
            selected_floor: None,
            selected_table_id: None,
            selected_table_name: None,
            event_id: None,
            event_type: None,
            event_details: None,
            selected_services: Vec::new(),
            pre_orders: Vec::new(),
            voucher_code: None,
            voucher_discount: Money::ZERO,
            payment_method: None,
            deposit_amount: Money::ZERO,
        }
    }
}

impl ReservationDraft {
    /// Sum of all pre-order lines
    #[must_use]
    pub fn pre_order_total(&self) -> Money {
        self.pre_orders.iter().map(PreOrderItem::line_total).sum()
    }

    /// Pre-order row for `dish_id`
    #[must_use]
    pub fn pre_order(&self, dish_id: &str) -> Option<&PreOrderItem> {
        self.pre_orders.iter().find(|item| item.dish_id == dish_id)
    }
}

/// Shallow patch over [`ReservationDraft`]
///
/// `None` leaves a field untouched. Nullable draft fields take `Some(None)` to clear.
/// The deposit is derived and cannot be patched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[allow(clippy::option_option)]
pub struct DraftPatch {
    /// Guest name
    pub customer_name: Option<String>,
    /// Guest phone
    pub customer_phone: Option<String>,
    /// Guest email
    pub customer_email: Option<String>,
    /// Party size
    pub num_people: Option<u32>,
    /// Length of stay
    pub duration_minutes: Option<DurationMinutes>,
    /// Free-text requests
    pub special_requests: Option<String>,
    /// Reservation date
    pub date: Option<Option<NaiveDate>>,
    /// Reservation time
    pub time: Option<String>,
    /// Floor id
    pub selected_floor: Option<Option<String>>,
    /// Table id
    pub selected_table_id: Option<Option<String>>,
    /// Table number
    pub selected_table_name: Option<Option<String>>,
    /// Event id
    pub event_id: Option<Option<String>>,
    /// Legacy event type
    pub event_type: Option<Option<String>>,
    /// Event notes
    pub event_details: Option<Option<String>>,
    /// Event services
    pub selected_services: Option<Vec<String>>,
    /// Pre-orders
    pub pre_orders: Option<Vec<PreOrderItem>>,
    /// Voucher code
    pub voucher_code: Option<Option<String>>,
    /// Voucher discount
    pub voucher_discount: Option<Money>,
    /// Payment method
    pub payment_method: Option<Option<PaymentMethod>>,
}

// ============================================================================
// Customer
// ============================================================================

/// Loyalty tier of an authenticated customer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerTier {
    /// Standard customer
    #[default]
    Regular,
    /// VIP
    Vip,
    /// Highest tier
    Platinum,
}

impl CustomerTier {
    /// VIP customers book without a deposit
    #[must_use]
    pub const fn is_vip(self) -> bool {
        matches!(self, Self::Vip | Self::Platinum)
    }
}

/// The authenticated customer, as exposed by the session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Full name
    pub full_name: String,
    /// Phone number
    pub phone: String,
    /// Email address
    pub email: String,
    /// Loyalty tier
    #[serde(default, alias = "ranking")]
    pub tier: CustomerTier,
}

// ============================================================================
// Wizard position and notices
// ============================================================================

/// The seven wizard positions; `Success` is terminal
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WizardStep {
    /// 1 - contact details and party shape
    #[default]
    CustomerInfo,
    /// 2 - date and time
    TimeSelection,
    /// 3 - table
    TableSelection,
    /// 4 - optional event add-on
    EventSelection,
    /// 5 - optional pre-ordered dishes
    PreOrder,
    /// 6 - deposit, voucher, payment method
    Deposit,
    /// 7 - confirmation
    Success,
}

impl WizardStep {
    /// All steps in order
    pub const ALL: [Self; 7] = [
        Self::CustomerInfo,
        Self::TimeSelection,
        Self::TableSelection,
        Self::EventSelection,
        Self::PreOrder,
        Self::Deposit,
        Self::Success,
    ];

    /// 1-based position
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::CustomerInfo => 1,
            Self::TimeSelection => 2,
            Self::TableSelection => 3,
            Self::EventSelection => 4,
            Self::PreOrder => 5,
            Self::Deposit => 6,
            Self::Success => 7,
        }
    }

    /// Step at a 1-based position
    #[must_use]
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::CustomerInfo),
            2 => Some(Self::TimeSelection),
            3 => Some(Self::TableSelection),
            4 => Some(Self::EventSelection),
            5 => Some(Self::PreOrder),
            6 => Some(Self::Deposit),
            7 => Some(Self::Success),
            _ => None,
        }
    }

    /// Following position
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    /// Preceding position
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        Self::from_number(self.number() - 1)
    }

    /// Label shown in the progress stepper
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CustomerInfo => "Thông Tin",
            Self::TimeSelection => "Thời Gian",
            Self::TableSelection => "Chọn Bàn",
            Self::EventSelection => "Sự Kiện",
            Self::PreOrder => "Đặt Món",
            Self::Deposit => "Thanh Toán",
            Self::Success => "Hoàn Tất",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.label())
    }
}

/// Severity of a user-facing notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    /// Neutral information
    Info,
    /// Something completed
    Success,
    /// Completed with caveats
    Warning,
    /// Something failed
    Error,
}

/// A plain-language, non-blocking notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Message shown to the guest
    pub message: String,
}

impl Notice {
    /// Informational notice
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// Success notice
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Warning notice
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    /// Error notice
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
