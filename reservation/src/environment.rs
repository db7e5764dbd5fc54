//! Injected dependencies of the wizard reducers.

use crate::api::{DishService, EventService, ReservationService, TableService, VoucherService};
use crate::config::WizardConfig;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use maison_core::environment::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Browser-level navigation, the only side effect outside the API
pub trait Navigator: Send + Sync {
    /// Sends the guest to `url` (payment gateway)
    fn open(&self, url: &str);
}

/// Navigator for headless runs; logs the target
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn open(&self, url: &str) {
        tracing::info!(url, "Redirecting to payment gateway");
    }
}

/// Restaurant-local settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WizardSettings {
    /// Restaurant offset from UTC
    pub utc_offset: FixedOffset,
    /// Pause before the payment redirect
    pub payment_redirect_delay: Duration,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self::from(&WizardConfig::default())
    }
}

impl From<&WizardConfig> for WizardSettings {
    fn from(config: &WizardConfig) -> Self {
        Self {
            utc_offset: config.utc_offset(),
            payment_redirect_delay: config.payment_redirect_delay(),
        }
    }
}

/// Dependencies shared by every wizard reducer
#[derive(Clone)]
pub struct WizardEnvironment {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Events
    pub events: Arc<dyn EventService>,
    /// Tables and availability
    pub tables: Arc<dyn TableService>,
    /// Menu
    pub dishes: Arc<dyn DishService>,
    /// Reservation creation
    pub reservations: Arc<dyn ReservationService>,
    /// Voucher validation
    pub vouchers: Arc<dyn VoucherService>,
    /// Redirects
    pub navigator: Arc<dyn Navigator>,
    /// Local settings
    pub settings: WizardSettings,
}

impl WizardEnvironment {
    /// Wires every service to one backend implementing all of them
    #[must_use]
    pub fn new<Api>(
        api: &Arc<Api>,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn Navigator>,
        settings: WizardSettings,
    ) -> Self
    where
        Api: EventService + TableService + DishService + ReservationService + VoucherService + 'static,
    {
        Self {
            clock,
            events: Arc::clone(api) as Arc<dyn EventService>,
            tables: Arc::clone(api) as Arc<dyn TableService>,
            dishes: Arc::clone(api) as Arc<dyn DishService>,
            reservations: Arc::clone(api) as Arc<dyn ReservationService>,
            vouchers: Arc::clone(api) as Arc<dyn VoucherService>,
            navigator,
            settings,
        }
    }

    /// Replaces the voucher backend
    #[must_use]
    pub fn with_vouchers(mut self, vouchers: Arc<dyn VoucherService>) -> Self {
        self.vouchers = vouchers;
        self
    }

    /// Wall-clock time at the restaurant
    #[must_use]
    pub fn local_now(&self) -> NaiveDateTime {
        self.clock.now().with_timezone(&self.settings.utc_offset).naive_local()
    }

    /// Today's date at the restaurant
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

impl std::fmt::Debug for WizardEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardEnvironment")
            .field("now", &self.clock.now())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::mock::MockRestaurantApi;
    use maison_testing::{FixedClock, test_clock};

    #[test]
    fn local_time_uses_restaurant_offset() {
        let env = WizardEnvironment::new(
            &Arc::new(MockRestaurantApi::new()),
            Arc::new(test_clock()),
            Arc::new(LoggingNavigator),
            WizardSettings::default(),
        );

        assert_eq!(env.local_now().format("%Y-%m-%d %H:%M").to_string(), "2025-01-01 07:00");
    }

    #[test]
    fn late_utc_evening_is_next_local_day() {
        let env = WizardEnvironment::new(
            &Arc::new(MockRestaurantApi::new()),
            Arc::new(FixedClock::at("2025-01-01T18:30:00Z")),
            Arc::new(LoggingNavigator),
            WizardSettings::default(),
        );

        assert_eq!(env.today(), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
    }
}
