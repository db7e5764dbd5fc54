//! # Maison Testing
//!
//! Testing utilities and helpers for the Maison reservation wizard.
//!
//! This crate provides:
//! - Deterministic clocks
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Assertion helpers for effect lists
//! - Async helpers for store-level flow tests
//!
//! ## Example
//!
//! ```ignore
//! use maison_testing::{helpers, test_clock};
//!
//! #[tokio::test]
//! async fn reaches_time_selection() {
//!     let store = Store::new(WizardState::default(), ReservationWizard::new(), env);
//!     store.send(WizardAction::Next).await?;
//!
//!     assert!(helpers::wait_until(&store, |s| s.current_step() == WizardStep::TimeSelection, TIMEOUT).await);
//! }
//! ```

use chrono::{DateTime, Utc};
use maison_core::environment::Clock;

pub mod reducer_test;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use maison_testing::mocks::FixedClock;
    /// use maison_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Create a fixed clock from an RFC 3339 timestamp
        ///
        /// # Panics
        ///
        /// Panics if the timestamp does not parse.
        #[must_use]
        #[allow(clippy::expect_used)]
        pub fn at(rfc3339: &str) -> Self {
            Self::new(
                DateTime::parse_from_rfc3339(rfc3339)
                    .expect("test timestamp should parse")
                    .with_timezone(&Utc),
            )
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// That is 07:00 on 2025-01-01 in the restaurant's default +07:00 offset.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::at("2025-01-01T00:00:00Z")
    }
}

/// Test helpers and utilities
pub mod helpers {
    use maison_core::reducer::Reducer;
    use maison_runtime::Store;
    use std::sync::Once;
    use std::time::Duration;

    static TRACING: Once = Once::new();

    /// Install a test-writer tracing subscriber once per process
    ///
    /// Honours `RUST_LOG`; defaults to `warn`.
    pub fn init_test_tracing() {
        TRACING.call_once(|| {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_test_writer()
                .try_init();
        });
    }

    /// Poll store state until `predicate` holds or `timeout` elapses
    ///
    /// Effects started by feedback actions are not tracked by an
    /// `EffectHandle`, so flow tests wait on observable state instead.
    pub async fn wait_until<S, A, E, R, F>(store: &Store<S, A, E, R>, predicate: F, timeout: Duration) -> bool
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: Fn(&S) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if store.state(&predicate).await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
