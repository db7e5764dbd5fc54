//! Maison reservation wizard - seven steps from contact details to a booked table
//!
//! The wizard is a single [`ReservationWizard`] reducer over one [`WizardState`],
//! driven by a `maison_runtime::Store`. A UI sends [`WizardAction`]s and reads
//! state; every remote call is an effect the store runs on tokio and feeds back
//! as another action.
//!
//! # Steps
//!
//! ```text
//! 1 Thông Tin ─▶ 2 Thời Gian ─▶ 3 Chọn Bàn ─▶ 4 Sự Kiện ─▶ 5 Đặt Món ─▶ 6 Thanh Toán
//!                    ▲                                                     │ Submit
//!                    └──────────── table taken (TABLE_CONFLICT) ───────────┤
//!                                                                          ├─▶ payment page (draft reset)
//!                                                                          └─▶ 7 Hoàn Tất
//! ```
//!
//! - **Draft store** ([`draft`]): the one typed record every step writes to
//! - **Steps** ([`steps`]): local UI state, a reducer, a validity predicate and
//!   entry/exit hooks per step; remote data is sequenced and cancelled on exit
//! - **Controller** ([`wizard`]): navigation gates, session start, submission
//!   routing and the deposit sync
//! - **Services** ([`api`]): object-safe traits with an HTTP client and an
//!   in-memory backend
//!
//! # Example
//!
//! ```ignore
//! let store = Store::new(WizardState::default(), ReservationWizard::new(), environment);
//! store.send(WizardAction::StartSession { customer }).await?;
//! store.send(WizardAction::Next).await?;
//! let step = store.state(|s| s.current_step()).await;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod draft;
pub mod environment;
pub mod stepper;
pub mod steps;
pub mod submission;
pub mod types;
pub mod wizard;

pub use api::{ApiError, ApiErrorKind, DishService, EventService, ReservationService, TableService, VoucherService};
pub use config::Config;
pub use draft::DraftStore;
pub use environment::{LoggingNavigator, Navigator, WizardEnvironment, WizardSettings};
pub use submission::{ConfirmedReservation, SubmissionError, build_request};
pub use types::*;
pub use wizard::{Effects, PricingSync, ReservationWizard, WizardAction, WizardController, WizardState};
