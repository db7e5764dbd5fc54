//! The reservation wizard: state, actions and the controller.
//!
//! [`ReservationWizard`] combines the controller with one reducer per step.
//! The controller owns navigation and submission; each step reducer only
//! reacts to its own action variant. [`PricingSync`] runs last and keeps the
//! derived deposit in the draft current while the deposit step is open.
//!
//! # Navigation
//!
//! Steps 1 to 6 are walked with `Next` and `Back`. `Next` needs the current
//! step's predicate and never leaves step 6; step 7 is reached only through a
//! successful submission. Every transition exits the old step (cancelling
//! its fetches) and enters the new one.

use crate::api::{ApiError, CreateReservationResponse};
use crate::draft::DraftStore;
use crate::environment::WizardEnvironment;
use crate::steps::customer_info::{self, CustomerInfoAction, CustomerInfoReducer, CustomerInfoState};
use crate::steps::deposit::{self, DepositAction, DepositReducer, DepositState, Pricing};
use crate::steps::event_selection::{EventSelectionAction, EventSelectionReducer, EventSelectionState};
use crate::steps::preorder::{PreOrderAction, PreOrderReducer, PreOrderState};
use crate::steps::table_selection::{TableSelectionAction, TableSelectionReducer, TableSelectionState};
use crate::steps::time_selection::{TimeSelectionAction, TimeSelectionReducer, TimeSelectionState};
use crate::steps::{self, is_step_valid};
use crate::submission::{ConfirmedReservation, build_request};
use crate::types::{CustomerProfile, DraftPatch, Notice, ReservationDraft, WizardStep};
use chrono::NaiveDateTime;
use maison_core::composition::{CombinedReducer, SharedReducer, combine_reducers};
use maison_core::effect::Effect;
use maison_core::reducer::Reducer;
use maison_core::{SmallVec, smallvec};
use std::sync::Arc;

/// Effects returned by every wizard reducer
pub type Effects = SmallVec<[Effect<WizardAction>; 4]>;

// ============================================================================
// State
// ============================================================================

/// Everything one wizard session knows
#[derive(Clone, Debug, Default)]
pub struct WizardState {
    pub(crate) store: DraftStore,
    pub(crate) customer: Option<CustomerProfile>,
    pub(crate) session_started: bool,
    pub(crate) submitting: bool,
    pub(crate) notice: Option<Notice>,
    pub(crate) confirmation: Option<ConfirmedReservation>,
    pub(crate) payment_redirect: Option<String>,
    /// Step 1 UI state
    pub customer_info: CustomerInfoState,
    /// Step 2 UI state
    pub time_selection: TimeSelectionState,
    /// Step 3 UI state
    pub table_selection: TableSelectionState,
    /// Step 4 UI state
    pub event_selection: EventSelectionState,
    /// Step 5 UI state
    pub preorder: PreOrderState,
    /// Step 6 UI state
    pub deposit: DepositState,
}

impl WizardState {
    /// The draft store
    #[must_use]
    pub const fn store(&self) -> &DraftStore {
        &self.store
    }

    /// The in-progress reservation
    #[must_use]
    pub const fn draft(&self) -> &ReservationDraft {
        self.store.draft()
    }

    /// Active step
    #[must_use]
    pub const fn current_step(&self) -> WizardStep {
        self.store.current_step()
    }

    /// Whether the customer books without deposit
    #[must_use]
    pub const fn is_vip(&self) -> bool {
        self.store.is_vip()
    }

    /// Signed-in customer, if any
    #[must_use]
    pub const fn customer(&self) -> Option<&CustomerProfile> {
        self.customer.as_ref()
    }

    /// Notification to show
    #[must_use]
    pub const fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Summary for the success screen
    #[must_use]
    pub const fn confirmation(&self) -> Option<&ConfirmedReservation> {
        self.confirmation.as_ref()
    }

    /// Id of the reservation just created
    #[must_use]
    pub fn reservation_id(&self) -> Option<&str> {
        self.confirmation.as_ref().map(|confirmed| confirmed.id.as_str())
    }

    /// Payment page the guest is about to be sent to
    #[must_use]
    pub fn payment_redirect(&self) -> Option<&str> {
        self.payment_redirect.as_deref()
    }

    /// Whether a submission is in flight
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Price breakdown of the current draft
    #[must_use]
    pub fn pricing(&self) -> Pricing {
        deposit::pricing(self)
    }

    /// Whether `Next` would move forward at restaurant time `now`
    #[must_use]
    pub fn can_go_next(&self, now: NaiveDateTime) -> bool {
        let step = self.current_step();
        !self.submitting && step < WizardStep::Deposit && is_step_valid(self, step, now)
    }

    /// Whether `Back` would move backward
    #[must_use]
    pub fn can_go_back(&self) -> bool {
        let step = self.current_step();
        !self.submitting && step > WizardStep::CustomerInfo && step != WizardStep::Success
    }

    /// Whether `Submit` would send the draft
    #[must_use]
    pub fn can_submit(&self, now: NaiveDateTime) -> bool {
        !self.submitting
            && self.current_step() == WizardStep::Deposit
            && is_step_valid(self, WizardStep::Deposit, now)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Every input the wizard reacts to
#[derive(Clone, Debug, PartialEq)]
pub enum WizardAction {
    /// Begin the session for a signed-in customer; only the first call counts
    StartSession {
        /// The customer
        customer: CustomerProfile,
    },
    /// Merge a patch into the draft
    UpdateDraft(DraftPatch),
    /// Clear the draft and return to step 1
    ResetDraft,
    /// Forward one step
    Next,
    /// Back one step
    Back,
    /// Send the draft (step 6)
    Submit,
    /// The backend created the reservation
    SubmissionSucceeded(CreateReservationResponse),
    /// The backend refused or could not be reached
    SubmissionFailed(ApiError),
    /// Leave for the payment page
    RedirectToPayment {
        /// Payment page
        url: String,
    },
    /// Book again from the success screen
    StartNewReservation,
    /// Hide the current notice
    DismissNotice,
    /// Step 1
    CustomerInfo(CustomerInfoAction),
    /// Step 2
    TimeSelection(TimeSelectionAction),
    /// Step 3
    TableSelection(TableSelectionAction),
    /// Step 4
    EventSelection(EventSelectionAction),
    /// Step 5
    PreOrder(PreOrderAction),
    /// Step 6
    Deposit(DepositAction),
}

// ============================================================================
// Controller
// ============================================================================

/// Navigation, session lifecycle and submission
#[derive(Clone, Copy, Debug, Default)]
pub struct WizardController;

impl Reducer for WizardController {
    type State = WizardState;
    type Action = WizardAction;
    type Environment = WizardEnvironment;

    fn reduce(&self, state: &mut WizardState, action: WizardAction, env: &WizardEnvironment) -> Effects {
        match action {
            WizardAction::StartSession { customer } => start_session(state, customer, env),
            WizardAction::UpdateDraft(patch) => {
                state.store.update_draft(patch);
                smallvec![]
            },
            WizardAction::ResetDraft => {
                if state.submitting {
                    tracing::debug!("Reset ignored while submitting");
                    return smallvec![];
                }
                reset_wizard(state, WizardStep::CustomerInfo, env)
            },
            WizardAction::Next => next(state, env),
            WizardAction::Back => back(state, env),
            WizardAction::Submit => submit(state, env),
            WizardAction::SubmissionSucceeded(response) => submission_succeeded(state, response, env),
            WizardAction::SubmissionFailed(error) => submission_failed(state, &error, env),
            WizardAction::RedirectToPayment { url } => {
                let navigator = Arc::clone(&env.navigator);
                smallvec![Effect::future(async move {
                    navigator.open(&url);
                    None
                })]
            },
            WizardAction::StartNewReservation => start_new_reservation(state, env),
            WizardAction::DismissNotice => {
                state.notice = None;
                smallvec![]
            },
            WizardAction::CustomerInfo(_)
            | WizardAction::TimeSelection(_)
            | WizardAction::TableSelection(_)
            | WizardAction::EventSelection(_)
            | WizardAction::PreOrder(_)
            | WizardAction::Deposit(_) => smallvec![],
        }
    }
}

/// Exits the current step, moves to `to` and enters it
fn go_to(state: &mut WizardState, to: WizardStep, env: &WizardEnvironment) -> Effects {
    let from = state.current_step();
    let mut effects = steps::on_exit(state, from);
    state.store.set_current_step(to);
    tracing::debug!(from = from.number(), to = to.number(), "Step changed");
    effects.extend(steps::on_enter(state, env));
    effects
}

/// Drops the draft and all step state, landing on `landing`
///
/// Request sequence numbers survive so results of cancelled fetches stay stale.
/// Landing on step 1 with a signed-in customer prefills their details again.
fn reset_wizard(state: &mut WizardState, landing: WizardStep, env: &WizardEnvironment) -> Effects {
    let from = state.current_step();
    let mut effects = steps::on_exit(state, from);

    state.customer_info = CustomerInfoState::default();
    state.time_selection = TimeSelectionState {
        request_seq: state.time_selection.request_seq,
        ..TimeSelectionState::default()
    };
    state.table_selection = TableSelectionState {
        request_seq: state.table_selection.request_seq,
        ..TableSelectionState::default()
    };
    state.event_selection = EventSelectionState {
        request_seq: state.event_selection.request_seq,
        ..EventSelectionState::default()
    };
    state.preorder = PreOrderState {
        request_seq: state.preorder.request_seq,
        ..PreOrderState::default()
    };
    state.deposit = DepositState {
        request_seq: state.deposit.request_seq,
        ..DepositState::default()
    };
    state.store.reset_draft();
    state.store.set_current_step(landing);

    if landing == WizardStep::CustomerInfo {
        if let Some(customer) = state.customer.clone() {
            customer_info::prefill(state, &customer);
        }
    }

    effects.extend(steps::on_enter(state, env));
    effects
}

fn start_session(state: &mut WizardState, customer: CustomerProfile, env: &WizardEnvironment) -> Effects {
    if state.session_started {
        tracing::debug!("Session already started; customer details are not synced again");
        return smallvec![];
    }
    tracing::info!(tier = ?customer.tier, "Wizard session started");
    state.session_started = true;
    state.store.set_vip(customer.tier.is_vip());
    customer_info::prefill(state, &customer);
    state.customer = Some(customer);
    go_to(state, WizardStep::CustomerInfo, env)
}

fn next(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    let step = state.current_step();
    if state.submitting {
        tracing::debug!("Next ignored while submitting");
        return smallvec![];
    }
    let Some(to) = step.next().filter(|_| step < WizardStep::Deposit) else {
        tracing::debug!(step = step.number(), "No step to move forward to");
        return smallvec![];
    };
    if !is_step_valid(state, step, env.local_now()) {
        tracing::debug!(step = step.number(), "Step incomplete");
        return smallvec![];
    }
    go_to(state, to, env)
}

fn back(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    if !state.can_go_back() {
        tracing::debug!(step = state.current_step().number(), submitting = state.submitting, "Back refused");
        return smallvec![];
    }
    match state.current_step().previous() {
        Some(to) => go_to(state, to, env),
        None => smallvec![],
    }
}

fn submit(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    if !state.can_submit(env.local_now()) {
        tracing::debug!(
            step = state.current_step().number(),
            submitting = state.submitting,
            "Submit refused"
        );
        return smallvec![];
    }

    let request = match build_request(state.draft(), env.settings.utc_offset) {
        Ok(request) => request,
        Err(error) => {
            tracing::warn!(%error, "Draft cannot be submitted");
            state.notice = Some(Notice::error(error.user_message()));
            return smallvec![];
        },
    };

    tracing::info!(
        table_id = %request.table_id,
        reservation_time = %request.reservation_time,
        num_people = request.num_people,
        "Submitting reservation"
    );
    state.submitting = true;
    state.notice = None;
    let call = env.reservations.create_reservation(request);

    smallvec![Effect::future(async move {
        Some(match call.await {
            Ok(response) => WizardAction::SubmissionSucceeded(response),
            Err(error) => WizardAction::SubmissionFailed(error),
        })
    })]
}

fn submission_succeeded(
    state: &mut WizardState,
    response: CreateReservationResponse,
    env: &WizardEnvironment,
) -> Effects {
    if !state.submitting {
        tracing::debug!(reservation_id = %response.reservation.id, "Ignored result with no submission in flight");
        return smallvec![];
    }
    state.submitting = false;

    let payment_url = response
        .payment_url
        .as_ref()
        .filter(|_| response.requires_payment)
        .map(|payment| payment.url.clone());

    if let Some(url) = payment_url {
        tracing::info!(reservation_id = %response.reservation.id, "Reservation created; redirecting to payment");
        metrics::counter!("reservation.submissions", "outcome" => "payment_redirect").increment(1);

        let mut effects = reset_wizard(state, WizardStep::CustomerInfo, env);
        state.payment_redirect = Some(url.clone());
        state.notice = Some(Notice::info("Đặt bàn thành công! Đang chuyển đến trang thanh toán..."));
        effects.push(Effect::Delay {
            duration: env.settings.payment_redirect_delay,
            action: Box::new(WizardAction::RedirectToPayment { url }),
        });
        return effects;
    }

    let confirmation = ConfirmedReservation::new(&response, state.draft());
    let notice = if response.requires_payment {
        tracing::warn!(reservation_id = %confirmation.id, "Payment required but no payment link returned");
        metrics::counter!("reservation.submissions", "outcome" => "payment_pending").increment(1);
        Notice::warning("Đặt bàn thành công nhưng chưa có liên kết thanh toán. Nhà hàng sẽ liên hệ để hướng dẫn đặt cọc.")
    } else {
        tracing::info!(reservation_id = %confirmation.id, "Reservation confirmed");
        metrics::counter!("reservation.submissions", "outcome" => "confirmed").increment(1);
        Notice::success("Đặt bàn thành công!")
    };

    let effects = reset_wizard(state, WizardStep::Success, env);
    state.confirmation = Some(confirmation);
    state.notice = Some(notice);
    effects
}

fn submission_failed(state: &mut WizardState, error: &ApiError, env: &WizardEnvironment) -> Effects {
    if !state.submitting {
        tracing::debug!(%error, "Ignored failure with no submission in flight");
        return smallvec![];
    }
    state.submitting = false;
    state.notice = Some(Notice::error(error.user_message()));

    if error.is_table_conflict() {
        tracing::warn!(%error, "Table taken before submission; back to time selection");
        metrics::counter!("reservation.submissions", "outcome" => "table_conflict").increment(1);
        return go_to(state, WizardStep::TimeSelection, env);
    }

    tracing::warn!(%error, "Reservation submission failed");
    metrics::counter!("reservation.submissions", "outcome" => "failed").increment(1);
    smallvec![]
}

fn start_new_reservation(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    if state.current_step() != WizardStep::Success {
        tracing::debug!(step = state.current_step().number(), "New reservation starts from the success screen");
        return smallvec![];
    }
    state.confirmation = None;
    state.notice = None;
    state.payment_redirect = None;
    reset_wizard(state, WizardStep::CustomerInfo, env)
}

// ============================================================================
// Pricing sync and composition
// ============================================================================

/// Writes the derived deposit into the draft while step 6 is active
#[derive(Clone, Copy, Debug, Default)]
pub struct PricingSync;

impl Reducer for PricingSync {
    type State = WizardState;
    type Action = WizardAction;
    type Environment = WizardEnvironment;

    fn reduce(&self, state: &mut WizardState, _action: WizardAction, _env: &WizardEnvironment) -> Effects {
        if state.current_step() == WizardStep::Deposit {
            let deposit = deposit::pricing(state).deposit;
            state.store.set_deposit_amount(deposit);
        }
        smallvec![]
    }
}

/// The complete wizard reducer
#[derive(Clone)]
pub struct ReservationWizard {
    inner: CombinedReducer<WizardState, WizardAction, WizardEnvironment>,
}

impl ReservationWizard {
    /// Controller, the six step reducers, then the pricing sync
    #[must_use]
    pub fn new() -> Self {
        let reducers: Vec<SharedReducer<WizardState, WizardAction, WizardEnvironment>> = vec![
            Arc::new(WizardController),
            Arc::new(CustomerInfoReducer),
            Arc::new(TimeSelectionReducer),
            Arc::new(TableSelectionReducer),
            Arc::new(EventSelectionReducer),
            Arc::new(PreOrderReducer),
            Arc::new(DepositReducer),
            Arc::new(PricingSync),
        ];
        Self {
            inner: combine_reducers(reducers),
        }
    }
}

impl Default for ReservationWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReservationWizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationWizard")
            .field("reducers", &self.inner.len())
            .finish()
    }
}

impl Reducer for ReservationWizard {
    type State = WizardState;
    type Action = WizardAction;
    type Environment = WizardEnvironment;

    fn reduce(&self, state: &mut WizardState, action: WizardAction, env: &WizardEnvironment) -> Effects {
        self.inner.reduce(state, action, env)
    }
}
