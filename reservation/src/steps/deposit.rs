//! Step 6: pricing, voucher and deposit payment method.
//!
//! Everything on this step is derived from the draft: the event fee and the
//! pre-order total give the subtotal, the applied voucher gives the discount,
//! and the deposit follows from the total and the customer's tier. The
//! wizard writes the derived deposit back into the draft after every action
//! handled while this step is active.

use crate::api::VoucherQuote;
use crate::environment::WizardEnvironment;
use crate::steps::event_selection::event_cost;
use crate::steps::fetch;
use crate::types::{DraftPatch, Money, Notice, PaymentMethod};
use crate::wizard::{Effects, WizardAction, WizardState};
use maison_core::effect::{Effect, EffectId};
use maison_core::reducer::Reducer;
use maison_core::smallvec;

/// Cancellation id of the voucher check
pub const VOUCHER_CHECK: EffectId = EffectId::new("deposit.voucher");

/// Share of the total taken as deposit
pub const DEPOSIT_PERCENT: u64 = 20;

/// Smallest deposit a non-VIP booking pays
pub const MIN_DEPOSIT: Money = Money::from_dong(200_000);

/// Outcome of the last voucher attempt
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum VoucherStatus {
    /// No attempt, or the voucher was removed
    #[default]
    Idle,
    /// Waiting for check `request`
    Checking {
        /// Sequence number of the check in flight
        request: u64,
    },
    /// The draft carries the voucher
    Applied,
    /// Refused, with the reason shown to the guest
    Rejected(String),
}

/// Local UI state of step 6
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DepositState {
    /// Voucher code as typed
    pub voucher_input: String,
    /// Last voucher attempt
    pub voucher: VoucherStatus,
    /// Sequence number of the last voucher check issued
    pub request_seq: u64,
}

/// Price breakdown shown on step 6
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pricing {
    /// Fee of the chosen event
    pub event_cost: Money,
    /// Sum of the pre-ordered dishes
    pub pre_order_cost: Money,
    /// Event plus dishes
    pub subtotal: Money,
    /// Voucher discount
    pub discount: Money,
    /// Subtotal less discount, never negative
    pub total: Money,
    /// Amount paid up front
    pub deposit: Money,
}

/// Actions of step 6
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DepositAction {
    /// Voucher text field changed
    SetVoucherInput(String),
    /// Check the typed code
    ApplyVoucher,
    /// Check `request` accepted the code
    VoucherValidated {
        /// Sequence number of the check
        request: u64,
        /// Accepted code and discount
        quote: VoucherQuote,
    },
    /// Check `request` refused the code
    VoucherRejected {
        /// Sequence number of the check
        request: u64,
        /// Guest-facing reason
        message: String,
    },
    /// Drop the applied voucher
    RemoveVoucher,
    /// Choose how to pay the deposit
    SelectPaymentMethod(PaymentMethod),
}

/// Reducer for [`DepositAction`]
#[derive(Clone, Copy, Debug, Default)]
pub struct DepositReducer;

impl Reducer for DepositReducer {
    type State = WizardState;
    type Action = WizardAction;
    type Environment = WizardEnvironment;

    fn reduce(&self, state: &mut WizardState, action: WizardAction, env: &WizardEnvironment) -> Effects {
        let WizardAction::Deposit(action) = action else {
            return smallvec![];
        };

        match action {
            DepositAction::SetVoucherInput(text) => {
                state.deposit.voucher_input = text;
                if matches!(state.deposit.voucher, VoucherStatus::Rejected(_)) {
                    state.deposit.voucher = VoucherStatus::Idle;
                }
            },
            DepositAction::ApplyVoucher => {
                let code = state.deposit.voucher_input.trim().to_string();
                if code.is_empty() {
                    state.deposit.voucher = VoucherStatus::Rejected("Vui lòng nhập mã voucher".to_string());
                    return smallvec![];
                }
                return check_voucher(state, env, &code);
            },
            DepositAction::VoucherValidated { request, quote } => {
                if state.deposit.voucher != (VoucherStatus::Checking { request }) {
                    tracing::debug!(request, "Discarded stale voucher result");
                    return smallvec![];
                }
                tracing::info!(code = %quote.code, discount = quote.discount.dong(), "Voucher applied");
                state.notice = Some(Notice::success(format!(
                    "Áp dụng voucher thành công! Giảm {}",
                    quote.discount
                )));
                state.deposit.voucher_input.clone_from(&quote.code);
                state.deposit.voucher = VoucherStatus::Applied;
                state.store.update_draft(DraftPatch {
                    voucher_code: Some(Some(quote.code)),
                    voucher_discount: Some(quote.discount),
                    ..DraftPatch::default()
                });
            },
            DepositAction::VoucherRejected { request, message } => {
                if state.deposit.voucher != (VoucherStatus::Checking { request }) {
                    tracing::debug!(request, "Discarded stale voucher rejection");
                    return smallvec![];
                }
                tracing::debug!(request, reason = %message, "Voucher rejected");
                clear_voucher(state);
                state.notice = Some(Notice::error(message.clone()));
                state.deposit.voucher = VoucherStatus::Rejected(message);
            },
            DepositAction::RemoveVoucher => {
                clear_voucher(state);
                state.deposit.voucher_input.clear();
                state.deposit.voucher = VoucherStatus::Idle;
                return smallvec![Effect::Cancel(VOUCHER_CHECK)];
            },
            DepositAction::SelectPaymentMethod(method) => {
                if state.is_vip() {
                    tracing::debug!(?method, "VIP bookings pay no deposit");
                    return smallvec![];
                }
                state.store.update_draft(DraftPatch {
                    payment_method: Some(Some(method)),
                    ..DraftPatch::default()
                });
            },
        }

        smallvec![]
    }
}

fn check_voucher(state: &mut WizardState, env: &WizardEnvironment, code: &str) -> Effects {
    let subtotal = pricing(state).subtotal;
    state.deposit.request_seq += 1;
    let request = state.deposit.request_seq;
    state.deposit.voucher = VoucherStatus::Checking { request };
    tracing::debug!(request, code, subtotal = subtotal.dong(), "Checking voucher");

    fetch(
        VOUCHER_CHECK,
        request,
        env.vouchers.validate(code, subtotal, env.today()),
        |request, quote| WizardAction::Deposit(DepositAction::VoucherValidated { request, quote }),
        |request, error| {
            WizardAction::Deposit(DepositAction::VoucherRejected {
                request,
                message: error.user_message(),
            })
        },
    )
}

fn clear_voucher(state: &mut WizardState) {
    state.store.update_draft(DraftPatch {
        voucher_code: Some(None),
        voucher_discount: Some(Money::ZERO),
        ..DraftPatch::default()
    });
}

/// Deposit owed on `total`
#[must_use]
pub fn deposit_for(total: Money, is_vip: bool) -> Money {
    if is_vip {
        return Money::ZERO;
    }
    total.percent(DEPOSIT_PERCENT).max(MIN_DEPOSIT)
}

/// Current price breakdown
#[must_use]
pub fn pricing(state: &WizardState) -> Pricing {
    let draft = state.draft();
    let event_cost = event_cost(state);
    let pre_order_cost = draft.pre_order_total();
    let subtotal = event_cost + pre_order_cost;
    let discount = draft.voucher_discount;
    let total = subtotal.saturating_sub(discount);

    Pricing {
        event_cost,
        pre_order_cost,
        subtotal,
        discount,
        total,
        deposit: deposit_for(total, state.is_vip()),
    }
}

/// Payment method chosen (or VIP) and no voucher check pending
#[must_use]
pub fn is_valid(state: &WizardState) -> bool {
    (state.is_vip() || state.draft().payment_method.is_some())
        && !matches!(state.deposit.voucher, VoucherStatus::Checking { .. })
}

/// Re-prices an applied voucher against the current subtotal
pub(crate) fn on_enter(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    let Some(code) = state.draft().voucher_code.clone() else {
        return smallvec![];
    };
    check_voucher(state, env, &code)
}

pub(crate) fn on_exit(state: &mut WizardState) -> Effects {
    if matches!(state.deposit.voucher, VoucherStatus::Checking { .. }) {
        state.deposit.voucher = if state.draft().voucher_code.is_some() {
            VoucherStatus::Applied
        } else {
            VoucherStatus::Idle
        };
    }
    smallvec![Effect::Cancel(VOUCHER_CHECK)]
}
