//! Draft store: the in-progress reservation, the current step and the VIP flag.
//!
//! A plain state container. It never rejects a write; gating is the job of the
//! step predicates and the wizard controller.

use crate::types::{DraftPatch, Money, ReservationDraft, WizardStep};
use serde::{Deserialize, Serialize};

/// Holds the draft for one wizard session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftStore {
    draft: ReservationDraft,
    current_step: WizardStep,
    is_vip: bool,
}

impl DraftStore {
    /// Empty draft on the first step
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The draft
    #[must_use]
    pub const fn draft(&self) -> &ReservationDraft {
        &self.draft
    }

    /// Active step
    #[must_use]
    pub const fn current_step(&self) -> WizardStep {
        self.current_step
    }

    /// Whether the customer books without deposit
    #[must_use]
    pub const fn is_vip(&self) -> bool {
        self.is_vip
    }

    /// Shallow-merges `patch` into the draft
    pub fn update_draft(&mut self, patch: DraftPatch) {
        let DraftPatch {
            customer_name,
            customer_phone,
            customer_email,
            num_people,
            duration_minutes,
            special_requests,
            date,
            time,
            selected_floor,
            selected_table_id,
            selected_table_name,
            event_id,
            event_type,
            event_details,
            selected_services,
            pre_orders,
            voucher_code,
            voucher_discount,
            payment_method,
        } = patch;
        let draft = &mut self.draft;

        merge(&mut draft.customer_name, customer_name);
        merge(&mut draft.customer_phone, customer_phone);
        merge(&mut draft.customer_email, customer_email);
        merge(&mut draft.num_people, num_people);
        merge(&mut draft.duration_minutes, duration_minutes);
        merge(&mut draft.special_requests, special_requests);
        merge(&mut draft.date, date);
        merge(&mut draft.time, time);
        merge(&mut draft.selected_floor, selected_floor);
        merge(&mut draft.selected_table_id, selected_table_id);
        merge(&mut draft.selected_table_name, selected_table_name);
        merge(&mut draft.event_id, event_id);
        merge(&mut draft.event_type, event_type);
        merge(&mut draft.event_details, event_details);
        merge(&mut draft.selected_services, selected_services);
        merge(&mut draft.pre_orders, pre_orders);
        merge(&mut draft.voucher_code, voucher_code);
        merge(&mut draft.voucher_discount, voucher_discount);
        merge(&mut draft.payment_method, payment_method);
    }

    /// Moves to `step` unconditionally
    pub fn set_current_step(&mut self, step: WizardStep) {
        self.current_step = step;
    }

    /// Replaces the draft with its default shape and returns to the first step
    ///
    /// The VIP flag belongs to the customer, not the draft, and survives.
    pub fn reset_draft(&mut self) {
        self.draft = ReservationDraft::default();
        self.current_step = WizardStep::CustomerInfo;
    }

    pub(crate) fn set_vip(&mut self, is_vip: bool) {
        self.is_vip = is_vip;
    }

    pub(crate) fn set_deposit_amount(&mut self, deposit: Money) {
        self.draft.deposit_amount = deposit;
    }
}

fn merge<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}
