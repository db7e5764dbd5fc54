//! The six editable wizard steps.
//!
//! Each step module owns a slice of [`WizardState`], a reducer over its own
//! actions, a validity predicate and entry/exit hooks the controller calls on
//! every transition. Steps that load remote data do so through [`fetch`] and
//! keep the result in a [`Loadable`].

use crate::api::{ApiError, ApiFuture};
use crate::environment::WizardEnvironment;
use crate::types::WizardStep;
use crate::wizard::{Effects, WizardAction, WizardState};
use chrono::NaiveDateTime;
use maison_core::effect::{Effect, EffectId};
use maison_core::smallvec;

pub mod customer_info;
pub mod deposit;
pub mod event_selection;
pub mod preorder;
pub mod table_selection;
pub mod time_selection;

/// Remote data owned by a step
///
/// `Loading` carries the sequence number of the request in flight; results
/// tagged with any other number are stale and dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Loadable<T> {
    /// Nothing requested
    #[default]
    Idle,
    /// Waiting for request `request`
    Loading {
        /// Sequence number of the request in flight
        request: u64,
    },
    /// Data arrived
    Loaded(T),
    /// The last request failed
    Failed {
        /// Guest-facing reason
        message: String,
    },
}

impl<T> Loadable<T> {
    /// Whether a request is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Loaded data
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    /// Failure reason
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { message } => Some(message),
            _ => None,
        }
    }

    /// Whether a result for `request` is the one being waited for
    #[must_use]
    pub const fn awaits(&self, request: u64) -> bool {
        matches!(self, Self::Loading { request: pending } if *pending == request)
    }

    /// Drops an in-flight request, keeping loaded data
    pub(crate) fn abandon(&mut self) {
        if self.is_loading() {
            *self = Self::Idle;
        }
    }
}

/// `[Cancel(id), Cancellable(id, call)]`: replaces any request still in flight under `id`
pub(crate) fn fetch<T, L, F>(id: EffectId, request: u64, call: ApiFuture<T>, loaded: L, failed: F) -> Effects
where
    T: Send + 'static,
    L: FnOnce(u64, T) -> WizardAction + Send + 'static,
    F: FnOnce(u64, ApiError) -> WizardAction + Send + 'static,
{
    smallvec![
        Effect::Cancel(id),
        Effect::future(async move {
            Some(match call.await {
                Ok(value) => loaded(request, value),
                Err(error) => failed(request, error),
            })
        })
        .cancellable(id),
    ]
}

/// Whether `step`'s gate is open
#[must_use]
pub fn is_step_valid(state: &WizardState, step: WizardStep, now: NaiveDateTime) -> bool {
    match step {
        WizardStep::CustomerInfo => customer_info::is_valid(state.draft()),
        WizardStep::TimeSelection => time_selection::is_valid(state, now),
        WizardStep::TableSelection => table_selection::is_valid(state.draft()),
        WizardStep::EventSelection | WizardStep::PreOrder => true,
        WizardStep::Deposit => deposit::is_valid(state),
        WizardStep::Success => false,
    }
}

/// Runs the entry hook of the current step
pub(crate) fn on_enter(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    match state.current_step() {
        WizardStep::CustomerInfo => customer_info::on_enter(state),
        WizardStep::TimeSelection => time_selection::on_enter(state, env),
        WizardStep::TableSelection => table_selection::on_enter(state, env),
        WizardStep::EventSelection => event_selection::on_enter(state, env),
        WizardStep::Deposit => deposit::on_enter(state, env),
        WizardStep::PreOrder => preorder::on_enter(state, env),
        WizardStep::Success => smallvec![],
    }
}

/// Runs the exit hook of `step`, cancelling whatever it still has in flight
pub(crate) fn on_exit(state: &mut WizardState, step: WizardStep) -> Effects {
    match step {
        WizardStep::TimeSelection => time_selection::on_exit(state),
        WizardStep::TableSelection => table_selection::on_exit(state),
        WizardStep::EventSelection => event_selection::on_exit(state),
        WizardStep::PreOrder => preorder::on_exit(state),
        WizardStep::Deposit => deposit::on_exit(state),
        WizardStep::CustomerInfo | WizardStep::Success => smallvec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_requests_are_not_awaited() {
        let loading: Loadable<Vec<u8>> = Loadable::Loading { request: 3 };
        assert!(loading.awaits(3));
        assert!(!loading.awaits(2));
        assert!(!Loadable::Loaded(vec![1u8]).awaits(3));
    }

    #[test]
    fn abandon_keeps_loaded_data() {
        let mut loaded = Loadable::Loaded(1);
        loaded.abandon();
        assert_eq!(loaded, Loadable::Loaded(1));

        let mut loading: Loadable<i32> = Loadable::Loading { request: 1 };
        loading.abandon();
        assert_eq!(loading, Loadable::Idle);
    }
}
