//! Step 1: contact details, party size, duration and special requests.

use crate::environment::WizardEnvironment;
use crate::types::{CustomerProfile, DraftPatch, DurationMinutes, ReservationDraft};
use crate::wizard::{Effects, WizardAction, WizardState};
use maison_core::reducer::Reducer;
use maison_core::smallvec;

/// Local UI state of step 1
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomerInfoState {
    /// Party-size text as typed; may be empty while the draft keeps its last valid value
    pub num_people_input: String,
    /// Contact fields filled from the signed-in profile
    pub locked: ContactLock,
}

/// Which contact fields are read-only
///
/// Only fields the profile actually supplied are locked, so a customer whose
/// profile lacks a phone number can still type one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContactLock {
    /// Name came from the profile
    pub name: bool,
    /// Phone came from the profile
    pub phone: bool,
    /// Email came from the profile
    pub email: bool,
}

/// Actions of step 1
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CustomerInfoAction {
    /// Name; ignored when the profile supplied one
    SetName(String),
    /// Phone; ignored when the profile supplied one
    SetPhone(String),
    /// Email; ignored when the profile supplied one
    SetEmail(String),
    /// Raw party-size text from the input field
    NumPeopleInput(String),
    /// Party size from a stepper control
    SetNumPeople(i64),
    /// Duration in minutes, clamped into the bookable range
    SetDuration(i64),
    /// Free-text requests
    SetSpecialRequests(String),
}

/// Reducer for [`CustomerInfoAction`]
#[derive(Clone, Copy, Debug, Default)]
pub struct CustomerInfoReducer;

impl Reducer for CustomerInfoReducer {
    type State = WizardState;
    type Action = WizardAction;
    type Environment = WizardEnvironment;

    fn reduce(
        &self,
        state: &mut WizardState,
        action: WizardAction,
        _env: &WizardEnvironment,
    ) -> Effects {
        let WizardAction::CustomerInfo(action) = action else {
            return smallvec![];
        };

        let locked = state.customer_info.locked;
        match action {
            CustomerInfoAction::SetName(_) if locked.name => {
                tracing::debug!("Name comes from the signed-in customer");
            },
            CustomerInfoAction::SetPhone(_) if locked.phone => {
                tracing::debug!("Phone comes from the signed-in customer");
            },
            CustomerInfoAction::SetEmail(_) if locked.email => {
                tracing::debug!("Email comes from the signed-in customer");
            },
            CustomerInfoAction::SetName(name) => state.store.update_draft(DraftPatch {
                customer_name: Some(name),
                ..DraftPatch::default()
            }),
            CustomerInfoAction::SetPhone(phone) => state.store.update_draft(DraftPatch {
                customer_phone: Some(phone),
                ..DraftPatch::default()
            }),
            CustomerInfoAction::SetEmail(email) => state.store.update_draft(DraftPatch {
                customer_email: Some(email),
                ..DraftPatch::default()
            }),
            CustomerInfoAction::NumPeopleInput(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    state.customer_info.num_people_input.clear();
                } else if let Some(count) = trimmed.parse::<u32>().ok().filter(|n| *n > 0) {
                    state.customer_info.num_people_input = count.to_string();
                    state.store.update_draft(DraftPatch {
                        num_people: Some(count),
                        ..DraftPatch::default()
                    });
                } else {
                    tracing::debug!(input = %text, "Ignored party size input");
                }
            },
            CustomerInfoAction::SetNumPeople(count) => match u32::try_from(count) {
                Ok(count) if count > 0 => {
                    state.customer_info.num_people_input = count.to_string();
                    state.store.update_draft(DraftPatch {
                        num_people: Some(count),
                        ..DraftPatch::default()
                    });
                },
                _ => tracing::debug!(count, "Ignored non-positive party size"),
            },
            CustomerInfoAction::SetDuration(minutes) => state.store.update_draft(DraftPatch {
                duration_minutes: Some(DurationMinutes::clamped(minutes)),
                ..DraftPatch::default()
            }),
            CustomerInfoAction::SetSpecialRequests(text) => state.store.update_draft(DraftPatch {
                special_requests: Some(text),
                ..DraftPatch::default()
            }),
        }

        smallvec![]
    }
}

/// Name and phone present, positive party, bookable duration
#[must_use]
pub fn is_valid(draft: &ReservationDraft) -> bool {
    !draft.customer_name.trim().is_empty()
        && !draft.customer_phone.trim().is_empty()
        && draft.num_people > 0
        && draft.duration_minutes.get() >= DurationMinutes::MIN
}

/// Copies the profile's non-empty contact details and locks those fields
///
/// Does nothing once the draft has a name, so details typed after a partial
/// prefill are kept.
pub(crate) fn prefill(state: &mut WizardState, customer: &CustomerProfile) {
    if !state.draft().customer_name.is_empty() {
        return;
    }
    let supplied = |value: &str| (!value.trim().is_empty()).then(|| value.to_string());
    let name = supplied(&customer.full_name);
    let phone = supplied(&customer.phone);
    let email = supplied(&customer.email);

    state.customer_info.locked = ContactLock {
        name: name.is_some(),
        phone: phone.is_some(),
        email: email.is_some(),
    };
    state.store.update_draft(DraftPatch {
        customer_name: name,
        customer_phone: phone,
        customer_email: email,
        ..DraftPatch::default()
    });
}

pub(crate) fn on_enter(state: &mut WizardState) -> Effects {
    state.customer_info.num_people_input = state.draft().num_people.to_string();
    smallvec![]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockRestaurantApi, RecordingNavigator, mock_environment};
    use crate::types::{CustomerTier, WizardStep};
    use crate::wizard::ReservationWizard;
    use maison_testing::{ReducerTest, assertions, test_clock};
    use std::sync::Arc;

    fn env() -> WizardEnvironment {
        mock_environment(
            &Arc::new(MockRestaurantApi::new()),
            Arc::new(test_clock()),
            Arc::new(RecordingNavigator::new()),
        )
    }

    fn act(action: CustomerInfoAction) -> WizardAction {
        WizardAction::CustomerInfo(action)
    }

    #[test]
    fn guest_fills_contact_details() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .given_actions([
                act(CustomerInfoAction::SetName("Trần Thị Bình".into())),
                act(CustomerInfoAction::SetPhone("0901234567".into())),
            ])
            .when_action(act(CustomerInfoAction::SetEmail("binh@example.vn".into())))
            .then_state(|state| {
                let draft = state.draft();
                assert_eq!(draft.customer_name, "Trần Thị Bình");
                assert_eq!(draft.customer_email, "binh@example.vn");
                assert!(is_valid(draft));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn signed_in_contact_details_are_read_only() {
        let customer = CustomerProfile {
            full_name: "Lê Minh".into(),
            phone: "0912000000".into(),
            email: "minh@example.vn".into(),
            tier: CustomerTier::Regular,
        };

        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .given_actions([WizardAction::StartSession { customer }])
            .when_action(act(CustomerInfoAction::SetName("Someone Else".into())))
            .then_state(|state| {
                assert_eq!(state.draft().customer_name, "Lê Minh");
            })
            .run();
    }

    #[test]
    fn missing_profile_fields_stay_editable() {
        let customer = CustomerProfile {
            full_name: "Lê Minh".into(),
            phone: String::new(),
            email: "  ".into(),
            tier: CustomerTier::Regular,
        };

        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .given_actions([
                WizardAction::StartSession { customer },
                act(CustomerInfoAction::SetName("Someone Else".into())),
                act(CustomerInfoAction::SetPhone("0901234567".into())),
                act(CustomerInfoAction::SetEmail("minh@example.vn".into())),
            ])
            .when_action(WizardAction::Next)
            .then_state(|state| {
                let draft = state.draft();
                assert_eq!(draft.customer_name, "Lê Minh");
                assert_eq!(draft.customer_phone, "0901234567");
                assert_eq!(draft.customer_email, "minh@example.vn");
                assert_eq!(
                    state.customer_info.locked,
                    ContactLock {
                        name: true,
                        phone: false,
                        email: false,
                    }
                );
                assert_eq!(state.current_step(), WizardStep::TimeSelection);
            })
            .run();
    }

    #[test]
    fn party_size_input_refuses_non_positive_values() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .given_actions([
                act(CustomerInfoAction::NumPeopleInput("6".into())),
                act(CustomerInfoAction::NumPeopleInput("0".into())),
                act(CustomerInfoAction::NumPeopleInput("-3".into())),
                act(CustomerInfoAction::NumPeopleInput("abc".into())),
                act(CustomerInfoAction::SetNumPeople(0)),
            ])
            .when_action(act(CustomerInfoAction::NumPeopleInput(String::new())))
            .then_state(|state| {
                assert_eq!(state.draft().num_people, 6);
                assert_eq!(state.customer_info.num_people_input, "");
            })
            .run();
    }

    #[test]
    fn cleared_then_retyped_party_size_is_written() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .given_actions([act(CustomerInfoAction::NumPeopleInput(String::new()))])
            .when_action(act(CustomerInfoAction::NumPeopleInput("12".into())))
            .then_state(|state| {
                assert_eq!(state.draft().num_people, 12);
                assert_eq!(state.customer_info.num_people_input, "12");
            })
            .run();
    }

    #[test]
    fn duration_is_clamped() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .given_actions([act(CustomerInfoAction::SetDuration(5))])
            .when_action(act(CustomerInfoAction::SetDuration(600)))
            .then_state(|state| {
                assert_eq!(state.draft().duration_minutes.get(), 480);
            })
            .run();
    }

    #[test]
    fn blank_name_fails_the_gate() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .given_actions([
                act(CustomerInfoAction::SetName("   ".into())),
                act(CustomerInfoAction::SetPhone("0901234567".into())),
            ])
            .when_action(WizardAction::Next)
            .then_state(|state| {
                assert!(!is_valid(state.draft()));
                assert_eq!(state.current_step(), WizardStep::CustomerInfo);
            })
            .run();
    }
}
