//! Step 4: optional event add-on and its extra services.

use crate::api::EventDto;
use crate::environment::WizardEnvironment;
use crate::steps::{Loadable, fetch};
use crate::types::{DraftPatch, Money, Notice};
use crate::wizard::{Effects, WizardAction, WizardState};
use maison_core::effect::{Effect, EffectId};
use maison_core::reducer::Reducer;
use maison_core::smallvec;

/// Cancellation id of the event fetch
pub const EVENTS_FETCH: EffectId = EffectId::new("event_selection.events");

/// Id of the synthetic "no event" option
pub const NO_EVENT_ID: &str = "none";

/// An event as offered to the guest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventOption {
    /// Event id
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Flat fee
    pub fee: Money,
    /// Inclusions then decorations, without duplicates
    pub services: Vec<String>,
}

impl EventOption {
    /// The synthetic "no event" option
    #[must_use]
    pub fn none() -> Self {
        Self {
            id: NO_EVENT_ID.to_string(),
            name: "Không có sự kiện".to_string(),
            description: Some("Bữa ăn thông thường".to_string()),
            fee: Money::ZERO,
            services: Vec::new(),
        }
    }
}

impl From<EventDto> for EventOption {
    fn from(dto: EventDto) -> Self {
        let mut services: Vec<String> = Vec::with_capacity(dto.inclusions.len() + dto.decorations.len());
        for service in dto.inclusions.into_iter().chain(dto.decorations) {
            if !services.contains(&service) {
                services.push(service);
            }
        }
        Self {
            id: dto.id,
            name: dto.name,
            description: dto.description,
            fee: dto.fee,
            services,
        }
    }
}

/// Local UI state of step 4
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventSelectionState {
    /// Active events
    pub events: Loadable<Vec<EventOption>>,
    /// Sequence number of the last event request issued
    pub request_seq: u64,
    /// Snapshot of the chosen event, priced even if the list is reloaded
    pub selected: Option<EventOption>,
}

/// Actions of step 4
#[derive(Clone, Debug, PartialEq)]
pub enum EventSelectionAction {
    /// Re-issue the event fetch
    RetryEvents,
    /// Events for request `request` arrived
    EventsLoaded {
        /// Sequence number of the request
        request: u64,
        /// Raw records
        events: Vec<EventDto>,
    },
    /// Event request `request` failed
    EventsFailed {
        /// Sequence number of the request
        request: u64,
        /// Guest-facing reason
        message: String,
    },
    /// Choose an event; `None` or [`NO_EVENT_ID`] for no event
    SelectEvent(Option<String>),
    /// Add or remove an extra service of the chosen event
    ToggleService(String),
    /// Notes for the event
    SetEventDetails(String),
}

/// Reducer for [`EventSelectionAction`]
#[derive(Clone, Copy, Debug, Default)]
pub struct EventSelectionReducer;

impl Reducer for EventSelectionReducer {
    type State = WizardState;
    type Action = WizardAction;
    type Environment = WizardEnvironment;

    fn reduce(&self, state: &mut WizardState, action: WizardAction, env: &WizardEnvironment) -> Effects {
        let WizardAction::EventSelection(action) = action else {
            return smallvec![];
        };

        match action {
            EventSelectionAction::RetryEvents => return load_events(state, env),
            EventSelectionAction::EventsLoaded { request, events } => {
                if state.event_selection.events.awaits(request) {
                    let events: Vec<EventOption> = events.into_iter().map(EventOption::from).collect();
                    tracing::debug!(request, count = events.len(), "Events loaded");
                    state.event_selection.events = Loadable::Loaded(events);
                } else {
                    tracing::debug!(request, "Discarded stale events");
                }
            },
            EventSelectionAction::EventsFailed { request, message } => {
                if state.event_selection.events.awaits(request) {
                    tracing::warn!(request, error = %message, "Event fetch failed");
                    state.notice = Some(Notice::warning(message.clone()));
                    state.event_selection.events = Loadable::Failed { message };
                } else {
                    tracing::debug!(request, "Discarded stale event failure");
                }
            },
            EventSelectionAction::SelectEvent(None) => clear_event(state),
            EventSelectionAction::SelectEvent(Some(id)) if id == NO_EVENT_ID => clear_event(state),
            EventSelectionAction::SelectEvent(Some(id)) => {
                let Some(event) = state
                    .event_selection
                    .events
                    .value()
                    .and_then(|events| events.iter().find(|e| e.id == id))
                    .cloned()
                else {
                    tracing::debug!(event_id = %id, "Ignored unknown event");
                    return smallvec![];
                };
                state.store.update_draft(DraftPatch {
                    event_id: Some(Some(event.id.clone())),
                    event_type: Some(Some(event.id.clone())),
                    selected_services: Some(Vec::new()),
                    ..DraftPatch::default()
                });
                state.event_selection.selected = Some(event);
            },
            EventSelectionAction::ToggleService(service) => {
                let offered = state
                    .event_selection
                    .selected
                    .as_ref()
                    .is_some_and(|event| event.services.contains(&service));
                if !offered {
                    tracing::debug!(service = %service, "Ignored service not offered by the chosen event");
                    return smallvec![];
                }
                let mut services = state.draft().selected_services.clone();
                if let Some(index) = services.iter().position(|s| *s == service) {
                    services.remove(index);
                } else {
                    services.push(service);
                }
                state.store.update_draft(DraftPatch {
                    selected_services: Some(services),
                    ..DraftPatch::default()
                });
            },
            EventSelectionAction::SetEventDetails(text) => {
                let details = (!text.trim().is_empty()).then_some(text);
                state.store.update_draft(DraftPatch {
                    event_details: Some(details),
                    ..DraftPatch::default()
                });
            },
        }

        smallvec![]
    }
}

fn clear_event(state: &mut WizardState) {
    state.event_selection.selected = None;
    state.store.update_draft(DraftPatch {
        event_id: Some(None),
        event_type: Some(None),
        event_details: Some(None),
        selected_services: Some(Vec::new()),
        ..DraftPatch::default()
    });
}

fn load_events(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    let step = &mut state.event_selection;
    step.request_seq += 1;
    let request = step.request_seq;
    step.events = Loadable::Loading { request };
    tracing::debug!(request, "Fetching events");

    fetch(
        EVENTS_FETCH,
        request,
        env.events.list_active_events(),
        |request, events| WizardAction::EventSelection(EventSelectionAction::EventsLoaded { request, events }),
        |request, error| {
            WizardAction::EventSelection(EventSelectionAction::EventsFailed {
                request,
                message: error.user_message(),
            })
        },
    )
}

pub(crate) fn on_enter(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    load_events(state, env)
}

pub(crate) fn on_exit(state: &mut WizardState) -> Effects {
    state.event_selection.events.abandon();
    smallvec![Effect::Cancel(EVENTS_FETCH)]
}

/// Loaded events followed by the "no event" option
#[must_use]
pub fn options(step: &EventSelectionState) -> Vec<EventOption> {
    let mut options: Vec<EventOption> = step.events.value().cloned().unwrap_or_default();
    options.push(EventOption::none());
    options
}

/// Fee of the chosen event, zero without one
#[must_use]
pub fn event_cost(state: &WizardState) -> Money {
    let Some(id) = state.draft().event_id.as_deref() else {
        return Money::ZERO;
    };
    state
        .event_selection
        .selected
        .as_ref()
        .filter(|event| event.id == id)
        .or_else(|| {
            state
                .event_selection
                .events
                .value()
                .and_then(|events| events.iter().find(|e| e.id == id))
        })
        .map_or(Money::ZERO, |event| event.fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockRestaurantApi, RecordingNavigator, event, mock_environment};
    use crate::wizard::ReservationWizard;
    use maison_testing::{ReducerTest, test_clock};
    use std::sync::Arc;

    fn env() -> WizardEnvironment {
        mock_environment(
            &Arc::new(MockRestaurantApi::new()),
            Arc::new(test_clock()),
            Arc::new(RecordingNavigator::new()),
        )
    }

    fn act(action: EventSelectionAction) -> WizardAction {
        WizardAction::EventSelection(action)
    }

    fn loaded() -> WizardState {
        let mut birthday = event("evt-bd", "Sinh nhật", 500_000);
        birthday.inclusions = vec!["Bánh kem".into(), "Trang trí bàn".into()];
        birthday.decorations = vec!["Bóng bay".into(), "Trang trí bàn".into()];

        let mut state = WizardState::default();
        state.event_selection.events = Loadable::Loaded(vec![
            EventOption::from(birthday),
            EventOption::from(event("evt-anni", "Kỷ niệm", 800_000)),
        ]);
        state
    }

    #[test]
    fn services_are_deduplicated_in_order() {
        let state = loaded();
        let options = options(&state.event_selection);

        assert_eq!(options.len(), 3);
        assert_eq!(options[0].services, vec!["Bánh kem", "Trang trí bàn", "Bóng bay"]);
        assert_eq!(options[2].id, NO_EVENT_ID);
    }

    #[test]
    fn selecting_event_clears_services_and_prices_fee() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loaded())
            .given_actions([
                act(EventSelectionAction::SelectEvent(Some("evt-bd".into()))),
                act(EventSelectionAction::ToggleService("Bánh kem".into())),
            ])
            .when_action(act(EventSelectionAction::SelectEvent(Some("evt-anni".into()))))
            .then_state(|state| {
                let draft = state.draft();
                assert_eq!(draft.event_id.as_deref(), Some("evt-anni"));
                assert_eq!(draft.event_type.as_deref(), Some("evt-anni"));
                assert!(draft.selected_services.is_empty());
                assert_eq!(event_cost(state), Money::from_dong(800_000));
            })
            .run();
    }

    #[test]
    fn toggling_twice_removes_service() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loaded())
            .given_actions([
                act(EventSelectionAction::SelectEvent(Some("evt-bd".into()))),
                act(EventSelectionAction::ToggleService("Bóng bay".into())),
                act(EventSelectionAction::ToggleService("Bánh kem".into())),
            ])
            .when_action(act(EventSelectionAction::ToggleService("Bóng bay".into())))
            .then_state(|state| {
                assert_eq!(state.draft().selected_services, vec!["Bánh kem"]);
            })
            .run();
    }

    #[test]
    fn services_of_other_events_are_ignored() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loaded())
            .given_actions([act(EventSelectionAction::SelectEvent(Some("evt-anni".into())))])
            .when_action(act(EventSelectionAction::ToggleService("Bánh kem".into())))
            .then_state(|state| {
                assert!(state.draft().selected_services.is_empty());
            })
            .run();
    }

    #[test]
    fn none_clears_everything() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loaded())
            .given_actions([
                act(EventSelectionAction::SelectEvent(Some("evt-bd".into()))),
                act(EventSelectionAction::ToggleService("Bánh kem".into())),
                act(EventSelectionAction::SetEventDetails("Sinh nhật bé Na".into())),
            ])
            .when_action(act(EventSelectionAction::SelectEvent(Some(NO_EVENT_ID.into()))))
            .then_state(|state| {
                let draft = state.draft();
                assert_eq!(draft.event_id, None);
                assert_eq!(draft.event_type, None);
                assert_eq!(draft.event_details, None);
                assert!(draft.selected_services.is_empty());
                assert_eq!(event_cost(state), Money::ZERO);
            })
            .run();
    }

    #[test]
    fn stale_events_are_discarded() {
        let mut state = WizardState::default();
        state.event_selection.request_seq = 2;
        state.event_selection.events = Loadable::Loading { request: 2 };

        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(state)
            .when_action(act(EventSelectionAction::EventsLoaded {
                request: 1,
                events: vec![event("old", "Cũ", 1)],
            }))
            .then_state(|state| {
                assert_eq!(state.event_selection.events, Loadable::Loading { request: 2 });
            })
            .run();
    }
}
