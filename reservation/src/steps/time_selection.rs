//! Step 2: date and start time.
//!
//! With a table chosen and a date set, the offered times come from that
//! table's availability; otherwise from a generic half-hour grid. The banner
//! flags a time that is in the past or not among the offered times, and
//! closes the gate. The time itself is kept as typed.

use crate::api::models::normalize_time;
use crate::environment::WizardEnvironment;
use crate::steps::{Loadable, fetch};
use crate::types::{DraftPatch, Notice};
use crate::wizard::{Effects, WizardAction, WizardState};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use maison_core::effect::{Effect, EffectId};
use maison_core::reducer::Reducer;
use maison_core::smallvec;

/// Cancellation id of the slot fetch
pub const SLOTS_FETCH: EffectId = EffectId::new("time_selection.slots");

/// First start time of the generic grid
const GRID_START: (u32, u32) = (8, 0);
/// Last start time of the generic grid
const GRID_END: (u32, u32) = (21, 30);

/// Where the offered start times come from
#[derive(Clone, Debug, PartialEq)]
pub enum SlotSource {
    /// No table chosen (or no date yet): the generic grid
    Generic,
    /// The chosen table's availability for the chosen date
    Table(Loadable<Vec<String>>),
}

impl Default for SlotSource {
    fn default() -> Self {
        Self::Generic
    }
}

/// Local UI state of step 2
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSelectionState {
    /// Slot source
    pub slots: SlotSource,
    /// Sequence number of the last slot request issued
    pub request_seq: u64,
    /// Last refused input, cleared by the next valid selection
    pub error: Option<String>,
}

/// Actions of step 2
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeSelectionAction {
    /// Pick a date (restaurant local)
    SelectDate(NaiveDate),
    /// Clear the date
    ClearDate,
    /// Pick a start time, `HH:MM`
    SelectTime(String),
    /// Re-issue the slot fetch after a failure
    RetrySlots,
    /// Slots for request `request` arrived
    SlotsLoaded {
        /// Sequence number of the request
        request: u64,
        /// `HH:MM` start times
        slots: Vec<String>,
    },
    /// Slot request `request` failed
    SlotsFailed {
        /// Sequence number of the request
        request: u64,
        /// Guest-facing reason
        message: String,
    },
}

/// Why the chosen time cannot be used
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeBanner {
    /// Date and time are already behind us
    InPast,
    /// The table is not free at that time
    SlotUnavailable,
    /// Not a start time of the generic grid
    OutsideServiceHours,
}

impl TimeBanner {
    /// Guest-facing explanation
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InPast => "Thời gian đã chọn đã qua. Vui lòng chọn thời gian khác.",
            Self::SlotUnavailable => "Bàn đã chọn không còn trống vào giờ này. Vui lòng chọn giờ khác.",
            Self::OutsideServiceHours => {
                "Vui lòng chọn giờ bắt đầu theo khung 30 phút, từ 08:00 đến 21:30."
            },
        }
    }
}

/// Reducer for [`TimeSelectionAction`]
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeSelectionReducer;

impl Reducer for TimeSelectionReducer {
    type State = WizardState;
    type Action = WizardAction;
    type Environment = WizardEnvironment;

    fn reduce(&self, state: &mut WizardState, action: WizardAction, env: &WizardEnvironment) -> Effects {
        let WizardAction::TimeSelection(action) = action else {
            return smallvec![];
        };

        match action {
            TimeSelectionAction::SelectDate(date) => {
                if date < env.today() {
                    tracing::debug!(%date, "Refused past date");
                    state.time_selection.error = Some("Không thể chọn ngày trong quá khứ.".to_string());
                    return smallvec![];
                }
                state.time_selection.error = None;
                state.store.update_draft(DraftPatch {
                    date: Some(Some(date)),
                    ..DraftPatch::default()
                });
                refresh_slots(state, env)
            },
            TimeSelectionAction::ClearDate => {
                state.store.update_draft(DraftPatch {
                    date: Some(None),
                    ..DraftPatch::default()
                });
                refresh_slots(state, env)
            },
            TimeSelectionAction::SelectTime(raw) => {
                match normalize_time(&raw).filter(|_| raw.trim().len() <= 5) {
                    Some(time) => {
                        state.time_selection.error = None;
                        state.store.update_draft(DraftPatch {
                            time: Some(time),
                            ..DraftPatch::default()
                        });
                    },
                    None => tracing::debug!(input = %raw, "Ignored malformed time"),
                }
                smallvec![]
            },
            TimeSelectionAction::RetrySlots => refresh_slots(state, env),
            TimeSelectionAction::SlotsLoaded { request, mut slots } => {
                match &mut state.time_selection.slots {
                    SlotSource::Table(loadable) if loadable.awaits(request) => {
                        slots.sort();
                        slots.dedup();
                        tracing::debug!(request, count = slots.len(), "Time slots loaded");
                        *loadable = Loadable::Loaded(slots);
                    },
                    _ => tracing::debug!(request, "Discarded stale time slots"),
                }
                smallvec![]
            },
            TimeSelectionAction::SlotsFailed { request, message } => {
                match &mut state.time_selection.slots {
                    SlotSource::Table(loadable) if loadable.awaits(request) => {
                        tracing::warn!(request, error = %message, "Time slot fetch failed");
                        state.notice = Some(Notice::warning(message.clone()));
                        *loadable = Loadable::Failed { message };
                    },
                    _ => tracing::debug!(request, "Discarded stale slot failure"),
                }
                smallvec![]
            },
        }
    }
}

/// Re-derives the slot source from the draft, fetching when a table and date are set
fn refresh_slots(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    let draft = state.draft();
    let target = draft.selected_table_id.clone().zip(draft.date);
    let duration = draft.duration_minutes;
    let Some((table_id, date)) = target else {
        state.time_selection.slots = SlotSource::Generic;
        return smallvec![Effect::Cancel(SLOTS_FETCH)];
    };

    state.time_selection.request_seq += 1;
    let request = state.time_selection.request_seq;
    state.time_selection.slots = SlotSource::Table(Loadable::Loading { request });
    tracing::debug!(request, table_id = %table_id, %date, duration = duration.get(), "Fetching time slots");

    fetch(
        SLOTS_FETCH,
        request,
        env.tables.available_time_slots(&table_id, date, duration),
        |request, slots| WizardAction::TimeSelection(TimeSelectionAction::SlotsLoaded { request, slots }),
        |request, error| {
            WizardAction::TimeSelection(TimeSelectionAction::SlotsFailed {
                request,
                message: error.user_message(),
            })
        },
    )
}

pub(crate) fn on_enter(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    state.time_selection.error = None;
    refresh_slots(state, env)
}

pub(crate) fn on_exit(state: &mut WizardState) -> Effects {
    if let SlotSource::Table(loadable) = &mut state.time_selection.slots {
        loadable.abandon();
    }
    smallvec![Effect::Cancel(SLOTS_FETCH)]
}

/// The generic 08:00–21:30 half-hour grid
#[must_use]
pub fn generic_slots() -> Vec<String> {
    let start = GRID_START.0 * 60 + GRID_START.1;
    let end = GRID_END.0 * 60 + GRID_END.1;
    (start..=end)
        .step_by(30)
        .map(|minutes| format!("{:02}:{:02}", minutes / 60, minutes % 60))
        .collect()
}

/// Start times to offer; on today's date only those after `now`
#[must_use]
pub fn visible_slots(state: &WizardState, now: NaiveDateTime) -> Vec<String> {
    let base = match &state.time_selection.slots {
        SlotSource::Generic => generic_slots(),
        SlotSource::Table(loadable) => loadable.value().cloned().unwrap_or_default(),
    };
    if state.draft().date != Some(now.date()) {
        return base;
    }
    base.into_iter()
        .filter(|slot| parse_time(slot).is_some_and(|time| time > now.time()))
        .collect()
}

/// Banner for the chosen date and time, if any
#[must_use]
pub fn banner(state: &WizardState, now: NaiveDateTime) -> Option<TimeBanner> {
    let draft = state.draft();
    let date = draft.date?;
    let time = parse_time(&draft.time)?;

    if date.and_time(time) <= now {
        return Some(TimeBanner::InPast);
    }
    match &state.time_selection.slots {
        SlotSource::Table(Loadable::Loaded(slots)) if draft.selected_table_id.is_some() => {
            (!slots.contains(&draft.time)).then_some(TimeBanner::SlotUnavailable)
        },
        _ => (!generic_slots().contains(&draft.time)).then_some(TimeBanner::OutsideServiceHours),
    }
}

/// Date and time set, no banner, and not still waiting for the table's slots
///
/// Without the table's availability (no table, or its fetch failed) the time
/// must be on the generic grid.
#[must_use]
pub fn is_valid(state: &WizardState, now: NaiveDateTime) -> bool {
    let draft = state.draft();
    let waiting = matches!(&state.time_selection.slots, SlotSource::Table(loadable) if loadable.is_loading());
    draft.date.is_some() && !draft.time.is_empty() && banner(state, now).is_none() && !waiting
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::mock::{MockRestaurantApi, RecordingNavigator, mock_environment};
    use crate::steps::table_selection::TableSelectionAction;
    use crate::types::WizardStep;
    use crate::wizard::ReservationWizard;
    use maison_testing::{ReducerTest, assertions, test_clock};
    use std::sync::Arc;

    // test_clock(): 2025-01-01 07:00 local

    fn env() -> WizardEnvironment {
        mock_environment(
            &Arc::new(MockRestaurantApi::new()),
            Arc::new(test_clock()),
            Arc::new(RecordingNavigator::new()),
        )
    }

    fn now() -> NaiveDateTime {
        day(1).and_hms_opt(7, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn act(action: TimeSelectionAction) -> WizardAction {
        WizardAction::TimeSelection(action)
    }

    fn on_this_step() -> WizardState {
        let mut state = WizardState::default();
        state.store.set_current_step(WizardStep::TimeSelection);
        state
    }

    fn with_table() -> WizardState {
        let mut state = WizardState::default();
        state.store.update_draft(DraftPatch {
            selected_table_id: Some(Some("t-01".into())),
            ..DraftPatch::default()
        });
        state
    }

    #[test]
    fn generic_grid_has_28_half_hour_slots() {
        let slots = generic_slots();
        assert_eq!(slots.len(), 28);
        assert_eq!(slots.first().map(String::as_str), Some("08:00"));
        assert_eq!(slots.last().map(String::as_str), Some("21:30"));
    }

    #[test]
    fn past_dates_are_refused() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .when_action(act(TimeSelectionAction::SelectDate(
                NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            )))
            .then_state(|state| {
                assert_eq!(state.draft().date, None);
                assert!(state.time_selection.error.is_some());
            })
            .run();
    }

    #[test]
    fn date_without_table_uses_generic_grid() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .when_action(act(TimeSelectionAction::SelectDate(day(2))))
            .then_state(|state| {
                assert_eq!(state.time_selection.slots, SlotSource::Generic);
                assert_eq!(visible_slots(state, now()).len(), 28);
            })
            .run();
    }

    #[test]
    fn today_hides_elapsed_slots() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .when_action(act(TimeSelectionAction::SelectDate(day(1))))
            .then_state(|state| {
                let slots = visible_slots(state, now());
                assert_eq!(slots.first().map(String::as_str), Some("08:00"));
                let later = day(1).and_hms_opt(8, 0, 0).unwrap();
                assert_eq!(visible_slots(state, later).first().map(String::as_str), Some("08:30"));
            })
            .run();
    }

    #[test]
    fn date_with_table_fetches_slots() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(with_table())
            .when_action(act(TimeSelectionAction::SelectDate(day(2))))
            .then_state(|state| {
                assert_eq!(
                    state.time_selection.slots,
                    SlotSource::Table(Loadable::Loading { request: 1 })
                );
                assert!(!is_valid(state, now()));
            })
            .then_effects(|effects| {
                assertions::assert_cancels(effects, SLOTS_FETCH);
                assert_eq!(assertions::cancellable_ids(effects), vec![SLOTS_FETCH]);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn stale_slots_are_discarded() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(with_table())
            .given_actions([
                act(TimeSelectionAction::SelectDate(day(2))),
                act(TimeSelectionAction::SelectDate(day(3))),
            ])
            .when_action(act(TimeSelectionAction::SlotsLoaded {
                request: 1,
                slots: vec!["18:00".into()],
            }))
            .then_state(|state| {
                assert_eq!(
                    state.time_selection.slots,
                    SlotSource::Table(Loadable::Loading { request: 2 })
                );
            })
            .run();
    }

    #[test]
    fn unavailable_time_raises_banner_and_closes_gate() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(with_table())
            .given_actions([
                act(TimeSelectionAction::SelectDate(day(2))),
                act(TimeSelectionAction::SelectTime("19:00".into())),
            ])
            .when_action(act(TimeSelectionAction::SlotsLoaded {
                request: 1,
                slots: vec!["18:00".into(), "20:00".into()],
            }))
            .then_state(|state| {
                assert_eq!(banner(state, now()), Some(TimeBanner::SlotUnavailable));
                assert!(!is_valid(state, now()));
                assert_eq!(state.draft().time, "19:00");
            })
            .run();
    }

    #[test]
    fn past_time_today_raises_banner() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .given_actions([act(TimeSelectionAction::SelectDate(day(1)))])
            .when_action(act(TimeSelectionAction::SelectTime("06:30".into())))
            .then_state(|state| {
                assert_eq!(banner(state, now()), Some(TimeBanner::InPast));
                assert!(!is_valid(state, now()));
            })
            .run();
    }

    #[test]
    fn times_off_the_grid_close_the_gate() {
        for time in ["03:17", "19:15", "22:00"] {
            ReducerTest::new(ReservationWizard::new())
                .with_env(env())
                .given_state(on_this_step())
                .given_actions([
                    act(TimeSelectionAction::SelectDate(day(2))),
                    act(TimeSelectionAction::SelectTime(time.into())),
                ])
                .when_action(WizardAction::Next)
                .then_state(move |state| {
                    assert_eq!(state.draft().time, time);
                    assert_eq!(banner(state, now()), Some(TimeBanner::OutsideServiceHours));
                    assert_eq!(state.current_step(), WizardStep::TimeSelection);
                })
                .run();
        }

        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .given_actions([act(TimeSelectionAction::SelectDate(day(2)))])
            .when_action(act(TimeSelectionAction::SelectTime("21:30".into())))
            .then_state(|state| {
                assert_eq!(banner(state, now()), None);
                assert!(is_valid(state, now()));
            })
            .run();
    }

    #[test]
    fn table_slots_may_leave_the_grid() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(with_table())
            .given_actions([
                act(TimeSelectionAction::SelectDate(day(2))),
                act(TimeSelectionAction::SelectTime("22:15".into())),
            ])
            .when_action(act(TimeSelectionAction::SlotsLoaded {
                request: 1,
                slots: vec!["22:15".into()],
            }))
            .then_state(|state| assert!(is_valid(state, now())))
            .run();
    }

    #[test]
    fn failed_fetch_does_not_block() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(with_table())
            .given_actions([
                act(TimeSelectionAction::SelectDate(day(2))),
                act(TimeSelectionAction::SelectTime("19:00".into())),
            ])
            .when_action(act(TimeSelectionAction::SlotsFailed {
                request: 1,
                message: "Không thể kết nối tới máy chủ.".into(),
            }))
            .then_state(|state| {
                assert!(is_valid(state, now()));
                assert!(state.notice.is_some());
            })
            .run();
    }

    #[test]
    fn malformed_time_is_ignored() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .given_actions([act(TimeSelectionAction::SelectTime("19:00".into()))])
            .when_action(act(TimeSelectionAction::SelectTime("7pm".into())))
            .then_state(|state| {
                assert_eq!(state.draft().time, "19:00");
            })
            .run();
    }

    #[test]
    fn table_change_outside_this_step_fetches_nothing() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(WizardState::default())
            .when_action(WizardAction::TableSelection(TableSelectionAction::SelectTable("t-01".into())))
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
