//! Given-When-Then harness for wizard reducers
//!
//! A scenario starts from a seeded state, replays the actions that put the
//! wizard where the test needs it, then reduces one action and checks the
//! resulting state and the effects it asked the runtime to run.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use maison_core::{effect::Effect, reducer::Reducer};

type StateCheck<S> = Box<dyn FnOnce(&S)>;
type EffectCheck<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// A check on the outcome, run in the order it was declared
enum Check<S, A> {
    State(StateCheck<S>),
    Effects(EffectCheck<A>),
}

/// One reducer scenario
///
/// Only the effects of the action under test are checked; those of the
/// replayed history are dropped.
///
/// ```ignore
/// use maison_testing::{ReducerTest, assertions};
///
/// ReducerTest::new(ReservationWizard::new())
///     .with_env(env())
///     .given_state(WizardState::default())
///     .given_actions([WizardAction::CustomerInfo(CustomerInfoAction::SetName("Lan".into()))])
///     .when_action(WizardAction::Next)
///     .then_state(|state| assert_eq!(state.current_step(), WizardStep::CustomerInfo))
///     .then_effects(assertions::assert_no_effects)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    env: Option<E>,
    state: Option<S>,
    history: Vec<A>,
    action: Option<A>,
    checks: Vec<Check<S, A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Scenario for `reducer`
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            env: None,
            state: None,
            history: Vec::new(),
            action: None,
            checks: Vec::new(),
        }
    }

    /// Environment handed to every reduction
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.env = Some(env);
        self
    }

    /// Starting state
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.state = Some(state);
        self
    }

    /// Actions replayed before the one under test
    #[must_use]
    pub fn given_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.history.extend(actions);
        self
    }

    /// The action under test
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Checks the state after the action under test
    #[must_use]
    pub fn then_state<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.checks.push(Check::State(Box::new(check)));
        self
    }

    /// Checks the effects returned by the action under test
    #[must_use]
    pub fn then_effects<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.checks.push(Check::Effects(Box::new(check)));
        self
    }

    /// Replays the history, reduces the action under test and runs the checks
    ///
    /// # Panics
    ///
    /// Panics when the state, environment or action under test is missing, or
    /// when a check fails.
    #[allow(clippy::panic)] // Test harness
    pub fn run(self) {
        let Some(mut state) = self.state else {
            panic!("scenario has no starting state; call given_state()");
        };
        let Some(env) = self.env else {
            panic!("scenario has no environment; call with_env()");
        };
        let Some(action) = self.action else {
            panic!("scenario has nothing to test; call when_action()");
        };

        for earlier in self.history {
            drop(self.reducer.reduce(&mut state, earlier, &env));
        }
        let effects = self.reducer.reduce(&mut state, action, &env);

        for check in self.checks {
            match check {
                Check::State(check) => check(&state),
                Check::Effects(check) => check(&effects),
            }
        }
    }
}

/// Checks on the effects a reducer returns
pub mod assertions {
    use maison_core::effect::{Effect, EffectId};

    /// Nothing for the runtime to do; `Effect::None` entries are ignored
    ///
    /// # Panics
    ///
    /// Panics when any effect does work.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "reducer asked for {} effect(s) where none were expected: {effects:?}",
            effects.len(),
        );
    }

    /// Exactly `expected` effects
    ///
    /// # Panics
    ///
    /// Panics on any other count.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(effects.len(), expected, "reducer asked for the wrong number of effects");
    }

    /// Some backend call or other future is started, possibly wrapped in a cancellable
    ///
    /// # Panics
    ///
    /// Panics when no future is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(effects.iter().any(starts_future), "no future among the effects");
    }

    /// A timer is scheduled, as for the voucher debounce
    ///
    /// # Panics
    ///
    /// Panics when no delay is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|effect| matches!(effect, Effect::Delay { .. })),
            "no delay among the effects"
        );
    }

    /// In-flight work under `id` is cancelled
    ///
    /// # Panics
    ///
    /// Panics when `Cancel(id)` is missing.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_cancels<A>(effects: &[Effect<A>], id: EffectId) {
        let cancelled = cancelled_ids(effects);
        assert!(cancelled.contains(&id), "{id} was not cancelled; cancelled: {cancelled:?}");
    }

    /// Ids of the top-level `Cancel` effects, in order
    #[must_use]
    pub fn cancelled_ids<A>(effects: &[Effect<A>]) -> Vec<EffectId> {
        effects
            .iter()
            .filter_map(|effect| if let Effect::Cancel(id) = effect { Some(*id) } else { None })
            .collect()
    }

    /// Ids the top-level `Cancellable` effects register under, in order
    #[must_use]
    pub fn cancellable_ids<A>(effects: &[Effect<A>]) -> Vec<EffectId> {
        effects
            .iter()
            .filter_map(|effect| if let Effect::Cancellable { id, .. } = effect { Some(*id) } else { None })
            .collect()
    }

    fn starts_future<A>(effect: &Effect<A>) -> bool {
        match effect {
            Effect::Future(_) => true,
            Effect::Cancellable { effect, .. } => starts_future(effect),
            Effect::Parallel(effects) | Effect::Sequential(effects) => effects.iter().any(starts_future),
            Effect::None | Effect::Delay { .. } | Effect::Cancel(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maison_core::effect::{Effect, EffectId};
    use maison_core::reducer::Reducer;
    use maison_core::{SmallVec, smallvec};
    use std::time::Duration;

    const SEATS_FETCH: EffectId = EffectId::new("seats.fetch");

    /// A party size counter with a seat lookup
    #[derive(Clone, Debug, Default)]
    struct Party {
        guests: u32,
    }

    #[derive(Clone, Debug)]
    enum PartyAction {
        Join,
        Leave,
        CheckSeats,
        RemindLater,
    }

    struct PartyReducer;

    impl Reducer for PartyReducer {
        type State = Party;
        type Action = PartyAction;
        type Environment = ();

        fn reduce(&self, state: &mut Party, action: PartyAction, _env: &()) -> SmallVec<[Effect<PartyAction>; 4]> {
            match action {
                PartyAction::Join => {
                    state.guests += 1;
                    smallvec![Effect::None]
                },
                PartyAction::Leave => {
                    state.guests = state.guests.saturating_sub(1);
                    smallvec![]
                },
                PartyAction::CheckSeats => smallvec![
                    Effect::Cancel(SEATS_FETCH),
                    Effect::future(async { Some(PartyAction::Join) }).cancellable(SEATS_FETCH),
                ],
                PartyAction::RemindLater => smallvec![Effect::Delay {
                    duration: Duration::from_millis(10),
                    action: Box::new(PartyAction::Leave),
                }],
            }
        }
    }

    #[test]
    fn none_effects_count_as_nothing_to_do() {
        ReducerTest::new(PartyReducer)
            .with_env(())
            .given_state(Party::default())
            .when_action(PartyAction::Join)
            .then_state(|party| assert_eq!(party.guests, 1))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn history_is_replayed_first() {
        ReducerTest::new(PartyReducer)
            .with_env(())
            .given_state(Party { guests: 2 })
            .given_actions([PartyAction::Join, PartyAction::CheckSeats])
            .when_action(PartyAction::Leave)
            .then_state(|party| assert_eq!(party.guests, 2))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn cancellable_fetch_is_visible() {
        ReducerTest::new(PartyReducer)
            .with_env(())
            .given_state(Party::default())
            .when_action(PartyAction::CheckSeats)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 2);
                assertions::assert_cancels(effects, SEATS_FETCH);
                assertions::assert_has_future_effect(effects);
                assert_eq!(assertions::cancellable_ids(effects), vec![SEATS_FETCH]);
            })
            .run();
    }

    #[test]
    fn delays_are_found() {
        ReducerTest::new(PartyReducer)
            .with_env(())
            .given_state(Party::default())
            .when_action(PartyAction::RemindLater)
            .then_effects(assertions::assert_has_delay_effect)
            .run();
    }

    #[test]
    #[should_panic(expected = "was not cancelled")]
    fn missing_cancel_fails_the_scenario() {
        ReducerTest::new(PartyReducer)
            .with_env(())
            .given_state(Party::default())
            .when_action(PartyAction::Join)
            .then_effects(|effects| assertions::assert_cancels(effects, SEATS_FETCH))
            .run();
    }
}
