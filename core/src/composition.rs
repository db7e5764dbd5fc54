//! Reducer composition utilities
//!
//! The wizard is split into one reducer per concern (navigation, each step,
//! derived pricing). [`combine_reducers`] runs them in order over the same
//! state and action and concatenates their effects.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use maison_core::{Effect, Reducer, SmallVec, smallvec};
//! use maison_core::composition::combine_reducers;
//!
//! #[derive(Clone, Default)]
//! struct Table {
//!     guests: u32,
//!     note: String,
//! }
//!
//! #[derive(Clone)]
//! enum TableAction {
//!     Seat,
//!     Note(String),
//! }
//!
//! struct SeatReducer;
//! struct NoteReducer;
//!
//! impl Reducer for SeatReducer {
//!     type State = Table;
//!     type Action = TableAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Table, action: TableAction, _env: &()) -> SmallVec<[Effect<TableAction>; 4]> {
//!         if matches!(action, TableAction::Seat) {
//!             state.guests += 1;
//!         }
//!         smallvec![]
//!     }
//! }
//!
//! impl Reducer for NoteReducer {
//!     type State = Table;
//!     type Action = TableAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Table, action: TableAction, _env: &()) -> SmallVec<[Effect<TableAction>; 4]> {
//!         if let TableAction::Note(note) = action {
//!             state.note = note;
//!         }
//!         smallvec![]
//!     }
//! }
//!
//! let combined = combine_reducers(vec![Arc::new(SeatReducer), Arc::new(NoteReducer)]);
//! let mut table = Table::default();
//! combined.reduce(&mut table, TableAction::Seat, &());
//! combined.reduce(&mut table, TableAction::Note("window".into()), &());
//! assert_eq!(table.guests, 1);
//! assert_eq!(table.note, "window");
//! ```

use std::sync::Arc;

use smallvec::SmallVec;

use crate::effect::Effect;
use crate::reducer::Reducer;

/// Shared, thread-safe reducer trait object.
pub type SharedReducer<S, A, E> = Arc<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, and all effects are collected and concatenated
/// in reducer order. Later reducers observe the state changes made by earlier ones.
#[must_use]
pub fn combine_reducers<S, A, E>(reducers: Vec<SharedReducer<S, A, E>>) -> CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`]. Cloning is cheap (the reducers are shared).
pub struct CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    reducers: Vec<SharedReducer<S, A, E>>,
}

impl<S, A, E> Clone for CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    fn clone(&self) -> Self {
        Self {
            reducers: self.reducers.clone(),
        }
    }
}

impl<S, A, E> CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    /// Number of reducers in the chain
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Whether the chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects.into_iter().filter(|effect| !effect.is_none()));
        }

        all_effects
    }
}
