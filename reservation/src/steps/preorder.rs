//! Step 5: optional pre-ordered dishes.
//!
//! Dishes are picked from the restaurant menu, searched by name and loaded a
//! page at a time. A dish can only be added once the menu listing it is loaded,
//! so names and prices always come from the backend.

use crate::api::{DishDto, DishPage, DishQuery, DishSort};
use crate::environment::WizardEnvironment;
use crate::steps::{Loadable, fetch};
use crate::types::{DraftPatch, Money, Notice, PreOrderItem};
use crate::wizard::{Effects, WizardAction, WizardState};
use maison_core::effect::{Effect, EffectId};
use maison_core::reducer::Reducer;
use maison_core::smallvec;
use std::num::NonZeroU32;

/// Cancellation id of the menu fetch
pub const MENU_FETCH: EffectId = EffectId::new("preorder.menu");

/// Local UI state of step 5
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreOrderState {
    /// Dishes of every page loaded so far
    pub menu: Loadable<Vec<DishDto>>,
    /// Name filter as typed
    pub search: String,
    /// Menu ordering
    pub sort: DishSort,
    /// Last page loaded
    pub page: u32,
    /// Pages in the current result
    pub total_pages: u32,
    /// Sequence number of the next-page request in flight
    pub loading_more: Option<u64>,
    /// Sequence number of the last menu request issued
    pub request_seq: u64,
    /// Dish awaiting removal confirmation
    pub pending_removal: Option<String>,
}

impl PreOrderState {
    /// Whether another page of the menu can be requested
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.menu.value().is_some() && self.loading_more.is_none() && self.page < self.total_pages
    }

    /// A loaded dish by id
    #[must_use]
    pub fn dish(&self, dish_id: &str) -> Option<&DishDto> {
        self.menu.value()?.iter().find(|dish| dish.id == dish_id)
    }
}

/// Actions of step 5
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreOrderAction {
    /// Filter the menu by name, starting over from the first page
    SearchMenu(String),
    /// Reorder the menu, starting over from the first page
    SortMenu(DishSort),
    /// Fetch the page after the last one loaded
    LoadMoreDishes,
    /// Re-issue the menu fetch after a failure
    RetryMenu,
    /// A menu page for request `request` arrived
    MenuLoaded {
        /// Sequence number of the request
        request: u64,
        /// The page
        page: DishPage,
    },
    /// Menu request `request` failed
    MenuFailed {
        /// Sequence number of the request
        request: u64,
        /// Guest-facing reason
        message: String,
    },
    /// Add one portion of a dish from the loaded menu
    AddDish(String),
    /// One more portion
    Increment(String),
    /// One less portion; the row goes away at zero
    Decrement(String),
    /// Ask before removing a row
    RequestRemoval(String),
    /// Remove the row awaiting confirmation
    ConfirmRemoval,
    /// Keep the row awaiting confirmation
    CancelRemoval,
}

/// Reducer for [`PreOrderAction`]
#[derive(Clone, Copy, Debug, Default)]
pub struct PreOrderReducer;

impl Reducer for PreOrderReducer {
    type State = WizardState;
    type Action = WizardAction;
    type Environment = WizardEnvironment;

    fn reduce(&self, state: &mut WizardState, action: WizardAction, env: &WizardEnvironment) -> Effects {
        let WizardAction::PreOrder(action) = action else {
            return smallvec![];
        };
        let items = state.draft().pre_orders.clone();

        let updated = match action {
            PreOrderAction::SearchMenu(search) => {
                state.preorder.search = search;
                return load_menu(state, env);
            },
            PreOrderAction::SortMenu(sort) => {
                state.preorder.sort = sort;
                return load_menu(state, env);
            },
            PreOrderAction::RetryMenu => return load_menu(state, env),
            PreOrderAction::LoadMoreDishes => return load_more(state, env),
            PreOrderAction::MenuLoaded { request, page } => {
                menu_loaded(&mut state.preorder, request, page);
                return smallvec![];
            },
            PreOrderAction::MenuFailed { request, message } => {
                let step = &mut state.preorder;
                if step.menu.awaits(request) {
                    tracing::warn!(request, error = %message, "Menu fetch failed");
                    state.notice = Some(Notice::warning(message.clone()));
                    step.menu = Loadable::Failed { message };
                } else if step.loading_more == Some(request) {
                    tracing::warn!(request, error = %message, "Next menu page failed");
                    step.loading_more = None;
                } else {
                    tracing::debug!(request, "Discarded stale menu failure");
                }
                return smallvec![];
            },
            PreOrderAction::AddDish(dish_id) => {
                let Some(dish) = state.preorder.dish(&dish_id).cloned() else {
                    tracing::debug!(dish_id = %dish_id, "Ignored dish not on the loaded menu");
                    return smallvec![];
                };
                state.notice = Some(Notice::success(format!("Đã thêm {}", dish.name)));
                add_dish(&items, dish.id, dish.name, dish.price)
            },
            PreOrderAction::Increment(dish_id) => change_quantity(&items, &dish_id, 1),
            PreOrderAction::Decrement(dish_id) => change_quantity(&items, &dish_id, -1),
            PreOrderAction::RequestRemoval(dish_id) => {
                if items.iter().any(|item| item.dish_id == dish_id) {
                    state.preorder.pending_removal = Some(dish_id);
                }
                return smallvec![];
            },
            PreOrderAction::ConfirmRemoval => {
                let Some(dish_id) = state.preorder.pending_removal.take() else {
                    return smallvec![];
                };
                items.into_iter().filter(|item| item.dish_id != dish_id).collect()
            },
            PreOrderAction::CancelRemoval => {
                state.preorder.pending_removal = None;
                return smallvec![];
            },
        };

        state.store.update_draft(DraftPatch {
            pre_orders: Some(updated),
            ..DraftPatch::default()
        });
        smallvec![]
    }
}

fn menu_loaded(step: &mut PreOrderState, request: u64, page: DishPage) {
    if step.menu.awaits(request) {
        tracing::debug!(request, page = page.current_page, count = page.items.len(), "Menu loaded");
        step.page = page.current_page;
        step.total_pages = page.total_pages;
        step.menu = Loadable::Loaded(page.items);
    } else if step.loading_more == Some(request) {
        tracing::debug!(request, page = page.current_page, count = page.items.len(), "Next menu page loaded");
        step.loading_more = None;
        step.page = page.current_page;
        step.total_pages = page.total_pages;
        if let Loadable::Loaded(dishes) = &mut step.menu {
            for dish in page.items {
                if !dishes.iter().any(|known| known.id == dish.id) {
                    dishes.push(dish);
                }
            }
        }
    } else {
        tracing::debug!(request, "Discarded stale menu page");
    }
}

/// First page for the current search, replacing whatever is in flight
fn load_menu(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    let step = &mut state.preorder;
    step.request_seq += 1;
    let request = step.request_seq;
    step.menu = Loadable::Loading { request };
    step.loading_more = None;
    let query = DishQuery::first_page(&step.search, step.sort);
    tracing::debug!(request, name = ?query.name, sort = ?query.sort, "Fetching menu");

    fetch_page(env, request, query)
}

fn load_more(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    let step = &mut state.preorder;
    if !step.has_more() {
        tracing::debug!(page = step.page, total_pages = step.total_pages, "No further menu page to load");
        return smallvec![];
    }
    step.request_seq += 1;
    let request = step.request_seq;
    step.loading_more = Some(request);
    let query = DishQuery {
        page: step.page,
        ..DishQuery::first_page(&step.search, step.sort)
    }
    .next_page();
    tracing::debug!(request, page = query.page, "Fetching next menu page");

    fetch_page(env, request, query)
}

fn fetch_page(env: &WizardEnvironment, request: u64, query: DishQuery) -> Effects {
    fetch(
        MENU_FETCH,
        request,
        env.dishes.search_dishes(query),
        |request, page| WizardAction::PreOrder(PreOrderAction::MenuLoaded { request, page }),
        |request, error| {
            WizardAction::PreOrder(PreOrderAction::MenuFailed {
                request,
                message: error.user_message(),
            })
        },
    )
}

/// Adds one portion, merging into an existing row for the same dish
#[must_use]
pub fn add_dish(items: &[PreOrderItem], dish_id: String, dish_name: String, price: Money) -> Vec<PreOrderItem> {
    let mut items = items.to_vec();
    if let Some(item) = items.iter_mut().find(|item| item.dish_id == dish_id) {
        item.quantity = item.quantity.saturating_add(1);
    } else {
        items.push(PreOrderItem {
            dish_id,
            dish_name,
            quantity: NonZeroU32::MIN,
            price,
        });
    }
    items
}

/// Moves a row's quantity by `delta`, dropping it when it reaches zero
#[must_use]
pub fn change_quantity(items: &[PreOrderItem], dish_id: &str, delta: i64) -> Vec<PreOrderItem> {
    items
        .iter()
        .filter_map(|item| {
            if item.dish_id != dish_id {
                return Some(item.clone());
            }
            let quantity = i64::from(item.quantity.get()).saturating_add(delta);
            let quantity = NonZeroU32::new(u32::try_from(quantity).unwrap_or(0))?;
            Some(PreOrderItem {
                quantity,
                ..item.clone()
            })
        })
        .collect()
}

pub(crate) fn on_enter(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    load_menu(state, env)
}

pub(crate) fn on_exit(state: &mut WizardState) -> Effects {
    let step = &mut state.preorder;
    step.pending_removal = None;
    step.loading_more = None;
    step.menu.abandon();
    smallvec![Effect::Cancel(MENU_FETCH)]
}
