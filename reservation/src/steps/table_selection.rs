//! Step 3: table.
//!
//! Raw tables are enriched with their floor, a VIP flag and a map position,
//! then offered either per floor (map) or as a filtered, sorted list.

use crate::api::models::string_list;
use crate::api::{TableDto, TableStatus};
use crate::environment::WizardEnvironment;
use crate::steps::{Loadable, fetch};
use crate::types::{DraftPatch, Money, Notice, ReservationDraft};
use crate::wizard::{Effects, WizardAction, WizardState};
use maison_core::effect::{Effect, EffectId};
use maison_core::reducer::Reducer;
use maison_core::smallvec;
use serde_json::Value;
use std::collections::BTreeMap;

/// Cancellation id of the table fetch
pub const TABLES_FETCH: EffectId = EffectId::new("table_selection.tables");

/// Floor assumed when a table's location says nothing usable
const DEFAULT_FLOOR: u32 = 1;

/// Position on the floor map
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapPosition {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

/// A table ready for display
#[derive(Clone, Debug, PartialEq)]
pub struct DiningTable {
    /// Table id
    pub id: String,
    /// Number painted on the table
    pub table_number: String,
    /// Seats
    pub capacity: u32,
    /// Table-specific deposit
    pub deposit: Money,
    /// Status
    pub status: TableStatus,
    /// Floor number
    pub floor: u32,
    /// `floor-N`
    pub floor_id: String,
    /// `Tầng N`
    pub floor_label: String,
    /// Area name within the floor
    pub area: Option<String>,
    /// Any amenity mentions VIP
    pub is_vip: bool,
    /// Amenity names
    pub amenities: Vec<String>,
    /// Map position
    pub position: Option<MapPosition>,
}

impl DiningTable {
    /// Derives floor, area, position and VIP flag from a raw record
    #[must_use]
    pub fn from_dto(dto: TableDto) -> Self {
        let location = dto.location.as_ref().and_then(location_object);
        let floor = location
            .as_ref()
            .and_then(|loc| loc.get("floor"))
            .and_then(floor_number)
            .unwrap_or(DEFAULT_FLOOR);
        let area = location
            .as_ref()
            .and_then(|loc| loc.get("area"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let position = location
            .as_ref()
            .and_then(|loc| loc.get("coordinates").or_else(|| loc.get("position")))
            .and_then(map_position);
        let amenities = dto.amenities.as_ref().map(string_list).unwrap_or_default();
        let is_vip = amenities.iter().any(|a| a.to_lowercase().contains("vip"));

        Self {
            id: dto.id,
            table_number: dto.table_number,
            capacity: dto.capacity,
            deposit: dto.deposit,
            status: dto.status,
            floor,
            floor_id: floor_id(floor),
            floor_label: format!("Tầng {floor}"),
            area,
            is_vip,
            amenities,
            position,
        }
    }

    /// Whether the table can be booked right now
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == TableStatus::Available
    }
}

fn floor_id(floor: u32) -> String {
    format!("floor-{floor}")
}

fn location_object(value: &Value) -> Option<serde_json::Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(raw) => match serde_json::from_str(raw) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

fn floor_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn map_position(value: &Value) -> Option<MapPosition> {
    Some(MapPosition {
        x: value.get("x")?.as_f64()?,
        y: value.get("y")?.as_f64()?,
    })
}

/// How tables are presented
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// Floor map of the active floor
    #[default]
    Map,
    /// Filtered list over every floor
    List,
}

/// List filters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableFilter {
    /// Only this status
    pub status: Option<TableStatus>,
    /// At least this many seats
    pub min_capacity: Option<u32>,
    /// Case-insensitive match on table number or floor label
    pub search: String,
}

impl TableFilter {
    fn matches(&self, table: &DiningTable) -> bool {
        let needle = self.search.trim().to_lowercase();
        self.status.is_none_or(|status| table.status == status)
            && self.min_capacity.is_none_or(|min| table.capacity >= min)
            && (needle.is_empty()
                || table.table_number.to_lowercase().contains(&needle)
                || table.floor_label.to_lowercase().contains(&needle))
    }
}

/// A floor tab
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FloorTab {
    /// Floor number
    pub floor: u32,
    /// `floor-N`
    pub id: String,
    /// `Tầng N`
    pub label: String,
    /// Tables on the floor
    pub table_count: usize,
}

/// Local UI state of step 3
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableSelectionState {
    /// Enriched tables
    pub tables: Loadable<Vec<DiningTable>>,
    /// Sequence number of the last table request issued
    pub request_seq: u64,
    /// Presentation
    pub view_mode: ViewMode,
    /// Floor shown on the map
    pub active_floor: Option<u32>,
    /// List filters
    pub filter: TableFilter,
}

/// Actions of step 3
#[derive(Clone, Debug, PartialEq)]
pub enum TableSelectionAction {
    /// Re-issue the table fetch
    RetryTables,
    /// Tables for request `request` arrived
    TablesLoaded {
        /// Sequence number of the request
        request: u64,
        /// Raw records
        tables: Vec<TableDto>,
    },
    /// Table request `request` failed
    TablesFailed {
        /// Sequence number of the request
        request: u64,
        /// Guest-facing reason
        message: String,
    },
    /// Show floor `floor` on the map
    SelectFloor(u32),
    /// Switch presentation
    SetViewMode(ViewMode),
    /// Filter the list by status
    FilterStatus(Option<TableStatus>),
    /// Filter the list by minimum capacity
    FilterMinCapacity(Option<u32>),
    /// Free-text filter
    Search(String),
    /// Choose a table by id
    SelectTable(String),
}

/// Reducer for [`TableSelectionAction`]
#[derive(Clone, Copy, Debug, Default)]
pub struct TableSelectionReducer;

impl Reducer for TableSelectionReducer {
    type State = WizardState;
    type Action = WizardAction;
    type Environment = WizardEnvironment;

    fn reduce(&self, state: &mut WizardState, action: WizardAction, env: &WizardEnvironment) -> Effects {
        let WizardAction::TableSelection(action) = action else {
            return smallvec![];
        };
        let step = &mut state.table_selection;

        match action {
            TableSelectionAction::RetryTables => return load_tables(state, env),
            TableSelectionAction::TablesLoaded { request, tables } => {
                if !step.tables.awaits(request) {
                    tracing::debug!(request, "Discarded stale tables");
                    return smallvec![];
                }
                let tables: Vec<DiningTable> = tables.into_iter().map(DiningTable::from_dto).collect();
                tracing::debug!(request, count = tables.len(), "Tables loaded");
                step.tables = Loadable::Loaded(tables);
                select_default_floor(state);
            },
            TableSelectionAction::TablesFailed { request, message } => {
                if step.tables.awaits(request) {
                    tracing::warn!(request, error = %message, "Table fetch failed");
                    step.tables = Loadable::Failed {
                        message: message.clone(),
                    };
                    state.notice = Some(Notice::warning(message));
                } else {
                    tracing::debug!(request, "Discarded stale table failure");
                }
            },
            TableSelectionAction::SelectFloor(floor) => {
                if floors(step).iter().any(|tab| tab.floor == floor) {
                    step.active_floor = Some(floor);
                }
            },
            TableSelectionAction::SetViewMode(mode) => step.view_mode = mode,
            TableSelectionAction::FilterStatus(status) => step.filter.status = status,
            TableSelectionAction::FilterMinCapacity(min) => step.filter.min_capacity = min,
            TableSelectionAction::Search(text) => step.filter.search = text,
            TableSelectionAction::SelectTable(id) => {
                let Some(table) = step.tables.value().and_then(|tables| tables.iter().find(|t| t.id == id)) else {
                    tracing::debug!(table_id = %id, "Ignored unknown table");
                    return smallvec![];
                };
                let patch = DraftPatch {
                    selected_table_id: Some(Some(table.id.clone())),
                    selected_table_name: Some(Some(table.table_number.clone())),
                    selected_floor: Some(Some(table.floor_id.clone())),
                    ..DraftPatch::default()
                };
                step.active_floor = Some(table.floor);
                state.store.update_draft(patch);
            },
        }

        smallvec![]
    }
}

fn load_tables(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    let step = &mut state.table_selection;
    step.request_seq += 1;
    let request = step.request_seq;
    step.tables = Loadable::Loading { request };
    tracing::debug!(request, "Fetching tables");

    fetch(
        TABLES_FETCH,
        request,
        env.tables.list_tables(),
        |request, tables| WizardAction::TableSelection(TableSelectionAction::TablesLoaded { request, tables }),
        |request, error| {
            WizardAction::TableSelection(TableSelectionAction::TablesFailed {
                request,
                message: error.user_message(),
            })
        },
    )
}

/// Keeps the chosen table's floor, else the lowest floor
fn select_default_floor(state: &mut WizardState) {
    let tabs = floors(&state.table_selection);
    let from_draft = state
        .draft()
        .selected_floor
        .as_deref()
        .and_then(|id| tabs.iter().find(|tab| tab.id == id))
        .map(|tab| tab.floor);
    let current = state
        .table_selection
        .active_floor
        .filter(|floor| tabs.iter().any(|tab| tab.floor == *floor));

    state.table_selection.active_floor = current
        .or(from_draft)
        .or_else(|| tabs.first().map(|tab| tab.floor));
}

pub(crate) fn on_enter(state: &mut WizardState, env: &WizardEnvironment) -> Effects {
    load_tables(state, env)
}

pub(crate) fn on_exit(state: &mut WizardState) -> Effects {
    state.table_selection.tables.abandon();
    smallvec![Effect::Cancel(TABLES_FETCH)]
}

/// A table is chosen
#[must_use]
pub fn is_valid(draft: &ReservationDraft) -> bool {
    draft.selected_table_id.is_some()
}

/// Floor tabs, lowest first
#[must_use]
pub fn floors(step: &TableSelectionState) -> Vec<FloorTab> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for table in step.tables.value().into_iter().flatten() {
        *counts.entry(table.floor).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(floor, table_count)| FloorTab {
            floor,
            id: floor_id(floor),
            label: format!("Tầng {floor}"),
            table_count,
        })
        .collect()
}

/// Tables on the active floor, for the map renderer
#[must_use]
pub fn map_tables(step: &TableSelectionState) -> Vec<&DiningTable> {
    step.tables
        .value()
        .into_iter()
        .flatten()
        .filter(|table| Some(table.floor) == step.active_floor)
        .collect()
}

/// Filtered list: available first, then by capacity, then by table number
#[must_use]
pub fn list_tables(step: &TableSelectionState) -> Vec<&DiningTable> {
    let mut tables: Vec<&DiningTable> = step
        .tables
        .value()
        .into_iter()
        .flatten()
        .filter(|table| step.filter.matches(table))
        .collect();
    tables.sort_by(|a, b| {
        b.is_available()
            .cmp(&a.is_available())
            .then(a.capacity.cmp(&b.capacity))
            .then_with(|| a.table_number.cmp(&b.table_number))
    });
    tables
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::mock::{MockRestaurantApi, RecordingNavigator, mock_environment, table};
    use crate::wizard::ReservationWizard;
    use maison_testing::{ReducerTest, assertions, test_clock};
    use serde_json::json;
    use std::sync::Arc;

    fn env() -> WizardEnvironment {
        mock_environment(
            &Arc::new(MockRestaurantApi::new()),
            Arc::new(test_clock()),
            Arc::new(RecordingNavigator::new()),
        )
    }

    fn act(action: TableSelectionAction) -> WizardAction {
        WizardAction::TableSelection(action)
    }

    fn loading() -> WizardState {
        let mut state = WizardState::default();
        state.table_selection.request_seq = 1;
        state.table_selection.tables = Loadable::Loading { request: 1 };
        state
    }

    fn raw_tables() -> Vec<TableDto> {
        let mut busy = table("t-3", "03", 2, 2);
        busy.status = TableStatus::Occupied;
        let mut vip = table("t-4", "04", 8, 2);
        vip.amenities = Some(json!("[\"Karaoke\", \"VIP room\"]"));
        vec![table("t-1", "01", 6, 1), table("t-2", "02", 4, 1), busy, vip]
    }

    fn loaded() -> TableSelectionAction {
        TableSelectionAction::TablesLoaded {
            request: 1,
            tables: raw_tables(),
        }
    }

    #[test]
    fn location_string_and_missing_floor() {
        let mut encoded = table("a", "1", 2, 1);
        encoded.location = Some(json!(r#"{"floor": "3", "area": "Sân vườn", "coordinates": {"x": 10.5, "y": 4}}"#));
        let mut broken = table("b", "2", 2, 1);
        broken.location = Some(json!("not json"));

        let encoded = DiningTable::from_dto(encoded);
        let broken = DiningTable::from_dto(broken);

        assert_eq!(encoded.floor, 3);
        assert_eq!(encoded.floor_id, "floor-3");
        assert_eq!(encoded.floor_label, "Tầng 3");
        assert_eq!(encoded.area.as_deref(), Some("Sân vườn"));
        assert_eq!(encoded.position, Some(MapPosition { x: 10.5, y: 4.0 }));
        assert_eq!(broken.floor, 1);
    }

    #[test]
    fn vip_flag_from_amenities() {
        let tables: Vec<DiningTable> = raw_tables().into_iter().map(DiningTable::from_dto).collect();
        assert!(tables.iter().find(|t| t.id == "t-4").unwrap().is_vip);
        assert!(!tables.iter().find(|t| t.id == "t-1").unwrap().is_vip);
    }

    #[test]
    fn loading_selects_lowest_floor() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loading())
            .when_action(act(loaded()))
            .then_state(|state| {
                let step = &state.table_selection;
                assert_eq!(step.active_floor, Some(1));
                assert_eq!(floors(step).len(), 2);
                assert_eq!(map_tables(step).len(), 2);
            })
            .run();
    }

    #[test]
    fn list_sorts_available_then_capacity() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loading())
            .given_actions([act(loaded()), act(TableSelectionAction::SetViewMode(ViewMode::List))])
            .when_action(act(TableSelectionAction::FilterMinCapacity(Some(2))))
            .then_state(|state| {
                let ids: Vec<&str> = list_tables(&state.table_selection).iter().map(|t| t.id.as_str()).collect();
                assert_eq!(ids, vec!["t-2", "t-1", "t-4", "t-3"]);
            })
            .run();
    }

    #[test]
    fn list_filters_combine() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loading())
            .given_actions([
                act(loaded()),
                act(TableSelectionAction::FilterStatus(Some(TableStatus::Available))),
                act(TableSelectionAction::FilterMinCapacity(Some(5))),
            ])
            .when_action(act(TableSelectionAction::Search("tầng 2".into())))
            .then_state(|state| {
                let ids: Vec<&str> = list_tables(&state.table_selection).iter().map(|t| t.id.as_str()).collect();
                assert_eq!(ids, vec!["t-4"]);
            })
            .run();
    }

    #[test]
    fn selecting_writes_id_name_and_floor() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loading())
            .given_actions([act(loaded())])
            .when_action(act(TableSelectionAction::SelectTable("t-4".into())))
            .then_state(|state| {
                let draft = state.draft();
                assert_eq!(draft.selected_table_id.as_deref(), Some("t-4"));
                assert_eq!(draft.selected_table_name.as_deref(), Some("04"));
                assert_eq!(draft.selected_floor.as_deref(), Some("floor-2"));
                assert_eq!(state.table_selection.active_floor, Some(2));
                assert!(is_valid(draft));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn unknown_table_is_ignored() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loading())
            .given_actions([act(loaded())])
            .when_action(act(TableSelectionAction::SelectTable("t-99".into())))
            .then_state(|state| {
                assert!(!is_valid(state.draft()));
            })
            .run();
    }

    #[test]
    fn stale_failure_keeps_loading() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loading())
            .when_action(act(TableSelectionAction::TablesFailed {
                request: 0,
                message: "x".into(),
            }))
            .then_state(|state| {
                assert!(state.table_selection.tables.is_loading());
                assert!(state.notice.is_none());
            })
            .run();
    }

    #[test]
    fn retry_reissues_fetch() {
        ReducerTest::new(ReservationWizard::new())
            .with_env(env())
            .given_state(loading())
            .given_actions([act(TableSelectionAction::TablesFailed {
                request: 1,
                message: "Không thể kết nối tới máy chủ.".into(),
            })])
            .when_action(act(TableSelectionAction::RetryTables))
            .then_state(|state| {
                assert_eq!(state.table_selection.tables, Loadable::Loading { request: 2 });
            })
            .then_effects(|effects| {
                assertions::assert_cancels(effects, TABLES_FETCH);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }
}
