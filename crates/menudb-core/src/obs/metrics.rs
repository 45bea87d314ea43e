use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for repository operations.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub window_start_ms: i64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            window_start_ms: Utc::now().timestamp_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Repository entrypoints
    pub load_calls: u64,
    pub lookup_calls: u64,
    pub save_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,

    // Documents touched
    pub docs_loaded: u64,
    pub docs_written: u64,
    pub docs_deleted: u64,

    // Denormalization
    pub meta_link_writes: u64,
    pub meta_link_skips: u64,
    pub cascade_parent_writes: u64,

    // Store
    pub transaction_retries: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub load_calls: u64,
    pub lookup_calls: u64,
    pub save_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
    pub docs_loaded: u64,
    pub docs_written: u64,
    pub docs_deleted: u64,
    pub meta_link_writes: u64,
    pub meta_link_skips: u64,
    pub cascade_parent_writes: u64,
}

///
/// EventReport
///
/// `counters` is `None` when the requested window start is later than the
/// current window, meaning nothing recorded here belongs to that window.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: Option<EventState>,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and open a new window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot counters for callers interested in windows starting at or
/// before the current one.
pub(crate) fn report_window_start(window_start_ms: Option<i64>) -> EventReport {
    with_state(|m| {
        let include = window_start_ms.is_none_or(|start| start <= m.window_start_ms);
        EventReport {
            counters: include.then(|| m.clone()),
        }
    })
}
