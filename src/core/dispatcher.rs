//! Event dispatcher: listener registry and synchronous delivery.
//!
//! Architecture:
//! - Listeners register per event type with a phase (`use_capture`) and a priority
//! - dispatch_event() stamps target/current target and walks the type's list
//! - Callbacks run synchronously and may re-enter the dispatcher (add, remove, dispatch)
//!
//! Callback order: descending priority, registration order (FIFO) within one priority.
//! Cross-type order undefined, each dispatch only walks its own type.
//!
//! Reentrancy is handled by per-type [`DispatchCursor`]s, see [`super::cursor`].
//! The dispatcher is single-threaded (`Rc`/`RefCell`); no borrow is held while
//! a callback runs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::cursor::{DispatchCursor, ListenerList};
use super::event::{Event, EventPhase, TargetId};
use super::listener::{insert_by_priority, Listener, ListenerFn};

/// Default ceiling for nested dispatches through one dispatcher
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Dispatcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum nesting of dispatches through one dispatcher, any event type
    pub max_depth: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DispatchConfig {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }
}

/// Dispatch errors
#[derive(Debug)]
pub enum DispatchError {
    /// Nested dispatch through one dispatcher went deeper than the configured limit
    RecursionLimitExceeded { limit: usize },
    /// A listener callback failed; the dispatch was aborted
    Listener {
        event_type: String,
        source: anyhow::Error,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::RecursionLimitExceeded { limit } => {
                write!(f, "Event dispatch recursion limit reached ({})", limit)
            }
            DispatchError::Listener { event_type, source } => {
                write!(f, "Listener for '{}' failed: {}", event_type, source)
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::RecursionLimitExceeded { .. } => None,
            DispatchError::Listener { source, .. } => Some(&**source),
        }
    }
}

/// Live list of one event type plus the cursors walking it.
///
/// `cursors[0]` is the primary cursor, reused across dispatches. Nested
/// dispatches of the same type push transient cursors that are dropped when
/// they finish.
struct ListenerSlot {
    list: ListenerList,
    cursors: Vec<Rc<RefCell<DispatchCursor>>>,
}

impl ListenerSlot {
    fn new() -> Self {
        let list: ListenerList = Rc::new(RefCell::new(Vec::new()));
        let primary = DispatchCursor::new(Rc::clone(&list));
        Self {
            list,
            cursors: vec![Rc::new(RefCell::new(primary))],
        }
    }
}

/// Decrements the nesting depth on every exit path.
struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Registry of listeners per event type, with reentrancy-safe delivery.
///
/// # Example
/// ```ignore
/// let dispatcher = EventDispatcher::new();
/// let on_load = ListenerFn::new(|event| {
///     log::info!("loaded: {}", event);
///     Ok(())
/// });
/// dispatcher.add_event_listener("load", &on_load, false, 0);
/// let allowed = dispatcher.dispatch_event(&mut BasicEvent::of("load"))?;
/// ```
pub struct EventDispatcher {
    id: TargetId,
    config: DispatchConfig,
    /// `None` until the first listener is added, and again once the last one is removed
    slots: RefCell<Option<IndexMap<String, ListenerSlot>>>,
    depth: Cell<usize>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::with_config(TargetId::new(), DispatchConfig::default())
    }

    /// Dispatcher aggregated by another object: events report `target` as its identity.
    ///
    /// The owner's id becomes this dispatcher's only identity, so it is stamped
    /// as both `target` and `current_target`.
    pub fn with_target(target: TargetId) -> Self {
        Self::with_config(target, DispatchConfig::default())
    }

    pub fn with_config(target: TargetId, config: DispatchConfig) -> Self {
        Self {
            id: target,
            config: DispatchConfig::with_max_depth(config.max_depth),
            slots: RefCell::new(None),
            depth: Cell::new(0),
        }
    }

    /// Identity stamped as `target` and `current_target`.
    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    // ========== Registration ==========

    /// Register `callback` for `event_type`.
    ///
    /// A second registration with the same callback and `use_capture` is
    /// ignored, even with a different priority. To change priority remove the
    /// listener first. A listener added while `event_type` is being dispatched
    /// only joins later dispatches.
    pub fn add_event_listener(
        &self,
        event_type: &str,
        callback: &ListenerFn,
        use_capture: bool,
        priority: i32,
    ) {
        let mut slots = self.slots.borrow_mut();
        let map = slots.get_or_insert_with(IndexMap::new);
        let slot = map
            .entry(event_type.to_string())
            .or_insert_with(ListenerSlot::new);

        if slot
            .list
            .borrow()
            .iter()
            .any(|listener| listener.matches(callback, use_capture))
        {
            return;
        }

        // In-flight dispatches keep walking what they started with
        for cursor in &slot.cursors {
            let mut cursor = cursor.borrow_mut();
            if cursor.is_active() {
                cursor.copy_on_write();
            }
        }

        let listener = Rc::new(Listener::new(callback.clone(), use_capture, priority));
        insert_by_priority(&mut slot.list.borrow_mut(), listener);
        trace!(
            "EventDispatcher: added listener for '{}' (capture={}, priority={})",
            event_type,
            use_capture,
            priority
        );
    }

    /// Remove the registration matching `callback` and `use_capture`, if any.
    pub fn remove_event_listener(&self, event_type: &str, callback: &ListenerFn, use_capture: bool) {
        let mut slots = self.slots.borrow_mut();
        let Some(map) = slots.as_mut() else {
            return;
        };
        let Some(slot) = map.get_mut(event_type) else {
            return;
        };

        let position = slot
            .list
            .borrow()
            .iter()
            .position(|listener| listener.matches(callback, use_capture));
        if let Some(index) = position {
            let removed = Rc::clone(&slot.list.borrow()[index]);
            for cursor in &slot.cursors {
                cursor.borrow_mut().remove(&removed, index);
            }
            slot.list.borrow_mut().remove(index);
            trace!(
                "EventDispatcher: removed listener for '{}' (capture={})",
                event_type,
                use_capture
            );
        }

        let empty = slot.list.borrow().is_empty();
        if empty {
            map.shift_remove(event_type);
            debug!("EventDispatcher: released listener list for '{}'", event_type);
        }
        if map.is_empty() {
            *slots = None;
        }
    }

    /// Drop every registration. Listeners not yet reached by a running dispatch are skipped.
    pub fn remove_all_listeners(&self) {
        let Some(map) = self.slots.borrow_mut().take() else {
            return;
        };
        for slot in map.values() {
            slot.list.borrow_mut().clear();
            for cursor in &slot.cursors {
                cursor.borrow_mut().clear_remaining();
            }
        }
        debug!("EventDispatcher: removed all listeners ({} types)", map.len());
    }

    // ========== Queries ==========

    pub fn has_event_listener(&self, event_type: &str) -> bool {
        self.slots
            .borrow()
            .as_ref()
            .and_then(|map| map.get(event_type))
            .map(|slot| !slot.list.borrow().is_empty())
            .unwrap_or(false)
    }

    /// Whether dispatching `event_type` here would reach a listener.
    ///
    /// Only this dispatcher is examined; use
    /// [`will_trigger_along`](super::flow::will_trigger_along) for a hierarchy.
    pub fn will_trigger(&self, event_type: &str) -> bool {
        self.has_event_listener(event_type)
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.slots
            .borrow()
            .as_ref()
            .and_then(|map| map.get(event_type))
            .map(|slot| slot.list.borrow().len())
            .unwrap_or(0)
    }

    /// Event types with at least one listener, in first-registration order.
    pub fn event_types(&self) -> Vec<String> {
        self.slots
            .borrow()
            .as_ref()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether listener storage is currently allocated.
    pub fn has_storage(&self) -> bool {
        self.slots.borrow().is_some()
    }

    // ========== Dispatch ==========

    /// Dispatch `event` with this dispatcher as its target.
    ///
    /// `target` is only stamped if no earlier hop set it. Returns `Ok(false)`
    /// when a listener prevented the default action of a cancelable event.
    pub fn dispatch_event(&self, event: &mut dyn Event) -> Result<bool, DispatchError> {
        let _depth = self.enter()?;
        if event.target().is_none() {
            event.base_mut().set_target(self.id);
        }
        self.deliver_listeners(event)
    }

    /// Deliver `event` to this node's listeners without touching `target`.
    ///
    /// Entry point for hierarchical flows, which set the phase beforehand.
    pub fn deliver(&self, event: &mut dyn Event) -> Result<bool, DispatchError> {
        let _depth = self.enter()?;
        self.deliver_listeners(event)
    }

    fn enter(&self) -> Result<DepthGuard<'_>, DispatchError> {
        let depth = self.depth.get();
        if depth >= self.config.max_depth {
            warn!(
                "EventDispatcher: recursion limit {} reached, aborting dispatch",
                self.config.max_depth
            );
            return Err(DispatchError::RecursionLimitExceeded {
                limit: self.config.max_depth,
            });
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard(&self.depth))
    }

    fn deliver_listeners(&self, event: &mut dyn Event) -> Result<bool, DispatchError> {
        let event_type = event.event_type().to_string();
        let Some((cursor, primary)) = self.acquire_cursor(&event_type) else {
            return Ok(true);
        };

        event.base_mut().set_current_target(self.id);
        let capture = event.event_phase() == EventPhase::Capturing;
        trace!(
            "EventDispatcher: dispatching '{}' (phase={:?}, nested={})",
            event_type,
            event.event_phase(),
            !primary
        );

        let walked = Self::walk(&cursor, &event_type, capture, event);
        self.release_cursor(&event_type, &cursor, primary);
        walked?;

        Ok(!event.is_default_prevented())
    }

    /// Reuse the primary cursor, or push a transient one if the primary is busy.
    fn acquire_cursor(&self, event_type: &str) -> Option<(Rc<RefCell<DispatchCursor>>, bool)> {
        let mut slots = self.slots.borrow_mut();
        let slot = slots.as_mut()?.get_mut(event_type)?;

        let primary = Rc::clone(&slot.cursors[0]);
        let (cursor, is_primary) = if primary.borrow().is_active() {
            let transient = Rc::new(RefCell::new(DispatchCursor::new(Rc::clone(&slot.list))));
            slot.cursors.push(Rc::clone(&transient));
            (transient, false)
        } else {
            (primary, true)
        };
        cursor.borrow_mut().start();
        Some((cursor, is_primary))
    }

    fn release_cursor(&self, event_type: &str, cursor: &Rc<RefCell<DispatchCursor>>, primary: bool) {
        cursor.borrow_mut().stop();

        // The slot may have been released (or replaced) by a listener
        let mut slots = self.slots.borrow_mut();
        let Some(slot) = slots.as_mut().and_then(|map| map.get_mut(event_type)) else {
            return;
        };
        if primary {
            if Rc::ptr_eq(&slot.cursors[0], cursor) {
                cursor.borrow_mut().reset(Rc::clone(&slot.list));
            }
        } else if let Some(i) = slot.cursors.iter().position(|c| Rc::ptr_eq(c, cursor)) {
            slot.cursors.remove(i);
        }
    }

    fn walk(
        cursor: &Rc<RefCell<DispatchCursor>>,
        event_type: &str,
        capture: bool,
        event: &mut dyn Event,
    ) -> Result<(), DispatchError> {
        loop {
            // Borrow ends before the callback runs, so it may mutate the registry
            let next = cursor.borrow_mut().next();
            let Some(listener) = next else {
                return Ok(());
            };
            if listener.use_capture() != capture {
                continue;
            }

            if let Err(err) = listener.callback().call(event) {
                return Err(match err.downcast::<DispatchError>() {
                    Ok(inner) => inner,
                    Err(source) => DispatchError::Listener {
                        event_type: event_type.to_string(),
                        source,
                    },
                });
            }

            if event.is_propagation_stopped_immediately() {
                trace!("EventDispatcher: '{}' stopped immediately", event_type);
                return Ok(());
            }
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("id", &self.id)
            .field("event_types", &self.event_types())
            .field("depth", &self.depth.get())
            .finish()
    }
}

impl fmt::Display for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object EventDispatcher]")
    }
}
