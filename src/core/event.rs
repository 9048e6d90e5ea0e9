//! Event records passed to listeners.
//!
//! Every notification kind implements [`Event`]. The shared fields (type tag,
//! flags, identities, phase, cancellation state) live in [`BasicEvent`]; kinds
//! that carry a payload embed a `BasicEvent` and add their own fields, see
//! [`ProgressEvent`](super::progress_event::ProgressEvent).
//!
//! Cloning any kind resets the cancellation flags but keeps identities and
//! phase, so a handler can re-enter a copy into a second flow.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard event type names.
pub mod event_type {
    pub const ACTIVATE: &str = "activate";
    pub const ADDED: &str = "added";
    pub const ADDED_TO_STAGE: &str = "addedToStage";
    pub const CANCEL: &str = "cancel";
    pub const CHANGE: &str = "change";
    pub const CLEAR: &str = "clear";
    pub const CLOSE: &str = "close";
    pub const COMPLETE: &str = "complete";
    pub const CONNECT: &str = "connect";
    pub const CONTEXT3D_CREATE: &str = "context3DCreate";
    pub const COPY: &str = "copy";
    pub const CUT: &str = "cut";
    pub const DEACTIVATE: &str = "deactivate";
    pub const ENTER_FRAME: &str = "enterFrame";
    pub const EXIT_FRAME: &str = "exitFrame";
    pub const FRAME_CONSTRUCTED: &str = "frameConstructed";
    pub const FRAME_LABEL: &str = "frameLabel";
    pub const FULLSCREEN: &str = "fullScreen";
    pub const INIT: &str = "init";
    pub const MOUSE_LEAVE: &str = "mouseLeave";
    pub const OPEN: &str = "open";
    pub const PASTE: &str = "paste";
    pub const REMOVED: &str = "removed";
    pub const REMOVED_FROM_STAGE: &str = "removedFromStage";
    pub const RENDER: &str = "render";
    pub const RESIZE: &str = "resize";
    pub const SCROLL: &str = "scroll";
    pub const SELECT: &str = "select";
    pub const SELECT_ALL: &str = "selectAll";
    pub const SOUND_COMPLETE: &str = "soundComplete";
    pub const TAB_CHILDREN_CHANGE: &str = "tabChildrenChange";
    pub const TAB_ENABLED_CHANGE: &str = "tabEnabledChange";
    pub const TAB_INDEX_CHANGE: &str = "tabIndexChange";
    pub const TEXTURE_READY: &str = "textureReady";
    pub const UNLOAD: &str = "unload";
}

/// Opaque identity of an event target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(Uuid);

impl TargetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TargetId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stage of the event flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventPhase {
    Capturing = 1,
    #[default]
    AtTarget = 2,
    Bubbling = 3,
}

impl EventPhase {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Value of a named event field, used by [`Event::format_to_string`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
    UInt(u64),
    Phase(EventPhase),
    Target(TargetId),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "\"{}\"", s),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::UInt(n) => write!(f, "{}", n),
            FieldValue::Phase(p) => write!(f, "{}", p.as_u8()),
            FieldValue::Target(id) => write!(f, "[object {}]", id),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

/// Base record shared by every event kind.
#[derive(Debug)]
pub struct BasicEvent {
    event_type: String,
    bubbles: bool,
    cancelable: bool,
    phase: EventPhase,
    target: Option<TargetId>,
    current_target: Option<TargetId>,
    default_prevented: bool,
    propagation_stopped: bool,
    propagation_stopped_immediately: bool,
}

impl BasicEvent {
    pub fn new(event_type: impl Into<String>, bubbles: bool, cancelable: bool) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles,
            cancelable,
            phase: EventPhase::AtTarget,
            target: None,
            current_target: None,
            default_prevented: false,
            propagation_stopped: false,
            propagation_stopped_immediately: false,
        }
    }

    /// Non-bubbling, non-cancelable event of the given type.
    pub fn of(event_type: impl Into<String>) -> Self {
        Self::new(event_type, false, false)
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn event_phase(&self) -> EventPhase {
        self.phase
    }

    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    pub fn current_target(&self) -> Option<TargetId> {
        self.current_target
    }

    /// Set by hierarchical flows before delivering at each node.
    pub fn set_event_phase(&mut self, phase: EventPhase) {
        self.phase = phase;
    }

    pub(crate) fn set_target(&mut self, target: TargetId) {
        self.target = Some(target);
    }

    pub(crate) fn set_current_target(&mut self, target: TargetId) {
        self.current_target = Some(target);
    }

    /// No-op unless the event is cancelable.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Halts later nodes of a hierarchical flow. Listeners at the current node still run.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Halts remaining listeners at the current node as well as later nodes.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.propagation_stopped_immediately = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_propagation_stopped_immediately(&self) -> bool {
        self.propagation_stopped_immediately
    }

    /// Looks up one of the base fields by its legacy name.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "type" => FieldValue::Str(self.event_type.clone()),
            "bubbles" => FieldValue::Bool(self.bubbles),
            "cancelable" => FieldValue::Bool(self.cancelable),
            "eventPhase" => FieldValue::Phase(self.phase),
            "target" => self.target.map_or(FieldValue::Null, FieldValue::Target),
            "currentTarget" => self.current_target.map_or(FieldValue::Null, FieldValue::Target),
            _ => return None,
        };
        Some(value)
    }
}

// Clone keeps identities and phase, drops cancellation state.
impl Clone for BasicEvent {
    fn clone(&self) -> Self {
        Self {
            event_type: self.event_type.clone(),
            bubbles: self.bubbles,
            cancelable: self.cancelable,
            phase: self.phase,
            target: self.target,
            current_target: self.current_target,
            default_prevented: false,
            propagation_stopped: false,
            propagation_stopped_immediately: false,
        }
    }
}

/// An event kind that can travel through an [`EventDispatcher`](super::dispatcher::EventDispatcher).
///
/// Implementors expose their embedded [`BasicEvent`] and provide a polymorphic
/// clone. Kinds with a payload override [`Event::field`] and
/// [`Event::class_name`] so the debug string includes their own fields.
pub trait Event: Any + fmt::Debug {
    fn base(&self) -> &BasicEvent;
    fn base_mut(&mut self) -> &mut BasicEvent;

    /// Copy of this event with cancellation flags reset.
    fn clone_event(&self) -> Box<dyn Event>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn class_name(&self) -> &'static str {
        "Event"
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.base().field(name)
    }

    /// Field names rendered by [`Event::describe`].
    fn described_fields(&self) -> &'static [&'static str] {
        &["type", "bubbles", "cancelable"]
    }

    /// Renders `[ClassName field="value" other=1]`. Unknown fields render as `null`.
    fn format_to_string(&self, class_name: &str, fields: &[&str]) -> String {
        let mut output = format!("[{}", class_name);
        for name in fields {
            let value = self.field(name).unwrap_or(FieldValue::Null);
            output.push_str(&format!(" {}={}", name, value));
        }
        output.push(']');
        output
    }

    fn describe(&self) -> String {
        self.format_to_string(self.class_name(), self.described_fields())
    }

    // ========== Base delegates ==========

    fn event_type(&self) -> &str {
        self.base().event_type()
    }

    fn bubbles(&self) -> bool {
        self.base().bubbles()
    }

    fn cancelable(&self) -> bool {
        self.base().cancelable()
    }

    fn event_phase(&self) -> EventPhase {
        self.base().event_phase()
    }

    fn target(&self) -> Option<TargetId> {
        self.base().target()
    }

    fn current_target(&self) -> Option<TargetId> {
        self.base().current_target()
    }

    fn prevent_default(&mut self) {
        self.base_mut().prevent_default();
    }

    fn is_default_prevented(&self) -> bool {
        self.base().is_default_prevented()
    }

    fn stop_propagation(&mut self) {
        self.base_mut().stop_propagation();
    }

    fn stop_immediate_propagation(&mut self) {
        self.base_mut().stop_immediate_propagation();
    }

    fn is_propagation_stopped(&self) -> bool {
        self.base().is_propagation_stopped()
    }

    fn is_propagation_stopped_immediately(&self) -> bool {
        self.base().is_propagation_stopped_immediately()
    }
}

impl Event for BasicEvent {
    fn base(&self) -> &BasicEvent {
        self
    }

    fn base_mut(&mut self) -> &mut BasicEvent {
        self
    }

    fn clone_event(&self) -> Box<dyn Event> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Display for BasicEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl fmt::Display for dyn Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Downcast a dispatched event to its concrete kind.
#[inline]
pub fn downcast_event<E: Event>(event: &dyn Event) -> Option<&E> {
    event.as_any().downcast_ref::<E>()
}

#[inline]
pub fn downcast_event_mut<E: Event>(event: &mut dyn Event) -> Option<&mut E> {
    event.as_any_mut().downcast_mut::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_defaults() {
        let event = BasicEvent::of(event_type::COMPLETE);
        assert_eq!(event.event_type(), "complete");
        assert!(!event.bubbles());
        assert!(!event.cancelable());
        assert_eq!(event.event_phase(), EventPhase::AtTarget);
        assert!(event.target().is_none());
        assert!(event.current_target().is_none());
        assert!(!event.is_default_prevented());
        assert!(!event.is_propagation_stopped());
    }

    #[test]
    fn test_prevent_default_requires_cancelable() {
        let mut plain = BasicEvent::new("x", false, false);
        plain.prevent_default();
        assert!(!plain.is_default_prevented());

        let mut cancelable = BasicEvent::new("x", false, true);
        cancelable.prevent_default();
        assert!(cancelable.is_default_prevented());
    }

    #[test]
    fn test_stop_flags_idempotent() {
        let mut event = BasicEvent::of("x");
        event.stop_propagation();
        event.stop_propagation();
        assert!(event.is_propagation_stopped());
        assert!(!event.is_propagation_stopped_immediately());

        event.stop_immediate_propagation();
        event.stop_immediate_propagation();
        assert!(event.is_propagation_stopped());
        assert!(event.is_propagation_stopped_immediately());
    }

    #[test]
    fn test_clone_resets_cancellation() {
        let mut event = BasicEvent::new("x", true, true);
        let target = TargetId::new();
        event.set_target(target);
        event.set_current_target(target);
        event.set_event_phase(EventPhase::Bubbling);
        event.prevent_default();
        event.stop_immediate_propagation();

        let mut copy = event.clone();
        assert_eq!(copy.event_type(), "x");
        assert!(copy.bubbles());
        assert!(copy.cancelable());
        assert_eq!(copy.event_phase(), EventPhase::Bubbling);
        assert_eq!(copy.target(), Some(target));
        assert_eq!(copy.current_target(), Some(target));
        assert!(!copy.is_default_prevented());
        assert!(!copy.is_propagation_stopped());
        assert!(!copy.is_propagation_stopped_immediately());

        // Mutating the copy leaves the original alone
        copy.set_event_phase(EventPhase::Capturing);
        assert_eq!(event.event_phase(), EventPhase::Bubbling);
        assert!(event.is_default_prevented());
    }

    #[test]
    fn test_clone_event_is_polymorphic() {
        let mut event = BasicEvent::new("x", false, true);
        event.prevent_default();
        let boxed = event.clone_event();
        assert!(downcast_event::<BasicEvent>(boxed.as_ref()).is_some());
        assert!(!boxed.is_default_prevented());
    }

    #[test]
    fn test_format_to_string() {
        let event = BasicEvent::new("load", true, false);
        assert_eq!(
            event.to_string(),
            "[Event type=\"load\" bubbles=true cancelable=false]"
        );
        assert_eq!(
            event.format_to_string("Custom", &["eventPhase", "target", "missing"]),
            "[Custom eventPhase=2 target=null missing=null]"
        );
    }
}
