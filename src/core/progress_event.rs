//! Progress notifications carrying byte counts.

use std::any::Any;
use std::fmt;

use super::event::{BasicEvent, Event, FieldValue};

/// Dispatched while a load operation runs or when a socket receives data.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    base: BasicEvent,
    /// Items or bytes loaded when the listener processes the event
    pub bytes_loaded: u64,
    /// Items or bytes expected in total, 0 when unknown
    pub bytes_total: u64,
}

impl ProgressEvent {
    pub const PROGRESS: &'static str = "progress";
    pub const SOCKET_DATA: &'static str = "socketData";

    pub fn new(
        event_type: impl Into<String>,
        bubbles: bool,
        cancelable: bool,
        bytes_loaded: u64,
        bytes_total: u64,
    ) -> Self {
        Self {
            base: BasicEvent::new(event_type, bubbles, cancelable),
            bytes_loaded,
            bytes_total,
        }
    }

    /// Plain `progress` event.
    pub fn progress(bytes_loaded: u64, bytes_total: u64) -> Self {
        Self::new(Self::PROGRESS, false, false, bytes_loaded, bytes_total)
    }
}

impl Event for ProgressEvent {
    fn base(&self) -> &BasicEvent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BasicEvent {
        &mut self.base
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

    fn class_name(&self) -> &'static str {
        "ProgressEvent"
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "bytesLoaded" => Some(FieldValue::UInt(self.bytes_loaded)),
            "bytesTotal" => Some(FieldValue::UInt(self.bytes_total)),
            _ => self.base.field(name),
        }
    }

    fn described_fields(&self) -> &'static [&'static str] {
        &["type", "bubbles", "cancelable", "bytesLoaded", "bytesTotal"]
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
