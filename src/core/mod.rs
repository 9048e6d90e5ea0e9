//! Core dispatch modules - events, listeners, cursors, dispatcher, flows
//!
//! These modules form the dispatch engine, independent of any collaborator.

pub(crate) mod cursor;
pub mod dispatcher;
pub mod event;
pub mod flow;
pub mod listener;
pub mod progress_event;

// Re-exports for convenience
pub use dispatcher::{DispatchConfig, DispatchError, EventDispatcher};
pub use event::{downcast_event, downcast_event_mut, event_type, BasicEvent, Event, EventPhase, FieldValue, TargetId};
pub use flow::{dispatch_along, will_trigger_along};
pub use listener::{Listener, ListenerFn};
pub use progress_event::ProgressEvent;
