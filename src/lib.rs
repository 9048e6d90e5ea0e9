//! evdispatch - reentrant, priority-ordered event dispatch
//!
//! Re-exports all modules for use by the binary target.

// Dispatch engine (events, listeners, dispatcher, flows)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod scenario;

// Re-export commonly used types from core
pub use core::dispatcher::{DispatchConfig, DispatchError, EventDispatcher};
pub use core::event::{downcast_event, BasicEvent, Event, EventPhase, TargetId};
pub use core::flow::dispatch_along;
pub use core::listener::ListenerFn;
pub use core::progress_event::ProgressEvent;

// Re-export entities
pub use entities::LoaderInfo;
