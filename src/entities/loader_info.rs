//! Load progress reporter.
//!
//! `LoaderInfo` tracks byte counts of one load and notifies listeners with
//! `progress` events, followed by exactly one `complete`. Its dispatcher is
//! aggregated: events report the `LoaderInfo` identity as their target.
//!
//! Listeners register through the delegates below; there is no public
//! `dispatch_event`, only the reporter itself emits.

use std::cell::{Cell, RefCell};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::core::dispatcher::{DispatchConfig, DispatchError, EventDispatcher};
use crate::core::event::{event_type, BasicEvent, TargetId};
use crate::core::listener::ListenerFn;
use crate::core::progress_event::ProgressEvent;

/// Loader-side configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// URL reported by loader infos that have no owning loader
    pub root_url: Option<String>,
}

/// Progress state of one load, plus its listener registry.
#[derive(Debug)]
pub struct LoaderInfo {
    id: TargetId,
    events: EventDispatcher,
    url: Option<String>,
    loader_url: Option<String>,
    content_type: RefCell<Option<String>>,
    bytes_loaded: Cell<u64>,
    bytes_total: Cell<u64>,
    completed: Cell<bool>,
}

impl LoaderInfo {
    /// Create a loader info.
    ///
    /// With a loader URL the info belongs to that loader; without one it is the
    /// root info and reports `config.root_url` as its `url`.
    pub fn create(loader_url: Option<&str>, config: &LoaderConfig) -> Self {
        Self::with_dispatch_config(loader_url, config, DispatchConfig::default())
    }

    pub fn with_dispatch_config(
        loader_url: Option<&str>,
        config: &LoaderConfig,
        dispatch: DispatchConfig,
    ) -> Self {
        let id = TargetId::new();
        let (url, loader_url) = match loader_url {
            Some(loader_url) => (None, Some(loader_url.to_string())),
            None => (config.root_url.clone(), None),
        };
        debug!("LoaderInfo: created {} (url={:?}, loader_url={:?})", id, url, loader_url);
        Self {
            id,
            events: EventDispatcher::with_config(id, dispatch),
            url,
            loader_url,
            content_type: RefCell::new(None),
            bytes_loaded: Cell::new(0),
            bytes_total: Cell::new(0),
            completed: Cell::new(false),
        }
    }

    // ========== Listener delegates ==========

    pub fn add_event_listener(&self, event_type: &str, callback: &ListenerFn, use_capture: bool, priority: i32) {
        self.events.add_event_listener(event_type, callback, use_capture, priority);
    }

    pub fn remove_event_listener(&self, event_type: &str, callback: &ListenerFn, use_capture: bool) {
        self.events.remove_event_listener(event_type, callback, use_capture);
    }

    pub fn has_event_listener(&self, event_type: &str) -> bool {
        self.events.has_event_listener(event_type)
    }

    pub fn will_trigger(&self, event_type: &str) -> bool {
        self.events.will_trigger(event_type)
    }

    // ========== Progress ==========

    /// Record new byte counts and emit a `progress` event.
    ///
    /// Takes `&self` so listeners may re-enter the info (unsubscribe, query counts).
    pub fn update(&self, bytes_loaded: u64, bytes_total: u64) -> Result<(), DispatchError> {
        self.bytes_loaded.set(bytes_loaded);
        self.bytes_total.set(bytes_total);
        trace!("LoaderInfo: {} progress {}/{}", self.id, bytes_loaded, bytes_total);
        self.events
            .dispatch_event(&mut ProgressEvent::progress(bytes_loaded, bytes_total))?;
        Ok(())
    }

    /// Finish the load: final progress, then `complete`. Only the first call has an effect.
    pub fn complete(&self) -> Result<(), DispatchError> {
        if self.completed.get() {
            return Ok(());
        }
        let total = self.bytes_total.get();
        let loaded = self.bytes_loaded.get().max(total);
        self.update(loaded, total)?;
        self.completed.set(true);
        debug!("LoaderInfo: {} complete ({} bytes)", self.id, loaded);
        self.events
            .dispatch_event(&mut BasicEvent::of(event_type::COMPLETE))?;
        Ok(())
    }

    // ========== Accessors ==========

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn loader_url(&self) -> Option<&str> {
        self.loader_url.as_deref()
    }

    pub fn content_type(&self) -> Option<String> {
        self.content_type.borrow().clone()
    }

    pub fn set_content_type(&self, content_type: impl Into<String>) {
        *self.content_type.borrow_mut() = Some(content_type.into());
    }

    pub fn bytes_loaded(&self) -> u64 {
        self.bytes_loaded.get()
    }

    pub fn bytes_total(&self) -> u64 {
        self.bytes_total.get()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}
