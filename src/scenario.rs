//! Scripted dispatch scenarios.
//!
//! A scenario declares listeners (type, priority, phase, and what each one does
//! when invoked) and a list of events to dispatch against one dispatcher. The
//! runner records which listeners fired, in order, for every top-level
//! dispatch. Actions may re-enter the dispatcher, which makes scenarios a
//! convenient way to reproduce ordering questions from the command line.
//!
//! ```json
//! {
//!   "listeners": [
//!     { "id": "A", "event_type": "load", "priority": 10,
//!       "actions": [ { "action": "remove", "listener": "B" } ] },
//!     { "id": "B", "event_type": "load" }
//!   ],
//!   "dispatches": [ { "event_type": "load", "cancelable": true } ]
//! }
//! ```

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;
use std::rc::{Rc, Weak};

use crate::core::dispatcher::{DispatchConfig, EventDispatcher};
use crate::core::event::{BasicEvent, Event, EventPhase, TargetId};
use crate::core::listener::ListenerFn;

/// Scenario file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub listeners: Vec<ListenerDef>,
    pub dispatches: Vec<EventDef>,
}

/// One listener declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerDef {
    pub id: String,
    pub event_type: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub use_capture: bool,
    /// Registered before the first dispatch; otherwise only via an `add` action
    #[serde(default = "default_register")]
    pub register: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
}

fn default_register() -> bool {
    true
}

/// What a listener does when invoked, in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    PreventDefault,
    StopPropagation,
    StopImmediatePropagation,
    Add { listener: String },
    Remove { listener: String },
    Dispatch { event: EventDef },
    Fail { message: String },
}

/// Event to construct and dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDef {
    pub event_type: String,
    #[serde(default)]
    pub bubbles: bool,
    #[serde(default)]
    pub cancelable: bool,
    #[serde(default)]
    pub phase: EventPhase,
}

impl EventDef {
    pub fn to_event(&self) -> BasicEvent {
        let mut event = BasicEvent::new(self.event_type.clone(), self.bubbles, self.cancelable);
        event.set_event_phase(self.phase);
        event
    }
}

/// Result of one top-level dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub event_type: String,
    /// Listener ids in invocation order, nested dispatches included
    pub invoked: Vec<String>,
    /// `dispatch_event` result, `None` when it failed
    pub allowed: Option<bool>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub dispatcher: TargetId,
    pub dispatches: Vec<DispatchOutcome>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(json).context("Failed to parse scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid scenario: {}", path.display()))
    }

    /// Listener ids must be unique and every `add`/`remove` must name one of them.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for def in &self.listeners {
            if !ids.insert(def.id.as_str()) {
                bail!("Duplicate listener id '{}'", def.id);
            }
        }
        for def in &self.listeners {
            for action in &def.actions {
                if let Action::Add { listener } | Action::Remove { listener } = action
                    && !ids.contains(listener.as_str())
                {
                    bail!("Listener '{}' refers to unknown listener '{}'", def.id, listener);
                }
            }
        }
        Ok(())
    }
}

struct Declared {
    callback: ListenerFn,
    def: ListenerDef,
}

struct RunState {
    dispatcher: EventDispatcher,
    declared: RefCell<IndexMap<String, Declared>>,
    invoked: RefCell<Vec<String>>,
}

impl RunState {
    fn lookup(&self, id: &str) -> Option<(ListenerFn, ListenerDef)> {
        self.declared
            .borrow()
            .get(id)
            .map(|d| (d.callback.clone(), d.def.clone()))
    }

    fn register(&self, id: &str) {
        if let Some((callback, def)) = self.lookup(id) {
            self.dispatcher
                .add_event_listener(&def.event_type, &callback, def.use_capture, def.priority);
        }
    }

    fn unregister(&self, id: &str) {
        if let Some((callback, def)) = self.lookup(id) {
            self.dispatcher
                .remove_event_listener(&def.event_type, &callback, def.use_capture);
        }
    }
}

fn scripted_listener(state: Weak<RunState>, id: String, actions: Vec<Action>) -> ListenerFn {
    ListenerFn::new(move |event: &mut dyn Event| {
        let Some(state) = state.upgrade() else {
            return Ok(());
        };
        state.invoked.borrow_mut().push(id.clone());
        for action in &actions {
            match action {
                Action::PreventDefault => event.prevent_default(),
                Action::StopPropagation => event.stop_propagation(),
                Action::StopImmediatePropagation => event.stop_immediate_propagation(),
                Action::Add { listener } => state.register(listener),
                Action::Remove { listener } => state.unregister(listener),
                Action::Dispatch { event: nested } => {
                    state.dispatcher.dispatch_event(&mut nested.to_event())?;
                }
                Action::Fail { message } => bail!("{}", message),
            }
        }
        Ok(())
    })
}

/// Run `scenario` against a fresh dispatcher.
///
/// Dispatch failures are recorded in the report, not returned: every
/// top-level dispatch runs regardless of earlier ones.
pub fn run(scenario: &Scenario, config: DispatchConfig) -> Result<ScenarioReport> {
    scenario.validate()?;

    let state = Rc::new(RunState {
        dispatcher: EventDispatcher::with_config(TargetId::new(), config),
        declared: RefCell::new(IndexMap::new()),
        invoked: RefCell::new(Vec::new()),
    });

    for def in &scenario.listeners {
        let callback = scripted_listener(Rc::downgrade(&state), def.id.clone(), def.actions.clone());
        state.declared.borrow_mut().insert(
            def.id.clone(),
            Declared {
                callback,
                def: def.clone(),
            },
        );
    }
    for def in scenario.listeners.iter().filter(|s| s.register) {
        state.register(&def.id);
    }

    let mut report = ScenarioReport {
        dispatcher: state.dispatcher.id(),
        dispatches: Vec::with_capacity(scenario.dispatches.len()),
    };
    for def in &scenario.dispatches {
        state.invoked.borrow_mut().clear();
        let result = state.dispatcher.dispatch_event(&mut def.to_event());
        let invoked = std::mem::take(&mut *state.invoked.borrow_mut());
        let (allowed, error) = match result {
            Ok(allowed) => (Some(allowed), None),
            Err(err) => {
                log::warn!("Scenario: dispatch of '{}' failed: {}", def.event_type, err);
                (None, Some(err.to_string()))
            }
        };
        log::info!(
            "Scenario: '{}' invoked {:?} (allowed={:?})",
            def.event_type,
            invoked,
            allowed
        );
        report.dispatches.push(DispatchOutcome {
            event_type: def.event_type.clone(),
            invoked,
            allowed,
            error,
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_json(json: &str) -> ScenarioReport {
        let scenario = Scenario::from_json(json).unwrap();
        run(&scenario, DispatchConfig::default()).unwrap()
    }

    #[test]
    fn test_priority_scenario() {
        let report = run_json(
            r#"{
                "listeners": [
                    { "id": "low", "event_type": "load", "priority": 1 },
                    { "id": "first", "event_type": "load", "priority": 10 },
                    { "id": "second", "event_type": "load", "priority": 10,
                      "actions": [ { "action": "prevent_default" } ] }
                ],
                "dispatches": [
                    { "event_type": "load", "cancelable": true },
                    { "event_type": "load" }
                ]
            }"#,
        );
        assert_eq!(report.dispatches[0].invoked, vec!["first", "second", "low"]);
        assert_eq!(report.dispatches[0].allowed, Some(false));
        // Not cancelable: prevent_default is ignored
        assert_eq!(report.dispatches[1].allowed, Some(true));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["dispatcher"], serde_json::json!(report.dispatcher));
        assert!(json["dispatcher"].is_string());
    }

    #[test]
    fn test_reentrant_add_and_remove() {
        let report = run_json(
            r#"{
                "listeners": [
                    { "id": "A", "event_type": "x",
                      "actions": [ { "action": "remove", "listener": "B" },
                                   { "action": "add", "listener": "D" } ] },
                    { "id": "B", "event_type": "x" },
                    { "id": "C", "event_type": "x" },
                    { "id": "D", "event_type": "x", "register": false }
                ],
                "dispatches": [ { "event_type": "x" }, { "event_type": "x" } ]
            }"#,
        );
        assert_eq!(report.dispatches[0].invoked, vec!["A", "C"]);
        assert_eq!(report.dispatches[1].invoked, vec!["A", "C", "D"]);
    }

    #[test]
    fn test_capture_phase_event() {
        let report = run_json(
            r#"{
                "listeners": [
                    { "id": "cap", "event_type": "x", "use_capture": true },
                    { "id": "bub", "event_type": "x" }
                ],
                "dispatches": [ { "event_type": "x", "phase": "capturing" } ]
            }"#,
        );
        assert_eq!(report.dispatches[0].invoked, vec!["cap"]);
    }

    #[test]
    fn test_failures_are_reported() {
        let scenario = Scenario::from_json(
            r#"{
                "listeners": [
                    { "id": "loop", "event_type": "loop",
                      "actions": [ { "action": "dispatch", "event": { "event_type": "loop" } } ] },
                    { "id": "bad", "event_type": "bad",
                      "actions": [ { "action": "fail", "message": "broken handler" } ] }
                ],
                "dispatches": [ { "event_type": "loop" }, { "event_type": "bad" } ]
            }"#,
        )
        .unwrap();
        let report = run(&scenario, DispatchConfig::with_max_depth(4)).unwrap();

        let recursion = &report.dispatches[0];
        assert_eq!(recursion.invoked.len(), 4);
        assert_eq!(recursion.allowed, None);
        assert_eq!(
            recursion.error.as_deref(),
            Some("Event dispatch recursion limit reached (4)")
        );

        let failed = &report.dispatches[1];
        assert_eq!(failed.invoked, vec!["bad"]);
        assert_eq!(
            failed.error.as_deref(),
            Some("Listener for 'bad' failed: broken handler")
        );
    }

    #[test]
    fn test_validation() {
        assert!(Scenario::from_json(
            r#"{ "listeners": [ { "id": "a", "event_type": "x" }, { "id": "a", "event_type": "y" } ] }"#
        )
        .is_err());
        assert!(Scenario::from_json(
            r#"{ "listeners": [ { "id": "a", "event_type": "x",
                 "actions": [ { "action": "remove", "listener": "ghost" } ] } ] }"#
        )
        .is_err());
        assert!(Scenario::from_json("{}").unwrap().dispatches.is_empty());
    }
}
