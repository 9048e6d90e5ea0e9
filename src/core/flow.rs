//! Capture / target / bubble orchestration over a path of dispatchers.
//!
//! The caller supplies the path (root first, target last); no tree is walked
//! here. Each node delivers through [`EventDispatcher::deliver`] with the phase
//! set for that stage:
//!
//! 1. Capture: root → parent, `EventPhase::Capturing`
//! 2. Target: target node, `EventPhase::AtTarget`
//! 3. Bubble (only if the event bubbles): parent → root, `EventPhase::Bubbling`
//!
//! `stop_propagation()` ends the flow after the node where it was called; the
//! remaining listeners of that node still run.

use log::trace;

use super::dispatcher::{DispatchError, EventDispatcher};
use super::event::{Event, EventPhase};

/// Run `event` through `path` and return whether the default action may proceed.
pub fn dispatch_along(path: &[&EventDispatcher], event: &mut dyn Event) -> Result<bool, DispatchError> {
    let Some((target, ancestors)) = path.split_last() else {
        return Ok(true);
    };
    if event.target().is_none() {
        event.base_mut().set_target(target.id());
    }

    for node in ancestors {
        event.base_mut().set_event_phase(EventPhase::Capturing);
        node.deliver(event)?;
        if event.is_propagation_stopped() {
            return Ok(finish(event, "capture"));
        }
    }

    event.base_mut().set_event_phase(EventPhase::AtTarget);
    target.deliver(event)?;
    if event.is_propagation_stopped() {
        return Ok(finish(event, "target"));
    }

    if event.bubbles() {
        for node in ancestors.iter().rev() {
            event.base_mut().set_event_phase(EventPhase::Bubbling);
            node.deliver(event)?;
            if event.is_propagation_stopped() {
                return Ok(finish(event, "bubble"));
            }
        }
    }

    Ok(!event.is_default_prevented())
}

fn finish(event: &dyn Event, stage: &str) -> bool {
    trace!("flow: '{}' stopped during {}", event.event_type(), stage);
    !event.is_default_prevented()
}

/// Whether any node on `path` listens for `event_type`.
pub fn will_trigger_along(path: &[&EventDispatcher], event_type: &str) -> bool {
    path.iter().any(|node| node.will_trigger(event_type))
}
