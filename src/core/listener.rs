//! Listener callbacks and registration records.

use std::fmt;
use std::rc::Rc;

use super::event::{downcast_event_mut, Event};

/// Type-erased callback
type Callback = dyn Fn(&mut dyn Event) -> anyhow::Result<()>;

/// Callback capability registered with a dispatcher.
///
/// Identity is the allocation: clones of one `ListenerFn` are the same
/// listener, two `ListenerFn::new` calls with equal closures are not. Keep a
/// clone around to remove the listener later.
#[derive(Clone)]
pub struct ListenerFn(Rc<Callback>);

impl ListenerFn {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut dyn Event) -> anyhow::Result<()> + 'static,
    {
        Self(Rc::new(callback))
    }

    /// Listener that only reacts to events of concrete kind `E`.
    ///
    /// Events of other kinds reaching it are skipped.
    ///
    /// # Example
    /// ```ignore
    /// let on_progress = ListenerFn::for_kind::<ProgressEvent, _>(|e| {
    ///     println!("{} / {}", e.bytes_loaded, e.bytes_total);
    ///     Ok(())
    /// });
    /// ```
    pub fn for_kind<E, F>(callback: F) -> Self
    where
        E: Event,
        F: Fn(&mut E) -> anyhow::Result<()> + 'static,
    {
        Self::new(move |event: &mut dyn Event| match downcast_event_mut::<E>(event) {
            Some(event) => callback(event),
            None => Ok(()),
        })
    }

    pub fn call(&self, event: &mut dyn Event) -> anyhow::Result<()> {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &ListenerFn) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for ListenerFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerFn")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// One registration on one event type.
#[derive(Debug)]
pub struct Listener {
    callback: ListenerFn,
    use_capture: bool,
    priority: i32,
}

impl Listener {
    pub fn new(callback: ListenerFn, use_capture: bool, priority: i32) -> Self {
        Self {
            callback,
            use_capture,
            priority,
        }
    }

    /// Registrations are identified by callback and phase, never by priority.
    pub fn matches(&self, callback: &ListenerFn, use_capture: bool) -> bool {
        self.use_capture == use_capture && self.callback.ptr_eq(callback)
    }

    pub fn callback(&self) -> &ListenerFn {
        &self.callback
    }

    pub fn use_capture(&self) -> bool {
        self.use_capture
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

/// Insert keeping descending priority; ties go after existing entries.
pub(crate) fn insert_by_priority(list: &mut Vec<Rc<Listener>>, listener: Rc<Listener>) {
    let position = list
        .iter()
        .position(|existing| existing.priority < listener.priority)
        .unwrap_or(list.len());
    list.insert(position, listener);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> ListenerFn {
        ListenerFn::new(|_| Ok(()))
    }

    #[test]
    fn test_identity_is_by_reference() {
        let a = noop();
        let b = noop();
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));

        let listener = Listener::new(a.clone(), false, 5);
        assert!(listener.matches(&a, false));
        assert!(!listener.matches(&a, true));
        assert!(!listener.matches(&b, false));
    }

    #[test]
    fn test_insert_by_priority_is_stable() {
        let mut list = Vec::new();
        let tags = [(1, "d"), (10, "a"), (5, "b"), (5, "c")];
        let fns: Vec<_> = tags.iter().map(|_| noop()).collect();
        for ((priority, _), f) in tags.iter().zip(&fns) {
            insert_by_priority(&mut list, Rc::new(Listener::new(f.clone(), false, *priority)));
        }

        let priorities: Vec<i32> = list.iter().map(|l| l.priority()).collect();
        assert_eq!(priorities, vec![10, 5, 5, 1]);
        // The two priority-5 entries keep registration order
        assert!(list[1].matches(&fns[2], false));
        assert!(list[2].matches(&fns[3], false));
    }
}
