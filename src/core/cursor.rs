//! Copy-on-write iteration over a live listener list.
//!
//! A cursor walks one type's listener list during one dispatch. It starts as a
//! shared view of the live list and switches to a private snapshot the first
//! time the dispatcher adds to that list while the cursor is active:
//!
//! - add while shared: snapshot first, then the live list is mutated
//! - remove while shared: step back if the removed index was already visited
//! - remove after snapshot: excise the entry from the snapshot if not yet visited
//!
//! Listeners added mid-dispatch therefore never join the running pass, and
//! removed ones are neither skipped past nor repeated.

use std::cell::RefCell;
use std::rc::Rc;

use super::listener::Listener;

/// Live, shared listener list of one event type.
pub(crate) type ListenerList = Rc<RefCell<Vec<Rc<Listener>>>>;

#[derive(Debug)]
enum CursorView {
    Shared(ListenerList),
    Owned(Vec<Rc<Listener>>),
}

#[derive(Debug)]
pub(crate) struct DispatchCursor {
    view: CursorView,
    index: usize,
    active: bool,
}

impl DispatchCursor {
    pub(crate) fn new(list: ListenerList) -> Self {
        Self {
            view: CursorView::Shared(list),
            index: 0,
            active: false,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(test)]
    pub(crate) fn is_copy(&self) -> bool {
        matches!(self.view, CursorView::Owned(_))
    }

    pub(crate) fn start(&mut self) {
        self.active = true;
    }

    pub(crate) fn stop(&mut self) {
        self.active = false;
    }

    /// Point back at the live list from the beginning.
    pub(crate) fn reset(&mut self, list: ListenerList) {
        self.view = CursorView::Shared(list);
        self.index = 0;
    }

    /// Take a private snapshot unless one was already taken.
    pub(crate) fn copy_on_write(&mut self) {
        if let CursorView::Shared(list) = &self.view {
            let snapshot = list.borrow().clone();
            self.view = CursorView::Owned(snapshot);
        }
    }

    /// Account for `listener` leaving the live list at `list_index`.
    pub(crate) fn remove(&mut self, listener: &Rc<Listener>, list_index: usize) {
        if !self.active {
            return;
        }
        match &mut self.view {
            CursorView::Shared(_) => {
                if list_index < self.index {
                    self.index -= 1;
                }
            }
            CursorView::Owned(snapshot) => {
                let found = (self.index..snapshot.len())
                    .find(|&i| Rc::ptr_eq(&snapshot[i], listener));
                if let Some(i) = found {
                    snapshot.remove(i);
                }
            }
        }
    }

    /// Drop everything not yet visited.
    pub(crate) fn clear_remaining(&mut self) {
        if let CursorView::Owned(snapshot) = &mut self.view {
            snapshot.truncate(self.index);
        }
    }

    pub(crate) fn next(&mut self) -> Option<Rc<Listener>> {
        let item = match &self.view {
            CursorView::Shared(list) => list.borrow().get(self.index).cloned(),
            CursorView::Owned(snapshot) => snapshot.get(self.index).cloned(),
        };
        if item.is_some() {
            self.index += 1;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::listener::ListenerFn;

    fn list_of(n: usize) -> (ListenerList, Vec<Rc<Listener>>) {
        let entries: Vec<Rc<Listener>> = (0..n)
            .map(|_| Rc::new(Listener::new(ListenerFn::new(|_| Ok(())), false, 0)))
            .collect();
        (Rc::new(RefCell::new(entries.clone())), entries)
    }

    #[test]
    fn test_shared_view_sees_live_removal() {
        let (list, entries) = list_of(3);
        let mut cursor = DispatchCursor::new(Rc::clone(&list));
        cursor.start();

        assert!(Rc::ptr_eq(&cursor.next().unwrap(), &entries[0]));
        // Remove the listener just visited: cursor steps back, successor not skipped
        cursor.remove(&entries[0], 0);
        list.borrow_mut().remove(0);
        assert!(Rc::ptr_eq(&cursor.next().unwrap(), &entries[1]));
        assert!(Rc::ptr_eq(&cursor.next().unwrap(), &entries[2]));
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_copy_on_write_ignores_live_additions() {
        let (list, entries) = list_of(2);
        let mut cursor = DispatchCursor::new(Rc::clone(&list));
        cursor.start();
        cursor.next();

        cursor.copy_on_write();
        assert!(cursor.is_copy());
        list.borrow_mut()
            .push(Rc::new(Listener::new(ListenerFn::new(|_| Ok(())), false, 0)));

        assert!(Rc::ptr_eq(&cursor.next().unwrap(), &entries[1]));
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_copy_excises_unvisited_removal() {
        let (list, entries) = list_of(3);
        let mut cursor = DispatchCursor::new(Rc::clone(&list));
        cursor.start();
        cursor.next();
        cursor.copy_on_write();

        cursor.remove(&entries[1], 1);
        list.borrow_mut().remove(1);

        assert!(Rc::ptr_eq(&cursor.next().unwrap(), &entries[2]));
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_inactive_cursor_ignores_removal() {
        let (list, entries) = list_of(2);
        let mut cursor = DispatchCursor::new(Rc::clone(&list));
        cursor.remove(&entries[0], 0);
        assert!(!cursor.is_active());
        assert!(Rc::ptr_eq(&cursor.next().unwrap(), &entries[0]));
    }
}
