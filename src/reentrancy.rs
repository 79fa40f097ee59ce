//! Debug-only detection of nested table operations.
//!
//! Hash strategies are user code and run while a chain may be half linked
//! (between unlink and relink during a rehash, or between allocating a
//! grown store and swapping it in). A strategy that reaches back into the
//! table it serves would observe that state. Debug builds record the
//! operation in flight and panic on any nested entry; release builds compile
//! the tracking away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Table operation that may call into a hash strategy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Op {
    Lookup,
    Insert,
    Remove,
    Rehash,
}

#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<Option<Op>>,
    // Tables are single-threaded; this keeps them !Send + !Sync.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosend: PhantomData,
        }
    }

    /// Mark `op` as in flight until the returned guard drops.
    #[inline]
    pub(crate) fn enter(&self, op: Op) -> OpGuard<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(current) = self.active.get() {
                panic!(
                    "reentrant {:?} on a table while {:?} is in progress",
                    op, current
                );
            }
            self.active.set(Some(op));
            OpGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            OpGuard { _z: PhantomData }
        }
    }

    #[cfg(all(test, debug_assertions))]
    pub(crate) fn active(&self) -> Option<Op> {
        self.active.get()
    }
}

pub(crate) struct OpGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}
