//! Finalization of proxies.
//!
//! Dropping a proxy does not free anything by itself. It produces a [`Pending`] record which,
//! once run, forgets the registry entry of the proxy and unpins its node. When this was the
//! last pin of a detached subtree, the subtree is released.
//!
//! A pending record keeps a strong reference to its document, so the document outlives the
//! finalizers of all its proxies. Records are independent of each other and can run in any
//! order with the same final outcome.

use std::cell::{Cell, RefCell};

use tracing::{debug, trace, warn};

use crate::tree::NodeId;

use super::{document::Document, ownership};

/// When finalizers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReclaimMode {
    /// Run the finalizer as soon as the proxy is dropped, unless its document is busy.
    /// Busy documents get their finalizers queued until the next [`collect`], or until another
    /// finalizer runs eagerly.
    #[default]
    Eager,
    /// Queue every finalizer until [`collect`] is called.
    Deferred,
}

thread_local! {
    static MODE: Cell<ReclaimMode> = const { Cell::new(ReclaimMode::Eager) };
    static PENDING: RefCell<Vec<Pending>> = const { RefCell::new(vec![]) };
}

pub fn mode() -> ReclaimMode {
    MODE.with(|m| m.get())
}

/// Set the reclaim mode of the current thread and return the previous one.
pub fn set_mode(mode: ReclaimMode) -> ReclaimMode {
    MODE.with(|m| m.replace(mode))
}

/// Return the number of finalizers waiting for [`collect`].
pub fn pending() -> usize {
    PENDING.try_with(|p| p.borrow().len()).unwrap_or(0)
}

/// Run the queued finalizers.
///
/// Finalizers whose document is busy stay queued. Return the number of finalizers run.
pub fn collect() -> usize {
    let batch = PENDING
        .try_with(|p| p.take())
        .unwrap_or_default();
    if batch.is_empty() {
        return 0;
    }
    let total = batch.len();
    let mut done = 0;
    for pending in batch {
        if pending.run() {
            done += 1;
        } else {
            enqueue(pending);
        }
    }
    debug!(done, queued = total - done, "collected pending finalizers");
    done
}

fn enqueue(pending: Pending) {
    // During thread teardown the record is simply dropped along with its document.
    PENDING.try_with(|p| p.borrow_mut().push(pending)).ok();
}

pub(crate) fn schedule(pending: Pending) {
    match mode() {
        ReclaimMode::Eager => {
            if !pending.run() {
                warn!(node = ?pending.id, "document busy, finalizer queued");
                enqueue(pending);
            } else if self::pending() > 0 {
                collect();
            }
        }
        ReclaimMode::Deferred => enqueue(pending),
    }
}

/// The finalizer of one dropped proxy.
pub(crate) struct Pending {
    doc: Document,
    id: NodeId,
    serial: u64,
}

impl Pending {
    pub(crate) fn new(doc: Document, id: NodeId, serial: u64) -> Self {
        Self { doc, id, serial }
    }

    /// Run the finalizer. Return `false` if the document is busy.
    fn run(&self) -> bool {
        let inner = &self.doc.0;
        let (Ok(mut registry), Ok(mut tree)) =
            (inner.registry.try_borrow_mut(), inner.tree.try_borrow_mut())
        else {
            return false;
        };
        registry.forget(self.id, self.serial);
        let released = ownership::unpin(&mut tree, self.id);
        trace!(node = ?self.id, serial = self.serial, released, "proxy finalized");
        true
    }
}
