use std::{
    collections::HashMap,
    rc::{Rc, Weak},
};

use crate::tree::NodeId;

use super::node::ProxyInner;

struct Entry {
    proxy: Weak<ProxyInner>,
    serial: u64,
}

/// Map from node to the single proxy that may exist for it.
///
/// Entries do not keep proxies alive. An entry whose proxy was dropped stays in place until the
/// proxy is finalized, but is replaced if the node is resolved again in the meantime.
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<NodeId, Entry>,
    serial: u64,
}

impl Registry {
    /// Return the live proxy of `id`, if any.
    pub(crate) fn lookup(&self, id: NodeId) -> Option<Rc<ProxyInner>> {
        self.entries.get(&id).and_then(|e| e.proxy.upgrade())
    }

    pub(crate) fn next_serial(&mut self) -> u64 {
        self.serial += 1;
        self.serial
    }

    pub(crate) fn insert(&mut self, id: NodeId, proxy: &Rc<ProxyInner>) {
        let entry = Entry {
            proxy: Rc::downgrade(proxy),
            serial: proxy.serial,
        };
        self.entries.insert(id, entry);
    }

    /// Remove the entry of `id` if it still belongs to the proxy numbered `serial`.
    pub(crate) fn forget(&mut self, id: NodeId, serial: u64) -> bool {
        match self.entries.get(&id) {
            Some(entry) if entry.serial == serial => {
                self.entries.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Number of entries whose proxy is still alive.
    pub(crate) fn live(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.proxy.strong_count() > 0)
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
