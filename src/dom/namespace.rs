use std::fmt;

use crate::tree::{NodeId, Tree};

use super::node::Proxy;

/// A namespace declaration.
///
/// Elements and attributes bound to a namespace refer to the declaration that introduced it,
/// so the declaration returned for a node is always one made on the node or on one of its
/// ancestors. Declarations are never unlinked from their element.
#[derive(Clone)]
pub struct Namespace(pub(crate) Proxy);

impl Namespace {
    /// Return the declared prefix, `None` for a default namespace declaration.
    pub fn prefix(&self) -> Option<String> {
        self.with_tree(|tree, id| tree.ns_prefix(id).map(str::to_owned))
    }

    pub fn href(&self) -> String {
        self.with_tree(|tree, id| tree.ns_href(id).to_owned())
    }

    /// Whether both values designate the same declaration.
    ///
    /// Two declarations of the same prefix and href on different elements are not the same.
    pub fn is_same(&self, other: &Namespace) -> bool {
        self.0.is_same(&other.0)
    }
}

impl Namespace {
    pub(crate) fn from_proxy(proxy: Proxy) -> Self {
        Self(proxy)
    }

    pub(crate) fn proxy(&self) -> &Proxy {
        &self.0
    }

    fn with_tree<R>(&self, f: impl FnOnce(&Tree, NodeId) -> R) -> R {
        let tree = self.0.document().tree();
        f(&tree, self.0.id())
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("prefix", &self.prefix())
            .field("href", &self.href())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::{Document, Node};

    #[test]
    fn prefix_and_href() {
        let doc = Document::new();
        let root = doc.node("root", None).unwrap();
        let default = root.define_namespace(None, "urn:d").unwrap();
        let prefixed = root.define_namespace(Some("p"), "urn:p").unwrap();
        assert_eq!(default.prefix(), None);
        assert_eq!(prefixed.prefix().as_deref(), Some("p"));
        assert_eq!(prefixed.href(), "urn:p");
        assert_eq!(root.namespaces(true), vec![default.clone(), prefixed]);

        let child = root.node("child", None).unwrap();
        let again = child.define_namespace(None, "urn:d").unwrap();
        assert!(!again.is_same(&default));
        assert_eq!(again.href(), default.href());
    }
}
