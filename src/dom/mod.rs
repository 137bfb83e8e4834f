//! Node values handed out by a [`Document`](document::Document).
//!
//! Every node value wraps the proxy of a node of the document arena. A document hands out at
//! most one proxy per node at a time, so two values designate the same node exactly when they
//! share their proxy. Node values keep their document alive; a node removed from its document
//! stays alive, with its whole subtree, for as long as a value refers into that subtree.
//!
//! # Note
//! - A node inserted into another document is copied. The copy gets its own proxy, and the
//!   inserted value keeps designating the original node.
//! - Proxies are finalized according to the [`ReclaimMode`] of the current thread.

pub mod attr;
pub mod character_data;
pub mod document;
pub mod element;
mod mutation;
pub mod namespace;
pub mod node;
mod ownership;
pub mod pi;
pub mod reclaim;
mod registry;

pub use attr::Attribute;
pub use character_data::{CData, CharacterData, Comment, Text};
pub use document::{Document, Dtd};
pub use element::Element;
pub use namespace::Namespace;
pub use node::{Node, NodeRef, Parent};
pub use pi::ProcessingInstruction;
pub use reclaim::{ReclaimMode, collect, pending};

use crate::{
    error::{Result, XmlError},
    tree::{NodeId, Tree},
};

/// Check that `id` may be linked as the child of an element.
pub(crate) fn check_insertable(tree: &Tree, id: NodeId) -> Result<()> {
    let typ = tree.typ(id);
    if typ.is_child() {
        Ok(())
    } else {
        Err(XmlError::TypeMismatch(
            format!("{typ:?} cannot be inserted as a child").into(),
        ))
    }
}

/// Check that `name` is an XML name.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(XmlError::InvalidArgument(
            format!("'{name}' is not a valid name").into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert!(validate_name("a").is_ok());
        assert!(validate_name("p:local-name.2").is_ok());
        assert!(validate_name("_x").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("1a").is_err());
        assert!(validate_name("a b").is_err());
    }
}
