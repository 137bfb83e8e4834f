//! Operations changing the topology of a document.
//!
//! Inserting a node which belongs to another document inserts a deep copy of it; the original
//! node is not touched. A node of the same document is moved instead, wherever it currently is.

use tracing::debug;

use crate::{
    error::{Result, XmlError},
    tree::{Fragment, NodeId, Tree, XmlElementType},
};

use super::{check_insertable, document::Document, node::Proxy, ownership};

/// Get `node` ready to be linked below `context` in `doc`, and return the node to link.
///
/// The returned node is a detached root.
fn import(doc: &Document, node: &Proxy, context: NodeId) -> Result<NodeId> {
    if node.document() == doc {
        let mut tree = doc.tree_mut();
        if tree.is_ancestor_or_self(node.id(), context) {
            return Err(XmlError::HierarchyRequest(
                "cannot insert a node into itself or one of its descendants".into(),
            ));
        }
        ownership::detach(&mut tree, node.id());
        return Ok(node.id());
    }

    let fragment = {
        let src = node.document().tree();
        Fragment::extract(&src, node.id())
    };
    let mut tree = doc.tree_mut();
    let copy = fragment.materialize(&mut tree, Some(context));
    debug!(nodes = fragment.len(), "copied node from another document");
    Ok(copy)
}

/// Return the content of `node` if it is a text node.
fn text_of(node: &Proxy) -> Option<String> {
    let tree = node.document().tree();
    tree.typ(node.id())
        .is_text()
        .then(|| tree[node.id()].content.clone())
}

/// Only comments and processing instructions may join the root element at document level.
///
/// An element may still take the place of the root element.
fn check_document_level(
    tree: &Tree,
    parent: NodeId,
    typ: XmlElementType,
    replacing: Option<NodeId>,
) -> Result<()> {
    if tree.typ(parent) != XmlElementType::XmlDocumentNode {
        return Ok(());
    }
    match typ {
        XmlElementType::XmlCommentNode | XmlElementType::XmlPINode => Ok(()),
        XmlElementType::XmlElementNode
            if replacing.is_some_and(|old| tree.typ(old) == XmlElementType::XmlElementNode) =>
        {
            Ok(())
        }
        _ => Err(XmlError::HierarchyRequest(
            format!("{typ:?} cannot be a sibling of the root element").into(),
        )),
    }
}

fn require_parent(tree: &Tree, id: NodeId) -> Result<NodeId> {
    if tree.typ(id) == XmlElementType::XmlAttributeNode {
        return Err(XmlError::TypeMismatch("attributes have no siblings".into()));
    }
    tree.parent(id).ok_or(XmlError::NoParent)
}

pub(crate) fn remove(node: &Proxy) {
    let mut tree = node.document().tree_mut();
    ownership::detach(&mut tree, node.id());
}

pub(crate) fn clone_node(node: &Proxy) -> Proxy {
    let doc = node.document();
    let copy = {
        let mut tree = doc.tree_mut();
        let fragment = Fragment::extract(&tree, node.id());
        fragment.materialize(&mut tree, None)
    };
    doc.resolve(copy)
}

/// Allocate a detached node in `doc` and return its proxy.
pub(crate) fn create(doc: &Document, typ: XmlElementType, name: &str, content: &str) -> Proxy {
    let id = doc.tree_mut().alloc(typ, name, content);
    doc.resolve(id)
}

/// Append `child` to the children of `parent`.
///
/// A text node following a text node is merged into it.
pub(crate) fn add_child(parent: &Proxy, child: &Proxy) -> Result<()> {
    let doc = parent.document();
    check_insertable(&child.document().tree(), child.id())?;
    let same = child.document() == doc;

    if let Some(content) = text_of(child) {
        let mut tree = doc.tree_mut();
        if let Some(last) = tree.last_child(parent.id()) {
            if tree.typ(last).is_text() && !(same && last == child.id()) {
                tree.add_content(last, &content);
                return Ok(());
            }
        }
    }

    let id = import(doc, child, parent.id())?;
    let mut tree = doc.tree_mut();
    tree.append_child(parent.id(), id);
    let owner = tree.owner(parent.id());
    ownership::attach(&mut tree, id, owner);
    if same {
        tree.drop_redundant_ns(id);
    }
    Ok(())
}

/// Insert `new` right after (`after` is true) or right before `cur`.
///
/// A text node is merged into `cur` if it is a text node itself, or else into the adjacent
/// sibling on that side.
pub(crate) fn add_sibling(cur: &Proxy, new: &Proxy, after: bool) -> Result<()> {
    let doc = cur.document();
    let parent = require_parent(&doc.tree(), cur.id())?;
    check_insertable(&new.document().tree(), new.id())?;
    let typ = new.document().tree().typ(new.id());
    check_document_level(&doc.tree(), parent, typ, None)?;
    let same = new.document() == doc;
    if same && new.id() == cur.id() {
        return Err(XmlError::HierarchyRequest(
            "cannot insert a node as its own sibling".into(),
        ));
    }

    if let Some(content) = text_of(new) {
        let mut tree = doc.tree_mut();
        if tree.typ(cur.id()).is_text() {
            if after {
                tree.add_content(cur.id(), &content);
            } else {
                tree.prepend_content(cur.id(), &content);
            }
            return Ok(());
        }
        let adjacent = if after {
            tree.next_sibling(cur.id())
        } else {
            tree.prev_sibling(cur.id())
        };
        if let Some(adjacent) =
            adjacent.filter(|&a| tree.typ(a).is_text() && !(same && a == new.id()))
        {
            if after {
                tree.prepend_content(adjacent, &content);
            } else {
                tree.add_content(adjacent, &content);
            }
            return Ok(());
        }
    }

    let id = import(doc, new, parent)?;
    let mut tree = doc.tree_mut();
    if after {
        tree.insert_after(cur.id(), id);
    } else {
        tree.insert_before(cur.id(), id);
    }
    let owner = tree.owner(cur.id());
    ownership::attach(&mut tree, id, owner);
    if same {
        tree.drop_redundant_ns(id);
    }
    Ok(())
}

/// Put `new` at the place of `old`. `old` becomes a detached root.
pub(crate) fn replace(old: &Proxy, new: &Proxy) -> Result<()> {
    let doc = old.document();
    let parent = require_parent(&doc.tree(), old.id())?;
    check_insertable(&new.document().tree(), new.id())?;
    let typ = new.document().tree().typ(new.id());
    check_document_level(&doc.tree(), parent, typ, Some(old.id()))?;
    let same = new.document() == doc;
    if same && new.id() == old.id() {
        return Ok(());
    }
    let id = import(doc, new, parent)?;
    let mut tree = doc.tree_mut();
    put_in_place_of(&mut tree, old.id(), id);
    if same {
        tree.drop_redundant_ns(id);
    }
    Ok(())
}

/// Put a new text node at the place of `old`. `old` becomes a detached root.
pub(crate) fn replace_text(old: &Proxy, content: &str) -> Result<()> {
    let doc = old.document();
    let mut tree = doc.tree_mut();
    let parent = require_parent(&tree, old.id())?;
    check_document_level(&tree, parent, XmlElementType::XmlTextNode, Some(old.id()))?;
    let text = tree.alloc(XmlElementType::XmlTextNode, "", content);
    put_in_place_of(&mut tree, old.id(), text);
    Ok(())
}

fn put_in_place_of(tree: &mut Tree, old: NodeId, new: NodeId) {
    tree.insert_before(old, new);
    let owner = tree.owner(old);
    ownership::attach(tree, new, owner);
    ownership::detach(tree, old);
    ownership::release_if_unpinned(tree, old);
}

/// Replace every child of `elem` with a single text node holding `content`.
///
/// Former children become detached roots, released at once unless a proxy refers into them.
pub(crate) fn set_text(elem: &Proxy, content: &str) {
    let doc = elem.document();
    let mut tree = doc.tree_mut();
    let id = elem.id();
    if tree.typ(id) != XmlElementType::XmlElementNode {
        tree[id].content = content.to_owned();
        return;
    }

    let children = tree.children(id).collect::<Vec<_>>();
    let mut released = 0;
    for child in children {
        released += ownership::detach(&mut tree, child);
        released += ownership::release_if_unpinned(&mut tree, child);
    }
    if released > 0 {
        debug!(released, "released overwritten children");
    }
    if !content.is_empty() {
        let text = tree.alloc(XmlElementType::XmlTextNode, "", content);
        tree.append_child(id, text);
        let owner = tree.owner(id);
        ownership::attach(&mut tree, text, owner);
    }
}

/// Append a CDATA section to `elem`. CDATA sections are never merged.
pub(crate) fn add_cdata(elem: &Proxy, content: &str) {
    let mut tree = elem.document().tree_mut();
    let cdata = tree.alloc(XmlElementType::XmlCDATASectionNode, "", content);
    tree.append_child(elem.id(), cdata);
    let owner = tree.owner(elem.id());
    ownership::attach(&mut tree, cdata, owner);
}

/// Make `elem` the root element of `doc`.
pub(crate) fn set_root(doc: &Document, elem: &Proxy) -> Result<NodeId> {
    let root = doc.tree().document();
    if doc.tree().root_element().is_some() {
        return Err(XmlError::RootExists);
    }
    if elem.document().tree().typ(elem.id()) != XmlElementType::XmlElementNode {
        return Err(XmlError::TypeMismatch("the root must be an element".into()));
    }
    let id = import(doc, elem, root)?;
    let mut tree = doc.tree_mut();
    tree.append_child(root, id);
    ownership::attach(&mut tree, id, root);
    Ok(id)
}

/// Split a qualified name into its prefix and local part.
pub(crate) fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, name),
    }
}

/// Find the attribute `name` of `elem`.
///
/// A qualified name matches the attribute bound to the namespace its prefix resolves to.
/// Otherwise, the first attribute with this local name matches.
pub(crate) fn find_attribute(tree: &Tree, elem: NodeId, name: &str) -> Option<NodeId> {
    let attrs = tree.attributes(elem);
    attrs
        .iter()
        .copied()
        .find(|&a| tree.qname(a) == name)
        .or_else(|| attrs.iter().copied().find(|&a| tree[a].name == name))
}

pub(crate) fn set_attribute(elem: &Proxy, name: &str, value: &str) -> Result<NodeId> {
    if name.is_empty() {
        return Err(XmlError::InvalidArgument("attribute name is empty".into()));
    }
    let mut tree = elem.document().tree_mut();
    let id = elem.id();
    let (prefix, local) = split_qname(name);
    let ns = prefix.and_then(|p| tree.search_ns(id, Some(p)));
    let local = if ns.is_some() { local } else { name };
    let href = ns.map(|ns| tree.ns_href(ns).to_owned());

    let existing = tree.attributes(id).iter().copied().find(|&a| {
        tree[a].name == local && tree[a].ns.map(|ns| tree.ns_href(ns)) == href.as_deref()
    });
    if let Some(attr) = existing {
        tree[attr].content = value.to_owned();
        return Ok(attr);
    }
    let attr = tree.alloc(XmlElementType::XmlAttributeNode, local, value);
    tree[attr].ns = ns;
    tree.append_attribute(id, attr);
    let owner = tree.owner(id);
    ownership::attach(&mut tree, attr, owner);
    Ok(attr)
}

/// Declare `prefix` bound to `href` on `elem`, reusing an identical declaration made there.
pub(crate) fn define_namespace(
    tree: &mut Tree,
    elem: NodeId,
    prefix: Option<&str>,
    href: &str,
) -> Result<NodeId> {
    match tree.local_ns(elem, prefix) {
        Some(ns) if tree.ns_href(ns) == href => Ok(ns),
        Some(ns) => Err(XmlError::NamespaceConflict {
            prefix: prefix.unwrap_or_default().to_owned(),
            href: tree.ns_href(ns).to_owned(),
        }),
        None => Ok(tree.new_ns(elem, prefix, href)),
    }
}

/// Bind `elem` to `href`, reusing a declaration in scope if one binds `prefix` to it.
pub(crate) fn set_namespace(
    tree: &mut Tree,
    elem: NodeId,
    prefix: Option<&str>,
    href: &str,
) -> Result<NodeId> {
    let ns = match tree.search_ns_pair(elem, prefix, href) {
        Some(ns) => ns,
        None => define_namespace(tree, elem, prefix, href)?,
    };
    tree[elem].ns = Some(ns);
    Ok(ns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_qualified_names() {
        assert_eq!(split_qname("p:a"), (Some("p"), "a"));
        assert_eq!(split_qname("a"), (None, "a"));
        assert_eq!(split_qname(":a"), (None, ":a"));
        assert_eq!(split_qname("a:"), (None, "a:"));
    }

    #[test]
    fn define_namespace_dedups_on_the_element() {
        let mut tree = Tree::new();
        let elem = tree.alloc(XmlElementType::XmlElementNode, "e", "");
        let first = define_namespace(&mut tree, elem, Some("p"), "urn:p").unwrap();
        let again = define_namespace(&mut tree, elem, Some("p"), "urn:p").unwrap();
        assert_eq!(first, again);
        assert_eq!(tree.ns_defs(elem).len(), 1);
        assert!(matches!(
            define_namespace(&mut tree, elem, Some("p"), "urn:other"),
            Err(XmlError::NamespaceConflict { .. })
        ));
    }

    #[test]
    fn set_namespace_reuses_inherited_declarations() {
        let mut tree = Tree::new();
        let root = tree.alloc(XmlElementType::XmlElementNode, "root", "");
        let child = tree.alloc(XmlElementType::XmlElementNode, "child", "");
        tree.append_child(root, child);
        let decl = tree.new_ns(root, None, "urn:d");
        assert_eq!(set_namespace(&mut tree, child, None, "urn:d").unwrap(), decl);
        assert!(tree.ns_defs(child).is_empty());
        let other = set_namespace(&mut tree, child, None, "urn:e").unwrap();
        assert_eq!(tree.ns_defs(child), &[other]);
    }
}
