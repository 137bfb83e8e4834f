//! Owning roots and pin counts.
//!
//! Every node records its owning root. The root of the document tree is the document node,
//! which is only released together with the whole arena. Any other root is the top of a
//! detached subtree, released as soon as no proxy pins it anymore.
//!
//! Pins are counted per owning root: a root's `pins` is the sum of the live proxies of the
//! nodes it owns. Moving a subtree to another owner moves its share of pins with it.

use tracing::debug;

use crate::tree::{NodeId, Tree};

/// Count one more live proxy for `id`.
pub(crate) fn pin(tree: &mut Tree, id: NodeId) {
    tree[id].proxies += 1;
    let root = tree.owner(id);
    tree[root].pins += 1;
}

/// Count one less live proxy for `id`, releasing its subtree if it was the last pin of a
/// detached root.
///
/// Return the number of released nodes.
pub(crate) fn unpin(tree: &mut Tree, id: NodeId) -> usize {
    tree[id].proxies = tree[id].proxies.saturating_sub(1);
    let root = tree.owner(id);
    tree[root].pins = tree[root].pins.saturating_sub(1);
    release_if_unpinned(tree, root)
}

/// Release the subtree of `root` if it is a detached root nobody pins.
pub(crate) fn release_if_unpinned(tree: &mut Tree, root: NodeId) -> usize {
    if root == tree.document() || tree.owner(root) != root || tree[root].pins > 0 {
        return 0;
    }
    let released = tree.release(root);
    debug!(root = ?root, released, "released detached subtree");
    released
}

/// Make `root` the owner of its whole subtree and return the number of pins it took over.
fn reown(tree: &mut Tree, root: NodeId) -> usize {
    let mut pins = 0;
    for id in tree.subtree(root) {
        pins += tree[id].proxies;
        tree[id].owner = root;
    }
    tree[root].pins = pins;
    pins
}

/// Unlink `id` from its parent and make it the owning root of its subtree.
///
/// Nothing is released for `id` itself, even if no proxy pins it: the caller decides whether
/// the node is about to be linked somewhere else or dropped with
/// [`release_if_unpinned`]. The former owner is released if it is left unpinned.
///
/// Return the number of nodes released that way.
pub(crate) fn detach(tree: &mut Tree, id: NodeId) -> usize {
    let old = tree.owner(id);
    if old == id {
        return 0;
    }
    tree.unlink(id);
    tree.reconcile_removed(id);
    let moved = reown(tree, id);
    tree[old].pins = tree[old].pins.saturating_sub(moved);
    release_if_unpinned(tree, old)
}

/// Hand the detached subtree rooted at `id` over to `owner`, after it was linked below a node
/// owned by `owner`.
pub(crate) fn attach(tree: &mut Tree, id: NodeId, owner: NodeId) {
    let pins = tree[id].pins;
    for node in tree.subtree(id) {
        tree[node].owner = owner;
    }
    tree[id].pins = 0;
    tree[owner].pins += pins;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::XmlElementType;

    fn build() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let doc = tree.document();
        let root = tree.alloc(XmlElementType::XmlElementNode, "root", "");
        let child = tree.alloc(XmlElementType::XmlElementNode, "child", "");
        let leaf = tree.alloc(XmlElementType::XmlTextNode, "", "leaf");
        tree.append_child(doc, root);
        attach(&mut tree, root, doc);
        tree.append_child(root, child);
        attach(&mut tree, child, doc);
        tree.append_child(child, leaf);
        attach(&mut tree, leaf, doc);
        (tree, root, child, leaf)
    }

    #[test]
    fn detached_subtree_is_released_after_its_last_pin() {
        let (mut tree, _, child, leaf) = build();
        let doc = tree.document();
        pin(&mut tree, leaf);
        pin(&mut tree, child);
        assert_eq!(tree[doc].pins, 2);

        assert_eq!(detach(&mut tree, child), 0);
        assert_eq!(tree.owner(leaf), child);
        assert_eq!(tree[child].pins, 2);
        assert_eq!(tree[doc].pins, 0);

        assert_eq!(unpin(&mut tree, child), 0);
        assert!(tree.contains(leaf));
        assert_eq!(unpin(&mut tree, leaf), 2);
        assert!(!tree.contains(leaf));
        assert!(!tree.contains(child));
    }

    #[test]
    fn attached_nodes_are_never_released_by_unpinning() {
        let (mut tree, root, _, _) = build();
        pin(&mut tree, root);
        assert_eq!(unpin(&mut tree, root), 0);
        assert!(tree.contains(root));
    }

    #[test]
    fn nested_detach_releases_the_unpinned_former_root() {
        let (mut tree, _, child, leaf) = build();
        pin(&mut tree, leaf);
        detach(&mut tree, child);
        // `child` is only kept by the pin of `leaf`, which now moves out
        assert_eq!(detach(&mut tree, leaf), 1);
        assert!(!tree.contains(child));
        assert_eq!(tree.owner(leaf), leaf);
        assert_eq!(unpin(&mut tree, leaf), 1);
    }

    #[test]
    fn attach_moves_pins_to_the_new_owner() {
        let (mut tree, root, child, leaf) = build();
        let doc = tree.document();
        pin(&mut tree, leaf);
        detach(&mut tree, child);
        tree.append_child(root, child);
        attach(&mut tree, child, doc);
        assert_eq!(tree.owner(leaf), doc);
        assert_eq!(tree[doc].pins, 1);
        assert_eq!(tree[child].pins, 0);
        assert_eq!(unpin(&mut tree, leaf), 0);
        assert!(tree.contains(leaf));
    }
}
