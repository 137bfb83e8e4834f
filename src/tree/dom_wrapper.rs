//! Namespace bookkeeping for nodes leaving their tree, and deep copies between arenas.

use std::collections::{HashMap, HashSet};

use super::{NodeId, Tree, XmlElementType};

impl Tree {
    /// Make the namespace references of a just unlinked subtree self-contained.
    ///
    /// Elements and attributes of the subtree that are bound to a declaration made outside of
    /// it are rebound to an equivalent declaration on `root`, which is created if needed.
    /// The `xml` declaration of the document node is always in scope and left alone.
    pub(crate) fn reconcile_removed(&mut self, root: NodeId) {
        let nodes = self.subtree(root);
        let inside = nodes.iter().copied().collect::<HashSet<_>>();
        let mut moved = HashMap::<NodeId, NodeId>::new();
        for id in nodes {
            if !matches!(
                self[id].typ,
                XmlElementType::XmlElementNode | XmlElementType::XmlAttributeNode
            ) {
                continue;
            }
            let Some(ns) = self[id].ns else {
                continue;
            };
            if ns == self.xml_ns() || inside.contains(&ns) {
                continue;
            }
            let new = match moved.get(&ns) {
                Some(&new) => new,
                None => {
                    let prefix = self.ns_prefix(ns).map(str::to_owned);
                    let href = self.ns_href(ns).to_owned();
                    let new = self.declare_on(root, prefix.as_deref(), &href);
                    moved.insert(ns, new);
                    new
                }
            };
            self[id].ns = Some(new);
        }
    }

    /// Drop the declarations of a just linked `root` that repeat one already in scope at its
    /// parent, rebinding their users to the outer declaration.
    ///
    /// Declarations some proxy still refers to are kept. Return the number of dropped ones.
    pub(crate) fn drop_redundant_ns(&mut self, root: NodeId) -> usize {
        let Some(parent) = self.parent(root) else {
            return 0;
        };
        let mut redundant = vec![];
        for &decl in &self[root].ns_def {
            if self[decl].proxies > 0 {
                continue;
            }
            if let Some(outer) =
                self.search_ns_pair(parent, self.ns_prefix(decl), self.ns_href(decl))
            {
                redundant.push((decl, outer));
            }
        }
        if redundant.is_empty() {
            return 0;
        }

        for id in self.subtree(root) {
            if let Some(&(_, outer)) = redundant
                .iter()
                .find(|(decl, _)| self[id].ns == Some(*decl))
            {
                self[id].ns = Some(outer);
            }
        }
        for &(decl, _) in &redundant {
            self[root].ns_def.retain(|&ns| ns != decl);
            self.release(decl);
        }
        redundant.len()
    }

    /// Return a declaration of `prefix` bound to `href` made on `node`.
    ///
    /// If `node` already declares `prefix` for another namespace, a generated prefix is used.
    fn declare_on(&mut self, node: NodeId, prefix: Option<&str>, href: &str) -> NodeId {
        match self.local_ns(node, prefix) {
            Some(ns) if self.ns_href(ns) == href => ns,
            Some(_) => {
                let prefix = self.unused_prefix(node, "ns");
                self.new_ns(node, Some(&prefix), href)
            }
            None => self.new_ns(node, prefix, href),
        }
    }
}

/// An owned deep copy of a subtree, detached from any arena.
///
/// Extracting a fragment never modifies the source tree.
/// Namespace bindings are kept by value and resolved again when the fragment is materialized.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    typ: XmlElementType,
    name: String,
    content: String,
    line: usize,
    ns: Option<(Option<String>, String)>,
    ns_def: Vec<(Option<String>, String)>,
    properties: Vec<Fragment>,
    children: Vec<Fragment>,
}

impl Fragment {
    pub(crate) fn extract(tree: &Tree, id: NodeId) -> Self {
        let data = &tree[id];
        let binding = |ns: NodeId| (tree.ns_prefix(ns).map(str::to_owned), tree.ns_href(ns).to_owned());
        Self {
            typ: data.typ,
            name: data.name.clone(),
            content: data.content.clone(),
            line: data.line,
            ns: data.ns.map(binding),
            ns_def: data.ns_def.iter().map(|&ns| binding(ns)).collect(),
            properties: data
                .properties
                .iter()
                .map(|&attr| Self::extract(tree, attr))
                .collect(),
            children: tree
                .children(id)
                .map(|child| Self::extract(tree, child))
                .collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        1 + self.ns_def.len()
            + self.properties.iter().map(Self::len).sum::<usize>()
            + self.children.iter().map(Self::len).sum::<usize>()
    }

    /// Build the fragment in `tree` as a new detached subtree and return its root.
    ///
    /// `context` is the node the result is about to be linked under, if any. Namespaces already
    /// declared there are reused instead of being declared again on the copy.
    pub(crate) fn materialize(&self, tree: &mut Tree, context: Option<NodeId>) -> NodeId {
        let root = tree.alloc(self.typ, self.name.as_str(), self.content.as_str());
        self.fill(tree, root, root, context);
        root
    }

    fn fill(&self, tree: &mut Tree, id: NodeId, root: NodeId, context: Option<NodeId>) {
        tree[id].line = self.line;
        tree[id].owner = root;
        for (prefix, href) in &self.ns_def {
            tree.declare_on(id, prefix.as_deref(), href);
        }
        if let Some((prefix, href)) = &self.ns {
            let ns = bind(tree, id, root, context, prefix.as_deref(), href);
            tree[id].ns = Some(ns);
        }
        for attr in &self.properties {
            let new = tree.alloc(attr.typ, attr.name.as_str(), attr.content.as_str());
            tree.append_attribute(id, new);
            attr.fill(tree, new, root, context);
        }
        for child in &self.children {
            let new = tree.alloc(child.typ, child.name.as_str(), child.content.as_str());
            tree.append_child(id, new);
            child.fill(tree, new, root, context);
        }
    }
}

fn bind(
    tree: &mut Tree,
    node: NodeId,
    root: NodeId,
    context: Option<NodeId>,
    prefix: Option<&str>,
    href: &str,
) -> NodeId {
    let holder = match tree.typ(node) {
        XmlElementType::XmlAttributeNode if node != root => tree.parent(node).unwrap_or(node),
        _ => node,
    };
    match tree.search_ns(node, prefix) {
        Some(ns) if tree.ns_href(ns) == href => ns,
        Some(_) => tree.declare_on(holder, prefix, href),
        None => context
            .and_then(|ctx| tree.search_ns_pair(ctx, prefix, href))
            .unwrap_or_else(|| tree.declare_on(root, prefix, href)),
    }
}
