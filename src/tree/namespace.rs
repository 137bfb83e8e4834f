use super::{NodeId, Tree, XmlElementType};

impl Tree {
    /// Search the declaration bound to `prefix` in scope at `node`.
    ///
    /// `None` as prefix looks for the default namespace. The `xml` prefix always resolves to
    /// the declaration held by the document node.
    pub fn search_ns(&self, node: NodeId, prefix: Option<&str>) -> Option<NodeId> {
        if prefix == Some("xml") {
            return Some(self.xml_ns());
        }
        let mut cur = Some(node);
        while let Some(id) = cur {
            if let Some(&ns) = self[id]
                .ns_def
                .iter()
                .find(|&&ns| self.ns_prefix(ns) == prefix)
            {
                return Some(ns);
            }
            cur = self.parent(id);
        }
        None
    }

    /// Search an in-scope declaration binding exactly `prefix` to `href`.
    ///
    /// A declaration shadowed by a nearer one with the same prefix does not match.
    pub fn search_ns_pair(
        &self,
        node: NodeId,
        prefix: Option<&str>,
        href: &str,
    ) -> Option<NodeId> {
        self.search_ns(node, prefix)
            .filter(|&ns| self.ns_href(ns) == href)
    }

    /// Search the declarations made directly on `node` for `prefix`.
    pub fn local_ns(&self, node: NodeId, prefix: Option<&str>) -> Option<NodeId> {
        self[node]
            .ns_def
            .iter()
            .copied()
            .find(|&ns| self.ns_prefix(ns) == prefix)
    }

    /// Collect the declarations in scope at `node`, nearest first.
    ///
    /// A declaration is omitted when a nearer one uses the same prefix.
    /// The implicit declaration of the `xml` prefix is not listed.
    pub fn in_scope_ns(&self, node: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = vec![];
        let mut cur = Some(node);
        while let Some(id) = cur {
            if self.typ(id) == XmlElementType::XmlDocumentNode {
                break;
            }
            for &ns in &self[id].ns_def {
                let prefix = self.ns_prefix(ns);
                if out.iter().all(|&seen| self.ns_prefix(seen) != prefix) {
                    out.push(ns);
                }
            }
            cur = self.parent(id);
        }
        out
    }

    /// Declare `prefix` bound to `href` on `node`.
    ///
    /// The caller is responsible for checking that the prefix is not declared on `node` yet.
    pub(crate) fn new_ns(&mut self, node: NodeId, prefix: Option<&str>, href: &str) -> NodeId {
        let ns = self.alloc(XmlElementType::XmlNamespaceDecl, prefix.unwrap_or(""), href);
        self[ns].owner = self[node].owner;
        self.append_ns_def(node, ns);
        ns
    }

    /// Find a prefix not declared on `node`, starting from `base`.
    pub(crate) fn unused_prefix(&self, node: NodeId, base: &str) -> String {
        (0..)
            .map(|i| format!("{base}{i}"))
            .find(|p| self.local_ns(node, Some(p)).is_none())
            .unwrap_or_else(|| base.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::{Tree, XmlElementType};

    #[test]
    fn nearer_declarations_shadow_farther_ones() {
        let mut tree = Tree::new();
        let root = tree.alloc(XmlElementType::XmlElementNode, "root", "");
        let child = tree.alloc(XmlElementType::XmlElementNode, "child", "");
        tree.append_child(tree.document(), root);
        tree.append_child(root, child);
        let outer = tree.new_ns(root, Some("p"), "urn:outer");
        let default = tree.new_ns(root, None, "urn:default");
        let inner = tree.new_ns(child, Some("p"), "urn:inner");

        assert_eq!(tree.search_ns(child, Some("p")), Some(inner));
        assert_eq!(tree.search_ns(child, None), Some(default));
        assert_eq!(tree.search_ns(root, Some("p")), Some(outer));
        assert_eq!(tree.search_ns(child, Some("xml")), Some(tree.xml_ns()));
        assert_eq!(tree.search_ns_pair(child, Some("p"), "urn:outer"), None);
        assert_eq!(tree.in_scope_ns(child), vec![inner, default]);
        assert_eq!(tree.local_ns(child, None), None);
    }

    #[test]
    fn unused_prefix_skips_declared_ones() {
        let mut tree = Tree::new();
        let root = tree.alloc(XmlElementType::XmlElementNode, "root", "");
        tree.new_ns(root, Some("ns0"), "urn:a");
        assert_eq!(tree.unused_prefix(root, "ns"), "ns1");
    }
}
