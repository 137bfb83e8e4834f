use super::{NodeId, Tree, XmlElementType};

/// Iterator over the children of a node.
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl<'a> Children<'a> {
    pub(super) fn new(tree: &'a Tree, parent: NodeId) -> Self {
        Self {
            tree,
            next: tree.first_child(parent),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        self.next = self.tree.next_sibling(cur);
        Some(cur)
    }
}

impl Tree {
    /// Return the prefix of a namespace declaration, `None` for a default declaration.
    pub fn ns_prefix(&self, ns: NodeId) -> Option<&str> {
        let name = self[ns].name.as_str();
        (!name.is_empty()).then_some(name)
    }

    pub fn ns_href(&self, ns: NodeId) -> &str {
        &self[ns].content
    }

    /// Return the qualified name of an element or an attribute.
    ///
    /// For other nodes, this is the name libxml2 would give them.
    pub fn qname(&self, id: NodeId) -> String {
        let data = &self[id];
        match data.typ {
            XmlElementType::XmlElementNode | XmlElementType::XmlAttributeNode => {
                match data.ns.and_then(|ns| self.ns_prefix(ns)) {
                    Some(prefix) => format!("{prefix}:{}", data.name),
                    None => data.name.clone(),
                }
            }
            XmlElementType::XmlTextNode => "text".to_owned(),
            XmlElementType::XmlCDATASectionNode => "cdata".to_owned(),
            XmlElementType::XmlCommentNode => "comment".to_owned(),
            XmlElementType::XmlPINode => data.name.clone(),
            XmlElementType::XmlDocumentNode => String::new(),
            XmlElementType::XmlNamespaceDecl => data.name.clone(),
        }
    }

    /// Return the text content of a node.
    ///
    /// For an element, this is the concatenation of the text and CDATA of its descendants.
    pub fn content(&self, id: NodeId) -> String {
        match self[id].typ {
            XmlElementType::XmlElementNode | XmlElementType::XmlDocumentNode => {
                let mut buf = String::new();
                self.collect_content(id, &mut buf);
                buf
            }
            _ => self[id].content.clone(),
        }
    }

    fn collect_content(&self, id: NodeId, buf: &mut String) {
        for child in self.children(id) {
            match self[child].typ {
                XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode => {
                    buf.push_str(&self[child].content)
                }
                XmlElementType::XmlElementNode => self.collect_content(child, buf),
                _ => {}
            }
        }
    }

    pub(crate) fn add_content(&mut self, id: NodeId, content: &str) {
        self[id].content.push_str(content);
    }

    pub(crate) fn prepend_content(&mut self, id: NodeId, content: &str) {
        self[id].content.insert_str(0, content);
    }

    pub fn next_element(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(sibling) = cur {
            if self.typ(sibling) == XmlElementType::XmlElementNode {
                return Some(sibling);
            }
            cur = self.next_sibling(sibling);
        }
        None
    }

    pub fn prev_element(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.prev_sibling(id);
        while let Some(sibling) = cur {
            if self.typ(sibling) == XmlElementType::XmlElementNode {
                return Some(sibling);
            }
            cur = self.prev_sibling(sibling);
        }
        None
    }

    /// Whether `a` and `b` would be selected by the same path step.
    fn same_step(&self, a: NodeId, b: NodeId) -> bool {
        let (a, b) = (&self[a], &self[b]);
        match (a.typ, b.typ) {
            (XmlElementType::XmlElementNode, XmlElementType::XmlElementNode) => {
                a.name == b.name
                    && a.ns.map(|ns| self.ns_href(ns)) == b.ns.map(|ns| self.ns_href(ns))
            }
            (
                XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode,
                XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode,
            ) => true,
            (XmlElementType::XmlCommentNode, XmlElementType::XmlCommentNode) => true,
            (XmlElementType::XmlPINode, XmlElementType::XmlPINode) => a.name == b.name,
            _ => false,
        }
    }

    /// Build a structure based path for a node, such as `/root/child[1]/grandchild`.
    ///
    /// Positions are only written when a node has siblings that would match the same step.
    pub fn node_path(&self, id: NodeId) -> String {
        let mut steps = vec![];
        let mut cur = Some(id);
        while let Some(node) = cur {
            let data = &self[node];
            let mut step = match data.typ {
                XmlElementType::XmlDocumentNode => break,
                XmlElementType::XmlElementNode => format!("/{}", self.qname(node)),
                XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode => {
                    "/text()".to_owned()
                }
                XmlElementType::XmlCommentNode => "/comment()".to_owned(),
                XmlElementType::XmlPINode => format!("/processing-instruction('{}')", data.name),
                XmlElementType::XmlAttributeNode => format!("/@{}", self.qname(node)),
                XmlElementType::XmlNamespaceDecl => "/namespace::*".to_owned(),
            };

            if data.typ.is_child() {
                let mut before = 0;
                let mut p = data.prev;
                while let Some(s) = p {
                    before += self.same_step(node, s) as usize;
                    p = self[s].prev;
                }
                let mut after = 0;
                let mut n = data.next;
                while let Some(s) = n {
                    after += self.same_step(node, s) as usize;
                    n = self[s].next;
                }
                if before + after > 0 {
                    step.push_str(&format!("[{}]", before + 1));
                }
            }
            steps.push(step);
            cur = data.parent;
        }
        steps.reverse();
        steps.concat()
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::{Tree, XmlElementType};

    #[test]
    fn path_numbers_only_ambiguous_steps() {
        let mut tree = Tree::new();
        let doc = tree.document();
        let root = tree.alloc(XmlElementType::XmlElementNode, "root", "");
        let c1 = tree.alloc(XmlElementType::XmlElementNode, "child", "");
        let c2 = tree.alloc(XmlElementType::XmlElementNode, "child", "");
        let g = tree.alloc(XmlElementType::XmlElementNode, "grandchild", "");
        let t = tree.alloc(XmlElementType::XmlTextNode, "", "x");
        tree.append_child(doc, root);
        tree.append_child(root, c1);
        tree.append_child(root, c2);
        tree.append_child(c1, g);
        tree.append_child(g, t);

        assert_eq!(tree.node_path(root), "/root");
        assert_eq!(tree.node_path(g), "/root/child[1]/grandchild");
        assert_eq!(tree.node_path(c2), "/root/child[2]");
        assert_eq!(tree.node_path(t), "/root/child[1]/grandchild/text()");
    }

    #[test]
    fn content_concatenates_descendant_text() {
        let mut tree = Tree::new();
        let root = tree.alloc(XmlElementType::XmlElementNode, "root", "");
        let a = tree.alloc(XmlElementType::XmlTextNode, "", "a");
        let e = tree.alloc(XmlElementType::XmlElementNode, "e", "");
        let b = tree.alloc(XmlElementType::XmlCDATASectionNode, "", "b");
        let c = tree.alloc(XmlElementType::XmlCommentNode, "", "ignored");
        tree.append_child(root, a);
        tree.append_child(root, e);
        tree.append_child(e, b);
        tree.append_child(root, c);
        assert_eq!(tree.content(root), "ab");
        assert_eq!(tree.content(c), "ignored");
    }
}
