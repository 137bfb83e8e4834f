//! Provide the node arena backing every document.
//!
//! Nodes live in slots of a [`Tree`] and are addressed by [`NodeId`].
//! A node never points to another node by reference; the structural links (parent, children,
//! siblings, attributes, namespace declarations) are all indices into the same arena.
//!
//! Each node also records its owning root: the document node while it is reachable from the
//! document, or the topmost node of the detached subtree it belongs to.
//! The bookkeeping that keeps owners and pin counts consistent lives in
//! [`dom::ownership`](crate::dom).

mod dom_wrapper;
mod namespace;
mod node;

use std::{any::type_name, cell::Cell, num::NonZeroU32, ops::Index, ops::IndexMut};

pub(crate) use dom_wrapper::Fragment;
pub use node::Children;

thread_local! {
    static LIVE_NODES: Cell<usize> = const { Cell::new(0) };
}

/// Return the number of nodes currently allocated on this thread.
///
/// Every document arena, including its document node, contributes to this counter until the
/// slots are released. It returns to zero once every document and every proxy is gone and
/// pending finalizers have been collected.
pub fn live_nodes() -> usize {
    LIVE_NODES.with(|n| n.get())
}

fn count_alloc() {
    LIVE_NODES.try_with(|n| n.set(n.get() + 1)).ok();
}

fn count_free(num: usize) {
    // Trees may be dropped while thread locals are torn down.
    LIVE_NODES
        .try_with(|n| n.set(n.get().saturating_sub(num)))
        .ok();
}

pub const XML_XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Index of a node slot in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index as u32))
    }

    fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

/// The type of a node stored in a [`Tree`].
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlElementType {
    XmlElementNode = 1,
    XmlAttributeNode = 2,
    XmlTextNode = 3,
    XmlCDATASectionNode = 4,
    XmlPINode = 7,
    XmlCommentNode = 8,
    XmlDocumentNode = 9,
    XmlNamespaceDecl = 18,
}

impl TryFrom<i32> for XmlElementType {
    type Error = anyhow::Error;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::XmlElementNode),
            2 => Ok(Self::XmlAttributeNode),
            3 => Ok(Self::XmlTextNode),
            4 => Ok(Self::XmlCDATASectionNode),
            7 => Ok(Self::XmlPINode),
            8 => Ok(Self::XmlCommentNode),
            9 => Ok(Self::XmlDocumentNode),
            18 => Ok(Self::XmlNamespaceDecl),
            _ => Err(anyhow::anyhow!(
                "Invalid convert from value '{value}' to {}",
                type_name::<Self>()
            )),
        }
    }
}

impl XmlElementType {
    pub fn is_text(self) -> bool {
        matches!(self, Self::XmlTextNode)
    }

    /// Whether nodes of this type appear in a children list.
    pub fn is_child(self) -> bool {
        matches!(
            self,
            Self::XmlElementNode
                | Self::XmlTextNode
                | Self::XmlCDATASectionNode
                | Self::XmlPINode
                | Self::XmlCommentNode
        )
    }
}

/// One slot of the arena.
///
/// The meaning of `name` and `content` depends on `typ`:
///
/// | type             | name                   | content          |
/// |------------------|------------------------|------------------|
/// | element          | local name             | unused           |
/// | attribute        | local name             | value            |
/// | text, CDATA      | unused                 | text             |
/// | comment          | unused                 | text             |
/// | PI               | target                 | data             |
/// | namespace decl   | prefix (empty: none)   | href             |
#[derive(Debug, Clone)]
pub struct NodeData {
    pub(crate) typ: XmlElementType,
    pub(crate) name: String,
    pub(crate) content: String,
    /// Namespace declaration this element or attribute is bound to.
    pub(crate) ns: Option<NodeId>,
    /// Namespace declarations made on this node.
    pub(crate) ns_def: Vec<NodeId>,
    pub(crate) properties: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Option<NodeId>,
    pub(crate) last: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    /// Owning root. A node is a root exactly when `owner` is itself.
    pub(crate) owner: NodeId,
    /// Live proxies counted against this node while it is an owning root.
    pub(crate) pins: usize,
    /// Live proxies of this very node.
    pub(crate) proxies: usize,
    pub(crate) line: usize,
}

/// An arena of nodes with a document node at its base.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Option<NodeData>>,
    free: Vec<NodeId>,
    doc: NodeId,
    xml_ns: NodeId,
}

impl Tree {
    /// Create an arena holding only the document node and its implicit `xml` declaration.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: vec![],
            free: vec![],
            doc: NodeId::from_index(0),
            xml_ns: NodeId::from_index(0),
        };
        tree.doc = tree.alloc(XmlElementType::XmlDocumentNode, "", "");
        tree.xml_ns = tree.alloc(XmlElementType::XmlNamespaceDecl, "xml", XML_XML_NAMESPACE);
        let (doc, xml_ns) = (tree.doc, tree.xml_ns);
        tree[xml_ns].parent = Some(doc);
        tree[xml_ns].owner = doc;
        tree[doc].ns_def.push(xml_ns);
        tree
    }

    pub fn document(&self) -> NodeId {
        self.doc
    }

    /// The declaration of the `xml` prefix held by the document node.
    pub fn xml_ns(&self) -> NodeId {
        self.xml_ns
    }

    /// Allocate a new node. It starts as its own owning root.
    pub(crate) fn alloc(
        &mut self,
        typ: XmlElementType,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> NodeId {
        let id = self
            .free
            .pop()
            .unwrap_or_else(|| NodeId::from_index(self.nodes.len()));
        let data = NodeData {
            typ,
            name: name.into(),
            content: content.into(),
            ns: None,
            ns_def: vec![],
            properties: vec![],
            parent: None,
            children: None,
            last: None,
            next: None,
            prev: None,
            owner: id,
            pins: 0,
            proxies: 0,
            line: 0,
        };
        if id.index() == self.nodes.len() {
            self.nodes.push(Some(data));
        } else {
            self.nodes[id.index()] = Some(data);
        }
        count_alloc();
        id
    }

    /// Whether `id` still designates an allocated slot.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|n| n.is_some())
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn typ(&self, id: NodeId) -> XmlElementType {
        self[id].typ
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self[id].children
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self[id].last
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self[id].next
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self[id].prev
    }

    pub fn owner(&self, id: NodeId) -> NodeId {
        self[id].owner
    }

    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        &self[id].properties
    }

    pub fn ns_defs(&self, id: NodeId) -> &[NodeId] {
        &self[id].ns_def
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children::new(self, id)
    }

    /// The root element, that is the first element child of the document node.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.doc)
            .find(|&c| self.typ(c) == XmlElementType::XmlElementNode)
    }

    /// Whether `ancestor` is `id` itself or one of its ancestors.
    ///
    /// Attributes and namespace declarations count their element as parent.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self[id].parent {
                Some(p) => id = p,
                None => return false,
            }
        }
    }

    /// Collect `root` and every node below it in document order:
    /// a node, its namespace declarations, its attributes, then its children.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = vec![];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let data = &self[id];
            out.extend(data.ns_def.iter().copied());
            for &attr in &data.properties {
                out.push(attr);
                out.extend(self[attr].ns_def.iter().copied());
            }
            let mut children = self.children(id).collect::<Vec<_>>();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Unlink `id` from its parent, either from the children list or the attribute list.
    ///
    /// Owners are left untouched.
    pub(crate) fn unlink(&mut self, id: NodeId) {
        let Some(parent) = self[id].parent else {
            return;
        };
        match self[id].typ {
            XmlElementType::XmlAttributeNode => {
                self[parent].properties.retain(|&a| a != id);
            }
            XmlElementType::XmlNamespaceDecl => {
                self[parent].ns_def.retain(|&ns| ns != id);
            }
            _ => {
                let (prev, next) = (self[id].prev, self[id].next);
                match prev {
                    Some(prev) => self[prev].next = next,
                    None => self[parent].children = next,
                }
                match next {
                    Some(next) => self[next].prev = prev,
                    None => self[parent].last = prev,
                }
            }
        }
        let data = &mut self[id];
        data.parent = None;
        data.prev = None;
        data.next = None;
    }

    /// Link the unlinked node `child` as the last child of `parent`.
    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let last = self[parent].last;
        {
            let data = &mut self[child];
            data.parent = Some(parent);
            data.prev = last;
            data.next = None;
        }
        match last {
            Some(last) => self[last].next = Some(child),
            None => self[parent].children = Some(child),
        }
        self[parent].last = Some(child);
    }

    /// Link the unlinked node `new` right after `cur`.
    pub(crate) fn insert_after(&mut self, cur: NodeId, new: NodeId) {
        let parent = self[cur].parent;
        let next = self[cur].next;
        {
            let data = &mut self[new];
            data.parent = parent;
            data.prev = Some(cur);
            data.next = next;
        }
        self[cur].next = Some(new);
        match (next, parent) {
            (Some(next), _) => self[next].prev = Some(new),
            (None, Some(parent)) => self[parent].last = Some(new),
            (None, None) => {}
        }
    }

    /// Link the unlinked node `new` right before `cur`.
    pub(crate) fn insert_before(&mut self, cur: NodeId, new: NodeId) {
        let parent = self[cur].parent;
        let prev = self[cur].prev;
        {
            let data = &mut self[new];
            data.parent = parent;
            data.prev = prev;
            data.next = Some(cur);
        }
        self[cur].prev = Some(new);
        match (prev, parent) {
            (Some(prev), _) => self[prev].next = Some(new),
            (None, Some(parent)) => self[parent].children = Some(new),
            (None, None) => {}
        }
    }

    /// Attach the unlinked attribute `attr` to `elem`.
    pub(crate) fn append_attribute(&mut self, elem: NodeId, attr: NodeId) {
        self[attr].parent = Some(elem);
        self[elem].properties.push(attr);
    }

    /// Attach the unlinked namespace declaration `ns` to `node`.
    pub(crate) fn append_ns_def(&mut self, node: NodeId, ns: NodeId) {
        self[ns].parent = Some(node);
        self[node].ns_def.push(ns);
    }

    /// Free every slot of the subtree rooted at `root`.
    ///
    /// Return the number of released nodes.
    pub(crate) fn release(&mut self, root: NodeId) -> usize {
        let nodes = self.subtree(root);
        for &id in &nodes {
            self.nodes[id.index()] = None;
            self.free.push(id);
        }
        count_free(nodes.len());
        nodes.len()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        count_free(self.len());
    }
}

impl Index<NodeId> for Tree {
    type Output = NodeData;

    fn index(&self, id: NodeId) -> &Self::Output {
        match self.nodes.get(id.index()) {
            Some(Some(data)) => data,
            _ => unreachable!("node {id:?} used after release"),
        }
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match self.nodes.get_mut(id.index()) {
            Some(Some(data)) => data,
            _ => unreachable!("node {id:?} used after release"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tree: &mut Tree, name: &str) -> NodeId {
        tree.alloc(XmlElementType::XmlElementNode, name, "")
    }

    #[test]
    fn new_tree_has_document_and_xml_namespace() {
        let tree = Tree::new();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.typ(tree.document()), XmlElementType::XmlDocumentNode);
        assert_eq!(tree.ns_defs(tree.document()), &[tree.xml_ns()]);
        assert!(tree.root_element().is_none());
    }

    #[test]
    fn link_and_unlink_children() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let a = element(&mut tree, "a");
        let b = element(&mut tree, "b");
        let c = element(&mut tree, "c");
        tree.append_child(tree.document(), root);
        tree.append_child(root, a);
        tree.append_child(root, c);
        tree.insert_before(c, b);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, b, c]);

        tree.unlink(a);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(tree.parent(a), None);
        assert_eq!(tree.first_child(root), Some(b));

        tree.insert_after(c, a);
        assert_eq!(tree.last_child(root), Some(a));
        tree.unlink(a);
        tree.insert_before(b, a);
        tree.unlink(b);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.root_element(), Some(root));
    }

    #[test]
    fn released_slots_are_reused() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let child = element(&mut tree, "child");
        tree.append_child(root, child);
        let before = live_nodes();
        assert_eq!(tree.release(root), 2);
        assert_eq!(live_nodes(), before - 2);
        assert!(!tree.contains(root));
        let again = element(&mut tree, "again");
        assert!(again == child || again == root);
    }

    #[test]
    fn dropping_a_tree_returns_its_nodes() {
        let before = live_nodes();
        {
            let mut tree = Tree::new();
            let root = element(&mut tree, "root");
            tree.append_child(tree.document(), root);
            assert_eq!(live_nodes(), before + 3);
        }
        assert_eq!(live_nodes(), before);
    }

    #[test]
    fn element_type_from_i32() {
        assert_eq!(
            XmlElementType::try_from(18).unwrap(),
            XmlElementType::XmlNamespaceDecl
        );
        assert!(XmlElementType::try_from(5).is_err());
    }
}
