use std::{fmt, rc::Rc};

use tracing::trace;

use crate::{
    error::Result,
    save::SaveOptions,
    tree::{NodeId, XmlElementType},
};

use super::{
    attr::Attribute,
    character_data::{CData, Comment, Text},
    document::Document,
    element::Element,
    mutation,
    namespace::Namespace,
    pi::ProcessingInstruction,
    reclaim::{self, Pending},
};

/// The object behind every node value handed out by a [`Document`].
///
/// A document never holds more than one live `ProxyInner` per node.
/// Dropping the last reference schedules its finalizer.
pub(crate) struct ProxyInner {
    pub(crate) doc: Document,
    pub(crate) id: NodeId,
    pub(crate) serial: u64,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        trace!(node = ?self.id, serial = self.serial, "proxy dropped");
        reclaim::schedule(Pending::new(self.doc.clone(), self.id, self.serial));
    }
}

/// Reference to the proxy of a node.
///
/// Clones share the same proxy, so they compare equal with [`Proxy::is_same`].
#[derive(Clone)]
pub struct Proxy(pub(crate) Rc<ProxyInner>);

impl Proxy {
    pub(crate) fn id(&self) -> NodeId {
        self.0.id
    }

    pub(crate) fn document(&self) -> &Document {
        &self.0.doc
    }

    /// Whether both references designate the very same proxy.
    pub fn is_same(&self, other: &Proxy) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Operations shared by all the node types.
pub trait Node: Sized {
    /// Return the proxy of this node.
    fn proxy(&self) -> &Proxy;

    #[doc(hidden)]
    fn from_proxy(proxy: Proxy) -> Self;

    fn node_type(&self) -> XmlElementType {
        self.with_tree(|tree, id| tree.typ(id))
    }

    /// Return the document this node was created in.
    fn doc(&self) -> Document {
        self.proxy().document().clone()
    }

    /// Return the parent of this node.
    ///
    /// The parent of an attribute is its element.
    /// A removed node, or a node never inserted anywhere, has no parent.
    fn parent(&self) -> Option<Parent> {
        let doc = self.proxy().document();
        let parent = self.with_tree(|tree, id| {
            tree.parent(id)
                .map(|p| (p, tree.typ(p) == XmlElementType::XmlDocumentNode))
        })?;
        match parent {
            (_, true) => Some(Parent::Document(doc.clone())),
            (p, false) => Some(Parent::Element(Element::from_proxy(doc.resolve(p)))),
        }
    }

    fn next_sibling(&self) -> Option<NodeRef> {
        let next = self.with_tree(|tree, id| {
            if tree.typ(id) == XmlElementType::XmlAttributeNode {
                let attrs = tree.attributes(tree.parent(id)?);
                let pos = attrs.iter().position(|&a| a == id)?;
                attrs.get(pos + 1).copied()
            } else {
                tree.next_sibling(id)
            }
        })?;
        Some(NodeRef::from_proxy(self.proxy().document().resolve(next)))
    }

    fn prev_sibling(&self) -> Option<NodeRef> {
        let prev = self.with_tree(|tree, id| {
            if tree.typ(id) == XmlElementType::XmlAttributeNode {
                let attrs = tree.attributes(tree.parent(id)?);
                let pos = attrs.iter().position(|&a| a == id)?;
                pos.checked_sub(1).map(|p| attrs[p])
            } else {
                tree.prev_sibling(id)
            }
        })?;
        Some(NodeRef::from_proxy(self.proxy().document().resolve(prev)))
    }

    /// Return the next sibling which is an element.
    fn next_element(&self) -> Option<Element> {
        let next = self.with_tree(|tree, id| tree.next_element(id))?;
        Some(Element::from_proxy(self.proxy().document().resolve(next)))
    }

    fn prev_element(&self) -> Option<Element> {
        let prev = self.with_tree(|tree, id| tree.prev_element(id))?;
        Some(Element::from_proxy(self.proxy().document().resolve(prev)))
    }

    /// Insert `node` right after this node and return it.
    ///
    /// A text node is merged into this node if it is a text node, or else into the following
    /// text sibling. The returned value then still designates the unlinked `node`.
    ///
    /// Next to the root element, only comments and processing instructions are accepted.
    fn add_next_sibling<N: Node + Clone>(&self, node: &N) -> Result<N> {
        mutation::add_sibling(self.proxy(), node.proxy(), true)?;
        Ok(node.clone())
    }

    /// Insert `node` right before this node and return it.
    fn add_prev_sibling<N: Node + Clone>(&self, node: &N) -> Result<N> {
        mutation::add_sibling(self.proxy(), node.proxy(), false)?;
        Ok(node.clone())
    }

    /// Put `node` at the place of this node, which is left without parent.
    ///
    /// The root element may be replaced by another element, a comment or a processing
    /// instruction.
    fn replace(&self, node: &impl Node) -> Result<&Self> {
        mutation::replace(self.proxy(), node.proxy())?;
        Ok(self)
    }

    /// Put a text node holding `content` at the place of this node.
    fn replace_text(&self, content: &str) -> Result<&Self> {
        mutation::replace_text(self.proxy(), content)?;
        Ok(self)
    }

    /// Unlink this node from its parent.
    ///
    /// The node is kept alive, with its subtree, for as long as a proxy refers into it.
    fn remove(&self) -> &Self {
        mutation::remove(self.proxy());
        self
    }

    /// Return a deep copy of this node. The copy belongs to the same document but has no parent.
    fn clone_node(&self) -> Self {
        Self::from_proxy(mutation::clone_node(self.proxy()))
    }

    /// Return the namespace this node is bound to.
    fn namespace(&self) -> Option<Namespace> {
        let ns = self.with_tree(|tree, id| match tree.typ(id) {
            XmlElementType::XmlElementNode | XmlElementType::XmlAttributeNode => tree[id].ns,
            _ => None,
        })?;
        Some(Namespace::from_proxy(self.proxy().document().resolve(ns)))
    }

    /// Return the namespace declarations in scope at this node.
    ///
    /// With `local`, only the declarations made on this very node are returned.
    fn namespaces(&self, local: bool) -> Vec<Namespace> {
        let list = self.with_tree(|tree, id| {
            if local {
                tree.ns_defs(id).to_vec()
            } else {
                tree.in_scope_ns(id)
            }
        });
        let doc = self.proxy().document();
        list.into_iter()
            .map(|ns| Namespace::from_proxy(doc.resolve(ns)))
            .collect()
    }

    /// Line of the source document this node was parsed at, 0 if unknown.
    fn line(&self) -> usize {
        self.with_tree(|tree, id| tree[id].line)
    }

    /// Return a path expression locating this node, such as `/root/child[2]/text()`.
    fn path(&self) -> String {
        self.with_tree(|tree, id| tree.node_path(id))
    }

    fn to_string_with(&self, options: &SaveOptions) -> String {
        self.with_tree(|tree, id| crate::save::dump_node(tree, id, options))
    }

    /// Whether `other` designates the same proxy, and therefore the same node.
    fn is_same_node(&self, other: &impl Node) -> bool {
        self.proxy().is_same(other.proxy())
    }

    #[doc(hidden)]
    fn with_tree<R>(&self, f: impl FnOnce(&crate::tree::Tree, NodeId) -> R) -> R {
        let proxy = self.proxy();
        let tree = proxy.document().tree();
        f(&tree, proxy.id())
    }
}

/// The parent of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Parent {
    Document(Document),
    Element(Element),
}

impl Parent {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(elem) => Some(elem),
            Self::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(doc),
            Self::Element(_) => None,
        }
    }
}

/// Any node that can be handed out by a document.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRef {
    Element(Element),
    Text(Text),
    CData(CData),
    Comment(Comment),
    ProcessingInstruction(ProcessingInstruction),
    Attribute(Attribute),
}

impl NodeRef {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&Attribute> {
        match self {
            Self::Attribute(attr) => Some(attr),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            Self::Comment(comment) => Some(comment),
            _ => None,
        }
    }
}

impl Node for NodeRef {
    fn proxy(&self) -> &Proxy {
        match self {
            Self::Element(node) => node.proxy(),
            Self::Text(node) => node.proxy(),
            Self::CData(node) => node.proxy(),
            Self::Comment(node) => node.proxy(),
            Self::ProcessingInstruction(node) => node.proxy(),
            Self::Attribute(node) => node.proxy(),
        }
    }

    fn from_proxy(proxy: Proxy) -> Self {
        let typ = proxy.document().tree().typ(proxy.id());
        match typ {
            XmlElementType::XmlTextNode => Self::Text(Text::from_proxy(proxy)),
            XmlElementType::XmlCDATASectionNode => Self::CData(CData::from_proxy(proxy)),
            XmlElementType::XmlCommentNode => Self::Comment(Comment::from_proxy(proxy)),
            XmlElementType::XmlPINode => {
                Self::ProcessingInstruction(ProcessingInstruction::from_proxy(proxy))
            }
            XmlElementType::XmlAttributeNode => Self::Attribute(Attribute::from_proxy(proxy)),
            _ => Self::Element(Element::from_proxy(proxy)),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(&SaveOptions::node_default()))
    }
}

macro_rules! impl_node_wrapper {
    ( $( $t:ident ),* ) => {
        $(
            impl Node for $t {
                fn proxy(&self) -> &Proxy {
                    &self.0
                }

                fn from_proxy(proxy: Proxy) -> Self {
                    Self(proxy)
                }
            }

            impl From<$t> for NodeRef {
                fn from(value: $t) -> Self {
                    NodeRef::$t(value)
                }
            }

            impl TryFrom<NodeRef> for $t {
                type Error = crate::error::XmlError;
                fn try_from(value: NodeRef) -> Result<Self> {
                    match value {
                        NodeRef::$t(node) => Ok(node),
                        _ => Err(crate::error::XmlError::TypeMismatch(
                            concat!("node is not ", stringify!($t)).into(),
                        )),
                    }
                }
            }

            impl PartialEq for $t {
                fn eq(&self, other: &Self) -> bool {
                    self.0.is_same(&other.0)
                }
            }

            impl std::fmt::Debug for $t {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    let name = self.with_tree(|tree, id| tree.qname(id));
                    f.debug_struct(stringify!($t))
                        .field("id", &self.0.id())
                        .field("name", &name)
                        .finish()
                }
            }

            impl std::fmt::Display for $t {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.to_string_with(&SaveOptions::node_default()))
                }
            }
        )*
    };
}
impl_node_wrapper!(
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
    Attribute
);
