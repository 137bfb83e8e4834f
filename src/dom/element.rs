use crate::{
    error::{Result, XmlError},
    tree::XmlElementType,
};
#[cfg(feature = "xpath")]
use crate::xpath::{self, XPathValue};

use super::{
    attr::Attribute,
    document::Document,
    mutation,
    namespace::Namespace,
    node::{Node, NodeRef, Proxy},
    validate_name,
};

/// An element node.
#[derive(Clone)]
pub struct Element(pub(crate) Proxy);

impl Element {
    /// Create a detached element in `doc`.
    pub fn new(doc: &Document, name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self(mutation::create(
            doc,
            XmlElementType::XmlElementNode,
            name,
            "",
        )))
    }

    /// Create a detached element in `doc` holding a single text node.
    pub fn with_text(doc: &Document, name: &str, content: &str) -> Result<Self> {
        let elem = Self::new(doc, name)?;
        elem.set_text(content);
        Ok(elem)
    }

    /// Return the local name of this element.
    pub fn name(&self) -> String {
        self.with_tree(|tree, id| tree[id].name.clone())
    }

    pub fn set_name(&self, name: &str) -> Result<&Self> {
        validate_name(name)?;
        let proxy = self.proxy();
        proxy.document().tree_mut()[proxy.id()].name = name.to_owned();
        Ok(self)
    }

    /// Return the concatenated text content of this element.
    pub fn text(&self) -> String {
        self.with_tree(|tree, id| tree.content(id))
    }

    /// Replace the children of this element with `content`.
    pub fn set_text(&self, content: &str) -> &Self {
        mutation::set_text(self.proxy(), content);
        self
    }

    /// Return the attribute `name`, which may be a qualified name.
    pub fn attr(&self, name: &str) -> Option<Attribute> {
        let attr = self.with_tree(|tree, id| mutation::find_attribute(tree, id, name))?;
        Some(Attribute::from_proxy(self.proxy().document().resolve(attr)))
    }

    /// Set the attribute `name` to `value`, creating it if it does not exist.
    ///
    /// A prefixed name binds the attribute to the namespace its prefix resolves to here.
    pub fn set_attr(&self, name: &str, value: &str) -> Result<&Self> {
        mutation::set_attribute(self.proxy(), name, value)?;
        Ok(self)
    }

    pub fn set_attrs(&self, attrs: &[(&str, &str)]) -> Result<&Self> {
        for (name, value) in attrs {
            self.set_attr(name, value)?;
        }
        Ok(self)
    }

    /// Return the attributes of this element, in document order.
    pub fn attrs(&self) -> Vec<Attribute> {
        let attrs = self.with_tree(|tree, id| tree.attributes(id).to_vec());
        let doc = self.proxy().document();
        attrs
            .into_iter()
            .map(|a| Attribute::from_proxy(doc.resolve(a)))
            .collect()
    }

    /// Append `child` to the children of this element.
    ///
    /// A node of another document is copied, a node of this document is moved.
    /// A text node appended after a text node is merged into it, and `child` itself is left
    /// untouched.
    pub fn add_child(&self, child: &impl Node) -> Result<&Self> {
        mutation::add_child(self.proxy(), child.proxy())?;
        Ok(self)
    }

    /// Append a CDATA section to the children of this element.
    pub fn add_cdata(&self, content: &str) -> &Self {
        mutation::add_cdata(self.proxy(), content);
        self
    }

    /// Create an element named `name` and append it to the children of this element.
    pub fn node(&self, name: &str, content: Option<&str>) -> Result<Element> {
        let child = Element::new(self.proxy().document(), name)?;
        if let Some(content) = content {
            child.set_text(content);
        }
        self.add_child(&child)?;
        Ok(child)
    }

    /// Return the `idx`-th child of this element.
    pub fn child(&self, idx: usize) -> Option<NodeRef> {
        let child = self.with_tree(|tree, id| tree.children(id).nth(idx))?;
        Some(NodeRef::from_proxy(self.proxy().document().resolve(child)))
    }

    pub fn child_nodes(&self) -> Vec<NodeRef> {
        let children = self.with_tree(|tree, id| tree.children(id).collect::<Vec<_>>());
        let doc = self.proxy().document();
        children
            .into_iter()
            .map(|c| NodeRef::from_proxy(doc.resolve(c)))
            .collect()
    }

    /// Declare `prefix` bound to `href` on this element.
    ///
    /// Declaring the same binding twice returns the existing declaration. Binding a prefix
    /// declared here to another URI fails.
    pub fn define_namespace(&self, prefix: Option<&str>, href: &str) -> Result<Namespace> {
        let proxy = self.proxy();
        let doc = proxy.document();
        let ns = mutation::define_namespace(&mut doc.tree_mut(), proxy.id(), prefix, href)?;
        Ok(Namespace::from_proxy(doc.resolve(ns)))
    }

    /// Bind this element to `href`.
    ///
    /// A declaration of `prefix` to `href` in scope is reused, otherwise one is made on this
    /// element.
    pub fn set_namespace(&self, prefix: Option<&str>, href: &str) -> Result<Namespace> {
        let proxy = self.proxy();
        let doc = proxy.document();
        let ns = mutation::set_namespace(&mut doc.tree_mut(), proxy.id(), prefix, href)?;
        Ok(Namespace::from_proxy(doc.resolve(ns)))
    }

    /// Bind this element to an existing declaration, which must be in scope here.
    pub fn set_namespace_decl(&self, ns: &Namespace) -> Result<&Self> {
        let proxy = self.proxy();
        if ns.proxy().document() != proxy.document() {
            return Err(XmlError::InvalidArgument(
                "namespace belongs to another document".into(),
            ));
        }
        let mut tree = proxy.document().tree_mut();
        let prefix = tree.ns_prefix(ns.proxy().id()).map(str::to_owned);
        if tree.search_ns(proxy.id(), prefix.as_deref()) != Some(ns.proxy().id()) {
            return Err(XmlError::InvalidArgument(
                "namespace is not in scope on this element".into(),
            ));
        }
        tree[proxy.id()].ns = Some(ns.proxy().id());
        Ok(self)
    }

    /// Unbind this element from its namespace. Declarations made here stay in place.
    pub fn remove_namespace(&self) -> &Self {
        let proxy = self.proxy();
        proxy.document().tree_mut()[proxy.id()].ns = None;
        self
    }

    /// Evaluate `expr` with this element as the context node.
    ///
    /// `namespaces` binds prefixes usable in `expr`.
    #[cfg(feature = "xpath")]
    pub fn eval(&self, expr: &str, namespaces: &[(&str, &str)]) -> Result<XPathValue> {
        // the document node has no wrapper and is dropped from node-sets
        let value = self.with_tree(|tree, id| {
            xpath::evaluate(tree, id, expr, namespaces).map(|value| {
                value.filter_map(|n| match tree.typ(n) {
                    XmlElementType::XmlDocumentNode | XmlElementType::XmlNamespaceDecl => None,
                    _ => Some(n),
                })
            })
        })?;
        let doc = self.proxy().document();
        Ok(value.filter_map(|id| Some(NodeRef::from_proxy(doc.resolve(id)))))
    }

    /// Return the nodes selected by `expr`.
    #[cfg(feature = "xpath")]
    pub fn find(&self, expr: &str) -> Result<Vec<NodeRef>> {
        self.find_ns(expr, &[])
    }

    #[cfg(feature = "xpath")]
    pub fn find_ns(&self, expr: &str, namespaces: &[(&str, &str)]) -> Result<Vec<NodeRef>> {
        match self.eval(expr, namespaces)? {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            _ => Err(XmlError::TypeMismatch(
                "expression does not select a node-set".into(),
            )),
        }
    }

    /// Return the first node selected by `expr`.
    #[cfg(feature = "xpath")]
    pub fn get(&self, expr: &str) -> Result<Option<NodeRef>> {
        Ok(self.find(expr)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_created_then_overwritten() {
        let doc = Document::new();
        let elem = doc.node("root", None).unwrap();
        elem.set_attrs(&[("a", "1"), ("b", "2")]).unwrap();
        elem.set_attr("a", "3").unwrap();
        let attrs = elem.attrs();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].value(), "3");
        assert_eq!(elem.attr("b").unwrap().value(), "2");
        assert!(elem.attr("c").is_none());
    }

    #[test]
    fn set_text_replaces_children() {
        let doc = Document::new();
        let elem = doc.node("root", Some("old")).unwrap();
        elem.node("child", None).unwrap();
        elem.set_text("new");
        assert_eq!(elem.child_nodes().len(), 1);
        assert_eq!(elem.text(), "new");
        elem.set_text("");
        assert!(elem.child_nodes().is_empty());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let doc = Document::new();
        assert!(Element::new(&doc, "").is_err());
        let elem = Element::new(&doc, "ok").unwrap();
        assert!(elem.set_name("not ok").is_err());
        assert_eq!(elem.name(), "ok");
    }

    #[test]
    fn namespace_declaration_must_be_in_scope() {
        let doc = Document::new();
        let root = doc.node("root", None).unwrap();
        let child = root.node("child", None).unwrap();
        let other = Element::new(&doc, "other").unwrap();
        let ns = other.define_namespace(Some("o"), "urn:o").unwrap();
        assert!(child.set_namespace_decl(&ns).is_err());
        let ns = root.define_namespace(Some("r"), "urn:r").unwrap();
        child.set_namespace_decl(&ns).unwrap();
        assert_eq!(child.namespace().unwrap(), ns);
    }
}
