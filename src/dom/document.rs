use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
};

use tracing::trace;

use crate::{
    error::{Diagnostic, Result, XmlError, XmlErrorLevel},
    save::{self, SaveOptions},
    tree::{NodeId, Tree, XmlElementType},
    valid::SchemaValidator,
};
#[cfg(feature = "xpath")]
use crate::xpath::XPathValue;

use super::{
    character_data::{CData, Comment, Text},
    element::Element,
    mutation,
    namespace::Namespace,
    node::{Node, NodeRef, Proxy, ProxyInner},
    ownership,
    pi::ProcessingInstruction,
    registry::Registry,
};

/// The document type declaration of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dtd {
    pub name: String,
    pub external_id: Option<String>,
    pub system_id: Option<String>,
}

pub(crate) struct DocumentInner {
    pub(crate) tree: RefCell<Tree>,
    pub(crate) registry: RefCell<Registry>,
    errors: RefCell<Vec<Diagnostic>>,
    validation_errors: RefCell<Vec<Diagnostic>>,
    version: RefCell<String>,
    encoding: RefCell<Option<String>>,
    dtd: RefCell<Option<Dtd>>,
    url: RefCell<Option<String>>,
}

/// An XML document.
///
/// `Document` is a cheap reference; clones designate the same document.
/// The document, and every node it owns, stays alive for as long as a `Document` or the proxy of
/// one of its nodes exists.
#[derive(Clone)]
pub struct Document(pub(crate) Rc<DocumentInner>);

impl Document {
    /// Create an empty document with version `1.0` and encoding `UTF-8`.
    pub fn new() -> Self {
        Self::with_version("1.0", Some("UTF-8"))
    }

    pub fn with_version(version: &str, encoding: Option<&str>) -> Self {
        Self(Rc::new(DocumentInner {
            tree: RefCell::new(Tree::new()),
            registry: RefCell::new(Registry::default()),
            errors: RefCell::new(vec![]),
            validation_errors: RefCell::new(vec![]),
            version: RefCell::new(version.to_owned()),
            encoding: RefCell::new(encoding.map(str::to_owned)),
            dtd: RefCell::new(None),
            url: RefCell::new(None),
        }))
    }

    pub(crate) fn tree(&self) -> Ref<'_, Tree> {
        self.0.tree.borrow()
    }

    pub(crate) fn tree_mut(&self) -> RefMut<'_, Tree> {
        self.0.tree.borrow_mut()
    }

    /// Return the proxy of `id`, creating it if no live one exists.
    pub(crate) fn resolve(&self, id: NodeId) -> Proxy {
        let mut registry = self.0.registry.borrow_mut();
        if let Some(proxy) = registry.lookup(id) {
            return Proxy(proxy);
        }
        let serial = registry.next_serial();
        let proxy = Rc::new(ProxyInner {
            doc: self.clone(),
            id,
            serial,
        });
        registry.insert(id, &proxy);
        ownership::pin(&mut self.tree_mut(), id);
        trace!(node = ?id, serial, "proxy created");
        Proxy(proxy)
    }

    pub(crate) fn push_error(&self, diag: Diagnostic) {
        self.0.errors.borrow_mut().push(diag);
    }

    pub(crate) fn set_url(&self, url: Option<String>) {
        *self.0.url.borrow_mut() = url;
    }

    /// Return the root element.
    pub fn root(&self) -> Option<Element> {
        let root = self.tree().root_element()?;
        Some(Element::from_proxy(self.resolve(root)))
    }

    /// Set the root element of a document which has none.
    ///
    /// An element of another document is copied; the returned element is the new root.
    pub fn set_root(&self, root: &Element) -> Result<Element> {
        let id = mutation::set_root(self, root.proxy())?;
        Ok(Element::from_proxy(self.resolve(id)))
    }

    /// Create the root element, with an optional text content.
    pub fn node(&self, name: &str, content: Option<&str>) -> Result<Element> {
        let elem = Element::new(self, name)?;
        if let Some(content) = content {
            elem.set_text(content);
        }
        self.set_root(&elem)
    }

    fn assert_root(&self) -> Result<Element> {
        self.root().ok_or(XmlError::NoRoot)
    }

    #[cfg(feature = "xpath")]
    pub fn get(&self, xpath: &str) -> Result<Option<NodeRef>> {
        self.assert_root()?.get(xpath)
    }

    #[cfg(feature = "xpath")]
    pub fn find(&self, xpath: &str) -> Result<Vec<NodeRef>> {
        self.assert_root()?.find(xpath)
    }

    #[cfg(feature = "xpath")]
    pub fn find_ns(&self, xpath: &str, namespaces: &[(&str, &str)]) -> Result<Vec<NodeRef>> {
        self.assert_root()?.find_ns(xpath, namespaces)
    }

    #[cfg(feature = "xpath")]
    pub fn eval(&self, xpath: &str) -> Result<XPathValue> {
        self.assert_root()?.eval(xpath, &[])
    }

    /// Return the `idx`-th child of the root element.
    pub fn child(&self, idx: usize) -> Result<Option<NodeRef>> {
        Ok(self.assert_root()?.child(idx))
    }

    /// Return the children of the root element.
    pub fn child_nodes(&self) -> Result<Vec<NodeRef>> {
        Ok(self.assert_root()?.child_nodes())
    }

    /// Return the namespaces in scope at the root element.
    pub fn namespaces(&self) -> Result<Vec<Namespace>> {
        Ok(self.assert_root()?.namespaces(false))
    }

    pub fn create_element(&self, name: &str) -> Result<Element> {
        Element::new(self, name)
    }

    pub fn create_text_node(&self, content: &str) -> Text {
        Text::new(self, content)
    }

    pub fn create_cdata_section(&self, content: &str) -> CData {
        CData::from_proxy(mutation::create(
            self,
            XmlElementType::XmlCDATASectionNode,
            "",
            content,
        ))
    }

    pub fn create_comment(&self, content: &str) -> Comment {
        Comment::new(self, content)
    }

    pub fn create_processing_instruction(
        &self,
        target: &str,
        data: Option<&str>,
    ) -> Result<ProcessingInstruction> {
        ProcessingInstruction::new(self, target, data)
    }

    /// Set the document type declaration.
    pub fn set_dtd(
        &self,
        name: &str,
        external_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<&Self> {
        if name.is_empty() {
            return Err(XmlError::InvalidArgument("Must pass in a DTD name".into()));
        }
        *self.0.dtd.borrow_mut() = Some(Dtd {
            name: name.to_owned(),
            external_id: external_id.map(str::to_owned),
            system_id: system_id.map(str::to_owned),
        });
        Ok(self)
    }

    pub(crate) fn set_dtd_decl(&self, dtd: Option<Dtd>) {
        *self.0.dtd.borrow_mut() = dtd;
    }

    pub fn dtd(&self) -> Option<Dtd> {
        self.0.dtd.borrow().clone()
    }

    pub fn version(&self) -> String {
        self.0.version.borrow().clone()
    }

    pub(crate) fn set_version(&self, version: &str) {
        *self.0.version.borrow_mut() = version.to_owned();
    }

    /// Return the encoding declared or set for this document.
    pub fn encoding(&self) -> Option<String> {
        self.0.encoding.borrow().clone()
    }

    pub fn set_encoding(&self, encoding: Option<&str>) -> &Self {
        *self.0.encoding.borrow_mut() = encoding.map(str::to_owned);
        self
    }

    /// The URL the document was loaded from, if known.
    pub fn url(&self) -> Option<String> {
        self.0.url.borrow().clone()
    }

    /// Return the recoverable diagnostics reported while parsing.
    pub fn errors(&self) -> Vec<Diagnostic> {
        self.0.errors.borrow().clone()
    }

    /// Return the diagnostics reported by the last validation.
    pub fn validation_errors(&self) -> Vec<Diagnostic> {
        self.0.validation_errors.borrow().clone()
    }

    /// Validate this document against `schema`.
    ///
    /// The diagnostics of `validator` replace [`Document::validation_errors`].
    /// Return whether none of them is an error.
    pub fn validate(
        &self,
        schema: Option<&Document>,
        validator: &impl SchemaValidator,
    ) -> Result<bool> {
        let schema = schema.ok_or(XmlError::MissingSchema)?;
        if schema.tree().root_element().is_none() {
            return Err(XmlError::MissingSchema);
        }
        let diagnostics = validator.validate(self, schema);
        let valid = diagnostics
            .iter()
            .all(|d| d.level < XmlErrorLevel::Error);
        *self.0.validation_errors.borrow_mut() = diagnostics;
        Ok(valid)
    }

    pub fn to_string_with(&self, options: &SaveOptions) -> String {
        save::dump_document(self, options)
    }

    /// Serialize the document into bytes in the encoding chosen by `options`,
    /// or else in the document's encoding.
    pub fn to_bytes(&self, options: &SaveOptions) -> Result<Vec<u8>> {
        let encoding = options.encoding.clone().or_else(|| self.encoding());
        let mut options = options.clone();
        options.encoding = encoding.clone();
        let text = save::dump_document(self, &options);
        save::encode(&text, encoding.as_deref())
    }

    /// Number of nodes currently allocated for this document.
    pub fn node_count(&self) -> usize {
        self.tree().len()
    }

    /// Number of live proxies of this document.
    pub fn live_proxies(&self) -> usize {
        self.0.registry.borrow().live()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version())
            .field("encoding", &self.encoding())
            .field("nodes", &self.node_count())
            .field("proxies", &self.0.registry.borrow().len())
            .finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(&SaveOptions::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_has_no_root() {
        let doc = Document::new();
        assert!(doc.root().is_none());
        assert_eq!(doc.child(0), Err(XmlError::NoRoot));
        assert_eq!(doc.child_nodes(), Err(XmlError::NoRoot));
        assert!(matches!(doc.namespaces(), Err(XmlError::NoRoot)));
        assert_eq!(doc.version(), "1.0");
        assert_eq!(doc.encoding().as_deref(), Some("UTF-8"));
    }

    #[test]
    fn root_is_resolved_to_the_same_proxy() {
        let doc = Document::new();
        let root = doc.node("root", None).unwrap();
        assert!(doc.root().unwrap().is_same_node(&root));
        assert_eq!(doc.node("other", None).unwrap_err(), XmlError::RootExists);
    }

    #[test]
    fn dtd_requires_a_name() {
        let doc = Document::new();
        assert!(doc.set_dtd("", None, None).is_err());
        doc.set_dtd("html", Some("-//W3C//DTD XHTML 1.0 Strict//EN"), None)
            .unwrap();
        let dtd = doc.dtd().unwrap();
        assert_eq!(dtd.name, "html");
        assert_eq!(dtd.system_id, None);
    }
}
