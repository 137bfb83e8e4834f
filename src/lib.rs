//! XML documents whose nodes keep a stable identity while they are moved, removed and
//! reinserted, and whose storage is reclaimed once neither the document nor any node value
//! refers to it.
//!
//! ```
//! use xmlbind::{Document, Node, ParseOptions, parse_xml};
//!
//! let doc = parse_xml("<root><a/><b/></root>", &ParseOptions::default()).unwrap();
//! let root = doc.root().unwrap();
//! let a = root.child(0).unwrap();
//! a.remove();
//! root.add_child(&a).unwrap();
//! assert!(root.child(1).unwrap().is_same_node(&a));
//! assert_eq!(root.to_string(), "<root><b/><a/></root>");
//! ```

pub mod dom;
pub mod error;
pub mod parser;
pub mod save;
mod tree;
pub mod valid;
#[cfg(feature = "xpath")]
pub mod xpath;

pub use dom::{
    Attribute, CData, CharacterData, Comment, Document, Dtd, Element, Namespace, Node, NodeRef,
    Parent, ProcessingInstruction, ReclaimMode, Text, collect, pending,
};
pub use error::{Diagnostic, Result, XmlError, XmlErrorDomain, XmlErrorLevel, XmlParserErrors};
pub use parser::{ParseOptions, XmlParserOption, parse_bytes, parse_xml};
pub use save::SaveOptions;
pub use tree::XmlElementType;

/// Return the number of nodes allocated on the current thread and not yet released.
///
/// This counts the nodes of every document, attached or not, including document nodes.
pub fn node_count() -> usize {
    tree::live_nodes()
}
