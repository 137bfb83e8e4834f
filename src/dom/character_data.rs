use crate::tree::XmlElementType;

use super::{
    document::Document,
    mutation,
    node::{Node, Proxy},
};

/// Nodes holding character data: text nodes, CDATA sections and comments.
pub trait CharacterData: Node {
    fn text(&self) -> String {
        self.with_tree(|tree, id| tree[id].content.clone())
    }

    fn set_text(&self, content: &str) -> &Self {
        mutation::set_text(self.proxy(), content);
        self
    }

    /// Length of the character data, in bytes.
    fn len(&self) -> usize {
        self.with_tree(|tree, id| tree[id].content.len())
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A text node.
#[derive(Clone)]
pub struct Text(pub(crate) Proxy);

impl Text {
    /// Create a detached text node in `doc`.
    pub fn new(doc: &Document, content: &str) -> Self {
        Self(mutation::create(doc, XmlElementType::XmlTextNode, "", content))
    }
}

/// A CDATA section.
#[derive(Clone)]
pub struct CData(pub(crate) Proxy);

impl CData {
    pub fn new(doc: &Document, content: &str) -> Self {
        Self(mutation::create(
            doc,
            XmlElementType::XmlCDATASectionNode,
            "",
            content,
        ))
    }
}

/// A comment.
#[derive(Clone)]
pub struct Comment(pub(crate) Proxy);

impl Comment {
    pub fn new(doc: &Document, content: &str) -> Self {
        Self(mutation::create(doc, XmlElementType::XmlCommentNode, "", content))
    }
}

impl CharacterData for Text {}
impl CharacterData for CData {}
impl CharacterData for Comment {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_data_is_set_in_place() {
        let doc = Document::new();
        let text = Text::new(&doc, "abc");
        assert_eq!(text.len(), 3);
        text.set_text("");
        assert!(text.is_empty());
        let comment = Comment::new(&doc, " note ");
        assert_eq!(comment.text(), " note ");
        assert_eq!(comment.node_type(), XmlElementType::XmlCommentNode);
    }
}
