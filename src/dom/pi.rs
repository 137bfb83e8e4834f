use crate::{error::Result, tree::XmlElementType};

use super::{
    document::Document,
    mutation,
    node::{Node, Proxy},
    validate_name,
};

/// A processing instruction.
#[derive(Clone)]
pub struct ProcessingInstruction(pub(crate) Proxy);

impl ProcessingInstruction {
    pub fn new(doc: &Document, target: &str, data: Option<&str>) -> Result<Self> {
        validate_name(target)?;
        Ok(Self(mutation::create(
            doc,
            XmlElementType::XmlPINode,
            target,
            data.unwrap_or_default(),
        )))
    }

    /// Return the target of this processing instruction.
    pub fn name(&self) -> String {
        self.with_tree(|tree, id| tree[id].name.clone())
    }

    pub fn set_name(&self, target: &str) -> Result<&Self> {
        validate_name(target)?;
        let proxy = self.proxy();
        proxy.document().tree_mut()[proxy.id()].name = target.to_owned();
        Ok(self)
    }

    pub fn text(&self) -> String {
        self.with_tree(|tree, id| tree[id].content.clone())
    }

    pub fn set_text(&self, data: &str) -> &Self {
        mutation::set_text(self.proxy(), data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_and_data() {
        let doc = Document::new();
        let pi = ProcessingInstruction::new(&doc, "xml-stylesheet", None).unwrap();
        assert_eq!(pi.text(), "");
        pi.set_text("href=\"a.xsl\"");
        pi.set_name("other").unwrap();
        assert_eq!(pi.name(), "other");
        assert!(pi.set_name("").is_err());
        assert_eq!(pi.to_string(), "<?other href=\"a.xsl\"?>");
    }
}
