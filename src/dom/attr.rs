use super::{
    element::Element,
    node::{Node, Proxy},
};

/// An attribute of an element.
///
/// The parent of an attribute is its element, but an attribute is never one of its children.
#[derive(Clone)]
pub struct Attribute(pub(crate) Proxy);

impl Attribute {
    /// Return the local name of this attribute.
    pub fn name(&self) -> String {
        self.with_tree(|tree, id| tree[id].name.clone())
    }

    pub fn value(&self) -> String {
        self.with_tree(|tree, id| tree[id].content.clone())
    }

    pub fn set_value(&self, value: &str) -> &Self {
        let proxy = self.proxy();
        proxy.document().tree_mut()[proxy.id()].content = value.to_owned();
        self
    }

    /// Return the element carrying this attribute, if it is still attached to one.
    pub fn node(&self) -> Option<Element> {
        self.parent().and_then(|p| p.as_element().cloned())
    }
}
