//! Serialization of documents and nodes.
//!
//! The output follows the conventions of libxml2 `xmlsave.c`: namespace declarations precede
//! attributes, empty elements are self-closed, and formatting only indents elements whose
//! content holds no character data.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use crate::{
    dom::Document,
    error::{Result, XmlError},
    tree::{NodeId, Tree, XmlElementType},
};

/// Options of serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Indent the output.
    pub format: bool,
    /// Emit the XML declaration when serializing a document.
    pub declaration: bool,
    /// Write empty elements as `<a/>` rather than `<a></a>`.
    pub self_close_empty: bool,
    /// Encoding named in the declaration and used by [`Document::to_bytes`].
    pub encoding: Option<String>,
}

impl SaveOptions {
    /// Options used when a single node is converted to a string.
    pub fn node_default() -> Self {
        Self {
            format: false,
            declaration: false,
            ..Default::default()
        }
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            format: true,
            declaration: true,
            self_close_empty: true,
            encoding: None,
        }
    }
}

fn escape_content(input: &str, out: &mut String) {
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(input: &str, out: &mut String) {
    for c in input.chars() {
        match c {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            c => out.push(c),
        }
    }
}

struct Writer<'a> {
    tree: &'a Tree,
    options: &'a SaveOptions,
    out: String,
}

impl Writer<'_> {
    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push_str("  ");
        }
    }

    fn ns_def(&mut self, ns: NodeId) {
        match self.tree.ns_prefix(ns) {
            Some(prefix) => {
                self.out.push_str(" xmlns:");
                self.out.push_str(prefix);
            }
            None => self.out.push_str(" xmlns"),
        }
        self.out.push_str("=\"");
        escape_attribute(self.tree.ns_href(ns), &mut self.out);
        self.out.push('"');
    }

    fn attribute(&mut self, attr: NodeId) {
        self.out.push(' ');
        self.out.push_str(&self.tree.qname(attr));
        self.out.push_str("=\"");
        escape_attribute(&self.tree[attr].content, &mut self.out);
        self.out.push('"');
    }

    fn node(&mut self, id: NodeId, level: usize, format: bool) {
        let tree = self.tree;
        let data = &tree[id];
        match data.typ {
            XmlElementType::XmlElementNode => self.element(id, level, format),
            XmlElementType::XmlTextNode => escape_content(&data.content, &mut self.out),
            XmlElementType::XmlCDATASectionNode => {
                // a `]]>` inside the data has to be split across two sections
                let mut rest = data.content.as_str();
                loop {
                    self.out.push_str("<![CDATA[");
                    match rest.find("]]>") {
                        Some(pos) => {
                            self.out.push_str(&rest[..pos + 2]);
                            self.out.push_str("]]>");
                            rest = &rest[pos + 2..];
                        }
                        None => {
                            self.out.push_str(rest);
                            self.out.push_str("]]>");
                            break;
                        }
                    }
                }
            }
            XmlElementType::XmlCommentNode => {
                self.out.push_str("<!--");
                self.out.push_str(&data.content);
                self.out.push_str("-->");
            }
            XmlElementType::XmlPINode => {
                self.out.push_str("<?");
                self.out.push_str(&data.name);
                if !data.content.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(&data.content);
                }
                self.out.push_str("?>");
            }
            XmlElementType::XmlAttributeNode => self.attribute(id),
            XmlElementType::XmlNamespaceDecl => self.ns_def(id),
            XmlElementType::XmlDocumentNode => {
                for child in tree.children(id) {
                    self.node(child, 0, format);
                    self.out.push('\n');
                }
            }
        }
    }

    fn element(&mut self, id: NodeId, level: usize, format: bool) {
        let tree = self.tree;
        let name = tree.qname(id);
        self.out.push('<');
        self.out.push_str(&name);
        for &ns in tree.ns_defs(id) {
            self.ns_def(ns);
        }
        for &attr in tree.attributes(id) {
            self.attribute(attr);
        }
        if tree.first_child(id).is_none() {
            if self.options.self_close_empty {
                self.out.push_str("/>");
            } else {
                self.out.push_str("></");
                self.out.push_str(&name);
                self.out.push('>');
            }
            return;
        }
        self.out.push('>');

        let format = format && tree.children(id).all(|c| !tree.typ(c).is_text());
        if format {
            self.out.push('\n');
        }
        for child in tree.children(id) {
            if format {
                self.indent(level + 1);
            }
            self.node(child, level + 1, format);
            if format {
                self.out.push('\n');
            }
        }
        if format {
            self.indent(level);
        }
        self.out.push_str("</");
        self.out.push_str(&name);
        self.out.push('>');
    }
}

/// Serialize the subtree rooted at `id`.
pub(crate) fn dump_node(tree: &Tree, id: NodeId, options: &SaveOptions) -> String {
    let mut writer = Writer {
        tree,
        options,
        out: String::new(),
    };
    writer.node(id, 0, options.format);
    writer.out
}

/// Serialize a whole document, with its declaration and document type.
pub(crate) fn dump_document(doc: &Document, options: &SaveOptions) -> String {
    let mut out = String::new();
    if options.declaration {
        out.push_str("<?xml version=\"");
        out.push_str(&doc.version());
        out.push('"');
        if let Some(encoding) = options.encoding.clone().or_else(|| doc.encoding()) {
            out.push_str(" encoding=\"");
            out.push_str(&encoding);
            out.push('"');
        }
        out.push_str("?>\n");
    }
    if let Some(dtd) = doc.dtd() {
        out.push_str("<!DOCTYPE ");
        out.push_str(&dtd.name);
        match (&dtd.external_id, &dtd.system_id) {
            (Some(public), Some(system)) => {
                out.push_str(&format!(" PUBLIC \"{public}\" \"{system}\""));
            }
            (Some(public), None) => out.push_str(&format!(" PUBLIC \"{public}\"")),
            (None, Some(system)) => out.push_str(&format!(" SYSTEM \"{system}\"")),
            (None, None) => {}
        }
        out.push_str(">\n");
    }
    let tree = doc.tree();
    out.push_str(&dump_node(&tree, tree.document(), options));
    out
}

/// Encode `text` into `encoding`, UTF-8 if `None`.
///
/// Characters the target encoding cannot represent are written as character references.
pub(crate) fn encode(text: &str, encoding: Option<&str>) -> Result<Vec<u8>> {
    let encoding = match encoding {
        Some(label) => Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            XmlError::InvalidArgument(format!("unsupported encoding '{label}'").into())
        })?,
        None => UTF_8,
    };
    if encoding == UTF_16LE || encoding == UTF_16BE {
        let mut out = Vec::with_capacity(text.len() * 2 + 2);
        let big_endian = encoding == UTF_16BE;
        for unit in std::iter::once(0xFEFF).chain(text.encode_utf16()) {
            if big_endian {
                out.extend_from_slice(&unit.to_be_bytes());
            } else {
                out.extend_from_slice(&unit.to_le_bytes());
            }
        }
        return Ok(out);
    }
    let (bytes, _, _) = encoding.encode(text);
    Ok(bytes.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes() {
        let mut out = String::new();
        escape_content("a<b>&c\r", &mut out);
        assert_eq!(out, "a&lt;b&gt;&amp;c&#13;");
        out.clear();
        escape_attribute("\"x\"\n\t", &mut out);
        assert_eq!(out, "&quot;x&quot;&#10;&#9;");
    }

    #[test]
    fn format_only_element_content() {
        let doc = Document::new();
        let root = doc.node("root", None).unwrap();
        root.node("a", Some("text")).unwrap();
        let mixed = root.node("b", None).unwrap();
        mixed.set_text("x");
        mixed.node("c", None).unwrap();
        assert_eq!(
            doc.to_string(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <root>\n  <a>text</a>\n  <b>x<c/></b>\n</root>\n"
        );
    }

    #[test]
    fn cdata_sections_are_split() {
        let doc = Document::new();
        let root = doc.node("root", None).unwrap();
        root.add_cdata("a]]>b");
        assert_eq!(
            root.to_string(),
            "<root><![CDATA[a]]]]><![CDATA[>b]]></root>"
        );
    }

    #[test]
    fn unmappable_characters_become_references() {
        let bytes = encode("é\u{3a9}", Some("ISO-8859-1")).unwrap();
        assert_eq!(bytes, b"\xe9&#937;");
        let bytes = encode("a", Some("UTF-16")).unwrap();
        assert_eq!(bytes, [0xFF, 0xFE, b'a', 0]);
        assert!(encode("a", Some("no-such-encoding")).is_err());
    }
}
