//! Build [`Document`]s from XML text.
//!
//! Tokenizing is done by `xmlparser`. This module checks what the tokenizer leaves to its user
//! (tag balance, namespace well-formedness, entity references) and reports problems as
//! [`Diagnostic`]s in the manner of libxml2.
//!
//! Fatal errors abort the parse with [`XmlError::Syntax`], unless
//! [`XmlParserOption::XmlParseRecover`] is set: the document built so far is returned then, with
//! the fatal error recorded among its [`Document::errors`]. A document without root element is
//! never recovered.

mod context;
mod input;

use tracing::debug;

use crate::{
    dom::Document,
    error::{Diagnostic, Result, XmlError, XmlErrorLevel},
};

use context::ParserContext;

/// Parser options, with the values of libxml2 `xmlParserOption`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlParserOption {
    /// Return the partial document on fatal errors.
    XmlParseRecover = 1 << 0,
    /// Substitute entities. References are always substituted, the flag is accepted for
    /// compatibility.
    XmlParseNoent = 1 << 1,
    /// Do not record recoverable errors.
    XmlParseNoerror = 1 << 5,
    /// Do not record warnings.
    XmlParseNowarning = 1 << 6,
    /// Remove blank text nodes.
    XmlParseNoblanks = 1 << 8,
    /// Remove redundant namespace declarations.
    XmlParseNsclean = 1 << 13,
    /// Merge CDATA sections as text nodes.
    XmlParseNocdata = 1 << 14,
    /// Relax the limits of the parser.
    XmlParseHuge = 1 << 19,
    /// Ignore the encoding declared by the document.
    XmlParseIgnoreEnc = 1 << 21,
}

const SUPPORTED_OPTIONS: i32 = XmlParserOption::XmlParseRecover as i32
    | XmlParserOption::XmlParseNoent as i32
    | XmlParserOption::XmlParseNoerror as i32
    | XmlParserOption::XmlParseNowarning as i32
    | XmlParserOption::XmlParseNoblanks as i32
    | XmlParserOption::XmlParseNsclean as i32
    | XmlParserOption::XmlParseNocdata as i32
    | XmlParserOption::XmlParseHuge as i32
    | XmlParserOption::XmlParseIgnoreEnc as i32;

/// Parse configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Combination of [`XmlParserOption`] values.
    pub options: i32,
    /// Encoding of the input, overriding the declared one.
    pub encoding: Option<String>,
    /// URL of the input, used in diagnostics.
    pub base_url: Option<String>,
}

impl ParseOptions {
    pub fn new(options: i32) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn with(mut self, option: XmlParserOption) -> Self {
        self.options |= option as i32;
        self
    }

    pub fn has(&self, option: XmlParserOption) -> bool {
        self.options & option as i32 != 0
    }

    /// Return the bits of `options` this parser does not implement.
    pub fn unsupported(&self) -> i32 {
        self.options & !SUPPORTED_OPTIONS
    }
}

/// Parse `text` into a new document.
pub fn parse_xml(text: &str, options: &ParseOptions) -> Result<Document> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    parse_decoded(text, options, vec![])
}

/// Parse encoded `bytes` into a new document.
///
/// The encoding is found from the byte order mark, else from [`ParseOptions::encoding`], else
/// from the XML declaration, and defaults to UTF-8.
pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> Result<Document> {
    let input = input::decode(bytes, options)?;
    parse_decoded(&input.text, options, input.diagnostics)
}

fn parse_decoded(text: &str, options: &ParseOptions, early: Vec<Diagnostic>) -> Result<Document> {
    let doc = Document::with_version("1.0", None);
    doc.set_url(options.base_url.clone());
    let mut ctxt = ParserContext::new(&doc, text, options);
    for diag in early {
        ctxt.report(diag);
    }
    let fatal = ctxt.parse();
    let diagnostics = ctxt.into_diagnostics();

    let recover = options.has(XmlParserOption::XmlParseRecover);
    let no_root = doc.tree().root_element().is_none();
    if let Some(diag) = fatal.filter(|_| !recover || no_root) {
        return Err(XmlError::Syntax(diag));
    }
    for diag in diagnostics {
        let keep = match diag.level {
            XmlErrorLevel::Warning => !options.has(XmlParserOption::XmlParseNowarning),
            XmlErrorLevel::Error => !options.has(XmlParserOption::XmlParseNoerror),
            _ => true,
        };
        if keep {
            doc.push_error(diag);
        }
    }
    debug!(
        nodes = doc.node_count(),
        errors = doc.errors().len(),
        "parsed document"
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Node;

    #[test]
    fn unsupported_options_are_reported() {
        let options = ParseOptions::new(XmlParserOption::XmlParseRecover as i32 | 1 << 4);
        assert_eq!(options.unsupported(), 1 << 4);
        assert!(options.has(XmlParserOption::XmlParseRecover));
    }

    #[test]
    fn parse_simple_document() {
        let doc = parse_xml(
            "<?xml version=\"1.0\"?>\n<root a=\"1\"><child>text</child></root>",
            &ParseOptions::default(),
        )
        .unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.name(), "root");
        assert_eq!(root.attr("a").unwrap().value(), "1");
        assert_eq!(root.text(), "text");
        assert_eq!(root.line(), 2);
        assert_eq!(doc.encoding(), None);
    }

    #[test]
    fn empty_document_is_fatal_even_when_recovering() {
        let options = ParseOptions::default().with(XmlParserOption::XmlParseRecover);
        assert!(matches!(parse_xml("", &options), Err(XmlError::Syntax(_))));
        assert!(matches!(parse_xml("   ", &options), Err(XmlError::Syntax(_))));
    }

    #[test]
    fn recover_keeps_the_partial_tree() {
        let text = "<root><a>1</a><b>2</c></root>";
        assert!(parse_xml(text, &ParseOptions::default()).is_err());
        let options = ParseOptions::default().with(XmlParserOption::XmlParseRecover);
        let doc = parse_xml(text, &options).unwrap();
        assert_eq!(doc.root().unwrap().child_nodes().len(), 2);
        assert_eq!(doc.errors().len(), 1);
        assert_eq!(doc.errors()[0].level, XmlErrorLevel::Fatal);
    }
}
