use std::collections::HashMap;

use xmlparser::{ElementEnd, EntityDefinition, ExternalId, StrSpan, Token, Tokenizer};

use crate::{
    dom::{Document, Dtd},
    error::{Diagnostic, XmlErrorDomain, XmlErrorLevel, XmlParserErrors},
    tree::{NodeId, Tree, XML_XML_NAMESPACE, XmlElementType},
};

use super::{ParseOptions, XmlParserOption};

/// Depth of open elements allowed without `XmlParseHuge`.
const MAX_DEPTH: usize = 256;
/// Depth of nested entity references.
const MAX_ENTITY_DEPTH: u8 = 10;

struct RawAttribute<'a> {
    prefix: &'a str,
    local: &'a str,
    value: StrSpan<'a>,
    pos: usize,
}

struct StartTag<'a> {
    prefix: &'a str,
    local: &'a str,
    pos: usize,
    attrs: Vec<RawAttribute<'a>>,
}

fn qname(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_owned()
    } else {
        format!("{prefix}:{local}")
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Whether `href` has no scheme.
fn is_relative_uri(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once(':') else {
        return true;
    };
    let mut chars = scheme.chars();
    !(chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')))
}

/// State of one parse, building into the arena of a fresh document.
pub(super) struct ParserContext<'a> {
    doc: &'a Document,
    text: &'a str,
    options: &'a ParseOptions,
    line_starts: Vec<usize>,
    entities: HashMap<&'a str, &'a str>,
    diagnostics: Vec<Diagnostic>,
    /// Open elements, with their raw name.
    stack: Vec<(NodeId, String)>,
    start: Option<StartTag<'a>>,
    has_root: bool,
}

impl<'a> ParserContext<'a> {
    pub(super) fn new(doc: &'a Document, text: &'a str, options: &'a ParseOptions) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            doc,
            text,
            options,
            line_starts,
            entities: HashMap::new(),
            diagnostics: vec![],
            stack: vec![],
            start: None,
            has_root: false,
        }
    }

    pub(super) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub(super) fn report(&mut self, mut diag: Diagnostic) {
        if diag.file.is_none() {
            diag.file = self.options.base_url.clone();
        }
        self.diagnostics.push(diag);
    }

    /// Return the 1-based line and column of the byte `offset`.
    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&s| s <= offset);
        let start = self.line_starts[line.saturating_sub(1)];
        let column = self
            .text
            .get(start..offset)
            .map_or(1, |s| s.chars().count() + 1);
        (line, column)
    }

    fn line(&self, offset: usize) -> usize {
        self.position(offset).0
    }

    fn diagnostic(
        &self,
        domain: XmlErrorDomain,
        code: XmlParserErrors,
        level: XmlErrorLevel,
        offset: usize,
        message: String,
    ) -> Diagnostic {
        let (line, column) = self.position(offset);
        let mut diag = Diagnostic::new(domain, code, level, message).at(line, column);
        diag.file = self.options.base_url.clone();
        diag
    }

    fn fatal(&self, code: XmlParserErrors, offset: usize, message: String) -> Diagnostic {
        self.diagnostic(
            XmlErrorDomain::Parser,
            code,
            XmlErrorLevel::Fatal,
            offset,
            message,
        )
    }

    fn ns_error(&mut self, code: XmlParserErrors, offset: usize, message: String) {
        let diag = self.diagnostic(
            XmlErrorDomain::Namespace,
            code,
            XmlErrorLevel::Error,
            offset,
            message,
        );
        self.report(diag);
    }

    fn ns_warning(&mut self, code: XmlParserErrors, offset: usize, message: String) {
        let diag = self.diagnostic(
            XmlErrorDomain::Namespace,
            code,
            XmlErrorLevel::Warning,
            offset,
            message,
        );
        self.report(diag);
    }

    /// Parse the whole text. Return the fatal error which stopped the parse, if any.
    pub(super) fn parse(&mut self) -> Option<Diagnostic> {
        let doc = self.doc;
        let mut tree = doc.tree_mut();
        let mut tokens = Tokenizer::from(self.text).peekable();
        while let Some(token) = tokens.next() {
            let result = match token {
                Ok(token) => {
                    let before_close = matches!(
                        tokens.peek(),
                        Some(Ok(Token::ElementEnd {
                            end: ElementEnd::Close(..),
                            ..
                        }))
                    );
                    self.token(&mut tree, token, before_close)
                }
                Err(err) => {
                    let pos = err.pos();
                    let mut diag = Diagnostic::new(
                        XmlErrorDomain::Parser,
                        XmlParserErrors::XmlErrNotWellBalanced,
                        XmlErrorLevel::Fatal,
                        err.to_string(),
                    )
                    .at(pos.row as usize, pos.col as usize);
                    diag.file = self.options.base_url.clone();
                    Err(diag)
                }
            };
            if let Err(diag) = result {
                self.report(diag.clone());
                return Some(diag);
            }
        }

        let end = self.text.len();
        let diag = if let Some((id, name)) = self.stack.last() {
            let line = tree[*id].line;
            self.fatal(
                XmlParserErrors::XmlErrTagNotFinished,
                end,
                format!("Premature end of data in tag {name} line {line}"),
            )
        } else if !self.has_root {
            let message = if self.text.trim().is_empty() {
                "Document is empty"
            } else {
                "Start tag expected, '<' not found"
            };
            self.fatal(
                XmlParserErrors::XmlErrDocumentEmpty,
                end,
                message.to_owned(),
            )
        } else {
            return None;
        };
        self.report(diag.clone());
        Some(diag)
    }

    fn current(&self, tree: &Tree) -> NodeId {
        self.stack
            .last()
            .map_or_else(|| tree.document(), |&(id, _)| id)
    }

    fn link(&self, tree: &mut Tree, id: NodeId, offset: usize) {
        let parent = self.current(tree);
        tree.append_child(parent, id);
        tree[id].owner = tree.document();
        tree[id].line = self.line(offset);
    }

    fn append_text(&self, tree: &mut Tree, content: &str, offset: usize) {
        let parent = self.current(tree);
        if let Some(last) = tree.last_child(parent) {
            if tree.typ(last) == XmlElementType::XmlTextNode {
                tree.add_content(last, content);
                return;
            }
        }
        let text = tree.alloc(XmlElementType::XmlTextNode, "", content);
        self.link(tree, text, offset);
    }

    fn token(
        &mut self,
        tree: &mut Tree,
        token: Token<'a>,
        before_close: bool,
    ) -> Result<(), Diagnostic> {
        match token {
            Token::Declaration {
                version, encoding, ..
            } => {
                self.doc.set_version(version.as_str());
                self.doc.set_encoding(encoding.map(|e| e.as_str()));
            }
            Token::DtdStart {
                name, external_id, ..
            }
            | Token::EmptyDtd {
                name, external_id, ..
            } => {
                let (external_id, system_id) = match external_id {
                    Some(ExternalId::System(system)) => (None, Some(system.as_str().to_owned())),
                    Some(ExternalId::Public(public, system)) => (
                        Some(public.as_str().to_owned()),
                        Some(system.as_str().to_owned()),
                    ),
                    None => (None, None),
                };
                self.doc.set_dtd_decl(Some(Dtd {
                    name: name.as_str().to_owned(),
                    external_id,
                    system_id,
                }));
            }
            Token::EntityDeclaration {
                name, definition, ..
            } => {
                if let EntityDefinition::EntityValue(value) = definition {
                    self.entities.entry(name.as_str()).or_insert(value.as_str());
                }
            }
            Token::ProcessingInstruction {
                target,
                content,
                span,
            } => {
                let pi = tree.alloc(
                    XmlElementType::XmlPINode,
                    target.as_str(),
                    content.map_or("", |c| c.as_str()),
                );
                self.link(tree, pi, span.start());
            }
            Token::Comment { text, span } => {
                let comment = tree.alloc(XmlElementType::XmlCommentNode, "", text.as_str());
                self.link(tree, comment, span.start());
            }
            Token::Cdata { text, span } => {
                if self
                    .options
                    .has(XmlParserOption::XmlParseNocdata)
                {
                    self.append_text(tree, text.as_str(), span.start());
                } else {
                    let cdata = tree.alloc(XmlElementType::XmlCDATASectionNode, "", text.as_str());
                    self.link(tree, cdata, span.start());
                }
            }
            Token::Text { text } => self.char_data(tree, text, before_close)?,
            Token::ElementStart {
                prefix,
                local,
                span,
            } => {
                if self.stack.is_empty() && self.has_root {
                    return Err(self.fatal(
                        XmlParserErrors::XmlErrDocumentEnd,
                        span.start(),
                        "Extra content at the end of the document".to_owned(),
                    ));
                }
                self.start = Some(StartTag {
                    prefix: prefix.as_str(),
                    local: local.as_str(),
                    pos: span.start(),
                    attrs: vec![],
                });
            }
            Token::Attribute {
                prefix,
                local,
                value,
                span,
                ..
            } => {
                if let Some(start) = self.start.as_mut() {
                    start.attrs.push(RawAttribute {
                        prefix: prefix.as_str(),
                        local: local.as_str(),
                        value,
                        pos: span.start(),
                    });
                }
            }
            Token::ElementEnd { end, span } => match end {
                ElementEnd::Open => {
                    let (elem, name) = self.start_element(tree)?;
                    self.stack.push((elem, name));
                    if self.stack.len() > MAX_DEPTH
                        && !self.options.has(XmlParserOption::XmlParseHuge)
                    {
                        return Err(self.fatal(
                            XmlParserErrors::XmlErrInternalError,
                            span.start(),
                            format!(
                                "Excessive depth in document: {MAX_DEPTH} use XML_PARSE_HUGE option"
                            ),
                        ));
                    }
                }
                ElementEnd::Empty => {
                    self.start_element(tree)?;
                }
                ElementEnd::Close(prefix, local) => {
                    let close = qname(prefix.as_str(), local.as_str());
                    match self.stack.last() {
                        Some((_, open)) if *open == close => {
                            self.stack.pop();
                        }
                        Some((id, open)) => {
                            let line = tree[*id].line;
                            return Err(self.fatal(
                                XmlParserErrors::XmlErrTagNameMismatch,
                                span.start(),
                                format!(
                                    "Opening and ending tag mismatch: {open} line {line} and {close}"
                                ),
                            ));
                        }
                        None => {
                            return Err(self.fatal(
                                XmlParserErrors::XmlErrNotWellBalanced,
                                span.start(),
                                format!("Unexpected end tag : {close}"),
                            ));
                        }
                    }
                }
            },
            _ => {}
        }
        Ok(())
    }

    fn char_data(
        &mut self,
        tree: &mut Tree,
        text: StrSpan<'a>,
        before_close: bool,
    ) -> Result<(), Diagnostic> {
        let raw = text.as_str();
        let blank = raw.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
        if self.stack.is_empty() {
            if blank {
                return Ok(());
            }
            let (code, message) = if self.has_root {
                (
                    XmlParserErrors::XmlErrDocumentEnd,
                    "Extra content at the end of the document",
                )
            } else {
                (
                    XmlParserErrors::XmlErrDocumentEmpty,
                    "Start tag expected, '<' not found",
                )
            };
            return Err(self.fatal(code, text.start(), message.to_owned()));
        }
        if blank && self.options.has(XmlParserOption::XmlParseNoblanks) {
            // blanks are significant when they are the whole content of an element
            let parent = self.current(tree);
            if tree.first_child(parent).is_some() || !before_close {
                return Ok(());
            }
        }
        let content = self.expand(raw, false, 0, text.start())?;
        self.append_text(tree, &content, text.start());
        Ok(())
    }

    /// Create the element of the pending start tag, with its namespace declarations and its
    /// attributes. Return it with its raw name.
    fn start_element(&mut self, tree: &mut Tree) -> Result<(NodeId, String), Diagnostic> {
        let Some(tag) = self.start.take() else {
            return Err(self.fatal(
                XmlParserErrors::XmlErrInternalError,
                0,
                "end of a start tag without start tag".to_owned(),
            ));
        };
        let raw = qname(tag.prefix, tag.local);
        let parent = self.current(tree);
        let elem = tree.alloc(XmlElementType::XmlElementNode, tag.local, "");
        self.link(tree, elem, tag.pos);
        if parent == tree.document() {
            self.has_root = true;
        }

        let (decls, attrs): (Vec<_>, Vec<_>) = tag
            .attrs
            .iter()
            .partition(|a| a.prefix == "xmlns" || (a.prefix.is_empty() && a.local == "xmlns"));
        for decl in decls {
            self.declare(tree, elem, parent, decl)?;
        }

        let prefix = (!tag.prefix.is_empty()).then_some(tag.prefix);
        match tree.search_ns(elem, prefix) {
            Some(ns) if !tree.ns_href(ns).is_empty() => tree[elem].ns = Some(ns),
            None if prefix.is_some() => {
                self.ns_error(
                    XmlParserErrors::XmlNsErrUndefinedNamespace,
                    tag.pos,
                    format!(
                        "Namespace prefix {} on {} is not defined",
                        tag.prefix, tag.local
                    ),
                );
                tree[elem].name = raw.clone();
            }
            _ => {}
        }

        for attr in attrs {
            self.attribute(tree, elem, tag.local, attr)?;
        }
        Ok((elem, raw))
    }

    fn declare(
        &mut self,
        tree: &mut Tree,
        elem: NodeId,
        parent: NodeId,
        decl: &RawAttribute<'a>,
    ) -> Result<(), Diagnostic> {
        let href = self.expand(decl.value.as_str(), true, 0, decl.value.start())?;
        let prefix = (decl.prefix == "xmlns").then_some(decl.local);
        let attr_name = qname(decl.prefix, decl.local);

        if prefix == Some("xml") {
            if href != XML_XML_NAMESPACE {
                self.ns_error(
                    XmlParserErrors::XmlNsErrXmlNamespace,
                    decl.pos,
                    "xml namespace prefix mapped to wrong URI".to_owned(),
                );
            }
            return Ok(());
        }
        if href == XML_XML_NAMESPACE {
            self.ns_error(
                XmlParserErrors::XmlNsErrXmlNamespace,
                decl.pos,
                "xml namespace URI mapped to wrong prefix".to_owned(),
            );
            return Ok(());
        }
        if prefix == Some("xmlns") {
            self.ns_error(
                XmlParserErrors::XmlNsErrXmlNamespace,
                decl.pos,
                "redefinition of the xmlns prefix is forbidden".to_owned(),
            );
            return Ok(());
        }
        if let Some(prefix) = prefix.filter(|_| href.is_empty()) {
            self.ns_error(
                XmlParserErrors::XmlNsErrEmpty,
                decl.pos,
                format!("xmlns:{prefix}: Empty XML namespace is not allowed"),
            );
            return Ok(());
        }
        if !href.is_empty() && is_relative_uri(&href) {
            self.ns_warning(
                XmlParserErrors::XmlWarNsUriRelative,
                decl.pos,
                format!("{attr_name}: URI {href} is not absolute"),
            );
        }
        if tree.local_ns(elem, prefix).is_some() {
            return Err(self.fatal(
                XmlParserErrors::XmlErrAttributeRedefined,
                decl.pos,
                format!("Attribute {attr_name} redefined"),
            ));
        }
        if self.options.has(XmlParserOption::XmlParseNsclean)
            && tree.search_ns_pair(parent, prefix, &href).is_some()
        {
            return Ok(());
        }
        tree.new_ns(elem, prefix, &href);
        Ok(())
    }

    fn attribute(
        &mut self,
        tree: &mut Tree,
        elem: NodeId,
        elem_name: &str,
        attr: &RawAttribute<'a>,
    ) -> Result<(), Diagnostic> {
        let value = self.expand(attr.value.as_str(), true, 0, attr.value.start())?;
        let raw = qname(attr.prefix, attr.local);
        let (ns, name) = if attr.prefix.is_empty() {
            (None, attr.local.to_owned())
        } else {
            match tree.search_ns(elem, Some(attr.prefix)) {
                Some(ns) => (Some(ns), attr.local.to_owned()),
                None => {
                    self.ns_error(
                        XmlParserErrors::XmlNsErrUndefinedNamespace,
                        attr.pos,
                        format!(
                            "Namespace prefix {} for {} on {} is not defined",
                            attr.prefix, attr.local, elem_name
                        ),
                    );
                    (None, raw.clone())
                }
            }
        };

        let href = ns.map(|ns| tree.ns_href(ns).to_owned());
        let duplicate = tree.attributes(elem).iter().copied().find(|&a| {
            tree[a].name == name && tree[a].ns.map(|ns| tree.ns_href(ns)) == href.as_deref()
        });
        if let Some(existing) = duplicate {
            if tree.qname(existing) == raw || href.is_none() {
                return Err(self.fatal(
                    XmlParserErrors::XmlErrAttributeRedefined,
                    attr.pos,
                    format!("Attribute {raw} redefined"),
                ));
            }
            self.ns_error(
                XmlParserErrors::XmlNsErrAttributeRedefined,
                attr.pos,
                format!(
                    "Namespaced Attribute {} in '{}' redefined",
                    attr.local,
                    href.unwrap_or_default()
                ),
            );
            return Ok(());
        }

        let id = tree.alloc(XmlElementType::XmlAttributeNode, name, value);
        tree[id].ns = ns;
        tree[id].line = self.line(attr.pos);
        tree.append_attribute(elem, id);
        tree[id].owner = tree.document();
        Ok(())
    }

    /// Replace the references of `raw` and normalize its line ends.
    ///
    /// Attribute values also get their white space normalized.
    fn expand(
        &self,
        raw: &str,
        attribute: bool,
        depth: u8,
        offset: usize,
    ) -> Result<String, Diagnostic> {
        if depth > MAX_ENTITY_DEPTH {
            return Err(self.fatal(
                XmlParserErrors::XmlErrEntityLoop,
                offset,
                "Detected an entity reference loop".to_owned(),
            ));
        }
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '&' => {
                    let Some(end) = raw[i + 1..].find(';') else {
                        return Err(self.fatal(
                            XmlParserErrors::XmlErrEntityRefSemicolMissing,
                            offset,
                            "EntityRef: expecting ';'".to_owned(),
                        ));
                    };
                    let stop = i + 1 + end;
                    while chars.next_if(|&(j, _)| j <= stop).is_some() {}
                    self.reference(&raw[i + 1..stop], attribute, depth, offset, &mut out)?;
                }
                '\r' => {
                    chars.next_if(|&(_, c)| c == '\n');
                    out.push(if attribute { ' ' } else { '\n' });
                }
                '\n' | '\t' if attribute => out.push(' '),
                c => out.push(c),
            }
        }
        Ok(out)
    }

    fn reference(
        &self,
        name: &str,
        attribute: bool,
        depth: u8,
        offset: usize,
        out: &mut String,
    ) -> Result<(), Diagnostic> {
        if let Some(num) = name.strip_prefix('#') {
            let value = match num.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            return match value.and_then(char::from_u32).filter(|&c| is_xml_char(c)) {
                Some(c) => {
                    out.push(c);
                    Ok(())
                }
                None => Err(self.fatal(
                    XmlParserErrors::XmlErrInvalidCharRef,
                    offset,
                    format!("xmlParseCharRef: invalid xmlChar value {num}"),
                )),
            };
        }
        let c = match name {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "apos" => '\'',
            "quot" => '"',
            _ => {
                let Some(value) = self.entities.get(name) else {
                    return Err(self.fatal(
                        XmlParserErrors::XmlErrUndeclaredEntity,
                        offset,
                        format!("Entity '{name}' not defined"),
                    ));
                };
                let expanded = self.expand(value, attribute, depth + 1, offset)?;
                out.push_str(&expanded);
                return Ok(());
            }
        };
        out.push(c);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_uris() {
        assert!(is_relative_uri("foo"));
        assert!(is_relative_uri("../foo:bar"));
        assert!(!is_relative_uri("urn:foo"));
        assert!(!is_relative_uri("http://example.com/"));
    }

    #[test]
    fn references_are_expanded() {
        let doc = Document::new();
        let options = ParseOptions::default();
        let mut ctxt = ParserContext::new(&doc, "", &options);
        ctxt.entities.insert("e", "&lt;&#x41;");
        assert_eq!(ctxt.expand("a&e;b\r\nc", false, 0, 0).unwrap(), "a<Ab\nc");
        assert_eq!(ctxt.expand("a\tb\nc", true, 0, 0).unwrap(), "a b c");
        assert!(ctxt.expand("&nope;", false, 0, 0).is_err());
        assert!(ctxt.expand("&#0;", false, 0, 0).is_err());

        ctxt.entities.insert("loop", "&loop;");
        let err = ctxt.expand("&loop;", false, 0, 0).unwrap_err();
        assert_eq!(err.code, XmlParserErrors::XmlErrEntityLoop);
    }

    #[test]
    fn positions_are_one_based() {
        let doc = Document::new();
        let options = ParseOptions::default();
        let ctxt = ParserContext::new(&doc, "ab\ncd", &options);
        assert_eq!(ctxt.position(0), (1, 1));
        assert_eq!(ctxt.position(4), (2, 2));
    }
}
