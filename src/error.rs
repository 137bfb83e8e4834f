//! Provide error types and structured diagnostics.
//!
//! Two different things are reported by this crate.
//! - [`XmlError`]: misuse of the API (no root, hierarchy violation, ...) and fatal syntax errors.
//!   These are returned as `Err` and never recorded on a document.
//! - [`Diagnostic`]: recoverable conditions found while parsing or validating.
//!   These are collected on the [`Document`](crate::Document).

use std::{borrow::Cow, fmt};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, XmlError>;

/// Errors returned by the operations of this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XmlError {
    #[error("Document has no root element")]
    NoRoot,
    #[error("Holder document already has a root node")]
    RootExists,
    #[error("hierarchy request error: {0}")]
    HierarchyRequest(Cow<'static, str>),
    #[error("type mismatch: {0}")]
    TypeMismatch(Cow<'static, str>),
    #[error("invalid argument: {0}")]
    InvalidArgument(Cow<'static, str>),
    #[error("prefix '{prefix}' is already bound to '{href}' on this element")]
    NamespaceConflict { prefix: String, href: String },
    #[error("Must pass a schema document")]
    MissingSchema,
    #[error("node has no parent")]
    NoParent,
    #[error("invalid expression: {0}")]
    XPath(String),
    #[error("{0}")]
    Syntax(Diagnostic),
}

/// The module a [`Diagnostic`] comes from.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlErrorDomain {
    #[default]
    None = 0,
    Parser = 1,
    Tree = 2,
    Namespace = 3,
    Output = 7,
    IO = 8,
    XPath = 12,
    SchemasV = 17,
    Validation = 23,
}

impl fmt::Display for XmlErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "",
            Self::Parser => "parser",
            Self::Tree => "tree",
            Self::Namespace => "namespace",
            Self::Output => "output",
            Self::IO => "I/O",
            Self::XPath => "XPath",
            Self::SchemasV => "Schemas validity",
            Self::Validation => "validity",
        };
        f.write_str(s)
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum XmlErrorLevel {
    #[default]
    None = 0,
    Warning = 1,
    Error = 2,
    Fatal = 3,
}

impl fmt::Display for XmlErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "error",
        };
        f.write_str(s)
    }
}

macro_rules! impl_xml_parser_errors {
    ( $( $variant:ident = $value:literal ),* $(,)? ) => {
        /// Error codes, numbered as libxml2 numbers them.
        #[repr(i32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub enum XmlParserErrors {
            #[default]
            $(
                $variant = $value
            ),*
        }

        impl TryFrom<i32> for XmlParserErrors {
            type Error = anyhow::Error;
            fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
                $(
                    if value == Self:: $variant as i32 {
                        return Ok(Self:: $variant);
                    }
                )*
                Err(anyhow::anyhow!("Invalid convert from value '{value}' to {}", std::any::type_name::<Self>()))
            }
        }
    };
}
impl_xml_parser_errors!(
    XmlErrOK = 0,
    XmlErrInternalError = 1,
    XmlErrDocumentEmpty = 4,
    XmlErrDocumentEnd = 5,
    XmlErrInvalidCharRef = 8,
    XmlErrInvalidChar = 9,
    XmlErrEntityRefSemicolMissing = 23,
    XmlErrUndeclaredEntity = 26,
    XmlErrUnsupportedEncoding = 32,
    XmlErrAttributeRedefined = 42,
    XmlErrNameRequired = 68,
    XmlErrTagNameMismatch = 76,
    XmlErrTagNotFinished = 77,
    XmlErrNotWellBalanced = 85,
    XmlErrExtraContent = 86,
    XmlErrEntityLoop = 89,
    XmlWarNsUriRelative = 100,
    XmlNsErrUndefinedNamespace = 201,
    XmlNsErrQname = 202,
    XmlNsErrXmlNamespace = 200,
    XmlNsErrAttributeRedefined = 203,
    XmlNsErrEmpty = 204,
    XmlXPathExprError = 1207,
    XmlSchemavCvcElt1 = 1845,
);

/// A structured diagnostic, as reported by the parser or a validator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diagnostic {
    pub domain: XmlErrorDomain,
    pub code: XmlParserErrors,
    pub level: XmlErrorLevel,
    pub file: Option<String>,
    pub line: usize,
    /// 1-based, 0 if not available.
    pub column: usize,
    pub message: Cow<'static, str>,
}

impl Diagnostic {
    pub fn new(
        domain: XmlErrorDomain,
        code: XmlParserErrors,
        level: XmlErrorLevel,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            domain,
            code,
            level,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn is_warning(&self) -> bool {
        self.level == XmlErrorLevel::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.as_deref().unwrap_or("Entity");
        write!(
            f,
            "{file}:{}:{}: {} {} : {}",
            self.line, self.column, self.domain, self.level, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_error_codes_round_trip_from_i32() {
        assert_eq!(
            XmlParserErrors::try_from(201).unwrap(),
            XmlParserErrors::XmlNsErrUndefinedNamespace
        );
        assert!(XmlParserErrors::try_from(-1).is_err());
    }

    #[test]
    fn diagnostic_display() {
        let diag = Diagnostic::new(
            XmlErrorDomain::Namespace,
            XmlParserErrors::XmlNsErrUndefinedNamespace,
            XmlErrorLevel::Error,
            "Namespace prefix p on a is not defined",
        )
        .at(1, 5);
        assert_eq!(
            diag.to_string(),
            "Entity:1:5: namespace error : Namespace prefix p on a is not defined"
        );
    }
}
