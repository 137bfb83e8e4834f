//! Validation of documents against schema documents.
//!
//! Grammars are not compiled here. A [`SchemaValidator`] receives both documents and reports what
//! it finds as [`Diagnostic`]s, which [`Document::validate`] records on the validated document.

use tracing::debug;

use crate::{
    dom::{Document, Node},
    error::{Diagnostic, XmlErrorDomain, XmlErrorLevel, XmlParserErrors},
};

/// Checks a document against a schema document.
pub trait SchemaValidator {
    /// Return the diagnostics found while validating `doc` against `schema`.
    ///
    /// An empty vector means the document is valid.
    fn validate(&self, doc: &Document, schema: &Document) -> Vec<Diagnostic>;
}

/// Check that the root element of the document is the one the schema declares.
///
/// The declared name is the `name` attribute of the schema's root element, as for the top-level
/// `xs:element` of a W3C XML Schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootNameValidator;

impl SchemaValidator for RootNameValidator {
    fn validate(&self, doc: &Document, schema: &Document) -> Vec<Diagnostic> {
        let expected = schema
            .root()
            .and_then(|root| root.attr("name"))
            .map(|attr| attr.value());
        let Some(expected) = expected else {
            return vec![];
        };
        let Some(root) = doc.root() else {
            return vec![Diagnostic::new(
                XmlErrorDomain::SchemasV,
                XmlParserErrors::XmlSchemavCvcElt1,
                XmlErrorLevel::Error,
                "Document has no root element\n",
            )];
        };
        let name = root.name();
        if name == expected {
            return vec![];
        }
        debug!(expected = %expected, found = %name, "root element mismatch");
        let diag = Diagnostic::new(
            XmlErrorDomain::SchemasV,
            XmlParserErrors::XmlSchemavCvcElt1,
            XmlErrorLevel::Error,
            format!(
                "Element '{name}': No matching global declaration available for the validation root.\n"
            ),
        );
        let mut diag = diag.at(root.line(), 0);
        diag.file = doc.url();
        vec![diag]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XmlError;

    fn schema(name: &str) -> Document {
        let schema = Document::new();
        let root = schema.node("element", None).unwrap();
        root.set_attr("name", name).unwrap();
        schema
    }

    #[test]
    fn matching_root_is_valid() {
        let doc = Document::new();
        doc.node("order", None).unwrap();
        assert!(doc.validate(Some(&schema("order")), &RootNameValidator).unwrap());
        assert!(doc.validation_errors().is_empty());
    }

    #[test]
    fn other_root_is_reported() {
        let doc = Document::new();
        doc.node("invoice", None).unwrap();
        assert!(!doc.validate(Some(&schema("order")), &RootNameValidator).unwrap());
        let errors = doc.validation_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, XmlParserErrors::XmlSchemavCvcElt1);
        assert!(errors[0].message.contains("'invoice'"));
        assert!(doc.errors().is_empty());

        // a later validation replaces the diagnostics
        doc.root().unwrap().set_name("order").unwrap();
        assert!(doc.validate(Some(&schema("order")), &RootNameValidator).unwrap());
        assert!(doc.validation_errors().is_empty());
    }

    #[test]
    fn schema_is_required() {
        let doc = Document::new();
        doc.node("order", None).unwrap();
        assert_eq!(
            doc.validate(None, &RootNameValidator),
            Err(XmlError::MissingSchema)
        );
        assert_eq!(
            doc.validate(Some(&Document::new()), &RootNameValidator),
            Err(XmlError::MissingSchema)
        );
    }
}
