//! Evaluation of XPath 1.0 expressions over a document arena.
//!
//! The namespace axis and variables are not supported.
//! Name tests with a prefix are resolved through the bindings given by the caller, never
//! through the declarations of the document.

mod compile;
mod evaluate;
mod functions;

use std::fmt;

use tracing::trace;

use crate::{
    dom::NodeRef,
    error::{Result, XmlError},
    tree::{NodeId, Tree},
};

/// The set of XPath error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XmlXPathError {
    XPathNumberError,
    XPathUnfinishedLiteralError,
    XPathVariableRefError,
    XPathInvalidPredicateError,
    XPathExprError,
    XPathUnknownFuncError,
    XPathInvalidOperand,
    XPathInvalidType,
    XPathInvalidArity,
    XPathUndefPrefixError,
    XPathInvalidCharError,
    XPathUnsupportedAxis,
}

impl fmt::Display for XmlXPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::XPathNumberError => "Number encoding",
            Self::XPathUnfinishedLiteralError => "Unfinished literal",
            Self::XPathVariableRefError => "Variables are not supported",
            Self::XPathInvalidPredicateError => "Invalid predicate",
            Self::XPathExprError => "Invalid expression",
            Self::XPathUnknownFuncError => "Unregistered function",
            Self::XPathInvalidOperand => "Invalid operand",
            Self::XPathInvalidType => "Invalid type",
            Self::XPathInvalidArity => "Invalid number of arguments",
            Self::XPathUndefPrefixError => "Undefined namespace prefix",
            Self::XPathInvalidCharError => "Char out of XML range",
            Self::XPathUnsupportedAxis => "Unsupported axis",
        };
        f.write_str(msg)
    }
}

/// The result of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue<N = NodeRef> {
    /// Nodes in document order.
    NodeSet(Vec<N>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl<N> XPathValue<N> {
    /// Convert the nodes of a node-set, dropping those `f` rejects.
    pub fn filter_map<M>(self, f: impl FnMut(N) -> Option<M>) -> XPathValue<M> {
        match self {
            Self::NodeSet(nodes) => XPathValue::NodeSet(nodes.into_iter().filter_map(f).collect()),
            Self::Boolean(b) => XPathValue::Boolean(b),
            Self::Number(n) => XPathValue::Number(n),
            Self::String(s) => XPathValue::String(s),
        }
    }

    pub fn as_nodes(&self) -> Option<&[N]> {
        match self {
            Self::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Evaluate `expr` with `context` as the context node.
pub(crate) fn evaluate(
    tree: &Tree,
    context: NodeId,
    expr: &str,
    namespaces: &[(&str, &str)],
) -> Result<XPathValue<NodeId>> {
    let fail = |err: XmlXPathError| XmlError::XPath(format!("{err} in '{expr}'"));
    let compiled = compile::compile(expr).map_err(fail)?;
    let value = evaluate::Evaluator::new(tree, context, namespaces)
        .eval_root(&compiled)
        .map_err(fail)?;
    trace!(expr, "evaluated XPath expression");
    Ok(value)
}
