//! The XPath 1.0 core function library, without `id()` and `lang()`.

use crate::tree::{NodeId, XmlElementType};

use super::{
    XPathValue, XmlXPathError,
    evaluate::{Context, Evaluator, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum XPathFunction {
    Last,
    Position,
    Count,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl XPathFunction {
    pub(super) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "last" => Self::Last,
            "position" => Self::Position,
            "count" => Self::Count,
            "local-name" => Self::LocalName,
            "namespace-uri" => Self::NamespaceUri,
            "name" => Self::Name,
            "string" => Self::String,
            "concat" => Self::Concat,
            "starts-with" => Self::StartsWith,
            "contains" => Self::Contains,
            "substring-before" => Self::SubstringBefore,
            "substring-after" => Self::SubstringAfter,
            "substring" => Self::Substring,
            "string-length" => Self::StringLength,
            "normalize-space" => Self::NormalizeSpace,
            "translate" => Self::Translate,
            "boolean" => Self::Boolean,
            "not" => Self::Not,
            "true" => Self::True,
            "false" => Self::False,
            "number" => Self::Number,
            "sum" => Self::Sum,
            "floor" => Self::Floor,
            "ceiling" => Self::Ceiling,
            "round" => Self::Round,
            _ => return None,
        })
    }

    /// Whether the function can be called with `count` arguments.
    pub(super) fn accepts(self, count: usize) -> bool {
        match self {
            Self::Last | Self::Position | Self::True | Self::False => count == 0,
            Self::LocalName
            | Self::NamespaceUri
            | Self::Name
            | Self::String
            | Self::StringLength
            | Self::NormalizeSpace
            | Self::Number => count <= 1,
            Self::Count
            | Self::Boolean
            | Self::Not
            | Self::Sum
            | Self::Floor
            | Self::Ceiling
            | Self::Round => count == 1,
            Self::StartsWith | Self::Contains | Self::SubstringBefore | Self::SubstringAfter => {
                count == 2
            }
            Self::Substring => count == 2 || count == 3,
            Self::Translate => count == 3,
            Self::Concat => count >= 2,
        }
    }

    pub(super) fn call(
        self,
        ev: &Evaluator,
        ctx: Context,
        args: Vec<Value>,
    ) -> Result<Value, XmlXPathError> {
        let string_arg = |i: usize| -> String {
            match args.get(i) {
                Some(value) => ev.to_string(value),
                None => ev.string_value(ctx.node),
            }
        };
        let number_arg = |i: usize| -> f64 {
            match args.get(i) {
                Some(value) => ev.to_number(value),
                None => ev.to_number(&XPathValue::NodeSet(vec![ctx.node])),
            }
        };
        // the node a name function looks at, `None` for an empty node-set
        let node_arg = || -> Result<Option<NodeId>, XmlXPathError> {
            match args.first() {
                Some(XPathValue::NodeSet(nodes)) => Ok(nodes.first().copied()),
                Some(_) => Err(XmlXPathError::XPathInvalidType),
                None => Ok(Some(ctx.node)),
            }
        };

        let value = match self {
            Self::Last => XPathValue::Number(ctx.size as f64),
            Self::Position => XPathValue::Number(ctx.position as f64),
            Self::Count => match &args[0] {
                XPathValue::NodeSet(nodes) => XPathValue::Number(nodes.len() as f64),
                _ => return Err(XmlXPathError::XPathInvalidType),
            },
            Self::Sum => match &args[0] {
                XPathValue::NodeSet(nodes) => XPathValue::Number(
                    nodes
                        .iter()
                        .map(|&n| ev.to_number(&XPathValue::String(ev.string_value(n))))
                        .sum(),
                ),
                _ => return Err(XmlXPathError::XPathInvalidType),
            },
            Self::LocalName => {
                let name = node_arg()?.map(|n| local_name(ev, n)).unwrap_or_default();
                XPathValue::String(name)
            }
            Self::NamespaceUri => {
                let uri = node_arg()?
                    .and_then(|n| ev.tree[n].ns)
                    .map(|ns| ev.tree.ns_href(ns).to_owned())
                    .unwrap_or_default();
                XPathValue::String(uri)
            }
            Self::Name => {
                let name = node_arg()?.map(|n| qualified_name(ev, n)).unwrap_or_default();
                XPathValue::String(name)
            }
            Self::String => XPathValue::String(string_arg(0)),
            Self::Concat => XPathValue::String(args.iter().map(|v| ev.to_string(v)).collect()),
            Self::StartsWith => XPathValue::Boolean(string_arg(0).starts_with(&string_arg(1))),
            Self::Contains => XPathValue::Boolean(string_arg(0).contains(&string_arg(1))),
            Self::SubstringBefore => {
                let s = string_arg(0);
                let before = s.find(&string_arg(1)).map(|pos| &s[..pos]).unwrap_or("");
                XPathValue::String(before.to_owned())
            }
            Self::SubstringAfter => {
                let s = string_arg(0);
                let pat = string_arg(1);
                let after = s.find(&pat).map(|pos| &s[pos + pat.len()..]).unwrap_or("");
                XPathValue::String(after.to_owned())
            }
            Self::Substring => {
                let s = string_arg(0);
                let start = round(number_arg(1));
                let end = (args.len() == 3).then(|| start + round(number_arg(2)));
                let sub = s
                    .chars()
                    .enumerate()
                    .filter(|&(i, _)| {
                        let pos = (i + 1) as f64;
                        pos >= start && end.is_none_or(|end| pos < end)
                    })
                    .map(|(_, c)| c)
                    .collect();
                XPathValue::String(sub)
            }
            Self::StringLength => XPathValue::Number(string_arg(0).chars().count() as f64),
            Self::NormalizeSpace => {
                let s = string_arg(0);
                let words = s
                    .split(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
                    .filter(|w| !w.is_empty())
                    .collect::<Vec<_>>();
                XPathValue::String(words.join(" "))
            }
            Self::Translate => {
                let from = string_arg(1).chars().collect::<Vec<_>>();
                let to = string_arg(2).chars().collect::<Vec<_>>();
                let translated = string_arg(0)
                    .chars()
                    .filter_map(|c| match from.iter().position(|&f| f == c) {
                        Some(pos) => to.get(pos).copied(),
                        None => Some(c),
                    })
                    .collect();
                XPathValue::String(translated)
            }
            Self::Boolean => XPathValue::Boolean(ev.to_boolean(&args[0])),
            Self::Not => XPathValue::Boolean(!ev.to_boolean(&args[0])),
            Self::True => XPathValue::Boolean(true),
            Self::False => XPathValue::Boolean(false),
            Self::Number => XPathValue::Number(number_arg(0)),
            Self::Floor => XPathValue::Number(number_arg(0).floor()),
            Self::Ceiling => XPathValue::Number(number_arg(0).ceil()),
            Self::Round => XPathValue::Number(round(number_arg(0))),
        };
        Ok(value)
    }
}

/// Round half up, keeping the sign of values in `[-0.5, 0)`.
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    if (-0.5..0.0).contains(&n) {
        return -0.0;
    }
    (n + 0.5).floor()
}

fn local_name(ev: &Evaluator, id: NodeId) -> String {
    match ev.tree.typ(id) {
        XmlElementType::XmlElementNode
        | XmlElementType::XmlAttributeNode
        | XmlElementType::XmlPINode => ev.tree[id].name.clone(),
        _ => String::new(),
    }
}

fn qualified_name(ev: &Evaluator, id: NodeId) -> String {
    match ev.tree.typ(id) {
        XmlElementType::XmlElementNode | XmlElementType::XmlAttributeNode => ev.tree.qname(id),
        XmlElementType::XmlPINode => ev.tree[id].name.clone(),
        _ => String::new(),
    }
}
