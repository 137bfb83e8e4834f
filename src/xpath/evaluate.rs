use std::collections::HashMap;

use crate::tree::{NodeId, Tree, XML_XML_NAMESPACE, XmlElementType};

use super::{
    XPathValue, XmlXPathError,
    compile::{
        ArithOp, CmpOp, Expr, PathStart, Step, XmlXPathAxisVal, XmlXPathTestVal, XmlXPathTypeVal,
    },
};

pub(super) type Value = XPathValue<NodeId>;

/// The context of an evaluation step.
#[derive(Debug, Clone, Copy)]
pub(super) struct Context {
    pub(super) node: NodeId,
    pub(super) position: usize,
    pub(super) size: usize,
}

/// A node test whose prefix was resolved to a namespace name.
enum ResolvedTest<'a> {
    Type(XmlXPathTypeVal),
    PI(Option<&'a str>),
    All,
    Ns(String),
    Name(Option<String>, &'a str),
}

pub(super) struct Evaluator<'a> {
    pub(super) tree: &'a Tree,
    context: NodeId,
    namespaces: &'a [(&'a str, &'a str)],
    /// Every reachable node in document order.
    order: Vec<NodeId>,
    rank: HashMap<NodeId, usize>,
}

impl<'a> Evaluator<'a> {
    pub(super) fn new(
        tree: &'a Tree,
        context: NodeId,
        namespaces: &'a [(&'a str, &'a str)],
    ) -> Self {
        let mut top = context;
        while let Some(parent) = tree.parent(top) {
            top = parent;
        }
        let mut order = tree.subtree(tree.document());
        if top != tree.document() {
            order.extend(tree.subtree(top));
        }
        let rank = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self {
            tree,
            context,
            namespaces,
            order,
            rank,
        }
    }

    pub(super) fn eval_root(&self, expr: &Expr) -> Result<Value, XmlXPathError> {
        let context = Context {
            node: self.context,
            position: 1,
            size: 1,
        };
        self.eval(expr, context)
    }

    pub(super) fn eval(&self, expr: &Expr, ctx: Context) -> Result<Value, XmlXPathError> {
        match expr {
            Expr::Or(lhs, rhs) => Ok(XPathValue::Boolean(
                self.to_boolean(&self.eval(lhs, ctx)?) || self.to_boolean(&self.eval(rhs, ctx)?),
            )),
            Expr::And(lhs, rhs) => Ok(XPathValue::Boolean(
                self.to_boolean(&self.eval(lhs, ctx)?) && self.to_boolean(&self.eval(rhs, ctx)?),
            )),
            Expr::Compare(op, lhs, rhs) => {
                let lhs = self.eval(lhs, ctx)?;
                let rhs = self.eval(rhs, ctx)?;
                Ok(XPathValue::Boolean(self.compare(*op, &lhs, &rhs)))
            }
            Expr::Arith(op, lhs, rhs) => {
                let lhs = self.to_number(&self.eval(lhs, ctx)?);
                let rhs = self.to_number(&self.eval(rhs, ctx)?);
                Ok(XPathValue::Number(match op {
                    ArithOp::Plus => lhs + rhs,
                    ArithOp::Minus => lhs - rhs,
                    ArithOp::Mult => lhs * rhs,
                    ArithOp::Div => lhs / rhs,
                    ArithOp::Mod => lhs % rhs,
                }))
            }
            Expr::Neg(expr) => Ok(XPathValue::Number(-self.to_number(&self.eval(expr, ctx)?))),
            Expr::Union(lhs, rhs) => {
                let mut nodes = self.node_set(self.eval(lhs, ctx)?)?;
                nodes.extend(self.node_set(self.eval(rhs, ctx)?)?);
                self.sort(&mut nodes);
                Ok(XPathValue::NodeSet(nodes))
            }
            Expr::Literal(literal) => Ok(XPathValue::String(literal.clone())),
            Expr::Number(number) => Ok(XPathValue::Number(*number)),
            Expr::Function(function, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                function.call(self, ctx, args)
            }
            Expr::Filter(primary, predicates) => {
                let nodes = self.node_set(self.eval(primary, ctx)?)?;
                Ok(XPathValue::NodeSet(self.filter(nodes, predicates)?))
            }
            Expr::Path(start, steps) => {
                let mut nodes = match start {
                    PathStart::Root => vec![self.tree.document()],
                    PathStart::Context => vec![ctx.node],
                    PathStart::Filter(filter) => self.node_set(self.eval(filter, ctx)?)?,
                };
                for step in steps {
                    nodes = self.step(&nodes, step)?;
                }
                Ok(XPathValue::NodeSet(nodes))
            }
        }
    }

    fn node_set(&self, value: Value) -> Result<Vec<NodeId>, XmlXPathError> {
        match value {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            _ => Err(XmlXPathError::XPathInvalidType),
        }
    }

    /// Sort `nodes` in document order and remove duplicates.
    fn sort(&self, nodes: &mut Vec<NodeId>) {
        nodes.sort_by_key(|id| self.rank.get(id).copied().unwrap_or(usize::MAX));
        nodes.dedup();
    }

    /// Keep the nodes of `nodes` for which every predicate holds, positions counted in the
    /// order of `nodes`.
    fn filter(
        &self,
        mut nodes: Vec<NodeId>,
        predicates: &[Expr],
    ) -> Result<Vec<NodeId>, XmlXPathError> {
        for predicate in predicates {
            let size = nodes.len();
            let mut kept = Vec::with_capacity(size);
            for (i, &node) in nodes.iter().enumerate() {
                let ctx = Context {
                    node,
                    position: i + 1,
                    size,
                };
                let keep = match self.eval(predicate, ctx)? {
                    XPathValue::Number(n) => n == (i + 1) as f64,
                    value => self.to_boolean(&value),
                };
                if keep {
                    kept.push(node);
                }
            }
            nodes = kept;
        }
        Ok(nodes)
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<String, XmlXPathError> {
        if prefix == "xml" {
            return Ok(XML_XML_NAMESPACE.to_owned());
        }
        self.namespaces
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, href)| (*href).to_owned())
            .ok_or(XmlXPathError::XPathUndefPrefixError)
    }

    fn resolve<'t>(&self, test: &'t XmlXPathTestVal) -> Result<ResolvedTest<'t>, XmlXPathError> {
        Ok(match test {
            XmlXPathTestVal::NodeTestType(typ) => ResolvedTest::Type(*typ),
            XmlXPathTestVal::NodeTestPI(target) => ResolvedTest::PI(target.as_deref()),
            XmlXPathTestVal::NodeTestAll => ResolvedTest::All,
            XmlXPathTestVal::NodeTestNs(prefix) => ResolvedTest::Ns(self.resolve_prefix(prefix)?),
            XmlXPathTestVal::NodeTestName(prefix, local) => {
                let href = prefix.as_deref().map(|p| self.resolve_prefix(p)).transpose()?;
                ResolvedTest::Name(href, local)
            }
        })
    }

    fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        self.tree[id].ns.map(|ns| self.tree.ns_href(ns))
    }

    fn matches(&self, id: NodeId, axis: XmlXPathAxisVal, test: &ResolvedTest) -> bool {
        let typ = self.tree.typ(id);
        let principal = if axis == XmlXPathAxisVal::AxisAttribute {
            XmlElementType::XmlAttributeNode
        } else {
            XmlElementType::XmlElementNode
        };
        match test {
            ResolvedTest::Type(XmlXPathTypeVal::NodeTypeNode) => true,
            ResolvedTest::Type(XmlXPathTypeVal::NodeTypeText) => matches!(
                typ,
                XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode
            ),
            ResolvedTest::Type(XmlXPathTypeVal::NodeTypeComment) => {
                typ == XmlElementType::XmlCommentNode
            }
            ResolvedTest::PI(target) => {
                typ == XmlElementType::XmlPINode
                    && target.is_none_or(|target| self.tree[id].name == target)
            }
            ResolvedTest::All => typ == principal,
            ResolvedTest::Ns(href) => {
                typ == principal && self.namespace_uri(id) == Some(href.as_str())
            }
            ResolvedTest::Name(href, local) => {
                typ == principal
                    && self.tree[id].name == *local
                    && self.namespace_uri(id) == href.as_deref()
            }
        }
    }

    /// Collect the nodes along `axis` from `id`, nearest first.
    fn axis(&self, id: NodeId, axis: XmlXPathAxisVal) -> Vec<NodeId> {
        let tree = self.tree;
        let in_children = |n: &NodeId| tree.typ(*n).is_child();
        match axis {
            XmlXPathAxisVal::AxisSelf => vec![id],
            XmlXPathAxisVal::AxisChild => tree.children(id).collect(),
            XmlXPathAxisVal::AxisAttribute => tree.attributes(id).to_vec(),
            XmlXPathAxisVal::AxisParent => tree.parent(id).into_iter().collect(),
            XmlXPathAxisVal::AxisAncestor | XmlXPathAxisVal::AxisAncestorOrSelf => {
                let mut out = vec![];
                if axis == XmlXPathAxisVal::AxisAncestorOrSelf {
                    out.push(id);
                }
                let mut cur = tree.parent(id);
                while let Some(p) = cur {
                    out.push(p);
                    cur = tree.parent(p);
                }
                out
            }
            XmlXPathAxisVal::AxisDescendant => {
                tree.subtree(id).into_iter().skip(1).filter(in_children).collect()
            }
            XmlXPathAxisVal::AxisDescendantOrSelf => {
                let mut out = vec![id];
                out.extend(tree.subtree(id).into_iter().skip(1).filter(in_children));
                out
            }
            XmlXPathAxisVal::AxisFollowingSibling | XmlXPathAxisVal::AxisPrecedingSibling => {
                if !tree.typ(id).is_child() {
                    return vec![];
                }
                let forward = axis == XmlXPathAxisVal::AxisFollowingSibling;
                let step = |n| {
                    if forward {
                        tree.next_sibling(n)
                    } else {
                        tree.prev_sibling(n)
                    }
                };
                let mut out = vec![];
                let mut cur = step(id);
                while let Some(n) = cur {
                    out.push(n);
                    cur = step(n);
                }
                out
            }
            XmlXPathAxisVal::AxisFollowing => {
                let Some(&pos) = self.rank.get(&id) else {
                    return vec![];
                };
                self.order[pos + 1..]
                    .iter()
                    .copied()
                    .filter(|&n| in_children(&n) && !tree.is_ancestor_or_self(id, n))
                    .collect()
            }
            XmlXPathAxisVal::AxisPreceding => {
                let Some(&pos) = self.rank.get(&id) else {
                    return vec![];
                };
                self.order[..pos]
                    .iter()
                    .rev()
                    .copied()
                    .filter(|&n| in_children(&n) && !tree.is_ancestor_or_self(n, id))
                    .collect()
            }
        }
    }

    fn step(&self, nodes: &[NodeId], step: &Step) -> Result<Vec<NodeId>, XmlXPathError> {
        let test = self.resolve(&step.test)?;
        let mut out = vec![];
        for &node in nodes {
            let selected = self
                .axis(node, step.axis)
                .into_iter()
                .filter(|&n| self.matches(n, step.axis, &test))
                .collect::<Vec<_>>();
            // axis order is nearest first, which is what predicates count along
            out.extend(self.filter(selected, &step.predicates)?);
        }
        if nodes.len() > 1 || step.axis.is_reverse() {
            self.sort(&mut out);
        }
        Ok(out)
    }

    /// Return the string-value of a node.
    pub(super) fn string_value(&self, id: NodeId) -> String {
        self.tree.content(id)
    }

    pub(super) fn to_string(&self, value: &Value) -> String {
        match value {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|&n| self.string_value(n))
                .unwrap_or_default(),
            XPathValue::Boolean(b) => b.to_string(),
            XPathValue::Number(n) => format_number(*n),
            XPathValue::String(s) => s.clone(),
        }
    }

    pub(super) fn to_number(&self, value: &Value) -> f64 {
        match value {
            XPathValue::NodeSet(_) => parse_number(&self.to_string(value)),
            XPathValue::Boolean(b) => f64::from(u8::from(*b)),
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => parse_number(s),
        }
    }

    pub(super) fn to_boolean(&self, value: &Value) -> bool {
        match value {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
        }
    }

    /// Compare two values following the rules of XPath 1.0 section 3.4.
    fn compare(&self, op: CmpOp, lhs: &Value, rhs: &Value) -> bool {
        match (lhs, rhs) {
            (XPathValue::NodeSet(_), XPathValue::Boolean(_))
            | (XPathValue::Boolean(_), XPathValue::NodeSet(_)) => compare_atoms(
                op,
                &XPathValue::Boolean(self.to_boolean(lhs)),
                &XPathValue::Boolean(self.to_boolean(rhs)),
            ),
            _ => {
                let lhs = self.atoms(lhs);
                let rhs = self.atoms(rhs);
                lhs.iter().any(|l| rhs.iter().any(|r| compare_atoms(op, l, r)))
            }
        }
    }

    /// Split a node-set into the string-values of its nodes.
    fn atoms(&self, value: &Value) -> Vec<Value> {
        match value {
            XPathValue::NodeSet(nodes) => nodes
                .iter()
                .map(|&n| XPathValue::String(self.string_value(n)))
                .collect(),
            value => vec![value.clone()],
        }
    }
}

fn compare_atoms(op: CmpOp, lhs: &Value, rhs: &Value) -> bool {
    let number = |v: &Value| match v {
        XPathValue::Boolean(b) => f64::from(u8::from(*b)),
        XPathValue::Number(n) => *n,
        XPathValue::String(s) => parse_number(s),
        XPathValue::NodeSet(_) => f64::NAN,
    };
    let boolean = |v: &Value| match v {
        XPathValue::Boolean(b) => *b,
        XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
        XPathValue::String(s) => !s.is_empty(),
        XPathValue::NodeSet(nodes) => !nodes.is_empty(),
    };
    let string = |v: &Value| match v {
        XPathValue::Boolean(b) => b.to_string(),
        XPathValue::Number(n) => format_number(*n),
        XPathValue::String(s) => s.clone(),
        XPathValue::NodeSet(_) => String::new(),
    };
    match op {
        CmpOp::Eq | CmpOp::Neq => {
            let equal = match (lhs, rhs) {
                (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                    boolean(lhs) == boolean(rhs)
                }
                (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
                    number(lhs) == number(rhs)
                }
                _ => string(lhs) == string(rhs),
            };
            equal == (op == CmpOp::Eq)
        }
        CmpOp::Lt => number(lhs) < number(rhs),
        CmpOp::Le => number(lhs) <= number(rhs),
        CmpOp::Gt => number(lhs) > number(rhs),
        CmpOp::Ge => number(lhs) >= number(rhs),
    }
}

/// Convert a string to a number, `NaN` unless it is an optional minus sign followed by a
/// decimal number.
pub(super) fn parse_number(s: &str) -> f64 {
    let s = s.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let digits = s.strip_prefix('-').unwrap_or(s);
    let valid = !digits.is_empty()
        && digits != "."
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|&c| c == '.').count() <= 1;
    if valid {
        s.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

pub(super) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        let inf = if n > 0.0 { "Infinity" } else { "-Infinity" };
        inf.to_owned()
    } else if n == 0.0 {
        "0".to_owned()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::compile::compile;

    /// `<r><a x="1">one</a><b/><a x="2">two</a></r>`
    fn sample() -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let doc = tree.document();
        let r = tree.alloc(XmlElementType::XmlElementNode, "r", "");
        tree.append_child(doc, r);
        let children = [
            ("a", Some("1"), Some("one")),
            ("b", None, None),
            ("a", Some("2"), Some("two")),
        ];
        for (name, attr, text) in children {
            let e = tree.alloc(XmlElementType::XmlElementNode, name, "");
            tree.append_child(r, e);
            if let Some(value) = attr {
                let a = tree.alloc(XmlElementType::XmlAttributeNode, "x", value);
                tree.append_attribute(e, a);
            }
            if let Some(text) = text {
                let t = tree.alloc(XmlElementType::XmlTextNode, "", text);
                tree.append_child(e, t);
            }
        }
        (tree, r)
    }

    fn eval(tree: &Tree, context: NodeId, expr: &str) -> Value {
        let compiled = compile(expr).unwrap();
        Evaluator::new(tree, context, &[]).eval_root(&compiled).unwrap()
    }

    fn names(tree: &Tree, value: &Value) -> Vec<String> {
        value
            .as_nodes()
            .unwrap()
            .iter()
            .map(|&n| tree.qname(n))
            .collect()
    }

    #[test]
    fn paths_select_in_document_order() {
        let (tree, r) = sample();
        assert_eq!(names(&tree, &eval(&tree, r, "a")), ["a", "a"]);
        assert_eq!(names(&tree, &eval(&tree, r, "//a | //b")), ["a", "b", "a"]);
        assert_eq!(names(&tree, &eval(&tree, r, "*[last()]")), ["a"]);
        assert_eq!(names(&tree, &eval(&tree, r, "a[@x = 2]/text()")), ["text"]);
        assert_eq!(eval(&tree, r, "string(a[@x = 2])"), XPathValue::String("two".to_owned()));
    }

    #[test]
    fn reverse_axes_count_backwards() {
        let (tree, r) = sample();
        let last = tree.last_child(r).unwrap();
        let value = eval(&tree, last, "preceding-sibling::*[1]");
        assert_eq!(names(&tree, &value), ["b"]);
        let value = eval(&tree, last, "preceding::text()");
        assert_eq!(value.as_nodes().unwrap().len(), 1);
        let value = eval(&tree, last, "ancestor::*");
        assert_eq!(names(&tree, &value), ["r"]);
    }

    #[test]
    fn comparisons_follow_node_set_rules() {
        let (tree, r) = sample();
        assert_eq!(eval(&tree, r, "a/@x = 2"), XPathValue::Boolean(true));
        assert_eq!(eval(&tree, r, "a/@x != 2"), XPathValue::Boolean(true));
        assert_eq!(eval(&tree, r, "a/@x > 5"), XPathValue::Boolean(false));
        assert_eq!(eval(&tree, r, "c = ''"), XPathValue::Boolean(false));
        assert_eq!(eval(&tree, r, "c = false()"), XPathValue::Boolean(true));
        assert_eq!(eval(&tree, r, "count(a) * 2 + 1"), XPathValue::Number(5.0));
    }

    #[test]
    fn numbers_format_like_xpath() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(parse_number(" 12.5 "), 12.5);
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("+1").is_nan());
    }
}
