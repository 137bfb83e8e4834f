//! Tokenizing and parsing of XPath expressions into an expression tree.

use super::{XmlXPathError, functions::XPathFunction};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    At,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Pipe,
    Plus,
    Minus,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    /// `*` as a name test.
    Star,
    /// `*` as the multiply operator.
    Mul,
    And,
    Or,
    Div,
    Mod,
    AxisSep,
    Literal(String),
    Number(f64),
    /// An NCName, a QName, or `prefix:*`.
    Name(String),
}

impl Token {
    /// Whether a `*` or an NCName following this token is an operator.
    fn expects_operator(&self) -> bool {
        !matches!(
            self,
            Token::At
                | Token::AxisSep
                | Token::LParen
                | Token::LBracket
                | Token::Comma
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Eq
                | Token::Neq
                | Token::Lt
                | Token::Le
                | Token::Gt
                | Token::Ge
                | Token::Mul
                | Token::And
                | Token::Or
                | Token::Div
                | Token::Mod
        )
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{b7}')
}

fn tokenize(expr: &str) -> Result<Vec<Token>, XmlXPathError> {
    let mut tokens: Vec<Token> = vec![];
    let mut chars = expr.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        let operator_expected = tokens.last().is_some_and(Token::expects_operator);
        let token = match c {
            ' ' | '\t' | '\r' | '\n' => {
                chars.next();
                continue;
            }
            '/' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '/').is_some() {
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '.' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '.')) => {
                        chars.next();
                        Token::DotDot
                    }
                    Some(&(_, d)) if d.is_ascii_digit() => {
                        let mut end = start + 1;
                        while let Some((i, _)) = chars.next_if(|&(_, c)| c.is_ascii_digit()) {
                            end = i + 1;
                        }
                        let number = expr[start..end]
                            .parse()
                            .map_err(|_| XmlXPathError::XPathNumberError)?;
                        Token::Number(number)
                    }
                    _ => Token::Dot,
                }
            }
            '0'..='9' => {
                let mut end = start;
                let mut seen_dot = false;
                while let Some((i, c)) =
                    chars.next_if(|&(_, c)| c.is_ascii_digit() || (c == '.' && !seen_dot))
                {
                    seen_dot |= c == '.';
                    end = i + 1;
                }
                let number = expr[start..end]
                    .parse()
                    .map_err(|_| XmlXPathError::XPathNumberError)?;
                Token::Number(number)
            }
            '"' | '\'' => {
                chars.next();
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some((_, q)) if q == c => break,
                        Some((_, ch)) => literal.push(ch),
                        None => return Err(XmlXPathError::XPathUnfinishedLiteralError),
                    }
                }
                Token::Literal(literal)
            }
            '$' => return Err(XmlXPathError::XPathVariableRefError),
            '@' => {
                chars.next();
                Token::At
            }
            ',' => {
                chars.next();
                Token::Comma
            }
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            '[' => {
                chars.next();
                Token::LBracket
            }
            ']' => {
                chars.next();
                Token::RBracket
            }
            '|' => {
                chars.next();
                Token::Pipe
            }
            '+' => {
                chars.next();
                Token::Plus
            }
            '-' => {
                chars.next();
                Token::Minus
            }
            '=' => {
                chars.next();
                Token::Eq
            }
            '!' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_none() {
                    return Err(XmlXPathError::XPathExprError);
                }
                Token::Neq
            }
            '<' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            ':' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == ':').is_none() {
                    return Err(XmlXPathError::XPathExprError);
                }
                Token::AxisSep
            }
            '*' => {
                chars.next();
                if operator_expected {
                    Token::Mul
                } else {
                    Token::Star
                }
            }
            c if is_name_start(c) => {
                let mut end = start;
                while let Some((i, c)) = chars.next_if(|&(_, c)| is_name_char(c)) {
                    end = i + c.len_utf8();
                }
                let ncname = &expr[start..end];
                if operator_expected {
                    match ncname {
                        "and" => Token::And,
                        "or" => Token::Or,
                        "div" => Token::Div,
                        "mod" => Token::Mod,
                        _ => return Err(XmlXPathError::XPathExprError),
                    }
                } else {
                    // a single colon followed by a name or `*` makes a QName
                    let rest = &expr[end..];
                    if rest.starts_with(':') && !rest.starts_with("::") {
                        let after = &rest[1..];
                        if after.starts_with('*') {
                            chars.next();
                            chars.next();
                            Token::Name(format!("{ncname}:*"))
                        } else if after.chars().next().is_some_and(is_name_start) {
                            chars.next();
                            let mut local_end = end + 1;
                            while let Some((i, c)) = chars.next_if(|&(_, c)| is_name_char(c)) {
                                local_end = i + c.len_utf8();
                            }
                            Token::Name(expr[start..local_end].to_owned())
                        } else {
                            return Err(XmlXPathError::XPathExprError);
                        }
                    } else {
                        Token::Name(ncname.to_owned())
                    }
                }
            }
            _ => return Err(XmlXPathError::XPathInvalidCharError),
        };
        tokens.push(token);
    }
    Ok(tokens)
}

#[doc(alias = "xmlXPathAxisVal")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum XmlXPathAxisVal {
    AxisAncestor,
    AxisAncestorOrSelf,
    AxisAttribute,
    AxisChild,
    AxisDescendant,
    AxisDescendantOrSelf,
    AxisFollowing,
    AxisFollowingSibling,
    AxisParent,
    AxisPreceding,
    AxisPrecedingSibling,
    AxisSelf,
}

impl XmlXPathAxisVal {
    fn from_name(name: &str) -> Result<Self, XmlXPathError> {
        match name {
            "ancestor" => Ok(Self::AxisAncestor),
            "ancestor-or-self" => Ok(Self::AxisAncestorOrSelf),
            "attribute" => Ok(Self::AxisAttribute),
            "child" => Ok(Self::AxisChild),
            "descendant" => Ok(Self::AxisDescendant),
            "descendant-or-self" => Ok(Self::AxisDescendantOrSelf),
            "following" => Ok(Self::AxisFollowing),
            "following-sibling" => Ok(Self::AxisFollowingSibling),
            "parent" => Ok(Self::AxisParent),
            "preceding" => Ok(Self::AxisPreceding),
            "preceding-sibling" => Ok(Self::AxisPrecedingSibling),
            "self" => Ok(Self::AxisSelf),
            "namespace" => Err(XmlXPathError::XPathUnsupportedAxis),
            _ => Err(XmlXPathError::XPathExprError),
        }
    }

    /// Whether positions along this axis count in reverse document order.
    pub(super) fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::AxisAncestor
                | Self::AxisAncestorOrSelf
                | Self::AxisPreceding
                | Self::AxisPrecedingSibling
        )
    }
}

#[doc(alias = "xmlXPathTypeVal")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum XmlXPathTypeVal {
    NodeTypeNode,
    NodeTypeComment,
    NodeTypeText,
}

#[doc(alias = "xmlXPathTestVal")]
#[derive(Debug, Clone, PartialEq)]
pub(super) enum XmlXPathTestVal {
    NodeTestType(XmlXPathTypeVal),
    /// `processing-instruction()`, with an optional target.
    NodeTestPI(Option<String>),
    /// `*`
    NodeTestAll,
    /// `prefix:*`
    NodeTestNs(String),
    /// A name, with an optional prefix.
    NodeTestName(Option<String>, String),
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Step {
    pub(super) axis: XmlXPathAxisVal,
    pub(super) test: XmlXPathTestVal,
    pub(super) predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum PathStart {
    /// The document node.
    Root,
    /// The context node.
    Context,
    /// A filter expression, which must evaluate to a node-set.
    Filter(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CmpOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ArithOp {
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Function(XPathFunction, Vec<Expr>),
    /// A primary expression followed by predicates.
    Filter(Box<Expr>, Vec<Expr>),
    Path(PathStart, Vec<Step>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), XmlXPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(XmlXPathError::XPathExprError)
        }
    }

    /// ```text
    /// [14]   Expr ::=   OrExpr
    /// [21]   OrExpr ::=   AndExpr | OrExpr 'or' AndExpr
    /// ```
    fn parse_expr(&mut self) -> Result<Expr, XmlXPathError> {
        let mut lhs = self.parse_and_expr()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// ```text
    /// [22]   AndExpr ::=   EqualityExpr | AndExpr 'and' EqualityExpr
    /// ```
    fn parse_and_expr(&mut self) -> Result<Expr, XmlXPathError> {
        let mut lhs = self.parse_equality_expr()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_equality_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// ```text
    /// [23]   EqualityExpr ::=   RelationalExpr
    ///                         | EqualityExpr '=' RelationalExpr
    ///                         | EqualityExpr '!=' RelationalExpr
    /// ```
    fn parse_equality_expr(&mut self) -> Result<Expr, XmlXPathError> {
        let mut lhs = self.parse_relational_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CmpOp::Eq,
                Some(Token::Neq) => CmpOp::Neq,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_relational_expr()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    /// ```text
    /// [24]   RelationalExpr ::=   AdditiveExpr
    ///                           | RelationalExpr '<' AdditiveExpr
    ///                           | RelationalExpr '>' AdditiveExpr
    ///                           | RelationalExpr '<=' AdditiveExpr
    ///                           | RelationalExpr '>=' AdditiveExpr
    /// ```
    fn parse_relational_expr(&mut self) -> Result<Expr, XmlXPathError> {
        let mut lhs = self.parse_additive_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Le) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Ge) => CmpOp::Ge,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_additive_expr()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    /// ```text
    /// [25]   AdditiveExpr ::=   MultiplicativeExpr
    ///                         | AdditiveExpr '+' MultiplicativeExpr
    ///                         | AdditiveExpr '-' MultiplicativeExpr
    /// ```
    fn parse_additive_expr(&mut self) -> Result<Expr, XmlXPathError> {
        let mut lhs = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Plus,
                Some(Token::Minus) => ArithOp::Minus,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative_expr()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    /// ```text
    /// [26]   MultiplicativeExpr ::=   UnaryExpr
    ///                               | MultiplicativeExpr MultiplyOperator UnaryExpr
    ///                               | MultiplicativeExpr 'div' UnaryExpr
    ///                               | MultiplicativeExpr 'mod' UnaryExpr
    /// ```
    fn parse_multiplicative_expr(&mut self) -> Result<Expr, XmlXPathError> {
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Mul) => ArithOp::Mult,
                Some(Token::Div) => ArithOp::Div,
                Some(Token::Mod) => ArithOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary_expr()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    /// ```text
    /// [27]   UnaryExpr ::=   UnionExpr | '-' UnaryExpr
    /// ```
    fn parse_unary_expr(&mut self) -> Result<Expr, XmlXPathError> {
        if self.eat(&Token::Minus) {
            Ok(Expr::Neg(Box::new(self.parse_unary_expr()?)))
        } else {
            self.parse_union_expr()
        }
    }

    /// ```text
    /// [18]   UnionExpr ::=   PathExpr | UnionExpr '|' PathExpr
    /// ```
    fn parse_union_expr(&mut self) -> Result<Expr, XmlXPathError> {
        let mut lhs = self.parse_path_expr()?;
        while self.eat(&Token::Pipe) {
            let rhs = self.parse_path_expr()?;
            lhs = Expr::Union(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// Whether the name at the current position calls a function.
    fn at_function_call(&self) -> bool {
        matches!(
            (self.peek(), self.peek_at(1)),
            (Some(Token::Name(name)), Some(Token::LParen))
                if !matches!(name.as_str(), "node" | "text" | "comment" | "processing-instruction")
        )
    }

    fn at_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot | Token::DotDot | Token::At | Token::Star | Token::Name(_))
        ) && !self.at_function_call()
    }

    /// ```text
    /// [19]   PathExpr ::=   LocationPath
    ///                     | FilterExpr
    ///                     | FilterExpr '/' RelativeLocationPath
    ///                     | FilterExpr '//' RelativeLocationPath
    /// ```
    fn parse_path_expr(&mut self) -> Result<Expr, XmlXPathError> {
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                let steps = if self.at_step() {
                    self.parse_relative_location_path(vec![])?
                } else {
                    vec![]
                };
                Ok(Expr::Path(PathStart::Root, steps))
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                let steps = self.parse_relative_location_path(vec![descendant_or_self()])?;
                Ok(Expr::Path(PathStart::Root, steps))
            }
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen) => self.parse_filter_path(),
            _ if self.at_function_call() => self.parse_filter_path(),
            _ => {
                let steps = self.parse_relative_location_path(vec![])?;
                Ok(Expr::Path(PathStart::Context, steps))
            }
        }
    }

    fn parse_filter_path(&mut self) -> Result<Expr, XmlXPathError> {
        let filter = self.parse_filter_expr()?;
        let mut steps = vec![];
        match self.peek() {
            Some(Token::Slash) => self.pos += 1,
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(descendant_or_self());
            }
            _ => return Ok(filter),
        }
        let steps = self.parse_relative_location_path(steps)?;
        Ok(Expr::Path(PathStart::Filter(Box::new(filter)), steps))
    }

    /// ```text
    /// [20]   FilterExpr ::=   PrimaryExpr | FilterExpr Predicate
    /// ```
    fn parse_filter_expr(&mut self) -> Result<Expr, XmlXPathError> {
        let primary = self.parse_primary_expr()?;
        let predicates = self.parse_predicates()?;
        if predicates.is_empty() {
            Ok(primary)
        } else {
            Ok(Expr::Filter(Box::new(primary), predicates))
        }
    }

    /// ```text
    /// [15]   PrimaryExpr ::=   VariableReference
    ///                        | '(' Expr ')'
    ///                        | Literal
    ///                        | Number
    ///                        | FunctionCall
    /// [16]   FunctionCall ::=   FunctionName '(' ( Argument ( ',' Argument)*)? ')'
    /// ```
    fn parse_primary_expr(&mut self) -> Result<Expr, XmlXPathError> {
        match self.next() {
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Literal(literal)) => Ok(Expr::Literal(literal)),
            Some(Token::Number(number)) => Ok(Expr::Number(number)),
            Some(Token::Name(name)) => {
                let function =
                    XPathFunction::from_name(&name).ok_or(XmlXPathError::XPathUnknownFuncError)?;
                self.expect(&Token::LParen)?;
                let mut args = vec![];
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                if !function.accepts(args.len()) {
                    return Err(XmlXPathError::XPathInvalidArity);
                }
                Ok(Expr::Function(function, args))
            }
            _ => Err(XmlXPathError::XPathExprError),
        }
    }

    /// ```text
    /// [8]   Predicate ::=   '[' PredicateExpr ']'
    /// [9]   PredicateExpr ::=   Expr
    /// ```
    fn parse_predicates(&mut self) -> Result<Vec<Expr>, XmlXPathError> {
        let mut predicates = vec![];
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }

    /// ```text
    /// [3]   RelativeLocationPath ::=   Step
    ///                                | RelativeLocationPath '/' Step
    ///                                | AbbreviatedRelativeLocationPath
    /// [11]  AbbreviatedRelativeLocationPath ::=   RelativeLocationPath '//' Step
    /// ```
    fn parse_relative_location_path(
        &mut self,
        mut steps: Vec<Step>,
    ) -> Result<Vec<Step>, XmlXPathError> {
        steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => self.pos += 1,
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(descendant_or_self());
                }
                _ => return Ok(steps),
            }
            steps.push(self.parse_step()?);
        }
    }

    /// ```text
    /// [4]   Step ::=   AxisSpecifier NodeTest Predicate* | AbbreviatedStep
    /// [5]   AxisSpecifier ::=   AxisName '::' | AbbreviatedAxisSpecifier
    /// [12]  AbbreviatedStep ::=   '.' | '..'
    /// [13]  AbbreviatedAxisSpecifier ::=   '@'?
    /// ```
    fn parse_step(&mut self) -> Result<Step, XmlXPathError> {
        if self.eat(&Token::Dot) {
            return Ok(node_step(XmlXPathAxisVal::AxisSelf));
        }
        if self.eat(&Token::DotDot) {
            return Ok(node_step(XmlXPathAxisVal::AxisParent));
        }
        let axis = if self.eat(&Token::At) {
            XmlXPathAxisVal::AxisAttribute
        } else if let (Some(Token::Name(name)), Some(Token::AxisSep)) = (self.peek(), self.peek_at(1))
        {
            let axis = XmlXPathAxisVal::from_name(name)?;
            self.pos += 2;
            axis
        } else {
            XmlXPathAxisVal::AxisChild
        };
        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    /// ```text
    /// [7]   NodeTest ::=   NameTest
    ///                    | NodeType '(' ')'
    ///                    | 'processing-instruction' '(' Literal ')'
    /// ```
    fn parse_node_test(&mut self) -> Result<XmlXPathTestVal, XmlXPathError> {
        let name = match self.next() {
            Some(Token::Star) => return Ok(XmlXPathTestVal::NodeTestAll),
            Some(Token::Name(name)) => name,
            _ => return Err(XmlXPathError::XPathExprError),
        };
        if self.eat(&Token::LParen) {
            let test = match name.as_str() {
                "node" => XmlXPathTestVal::NodeTestType(XmlXPathTypeVal::NodeTypeNode),
                "text" => XmlXPathTestVal::NodeTestType(XmlXPathTypeVal::NodeTypeText),
                "comment" => XmlXPathTestVal::NodeTestType(XmlXPathTypeVal::NodeTypeComment),
                "processing-instruction" => match self.peek() {
                    Some(Token::Literal(target)) => {
                        let target = target.clone();
                        self.pos += 1;
                        XmlXPathTestVal::NodeTestPI(Some(target))
                    }
                    _ => XmlXPathTestVal::NodeTestPI(None),
                },
                _ => return Err(XmlXPathError::XPathExprError),
            };
            self.expect(&Token::RParen)?;
            return Ok(test);
        }
        Ok(match name.split_once(':') {
            Some((prefix, "*")) => XmlXPathTestVal::NodeTestNs(prefix.to_owned()),
            Some((prefix, local)) => {
                XmlXPathTestVal::NodeTestName(Some(prefix.to_owned()), local.to_owned())
            }
            None => XmlXPathTestVal::NodeTestName(None, name),
        })
    }
}

fn node_step(axis: XmlXPathAxisVal) -> Step {
    Step {
        axis,
        test: XmlXPathTestVal::NodeTestType(XmlXPathTypeVal::NodeTypeNode),
        predicates: vec![],
    }
}

/// The step `//` stands for.
fn descendant_or_self() -> Step {
    node_step(XmlXPathAxisVal::AxisDescendantOrSelf)
}

/// Compile `expr` into an expression tree.
#[doc(alias = "xmlXPathCompile")]
pub(super) fn compile(expr: &str) -> Result<Expr, XmlXPathError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(XmlXPathError::XPathExprError);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let compiled = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(XmlXPathError::XPathExprError);
    }
    Ok(compiled)
}
