//! Syntax tree produced by the parsers.
//!
//! Tokens are untyped: they record structure only and are resolved against
//! the model by the binder.

use serde::{Deserialize, Serialize};

use crate::types::LiteralValue;

/// Untyped expression tree for `$filter` and `$orderby` text.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryToken {
    /// Literal value.
    Literal(LiteralToken),
    /// Binary operator applied to two operands.
    BinaryOperator {
        op: BinaryOperatorKind,
        left: Box<QueryToken>,
        right: Box<QueryToken>,
    },
    /// Unary operator applied to one operand.
    UnaryOperator {
        op: UnaryOperatorKind,
        operand: Box<QueryToken>,
    },
    /// Member path (`Address/City`, `p/Age`, `NS.Cat/Lives`).
    Path(PathToken),
    /// Built-in function or model operation call.
    FunctionCall(FunctionCallToken),
    /// `any`/`all` over a collection.
    Lambda(LambdaToken),
}

impl QueryToken {
    /// Creates a literal token.
    #[must_use]
    pub fn literal(value: LiteralValue, text: impl Into<String>) -> Self {
        QueryToken::Literal(LiteralToken {
            value,
            text: text.into(),
        })
    }

    /// Creates a binary operator token.
    #[must_use]
    pub fn binary(op: BinaryOperatorKind, left: QueryToken, right: QueryToken) -> Self {
        QueryToken::BinaryOperator {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a path token rooted at the implicit range variable.
    #[must_use]
    pub fn path(segments: Vec<PathSegmentToken>) -> Self {
        QueryToken::Path(PathToken {
            source: None,
            segments,
        })
    }
}

/// Literal with its decoded value and source text.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralToken {
    pub value: LiteralValue,
    pub text: String,
}

/// Ordered chain of member segments, optionally continuing from another
/// token (a function call result).
#[derive(Debug, Clone, PartialEq)]
pub struct PathToken {
    pub source: Option<Box<QueryToken>>,
    pub segments: Vec<PathSegmentToken>,
}

/// One segment of a member path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegmentToken {
    /// Property, navigation, open property or range variable name.
    Identifier(String),
    /// Namespace-qualified type name used as a cast.
    TypeCast(String),
}

impl PathSegmentToken {
    /// Returns the segment text.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            PathSegmentToken::Identifier(name) | PathSegmentToken::TypeCast(name) => name,
        }
    }
}

/// Call of a function by name.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallToken {
    /// Function name; qualified for model operations.
    pub name: String,
    pub arguments: Vec<FunctionArgument>,
    /// Binding instance for operations called mid-path.
    pub source: Option<Box<QueryToken>>,
}

/// Positional (`contains(Name,'x')`) or named (`NS.Near(radius=5)`) argument.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArgument {
    pub name: Option<String>,
    pub value: QueryToken,
}

/// `parent/any(var: body)` or `parent/all(var: body)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaToken {
    pub kind: LambdaKind,
    pub parent: Box<QueryToken>,
    pub variable: Option<String>,
    pub body: Box<QueryToken>,
}

/// Lambda quantifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LambdaKind {
    Any,
    All,
}

/// Binary operators in precedence groups, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperatorKind {
    Or,
    And,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Has,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperatorKind {
    /// Parses an operator keyword.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let op = match s {
            "or" => BinaryOperatorKind::Or,
            "and" => BinaryOperatorKind::And,
            "eq" => BinaryOperatorKind::Equal,
            "ne" => BinaryOperatorKind::NotEqual,
            "gt" => BinaryOperatorKind::GreaterThan,
            "ge" => BinaryOperatorKind::GreaterThanOrEqual,
            "lt" => BinaryOperatorKind::LessThan,
            "le" => BinaryOperatorKind::LessThanOrEqual,
            "has" => BinaryOperatorKind::Has,
            "add" => BinaryOperatorKind::Add,
            "sub" => BinaryOperatorKind::Subtract,
            "mul" => BinaryOperatorKind::Multiply,
            "div" => BinaryOperatorKind::Divide,
            "mod" => BinaryOperatorKind::Modulo,
            _ => return None,
        };
        Some(op)
    }

    /// Returns the operator keyword.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperatorKind::Or => "or",
            BinaryOperatorKind::And => "and",
            BinaryOperatorKind::Equal => "eq",
            BinaryOperatorKind::NotEqual => "ne",
            BinaryOperatorKind::GreaterThan => "gt",
            BinaryOperatorKind::GreaterThanOrEqual => "ge",
            BinaryOperatorKind::LessThan => "lt",
            BinaryOperatorKind::LessThanOrEqual => "le",
            BinaryOperatorKind::Has => "has",
            BinaryOperatorKind::Add => "add",
            BinaryOperatorKind::Subtract => "sub",
            BinaryOperatorKind::Multiply => "mul",
            BinaryOperatorKind::Divide => "div",
            BinaryOperatorKind::Modulo => "mod",
        }
    }

    /// Binding strength; higher binds tighter.
    #[must_use]
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperatorKind::Or => 1,
            BinaryOperatorKind::And => 2,
            BinaryOperatorKind::Equal
            | BinaryOperatorKind::NotEqual
            | BinaryOperatorKind::GreaterThan
            | BinaryOperatorKind::GreaterThanOrEqual
            | BinaryOperatorKind::LessThan
            | BinaryOperatorKind::LessThanOrEqual
            | BinaryOperatorKind::Has => 3,
            BinaryOperatorKind::Add | BinaryOperatorKind::Subtract => 4,
            BinaryOperatorKind::Multiply | BinaryOperatorKind::Divide | BinaryOperatorKind::Modulo => 5,
        }
    }

    /// Returns true for `and`/`or`.
    #[must_use]
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperatorKind::Or | BinaryOperatorKind::And)
    }

    /// Returns true for `eq`/`ne`.
    #[must_use]
    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOperatorKind::Equal | BinaryOperatorKind::NotEqual)
    }

    /// Returns true for `lt`/`le`/`gt`/`ge`.
    #[must_use]
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOperatorKind::GreaterThan
                | BinaryOperatorKind::GreaterThanOrEqual
                | BinaryOperatorKind::LessThan
                | BinaryOperatorKind::LessThanOrEqual
        )
    }

    /// Returns true for `add`/`sub`/`mul`/`div`/`mod`.
    #[must_use]
    pub fn is_arithmetic(&self) -> bool {
        self.precedence() >= 4
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperatorKind {
    Not,
    Negate,
}

/// One `$orderby` item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByToken {
    pub expression: QueryToken,
    pub direction: OrderByDirection,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderByDirection {
    #[default]
    Ascending,
    Descending,
}

/// Path of a select or expand term: `NS.Cat/Toys`, `Address/*`, `NS.*`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectExpandPath {
    pub segments: Vec<String>,
}

impl SelectExpandPath {
    /// Returns the last segment.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

/// Parsed `$select` value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectToken {
    pub terms: Vec<SelectTermToken>,
}

/// Parsed `$expand` value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpandToken {
    pub terms: Vec<ExpandTermToken>,
}

/// One `$select` item with its optional nested options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectTermToken {
    pub path: SelectExpandPath,
    pub filter: Option<QueryToken>,
    pub order_by: Option<Vec<OrderByToken>>,
    pub top: Option<i64>,
    pub skip: Option<i64>,
    pub count: Option<bool>,
    pub select: Option<SelectToken>,
}

/// One `$expand` item with exactly one slot per nested option.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpandTermToken {
    pub path: SelectExpandPath,
    pub filter: Option<QueryToken>,
    pub order_by: Option<Vec<OrderByToken>>,
    pub top: Option<i64>,
    pub skip: Option<i64>,
    pub count: Option<bool>,
    pub select: Option<SelectToken>,
    pub expand: Option<ExpandToken>,
    pub levels: Option<ExpandLevels>,
}

/// Value of `$levels`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpandLevels {
    Max,
    Count(u32),
}
