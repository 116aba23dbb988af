//! Typed node tree produced by binding.

use crate::binder::scope::RangeVariable;
use crate::parser::{BinaryOperatorKind, UnaryOperatorKind};
use crate::types::{LiteralValue, TypeRef};

/// Bound expression node.
///
/// Every variant carries a resolved type except [`QueryNode::OpenProperty`]
/// and [`QueryNode::CollectionOpenProperty`], whose type is only known at
/// evaluation time, an untyped `null` constant, and arithmetic over
/// untyped operands.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Literal value.
    Constant {
        value: LiteralValue,
        text: String,
        type_ref: Option<TypeRef>,
    },

    BinaryOperator {
        op: BinaryOperatorKind,
        left: Box<QueryNode>,
        right: Box<QueryNode>,
        type_ref: Option<TypeRef>,
    },

    UnaryOperator {
        op: UnaryOperatorKind,
        operand: Box<QueryNode>,
        type_ref: Option<TypeRef>,
    },

    /// Implicit conversion inserted by promotion.
    Convert {
        source: Box<QueryNode>,
        type_ref: TypeRef,
    },

    /// Primitive, enum or complex valued property.
    SingleValueProperty {
        source: Box<QueryNode>,
        property: String,
        type_ref: TypeRef,
    },

    /// Collection valued structural property.
    CollectionProperty {
        source: Box<QueryNode>,
        property: String,
        type_ref: TypeRef,
    },

    SingleNavigation {
        source: Box<QueryNode>,
        navigation: String,
        navigation_source: Option<String>,
        type_ref: TypeRef,
    },

    CollectionNavigation {
        source: Box<QueryNode>,
        navigation: String,
        navigation_source: Option<String>,
        type_ref: TypeRef,
    },

    /// Undeclared property of an open type.
    OpenProperty {
        source: Box<QueryNode>,
        name: String,
    },

    /// Open property used as the source of a lambda.
    CollectionOpenProperty {
        source: Box<QueryNode>,
        name: String,
    },

    EntityRangeVariableReference {
        name: String,
        type_ref: TypeRef,
        navigation_source: Option<String>,
    },

    NonEntityRangeVariableReference {
        name: String,
        type_ref: Option<TypeRef>,
    },

    SingleValueFunctionCall(FunctionCallNode),
    SingleEntityFunctionCall(FunctionCallNode),
    EntityCollectionFunctionCall(FunctionCallNode),
    CollectionFunctionCall(FunctionCallNode),

    /// Cast of a single entity or complex value to a derived type.
    SingleEntityCast {
        source: Box<QueryNode>,
        type_ref: TypeRef,
        navigation_source: Option<String>,
    },

    /// Cast of an entity or complex collection to a derived item type.
    EntityCollectionCast {
        source: Box<QueryNode>,
        type_ref: TypeRef,
        navigation_source: Option<String>,
    },

    Any(LambdaNode),
    All(LambdaNode),

    /// Reference to an entity set.
    EntitySet {
        name: String,
        type_ref: TypeRef,
    },
}

/// Call of a built-in function or model operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallNode {
    pub name: String,
    /// Binding instance for bound operations.
    pub source: Option<Box<QueryNode>>,
    pub arguments: Vec<QueryNode>,
    pub type_ref: TypeRef,
    pub navigation_source: Option<String>,
}

/// Bound `any`/`all` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaNode {
    /// Variables in scope when the lambda was entered, `$it` first.
    pub range_variables: Vec<RangeVariable>,
    /// Variable the lambda introduced, if it named one.
    pub current_range_variable: Option<RangeVariable>,
    pub body: Box<QueryNode>,
    /// Collection being iterated.
    pub source: Box<QueryNode>,
    pub type_ref: TypeRef,
}

impl QueryNode {
    /// Returns the resolved type, or `None` for untyped nodes.
    #[must_use]
    pub fn type_reference(&self) -> Option<&TypeRef> {
        match self {
            QueryNode::Constant { type_ref, .. }
            | QueryNode::BinaryOperator { type_ref, .. }
            | QueryNode::UnaryOperator { type_ref, .. }
            | QueryNode::NonEntityRangeVariableReference { type_ref, .. } => type_ref.as_ref(),
            QueryNode::Convert { type_ref, .. }
            | QueryNode::SingleValueProperty { type_ref, .. }
            | QueryNode::CollectionProperty { type_ref, .. }
            | QueryNode::SingleNavigation { type_ref, .. }
            | QueryNode::CollectionNavigation { type_ref, .. }
            | QueryNode::EntityRangeVariableReference { type_ref, .. }
            | QueryNode::SingleEntityCast { type_ref, .. }
            | QueryNode::EntityCollectionCast { type_ref, .. }
            | QueryNode::EntitySet { type_ref, .. } => Some(type_ref),
            QueryNode::SingleValueFunctionCall(call)
            | QueryNode::SingleEntityFunctionCall(call)
            | QueryNode::EntityCollectionFunctionCall(call)
            | QueryNode::CollectionFunctionCall(call) => Some(&call.type_ref),
            QueryNode::Any(lambda) | QueryNode::All(lambda) => Some(&lambda.type_ref),
            QueryNode::OpenProperty { .. } | QueryNode::CollectionOpenProperty { .. } => None,
        }
    }

    /// Returns true if the node yields a collection.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, QueryNode::CollectionOpenProperty { .. })
            || self.type_reference().is_some_and(TypeRef::is_collection)
    }

    /// Entity set the node's entities belong to, when known.
    #[must_use]
    pub fn navigation_source(&self) -> Option<&str> {
        match self {
            QueryNode::SingleNavigation {
                navigation_source, ..
            }
            | QueryNode::CollectionNavigation {
                navigation_source, ..
            }
            | QueryNode::EntityRangeVariableReference {
                navigation_source, ..
            }
            | QueryNode::SingleEntityCast {
                navigation_source, ..
            }
            | QueryNode::EntityCollectionCast {
                navigation_source, ..
            } => navigation_source.as_deref(),
            QueryNode::SingleEntityFunctionCall(call)
            | QueryNode::EntityCollectionFunctionCall(call) => call.navigation_source.as_deref(),
            QueryNode::EntitySet { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns true for an untyped `null` literal.
    #[must_use]
    pub fn is_null_constant(&self) -> bool {
        matches!(
            self,
            QueryNode::Constant {
                value: LiteralValue::Null,
                type_ref: None,
                ..
            }
        )
    }

    /// Type name for error messages.
    #[must_use]
    pub fn type_name(&self) -> String {
        self.type_reference()
            .map_or_else(|| "untyped".to_string(), TypeRef::full_name)
    }
}
