//! Constructors for range variables and lambda nodes.

use crate::binder::expression::{LambdaNode, QueryNode};
use crate::binder::scope::{RangeVariable, IMPLICIT_RANGE_VARIABLE};
use crate::model::EntitySet;
use crate::parser::LambdaKind;
use crate::types::TypeRef;

/// Builds `$it` for a resolved path's element type and source.
///
/// Collection types range over their items. Returns `None` when the path
/// has no type.
#[must_use]
pub fn implicit_range_variable(
    element_type: Option<&TypeRef>,
    navigation_source: Option<&EntitySet>,
) -> Option<RangeVariable> {
    let element_type = element_type?;
    let item = element_type.item_type().unwrap_or(element_type);
    Some(RangeVariable::new(
        IMPLICIT_RANGE_VARIABLE,
        Some(item.clone()),
        navigation_source.map(|set| set.name.clone()),
    ))
}

/// Builds the variable a lambda introduces over `collection`.
#[must_use]
pub fn lambda_range_variable(name: &str, collection: &QueryNode) -> RangeVariable {
    let item = collection
        .type_reference()
        .and_then(TypeRef::item_type)
        .cloned();
    RangeVariable::new(
        name,
        item,
        collection.navigation_source().map(str::to_string),
    )
}

/// Builds the node that refers to `variable`.
#[must_use]
pub fn range_variable_reference(variable: &RangeVariable) -> QueryNode {
    match (&variable.type_ref, variable.is_entity()) {
        (Some(type_ref), true) => QueryNode::EntityRangeVariableReference {
            name: variable.name.clone(),
            type_ref: type_ref.clone(),
            navigation_source: variable.navigation_source.clone(),
        },
        _ => QueryNode::NonEntityRangeVariableReference {
            name: variable.name.clone(),
            type_ref: variable.type_ref.clone(),
        },
    }
}

/// Builds an `Any` or `All` node.
#[must_use]
pub fn lambda_node(
    kind: LambdaKind,
    range_variables: Vec<RangeVariable>,
    current_range_variable: Option<RangeVariable>,
    body: QueryNode,
    source: QueryNode,
) -> QueryNode {
    let lambda = LambdaNode {
        range_variables,
        current_range_variable,
        body: Box::new(body),
        source: Box::new(source),
        type_ref: TypeRef::boolean(),
    };
    match kind {
        LambdaKind::Any => QueryNode::Any(lambda),
        LambdaKind::All => QueryNode::All(lambda),
    }
}
