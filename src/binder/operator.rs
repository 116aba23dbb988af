//! Operand typing for unary and binary operators.

use crate::binder::expression::QueryNode;
use crate::error::{QueryError, Result};
use crate::model::EdmModel;
use crate::parser::{BinaryOperatorKind, UnaryOperatorKind};
use crate::types::{LiteralValue, PrimitiveKind, TypeRef};

/// Types a binary operator application, inserting conversions as needed.
///
/// # Errors
///
/// Returns `TypeMismatch` when the operands are not valid for `op`.
pub(crate) fn bind_binary(
    model: &dyn EdmModel,
    op: BinaryOperatorKind,
    left: QueryNode,
    right: QueryNode,
) -> Result<QueryNode> {
    if op.is_logical() {
        expect_boolean(&left)?;
        expect_boolean(&right)?;
        return Ok(binary(op, left, right, Some(TypeRef::boolean())));
    }
    if op == BinaryOperatorKind::Has {
        return bind_has(left, right);
    }
    let (left, right) = convert_null_operands(left, right);
    if op.is_arithmetic() {
        bind_arithmetic(op, left, right)
    } else {
        let (left, right) = convert_enum_strings(model, left, right)?;
        bind_comparison(op, left, right)
    }
}

/// Types a unary operator application.
///
/// # Errors
///
/// Returns `TypeMismatch` for `not` on a non-boolean or negation of a
/// non-numeric operand.
pub(crate) fn bind_unary(op: UnaryOperatorKind, operand: QueryNode) -> Result<QueryNode> {
    let type_ref = match op {
        UnaryOperatorKind::Not => {
            expect_boolean(&operand)?;
            Some(TypeRef::boolean())
        }
        UnaryOperatorKind::Negate => match operand.type_reference() {
            None => None,
            Some(t) if t.as_primitive().is_some_and(is_negatable) => Some(t.clone()),
            Some(t) => return Err(QueryError::type_mismatch("numeric type", t.full_name())),
        },
    };
    Ok(QueryNode::UnaryOperator {
        op,
        operand: Box::new(operand),
        type_ref,
    })
}

/// Builds a typed constant for an enum member, checking it exists.
///
/// # Errors
///
/// Returns `UnknownType` for an undefined enum and `TypeMismatch` for an
/// unknown member.
pub(crate) fn enum_constant(
    model: &dyn EdmModel,
    type_name: &str,
    member: &str,
    text: &str,
) -> Result<QueryNode> {
    let enum_type = model
        .find_enum_type(type_name)
        .ok_or_else(|| QueryError::UnknownType(type_name.to_string()))?;
    if !enum_type.has_member(member) {
        return Err(QueryError::type_mismatch(
            format!("member of {type_name}"),
            format!("'{member}'"),
        ));
    }
    Ok(QueryNode::Constant {
        value: LiteralValue::Enum {
            type_name: type_name.to_string(),
            member: member.to_string(),
        },
        text: text.to_string(),
        type_ref: Some(TypeRef::enumeration(type_name, false)),
    })
}

/// Wraps `node` in a conversion to `target` unless it already has that type.
#[must_use]
pub(crate) fn convert(node: QueryNode, target: &TypeRef) -> QueryNode {
    if node
        .type_reference()
        .is_some_and(|t| t.definition == target.definition)
    {
        return node;
    }
    QueryNode::Convert {
        source: Box::new(node),
        type_ref: target.clone(),
    }
}

/// Widest of two primitive kinds when one promotes to the other.
#[must_use]
pub(crate) fn common_kind(a: PrimitiveKind, b: PrimitiveKind) -> Option<PrimitiveKind> {
    if a.promotes_to(b) {
        Some(b)
    } else if b.promotes_to(a) {
        Some(a)
    } else {
        None
    }
}

fn binary(
    op: BinaryOperatorKind,
    left: QueryNode,
    right: QueryNode,
    type_ref: Option<TypeRef>,
) -> QueryNode {
    QueryNode::BinaryOperator {
        op,
        left: Box::new(left),
        right: Box::new(right),
        type_ref,
    }
}

fn expect_boolean(node: &QueryNode) -> Result<()> {
    match node.type_reference() {
        None => Ok(()),
        Some(t) if t.is_boolean() => Ok(()),
        Some(t) => Err(QueryError::type_mismatch("Edm.Boolean", t.full_name())),
    }
}

fn is_negatable(kind: PrimitiveKind) -> bool {
    kind.is_numeric() || kind == PrimitiveKind::Duration
}

fn promote(node: QueryNode, kind: PrimitiveKind) -> QueryNode {
    let nullable = node.type_reference().map_or(true, |t| t.nullable);
    convert(node, &TypeRef::primitive(kind, nullable))
}

fn convert_null_operands(left: QueryNode, right: QueryNode) -> (QueryNode, QueryNode) {
    if left.is_null_constant() {
        if let Some(target) = right.type_reference().map(|t| t.with_nullable(true)) {
            return (convert(left, &target), right);
        }
    } else if right.is_null_constant() {
        if let Some(target) = left.type_reference().map(|t| t.with_nullable(true)) {
            return (left, convert(right, &target));
        }
    }
    (left, right)
}

fn convert_enum_strings(
    model: &dyn EdmModel,
    left: QueryNode,
    right: QueryNode,
) -> Result<(QueryNode, QueryNode)> {
    let as_enum = |enum_side: &QueryNode, other: QueryNode| -> Result<QueryNode> {
        let Some(enum_name) = enum_side.type_reference().and_then(TypeRef::enum_name) else {
            return Ok(other);
        };
        if let QueryNode::Constant {
            value: LiteralValue::String(member),
            text,
            ..
        } = &other
        {
            return enum_constant(model, enum_name, member, text);
        }
        Ok(other)
    };
    let right = as_enum(&left, right)?;
    let left = as_enum(&right, left)?;
    Ok((left, right))
}

fn bind_comparison(op: BinaryOperatorKind, left: QueryNode, right: QueryNode) -> Result<QueryNode> {
    let (Some(lt), Some(rt)) = (
        left.type_reference().cloned(),
        right.type_reference().cloned(),
    ) else {
        return Ok(binary(op, left, right, Some(TypeRef::boolean())));
    };
    if lt.is_collection() || rt.is_collection() {
        let offending = if lt.is_collection() { &lt } else { &rt };
        return Err(QueryError::type_mismatch("single value", offending.full_name()));
    }

    if let (Some(a), Some(b)) = (lt.as_primitive(), rt.as_primitive()) {
        let common = common_kind(a, b)
            .ok_or_else(|| QueryError::type_mismatch(lt.full_name(), rt.full_name()))?;
        if op.is_relational() && !common.is_orderable() {
            return Err(QueryError::type_mismatch("orderable type", common.name()));
        }
        let left = promote(left, common);
        let right = promote(right, common);
        return Ok(binary(op, left, right, Some(TypeRef::boolean())));
    }

    let same_enum = lt.enum_name().is_some() && lt.definition == rt.definition;
    let same_structured =
        op.is_equality() && lt.structured_name().is_some() && lt.definition == rt.definition;
    if same_enum || same_structured {
        Ok(binary(op, left, right, Some(TypeRef::boolean())))
    } else {
        Err(QueryError::type_mismatch(lt.full_name(), rt.full_name()))
    }
}

fn temporal_result(
    op: BinaryOperatorKind,
    a: PrimitiveKind,
    b: PrimitiveKind,
) -> Option<PrimitiveKind> {
    use BinaryOperatorKind::{Add, Subtract};
    use PrimitiveKind::{Date, DateTimeOffset, Duration};
    match (op, a, b) {
        (Add | Subtract, DateTimeOffset, Duration) => Some(DateTimeOffset),
        (Add | Subtract, Date, Duration) => Some(Date),
        (Add | Subtract, Duration, Duration) => Some(Duration),
        (Subtract, DateTimeOffset, DateTimeOffset) | (Subtract, Date, Date) => Some(Duration),
        _ => None,
    }
}

fn bind_arithmetic(op: BinaryOperatorKind, left: QueryNode, right: QueryNode) -> Result<QueryNode> {
    let (lt, rt) = match (
        left.type_reference().cloned(),
        right.type_reference().cloned(),
    ) {
        (None, None) => return Ok(binary(op, left, right, None)),
        // An untyped operand takes the other side's type.
        (Some(t), None) | (None, Some(t)) => {
            if !t.as_primitive().is_some_and(is_negatable) {
                return Err(QueryError::type_mismatch("numeric type", t.full_name()));
            }
            return Ok(binary(op, left, right, Some(t)));
        }
        (Some(lt), Some(rt)) => (lt, rt),
    };

    let nullable = lt.nullable || rt.nullable;
    let a = lt
        .as_primitive()
        .ok_or_else(|| QueryError::type_mismatch("numeric type", lt.full_name()))?;
    let b = rt
        .as_primitive()
        .ok_or_else(|| QueryError::type_mismatch("numeric type", rt.full_name()))?;

    if let Some(result) = temporal_result(op, a, b) {
        return Ok(binary(op, left, right, Some(TypeRef::primitive(result, nullable))));
    }
    for kind in [a, b] {
        if !kind.is_numeric() {
            return Err(QueryError::type_mismatch("numeric type", kind.name()));
        }
    }
    let common = common_kind(a, b).ok_or_else(|| QueryError::type_mismatch(a.name(), b.name()))?;
    let left = promote(left, common);
    let right = promote(right, common);
    Ok(binary(op, left, right, Some(TypeRef::primitive(common, nullable))))
}

fn bind_has(left: QueryNode, right: QueryNode) -> Result<QueryNode> {
    let Some(enum_name) = left.type_reference().and_then(TypeRef::enum_name) else {
        return Err(QueryError::type_mismatch("enumeration type", left.type_name()));
    };
    let matches = matches!(
        &right,
        QueryNode::Constant {
            value: LiteralValue::Enum { .. },
            type_ref: Some(t),
            ..
        } if t.enum_name() == Some(enum_name)
    );
    if !matches {
        return Err(QueryError::type_mismatch(enum_name, right.type_name()));
    }
    Ok(binary(BinaryOperatorKind::Has, left, right, Some(TypeRef::boolean())))
}
