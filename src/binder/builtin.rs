//! Signatures of the canonical built-in functions.

use crate::binder::expression::QueryNode;
use crate::binder::operator::convert;
use crate::error::{QueryError, Result};
use crate::types::{PrimitiveKind, TypeRef};

use PrimitiveKind::{
    Boolean, Date, DateTimeOffset, Decimal, Double, Int32, String as Str, TimeOfDay,
};

/// One overload of a built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinSignature {
    pub parameters: &'static [PrimitiveKind],
    pub return_kind: PrimitiveKind,
}

const fn sig(parameters: &'static [PrimitiveKind], return_kind: PrimitiveKind) -> BuiltinSignature {
    BuiltinSignature {
        parameters,
        return_kind,
    }
}

const STRING_PREDICATE: &[BuiltinSignature] = &[sig(&[Str, Str], Boolean)];
const STRING_TRANSFORM: &[BuiltinSignature] = &[sig(&[Str], Str)];
const DATE_PART: &[BuiltinSignature] = &[sig(&[Date], Int32), sig(&[DateTimeOffset], Int32)];
const TIME_PART: &[BuiltinSignature] = &[sig(&[DateTimeOffset], Int32), sig(&[TimeOfDay], Int32)];
const ROUNDING: &[BuiltinSignature] = &[sig(&[Double], Double), sig(&[Decimal], Decimal)];
const NOW: &[BuiltinSignature] = &[sig(&[], DateTimeOffset)];
const LENGTH: &[BuiltinSignature] = &[sig(&[Str], Int32)];
const INDEXOF: &[BuiltinSignature] = &[sig(&[Str, Str], Int32)];
const SUBSTRING: &[BuiltinSignature] = &[sig(&[Str, Int32], Str), sig(&[Str, Int32, Int32], Str)];
const CONCAT: &[BuiltinSignature] = &[sig(&[Str, Str], Str)];
const FRACTIONAL_SECONDS: &[BuiltinSignature] =
    &[sig(&[DateTimeOffset], Decimal), sig(&[TimeOfDay], Decimal)];
const DATE: &[BuiltinSignature] = &[sig(&[DateTimeOffset], Date)];
const TIME: &[BuiltinSignature] = &[sig(&[DateTimeOffset], TimeOfDay)];

/// Names handled specially because their last argument is a type name.
pub const TYPE_FUNCTIONS: &[&str] = &["isof", "cast"];

/// Returns the overloads of a built-in function, in preference order.
#[must_use]
pub fn signatures(name: &str) -> Option<&'static [BuiltinSignature]> {
    let found = match name {
        "contains" | "startswith" | "endswith" => STRING_PREDICATE,
        "length" => LENGTH,
        "indexof" => INDEXOF,
        "substring" => SUBSTRING,
        "tolower" | "toupper" | "trim" => STRING_TRANSFORM,
        "concat" => CONCAT,
        "year" | "month" | "day" => DATE_PART,
        "hour" | "minute" | "second" => TIME_PART,
        "fractionalseconds" => FRACTIONAL_SECONDS,
        "date" => DATE,
        "time" => TIME,
        "round" | "floor" | "ceiling" => ROUNDING,
        "now" | "maxdatetime" | "mindatetime" => NOW,
        _ => return None,
    };
    Some(found)
}

/// Returns true if `name` is a built-in function.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    signatures(name).is_some() || TYPE_FUNCTIONS.contains(&name)
}

/// Picks the overload needing the fewest promotions and converts the
/// arguments to its parameter types.
///
/// Untyped arguments match any parameter.
///
/// # Errors
///
/// Returns `TypeMismatch` if no overload accepts the arguments.
pub fn bind_builtin_arguments(
    name: &str,
    candidates: &[BuiltinSignature],
    arguments: Vec<QueryNode>,
) -> Result<(Vec<QueryNode>, TypeRef)> {
    let best = candidates
        .iter()
        .filter(|s| s.parameters.len() == arguments.len())
        .filter_map(|s| promotion_cost(s, &arguments).map(|cost| (cost, s)))
        .min_by_key(|(cost, _)| *cost)
        .map(|(_, s)| *s);

    let Some(signature) = best else {
        let actual: Vec<String> = arguments.iter().map(QueryNode::type_name).collect();
        return Err(QueryError::type_mismatch(
            format!("arguments matching a signature of '{name}'"),
            format!("({})", actual.join(", ")),
        ));
    };

    let converted = arguments
        .into_iter()
        .zip(signature.parameters)
        .map(|(arg, kind)| match arg.type_reference() {
            Some(t) if t.as_primitive() != Some(*kind) => {
                let target = TypeRef::primitive(*kind, t.nullable);
                convert(arg, &target)
            }
            _ => arg,
        })
        .collect();
    Ok((converted, TypeRef::primitive(signature.return_kind, true)))
}

fn promotion_cost(signature: &BuiltinSignature, arguments: &[QueryNode]) -> Option<usize> {
    let mut cost = 0;
    for (arg, kind) in arguments.iter().zip(signature.parameters) {
        let Some(type_ref) = arg.type_reference() else {
            continue;
        };
        let actual = type_ref.as_primitive()?;
        if actual == *kind {
            continue;
        }
        if !actual.promotes_to(*kind) {
            return None;
        }
        cost += 1;
    }
    Some(cost)
}
