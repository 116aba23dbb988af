//! Overload resolution for model operations.

use tracing::trace;

use crate::error::{QueryError, Result};
use crate::model::Operation;

/// Picks the single candidate whose non-binding parameters are exactly the
/// supplied parameter names.
///
/// Returns `Ok(None)` when nothing matches; the caller decides whether that
/// is fatal.
///
/// # Errors
///
/// Returns `AmbiguousOverload` when more than one candidate matches.
pub fn resolve_overload<'m>(
    candidates: &[&'m Operation],
    supplied: &[&str],
    name: &str,
) -> Result<Option<&'m Operation>> {
    let mut matching = candidates.iter().copied().filter(|candidate| {
        let parameters = candidate.non_binding_parameters();
        parameters.len() == supplied.len()
            && parameters.iter().all(|p| supplied.contains(&p.name.as_str()))
    });
    let first = matching.next();
    if matching.next().is_some() {
        trace!(operation = name, ?supplied, "ambiguous overload");
        return Err(QueryError::AmbiguousOverload(name.to_string()));
    }
    trace!(operation = name, ?supplied, found = first.is_some(), "resolved overload");
    Ok(first)
}

/// Resolves an operation call by name and binding type.
///
/// Actions are not overloadable and take no parameters in a URL; functions
/// go through [`resolve_overload`].
///
/// # Errors
///
/// Returns `AmbiguousOverload` if an action shares its name with other
/// candidates or functions match ambiguously, and `TypeMismatch` if an
/// action is given parameters.
pub fn resolve_operation<'m>(
    candidates: &[&'m Operation],
    supplied: &[&str],
    name: &str,
) -> Result<Option<&'m Operation>> {
    if candidates.iter().any(|op| op.is_action()) {
        let [action] = candidates else {
            return Err(QueryError::AmbiguousOverload(name.to_string()));
        };
        if !supplied.is_empty() {
            return Err(QueryError::type_mismatch(
                format!("no parameters for action '{name}'"),
                format!("{} parameter(s)", supplied.len()),
            ));
        }
        return Ok(Some(*action));
    }
    resolve_overload(candidates, supplied, name)
}
