//! Binding of `any` and `all` expressions.

use tracing::debug;

use crate::binder::expression::QueryNode;
use crate::binder::factory;
use crate::binder::scope::BindingState;
use crate::binder::semantic::MetadataBinder;
use crate::error::{QueryError, Result};
use crate::parser::{LambdaToken, RecursionBudget};

/// Binds a lambda token to an [`QueryNode::Any`] or [`QueryNode::All`] node.
///
/// A parent that resolves to an open property is treated as an untyped
/// collection. The lambda variable, if any, is only in scope while the body
/// is bound.
///
/// # Errors
///
/// Returns `TypeMismatch` when the parent is not a collection or the body
/// is typed but not boolean, and any error from binding either part.
pub(crate) fn bind_lambda(
    binder: &MetadataBinder<'_>,
    token: &LambdaToken,
    state: &mut BindingState,
    budget: RecursionBudget,
) -> Result<QueryNode> {
    let parent = binder.bind_token(&token.parent, state, budget)?;
    let source = match parent {
        QueryNode::OpenProperty { source, name } => {
            QueryNode::CollectionOpenProperty { source, name }
        }
        node if node.is_collection() => node,
        node => return Err(QueryError::type_mismatch("collection", node.type_name())),
    };

    let range_variables = state.snapshot();
    let variable = token
        .variable
        .as_deref()
        .map(|name| factory::lambda_range_variable(name, &source));
    let body = match &variable {
        Some(var) => state.with_range_variable(var.clone(), |state| {
            bind_body(binder, token, state, budget)
        })?,
        None => bind_body(binder, token, state, budget)?,
    };

    debug!(
        kind = ?token.kind,
        variable = token.variable.as_deref().unwrap_or(""),
        "bound lambda"
    );
    Ok(factory::lambda_node(
        token.kind,
        range_variables,
        variable,
        body,
        source,
    ))
}

fn bind_body(
    binder: &MetadataBinder<'_>,
    token: &LambdaToken,
    state: &mut BindingState,
    budget: RecursionBudget,
) -> Result<QueryNode> {
    let body = binder.bind_token(&token.body, state, budget)?;
    match body.type_reference() {
        Some(t) if !t.is_boolean() => Err(QueryError::type_mismatch("Edm.Boolean", t.full_name())),
        _ => Ok(body),
    }
}
