//! Bound `$filter` and `$orderby` clauses.

use tracing::debug;

use crate::error::{QueryError, Result};
use crate::parser::{OrderByDirection, OrderByToken, QueryToken};

use super::expression::QueryNode;
use super::scope::{BindingState, RangeVariable};
use super::semantic::MetadataBinder;

/// Bound `$filter` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub expression: QueryNode,
    /// The `$it` the expression was bound against.
    pub range_variable: Option<RangeVariable>,
}

/// Bound `$orderby` items, in order of precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub items: Vec<OrderByItem>,
    pub range_variable: Option<RangeVariable>,
}

/// One `$orderby` item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expression: QueryNode,
    pub direction: OrderByDirection,
}

impl FilterClause {
    /// Binds a `$filter` token, requiring a boolean or untyped result.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for a typed non-boolean expression and any
    /// error from binding the expression.
    pub fn bind(
        binder: &MetadataBinder<'_>,
        token: &QueryToken,
        state: &mut BindingState,
    ) -> Result<Self> {
        let expression = binder.bind(token, state)?;
        if let Some(t) = expression.type_reference() {
            if !t.is_boolean() {
                return Err(QueryError::type_mismatch("Edm.Boolean", t.full_name()));
            }
        }
        debug!("bound filter clause");
        Ok(FilterClause {
            expression,
            range_variable: state.implicit_range_variable().cloned(),
        })
    }
}

impl OrderByClause {
    /// Binds `$orderby` items, requiring each to be single-valued.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for a collection-valued item and any error from
    /// binding an item.
    pub fn bind(
        binder: &MetadataBinder<'_>,
        tokens: &[OrderByToken],
        state: &mut BindingState,
    ) -> Result<Self> {
        let mut items = Vec::with_capacity(tokens.len());
        for token in tokens {
            let expression = binder.bind(&token.expression, state)?;
            if expression.is_collection() {
                return Err(QueryError::type_mismatch(
                    "single value",
                    expression.type_name(),
                ));
            }
            items.push(OrderByItem {
                expression,
                direction: token.direction,
            });
        }
        debug!(items = items.len(), "bound orderby clause");
        Ok(OrderByClause {
            items,
            range_variable: state.implicit_range_variable().cloned(),
        })
    }
}
