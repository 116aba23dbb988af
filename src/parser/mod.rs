//! Parsers for `$filter`, `$orderby`, `$select` and `$expand` text.
//!
//! Every entry point takes a `max_depth` recursion budget. Parsing is
//! syntax-only: the resulting tokens carry no type information.

pub mod ast;
mod expression;
mod select_expand;

pub use ast::{
    BinaryOperatorKind, ExpandLevels, ExpandTermToken, ExpandToken, FunctionArgument,
    FunctionCallToken, LambdaKind, LambdaToken, LiteralToken, OrderByDirection, OrderByToken,
    PathSegmentToken, PathToken, QueryToken, SelectExpandPath, SelectTermToken, SelectToken,
    UnaryOperatorKind,
};
pub use expression::ExpressionParser;
pub use select_expand::{ExpandOptionParser, SelectExpandParser};

use crate::error::{QueryError, Result};

/// Native stack left free before each recursive step. Must exceed the
/// 64 KiB pest reserves for itself.
const STACK_RED_ZONE: usize = 256 * 1024;

/// Size of each stack segment allocated when the red zone is reached.
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Runs `f`, switching to a fresh heap-allocated stack segment first when
/// less than the red zone remains, so that nesting is bounded by the
/// recursion budget rather than by the caller's thread stack.
pub(crate) fn ensure_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, f)
}

/// Remaining nesting allowance, threaded by value through recursive calls.
///
/// Each nested construct calls [`descend`](Self::descend) on its caller's
/// budget, so returning from a call restores the caller's depth for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursionBudget {
    remaining: usize,
    limit: usize,
}

impl RecursionBudget {
    /// Creates a budget allowing `limit` nested levels.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        RecursionBudget {
            remaining: limit,
            limit,
        }
    }

    /// Returns the budget for one level deeper.
    ///
    /// # Errors
    ///
    /// Returns `RecursionLimitExceeded` once the budget is spent.
    pub fn descend(self) -> Result<Self> {
        if self.remaining == 0 {
            return Err(QueryError::RecursionLimitExceeded { limit: self.limit });
        }
        Ok(RecursionBudget {
            remaining: self.remaining - 1,
            limit: self.limit,
        })
    }

    /// Levels still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// The configured limit.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Parses `$filter` text into an expression token.
///
/// # Errors
///
/// Returns `Lexical`, `Syntax` or `RecursionLimitExceeded` errors.
pub fn parse_filter(text: &str, max_depth: usize) -> Result<QueryToken> {
    ExpressionParser::new(text, max_depth)?.parse_filter()
}

/// Parses `$orderby` text into one token per comma-separated item.
///
/// # Errors
///
/// Returns `Lexical`, `Syntax` or `RecursionLimitExceeded` errors.
pub fn parse_order_by(text: &str, max_depth: usize) -> Result<Vec<OrderByToken>> {
    ExpressionParser::new(text, max_depth)?.parse_order_by()
}

/// Parses `$select` text.
///
/// # Errors
///
/// Returns `Lexical`, `Syntax` or `RecursionLimitExceeded` errors.
pub fn parse_select(text: &str, max_depth: usize) -> Result<SelectToken> {
    SelectExpandParser::new(text, max_depth).parse_select()
}

/// Parses `$expand` text, including nested per-term options.
///
/// # Errors
///
/// Returns `Lexical`, `Syntax` or `RecursionLimitExceeded` errors.
pub fn parse_expand(text: &str, max_depth: usize) -> Result<ExpandToken> {
    SelectExpandParser::new(text, max_depth).parse_expand()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_descends_to_zero() {
        let budget = RecursionBudget::new(2);
        let one = budget.descend().unwrap();
        let zero = one.descend().unwrap();
        assert_eq!(zero.remaining(), 0);
        assert_eq!(
            zero.descend(),
            Err(QueryError::RecursionLimitExceeded { limit: 2 })
        );
        // The caller's copy is untouched.
        assert_eq!(budget.remaining(), 2);
    }
}
