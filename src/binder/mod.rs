//! Binder module for semantic analysis.
//!
//! The binder resolves syntax tokens against an [`EdmModel`](crate::model::EdmModel):
//! - Identifiers against properties, navigations and range variables
//! - Function calls against built-ins and model operations
//! - Operator operands, inserting conversions where types are promoted
//! - Select and expand paths, including their nested options
//!
//! The output is a typed node tree ready for query evaluation.

mod builtin;
mod clause;
mod expression;
mod factory;
mod function;
mod lambda;
mod operator;
mod path;
mod scope;
mod select_expand;
mod semantic;

pub use builtin::{is_builtin, signatures, BuiltinSignature};
pub use clause::{FilterClause, OrderByClause, OrderByItem};
pub use expression::{FunctionCallNode, LambdaNode, QueryNode};
pub use factory::{implicit_range_variable, lambda_node, lambda_range_variable, range_variable_reference};
pub use function::{resolve_operation, resolve_overload};
pub use path::{follow_type_segments, is_qualified_type_segment, ResolvedTypePath, TypeSegment};
pub use scope::{BindingState, RangeVariable, RangeVariableKind, IMPLICIT_RANGE_VARIABLE};
pub use select_expand::{
    ExpandedNavigationItem, PathSelectItem, SelectExpandBinder, SelectExpandClause, SelectItem,
};
pub use semantic::MetadataBinder;
