//! Range variables and the per-bind scope stack.

use tracing::trace;

use crate::error::Result;
use crate::parser::RecursionBudget;
use crate::types::TypeRef;

/// Name of the implicit range variable.
pub const IMPLICIT_RANGE_VARIABLE: &str = "$it";

/// Named binding for the element an expression is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeVariable {
    pub name: String,
    pub kind: RangeVariableKind,
    /// Element type; absent when iterating an untyped (open) collection.
    pub type_ref: Option<TypeRef>,
    /// Owning entity set for entity-kind variables, when known.
    pub navigation_source: Option<String>,
}

/// Whether a range variable ranges over entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeVariableKind {
    Entity,
    NonEntity,
}

impl RangeVariable {
    /// Creates a range variable, classifying it by `type_ref`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        type_ref: Option<TypeRef>,
        navigation_source: Option<String>,
    ) -> Self {
        let is_entity = type_ref.as_ref().is_some_and(TypeRef::is_entity);
        RangeVariable {
            name: name.into(),
            kind: if is_entity {
                RangeVariableKind::Entity
            } else {
                RangeVariableKind::NonEntity
            },
            type_ref,
            navigation_source: if is_entity { navigation_source } else { None },
        }
    }

    /// Returns true for entity-kind variables.
    #[must_use]
    pub fn is_entity(&self) -> bool {
        self.kind == RangeVariableKind::Entity
    }
}

/// Mutable context owned by one bind invocation.
///
/// Holds the implicit range variable, the stack of lambda-introduced
/// variables (innermost last) and the recursion budget binding starts from.
#[derive(Debug, Clone)]
pub struct BindingState {
    implicit: Option<RangeVariable>,
    range_variables: Vec<RangeVariable>,
    budget: RecursionBudget,
}

impl BindingState {
    /// Creates a state with no implicit range variable.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        BindingState {
            implicit: None,
            range_variables: Vec::new(),
            budget: RecursionBudget::new(max_depth),
        }
    }

    /// Creates a state whose implicit `$it` is `implicit`.
    #[must_use]
    pub fn with_implicit(implicit: Option<RangeVariable>, max_depth: usize) -> Self {
        BindingState {
            implicit,
            ..BindingState::new(max_depth)
        }
    }

    /// Returns the implicit range variable.
    #[must_use]
    pub fn implicit_range_variable(&self) -> Option<&RangeVariable> {
        self.implicit.as_ref()
    }

    /// Budget a top-level bind starts from.
    #[must_use]
    pub fn budget(&self) -> RecursionBudget {
        self.budget
    }

    /// Number of lambda variables currently in scope.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.range_variables.len()
    }

    /// Looks a name up, innermost lambda variable first, then `$it`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&RangeVariable> {
        if let Some(var) = self.range_variables.iter().rev().find(|v| v.name == name) {
            return Some(var);
        }
        self.implicit.as_ref().filter(|v| v.name == name)
    }

    /// Implicit variable followed by every variable in scope, outermost first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RangeVariable> {
        self.implicit
            .iter()
            .chain(self.range_variables.iter())
            .cloned()
            .collect()
    }

    /// Runs `bind` with `variable` in scope and removes it again before
    /// returning, whether `bind` succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns whatever `bind` returns.
    pub fn with_range_variable<T>(
        &mut self,
        variable: RangeVariable,
        bind: impl FnOnce(&mut BindingState) -> Result<T>,
    ) -> Result<T> {
        trace!(name = %variable.name, depth = self.range_variables.len(), "push range variable");
        self.range_variables.push(variable);
        let result = bind(self);
        let popped = self.range_variables.pop();
        trace!(
            name = popped.as_ref().map_or("", |v| v.name.as_str()),
            ok = result.is_ok(),
            "pop range variable"
        );
        result
    }
}
