//! odata-query - OData query option front end
//!
//! Parses `$filter`, `$orderby`, `$select` and `$expand` text into syntax
//! tokens and binds them against an entity data model into typed node trees.

pub mod binder;
pub mod error;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod types;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use binder::{
    BindingState, FilterClause, MetadataBinder, OrderByClause, QueryNode, RangeVariable,
    SelectExpandClause, SelectItem,
};
pub use error::{ErrorKind, QueryError, Result};
pub use model::{EdmModel, SchemaModel};
pub use parser::{parse_expand, parse_filter, parse_order_by, parse_select, QueryToken};
pub use types::{LiteralValue, PrimitiveKind, TypeRef};

use binder::{implicit_range_variable, SelectExpandBinder};

/// Binds `token` against `model` using the variables and budget in `state`.
///
/// # Errors
///
/// Returns the first resolution or typing error.
pub fn bind(token: &QueryToken, state: &mut BindingState, model: &dyn EdmModel) -> Result<QueryNode> {
    MetadataBinder::new(model).bind(token, state)
}

/// Limits applied when parsing and binding query options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Recursion limit for `$filter` (default: 800).
    pub filter_limit: usize,
    /// Recursion limit for `$orderby` (default: 800).
    pub order_by_limit: usize,
    /// Recursion limit for `$select` and `$expand` (default: 800).
    pub select_expand_limit: usize,
    /// Maximum segments in a select or expand path (default: 100).
    pub path_limit: usize,
    /// Deepest allowed `$expand` nesting, if limited.
    pub maximum_expansion_depth: Option<usize>,
    /// Most expanded items allowed in one request, if limited.
    pub maximum_expansion_count: Option<usize>,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            filter_limit: 800,
            order_by_limit: 800,
            select_expand_limit: 800,
            path_limit: 100,
            maximum_expansion_depth: None,
            maximum_expansion_count: None,
        }
    }
}

/// Parses and binds the query options of one request target.
///
/// The model is shared and never mutated, so one parser can serve any
/// number of threads; each call builds its own [`BindingState`].
#[derive(Debug, Clone)]
pub struct QueryOptionParser {
    model: Arc<dyn EdmModel + Send + Sync>,
    type_ref: TypeRef,
    entity_set: Option<String>,
    settings: ParserSettings,
}

impl QueryOptionParser {
    /// Creates a parser for requests against an entity set.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the set or its entity type is not defined.
    pub fn for_entity_set(model: Arc<dyn EdmModel + Send + Sync>, entity_set: &str) -> Result<Self> {
        let set = model
            .find_entity_set(entity_set)
            .ok_or_else(|| QueryError::Schema(format!("Entity set '{entity_set}' does not exist")))?;
        let entity_type = model.find_structured_type(&set.entity_type).ok_or_else(|| {
            QueryError::Schema(format!("Entity type '{}' does not exist", set.entity_type))
        })?;
        let type_ref = entity_type.type_ref(false);
        Ok(QueryOptionParser {
            type_ref,
            entity_set: Some(entity_set.to_string()),
            settings: ParserSettings::default(),
            model,
        })
    }

    /// Creates a parser for requests against instances of a structured type
    /// that belong to no entity set.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType` if the type is not defined.
    pub fn for_type(model: Arc<dyn EdmModel + Send + Sync>, type_name: &str) -> Result<Self> {
        let ty = model
            .find_structured_type(type_name)
            .ok_or_else(|| QueryError::UnknownType(type_name.to_string()))?;
        let type_ref = ty.type_ref(false);
        Ok(QueryOptionParser {
            type_ref,
            entity_set: None,
            settings: ParserSettings::default(),
            model,
        })
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: ParserSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    #[must_use]
    pub fn model(&self) -> &dyn EdmModel {
        self.model.as_ref()
    }

    fn binding_state(&self, max_depth: usize) -> BindingState {
        let set = self
            .entity_set
            .as_deref()
            .and_then(|name| self.model.find_entity_set(name));
        BindingState::with_implicit(implicit_range_variable(Some(&self.type_ref), set), max_depth)
    }

    /// Parses and binds `$filter`.
    ///
    /// # Errors
    ///
    /// Returns any parse or bind error, or `TypeMismatch` if the expression
    /// is not boolean.
    pub fn parse_filter(&self, text: &str) -> Result<FilterClause> {
        debug!(target_type = %self.type_ref, "parse $filter");
        let limit = self.settings.filter_limit;
        let token = parser::parse_filter(text, limit)?;
        let mut state = self.binding_state(limit);
        FilterClause::bind(&MetadataBinder::new(self.model()), &token, &mut state)
    }

    /// Parses and binds `$orderby`.
    ///
    /// # Errors
    ///
    /// Returns any parse or bind error, or `TypeMismatch` for a
    /// collection-valued item.
    pub fn parse_order_by(&self, text: &str) -> Result<OrderByClause> {
        debug!(target_type = %self.type_ref, "parse $orderby");
        let limit = self.settings.order_by_limit;
        let tokens = parser::parse_order_by(text, limit)?;
        let mut state = self.binding_state(limit);
        OrderByClause::bind(&MetadataBinder::new(self.model()), &tokens, &mut state)
    }

    /// Parses and binds `$select` and `$expand` together.
    ///
    /// # Errors
    ///
    /// Returns any parse error, path error, `ExpansionLimitExceeded`, or
    /// error from binding nested options.
    pub fn parse_select_and_expand(
        &self,
        select: Option<&str>,
        expand: Option<&str>,
    ) -> Result<SelectExpandClause> {
        debug!(target_type = %self.type_ref, "parse $select/$expand");
        let limit = self.settings.select_expand_limit;
        let select = select.map(|text| parser::parse_select(text, limit)).transpose()?;
        let expand = expand.map(|text| parser::parse_expand(text, limit)).transpose()?;
        let type_name = self
            .type_ref
            .structured_name()
            .ok_or_else(|| QueryError::type_mismatch("structured type", self.type_ref.full_name()))?;
        SelectExpandBinder::new(MetadataBinder::new(self.model()), &self.settings).bind(
            select.as_ref(),
            expand.as_ref(),
            type_name,
            self.entity_set.as_deref(),
        )
    }
}
