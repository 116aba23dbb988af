//! Binding of `$select` and `$expand` into a select/expand clause tree.

use tracing::{debug, trace};

use crate::error::{QueryError, Result};
use crate::model::PropertyRef;
use crate::parser::{
    ensure_stack, ExpandLevels, ExpandTermToken, ExpandToken, SelectTermToken, SelectToken,
};
use crate::types::TypeRef;
use crate::ParserSettings;

use super::clause::{FilterClause, OrderByClause};
use super::factory::implicit_range_variable;
use super::path::{follow_type_segments, TypeSegment};
use super::scope::BindingState;
use super::semantic::MetadataBinder;

/// Bound `$select`/`$expand` for one level of the result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectExpandClause {
    /// True when `$select` is absent, empty or contains `*`.
    pub all_selected: bool,
    pub items: Vec<SelectItem>,
}

/// Item of a [`SelectExpandClause`].
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `Namespace.*`: every operation in the namespace.
    NamespaceWildcard(String),
    PathSelection(PathSelectItem),
    Expanded(ExpandedNavigationItem),
}

/// Selected structural or navigation property.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSelectItem {
    pub type_segments: Vec<TypeSegment>,
    /// Complex properties leading to `property`.
    pub path: Vec<String>,
    pub property: String,
    /// `None` for a dynamic property of an open type.
    pub type_ref: Option<TypeRef>,
    pub filter: Option<FilterClause>,
    pub order_by: Option<OrderByClause>,
    pub top: Option<i64>,
    pub skip: Option<i64>,
    pub count: Option<bool>,
    pub select: Option<Box<SelectExpandClause>>,
}

/// Expanded navigation property with its nested options.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedNavigationItem {
    pub type_segments: Vec<TypeSegment>,
    /// Complex properties leading to `navigation`.
    pub path: Vec<String>,
    pub navigation: String,
    pub type_ref: TypeRef,
    pub navigation_source: Option<String>,
    pub filter: Option<FilterClause>,
    pub order_by: Option<OrderByClause>,
    pub top: Option<i64>,
    pub skip: Option<i64>,
    pub count: Option<bool>,
    pub levels: Option<ExpandLevels>,
    pub select_expand: Box<SelectExpandClause>,
}

/// Binds select and expand trees against one structured type.
///
/// Counts expanded items across the whole tree so that
/// `maximum_expansion_count` applies to the request as a whole.
#[derive(Debug)]
pub struct SelectExpandBinder<'a> {
    binder: MetadataBinder<'a>,
    settings: &'a ParserSettings,
    expanded: usize,
}

/// Property reached by a select or expand path.
struct ResolvedProperty<'p> {
    type_segments: Vec<TypeSegment>,
    path: Vec<String>,
    name: &'p str,
    target: Option<Target>,
}

enum Target {
    Structural(TypeRef),
    Navigation(TypeRef),
}

impl<'a> SelectExpandBinder<'a> {
    #[must_use]
    pub fn new(binder: MetadataBinder<'a>, settings: &'a ParserSettings) -> Self {
        SelectExpandBinder {
            binder,
            settings,
            expanded: 0,
        }
    }

    /// Binds the top level of a request against `type_name`, whose
    /// instances come from `navigation_source` when known.
    ///
    /// # Errors
    ///
    /// Returns path errors (`PathTooDeep`, `InvalidPathSegment`,
    /// `UnknownIdentifier`, `UnknownType`, `InvalidCast`),
    /// `ExpansionLimitExceeded`, and any error from binding nested options.
    pub fn bind(
        &mut self,
        select: Option<&SelectToken>,
        expand: Option<&ExpandToken>,
        type_name: &str,
        navigation_source: Option<&str>,
    ) -> Result<SelectExpandClause> {
        debug!(type_name, "binding select and expand");
        self.bind_level(select, expand, type_name, navigation_source, 1)
    }

    fn bind_level(
        &mut self,
        select: Option<&SelectToken>,
        expand: Option<&ExpandToken>,
        type_name: &str,
        navigation_source: Option<&str>,
        depth: usize,
    ) -> Result<SelectExpandClause> {
        ensure_stack(|| {
            let select_terms = select.map_or(&[][..], |s| s.terms.as_slice());
            let mut clause = SelectExpandClause {
                all_selected: select_terms.is_empty(),
                items: Vec::new(),
            };
            for term in select_terms {
                let item = self.bind_select_term(term, type_name)?;
                if item == SelectItem::Wildcard {
                    clause.all_selected = true;
                }
                clause.items.push(item);
            }
            for term in expand.map_or(&[][..], |e| e.terms.as_slice()) {
                let item = self.bind_expand_term(term, type_name, navigation_source, depth)?;
                clause.items.push(SelectItem::Expanded(item));
            }
            Ok(clause)
        })
    }

    fn bind_select_term(&mut self, term: &SelectTermToken, type_name: &str) -> Result<SelectItem> {
        let segments = term.path.segments.as_slice();
        match segments {
            [only] if only == "*" => return Ok(SelectItem::Wildcard),
            [only] if only.ends_with(".*") => {
                let namespace = only.trim_end_matches(".*");
                return Ok(SelectItem::NamespaceWildcard(namespace.to_string()));
            }
            _ => {}
        }
        let resolved = self.resolve_property(segments, type_name)?;
        let type_ref = match resolved.target {
            Some(Target::Structural(t) | Target::Navigation(t)) => Some(t),
            None => None,
        };

        let has_options = term.filter.is_some() || term.order_by.is_some();
        let mut filter = None;
        let mut order_by = None;
        if has_options {
            let Some(collection) = type_ref.as_ref().filter(|t| t.is_collection()) else {
                return Err(QueryError::InvalidPathSegment(format!(
                    "options on '{}' require a collection-valued property",
                    resolved.name
                )));
            };
            let it = implicit_range_variable(Some(collection), None);
            if let Some(token) = &term.filter {
                let mut state = BindingState::with_implicit(it.clone(), self.settings.filter_limit);
                filter = Some(FilterClause::bind(&self.binder, token, &mut state)?);
            }
            if let Some(tokens) = &term.order_by {
                let mut state = BindingState::with_implicit(it, self.settings.order_by_limit);
                order_by = Some(OrderByClause::bind(&self.binder, tokens, &mut state)?);
            }
        }

        let select = match &term.select {
            Some(nested) => {
                let nested_type = type_ref
                    .as_ref()
                    .map(|t| t.item_type().unwrap_or(t))
                    .and_then(TypeRef::structured_name)
                    .ok_or_else(|| {
                        QueryError::InvalidPathSegment(format!(
                            "'{}' has no properties to select",
                            resolved.name
                        ))
                    })?
                    .to_string();
                let clause = self.bind_level(Some(nested), None, &nested_type, None, 1)?;
                Some(Box::new(clause))
            }
            None => None,
        };

        Ok(SelectItem::PathSelection(PathSelectItem {
            type_segments: resolved.type_segments,
            path: resolved.path,
            property: resolved.name.to_string(),
            type_ref,
            filter,
            order_by,
            top: term.top,
            skip: term.skip,
            count: term.count,
            select,
        }))
    }

    fn bind_expand_term(
        &mut self,
        term: &ExpandTermToken,
        type_name: &str,
        navigation_source: Option<&str>,
        depth: usize,
    ) -> Result<ExpandedNavigationItem> {
        self.check_expansion_limits(term, depth)?;

        let resolved = self.resolve_property(&term.path.segments, type_name)?;
        let Some(Target::Navigation(type_ref)) = resolved.target else {
            return Err(QueryError::InvalidPathSegment(format!(
                "'{}' is not a navigation property",
                resolved.name
            )));
        };
        let binding_path = resolved
            .path
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(resolved.name))
            .collect::<Vec<_>>()
            .join("/");
        let model = self.binder.model();
        let target_set = navigation_source.and_then(|src| model.navigation_target(src, &binding_path));
        let item_type = type_ref.item_type().unwrap_or(&type_ref);
        let target_type = item_type
            .structured_name()
            .ok_or_else(|| QueryError::InvalidPathSegment(resolved.name.to_string()))?
            .to_string();
        trace!(navigation = resolved.name, target = %target_type, depth, "expand item");

        let it = implicit_range_variable(Some(&type_ref), target_set);
        let filter = match &term.filter {
            Some(token) => {
                let mut state = BindingState::with_implicit(it.clone(), self.settings.filter_limit);
                Some(FilterClause::bind(&self.binder, token, &mut state)?)
            }
            None => None,
        };
        let order_by = match &term.order_by {
            Some(tokens) => {
                let mut state = BindingState::with_implicit(it, self.settings.order_by_limit);
                Some(OrderByClause::bind(&self.binder, tokens, &mut state)?)
            }
            None => None,
        };

        let target_set_name = target_set.map(|set| set.name.clone());
        let select_expand = self.bind_level(
            term.select.as_ref(),
            term.expand.as_ref(),
            &target_type,
            target_set_name.as_deref(),
            depth + 1,
        )?;

        Ok(ExpandedNavigationItem {
            type_segments: resolved.type_segments,
            path: resolved.path,
            navigation: resolved.name.to_string(),
            type_ref,
            navigation_source: target_set_name,
            filter,
            order_by,
            top: term.top,
            skip: term.skip,
            count: term.count,
            levels: term.levels,
            select_expand: Box::new(select_expand),
        })
    }

    fn check_expansion_limits(&mut self, term: &ExpandTermToken, depth: usize) -> Result<()> {
        if let Some(max) = self.settings.maximum_expansion_depth {
            let extra = match term.levels {
                Some(ExpandLevels::Count(n)) => (n as usize).saturating_sub(1),
                Some(ExpandLevels::Max) | None => 0,
            };
            if depth + extra > max {
                return Err(QueryError::ExpansionLimitExceeded(format!(
                    "expansion depth {} exceeds the maximum of {max}",
                    depth + extra
                )));
            }
        }
        self.expanded += 1;
        if let Some(max) = self.settings.maximum_expansion_count {
            if self.expanded > max {
                return Err(QueryError::ExpansionLimitExceeded(format!(
                    "more than {max} expanded items"
                )));
            }
        }
        Ok(())
    }

    /// Walks casts, then complex properties, to the last segment's property.
    fn resolve_property<'p>(
        &self,
        segments: &'p [String],
        type_name: &str,
    ) -> Result<ResolvedProperty<'p>> {
        let limit = self.settings.path_limit;
        if segments.len() > limit {
            return Err(QueryError::PathTooDeep { limit });
        }
        let model = self.binder.model();
        let resolved = follow_type_segments(model, segments, type_name, limit)?;
        let Some((last, prefix)) = resolved.remaining.split_last() else {
            return Err(QueryError::InvalidPathSegment(segments.join("/")));
        };

        let mut current = resolved.current_type;
        for segment in prefix {
            let next = match model.find_property(&current, segment) {
                Some(PropertyRef::Structural(p)) if !p.type_ref.is_collection() => {
                    p.type_ref.structured_name().map(str::to_string)
                }
                Some(_) => None,
                None => {
                    return Err(QueryError::UnknownIdentifier {
                        name: segment.clone(),
                        type_name: current,
                    })
                }
            };
            current = next.ok_or_else(|| {
                QueryError::InvalidPathSegment(format!(
                    "'{segment}' must be a single-valued complex property"
                ))
            })?;
        }

        if last.starts_with('$') || last.ends_with('*') {
            return Err(QueryError::InvalidPathSegment(last.clone()));
        }
        let target = match model.find_property(&current, last) {
            Some(PropertyRef::Structural(p)) => Some(Target::Structural(p.type_ref.clone())),
            Some(PropertyRef::Navigation(n)) => Some(Target::Navigation(n.type_ref())),
            None if model.is_open_type(&current) => None,
            None => {
                return Err(QueryError::UnknownIdentifier {
                    name: last.clone(),
                    type_name: current,
                })
            }
        };
        Ok(ResolvedProperty {
            type_segments: resolved.type_segments,
            path: prefix.to_vec(),
            name: last,
            target,
        })
    }
}
