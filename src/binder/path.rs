//! Type-cast segments at the head of select and expand paths.

use tracing::trace;

use crate::error::{QueryError, Result};
use crate::model::EdmModel;
use crate::types::TypeRef;

/// Cast to a derived type within a select or expand path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSegment {
    pub type_name: String,
    pub type_ref: TypeRef,
}

/// Result of walking the leading type segments of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTypePath<'p> {
    pub type_segments: Vec<TypeSegment>,
    /// Structured type in effect after the casts.
    pub current_type: String,
    /// Segments from the first non-cast segment on.
    pub remaining: &'p [String],
}

/// Returns true for `Namespace.Name`, excluding the `Namespace.*` wildcard.
#[must_use]
pub fn is_qualified_type_segment(segment: &str) -> bool {
    segment.contains('.') && !segment.ends_with(".*")
}

/// Walks qualified segments of `segments` that are followed by another
/// segment, treating each as a cast of the current type.
///
/// # Errors
///
/// Returns `PathTooDeep` after `max_depth` casts, `UnknownType` for an
/// undefined type name and `InvalidCast` when a cast type does not derive
/// from the type before it.
pub fn follow_type_segments<'p>(
    model: &dyn EdmModel,
    segments: &'p [String],
    start_type: &str,
    max_depth: usize,
) -> Result<ResolvedTypePath<'p>> {
    let mut type_segments = Vec::new();
    let mut current = start_type.to_string();
    let mut index = 0;
    while index + 1 < segments.len() && is_qualified_type_segment(&segments[index]) {
        if index >= max_depth {
            return Err(QueryError::PathTooDeep { limit: max_depth });
        }
        let name = &segments[index];
        let ty = model
            .find_structured_type(name)
            .ok_or_else(|| QueryError::UnknownType(name.clone()))?;
        if !model.is_or_inherits_from(&ty.name, &current) {
            return Err(QueryError::InvalidCast {
                from: current,
                to: ty.name.clone(),
            });
        }
        trace!(from = %current, to = %ty.name, "type segment");
        type_segments.push(TypeSegment {
            type_name: ty.name.clone(),
            type_ref: ty.type_ref(false),
        });
        current.clone_from(&ty.name);
        index += 1;
    }
    Ok(ResolvedTypePath {
        type_segments,
        current_type: current,
        remaining: &segments[index..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{SchemaModel, StructuredType};
    use crate::types::PrimitiveKind;

    fn model() -> SchemaModel {
        let mut model = SchemaModel::new();
        let string = TypeRef::primitive(PrimitiveKind::String, true);
        model
            .add_structured_type(StructuredType::entity("NS.Foo").with_property("Name", string.clone()))
            .unwrap();
        model
            .add_structured_type(StructuredType::entity("NS.SubFoo").with_base("NS.Foo").with_property("Extra", string.clone()))
            .unwrap();
        model
            .add_structured_type(StructuredType::entity("NS.Bar").with_property("Name", string))
            .unwrap();
        model
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_derived_cast() {
        let segments = path(&["NS.SubFoo", "Extra"]);
        let resolved = follow_type_segments(&model(), &segments, "NS.Foo", 100).unwrap();
        assert_eq!(resolved.type_segments.len(), 1);
        assert_eq!(resolved.current_type, "NS.SubFoo");
        assert_eq!(resolved.remaining, &segments[1..]);
    }

    #[test]
    fn test_unrelated_cast_is_rejected() {
        let segments = path(&["NS.Bar", "Name"]);
        let err = follow_type_segments(&model(), &segments, "NS.Foo", 100).unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidCast {
                from: "NS.Foo".into(),
                to: "NS.Bar".into()
            }
        );
    }

    #[test]
    fn test_unknown_type() {
        let segments = path(&["NS.Nope", "Name"]);
        let err = follow_type_segments(&model(), &segments, "NS.Foo", 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownType);
    }

    #[test]
    fn test_depth_limit() {
        let segments = path(&["NS.Foo", "NS.SubFoo", "Extra"]);
        let err = follow_type_segments(&model(), &segments, "NS.Foo", 1).unwrap_err();
        assert_eq!(err, QueryError::PathTooDeep { limit: 1 });
        assert!(follow_type_segments(&model(), &segments, "NS.Foo", 2).is_ok());
    }

    #[test]
    fn test_trailing_qualified_segment_is_not_a_cast() {
        let segments = path(&["NS.SubFoo"]);
        let resolved = follow_type_segments(&model(), &segments, "NS.Foo", 100).unwrap();
        assert!(resolved.type_segments.is_empty());
        assert_eq!(resolved.remaining.len(), 1);
        assert!(!is_qualified_type_segment("NS.*"));
    }
}
