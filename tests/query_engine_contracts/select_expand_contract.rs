//! Contract tests for select and expand binding.
//!
//! These tests verify the path contracts:
//! - Type segments must narrow the current type
//! - Expand targets must be navigation properties
//! - Path length and expansion limits are enforced

use std::sync::Arc;

use odata_query::binder::{follow_type_segments, SelectItem};
use odata_query::{ErrorKind, ParserSettings, QueryError, QueryOptionParser};

use super::pet_store;

fn parser(set: &str) -> QueryOptionParser {
    QueryOptionParser::for_entity_set(Arc::new(pet_store()), set).unwrap()
}

#[test]
fn test_unrelated_type_segment_is_rejected() {
    let err = parser("Foos")
        .parse_select_and_expand(Some("NS.Bar/Name"), None)
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::InvalidCast {
            from: "NS.Foo".into(),
            to: "NS.Bar".into()
        }
    );
}

#[test]
fn test_path_binder_directly() {
    let model = pet_store();
    let segments = vec!["NS.Dog".to_string(), "Breed".to_string()];
    let resolved = follow_type_segments(&model, &segments, "NS.Pet", 100).unwrap();
    assert_eq!(resolved.current_type, "NS.Dog");
    assert_eq!(resolved.remaining, ["Breed".to_string()]);

    let segments = vec!["NS.Ghost".to_string(), "Breed".to_string()];
    let err = follow_type_segments(&model, &segments, "NS.Pet", 100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownType);
}

#[test]
fn test_expand_binds_nested_options() {
    let clause = parser("People")
        .parse_select_and_expand(Some("Name"), Some("Pets($filter=Age gt 2;$top=5;$select=Name)"))
        .unwrap();
    assert!(!clause.all_selected);
    let SelectItem::Expanded(pets) = &clause.items[1] else {
        panic!("expected expanded item");
    };
    assert_eq!(pets.navigation, "Pets");
    assert_eq!(pets.navigation_source.as_deref(), Some("Pets"));
    assert_eq!(pets.top, Some(5));
    assert!(pets.filter.is_some());
    assert!(!pets.select_expand.all_selected);
}

#[test]
fn test_expand_filter_is_bound_against_target_type() {
    let err = parser("People")
        .parse_select_and_expand(None, Some("Pets($filter=Emails/any(e:true))"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
}

#[test]
fn test_expand_requires_navigation() {
    let err = parser("People")
        .parse_select_and_expand(None, Some("Address"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPathSegment);
}

#[test]
fn test_path_limit() {
    let settings = ParserSettings {
        path_limit: 2,
        ..ParserSettings::default()
    };
    let parser = parser("Pets").with_settings(settings);
    assert!(parser
        .parse_select_and_expand(None, Some("Owner/BestFriend"))
        .is_err());
    let err = parser
        .parse_select_and_expand(Some("Owner/Address/City"), None)
        .unwrap_err();
    assert_eq!(err, QueryError::PathTooDeep { limit: 2 });
}

#[test]
fn test_expansion_limits() {
    let settings = ParserSettings {
        maximum_expansion_depth: Some(2),
        maximum_expansion_count: Some(3),
        ..ParserSettings::default()
    };
    let parser = parser("People").with_settings(settings);
    assert!(parser
        .parse_select_and_expand(None, Some("Pets($expand=Owner),BestFriend"))
        .is_ok());
    let err = parser
        .parse_select_and_expand(None, Some("Pets($expand=Owner($expand=Pets))"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExpansionLimitExceeded);
    let err = parser
        .parse_select_and_expand(None, Some("Pets,BestFriend,BestFriend($top=1),Pets($top=1)"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExpansionLimitExceeded);
}

#[test]
fn test_nested_expand_depth_in_parser() {
    let parser = parser("People").with_settings(ParserSettings {
        select_expand_limit: 2,
        ..ParserSettings::default()
    });
    let err = parser
        .parse_select_and_expand(None, Some("Pets($expand=Owner($expand=Pets))"))
        .unwrap_err();
    assert_eq!(err, QueryError::RecursionLimitExceeded { limit: 2 });
}
