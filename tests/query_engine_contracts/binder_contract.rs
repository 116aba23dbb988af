//! Contract tests for the Binder module.
//!
//! These tests verify the semantic analysis contracts:
//! - Identifiers, types and functions unknown to the model are rejected
//! - Lambda variables never outlive their body
//! - Overload resolution reports ambiguity

use odata_query::binder::{
    implicit_range_variable, resolve_operation, resolve_overload, BindingState, MetadataBinder,
    QueryNode, RangeVariableKind,
};
use odata_query::model::{EdmModel, Operation, SchemaModel, StructuredType};
use odata_query::parser::{parse_filter, BinaryOperatorKind};
use odata_query::types::{LiteralValue, PrimitiveKind, TypeRef};
use odata_query::{ErrorKind, QueryError, Result};

use super::pet_store;

fn state_for(model: &SchemaModel, set: &str, type_name: &str) -> BindingState {
    let it = implicit_range_variable(
        Some(&TypeRef::entity(type_name, false)),
        model.find_entity_set(set),
    );
    BindingState::with_implicit(it, 100)
}

fn bind_person(text: &str) -> Result<QueryNode> {
    let model = pet_store();
    let mut state = state_for(&model, "People", "NS.Person");
    let token = parse_filter(text, 100)?;
    MetadataBinder::new(&model).bind(&token, &mut state)
}

fn bind_pet(text: &str) -> Result<QueryNode> {
    let model = pet_store();
    let mut state = state_for(&model, "Pets", "NS.Pet");
    let token = parse_filter(text, 100)?;
    MetadataBinder::new(&model).bind(&token, &mut state)
}

// -------------------------------------------------------------------------
// Property filters
// -------------------------------------------------------------------------

#[test]
fn test_property_equals_constant() {
    let mut model = SchemaModel::new();
    model
        .add_structured_type(
            StructuredType::entity("NS.Dog")
                .with_property("Name", TypeRef::primitive(PrimitiveKind::String, true)),
        )
        .unwrap();
    let it = implicit_range_variable(Some(&TypeRef::entity("NS.Dog", false)), None);
    let mut state = BindingState::with_implicit(it, 100);
    let token = parse_filter("Name eq 'Fido'", 100).unwrap();
    let node = MetadataBinder::new(&model).bind(&token, &mut state).unwrap();

    let QueryNode::BinaryOperator {
        op,
        left,
        right,
        type_ref,
    } = node
    else {
        panic!("expected binary operator");
    };
    assert_eq!(op, BinaryOperatorKind::Equal);
    assert_eq!(type_ref, Some(TypeRef::boolean()));
    let QueryNode::SingleValueProperty { property, .. } = *left else {
        panic!("expected property access");
    };
    assert_eq!(property, "Name");
    let QueryNode::Constant { value, .. } = *right else {
        panic!("expected constant");
    };
    assert_eq!(value, LiteralValue::String("Fido".into()));
}

#[test]
fn test_numeric_promotion_inserts_convert() {
    let node = bind_pet("Age gt 2.5").unwrap();
    let QueryNode::BinaryOperator { left, .. } = node else {
        panic!("expected binary operator");
    };
    assert!(matches!(*left, QueryNode::Convert { .. }));
}

#[test]
fn test_null_comparison() {
    let node = bind_pet("Name eq null").unwrap();
    let QueryNode::BinaryOperator { right, .. } = node else {
        panic!("expected binary operator");
    };
    assert!(matches!(*right, QueryNode::Convert { .. }));
}

#[test]
fn test_enum_and_date_literals() {
    assert!(bind_pet("Color eq NS.Color'Green'").is_ok());
    assert!(bind_pet("Color eq 'Green'").is_ok());
    assert!(bind_pet("Birth lt 2024-01-01").is_ok());
    assert_eq!(
        bind_pet("Color eq 'Purple'").unwrap_err().kind(),
        ErrorKind::TypeMismatch
    );
}

#[test]
fn test_navigation_and_complex_paths() {
    assert!(bind_pet("Owner/Address/City eq 'Oslo'").is_ok());
    let err = bind_pet("Owner/Address/Planet eq 'Mars'").unwrap_err();
    assert_eq!(
        err,
        QueryError::UnknownIdentifier {
            name: "Planet".into(),
            type_name: "NS.Address".into()
        }
    );
}

#[test]
fn test_open_type_accepts_dynamic_properties() {
    let node = bind_person("Nickname eq 'Bo'").unwrap();
    let QueryNode::BinaryOperator { left, .. } = node else {
        panic!("expected binary operator");
    };
    assert!(matches!(*left, QueryNode::OpenProperty { .. }));
    assert_eq!(
        bind_pet("Nickname eq 'Bo'").unwrap_err().kind(),
        ErrorKind::UnknownIdentifier
    );
}

#[test]
fn test_error_kinds() {
    assert_eq!(bind_pet("Name eq 1").unwrap_err().kind(), ErrorKind::TypeMismatch);
    assert_eq!(bind_pet("Name and true").unwrap_err().kind(), ErrorKind::TypeMismatch);
    assert_eq!(bind_pet("shout(Name)").unwrap_err().kind(), ErrorKind::UnknownFunction);
    assert_eq!(bind_pet("isof(NS.Ghost)").unwrap_err().kind(), ErrorKind::UnknownType);
    assert_eq!(bind_pet("NS.Dog/Indoor").unwrap_err().kind(), ErrorKind::UnknownIdentifier);
}

// -------------------------------------------------------------------------
// Lambdas
// -------------------------------------------------------------------------

#[test]
fn test_any_introduces_scoped_variable() {
    let model = pet_store();
    let mut state = state_for(&model, "People", "NS.Person");
    let token = parse_filter("Pets/any(p:p/Age eq 3)", 100).unwrap();
    let node = MetadataBinder::new(&model).bind(&token, &mut state).unwrap();

    let QueryNode::Any(lambda) = node else {
        panic!("expected Any");
    };
    assert_eq!(lambda.type_ref, TypeRef::boolean());
    let p = lambda.current_range_variable.unwrap();
    assert_eq!(p.name, "p");
    assert_eq!(p.kind, RangeVariableKind::Entity);
    assert_eq!(p.type_ref, Some(TypeRef::entity("NS.Pet", false)));
    assert!(state.lookup("p").is_none());
    assert_eq!(state.depth(), 0);
}

#[test]
fn test_failed_lambda_does_not_leak_scope() {
    let model = pet_store();
    let mut state = state_for(&model, "People", "NS.Person");
    let binder = MetadataBinder::new(&model);
    for text in [
        "Pets/any(p:p/Nope eq 1)",
        "Pets/any(p:p/Age)",
        "Pets/any(p:Emails/all(e:e eq p/Missing))",
        "Pets/all(p:p/Owner/Pets/any(q:q/Age add 'x' eq 1))",
    ] {
        let token = parse_filter(text, 100).unwrap();
        assert!(binder.bind(&token, &mut state).is_err(), "{text}");
        assert_eq!(state.depth(), 0, "{text}");
        assert!(state.lookup("p").is_none(), "{text}");
    }
}

#[test]
fn test_lambda_over_derived_collection() {
    let node = bind_person("Pets/NS.Dog/all(d:d/Breed ne null)").unwrap();
    let QueryNode::All(lambda) = node else {
        panic!("expected All");
    };
    assert!(matches!(*lambda.source, QueryNode::EntityCollectionCast { .. }));
}

#[test]
fn test_lambda_over_primitive_collection() {
    let node = bind_pet("Tags/any(t:contains(t, 'good'))").unwrap();
    let QueryNode::Any(lambda) = node else {
        panic!("expected Any");
    };
    assert_eq!(
        lambda.current_range_variable.unwrap().kind,
        RangeVariableKind::NonEntity
    );
}

#[test]
fn test_lambda_requires_collection() {
    assert_eq!(
        bind_pet("Owner/any(o:true)").unwrap_err().kind(),
        ErrorKind::TypeMismatch
    );
}

// -------------------------------------------------------------------------
// Operations
// -------------------------------------------------------------------------

#[test]
fn test_duplicate_overloads_are_ambiguous() {
    let dog = TypeRef::entity("NS.Dog", false);
    let radius = TypeRef::primitive(PrimitiveKind::Double, false);
    let first = Operation::bound_function("NS.Near", dog.clone(), TypeRef::boolean())
        .with_parameter("radius", radius.clone());
    let second =
        Operation::bound_function("NS.Near", dog, TypeRef::boolean()).with_parameter("radius", radius);

    let err = resolve_overload(&[&first, &second], &["radius"], "NS.Near").unwrap_err();
    assert_eq!(err, QueryError::AmbiguousOverload("NS.Near".into()));
    let err = resolve_operation(&[&first, &second], &["radius"], "NS.Near").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmbiguousOverload);
}

#[test]
fn test_ambiguous_overload_through_binder() {
    let mut model = pet_store();
    for _ in 0..2 {
        model
            .add_operation(
                Operation::bound_function("NS.Near", TypeRef::entity("NS.Dog", false), TypeRef::boolean())
                    .with_parameter("radius", TypeRef::primitive(PrimitiveKind::Double, false)),
            )
            .unwrap();
    }
    let it = implicit_range_variable(Some(&TypeRef::entity("NS.Dog", false)), None);
    let mut state = BindingState::with_implicit(it, 100);
    let token = parse_filter("NS.Near(radius=1.5)", 100).unwrap();
    let err = MetadataBinder::new(&model).bind(&token, &mut state).unwrap_err();
    assert_eq!(err, QueryError::AmbiguousOverload("NS.Near".into()));
}

#[test]
fn test_bound_function_calls() {
    let node = bind_pet("NS.IsOlderThan(years=3)").unwrap();
    assert!(matches!(node, QueryNode::SingleValueFunctionCall(_)));

    let node = bind_person("NS.Friends()/any(f:f/Age gt 30)").unwrap();
    let QueryNode::Any(lambda) = node else {
        panic!("expected Any");
    };
    assert!(matches!(*lambda.source, QueryNode::EntityCollectionFunctionCall(_)));

    assert_eq!(
        bind_pet("NS.IsOlderThan(months=3)").unwrap_err().kind(),
        ErrorKind::UnknownFunction
    );
    assert_eq!(
        bind_pet("NS.IsOlderThan(years='three')").unwrap_err().kind(),
        ErrorKind::TypeMismatch
    );
}

// -------------------------------------------------------------------------
// Determinism
// -------------------------------------------------------------------------

#[test]
fn test_binding_twice_yields_equal_trees() {
    let model = pet_store();
    let binder = MetadataBinder::new(&model);
    let token =
        parse_filter("Pets/any(p:p/Age gt 2 and startswith(p/Name, 'F')) or Age lt 40", 100).unwrap();
    let first = binder
        .bind(&token, &mut state_for(&model, "People", "NS.Person"))
        .unwrap();
    let second = binder
        .bind(&token, &mut state_for(&model, "People", "NS.Person"))
        .unwrap();
    assert_eq!(first, second);
}
