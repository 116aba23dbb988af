//! Contract tests for the parser.
//!
//! These tests verify the syntax tree contracts:
//! - Operator precedence and token shapes
//! - Recursion limits surface as errors, not stack overflows
//! - Expand term options are parsed into their own slots

use odata_query::parser::{
    parse_expand, parse_filter, parse_order_by, parse_select, BinaryOperatorKind, ExpandLevels,
    LambdaKind, OrderByDirection, PathSegmentToken, QueryToken,
};
use odata_query::types::LiteralValue;
use odata_query::{ErrorKind, QueryError};

#[test]
fn test_filter_token_shape() {
    let token = parse_filter("Name eq 'Fido'", 100).unwrap();
    let QueryToken::BinaryOperator { op, left, right } = token else {
        panic!("expected binary operator");
    };
    assert_eq!(op, BinaryOperatorKind::Equal);
    let QueryToken::Path(path) = *left else {
        panic!("expected path");
    };
    assert_eq!(path.segments, [PathSegmentToken::Identifier("Name".into())]);
    let QueryToken::Literal(literal) = *right else {
        panic!("expected literal");
    };
    assert_eq!(literal.value, LiteralValue::String("Fido".into()));
}

#[test]
fn test_and_binds_tighter_than_or() {
    let token = parse_filter("A eq 1 or B eq 2 and C eq 3", 100).unwrap();
    let QueryToken::BinaryOperator { op, right, .. } = token else {
        panic!("expected binary operator");
    };
    assert_eq!(op, BinaryOperatorKind::Or);
    assert!(matches!(
        *right,
        QueryToken::BinaryOperator {
            op: BinaryOperatorKind::And,
            ..
        }
    ));
}

#[test]
fn test_lambda_token() {
    let token = parse_filter("Pets/any(p:p/Age eq 3)", 100).unwrap();
    let QueryToken::Lambda(lambda) = token else {
        panic!("expected lambda");
    };
    assert_eq!(lambda.kind, LambdaKind::Any);
    assert_eq!(lambda.variable.as_deref(), Some("p"));
    assert!(matches!(*lambda.parent, QueryToken::Path(_)));
}

#[test]
fn test_deep_parentheses_hit_recursion_limit() {
    let text = format!("{}Name eq 'x'{}", "(".repeat(1000), ")".repeat(1000));
    let err = parse_filter(&text, 100).unwrap_err();
    assert_eq!(err, QueryError::RecursionLimitExceeded { limit: 100 });
}

#[test]
fn test_lexical_and_syntax_errors_are_distinct() {
    assert_eq!(parse_filter("Name eq 'Fido", 100).unwrap_err().kind(), ErrorKind::Lexical);
    assert_eq!(parse_filter("Name eq", 100).unwrap_err().kind(), ErrorKind::Syntax);
    assert_eq!(parse_filter("Name eq 'a' 'b'", 100).unwrap_err().kind(), ErrorKind::Syntax);
}

#[test]
fn test_order_by_directions() {
    let items = parse_order_by("Name desc, Age asc, Id", 100).unwrap();
    let directions: Vec<_> = items.iter().map(|i| i.direction).collect();
    assert_eq!(
        directions,
        [
            OrderByDirection::Descending,
            OrderByDirection::Ascending,
            OrderByDirection::Ascending
        ]
    );
}

#[test]
fn test_expand_term_matches_standalone_filter() {
    let expand = parse_expand("Pets($filter=Age gt 2;$top=5)", 100).unwrap();
    let term = &expand.terms[0];
    assert_eq!(term.path.segments, ["Pets"]);
    assert_eq!(term.filter, Some(parse_filter("Age gt 2", 100).unwrap()));
    assert_eq!(term.top, Some(5));
    assert_eq!(term.skip, None);
}

#[test]
fn test_expand_levels_and_nesting() {
    let expand = parse_expand("BestFriend($levels=max;$expand=Pets($count=true))", 100).unwrap();
    let term = &expand.terms[0];
    assert_eq!(term.levels, Some(ExpandLevels::Max));
    let nested = &term.expand.as_ref().unwrap().terms[0];
    assert_eq!(nested.count, Some(true));
}

#[test]
fn test_expand_option_errors() {
    for text in [
        "Pets($top=x)",
        "Pets($count=maybe)",
        "Pets($top=1;$top=2)",
        "Pets($bogus=1)",
        "Pets()",
        "Pets($top=1) extra",
    ] {
        let err = parse_expand(text, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax, "{text}");
    }
}

#[test]
fn test_select_paths_and_wildcards() {
    let select = parse_select("Name, Address/City, NS.Dog/Breed, *", 100).unwrap();
    let paths: Vec<_> = select.terms.iter().map(|t| t.path.segments.join("/")).collect();
    assert_eq!(paths, ["Name", "Address/City", "NS.Dog/Breed", "*"]);
}
