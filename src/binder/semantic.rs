//! Semantic analysis: resolves syntax tokens against the model.

use tracing::{debug, trace};

use crate::error::{QueryError, Result};
use crate::model::{EdmModel, PropertyRef};
use crate::parser::{
    ensure_stack, FunctionCallToken, LiteralToken, PathSegmentToken, PathToken, QueryToken,
    RecursionBudget,
};
use crate::types::{EdmType, LiteralValue, PrimitiveKind, TypeRef};

use super::builtin::{self, TYPE_FUNCTIONS};
use super::expression::{FunctionCallNode, QueryNode};
use super::factory::range_variable_reference;
use super::function::resolve_operation;
use super::lambda::bind_lambda;
use super::operator::{bind_binary, bind_unary, convert, enum_constant};
use super::scope::{BindingState, IMPLICIT_RANGE_VARIABLE};

/// Converts syntax tokens into typed nodes.
///
/// The binder holds no state of its own; range variables and the recursion
/// budget live in the [`BindingState`] passed to each call.
#[derive(Debug, Clone, Copy)]
pub struct MetadataBinder<'a> {
    model: &'a dyn EdmModel,
}

impl<'a> MetadataBinder<'a> {
    /// Creates a binder over `model`.
    #[must_use]
    pub fn new(model: &'a dyn EdmModel) -> Self {
        MetadataBinder { model }
    }

    /// Returns the model.
    #[must_use]
    pub fn model(&self) -> &'a dyn EdmModel {
        self.model
    }

    /// Binds `token`, starting from the state's recursion budget.
    ///
    /// # Errors
    ///
    /// Returns the first resolution or typing error; `state` is left with the
    /// same range variables in scope as before the call.
    pub fn bind(&self, token: &QueryToken, state: &mut BindingState) -> Result<QueryNode> {
        let budget = state.budget();
        self.bind_token(token, state, budget)
    }

    pub(crate) fn bind_token(
        &self,
        token: &QueryToken,
        state: &mut BindingState,
        budget: RecursionBudget,
    ) -> Result<QueryNode> {
        let budget = budget.descend()?;
        ensure_stack(|| match token {
            QueryToken::Literal(literal) => self.bind_literal(literal),
            QueryToken::BinaryOperator { op, left, right } => {
                let left = self.bind_token(left, state, budget)?;
                let right = self.bind_token(right, state, budget)?;
                bind_binary(self.model, *op, left, right)
            }
            QueryToken::UnaryOperator { op, operand } => {
                let operand = self.bind_token(operand, state, budget)?;
                bind_unary(*op, operand)
            }
            QueryToken::Path(path) => self.bind_path(path, state, budget),
            QueryToken::FunctionCall(call) => self.bind_call(call, state, budget),
            QueryToken::Lambda(lambda) => bind_lambda(self, lambda, state, budget),
        })
    }

    fn bind_literal(&self, literal: &LiteralToken) -> Result<QueryNode> {
        if let LiteralValue::Enum { type_name, member } = &literal.value {
            return enum_constant(self.model, type_name, member, &literal.text);
        }
        Ok(QueryNode::Constant {
            type_ref: literal
                .value
                .primitive_kind()
                .map(|kind| TypeRef::primitive(kind, false)),
            value: literal.value.clone(),
            text: literal.text.clone(),
        })
    }

    // ==================== Paths ====================

    fn bind_path(
        &self,
        path: &PathToken,
        state: &mut BindingState,
        budget: RecursionBudget,
    ) -> Result<QueryNode> {
        let mut segments = path.segments.iter();
        let mut current = match &path.source {
            Some(source) => self.bind_token(source, state, budget)?,
            None => {
                let first = segments
                    .next()
                    .ok_or_else(|| QueryError::InvalidPathSegment(String::new()))?;
                self.bind_first_segment(first, state)?
            }
        };
        // Every further segment nests the result one node deeper.
        let mut budget = budget;
        for segment in segments {
            budget = budget.descend()?;
            current = self.bind_segment(current, segment)?;
        }
        Ok(current)
    }

    fn bind_first_segment(
        &self,
        segment: &PathSegmentToken,
        state: &BindingState,
    ) -> Result<QueryNode> {
        if let PathSegmentToken::Identifier(name) = segment {
            if let Some(variable) = state.lookup(name) {
                return Ok(range_variable_reference(variable));
            }
        }
        let it = implicit_reference(state).ok_or_else(|| QueryError::UnknownIdentifier {
            name: segment.name().to_string(),
            type_name: String::new(),
        })?;
        self.bind_segment(it, segment)
    }

    fn bind_segment(&self, parent: QueryNode, segment: &PathSegmentToken) -> Result<QueryNode> {
        match segment {
            PathSegmentToken::Identifier(name) => self.bind_property(parent, name),
            PathSegmentToken::TypeCast(name) => self.bind_cast(parent, name),
        }
    }

    fn bind_property(&self, parent: QueryNode, name: &str) -> Result<QueryNode> {
        let Some(parent_type) = parent.type_reference().cloned() else {
            return Ok(QueryNode::OpenProperty {
                source: Box::new(parent),
                name: name.to_string(),
            });
        };
        if parent_type.is_collection() {
            return Err(QueryError::type_mismatch(
                "single value",
                parent_type.full_name(),
            ));
        }
        let Some(type_name) = parent_type.structured_name() else {
            return Err(QueryError::type_mismatch(
                "structured type",
                parent_type.full_name(),
            ));
        };

        match self.model.find_property(type_name, name) {
            Some(PropertyRef::Structural(property)) => {
                let type_ref = property.type_ref.clone();
                let source = Box::new(parent);
                let property = name.to_string();
                Ok(if type_ref.is_collection() {
                    QueryNode::CollectionProperty {
                        source,
                        property,
                        type_ref,
                    }
                } else {
                    QueryNode::SingleValueProperty {
                        source,
                        property,
                        type_ref,
                    }
                })
            }
            Some(PropertyRef::Navigation(navigation)) => {
                let navigation_source = parent
                    .navigation_source()
                    .and_then(|set| self.model.navigation_target(set, name))
                    .map(|set| set.name.clone());
                let type_ref = navigation.type_ref();
                let source = Box::new(parent);
                let navigation = name.to_string();
                Ok(if type_ref.is_collection() {
                    QueryNode::CollectionNavigation {
                        source,
                        navigation,
                        navigation_source,
                        type_ref,
                    }
                } else {
                    QueryNode::SingleNavigation {
                        source,
                        navigation,
                        navigation_source,
                        type_ref,
                    }
                })
            }
            None if self.model.is_open_type(type_name) => Ok(QueryNode::OpenProperty {
                source: Box::new(parent),
                name: name.to_string(),
            }),
            None => Err(QueryError::UnknownIdentifier {
                name: name.to_string(),
                type_name: type_name.to_string(),
            }),
        }
    }

    fn bind_cast(&self, parent: QueryNode, type_name: &str) -> Result<QueryNode> {
        let Some(target) = self.model.find_structured_type(type_name) else {
            return Err(match self.model.resolve_type(type_name) {
                Some(t) => QueryError::type_mismatch("structured type", t.full_name()),
                None => QueryError::UnknownType(type_name.to_string()),
            });
        };
        let navigation_source = parent.navigation_source().map(str::to_string);

        let Some(parent_type) = parent.type_reference().cloned() else {
            return Ok(QueryNode::SingleEntityCast {
                source: Box::new(parent),
                type_ref: target.type_ref(true),
                navigation_source,
            });
        };
        let (is_collection, current) = match parent_type.item_type() {
            Some(item) => (true, item.clone()),
            None => (false, parent_type.clone()),
        };
        let Some(current_name) = current.structured_name() else {
            return Err(QueryError::type_mismatch(
                "structured type",
                parent_type.full_name(),
            ));
        };
        if !self.model.is_or_inherits_from(&target.name, current_name) {
            return Err(QueryError::InvalidCast {
                from: current_name.to_string(),
                to: target.name.clone(),
            });
        }
        trace!(from = current_name, to = %target.name, "path cast");

        let source = Box::new(parent);
        Ok(if is_collection {
            QueryNode::EntityCollectionCast {
                source,
                type_ref: TypeRef::collection(target.type_ref(false)),
                navigation_source,
            }
        } else {
            QueryNode::SingleEntityCast {
                source,
                type_ref: target.type_ref(current.nullable),
                navigation_source,
            }
        })
    }

    // ==================== Function calls ====================

    fn bind_call(
        &self,
        call: &FunctionCallToken,
        state: &mut BindingState,
        budget: RecursionBudget,
    ) -> Result<QueryNode> {
        if call.source.is_none() {
            if TYPE_FUNCTIONS.contains(&call.name.as_str()) {
                return self.bind_type_function(call, state, budget);
            }
            if let Some(signatures) = builtin::signatures(&call.name) {
                let mut arguments = Vec::with_capacity(call.arguments.len());
                for argument in &call.arguments {
                    if let Some(name) = &argument.name {
                        return Err(QueryError::type_mismatch(
                            "positional argument",
                            format!("named argument '{name}'"),
                        ));
                    }
                    arguments.push(self.bind_token(&argument.value, state, budget)?);
                }
                let (arguments, type_ref) =
                    builtin::bind_builtin_arguments(&call.name, signatures, arguments)?;
                trace!(function = %call.name, "bound built-in call");
                return Ok(QueryNode::SingleValueFunctionCall(FunctionCallNode {
                    name: call.name.clone(),
                    source: None,
                    arguments,
                    type_ref,
                    navigation_source: None,
                }));
            }
        }
        if !call.name.contains('.') {
            return Err(QueryError::UnknownFunction(call.name.clone()));
        }
        self.bind_operation_call(call, state, budget)
    }

    fn bind_operation_call(
        &self,
        call: &FunctionCallToken,
        state: &mut BindingState,
        budget: RecursionBudget,
    ) -> Result<QueryNode> {
        let binding = match &call.source {
            Some(source) => self.bind_token(source, state, budget)?,
            None => implicit_reference(state)
                .ok_or_else(|| QueryError::UnknownFunction(call.name.clone()))?,
        };
        let Some(binding_type) = binding.type_reference().cloned() else {
            return Err(QueryError::UnknownFunction(call.name.clone()));
        };
        let candidates = self.model.find_bound_operations(&binding_type, &call.name);
        if candidates.is_empty() {
            return Err(QueryError::UnknownFunction(call.name.clone()));
        }

        let mut supplied = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            let Some(name) = argument.name.as_deref() else {
                return Err(QueryError::type_mismatch(
                    format!("named parameters for '{}'", call.name),
                    "positional argument",
                ));
            };
            supplied.push(name);
        }
        let operation = resolve_operation(&candidates, &supplied, &call.name)?.ok_or_else(|| {
            QueryError::UnknownFunction(format!("{}({})", call.name, supplied.join(",")))
        })?;
        let Some(return_type) = operation.return_type.clone() else {
            return Err(QueryError::type_mismatch(
                "function",
                format!("action '{}'", call.name),
            ));
        };

        let mut arguments = Vec::with_capacity(call.arguments.len());
        for (argument, name) in call.arguments.iter().zip(&supplied) {
            let parameter = operation
                .non_binding_parameters()
                .iter()
                .find(|p| p.name == *name)
                .ok_or_else(|| QueryError::UnknownFunction(call.name.clone()))?;
            let value = self.bind_token(&argument.value, state, budget)?;
            arguments.push(self.coerce_argument(value, &parameter.type_ref)?);
        }
        debug!(operation = %call.name, parameters = supplied.len(), "bound operation call");

        let navigation_source = binding
            .navigation_source()
            .filter(|_| return_type.is_entity())
            .map(str::to_string);
        let is_entity_collection = return_type.item_type().is_some_and(TypeRef::is_entity);
        let node = FunctionCallNode {
            name: call.name.clone(),
            source: Some(Box::new(binding)),
            arguments,
            type_ref: return_type,
            navigation_source,
        };
        Ok(if node.type_ref.is_entity() {
            QueryNode::SingleEntityFunctionCall(node)
        } else if is_entity_collection {
            QueryNode::EntityCollectionFunctionCall(node)
        } else if node.type_ref.is_collection() {
            QueryNode::CollectionFunctionCall(node)
        } else {
            QueryNode::SingleValueFunctionCall(node)
        })
    }

    fn coerce_argument(&self, value: QueryNode, parameter: &TypeRef) -> Result<QueryNode> {
        let Some(actual) = value.type_reference() else {
            return Ok(convert(value, parameter));
        };
        match (actual.as_primitive(), &parameter.definition) {
            (Some(a), EdmType::Primitive(p)) if a == *p => Ok(value),
            (Some(a), EdmType::Primitive(p)) if a.promotes_to(*p) => Ok(convert(value, parameter)),
            (Some(PrimitiveKind::String), EdmType::Enum(enum_name)) => match &value {
                QueryNode::Constant {
                    value: LiteralValue::String(member),
                    text,
                    ..
                } => enum_constant(self.model, enum_name, member, text),
                _ => Err(QueryError::type_mismatch(parameter.full_name(), actual.full_name())),
            },
            _ if actual.definition == parameter.definition => Ok(value),
            (None, EdmType::Entity(p) | EdmType::Complex(p))
                if actual
                    .structured_name()
                    .is_some_and(|a| self.model.is_or_inherits_from(a, p)) =>
            {
                Ok(value)
            }
            _ => Err(QueryError::type_mismatch(parameter.full_name(), actual.full_name())),
        }
    }

    /// `isof` and `cast`, whose last argument names a type.
    fn bind_type_function(
        &self,
        call: &FunctionCallToken,
        state: &mut BindingState,
        budget: RecursionBudget,
    ) -> Result<QueryNode> {
        let (value_argument, type_argument) = match call.arguments.as_slice() {
            [type_argument] => (None, type_argument),
            [value, type_argument] => (Some(value), type_argument),
            other => {
                return Err(QueryError::type_mismatch(
                    format!("1 or 2 arguments for '{}'", call.name),
                    format!("{} arguments", other.len()),
                ))
            }
        };
        let type_name = type_name_argument(&type_argument.value).ok_or_else(|| {
            QueryError::type_mismatch("type name", format!("{:?}", type_argument.value))
        })?;
        let target = self
            .model
            .resolve_type(type_name)
            .ok_or_else(|| QueryError::UnknownType(type_name.to_string()))?;

        let value = match value_argument {
            Some(argument) => self.bind_token(&argument.value, state, budget)?,
            None => implicit_reference(state).ok_or_else(|| QueryError::UnknownIdentifier {
                name: IMPLICIT_RANGE_VARIABLE.to_string(),
                type_name: String::new(),
            })?,
        };
        if value.is_collection() {
            return Err(QueryError::type_mismatch("single value", value.type_name()));
        }

        let is_cast = call.name == "cast";
        if is_cast {
            self.check_cast(&value, &target)?;
        }
        let navigation_source = value
            .navigation_source()
            .filter(|_| is_cast && target.is_entity())
            .map(str::to_string);
        let type_constant = QueryNode::Constant {
            value: LiteralValue::String(type_name.to_string()),
            text: format!("'{type_name}'"),
            type_ref: Some(TypeRef::primitive(PrimitiveKind::String, false)),
        };
        let node = FunctionCallNode {
            name: call.name.clone(),
            source: None,
            arguments: vec![value, type_constant],
            type_ref: if is_cast { target } else { TypeRef::boolean() },
            navigation_source,
        };
        trace!(function = %call.name, target = type_name, "bound type function");
        Ok(if node.type_ref.is_entity() {
            QueryNode::SingleEntityFunctionCall(node)
        } else {
            QueryNode::SingleValueFunctionCall(node)
        })
    }

    fn check_cast(&self, value: &QueryNode, target: &TypeRef) -> Result<()> {
        let Some(source) = value.type_reference() else {
            return Ok(());
        };
        let related = match (source.structured_name(), target.structured_name()) {
            (Some(from), Some(to)) => {
                self.model.is_or_inherits_from(to, from) || self.model.is_or_inherits_from(from, to)
            }
            (None, None) => true,
            _ => false,
        };
        if related {
            Ok(())
        } else {
            Err(QueryError::InvalidCast {
                from: source.full_name(),
                to: target.full_name(),
            })
        }
    }
}

fn implicit_reference(state: &BindingState) -> Option<QueryNode> {
    state.implicit_range_variable().map(range_variable_reference)
}

/// Type name written as a bare qualified name or as a string literal.
fn type_name_argument(token: &QueryToken) -> Option<&str> {
    match token {
        QueryToken::Path(PathToken {
            source: None,
            segments,
        }) => match segments.as_slice() {
            [PathSegmentToken::TypeCast(name)] => Some(name),
            _ => None,
        },
        QueryToken::Literal(LiteralToken {
            value: LiteralValue::String(name),
            ..
        }) => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::factory::implicit_range_variable;
    use crate::error::ErrorKind;
    use crate::model::{
        EntitySet, EnumType, NavigationProperty, Operation, SchemaModel, StructuredType,
    };
    use crate::parser::{parse_filter, BinaryOperatorKind};

    fn string() -> TypeRef {
        TypeRef::primitive(PrimitiveKind::String, true)
    }

    fn int32() -> TypeRef {
        TypeRef::primitive(PrimitiveKind::Int32, false)
    }

    fn model() -> SchemaModel {
        let mut model = SchemaModel::new();
        model
            .add_enum_type(EnumType::new("NS.Color", &["Red", "Green", "Blue"]))
            .unwrap();
        model
            .add_structured_type(
                StructuredType::complex("NS.Address")
                    .with_property("City", string())
                    .with_property("Zip", string()),
            )
            .unwrap();
        model
            .add_structured_type(
                StructuredType::entity("NS.Pet")
                    .with_property("Name", string())
                    .with_property("Age", int32()),
            )
            .unwrap();
        model
            .add_structured_type(
                StructuredType::entity("NS.Dog")
                    .with_base("NS.Pet")
                    .with_property("Breed", string()),
            )
            .unwrap();
        model
            .add_structured_type(StructuredType::entity("NS.Toy").with_property("Name", string()))
            .unwrap();
        model
            .add_structured_type(
                StructuredType::entity("NS.Person")
                    .open()
                    .with_property("Name", string())
                    .with_property("Age", int32())
                    .with_property("Color", TypeRef::enumeration("NS.Color", true))
                    .with_property("Address", TypeRef::complex("NS.Address", true))
                    .with_navigation(NavigationProperty::collection("Pets", "NS.Pet"))
                    .with_navigation(NavigationProperty::single("BestFriend", "NS.Person")),
            )
            .unwrap();
        model.add_entity_set(EntitySet::new("Pets", "NS.Pet")).unwrap();
        model
            .add_entity_set(
                EntitySet::new("People", "NS.Person")
                    .with_binding("Pets", "Pets")
                    .with_binding("BestFriend", "People"),
            )
            .unwrap();
        model
            .add_operation(
                Operation::bound_function(
                    "NS.IsNear",
                    TypeRef::entity("NS.Person", false),
                    TypeRef::boolean(),
                )
                .with_parameter("radius", TypeRef::primitive(PrimitiveKind::Double, false)),
            )
            .unwrap();
        model
            .add_operation(Operation::bound_function(
                "NS.Oldest",
                TypeRef::collection(TypeRef::entity("NS.Pet", false)),
                TypeRef::entity("NS.Pet", true),
            ))
            .unwrap();
        model
            .add_operation(Operation::bound_action(
                "NS.Feed",
                TypeRef::entity("NS.Person", false),
            ))
            .unwrap();
        model
    }

    fn bind(text: &str) -> Result<QueryNode> {
        let model = model();
        let it = implicit_range_variable(
            Some(&TypeRef::entity("NS.Person", false)),
            model.find_entity_set("People"),
        );
        let mut state = BindingState::with_implicit(it, 100);
        let token = parse_filter(text, 100)?;
        MetadataBinder::new(&model).bind(&token, &mut state)
    }

    #[test]
    fn test_property_comparison() {
        let node = bind("Name eq 'Fido'").unwrap();
        let QueryNode::BinaryOperator {
            op, left, right, ..
        } = node
        else {
            panic!("expected binary operator");
        };
        assert_eq!(op, BinaryOperatorKind::Equal);
        assert!(matches!(
            *left,
            QueryNode::SingleValueProperty { ref property, .. } if property == "Name"
        ));
        assert!(matches!(*right, QueryNode::Constant { .. }));
    }

    #[test]
    fn test_navigation_tracks_entity_set() {
        let node = bind("BestFriend/BestFriend/Name eq 'x'").unwrap();
        let QueryNode::BinaryOperator { left, .. } = node else {
            panic!("expected binary operator");
        };
        let QueryNode::SingleValueProperty { source, .. } = *left else {
            panic!("expected property");
        };
        assert_eq!(source.navigation_source(), Some("People"));
    }

    #[test]
    fn test_complex_property_path() {
        let node = bind("Address/City eq 'Oslo'").unwrap();
        assert_eq!(node.type_reference(), Some(&TypeRef::boolean()));
    }

    #[test]
    fn test_unknown_property_on_closed_type() {
        let err = bind("Address/Planet eq 'Mars'").unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownIdentifier {
                name: "Planet".into(),
                type_name: "NS.Address".into()
            }
        );
    }

    #[test]
    fn test_open_property_chain() {
        let node = bind("Extra/Deeper eq 1").unwrap();
        let QueryNode::BinaryOperator { left, .. } = node else {
            panic!("expected binary operator");
        };
        let QueryNode::OpenProperty { source, name } = *left else {
            panic!("expected open property");
        };
        assert_eq!(name, "Deeper");
        assert!(matches!(*source, QueryNode::OpenProperty { .. }));
    }

    #[test]
    fn test_explicit_it() {
        let node = bind("$it/Age gt 3").unwrap();
        assert_eq!(node.type_reference(), Some(&TypeRef::boolean()));
    }

    #[test]
    fn test_enum_literal() {
        assert!(bind("Color eq NS.Color'Red'").is_ok());
        assert!(bind("Color has NS.Color'Red'").is_ok());
        assert_eq!(
            bind("Color eq NS.Shade'Red'").unwrap_err().kind(),
            ErrorKind::UnknownType
        );
    }

    #[test]
    fn test_collection_cast() {
        let node = bind("Pets/NS.Dog/any(d:d/Breed eq 'Lab')").unwrap();
        let QueryNode::Any(lambda) = node else {
            panic!("expected Any");
        };
        assert!(matches!(*lambda.source, QueryNode::EntityCollectionCast { .. }));
        assert_eq!(
            lambda.current_range_variable.unwrap().type_ref,
            Some(TypeRef::entity("NS.Dog", false))
        );
    }

    #[test]
    fn test_unrelated_cast() {
        let err = bind("Pets/NS.Toy/any(t:true)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCast);
        let err = bind("Pets/NS.Nope/any(t:true)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownType);
    }

    #[test]
    fn test_builtin_functions() {
        let node = bind("startswith(Name, 'F')").unwrap();
        assert_eq!(node.type_reference().and_then(TypeRef::as_primitive), Some(PrimitiveKind::Boolean));
        assert!(bind("length(Name) gt 3").is_ok());
        assert!(bind("year(now()) eq 2024").is_ok());
        assert_eq!(bind("frobnicate(Name)").unwrap_err().kind(), ErrorKind::UnknownFunction);
        assert_eq!(bind("length(Age) gt 1").unwrap_err().kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_type_functions() {
        assert!(bind("isof(NS.Person)").is_ok());
        assert!(bind("isof(Name, 'Edm.String')").is_ok());
        let node = bind("cast(BestFriend, NS.Person)/Name eq 'x'");
        assert!(node.is_ok(), "{node:?}");
        assert_eq!(bind("isof(NS.Ghost)").unwrap_err().kind(), ErrorKind::UnknownType);
        assert_eq!(
            bind("cast(BestFriend, NS.Pet)/Name eq 'x'").unwrap_err().kind(),
            ErrorKind::InvalidCast
        );
    }

    #[test]
    fn test_bound_function_call() {
        let node = bind("NS.IsNear(radius=5)").unwrap();
        let QueryNode::SingleValueFunctionCall(call) = node else {
            panic!("expected function call");
        };
        assert!(matches!(call.arguments[0], QueryNode::Convert { .. }));
        assert!(call.source.is_some());

        let node = bind("Pets/NS.Oldest()/Name eq 'Rex'").unwrap();
        assert_eq!(node.type_reference(), Some(&TypeRef::boolean()));
    }

    #[test]
    fn test_operation_errors() {
        assert_eq!(bind("NS.IsNear(5)").unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(bind("NS.IsNear(distance=5)").unwrap_err().kind(), ErrorKind::UnknownFunction);
        assert_eq!(bind("NS.Missing()").unwrap_err().kind(), ErrorKind::UnknownFunction);
        assert_eq!(bind("NS.Feed()").unwrap_err().kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_unknown_identifier_without_implicit_variable() {
        let model = model();
        let mut state = BindingState::new(100);
        let token = parse_filter("Name eq 'x'", 100).unwrap();
        let err = MetadataBinder::new(&model).bind(&token, &mut state).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
    }

    #[test]
    fn test_bind_recursion_budget() {
        let model = model();
        let it = implicit_range_variable(Some(&TypeRef::entity("NS.Person", false)), None);
        let mut state = BindingState::with_implicit(it, 3);
        let token = parse_filter("Age add 1 add 2 add 3 gt 0", 100).unwrap();
        let err = MetadataBinder::new(&model).bind(&token, &mut state).unwrap_err();
        assert_eq!(err, QueryError::RecursionLimitExceeded { limit: 3 });
    }

    #[test]
    fn test_path_segments_spend_budget() {
        let model = model();
        let token = parse_filter("BestFriend/BestFriend/Name eq 'x'", 100).unwrap();
        let person = || implicit_range_variable(Some(&TypeRef::entity("NS.Person", false)), None);

        let mut state = BindingState::with_implicit(person(), 4);
        assert!(MetadataBinder::new(&model).bind(&token, &mut state).is_ok());

        let mut state = BindingState::with_implicit(person(), 3);
        let err = MetadataBinder::new(&model).bind(&token, &mut state).unwrap_err();
        assert_eq!(err, QueryError::RecursionLimitExceeded { limit: 3 });
    }
}
