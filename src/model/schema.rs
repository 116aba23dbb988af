//! Schema definitions for structured types, entity sets and operations.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};
use crate::types::{EdmType, TypeRef};

use super::EdmModel;

/// In-memory entity data model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaModel {
    /// Entity and complex types by qualified name.
    structured_types: HashMap<String, StructuredType>,
    /// Enumeration types by qualified name.
    #[serde(default)]
    enum_types: HashMap<String, EnumType>,
    /// Entity sets by name.
    #[serde(default)]
    entity_sets: HashMap<String, EntitySet>,
    /// Functions and actions, in registration order.
    #[serde(default)]
    operations: Vec<Operation>,
}

impl SchemaModel {
    /// Creates a new empty model.
    #[must_use]
    pub fn new() -> Self {
        SchemaModel::default()
    }

    fn ensure_type_name_free(&self, name: &str) -> Result<()> {
        if self.structured_types.contains_key(name) || self.enum_types.contains_key(name) {
            return Err(QueryError::Schema(format!("Type '{name}' already exists")));
        }
        Ok(())
    }

    /// Registers an entity or complex type.
    ///
    /// # Errors
    ///
    /// Returns an error if a type with the same name already exists or the
    /// base type is not registered yet.
    pub fn add_structured_type(&mut self, ty: StructuredType) -> Result<()> {
        self.ensure_type_name_free(&ty.name)?;
        if let Some(base) = &ty.base_type {
            match self.structured_types.get(base) {
                Some(base_ty) if base_ty.kind == ty.kind => {}
                Some(_) => {
                    return Err(QueryError::Schema(format!(
                        "Type '{}' cannot derive from '{base}' of a different kind",
                        ty.name
                    )));
                }
                None => {
                    return Err(QueryError::Schema(format!(
                        "Base type '{base}' of '{}' does not exist",
                        ty.name
                    )));
                }
            }
        }
        self.structured_types.insert(ty.name.clone(), ty);
        Ok(())
    }

    /// Registers an enumeration type.
    ///
    /// # Errors
    ///
    /// Returns an error if a type with the same name already exists.
    pub fn add_enum_type(&mut self, ty: EnumType) -> Result<()> {
        self.ensure_type_name_free(&ty.name)?;
        self.enum_types.insert(ty.name.clone(), ty);
        Ok(())
    }

    /// Registers an entity set.
    ///
    /// # Errors
    ///
    /// Returns an error if the set already exists or its entity type is not
    /// a registered entity type.
    pub fn add_entity_set(&mut self, set: EntitySet) -> Result<()> {
        if self.entity_sets.contains_key(&set.name) {
            return Err(QueryError::Schema(format!(
                "Entity set '{}' already exists",
                set.name
            )));
        }
        match self.structured_types.get(&set.entity_type) {
            Some(ty) if ty.kind == StructuredKind::Entity => {}
            _ => {
                return Err(QueryError::Schema(format!(
                    "Entity type '{}' of set '{}' does not exist",
                    set.entity_type, set.name
                )));
            }
        }
        self.entity_sets.insert(set.name.clone(), set);
        Ok(())
    }

    /// Registers a function or action.
    ///
    /// # Errors
    ///
    /// Returns an error if a bound operation declares no binding parameter or
    /// duplicates a parameter name.
    pub fn add_operation(&mut self, operation: Operation) -> Result<()> {
        if operation.is_bound && operation.parameters.is_empty() {
            return Err(QueryError::Schema(format!(
                "Bound operation '{}' must declare a binding parameter",
                operation.name
            )));
        }
        let mut seen = HashSet::new();
        for param in &operation.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(QueryError::Schema(format!(
                    "Duplicate parameter '{}' on operation '{}'",
                    param.name, operation.name
                )));
            }
        }
        self.operations.push(operation);
        Ok(())
    }

    /// Checks cross references that may be declared in any order: navigation
    /// targets and navigation bindings. Base type chains are checked as well,
    /// since a decoded snapshot bypasses `add_structured_type`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first dangling reference or the first type
    /// whose base chain loops back on itself.
    pub fn validate(&self) -> Result<()> {
        for ty in self.structured_types.values() {
            self.check_base_chain(ty)?;
            for nav in &ty.navigation_properties {
                if !self.structured_types.contains_key(&nav.target_type) {
                    return Err(QueryError::Schema(format!(
                        "Navigation '{}.{}' targets unknown type '{}'",
                        ty.name, nav.name, nav.target_type
                    )));
                }
            }
        }
        for set in self.entity_sets.values() {
            for (path, target) in &set.navigation_bindings {
                if !self.entity_sets.contains_key(target) {
                    return Err(QueryError::Schema(format!(
                        "Binding '{path}' of set '{}' targets unknown set '{target}'",
                        set.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_base_chain(&self, ty: &StructuredType) -> Result<()> {
        let mut seen = HashSet::from([ty.name.as_str()]);
        let mut current = ty;
        while let Some(base) = current.base_type.as_deref() {
            let Some(base_ty) = self.structured_types.get(base) else {
                return Err(QueryError::Schema(format!(
                    "Base type '{base}' of '{}' does not exist",
                    current.name
                )));
            };
            if base_ty.kind != current.kind {
                return Err(QueryError::Schema(format!(
                    "Type '{}' cannot derive from '{base}' of a different kind",
                    current.name
                )));
            }
            if !seen.insert(base) {
                return Err(QueryError::Schema(format!(
                    "Type '{}' inherits from itself through '{base}'",
                    ty.name
                )));
            }
            current = base_ty;
        }
        Ok(())
    }

    /// Returns all entity set names.
    #[must_use]
    pub fn entity_set_names(&self) -> Vec<&str> {
        self.entity_sets.keys().map(String::as_str).collect()
    }

    /// Serializes the model to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| QueryError::Schema(format!("Failed to serialize model: {e}")))
    }

    /// Deserializes a model from bytes and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the decoded model does
    /// not pass [`SchemaModel::validate`].
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let model: SchemaModel = bincode::deserialize(data)
            .map_err(|e| QueryError::Schema(format!("Failed to deserialize model: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    fn binding_matches(&self, parameter: &TypeRef, binding: &TypeRef) -> bool {
        match (&parameter.definition, &binding.definition) {
            (EdmType::Collection(p), EdmType::Collection(b)) => self.binding_matches(p, b),
            (EdmType::Entity(p), EdmType::Entity(b)) | (EdmType::Complex(p), EdmType::Complex(b)) => {
                self.is_or_inherits_from(b, p)
            }
            (p, b) => p == b,
        }
    }
}

impl EdmModel for SchemaModel {
    fn find_structured_type(&self, qualified_name: &str) -> Option<&StructuredType> {
        self.structured_types.get(qualified_name)
    }

    fn find_enum_type(&self, qualified_name: &str) -> Option<&EnumType> {
        self.enum_types.get(qualified_name)
    }

    fn find_entity_set(&self, name: &str) -> Option<&EntitySet> {
        self.entity_sets.get(name)
    }

    fn find_bound_operations(&self, binding_type: &TypeRef, name: &str) -> Vec<&Operation> {
        self.operations
            .iter()
            .filter(|op| op.is_bound && op.name == name)
            .filter(|op| {
                op.parameters
                    .first()
                    .is_some_and(|p| self.binding_matches(&p.type_ref, binding_type))
            })
            .collect()
    }
}

/// Whether a structured type has identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuredKind {
    Entity,
    Complex,
}

/// Schema definition for an entity or complex type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredType {
    /// Qualified name (`Namespace.Name`).
    pub name: String,
    pub kind: StructuredKind,
    /// Qualified name of the base type.
    pub base_type: Option<String>,
    /// Open types accept undeclared dynamic properties.
    pub is_open: bool,
    pub properties: Vec<StructuralProperty>,
    pub navigation_properties: Vec<NavigationProperty>,
}

impl StructuredType {
    /// Creates an entity type with no properties.
    #[must_use]
    pub fn entity(name: impl Into<String>) -> Self {
        StructuredType {
            name: name.into(),
            kind: StructuredKind::Entity,
            base_type: None,
            is_open: false,
            properties: Vec::new(),
            navigation_properties: Vec::new(),
        }
    }

    /// Creates a complex type with no properties.
    #[must_use]
    pub fn complex(name: impl Into<String>) -> Self {
        StructuredType {
            kind: StructuredKind::Complex,
            ..StructuredType::entity(name)
        }
    }

    /// Sets the base type.
    #[must_use]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    /// Marks the type as open.
    #[must_use]
    pub fn open(mut self) -> Self {
        self.is_open = true;
        self
    }

    /// Adds a structural property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, type_ref: TypeRef) -> Self {
        self.properties.push(StructuralProperty {
            name: name.into(),
            type_ref,
        });
        self
    }

    /// Adds a navigation property.
    #[must_use]
    pub fn with_navigation(mut self, navigation: NavigationProperty) -> Self {
        self.navigation_properties.push(navigation);
        self
    }

    /// Returns a type reference to this type.
    #[must_use]
    pub fn type_ref(&self, nullable: bool) -> TypeRef {
        match self.kind {
            StructuredKind::Entity => TypeRef::entity(self.name.clone(), nullable),
            StructuredKind::Complex => TypeRef::complex(self.name.clone(), nullable),
        }
    }

    /// Finds a declared (non-inherited) property by name.
    #[must_use]
    pub fn declared_property(&self, name: &str) -> Option<PropertyRef<'_>> {
        if let Some(p) = self.properties.iter().find(|p| p.name == name) {
            return Some(PropertyRef::Structural(p));
        }
        self.navigation_properties
            .iter()
            .find(|n| n.name == name)
            .map(PropertyRef::Navigation)
    }
}

/// Primitive, complex or enum valued property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralProperty {
    pub name: String,
    pub type_ref: TypeRef,
}

/// Property that navigates to another entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationProperty {
    pub name: String,
    /// Qualified name of the target entity type.
    pub target_type: String,
    pub is_collection: bool,
    pub nullable: bool,
}

impl NavigationProperty {
    /// Creates a single-valued navigation.
    #[must_use]
    pub fn single(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        NavigationProperty {
            name: name.into(),
            target_type: target_type.into(),
            is_collection: false,
            nullable: true,
        }
    }

    /// Creates a collection-valued navigation.
    #[must_use]
    pub fn collection(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        NavigationProperty {
            name: name.into(),
            target_type: target_type.into(),
            is_collection: true,
            nullable: false,
        }
    }

    /// Returns the navigation's type: the entity or a collection of it.
    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        let entity = TypeRef::entity(self.target_type.clone(), self.nullable);
        if self.is_collection {
            TypeRef::collection(entity.with_nullable(false))
        } else {
            entity
        }
    }
}

/// Property found on a structured type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRef<'a> {
    Structural(&'a StructuralProperty),
    Navigation(&'a NavigationProperty),
}

impl PropertyRef<'_> {
    /// Returns the property name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            PropertyRef::Structural(p) => &p.name,
            PropertyRef::Navigation(n) => &n.name,
        }
    }

    /// Returns the property type.
    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        match self {
            PropertyRef::Structural(p) => p.type_ref.clone(),
            PropertyRef::Navigation(n) => n.type_ref(),
        }
    }
}

/// Enumeration type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub members: Vec<(String, i64)>,
    pub is_flags: bool,
}

impl EnumType {
    /// Creates an enumeration with members numbered from zero.
    #[must_use]
    pub fn new(name: impl Into<String>, members: &[&str]) -> Self {
        EnumType {
            name: name.into(),
            members: members
                .iter()
                .zip(0_i64..)
                .map(|(m, v)| ((*m).to_string(), v))
                .collect(),
            is_flags: false,
        }
    }

    /// Returns true if `member` names a member, or a comma separated member
    /// list for flags enums. Integer values are accepted as well.
    #[must_use]
    pub fn has_member(&self, member: &str) -> bool {
        let known = |m: &str| {
            let m = m.trim();
            self.members.iter().any(|(name, _)| name == m) || m.parse::<i64>().is_ok()
        };
        if self.is_flags {
            member.split(',').all(known)
        } else {
            known(member)
        }
    }
}

/// Entity set: an addressable collection of entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub name: String,
    /// Qualified name of the element entity type.
    pub entity_type: String,
    /// Navigation property path -> target entity set name.
    #[serde(default)]
    pub navigation_bindings: HashMap<String, String>,
}

impl EntitySet {
    /// Creates an entity set with no navigation bindings.
    #[must_use]
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        EntitySet {
            name: name.into(),
            entity_type: entity_type.into(),
            navigation_bindings: HashMap::new(),
        }
    }

    /// Binds a navigation property path to a target set.
    #[must_use]
    pub fn with_binding(mut self, path: impl Into<String>, target: impl Into<String>) -> Self {
        self.navigation_bindings.insert(path.into(), target.into());
        self
    }
}

/// Function (side-effect free) or action (side-effecting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Function,
    Action,
}

/// Operation parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParameter {
    pub name: String,
    pub type_ref: TypeRef,
}

/// Function or action declared by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Qualified name (`Namespace.Name`).
    pub name: String,
    pub kind: OperationKind,
    /// Bound operations take the binding instance as their first parameter.
    pub is_bound: bool,
    pub parameters: Vec<OperationParameter>,
    pub return_type: Option<TypeRef>,
}

impl Operation {
    /// Creates a bound function.
    #[must_use]
    pub fn bound_function(name: impl Into<String>, binding: TypeRef, return_type: TypeRef) -> Self {
        Operation {
            name: name.into(),
            kind: OperationKind::Function,
            is_bound: true,
            parameters: vec![OperationParameter {
                name: "bindingParameter".to_string(),
                type_ref: binding,
            }],
            return_type: Some(return_type),
        }
    }

    /// Creates a bound action.
    #[must_use]
    pub fn bound_action(name: impl Into<String>, binding: TypeRef) -> Self {
        Operation {
            kind: OperationKind::Action,
            return_type: None,
            ..Operation::bound_function(name, binding, TypeRef::boolean())
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, type_ref: TypeRef) -> Self {
        self.parameters.push(OperationParameter {
            name: name.into(),
            type_ref,
        });
        self
    }

    /// Returns true for side-effecting operations.
    #[must_use]
    pub fn is_action(&self) -> bool {
        self.kind == OperationKind::Action
    }

    /// Parameters a caller supplies, excluding the binding parameter.
    #[must_use]
    pub fn non_binding_parameters(&self) -> &[OperationParameter] {
        if self.is_bound && !self.parameters.is_empty() {
            &self.parameters[1..]
        } else {
            &self.parameters
        }
    }
}
