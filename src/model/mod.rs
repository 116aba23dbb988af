//! Entity data model consumed by the binder.
//!
//! The binder only reads the model through [`EdmModel`]; [`SchemaModel`] is
//! the in-memory implementation used by hosts that build their schema in code.

mod schema;

pub use schema::{
    EntitySet, EnumType, NavigationProperty, Operation, OperationKind, OperationParameter,
    PropertyRef, SchemaModel, StructuralProperty, StructuredKind, StructuredType,
};

use std::fmt;

use crate::types::{PrimitiveKind, TypeRef};

/// Read-only lookups the binder performs against an entity data model.
///
/// Implementations must be immutable once shared: the same model may serve
/// any number of concurrent parse/bind calls. The default methods walk base
/// type chains, which must therefore be acyclic.
pub trait EdmModel: fmt::Debug {
    /// Looks up an entity or complex type by qualified name.
    fn find_structured_type(&self, qualified_name: &str) -> Option<&StructuredType>;

    /// Looks up an enumeration type by qualified name.
    fn find_enum_type(&self, qualified_name: &str) -> Option<&EnumType>;

    /// Looks up an entity set by name.
    fn find_entity_set(&self, name: &str) -> Option<&EntitySet>;

    /// Returns the bound operations named `name` whose binding parameter
    /// accepts `binding_type`.
    fn find_bound_operations(&self, binding_type: &TypeRef, name: &str) -> Vec<&Operation>;

    /// Finds a property on a structured type, including inherited ones.
    fn find_property(&self, type_name: &str, name: &str) -> Option<PropertyRef<'_>> {
        let mut current = self.find_structured_type(type_name);
        while let Some(ty) = current {
            if let Some(prop) = ty.declared_property(name) {
                return Some(prop);
            }
            current = ty
                .base_type
                .as_deref()
                .and_then(|base| self.find_structured_type(base));
        }
        None
    }

    /// Returns true if the type, or any of its base types, is open.
    fn is_open_type(&self, type_name: &str) -> bool {
        let mut current = self.find_structured_type(type_name);
        while let Some(ty) = current {
            if ty.is_open {
                return true;
            }
            current = ty
                .base_type
                .as_deref()
                .and_then(|base| self.find_structured_type(base));
        }
        false
    }

    /// Returns true if `derived` is `base` or inherits from it.
    fn is_or_inherits_from(&self, derived: &str, base: &str) -> bool {
        let mut current = self.find_structured_type(derived);
        while let Some(ty) = current {
            if ty.name == base {
                return true;
            }
            current = ty
                .base_type
                .as_deref()
                .and_then(|b| self.find_structured_type(b));
        }
        false
    }

    /// Computes the entity set a navigation from `source` leads to.
    fn navigation_target(&self, source: &str, navigation: &str) -> Option<&EntitySet> {
        let set = self.find_entity_set(source)?;
        let target = set.navigation_bindings.get(navigation)?;
        self.find_entity_set(target)
    }

    /// Resolves a qualified type name (primitive, structured or enum) to a
    /// nullable type reference.
    fn resolve_type(&self, qualified_name: &str) -> Option<TypeRef> {
        if let Some(kind) = PrimitiveKind::from_name(qualified_name) {
            return Some(TypeRef::primitive(kind, true));
        }
        if let Some(ty) = self.find_structured_type(qualified_name) {
            return Some(ty.type_ref(true));
        }
        self.find_enum_type(qualified_name)
            .map(|e| TypeRef::enumeration(e.name.clone(), true))
    }
}
