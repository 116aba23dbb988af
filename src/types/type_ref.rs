//! Type references resolved against the model.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::PrimitiveKind;

/// Definition a type reference points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdmType {
    /// Built-in primitive type.
    Primitive(PrimitiveKind),
    /// Entity type by qualified name.
    Entity(String),
    /// Complex type by qualified name.
    Complex(String),
    /// Enumeration type by qualified name.
    Enum(String),
    /// Collection of the element type.
    Collection(Box<TypeRef>),
}

/// Reference to a model type plus its nullability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    pub definition: EdmType,
    pub nullable: bool,
}

impl TypeRef {
    /// Creates a type reference.
    #[must_use]
    pub fn new(definition: EdmType, nullable: bool) -> Self {
        TypeRef {
            definition,
            nullable,
        }
    }

    /// Creates a primitive type reference.
    #[must_use]
    pub fn primitive(kind: PrimitiveKind, nullable: bool) -> Self {
        TypeRef::new(EdmType::Primitive(kind), nullable)
    }

    /// Non-nullable `Edm.Boolean`, the type of every predicate.
    #[must_use]
    pub fn boolean() -> Self {
        TypeRef::primitive(PrimitiveKind::Boolean, false)
    }

    /// Creates an entity type reference.
    #[must_use]
    pub fn entity(name: impl Into<String>, nullable: bool) -> Self {
        TypeRef::new(EdmType::Entity(name.into()), nullable)
    }

    /// Creates a complex type reference.
    #[must_use]
    pub fn complex(name: impl Into<String>, nullable: bool) -> Self {
        TypeRef::new(EdmType::Complex(name.into()), nullable)
    }

    /// Creates an enumeration type reference.
    #[must_use]
    pub fn enumeration(name: impl Into<String>, nullable: bool) -> Self {
        TypeRef::new(EdmType::Enum(name.into()), nullable)
    }

    /// Creates a collection type reference over `item`.
    #[must_use]
    pub fn collection(item: TypeRef) -> Self {
        TypeRef::new(EdmType::Collection(Box::new(item)), false)
    }

    /// Returns a copy with the given nullability.
    #[must_use]
    pub fn with_nullable(&self, nullable: bool) -> Self {
        TypeRef::new(self.definition.clone(), nullable)
    }

    /// Returns the primitive kind, if primitive.
    #[must_use]
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self.definition {
            EdmType::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// Returns true if this is `Edm.Boolean`.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.as_primitive() == Some(PrimitiveKind::Boolean)
    }

    /// Returns true if this is a collection.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self.definition, EdmType::Collection(_))
    }

    /// Returns the element type of a collection.
    #[must_use]
    pub fn item_type(&self) -> Option<&TypeRef> {
        match &self.definition {
            EdmType::Collection(item) => Some(item),
            _ => None,
        }
    }

    /// Returns true if this refers to an entity type.
    #[must_use]
    pub fn is_entity(&self) -> bool {
        matches!(self.definition, EdmType::Entity(_))
    }

    /// Returns true if this refers to an enumeration type.
    #[must_use]
    pub fn is_enum(&self) -> bool {
        matches!(self.definition, EdmType::Enum(_))
    }

    /// Returns the qualified name of an entity or complex type.
    #[must_use]
    pub fn structured_name(&self) -> Option<&str> {
        match &self.definition {
            EdmType::Entity(name) | EdmType::Complex(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the qualified name of an enumeration type.
    #[must_use]
    pub fn enum_name(&self) -> Option<&str> {
        match &self.definition {
            EdmType::Enum(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the full type name, e.g. `Collection(NS.Pet)`.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.definition {
            EdmType::Primitive(kind) => kind.name().to_string(),
            EdmType::Entity(name) | EdmType::Complex(name) | EdmType::Enum(name) => name.clone(),
            EdmType::Collection(item) => format!("Collection({})", item.full_name()),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
