//! Contract tests for the parse and bind pipeline.
//!
//! Every submodule binds against the pet store model built here.

mod binder_contract;
mod parser_contract;
mod select_expand_contract;

use odata_query::model::{
    EntitySet, EnumType, NavigationProperty, Operation, SchemaModel, StructuredType,
};
use odata_query::types::{PrimitiveKind, TypeRef};

pub fn string() -> TypeRef {
    TypeRef::primitive(PrimitiveKind::String, true)
}

pub fn int32() -> TypeRef {
    TypeRef::primitive(PrimitiveKind::Int32, false)
}

/// Pets, people and their relationships.
pub fn pet_store() -> SchemaModel {
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
                .with_property("Id", int32())
                .with_property("Name", string())
                .with_property("Age", int32())
                .with_property("Color", TypeRef::enumeration("NS.Color", true))
                .with_property("Birth", TypeRef::primitive(PrimitiveKind::Date, true))
                .with_property("Tags", TypeRef::collection(string().with_nullable(false)))
                .with_navigation(NavigationProperty::single("Owner", "NS.Person")),
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
        .add_structured_type(
            StructuredType::entity("NS.Cat")
                .with_base("NS.Pet")
                .with_property("Indoor", TypeRef::boolean()),
        )
        .unwrap();
    model
        .add_structured_type(
            StructuredType::entity("NS.Person")
                .open()
                .with_property("Id", int32())
                .with_property("Name", string())
                .with_property("Age", int32())
                .with_property("Address", TypeRef::complex("NS.Address", true))
                .with_property("Emails", TypeRef::collection(string()))
                .with_navigation(NavigationProperty::collection("Pets", "NS.Pet"))
                .with_navigation(NavigationProperty::single("BestFriend", "NS.Person")),
        )
        .unwrap();
    model
        .add_structured_type(StructuredType::entity("NS.Foo").with_property("Name", string()))
        .unwrap();
    model
        .add_structured_type(StructuredType::entity("NS.Bar").with_property("Name", string()))
        .unwrap();

    model
        .add_entity_set(EntitySet::new("Pets", "NS.Pet").with_binding("Owner", "People"))
        .unwrap();
    model
        .add_entity_set(
            EntitySet::new("People", "NS.Person")
                .with_binding("Pets", "Pets")
                .with_binding("BestFriend", "People"),
        )
        .unwrap();
    model.add_entity_set(EntitySet::new("Foos", "NS.Foo")).unwrap();

    model
        .add_operation(
            Operation::bound_function("NS.IsOlderThan", TypeRef::entity("NS.Pet", false), TypeRef::boolean())
                .with_parameter("years", int32()),
        )
        .unwrap();
    model
        .add_operation(Operation::bound_function(
            "NS.Friends",
            TypeRef::entity("NS.Person", false),
            TypeRef::collection(TypeRef::entity("NS.Person", false)),
        ))
        .unwrap();
    model.validate().unwrap();
    model
}
