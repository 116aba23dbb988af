//! Type system shared by the lexer, parser and binder.

mod type_ref;
mod value;

pub use type_ref::{EdmType, TypeRef};
pub use value::{LiteralValue, PrimitiveKind};
