//! Literal values and primitive type kinds.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primitive types of the entity data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    SByte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    Guid,
    Date,
    DateTimeOffset,
    TimeOfDay,
    Duration,
    Binary,
}

impl PrimitiveKind {
    /// Returns the qualified name of the type (e.g. `Edm.Int32`).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "Edm.Boolean",
            PrimitiveKind::Byte => "Edm.Byte",
            PrimitiveKind::SByte => "Edm.SByte",
            PrimitiveKind::Int16 => "Edm.Int16",
            PrimitiveKind::Int32 => "Edm.Int32",
            PrimitiveKind::Int64 => "Edm.Int64",
            PrimitiveKind::Single => "Edm.Single",
            PrimitiveKind::Double => "Edm.Double",
            PrimitiveKind::Decimal => "Edm.Decimal",
            PrimitiveKind::String => "Edm.String",
            PrimitiveKind::Guid => "Edm.Guid",
            PrimitiveKind::Date => "Edm.Date",
            PrimitiveKind::DateTimeOffset => "Edm.DateTimeOffset",
            PrimitiveKind::TimeOfDay => "Edm.TimeOfDay",
            PrimitiveKind::Duration => "Edm.Duration",
            PrimitiveKind::Binary => "Edm.Binary",
        }
    }

    /// Parses a qualified primitive type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "Edm.Boolean" => PrimitiveKind::Boolean,
            "Edm.Byte" => PrimitiveKind::Byte,
            "Edm.SByte" => PrimitiveKind::SByte,
            "Edm.Int16" => PrimitiveKind::Int16,
            "Edm.Int32" => PrimitiveKind::Int32,
            "Edm.Int64" => PrimitiveKind::Int64,
            "Edm.Single" => PrimitiveKind::Single,
            "Edm.Double" => PrimitiveKind::Double,
            "Edm.Decimal" => PrimitiveKind::Decimal,
            "Edm.String" => PrimitiveKind::String,
            "Edm.Guid" => PrimitiveKind::Guid,
            "Edm.Date" => PrimitiveKind::Date,
            "Edm.DateTimeOffset" => PrimitiveKind::DateTimeOffset,
            "Edm.TimeOfDay" => PrimitiveKind::TimeOfDay,
            "Edm.Duration" => PrimitiveKind::Duration,
            "Edm.Binary" => PrimitiveKind::Binary,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns whether this type is numeric.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::SByte
                | PrimitiveKind::Int16
                | PrimitiveKind::Int32
                | PrimitiveKind::Int64
                | PrimitiveKind::Single
                | PrimitiveKind::Double
                | PrimitiveKind::Decimal
        )
    }

    /// Returns whether values of this type support `lt`/`le`/`gt`/`ge`.
    #[must_use]
    pub fn is_orderable(&self) -> bool {
        self.is_numeric()
            || matches!(
                self,
                PrimitiveKind::String
                    | PrimitiveKind::Boolean
                    | PrimitiveKind::Guid
                    | PrimitiveKind::Date
                    | PrimitiveKind::DateTimeOffset
                    | PrimitiveKind::TimeOfDay
                    | PrimitiveKind::Duration
                    | PrimitiveKind::Binary
            )
    }

    /// Rank used for implicit numeric promotion; wider types rank higher.
    ///
    /// Returns None for non-numeric types.
    #[must_use]
    pub(crate) fn numeric_rank(&self) -> Option<u8> {
        match self {
            PrimitiveKind::Byte | PrimitiveKind::SByte => Some(0),
            PrimitiveKind::Int16 => Some(1),
            PrimitiveKind::Int32 => Some(2),
            PrimitiveKind::Int64 => Some(3),
            PrimitiveKind::Decimal => Some(4),
            PrimitiveKind::Single => Some(5),
            PrimitiveKind::Double => Some(6),
            _ => None,
        }
    }

    /// Returns true if a value of `self` converts implicitly to `target`.
    #[must_use]
    pub fn promotes_to(&self, target: PrimitiveKind) -> bool {
        if *self == target {
            return true;
        }
        match (self.numeric_rank(), target.numeric_rank()) {
            // Decimal never widens to a floating type and floats never narrow to decimal.
            (Some(_), Some(_)) if *self == PrimitiveKind::Decimal => false,
            (Some(_), Some(_)) if target == PrimitiveKind::Decimal => {
                !matches!(self, PrimitiveKind::Single | PrimitiveKind::Double)
            }
            (Some(from), Some(to)) => from < to,
            _ => false,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a literal token after lexical decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    /// Decimal text as written, without the optional `M` suffix.
    Decimal(String),
    String(String),
    Guid(Uuid),
    Date(NaiveDate),
    DateTimeOffset(DateTime<FixedOffset>),
    TimeOfDay(NaiveTime),
    /// ISO 8601 duration text (`P1DT2H`).
    Duration(String),
    /// Base64 payload of a `binary'...'` literal.
    Binary(String),
    /// Member of an enumeration type (`NS.Color'Red'`).
    Enum { type_name: String, member: String },
}

// Floats compare bitwise so that re-parsing `NaN` yields an equal tree.
impl PartialEq for LiteralValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LiteralValue::Null, LiteralValue::Null) => true,
            (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) => a == b,
            (LiteralValue::Int32(a), LiteralValue::Int32(b)) => a == b,
            (LiteralValue::Int64(a), LiteralValue::Int64(b)) => a == b,
            (LiteralValue::Single(a), LiteralValue::Single(b)) => a.to_bits() == b.to_bits(),
            (LiteralValue::Double(a), LiteralValue::Double(b)) => a.to_bits() == b.to_bits(),
            (LiteralValue::Decimal(a), LiteralValue::Decimal(b))
            | (LiteralValue::String(a), LiteralValue::String(b))
            | (LiteralValue::Duration(a), LiteralValue::Duration(b))
            | (LiteralValue::Binary(a), LiteralValue::Binary(b)) => a == b,
            (LiteralValue::Guid(a), LiteralValue::Guid(b)) => a == b,
            (LiteralValue::Date(a), LiteralValue::Date(b)) => a == b,
            (LiteralValue::DateTimeOffset(a), LiteralValue::DateTimeOffset(b)) => {
                a == b && a.offset() == b.offset()
            }
            (LiteralValue::TimeOfDay(a), LiteralValue::TimeOfDay(b)) => a == b,
            (
                LiteralValue::Enum {
                    type_name: ta,
                    member: ma,
                },
                LiteralValue::Enum {
                    type_name: tb,
                    member: mb,
                },
            ) => ta == tb && ma == mb,
            _ => false,
        }
    }
}

impl Eq for LiteralValue {}

impl LiteralValue {
    /// Returns true if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, LiteralValue::Null)
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            LiteralValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to extract an integer that fits in an i64.
    #[must_use]
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            LiteralValue::Int32(i) => Some(i64::from(*i)),
            LiteralValue::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the primitive kind of this value.
    ///
    /// Returns None for `Null` and enum members, whose type comes from context.
    #[must_use]
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        let kind = match self {
            LiteralValue::Null | LiteralValue::Enum { .. } => return None,
            LiteralValue::Boolean(_) => PrimitiveKind::Boolean,
            LiteralValue::Int32(_) => PrimitiveKind::Int32,
            LiteralValue::Int64(_) => PrimitiveKind::Int64,
            LiteralValue::Single(_) => PrimitiveKind::Single,
            LiteralValue::Double(_) => PrimitiveKind::Double,
            LiteralValue::Decimal(_) => PrimitiveKind::Decimal,
            LiteralValue::String(_) => PrimitiveKind::String,
            LiteralValue::Guid(_) => PrimitiveKind::Guid,
            LiteralValue::Date(_) => PrimitiveKind::Date,
            LiteralValue::DateTimeOffset(_) => PrimitiveKind::DateTimeOffset,
            LiteralValue::TimeOfDay(_) => PrimitiveKind::TimeOfDay,
            LiteralValue::Duration(_) => PrimitiveKind::Duration,
            LiteralValue::Binary(_) => PrimitiveKind::Binary,
        };
        Some(kind)
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Null => f.write_str("null"),
            LiteralValue::Boolean(b) => write!(f, "{b}"),
            LiteralValue::Int32(i) => write!(f, "{i}"),
            LiteralValue::Int64(i) => write!(f, "{i}L"),
            LiteralValue::Single(v) => write!(f, "{v}f"),
            LiteralValue::Double(v) => write!(f, "{v}"),
            LiteralValue::Decimal(d) => write!(f, "{d}M"),
            LiteralValue::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            LiteralValue::Guid(g) => write!(f, "{g}"),
            LiteralValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            LiteralValue::DateTimeOffset(dt) => write!(f, "{}", dt.to_rfc3339()),
            LiteralValue::TimeOfDay(t) => write!(f, "{t}"),
            LiteralValue::Duration(d) => write!(f, "duration'{d}'"),
            LiteralValue::Binary(b) => write!(f, "binary'{b}'"),
            LiteralValue::Enum { type_name, member } => write!(f, "{type_name}'{member}'"),
        }
    }
}
