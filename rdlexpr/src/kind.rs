//! Canonical value kinds.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumIter, IntoEnumIterator};

/// The seven kinds an expression can declare.
///
/// Exactly one evaluator of a node, the one matching its declared kind, is
/// authoritative. Every other evaluator converts that result through the
/// conversion table of [`crate::convert`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, EnumIter, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueKind {
    /// `true` / `false`
    Boolean,
    /// Signed 32-bit integer
    Int32,
    /// IEEE 754 double precision float
    Double,
    /// Arbitrary precision decimal
    Decimal,
    /// UTF-8 text
    String,
    /// Calendar date and wall-clock time, without time zone
    DateTime,
    /// Untyped; whatever the node produced at runtime
    Variant,
}

impl ValueKind {
    /// Creates a [`ValueKind`] from its string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        ValueKind::iter().find(|kind| kind.to_str() == s)
    }

    /// Returns the string representation of the [`ValueKind`].
    pub fn to_str(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Int32 => "int32",
            ValueKind::Double => "double",
            ValueKind::Decimal => "decimal",
            ValueKind::String => "string",
            ValueKind::DateTime => "datetime",
            ValueKind::Variant => "variant",
        }
    }

    /// Returns true for the kinds supporting arithmetic.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueKind::Int32 | ValueKind::Double | ValueKind::Decimal
        )
    }

    /// Returns true for the kinds that have a total order usable by comparisons.
    pub fn is_comparable(&self) -> bool {
        !matches!(self, ValueKind::Variant)
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}
