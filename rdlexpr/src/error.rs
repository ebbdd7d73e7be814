use strum::EnumIs;
use thiserror::Error;

use crate::kind::ValueKind;

/// Failures raised while building or evaluating expressions.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum Error {
    /// The conversion table declares the requested conversion incompatible.
    #[error("Cannot convert `{value}` of kind {from} to kind {to}.")]
    Conversion {
        value: String,
        from: ValueKind,
        to: ValueKind,
    },

    /// Integer or decimal division (or modulo) by zero.
    #[error("Division by zero in `{op}` over kind {kind}.")]
    DivideByZero { op: &'static str, kind: ValueKind },

    /// Fixed-width overflow under the trapping overflow policy.
    #[error("Arithmetic overflow in `{op}` over kind {kind}.")]
    Overflow { op: &'static str, kind: ValueKind },

    /// A field, parameter or aggregate reference resolved to nothing.
    #[error("Reference `{name}` is not bound in the current context.")]
    UnboundReference { name: String },

    /// An operator was instantiated over a kind it is not defined for.
    #[error("Operator `{op}` is not defined over kind {kind}.")]
    UnsupportedOperator { op: &'static str, kind: ValueKind },

    /// A built-in function received a malformed argument list.
    #[error("Function `{function}` expects {expected} arguments, found {found}.")]
    InvalidArity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },

    /// An operand declared a kind its node cannot accept.
    #[error("Expected an operand of kind {expected}, found kind {found}.")]
    KindMismatch {
        expected: ValueKind,
        found: ValueKind,
    },
}

impl Error {
    /// Returns true for the arithmetic family (division by zero, overflow).
    pub fn is_arithmetic(&self) -> bool {
        self.is_divide_by_zero() || self.is_overflow()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
