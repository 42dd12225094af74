//! The flat error/trap taxonomy shared by validation and execution.
//!
//! Mirrors `fuel_asm::PanicReason`'s shape: one `#[non_exhaustive]` reason
//! enum, `Display` via `{:?}`, no payload. Unlike `PanicReason` this enum
//! does not need a `u8` wire encoding (this scope has no binary format), so
//! there is no explicit discriminant assignment.

use core::fmt;

/// A typed error kind raised by validation (static checks performed during
/// instantiation) or by execution (runtime traps). The same enum serves
/// both so the assertion harness's message-to-class table applies uniformly
/// to either source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A value's type does not match the operator's declared type.
    InvalidNumberType,
    /// Reference to an unbound local or global.
    UnknownVariable,
    /// `invoke` of a name that is not exported.
    UnknownFunction,
    /// Parenthesis mismatch or malformed expression skeleton.
    InvalidSyntax,
    /// Call-site argument count mismatch.
    InvalidFunctionSignature,
    /// Function body leaves the wrong number of values on the stack.
    InvalidFunctionResult,
    /// Push on a full operand stack.
    StackOverflow,
    /// Pop on an empty operand stack.
    StackEmpty,
    /// An operator lacks enough operands, at validation or at runtime.
    EmptyOperand,
    /// Integer division or remainder by zero.
    DivisionByZero,
    /// `INT_MIN / -1` (the one division that overflows two's complement).
    IntegerOverflow,
    /// A malformed literal or an otherwise illegal script form.
    UnexpectedToken,
    /// `call_indirect` (or a static table reference) with an out-of-range
    /// index.
    UndefinedElement,
    /// The `unreachable` instruction was executed.
    Unreachable,
    /// A branch target does not resolve to an enclosing label.
    UnknownLabel,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for ErrorKind {}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_kind_has_a_distinct_debug_label() {
        let labels: std::collections::HashSet<String> =
            ErrorKind::iter().map(|k| format!("{k:?}")).collect();
        assert_eq!(labels.len(), ErrorKind::iter().count());
    }
}
