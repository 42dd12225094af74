//! The single error type shared by parsing, validation and execution.
//!
//! Like `fuel_vm::error`, recoverable interpreter failures are a typed
//! reason (here [`ErrorKind`], reused as-is rather than wrapped per-stage in
//! a `RuntimeError`/`InterpreterError` split) plus a human-readable message.

use derive_more::Display;
pub use wat_asm::ErrorKind;

/// A validation, parse or runtime failure. One shape used for all three,
/// so the assertion harness's message-to-class table applies uniformly
/// regardless of the stage that raised it.
#[derive(Debug, Clone, Display, PartialEq, Eq)]
#[display(fmt = "{kind}: {message}")]
pub struct WatError {
    pub kind: ErrorKind,
    pub message: String,
}

impl WatError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::error::Error for WatError {}

macro_rules! ctor {
    ($name:ident, $kind:ident) => {
        pub fn $name(message: impl Into<String>) -> WatError {
            WatError::new(ErrorKind::$kind, message)
        }
    };
}

/// Short constructors, one per [`ErrorKind`] variant, matching the
/// `custom_exceptions.py` constructor-per-class shape in the original.
pub mod kind {
    use super::*;

    ctor!(invalid_number_type, InvalidNumberType);
    ctor!(unknown_variable, UnknownVariable);
    ctor!(unknown_function, UnknownFunction);
    ctor!(invalid_syntax, InvalidSyntax);
    ctor!(invalid_function_signature, InvalidFunctionSignature);
    ctor!(invalid_function_result, InvalidFunctionResult);
    ctor!(stack_overflow, StackOverflow);
    ctor!(stack_empty, StackEmpty);
    ctor!(empty_operand, EmptyOperand);
    ctor!(division_by_zero, DivisionByZero);
    ctor!(integer_overflow, IntegerOverflow);
    ctor!(unexpected_token, UnexpectedToken);
    ctor!(undefined_element, UndefinedElement);
    ctor!(unreachable, Unreachable);
    ctor!(unknown_label, UnknownLabel);
}
