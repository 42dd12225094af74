//! The static operand-type stack walked during validation.
//!
//! `variables.py`'s `Stack` tracks live values at evaluation time; here the
//! same bookkeeping happens one phase earlier, over `ValType` rather than
//! `Value`, so a type mismatch is a validation failure instead of a runtime
//! panic. Scopes push/pop as a unit the same way `logic.py`'s block
//! expressions splice a sub-stack's results back into the parent.

use wat_types::ValType;

use crate::error::{kind, WatError};

/// Operand-type stack used only while validating a function body.
#[derive(Debug, Default)]
pub struct CompileStack {
    types: Vec<ValType>,
}

impl CompileStack {
    pub fn new() -> Self {
        Self { types: Vec::new() }
    }

    pub fn push(&mut self, ty: ValType) {
        self.types.push(ty);
    }

    pub fn pop(&mut self) -> Result<ValType, WatError> {
        self.types
            .pop()
            .ok_or_else(|| kind::empty_operand("popped an empty compile-time operand stack"))
    }

    /// Pop and assert the popped type matches `expected`.
    pub fn pop_expect(&mut self, expected: ValType) -> Result<(), WatError> {
        let got = self.pop()?;
        if got != expected {
            return Err(kind::invalid_number_type(format!(
                "expected {expected} on the operand stack, found {got}"
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Truncate back to `len`, as when a scope's results have already been
    /// accounted for and its working types should be discarded.
    pub fn truncate(&mut self, len: usize) {
        self.types.truncate(len);
    }

    pub fn as_slice(&self) -> &[ValType] {
        &self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trips() {
        let mut stack = CompileStack::new();
        stack.push(ValType::I32);
        assert_eq!(stack.pop().unwrap(), ValType::I32);
    }

    #[test]
    fn pop_expect_rejects_mismatched_type() {
        let mut stack = CompileStack::new();
        stack.push(ValType::I64);
        assert!(stack.pop_expect(ValType::I32).is_err());
    }

    #[test]
    fn pop_on_empty_stack_is_an_error() {
        let mut stack = CompileStack::new();
        assert!(stack.pop().is_err());
    }

    #[test]
    fn truncate_discards_scope_locals() {
        let mut stack = CompileStack::new();
        stack.push(ValType::I32);
        let mark = stack.len();
        stack.push(ValType::I64);
        stack.push(ValType::F32);
        stack.truncate(mark);
        assert_eq!(stack.len(), 1);
    }
}
