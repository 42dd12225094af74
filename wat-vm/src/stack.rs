//! The runtime operand-value stack.
//!
//! Grounded on `variables.py::Stack`, bounded at
//! [`wat_types::MAX_STACK_SLOTS`] the way the original enforces a recursion
//! depth limit; here it is a flat push/pop bound rather than a call-depth
//! counter, since this interpreter has no native call stack proportional to
//! `wat` nesting (control flow recurses through Rust's own stack, which a
//! slot bound does not protect; the slot bound protects the modeled operand
//! stack itself from unbounded `wat` programs).

use wat_types::{Value, MAX_STACK_SLOTS};

use crate::error::{kind, WatError};

/// Runtime operand-value stack used during evaluation.
#[derive(Debug, Default)]
pub struct OperandStack {
    values: Vec<Value>,
}

impl OperandStack {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn push(&mut self, value: Value) -> Result<(), WatError> {
        if self.values.len() >= MAX_STACK_SLOTS {
            return Err(kind::stack_overflow(format!(
                "operand stack exceeded {MAX_STACK_SLOTS} slots"
            )));
        }
        self.values.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, WatError> {
        self.values
            .pop()
            .ok_or_else(|| kind::empty_operand("popped an empty operand stack"))
    }

    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, WatError> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.pop()?);
        }
        out.reverse();
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Discard every value pushed since `mark`, then splice `results` on top.
    /// This is how a finished block/loop/if scope collapses its working
    /// values down to just what it produced.
    pub fn collapse_to(&mut self, mark: usize, results: Vec<Value>) {
        self.values.truncate(mark);
        self.values.extend(results);
    }

    pub fn mark(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trips() {
        let mut stack = OperandStack::new();
        stack.push(Value::i32(7)).unwrap();
        assert_eq!(stack.pop().unwrap().as_i32(), 7);
    }

    #[test]
    fn pop_on_empty_is_an_error() {
        let mut stack = OperandStack::new();
        assert!(stack.pop().is_err());
    }

    #[test]
    fn overflow_past_max_slots_is_an_error() {
        let mut stack = OperandStack::new();
        for _ in 0..MAX_STACK_SLOTS {
            stack.push(Value::i32(0)).unwrap();
        }
        assert!(stack.push(Value::i32(0)).is_err());
    }

    #[test]
    fn collapse_discards_scope_locals_and_keeps_results() {
        let mut stack = OperandStack::new();
        stack.push(Value::i32(1)).unwrap();
        let mark = stack.mark();
        stack.push(Value::i32(2)).unwrap();
        stack.push(Value::i32(3)).unwrap();
        stack.collapse_to(mark, vec![Value::i32(9)]);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap().as_i32(), 9);
        assert_eq!(stack.pop().unwrap().as_i32(), 1);
    }
}
