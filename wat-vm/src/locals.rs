//! Function-local variable storage: parameters plus declared locals.
//!
//! Grounded on `variables.py::VariableWatch`, which keyed locals by either
//! name or position. Here that dual lookup is a [`LocalSlot`] list searched
//! by name first, falling back to a parsed numeric index, matching how
//! `local.get`/`local.set`/`local.tee` accept either form in the text
//! format.

use wat_types::{ValType, Value};

use crate::error::{kind, WatError};

/// One parameter or declared local: its type and optional `$name`.
#[derive(Debug, Clone)]
pub struct LocalSlot {
    pub name: Option<String>,
    pub ty: ValType,
}

/// The declared shape of a function's locals (used during validation,
/// before any runtime values exist).
#[derive(Debug, Clone, Default)]
pub struct LocalSpace {
    slots: Vec<LocalSlot>,
}

impl LocalSpace {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn declare(&mut self, name: Option<String>, ty: ValType) {
        self.slots.push(LocalSlot { name, ty });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn resolve(&self, token: &str) -> Result<usize, WatError> {
        if token.starts_with('$') {
            return self
                .slots
                .iter()
                .position(|slot| slot.name.as_deref() == Some(token))
                .ok_or_else(|| kind::unknown_variable(format!("no local named {token}")));
        }
        token
            .parse::<usize>()
            .ok()
            .filter(|&i| i < self.slots.len())
            .ok_or_else(|| kind::unknown_variable(format!("no local at index {token}")))
    }

    pub fn type_of(&self, index: usize) -> Option<ValType> {
        self.slots.get(index).map(|slot| slot.ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalSlot> {
        self.slots.iter()
    }
}

/// Concrete runtime values for a single call frame's locals, built from a
/// [`LocalSpace`] and the caller-supplied arguments.
#[derive(Debug, Clone)]
pub struct LocalFrame {
    values: Vec<Value>,
}

impl LocalFrame {
    pub fn new(space: &LocalSpace, args: &[Value]) -> Self {
        let mut values = Vec::with_capacity(space.len());
        for (i, slot) in space.iter().enumerate() {
            values.push(args.get(i).copied().unwrap_or_else(|| Value::zero(slot.ty)));
        }
        Self { values }
    }

    pub fn get(&self, index: usize) -> Result<Value, WatError> {
        self.values
            .get(index)
            .copied()
            .ok_or_else(|| kind::unknown_variable(format!("no local at index {index}")))
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<(), WatError> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or_else(|| kind::unknown_variable(format!("no local at index {index}")))?;
        *slot = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_name_and_by_index() {
        let mut space = LocalSpace::new();
        space.declare(Some("$x".to_string()), ValType::I32);
        space.declare(None, ValType::I64);
        assert_eq!(space.resolve("$x").unwrap(), 0);
        assert_eq!(space.resolve("1").unwrap(), 1);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let space = LocalSpace::new();
        assert!(space.resolve("$missing").is_err());
    }

    #[test]
    fn frame_defaults_unset_locals_to_zero() {
        let mut space = LocalSpace::new();
        space.declare(Some("$x".to_string()), ValType::I32);
        space.declare(None, ValType::I64);
        let frame = LocalFrame::new(&space, &[Value::i32(5)]);
        assert_eq!(frame.get(0).unwrap().as_i32(), 5);
        assert_eq!(frame.get(1).unwrap().as_i64(), 0);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut space = LocalSpace::new();
        space.declare(None, ValType::I32);
        let mut frame = LocalFrame::new(&space, &[]);
        frame.set(0, Value::i32(42)).unwrap();
        assert_eq!(frame.get(0).unwrap().as_i32(), 42);
    }
}
