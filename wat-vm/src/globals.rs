//! Module-level global variables.
//!
//! Grounded on `variables.py::VariableWatch` applied at module scope rather
//! than function scope; a global additionally carries a mutability flag so
//! `global.set` against a `(global i32 ...)` (as opposed to
//! `(global (mut i32) ...)`) is a validation failure rather than a silent
//! write.

use wat_types::{ValType, Value};

use crate::error::{kind, WatError};

#[derive(Debug, Clone)]
pub struct GlobalDef {
    pub name: Option<String>,
    pub ty: ValType,
    pub mutable: bool,
    pub init: Value,
}

#[derive(Debug, Clone, Default)]
pub struct GlobalSpace {
    defs: Vec<GlobalDef>,
}

impl GlobalSpace {
    pub fn new() -> Self {
        Self { defs: Vec::new() }
    }

    pub fn declare(&mut self, def: GlobalDef) {
        self.defs.push(def);
    }

    pub fn resolve(&self, token: &str) -> Result<usize, WatError> {
        if token.starts_with('$') {
            return self
                .defs
                .iter()
                .position(|def| def.name.as_deref() == Some(token))
                .ok_or_else(|| kind::unknown_variable(format!("no global named {token}")));
        }
        token
            .parse::<usize>()
            .ok()
            .filter(|&i| i < self.defs.len())
            .ok_or_else(|| kind::unknown_variable(format!("no global at index {token}")))
    }

    pub fn type_of(&self, index: usize) -> Option<ValType> {
        self.defs.get(index).map(|def| def.ty)
    }

    pub fn is_mutable(&self, index: usize) -> bool {
        self.defs.get(index).map(|def| def.mutable).unwrap_or(false)
    }

    pub fn init_values(&self) -> Vec<Value> {
        self.defs.iter().map(|def| def.init).collect()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }
}

/// Runtime storage for a module's globals, seeded from [`GlobalSpace`]'s
/// initializers at instantiation.
#[derive(Debug, Clone, Default)]
pub struct GlobalStore {
    values: Vec<Value>,
}

impl GlobalStore {
    pub fn new(space: &GlobalSpace) -> Self {
        Self {
            values: space.init_values(),
        }
    }

    pub fn get(&self, index: usize) -> Result<Value, WatError> {
        self.values
            .get(index)
            .copied()
            .ok_or_else(|| kind::unknown_variable(format!("no global at index {index}")))
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<(), WatError> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or_else(|| kind::unknown_variable(format!("no global at index {index}")))?;
        *slot = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_space() -> GlobalSpace {
        let mut space = GlobalSpace::new();
        space.declare(GlobalDef {
            name: Some("$counter".to_string()),
            ty: ValType::I32,
            mutable: true,
            init: Value::i32(0),
        });
        space.declare(GlobalDef {
            name: None,
            ty: ValType::I64,
            mutable: false,
            init: Value::i64(10),
        });
        space
    }

    #[test]
    fn resolves_by_name_and_index() {
        let space = sample_space();
        assert_eq!(space.resolve("$counter").unwrap(), 0);
        assert_eq!(space.resolve("1").unwrap(), 1);
    }

    #[test]
    fn immutability_is_tracked_per_global() {
        let space = sample_space();
        assert!(space.is_mutable(0));
        assert!(!space.is_mutable(1));
    }

    #[test]
    fn store_reflects_set_values() {
        let space = sample_space();
        let mut store = GlobalStore::new(&space);
        store.set(0, Value::i32(5)).unwrap();
        assert_eq!(store.get(0).unwrap().as_i32(), 5);
        assert_eq!(store.get(1).unwrap().as_i64(), 10);
    }
}
