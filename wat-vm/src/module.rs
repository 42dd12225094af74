//! A fully instantiated module: its functions, globals, memory and table.
//!
//! Grounded on `function.py::FunctionRegistry` (function lookup by name or
//! index) and `function.py::TableFunctionExpression`/`ElementExpression`
//! (the table of indirectly callable functions). One `Module` is built per
//! `(module ...)` directive; the harness keeps the most recently
//! instantiated module current for bare `(invoke ...)` / `(assert_return
//! (invoke ...))` directives that omit a module name.

use wat_types::Memory;

use crate::error::{kind, WatError};
use crate::function::{Function, FunctionType};
use crate::globals::{GlobalSpace, GlobalStore};

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub functions: Vec<Function>,
    pub types: Vec<FunctionType>,
    pub globals: GlobalSpace,
    pub memory: Memory,
    /// Function indices reachable through `call_indirect`, in table-slot
    /// order; `None` for an unfilled slot.
    pub table: Vec<Option<usize>>,
}

/// A module plus the live storage it owns once it has been instantiated.
#[derive(Debug)]
pub struct Instance {
    pub module: Module,
    pub global_store: GlobalStore,
    pub memory: Memory,
}

impl Instance {
    pub fn new(module: Module) -> Self {
        let global_store = GlobalStore::new(&module.globals);
        let memory = module.memory.clone();
        Self {
            module,
            global_store,
            memory,
        }
    }

    pub fn function_by_name(&self, token: &str) -> Result<usize, WatError> {
        if let Some(stripped) = token.strip_prefix('$') {
            let _ = stripped;
            return self
                .module
                .functions
                .iter()
                .position(|f| f.name.as_deref() == Some(token))
                .ok_or_else(|| kind::unknown_function(format!("no function named {token}")));
        }
        token
            .parse::<usize>()
            .ok()
            .filter(|&i| i < self.module.functions.len())
            .ok_or_else(|| kind::unknown_function(format!("no function at index {token}")))
    }

    pub fn function_by_export(&self, name: &str) -> Result<usize, WatError> {
        self.module
            .functions
            .iter()
            .position(|f| f.export.as_deref() == Some(name))
            .ok_or_else(|| kind::unknown_function(format!("no export named \"{name}\"")))
    }

    pub fn table_slot(&self, index: usize) -> Result<usize, WatError> {
        match self.module.table.get(index) {
            Some(Some(func_index)) => Ok(*func_index),
            Some(None) => Err(kind::undefined_element(format!(
                "table slot {index} is unfilled"
            ))),
            None => Err(kind::undefined_element(format!(
                "table slot {index} is out of bounds"
            ))),
        }
    }
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }
}
