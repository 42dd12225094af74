//! A fully validated function: signature, locals and typed body.
//!
//! Grounded on `function.py::FunctionExpression`/`FunctionRegistry`, split
//! here into a declarative [`FunctionType`] (used while validating calls)
//! and the [`Function`] itself (used while evaluating them).

use wat_types::ValType;

use crate::locals::LocalSpace;
use crate::node::Node;

/// A function's parameter and result types, independent of its body. Used
/// both for the function's own signature and for `(type $t (func ...))`
/// declarations referenced by `call_indirect`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionType {
    pub params: Vec<ValType>,
    pub results: Vec<ValType>,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: Option<String>,
    pub export: Option<String>,
    pub signature: FunctionType,
    pub locals: LocalSpace,
    pub body: Vec<Node>,
}

impl Function {
    pub fn param_count(&self) -> usize {
        self.signature.params.len()
    }
}
