//! The typed operator tree validation produces and evaluation walks.
//!
//! Where `evaluations.py`/`logic.py`/`function.py` mix construction,
//! type-checking and evaluation into one class hierarchy (`__init__`
//! resolves names and fixes the result type; `evaluate` runs it), a [`Node`]
//! is pure data: validation builds it once, execution walks it as many
//! times as the body runs. See [`crate::instantiate`] and [`crate::eval`].

use wat_asm::NumOp;
use wat_types::ValType;

/// One instruction node in a function body, plus whatever value-producing
/// children it needs evaluated first.
#[derive(Debug, Clone)]
pub enum Node {
    /// `<ty>.const <literal>`.
    Const(wat_types::Value),
    /// A unary or binary numeric operator over already-validated operand
    /// types; `ty` is the operator's declared type (`i32.add` -> `I32`).
    Num {
        op: NumOp,
        ty: ValType,
        args: Vec<Node>,
    },
    LocalGet(usize),
    LocalSet(usize, Box<Node>),
    LocalTee(usize, Box<Node>),
    GlobalGet(usize),
    GlobalSet(usize, Box<Node>),
    Load {
        ty: ValType,
        offset: u64,
        addr: Box<Node>,
    },
    Store {
        ty: ValType,
        offset: u64,
        addr: Box<Node>,
        value: Box<Node>,
    },
    MemoryGrow(Box<Node>),
    MemorySize,
    /// A direct call: the callee's index plus its argument expressions.
    Call { func_index: usize, args: Vec<Node> },
    /// An indirect call through the table: the declared type index, the
    /// table-slot expression, then the argument expressions.
    CallIndirect {
        type_index: usize,
        table_index: Box<Node>,
        args: Vec<Node>,
    },
    /// A named or anonymous sequence with its own label scope.
    Block { results: Vec<ValType>, body: Vec<Node> },
    Loop { results: Vec<ValType>, body: Vec<Node> },
    If {
        results: Vec<ValType>,
        cond: Box<Node>,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
    /// Branch to the scope `depth` levels out, carrying the values it
    /// leaves on the operand stack for that scope's result type.
    Br { depth: u32, args: Vec<Node> },
    BrIf { depth: u32, cond: Box<Node> },
    BrTable {
        depths: Vec<u32>,
        default: u32,
        index: Box<Node>,
    },
    Return { args: Vec<Node> },
    Select {
        cond: Box<Node>,
        a: Box<Node>,
        b: Box<Node>,
    },
    Drop(Box<Node>),
    Unreachable,
    Nop,
}
