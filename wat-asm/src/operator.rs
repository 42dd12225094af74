//! The operator tag: a dispatch table from a parsed head token to what the
//! instantiator should build.
//!
//! Heads of the shape `<ty>.<op>` (`i32.add`, `f64.const`, ...) are split by
//! the parser into a type prefix and an `<op>` tail; [`NumOp::from_tail`]
//! maps that tail to a numeric operator. Every other head maps directly to
//! an [`OperatorTag`] via [`OperatorTag::from_head`].

use core::fmt;

/// A numeric operator, shared across `i32`/`i64`/`f32`/`f64` (not every
/// variant is legal for every type; the instantiator's validation rule
/// rejects the illegal combinations, e.g. `f32.popcnt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumOp {
    Const,
    Add,
    Sub,
    Mul,
    DivS,
    DivU,
    RemS,
    RemU,
    And,
    Or,
    Xor,
    Shl,
    ShrS,
    ShrU,
    Rotl,
    Rotr,
    Clz,
    Ctz,
    Popcnt,
    Extend8S,
    Extend16S,
    Extend32S,
    Eq,
    Ne,
    LtS,
    LtU,
    LeS,
    LeU,
    GtS,
    GtU,
    GeS,
    GeU,
    Eqz,
}

impl NumOp {
    /// Map the `<op>` tail of a `<ty>.<op>` head to a [`NumOp`].
    pub fn from_tail(tail: &str) -> Option<Self> {
        Some(match tail {
            "const" => Self::Const,
            "add" => Self::Add,
            "sub" => Self::Sub,
            "mul" => Self::Mul,
            "div_s" => Self::DivS,
            "div_u" => Self::DivU,
            "rem_s" => Self::RemS,
            "rem_u" => Self::RemU,
            "and" => Self::And,
            "or" => Self::Or,
            "xor" => Self::Xor,
            "shl" => Self::Shl,
            "shr_s" => Self::ShrS,
            "shr_u" => Self::ShrU,
            "rotl" => Self::Rotl,
            "rotr" => Self::Rotr,
            "clz" => Self::Clz,
            "ctz" => Self::Ctz,
            "popcnt" => Self::Popcnt,
            "extend8_s" => Self::Extend8S,
            "extend16_s" => Self::Extend16S,
            "extend32_s" => Self::Extend32S,
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "lt_s" => Self::LtS,
            "lt_u" => Self::LtU,
            "le_s" => Self::LeS,
            "le_u" => Self::LeU,
            "gt_s" => Self::GtS,
            "gt_u" => Self::GtU,
            "ge_s" => Self::GeS,
            "ge_u" => Self::GeU,
            "eqz" => Self::Eqz,
            _ => return None,
        })
    }

    /// True for operators that take two operands and produce one
    /// (everything except `const`, `eqz`, `clz`, `ctz`, `popcnt` and the
    /// sign-extensions, which are unary).
    pub fn is_binary(self) -> bool {
        !matches!(
            self,
            Self::Const
                | Self::Eqz
                | Self::Clz
                | Self::Ctz
                | Self::Popcnt
                | Self::Extend8S
                | Self::Extend16S
                | Self::Extend32S
        )
    }

    /// True for operators whose result is always `i32` regardless of the
    /// operand type (comparisons and `eqz`).
    pub fn result_is_always_i32(self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::Ne
                | Self::LtS
                | Self::LtU
                | Self::LeS
                | Self::LeU
                | Self::GtS
                | Self::GtU
                | Self::GeS
                | Self::GeU
                | Self::Eqz
        )
    }
}

impl fmt::Display for NumOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything the instantiator can build a typed node out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorTag {
    Load,
    Store,
    MemoryGrow,
    MemorySize,
    LocalGet,
    LocalSet,
    LocalTee,
    LocalDecl,
    GlobalGet,
    GlobalSet,
    GlobalDecl,
    Call,
    CallIndirect,
    TableFuncref,
    Elem,
    Type,
    Block,
    Loop,
    If,
    Then,
    Else,
    Br,
    BrIf,
    BrTable,
    Return,
    Select,
    Unreachable,
    Nop,
    Drop,
    Module,
    Func,
    Export,
    Param,
    Result,
    Invoke,
    AssertReturn,
    AssertTrap,
    AssertInvalid,
    AssertMalformed,
    Register,
}

impl OperatorTag {
    /// Map a raw head token (after the parser has folded multi-word heads
    /// such as `table funcref`, `call $id`, `type $id`) to an
    /// [`OperatorTag`], or `None` if this is not a recognized shape at all
    /// (the caller still tries `<ty>.<op>` splitting before giving up).
    pub fn from_head(head: &str) -> Option<Self> {
        if head.starts_with("call ") {
            return Some(Self::Call);
        }
        if head.starts_with("type ") {
            return Some(Self::Type);
        }
        if head.starts_with("invoke ") {
            return Some(Self::Invoke);
        }
        if head.starts_with("local ") {
            return Some(Self::LocalDecl);
        }
        Some(match head {
            "load" => Self::Load,
            "store" => Self::Store,
            "memory.grow" => Self::MemoryGrow,
            "memory.size" => Self::MemorySize,
            "local.get" => Self::LocalGet,
            "local.set" => Self::LocalSet,
            "local.tee" => Self::LocalTee,
            "local" => Self::LocalDecl,
            "global.get" => Self::GlobalGet,
            "global.set" => Self::GlobalSet,
            "global" => Self::GlobalDecl,
            "call" => Self::Call,
            "call_indirect" => Self::CallIndirect,
            "tablefuncref" => Self::TableFuncref,
            "elem" => Self::Elem,
            "type" => Self::Type,
            "block" => Self::Block,
            "loop" => Self::Loop,
            "if" => Self::If,
            "then" => Self::Then,
            "else" => Self::Else,
            "br" => Self::Br,
            "br_if" => Self::BrIf,
            "br_table" => Self::BrTable,
            "return" => Self::Return,
            "select" => Self::Select,
            "unreachable" => Self::Unreachable,
            "nop" => Self::Nop,
            "drop" => Self::Drop,
            "module" => Self::Module,
            "func" => Self::Func,
            "export" => Self::Export,
            "param" => Self::Param,
            "result" => Self::Result,
            "invoke" => Self::Invoke,
            "assert_return" => Self::AssertReturn,
            "assert_trap" => Self::AssertTrap,
            "assert_invalid" => Self::AssertInvalid,
            "assert_malformed" => Self::AssertMalformed,
            "register" => Self::Register,
            _ => return None,
        })
    }
}

impl fmt::Display for OperatorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
