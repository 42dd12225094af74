//! Runtime evaluation of a validated [`Node`] tree.
//!
//! Grounded on `evaluations.py`/`logic.py`'s `evaluate()` methods, but
//! split cleanly from validation: every node here is already known to be
//! well-typed, so `execute` only ever needs to
//! report *traps* (division by zero, out-of-bounds memory, stack
//! exhaustion, an indirect call through a mismatched or empty table slot),
//! never type errors.

use wat_asm::{NumOp, Report};
use wat_types::{ValType, Value};

use crate::error::{kind, WatError};
use crate::locals::LocalFrame;
use crate::module::Instance;
use crate::node::Node;
use crate::stack::OperandStack;

/// Evaluation context for one function call: the live operand stack, this
/// call's locals, and the instance it is running against.
pub struct EvalCtx<'i> {
    pub instance: &'i mut Instance,
    pub locals: LocalFrame,
    pub operands: OperandStack,
    depth: u32,
}

/// How deeply functions may call each other before execution gives up and
/// traps instead of overflowing the host stack.
const MAX_CALL_DEPTH: u32 = 256;

impl<'i> EvalCtx<'i> {
    pub fn new(instance: &'i mut Instance, locals: LocalFrame) -> Self {
        Self {
            instance,
            locals,
            operands: OperandStack::new(),
            depth: 0,
        }
    }
}

fn int_binop(op: NumOp, ty: ValType, a: Value, b: Value) -> Result<Value, WatError> {
    match ty {
        ValType::I32 => {
            let x = a.as_i32();
            let y = b.as_i32();
            let ux = a.as_u32();
            let uy = b.as_u32();
            Ok(match op {
                NumOp::Add => Value::i32(x.wrapping_add(y)),
                NumOp::Sub => Value::i32(x.wrapping_sub(y)),
                NumOp::Mul => Value::i32(x.wrapping_mul(y)),
                NumOp::DivS => {
                    if y == 0 {
                        return Err(kind::division_by_zero("i32.div_s by zero"));
                    }
                    if x == i32::MIN && y == -1 {
                        return Err(kind::integer_overflow("i32.div_s overflow"));
                    }
                    Value::i32(x.wrapping_div(y))
                }
                NumOp::DivU => {
                    if uy == 0 {
                        return Err(kind::division_by_zero("i32.div_u by zero"));
                    }
                    Value::I32(ux / uy)
                }
                NumOp::RemS => {
                    if y == 0 {
                        return Err(kind::division_by_zero("i32.rem_s by zero"));
                    }
                    Value::i32(x.wrapping_rem(y))
                }
                NumOp::RemU => {
                    if uy == 0 {
                        return Err(kind::division_by_zero("i32.rem_u by zero"));
                    }
                    Value::I32(ux % uy)
                }
                NumOp::And => Value::I32(ux & uy),
                NumOp::Or => Value::I32(ux | uy),
                NumOp::Xor => Value::I32(ux ^ uy),
                NumOp::Shl => Value::I32(ux.wrapping_shl(uy & 31)),
                NumOp::ShrS => Value::i32(x.wrapping_shr(uy & 31)),
                NumOp::ShrU => Value::I32(ux.wrapping_shr(uy & 31)),
                NumOp::Rotl => Value::I32(ux.rotate_left(uy & 31)),
                NumOp::Rotr => Value::I32(ux.rotate_right(uy & 31)),
                NumOp::Eq => Value::bool32(ux == uy),
                NumOp::Ne => Value::bool32(ux != uy),
                NumOp::LtS => Value::bool32(x < y),
                NumOp::LtU => Value::bool32(ux < uy),
                NumOp::LeS => Value::bool32(x <= y),
                NumOp::LeU => Value::bool32(ux <= uy),
                NumOp::GtS => Value::bool32(x > y),
                NumOp::GtU => Value::bool32(ux > uy),
                NumOp::GeS => Value::bool32(x >= y),
                NumOp::GeU => Value::bool32(ux >= uy),
                other => unreachable!("{other:?} is not a binary i32 operator"),
            })
        }
        ValType::I64 => {
            let x = a.as_i64();
            let y = b.as_i64();
            let ux = a.as_u64();
            let uy = b.as_u64();
            Ok(match op {
                NumOp::Add => Value::i64(x.wrapping_add(y)),
                NumOp::Sub => Value::i64(x.wrapping_sub(y)),
                NumOp::Mul => Value::i64(x.wrapping_mul(y)),
                NumOp::DivS => {
                    if y == 0 {
                        return Err(kind::division_by_zero("i64.div_s by zero"));
                    }
                    if x == i64::MIN && y == -1 {
                        return Err(kind::integer_overflow("i64.div_s overflow"));
                    }
                    Value::i64(x.wrapping_div(y))
                }
                NumOp::DivU => {
                    if uy == 0 {
                        return Err(kind::division_by_zero("i64.div_u by zero"));
                    }
                    Value::I64(ux / uy)
                }
                NumOp::RemS => {
                    if y == 0 {
                        return Err(kind::division_by_zero("i64.rem_s by zero"));
                    }
                    Value::i64(x.wrapping_rem(y))
                }
                NumOp::RemU => {
                    if uy == 0 {
                        return Err(kind::division_by_zero("i64.rem_u by zero"));
                    }
                    Value::I64(ux % uy)
                }
                NumOp::And => Value::I64(ux & uy),
                NumOp::Or => Value::I64(ux | uy),
                NumOp::Xor => Value::I64(ux ^ uy),
                NumOp::Shl => Value::I64(ux.wrapping_shl((uy & 63) as u32)),
                NumOp::ShrS => Value::i64(x.wrapping_shr((uy & 63) as u32)),
                NumOp::ShrU => Value::I64(ux.wrapping_shr((uy & 63) as u32)),
                NumOp::Rotl => Value::I64(ux.rotate_left((uy & 63) as u32)),
                NumOp::Rotr => Value::I64(ux.rotate_right((uy & 63) as u32)),
                NumOp::Eq => Value::bool32(ux == uy),
                NumOp::Ne => Value::bool32(ux != uy),
                NumOp::LtS => Value::bool32(x < y),
                NumOp::LtU => Value::bool32(ux < uy),
                NumOp::LeS => Value::bool32(x <= y),
                NumOp::LeU => Value::bool32(ux <= uy),
                NumOp::GtS => Value::bool32(x > y),
                NumOp::GtU => Value::bool32(ux > uy),
                NumOp::GeS => Value::bool32(x >= y),
                NumOp::GeU => Value::bool32(ux >= uy),
                other => unreachable!("{other:?} is not a binary i64 operator"),
            })
        }
        _ => unreachable!("int_binop called with a non-integer type"),
    }
}

fn int_unop(op: NumOp, ty: ValType, a: Value) -> Value {
    match ty {
        ValType::I32 => {
            let u = a.as_u32();
            match op {
                NumOp::Clz => Value::I32(u.leading_zeros()),
                NumOp::Ctz => Value::I32(u.trailing_zeros()),
                NumOp::Popcnt => Value::I32(u.count_ones()),
                NumOp::Eqz => Value::bool32(u == 0),
                NumOp::Extend8S => Value::i32(u as i8 as i32),
                NumOp::Extend16S => Value::i32(u as i16 as i32),
                NumOp::Extend32S => Value::i32(u as i32),
                other => unreachable!("{other:?} is not a unary i32 operator"),
            }
        }
        ValType::I64 => {
            let u = a.as_u64();
            match op {
                NumOp::Clz => Value::I64(u.leading_zeros() as u64),
                NumOp::Ctz => Value::I64(u.trailing_zeros() as u64),
                NumOp::Popcnt => Value::I64(u.count_ones() as u64),
                NumOp::Eqz => Value::bool32(u == 0),
                NumOp::Extend8S => Value::i64(u as i8 as i64),
                NumOp::Extend16S => Value::i64(u as i16 as i64),
                NumOp::Extend32S => Value::i64(u as i32 as i64),
                other => unreachable!("{other:?} is not a unary i64 operator"),
            }
        }
        _ => unreachable!("int_unop called with a non-integer type"),
    }
}

fn float_binop(op: NumOp, ty: ValType, a: Value, b: Value) -> Value {
    match ty {
        ValType::F32 => {
            let x = a.as_f32();
            let y = b.as_f32();
            match op {
                NumOp::Add => Value::f32(x + y),
                NumOp::Sub => Value::f32(x - y),
                NumOp::Mul => Value::f32(x * y),
                NumOp::DivS => Value::f32(x / y),
                NumOp::Eq => Value::bool32(x == y),
                NumOp::Ne => Value::bool32(x != y),
                NumOp::LtS => Value::bool32(x < y),
                NumOp::LeS => Value::bool32(x <= y),
                NumOp::GtS => Value::bool32(x > y),
                NumOp::GeS => Value::bool32(x >= y),
                other => unreachable!("{other:?} is not a binary f32 operator"),
            }
        }
        ValType::F64 => {
            let x = a.as_f64();
            let y = b.as_f64();
            match op {
                NumOp::Add => Value::f64(x + y),
                NumOp::Sub => Value::f64(x - y),
                NumOp::Mul => Value::f64(x * y),
                NumOp::DivS => Value::f64(x / y),
                NumOp::Eq => Value::bool32(x == y),
                NumOp::Ne => Value::bool32(x != y),
                NumOp::LtS => Value::bool32(x < y),
                NumOp::LeS => Value::bool32(x <= y),
                NumOp::GtS => Value::bool32(x > y),
                NumOp::GeS => Value::bool32(x >= y),
                other => unreachable!("{other:?} is not a binary f64 operator"),
            }
        }
        _ => unreachable!("float_binop called with a non-float type"),
    }
}

fn eval_node(node: &Node, ctx: &mut EvalCtx) -> Result<Option<Report>, WatError> {
    match node {
        Node::Const(v) => ctx.operands.push(*v)?,
        Node::Num { op, ty, args } => {
            for arg in args {
                if let Some(report) = eval_node(arg, ctx)? {
                    return Ok(Some(report));
                }
            }
            let result = if args.len() == 2 {
                let b = ctx.operands.pop()?;
                let a = ctx.operands.pop()?;
                match ty {
                    ValType::F32 | ValType::F64 => float_binop(*op, *ty, a, b),
                    _ => int_binop(*op, *ty, a, b)?,
                }
            } else {
                let a = ctx.operands.pop()?;
                int_unop(*op, *ty, a)
            };
            ctx.operands.push(result)?;
        }
        Node::LocalGet(index) => ctx.operands.push(ctx.locals.get(*index)?)?,
        Node::LocalSet(index, value) => {
            if let Some(report) = eval_node(value, ctx)? {
                return Ok(Some(report));
            }
            let v = ctx.operands.pop()?;
            ctx.locals.set(*index, v)?;
        }
        Node::LocalTee(index, value) => {
            if let Some(report) = eval_node(value, ctx)? {
                return Ok(Some(report));
            }
            let v = ctx.operands.pop()?;
            ctx.locals.set(*index, v)?;
            ctx.operands.push(v)?;
        }
        Node::GlobalGet(index) => ctx.operands.push(ctx.instance.global_store.get(*index)?)?,
        Node::GlobalSet(index, value) => {
            if let Some(report) = eval_node(value, ctx)? {
                return Ok(Some(report));
            }
            let v = ctx.operands.pop()?;
            ctx.instance.global_store.set(*index, v)?;
        }
        Node::Load { ty, offset, addr } => {
            if let Some(report) = eval_node(addr, ctx)? {
                return Ok(Some(report));
            }
            let base = ctx.operands.pop()?.as_u32() as u64;
            let len = ty.byte_width();
            let bytes = ctx
                .instance
                .memory
                .read(base + *offset, len)
                .ok_or_else(|| kind::invalid_syntax("out of bounds memory access"))?;
            ctx.operands.push(Value::from_le_bytes(*ty, bytes))?;
        }
        Node::Store {
            ty,
            offset,
            addr,
            value,
        } => {
            if let Some(report) = eval_node(addr, ctx)? {
                return Ok(Some(report));
            }
            if let Some(report) = eval_node(value, ctx)? {
                return Ok(Some(report));
            }
            let v = ctx.operands.pop()?;
            let base = ctx.operands.pop()?.as_u32() as u64;
            ctx.instance
                .memory
                .write(base + *offset, &v.to_le_bytes())
                .ok_or_else(|| kind::invalid_syntax("out of bounds memory access"))?;
            let _ = ty;
        }
        Node::MemoryGrow(delta) => {
            if let Some(report) = eval_node(delta, ctx)? {
                return Ok(Some(report));
            }
            let pages = ctx.operands.pop()?.as_u32();
            let previous = ctx.instance.memory.grow(pages);
            ctx.operands.push(Value::I32(previous))?;
        }
        Node::MemorySize => {
            ctx.operands.push(Value::I32(ctx.instance.memory.len_pages()))?;
        }
        Node::Call { func_index, args } => {
            for arg in args {
                if let Some(report) = eval_node(arg, ctx)? {
                    return Ok(Some(report));
                }
            }
            let arg_count = ctx.instance.module.functions[*func_index].param_count();
            let call_args = ctx.operands.pop_n(arg_count)?;
            let result = call_function(ctx.instance, *func_index, &call_args, ctx.depth)?;
            for v in result {
                ctx.operands.push(v)?;
            }
        }
        Node::CallIndirect {
            table_index, args, ..
        } => {
            for arg in args {
                if let Some(report) = eval_node(arg, ctx)? {
                    return Ok(Some(report));
                }
            }
            if let Some(report) = eval_node(table_index, ctx)? {
                return Ok(Some(report));
            }
            let slot = ctx.operands.pop()?.as_u32() as usize;
            let func_index = ctx.instance.table_slot(slot)?;
            let arg_count = ctx.instance.module.functions[func_index].param_count();
            let call_args = ctx.operands.pop_n(arg_count)?;
            let result = call_function(ctx.instance, func_index, &call_args, ctx.depth)?;
            for v in result {
                ctx.operands.push(v)?;
            }
        }
        Node::Block { body, .. } => {
            let mark = ctx.operands.mark();
            for child in body {
                if let Some(report) = eval_node(child, ctx)? {
                    return climb_or_absorb(report, ctx, mark);
                }
            }
        }
        Node::Loop { body, .. } => loop {
            let mark = ctx.operands.mark();
            let mut looped = false;
            for child in body {
                match eval_node(child, ctx)? {
                    Some(Report::Break { depth: 0 }) => {
                        looped = true;
                        break;
                    }
                    Some(report) => return climb_or_absorb(report, ctx, mark),
                    None => {}
                }
            }
            if !looped {
                break;
            }
        },
        Node::If {
            cond,
            then_body,
            else_body,
            ..
        } => {
            if let Some(report) = eval_node(cond, ctx)? {
                return Ok(Some(report));
            }
            let taken = ctx.operands.pop()?.is_truthy_i32();
            let mark = ctx.operands.mark();
            let body = if taken { then_body } else { else_body };
            for child in body {
                if let Some(report) = eval_node(child, ctx)? {
                    return climb_or_absorb(report, ctx, mark);
                }
            }
        }
        Node::Br { depth, args } => {
            for arg in args {
                if let Some(report) = eval_node(arg, ctx)? {
                    return Ok(Some(report));
                }
            }
            return Ok(Some(Report::Break { depth: *depth }));
        }
        Node::BrIf { depth, cond } => {
            if let Some(report) = eval_node(cond, ctx)? {
                return Ok(Some(report));
            }
            if ctx.operands.pop()?.is_truthy_i32() {
                return Ok(Some(Report::Break { depth: *depth }));
            }
        }
        Node::BrTable {
            depths,
            default,
            index,
        } => {
            if let Some(report) = eval_node(index, ctx)? {
                return Ok(Some(report));
            }
            let i = ctx.operands.pop()?.as_u32() as usize;
            let depth = depths.get(i).copied().unwrap_or(*default);
            return Ok(Some(Report::Break { depth }));
        }
        Node::Return { args } => {
            for arg in args {
                if let Some(report) = eval_node(arg, ctx)? {
                    return Ok(Some(report));
                }
            }
            return Ok(Some(Report::Return));
        }
        Node::Select { cond, a, b } => {
            if let Some(report) = eval_node(a, ctx)? {
                return Ok(Some(report));
            }
            if let Some(report) = eval_node(b, ctx)? {
                return Ok(Some(report));
            }
            if let Some(report) = eval_node(cond, ctx)? {
                return Ok(Some(report));
            }
            let take_a = ctx.operands.pop()?.is_truthy_i32();
            let bv = ctx.operands.pop()?;
            let av = ctx.operands.pop()?;
            ctx.operands.push(if take_a { av } else { bv })?;
        }
        Node::Drop(value) => {
            if let Some(report) = eval_node(value, ctx)? {
                return Ok(Some(report));
            }
            ctx.operands.pop()?;
        }
        Node::Unreachable => return Err(kind::unreachable("unreachable instruction executed")),
        Node::Nop => {}
    }
    Ok(None)
}

/// After a scope finishes (normally or via a caught break), collapse its
/// working operands down to just what it produced; a break aimed further
/// out keeps climbing.
fn climb_or_absorb(
    report: Report,
    ctx: &mut EvalCtx,
    mark: usize,
) -> Result<Option<Report>, WatError> {
    match report.climb() {
        None => {
            let produced = ctx.operands.len().saturating_sub(mark);
            let results = ctx.operands.pop_n(produced)?;
            ctx.operands.collapse_to(mark, results);
            Ok(None)
        }
        Some(climbed) => Ok(Some(climbed)),
    }
}

/// Run one function to completion, returning its result values.
pub fn call_function(
    instance: &mut Instance,
    func_index: usize,
    args: &[Value],
    caller_depth: u32,
) -> Result<Vec<Value>, WatError> {
    if caller_depth >= MAX_CALL_DEPTH {
        return Err(kind::stack_overflow("call depth exceeded"));
    }
    let func = instance.module.functions[func_index].clone();
    let frame = LocalFrame::new(&func.locals, args);
    let mut ctx = EvalCtx::new(instance, frame);
    ctx.depth = caller_depth + 1;

    let result_count = func.signature.results.len();
    for node in &func.body {
        match eval_node(node, &mut ctx)? {
            Some(Report::Return) | Some(Report::Break { .. }) => break,
            None => {}
        }
    }
    ctx.operands.pop_n(result_count)
}
