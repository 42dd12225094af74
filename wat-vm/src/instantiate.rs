//! Static validation: turns a parsed `(module ...)` form into an
//! [`Instance`], rejecting anything `assert_invalid`/`assert_malformed`
//! scripts expect to fail.
//!
//! This is the "instantiation-time" half of a two-phase design: the
//! original mixed type-checking into each expression's `__init__`, so a
//! malformed program failed partway through being built. Here a whole
//! module is walked twice — once to collect
//! signatures (so forward calls resolve) and once to validate bodies
//! against a simulated operand-*type* stack ([`CompileStack`]) — before any
//! [`Node`] is considered real enough to execute.

use itertools::Itertools;
use wat_asm::{ErrorKind, NumOp, OperatorTag};
use wat_types::{Memory, ValType, Value};

use crate::compile_stack::CompileStack;
use crate::error::{kind, WatError};
use crate::function::{Function, FunctionType};
use crate::globals::{GlobalDef, GlobalSpace};
use crate::labels::LabelStack;
use crate::locals::LocalSpace;
use crate::module::{Instance, Module};
use crate::node::Node;
use crate::raw::RawNode;

/// Parse a leading `i32`/`i64`/`f32`/`f64` numeric literal per its declared
/// type's width and signedness rules.
fn parse_const(ty: ValType, text: &str) -> Result<Value, WatError> {
    let bad = || kind::invalid_syntax(format!("malformed {ty} literal: {text}"));
    match ty {
        ValType::I32 => {
            if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("-0x")) {
                let neg = text.starts_with('-');
                let mag = u32::from_str_radix(hex, 16).map_err(|_| bad())?;
                let v = if neg { mag.wrapping_neg() } else { mag };
                Ok(Value::I32(v))
            } else {
                text.parse::<i64>()
                    .map(|v| Value::I32(v as u32))
                    .or_else(|_| text.parse::<u32>().map(Value::I32))
                    .map_err(|_| bad())
            }
        }
        ValType::I64 => {
            if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("-0x")) {
                let neg = text.starts_with('-');
                let mag = u64::from_str_radix(hex, 16).map_err(|_| bad())?;
                let v = if neg { mag.wrapping_neg() } else { mag };
                Ok(Value::I64(v))
            } else {
                text.parse::<i128>()
                    .map(|v| Value::I64(v as u64))
                    .or_else(|_| text.parse::<u64>().map(Value::I64))
                    .map_err(|_| bad())
            }
        }
        ValType::F32 => match text {
            "inf" => Ok(Value::f32(f32::INFINITY)),
            "-inf" => Ok(Value::f32(f32::NEG_INFINITY)),
            "nan" => Ok(Value::f32(f32::NAN)),
            _ => text.parse::<f32>().map(Value::f32).map_err(|_| bad()),
        },
        ValType::F64 => match text {
            "inf" => Ok(Value::f64(f64::INFINITY)),
            "-inf" => Ok(Value::f64(f64::NEG_INFINITY)),
            "nan" => Ok(Value::f64(f64::NAN)),
            _ => text.parse::<f64>().map(Value::f64).map_err(|_| bad()),
        },
        ValType::V128 => Err(kind::invalid_number_type("v128 constants are not supported")),
    }
}

/// `i32`/`i64.const`/`.add`/etc. head parsing: splits `"i32.add"` into its
/// declared [`ValType`] and [`NumOp`] tail.
fn split_numeric_head(head: &str) -> Option<(ValType, &str)> {
    let (prefix, tail) = head.split_once('.')?;
    Some((ValType::from_prefix(prefix)?, tail))
}

/// Validation-phase context for a single function body.
struct CompileCtx<'m> {
    module: &'m Module,
    locals: &'m LocalSpace,
    stack: CompileStack,
    labels: LabelStack,
    /// Parallel to `labels`: the result arity each open scope expects.
    label_results: Vec<Vec<ValType>>,
}

impl<'m> CompileCtx<'m> {
    fn new(module: &'m Module, locals: &'m LocalSpace) -> Self {
        Self {
            module,
            locals,
            stack: CompileStack::new(),
            labels: LabelStack::new(),
            label_results: Vec::new(),
        }
    }

    fn push_scope(&mut self, name: Option<String>, results: Vec<ValType>) {
        self.labels.push(name);
        self.label_results.push(results);
    }

    fn pop_scope(&mut self) -> Vec<ValType> {
        self.labels.pop();
        self.label_results.pop().unwrap_or_default()
    }
}

fn read_results(raw: &RawNode) -> Vec<ValType> {
    if raw.head != "result" {
        return Vec::new();
    }
    raw.children
        .iter()
        .filter_map(|c| ValType::from_prefix(&c.head))
        .collect()
}

/// Validate one value-producing child and return its typed [`Node`],
/// pushing the produced type onto `ctx.stack`.
fn validate_expr(raw: &RawNode, ctx: &mut CompileCtx) -> Result<Node, WatError> {
    if let Some((ty, tail)) = split_numeric_head(&raw.head) {
        if tail == "const" {
            let literal = raw
                .children
                .first()
                .ok_or_else(|| kind::invalid_syntax("const requires a literal operand"))?;
            let value = parse_const(ty, &literal.head)?;
            ctx.stack.push(ty);
            return Ok(Node::Const(value));
        }
        if tail == "load" {
            let addr = validate_expr(&raw.children[0], ctx)?;
            ctx.stack.pop_expect(ValType::I32)?;
            ctx.stack.push(ty);
            return Ok(Node::Load {
                ty,
                offset: 0,
                addr: Box::new(addr),
            });
        }
        if tail == "store" {
            let addr = validate_expr(&raw.children[0], ctx)?;
            ctx.stack.pop_expect(ValType::I32)?;
            let value = validate_expr(&raw.children[1], ctx)?;
            ctx.stack.pop_expect(ty)?;
            return Ok(Node::Store {
                ty,
                offset: 0,
                addr: Box::new(addr),
                value: Box::new(value),
            });
        }
        if let Some(op) = NumOp::from_tail(tail) {
            let arity = if op.is_binary() { 2 } else { 1 };
            let mut args = Vec::with_capacity(arity);
            for child in raw.children.iter().take(arity) {
                args.push(validate_expr(child, ctx)?);
            }
            for _ in 0..arity {
                ctx.stack.pop_expect(ty)?;
            }
            ctx.stack
                .push(if op.result_is_always_i32() { ValType::I32 } else { ty });
            return Ok(Node::Num { op, ty, args });
        }
        return Err(kind::invalid_syntax(format!("unknown numeric operator {tail}")));
    }

    match OperatorTag::from_head(&raw.head) {
        Some(OperatorTag::LocalGet) => {
            let token = &raw.children.first().map(|c| c.head.as_str()).unwrap_or("");
            let index = ctx.locals.resolve(token)?;
            let ty = ctx.locals.type_of(index).expect("resolved index is in range");
            ctx.stack.push(ty);
            Ok(Node::LocalGet(index))
        }
        Some(OperatorTag::LocalSet) => {
            let token = &raw.children[0].head;
            let index = ctx.locals.resolve(token)?;
            let ty = ctx.locals.type_of(index).expect("resolved index is in range");
            let value = validate_expr(&raw.children[1], ctx)?;
            ctx.stack.pop_expect(ty)?;
            Ok(Node::LocalSet(index, Box::new(value)))
        }
        Some(OperatorTag::LocalTee) => {
            let token = &raw.children[0].head;
            let index = ctx.locals.resolve(token)?;
            let ty = ctx.locals.type_of(index).expect("resolved index is in range");
            let value = validate_expr(&raw.children[1], ctx)?;
            ctx.stack.pop_expect(ty)?;
            ctx.stack.push(ty);
            Ok(Node::LocalTee(index, Box::new(value)))
        }
        Some(OperatorTag::GlobalGet) => {
            let token = &raw.children[0].head;
            let index = ctx.module.globals.resolve(token)?;
            let ty = ctx.module.globals.type_of(index).expect("resolved index is in range");
            ctx.stack.push(ty);
            Ok(Node::GlobalGet(index))
        }
        Some(OperatorTag::GlobalSet) => {
            let token = &raw.children[0].head;
            let index = ctx.module.globals.resolve(token)?;
            if !ctx.module.globals.is_mutable(index) {
                return Err(kind::invalid_syntax("global.set on an immutable global"));
            }
            let ty = ctx.module.globals.type_of(index).expect("resolved index is in range");
            let value = validate_expr(&raw.children[1], ctx)?;
            ctx.stack.pop_expect(ty)?;
            Ok(Node::GlobalSet(index, Box::new(value)))
        }
        Some(OperatorTag::MemoryGrow) => {
            let delta = validate_expr(&raw.children[0], ctx)?;
            ctx.stack.pop_expect(ValType::I32)?;
            ctx.stack.push(ValType::I32);
            Ok(Node::MemoryGrow(Box::new(delta)))
        }
        Some(OperatorTag::MemorySize) => {
            ctx.stack.push(ValType::I32);
            Ok(Node::MemorySize)
        }
        Some(OperatorTag::Call) => {
            let (ident, rest) = raw
                .head
                .strip_prefix("call ")
                .map(|id| (id, raw.children.as_slice()))
                .unwrap_or(("", &[]));
            let func_index = ctx.module.function_token(ident)?;
            let signature = &ctx.module.functions[func_index].signature;
            let mut args = Vec::with_capacity(rest.len());
            for child in rest {
                args.push(validate_expr(child, ctx)?);
            }
            for param_ty in signature.params.iter().rev() {
                ctx.stack.pop_expect(*param_ty)?;
            }
            for result_ty in &signature.results {
                ctx.stack.push(*result_ty);
            }
            Ok(Node::Call { func_index, args })
        }
        Some(OperatorTag::CallIndirect) => {
            let type_ident = raw
                .head
                .strip_prefix("type ")
                .or_else(|| {
                    raw.children
                        .first()
                        .and_then(|c| c.head.strip_prefix("type "))
                })
                .unwrap_or("0");
            let type_index = type_ident
                .parse::<usize>()
                .ok()
                .filter(|&i| i < ctx.module.types.len())
                .ok_or_else(|| kind::unknown_function(format!("no type {type_ident}")))?;
            let signature = ctx.module.types[type_index].clone();
            let value_children: Vec<&RawNode> = raw
                .children
                .iter()
                .filter(|c| !c.head.starts_with("type "))
                .collect();
            let (table_raw, arg_raws) = value_children
                .split_last()
                .ok_or_else(|| kind::invalid_syntax("call_indirect requires a table index"))?;
            let mut args = Vec::with_capacity(arg_raws.len());
            for child in arg_raws {
                args.push(validate_expr(child, ctx)?);
            }
            let table_index = validate_expr(table_raw, ctx)?;
            ctx.stack.pop_expect(ValType::I32)?;
            for param_ty in signature.params.iter().rev() {
                ctx.stack.pop_expect(*param_ty)?;
            }
            for result_ty in &signature.results {
                ctx.stack.push(*result_ty);
            }
            Ok(Node::CallIndirect {
                type_index,
                table_index: Box::new(table_index),
                args,
            })
        }
        Some(OperatorTag::Block) | Some(OperatorTag::Loop) => {
            let results = raw.children.iter().find_map(|c| {
                let r = read_results(c);
                (!r.is_empty()).then_some(r)
            });
            let results = results.unwrap_or_default();
            let body_forms: Vec<&RawNode> = raw
                .children
                .iter()
                .filter(|c| c.head != "result")
                .collect();
            ctx.push_scope(raw.name.clone(), results.clone());
            let mark = ctx.stack.len();
            let mut body = Vec::with_capacity(body_forms.len());
            for form in body_forms {
                body.push(validate_expr(form, ctx)?);
            }
            for ty in results.iter().rev() {
                ctx.stack.pop_expect(*ty)?;
            }
            ctx.stack.truncate(mark);
            for ty in &results {
                ctx.stack.push(*ty);
            }
            ctx.pop_scope();
            if raw.head == "loop" {
                Ok(Node::Loop { results, body })
            } else {
                Ok(Node::Block { results, body })
            }
        }
        Some(OperatorTag::If) => {
            let results = raw
                .children
                .iter()
                .find_map(|c| {
                    let r = read_results(c);
                    (!r.is_empty()).then_some(r)
                })
                .unwrap_or_default();
            let cond_raw = raw
                .children
                .iter()
                .find(|c| c.head != "result" && c.head != "then" && c.head != "else")
                .ok_or_else(|| kind::invalid_syntax("if requires a condition"))?;
            let cond = validate_expr(cond_raw, ctx)?;
            ctx.stack.pop_expect(ValType::I32)?;

            let then_raw = raw.children.iter().find(|c| c.head == "then");
            let else_raw = raw.children.iter().find(|c| c.head == "else");

            ctx.push_scope(raw.name.clone(), results.clone());
            let mark = ctx.stack.len();
            let mut then_body = Vec::new();
            if let Some(then_raw) = then_raw {
                for form in &then_raw.children {
                    then_body.push(validate_expr(form, ctx)?);
                }
            }
            for ty in results.iter().rev() {
                ctx.stack.pop_expect(*ty)?;
            }
            ctx.stack.truncate(mark);

            let mut else_body = Vec::new();
            if let Some(else_raw) = else_raw {
                for form in &else_raw.children {
                    else_body.push(validate_expr(form, ctx)?);
                }
            }
            for ty in results.iter().rev() {
                ctx.stack.pop_expect(*ty)?;
            }
            ctx.stack.truncate(mark);
            for ty in &results {
                ctx.stack.push(*ty);
            }
            ctx.pop_scope();

            Ok(Node::If {
                results,
                cond: Box::new(cond),
                then_body,
                else_body,
            })
        }
        Some(OperatorTag::Br) => {
            let token = raw
                .head
                .strip_prefix("br ")
                .map(str::to_string)
                .or_else(|| raw.children.first().map(|c| c.head.clone()))
                .ok_or_else(|| kind::invalid_syntax("br requires a target"))?;
            let depth = ctx.labels.resolve(&token)?;
            let arg_raws: Vec<&RawNode> = if raw.head.starts_with("br ") {
                raw.children.iter().collect()
            } else {
                raw.children.iter().skip(1).collect()
            };
            let mut args = Vec::with_capacity(arg_raws.len());
            for child in arg_raws {
                args.push(validate_expr(child, ctx)?);
            }
            Ok(Node::Br { depth, args })
        }
        Some(OperatorTag::BrIf) => {
            let token = raw
                .head
                .strip_prefix("br_if ")
                .map(str::to_string)
                .or_else(|| raw.children.first().map(|c| c.head.clone()))
                .ok_or_else(|| kind::invalid_syntax("br_if requires a target"))?;
            let depth = ctx.labels.resolve(&token)?;
            let cond_raw = if raw.head.starts_with("br_if ") {
                &raw.children[0]
            } else {
                &raw.children[1]
            };
            let cond = validate_expr(cond_raw, ctx)?;
            ctx.stack.pop_expect(ValType::I32)?;
            Ok(Node::BrIf {
                depth,
                cond: Box::new(cond),
            })
        }
        Some(OperatorTag::BrTable) => {
            let mut labels = Vec::new();
            let mut index_raw = None;
            for child in &raw.children {
                if child.is_leaf() {
                    labels.push(child.head.clone());
                } else {
                    index_raw = Some(child);
                }
            }
            let index_raw = index_raw
                .ok_or_else(|| kind::invalid_syntax("br_table requires an index expression"))?;
            let default = labels
                .pop()
                .ok_or_else(|| kind::invalid_syntax("br_table requires at least one target"))?;
            let mut depths = Vec::with_capacity(labels.len());
            for label in &labels {
                depths.push(ctx.labels.resolve(label)?);
            }
            let default = ctx.labels.resolve(&default)?;
            let index = validate_expr(index_raw, ctx)?;
            ctx.stack.pop_expect(ValType::I32)?;
            Ok(Node::BrTable {
                depths,
                default,
                index: Box::new(index),
            })
        }
        Some(OperatorTag::Return) => {
            let mut args = Vec::with_capacity(raw.children.len());
            for child in &raw.children {
                args.push(validate_expr(child, ctx)?);
            }
            Ok(Node::Return { args })
        }
        Some(OperatorTag::Select) => {
            let cond = validate_expr(&raw.children[2], ctx)?;
            ctx.stack.pop_expect(ValType::I32)?;
            let b = validate_expr(&raw.children[1], ctx)?;
            let a = validate_expr(&raw.children[0], ctx)?;
            let ty = ctx.stack.pop()?;
            ctx.stack.pop_expect(ty)?;
            ctx.stack.push(ty);
            Ok(Node::Select {
                cond: Box::new(cond),
                a: Box::new(a),
                b: Box::new(b),
            })
        }
        Some(OperatorTag::Drop) => {
            let value = validate_expr(&raw.children[0], ctx)?;
            ctx.stack.pop()?;
            Ok(Node::Drop(Box::new(value)))
        }
        Some(OperatorTag::Unreachable) => Ok(Node::Unreachable),
        Some(OperatorTag::Nop) => Ok(Node::Nop),
        _ => Err(kind::invalid_syntax(format!("unsupported form {}", raw.head))),
    }
}

fn collect_params(raw: &RawNode) -> Vec<(Option<String>, ValType)> {
    if raw.name.is_some() {
        let ty = raw
            .children
            .first()
            .and_then(|c| ValType::from_prefix(&c.head))
            .unwrap_or(ValType::I32);
        return vec![(raw.name.clone(), ty)];
    }
    raw.children
        .iter()
        .filter_map(|c| ValType::from_prefix(&c.head).map(|ty| (None, ty)))
        .collect()
}

/// Collect a function's signature and name/export without validating its
/// body; used in the first pass so forward references resolve.
fn declare_function(raw: &RawNode) -> Function {
    let mut signature = FunctionType::default();
    let mut locals = LocalSpace::new();
    let mut export = None;

    for child in &raw.children {
        match child.head.as_str() {
            "param" => {
                for (name, ty) in collect_params(child) {
                    signature.params.push(ty);
                    locals.declare(name, ty);
                }
            }
            "result" => {
                signature.results.extend(read_results(child));
            }
            "export" => {
                if let Some(name_raw) = child.children.first() {
                    export = Some(RawNode::unquote(&name_raw.head).to_string());
                }
            }
            "local" => {
                for (name, ty) in collect_params(child) {
                    locals.declare(name, ty);
                }
            }
            _ => {}
        }
    }

    Function {
        name: raw.name.clone(),
        export,
        signature,
        locals,
        body: Vec::new(),
    }
}

fn validate_function_body(raw: &RawNode, module: &Module, func: &Function) -> Result<Vec<Node>, WatError> {
    let mut ctx = CompileCtx::new(module, &func.locals);
    ctx.push_scope(None, func.signature.results.clone());
    let mark = ctx.stack.len();
    let mut body = Vec::new();
    for child in &raw.children {
        if matches!(child.head.as_str(), "param" | "result" | "export" | "local") {
            continue;
        }
        body.push(validate_expr(child, &mut ctx)?);
    }
    for ty in func.signature.results.iter().rev() {
        ctx.stack.pop_expect(*ty)?;
    }
    if ctx.stack.len() != mark {
        let leftover = ctx.stack.as_slice()[mark..].iter().join(", ");
        return Err(kind::invalid_function_result(format!(
            "function body leaves extra values on the stack: [{leftover}]"
        )));
    }
    ctx.pop_scope();
    Ok(body)
}

fn read_global_def(raw: &RawNode) -> Result<GlobalDef, WatError> {
    let (mutable, ty_raw) = match raw.children.first() {
        Some(c) if c.head == "mut" => (true, c.children.first()),
        other => (false, other),
    };
    let ty_raw = ty_raw.ok_or_else(|| kind::invalid_syntax("global requires a type"))?;
    let ty = ValType::from_prefix(&ty_raw.head)
        .ok_or_else(|| kind::invalid_number_type(format!("unknown global type {}", ty_raw.head)))?;
    let init_raw = raw.children.get(1).ok_or_else(|| {
        kind::invalid_syntax("global requires an initializer expression")
    })?;
    let dummy_module = Module::new();
    let dummy_locals = LocalSpace::new();
    let mut ctx = CompileCtx::new(&dummy_module, &dummy_locals);
    let init_node = validate_expr(init_raw, &mut ctx)?;
    let init = match init_node {
        Node::Const(v) => v,
        _ => return Err(kind::invalid_syntax("global initializer must be a constant")),
    };
    Ok(GlobalDef {
        name: raw.name.clone(),
        ty,
        mutable,
        init,
    })
}

impl Module {
    fn function_token(&self, token: &str) -> Result<usize, WatError> {
        if token.starts_with('$') {
            self.functions
                .iter()
                .position(|f| f.name.as_deref() == Some(token))
                .ok_or_else(|| kind::unknown_function(format!("no function named {token}")))
        } else {
            token
                .parse::<usize>()
                .ok()
                .filter(|&i| i < self.functions.len())
                .ok_or_else(|| kind::unknown_function(format!("no function at index {token}")))
        }
    }
}

/// Validate a `(module ...)` form into a runnable [`Instance`].
pub fn instantiate(raw: &RawNode) -> Result<Instance, WatError> {
    if raw.head != "module" {
        return Err(kind::invalid_syntax("expected a module form"));
    }

    let mut module = Module::new();
    let mut func_raws = Vec::new();

    for child in &raw.children {
        match child.head.as_str() {
            "func" => {
                module.functions.push(declare_function(child));
                func_raws.push(child);
            }
            "type" => {
                let func_raw = child
                    .children
                    .iter()
                    .find(|c| c.head == "func")
                    .ok_or_else(|| kind::invalid_syntax("type declaration requires a func shape"))?;
                let mut signature = FunctionType::default();
                for c in &func_raw.children {
                    match c.head.as_str() {
                        "param" => {
                            signature
                                .params
                                .extend(collect_params(c).into_iter().map(|(_, ty)| ty));
                        }
                        "result" => signature.results.extend(read_results(c)),
                        _ => {}
                    }
                }
                module.types.push(signature);
            }
            "global" => {
                module.globals.declare(read_global_def(child)?);
            }
            "memory" => {
                let initial_pages: u32 = child
                    .children
                    .first()
                    .and_then(|c| c.head.parse().ok())
                    .unwrap_or(0);
                let mut memory = Memory::new();
                memory.grow(initial_pages);
                module.memory = memory;
            }
            "tablefuncref" => {
                if let Some(elem) = child.children.iter().find(|c| c.head == "elem") {
                    let mut table = Vec::with_capacity(elem.children.len());
                    for name_raw in &elem.children {
                        table.push(Some(module.function_token(&name_raw.head)?));
                    }
                    module.table = table;
                }
            }
            "register" | "import" => {
                tracing::debug!(head = %child.head, "module-linking form recognized, not evaluated");
            }
            _ => {}
        }
    }

    let declared_functions = module.functions.clone();
    for (index, (func, raw_func)) in declared_functions.iter().zip(&func_raws).enumerate() {
        let body = validate_function_body(raw_func, &module, func)?;
        module.functions[index].body = body;
    }

    Ok(Instance::new(module))
}

/// Evaluate a bare constant form such as `(i32.const 5)`, as used by
/// `invoke` arguments and `assert_return`'s expected-result expressions in
/// conformance scripts (both are always constants, never computations).
pub fn eval_const_expr(raw: &RawNode) -> Result<Value, WatError> {
    let (ty, tail) = split_numeric_head(&raw.head)
        .ok_or_else(|| kind::invalid_syntax(format!("expected a constant, found {}", raw.head)))?;
    if tail != "const" {
        return Err(kind::invalid_syntax(format!(
            "expected a const form, found {}.{tail}",
            ty
        )));
    }
    let literal = raw
        .children
        .first()
        .ok_or_else(|| kind::invalid_syntax("const requires a literal operand"))?;
    parse_const(ty, &literal.head)
}

pub fn error_kind_is_validation(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::InvalidNumberType
            | ErrorKind::UnknownVariable
            | ErrorKind::UnknownFunction
            | ErrorKind::InvalidSyntax
            | ErrorKind::InvalidFunctionSignature
            | ErrorKind::InvalidFunctionResult
            | ErrorKind::UnexpectedToken
            | ErrorKind::UndefinedElement
            | ErrorKind::UnknownLabel
    )
}
