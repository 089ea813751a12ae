//! Expression lowering.
//!
//! Every expression lowers to a [`Value`]: either an immediate folded at
//! generation time, or "the result is in the canonical register"
//! (`%rax` for integers and pointers, `%xmm0` for floats). Callers that
//! need a constant (global initializers) pass `need_imm`, and anything
//! that cannot stay immediate is an error.
//!
//! Binary operators follow a fixed shape: lower the left operand and
//! spill it to an anonymous stack slot if it landed in a register, lower
//! the right operand, pick the rank-max result type, then either fold
//! (both immediate, wrapping on overflow with a warning) or materialize
//! the right side in `%rcx`/`%xmm1` and the left side in `%rax`/`%xmm0`,
//! converting each to the result type before the operation itself.

use super::error::{CodegenError, CodegenErrorKind};
use super::{ArgReg, Codegen, assign_arg_registers, data};
use crate::ast::{AssignOp, BinaryOp, Expr, ExprKind, NumberType, Type, UnaryOp};
use crate::token::Span;

/// An immediate value carried through lowering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Imm {
    Int(i128),
    Float(f64),
}

/// Where an expression's result lives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Operand {
    /// In `%rax`/`%xmm0`, chosen by the value's type.
    Reg,
    /// A compile-time constant.
    Imm(Imm),
}

/// The result of lowering one expression.
#[derive(Debug, Clone)]
pub(super) struct Value {
    pub ty: Type,
    pub operand: Operand,
}

impl Value {
    fn reg(ty: Type) -> Self {
        Value {
            ty,
            operand: Operand::Reg,
        }
    }

    fn imm(ty: Type, imm: Imm) -> Self {
        Value {
            ty,
            operand: Operand::Imm(imm),
        }
    }

    fn void() -> Self {
        Value::reg(Type::Void)
    }
}

/// The machine-level numeric class of a scalar type.
///
/// Pointers move through the integer machinery as `u64`.
pub(super) fn machine_type(ty: &Type) -> Option<NumberType> {
    match ty {
        Type::Number(n) => Some(*n),
        Type::Pointer(_) => Some(NumberType::U64),
        _ => None,
    }
}

/// The two register slots operands are materialized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// `%rax` / `%xmm0`: results and left operands.
    A,
    /// `%rcx` / `%xmm1`: right operands.
    C,
}

/// Returns the general-purpose register name for a slot and size.
fn gp(slot: Slot, size: usize) -> &'static str {
    match (slot, size) {
        (Slot::A, 1) => "%al",
        (Slot::A, 2) => "%ax",
        (Slot::A, 4) => "%eax",
        (Slot::A, 8) => "%rax",
        (Slot::C, 1) => "%cl",
        (Slot::C, 2) => "%cx",
        (Slot::C, 4) => "%ecx",
        (Slot::C, 8) => "%rcx",
        _ => unreachable!("register sizes are 1, 2, 4, or 8"),
    }
}

/// Returns the xmm register name for a slot.
fn xmm(slot: Slot) -> &'static str {
    match slot {
        Slot::A => "%xmm0",
        Slot::C => "%xmm1",
    }
}

/// Returns the operand-size suffix.
fn suffix(size: usize) -> &'static str {
    match size {
        1 => "b",
        2 => "w",
        4 => "l",
        8 => "q",
        _ => unreachable!("operand sizes are 1, 2, 4, or 8"),
    }
}

/// Returns the float move mnemonic for a type.
fn fmov(ty: NumberType) -> &'static str {
    if ty == NumberType::Float { "movss" } else { "movsd" }
}

fn int_fits(ty: NumberType, value: i128) -> bool {
    let bits = (ty.size() * 8) as u32;
    if ty.is_signed() {
        let max = (1i128 << (bits - 1)) - 1;
        let min = -(1i128 << (bits - 1));
        value >= min && value <= max
    } else {
        value >= 0 && value < (1i128 << bits)
    }
}

fn int_wrap(ty: NumberType, value: i128) -> i128 {
    let bits = (ty.size() * 8) as u32;
    let mask = (1u128 << bits) - 1;
    let masked = (value as u128) & mask;
    if ty.is_signed() {
        let shift = 128 - bits;
        ((masked << shift) as i128) >> shift
    } else {
        masked as i128
    }
}

impl<'a> Codegen<'a> {
    /// Lowers one expression.
    ///
    /// With `need_imm` set the expression must fold to an immediate;
    /// anything that would touch a register or memory is an error.
    pub(super) fn lower_expr(
        &mut self,
        expr: &Expr,
        need_imm: bool,
    ) -> Result<Value, CodegenError> {
        match &expr.kind {
            ExprKind::Name(name) => self.lower_name(name, expr.span, need_imm),
            ExprKind::Number(text) => lower_number(text, expr.span),
            ExprKind::Str(text) => self.lower_str(text, expr.span, need_imm),
            ExprKind::Declaration { mutable, ty, name } => {
                if need_imm {
                    return Err(CodegenError::new(
                        CodegenErrorKind::NotConstant,
                        "a declaration is not a compile-time constant",
                        expr.span,
                    ));
                }
                self.declare_local(name, ty, *mutable, expr.span, None)
            }
            ExprKind::Assign { op, target, value } => {
                self.lower_assign(*op, target, value, need_imm, expr.span)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.lower_binary(*op, lhs, rhs, need_imm, expr.span)
            }
            ExprKind::Unary { op, operand } => {
                self.lower_unary(*op, operand, need_imm, expr.span)
            }
            ExprKind::Call { target, args } => self.lower_call(target, args, need_imm, expr.span),
            ExprKind::Return(value) => {
                if need_imm {
                    return Err(CodegenError::new(
                        CodegenErrorKind::NotConstant,
                        "'return' is not a compile-time constant",
                        expr.span,
                    ));
                }
                self.lower_return(value.as_deref(), expr.span)
            }
            ExprKind::Scope(body) => {
                if need_imm {
                    return Err(CodegenError::new(
                        CodegenErrorKind::NotConstant,
                        "a scope is not a compile-time constant",
                        expr.span,
                    ));
                }
                self.lower_scope(body)
            }
        }
    }

    // -- names --

    fn lower_name(
        &mut self,
        name: &str,
        span: Span,
        need_imm: bool,
    ) -> Result<Value, CodegenError> {
        if need_imm {
            return Err(CodegenError::new(
                CodegenErrorKind::NotConstant,
                format!("'{}' is not a compile-time constant", name),
                span,
            ));
        }
        let (addr, ty) = self.resolve_read(name, span)?;
        let machine = machine_type(&ty).ok_or_else(|| {
            CodegenError::new(
                CodegenErrorKind::Unsupported,
                format!("a value of type '{}' cannot be loaded", ty),
                span,
            )
        })?;
        if machine.is_float() {
            self.emit(format!("{}\t{}, %xmm0", fmov(machine), addr));
        } else {
            let size = machine.size();
            self.emit(format!(
                "mov{}\t{}, {}",
                suffix(size),
                addr,
                gp(Slot::A, size)
            ));
        }
        Ok(Value::reg(ty))
    }

    /// Resolves a name for reading: its memory operand and type.
    fn resolve_read(&self, name: &str, span: Span) -> Result<(String, Type), CodegenError> {
        if let Some(frame) = self.frame.as_ref() {
            if let Some(local) = frame.lookup(name) {
                return Ok((format!("-{}(%rbp)", local.offset), local.ty.clone()));
            }
        }
        if let Some(global) = self.unit().global(name) {
            return Ok((format!("{}(%rip)", name), global.ty.clone()));
        }
        if self.unit().function(name).is_some() {
            return Err(CodegenError::new(
                CodegenErrorKind::Unsupported,
                format!("function '{}' cannot be used as a value", name),
                span,
            ));
        }
        Err(CodegenError::new(
            CodegenErrorKind::UnknownName,
            format!("unknown name '{}'", name),
            span,
        ))
    }

    /// Writes `value` into the named variable, converting to its type.
    fn store_name(&mut self, name: &str, span: Span, value: Value) -> Result<Value, CodegenError> {
        let (addr, ty, mutable) = self.resolve_write(name, span)?;
        if !mutable {
            return Err(CodegenError::new(
                CodegenErrorKind::WriteToConstant,
                format!("cannot assign to constant '{}'", name),
                span,
            ));
        }
        let value = self.coerce(value, &ty, span)?;
        let machine = machine_type(&ty)
            .unwrap_or_else(|| unreachable!("writable names have scalar types"));
        self.store_to(&addr, machine, &value.operand);
        Ok(value)
    }

    fn resolve_write(
        &self,
        name: &str,
        span: Span,
    ) -> Result<(String, Type, bool), CodegenError> {
        if let Some(frame) = self.frame.as_ref() {
            if let Some(local) = frame.lookup(name) {
                return Ok((
                    format!("-{}(%rbp)", local.offset),
                    local.ty.clone(),
                    local.mutable,
                ));
            }
        }
        if let Some(global) = self.unit().global(name) {
            return Ok((format!("{}(%rip)", name), global.ty.clone(), global.mutable));
        }
        if self.unit().function(name).is_some() {
            return Err(CodegenError::new(
                CodegenErrorKind::Unsupported,
                format!("cannot assign to function '{}'", name),
                span,
            ));
        }
        Err(CodegenError::new(
            CodegenErrorKind::UnknownName,
            format!("unknown name '{}'", name),
            span,
        ))
    }

    /// Stores an already-converted value to a memory operand.
    fn store_to(&mut self, addr: &str, machine: NumberType, operand: &Operand) {
        let size = machine.size();
        match operand {
            Operand::Reg if machine.is_float() => {
                self.emit(format!("{}\t%xmm0, {}", fmov(machine), addr));
            }
            Operand::Reg => {
                self.emit(format!(
                    "mov{}\t{}, {}",
                    suffix(size),
                    gp(Slot::A, size),
                    addr
                ));
            }
            Operand::Imm(Imm::Int(v)) => {
                if size == 8 && !(-(1i128 << 31)..(1i128 << 31)).contains(v) {
                    self.emit(format!("movabsq\t${}, %rax", data::format_int(machine, *v)));
                    self.emit(format!("movq\t%rax, {}", addr));
                } else {
                    self.emit(format!(
                        "mov{}\t${}, {}",
                        suffix(size),
                        data::format_int(machine, *v),
                        addr
                    ));
                }
            }
            Operand::Imm(Imm::Float(f)) => {
                if machine == NumberType::Float {
                    self.emit(format!("movl\t$0x{:X}, {}", (*f as f32).to_bits(), addr));
                } else {
                    self.emit(format!("movabsq\t$0x{:X}, %rax", f.to_bits()));
                    self.emit(format!("movq\t%rax, {}", addr));
                }
            }
        }
    }

    // -- literals --

    fn lower_str(
        &mut self,
        text: &str,
        span: Span,
        need_imm: bool,
    ) -> Result<Value, CodegenError> {
        if need_imm {
            return Err(CodegenError::new(
                CodegenErrorKind::NotConstant,
                "a string is not a numeric constant",
                span,
            ));
        }
        let label = self.intern_string(text);
        self.emit(format!("leaq\t{}(%rip), %rax", label));
        Ok(Value::reg(Type::Pointer(Box::new(Type::Number(
            NumberType::I8,
        )))))
    }

    // -- declarations --

    /// Allocates a local slot, optionally storing an initial value.
    fn declare_local(
        &mut self,
        name: &str,
        ty: &Type,
        mutable: bool,
        span: Span,
        value: Option<Value>,
    ) -> Result<Value, CodegenError> {
        let machine = machine_type(ty).ok_or_else(|| {
            CodegenError::new(
                CodegenErrorKind::Unsupported,
                format!("a local of type '{}' is not supported", ty),
                span,
            )
        })?;
        let value = match value {
            Some(v) => Some(self.coerce(v, ty, span)?),
            None => None,
        };
        let offset = self.frame_mut().alloc(name, ty.clone(), mutable, span)?;

        match &value {
            None => self.emit("subq\t$8, %rsp"),
            Some(v) => match v.operand {
                Operand::Reg if machine.is_float() => {
                    self.emit("subq\t$8, %rsp");
                    self.emit(format!("{}\t%xmm0, -{}(%rbp)", fmov(machine), offset));
                }
                Operand::Reg => self.emit("pushq\t%rax"),
                Operand::Imm(_) => {
                    self.emit("subq\t$8, %rsp");
                    let addr = format!("-{}(%rbp)", offset);
                    self.store_to(&addr, machine, &v.operand);
                }
            },
        }

        match value {
            Some(v) => Ok(v),
            None => Ok(Value::void()),
        }
    }

    // -- assignment --

    fn lower_assign(
        &mut self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        need_imm: bool,
        span: Span,
    ) -> Result<Value, CodegenError> {
        if need_imm {
            return Err(CodegenError::new(
                CodegenErrorKind::NotConstant,
                "an assignment is not a compile-time constant",
                span,
            ));
        }
        // Read-modify-write forms lower as the binary operation followed
        // by the plain store.
        let computed = match op.binary() {
            Some(binary) => {
                let combined = Expr::new(
                    ExprKind::Binary {
                        op: binary,
                        lhs: Box::new(target.clone()),
                        rhs: Box::new(value.clone()),
                    },
                    span,
                );
                self.lower_expr(&combined, false)?
            }
            None => self.lower_expr(value, false)?,
        };
        self.assign_into(target, computed)
    }

    /// Second entry point of the assignment protocol: writes an already
    /// computed value into the target expression.
    fn assign_into(&mut self, target: &Expr, value: Value) -> Result<Value, CodegenError> {
        match &target.kind {
            ExprKind::Name(name) => self.store_name(name, target.span, value),
            ExprKind::Declaration { mutable, ty, name } => {
                self.declare_local(name, ty, *mutable, target.span, Some(value))
            }
            _ => Err(CodegenError::new(
                CodegenErrorKind::Unsupported,
                "cannot assign to this expression",
                target.span,
            )),
        }
    }

    // -- operators --

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        need_imm: bool,
        span: Span,
    ) -> Result<Value, CodegenError> {
        let left = self.lower_expr(lhs, need_imm)?;
        let left_ty = left.ty.as_number().ok_or_else(|| {
            CodegenError::new(
                CodegenErrorKind::TypeMismatch,
                format!("operator '{}' requires numeric operands", op.text()),
                lhs.span,
            )
        })?;
        let spilled = match left.operand {
            Operand::Reg => Some(self.spill(left_ty)),
            Operand::Imm(_) => None,
        };

        let right = self.lower_expr(rhs, need_imm)?;
        let right_ty = right.ty.as_number().ok_or_else(|| {
            CodegenError::new(
                CodegenErrorKind::TypeMismatch,
                format!("operator '{}' requires numeric operands", op.text()),
                rhs.span,
            )
        })?;

        let result_ty = NumberType::wider(left_ty, right_ty);

        if let (Operand::Imm(li), Operand::Imm(ri)) = (&left.operand, &right.operand) {
            let folded = self.fold(op, *li, *ri, result_ty, span)?;
            return Ok(Value::imm(Type::Number(result_ty), folded));
        }
        if need_imm {
            return Err(CodegenError::new(
                CodegenErrorKind::NotConstant,
                "expression does not fold to a constant",
                span,
            ));
        }

        // Right operand into %rcx/%xmm1, as the result type.
        match right.operand {
            Operand::Reg => {
                self.convert_reg(right_ty, result_ty, Slot::A);
                if result_ty.is_float() {
                    self.emit(format!("{}\t%xmm0, %xmm1", fmov(result_ty)));
                } else {
                    self.emit("movq\t%rax, %rcx");
                }
            }
            Operand::Imm(imm) => {
                let imm = self.convert_imm(imm, right_ty, result_ty, rhs.span);
                self.load_imm(imm, result_ty, Slot::C);
            }
        }

        // Left operand back into %rax/%xmm0, as the result type.
        match spilled {
            Some(temp) => {
                self.unspill(&temp, left_ty);
                self.convert_reg(left_ty, result_ty, Slot::A);
            }
            None => {
                let Operand::Imm(imm) = left.operand else {
                    unreachable!("register left operands are spilled");
                };
                let imm = self.convert_imm(imm, left_ty, result_ty, lhs.span);
                self.load_imm(imm, result_ty, Slot::A);
            }
        }

        self.emit_binop(op, result_ty);
        Ok(Value::reg(Type::Number(result_ty)))
    }

    /// Folds a binary operation over two immediates, wrapping with a
    /// warning on overflow.
    fn fold(
        &mut self,
        op: BinaryOp,
        left: Imm,
        right: Imm,
        result_ty: NumberType,
        span: Span,
    ) -> Result<Imm, CodegenError> {
        if result_ty.is_float() {
            let a = imm_as_f64(left);
            let b = imm_as_f64(right);
            let value = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
            };
            let value = if result_ty == NumberType::Float {
                value as f32 as f64
            } else {
                value
            };
            return Ok(Imm::Float(value));
        }

        let a = imm_as_int(left);
        let b = imm_as_int(right);
        if op == BinaryOp::Div && b == 0 {
            return Err(CodegenError::new(
                CodegenErrorKind::DivisionByZero,
                "division by zero in a constant expression",
                span,
            ));
        }
        let wide = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        };
        if int_fits(result_ty, wide) {
            Ok(Imm::Int(wide))
        } else {
            let wrapped = int_wrap(result_ty, wide);
            self.warn(
                format!(
                    "arithmetic overflow: {} {} {} wraps to {} in {}",
                    a,
                    op.text(),
                    b,
                    wrapped,
                    result_ty
                ),
                span,
            );
            Ok(Imm::Int(wrapped))
        }
    }

    /// Emits the operation over `%rcx`/`%xmm1` into `%rax`/`%xmm0`.
    fn emit_binop(&mut self, op: BinaryOp, ty: NumberType) {
        if ty.is_float() {
            let sfx = if ty == NumberType::Float { "ss" } else { "sd" };
            let mnemonic = match op {
                BinaryOp::Add => "add",
                BinaryOp::Sub => "sub",
                BinaryOp::Mul => "mul",
                BinaryOp::Div => "div",
            };
            self.emit(format!("{}{}\t%xmm1, %xmm0", mnemonic, sfx));
            return;
        }

        let size = ty.size();
        let sfx = suffix(size);
        match op {
            BinaryOp::Add => self.emit(format!(
                "add{}\t{}, {}",
                sfx,
                gp(Slot::C, size),
                gp(Slot::A, size)
            )),
            BinaryOp::Sub => self.emit(format!(
                "sub{}\t{}, {}",
                sfx,
                gp(Slot::C, size),
                gp(Slot::A, size)
            )),
            BinaryOp::Mul => {
                if size == 1 {
                    // Byte multiply is one-operand; the result's low byte
                    // lands in %al.
                    if ty.is_signed() {
                        self.emit("imulb\t%cl");
                    } else {
                        self.emit("mulb\t%cl");
                    }
                } else {
                    self.emit(format!(
                        "imul{}\t{}, {}",
                        sfx,
                        gp(Slot::C, size),
                        gp(Slot::A, size)
                    ));
                }
            }
            BinaryOp::Div => {
                if ty.is_signed() {
                    match size {
                        8 => self.emit("cqto"),
                        4 => self.emit("cltd"),
                        2 => self.emit("cwtd"),
                        _ => self.emit("cbtw"),
                    }
                    self.emit(format!("idiv{}\t{}", sfx, gp(Slot::C, size)));
                } else if size == 1 {
                    self.emit("movzbw\t%al, %ax");
                    self.emit("divb\t%cl");
                } else {
                    self.emit("xorl\t%edx, %edx");
                    self.emit(format!("div{}\t{}", sfx, gp(Slot::C, size)));
                }
            }
        }
    }

    fn lower_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        need_imm: bool,
        span: Span,
    ) -> Result<Value, CodegenError> {
        match op {
            UnaryOp::Deref => Err(CodegenError::new(
                CodegenErrorKind::Unsupported,
                "pointer dereference has no lowering",
                span,
            )),
            UnaryOp::Neg => {
                let value = self.lower_expr(operand, need_imm)?;
                let ty = value.ty.as_number().ok_or_else(|| {
                    CodegenError::new(
                        CodegenErrorKind::TypeMismatch,
                        "unary '-' requires a numeric operand",
                        operand.span,
                    )
                })?;
                match value.operand {
                    Operand::Imm(Imm::Float(f)) => {
                        Ok(Value::imm(Type::Number(ty), Imm::Float(-f)))
                    }
                    Operand::Imm(Imm::Int(v)) => {
                        let negated = -v;
                        if int_fits(ty, negated) {
                            Ok(Value::imm(Type::Number(ty), Imm::Int(negated)))
                        } else {
                            let wrapped = int_wrap(ty, negated);
                            self.warn(
                                format!(
                                    "arithmetic overflow: -{} wraps to {} in {}",
                                    v, wrapped, ty
                                ),
                                span,
                            );
                            Ok(Value::imm(Type::Number(ty), Imm::Int(wrapped)))
                        }
                    }
                    Operand::Reg if ty.is_float() => {
                        let sfx = if ty == NumberType::Float { "ss" } else { "sd" };
                        self.emit(format!("{}\t%xmm0, %xmm1", fmov(ty)));
                        self.emit("pxor\t%xmm0, %xmm0");
                        self.emit(format!("sub{}\t%xmm1, %xmm0", sfx));
                        Ok(Value::reg(Type::Number(ty)))
                    }
                    Operand::Reg => {
                        let size = ty.size();
                        self.emit(format!("neg{}\t{}", suffix(size), gp(Slot::A, size)));
                        Ok(Value::reg(Type::Number(ty)))
                    }
                }
            }
        }
    }

    // -- calls --

    fn lower_call(
        &mut self,
        target: &Expr,
        args: &[Expr],
        need_imm: bool,
        span: Span,
    ) -> Result<Value, CodegenError> {
        if need_imm {
            return Err(CodegenError::new(
                CodegenErrorKind::NotConstant,
                "a call is not a compile-time constant",
                span,
            ));
        }
        let ExprKind::Name(name) = &target.kind else {
            return Err(CodegenError::new(
                CodegenErrorKind::Unsupported,
                "only direct calls to named functions are supported",
                target.span,
            ));
        };
        let Some(function) = self.unit().function(name) else {
            return Err(CodegenError::new(
                CodegenErrorKind::InvalidCall,
                format!("'{}' is not a function", name),
                target.span,
            ));
        };
        if function.params.len() != args.len() {
            return Err(CodegenError::new(
                CodegenErrorKind::InvalidCall,
                format!(
                    "'{}' takes {} argument(s), {} given",
                    name,
                    function.params.len(),
                    args.len()
                ),
                span,
            ));
        }
        let name = name.clone();
        let ret = function.ret.clone();
        let param_types: Vec<Type> = function.params.iter().map(|p| p.ty.clone()).collect();
        let regs = assign_arg_registers(&param_types, span)?;

        // Evaluate left to right; register results spill to stack temps
        // so later arguments cannot clobber them.
        enum Staged {
            Spilled(String, NumberType),
            Immediate(Imm, NumberType),
        }
        let mut staged = Vec::with_capacity(args.len());
        for (arg, ty) in args.iter().zip(&param_types) {
            let value = self.lower_expr(arg, false)?;
            let value = self.coerce(value, ty, arg.span)?;
            let machine = machine_type(ty)
                .unwrap_or_else(|| unreachable!("argument registers exist only for scalars"));
            match value.operand {
                Operand::Reg => {
                    let temp = self.spill(machine);
                    staged.push(Staged::Spilled(temp, machine));
                }
                Operand::Imm(imm) => staged.push(Staged::Immediate(imm, machine)),
            }
        }

        // Unspill into the argument registers, last argument first.
        for (stage, reg) in staged.iter().zip(&regs).rev() {
            let Staged::Spilled(temp, machine) = stage else {
                continue;
            };
            match reg {
                ArgReg::Gp(i) => {
                    self.emit(format!("popq\t{}", Self::gp_arg_64(*i)));
                    self.frame_mut().free_temp(temp);
                }
                ArgReg::Xmm(i) => {
                    let offset = self
                        .frame()
                        .lookup(temp)
                        .unwrap_or_else(|| unreachable!("spill temps stay allocated"))
                        .offset;
                    self.emit(format!("{}\t-{}(%rbp), %xmm{}", fmov(*machine), offset, i));
                    self.emit("addq\t$8, %rsp");
                    self.frame_mut().free_temp(temp);
                }
            }
        }

        // Immediates go straight into their registers.
        for (stage, reg) in staged.iter().zip(&regs) {
            let Staged::Immediate(imm, machine) = stage else {
                continue;
            };
            match (reg, imm) {
                (ArgReg::Gp(i), Imm::Int(v)) => {
                    if machine.size() <= 4 {
                        self.emit(format!(
                            "movl\t${}, {}",
                            data::format_int(*machine, *v),
                            Self::gp_arg_32(*i)
                        ));
                    } else if (-(1i128 << 31)..(1i128 << 31)).contains(v) {
                        self.emit(format!("movq\t${}, {}", v, Self::gp_arg_64(*i)));
                    } else {
                        self.emit(format!(
                            "movabsq\t${}, {}",
                            data::format_int(*machine, *v),
                            Self::gp_arg_64(*i)
                        ));
                    }
                }
                (ArgReg::Xmm(i), imm) => {
                    let f = imm_as_f64(*imm);
                    if *machine == NumberType::Float {
                        self.emit(format!("movl\t$0x{:X}, %eax", (f as f32).to_bits()));
                        self.emit(format!("movd\t%eax, %xmm{}", i));
                    } else {
                        self.emit(format!("movabsq\t$0x{:X}, %rax", f.to_bits()));
                        self.emit(format!("movq\t%rax, %xmm{}", i));
                    }
                }
                (ArgReg::Gp(_), Imm::Float(_)) => {
                    // Coercion to an integer parameter type already
                    // produced an integer immediate.
                    unreachable!("float immediate staged for an integer register");
                }
            }
        }

        self.emit(format!("call\t{}", name));

        if ret == Type::Void {
            Ok(Value::void())
        } else if machine_type(&ret).is_some() {
            Ok(Value::reg(ret))
        } else {
            Err(CodegenError::new(
                CodegenErrorKind::Unsupported,
                format!("calls returning '{}' are not supported", ret),
                span,
            ))
        }
    }

    // -- return --

    fn lower_return(
        &mut self,
        value: Option<&Expr>,
        span: Span,
    ) -> Result<Value, CodegenError> {
        let ret = self.frame().ret.clone();
        match value {
            None => {
                if ret != Type::Void {
                    return Err(CodegenError::new(
                        CodegenErrorKind::InvalidReturn,
                        format!("this function returns '{}', 'return' needs a value", ret),
                        span,
                    ));
                }
            }
            Some(expr) => {
                if ret == Type::Void {
                    return Err(CodegenError::new(
                        CodegenErrorKind::InvalidReturn,
                        "a void function cannot return a value",
                        span,
                    ));
                }
                let value = self.lower_expr(expr, false)?;
                let value = self.coerce(value, &ret, expr.span)?;
                let machine = machine_type(&ret).ok_or_else(|| {
                    CodegenError::new(
                        CodegenErrorKind::InvalidReturn,
                        format!("returning '{}' is not supported", ret),
                        span,
                    )
                })?;
                if let Operand::Imm(imm) = value.operand {
                    self.load_imm(imm, machine, Slot::A);
                }
            }
        }

        if self.frame().stack_delta() != 0 {
            self.emit("movq\t%rbp, %rsp");
        }
        self.emit("popq\t%rbp");
        self.emit("ret");
        Ok(Value::void())
    }

    // -- scopes --

    fn lower_scope(&mut self, body: &[Expr]) -> Result<Value, CodegenError> {
        self.frame_mut().open_scope();
        for statement in body {
            self.lower_expr(statement, false)?;
        }
        let freed = self.frame_mut().close_scope();
        if freed > 0 {
            self.emit(format!("addq\t${}, %rsp", freed));
        }
        Ok(Value::void())
    }

    // -- spills --

    /// Spills the register value of type `ty` to an anonymous stack
    /// slot.
    fn spill(&mut self, ty: NumberType) -> String {
        let (name, offset) = self.frame_mut().alloc_temp(Type::Number(ty));
        if ty.is_float() {
            self.emit("subq\t$8, %rsp");
            self.emit(format!("{}\t%xmm0, -{}(%rbp)", fmov(ty), offset));
        } else {
            self.emit("pushq\t%rax");
        }
        name
    }

    /// Reloads a spilled value into the canonical register and frees the
    /// slot.
    fn unspill(&mut self, name: &str, ty: NumberType) {
        if ty.is_float() {
            let offset = self
                .frame()
                .lookup(name)
                .unwrap_or_else(|| unreachable!("spill temps stay allocated"))
                .offset;
            self.emit(format!("{}\t-{}(%rbp), %xmm0", fmov(ty), offset));
            self.emit("addq\t$8, %rsp");
        } else {
            self.emit("popq\t%rax");
        }
        self.frame_mut().free_temp(name);
    }

    // -- conversions --

    /// Converts `value` to `target`, emitting register conversions or
    /// folding immediate ones.
    pub(super) fn coerce(
        &mut self,
        value: Value,
        target: &Type,
        span: Span,
    ) -> Result<Value, CodegenError> {
        if value.ty == *target {
            return Ok(value);
        }

        match (&value.ty, target) {
            // Distinct pointer types do not convert implicitly.
            (Type::Pointer(_), Type::Pointer(_)) => Err(mismatch(&value.ty, target, span)),
            // Integers flow into pointer slots (null and address
            // constants).
            (Type::Number(from), Type::Pointer(_)) if from.is_integer() => {
                let machine = NumberType::U64;
                let operand = match value.operand {
                    Operand::Imm(imm) => {
                        Operand::Imm(self.convert_imm(imm, *from, machine, span))
                    }
                    Operand::Reg => {
                        self.convert_reg(*from, machine, Slot::A);
                        Operand::Reg
                    }
                };
                Ok(Value {
                    ty: target.clone(),
                    operand,
                })
            }
            (Type::Number(from), Type::Number(to)) => {
                let operand = match value.operand {
                    Operand::Imm(imm) => Operand::Imm(self.convert_imm(imm, *from, *to, span)),
                    Operand::Reg => {
                        self.convert_reg(*from, *to, Slot::A);
                        Operand::Reg
                    }
                };
                Ok(Value {
                    ty: target.clone(),
                    operand,
                })
            }
            _ => Err(mismatch(&value.ty, target, span)),
        }
    }

    /// Converts an immediate between numeric types, warning when the
    /// conversion loses information.
    fn convert_imm(&mut self, imm: Imm, _from: NumberType, to: NumberType, span: Span) -> Imm {
        if to.is_float() {
            let f = imm_as_f64(imm);
            let f = if to == NumberType::Float {
                f as f32 as f64
            } else {
                f
            };
            return Imm::Float(f);
        }

        let value = match imm {
            Imm::Int(v) => v,
            Imm::Float(f) => {
                let truncated = f.trunc();
                if truncated != f {
                    self.warn(
                        format!("conversion of {} to {} drops the fraction", f, to),
                        span,
                    );
                }
                truncated as i128
            }
        };
        if int_fits(to, value) {
            Imm::Int(value)
        } else {
            let wrapped = int_wrap(to, value);
            self.warn(
                format!("value {} does not fit {}, wrapping to {}", value, to, wrapped),
                span,
            );
            Imm::Int(wrapped)
        }
    }

    /// Converts the register value of a slot between numeric types.
    fn convert_reg(&mut self, from: NumberType, to: NumberType, slot: Slot) {
        if from == to {
            return;
        }
        match (from.is_float(), to.is_float()) {
            (false, false) => self.widen_int(from, to, slot),
            (true, true) => {
                if to == NumberType::Double {
                    self.emit(format!("cvtss2sd\t{}, {}", xmm(slot), xmm(slot)));
                } else {
                    self.emit(format!("cvtsd2ss\t{}, {}", xmm(slot), xmm(slot)));
                }
            }
            (false, true) => {
                // Widen small integers first so the convert sees a full
                // register.
                let widened = if from.size() < 4 {
                    let wide = if from.is_signed() {
                        NumberType::I32
                    } else {
                        NumberType::U32
                    };
                    self.widen_int(from, wide, slot);
                    wide
                } else {
                    from
                };
                let mnemonic = if to == NumberType::Float {
                    "cvtsi2ss"
                } else {
                    "cvtsi2sd"
                };
                if widened.size() == 8 || !widened.is_signed() {
                    // Unsigned 32-bit zero-extends into the full
                    // register; 64-bit sources use the quad form.
                    if widened.size() == 4 {
                        self.emit(format!(
                            "movl\t{}, {}",
                            gp(slot, 4),
                            gp(slot, 4)
                        ));
                    }
                    self.emit(format!("{}q\t{}, {}", mnemonic, gp(slot, 8), xmm(slot)));
                } else {
                    self.emit(format!("{}\t{}, {}", mnemonic, gp(slot, 4), xmm(slot)));
                }
            }
            (true, false) => {
                let mnemonic = if from == NumberType::Float {
                    "cvttss2si"
                } else {
                    "cvttsd2si"
                };
                let size = if to.size() == 8 { 8 } else { 4 };
                self.emit(format!("{}\t{}, {}", mnemonic, xmm(slot), gp(slot, size)));
            }
        }
    }

    /// Widening integer conversion; narrowing needs no instruction.
    fn widen_int(&mut self, from: NumberType, to: NumberType, slot: Slot) {
        if to.size() <= from.size() {
            return;
        }
        let target_size = to.size();
        match (from.size(), from.is_signed()) {
            (1, true) => self.emit(format!(
                "movsb{}\t{}, {}",
                suffix(target_size),
                gp(slot, 1),
                gp(slot, target_size)
            )),
            (1, false) => self.emit(format!(
                "movzb{}\t{}, {}",
                suffix(target_size),
                gp(slot, 1),
                gp(slot, target_size)
            )),
            (2, true) => self.emit(format!(
                "movsw{}\t{}, {}",
                suffix(target_size),
                gp(slot, 2),
                gp(slot, target_size)
            )),
            (2, false) => self.emit(format!(
                "movzw{}\t{}, {}",
                suffix(target_size),
                gp(slot, 2),
                gp(slot, target_size)
            )),
            (4, true) => self.emit(format!("movslq\t{}, {}", gp(slot, 4), gp(slot, 8))),
            // A 32-bit move zero-extends into the full register.
            (4, false) => self.emit(format!("movl\t{}, {}", gp(slot, 4), gp(slot, 4))),
            _ => unreachable!("nothing widens from 8 bytes"),
        }
    }

    /// Materializes an immediate into a register slot.
    fn load_imm(&mut self, imm: Imm, ty: NumberType, slot: Slot) {
        match imm {
            Imm::Int(v) => {
                if ty.size() <= 4 {
                    self.emit(format!(
                        "mov{}\t${}, {}",
                        suffix(ty.size()),
                        data::format_int(ty, v),
                        gp(slot, ty.size())
                    ));
                } else if (-(1i128 << 31)..(1i128 << 31)).contains(&v) {
                    self.emit(format!("movq\t${}, {}", v, gp(slot, 8)));
                } else {
                    self.emit(format!(
                        "movabsq\t${}, {}",
                        data::format_int(ty, v),
                        gp(slot, 8)
                    ));
                }
            }
            Imm::Float(f) => {
                if ty == NumberType::Float {
                    self.emit(format!("movl\t$0x{:X}, {}", (f as f32).to_bits(), gp(slot, 4)));
                    self.emit(format!("movd\t{}, {}", gp(slot, 4), xmm(slot)));
                } else {
                    self.emit(format!("movabsq\t$0x{:X}, {}", f.to_bits(), gp(slot, 8)));
                    self.emit(format!("movq\t{}, {}", gp(slot, 8), xmm(slot)));
                }
            }
        }
    }

}

/// Builds the incompatible-conversion error.
fn mismatch(from: &Type, to: &Type, span: Span) -> CodegenError {
    CodegenError::new(
        CodegenErrorKind::TypeMismatch,
        format!("cannot convert '{}' to '{}'", from, to),
        span,
    )
}

/// Parses a numeric literal into an immediate.
///
/// Integer literals take the first of `i32`, `i64`, `u64` they fit;
/// literals with a `.` are `double`.
fn lower_number(text: &str, span: Span) -> Result<Value, CodegenError> {
    if text.contains('.') {
        let value: f64 = text.parse().map_err(|_| {
            CodegenError::new(
                CodegenErrorKind::InvalidNumber,
                format!("cannot parse number '{}'", text),
                span,
            )
        })?;
        return Ok(Value::imm(
            Type::Number(NumberType::Double),
            Imm::Float(value),
        ));
    }
    let value: i128 = text.parse().map_err(|_| {
        CodegenError::new(
            CodegenErrorKind::InvalidNumber,
            format!("cannot parse number '{}'", text),
            span,
        )
    })?;
    let ty = if int_fits(NumberType::I32, value) {
        NumberType::I32
    } else if int_fits(NumberType::I64, value) {
        NumberType::I64
    } else if int_fits(NumberType::U64, value) {
        NumberType::U64
    } else {
        return Err(CodegenError::new(
            CodegenErrorKind::InvalidNumber,
            format!("number '{}' is too large for any numeric type", text),
            span,
        ));
    };
    Ok(Value::imm(Type::Number(ty), Imm::Int(value)))
}

fn imm_as_f64(imm: Imm) -> f64 {
    match imm {
        Imm::Int(v) => v as f64,
        Imm::Float(f) => f,
    }
}

fn imm_as_int(imm: Imm) -> i128 {
    match imm {
        Imm::Int(v) => v,
        Imm::Float(f) => f as i128,
    }
}
