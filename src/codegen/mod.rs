//! x86-64 assembly generation for the Tern programming language.
//!
//! This module turns a validated [`Unit`] into GNU-assembler (AT&T)
//! text targeting the System V calling convention. The output has a
//! fixed structure: a `.file` line, the data items for every initialized
//! global (with string literals interned into `.rodata` under `.LC<n>`
//! labels), one text section per defined function, and an
//! `.ident`/GNU-stack footer.
//!
//! # Function frames
//!
//! Every function gets the standard `pushq %rbp; movq %rsp, %rbp`
//! prologue and `popq %rbp; ret` epilogue, wrapped in
//! `.cfi_startproc`/`.cfi_endproc` with unique `.LFB<n>`/`.LFE<n>`
//! labels. Locals are 8-byte stack slots managed by [`frame`] in strict
//! LIFO order; closing a function asserts the stack delta is back at
//! zero.
//!
//! # Expression protocol
//!
//! Expressions lower to either an immediate value or "the value is in
//! the canonical register" (`%rax` for integers and pointers, `%xmm0`
//! for floats); see [`expr`]. Global initializers are lowered with the
//! immediate requirement set and fold at generation time.
//!
//! # Module Structure
//!
//! - [`error`] - Error and warning types
//! - `data` - Data item directives and value formatting
//! - `frame` - Per-function stack bookkeeping
//! - `expr` - Expression lowering
//! - `tests` - Unit tests (test-only)

mod data;
pub mod error;
mod expr;
mod frame;

#[cfg(test)]
mod tests;

pub use error::{CodegenError, CodegenErrorKind, Warning};

use std::path::Path;

use crate::ast::{Function, Type};
use crate::semantic::{TypeContext, Unit};
use data::DataKind;
use expr::{Imm, Operand, machine_type};
use frame::Frame;

/// The integer argument registers, in System V order.
const GP_ARG_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];
/// 32-bit names of the integer argument registers.
const GP_ARG_REGS_32: [&str; 6] = ["%edi", "%esi", "%edx", "%ecx", "%r8d", "%r9d"];
/// Number of xmm argument registers (`%xmm0` through `%xmm7`).
const XMM_ARG_COUNT: usize = 8;

/// The register an argument travels in.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ArgReg {
    /// Index into [`GP_ARG_REGS`].
    Gp(usize),
    /// `%xmm<n>`.
    Xmm(usize),
}

/// Generates the assembly for `unit`.
///
/// Returns the assembly text and the warnings produced while folding
/// constants.
///
/// # Errors
///
/// Returns the first [`CodegenError`]: non-constant global initializers,
/// writes to constants, unknown names, call or return mismatches, and
/// constructs without a lowering.
pub fn generate(
    unit: &Unit,
    context: &TypeContext,
    source_name: &str,
) -> Result<(String, Vec<Warning>), CodegenError> {
    let mut codegen = Codegen {
        unit,
        context,
        data: String::new(),
        text: String::new(),
        warnings: Vec::new(),
        lc_counter: 0,
        fn_counter: 0,
        frame: None,
    };

    codegen.emit_globals()?;
    codegen.emit_functions()?;

    let basename = Path::new(source_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_name.to_string());

    let mut out = String::new();
    out.push_str(&format!("\t.file\t\"{}\"\n", basename));
    out.push_str(&codegen.data);
    out.push_str(&codegen.text);
    out.push_str("\t.ident\t\"tern\"\n");
    out.push_str("\t.section\t.note.GNU-stack,\"\",@progbits\n");
    Ok((out, codegen.warnings))
}

/// Assigns System V argument registers to a parameter type list.
pub(crate) fn assign_arg_registers(
    types: &[Type],
    span: crate::token::Span,
) -> Result<Vec<ArgReg>, CodegenError> {
    let mut gp = 0;
    let mut xmm = 0;
    let mut regs = Vec::with_capacity(types.len());
    for ty in types {
        let machine = machine_type(ty).ok_or_else(|| {
            CodegenError::new(
                CodegenErrorKind::Unsupported,
                format!("type '{}' cannot be passed in a register", ty),
                span,
            )
        })?;
        if machine.is_float() {
            if xmm >= XMM_ARG_COUNT {
                return Err(CodegenError::new(
                    CodegenErrorKind::InvalidCall,
                    "too many floating-point arguments for the register convention",
                    span,
                ));
            }
            regs.push(ArgReg::Xmm(xmm));
            xmm += 1;
        } else {
            if gp >= GP_ARG_REGS.len() {
                return Err(CodegenError::new(
                    CodegenErrorKind::InvalidCall,
                    "too many arguments for the register convention",
                    span,
                ));
            }
            regs.push(ArgReg::Gp(gp));
            gp += 1;
        }
    }
    Ok(regs)
}

/// The code generator: the assembly accumulators plus the open function
/// frame.
pub(crate) struct Codegen<'a> {
    unit: &'a Unit,
    context: &'a TypeContext,
    /// Data-section text (globals and interned strings).
    data: String,
    /// Text-section output.
    text: String,
    warnings: Vec<Warning>,
    lc_counter: usize,
    fn_counter: usize,
    frame: Option<Frame>,
}

impl<'a> Codegen<'a> {
    // -- shared emission helpers --

    /// Emits one instruction or directive line into the text section.
    pub(crate) fn emit(&mut self, line: impl AsRef<str>) {
        self.text.push('\t');
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    fn emit_label(&mut self, label: &str) {
        self.text.push_str(label);
        self.text.push_str(":\n");
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>, span: crate::token::Span) {
        self.warnings.push(Warning::new(message, span));
    }

    pub(crate) fn unit(&self) -> &'a Unit {
        self.unit
    }

    pub(crate) fn frame(&self) -> &Frame {
        self.frame
            .as_ref()
            .unwrap_or_else(|| unreachable!("no open function frame"))
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        self.frame
            .as_mut()
            .unwrap_or_else(|| unreachable!("no open function frame"))
    }

    /// Interns a string literal into `.rodata` and returns its label.
    pub(crate) fn intern_string(&mut self, value: &str) -> String {
        let label = format!(".LC{}", self.lc_counter);
        self.lc_counter += 1;
        self.data.push_str("\t.section\t.rodata\n");
        self.data.push_str(&format!("{}:\n", label));
        self.data.push_str(&format!(
            "\t{}\t\"{}\"\n",
            DataKind::Str.directive(),
            data::escape_string(value)
        ));
        label
    }

    // -- globals --

    fn emit_globals(&mut self) -> Result<(), CodegenError> {
        let globals: Vec<String> = self
            .unit
            .defined_globals()
            .map(|g| g.name.clone())
            .collect();
        for name in globals {
            self.emit_global(&name)?;
        }
        Ok(())
    }

    fn emit_global(&mut self, name: &str) -> Result<(), CodegenError> {
        let global = self
            .unit
            .global(name)
            .unwrap_or_else(|| unreachable!("defined global is registered"));
        let Some(init) = global.init.clone() else {
            return Ok(());
        };
        let ty = global.ty.clone();
        let span = global.span;

        // A string initializer becomes a `.rodata` item plus a pointer
        // to it.
        if let crate::ast::ExprKind::Str(text) = &init.kind {
            if !matches!(ty, Type::Pointer(_)) {
                return Err(CodegenError::new(
                    CodegenErrorKind::TypeMismatch,
                    format!("a string initializer requires a pointer type, not '{}'", ty),
                    init.span,
                ));
            }
            let label = self.intern_string(text);
            self.emit_data_item(name, &ty, DataKind::Pointer, &label);
            return Ok(());
        }

        let kind = DataKind::for_type(&ty).ok_or_else(|| {
            CodegenError::new(
                CodegenErrorKind::Unsupported,
                format!("a global of type '{}' cannot be emitted", ty),
                span,
            )
        })?;
        let machine = machine_type(&ty)
            .unwrap_or_else(|| unreachable!("data kinds exist only for scalars"));

        let value = self.lower_expr(&init, true)?;
        let value = self.coerce(value, &ty, init.span)?;
        let Operand::Imm(imm) = value.operand else {
            unreachable!("immediate lowering produced a register value");
        };
        let rendered = match imm {
            Imm::Int(v) => data::format_int(machine, v),
            Imm::Float(f) => data::format_float(machine, f),
        };
        self.emit_data_item(name, &ty, kind, &rendered);
        Ok(())
    }

    fn emit_data_item(&mut self, name: &str, ty: &Type, kind: DataKind, value: &str) {
        let size = self
            .context
            .size_of(ty)
            .or(kind.size())
            .unwrap_or_else(|| unreachable!("scalar globals are sized"));
        self.data.push_str(&format!("\t.globl\t{}\n", name));
        self.data.push_str("\t.data\n");
        if kind.align() > 1 {
            self.data.push_str(&format!("\t.align {}\n", kind.align()));
        }
        self.data.push_str(&format!("\t.type\t{}, @object\n", name));
        self.data.push_str(&format!("\t.size\t{}, {}\n", name, size));
        self.data.push_str(&format!("{}:\n", name));
        self.data
            .push_str(&format!("\t{}\t{}\n", kind.directive(), value));
    }

    // -- functions --

    fn emit_functions(&mut self) -> Result<(), CodegenError> {
        let names: Vec<String> = self
            .unit
            .functions()
            .filter(|f| f.body.is_some())
            .map(|f| f.name.clone())
            .collect();
        for name in names {
            self.emit_function(&name)?;
        }
        Ok(())
    }

    fn emit_function(&mut self, name: &str) -> Result<(), CodegenError> {
        assert!(
            self.frame.is_none(),
            "a function frame is already open"
        );
        let function = self
            .unit
            .function(name)
            .unwrap_or_else(|| unreachable!("emitted functions are registered"))
            .clone();
        self.frame = Some(Frame::new(self.fn_counter, function.ret.clone()));
        self.fn_counter += 1;
        let id = self.frame().id;

        self.emit(".text");
        self.emit(format!(".globl\t{}", name));
        self.emit(format!(".type\t{}, @function", name));
        self.emit_label(name);
        self.emit_label(&format!(".LFB{}", id));
        self.emit(".cfi_startproc");
        self.emit("pushq\t%rbp");
        self.emit("movq\t%rsp, %rbp");

        self.spill_parameters(&function)?;

        let body = function
            .body
            .as_ref()
            .unwrap_or_else(|| unreachable!("only defined functions are emitted"));
        self.lower_expr(body, false)?;

        let freed = self.frame_mut().close_scope();
        if freed > 0 {
            self.emit(format!("addq\t${}, %rsp", freed));
        }
        self.frame
            .take()
            .unwrap_or_else(|| unreachable!("frame opened above"))
            .finish();

        self.emit("popq\t%rbp");
        self.emit("ret");
        self.emit(".cfi_endproc");
        self.emit_label(&format!(".LFE{}", id));
        self.emit(format!(".size\t{}, .-{}", name, name));
        Ok(())
    }

    /// Stores the incoming argument registers into the parameters' local
    /// slots.
    fn spill_parameters(&mut self, function: &Function) -> Result<(), CodegenError> {
        let types: Vec<Type> = function.params.iter().map(|p| p.ty.clone()).collect();
        let regs = assign_arg_registers(&types, function.span)?;
        for (param, reg) in function.params.iter().zip(regs) {
            let offset = self.frame_mut().alloc(
                &param.name,
                param.ty.clone(),
                param.mutable,
                param.span,
            )?;
            match reg {
                ArgReg::Gp(i) => self.emit(format!("pushq\t{}", GP_ARG_REGS[i])),
                ArgReg::Xmm(i) => {
                    self.emit("subq\t$8, %rsp");
                    self.emit(format!("movsd\t%xmm{}, -{}(%rbp)", i, offset));
                }
            }
        }
        Ok(())
    }

    /// Returns the 32-bit name of an integer argument register.
    pub(crate) fn gp_arg_32(index: usize) -> &'static str {
        GP_ARG_REGS_32[index]
    }

    /// Returns the 64-bit name of an integer argument register.
    pub(crate) fn gp_arg_64(index: usize) -> &'static str {
        GP_ARG_REGS[index]
    }
}
