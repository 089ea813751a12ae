//! Per-function stack frame bookkeeping.
//!
//! Locals live in 8-byte slots below `%rbp`, allocated and released in
//! strict LIFO order. The frame tracks the running `%rbp` delta, the
//! allocation stack, and the scope stack; the actual `pushq`/`subq`/
//! `addq` instructions are emitted by the caller. Violating the LIFO
//! discipline or closing a function with a non-zero delta is a compiler
//! bug and asserts.

use std::collections::HashMap;

use super::error::{CodegenError, CodegenErrorKind};
use crate::ast::Type;
use crate::token::Span;

/// A named local slot.
#[derive(Debug, Clone)]
pub(super) struct Local {
    /// Distance below `%rbp`; the slot lives at `-offset(%rbp)`.
    pub offset: i64,
    /// The declared type.
    pub ty: Type,
    /// False for `const` declarations.
    pub mutable: bool,
}

/// The state of one function being emitted.
#[derive(Debug)]
pub(super) struct Frame {
    /// The function's numeric id, used for the `LFB`/`LFE` labels.
    pub id: usize,
    /// The function's return type.
    pub ret: Type,
    /// Current stack delta below `%rbp`, in bytes (always a multiple of
    /// 8).
    offset: i64,
    locals: HashMap<String, Local>,
    /// Allocation order; deallocation must pop from the back.
    alloc_stack: Vec<String>,
    /// Open scopes, each listing the named locals allocated in it.
    scopes: Vec<Vec<String>>,
    temp_counter: usize,
}

impl Frame {
    /// Creates the frame with its single outermost scope open.
    pub fn new(id: usize, ret: Type) -> Self {
        Frame {
            id,
            ret,
            offset: 0,
            locals: HashMap::new(),
            alloc_stack: Vec::new(),
            scopes: vec![Vec::new()],
            temp_counter: 0,
        }
    }

    /// Returns the local for `name`.
    pub fn lookup(&self, name: &str) -> Option<&Local> {
        self.locals.get(name)
    }

    /// Returns the current stack delta in bytes.
    pub fn stack_delta(&self) -> i64 {
        self.offset
    }

    /// Allocates a named 8-byte slot in the current scope and returns
    /// its offset.
    pub fn alloc(&mut self, name: &str, ty: Type, mutable: bool, span: Span) -> Result<i64, CodegenError> {
        if self.locals.contains_key(name) {
            return Err(CodegenError::new(
                CodegenErrorKind::DuplicateLocal,
                format!("local '{}' is already allocated", name),
                span,
            ));
        }
        self.offset += 8;
        self.locals.insert(
            name.to_string(),
            Local {
                offset: self.offset,
                ty,
                mutable,
            },
        );
        self.alloc_stack.push(name.to_string());
        let scope = self
            .scopes
            .last_mut()
            .unwrap_or_else(|| unreachable!("frame always has an open scope"));
        scope.push(name.to_string());
        Ok(self.offset)
    }

    /// Allocates an anonymous spill slot and returns its name and
    /// offset. Temps belong to no scope and must be freed explicitly, in
    /// LIFO order.
    pub fn alloc_temp(&mut self, ty: Type) -> (String, i64) {
        let name = format!("@tmp{}", self.temp_counter);
        self.temp_counter += 1;
        self.offset += 8;
        self.locals.insert(
            name.clone(),
            Local {
                offset: self.offset,
                ty,
                mutable: true,
            },
        );
        self.alloc_stack.push(name.clone());
        (name, self.offset)
    }

    /// Frees a temp slot. The temp must be the most recent allocation.
    pub fn free_temp(&mut self, name: &str) {
        let top = self.alloc_stack.pop();
        assert_eq!(
            top.as_deref(),
            Some(name),
            "stack slots must be freed in allocation order"
        );
        self.locals.remove(name);
        self.offset -= 8;
    }

    /// Opens a nested scope.
    pub fn open_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Closes the innermost scope, releasing its locals in reverse
    /// declaration order. Returns the number of bytes to release from
    /// `%rsp`.
    pub fn close_scope(&mut self) -> i64 {
        let names = self
            .scopes
            .pop()
            .unwrap_or_else(|| unreachable!("close_scope without an open scope"));
        let mut freed = 0;
        for name in names.iter().rev() {
            let top = self.alloc_stack.pop();
            assert_eq!(
                top.as_deref(),
                Some(name.as_str()),
                "stack slots must be freed in allocation order"
            );
            self.locals.remove(name);
            self.offset -= 8;
            freed += 8;
        }
        freed
    }

    /// Finishes the function. The outermost scope must already be
    /// closed and the stack delta must be back at zero.
    pub fn finish(self) {
        assert!(self.scopes.is_empty(), "function closed with open scopes");
        assert_eq!(self.offset, 0, "function closed with a non-zero stack delta");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NumberType;
    use crate::source::SourceSet;

    fn span() -> Span {
        let mut sources = SourceSet::new();
        let file = sources.add_file("t.tn", "x");
        Span::new(file, 0, 1, 1, 1)
    }

    fn i32_ty() -> Type {
        Type::Number(NumberType::I32)
    }

    #[test]
    fn test_alloc_offsets() {
        let mut frame = Frame::new(0, Type::Void);
        assert_eq!(frame.alloc("a", i32_ty(), true, span()).unwrap(), 8);
        assert_eq!(frame.alloc("b", i32_ty(), true, span()).unwrap(), 16);
        assert_eq!(frame.lookup("a").unwrap().offset, 8);
        assert_eq!(frame.stack_delta(), 16);
    }

    #[test]
    fn test_duplicate_local_rejected() {
        let mut frame = Frame::new(0, Type::Void);
        frame.alloc("a", i32_ty(), true, span()).unwrap();
        let err = frame.alloc("a", i32_ty(), true, span()).unwrap_err();
        assert_eq!(err.kind(), CodegenErrorKind::DuplicateLocal);
    }

    #[test]
    fn test_scope_close_frees_in_reverse() {
        let mut frame = Frame::new(0, Type::Void);
        frame.open_scope();
        frame.alloc("a", i32_ty(), true, span()).unwrap();
        frame.alloc("b", i32_ty(), true, span()).unwrap();
        assert_eq!(frame.close_scope(), 16);
        assert_eq!(frame.stack_delta(), 0);
        assert!(frame.lookup("a").is_none());
    }

    #[test]
    fn test_temp_lifo() {
        let mut frame = Frame::new(0, Type::Void);
        let (t0, off0) = frame.alloc_temp(i32_ty());
        assert_eq!(off0, 8);
        let (t1, off1) = frame.alloc_temp(i32_ty());
        assert_eq!(off1, 16);
        frame.free_temp(&t1);
        frame.free_temp(&t0);
        assert_eq!(frame.stack_delta(), 0);
    }

    #[test]
    #[should_panic(expected = "allocation order")]
    fn test_temp_out_of_order_asserts() {
        let mut frame = Frame::new(0, Type::Void);
        let (t0, _) = frame.alloc_temp(i32_ty());
        let (_t1, _) = frame.alloc_temp(i32_ty());
        frame.free_temp(&t0);
    }

    #[test]
    fn test_finish_requires_zero_delta() {
        let mut frame = Frame::new(0, Type::Void);
        frame.alloc("a", i32_ty(), true, span()).unwrap();
        assert_eq!(frame.close_scope(), 8);
        frame.finish();
    }
}
