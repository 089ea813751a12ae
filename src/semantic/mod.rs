//! Semantic analysis for the Tern programming language.
//!
//! This module builds the [`Unit`] (the registered program) and the
//! [`TypeContext`] (sizes, alignments, and struct member offsets) from
//! the translated item list.
//!
//! # Responsibilities
//!
//! - **Name registration**: every top-level name is unique across item
//!   kinds; compatible redeclarations of functions and globals merge,
//!   with at most one body/initializer per name.
//! - **Struct layout**: members are laid out in declaration order with
//!   `align_up` offsets; struct alignment is the maximum member
//!   alignment; the size is rounded up to the alignment. Struct value
//!   members must form a DAG; pointers break cycles.
//! - **Signature and global validation**: every named type mentioned in
//!   a function signature or global declaration must exist.
//!
//! # Pipeline Position
//!
//! ```text
//! Source → Lexer → Reducer → Translator → Semantic → Codegen
//! ```

pub mod error;
mod unit;

#[cfg(test)]
mod tests;

pub use error::{SemanticError, SemanticErrorKind};
pub use unit::{NameKind, Unit};

use std::collections::HashMap;

use crate::ast::{Declaration, Item, StructDef, Type};

/// Rounds `offset` up to the next multiple of `align`.
fn align_up(offset: usize, align: usize) -> usize {
    if align == 0 {
        return offset;
    }
    offset.div_ceil(align) * align
}

/// Size, alignment, and member-offset tables for every known type.
#[derive(Debug, Default)]
pub struct TypeContext {
    size_by_name: HashMap<String, usize>,
    align_by_name: HashMap<String, usize>,
    member_offsets: HashMap<(String, String), usize>,
}

impl TypeContext {
    fn new() -> Self {
        TypeContext::default()
    }

    /// Returns the size of `ty` in bytes, if it has one.
    pub fn size_of(&self, ty: &Type) -> Option<usize> {
        match ty {
            Type::Void => None,
            Type::Number(n) => Some(n.size()),
            Type::Pointer(_) => Some(8),
            Type::Struct(name) => self.size_by_name.get(name.as_str()).copied(),
            Type::Function { .. } => None,
        }
    }

    /// Returns the alignment of `ty` in bytes, if it has one.
    pub fn align_of(&self, ty: &Type) -> Option<usize> {
        match ty {
            Type::Void => None,
            Type::Number(n) => Some(n.align()),
            Type::Pointer(_) => Some(8),
            Type::Struct(name) => self.align_by_name.get(name.as_str()).copied(),
            Type::Function { .. } => None,
        }
    }

    /// Returns the offset of `member` inside `struct_name`.
    pub fn member_offset(&self, struct_name: &str, member: &str) -> Option<usize> {
        self.member_offsets
            .get(&(struct_name.to_string(), member.to_string()))
            .copied()
    }

    fn record_struct(&mut self, def: &StructDef, offsets: Vec<(String, usize)>, size: usize, align: usize) {
        self.size_by_name.insert(def.name.clone(), size);
        self.align_by_name.insert(def.name.clone(), align);
        for (member, offset) in offsets {
            self.member_offsets.insert((def.name.clone(), member), offset);
        }
    }
}

/// Builds the unit and type context from the translated items.
///
/// # Errors
///
/// Returns the first [`SemanticError`] found: duplicate or incompatible
/// declarations, unknown types, cyclic structs, or invalid member and
/// global types.
pub fn analyze(items: Vec<Item>) -> Result<(Unit, TypeContext), SemanticError> {
    let unit = register_items(items)?;
    let mut context = TypeContext::new();
    register_structs(&unit, &mut context)?;
    check_signatures(&unit)?;
    check_globals(&unit, &context)?;
    Ok((unit, context))
}

// Phase 1: name registration and redeclaration merging.

fn register_items(items: Vec<Item>) -> Result<Unit, SemanticError> {
    let mut unit = Unit::new();
    for item in items {
        match item {
            Item::Struct(def) => {
                if unit.kind_of(&def.name).is_some() {
                    return Err(SemanticError::new(
                        SemanticErrorKind::DuplicateDefinition,
                        format!("'{}' is already defined", def.name),
                        def.span,
                    ));
                }
                unit.insert_struct(def);
            }
            Item::Function(function) => match unit.kind_of(&function.name) {
                None => unit.insert_function(function),
                Some(NameKind::Function) => merge_function(&mut unit, function)?,
                Some(_) => {
                    return Err(SemanticError::new(
                        SemanticErrorKind::DuplicateDefinition,
                        format!("'{}' is already defined", function.name),
                        function.span,
                    ));
                }
            },
            Item::Global(global) => match unit.kind_of(&global.name) {
                None => unit.insert_global(global),
                Some(NameKind::Global) => merge_global(&mut unit, global)?,
                Some(_) => {
                    return Err(SemanticError::new(
                        SemanticErrorKind::DuplicateDefinition,
                        format!("'{}' is already defined", global.name),
                        global.span,
                    ));
                }
            },
            Item::GlobalInit(init) => {
                let Some(global) = unit.global_mut(&init.name) else {
                    return Err(SemanticError::new(
                        SemanticErrorKind::UndeclaredGlobal,
                        format!("definition of undeclared global '{}'", init.name),
                        init.span,
                    ));
                };
                if global.init.is_some() {
                    return Err(SemanticError::new(
                        SemanticErrorKind::DuplicateDefinition,
                        format!("global '{}' is initialized twice", init.name),
                        init.span,
                    ));
                }
                global.init = Some(init.value);
                unit.mark_defined(&init.name);
            }
        }
    }
    Ok(unit)
}

fn merge_function(
    unit: &mut Unit,
    function: crate::ast::Function,
) -> Result<(), SemanticError> {
    let existing = unit
        .function(&function.name)
        .unwrap_or_else(|| unreachable!("kind map says function exists"));
    if existing.signature() != function.signature() {
        return Err(SemanticError::new(
            SemanticErrorKind::IncompatibleRedeclaration,
            format!(
                "'{}' was declared as '{}' but redeclared as '{}'",
                function.name,
                existing.signature(),
                function.signature()
            ),
            function.span,
        ));
    }
    if existing.body.is_some() && function.body.is_some() {
        return Err(SemanticError::new(
            SemanticErrorKind::DuplicateDefinition,
            format!("function '{}' is defined twice", function.name),
            function.span,
        ));
    }
    if function.body.is_some() {
        unit.replace_function(function);
    }
    Ok(())
}

fn merge_global(unit: &mut Unit, global: crate::ast::GlobalVar) -> Result<(), SemanticError> {
    let name = global.name.clone();
    let existing = unit
        .global(&name)
        .unwrap_or_else(|| unreachable!("kind map says global exists"));
    if existing.ty != global.ty || existing.mutable != global.mutable {
        return Err(SemanticError::new(
            SemanticErrorKind::IncompatibleRedeclaration,
            format!("'{}' is redeclared with a different type", name),
            global.span,
        ));
    }
    if global.init.is_some() {
        if existing.init.is_some() {
            return Err(SemanticError::new(
                SemanticErrorKind::DuplicateDefinition,
                format!("global '{}' is initialized twice", name),
                global.span,
            ));
        }
        let slot = unit
            .global_mut(&name)
            .unwrap_or_else(|| unreachable!("kind map says global exists"));
        slot.init = global.init;
        unit.mark_defined(&name);
    }
    Ok(())
}

// Phase 2: struct layout.

fn register_structs(unit: &Unit, context: &mut TypeContext) -> Result<(), SemanticError> {
    // Value-member dependencies: a struct can only be laid out once all
    // the structs it contains by value are laid out.
    let mut pending: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for def in unit.structs() {
        let mut count = 0;
        for member in &def.members {
            validate_named_types(unit, &member.ty, member.span)?;
            if let Type::Struct(inner) = &member.ty {
                count += 1;
                dependents.entry(inner.as_str()).or_default().push(&def.name);
            }
        }
        pending.insert(&def.name, count);
    }

    let mut ready: Vec<&str> = unit
        .structs()
        .filter(|d| pending.get(d.name.as_str()) == Some(&0))
        .map(|d| d.name.as_str())
        .collect();

    while let Some(name) = ready.pop() {
        let def = unit
            .struct_def(name)
            .unwrap_or_else(|| unreachable!("ready list only holds known structs"));
        layout_struct(def, context)?;
        for &parent in dependents.get(name).into_iter().flatten() {
            let count = pending
                .get_mut(parent)
                .unwrap_or_else(|| unreachable!("dependents only name known structs"));
            *count -= 1;
            if *count == 0 {
                ready.push(parent);
            }
        }
        pending.remove(name);
    }

    // Anything still pending sits on a cycle; report the first one in
    // declaration order.
    for def in unit.structs() {
        if pending.contains_key(def.name.as_str()) {
            return Err(SemanticError::new(
                SemanticErrorKind::CyclicStruct,
                format!("struct '{}' contains itself through a member cycle", def.name),
                def.span,
            ));
        }
    }
    Ok(())
}

fn layout_struct(def: &StructDef, context: &mut TypeContext) -> Result<(), SemanticError> {
    let mut offsets = Vec::new();
    let mut seen: HashMap<&str, ()> = HashMap::new();
    let mut offset = 0;
    let mut align = 1;

    for member in &def.members {
        if seen.insert(&member.name, ()).is_some() {
            return Err(SemanticError::new(
                SemanticErrorKind::DuplicateDefinition,
                format!("duplicate member '{}' in struct '{}'", member.name, def.name),
                member.span,
            ));
        }
        validate_member_type(def, member)?;
        let size = context
            .size_of(&member.ty)
            .unwrap_or_else(|| unreachable!("validated member types are sized"));
        let member_align = context
            .align_of(&member.ty)
            .unwrap_or_else(|| unreachable!("validated member types are aligned"));
        offset = align_up(offset, member_align);
        offsets.push((member.name.clone(), offset));
        offset += size;
        align = align.max(member_align);
    }

    let size = align_up(offset, align);
    context.record_struct(def, offsets, size, align);
    Ok(())
}

fn validate_member_type(def: &StructDef, member: &Declaration) -> Result<(), SemanticError> {
    match &member.ty {
        Type::Number(_) | Type::Pointer(_) | Type::Struct(_) => Ok(()),
        Type::Void => Err(SemanticError::new(
            SemanticErrorKind::VoidMember,
            format!("member '{}' of struct '{}' cannot be void", member.name, def.name),
            member.span,
        )),
        Type::Function { .. } => Err(SemanticError::new(
            SemanticErrorKind::FunctionMember,
            format!(
                "member '{}' of struct '{}' cannot have a function type",
                member.name, def.name
            ),
            member.span,
        )),
    }
}

// Phase 3: function signatures.

fn check_signatures(unit: &Unit) -> Result<(), SemanticError> {
    for function in unit.functions() {
        validate_named_types(unit, &function.ret, function.span)?;
        for param in &function.params {
            validate_named_types(unit, &param.ty, param.span)?;
            if matches!(param.ty, Type::Void) {
                return Err(SemanticError::new(
                    SemanticErrorKind::InvalidType,
                    format!("parameter '{}' cannot have type 'void'", param.name),
                    param.span,
                ));
            }
        }
    }
    Ok(())
}

// Phase 4: global declarations.

fn check_globals(unit: &Unit, context: &TypeContext) -> Result<(), SemanticError> {
    for name in unit.names() {
        let Some(global) = unit.global(name) else {
            continue;
        };
        validate_named_types(unit, &global.ty, global.span)?;
        if context.size_of(&global.ty).is_none() {
            return Err(SemanticError::new(
                SemanticErrorKind::InvalidType,
                format!("global '{}' cannot have type '{}'", global.name, global.ty),
                global.span,
            ));
        }
    }
    Ok(())
}

/// Checks that every struct name mentioned anywhere in `ty` exists.
fn validate_named_types(
    unit: &Unit,
    ty: &Type,
    span: crate::token::Span,
) -> Result<(), SemanticError> {
    match ty {
        Type::Void | Type::Number(_) => Ok(()),
        Type::Pointer(inner) => validate_named_types(unit, inner, span),
        Type::Struct(name) => {
            if unit.struct_def(name).is_none() {
                return Err(SemanticError::new(
                    SemanticErrorKind::UnknownType,
                    format!("unknown struct '{}'", name),
                    span,
                ));
            }
            Ok(())
        }
        Type::Function { ret, params } => {
            validate_named_types(unit, ret, span)?;
            for param in params {
                validate_named_types(unit, param, span)?;
            }
            Ok(())
        }
    }
}
