//! The registered program: every top-level name and its item.

use std::collections::HashMap;

use crate::ast::{Function, GlobalVar, StructDef};

/// What kind of item a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Struct,
    Function,
    Global,
}

/// A validated program: the ordered name table plus the struct, function,
/// and global registries.
///
/// Names are unique across all three kinds. Compatible redeclarations of
/// functions and globals are merged into a single entry; the ordered list
/// of defined globals records which globals gained an initializer, in
/// definition order.
#[derive(Debug, Default)]
pub struct Unit {
    names: Vec<String>,
    kinds: HashMap<String, NameKind>,
    structs: HashMap<String, StructDef>,
    functions: HashMap<String, Function>,
    globals: HashMap<String, GlobalVar>,
    defined_globals: Vec<String>,
}

impl Unit {
    pub(super) fn new() -> Self {
        Unit::default()
    }

    /// Returns all top-level names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the kind of item `name` refers to.
    pub fn kind_of(&self, name: &str) -> Option<NameKind> {
        self.kinds.get(name).copied()
    }

    /// Returns the struct definition for `name`.
    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    /// Returns the function for `name`.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Returns the global for `name`.
    pub fn global(&self, name: &str) -> Option<&GlobalVar> {
        self.globals.get(name)
    }

    /// Iterates struct definitions in declaration order.
    pub fn structs(&self) -> impl Iterator<Item = &StructDef> {
        self.names.iter().filter_map(|n| self.structs.get(n))
    }

    /// Iterates functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.names.iter().filter_map(|n| self.functions.get(n))
    }

    /// Returns the globals that carry an initializer, in definition
    /// order.
    pub fn defined_globals(&self) -> impl Iterator<Item = &GlobalVar> {
        self.defined_globals.iter().filter_map(|n| self.globals.get(n))
    }

    pub(super) fn insert_struct(&mut self, def: StructDef) {
        self.names.push(def.name.clone());
        self.kinds.insert(def.name.clone(), NameKind::Struct);
        self.structs.insert(def.name.clone(), def);
    }

    pub(super) fn insert_function(&mut self, function: Function) {
        self.names.push(function.name.clone());
        self.kinds.insert(function.name.clone(), NameKind::Function);
        self.functions.insert(function.name.clone(), function);
    }

    pub(super) fn replace_function(&mut self, function: Function) {
        self.functions.insert(function.name.clone(), function);
    }

    pub(super) fn insert_global(&mut self, global: GlobalVar) {
        self.names.push(global.name.clone());
        self.kinds.insert(global.name.clone(), NameKind::Global);
        if global.init.is_some() {
            self.defined_globals.push(global.name.clone());
        }
        self.globals.insert(global.name.clone(), global);
    }

    pub(super) fn global_mut(&mut self, name: &str) -> Option<&mut GlobalVar> {
        self.globals.get_mut(name)
    }

    pub(super) fn mark_defined(&mut self, name: &str) {
        self.defined_globals.push(name.to_string());
    }
}
