use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::ast::{Pos, ReturnKind};
use crate::utils::{CompileError, ErrorKind};

/// Slot id of variables declared at file scope.
pub const GLOBAL_SLOT: i32 = 0;
/// Slot id of function parameters, whose storage is a local copy.
pub const PARAM_SLOT: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Const(i32),
    Var(i32),
    /// Slot id and dimensions. A parameter array records only the
    /// dimensions after the leading `[]`.
    Array(i32, Vec<usize>),
    /// Return kind and number of parameters.
    Func(ReturnKind, usize),
}

/// Lexical scopes of one compilation unit.
///
/// `scopes[0]` is the global scope. Parameters live in their own table that
/// is searched after every block scope and before the global one.
#[derive(Debug)]
pub struct SymbolTable<'ast> {
    scopes: Vec<HashMap<&'ast str, Symbol>>,
    params: HashMap<&'ast str, Symbol>,
    slots: HashMap<&'ast str, i32>,
}

impl<'ast> SymbolTable<'ast> {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            params: HashMap::new(),
            slots: HashMap::new(),
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    pub fn declare_const(&mut self, name: &'ast str, val: i32, pos: Pos) -> Result<()> {
        self.declare(name, Symbol::Const(val), pos)
    }

    /// Declares a scalar variable and returns its slot id, which is unique
    /// for `name` across the whole compilation unit.
    pub fn declare_var(&mut self, name: &'ast str, pos: Pos) -> Result<i32> {
        let slot = self.next_slot(name);
        self.declare(name, Symbol::Var(slot), pos)?;
        Ok(slot)
    }

    pub fn declare_array(&mut self, name: &'ast str, dims: Vec<usize>, pos: Pos) -> Result<i32> {
        let slot = self.next_slot(name);
        self.declare(name, Symbol::Array(slot, dims), pos)?;
        Ok(slot)
    }

    pub fn declare_func(
        &mut self,
        name: &'ast str,
        ret: ReturnKind,
        arity: usize,
        pos: Pos,
    ) -> Result<()> {
        let global = &mut self.scopes[0];
        if global.contains_key(name) {
            bail!(CompileError::new(ErrorKind::Redeclaration(name.into()), pos));
        }
        global.insert(name, Symbol::Func(ret, arity));
        Ok(())
    }

    /// `dims` is `None` for a scalar parameter.
    pub fn declare_param(&mut self, name: &'ast str, dims: Option<Vec<usize>>, pos: Pos) -> Result<()> {
        let sym = match dims {
            None => Symbol::Var(PARAM_SLOT),
            Some(dims) => Symbol::Array(PARAM_SLOT, dims),
        };
        if self.params.insert(name, sym).is_some() {
            bail!(CompileError::new(ErrorKind::Redeclaration(name.into()), pos));
        }
        Ok(())
    }

    pub fn clear_params(&mut self) {
        self.params.clear();
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        let (global, blocks) = self.scopes.split_first()?;
        blocks
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.params.get(name))
            .or_else(|| global.get(name))
    }

    pub fn lookup(&self, name: &str, pos: Pos) -> Result<&Symbol> {
        match self.get(name) {
            Some(sym) => Ok(sym),
            None => bail!(CompileError::new(ErrorKind::UndefinedSymbol(name.into()), pos)),
        }
    }

    fn declare(&mut self, name: &'ast str, sym: Symbol, pos: Pos) -> Result<()> {
        let top = self.scopes.len() - 1;
        let scope = &mut self.scopes[top];
        if scope.contains_key(name) {
            bail!(CompileError::new(ErrorKind::Redeclaration(name.into()), pos));
        }
        scope.insert(name, sym);
        Ok(())
    }

    fn next_slot(&mut self, name: &'ast str) -> i32 {
        if self.is_global() {
            return GLOBAL_SLOT;
        }
        let slot = self.slots.entry(name).or_insert(GLOBAL_SLOT);
        *slot += 1;
        *slot
    }
}

impl Default for SymbolTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}
