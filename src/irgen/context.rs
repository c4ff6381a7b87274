use std::fmt::Display;

use anyhow::Result;
use log::trace;
use smallvec::SmallVec;

use super::utils::{label, LIBRARY};
use crate::ast::{Pos, ReturnKind};
use crate::sema::SymbolTable;
use crate::utils::{CompileError, ErrorKind};

/// State threaded through one run of the IR emitter.
pub struct Context<'ast> {
    buf: String,
    pub symbols: SymbolTable<'ast>,
    next_temp: usize,
    next_label: usize,
    loops: SmallVec<[usize; 6]>,
    cur_func: Option<FunctionInfo<'ast>>,
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionInfo<'ast> {
    pub name: &'ast str,
    pub ret: ReturnKind,
}

impl<'ast> Context<'ast> {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            symbols: SymbolTable::new(),
            next_temp: 0,
            next_label: 0,
            loops: SmallVec::new(),
            cur_func: None,
        }
    }

    /// Declares the runtime library, both in the output and in the global
    /// scope.
    pub fn install_lib(&mut self) -> Result<()> {
        for func in LIBRARY {
            self.line(func.decl());
            self.symbols
                .declare_func(func.name, func.ret, func.params.len(), 0)?;
        }
        self.line("");
        Ok(())
    }

    pub fn finish(self) -> String {
        self.buf
    }

    /// Writes a line at the top level (global, function header, brace).
    pub fn line(&mut self, line: impl Display) {
        self.buf.push_str(&format!("{}\n", line));
    }

    pub fn inst(&mut self, inst: impl Display) {
        self.buf.push_str(&format!("  {}\n", inst));
    }

    pub fn label(&mut self, name: &str) {
        self.buf.push_str(&format!("{}:\n", name));
    }

    /// Emits `inst` as the definition of a fresh temporary and returns it.
    pub fn temp(&mut self, inst: impl Display) -> String {
        let name = format!("%{}", self.next_temp);
        self.next_temp += 1;
        self.inst(format!("{} = {}", name, inst));
        name
    }

    pub fn new_label_id(&mut self) -> usize {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    /// Runs `f` inside a fresh block scope.
    pub fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.symbols.push_scope();
        let res = f(self);
        self.symbols.pop_scope();
        res
    }

    /// Runs `f` as the body of the loop labelled with `id`.
    pub fn in_loop<T>(&mut self, id: usize, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.loops.push(id);
        let res = f(self);
        self.loops.pop();
        res
    }

    /// Runs `f` with `func` as the current function; parameters declared
    /// meanwhile are dropped afterwards.
    pub fn in_function<T>(
        &mut self,
        func: FunctionInfo<'ast>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        trace!("entering @{}", func.name);
        self.cur_func = Some(func);
        let res = f(self);
        self.symbols.clear_params();
        self.cur_func = None;
        res
    }

    pub fn cur_func(&self) -> Option<FunctionInfo<'ast>> {
        self.cur_func
    }

    /// Label of the innermost loop's condition block, the target of `continue`.
    pub fn loop_entry(&self, pos: Pos) -> Result<String> {
        self.inside_loop("continue", pos)
            .map(|id| label("while_entry", id))
    }

    /// Label following the innermost loop, the target of `break`.
    pub fn loop_exit(&self, pos: Pos) -> Result<String> {
        self.inside_loop("break", pos).map(|id| label("while_end", id))
    }

    fn inside_loop(&self, stmt: &'static str, pos: Pos) -> Result<usize> {
        match self.loops.last() {
            Some(&id) => Ok(id),
            None => Err(CompileError::new(ErrorKind::OutsideLoop(stmt), pos).into()),
        }
    }
}

impl Default for Context<'_> {
    fn default() -> Self {
        Self::new()
    }
}
