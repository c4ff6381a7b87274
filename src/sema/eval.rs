use anyhow::Result;

use super::{Symbol, SymbolTable};
use crate::ast::*;
use crate::utils::{CompileError, ErrorKind};

pub trait ConstEval {
    /// The compile-time value, or `None` if evaluating needs the program
    /// to run.
    fn const_eval(&self, symbols: &SymbolTable) -> Option<i32>;

    fn require_const(&self, symbols: &SymbolTable, pos: Pos) -> Result<i32> {
        self.const_eval(symbols)
            .ok_or_else(|| CompileError::new(ErrorKind::NotConstant, pos).into())
    }
}

impl ConstEval for Expr {
    fn const_eval(&self, symbols: &SymbolTable) -> Option<i32> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::LVal(lval) => lval.const_eval(symbols),
            Self::Unary(op, opr) => opr.const_eval(symbols).map(|v| eval_unary(*op, v)),
            Self::Binary(bxp) => bxp.const_eval(symbols),
            Self::Call(_) => None,
        }
    }
}

impl ConstEval for BinaryExpr {
    fn const_eval(&self, symbols: &SymbolTable) -> Option<i32> {
        let lhs = self.lhs.const_eval(symbols)?;
        let rhs = self.rhs.const_eval(symbols)?;
        eval_binary(self.op, lhs, rhs)
    }
}

impl ConstEval for LVal {
    fn const_eval(&self, symbols: &SymbolTable) -> Option<i32> {
        match symbols.get(&self.ident) {
            Some(Symbol::Const(v)) if self.dims.is_empty() => Some(*v),
            _ => None,
        }
    }
}
