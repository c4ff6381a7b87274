use anyhow::{bail, Result};

use super::gen::GenerateIR;
use super::utils::{storage, IrOp};
use super::Context;
use crate::ast::*;
use crate::sema::{ConstEval, Symbol, PARAM_SLOT};
use crate::utils::{CompileError, ErrorKind};

/// At most this many arguments travel in registers.
pub const MAX_ARGS: usize = 8;

impl<'ast> GenerateIR<'ast> for Expr {
    /// A literal or the temporary holding the value.
    type Out = String;

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<String> {
        if let Some(val) = self.const_eval(&ctx.symbols) {
            return Ok(val.to_string());
        }
        match self {
            Expr::Integer(i) => Ok(i.to_string()),
            Expr::LVal(lval) => lval.generate_ir(ctx),
            Expr::Unary(op, opr) => {
                let opr = opr.generate_ir(ctx)?;
                Ok(match op {
                    UnaryOp::Nop => opr,
                    UnaryOp::Neg => ctx.temp(format!("{} 0, {}", IrOp::Sub, opr)),
                    UnaryOp::Not => ctx.temp(format!("{} {}, 0", IrOp::Eq, opr)),
                })
            }
            Expr::Binary(bxp) => bxp.generate_ir(ctx),
            Expr::Call(call) => match call.generate_call(ctx)? {
                Some(val) => Ok(val),
                None => bail!(CompileError::new(
                    ErrorKind::VoidValue(call.ident.clone()),
                    call.pos
                )),
            },
        }
    }
}

impl<'ast> GenerateIR<'ast> for BinaryExpr {
    type Out = String;

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<String> {
        let lhs = self.lhs.generate_ir(ctx)?;
        let rhs = self.rhs.generate_ir(ctx)?;
        // both operands are evaluated: there is no short circuit
        let val = match self.op {
            BinaryOp::And => {
                let lhs = ctx.temp(format!("{} {}, 0", IrOp::NotEq, lhs));
                let rhs = ctx.temp(format!("{} {}, 0", IrOp::NotEq, rhs));
                ctx.temp(format!("{} {}, {}", IrOp::And, lhs, rhs))
            }
            BinaryOp::Or => {
                let any = ctx.temp(format!("{} {}, {}", IrOp::Or, lhs, rhs));
                ctx.temp(format!("{} {}, 0", IrOp::NotEq, any))
            }
            op => ctx.temp(format!("{} {}, {}", IrOp::from(op), lhs, rhs)),
        };
        Ok(val)
    }
}

impl Call {
    /// Lowers the call; `None` when the callee returns nothing.
    pub fn generate_call<'ast>(&'ast self, ctx: &mut Context<'ast>) -> Result<Option<String>> {
        let (ret, arity) = match ctx.symbols.lookup(&self.ident, self.pos)? {
            Symbol::Func(ret, arity) => (*ret, *arity),
            _ => bail!(CompileError::new(
                ErrorKind::NotAFunction(self.ident.clone()),
                self.pos
            )),
        };
        if self.args.len() > MAX_ARGS {
            bail!(CompileError::new(
                ErrorKind::TooManyArguments(self.ident.clone(), self.args.len()),
                self.pos
            ));
        }
        if self.args.len() != arity {
            bail!(CompileError::new(
                ErrorKind::ArityMismatch {
                    callee: self.ident.clone(),
                    expected: arity,
                    found: self.args.len(),
                },
                self.pos
            ));
        }

        let args = self
            .args
            .iter()
            .map(|arg| arg.generate_ir(ctx))
            .collect::<Result<Vec<_>>>()?;
        let call = format!("call @{}({})", self.ident, args.join(", "));
        match ret {
            ReturnKind::Int => Ok(Some(ctx.temp(call))),
            ReturnKind::Void => {
                ctx.inst(call);
                Ok(None)
            }
        }
    }
}

/// Address designated by an lvalue.
pub struct Place {
    pub ptr: String,
    /// Array dimensions left unindexed; zero for a single `i32`.
    pub rest: usize,
    /// The unindexed pointer held by an array parameter, already `*T`.
    pub is_param_ptr: bool,
}

impl LVal {
    pub fn place<'ast>(&'ast self, sym: &Symbol, ctx: &mut Context<'ast>) -> Result<Place> {
        let not_array = || CompileError::new(ErrorKind::NotAnArray(self.ident.clone()), self.pos);
        match sym {
            Symbol::Var(slot) => {
                if !self.dims.is_empty() {
                    bail!(not_array());
                }
                Ok(Place {
                    ptr: storage(&self.ident, *slot),
                    rest: 0,
                    is_param_ptr: false,
                })
            }
            Symbol::Array(PARAM_SLOT, tail) => {
                let total = tail.len() + 1;
                if self.dims.len() > total {
                    bail!(not_array());
                }
                let mut ptr = ctx.temp(format!("load {}", storage(&self.ident, PARAM_SLOT)));
                for (i, idx) in self.dims.iter().enumerate() {
                    let idx = idx.generate_ir(ctx)?;
                    let inst = if i == 0 { "getptr" } else { "getelemptr" };
                    ptr = ctx.temp(format!("{} {}, {}", inst, ptr, idx));
                }
                Ok(Place {
                    ptr,
                    rest: total - self.dims.len(),
                    is_param_ptr: self.dims.is_empty(),
                })
            }
            Symbol::Array(slot, dims) => {
                if self.dims.len() > dims.len() {
                    bail!(not_array());
                }
                let mut ptr = storage(&self.ident, *slot);
                for idx in &self.dims {
                    let idx = idx.generate_ir(ctx)?;
                    ptr = ctx.temp(format!("getelemptr {}, {}", ptr, idx));
                }
                Ok(Place {
                    ptr,
                    rest: dims.len() - self.dims.len(),
                    is_param_ptr: false,
                })
            }
            Symbol::Const(_) | Symbol::Func(..) => bail!(CompileError::new(
                ErrorKind::NotAValue(self.ident.clone()),
                self.pos
            )),
        }
    }
}

impl<'ast> GenerateIR<'ast> for LVal {
    type Out = String;

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<String> {
        let sym = ctx.symbols.lookup(&self.ident, self.pos)?.clone();
        if let Symbol::Const(val) = sym {
            if !self.dims.is_empty() {
                bail!(CompileError::new(
                    ErrorKind::NotAnArray(self.ident.clone()),
                    self.pos
                ));
            }
            return Ok(val.to_string());
        }

        let place = self.place(&sym, ctx)?;
        Ok(if place.rest == 0 {
            ctx.temp(format!("load {}", place.ptr))
        } else if place.is_param_ptr {
            place.ptr
        } else {
            // an array used as a value decays to a pointer to its first element
            ctx.temp(format!("getelemptr {}, 0", place.ptr))
        })
    }
}
