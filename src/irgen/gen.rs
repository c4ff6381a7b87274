use anyhow::{bail, Result};
use log::{debug, trace};

use super::context::FunctionInfo;
use super::utils::*;
use super::*;
use crate::ast::*;
use crate::sema::{element_count, flatten, ConstEval, Symbol, PARAM_SLOT};
use crate::utils::{CompileError, ErrorKind};

pub trait GenerateIR<'ast> {
    type Out;

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<Self::Out>;
}

/// How control leaves a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Fallthrough,
    Return,
    Break,
    Continue,
}

impl Exit {
    pub fn falls_through(self) -> bool {
        self == Exit::Fallthrough
    }
}

impl<'ast> GenerateIR<'ast> for CompUnit {
    type Out = ();

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<()> {
        ctx.install_lib()?;
        for item in &self.items {
            match item {
                GlobalItem::Decl(decl) => decl.generate_ir(ctx)?,
                GlobalItem::Func(func) => func.generate_ir(ctx)?,
            }
        }
        Ok(())
    }
}

impl<'ast> GenerateIR<'ast> for FuncDef {
    type Out = ();

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<()> {
        debug!("lowering function @{}", self.ident);
        ctx.symbols
            .declare_func(&self.ident, self.ret, self.params.len(), self.pos)?;

        let mut params = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let dims = match &param.dims {
                Some(tail) => Some(eval_dims(tail, ctx, param.pos)?),
                None => None,
            };
            let ty = match &dims {
                Some(tail) => param_array_type(tail),
                None => "i32".to_string(),
            };
            params.push((param, dims, ty));
        }

        let sig: Vec<_> = params
            .iter()
            .map(|(p, _, ty)| format!("%arg_{}: {}", p.ident, ty))
            .collect();
        ctx.line(format!(
            "fun @{}({}){} {{",
            self.ident,
            sig.join(", "),
            ret_suffix(self.ret)
        ));
        ctx.label("%entry");

        let info = FunctionInfo {
            name: &self.ident,
            ret: self.ret,
        };
        ctx.in_function(info, |ctx| {
            for (param, dims, ty) in params {
                let slot = storage(&param.ident, PARAM_SLOT);
                ctx.inst(format!("{} = alloc {}", slot, ty));
                ctx.inst(format!("store %arg_{}, {}", param.ident, slot));
                ctx.symbols.declare_param(&param.ident, dims, param.pos)?;
            }
            if self.block.generate_ir(ctx)?.falls_through() {
                match self.ret {
                    ReturnKind::Void => ctx.inst("ret"),
                    ReturnKind::Int => ctx.inst("ret 0"),
                }
            }
            Ok(())
        })?;

        ctx.line("}");
        ctx.line("");
        Ok(())
    }
}

impl<'ast> GenerateIR<'ast> for Decl {
    type Out = ();

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<()> {
        match self {
            Decl::Const(defs) => defs.iter().try_for_each(|def| def.generate_ir(ctx)),
            Decl::Var(defs) => defs.iter().try_for_each(|def| def.generate_ir(ctx)),
        }
    }
}

impl<'ast> GenerateIR<'ast> for ConstDef {
    type Out = ();

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<()> {
        if self.dims.is_empty() {
            let val = match &self.init {
                InitVal::Expr(e) => e.require_const(&ctx.symbols, self.pos)?,
                InitVal::List(_) => {
                    bail!(CompileError::new(ErrorKind::InvalidInitializer, self.pos))
                }
            };
            trace!("const {} = {}", self.ident, val);
            return ctx.symbols.declare_const(&self.ident, val, self.pos);
        }

        let dims = eval_dims(&self.dims, ctx, self.pos)?;
        let elems = flatten(&self.init, &dims, self.pos)?;
        let vals = elems
            .iter()
            .map(|e| match e {
                Some(e) => e.require_const(&ctx.symbols, self.pos),
                None => Ok(0),
            })
            .collect::<Result<Vec<_>>>()?;
        let slot = ctx.symbols.declare_array(&self.ident, dims.clone(), self.pos)?;
        let name = storage(&self.ident, slot);
        if ctx.symbols.is_global() {
            global_array(ctx, &name, &dims, Some(vals.as_slice()));
        } else {
            ctx.inst(format!("{} = alloc {}", name, array_type(&dims)));
            store_elems(ctx, &name, &dims, &elems)?;
        }
        Ok(())
    }
}

impl<'ast> GenerateIR<'ast> for VarDef {
    type Out = ();

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<()> {
        if ctx.symbols.is_global() {
            return self.generate_global(ctx);
        }
        if self.dims.is_empty() {
            let slot = ctx.symbols.declare_var(&self.ident, self.pos)?;
            let name = storage(&self.ident, slot);
            ctx.inst(format!("{} = alloc i32", name));
            match &self.init {
                Some(InitVal::Expr(e)) => {
                    let val = e.generate_ir(ctx)?;
                    ctx.inst(format!("store {}, {}", val, name));
                }
                Some(InitVal::List(_)) => {
                    bail!(CompileError::new(ErrorKind::InvalidInitializer, self.pos))
                }
                None => {}
            }
            return Ok(());
        }

        let dims = eval_dims(&self.dims, ctx, self.pos)?;
        let elems = match &self.init {
            Some(init) => Some(flatten(init, &dims, self.pos)?),
            None => None,
        };
        let slot = ctx.symbols.declare_array(&self.ident, dims.clone(), self.pos)?;
        let name = storage(&self.ident, slot);
        ctx.inst(format!("{} = alloc {}", name, array_type(&dims)));
        if let Some(elems) = elems {
            store_elems(ctx, &name, &dims, &elems)?;
        }
        Ok(())
    }
}

impl VarDef {
    fn generate_global<'ast>(&'ast self, ctx: &mut Context<'ast>) -> Result<()> {
        if self.dims.is_empty() {
            let init = match &self.init {
                None => "zeroinit".to_string(),
                Some(InitVal::Expr(e)) => e.require_const(&ctx.symbols, self.pos)?.to_string(),
                Some(InitVal::List(_)) => {
                    bail!(CompileError::new(ErrorKind::InvalidInitializer, self.pos))
                }
            };
            let slot = ctx.symbols.declare_var(&self.ident, self.pos)?;
            ctx.line(format!("global {} = alloc i32, {}", storage(&self.ident, slot), init));
            return Ok(());
        }

        let dims = eval_dims(&self.dims, ctx, self.pos)?;
        let vals = match &self.init {
            None => None,
            Some(init) => Some(
                flatten(init, &dims, self.pos)?
                    .iter()
                    .map(|e| match e {
                        Some(e) => e.require_const(&ctx.symbols, self.pos),
                        None => Ok(0),
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        let slot = ctx.symbols.declare_array(&self.ident, dims.clone(), self.pos)?;
        global_array(ctx, &storage(&self.ident, slot), &dims, vals.as_deref());
        Ok(())
    }
}

fn eval_dims(dims: &[Expr], ctx: &Context, pos: Pos) -> Result<Vec<usize>> {
    let dims = dims
        .iter()
        .map(|d| match d.require_const(&ctx.symbols, pos)? {
            n if n > 0 => Ok(n as usize),
            _ => bail!(CompileError::new(ErrorKind::InvalidArrayDim, pos)),
        })
        .collect::<Result<Vec<_>>>()?;
    if element_count(&dims).is_none() {
        bail!(CompileError::new(ErrorKind::InvalidArrayDim, pos));
    }
    Ok(dims)
}

/// `vals` is `None` for an array without initializer.
fn global_array(ctx: &mut Context, name: &str, dims: &[usize], vals: Option<&[i32]>) {
    let init = match vals {
        Some(vals) if vals.iter().any(|&v| v != 0) => aggregate(vals, dims),
        _ => "zeroinit".to_string(),
    };
    ctx.line(format!("global {} = alloc {}, {}", name, array_type(dims), init));
}

/// Stores every element of a local array, implicit zeros included.
fn store_elems<'ast>(
    ctx: &mut Context<'ast>,
    ptr: &str,
    dims: &[usize],
    elems: &[Option<&'ast Expr>],
) -> Result<()> {
    let stride = dims[1..].iter().product::<usize>();
    for (i, chunk) in elems.chunks(stride).enumerate() {
        let elem = ctx.temp(format!("getelemptr {}, {}", ptr, i));
        if dims.len() > 1 {
            store_elems(ctx, &elem, &dims[1..], chunk)?;
            continue;
        }
        let val = match chunk[0] {
            Some(e) => e.generate_ir(ctx)?,
            None => "0".to_string(),
        };
        ctx.inst(format!("store {}, {}", val, elem));
    }
    Ok(())
}

impl<'ast> GenerateIR<'ast> for Block {
    type Out = Exit;

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<Exit> {
        ctx.scoped(|ctx| {
            for item in &self.items {
                let exit = match item {
                    BlockItem::Decl(decl) => {
                        decl.generate_ir(ctx)?;
                        Exit::Fallthrough
                    }
                    BlockItem::Stmt(stmt) => stmt.generate_ir(ctx)?,
                };
                // the rest of the block is unreachable
                if !exit.falls_through() {
                    return Ok(exit);
                }
            }
            Ok(Exit::Fallthrough)
        })
    }
}

impl<'ast> GenerateIR<'ast> for Stmt {
    type Out = Exit;

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<Exit> {
        match self {
            Stmt::Assign(assign) => {
                assign.generate_ir(ctx)?;
                Ok(Exit::Fallthrough)
            }
            Stmt::Exp(Some(Expr::Call(call))) => {
                call.generate_call(ctx)?;
                Ok(Exit::Fallthrough)
            }
            Stmt::Exp(Some(e)) => {
                e.generate_ir(ctx)?;
                Ok(Exit::Fallthrough)
            }
            Stmt::Exp(None) => Ok(Exit::Fallthrough),
            Stmt::Return(ret) => ret.generate_ir(ctx),
            Stmt::Block(block) => block.generate_ir(ctx),
            Stmt::If(branch) => branch.generate_ir(ctx),
            Stmt::While(looping) => looping.generate_ir(ctx),
            Stmt::Break(pos) => {
                let target = ctx.loop_exit(*pos)?;
                ctx.inst(format!("jump {}", target));
                Ok(Exit::Break)
            }
            Stmt::Continue(pos) => {
                let target = ctx.loop_entry(*pos)?;
                ctx.inst(format!("jump {}", target));
                Ok(Exit::Continue)
            }
        }
    }
}

impl<'ast> GenerateIR<'ast> for Assign {
    type Out = ();

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<()> {
        let lval = &self.lval;
        let sym = ctx.symbols.lookup(&lval.ident, lval.pos)?.clone();
        match sym {
            Symbol::Const(_) => bail!(CompileError::new(
                ErrorKind::AssignToConst(lval.ident.clone()),
                lval.pos
            )),
            Symbol::Func(..) => bail!(CompileError::new(
                ErrorKind::NotAValue(lval.ident.clone()),
                lval.pos
            )),
            _ => {}
        }
        let val = self.val.generate_ir(ctx)?;
        let place = lval.place(&sym, ctx)?;
        if place.rest != 0 {
            bail!(CompileError::new(
                ErrorKind::NotAValue(lval.ident.clone()),
                lval.pos
            ));
        }
        ctx.inst(format!("store {}, {}", val, place.ptr));
        Ok(())
    }
}

impl<'ast> GenerateIR<'ast> for Return {
    type Out = Exit;

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<Exit> {
        let Some(func) = ctx.cur_func() else {
            bail!(CompileError::new(ErrorKind::ReturnMismatch(String::new()), self.pos));
        };
        match (&self.val, func.ret) {
            (Some(val), ReturnKind::Int) => {
                let val = val.generate_ir(ctx)?;
                ctx.inst(format!("ret {}", val));
            }
            (None, ReturnKind::Void) => ctx.inst("ret"),
            _ => bail!(CompileError::new(
                ErrorKind::ReturnMismatch(func.name.to_string()),
                self.pos
            )),
        }
        Ok(Exit::Return)
    }
}

impl<'ast> GenerateIR<'ast> for If {
    type Out = Exit;

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<Exit> {
        let cond = self.cond.generate_ir(ctx)?;
        let id = ctx.new_label_id();
        let then_bb = label("then", id);
        let else_bb = label("else", id);
        let end_bb = label("if_end", id);
        trace!("if statement {}", id);

        let false_bb = if self.els.is_some() { &else_bb } else { &end_bb };
        ctx.inst(format!("br {}, {}, {}", cond, then_bb, false_bb));

        ctx.label(&then_bb);
        let then_exit = self.then.generate_ir(ctx)?;
        if then_exit.falls_through() {
            ctx.inst(format!("jump {}", end_bb));
        }

        let else_exit = match &self.els {
            Some(els) => {
                ctx.label(&else_bb);
                let exit = els.generate_ir(ctx)?;
                if exit.falls_through() {
                    ctx.inst(format!("jump {}", end_bb));
                }
                exit
            }
            None => Exit::Fallthrough,
        };

        if then_exit.falls_through() || else_exit.falls_through() {
            ctx.label(&end_bb);
            Ok(Exit::Fallthrough)
        } else {
            // neither branch reaches `if_end`, so it is never opened
            Ok(then_exit)
        }
    }
}

impl<'ast> GenerateIR<'ast> for While {
    type Out = Exit;

    fn generate_ir(&'ast self, ctx: &mut Context<'ast>) -> Result<Exit> {
        let id = ctx.new_label_id();
        let entry_bb = label("while_entry", id);
        let body_bb = label("while_body", id);
        let end_bb = label("while_end", id);
        trace!("while statement {}", id);

        ctx.inst(format!("jump {}", entry_bb));
        ctx.label(&entry_bb);
        let cond = self.cond.generate_ir(ctx)?;
        ctx.inst(format!("br {}, {}, {}", cond, body_bb, end_bb));

        ctx.label(&body_bb);
        let exit = ctx.in_loop(id, |ctx| self.body.generate_ir(ctx))?;
        if exit.falls_through() {
            ctx.inst(format!("jump {}", entry_bb));
        }

        ctx.label(&end_bb);
        Ok(Exit::Fallthrough)
    }
}
