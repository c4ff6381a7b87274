pub use block::*;
pub use expr::*;

mod block;
mod expr;

/// Byte offset into the source text.
pub type Pos = usize;

#[derive(Debug)]
pub struct CompUnit {
    pub items: Vec<GlobalItem>,
}

#[derive(Debug)]
pub enum GlobalItem {
    Decl(Decl),
    Func(FuncDef),
}

#[derive(Debug)]
pub enum Decl {
    Const(Vec<ConstDef>),
    Var(Vec<VarDef>),
}

#[derive(Debug)]
pub struct ConstDef {
    pub ident: String,
    pub dims: Vec<Expr>,
    pub init: InitVal,
    pub pos: Pos,
}

#[derive(Debug)]
pub struct VarDef {
    pub ident: String,
    pub dims: Vec<Expr>,
    pub init: Option<InitVal>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Int,
    Void,
}

#[derive(Debug)]
pub struct FuncDef {
    pub ret: ReturnKind,
    pub ident: String,
    pub params: Vec<FuncParam>,
    pub block: Block,
    pub pos: Pos,
}

#[derive(Debug)]
pub struct FuncParam {
    pub ident: String,
    /// `None` for a scalar; `Some(tail)` for `int a[]` followed by the
    /// remaining dimensions.
    pub dims: Option<Vec<Expr>>,
    pub pos: Pos,
}

#[derive(Debug)]
pub enum InitVal {
    Expr(Expr),
    List(Vec<InitVal>),
}

impl FuncParam {
    pub fn is_array(&self) -> bool {
        self.dims.is_some()
    }
}
