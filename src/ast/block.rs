use super::*;

#[derive(Debug)]
pub struct Block {
    pub items: Vec<BlockItem>,
}

#[derive(Debug)]
pub enum BlockItem {
    Decl(Decl),
    Stmt(Stmt),
}

#[derive(Debug)]
pub enum Stmt {
    Assign(Assign),
    Exp(Option<Expr>),
    Return(Return),
    Block(Block),
    If(If),
    While(While),
    Break(Pos),
    Continue(Pos),
}

#[derive(Debug)]
pub struct Assign {
    pub lval: LVal,
    pub val: Expr,
}

#[derive(Debug)]
pub struct Return {
    pub val: Option<Expr>,
    pub pos: Pos,
}

#[derive(Debug)]
pub struct If {
    pub cond: Expr,
    pub then: Box<Stmt>,
    pub els: Option<Box<Stmt>>,
}

#[derive(Debug)]
pub struct While {
    pub cond: Expr,
    pub body: Box<Stmt>,
}
