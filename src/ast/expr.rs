use super::Pos;

#[derive(Debug)]
pub enum Expr {
    Integer(i32),
    LVal(LVal),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryExpr),
    Call(Call),
}

#[derive(Debug)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Debug)]
pub struct Call {
    pub ident: String,
    pub args: Vec<Expr>,
    pub pos: Pos,
}

#[derive(Debug)]
pub struct LVal {
    pub ident: String,
    pub dims: Vec<Expr>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Nop,
    Neg,
    Not,
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn unary(op: UnaryOp, opr: Expr) -> Self {
        Expr::Unary(op, Box::new(opr))
    }
}

/// Folds a binary operation with the wrapping semantics of RV32.
/// Division or remainder by zero has no value.
pub fn eval_binary(op: BinaryOp, lhs: i32, rhs: i32) -> Option<i32> {
    let val = match op {
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Sub => lhs.wrapping_sub(rhs),
        BinaryOp::Mul => lhs.wrapping_mul(rhs),
        BinaryOp::Div => lhs.checked_div(rhs).or_else(|| div_overflow(lhs, rhs))?,
        BinaryOp::Mod => lhs.checked_rem(rhs).or_else(|| rem_overflow(lhs, rhs))?,
        BinaryOp::And => (lhs != 0 && rhs != 0) as i32,
        BinaryOp::Or => (lhs != 0 || rhs != 0) as i32,
        BinaryOp::Eq => (lhs == rhs) as i32,
        BinaryOp::Neq => (lhs != rhs) as i32,
        BinaryOp::Lt => (lhs < rhs) as i32,
        BinaryOp::Le => (lhs <= rhs) as i32,
        BinaryOp::Gt => (lhs > rhs) as i32,
        BinaryOp::Ge => (lhs >= rhs) as i32,
    };
    Some(val)
}

pub fn eval_unary(op: UnaryOp, opr: i32) -> i32 {
    match op {
        UnaryOp::Nop => opr,
        UnaryOp::Neg => opr.wrapping_neg(),
        UnaryOp::Not => (opr == 0) as i32,
    }
}

/// Reads an integer literal modulo 2^32, so any digit string is accepted.
pub fn int_literal(digits: &str, radix: u32) -> i32 {
    digits.chars().fold(0i32, |acc, c| {
        let d = c.to_digit(radix).unwrap_or(0) as i32;
        acc.wrapping_mul(radix as i32).wrapping_add(d)
    })
}

// i32::MIN / -1 overflows; `div` on RV32 yields the dividend.
fn div_overflow(lhs: i32, rhs: i32) -> Option<i32> {
    (rhs == -1).then_some(lhs.wrapping_neg())
}

fn rem_overflow(_lhs: i32, rhs: i32) -> Option<i32> {
    (rhs == -1).then_some(0)
}
