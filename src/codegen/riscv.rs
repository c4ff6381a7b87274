use koopa::ir::BinaryOp;
use strum_macros::Display;

pub type Reg = &'static str;

pub const A: [Reg; 8] = ["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7"];
pub const S: [Reg; 8] = ["s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7"];
pub const ZERO: Reg = "x0";

pub fn imm12(imm: i32) -> bool {
    (-2048..=2047).contains(&imm)
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum AsmBinaryOp {
    #[strum(serialize = "add")]
    Add,
    #[strum(serialize = "addi")]
    Addi,
    #[strum(serialize = "sub")]
    Sub,
    #[strum(serialize = "mul")]
    Mul,
    #[strum(serialize = "div")]
    Div,
    #[strum(serialize = "rem")]
    Rem,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "andi")]
    Andi,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "ori")]
    Ori,
    #[strum(serialize = "xor")]
    Xor,
    #[strum(serialize = "xori")]
    Xori,
    #[strum(serialize = "sll")]
    Sll,
    #[strum(serialize = "slli")]
    Slli,
    #[strum(serialize = "srl")]
    Srl,
    #[strum(serialize = "sra")]
    Sra,
    #[strum(serialize = "slt")]
    Slt,
    #[strum(serialize = "slti")]
    Slti,
    #[strum(serialize = "sgt")]
    Sgt,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum AsmUnaryOp {
    #[strum(serialize = "seqz")]
    Seqz,
    #[strum(serialize = "snez")]
    Snez,
    #[strum(serialize = "mv")]
    Move,
}

/// How a Koopa binary operation is computed in registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lowering {
    /// A single instruction.
    Direct(AsmBinaryOp),
    /// The instruction, then a test of the result against zero.
    Test(AsmBinaryOp, AsmUnaryOp),
}

pub fn lower_binary(op: BinaryOp) -> Lowering {
    use AsmBinaryOp::*;
    use Lowering::*;
    match op {
        BinaryOp::Add => Direct(Add),
        BinaryOp::Sub => Direct(Sub),
        BinaryOp::Mul => Direct(Mul),
        BinaryOp::Div => Direct(Div),
        BinaryOp::Mod => Direct(Rem),
        BinaryOp::And => Direct(And),
        BinaryOp::Or => Direct(Or),
        BinaryOp::Xor => Direct(Xor),
        BinaryOp::Shl => Direct(Sll),
        BinaryOp::Shr => Direct(Srl),
        BinaryOp::Sar => Direct(Sra),
        BinaryOp::Lt => Direct(Slt),
        BinaryOp::Gt => Direct(Sgt),
        BinaryOp::Eq => Test(Xor, AsmUnaryOp::Seqz),
        BinaryOp::NotEq => Test(Xor, AsmUnaryOp::Snez),
        BinaryOp::Le => Test(Sgt, AsmUnaryOp::Seqz),
        BinaryOp::Ge => Test(Slt, AsmUnaryOp::Seqz),
    }
}

/// The immediate form of `op` applied to `imm`, if one exists and `imm`
/// fits in 12 bits.
pub fn with_imm(op: BinaryOp, imm: i32) -> Option<(AsmBinaryOp, i32)> {
    let (op, imm) = match op {
        BinaryOp::Add => (AsmBinaryOp::Addi, imm),
        BinaryOp::Sub => (AsmBinaryOp::Addi, imm.checked_neg()?),
        BinaryOp::And => (AsmBinaryOp::Andi, imm),
        BinaryOp::Or => (AsmBinaryOp::Ori, imm),
        BinaryOp::Xor => (AsmBinaryOp::Xori, imm),
        BinaryOp::Lt => (AsmBinaryOp::Slti, imm),
        _ => return None,
    };
    imm12(imm).then_some((op, imm))
}
