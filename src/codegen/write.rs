use std::fmt::{Result, Write};

use super::riscv::*;

/// Accumulates assembly text; nothing touches the output file until the
/// whole program is generated.
#[derive(Default)]
pub struct AsmWriter {
    buf: String,
}

impl AsmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.buf
    }

    pub fn segment(&mut self, name: &str) -> Result {
        writeln!(self.buf, "  .{}", name)
    }

    pub fn global_symbol(&mut self, name: &str) -> Result {
        writeln!(self.buf, "  .globl {}", name)?;
        writeln!(self.buf, "{}:", name)
    }

    pub fn local_symbol(&mut self, name: &str) -> Result {
        writeln!(self.buf, "{}:", name)
    }

    pub fn blank(&mut self) -> Result {
        writeln!(self.buf)
    }

    pub fn word(&mut self, val: i32) -> Result {
        writeln!(self.buf, "  .word {}", val)
    }

    pub fn zero(&mut self, size: usize) -> Result {
        writeln!(self.buf, "  .zero {}", size)
    }

    pub fn li(&mut self, dst: Reg, imm: i32) -> Result {
        writeln!(self.buf, "  li {}, {}", dst, imm)
    }

    pub fn la(&mut self, dst: Reg, name: &str) -> Result {
        writeln!(self.buf, "  la {}, {}", dst, name)
    }

    pub fn lw(&mut self, dst: Reg, base: Reg, offset: i32) -> Result {
        writeln!(self.buf, "  lw {}, {}({})", dst, offset, base)
    }

    pub fn sw(&mut self, src: Reg, base: Reg, offset: i32) -> Result {
        writeln!(self.buf, "  sw {}, {}({})", src, offset, base)
    }

    pub fn mv(&mut self, dst: Reg, src: Reg) -> Result {
        if dst == src {
            return Ok(());
        }
        self.unary(AsmUnaryOp::Move, dst, src)
    }

    pub fn unary(&mut self, op: AsmUnaryOp, dst: Reg, opr: Reg) -> Result {
        writeln!(self.buf, "  {} {}, {}", op, dst, opr)
    }

    pub fn binary(&mut self, op: AsmBinaryOp, dst: Reg, lhs: Reg, rhs: Reg) -> Result {
        writeln!(self.buf, "  {} {}, {}, {}", op, dst, lhs, rhs)
    }

    pub fn binary_imm(&mut self, op: AsmBinaryOp, dst: Reg, lhs: Reg, imm: i32) -> Result {
        writeln!(self.buf, "  {} {}, {}, {}", op, dst, lhs, imm)
    }

    /// `dst = src + imm`, going through `tmp` when `imm` needs more than
    /// 12 bits.
    pub fn add_imm(&mut self, dst: Reg, src: Reg, imm: i32, tmp: Reg) -> Result {
        if imm12(imm) {
            self.binary_imm(AsmBinaryOp::Addi, dst, src, imm)
        } else {
            self.li(tmp, imm)?;
            self.binary(AsmBinaryOp::Add, dst, src, tmp)
        }
    }

    pub fn bnez(&mut self, cond: Reg, target: &str) -> Result {
        writeln!(self.buf, "  bnez {}, {}", cond, target)
    }

    pub fn j(&mut self, target: &str) -> Result {
        writeln!(self.buf, "  j {}", target)
    }

    pub fn call(&mut self, callee: &str) -> Result {
        writeln!(self.buf, "  call {}", callee)
    }

    pub fn ret(&mut self) -> Result {
        writeln!(self.buf, "  ret")
    }
}
