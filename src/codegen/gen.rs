use anyhow::{bail, Result};
use log::{debug, trace};

use super::context::{Context, FunctionInfo};
use super::frame::{self, blocks, Frame};
use super::riscv::*;
use super::write::AsmWriter;
use super::*;
use crate::utils::{CompileError, ErrorKind};

/// Lowers one instruction. `dest` is the instruction's own value, whose
/// slot receives the result if it has one.
pub trait GenerateAsm {
    fn generate(&self, w: &mut AsmWriter, info: &mut FunctionInfo, dest: Value) -> Result<()>;
}

fn unsupported(kind: &ValueKind) -> CompileError {
    CompileError::backend(ErrorKind::UnsupportedInstruction(format!("{:?}", kind)))
}

pub fn generate_program(program: &Program, w: &mut AsmWriter) -> Result<()> {
    let mut ctx = Context::new(program);

    if !program.inst_layout().is_empty() {
        w.segment("data")?;
    }
    for (i, &alloc) in program.inst_layout().iter().enumerate() {
        let data = program.borrow_value(alloc);
        let ValueKind::GlobalAlloc(global) = data.kind() else {
            bail!(unsupported(data.kind()));
        };
        let symbol = match data.name() {
            Some(name) => name[1..].to_string(),
            None => format!("global_{}", i),
        };
        w.global_symbol(&symbol)?;
        global_init(program, global.init(), w)?;
        w.blank()?;
        ctx.register_global(alloc, symbol);
    }

    for &func in program.func_layout() {
        let data = program.func(func);
        // declarations have no body
        if data.layout().entry_bb().is_none() {
            continue;
        }
        generate_function(&ctx, data, w)?;
    }

    Ok(())
}

fn global_init(program: &Program, init: Value, w: &mut AsmWriter) -> Result<()> {
    let data = program.borrow_value(init);
    match data.kind() {
        ValueKind::Integer(i) => w.word(i.value())?,
        ValueKind::ZeroInit(_) | ValueKind::Undef(_) => w.zero(data.ty().size())?,
        ValueKind::Aggregate(agg) => {
            for &elem in agg.elems() {
                global_init(program, elem, w)?;
            }
        }
        kind => bail!(unsupported(kind)),
    }
    Ok(())
}

fn generate_function<'p>(ctx: &Context<'p>, func: &'p FunctionData, w: &mut AsmWriter) -> Result<()> {
    let frame = frame::plan(func)?;
    let mut info = FunctionInfo::new(ctx, func, frame);
    debug!("{}: {:?}, {} bytes", info.name(), frame, frame.size());

    w.segment("text")?;
    w.global_symbol(info.name())?;
    prologue(w, frame)?;
    for (bb, insts) in blocks(func) {
        w.local_symbol(info.bb_label(bb)?)?;
        for inst in insts {
            generate_inst(w, &mut info, inst)?;
        }
    }

    if info.used_slots() != frame.slots {
        bail!(
            "{} used {} bytes of slots but {} were planned",
            info.name(),
            info.used_slots(),
            frame.slots
        );
    }
    w.blank()?;
    Ok(())
}

fn prologue(w: &mut AsmWriter, frame: Frame) -> Result<()> {
    if frame.size() > 0 {
        w.binary_imm(AsmBinaryOp::Addi, "sp", "sp", -frame.size())?;
    }
    if frame.saves_ra {
        w.sw("ra", "sp", frame.ra_offset())?;
    }
    for (i, offset) in frame.saved_regs() {
        w.sw(S[i], "sp", offset)?;
    }
    Ok(())
}

fn epilogue(w: &mut AsmWriter, frame: Frame) -> Result<()> {
    for (i, offset) in frame.saved_regs() {
        w.lw(S[i], "sp", offset)?;
    }
    if frame.saves_ra {
        w.lw("ra", "sp", frame.ra_offset())?;
    }
    if frame.size() > 0 {
        w.binary_imm(AsmBinaryOp::Addi, "sp", "sp", frame.size())?;
    }
    Ok(())
}

fn generate_inst(w: &mut AsmWriter, info: &mut FunctionInfo, inst: Value) -> Result<()> {
    let kind = info.data(inst).kind();
    trace!("{}: {:?}", info.name(), kind);
    match kind {
        ValueKind::Alloc(_) => {
            info.slot(inst)?;
            Ok(())
        }
        ValueKind::Load(v) => v.generate(w, info, inst),
        ValueKind::Store(v) => v.generate(w, info, inst),
        ValueKind::GetPtr(v) => v.generate(w, info, inst),
        ValueKind::GetElemPtr(v) => v.generate(w, info, inst),
        ValueKind::Binary(v) => v.generate(w, info, inst),
        ValueKind::Branch(v) => v.generate(w, info, inst),
        ValueKind::Jump(v) => v.generate(w, info, inst),
        ValueKind::Call(v) => v.generate(w, info, inst),
        ValueKind::Return(v) => v.generate(w, info, inst),
        kind => bail!(unsupported(kind)),
    }
}

impl GenerateAsm for Load {
    fn generate(&self, w: &mut AsmWriter, info: &mut FunctionInfo, dest: Value) -> Result<()> {
        let src = self.src();
        if let Some(symbol) = info.global(src) {
            w.la("t0", symbol)?;
            w.lw("t0", "t0", 0)?;
        } else if info.is_local_alloc(src) {
            let offset = info.slot(src)?;
            w.lw("t0", "sp", offset)?;
        } else {
            let ptr = info.operand(w, src, "t0")?;
            w.lw("t0", ptr, 0)?;
        }
        let offset = info.slot(dest)?;
        w.sw("t0", "sp", offset)?;
        Ok(())
    }
}

impl GenerateAsm for Store {
    fn generate(&self, w: &mut AsmWriter, info: &mut FunctionInfo, _: Value) -> Result<()> {
        let src = info.operand(w, self.value(), "t0")?;
        let dest = self.dest();
        if let Some(symbol) = info.global(dest) {
            w.la("t1", symbol)?;
            w.sw(src, "t1", 0)?;
        } else if info.is_local_alloc(dest) {
            let offset = info.slot(dest)?;
            w.sw(src, "sp", offset)?;
        } else {
            let ptr = info.operand(w, dest, "t1")?;
            w.sw(src, ptr, 0)?;
        }
        Ok(())
    }
}

impl GenerateAsm for GetPtr {
    fn generate(&self, w: &mut AsmWriter, info: &mut FunctionInfo, dest: Value) -> Result<()> {
        element_address(w, info, self.src(), self.index(), dest)
    }
}

impl GenerateAsm for GetElemPtr {
    fn generate(&self, w: &mut AsmWriter, info: &mut FunctionInfo, dest: Value) -> Result<()> {
        element_address(w, info, self.src(), self.index(), dest)
    }
}

/// `src + index * stride`, where the stride is the size of what the
/// resulting pointer points to.
fn element_address(
    w: &mut AsmWriter,
    info: &mut FunctionInfo,
    src: Value,
    index: Value,
    dest: Value,
) -> Result<()> {
    let ty = info.data(dest).ty();
    let unsupported_ty = || CompileError::backend(ErrorKind::UnsupportedType(ty.to_string()));
    let stride = match ty.kind() {
        TypeKind::Pointer(base) => i32::try_from(base.size()).map_err(|_| unsupported_ty())?,
        _ => bail!(unsupported_ty()),
    };

    match info.integer(index) {
        Some(i) => {
            info.load_into(w, src, "t0")?;
            let offset = i.wrapping_mul(stride);
            if offset != 0 {
                w.add_imm("t0", "t0", offset, "t1")?;
            }
        }
        None => {
            info.load_into(w, index, "t1")?;
            if (stride as u32).is_power_of_two() {
                let shift = stride.trailing_zeros() as i32;
                w.binary_imm(AsmBinaryOp::Slli, "t1", "t1", shift)?;
            } else {
                w.li("t0", stride)?;
                w.binary(AsmBinaryOp::Mul, "t1", "t1", "t0")?;
            }
            info.load_into(w, src, "t0")?;
            w.binary(AsmBinaryOp::Add, "t0", "t0", "t1")?;
        }
    }

    let offset = info.slot(dest)?;
    w.sw("t0", "sp", offset)?;
    Ok(())
}

impl GenerateAsm for Binary {
    fn generate(&self, w: &mut AsmWriter, info: &mut FunctionInfo, dest: Value) -> Result<()> {
        let lhs = info.operand(w, self.lhs(), "t0")?;
        let imm_form = info
            .integer(self.rhs())
            .filter(|&i| i != 0)
            .and_then(|i| with_imm(self.op(), i));

        if let Some((op, imm)) = imm_form {
            w.binary_imm(op, "t0", lhs, imm)?;
        } else {
            let rhs = info.operand(w, self.rhs(), "t1")?;
            match lower_binary(self.op()) {
                Lowering::Direct(op) => w.binary(op, "t0", lhs, rhs)?,
                // comparing against zero needs no xor
                Lowering::Test(AsmBinaryOp::Xor, test) if rhs == ZERO => {
                    w.unary(test, "t0", lhs)?
                }
                Lowering::Test(AsmBinaryOp::Xor, test) if lhs == ZERO => {
                    w.unary(test, "t0", rhs)?
                }
                Lowering::Test(op, test) => {
                    w.binary(op, "t0", lhs, rhs)?;
                    w.unary(test, "t0", "t0")?;
                }
            }
        }

        let offset = info.slot(dest)?;
        w.sw("t0", "sp", offset)?;
        Ok(())
    }
}

impl GenerateAsm for Branch {
    fn generate(&self, w: &mut AsmWriter, info: &mut FunctionInfo, _: Value) -> Result<()> {
        let cond = info.operand(w, self.cond(), "t0")?;
        w.bnez(cond, info.bb_label(self.true_bb())?)?;
        w.j(info.bb_label(self.false_bb())?)?;
        Ok(())
    }
}

impl GenerateAsm for Jump {
    fn generate(&self, w: &mut AsmWriter, info: &mut FunctionInfo, _: Value) -> Result<()> {
        w.j(info.bb_label(self.target())?)?;
        Ok(())
    }
}

impl GenerateAsm for Call {
    fn generate(&self, w: &mut AsmWriter, info: &mut FunctionInfo, dest: Value) -> Result<()> {
        let callee = info.callee_name(self.callee());
        let args = self.args();
        if args.len() > A.len() {
            bail!(CompileError::backend(ErrorKind::TooManyArguments(
                callee.to_string(),
                args.len()
            )));
        }

        let frame = info.frame();
        for (i, _) in frame.saved_regs() {
            w.mv(S[i], A[i])?;
        }
        info.set_in_call(true);
        for (&arg, &reg) in args.iter().zip(A.iter()) {
            info.load_into(w, arg, reg)?;
        }
        info.set_in_call(false);

        w.call(callee)?;
        if !info.data(dest).ty().is_unit() {
            let offset = info.slot(dest)?;
            w.sw("a0", "sp", offset)?;
        }
        for (i, _) in frame.saved_regs() {
            w.mv(A[i], S[i])?;
        }
        Ok(())
    }
}

impl GenerateAsm for Return {
    fn generate(&self, w: &mut AsmWriter, info: &mut FunctionInfo, _: Value) -> Result<()> {
        if let Some(val) = self.value() {
            info.load_into(w, val, "a0")?;
        }
        epilogue(w, info.frame())?;
        w.ret()?;
        Ok(())
    }
}
