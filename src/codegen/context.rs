use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};

use super::frame::{slot_size, Frame};
use super::riscv::{Reg, A, S, ZERO};
use super::write::AsmWriter;
use super::*;
use crate::utils::{CompileError, ErrorKind};

/// Program-wide state: the symbol of every global allocation.
pub struct Context<'p> {
    program: &'p Program,
    globals: HashMap<Value, String>,
}

impl<'p> Context<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            globals: HashMap::new(),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn register_global(&mut self, val: Value, symbol: String) {
        self.globals.insert(val, symbol);
    }

    pub fn global(&self, val: Value) -> Option<&str> {
        self.globals.get(&val).map(|s| s.as_str())
    }
}

/// Per-function state, alive while one function body is emitted.
pub struct FunctionInfo<'c, 'p> {
    ctx: &'c Context<'p>,
    func: &'p FunctionData,
    frame: Frame,
    slots: HashMap<Value, i32>,
    cursor: i32,
    bbs: HashMap<BasicBlock, String>,
    in_call: bool,
}

impl<'c, 'p> FunctionInfo<'c, 'p> {
    pub fn new(ctx: &'c Context<'p>, func: &'p FunctionData, frame: Frame) -> Self {
        let name = &func.name()[1..];
        let bbs = func
            .layout()
            .bbs()
            .iter()
            .enumerate()
            .map(|(i, (&bb, _))| {
                // `.` never occurs in an identifier, so labels of different
                // functions cannot meet
                let label = match func.dfg().bb(bb).name() {
                    Some(bb_name) => format!(".L{}.{}", name, &bb_name[1..]),
                    None => format!(".L{}.{}", name, i),
                };
                (bb, label)
            })
            .collect();
        Self {
            ctx,
            func,
            frame,
            slots: HashMap::new(),
            cursor: 0,
            bbs,
            in_call: false,
        }
    }

    pub fn name(&self) -> &'p str {
        &self.func.name()[1..]
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn data(&self, val: Value) -> &'p ValueData {
        self.func.dfg().value(val)
    }

    pub fn global(&self, val: Value) -> Option<&'c str> {
        let ctx: &'c Context<'p> = self.ctx;
        ctx.global(val)
    }

    pub fn integer(&self, val: Value) -> Option<i32> {
        if self.global(val).is_some() {
            return None;
        }
        match self.data(val).kind() {
            ValueKind::Integer(i) => Some(i.value()),
            _ => None,
        }
    }

    pub fn is_local_alloc(&self, val: Value) -> bool {
        self.global(val).is_none() && matches!(self.data(val).kind(), ValueKind::Alloc(_))
    }

    pub fn callee_name(&self, callee: Function) -> &'p str {
        &self.ctx.program().func(callee).name()[1..]
    }

    pub fn bb_label(&self, bb: BasicBlock) -> Result<&str> {
        self.bbs
            .get(&bb)
            .map(|s| s.as_str())
            .ok_or_else(|| anyhow!("basic block outside the layout of {}", self.name()))
    }

    /// Stack offset of the result of `val`, assigned the first time the
    /// value is asked for.
    pub fn slot(&mut self, val: Value) -> Result<i32> {
        if let Some(&offset) = self.slots.get(&val) {
            return Ok(offset);
        }
        let data = self.data(val);
        let size = slot_size(data)?.ok_or_else(|| {
            CompileError::backend(ErrorKind::UnsupportedInstruction(format!(
                "{:?}",
                data.kind()
            )))
        })?;
        let offset = self.cursor;
        let end = i32::try_from(size)
            .ok()
            .and_then(|size| offset.checked_add(size))
            .filter(|&end| end <= self.frame.slots);
        let Some(end) = end else {
            bail!(
                "slots of {} outgrow the planned frame of {} bytes",
                self.name(),
                self.frame.slots
            );
        };
        self.cursor = end;
        self.slots.insert(val, offset);
        Ok(offset)
    }

    pub fn used_slots(&self) -> i32 {
        self.cursor
    }

    /// While set, incoming arguments are read from the `s` registers they
    /// were parked in, since the `a` registers are being overwritten.
    pub fn set_in_call(&mut self, in_call: bool) {
        self.in_call = in_call;
    }

    fn arg_reg(&self, index: usize) -> Result<Reg> {
        if index >= A.len() {
            bail!(CompileError::backend(ErrorKind::TooManyParams(
                self.name().to_string(),
                index + 1
            )));
        }
        if !self.in_call {
            return Ok(A[index]);
        }
        if !self.frame.is_saved(index) {
            bail!("argument {} of {} is read during a call but was not parked", index, self.name());
        }
        Ok(S[index])
    }

    /// Makes `val` available in a register. Constants, incoming arguments
    /// and zero are used in place; everything else goes through `scratch`.
    pub fn operand(&mut self, w: &mut AsmWriter, val: Value, scratch: Reg) -> Result<Reg> {
        if let Some(symbol) = self.global(val) {
            w.la(scratch, symbol)?;
            return Ok(scratch);
        }
        match self.data(val).kind() {
            ValueKind::Integer(i) if i.value() == 0 => Ok(ZERO),
            ValueKind::Integer(i) => {
                w.li(scratch, i.value())?;
                Ok(scratch)
            }
            ValueKind::FuncArgRef(arg) => self.arg_reg(arg.index()),
            ValueKind::Alloc(_) => {
                let offset = self.slot(val)?;
                w.add_imm(scratch, "sp", offset, scratch)?;
                Ok(scratch)
            }
            ValueKind::Load(_)
            | ValueKind::Binary(_)
            | ValueKind::GetPtr(_)
            | ValueKind::GetElemPtr(_)
            | ValueKind::Call(_) => {
                let offset = self.slot(val)?;
                w.lw(scratch, "sp", offset)?;
                Ok(scratch)
            }
            kind => bail!(CompileError::backend(ErrorKind::UnsupportedInstruction(
                format!("{:?}", kind)
            ))),
        }
    }

    /// Like [`operand`](Self::operand), but the value always ends up in `dst`.
    pub fn load_into(&mut self, w: &mut AsmWriter, val: Value, dst: Reg) -> Result<()> {
        if let Some(i) = self.integer(val) {
            w.li(dst, i)?;
            return Ok(());
        }
        let reg = self.operand(w, val, dst)?;
        w.mv(dst, reg)?;
        Ok(())
    }
}
