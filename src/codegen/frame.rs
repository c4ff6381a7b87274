use std::collections::HashSet;

use anyhow::{bail, Result};

use super::riscv::S;
use super::*;
use crate::utils::{CompileError, ErrorKind};

pub const MAX_FRAME_SIZE: usize = 2047;

/// Stack layout of one function, from `0(sp)` upwards:
/// the result slots, the saved `s` registers, then `ra` in the topmost word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub slots: i32,
    /// Bit `i` is set when `a<i>` is parked in `s<i>` around calls.
    pub saved: u8,
    pub saves_ra: bool,
}

impl Frame {
    pub fn size(&self) -> i32 {
        self.slots + 4 * self.saved.count_ones() as i32 + if self.saves_ra { 4 } else { 0 }
    }

    /// Index and stack offset of every parked argument register.
    pub fn saved_regs(self) -> impl Iterator<Item = (usize, i32)> {
        (0..S.len())
            .filter(move |i| self.saved & (1 << i) != 0)
            .enumerate()
            .map(move |(k, i)| (i, self.slots + 4 * k as i32))
    }

    pub fn is_saved(&self, index: usize) -> bool {
        index < S.len() && self.saved & (1 << index) != 0
    }

    pub fn ra_offset(&self) -> i32 {
        self.size() - 4
    }
}

/// Basic blocks of `func` in layout order, each with its instructions.
///
/// Planning and emission both walk the function through this, so slots
/// are handed out in the order they were counted.
pub fn blocks(func: &FunctionData) -> impl Iterator<Item = (BasicBlock, Vec<Value>)> + '_ {
    func.layout()
        .bbs()
        .iter()
        .map(|(&bb, node)| (bb, node.insts().keys().copied().collect()))
}

pub fn instructions(func: &FunctionData) -> impl Iterator<Item = Value> + '_ {
    blocks(func).flat_map(|(_, insts)| insts)
}

/// Bytes kept on the stack for the result of an instruction, or `None`
/// if the result never needs to outlive the instruction.
pub fn slot_size(data: &ValueData) -> Result<Option<usize>> {
    let size = match data.kind() {
        ValueKind::Alloc(_) => match data.ty().kind() {
            TypeKind::Pointer(base) => base.size(),
            _ => bail!(CompileError::backend(ErrorKind::UnsupportedType(
                data.ty().to_string()
            ))),
        },
        ValueKind::Load(_)
        | ValueKind::Binary(_)
        | ValueKind::GetPtr(_)
        | ValueKind::GetElemPtr(_) => 4,
        ValueKind::Call(_) if !data.ty().is_unit() => 4,
        _ => return Ok(None),
    };
    Ok(Some(size))
}

pub fn plan(func: &FunctionData) -> Result<Frame> {
    let name = &func.name()[1..];
    let params = func.params().len();
    if params > S.len() {
        bail!(CompileError::backend(ErrorKind::TooManyParams(
            name.to_string(),
            params
        )));
    }

    let mut slots: usize = 0;
    let mut calls = false;
    for inst in instructions(func) {
        let data = func.dfg().value(inst);
        calls |= matches!(data.kind(), ValueKind::Call(_));
        slots = slots.saturating_add(slot_size(data)?.unwrap_or(0));
    }

    let saved = if calls { parked_args(func) } else { 0 };
    let size = slots
        .saturating_add(4 * saved.count_ones() as usize)
        .saturating_add(if calls { 4 } else { 0 });
    if size > MAX_FRAME_SIZE {
        bail!(CompileError::backend(ErrorKind::FrameTooLarge(
            name.to_string(),
            size
        )));
    }

    Ok(Frame {
        slots: slots as i32,
        saved,
        saves_ra: calls,
    })
}

/// Arguments whose registers must survive a call: those read anywhere
/// except in the entry block ahead of its first call.
fn parked_args(func: &FunctionData) -> u8 {
    let mut early = HashSet::new();
    if let Some(entry) = func.layout().entry_bb() {
        // a branch back to the entry block would run its prefix again
        if func.dfg().bb(entry).used_by().is_empty() {
            if let Some((_, insts)) = blocks(func).find(|(bb, _)| *bb == entry) {
                early.extend(insts.into_iter().take_while(|&inst| {
                    !matches!(func.dfg().value(inst).kind(), ValueKind::Call(_))
                }));
            }
        }
    }

    let mut mask = 0;
    for (i, &arg) in func.params().iter().enumerate() {
        let users = func.dfg().value(arg).used_by();
        if users.iter().any(|user| !early.contains(user)) {
            mask |= 1 << i;
        }
    }
    mask
}
