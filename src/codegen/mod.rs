mod context;
mod frame;
mod gen;
mod riscv;
mod tests;
mod write;

use anyhow::{bail, Result};
use koopa::front::Driver;
use koopa::ir::{entities::ValueData, values::*, *};
use log::debug;

use crate::utils::{CompileError, ErrorKind};
use write::AsmWriter;

/// Parses Koopa IR text into an in-memory program.
pub fn load_ir(text: &str) -> Result<Program> {
    Type::set_ptr_size(4);
    let driver: Driver<_> = text.into();
    match driver.generate_program() {
        Ok(program) => Ok(program),
        Err(e) => bail!(CompileError::backend(ErrorKind::InvalidIr(format!(
            "{:?}",
            e
        )))),
    }
}

/// Lowers a Koopa program to RV32IM assembly text.
pub fn generate_asm(program: &Program) -> Result<String> {
    Type::set_ptr_size(4);
    let mut w = AsmWriter::new();
    gen::generate_program(program, &mut w)?;
    let asm = w.finish();
    debug!("emitted {} bytes of assembly", asm.len());
    Ok(asm)
}
