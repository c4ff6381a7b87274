mod context;
mod expr;
mod gen;
mod utils;

use anyhow::Result;
use log::debug;

pub use context::Context;
use gen::GenerateIR;

use crate::ast::CompUnit;

/// Lowers a parsed compilation unit to Koopa IR text.
pub fn generate_ir(ast: &CompUnit) -> Result<String> {
    let mut ctx = Context::new();
    ast.generate_ir(&mut ctx)?;
    let ir = ctx.finish();
    debug!("emitted {} bytes of Koopa IR", ir.len());
    Ok(ir)
}
