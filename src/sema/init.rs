use anyhow::{bail, Result};

use crate::ast::{Expr, InitVal, Pos};
use crate::utils::{CompileError, ErrorKind};

/// Number of elements in an array of shape `dims`, if its byte size fits a
/// `usize`.
pub fn element_count(dims: &[usize]) -> Option<usize> {
    let count = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
    count.checked_mul(4).map(|_| count)
}

/// Lays an initializer list over an array of shape `dims`.
///
/// Returns one entry per element in row-major order; `None` stands for an
/// element that is implicitly zero.
pub fn flatten<'a>(init: &'a InitVal, dims: &[usize], pos: Pos) -> Result<Vec<Option<&'a Expr>>> {
    let count =
        element_count(dims).ok_or_else(|| CompileError::new(ErrorKind::InvalidArrayDim, pos))?;
    let mut elems = vec![None; count];
    match init {
        InitVal::List(list) => fill(list, dims, &mut elems, pos)?,
        InitVal::Expr(_) => bail!(CompileError::new(ErrorKind::InvalidInitializer, pos)),
    }
    Ok(elems)
}

fn fill<'a>(
    list: &'a [InitVal],
    dims: &[usize],
    elems: &mut [Option<&'a Expr>],
    pos: Pos,
) -> Result<()> {
    let invalid = || CompileError::new(ErrorKind::InvalidInitializer, pos);
    let mut cur = 0;
    for item in list {
        if cur >= elems.len() {
            bail!(invalid());
        }
        match item {
            InitVal::Expr(e) => {
                elems[cur] = Some(e);
                cur += 1;
            }
            InitVal::List(sub) => {
                // a nested list fills the largest sub-array aligned at `cur`
                let sub_dims = (1..dims.len())
                    .map(|i| &dims[i..])
                    .find(|d| cur % d.iter().product::<usize>() == 0)
                    .ok_or_else(invalid)?;
                let size = sub_dims.iter().product::<usize>();
                fill(sub, sub_dims, &mut elems[cur..cur + size], pos)?;
                cur += size;
            }
        }
    }
    Ok(())
}
