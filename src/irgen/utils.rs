use strum_macros::Display;

use crate::ast::{BinaryOp, ReturnKind};
use crate::sema::PARAM_SLOT;

/// Functions provided by the SysY runtime.
pub struct LibFunc {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub ret: ReturnKind,
}

pub const LIBRARY: &[LibFunc] = &[
    LibFunc { name: "getint", params: &[], ret: ReturnKind::Int },
    LibFunc { name: "getch", params: &[], ret: ReturnKind::Int },
    LibFunc { name: "getarray", params: &["*i32"], ret: ReturnKind::Int },
    LibFunc { name: "putint", params: &["i32"], ret: ReturnKind::Void },
    LibFunc { name: "putch", params: &["i32"], ret: ReturnKind::Void },
    LibFunc { name: "putarray", params: &["i32", "*i32"], ret: ReturnKind::Void },
    LibFunc { name: "starttime", params: &[], ret: ReturnKind::Void },
    LibFunc { name: "stoptime", params: &[], ret: ReturnKind::Void },
];

impl LibFunc {
    pub fn decl(&self) -> String {
        format!("decl @{}({}){}", self.name, self.params.join(", "), ret_suffix(self.ret))
    }
}

#[derive(Debug, Display, Clone, Copy)]
pub enum IrOp {
    #[strum(serialize = "add")]
    Add,
    #[strum(serialize = "sub")]
    Sub,
    #[strum(serialize = "mul")]
    Mul,
    #[strum(serialize = "div")]
    Div,
    #[strum(serialize = "mod")]
    Mod,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "eq")]
    Eq,
    #[strum(serialize = "ne")]
    NotEq,
    #[strum(serialize = "lt")]
    Lt,
    #[strum(serialize = "le")]
    Le,
    #[strum(serialize = "gt")]
    Gt,
    #[strum(serialize = "ge")]
    Ge,
}

impl From<BinaryOp> for IrOp {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => IrOp::Add,
            BinaryOp::Sub => IrOp::Sub,
            BinaryOp::Mul => IrOp::Mul,
            BinaryOp::Div => IrOp::Div,
            BinaryOp::Mod => IrOp::Mod,
            BinaryOp::And => IrOp::And,
            BinaryOp::Or => IrOp::Or,
            BinaryOp::Eq => IrOp::Eq,
            BinaryOp::Neq => IrOp::NotEq,
            BinaryOp::Lt => IrOp::Lt,
            BinaryOp::Le => IrOp::Le,
            BinaryOp::Gt => IrOp::Gt,
            BinaryOp::Ge => IrOp::Ge,
        }
    }
}

pub fn ret_suffix(ret: ReturnKind) -> &'static str {
    match ret {
        ReturnKind::Int => ": i32",
        ReturnKind::Void => "",
    }
}

/// Storage identifier of a variable: `@x_0` for globals, `@x_N` for the
/// N-th local `x`, `%param_x` for the copy of parameter `x`.
pub fn storage(name: &str, slot: i32) -> String {
    if slot == PARAM_SLOT {
        format!("%param_{}", name)
    } else {
        format!("@{}_{}", name, slot)
    }
}

pub fn label(kind: &str, id: usize) -> String {
    match id {
        0 => format!("%{}", kind),
        _ => format!("%{}_{}", kind, id),
    }
}

/// `int a[2][3]` is `[[i32, 3], 2]`.
pub fn array_type(dims: &[usize]) -> String {
    dims.iter()
        .rev()
        .fold("i32".to_string(), |ty, d| format!("[{}, {}]", ty, d))
}

/// Type of an array parameter with the given dimensions after `[]`.
pub fn param_array_type(tail: &[usize]) -> String {
    format!("*{}", array_type(tail))
}

/// Koopa aggregate for row-major `vals` of shape `dims`.
pub fn aggregate(vals: &[i32], dims: &[usize]) -> String {
    let elems: Vec<String> = match dims {
        [_, rest @ ..] if !rest.is_empty() => {
            let stride = rest.iter().product();
            vals.chunks(stride).map(|c| aggregate(c, rest)).collect()
        }
        _ => vals.iter().map(i32::to_string).collect(),
    };
    format!("{{{}}}", elems.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_nest_outer_dimension_last() {
        assert_eq!(array_type(&[4]), "[i32, 4]");
        assert_eq!(array_type(&[2, 3]), "[[i32, 3], 2]");
        assert_eq!(param_array_type(&[]), "*i32");
        assert_eq!(param_array_type(&[3, 5]), "*[[i32, 5], 3]");
    }

    #[test]
    fn aggregates_follow_shape() {
        assert_eq!(aggregate(&[1, 2, 3], &[3]), "{1, 2, 3}");
        assert_eq!(aggregate(&[1, 2, 3, 4, 5, 6], &[2, 3]), "{{1, 2, 3}, {4, 5, 6}}");
    }

    #[test]
    fn ops_print_their_mnemonic() {
        assert_eq!(IrOp::from(BinaryOp::Neq).to_string(), "ne");
        assert_eq!(IrOp::from(BinaryOp::Mod).to_string(), "mod");
        assert_eq!(format!("{}", IrOp::Ge), "ge");
    }

    #[test]
    fn labels_omit_zero_suffix() {
        assert_eq!(label("then", 0), "%then");
        assert_eq!(label("while_end", 3), "%while_end_3");
    }

    #[test]
    fn library_decls() {
        let decls: Vec<_> = LIBRARY.iter().map(LibFunc::decl).collect();
        assert!(decls.contains(&"decl @getarray(*i32): i32".to_string()));
        assert!(decls.contains(&"decl @putarray(i32, *i32)".to_string()));
        assert!(decls.contains(&"decl @starttime()".to_string()));
    }
}
