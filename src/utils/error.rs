use std::fmt;

use crate::ast::Pos;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax(String),
    UndefinedSymbol(String),
    Redeclaration(String),
    NotConstant,
    AssignToConst(String),
    NotAnArray(String),
    NotAFunction(String),
    NotAValue(String),
    TooManyArguments(String, usize),
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
    },
    VoidValue(String),
    OutsideLoop(&'static str),
    InvalidInitializer,
    InvalidArrayDim,
    ReturnMismatch(String),
    InvalidIr(String),
    UnsupportedInstruction(String),
    UnsupportedType(String),
    TooManyParams(String, usize),
    FrameTooLarge(String, usize),
}

/// A fatal diagnostic. `pos` is a byte offset into the source when the
/// error comes from the front end; back-end errors carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub pos: Option<Pos>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, pos: Pos) -> Self {
        Self {
            kind,
            pos: Some(pos),
        }
    }

    pub fn backend(kind: ErrorKind) -> Self {
        Self { kind, pos: None }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(msg) => write!(f, "{}", msg),
            Self::UndefinedSymbol(name) => write!(f, "{} is not defined in the current scope", name),
            Self::Redeclaration(name) => write!(f, "{}: duplicate definition", name),
            Self::NotConstant => write!(f, "expected a constant expression"),
            Self::AssignToConst(name) => write!(f, "cannot assign to constant {}", name),
            Self::NotAnArray(name) => write!(f, "{} cannot be indexed", name),
            Self::NotAFunction(name) => write!(f, "{} is not a function", name),
            Self::NotAValue(name) => write!(f, "{} cannot be used as a value here", name),
            Self::TooManyArguments(callee, n) => {
                write!(f, "call to {} passes {} arguments (at most 8)", callee, n)
            }
            Self::ArityMismatch {
                callee,
                expected,
                found,
            } => write!(
                f,
                "{} takes {} arguments but {} were supplied",
                callee, expected, found
            ),
            Self::VoidValue(callee) => write!(f, "void function {} used as a value", callee),
            Self::OutsideLoop(stmt) => write!(f, "{} statement occurs outside the loop", stmt),
            Self::InvalidInitializer => write!(f, "invalid initializer"),
            Self::InvalidArrayDim => write!(f, "array dimensions must be positive and fit in memory"),
            Self::ReturnMismatch(func) => write!(f, "return value does not match the type of {}", func),
            Self::InvalidIr(msg) => write!(f, "invalid Koopa IR: {}", msg),
            Self::UnsupportedInstruction(inst) => write!(f, "cannot lower instruction: {}", inst),
            Self::UnsupportedType(ty) => write!(f, "unsupported type: {}", ty),
            Self::TooManyParams(func, n) => {
                write!(f, "{} declares {} parameters (at most 8)", func, n)
            }
            Self::FrameTooLarge(func, size) => {
                write!(f, "stack frame of {} is {} bytes (at most 2047)", func, size)
            }
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for CompileError {}
