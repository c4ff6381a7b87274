mod eval;
mod init;
mod symbol;

pub use eval::ConstEval;
pub use init::{element_count, flatten};
pub use symbol::*;
