pub mod args;
pub mod error;
pub mod logger;
pub mod source_map;

pub use error::{CompileError, ErrorKind};
