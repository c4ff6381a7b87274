use std::fs;
use std::io::Write;

use anyhow::Result;
use lalrpop_util::{lalrpop_mod, lexer::Token, ParseError};
use log::{debug, info};
use tempfile::NamedTempFile;

use codegen::{generate_asm, load_ir};
use irgen::generate_ir;
use utils::args::{Mode, Params};
use utils::{logger, CompileError, ErrorKind};

mod ast;
mod codegen;
mod irgen;
mod sema;
mod utils;

lalrpop_mod!(sysy);

pub fn parse(source: &str) -> Result<ast::CompUnit> {
    sysy::CompUnitParser::new()
        .parse(source)
        .map_err(|e| syntax_error(e).into())
}

fn syntax_error(e: ParseError<usize, Token<'_>, &'static str>) -> CompileError {
    let (pos, msg) = match e {
        ParseError::InvalidToken { location } => (location, "invalid token".to_string()),
        ParseError::UnrecognizedEOF { location, expected } => (
            location,
            format!("unexpected end of file, expected one of {}", expected.join(" ")),
        ),
        ParseError::UnrecognizedToken {
            token: (location, token, _),
            expected,
        } => (
            location,
            format!("unexpected `{}`, expected one of {}", token, expected.join(" ")),
        ),
        ParseError::ExtraToken {
            token: (location, token, _),
        } => (location, format!("extra token `{}`", token)),
        ParseError::User { error } => (0, error.to_string()),
    };
    CompileError::new(ErrorKind::Syntax(msg), pos)
}

fn compile(params: &Params, source: &str) -> Result<()> {
    let ast = parse(source)?;
    info!("parsed {}", params.input);
    let ir = generate_ir(&ast)?;

    let output = match params.mode {
        Mode::Koopa => ir,
        Mode::Riscv | Mode::Perf => {
            let mut artifact = NamedTempFile::new()?;
            artifact.write_all(ir.as_bytes())?;
            debug!("Koopa IR saved to {}", artifact.path().display());
            let text = fs::read_to_string(artifact.path())?;
            let program = load_ir(&text)?;
            generate_asm(&program)?
        }
    };

    fs::write(&params.output, output)?;
    info!("wrote {}", params.output);
    Ok(())
}

fn main() {
    logger::init();

    let params = match Params::from_args() {
        Ok(params) => params,
        Err(e) => logger::print_error_and_exit(&e, None, 1),
    };
    let source = match fs::read_to_string(&params.input) {
        Ok(source) => source,
        Err(e) => logger::print_error_and_exit(
            &anyhow::Error::new(e).context(format!("cannot read {}", params.input)),
            None,
            1,
        ),
    };
    if let Err(e) = compile(&params, &source) {
        logger::print_error_and_exit(&e, Some(&source), 1);
    }
}
