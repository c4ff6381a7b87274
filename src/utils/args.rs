use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Koopa,
    Riscv,
    Perf,
}

#[derive(Debug, Clone)]
pub struct Params {
    pub mode: Mode,
    pub input: String,
    pub output: String,
}

impl Params {
    pub fn from_args() -> Result<Self> {
        Self::parse(std::env::args().skip(1))
    }

    /// Accepts `<mode> <input> -o <output>` with the three parts in any order.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut args = args.into_iter();
        let mut mode = None;
        let mut input = None;
        let mut output = None;

        while let Some(arg) = args.next() {
            let flag = match arg.as_str() {
                "-koopa" => Some(Mode::Koopa),
                "-riscv" => Some(Mode::Riscv),
                "-perf" => Some(Mode::Perf),
                "-o" => {
                    let Some(path) = args.next() else {
                        bail!("output file not specified after -o");
                    };
                    if output.replace(path).is_some() {
                        bail!("multiple output files are not supported");
                    }
                    continue;
                }
                s if s.starts_with('-') => bail!("invalid mode: {}", s),
                _ => None,
            };
            match flag {
                Some(m) => {
                    if mode.replace(m).is_some() {
                        bail!("multiple modes specified; choose one of -koopa, -riscv, -perf");
                    }
                }
                None => {
                    if input.replace(arg).is_some() {
                        bail!("multiple input files are not supported");
                    }
                }
            }
        }

        let Some(mode) = mode else {
            bail!("no mode specified (-koopa, -riscv or -perf)");
        };
        let Some(input) = input else {
            bail!("input file not specified");
        };
        let Some(output) = output else {
            bail!("output file not specified");
        };
        Ok(Params {
            mode,
            input,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Params> {
        Params::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn usual_order() {
        let params = parse(&["-riscv", "hello.c", "-o", "hello.S"]).unwrap();
        assert_eq!(params.mode, Mode::Riscv);
        assert_eq!(params.input, "hello.c");
        assert_eq!(params.output, "hello.S");
    }

    #[test]
    fn output_first() {
        let params = parse(&["-o", "out.koopa", "-koopa", "in.c"]).unwrap();
        assert_eq!(params.mode, Mode::Koopa);
        assert_eq!(params.input, "in.c");
    }

    #[test]
    fn rejects_bad_invocations() {
        assert!(parse(&["hello.c", "-o", "hello.S"]).is_err());
        assert!(parse(&["-riscv", "hello.c"]).is_err());
        assert!(parse(&["-riscv", "-koopa", "hello.c", "-o", "x"]).is_err());
        assert!(parse(&["-riscv", "a.c", "b.c", "-o", "x"]).is_err());
        assert!(parse(&["-llvm", "a.c", "-o", "x"]).is_err());
        assert!(parse(&["-riscv", "a.c", "-o"]).is_err());
    }
}
