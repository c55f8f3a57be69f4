use anyhow::Context;
use anyhow::Result;
use clap::ArgMatches;
use clap::Args;
use clap::Command;
use qfold::convert::RewriteResult;
use qfold::frontend::DefaultParserDispatch;
use qfold::frontend::Parser;
use qfold::shared::SharedExt;
use qfold::transform;
use qfold::DefaultTransformDispatch;
use qfold::Passes;
use qfold::TransformOptions;
use std::io::Read;
use tracing::Level;

/// Fold quantized constants in MLIR-like IR
#[derive(Args, Debug)]
#[command(version, about)]
struct QfoldArgs {
    /// The input file (- is interpreted as stdin)
    #[arg(default_value = "-")]
    input: String,
    /// Print debug logs to stdout
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn cli() -> Command {
    let cli = Command::new("qfold-opt").args(qfold::default_arguments());
    QfoldArgs::augment_args(cli)
}

fn parse_and_transform(src: &str, options: &TransformOptions) -> Result<String> {
    let module = Parser::<DefaultParserDispatch>::parse(src)?;
    let result = transform::<DefaultTransformDispatch>(module.clone(), options)?;
    let root = match result {
        RewriteResult::Changed(changed) => changed.op,
        RewriteResult::Unchanged => module,
    };
    let text = root.rd().to_string();
    Ok(text)
}

fn read_input(matches: &ArgMatches) -> Result<String> {
    let input = match matches.get_one::<String>("input") {
        Some(input) => input.as_str(),
        None => "-",
    };
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("could not read {input}"))
    }
}

fn main() -> Result<()> {
    let cli = cli();
    let args = std::env::args_os();
    let passes = Passes::from_convert_args(args);
    let matches = cli.get_matches();

    let level = if matches.get_flag("debug") {
        Level::DEBUG
    } else {
        Level::INFO
    };
    qfold::init_subscriber(level)?;

    let options = TransformOptions::from_args(&matches, passes);
    let src = read_input(&matches)?;
    let result = parse_and_transform(&src, &options)?;
    println!("{result}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn run_app(args: Vec<&str>, src: &str) -> Result<String> {
        let cli = cli();
        let args_owned: Vec<String> = args.iter().map(|&s| s.to_string()).collect();
        let matches = cli.try_get_matches_from(args_owned)?;
        let passes = Passes::from_convert_vec(args);
        let options = TransformOptions::from_args(&matches, passes);
        parse_and_transform(src, &options)
    }

    #[test]
    fn test_help() {
        let args = vec!["qfold-opt", "--help"];
        let result = run_app(args, "");
        let err = match result {
            Ok(_) => panic!("Expected an error"),
            Err(e) => e,
        };
        let result = err.to_string();
        println!("{result}");
        assert!(result.contains("Usage: qfold-opt"));
        assert!(result.contains("--quant-convert-const"));
        assert!(result.contains("--ir-dump-dir"));
    }

    #[test]
    fn test_convert_const() {
        let src = indoc! {"
        func.func @main() -> f32 {
          %0 = arith.constant 2.0 : f32
          %1 = quant.qcast %0 : f32 to !quant.uniform<u8:f32, 0.5>
          %2 = quant.dcast %1 : !quant.uniform<u8:f32, 0.5> to f32
          return %2 : f32
        }
        "};
        let args = vec!["qfold-opt", "--quant-convert-const"];
        let result = run_app(args, src).unwrap();
        assert!(result.contains("%3 = arith.constant 4 : ui8"));
        assert!(result.contains("%1 = quant.scast %3 : ui8 to !quant.uniform<u8:f32, 0.5>"));
    }

    #[test]
    fn test_dump_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_string_lossy().to_string();
        let src = indoc! {"
        func.func @main() {
          return
        }
        "};
        let args = vec!["qfold-opt", "--canonicalize", "--ir-dump-dir", dir.as_str()];
        run_app(args, src).unwrap();
        let runs = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(runs, 1);
    }

    #[test]
    fn test_parse_error() {
        let args = vec!["qfold-opt"];
        let result = run_app(args, "foo.bar");
        assert!(result.is_err());
    }
}
