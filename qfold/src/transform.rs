use crate::canonicalize::Canonicalize;
use crate::convert::ChangedOp;
use crate::convert::ConvertConst;
use crate::convert::Pass;
use crate::convert::RewriteResult;
use crate::debug::anchor_name;
use crate::debug::DebugOptions;
use crate::debug::IrDumper;
use crate::debug::PassTiming;
use crate::ir::Op;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use std::env::ArgsOs;
use std::fmt;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;

/// A transformation pass (e.g., `--quant-convert-const`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinglePass {
    pass: String,
}

impl Display for SinglePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pass)
    }
}

impl SinglePass {
    pub fn new(pass: &str) -> SinglePass {
        let pass = pass.strip_prefix("--").unwrap_or(pass);
        SinglePass {
            pass: pass.to_string(),
        }
    }
    pub fn name(&self) -> &str {
        &self.pass
    }
}

fn is_pass_flag(arg: &str) -> bool {
    arg.starts_with("--quant-") || arg.starts_with("--canonicalize")
}

/// A collection of [SinglePass]es.
#[derive(Clone, Debug, Default)]
pub struct Passes {
    passes: Vec<SinglePass>,
}

impl Display for Passes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.passes
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<String>>()
                .join(" ")
        )
    }
}

impl Passes {
    pub fn from_vec(passes: Vec<&str>) -> Passes {
        Passes {
            passes: passes.iter().map(|p| SinglePass::new(p)).collect(),
        }
    }
    /// Extract passes (starting with `--quant-` or `--canonicalize`) from the
    /// given args while keeping their order.
    pub fn from_convert_vec(args: Vec<&str>) -> Passes {
        let passes = args.into_iter().filter(|arg| is_pass_flag(arg)).collect();
        Passes::from_vec(passes)
    }
    /// Same as [Passes::from_convert_vec] but for the process arguments.
    pub fn from_convert_args(args: ArgsOs) -> Passes {
        let mut passes = vec![];
        for arg in args {
            let arg = arg.to_string_lossy();
            if is_pass_flag(&arg) {
                passes.push(SinglePass::new(&arg));
            }
        }
        Passes { passes }
    }
    pub fn vec(&self) -> &Vec<SinglePass> {
        &self.passes
    }
}

/// Interface to add custom passes to the compiler.
///
/// Downstream crates implement this and fall back to
/// [DefaultTransformDispatch] for the passes defined here.
pub trait TransformDispatch {
    fn dispatch(op: Shared<dyn Op>, pass: &SinglePass) -> Result<RewriteResult>;
}

/// Default implementation of [TransformDispatch].
///
/// This default implementation knows only the passes that are implemented in
/// this crate.
pub struct DefaultTransformDispatch;

impl TransformDispatch for DefaultTransformDispatch {
    fn dispatch(op: Shared<dyn Op>, pass: &SinglePass) -> Result<RewriteResult> {
        match pass.name() {
            Canonicalize::NAME => Canonicalize::convert(op.clone()),
            ConvertConst::NAME => ConvertConst::convert(op.clone()),
            _ => Err(anyhow::anyhow!("Unknown pass: {}", pass)),
        }
    }
}

/// Names of the passes known to [DefaultTransformDispatch].
pub fn default_pass_names() -> Vec<&'static str> {
    vec![Canonicalize::NAME, ConvertConst::NAME]
}

/// Look up a registered pass by name (with or without the leading `--`).
pub fn create_pass(name: &str) -> Result<SinglePass> {
    let pass = SinglePass::new(name);
    if default_pass_names().contains(&pass.name()) {
        Ok(pass)
    } else {
        Err(anyhow::anyhow!("Unknown pass: {}", pass))
    }
}

/// Initialize logging with the given level.
pub fn init_subscriber(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_test_writer()
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

/// Default arguments that are available in qfold.
///
/// This includes the passes such as `--quant-convert-const`, but also debug
/// options such as `--print-ir-before-all` and `--ir-dump-dir`. `--debug` is
/// not included to allow downstream projects to handle the logging
/// differently.
pub fn default_arguments() -> Vec<Arg> {
    vec![
        Arg::new("quant-convert-const")
            .long("quant-convert-const")
            .help("Fold constants that feed quant.qcast into storage constants")
            .action(ArgAction::SetTrue),
        Arg::new("canonicalize")
            .long("canonicalize")
            .help("Fold storage casts and remove unused pure ops")
            .action(ArgAction::SetTrue),
        Arg::new("print-ir-before-all")
            .long("print-ir-before-all")
            .help("Print the IR before each pass")
            .action(ArgAction::SetTrue),
        Arg::new("print-ir-after-all")
            .long("print-ir-after-all")
            .help("Print the IR after each pass")
            .action(ArgAction::SetTrue),
        Arg::new("ir-dump-dir")
            .long("ir-dump-dir")
            .value_name("DIR")
            .help("Write the IR before and after each pass into a new subdirectory of DIR"),
        Arg::new("ir-dump-pass-regex")
            .long("ir-dump-pass-regex")
            .value_name("REGEX")
            .default_value(".*")
            .help("Only dump passes whose name fully matches REGEX"),
        Arg::new("ir-dump-func-regex")
            .long("ir-dump-func-regex")
            .value_name("REGEX")
            .default_value(".*")
            .help("Only dump functions whose name fully matches REGEX"),
        Arg::new("enable-timing")
            .long("enable-timing")
            .help("Report the time spent in each pass")
            .action(ArgAction::SetTrue),
    ]
}

/// Options for [transform].
#[derive(Clone, Debug, Default)]
pub struct TransformOptions {
    passes: Passes,
    print_ir_before_all: bool,
    print_ir_after_all: bool,
    debug: DebugOptions,
}

impl TransformOptions {
    pub fn from_passes(passes: Passes) -> Self {
        Self {
            passes,
            ..Default::default()
        }
    }
    /// Read the options from arguments that were defined via
    /// [default_arguments].
    pub fn from_args(matches: &ArgMatches, passes: Passes) -> Self {
        let mut options = Self::from_passes(passes);
        options.print_ir_before_all = matches.get_flag("print-ir-before-all");
        options.print_ir_after_all = matches.get_flag("print-ir-after-all");
        let dir = matches.get_one::<String>("ir-dump-dir").map(PathBuf::from);
        options.debug.set_ir_dump_dir(dir);
        if let Some(regex) = matches.get_one::<String>("ir-dump-pass-regex") {
            options.debug.set_ir_dump_pass_regex(regex);
        }
        if let Some(regex) = matches.get_one::<String>("ir-dump-func-regex") {
            options.debug.set_ir_dump_func_regex(regex);
        }
        options.debug.set_enable_timing(matches.get_flag("enable-timing"));
        options
    }
    pub fn passes(&self) -> &Passes {
        &self.passes
    }
    pub fn print_ir_before_all(&self) -> bool {
        self.print_ir_before_all
    }
    pub fn set_print_ir_before_all(&mut self, print: bool) {
        self.print_ir_before_all = print;
    }
    pub fn print_ir_after_all(&self) -> bool {
        self.print_ir_after_all
    }
    pub fn set_print_ir_after_all(&mut self, print: bool) {
        self.print_ir_after_all = print;
    }
    pub fn debug(&self) -> &DebugOptions {
        &self.debug
    }
    pub fn debug_mut(&mut self) -> &mut DebugOptions {
        &mut self.debug
    }
}

/// Transform the given operation via the given passes.
///
/// This is the main function that most users will interact with. Passes run
/// in order. Each pass gets the op that the previous pass returned.
pub fn transform<T: TransformDispatch>(
    op: Shared<dyn Op>,
    options: &TransformOptions,
) -> Result<RewriteResult> {
    let dumper = match options.debug().ir_dump_dir() {
        Some(dir) => Some(IrDumper::new(dir, options.debug())?),
        None => None,
    };
    let mut timing = PassTiming::default();
    let mut root = op;
    let mut has_changed = false;
    for (index, pass) in options.passes().vec().iter().enumerate() {
        let name = pass.name();
        let anchor = anchor_name(&root);
        let dump = match &dumper {
            Some(dumper) if dumper.should_dump(name, &anchor) => Some(dumper),
            _ => None,
        };
        let before = root.rd().to_string();
        if options.print_ir_before_all() {
            info!("// ----- IR Dump Before {name} -----\n{before}");
        }
        if let Some(dumper) = dump {
            dumper.dump(index, &anchor, name, "before", &before)?;
        }

        let start = Instant::now();
        let result = match T::dispatch(root.clone(), pass) {
            Ok(result) => result,
            Err(err) => {
                if let Some(dumper) = &dumper {
                    dumper.write_crash_repro(options.passes(), name, &before)?;
                }
                return Err(err.context(format!("pass {name} failed")));
            }
        };
        timing.record(name, start.elapsed());
        if let RewriteResult::Changed(changed) = result {
            has_changed = true;
            root = changed.op;
        }

        if options.print_ir_after_all() || dump.is_some() {
            let after = root.rd().to_string();
            if options.print_ir_after_all() {
                info!("// ----- IR Dump After {name} -----\n{after}");
            }
            if let Some(dumper) = dump {
                dumper.dump(index, &anchor, name, "after", &after)?;
            }
        }
    }
    if options.debug().enable_timing() {
        info!("{}", timing.report());
    }
    if has_changed {
        Ok(RewriteResult::Changed(ChangedOp::new(root)))
    } else {
        Ok(RewriteResult::Unchanged)
    }
}
