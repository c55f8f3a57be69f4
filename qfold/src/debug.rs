//! Debug dumps of the IR while passes run.
//!
//! When a dump directory is set, every call to [crate::transform] writes into
//! its own fresh subdirectory:
//!
//! ```text
//! <dir>/1729160000000_4242/00000000.main.quant_convert_const_before.mlir
//! <dir>/1729160000000_4242/00000000.main.quant_convert_const_after.mlir
//! ```
//!
//! A failing pass leaves `qfold_crash_repro.mlir` behind with the IR as it
//! was before that pass.
use crate::dialect::func::FuncOp;
use crate::ir::walk;
use crate::ir::Op;
use crate::shared::Shared;
use crate::shared::SharedExt;
use crate::Passes;
use anyhow::Context;
use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;
use tracing::info;

pub const CRASH_REPRO_FILENAME: &str = "qfold_crash_repro.mlir";

/// Options that control the debug output of a pass pipeline.
#[derive(Clone, Debug)]
pub struct DebugOptions {
    ir_dump_dir: Option<PathBuf>,
    ir_dump_pass_regex: String,
    ir_dump_func_regex: String,
    enable_timing: bool,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            ir_dump_dir: None,
            ir_dump_pass_regex: ".*".to_string(),
            ir_dump_func_regex: ".*".to_string(),
            enable_timing: false,
        }
    }
}

impl DebugOptions {
    pub fn ir_dump_dir(&self) -> Option<&Path> {
        self.ir_dump_dir.as_deref()
    }
    pub fn set_ir_dump_dir(&mut self, dir: Option<PathBuf>) {
        self.ir_dump_dir = dir;
    }
    pub fn ir_dump_pass_regex(&self) -> &str {
        &self.ir_dump_pass_regex
    }
    /// Only dump passes whose (sanitized) name fully matches `regex`.
    pub fn set_ir_dump_pass_regex(&mut self, regex: &str) {
        self.ir_dump_pass_regex = regex.to_string();
    }
    pub fn ir_dump_func_regex(&self) -> &str {
        &self.ir_dump_func_regex
    }
    /// Only dump when the anchor function name fully matches `regex`.
    pub fn set_ir_dump_func_regex(&mut self, regex: &str) {
        self.ir_dump_func_regex = regex.to_string();
    }
    pub fn enable_timing(&self) -> bool {
        self.enable_timing
    }
    pub fn set_enable_timing(&mut self, enable: bool) {
        self.enable_timing = enable;
    }
}

/// Replace all characters that are not alphanumeric by `_`.
///
/// For example, `quant-convert-const` becomes `quant_convert_const`.
pub fn sanitize_pass_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn func_identifier(op: &Shared<dyn Op>) -> Option<String> {
    let op = op.rd();
    let func = op.as_any().downcast_ref::<FuncOp>()?;
    func.identifier()
}

/// The name that dumps of `op` are filed under.
///
/// For a function this is its name. For a module this is `main` if it
/// exists, else the first function, else `module`.
pub fn anchor_name(op: &Shared<dyn Op>) -> String {
    if let Some(name) = func_identifier(op) {
        return name;
    }
    let names = walk(op)
        .iter()
        .filter_map(func_identifier)
        .collect::<Vec<String>>();
    if names.iter().any(|name| name == "main") {
        return "main".to_string();
    }
    match names.into_iter().next() {
        Some(name) => name,
        None => "module".to_string(),
    }
}

fn full_match(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$"))
        .with_context(|| format!("invalid dump regex: {pattern}"))
}

/// Writes the dumps of one pipeline run.
pub struct IrDumper {
    run_dir: PathBuf,
    pass_regex: Regex,
    func_regex: Regex,
}

impl IrDumper {
    /// Create a fresh run directory below `dir`.
    pub fn new(dir: &Path, options: &DebugOptions) -> Result<Self> {
        let pass_regex = full_match(options.ir_dump_pass_regex())?;
        let func_regex = full_match(options.ir_dump_func_regex())?;
        let run_dir = Self::create_run_dir(dir)?;
        info!("Dumping IR to {}", run_dir.display());
        Ok(Self {
            run_dir,
            pass_regex,
            func_regex,
        })
    }
    fn create_run_dir(dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("could not create dump dir {}", dir.display()))?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let base = format!("{millis}_{}", std::process::id());
        let mut n = 0;
        loop {
            let name = if n == 0 {
                base.clone()
            } else {
                format!("{base}_{n}")
            };
            let candidate = dir.join(name);
            match std::fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => {
                    let msg = format!("could not create {}", candidate.display());
                    return Err(anyhow::Error::new(e).context(msg));
                }
            }
        }
    }
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
    pub fn should_dump(&self, pass: &str, anchor: &str) -> bool {
        self.pass_regex.is_match(&sanitize_pass_name(pass)) && self.func_regex.is_match(anchor)
    }
    /// Write `ir` to `{index:08}.{anchor}.{pass}_{stage}.mlir`.
    pub fn dump(
        &self,
        index: usize,
        anchor: &str,
        pass: &str,
        stage: &str,
        ir: &str,
    ) -> Result<PathBuf> {
        let pass = sanitize_pass_name(pass);
        let path = self
            .run_dir
            .join(format!("{index:08}.{anchor}.{pass}_{stage}.mlir"));
        std::fs::write(&path, ir)
            .with_context(|| format!("could not write {}", path.display()))?;
        info!("Wrote {}", path.display());
        Ok(path)
    }
    /// Write the IR from before a failing pass so that it can be rerun.
    pub fn write_crash_repro(&self, passes: &Passes, failed: &str, ir: &str) -> Result<PathBuf> {
        let path = self.run_dir.join(CRASH_REPRO_FILENAME);
        let pipeline = passes
            .vec()
            .iter()
            .map(|pass| format!("--{pass}"))
            .collect::<Vec<String>>()
            .join(" ");
        let text = format!(
            "// qfold crash reproducer\n// failed pass: {failed}\n// pipeline: {pipeline}\n{ir}\n"
        );
        std::fs::write(&path, text)
            .with_context(|| format!("could not write {}", path.display()))?;
        info!("Wrote crash reproducer to {}", path.display());
        Ok(path)
    }
}

/// Wall time spent per pass.
#[derive(Default)]
pub struct PassTiming {
    entries: Vec<(String, Duration)>,
}

impl PassTiming {
    pub fn record(&mut self, pass: &str, elapsed: Duration) {
        self.entries.push((pass.to_string(), elapsed));
    }
    pub fn total(&self) -> Duration {
        self.entries.iter().map(|(_, elapsed)| *elapsed).sum()
    }
    pub fn report(&self) -> String {
        let mut text = String::from("===- Pass execution timing report -===\n");
        for (pass, elapsed) in self.entries.iter() {
            text.push_str(&format!("  {:>10.6}s  {pass}\n", elapsed.as_secs_f64()));
        }
        text.push_str(&format!("  {:>10.6}s  Total", self.total().as_secs_f64()));
        text
    }
}
