use crate::convert::RewriteResult;
use crate::frontend::DefaultParserDispatch;
use crate::frontend::Parser;
use crate::init_subscriber;
use crate::ir::Op;
use crate::shared::Shared;
use crate::shared::SharedExt;
use crate::transform;
use crate::DefaultTransformDispatch;
use crate::Passes;
use crate::TransformOptions;
use std::cmp::max;
use std::panic::Location;
use tracing::info;

pub struct Tester;

impl Tester {
    /// Initialize the subscriber for the tests.
    ///
    /// Cannot pass options, since the tests run concurrently.
    pub fn init_tracing() {
        let level = tracing::Level::INFO;
        match init_subscriber(level) {
            Ok(_) => (),
            Err(_e) => (),
        }
    }
    fn point_to_missing_line(expected: &str, index: usize) -> String {
        let mut result = String::new();
        result.push_str("A line is missing from the output:\n");
        result.push_str("```");
        for (i, line) in expected.lines().enumerate() {
            if i == index {
                result.push_str(&format!("\n{line}   <== missing"));
            } else {
                result.push_str(&format!("\n{line}"));
            }
        }
        result.push_str("\n```");
        result
    }
    /// Check that `actual` and `expected` are equal line by line (ignoring
    /// surrounding whitespace of the whole text).
    pub fn check_lines_exact(actual: &str, expected: &str, caller: &Location<'_>) {
        let actual = actual.trim();
        let expected = expected.trim();
        let actual_lines = actual.lines().collect::<Vec<&str>>();
        let expected_lines = expected.lines().collect::<Vec<&str>>();
        let l = max(actual_lines.len(), expected_lines.len());
        for i in 0..l {
            let actual_line = match actual_lines.get(i) {
                Some(line) => line,
                None => panic!("Expected line {i} not found in output: called from {caller}"),
            };
            let expected_line = match expected_lines.get(i) {
                Some(line) => line,
                None => panic!("Output has unexpected line {i}: called from {caller}"),
            };
            assert_eq!(actual_line, expected_line, "called from {caller}");
        }
    }
    /// Check whether the expected lines are present in the actual output.
    ///
    /// The actual output may contain additional lines that are not in the
    /// expected output, but the expected lines have to appear in order.
    pub fn check_lines_contain(actual: &str, expected: &str, caller: &Location<'_>) {
        let actual_lines = actual.trim().lines().collect::<Vec<&str>>();
        let mut actual_index = 0;
        'outer: for (i, expected_line) in expected.trim().lines().enumerate() {
            let expected_line = expected_line.trim();
            // An empty line would match any line.
            if expected_line.is_empty() {
                continue;
            }
            for (j, actual_line) in actual_lines.iter().enumerate().skip(actual_index) {
                if actual_line.contains(expected_line) {
                    actual_index = j + 1;
                    continue 'outer;
                }
            }
            let msg = Self::point_to_missing_line(expected.trim(), i);
            panic!("{msg}\nwhen called from {caller}");
        }
    }
    fn print_heading(msg: &str, src: &str) {
        info!("{msg}:\n```\n{src}\n```\n");
    }
    pub fn parse(src: &str) -> (Shared<dyn Op>, String) {
        let src = src.trim();
        Self::print_heading("Before parse", src);
        let module = Parser::<DefaultParserDispatch>::parse(src).unwrap();
        let actual = module.rd().to_string();
        Self::print_heading("After parse", &actual);
        (module, actual)
    }
    /// Parse `src` and run the passes in `arguments` (e.g.,
    /// `--quant-convert-const`) on it.
    ///
    /// Returns the root op and its printed form, whether the passes changed
    /// something or not.
    pub fn transform(arguments: Vec<&str>, src: &str) -> (Shared<dyn Op>, String) {
        let src = src.trim();
        let module = Parser::<DefaultParserDispatch>::parse(src).unwrap();
        let msg = format!("Before (transform {arguments:?})");
        Self::print_heading(&msg, src);

        for arg in arguments.iter() {
            if !arg.starts_with("--") {
                panic!("passes should be prefixed with `--`, got {arg}");
            }
        }
        let passes = Passes::from_convert_vec(arguments.clone());
        let options = TransformOptions::from_passes(passes);
        let result = transform::<DefaultTransformDispatch>(module.clone(), &options).unwrap();
        let root = match result {
            RewriteResult::Changed(changed) => changed.op,
            RewriteResult::Unchanged => module,
        };
        let actual = root.rd().to_string();
        let msg = format!("After (transform {arguments:?})");
        Self::print_heading(&msg, &actual);
        (root, actual)
    }
    fn verify_core(op: &Shared<dyn Op>) {
        let op = op.rd();
        if !op.name().to_string().contains("module") {
            assert!(
                op.operation().rd().parent().is_some(),
                "op without parent:\n{op}"
            );
        }
    }
    /// Run some extra verification on the IR (usually on a module).
    ///
    /// This catches problems that are not visible in the textual
    /// representation. For example, an op that was inserted into a block is
    /// printed, but whether the op also points back to its parent is not
    /// visible.
    pub fn verify(op: Shared<dyn Op>) {
        Self::verify_core(&op);
        let ops = op.rd().ops();
        for op in ops {
            Self::verify(op);
        }
    }
}
