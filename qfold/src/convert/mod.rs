//! Conversion logic for the compiler.
//!
//! This module contains the rewrite driver and the passes that are built on
//! top of it. A pass is a set of rewrites that is applied until nothing
//! changes anymore.

use crate::ir::spaces;
use crate::ir::walk;
use crate::ir::Op;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

mod quant_convert_const;

pub use quant_convert_const::ConvertConst;
pub use quant_convert_const::QuantizedConstRewrite;

/// Maximum number of times the driver restarts before giving up.
const MAX_ITERATIONS: usize = 10240;

pub struct ChangedOp {
    pub op: Shared<dyn Op>,
}

impl ChangedOp {
    pub fn new(op: Shared<dyn Op>) -> Self {
        ChangedOp { op }
    }
}

impl PartialEq for ChangedOp {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.op, &other.op)
    }
}

/// Whether a rewrite changed the IR.
///
/// If a rewrite changes the IR, it returns the changed operation. Returning
/// the changed operation is required for passes that change the top-level
/// operation.
#[derive(PartialEq)]
pub enum RewriteResult {
    Changed(ChangedOp),
    Unchanged,
}

impl RewriteResult {
    pub fn is_changed(&self) -> Option<&ChangedOp> {
        match self {
            RewriteResult::Changed(op) => Some(op),
            RewriteResult::Unchanged => None,
        }
    }
}

pub trait Rewrite: Send + Sync {
    /// The name of the rewrite; is used for logging.
    fn name(&self) -> &'static str;
    /// Returns true if the rewrite can be applied to the given operation.
    ///
    /// This method is not allowed to mutate the IR.
    ///
    /// Note that this implementation usually will look like
    /// ```ignore
    /// Ok(op.as_any().is::<MyOp>())
    /// ```
    /// If weird behavior is encountered, ensure that the new type has set the
    /// correct operation name.
    fn is_match(&self, op: &dyn Op) -> Result<bool>;
    /// Applies the rewrite to the given operation.
    ///
    /// This method is allowed to mutate the IR. Returning
    /// [RewriteResult::Unchanged] means that the op did not match after all,
    /// which is not an error.
    fn rewrite(&self, op: Shared<dyn Op>) -> Result<RewriteResult>;
}

fn apply_rewrite(
    root: Shared<dyn Op>,
    rewrite: &dyn Rewrite,
    indent: i32,
) -> Result<RewriteResult> {
    debug!(
        "{}Matching {} with {}",
        spaces(indent),
        root.rd().name(),
        rewrite.name()
    );
    let is_match = rewrite.is_match(&*root.rd())?;
    if is_match {
        debug!("{}--> Success", spaces(indent));
        let root_rewrite = rewrite.rewrite(root.clone())?;
        if root_rewrite.is_changed().is_some() {
            debug!("{}----> Changed", spaces(indent));
            return Ok(root_rewrite);
        }
    }

    let ops = root.rd().ops();
    for nested_op in ops.iter() {
        let result = apply_rewrite(nested_op.clone(), rewrite, indent + 1)?;
        if result.is_changed().is_some() {
            let root_passthrough = ChangedOp::new(root.clone());
            return Ok(RewriteResult::Changed(root_passthrough));
        }
    }
    Ok(RewriteResult::Unchanged)
}

fn apply_rewrites_helper(
    root: Shared<dyn Op>,
    rewrites: &[&dyn Rewrite],
    indent: i32,
) -> Result<RewriteResult> {
    for rewrite in rewrites {
        let result = apply_rewrite(root.clone(), *rewrite, indent)?;
        if result.is_changed().is_some() {
            return Ok(result);
        }
    }
    Ok(RewriteResult::Unchanged)
}

/// Apply `rewrites` to `root` and its nested ops until a fixed point.
///
/// After every change, matching restarts from the top.
pub fn apply_rewrites(root: Shared<dyn Op>, rewrites: &[&dyn Rewrite]) -> Result<RewriteResult> {
    let mut root = root;
    let mut has_changed = false;
    for _ in 0..MAX_ITERATIONS {
        let result = apply_rewrites_helper(root.clone(), rewrites, 0)?;
        match result {
            RewriteResult::Changed(changed) => {
                has_changed = true;
                root = changed.op;
            }
            RewriteResult::Unchanged => {
                if has_changed {
                    let op = ChangedOp::new(root);
                    return Ok(RewriteResult::Changed(op));
                } else {
                    return Ok(result);
                }
            }
        }
    }
    tracing::warn!("Too many rewrite iterations");
    Ok(RewriteResult::Changed(ChangedOp::new(root)))
}

/// Apply `rewrites` separately to every function inside `root`.
///
/// This is how function-anchored passes run: each function body is driven
/// to its own fixed point.
pub fn apply_rewrites_on_funcs(
    root: Shared<dyn Op>,
    rewrites: &[&dyn Rewrite],
) -> Result<RewriteResult> {
    let funcs = walk(&root)
        .into_iter()
        .filter(|op| op.rd().is_func())
        .collect::<Vec<_>>();
    let mut has_changed = false;
    for func in funcs {
        let result = apply_rewrites(func, rewrites)?;
        has_changed |= result.is_changed().is_some();
    }
    if has_changed {
        Ok(RewriteResult::Changed(ChangedOp::new(root)))
    } else {
        Ok(RewriteResult::Unchanged)
    }
}

/// A pass is a transformation that can be applied to the IR.
///
/// Passes are registered by name in [crate::DefaultTransformDispatch].
pub trait Pass {
    const NAME: &'static str;
    fn convert(op: Shared<dyn Op>) -> Result<RewriteResult>;
}
