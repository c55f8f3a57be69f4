use crate::convert::apply_rewrites;
use crate::convert::ChangedOp;
use crate::convert::Pass;
use crate::convert::Rewrite;
use crate::convert::RewriteResult;
use crate::ir::Op;
use crate::ir::Users;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;

/// Call [Op::canonicalize] on every op.
pub struct CanonicalizeOp;

impl Rewrite for CanonicalizeOp {
    fn name(&self) -> &'static str {
        "canonicalize::CanonicalizeOp"
    }
    fn is_match(&self, _op: &dyn Op) -> Result<bool> {
        Ok(true)
    }
    fn rewrite(&self, op: Shared<dyn Op>) -> Result<RewriteResult> {
        let result = op.rd().canonicalize()?;
        Ok(result)
    }
}

/// Remove pure ops whose results are not used.
pub struct DeadCodeElimination;

impl Rewrite for DeadCodeElimination {
    fn name(&self) -> &'static str {
        "canonicalize::DeadCodeElimination"
    }
    fn is_match(&self, op: &dyn Op) -> Result<bool> {
        Ok(op.is_pure())
    }
    fn rewrite(&self, op: Shared<dyn Op>) -> Result<RewriteResult> {
        let readonly = op.clone();
        let readonly = readonly.rd();
        let operation = readonly.operation().rd();
        let users = operation.users();
        match users {
            Users::HasNoOpResults => Ok(RewriteResult::Unchanged),
            Users::OpOperands(users) => {
                if !users.is_empty() {
                    return Ok(RewriteResult::Unchanged);
                }
                match operation.parent() {
                    Some(parent) => {
                        parent.rd().remove(readonly.operation().clone());
                        Ok(RewriteResult::Changed(ChangedOp::new(op.clone())))
                    }
                    None => Ok(RewriteResult::Unchanged),
                }
            }
        }
    }
}

/// `--canonicalize`
pub struct Canonicalize;

impl Pass for Canonicalize {
    const NAME: &'static str = "canonicalize";
    fn convert(op: Shared<dyn Op>) -> Result<RewriteResult> {
        let rewrites: Vec<&dyn Rewrite> = vec![&CanonicalizeOp, &DeadCodeElimination];
        apply_rewrites(op, &rewrites)
    }
}
