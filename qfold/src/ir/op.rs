use crate::convert::RewriteResult;
use crate::ir::Attribute;
use crate::ir::Location;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::ir::Region;
use crate::ir::Value;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

/// This is the trait that is implemented by all operations.
///
/// Note that the parser will parse the tokens into an `Operation` and MLIR
/// would cast the `Operation` into a specific `Op` variant such as
/// `ConstantOp`.
pub trait Op {
    fn operation_name() -> OperationName
    where
        Self: Sized;
    /// Create an new [Op] from an [Operation].
    ///
    /// This method has to be implemented by all ops and is just used to
    /// create a new [Op]. Do not call this method directly, but rather use
    /// [Self::from_operation].
    fn new(operation: Shared<Operation>) -> Self
    where
        Self: Sized;
    /// Create an [Op] from an [Operation].
    ///
    /// The default implementation for this method automatically sets the name
    /// of the operation to the name of the op. This duplication of the name is
    /// unfortunate, but necessary because it allows showing the operation name
    /// even when the [Operation] is not wrapped inside an [Op].
    fn from_operation(operation: Operation) -> Self
    where
        Self: Sized,
    {
        let mut operation = operation;
        operation.set_name(Self::operation_name());
        Self::new(Shared::new(operation.into()))
    }
    fn as_any(&self) -> &dyn std::any::Any;
    fn operation(&self) -> &Shared<Operation>;
    /// Returns the name of the operation.
    ///
    /// This is a convenience method for `self.operation().name()`.
    /// Unlike `self.operation_name()`, this method is available on a `dyn Op`.
    fn name(&self) -> OperationName {
        self.operation().rd().name()
    }
    fn region(&self) -> Option<Shared<Region>> {
        self.operation().rd().region()
    }
    fn location(&self) -> Location {
        self.operation().rd().location()
    }
    /// Rewrite the op into a simpler form.
    ///
    /// Called by the canonicalize pass.
    fn canonicalize(&self) -> Result<RewriteResult> {
        Ok(RewriteResult::Unchanged)
    }
    fn is_func(&self) -> bool {
        false
    }
    fn is_const(&self) -> bool {
        false
    }
    /// Whether the op has no side effects and can be removed when unused.
    fn is_pure(&self) -> bool {
        false
    }
    fn attribute(&self, key: &str) -> Option<Arc<dyn Attribute>> {
        self.operation().rd().attributes().get(key)
    }
    /// Insert `earlier` before `self` inside `self`'s parent block.
    fn insert_before(&self, earlier: Shared<dyn Op>) {
        let block = match self.operation().rd().parent() {
            Some(block) => block,
            None => panic!("Cannot insert before {}: op has no parent", self.name()),
        };
        block.rd().insert_before(earlier, self.operation().clone());
    }
    /// Insert `later` after `self` inside `self`'s parent block.
    fn insert_after(&self, later: Shared<dyn Op>) {
        let block = match self.operation().rd().parent() {
            Some(block) => block,
            None => panic!("Cannot insert after {}: op has no parent", self.name()),
        };
        block.rd().insert_after(self.operation().clone(), later);
    }
    /// Remove the operation from its parent block.
    fn remove(&self) {
        let block = match self.operation().rd().parent() {
            Some(block) => block,
            None => panic!("Cannot remove {}: op has no parent", self.name()),
        };
        block.rd().remove(self.operation().clone());
    }
    /// Replace self with `new` by moving the results of the old operation to
    /// the results of the new op, and pointing the `result.defining_op` to the
    /// new op. In effect, this makes all the uses of the old op refer to the new
    /// op instead.
    ///
    /// Note that this function assumes that `self` will be dropped after this
    /// function call.
    fn replace(&self, new: Shared<dyn Op>) {
        let results = self.operation().rd().results();
        for result in results.clone().into_iter() {
            if let Value::OpResult(result) = &mut *result.wr() {
                result.set_defining_op(Some(new.clone()));
            }
        }
        {
            let new_op = new.rd();
            let mut new_operation = new_op.operation().wr();
            new_operation.set_results(results);
            new_operation.set_parent(self.operation().rd().parent());
        }
        // Root ops do not have a parent, so there is nothing to update.
        let parent = self.operation().rd().parent();
        if let Some(parent) = parent {
            parent.rd().replace(self.operation().clone(), new);
        }
    }
    /// Return ops that are children of this op (inside blocks that are inside
    /// the region).
    fn ops(&self) -> Vec<Shared<dyn Op>> {
        match self.region() {
            Some(region) => region.rd().ops(),
            None => vec![],
        }
    }
    /// Return the ops that come after `self` in the parent block.
    fn successors(&self) -> Vec<Shared<dyn Op>> {
        let block = match self.operation().rd().parent() {
            Some(block) => block,
            None => return vec![],
        };
        let block = block.rd();
        let index = match block.index_of(self.operation()) {
            Some(index) => index,
            None => return vec![],
        };
        let ops = block.ops();
        let ops = ops.rd();
        ops[index + 1..].to_vec()
    }
    fn parent_op(&self) -> Option<Shared<dyn Op>> {
        self.operation().rd().parent_op()
    }
    /// Return the result at the given index.
    ///
    /// Convenience function which makes it easier to set an operand to the
    /// result of an operation.
    fn result(&self, index: usize) -> Option<Shared<Value>> {
        self.operation().rd().result(index)
    }
    /// Display the operation with the given indentation.
    ///
    /// This method is usually called on a top-level op via `Display::fmt`,
    /// which then calls `display` with `indent` 0. Ops with regions call
    /// `display` recursively while continuously increasing the indentation
    /// level. The caller writes the leading spaces.
    fn display(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        self.operation().rd().display(f, indent)
    }
}

impl Display for dyn Op {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f, 0)
    }
}
