use crate::ir::Op;
use crate::ir::Operation;
use crate::ir::Region;
use crate::ir::Value;
use crate::shared::Shared;
use crate::shared::SharedExt;
use std::fmt::Display;
use std::fmt::Formatter;

/// A list of operations.
///
/// Every region in this IR holds a single block, so control flow between
/// blocks is not modeled.
pub struct Block {
    ops: Shared<Vec<Shared<dyn Op>>>,
    /// This field does not have to be a `Shared` because the `Block` is
    /// shared via `Shared`.
    parent: Option<Shared<Region>>,
}

impl Block {
    pub fn new(ops: Shared<Vec<Shared<dyn Op>>>, parent: Option<Shared<Region>>) -> Self {
        Self { ops, parent }
    }
    pub fn ops(&self) -> Shared<Vec<Shared<dyn Op>>> {
        self.ops.clone()
    }
    pub fn parent(&self) -> Option<Shared<Region>> {
        self.parent.clone()
    }
    pub fn set_parent(&mut self, parent: Option<Shared<Region>>) {
        self.parent = parent;
    }
    /// The op that owns the region that owns this block.
    pub fn parent_op(&self) -> Option<Shared<dyn Op>> {
        let region = self.parent()?;
        let op = region.rd().parent();
        op
    }
    fn assignment_in_ops(&self, name: &str) -> Option<Shared<Value>> {
        for op in self.ops.rd().iter() {
            let results = op.rd().operation().rd().results();
            for value in results.into_iter() {
                if value.rd().name().as_deref() == Some(name) {
                    return Some(value);
                }
            }
        }
        None
    }
    fn assignment_in_func_arguments(&self, name: &str) -> Option<Shared<Value>> {
        let op = self.parent_op()?;
        let op = op.rd();
        if !op.is_func() {
            return None;
        }
        let arguments = op.operation().rd().arguments();
        arguments
            .into_iter()
            .find(|argument| argument.rd().name().as_deref() == Some(name))
    }
    /// Find the value that is assigned to `name`.
    ///
    /// Looks at the ops in this block, then at the arguments of the enclosing
    /// function and then at the blocks further up.
    pub fn assignment(&self, name: &str) -> Option<Shared<Value>> {
        if let Some(value) = self.assignment_in_ops(name) {
            return Some(value);
        }
        if let Some(value) = self.assignment_in_func_arguments(name) {
            return Some(value);
        }
        let op = self.parent_op()?;
        let block = op.rd().operation().rd().parent()?;
        let value = block.rd().assignment(name);
        value
    }
    pub fn index_of(&self, op: &Shared<Operation>) -> Option<usize> {
        self.ops
            .rd()
            .iter()
            .position(|current| current.rd().operation().same(op))
    }
    pub fn insert_op(&self, op: Shared<dyn Op>, index: usize) {
        self.ops.wr().insert(index, op);
    }
    pub fn insert_after(&self, earlier: Shared<Operation>, later: Shared<dyn Op>) {
        match self.index_of(&earlier) {
            Some(index) => self.insert_op(later, index + 1),
            None => panic!("Could not find op in block during insert_after"),
        }
    }
    pub fn insert_before(&self, earlier: Shared<dyn Op>, later: Shared<Operation>) {
        match self.index_of(&later) {
            Some(index) => self.insert_op(earlier, index),
            None => panic!("Could not find op in block during insert_before"),
        }
    }
    pub fn replace(&self, old: Shared<Operation>, new: Shared<dyn Op>) {
        match self.index_of(&old) {
            Some(index) => self.ops.wr()[index] = new,
            None => panic!("Could not find op in block during replace"),
        }
    }
    pub fn remove(&self, op: Shared<Operation>) {
        match self.index_of(&op) {
            Some(index) => {
                self.ops.wr().remove(index);
            }
            None => panic!("Could not find op in block during remove"),
        }
    }
    fn used_names(&self) -> Vec<String> {
        let mut used_names = vec![];
        if let Some(op) = self.parent_op() {
            used_names.extend(op.rd().operation().rd().arguments().names());
        }
        for op in self.ops.rd().iter() {
            let op = op.rd();
            used_names.extend(op.operation().rd().results().names());
            for nested in op.ops() {
                used_names.extend(nested.rd().operation().rd().results().names());
            }
        }
        used_names
    }
    /// Find a unique name for a value (for example, `%4 = ...`).
    ///
    /// The new name is one higher than the highest numeric name in use.
    pub fn unique_value_name(&self) -> String {
        let mut new_name: i64 = -1;
        for name in self.used_names().iter() {
            let name = name.trim_start_matches('%');
            if let Ok(num) = name.parse::<i64>() {
                new_name = new_name.max(num);
            }
        }
        new_name += 1;
        format!("%{new_name}")
    }
    pub fn display(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        for op in self.ops.rd().iter() {
            let spaces = crate::ir::spaces(indent);
            write!(f, "{spaces}")?;
            op.rd().display(f, indent)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new(Shared::new(vec![].into()), None)
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f, 0)
    }
}
