use crate::ir::Block;
use crate::ir::Op;
use crate::shared::Shared;
use crate::shared::SharedExt;
use std::fmt::Display;
use std::fmt::Formatter;

/// A list of blocks.
pub struct Region {
    /// Blocks in the region.
    ///
    /// This field is a `Shared` because the parser may read the blocks before
    /// the region is fully constructed.
    blocks: Shared<Vec<Shared<Block>>>,
    parent: Option<Shared<dyn Op>>,
}

impl Region {
    pub fn new(blocks: Shared<Vec<Shared<Block>>>, parent: Option<Shared<dyn Op>>) -> Self {
        Self { blocks, parent }
    }
    pub fn blocks(&self) -> Vec<Shared<Block>> {
        self.blocks.rd().clone()
    }
    pub fn add_block(&self, block: Shared<Block>) {
        self.blocks.wr().push(block);
    }
    pub fn block(&self, index: usize) -> Option<Shared<Block>> {
        self.blocks.rd().get(index).cloned()
    }
    pub fn parent(&self) -> Option<Shared<dyn Op>> {
        self.parent.clone()
    }
    pub fn set_parent(&mut self, parent: Option<Shared<dyn Op>>) {
        self.parent = parent;
    }
    pub fn is_empty(&self) -> bool {
        self.blocks.rd().is_empty()
    }
    /// The ops in all blocks of this region (not including nested ops).
    pub fn ops(&self) -> Vec<Shared<dyn Op>> {
        let mut result = Vec::new();
        for block in self.blocks.rd().iter() {
            result.extend(block.rd().ops().rd().iter().cloned());
        }
        result
    }
    pub fn display(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        writeln!(f, " {{")?;
        for block in self.blocks.rd().iter() {
            block.rd().display(f, indent + 1)?;
        }
        let spaces = crate::ir::spaces(indent);
        write!(f, "{spaces}}}")
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new(Shared::new(vec![].into()), None)
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f, 0)
    }
}
