use crate::frontend::Parse;
use crate::frontend::Parser;
use crate::frontend::ParserDispatch;
use crate::frontend::TokenKind;
use crate::ir::Block;
use crate::ir::Op;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::ir::StringAttr;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Formatter;
use std::sync::Arc;

/// The top-level op that holds functions.
///
/// ```mlir
/// module @model {
///   func.func @main() { ... }
/// }
/// ```
pub struct ModuleOp {
    operation: Shared<Operation>,
}

impl Op for ModuleOp {
    fn operation_name() -> OperationName {
        OperationName::new("module".to_string())
    }
    fn new(operation: Shared<Operation>) -> Self {
        Self { operation }
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn operation(&self) -> &Shared<Operation> {
        &self.operation
    }
    fn display(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        let operation = self.operation.rd();
        write!(f, "{}", operation.name())?;
        if let Some(name) = self.sym_name() {
            write!(f, " @{name}")?;
        }
        if let Some(region) = operation.region() {
            region.rd().display(f, indent)?;
        }
        operation.display_location(f)
    }
}

impl ModuleOp {
    /// The optional name of the module (`@model` in `module @model`).
    pub fn sym_name(&self) -> Option<String> {
        let attribute = self.attribute("sym_name")?;
        let name = attribute.as_any().downcast_ref::<StringAttr>()?;
        Some(name.value())
    }
    /// The first op inside the module.
    pub fn first_op(&self) -> Result<Shared<dyn Op>> {
        match self.ops().first() {
            Some(op) => Ok(op.clone()),
            None => Err(anyhow::anyhow!("Expected 1 op in module, got 0")),
        }
    }
}

impl Parse for ModuleOp {
    fn op<T: ParserDispatch>(
        parser: &mut Parser<T>,
        parent: Option<Shared<Block>>,
    ) -> Result<Shared<dyn Op>> {
        let mut operation = Operation::default();
        parser.parse_operation_name_into::<ModuleOp>(&mut operation)?;
        if parser.check(TokenKind::AtIdentifier) {
            let name = parser.advance().lexeme.clone();
            let name = name.trim_start_matches('@');
            let attributes = operation.attributes();
            attributes.insert("sym_name", Arc::new(StringAttr::new(name)));
        }
        operation.set_parent(parent);
        let operation = Shared::new(operation.into());
        let op = ModuleOp {
            operation: operation.clone(),
        };
        let op: Shared<dyn Op> = Shared::new(op.into());

        let region = parser.parse_region(op.clone())?;
        let location = parser.parse_optional_location()?;
        let mut operation = operation.wr();
        operation.set_region(Some(region));
        operation.set_location(location);

        Ok(op)
    }
}
