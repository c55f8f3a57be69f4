use crate::frontend::Parse;
use crate::frontend::Parser;
use crate::frontend::ParserDispatch;
use crate::frontend::TokenKind;
use crate::ir::Attribute;
use crate::ir::Block;
use crate::ir::Op;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

/// The token kind used for variables in this dialect.
const TOKEN_KIND: TokenKind = TokenKind::PercentIdentifier;

/// `arith.constant`
///
/// ```mlir
/// %0 = arith.constant dense<[0.0, 1.0]> : tensor<2xf32>
/// ```
///
/// The payload is stored in the `value` attribute and the result type is
/// the type of the payload.
pub struct ConstantOp {
    operation: Shared<Operation>,
}

impl ConstantOp {
    pub fn value(&self) -> Option<Arc<dyn Attribute>> {
        self.operation.rd().attributes().get("value")
    }
    pub fn set_value(&self, value: Arc<dyn Attribute>) {
        let attributes = self.operation.rd().attributes();
        attributes.insert("value", value);
    }
}

impl Op for ConstantOp {
    fn operation_name() -> OperationName {
        OperationName::new("arith.constant".to_string())
    }
    fn new(operation: Shared<Operation>) -> Self {
        ConstantOp { operation }
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn is_const(&self) -> bool {
        true
    }
    fn is_pure(&self) -> bool {
        true
    }
    fn operation(&self) -> &Shared<Operation> {
        &self.operation
    }
    fn display(&self, f: &mut Formatter<'_>, _indent: i32) -> std::fmt::Result {
        let operation = self.operation.rd();
        operation.display_results(f)?;
        write!(f, "{}", operation.name())?;
        if let Some(value) = self.value() {
            write!(f, " {value}")?;
        }
        operation.display_location(f)
    }
}

impl Parse for ConstantOp {
    fn op<T: ParserDispatch>(
        parser: &mut Parser<T>,
        parent: Option<Shared<Block>>,
    ) -> Result<Shared<dyn Op>> {
        let mut operation = Operation::default();
        operation.set_parent(parent);
        let result = parser.parse_op_result_into(TOKEN_KIND, &mut operation)?;
        parser.parse_operation_name_into::<ConstantOp>(&mut operation)?;
        let value = parser.parse_constant_value()?;
        result.set_typ(value.typ());
        operation.set_location(parser.parse_optional_location()?);

        let op = ConstantOp::from_operation(operation);
        op.set_value(value);
        let op: Shared<dyn Op> = Shared::new(op.into());
        result.set_defining_op(Some(op.clone()));
        Ok(op)
    }
}

impl Display for ConstantOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f, 0)
    }
}
