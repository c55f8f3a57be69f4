use crate::convert::ChangedOp;
use crate::convert::RewriteResult;
use crate::frontend::Parse;
use crate::frontend::Parser;
use crate::frontend::ParserDispatch;
use crate::frontend::TokenKind;
use crate::ir::type_eq;
use crate::ir::Block;
use crate::ir::Location;
use crate::ir::Op;
use crate::ir::OpOperand;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::ir::Users;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Formatter;

const TOKEN_KIND: TokenKind = TokenKind::PercentIdentifier;

/// Print `%1 = quant.qcast %0 : f32 to !quant.uniform<u8:f32, 0.5>`.
fn display_cast(op: &dyn Op, f: &mut Formatter<'_>) -> std::fmt::Result {
    let operation = op.operation().rd();
    operation.display_results(f)?;
    write!(f, "{} {}", operation.name(), operation.operands())?;
    if let (Ok(from), Ok(to)) = (operation.operand_types(), operation.result_type(0)) {
        write!(f, " : {from} to {}", to.rd())?;
    }
    operation.display_location(f)
}

/// Parse the shared syntax of the cast ops.
fn parse_cast<T: ParserDispatch, O: Op + 'static>(
    parser: &mut Parser<T>,
    parent: Option<Shared<Block>>,
) -> Result<Shared<dyn Op>> {
    let block = match parent.clone() {
        Some(block) => block,
        None => {
            let token = parser.peek().clone();
            let msg = parser.error(&token, "Expected cast to be inside a block");
            return Err(anyhow::anyhow!(msg));
        }
    };
    let mut operation = Operation::default();
    operation.set_parent(parent);
    let result = parser.parse_op_result_into(TOKEN_KIND, &mut operation)?;
    parser.parse_operation_name_into::<O>(&mut operation)?;
    let operand = parser.parse_op_operand_into(block, &mut operation)?;
    parser.expect(TokenKind::Colon)?;
    let from = parser.parse_type()?;
    parser.verify_type(&operand, &from)?;
    parser.parse_keyword("to")?;
    let to = parser.parse_type()?;
    result.set_typ(to);
    operation.set_location(parser.parse_optional_location()?);

    let op = O::from_operation(operation);
    let op: Shared<dyn Op> = Shared::new(op.into());
    result.set_defining_op(Some(op.clone()));
    Ok(op)
}

/// `quant.qcast`
///
/// Quantize a real value (`f32` or `tensor<..xf32>`) into a quantized type.
/// When the input is a constant, the quantize-convert-const pass folds the
/// cast away.
pub struct QuantizeCastOp {
    operation: Shared<Operation>,
}

impl Op for QuantizeCastOp {
    fn operation_name() -> OperationName {
        OperationName::new("quant.qcast".to_string())
    }
    fn new(operation: Shared<Operation>) -> Self {
        QuantizeCastOp { operation }
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn is_pure(&self) -> bool {
        true
    }
    fn operation(&self) -> &Shared<Operation> {
        &self.operation
    }
    fn display(&self, f: &mut Formatter<'_>, _indent: i32) -> std::fmt::Result {
        display_cast(self, f)
    }
}

impl Parse for QuantizeCastOp {
    fn op<T: ParserDispatch>(
        parser: &mut Parser<T>,
        parent: Option<Shared<Block>>,
    ) -> Result<Shared<dyn Op>> {
        parse_cast::<T, QuantizeCastOp>(parser, parent)
    }
}

/// `quant.dcast`
///
/// Convert a quantized value back to its expressed type.
pub struct DequantizeCastOp {
    operation: Shared<Operation>,
}

impl Op for DequantizeCastOp {
    fn operation_name() -> OperationName {
        OperationName::new("quant.dcast".to_string())
    }
    fn new(operation: Shared<Operation>) -> Self {
        DequantizeCastOp { operation }
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn is_pure(&self) -> bool {
        true
    }
    fn operation(&self) -> &Shared<Operation> {
        &self.operation
    }
    fn display(&self, f: &mut Formatter<'_>, _indent: i32) -> std::fmt::Result {
        display_cast(self, f)
    }
}

impl Parse for DequantizeCastOp {
    fn op<T: ParserDispatch>(
        parser: &mut Parser<T>,
        parent: Option<Shared<Block>>,
    ) -> Result<Shared<dyn Op>> {
        parse_cast::<T, DequantizeCastOp>(parser, parent)
    }
}

/// `quant.scast`
///
/// Reinterpret between a quantized type and its storage type without
/// changing the bits.
pub struct StorageCastOp {
    operation: Shared<Operation>,
}

impl StorageCastOp {
    /// Create `quant.scast` that reads `operand`.
    ///
    /// The result is usually taken over from the op that this cast replaces.
    pub fn from_operand(operand: Shared<OpOperand>, location: Location) -> Self {
        let mut operation = Operation::default();
        operation.set_operand(operand);
        operation.set_location(location);
        StorageCastOp::from_operation(operation)
    }
}

impl Op for StorageCastOp {
    fn operation_name() -> OperationName {
        OperationName::new("quant.scast".to_string())
    }
    fn new(operation: Shared<Operation>) -> Self {
        StorageCastOp { operation }
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn is_pure(&self) -> bool {
        true
    }
    fn operation(&self) -> &Shared<Operation> {
        &self.operation
    }
    /// Fold `scast(scast(%x))` into `%x` when the types round-trip.
    fn canonicalize(&self) -> Result<RewriteResult> {
        let operation = self.operation.rd();
        let operand = match operation.operand(0) {
            Some(operand) => operand,
            None => return Ok(RewriteResult::Unchanged),
        };
        let inner = match operand.rd().defining_op() {
            Some(inner) => inner,
            None => return Ok(RewriteResult::Unchanged),
        };
        let source = {
            let inner = inner.rd();
            if !inner.as_any().is::<StorageCastOp>() {
                return Ok(RewriteResult::Unchanged);
            }
            let inner_operation = inner.operation().rd();
            let source = match inner_operation.operand(0) {
                Some(source) => source.rd().value(),
                None => return Ok(RewriteResult::Unchanged),
            };
            source
        };
        let source_type = source.rd().typ()?;
        if !type_eq(&operation.result_type(0)?, &source_type) {
            return Ok(RewriteResult::Unchanged);
        }
        let users = match operation.users() {
            Users::HasNoOpResults => return Ok(RewriteResult::Unchanged),
            Users::OpOperands(users) => users,
        };
        for user in users.iter() {
            user.wr().set_value(source.clone());
        }
        let parent = match operation.parent() {
            Some(parent) => parent,
            None => return Ok(RewriteResult::Unchanged),
        };
        parent.rd().remove(self.operation.clone());
        Ok(RewriteResult::Changed(ChangedOp::new(inner)))
    }
    fn display(&self, f: &mut Formatter<'_>, _indent: i32) -> std::fmt::Result {
        display_cast(self, f)
    }
}

impl Parse for StorageCastOp {
    fn op<T: ParserDispatch>(
        parser: &mut Parser<T>,
        parent: Option<Shared<Block>>,
    ) -> Result<Shared<dyn Op>> {
        parse_cast::<T, StorageCastOp>(parser, parent)
    }
}
