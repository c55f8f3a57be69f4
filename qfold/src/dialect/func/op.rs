use crate::frontend::Parse;
use crate::frontend::Parser;
use crate::frontend::ParserDispatch;
use crate::frontend::TokenKind;
use crate::ir::Block;
use crate::ir::Op;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::ir::StringAttr;
use crate::ir::Type;
use crate::ir::Types;
use crate::ir::Values;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Formatter;
use std::sync::Arc;

/// `func.func`
///
/// ```mlir
/// func.func @main(%arg0 : tensor<2xf32>) -> tensor<2xf32> {
///   ...
/// }
/// ```
///
/// Note that the operands of the function are internally represented by
/// `BlockArgument`s, but the textual form is inline. A function without a
/// body is a declaration.
pub struct FuncOp {
    operation: Shared<Operation>,
}

impl FuncOp {
    /// The name of the function without the `@` prefix.
    pub fn identifier(&self) -> Option<String> {
        let attribute = self.attribute("sym_name")?;
        let name = attribute.as_any().downcast_ref::<StringAttr>()?;
        Some(name.value())
    }
    pub fn set_identifier(&self, identifier: &str) {
        let attributes = self.operation.rd().attributes();
        attributes.insert("sym_name", Arc::new(StringAttr::new(identifier)));
    }
    /// Visibility such as `private`.
    ///
    /// It is legal to not have set visibility.
    pub fn sym_visibility(&self) -> Option<String> {
        let attribute = self.attribute("sym_visibility")?;
        let visibility = attribute.as_any().downcast_ref::<StringAttr>()?;
        Some(visibility.value())
    }
    pub fn set_sym_visibility(&self, visibility: Option<String>) {
        if let Some(visibility) = visibility {
            let attributes = self.operation.rd().attributes();
            attributes.insert("sym_visibility", Arc::new(StringAttr::new(&visibility)));
        }
    }
    pub fn arguments(&self) -> Values {
        self.operation.rd().arguments()
    }
    pub fn return_types(&self) -> Result<Types> {
        self.operation.rd().results().types()
    }
    fn display_return_types(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let types = match self.return_types() {
            Ok(types) => types.vec(),
            Err(_) => return Ok(()),
        };
        match types.len() {
            0 => Ok(()),
            1 => write!(f, " -> {}", types[0].rd()),
            _ => write!(f, " -> ({})", Types::from_vec(types)),
        }
    }
}

impl Op for FuncOp {
    fn operation_name() -> OperationName {
        OperationName::new("func.func".to_string())
    }
    fn new(operation: Shared<Operation>) -> Self {
        FuncOp { operation }
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn is_func(&self) -> bool {
        true
    }
    fn operation(&self) -> &Shared<Operation> {
        &self.operation
    }
    fn display(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        let operation = self.operation.rd();
        write!(f, "{} ", operation.name())?;
        if let Some(visibility) = self.sym_visibility() {
            write!(f, "{visibility} ")?;
        }
        let identifier = self.identifier().unwrap_or_default();
        write!(f, "@{identifier}({})", operation.arguments())?;
        self.display_return_types(f)?;
        if let Some(region) = operation.region() {
            region.rd().display(f, indent)?;
        }
        operation.display_location(f)
    }
}

impl<T: ParserDispatch> Parser<T> {
    /// Parse `-> f32`, `-> (f32, i8)` or nothing.
    fn parse_return_types(&mut self) -> Result<Vec<Shared<dyn Type>>> {
        if !self.check(TokenKind::Arrow) {
            return Ok(vec![]);
        }
        self.advance();
        if !self.check(TokenKind::LParen) {
            return Ok(vec![self.parse_type()?]);
        }
        self.expect(TokenKind::LParen)?;
        let mut types = vec![];
        while !self.check(TokenKind::RParen) {
            types.push(self.parse_type()?);
            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(types)
    }
}

impl Parse for FuncOp {
    fn op<T: ParserDispatch>(
        parser: &mut Parser<T>,
        parent: Option<Shared<Block>>,
    ) -> Result<Shared<dyn Op>> {
        let mut operation = Operation::default();
        operation.set_parent(parent);
        parser.parse_operation_name_into::<FuncOp>(&mut operation)?;
        let visibility = if parser.check(TokenKind::BareIdentifier) {
            Some(parser.advance().lexeme.clone())
        } else {
            None
        };
        let identifier = parser.expect(TokenKind::AtIdentifier)?;
        let identifier = identifier.lexeme.trim_start_matches('@').to_string();
        operation.set_arguments(parser.parse_function_arguments()?);
        operation.set_anonymous_results(parser.parse_return_types()?);

        let op = FuncOp::from_operation(operation);
        op.set_identifier(&identifier);
        op.set_sym_visibility(visibility);
        let operation = op.operation().clone();
        let op: Shared<dyn Op> = Shared::new(op.into());

        if parser.check(TokenKind::LBrace) {
            let region = parser.parse_region(op.clone())?;
            if let Some(block) = region.rd().block(0) {
                for argument in operation.rd().arguments().into_iter() {
                    argument.wr().set_parent(Some(block.clone()));
                }
            }
            operation.wr().set_region(Some(region));
        }
        let location = parser.parse_optional_location()?;
        operation.wr().set_location(location);
        Ok(op)
    }
}

/// `return` (also accepted as `func.return`)
///
/// ```mlir
/// return %1 : tensor<3x!quant.uniform<u8:f32, 1.0>>
/// ```
pub struct ReturnOp {
    operation: Shared<Operation>,
}

impl Op for ReturnOp {
    fn operation_name() -> OperationName {
        OperationName::new("return".to_string())
    }
    fn new(operation: Shared<Operation>) -> Self {
        ReturnOp { operation }
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn operation(&self) -> &Shared<Operation> {
        &self.operation
    }
    fn display(&self, f: &mut Formatter<'_>, _indent: i32) -> std::fmt::Result {
        let operation = self.operation.rd();
        write!(f, "{}", operation.name())?;
        let operands = operation.operands();
        if !operands.is_empty() {
            write!(f, " {operands}")?;
            if let Ok(types) = operation.operand_types() {
                write!(f, " : {types}")?;
            }
        }
        operation.display_location(f)
    }
}

impl Parse for ReturnOp {
    fn op<T: ParserDispatch>(
        parser: &mut Parser<T>,
        parent: Option<Shared<Block>>,
    ) -> Result<Shared<dyn Op>> {
        let parent = match parent {
            Some(parent) => parent,
            None => {
                let token = parser.peek().clone();
                let msg = parser.error(&token, "Expected return to be inside a function");
                return Err(anyhow::anyhow!(msg));
            }
        };
        let name = parser.expect(TokenKind::BareIdentifier)?;
        if name.lexeme != "return" && name.lexeme != "func.return" {
            let msg = parser.error(&name, &format!("Expected return, but got {}", name.lexeme));
            return Err(anyhow::anyhow!(msg));
        }
        let mut operation = Operation::default();
        operation.set_parent(Some(parent.clone()));
        let operands = parser.parse_op_operands_into(parent, &mut operation)?;
        if !operands.is_empty() {
            parser.expect(TokenKind::Colon)?;
            for operand in operands.into_iter() {
                let typ = parser.parse_type()?;
                parser.verify_type(&operand, &typ)?;
                if parser.check(TokenKind::Comma) {
                    parser.advance();
                }
            }
        }
        operation.set_location(parser.parse_optional_location()?);
        let op = ReturnOp::from_operation(operation);
        Ok(Shared::new(op.into()))
    }
}
