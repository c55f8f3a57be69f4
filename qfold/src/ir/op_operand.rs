use crate::frontend::Parser;
use crate::frontend::ParserDispatch;
use crate::frontend::TokenKind;
use crate::ir::Block;
use crate::ir::Op;
use crate::ir::Operation;
use crate::ir::Type;
use crate::ir::Value;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Display;
use std::fmt::Formatter;

/// A use of a [Value] by an operation.
pub struct OpOperand {
    value: Shared<Value>,
}

impl OpOperand {
    pub fn new(value: Shared<Value>) -> Self {
        OpOperand { value }
    }
    pub fn name(&self) -> Option<String> {
        self.value.rd().name()
    }
    pub fn value(&self) -> Shared<Value> {
        self.value.clone()
    }
    pub fn set_value(&mut self, value: Shared<Value>) {
        self.value = value;
    }
    /// If this `OpOperand` is the result of an operation, return the operation
    /// that defines it.
    pub fn defining_op(&self) -> Option<Shared<dyn Op>> {
        self.value.rd().defining_op()
    }
    pub fn typ(&self) -> Result<Shared<dyn Type>> {
        self.value.rd().typ()
    }
}

impl Display for OpOperand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "<anonymous>"),
        }
    }
}

#[derive(Clone)]
pub struct OpOperands {
    operands: Shared<Vec<Shared<OpOperand>>>,
}

impl IntoIterator for OpOperands {
    type Item = Shared<OpOperand>;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.operands.rd().clone().into_iter()
    }
}

impl OpOperands {
    pub fn vec(&self) -> Shared<Vec<Shared<OpOperand>>> {
        self.operands.clone()
    }
    pub fn from_vec(operands: Vec<Shared<OpOperand>>) -> Self {
        OpOperands {
            operands: Shared::new(operands.into()),
        }
    }
    pub fn len(&self) -> usize {
        self.operands.rd().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for OpOperands {
    fn default() -> Self {
        OpOperands::from_vec(vec![])
    }
}

impl Display for OpOperands {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .operands
            .rd()
            .iter()
            .map(|o| o.rd().to_string())
            .collect::<Vec<String>>()
            .join(", ");
        write!(f, "{joined}")
    }
}

impl<T: ParserDispatch> Parser<T> {
    /// Parse an operand such as `%0`.
    ///
    /// The operand points to the value that was assigned earlier. Using a
    /// name before it is assigned is an error.
    pub fn parse_op_operand(&mut self, parent: Shared<Block>) -> Result<Shared<OpOperand>> {
        let identifier = self.expect(TokenKind::PercentIdentifier)?;
        let name = identifier.lexeme.clone();
        let assignment = parent.rd().assignment(&name);
        let assignment = match assignment {
            Some(assignment) => assignment,
            None => {
                let msg = format!("Expected assignment before use of {name}");
                let msg = self.error(&identifier, &msg);
                return Err(anyhow::anyhow!(msg));
            }
        };
        let operand = OpOperand::new(assignment);
        Ok(Shared::new(operand.into()))
    }
    /// Parse a single operand into the given operation.
    pub fn parse_op_operand_into(
        &mut self,
        parent: Shared<Block>,
        operation: &mut Operation,
    ) -> Result<Shared<OpOperand>> {
        let operand = self.parse_op_operand(parent)?;
        operation.set_operand(operand.clone());
        Ok(operand)
    }
    /// Parse `%0, %1` or nothing.
    pub fn parse_op_operands(&mut self, parent: Shared<Block>) -> Result<OpOperands> {
        let mut operands = vec![];
        while self.check(TokenKind::PercentIdentifier) {
            operands.push(self.parse_op_operand(parent.clone())?);
            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(OpOperands::from_vec(operands))
    }
    /// Parse `%0, %1` or nothing into the given operation.
    pub fn parse_op_operands_into(
        &mut self,
        parent: Shared<Block>,
        operation: &mut Operation,
    ) -> Result<OpOperands> {
        let operands = self.parse_op_operands(parent)?;
        operation.set_operands(operands.clone());
        Ok(operands)
    }
}
