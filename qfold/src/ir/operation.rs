use crate::frontend::Parser;
use crate::frontend::ParserDispatch;
use crate::frontend::TokenKind;
use crate::ir::AnonymousResult;
use crate::ir::Attributes;
use crate::ir::Block;
use crate::ir::Location;
use crate::ir::Op;
use crate::ir::OpOperand;
use crate::ir::OpOperands;
use crate::ir::OpResult;
use crate::ir::Region;
use crate::ir::Type;
use crate::ir::Types;
use crate::ir::UnsetOpResult;
use crate::ir::Users;
use crate::ir::Value;
use crate::ir::Values;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Display;
use std::fmt::Formatter;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OperationName {
    name: String,
}

impl OperationName {
    pub fn new(name: String) -> Self {
        Self { name }
    }
    pub fn name(&self) -> String {
        self.name.clone()
    }
}

impl Display for OperationName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            return write!(f, "<unknown>");
        }
        write!(f, "{}", self.name)
    }
}

impl<T: ParserDispatch> Parser<T> {
    /// Parse the name of the op and check it against `O::operation_name()`.
    pub fn parse_operation_name_into<O: Op>(
        &mut self,
        operation: &mut Operation,
    ) -> Result<OperationName> {
        let identifier = self.expect(TokenKind::BareIdentifier)?;
        let name = O::operation_name();
        if identifier.lexeme != name.name() {
            let msg = format!("Expected {name}, but got {}", identifier.lexeme);
            let msg = self.error(&identifier, &msg);
            return Err(anyhow::anyhow!(msg));
        }
        operation.set_name(name.clone());
        Ok(name)
    }
}

/// Note that MLIR distinguishes between Operation and Op.
/// Operation generically models all operations.
/// Op is an interface for more specific operations.
/// For example, `ConstantOp` does not take inputs and gives one output.
/// `ConstantOp` does also not specify fields apart from `operation` since
/// they are accessed via a pointer to the `Operation`.
/// The operation also represents functions and modules.
#[derive(Clone)]
pub struct Operation {
    name: OperationName,
    /// Used by functions to store arguments.
    arguments: Values,
    operands: OpOperands,
    attributes: Attributes,
    /// Results are [Value]s, so either [AnonymousResult] or [OpResult].
    results: Values,
    region: Option<Shared<Region>>,
    /// This is set after parsing because not all parents are known during
    /// parsing (for example, the parent of a top-level function will be a
    /// `ModuleOp` that is created after parsing of the `FuncOp`).
    parent: Option<Shared<Block>>,
    location: Location,
}

impl Operation {
    pub fn name(&self) -> OperationName {
        self.name.clone()
    }
    pub fn arguments(&self) -> Values {
        self.arguments.clone()
    }
    pub fn operands(&self) -> OpOperands {
        self.operands.clone()
    }
    pub fn operand(&self, index: usize) -> Option<Shared<OpOperand>> {
        self.operands.vec().rd().get(index).cloned()
    }
    pub fn operand_types(&self) -> Result<Types> {
        let types = self
            .operands
            .clone()
            .into_iter()
            .map(|operand| operand.rd().typ())
            .collect::<Result<Vec<Shared<dyn Type>>>>()?;
        Ok(Types::from_vec(types))
    }
    pub fn attributes(&self) -> Attributes {
        self.attributes.clone()
    }
    pub fn results(&self) -> Values {
        self.results.clone()
    }
    pub fn result(&self, index: usize) -> Option<Shared<Value>> {
        self.results.vec().rd().get(index).cloned()
    }
    /// The type of the result at `index`.
    pub fn result_type(&self, index: usize) -> Result<Shared<dyn Type>> {
        match self.result(index) {
            Some(result) => result.rd().typ(),
            None => Err(anyhow::anyhow!("{} has no result {index}", self.name)),
        }
    }
    pub fn region(&self) -> Option<Shared<Region>> {
        self.region.clone()
    }
    /// Return the parent block (this is called `getBlock` in MLIR).
    pub fn parent(&self) -> Option<Shared<Block>> {
        self.parent.clone()
    }
    /// Return the op that contains this operation.
    pub fn parent_op(&self) -> Option<Shared<dyn Op>> {
        let parent = self.parent()?;
        let op = parent.rd().parent_op();
        op
    }
    pub fn location(&self) -> Location {
        self.location.clone()
    }
    pub fn set_name(&mut self, name: OperationName) {
        self.name = name;
    }
    pub fn set_arguments(&mut self, arguments: Values) {
        self.arguments = arguments;
    }
    /// Set the operand of the operation.
    ///
    /// This overrides any previously set operands.
    pub fn set_operand(&mut self, operand: Shared<OpOperand>) {
        self.operands = OpOperands::from_vec(vec![operand]);
    }
    pub fn set_operands(&mut self, operands: OpOperands) {
        self.operands = operands;
    }
    pub fn set_results(&mut self, results: Values) {
        self.results = results;
    }
    pub fn set_region(&mut self, region: Option<Shared<Region>>) {
        self.region = region;
    }
    pub fn set_parent(&mut self, parent: Option<Shared<Block>>) {
        self.parent = parent;
    }
    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }
    /// Set the results (and types) of the operation to [AnonymousResult]s.
    pub fn set_anonymous_results(&mut self, result_types: Vec<Shared<dyn Type>>) {
        let results = result_types
            .into_iter()
            .map(|typ| Shared::new(Value::FuncResult(AnonymousResult::new(typ)).into()))
            .collect();
        self.results = Values::from_vec(results);
    }
    /// Add a new op result with given name.
    ///
    /// The defining op still has to be set on the returned result.
    pub fn add_new_op_result(&self, name: &str, typ: Shared<dyn Type>) -> UnsetOpResult {
        let mut result = OpResult::default();
        result.set_name(name);
        result.set_typ(typ);
        let result: Shared<Value> = Shared::new(Value::OpResult(result).into());
        self.results.vec().wr().push(result.clone());
        UnsetOpResult::new(result)
    }
    /// All operands that use one of the results of this operation.
    pub fn users(&self) -> Users {
        if self.results.is_empty() {
            return Users::HasNoOpResults;
        }
        let mut out = Vec::new();
        for result in self.results.clone().into_iter() {
            if let Users::OpOperands(users) = result.rd().users() {
                out.extend(users);
            }
        }
        Users::OpOperands(out)
    }
    /// Display the results of the operation (e.g., `%0 = `).
    pub fn display_results(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.results.is_empty() {
            write!(f, "{} = ", self.results)?;
        }
        Ok(())
    }
    /// Display the location (e.g., ` loc("a.mlir":1:2)`) unless it is unknown.
    pub fn display_location(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.location.is_unknown() {
            write!(f, " {}", self.location)?;
        }
        Ok(())
    }
    /// Generic textual form such as `%0 = foo.bar %1 {a = 1} : f32`.
    pub fn display(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        self.display_results(f)?;
        write!(f, "{}", self.name)?;
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands)?;
        }
        if !self.attributes.is_empty() {
            write!(f, " {}", self.attributes)?;
        }
        if let Ok(types) = self.results.types() {
            if !types.is_empty() {
                write!(f, " : {types}")?;
            }
        }
        if let Some(region) = self.region() {
            region.rd().display(f, indent)?;
        }
        self.display_location(f)
    }
}

impl Default for Operation {
    fn default() -> Self {
        Self {
            name: OperationName::new("".to_string()),
            arguments: Values::default(),
            operands: OpOperands::default(),
            attributes: Attributes::new(),
            results: Values::default(),
            region: None,
            parent: None,
            location: Location::Unknown,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f, 0)
    }
}
