use crate::frontend::Parser;
use crate::frontend::ParserDispatch;
use crate::frontend::TokenKind;
use crate::ir::Block;
use crate::ir::Op;
use crate::ir::OpOperand;
use crate::ir::Operation;
use crate::ir::Type;
use crate::ir::Types;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Display;

#[derive(Clone, Debug, PartialEq)]
pub enum BlockArgumentName {
    /// Anonymous block arguments are used for functions without an implementation.
    Anonymous,
    /// The name of the block argument.
    Name(String),
}

/// An argument in a block or function.
pub struct BlockArgument {
    name: BlockArgumentName,
    typ: Shared<dyn Type>,
    /// The block in which this argument is available.
    ///
    /// This is used by [Value::users] to find the users of this argument.
    parent: Option<Shared<Block>>,
}

impl BlockArgument {
    pub fn new(name: BlockArgumentName, typ: Shared<dyn Type>) -> Self {
        BlockArgument {
            name,
            typ,
            parent: None,
        }
    }
    pub fn name(&self) -> BlockArgumentName {
        self.name.clone()
    }
    pub fn parent(&self) -> Option<Shared<Block>> {
        self.parent.clone()
    }
    pub fn set_parent(&mut self, parent: Option<Shared<Block>>) {
        self.parent = parent;
    }
    pub fn typ(&self) -> Shared<dyn Type> {
        self.typ.clone()
    }
}

impl Display for BlockArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let typ = self.typ.rd();
        match &self.name {
            BlockArgumentName::Anonymous => write!(f, "{typ}"),
            BlockArgumentName::Name(name) => write!(f, "{name} : {typ}"),
        }
    }
}

/// An unnamed result of an operation, such as a function.
///
/// This result does not specify a name since, for example, the following is
/// invalid:
///
/// ```mlir
/// %0 = func.func @foo() -> %0 : i64
/// ```
pub struct AnonymousResult {
    typ: Shared<dyn Type>,
}

impl AnonymousResult {
    pub fn new(typ: Shared<dyn Type>) -> Self {
        AnonymousResult { typ }
    }
    pub fn typ(&self) -> Shared<dyn Type> {
        self.typ.clone()
    }
}

impl Display for AnonymousResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.typ.rd())
    }
}

/// A named result of an operation.
///
/// For example, in the following code:
/// ```mlir
/// %1 = quant.qcast %0 : tensor<3xf32> to tensor<3x!quant.uniform<u8:f32, 1.0>>
/// ```
/// `%1` is the result of the operation. The `defining_op` is `quant.qcast`
/// and the `typ` is the quantized tensor type.
pub struct OpResult {
    name: Option<String>,
    typ: Option<Shared<dyn Type>>,
    defining_op: Option<Shared<dyn Op>>,
}

impl OpResult {
    pub fn new(
        name: Option<String>,
        typ: Option<Shared<dyn Type>>,
        defining_op: Option<Shared<dyn Op>>,
    ) -> Self {
        OpResult {
            name,
            typ,
            defining_op,
        }
    }
    pub fn name(&self) -> Option<String> {
        self.name.clone()
    }
    pub fn typ(&self) -> Option<Shared<dyn Type>> {
        self.typ.clone()
    }
    pub fn defining_op(&self) -> Option<Shared<dyn Op>> {
        self.defining_op.clone()
    }
    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }
    pub fn set_typ(&mut self, typ: Shared<dyn Type>) {
        self.typ = Some(typ);
    }
    pub fn set_defining_op(&mut self, op: Option<Shared<dyn Op>>) {
        self.defining_op = op;
    }
}

impl Default for OpResult {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

impl Display for OpResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "<unnamed>"),
        }
    }
}

#[must_use = "the object should be further initialized, see the setter methods"]
pub struct UnsetOpResult {
    result: Shared<Value>,
}

impl UnsetOpResult {
    pub fn new(result: Shared<Value>) -> Self {
        UnsetOpResult { result }
    }
    pub fn value(&self) -> Shared<Value> {
        self.result.clone()
    }
    pub fn set_defining_op(&self, op: Option<Shared<dyn Op>>) {
        self.result.wr().set_defining_op(op);
    }
    pub fn set_typ(&self, typ: Shared<dyn Type>) {
        self.result.wr().set_type(typ);
    }
}

pub enum Users {
    /// The operation defines no `OpResult`s.
    HasNoOpResults,
    /// The operation defines `OpResult`s (and can still have zero users).
    OpOperands(Vec<Shared<OpOperand>>),
}

impl Users {
    pub fn len(&self) -> usize {
        match self {
            Users::HasNoOpResults => 0,
            Users::OpOperands(users) => users.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An instance of a value in the IR.
///
/// The primary purpose of a [Value] is to be pointed to by operands. So, in
/// the following example:
///
/// ```mlir
/// %0 = arith.constant dense<[1.0, 2.0]> : tensor<2xf32>
/// %1 = quant.qcast %0 : tensor<2xf32> to tensor<2x!quant.uniform<u8:f32, 0.5>>
/// ```
///
/// The [OpOperand] `%0` in the second line points to the [OpResult] defined
/// by the constant in the first line. Rewrites rely on this: replacing an op
/// keeps the same [Value], so every user automatically sees the new op.
pub enum Value {
    /// A block argument (e.g., `%arg0` in `func.func @f(%arg0 : f32)`).
    BlockArgument(BlockArgument),
    /// The type of a function result.
    FuncResult(AnonymousResult),
    /// A result of an operation (e.g., `%0 = ...`).
    OpResult(OpResult),
}

/// Collect all ops inside `ops`, including the ops nested in their regions.
fn collect_nested(ops: &[Shared<dyn Op>], out: &mut Vec<Shared<dyn Op>>) {
    for op in ops.iter() {
        out.push(op.clone());
        let nested = op.rd().ops();
        collect_nested(&nested, out);
    }
}

impl Value {
    /// The name of the value.
    ///
    /// Returns `None` for anonymous block arguments and function results.
    pub fn name(&self) -> Option<String> {
        match self {
            Value::BlockArgument(arg) => match arg.name() {
                BlockArgumentName::Anonymous => None,
                BlockArgumentName::Name(name) => Some(name),
            },
            Value::FuncResult(_) => None,
            Value::OpResult(result) => result.name(),
        }
    }
    pub fn typ(&self) -> Result<Shared<dyn Type>> {
        match self {
            Value::BlockArgument(arg) => Ok(arg.typ()),
            Value::FuncResult(result) => Ok(result.typ()),
            Value::OpResult(result) => match result.typ() {
                Some(typ) => Ok(typ),
                None => Err(anyhow::anyhow!("Type was not set for OpResult {}", self)),
            },
        }
    }
    pub fn set_type(&mut self, typ: Shared<dyn Type>) {
        match self {
            Value::BlockArgument(arg) => arg.typ = typ,
            Value::FuncResult(result) => result.typ = typ,
            Value::OpResult(result) => result.set_typ(typ),
        }
    }
    pub fn set_defining_op(&mut self, op: Option<Shared<dyn Op>>) {
        match self {
            Value::BlockArgument(_) => panic!("Cannot set defining op for BlockArgument"),
            Value::FuncResult(_) => panic!("It is not necessary to set this defining op"),
            Value::OpResult(result) => result.set_defining_op(op),
        }
    }
    pub fn set_parent(&mut self, parent: Option<Shared<Block>>) {
        if let Value::BlockArgument(arg) = self {
            arg.set_parent(parent);
        }
    }
    pub fn set_name(&mut self, name: &str) {
        match self {
            Value::BlockArgument(arg) => arg.name = BlockArgumentName::Name(name.to_string()),
            Value::FuncResult(_) => panic!("It is not necessary to set this name"),
            Value::OpResult(result) => result.set_name(name),
        }
    }
    pub fn defining_op(&self) -> Option<Shared<dyn Op>> {
        match self {
            Value::OpResult(result) => result.defining_op(),
            _ => None,
        }
    }
    fn find_users(&self, ops: &[Shared<dyn Op>]) -> Vec<Shared<OpOperand>> {
        let mut all = vec![];
        collect_nested(ops, &mut all);
        let mut out = Vec::new();
        for op in all.iter() {
            for operand in op.rd().operation().rd().operands().into_iter() {
                let value = operand.rd().value();
                if std::ptr::eq(&*value.rd() as *const Value, self as *const Value) {
                    out.push(operand.clone());
                }
            }
        }
        out
    }
    fn block_arg_users(&self, arg: &BlockArgument) -> Vec<Shared<OpOperand>> {
        match arg.parent() {
            Some(parent) => {
                let ops = parent.rd().ops().rd().clone();
                self.find_users(&ops)
            }
            None => vec![],
        }
    }
    fn op_result_users(&self, result: &OpResult) -> Vec<Shared<OpOperand>> {
        let op = match result.defining_op() {
            Some(op) => op,
            None => panic!("Defining op not set for OpResult {result}"),
        };
        let successors = op.rd().successors();
        self.find_users(&successors)
    }
    pub fn users(&self) -> Users {
        match self {
            Value::BlockArgument(arg) => Users::OpOperands(self.block_arg_users(arg)),
            Value::FuncResult(_) => Users::HasNoOpResults,
            Value::OpResult(result) => Users::OpOperands(self.op_result_users(result)),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::BlockArgument(arg) => write!(f, "{arg}"),
            Value::FuncResult(result) => write!(f, "{result}"),
            Value::OpResult(result) => write!(f, "{result}"),
        }
    }
}

/// Vector of values.
///
/// Used to store operation results and function arguments.
#[derive(Clone)]
pub struct Values {
    values: Shared<Vec<Shared<Value>>>,
}

impl IntoIterator for Values {
    type Item = Shared<Value>;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.rd().clone().into_iter()
    }
}

impl Values {
    pub fn from_vec(values: Vec<Shared<Value>>) -> Self {
        Values {
            values: Shared::new(values.into()),
        }
    }
    pub fn vec(&self) -> Shared<Vec<Shared<Value>>> {
        self.values.clone()
    }
    pub fn names(&self) -> Vec<String> {
        self.values
            .rd()
            .iter()
            .filter_map(|value| value.rd().name())
            .collect()
    }
    pub fn len(&self) -> usize {
        self.values.rd().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn types(&self) -> Result<Types> {
        let types = self
            .values
            .rd()
            .iter()
            .map(|value| value.rd().typ())
            .collect::<Result<Vec<Shared<dyn Type>>>>()?;
        Ok(Types::from_vec(types))
    }
}

impl Default for Values {
    fn default() -> Self {
        Values::from_vec(vec![])
    }
}

impl Display for Values {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .values
            .rd()
            .iter()
            .map(|value| value.rd().to_string())
            .collect::<Vec<String>>()
            .join(", ");
        write!(f, "{joined}")
    }
}

// Putting these on the parser to allow method discovery via `parser.parse_`.
impl<T: ParserDispatch> Parser<T> {
    /// Parse `%arg0 : f32` or `f32`.
    pub fn parse_function_argument(&mut self) -> Result<Shared<Value>> {
        let name = if self.check(TokenKind::PercentIdentifier) {
            let identifier = self.expect(TokenKind::PercentIdentifier)?;
            self.expect(TokenKind::Colon)?;
            BlockArgumentName::Name(identifier.lexeme)
        } else {
            BlockArgumentName::Anonymous
        };
        let typ = self.parse_type()?;
        let arg = Value::BlockArgument(BlockArgument::new(name, typ));
        Ok(Shared::new(arg.into()))
    }
    fn is_function_argument(&self) -> bool {
        // For example, `@add(%arg0 : i32)`.
        let perc = self.check(TokenKind::PercentIdentifier);
        // For example, `@add(i32)`.
        let int = self.check(TokenKind::IntType);
        // For example, `@f(!quant.uniform<...>)`.
        let excl = self.check(TokenKind::Exclamation);
        // For example, `@f(tensor<2xf32>)`.
        let bare = self.check(TokenKind::BareIdentifier);
        perc || int || excl || bare
    }
    /// Parse `(%arg0 : i64, %arg1 : i64)`, or `(i64, f32)`.
    pub fn parse_function_arguments(&mut self) -> Result<Values> {
        self.expect(TokenKind::LParen)?;
        let mut arguments = vec![];
        while self.is_function_argument() {
            arguments.push(self.parse_function_argument()?);
            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Values::from_vec(arguments))
    }
    /// Parse operation result such as `%0` in `%0 = ...`.
    pub fn parse_op_result(&mut self, token_kind: TokenKind) -> Result<UnsetOpResult> {
        let identifier = self.expect(token_kind)?;
        let mut result = OpResult::default();
        result.set_name(&identifier.lexeme);
        let result = Value::OpResult(result);
        Ok(UnsetOpResult::new(Shared::new(result.into())))
    }
    /// Parse a single result including the `=` into `operation`.
    pub fn parse_op_result_into(
        &mut self,
        token_kind: TokenKind,
        operation: &mut Operation,
    ) -> Result<UnsetOpResult> {
        let result = self.parse_op_result(token_kind)?;
        self.expect(TokenKind::Equal)?;
        operation.set_results(Values::from_vec(vec![result.value()]));
        Ok(result)
    }
}
