use crate::dialect::arith;
use crate::dialect::func;
use crate::dialect::quant;
use crate::dialect::quant::Quant;
use crate::frontend::scanner::Scanner;
use crate::frontend::token::Token;
use crate::frontend::token::TokenKind;
use crate::ir::Block;
use crate::ir::FloatType;
use crate::ir::IntegerType;
use crate::ir::ModuleOp;
use crate::ir::Op;
use crate::ir::Operation;
use crate::ir::Region;
use crate::ir::TensorType;
use crate::ir::Type;
use crate::ir::TypeParse;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;

/// Interface to add custom operations to the parser.
///
/// Clients can implement this trait to support custom recursive descent
/// parsing. The default implementation can only know about operations defined
/// in this crate. To support custom operations, implement this trait with
/// custom logic, see [DefaultParserDispatch] for an example.
pub trait ParserDispatch {
    /// Parse an operation.
    fn parse_op(parser: &mut Parser<Self>, parent: Option<Shared<Block>>) -> Result<Shared<dyn Op>>
    where
        Self: Sized;
    /// Parse a type.
    fn parse_type(parser: &mut Parser<Self>) -> Result<Shared<dyn Type>>
    where
        Self: Sized;
}

/// Default parser for determining the name of an operation.
///
/// # Examples
///
/// ```mlir
/// %1 = quant.qcast %0 : f32 to !quant.uniform<u8:f32, 0.5>
/// ```
///
/// The name of the operation is `quant.qcast`.
///
/// ```mlir
/// return %0 : f32
/// ```
///
/// The name of the operation is `return`.
pub fn default_parse_name<T: ParserDispatch>(parser: &Parser<T>) -> Token {
    match parser.peek_n(1) {
        // Ignore result name and '=' (e.g., `%0 = <op name>`).
        Some(next) if next.kind == TokenKind::Equal => match parser.peek_n(2) {
            Some(name) => name.clone(),
            None => next.clone(),
        },
        // Ignore nothing (e.g., `<op name> %0, %1`).
        _ => parser.peek().clone(),
    }
}

/// Default operation parser.
///
/// This parser knows about all operations defined in this crate. For
/// operations in external dialects, define another parser dispatcher and use
/// it.
pub struct DefaultParserDispatch;

pub fn default_dispatch<T: ParserDispatch>(
    name: Token,
    parser: &mut Parser<T>,
    parent: Option<Shared<Block>>,
) -> Result<Shared<dyn Op>> {
    match name.lexeme.clone().as_str() {
        "arith.constant" => <arith::ConstantOp as Parse>::op(parser, parent),
        "func.func" => <func::FuncOp as Parse>::op(parser, parent),
        "func.return" => <func::ReturnOp as Parse>::op(parser, parent),
        "module" => <ModuleOp as Parse>::op(parser, parent),
        "quant.dcast" => <quant::DequantizeCastOp as Parse>::op(parser, parent),
        "quant.qcast" => <quant::QuantizeCastOp as Parse>::op(parser, parent),
        "quant.scast" => <quant::StorageCastOp as Parse>::op(parser, parent),
        "return" => <func::ReturnOp as Parse>::op(parser, parent),
        _ => {
            let msg = parser.error(&name, &format!("Unknown operation: {}", name.lexeme));
            Err(anyhow::anyhow!(msg))
        }
    }
}

/// Parse the textual form of a type such as `tensor<2x!quant.uniform<u8:f32, 0.5>>`.
pub fn parse_type_str(text: &str) -> Result<Shared<dyn Type>> {
    if text.starts_with("!quant.") {
        return Quant::parse_type(text);
    }
    if let Some(inner) = text.strip_prefix("tensor<") {
        let inner = match inner.strip_suffix('>') {
            Some(inner) => inner,
            None => return Err(anyhow::anyhow!("Unterminated tensor type: {text}")),
        };
        let (shape, element_text) = TensorType::split_shape(inner)?;
        let element_type = parse_type_str(element_text)?;
        let typ = TensorType::new(shape, element_type);
        return Ok(Shared::new(typ.into()));
    }
    if let Some(typ) = FloatType::from_str(text) {
        return Ok(Shared::new(typ.into()));
    }
    if let Ok(typ) = IntegerType::from_str(text) {
        return Ok(Shared::new(typ.into()));
    }
    Err(anyhow::anyhow!("Unknown type: {text}"))
}

pub fn default_parse_type<T: ParserDispatch>(parser: &mut Parser<T>) -> Result<Shared<dyn Type>> {
    let token = parser.peek().clone();
    let text = parser.parse_type_text()?;
    if text.is_empty() {
        let msg = parser.error(&token, "Expected type");
        return Err(anyhow::anyhow!(msg));
    }
    match parse_type_str(&text) {
        Ok(typ) => Ok(typ),
        Err(err) => {
            let msg = parser.error(&token, &err.to_string());
            Err(anyhow::anyhow!(msg))
        }
    }
}

impl ParserDispatch for DefaultParserDispatch {
    fn parse_op(
        parser: &mut Parser<Self>,
        parent: Option<Shared<Block>>,
    ) -> Result<Shared<dyn Op>> {
        let name = default_parse_name(parser);
        default_dispatch(name, parser, parent)
    }
    fn parse_type(parser: &mut Parser<Self>) -> Result<Shared<dyn Type>> {
        default_parse_type(parser)
    }
}

/// Interface to define parsing of operations.
///
/// Downstream crates can implement this trait to support parsing of custom
/// operations.
pub trait Parse {
    fn op<T: ParserDispatch>(
        parser: &mut Parser<T>,
        parent: Option<Shared<Block>>,
    ) -> Result<Shared<dyn Op>>
    where
        Self: Sized;
}

pub struct Parser<T: ParserDispatch> {
    src: String,
    tokens: Vec<Token>,
    current: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: ParserDispatch> Parser<T> {
    pub fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
    pub fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    pub fn peek(&self) -> &Token {
        // The scanner always ends with an `Eof` token.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }
    pub fn peek_n(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.current + n)
    }
    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
    pub fn check(&self, kind: TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().kind == kind
    }
    pub fn error(&self, token: &Token, msg: &str) -> String {
        let msg = Scanner::error(&self.src, &token.location, msg);
        format!("\n\n{msg}\n")
    }
    fn report_token_error(&self, token: &Token, expected: TokenKind) -> Result<Token> {
        let msg = format!(
            "Expected {:?}, but got `{}` of kind {:?}",
            expected, token.lexeme, token.kind
        );
        Err(anyhow::anyhow!(self.error(token, &msg)))
    }
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(kind) {
            self.advance();
            Ok(self.previous().clone())
        } else {
            self.report_token_error(self.peek(), kind)
        }
    }
    fn is_region_end(&self) -> bool {
        self.peek().kind == TokenKind::RBrace || self.is_at_end()
    }
    pub fn parse_block(&mut self, parent: Shared<Region>) -> Result<Shared<Block>> {
        let ops: Shared<Vec<Shared<dyn Op>>> = Shared::new(vec![].into());
        let block = Block::new(ops.clone(), Some(parent));
        let block = Shared::new(block.into());
        while !self.is_region_end() {
            let op = T::parse_op(self, Some(block.clone()))?;
            ops.wr().push(op);
        }
        for op in ops.rd().iter() {
            op.rd().operation().wr().set_parent(Some(block.clone()));
        }
        Ok(block)
    }
    pub fn parse_region(&mut self, parent: Shared<dyn Op>) -> Result<Shared<Region>> {
        let mut region = Region::default();
        region.set_parent(Some(parent));
        let region = Shared::new(region.into());
        self.expect(TokenKind::LBrace)?;
        let block = self.parse_block(region.clone())?;
        region.rd().add_block(block);
        self.expect(TokenKind::RBrace)?;
        Ok(region)
    }
    pub fn parse_keyword(&mut self, keyword: &str) -> Result<()> {
        let token = self.expect(TokenKind::BareIdentifier)?;
        if token.lexeme != keyword {
            let msg = self.error(&token, &format!("Expected keyword: {keyword}"));
            return Err(anyhow::anyhow!(msg));
        }
        Ok(())
    }
    /// Parse `src` into a module.
    ///
    /// Top-level ops that are not inside a `module { ... }` are wrapped into
    /// one.
    pub fn parse(src: &str) -> Result<Shared<dyn Op>> {
        let mut parser = Parser::<T> {
            src: src.to_string(),
            tokens: Scanner::scan(src)?,
            current: 0,
            _marker: std::marker::PhantomData,
        };
        let mut ops = vec![];
        while !parser.is_at_end() {
            ops.push(T::parse_op(&mut parser, None)?);
        }
        if ops.len() == 1 && ops[0].rd().as_any().is::<ModuleOp>() {
            return Ok(ops.remove(0));
        }
        let mut operation = Operation::default();
        operation.set_name(ModuleOp::operation_name());
        let operation: Shared<Operation> = Shared::new(operation.into());
        let module: Shared<dyn Op> = Shared::new(ModuleOp::new(operation.clone()).into());

        let mut region = Region::default();
        region.set_parent(Some(module.clone()));
        let region = Shared::new(region.into());
        let ops: Shared<Vec<Shared<dyn Op>>> = Shared::new(ops.into());
        let block = Shared::new(Block::new(ops.clone(), Some(region.clone())).into());
        for op in ops.rd().iter() {
            op.rd().operation().wr().set_parent(Some(block.clone()));
        }
        region.rd().add_block(block);
        operation.wr().set_region(Some(region));
        Ok(module)
    }
    pub fn parse_type(&mut self) -> Result<Shared<dyn Type>> {
        T::parse_type(self)
    }
    /// Parse a type to a string.
    ///
    /// This is used to parse types without having to backtrack or do multiple
    /// peeks. Instead, this method provides a full string which then can be
    /// passed around. Whitespace is dropped.
    ///
    /// Examples:
    /// ```mlir
    /// tensor<2x3xf32>
    ///
    /// !quant.uniform<i8<-127:127>:f32:1, {0.5, 2.0:3}>
    /// ```
    pub fn parse_type_text(&mut self) -> Result<String> {
        let mut typ = String::new();
        if self.check(TokenKind::Exclamation) {
            self.advance();
            typ.push('!');
        }
        if self.check(TokenKind::BareIdentifier) || self.check(TokenKind::IntType) {
            let text = self.advance();
            typ.push_str(&text.lexeme);
        }
        if self.check(TokenKind::Less) {
            let mut depth = 0;
            loop {
                if self.is_at_end() {
                    let msg = self.error(self.peek(), &format!("Unterminated type: {typ}"));
                    return Err(anyhow::anyhow!(msg));
                }
                let token = self.advance().clone();
                match token.kind {
                    TokenKind::Less => depth += 1,
                    TokenKind::Greater => depth -= 1,
                    _ => (),
                }
                typ.push_str(&token.lexeme);
                if depth == 0 {
                    break;
                }
            }
        }
        Ok(typ)
    }
}
