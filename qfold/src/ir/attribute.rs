use crate::frontend::Parser;
use crate::frontend::ParserDispatch;
use crate::frontend::Token;
use crate::frontend::TokenKind;
use crate::ir::format_float;
use crate::ir::FloatType;
use crate::ir::IntegerType;
use crate::ir::TensorType;
use crate::ir::Type;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

/// Attributes are known-constant values of operations (a variable is not allowed).
/// Attributes belong to operations and can be used to, for example, specify
/// the payload of a constant.
pub trait Attribute {
    fn as_any(&self) -> &dyn std::any::Any;
    fn typ(&self) -> Shared<dyn Type>;
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result;
}

impl Display for dyn Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f)
    }
}

/// An attribute containing an integer value such as `42 : i64`.
#[derive(Clone)]
pub struct IntegerAttr {
    typ: IntegerType,
    value: i64,
}

impl IntegerAttr {
    pub fn new(typ: IntegerType, value: i64) -> Self {
        Self { typ, value }
    }
    pub fn value(&self) -> i64 {
        self.value
    }
    pub fn integer_type(&self) -> IntegerType {
        self.typ
    }
}

impl Attribute for IntegerAttr {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn typ(&self) -> Shared<dyn Type> {
        Shared::new(self.typ.into())
    }
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.typ.num_bits() == 1 {
            let text = if self.value == 0 { "false" } else { "true" };
            return write!(f, "{text}");
        }
        write!(f, "{} : {}", self.value, self.typ)
    }
}

/// An attribute containing a float value such as `1.5 : f32`.
#[derive(Clone)]
pub struct FloatAttr {
    typ: FloatType,
    value: f64,
}

impl FloatAttr {
    /// Create a float attribute; the value is rounded to the precision of `typ`.
    pub fn new(typ: FloatType, value: f64) -> Self {
        Self {
            typ,
            value: typ.round(value),
        }
    }
    pub fn value(&self) -> f64 {
        self.value
    }
    pub fn float_type(&self) -> FloatType {
        self.typ
    }
}

impl Attribute for FloatAttr {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn typ(&self) -> Shared<dyn Type> {
        Shared::new(self.typ.into())
    }
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : {}", format_float(self.value), self.typ)
    }
}

/// Element storage for tensor literals.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementValues {
    Float(Vec<f64>),
    Int(Vec<i64>),
}

impl ElementValues {
    pub fn len(&self) -> usize {
        match self {
            ElementValues::Float(values) => values.len(),
            ElementValues::Int(values) => values.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn floats(&self) -> Option<&[f64]> {
        match self {
            ElementValues::Float(values) => Some(values),
            ElementValues::Int(_) => None,
        }
    }
    pub fn ints(&self) -> Option<&[i64]> {
        match self {
            ElementValues::Float(_) => None,
            ElementValues::Int(values) => Some(values),
        }
    }
    fn display_element(&self, f: &mut Formatter<'_>, index: usize) -> std::fmt::Result {
        match self {
            ElementValues::Float(values) => write!(f, "{}", format_float(values[index])),
            ElementValues::Int(values) => write!(f, "{}", values[index]),
        }
    }
    fn display_flat(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for i in 0..self.len() {
            if 0 < i {
                write!(f, ", ")?;
            }
            self.display_element(f, i)?;
        }
        write!(f, "]")
    }
    /// Print the elements as nested lists following `shape`.
    fn display_nested(
        &self,
        f: &mut Formatter<'_>,
        shape: &[i64],
        offset: usize,
    ) -> std::fmt::Result {
        if shape.is_empty() {
            return self.display_element(f, offset);
        }
        let stride: usize = shape[1..].iter().map(|dim| *dim as usize).product();
        write!(f, "[")?;
        for i in 0..shape[0] as usize {
            if 0 < i {
                write!(f, ", ")?;
            }
            self.display_nested(f, &shape[1..], offset + i * stride)?;
        }
        write!(f, "]")
    }
}

/// Convert a literal to the element representation of `element_type`.
fn element_values(literals: &[Literal], element_type: &Shared<dyn Type>) -> Result<ElementValues> {
    let element_type = element_type.rd();
    if let Some(float) = element_type.as_any().downcast_ref::<FloatType>() {
        let values = literals
            .iter()
            .map(|literal| literal.as_f64().map(|v| float.round(v)))
            .collect::<Result<Vec<f64>>>()?;
        return Ok(ElementValues::Float(values));
    }
    if element_type.as_any().is::<IntegerType>() {
        let values = literals
            .iter()
            .map(|literal| literal.as_i64())
            .collect::<Result<Vec<i64>>>()?;
        return Ok(ElementValues::Int(values));
    }
    Err(anyhow::anyhow!(
        "Unsupported element type for tensor literal: {}",
        element_type.to_string()
    ))
}

/// A dense tensor literal such as `dense<[1.0, 2.0]> : tensor<2xf32>`.
///
/// When all elements are equal, only one value is stored (a splat).
#[derive(Clone)]
pub struct DenseElementsAttr {
    typ: TensorType,
    values: ElementValues,
}

impl DenseElementsAttr {
    pub fn new(typ: TensorType, values: ElementValues) -> Result<Self> {
        let num_elements = match typ.num_elements() {
            Some(n) => n,
            None => return Err(anyhow::anyhow!("Dense literal requires a static shape")),
        };
        if values.len() != num_elements && values.len() != 1 {
            return Err(anyhow::anyhow!(
                "Expected {num_elements} elements for {typ}, but got {}",
                values.len()
            ));
        }
        Ok(Self { typ, values })
    }
    pub fn tensor_type(&self) -> &TensorType {
        &self.typ
    }
    pub fn values(&self) -> &ElementValues {
        &self.values
    }
    pub fn num_elements(&self) -> usize {
        self.typ.num_elements().unwrap_or(0)
    }
    pub fn is_splat(&self) -> bool {
        self.values.len() == 1
    }
    /// All elements, with splats expanded.
    pub fn expanded(&self) -> ElementValues {
        if !self.is_splat() {
            return self.values.clone();
        }
        let n = self.num_elements();
        match &self.values {
            ElementValues::Float(values) => ElementValues::Float(vec![values[0]; n]),
            ElementValues::Int(values) => ElementValues::Int(vec![values[0]; n]),
        }
    }
}

impl Attribute for DenseElementsAttr {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn typ(&self) -> Shared<dyn Type> {
        Shared::new(self.typ.clone().into())
    }
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "dense<")?;
        if self.is_splat() {
            self.values.display_element(f, 0)?;
        } else {
            self.values.display_nested(f, self.typ.shape(), 0)?;
        }
        write!(f, "> : {}", self.typ)
    }
}

/// A sparse tensor literal in coordinate format such as
/// `sparse<[[0], [2]], [1.0, 2.0]> : tensor<3xf32>`.
///
/// Elements that are not listed are zero.
#[derive(Clone)]
pub struct SparseElementsAttr {
    typ: TensorType,
    indices: Vec<Vec<i64>>,
    values: ElementValues,
}

impl SparseElementsAttr {
    pub fn new(typ: TensorType, indices: Vec<Vec<i64>>, values: ElementValues) -> Result<Self> {
        if !typ.has_static_shape() {
            return Err(anyhow::anyhow!("Sparse literal requires a static shape"));
        }
        if indices.len() != values.len() {
            return Err(anyhow::anyhow!(
                "Got {} values for {} indices",
                values.len(),
                indices.len()
            ));
        }
        for index in indices.iter() {
            let in_bounds = index.len() == typ.rank()
                && index
                    .iter()
                    .zip(typ.shape().iter())
                    .all(|(i, dim)| 0 <= *i && i < dim);
            if !in_bounds {
                return Err(anyhow::anyhow!("Index {index:?} is out of bounds for {typ}"));
            }
        }
        Ok(Self {
            typ,
            indices,
            values,
        })
    }
    pub fn tensor_type(&self) -> &TensorType {
        &self.typ
    }
    pub fn indices(&self) -> &[Vec<i64>] {
        &self.indices
    }
    pub fn values(&self) -> &ElementValues {
        &self.values
    }
    /// Row-major position of a coordinate.
    pub fn flat_index(&self, index: &[i64]) -> usize {
        let mut flat = 0;
        for (i, dim) in index.iter().zip(self.typ.shape().iter()) {
            flat = flat * (*dim as usize) + (*i as usize);
        }
        flat
    }
    /// All elements in row-major order with the implicit zeros filled in.
    pub fn to_dense(&self) -> ElementValues {
        let n = self.typ.num_elements().unwrap_or(0);
        match &self.values {
            ElementValues::Float(values) => {
                let mut out = vec![0.0; n];
                for (index, value) in self.indices.iter().zip(values.iter()) {
                    out[self.flat_index(index)] = *value;
                }
                ElementValues::Float(out)
            }
            ElementValues::Int(values) => {
                let mut out = vec![0; n];
                for (index, value) in self.indices.iter().zip(values.iter()) {
                    out[self.flat_index(index)] = *value;
                }
                ElementValues::Int(out)
            }
        }
    }
}

impl Attribute for SparseElementsAttr {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn typ(&self) -> Shared<dyn Type> {
        Shared::new(self.typ.clone().into())
    }
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let indices = self
            .indices
            .iter()
            .map(|index| {
                let coords = index
                    .iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");
                format!("[{coords}]")
            })
            .collect::<Vec<String>>()
            .join(", ");
        write!(f, "sparse<[{indices}], ")?;
        self.values.display_flat(f)?;
        write!(f, "> : {}", self.typ)
    }
}

/// UTF-8 encoded string.
#[derive(Clone)]
pub struct StringAttr {
    value: String,
}

impl StringAttr {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
    pub fn value(&self) -> String {
        self.value.clone()
    }
}

impl Attribute for StringAttr {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn typ(&self) -> Shared<dyn Type> {
        Shared::new(AnyType::new("none").into())
    }
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.value)
    }
}

/// An attribute that is kept as text.
pub struct AnyAttr {
    value: String,
}

impl AnyAttr {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
    pub fn value(&self) -> String {
        self.value.clone()
    }
}

impl Attribute for AnyAttr {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn typ(&self) -> Shared<dyn Type> {
        Shared::new(AnyType::new("none").into())
    }
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Placeholder type for attributes that do not carry a value type.
pub struct AnyType {
    typ: String,
}

impl AnyType {
    pub fn new(typ: &str) -> Self {
        Self {
            typ: typ.to_string(),
        }
    }
}

impl Type for AnyType {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.typ)
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Named attributes of an operation.
///
/// Ordered by name so that printing is deterministic.
#[derive(Clone)]
pub struct Attributes {
    map: Shared<BTreeMap<String, Arc<dyn Attribute>>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self {
            map: Shared::new(BTreeMap::new().into()),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.map.rd().is_empty()
    }
    pub fn insert(&self, name: &str, attribute: Arc<dyn Attribute>) {
        self.map.wr().insert(name.to_string(), attribute);
    }
    pub fn get(&self, name: &str) -> Option<Arc<dyn Attribute>> {
        self.map.rd().get(name).cloned()
    }
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Attribute>> {
        self.map.wr().remove(name)
    }
    /// Copy the map so that changes to the copy do not affect `self`.
    pub fn deep_clone(&self) -> Self {
        let map = self.map.rd().clone();
        Self {
            map: Shared::new(map.into()),
        }
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Attributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let map = self.map.rd();
        if !map.is_empty() {
            write!(f, "{{")?;
            for (i, (name, attribute)) in map.iter().enumerate() {
                if 0 < i {
                    write!(f, ", ")?;
                }
                write!(f, "{name} = {attribute}")?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

/// A parsed (nested) list literal such as `[[1, 2], [3, 4]]`.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    List(Vec<Literal>),
}

impl Literal {
    fn as_f64(&self) -> Result<f64> {
        match self {
            Literal::Int(value) => Ok(*value as f64),
            Literal::Float(value) => Ok(*value),
            Literal::List(_) => Err(anyhow::anyhow!("Expected a number, but got a list")),
        }
    }
    fn as_i64(&self) -> Result<i64> {
        match self {
            Literal::Int(value) => Ok(*value),
            Literal::Float(value) => Err(anyhow::anyhow!(
                "Expected an integer, but got {}",
                format_float(*value)
            )),
            Literal::List(_) => Err(anyhow::anyhow!("Expected a number, but got a list")),
        }
    }
    /// Flatten the literal in row-major order and check it against `shape`.
    ///
    /// A single number is a splat and is valid for any shape.
    fn flatten(&self, shape: &[i64]) -> Result<Vec<Literal>> {
        if !matches!(self, Literal::List(_)) {
            return Ok(vec![self.clone()]);
        }
        let mut out = vec![];
        self.flatten_into(shape, &mut out)?;
        Ok(out)
    }
    fn flatten_into(&self, shape: &[i64], out: &mut Vec<Literal>) -> Result<()> {
        match (self, shape.first()) {
            (Literal::List(items), Some(dim)) => {
                if items.len() as i64 != *dim {
                    return Err(anyhow::anyhow!(
                        "Expected {dim} elements, but got {}",
                        items.len()
                    ));
                }
                for item in items.iter() {
                    item.flatten_into(&shape[1..], out)?;
                }
                Ok(())
            }
            (Literal::List(_), None) => Err(anyhow::anyhow!("Literal nesting exceeds tensor rank")),
            (_, Some(_)) => Err(anyhow::anyhow!("Literal nesting is less than tensor rank")),
            (number, None) => {
                out.push(number.clone());
                Ok(())
            }
        }
    }
}

impl<T: ParserDispatch> Parser<T> {
    fn parse_number_token(&mut self, negative: bool, token: &Token) -> Result<Literal> {
        let sign = if negative { -1.0 } else { 1.0 };
        match token.kind {
            TokenKind::Integer => {
                let value = token.lexeme.parse::<i64>()?;
                Ok(Literal::Int(if negative { -value } else { value }))
            }
            TokenKind::FloatLiteral => Ok(Literal::Float(sign * token.lexeme.parse::<f64>()?)),
            TokenKind::BareIdentifier if token.lexeme == "inf" => {
                Ok(Literal::Float(sign * f64::INFINITY))
            }
            TokenKind::BareIdentifier if token.lexeme == "nan" => Ok(Literal::Float(f64::NAN)),
            _ => {
                let msg = self.error(token, "Expected number");
                Err(anyhow::anyhow!(msg))
            }
        }
    }
    /// Parse a number or a nested list such as `-1.5` or `[[1, 2], [3, 4]]`.
    pub fn parse_literal(&mut self) -> Result<Literal> {
        if self.check(TokenKind::LBracket) {
            self.advance();
            let mut items = vec![];
            while !self.check(TokenKind::RBracket) {
                items.push(self.parse_literal()?);
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::RBracket)?;
            return Ok(Literal::List(items));
        }
        let negative = self.check(TokenKind::Minus);
        if negative {
            self.advance();
        }
        let token = self.advance().clone();
        self.parse_number_token(negative, &token)
    }
    fn parse_tensor_type(&mut self) -> Result<TensorType> {
        let token = self.peek().clone();
        let typ = self.parse_type()?;
        let typ = typ.rd();
        match typ.as_any().downcast_ref::<TensorType>() {
            Some(tensor) => Ok(tensor.clone()),
            None => {
                let msg = self.error(&token, &format!("Expected tensor type, but got {}", &*typ));
                Err(anyhow::anyhow!(msg))
            }
        }
    }
    /// Parse `dense<...> : tensor<...>`.
    fn parse_dense(&mut self) -> Result<Arc<dyn Attribute>> {
        self.parse_keyword("dense")?;
        self.expect(TokenKind::Less)?;
        let literal = self.parse_literal()?;
        self.expect(TokenKind::Greater)?;
        self.expect(TokenKind::Colon)?;
        let typ = self.parse_tensor_type()?;
        let flat = literal.flatten(typ.shape())?;
        let values = element_values(&flat, &typ.element_type())?;
        Ok(Arc::new(DenseElementsAttr::new(typ, values)?))
    }
    /// Parse `sparse<[[i, j], ...], [v, ...]> : tensor<...>`.
    fn parse_sparse(&mut self) -> Result<Arc<dyn Attribute>> {
        self.parse_keyword("sparse")?;
        self.expect(TokenKind::Less)?;
        let indices = self.parse_literal()?;
        self.expect(TokenKind::Comma)?;
        let values = self.parse_literal()?;
        self.expect(TokenKind::Greater)?;
        self.expect(TokenKind::Colon)?;
        let typ = self.parse_tensor_type()?;

        let indices = match indices {
            Literal::List(items) => items
                .iter()
                .map(|item| match item {
                    Literal::List(coords) => coords.iter().map(|c| c.as_i64()).collect(),
                    // A flat list of indices is allowed for rank 1.
                    number => Ok(vec![number.as_i64()?]),
                })
                .collect::<Result<Vec<Vec<i64>>>>()?,
            _ => return Err(anyhow::anyhow!("Expected a list of sparse indices")),
        };
        let values = match values {
            Literal::List(items) => items,
            number => vec![number],
        };
        let values = element_values(&values, &typ.element_type())?;
        Ok(Arc::new(SparseElementsAttr::new(typ, indices, values)?))
    }
    /// Parse a scalar such as `42 : i64`, `-1.5 : f32`, or `true`.
    fn parse_scalar(&mut self) -> Result<Arc<dyn Attribute>> {
        if self.check(TokenKind::BareIdentifier) {
            let lexeme = self.peek().lexeme.clone();
            if lexeme == "true" || lexeme == "false" {
                self.advance();
                let value = if lexeme == "true" { 1 } else { 0 };
                return Ok(Arc::new(IntegerAttr::new(IntegerType::new(1), value)));
            }
        }
        let token = self.peek().clone();
        let literal = self.parse_literal()?;
        self.expect(TokenKind::Colon)?;
        let typ = self.parse_type()?;
        let typ = typ.rd();
        if let Some(int) = typ.as_any().downcast_ref::<IntegerType>() {
            return Ok(Arc::new(IntegerAttr::new(*int, literal.as_i64()?)));
        }
        if let Some(float) = typ.as_any().downcast_ref::<FloatType>() {
            return Ok(Arc::new(FloatAttr::new(*float, literal.as_f64()?)));
        }
        let msg = self.error(&token, &format!("Unsupported type for scalar: {}", &*typ));
        Err(anyhow::anyhow!(msg))
    }
    /// Parse a constant payload together with its type.
    pub fn parse_constant_value(&mut self) -> Result<Arc<dyn Attribute>> {
        if self.check(TokenKind::BareIdentifier) {
            match self.peek().lexeme.as_str() {
                "dense" => return self.parse_dense(),
                "sparse" => return self.parse_sparse(),
                _ => (),
            }
        }
        self.parse_scalar()
    }
    /// Parse a string constant (e.g., `"hello"`).
    pub fn parse_string(&mut self) -> Result<StringAttr> {
        let string = self.expect(TokenKind::String)?;
        let text = string.lexeme.trim_matches('"');
        Ok(StringAttr::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_tensor(shape: Vec<i64>) -> TensorType {
        TensorType::new(shape, Shared::new(FloatType::F32.into()))
    }

    #[test]
    fn test_dense_display() {
        let typ = f32_tensor(vec![2, 2]);
        let values = ElementValues::Float(vec![1.0, 2.0, 3.0, 4.5]);
        let attr = DenseElementsAttr::new(typ, values).unwrap();
        let attr: &dyn Attribute = &attr;
        assert_eq!(
            attr.to_string(),
            "dense<[[1.0, 2.0], [3.0, 4.5]]> : tensor<2x2xf32>"
        );

        let splat = DenseElementsAttr::new(f32_tensor(vec![4]), ElementValues::Float(vec![0.5]));
        let splat = splat.unwrap();
        assert!(splat.is_splat());
        assert_eq!(splat.expanded(), ElementValues::Float(vec![0.5; 4]));
        let splat: &dyn Attribute = &splat;
        assert_eq!(splat.to_string(), "dense<0.5> : tensor<4xf32>");
    }

    #[test]
    fn test_dense_wrong_count() {
        let values = ElementValues::Float(vec![1.0, 2.0]);
        assert!(DenseElementsAttr::new(f32_tensor(vec![3]), values).is_err());
        let values = ElementValues::Float(vec![1.0]);
        assert!(DenseElementsAttr::new(f32_tensor(vec![-1]), values).is_err());
    }

    #[test]
    fn test_sparse() {
        let typ = f32_tensor(vec![2, 3]);
        let indices = vec![vec![0, 1], vec![1, 2]];
        let values = ElementValues::Float(vec![1.0, 2.0]);
        let attr = SparseElementsAttr::new(typ, indices, values).unwrap();
        assert_eq!(attr.flat_index(&[1, 2]), 5);
        assert_eq!(
            attr.to_dense(),
            ElementValues::Float(vec![0.0, 1.0, 0.0, 0.0, 0.0, 2.0])
        );
        let attr: &dyn Attribute = &attr;
        assert_eq!(
            attr.to_string(),
            "sparse<[[0, 1], [1, 2]], [1.0, 2.0]> : tensor<2x3xf32>"
        );

        let out_of_bounds = vec![vec![2, 0]];
        let values = ElementValues::Float(vec![1.0]);
        assert!(SparseElementsAttr::new(f32_tensor(vec![2, 3]), out_of_bounds, values).is_err());
    }

    #[test]
    fn test_flatten() {
        let literal = Literal::List(vec![
            Literal::List(vec![Literal::Int(1), Literal::Int(2)]),
            Literal::List(vec![Literal::Int(3), Literal::Int(4)]),
        ]);
        let flat = literal.flatten(&[2, 2]).unwrap();
        assert_eq!(flat.len(), 4);
        assert!(literal.flatten(&[4]).is_err());
        assert!(literal.flatten(&[2, 3]).is_err());
        assert_eq!(Literal::Float(1.0).flatten(&[8]).unwrap().len(), 1);
    }

    #[test]
    fn test_attributes_order() {
        let attributes = Attributes::new();
        attributes.insert("b", Arc::new(StringAttr::new("x")));
        attributes.insert("a", Arc::new(AnyAttr::new("1")));
        assert_eq!(attributes.to_string(), "{a = 1, b = \"x\"}");
        let copy = attributes.deep_clone();
        copy.remove("a");
        assert!(attributes.get("a").is_some());
    }
}
