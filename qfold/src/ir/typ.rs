use crate::frontend::Parser;
use crate::frontend::ParserDispatch;
use crate::ir::OpOperand;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use half::bf16;
use half::f16;
use std::fmt::Display;
use std::fmt::Formatter;

pub trait Type {
    /// Display the type.
    ///
    /// This has to be implemented by each type so that calls to `Display::fmt`
    /// on a `dyn Type` can be delegated to the type's `display` method.
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result;
    fn as_any(&self) -> &dyn std::any::Any;
}

impl Display for dyn Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f)
    }
}

/// Interface to parse a type.
///
/// This trait can be implemented by a dialect to parse types from a string.
pub trait TypeParse {
    fn parse_type(src: &str) -> Result<Shared<dyn Type>>;
}

/// Whether two types are the same.
///
/// Types are uniqued by their textual form.
pub fn type_eq(a: &Shared<dyn Type>, b: &Shared<dyn Type>) -> bool {
    a.same(b) || a.rd().to_string() == b.rd().to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signedness {
    Signless,
    Signed,
    Unsigned,
}

/// An integer type such as `i32` (signless), `si8` (signed), or `ui8` (unsigned).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerType {
    num_bits: u64,
    signedness: Signedness,
}

impl IntegerType {
    pub fn new(num_bits: u64) -> Self {
        Self {
            num_bits,
            signedness: Signedness::Signless,
        }
    }
    pub fn with_signedness(num_bits: u64, signedness: Signedness) -> Self {
        Self {
            num_bits,
            signedness,
        }
    }
    pub fn from_str(s: &str) -> Result<Self> {
        let (signedness, bits) = if let Some(bits) = s.strip_prefix("si") {
            (Signedness::Signed, bits)
        } else if let Some(bits) = s.strip_prefix("ui") {
            (Signedness::Unsigned, bits)
        } else if let Some(bits) = s.strip_prefix('i') {
            (Signedness::Signless, bits)
        } else {
            return Err(anyhow::anyhow!("Expected integer type, but got {s}"));
        };
        let num_bits = bits
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("Invalid integer type: {s}"))?;
        if num_bits == 0 {
            return Err(anyhow::anyhow!("Integer type must have at least 1 bit"));
        }
        Ok(Self::with_signedness(num_bits, signedness))
    }
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }
}

impl Type for IntegerType {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.signedness {
            Signedness::Signless => write!(f, "i{}", self.num_bits),
            Signedness::Signed => write!(f, "si{}", self.num_bits),
            Signedness::Unsigned => write!(f, "ui{}", self.num_bits),
        }
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Display for IntegerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Type::display(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatType {
    F16,
    BF16,
    F32,
    F64,
}

impl FloatType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "f16" => Some(FloatType::F16),
            "bf16" => Some(FloatType::BF16),
            "f32" => Some(FloatType::F32),
            "f64" => Some(FloatType::F64),
            _ => None,
        }
    }
    /// Round `value` to the precision of this type.
    ///
    /// Float literals are kept as `f64`, but a literal of type `f32` should
    /// behave exactly like the `f32` that the source describes.
    pub fn round(&self, value: f64) -> f64 {
        match self {
            FloatType::F16 => f16::from_f64(value).to_f64(),
            FloatType::BF16 => bf16::from_f64(value).to_f64(),
            FloatType::F32 => value as f32 as f64,
            FloatType::F64 => value,
        }
    }
}

impl Type for FloatType {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FloatType::F16 => "f16",
            FloatType::BF16 => "bf16",
            FloatType::F32 => "f32",
            FloatType::F64 => "f64",
        };
        write!(f, "{name}")
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Display for FloatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Type::display(self, f)
    }
}

/// Format a float such that it is read back as a float.
///
/// For example, `1.0` is printed as `1.0` and not as `1`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    // `Debug` always has a `.` or an exponent, e.g. `1.0` or `1e300`.
    format!("{value:?}")
}

/// A ranked tensor such as `tensor<2x3xf32>`.
///
/// Dynamic dimensions (`?`) are stored as `-1`.
#[derive(Clone)]
pub struct TensorType {
    shape: Vec<i64>,
    element_type: Shared<dyn Type>,
}

impl TensorType {
    pub fn new(shape: Vec<i64>, element_type: Shared<dyn Type>) -> Self {
        Self {
            shape,
            element_type,
        }
    }
    pub fn shape(&self) -> &[i64] {
        &self.shape
    }
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
    pub fn element_type(&self) -> Shared<dyn Type> {
        self.element_type.clone()
    }
    pub fn has_static_shape(&self) -> bool {
        self.shape.iter().all(|dim| 0 <= *dim)
    }
    /// Number of elements or `None` when the shape is dynamic.
    pub fn num_elements(&self) -> Option<usize> {
        if !self.has_static_shape() {
            return None;
        }
        Some(self.shape.iter().map(|dim| *dim as usize).product())
    }
    /// Whether the shapes of `self` and `other` can describe the same tensor.
    pub fn is_compatible_shape(&self, other: &TensorType) -> bool {
        self.rank() == other.rank()
            && self
                .shape
                .iter()
                .zip(other.shape.iter())
                .all(|(a, b)| *a < 0 || *b < 0 || a == b)
    }
    /// Split `2x?xf32` into the shape `[2, -1]` and the element type text `f32`.
    pub fn split_shape(src: &str) -> Result<(Vec<i64>, &str)> {
        let mut shape = vec![];
        let mut rest = src;
        while let Some(pos) = rest.find('x') {
            let dim = &rest[..pos];
            if dim == "?" {
                shape.push(-1);
            } else if let Ok(dim) = dim.parse::<i64>() {
                shape.push(dim);
            } else {
                break;
            }
            rest = &rest[pos + 1..];
        }
        if rest.is_empty() {
            return Err(anyhow::anyhow!("Missing element type in tensor<{src}>"));
        }
        Ok((shape, rest))
    }
}

impl Type for TensorType {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tensor<")?;
        for dim in self.shape.iter() {
            if *dim < 0 {
                write!(f, "?x")?;
            } else {
                write!(f, "{dim}x")?;
            }
        }
        write!(f, "{}>", self.element_type.rd())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Display for TensorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Type::display(self, f)
    }
}

/// The element type of a tensor or the type itself for scalars.
pub fn element_type(typ: &Shared<dyn Type>) -> Shared<dyn Type> {
    match typ.rd().as_any().downcast_ref::<TensorType>() {
        Some(tensor) => tensor.element_type(),
        None => typ.clone(),
    }
}

/// A collection of `Type`s.
#[derive(Clone, Default)]
pub struct Types {
    types: Vec<Shared<dyn Type>>,
}

impl Types {
    pub fn from_vec(types: Vec<Shared<dyn Type>>) -> Self {
        Self { types }
    }
    pub fn vec(&self) -> Vec<Shared<dyn Type>> {
        self.types.clone()
    }
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Display for Types {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .types
            .iter()
            .map(|t| t.rd().to_string())
            .collect::<Vec<String>>()
            .join(", ");
        write!(f, "{}", joined)
    }
}

impl<T: ParserDispatch> Parser<T> {
    /// Verify that the type of an operand matches a given type.
    ///
    /// Useful during the parsing of certain ops where the operand type is
    /// expected to match a given type.
    pub fn verify_type(&self, operand: &Shared<OpOperand>, typ: &Shared<dyn Type>) -> Result<()> {
        let operand_typ = operand.rd().typ()?;
        if !type_eq(&operand_typ, typ) {
            let token = self.previous().clone();
            let msg = format!(
                "Expected {} due to {}, but got {}",
                operand_typ.rd(),
                operand.rd(),
                typ.rd()
            );
            let msg = self.error(&token, &msg);
            return Err(anyhow::anyhow!(msg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_type() {
        let typ = IntegerType::from_str("ui8").unwrap();
        assert_eq!(typ.signedness(), Signedness::Unsigned);
        assert_eq!(typ.to_string(), "ui8");
        assert_eq!(IntegerType::from_str("si4").unwrap().to_string(), "si4");
        assert_eq!(IntegerType::from_str("i32").unwrap().num_bits(), 32);
        assert!(IntegerType::from_str("f32").is_err());
        assert!(IntegerType::from_str("i0").is_err());
    }

    #[test]
    fn test_float_round() {
        assert_eq!(FloatType::F32.round(0.1), 0.1f32 as f64);
        assert_eq!(FloatType::F64.round(0.1), 0.1);
        assert_eq!(FloatType::F16.round(65519.0), 65504.0);
        assert_eq!(FloatType::BF16.round(1.0), 1.0);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-0.5), "-0.5");
        assert_eq!(format_float(1e300), "1e300");
        assert_eq!(format_float(1e-300), "1e-300");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(123456.0), "123456.0");
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_tensor_type() {
        let (shape, element) = TensorType::split_shape("2x?x3xf32").unwrap();
        assert_eq!(shape, vec![2, -1, 3]);
        assert_eq!(element, "f32");
        let (shape, element) = TensorType::split_shape("f32").unwrap();
        assert!(shape.is_empty());
        assert_eq!(element, "f32");
        assert!(TensorType::split_shape("2x").is_err());

        let f32: Shared<dyn Type> = Shared::new(FloatType::F32.into());
        let a = TensorType::new(vec![2, -1], f32.clone());
        let b = TensorType::new(vec![2, 4], f32.clone());
        let c = TensorType::new(vec![3, 4], f32);
        assert_eq!(a.to_string(), "tensor<2x?xf32>");
        assert!(a.is_compatible_shape(&b));
        assert!(!b.is_compatible_shape(&c));
        assert_eq!(a.num_elements(), None);
        assert_eq!(b.num_elements(), Some(8));
    }
}
