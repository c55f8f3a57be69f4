use crate::ir::element_type;
use crate::ir::format_float;
use crate::ir::type_eq;
use crate::ir::FloatType;
use crate::ir::IntegerType;
use crate::ir::Signedness;
use crate::ir::TensorType;
use crate::ir::Type;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use regex::Regex;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::OnceLock;

/// Storage part of a quantized type such as `u8` or `i8<-127:127>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageSpec {
    is_signed: bool,
    width: u64,
    min: i64,
    max: i64,
}

impl StorageSpec {
    pub fn new(is_signed: bool, width: u64) -> Result<Self> {
        if width == 0 || 32 < width {
            return Err(anyhow::anyhow!("Unsupported storage width: {width}"));
        }
        let (min, max) = Self::default_range(is_signed, width);
        Ok(Self {
            is_signed,
            width,
            min,
            max,
        })
    }
    fn default_range(is_signed: bool, width: u64) -> (i64, i64) {
        if is_signed {
            (-(1i64 << (width - 1)), (1i64 << (width - 1)) - 1)
        } else {
            (0, (1i64 << width) - 1)
        }
    }
    /// Narrow the storage range, for example to `<-127:127>` for `i8`.
    pub fn with_range(self, min: i64, max: i64) -> Result<Self> {
        let (lo, hi) = Self::default_range(self.is_signed, self.width);
        if min < lo || hi < max || max < min {
            return Err(anyhow::anyhow!(
                "Storage range <{min}:{max}> does not fit in {}",
                self.name()
            ));
        }
        Ok(Self { min, max, ..self })
    }
    pub fn is_signed(&self) -> bool {
        self.is_signed
    }
    pub fn width(&self) -> u64 {
        self.width
    }
    pub fn min(&self) -> i64 {
        self.min
    }
    pub fn max(&self) -> i64 {
        self.max
    }
    fn name(&self) -> String {
        let prefix = if self.is_signed { "i" } else { "u" };
        format!("{prefix}{}", self.width)
    }
    fn has_default_range(&self) -> bool {
        Self::default_range(self.is_signed, self.width) == (self.min, self.max)
    }
    /// The integer type that holds the stored values.
    ///
    /// Unsigned storage maps to `uiN` and signed storage to the signless `iN`.
    pub fn integer_type(&self) -> IntegerType {
        if self.is_signed {
            IntegerType::new(self.width)
        } else {
            IntegerType::with_signedness(self.width, Signedness::Unsigned)
        }
    }
}

impl Display for StorageSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())?;
        if !self.has_default_range() {
            write!(f, "<{}:{}>", self.min, self.max)?;
        }
        Ok(())
    }
}

fn display_param(f: &mut Formatter<'_>, scale: f64, zero_point: i64) -> std::fmt::Result {
    write!(f, "{}", format_float(scale))?;
    if zero_point != 0 {
        write!(f, ":{zero_point}")?;
    }
    Ok(())
}

/// `!quant.uniform<u8:f32, 0.5:128>`
///
/// A real value `x` is stored as `round(x / scale) + zero_point`.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformQuantizedType {
    storage: StorageSpec,
    expressed: FloatType,
    scale: f64,
    zero_point: i64,
}

impl UniformQuantizedType {
    pub fn new(storage: StorageSpec, expressed: FloatType, scale: f64, zero_point: i64) -> Self {
        Self {
            storage,
            expressed,
            scale,
            zero_point,
        }
    }
    pub fn storage(&self) -> StorageSpec {
        self.storage
    }
    pub fn expressed_type(&self) -> FloatType {
        self.expressed
    }
    pub fn scale(&self) -> f64 {
        self.scale
    }
    pub fn zero_point(&self) -> i64 {
        self.zero_point
    }
}

impl Type for UniformQuantizedType {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "!quant.uniform<{}:{}, ", self.storage, self.expressed)?;
        display_param(f, self.scale, self.zero_point)?;
        write!(f, ">")
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Display for UniformQuantizedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Type::display(self, f)
    }
}

/// `!quant.uniform<i8:f32:1, {0.5, 2.0:3}>`
///
/// One scale and zero point per slice along `quantized_dimension`.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformQuantizedPerAxisType {
    storage: StorageSpec,
    expressed: FloatType,
    scales: Vec<f64>,
    zero_points: Vec<i64>,
    quantized_dimension: usize,
}

impl UniformQuantizedPerAxisType {
    pub fn new(
        storage: StorageSpec,
        expressed: FloatType,
        scales: Vec<f64>,
        zero_points: Vec<i64>,
        quantized_dimension: usize,
    ) -> Result<Self> {
        if scales.len() != zero_points.len() {
            return Err(anyhow::anyhow!(
                "Got {} scales but {} zero points",
                scales.len(),
                zero_points.len()
            ));
        }
        if scales.is_empty() {
            return Err(anyhow::anyhow!("Per-axis type without parameters"));
        }
        Ok(Self {
            storage,
            expressed,
            scales,
            zero_points,
            quantized_dimension,
        })
    }
    pub fn storage(&self) -> StorageSpec {
        self.storage
    }
    pub fn expressed_type(&self) -> FloatType {
        self.expressed
    }
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
    pub fn zero_points(&self) -> &[i64] {
        &self.zero_points
    }
    pub fn quantized_dimension(&self) -> usize {
        self.quantized_dimension
    }
}

impl Type for UniformQuantizedPerAxisType {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "!quant.uniform<{}:{}:{}, {{",
            self.storage, self.expressed, self.quantized_dimension
        )?;
        for (i, (scale, zero_point)) in self.scales.iter().zip(self.zero_points.iter()).enumerate()
        {
            if 0 < i {
                write!(f, ", ")?;
            }
            display_param(f, *scale, *zero_point)?;
        }
        write!(f, "}}>")
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Display for UniformQuantizedPerAxisType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Type::display(self, f)
    }
}

/// Either of the two quantized types.
#[derive(Clone, Debug, PartialEq)]
pub enum QuantizedType {
    Uniform(UniformQuantizedType),
    PerAxis(UniformQuantizedPerAxisType),
}

impl QuantizedType {
    /// The quantized type itself or the quantized element type of a tensor.
    pub fn from_type(typ: &Shared<dyn Type>) -> Option<QuantizedType> {
        let element = element_type(typ);
        let element = element.rd();
        if let Some(typ) = element.as_any().downcast_ref::<UniformQuantizedType>() {
            return Some(QuantizedType::Uniform(typ.clone()));
        }
        if let Some(typ) = element.as_any().downcast_ref::<UniformQuantizedPerAxisType>() {
            return Some(QuantizedType::PerAxis(typ.clone()));
        }
        None
    }
    pub fn storage(&self) -> StorageSpec {
        match self {
            QuantizedType::Uniform(typ) => typ.storage(),
            QuantizedType::PerAxis(typ) => typ.storage(),
        }
    }
    pub fn storage_type(&self) -> IntegerType {
        self.storage().integer_type()
    }
    pub fn expressed_type(&self) -> FloatType {
        match self {
            QuantizedType::Uniform(typ) => typ.expressed_type(),
            QuantizedType::PerAxis(typ) => typ.expressed_type(),
        }
    }
    /// Map `Q` to `S` and `tensor<..xQ>` to `tensor<..xS>`.
    ///
    /// Returns `None` when `typ` does not hold a quantized type.
    pub fn cast_to_storage_type(typ: &Shared<dyn Type>) -> Option<Shared<dyn Type>> {
        let quantized = QuantizedType::from_type(typ)?;
        let storage: Shared<dyn Type> = Shared::new(quantized.storage_type().into());
        let typ = typ.rd();
        match typ.as_any().downcast_ref::<TensorType>() {
            Some(tensor) => {
                let tensor = TensorType::new(tensor.shape().to_vec(), storage);
                Some(Shared::new(tensor.into()))
            }
            None => Some(storage),
        }
    }
    /// Whether a value of type `candidate` can be quantized into `quantized`.
    ///
    /// A scalar must be exactly the expressed type. A tensor must have the
    /// expressed type as element type and `quantized` must be a tensor of a
    /// compatible shape.
    pub fn is_compatible_expressed_type(
        &self,
        candidate: &Shared<dyn Type>,
        quantized: &Shared<dyn Type>,
    ) -> bool {
        let expressed: Shared<dyn Type> = Shared::new(self.expressed_type().into());
        let candidate = candidate.rd();
        let candidate_tensor = match candidate.as_any().downcast_ref::<TensorType>() {
            Some(tensor) => tensor,
            None => {
                let quantized_is_scalar = !quantized.rd().as_any().is::<TensorType>();
                return quantized_is_scalar && expressed.rd().to_string() == candidate.to_string();
            }
        };
        let quantized = quantized.rd();
        let quantized_tensor = match quantized.as_any().downcast_ref::<TensorType>() {
            Some(tensor) => tensor,
            None => return false,
        };
        type_eq(&candidate_tensor.element_type(), &expressed)
            && candidate_tensor.is_compatible_shape(quantized_tensor)
    }
}

impl Display for QuantizedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            QuantizedType::Uniform(typ) => write!(f, "{typ}"),
            QuantizedType::PerAxis(typ) => write!(f, "{typ}"),
        }
    }
}

fn uniform_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        let pattern = r"^(?P<signed>[iu])(?P<width>\d+)(?:<(?P<min>-?\d+):(?P<max>-?\d+)>)?:(?P<expressed>f16|bf16|f32|f64)(?::(?P<axis>\d+))?,(?P<params>.+)$";
        match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(e) => panic!("invalid quantized type pattern: {e}"),
        }
    })
}

/// Parse `0.5` or `0.5:128`.
fn parse_param(text: &str) -> Result<(f64, i64)> {
    let (scale, zero_point) = match text.split_once(':') {
        Some((scale, zero_point)) => (scale, zero_point.parse::<i64>()?),
        None => (text, 0),
    };
    let scale = scale
        .parse::<f64>()
        .map_err(|e| anyhow::anyhow!("Invalid scale {scale}: {e}"))?;
    if !(scale.is_finite() && 0.0 < scale) {
        return Err(anyhow::anyhow!("Scale must be positive and finite, got {scale}"));
    }
    Ok((scale, zero_point))
}

/// Parse the body of `!quant.uniform<...>` with whitespace removed, for
/// example `u8:f32,0.5:128` or `i8:f32:1,{0.5,2.0:3}`.
pub fn parse_uniform(body: &str) -> Result<Shared<dyn Type>> {
    let captures = match uniform_regex().captures(body) {
        Some(captures) => captures,
        None => return Err(anyhow::anyhow!("Invalid quantized type: {body}")),
    };
    let is_signed = &captures["signed"] == "i";
    let width = captures["width"].parse::<u64>()?;
    let mut storage = StorageSpec::new(is_signed, width)?;
    if let (Some(min), Some(max)) = (captures.name("min"), captures.name("max")) {
        storage = storage.with_range(min.as_str().parse()?, max.as_str().parse()?)?;
    }
    let expressed = match FloatType::from_str(&captures["expressed"]) {
        Some(expressed) => expressed,
        None => return Err(anyhow::anyhow!("Invalid expressed type in {body}")),
    };
    let params = &captures["params"];
    match captures.name("axis") {
        Some(axis) => {
            let axis = axis.as_str().parse::<usize>()?;
            let inner = params
                .strip_prefix('{')
                .and_then(|params| params.strip_suffix('}'));
            let inner = match inner {
                Some(inner) => inner,
                None => return Err(anyhow::anyhow!("Expected {{...}} parameters in {body}")),
            };
            let (scales, zero_points): (Vec<f64>, Vec<i64>) = inner
                .split(',')
                .map(parse_param)
                .collect::<Result<Vec<(f64, i64)>>>()?
                .into_iter()
                .unzip();
            let typ =
                UniformQuantizedPerAxisType::new(storage, expressed, scales, zero_points, axis)?;
            Ok(Shared::new(typ.into()))
        }
        None => {
            let (scale, zero_point) = parse_param(params)?;
            let typ = UniformQuantizedType::new(storage, expressed, scale, zero_point);
            Ok(Shared::new(typ.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_type_str;

    fn parse(text: &str) -> Shared<dyn Type> {
        parse_type_str(text).unwrap()
    }

    #[test]
    fn test_uniform() {
        let typ = parse("!quant.uniform<u8:f32,0.5:128>");
        assert_eq!(typ.rd().to_string(), "!quant.uniform<u8:f32, 0.5:128>");
        let quantized = QuantizedType::from_type(&typ).unwrap();
        let storage = quantized.storage();
        assert!(!storage.is_signed());
        assert_eq!((storage.min(), storage.max()), (0, 255));
        assert_eq!(quantized.storage_type().to_string(), "ui8");

        let typ = parse("!quant.uniform<i8<-127:127>:f32,1.0e-2:-3>");
        assert_eq!(typ.rd().to_string(), "!quant.uniform<i8<-127:127>:f32, 0.01:-3>");
        let quantized = QuantizedType::from_type(&typ).unwrap();
        assert_eq!(quantized.storage().min(), -127);
        assert_eq!(quantized.storage_type().to_string(), "i8");
    }

    #[test]
    fn test_per_axis() {
        let typ = parse("tensor<2x3x!quant.uniform<i8:f32:1,{0.5,2.0:3,1.0}>>");
        assert_eq!(
            typ.rd().to_string(),
            "tensor<2x3x!quant.uniform<i8:f32:1, {0.5, 2.0:3, 1.0}>>"
        );
        let quantized = QuantizedType::from_type(&typ).unwrap();
        match &quantized {
            QuantizedType::PerAxis(typ) => {
                assert_eq!(typ.quantized_dimension(), 1);
                assert_eq!(typ.zero_points(), &[0, 3, 0]);
            }
            QuantizedType::Uniform(_) => panic!("expected per-axis type"),
        }
        let storage = QuantizedType::cast_to_storage_type(&typ).unwrap();
        assert_eq!(storage.rd().to_string(), "tensor<2x3xi8>");
    }

    #[test]
    fn test_invalid() {
        assert!(parse_type_str("!quant.uniform<u8:f32,0.0>").is_err());
        assert!(parse_type_str("!quant.uniform<u8:i32,1.0>").is_err());
        assert!(parse_type_str("!quant.uniform<u8<0:300>:f32,1.0>").is_err());
        assert!(parse_type_str("!quant.uniform<i8:f32:0,0.5>").is_err());
    }

    #[test]
    fn test_compatible_expressed_type() {
        let quantized = parse("tensor<?x!quant.uniform<u8:f32,1.0>>");
        let q = QuantizedType::from_type(&quantized).unwrap();
        assert!(q.is_compatible_expressed_type(&parse("tensor<3xf32>"), &quantized));
        assert!(!q.is_compatible_expressed_type(&parse("tensor<3xf16>"), &quantized));
        assert!(!q.is_compatible_expressed_type(&parse("tensor<3x2xf32>"), &quantized));
        assert!(!q.is_compatible_expressed_type(&parse("f32"), &quantized));

        let scalar = parse("!quant.uniform<u8:f32,1.0>");
        let q = QuantizedType::from_type(&scalar).unwrap();
        assert!(q.is_compatible_expressed_type(&parse("f32"), &scalar));
        assert!(!q.is_compatible_expressed_type(&scalar, &scalar));
    }
}
