//! Quantization of constant payloads.
use crate::dialect::quant::QuantizedType;
use crate::dialect::quant::UniformQuantizedPerAxisType;
use crate::dialect::quant::UniformQuantizedType;
use crate::ir::Attribute;
use crate::ir::DenseElementsAttr;
use crate::ir::ElementValues;
use crate::ir::FloatAttr;
use crate::ir::IntegerAttr;
use crate::ir::SparseElementsAttr;
use crate::ir::TensorType;
use crate::ir::Type;
use crate::shared::Shared;
use crate::shared::SharedExt;
use std::sync::Arc;

/// Converts real values to stored integers for a single scale and zero point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformQuantizedValueConverter {
    scale: f64,
    zero_point: i64,
    clamp_min: i64,
    clamp_max: i64,
}

impl UniformQuantizedValueConverter {
    pub fn new(scale: f64, zero_point: i64, clamp_min: i64, clamp_max: i64) -> Self {
        Self {
            scale,
            zero_point,
            clamp_min,
            clamp_max,
        }
    }
    pub fn from_uniform(typ: &UniformQuantizedType) -> Self {
        let storage = typ.storage();
        Self::new(typ.scale(), typ.zero_point(), storage.min(), storage.max())
    }
    /// One converter per channel.
    pub fn per_channel(typ: &UniformQuantizedPerAxisType) -> Vec<Self> {
        let storage = typ.storage();
        typ.scales()
            .iter()
            .zip(typ.zero_points().iter())
            .map(|(scale, zero_point)| {
                Self::new(*scale, *zero_point, storage.min(), storage.max())
            })
            .collect()
    }
    /// `clamp(round(x / scale) + zero_point)` where ties round away from zero.
    ///
    /// NaN maps to the (clamped) zero point.
    pub fn quantize(&self, x: f64) -> i64 {
        let min = self.clamp_min as f64;
        let max = self.clamp_max as f64;
        if x.is_nan() {
            return (self.zero_point as f64).clamp(min, max) as i64;
        }
        let q = (x / self.scale).round() + self.zero_point as f64;
        q.clamp(min, max) as i64
    }
}

/// How elements are assigned to converters.
enum Converters {
    PerTensor(UniformQuantizedValueConverter),
    PerAxis {
        channels: Vec<UniformQuantizedValueConverter>,
        axis: usize,
    },
}

impl Converters {
    /// Build the converters for `quantized` applied to a tensor of `shape`.
    ///
    /// Per-axis types need a tensor whose quantized dimension has exactly
    /// one entry per channel.
    fn new(quantized: &QuantizedType, shape: Option<&[i64]>) -> Option<Converters> {
        match quantized {
            QuantizedType::Uniform(typ) => Some(Converters::PerTensor(
                UniformQuantizedValueConverter::from_uniform(typ),
            )),
            QuantizedType::PerAxis(typ) => {
                let shape = shape?;
                let axis = typ.quantized_dimension();
                let channels = UniformQuantizedValueConverter::per_channel(typ);
                if shape.len() <= axis || shape[axis] != channels.len() as i64 {
                    return None;
                }
                Some(Converters::PerAxis { channels, axis })
            }
        }
    }
    /// Whether an implicit zero in a sparse tensor stays zero after quantization.
    fn preserves_zero(&self) -> bool {
        match self {
            Converters::PerTensor(converter) => converter.quantize(0.0) == 0,
            Converters::PerAxis { channels, .. } => {
                channels.iter().all(|converter| converter.quantize(0.0) == 0)
            }
        }
    }
    /// Quantize a row-major dense buffer.
    fn dense(&self, values: &[f64], shape: &[i64]) -> Vec<i64> {
        match self {
            Converters::PerTensor(converter) => {
                values.iter().map(|x| converter.quantize(*x)).collect()
            }
            Converters::PerAxis { channels, axis } => {
                let chunk: usize = shape[axis + 1..].iter().map(|dim| *dim as usize).product();
                let dim = channels.len();
                values
                    .iter()
                    .enumerate()
                    .map(|(i, x)| channels[(i / chunk.max(1)) % dim].quantize(*x))
                    .collect()
            }
        }
    }
    /// Quantize the listed values of a sparse tensor.
    fn sparse(&self, values: &[f64], indices: &[Vec<i64>]) -> Vec<i64> {
        match self {
            Converters::PerTensor(converter) => {
                values.iter().map(|x| converter.quantize(*x)).collect()
            }
            Converters::PerAxis { channels, axis } => values
                .iter()
                .zip(indices.iter())
                .map(|(x, index)| channels[index[*axis] as usize].quantize(*x))
                .collect(),
        }
    }
}

fn storage_tensor_type(storage: &Shared<dyn Type>) -> Option<TensorType> {
    let storage = storage.rd();
    storage.as_any().downcast_ref::<TensorType>().cloned()
}

fn quantize_dense(
    attr: &DenseElementsAttr,
    quantized: &QuantizedType,
    storage: &Shared<dyn Type>,
) -> Option<Arc<dyn Attribute>> {
    let values = attr.values().floats()?;
    let storage = storage_tensor_type(storage)?;
    let shape = attr.tensor_type().shape();
    let converters = Converters::new(quantized, Some(shape))?;
    let quantized_values = match (&converters, attr.is_splat()) {
        (Converters::PerTensor(converter), true) => vec![converter.quantize(values[0])],
        _ => {
            let expanded = attr.expanded();
            converters.dense(expanded.floats()?, shape)
        }
    };
    let storage = TensorType::new(shape.to_vec(), storage.element_type());
    let attr = DenseElementsAttr::new(storage, ElementValues::Int(quantized_values)).ok()?;
    Some(Arc::new(attr))
}

fn quantize_sparse(
    attr: &SparseElementsAttr,
    quantized: &QuantizedType,
    storage: &Shared<dyn Type>,
) -> Option<Arc<dyn Attribute>> {
    let values = attr.values().floats()?;
    let storage = storage_tensor_type(storage)?;
    let shape = attr.tensor_type().shape();
    let converters = Converters::new(quantized, Some(shape))?;
    let storage = TensorType::new(shape.to_vec(), storage.element_type());
    if !converters.preserves_zero() {
        // The implicit zeros would no longer be zero, so spell them out.
        let dense = attr.to_dense();
        let quantized_values = converters.dense(dense.floats()?, shape);
        let attr = DenseElementsAttr::new(storage, ElementValues::Int(quantized_values)).ok()?;
        return Some(Arc::new(attr));
    }
    let quantized_values = converters.sparse(values, attr.indices());
    let indices = attr.indices().to_vec();
    let attr = SparseElementsAttr::new(storage, indices, ElementValues::Int(quantized_values)).ok()?;
    Some(Arc::new(attr))
}

/// Quantize a constant payload.
///
/// `storage` is the type of the new constant: the storage integer type for a
/// scalar or a tensor of it. Returns `None` for payloads that cannot be
/// quantized with `quantized`.
pub fn quantize_attr(
    attr: &dyn Attribute,
    quantized: &QuantizedType,
    storage: &Shared<dyn Type>,
) -> Option<Arc<dyn Attribute>> {
    if let Some(attr) = attr.as_any().downcast_ref::<FloatAttr>() {
        return match Converters::new(quantized, None)? {
            Converters::PerTensor(converter) => {
                let value = converter.quantize(attr.value());
                Some(Arc::new(IntegerAttr::new(quantized.storage_type(), value)))
            }
            Converters::PerAxis { .. } => None,
        };
    }
    if let Some(attr) = attr.as_any().downcast_ref::<DenseElementsAttr>() {
        return quantize_dense(attr, quantized, storage);
    }
    if let Some(attr) = attr.as_any().downcast_ref::<SparseElementsAttr>() {
        return quantize_sparse(attr, quantized, storage);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_type_str;
    use crate::ir::FloatType;

    fn converter(scale: f64, zero_point: i64) -> UniformQuantizedValueConverter {
        UniformQuantizedValueConverter::new(scale, zero_point, 0, 255)
    }

    fn f32_tensor(shape: Vec<i64>) -> TensorType {
        TensorType::new(shape, Shared::new(FloatType::F32.into()))
    }

    fn quantize(attr: &dyn Attribute, result_type: &str) -> Option<String> {
        let typ = parse_type_str(result_type).unwrap();
        let quantized = QuantizedType::from_type(&typ).unwrap();
        let storage = QuantizedType::cast_to_storage_type(&typ).unwrap();
        let attr = quantize_attr(attr, &quantized, &storage)?;
        Some(attr.to_string())
    }

    #[test]
    fn test_quantize_in_f64() {
        let c = UniformQuantizedValueConverter::new(1.0, 0, i32::MIN as i64, i32::MAX as i64);
        // 2^24 + 1 is not representable in f32.
        assert_eq!(c.quantize(16_777_217.0), 16_777_217);
        let c = UniformQuantizedValueConverter::new(0.1, 0, -128, 127);
        assert_eq!(c.quantize(0.3), 3);
        assert_eq!(c.quantize(-0.3), -3);
    }

    #[test]
    fn test_quantize_value() {
        let c = converter(0.5, 10);
        assert_eq!(c.quantize(1.0), 12);
        assert_eq!(c.quantize(0.25), 11);
        assert_eq!(c.quantize(-0.25), 9);
        assert_eq!(c.quantize(1000.0), 255);
        assert_eq!(c.quantize(-1000.0), 0);
        assert_eq!(c.quantize(f64::INFINITY), 255);
        assert_eq!(c.quantize(f64::NAN), 10);

        let c = UniformQuantizedValueConverter::new(1.0, -200, -128, 127);
        assert_eq!(c.quantize(f64::NAN), -128);
    }

    #[test]
    fn test_quantize_scalar() {
        let attr = FloatAttr::new(FloatType::F32, 3.0);
        let actual = quantize(&attr, "!quant.uniform<u8:f32,0.5:1>");
        assert_eq!(actual.unwrap(), "7 : ui8");
        let actual = quantize(&attr, "!quant.uniform<i8:f32:0,{0.5}>");
        assert!(actual.is_none());
    }

    #[test]
    fn test_quantize_dense() {
        let values = ElementValues::Float(vec![0.0, 1.0, 2.0]);
        let attr = DenseElementsAttr::new(f32_tensor(vec![3]), values).unwrap();
        let actual = quantize(&attr, "tensor<3x!quant.uniform<u8:f32,1.0>>");
        assert_eq!(actual.unwrap(), "dense<[0, 1, 2]> : tensor<3xui8>");

        let splat = ElementValues::Float(vec![1.0]);
        let attr = DenseElementsAttr::new(f32_tensor(vec![2, 2]), splat).unwrap();
        let actual = quantize(&attr, "tensor<2x2x!quant.uniform<i8:f32,0.5:-1>>");
        assert_eq!(actual.unwrap(), "dense<1> : tensor<2x2xi8>");
    }

    #[test]
    fn test_quantize_per_axis() {
        let values = ElementValues::Float(vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        let attr = DenseElementsAttr::new(f32_tensor(vec![2, 3]), values).unwrap();
        let actual = quantize(&attr, "tensor<2x3x!quant.uniform<i8:f32:1,{1.0,0.5,0.25:1}>>");
        assert_eq!(actual.unwrap(), "dense<[[1, 2, 5], [2, 4, 9]]> : tensor<2x3xi8>");
        let actual = quantize(&attr, "tensor<2x3x!quant.uniform<i8:f32:0,{1.0,0.5}>>");
        assert_eq!(actual.unwrap(), "dense<[[1, 1, 1], [4, 4, 4]]> : tensor<2x3xi8>");

        // The channel count has to match the quantized dimension.
        let actual = quantize(&attr, "tensor<2x3x!quant.uniform<i8:f32:1,{1.0,0.5}>>");
        assert!(actual.is_none());
    }

    #[test]
    fn test_quantize_sparse() {
        let indices = vec![vec![0, 1], vec![1, 2]];
        let values = ElementValues::Float(vec![1.0, 2.0]);
        let attr = SparseElementsAttr::new(f32_tensor(vec![2, 3]), indices, values).unwrap();
        let actual = quantize(&attr, "tensor<2x3x!quant.uniform<i8:f32,0.5>>");
        assert_eq!(
            actual.unwrap(),
            "sparse<[[0, 1], [1, 2]], [2, 4]> : tensor<2x3xi8>"
        );
        let actual = quantize(&attr, "tensor<2x3x!quant.uniform<i8:f32:1,{1.0,0.5,0.25}>>");
        assert_eq!(
            actual.unwrap(),
            "sparse<[[0, 1], [1, 2]], [2, 8]> : tensor<2x3xi8>"
        );

        // A non-zero zero point turns the implicit zeros into stored values.
        let actual = quantize(&attr, "tensor<2x3x!quant.uniform<u8:f32,0.5:128>>");
        assert_eq!(
            actual.unwrap(),
            "dense<[[128, 130, 128], [128, 128, 132]]> : tensor<2x3xui8>"
        );
    }

    #[test]
    fn test_dense_and_sparse_agree() {
        let typ = "tensor<4x!quant.uniform<i8:f32,0.1>>";
        let sparse = SparseElementsAttr::new(
            f32_tensor(vec![4]),
            vec![vec![1], vec![3]],
            ElementValues::Float(vec![0.5, -0.3]),
        )
        .unwrap();
        let dense = DenseElementsAttr::new(f32_tensor(vec![4]), sparse.to_dense()).unwrap();
        let dense = quantize(&dense, typ).unwrap();
        assert_eq!(dense, "dense<[0, 5, 0, -3]> : tensor<4xi8>");

        let typ = parse_type_str(typ).unwrap();
        let quantized = QuantizedType::from_type(&typ).unwrap();
        let storage = QuantizedType::cast_to_storage_type(&typ).unwrap();
        let sparse = quantize_attr(&sparse, &quantized, &storage).unwrap();
        let sparse = sparse.as_any().downcast_ref::<SparseElementsAttr>().unwrap();
        assert_eq!(sparse.to_dense(), ElementValues::Int(vec![0, 5, 0, -3]));
        assert_eq!(storage.rd().to_string(), "tensor<4xi8>");
    }
}
