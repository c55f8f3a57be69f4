//! Quantization dialect.
//!
//! Holds the uniform quantized types and the casts between real values,
//! quantized values and their integer storage.
mod op;
mod quantize;
mod typ;

use crate::ir::Type;
use crate::ir::TypeParse;
use crate::shared::Shared;
use crate::Dialect;
use anyhow::Result;

pub use op::DequantizeCastOp;
pub use op::QuantizeCastOp;
pub use op::StorageCastOp;
pub use quantize::quantize_attr;
pub use quantize::UniformQuantizedValueConverter;
pub use typ::QuantizedType;
pub use typ::StorageSpec;
pub use typ::UniformQuantizedPerAxisType;
pub use typ::UniformQuantizedType;

pub struct Quant;

impl Dialect for Quant {
    fn name(&self) -> &'static str {
        "quant"
    }
    fn description(&self) -> &'static str {
        "Quantization dialect"
    }
}

impl TypeParse for Quant {
    /// Parse `!quant.uniform<...>`.
    fn parse_type(src: &str) -> Result<Shared<dyn Type>> {
        let src = src.split_whitespace().collect::<String>();
        let body = src
            .strip_prefix("!quant.uniform<")
            .and_then(|body| body.strip_suffix('>'));
        match body {
            Some(body) => typ::parse_uniform(body),
            None => Err(anyhow::anyhow!("Unknown quant type: {src}")),
        }
    }
}
