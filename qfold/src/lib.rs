//! qfold folds quantized constants in an MLIR-like IR.
//!
//! A model that is being quantized often contains float constants that are
//! immediately cast to a quantized type:
//!
//! ```mlir
//! %0 = arith.constant dense<[0.0, 1.0, 2.0]> : tensor<3xf32>
//! %1 = quant.qcast %0 : tensor<3xf32> to tensor<3x!quant.uniform<u8:f32, 1.0>>
//! ```
//!
//! The `--quant-convert-const` pass computes the stored integers at compile
//! time and replaces the cast by a reinterpretation of a storage constant:
//!
//! ```mlir
//! %3 = arith.constant dense<[0, 1, 2]> : tensor<3xui8>
//! %1 = quant.scast %3 : tensor<3xui8> to tensor<3x!quant.uniform<u8:f32, 1.0>>
//! ```
//!
//! The crate contains the IR ([ir]), a parser for the textual form
//! ([frontend]), the dialects that the pass needs ([dialect]), the rewrite
//! driver ([convert]), and a pass pipeline with debug dumps ([transform]).
//! The `qfold-opt` binary wraps all of this in a command line tool.

mod canonicalize;
pub mod convert;
pub mod debug;
pub mod dialect;
pub mod frontend;
pub mod ir;
pub mod shared;
#[cfg(feature = "test-utils")]
pub mod tester;
mod transform;

pub use debug::DebugOptions;
pub use transform::create_pass;
pub use transform::default_arguments;
pub use transform::default_pass_names;
pub use transform::init_subscriber;
pub use transform::transform;
pub use transform::DefaultTransformDispatch;
pub use transform::Passes;
pub use transform::SinglePass;
pub use transform::TransformDispatch;
pub use transform::TransformOptions;

/// Dialects can define new operations, attributes, and types.
/// Each dialect is given an unique namespace that is prefixed.
///
/// Dialects can co-exist and can be produced and consumed by different passes.
pub trait Dialect {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
}
