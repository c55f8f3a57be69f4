//! Arithmetic dialect.
//!
//! Only constants are needed here: they hold the payloads that the
//! quantization passes fold.
mod op;

use crate::Dialect;

pub use op::ConstantOp;

pub struct Arith;

impl Dialect for Arith {
    fn name(&self) -> &'static str {
        "arith"
    }
    fn description(&self) -> &'static str {
        "Arithmetic dialect"
    }
}
