//! Function dialect.
//!
//! This dialect is meant to hold operations that are related to functions.
mod op;

use crate::Dialect;

pub use op::FuncOp;
pub use op::ReturnOp;

pub struct Func;

impl Dialect for Func {
    fn name(&self) -> &'static str {
        "func"
    }
    fn description(&self) -> &'static str {
        "Function dialect"
    }
}
