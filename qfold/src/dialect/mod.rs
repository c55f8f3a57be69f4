//! Dialect definitions.
//!
//! Dialects are collections of operations and types. This module contains
//! the dialects that the quantization passes work on.

pub mod arith;
pub mod func;
pub mod quant;
