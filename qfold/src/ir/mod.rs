//! Intermediate representation (IR) for the compiler.
//!
//! These data structures are used as the basis for the passes.
//! For example, this module contains core types such as [Operation] and [Op].

mod attribute;
mod block;
mod location;
mod module;
mod op;
mod op_operand;
mod operation;
mod region;
mod typ;
mod value;

use crate::shared::Shared;
use crate::shared::SharedExt;

pub use attribute::AnyAttr;
pub use attribute::AnyType;
pub use attribute::Attribute;
pub use attribute::Attributes;
pub use attribute::DenseElementsAttr;
pub use attribute::ElementValues;
pub use attribute::FloatAttr;
pub use attribute::IntegerAttr;
pub use attribute::Literal;
pub use attribute::SparseElementsAttr;
pub use attribute::StringAttr;
pub use block::Block;
pub use location::Location;
pub use module::ModuleOp;
pub use op::Op;
pub use op_operand::OpOperand;
pub use op_operand::OpOperands;
pub use operation::Operation;
pub use operation::OperationName;
pub use region::Region;
pub use typ::element_type;
pub use typ::format_float;
pub use typ::type_eq;
pub use typ::FloatType;
pub use typ::IntegerType;
pub use typ::Signedness;
pub use typ::TensorType;
pub use typ::Type;
pub use typ::TypeParse;
pub use typ::Types;
pub use value::AnonymousResult;
pub use value::BlockArgument;
pub use value::BlockArgumentName;
pub use value::OpResult;
pub use value::UnsetOpResult;
pub use value::Users;
pub use value::Value;
pub use value::Values;

pub fn spaces(indent: i32) -> String {
    "  ".repeat(indent as usize)
}

/// Walk `op` and all ops nested inside it in pre-order.
pub fn walk(op: &Shared<dyn Op>) -> Vec<Shared<dyn Op>> {
    let mut out = vec![op.clone()];
    for child in op.rd().ops().iter() {
        out.extend(walk(child));
    }
    out
}
