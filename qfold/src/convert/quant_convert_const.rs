use crate::convert::apply_rewrites_on_funcs;
use crate::convert::ChangedOp;
use crate::convert::Pass;
use crate::convert::Rewrite;
use crate::convert::RewriteResult;
use crate::dialect::arith::ConstantOp;
use crate::dialect::quant::quantize_attr;
use crate::dialect::quant::QuantizeCastOp;
use crate::dialect::quant::QuantizedType;
use crate::dialect::quant::StorageCastOp;
use crate::ir::Attribute;
use crate::ir::Location;
use crate::ir::Op;
use crate::ir::OpOperand;
use crate::ir::Operation;
use crate::ir::Type;
use crate::ir::Users;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Everything that is needed to fold one `quant.qcast`.
struct Fold {
    constant: Shared<dyn Op>,
    location: Location,
    value: Arc<dyn Attribute>,
}

/// Replace `quant.qcast(arith.constant)` by a constant that already holds the
/// stored integers:
///
/// ```mlir
/// %0 = arith.constant dense<[0.0, 1.0, 2.0]> : tensor<3xf32>
/// %1 = quant.qcast %0 : tensor<3xf32> to tensor<3x!quant.uniform<u8:f32, 1.0>>
/// ```
/// becomes
/// ```mlir
/// %3 = arith.constant dense<[0, 1, 2]> : tensor<3xui8>
/// %1 = quant.scast %3 : tensor<3xui8> to tensor<3x!quant.uniform<u8:f32, 1.0>>
/// ```
pub struct QuantizedConstRewrite;

impl QuantizedConstRewrite {
    /// Check the match conditions and quantize the payload.
    ///
    /// Returns `None` when any of the conditions does not hold.
    fn analyze(&self, qcast: &dyn Op) -> Result<Option<Fold>> {
        let operation = qcast.operation().rd();
        let operand = match operation.operand(0) {
            Some(operand) => operand,
            None => return Ok(None),
        };
        let constant = match operand.rd().defining_op() {
            Some(op) if op.rd().is_const() => op,
            _ => {
                debug!("qcast operand is not defined by a constant");
                return Ok(None);
            }
        };
        let value = {
            let constant = constant.rd();
            match constant.as_any().downcast_ref::<ConstantOp>() {
                Some(constant) => constant.value(),
                None => None,
            }
        };
        let value = match value {
            Some(value) => value,
            None => {
                debug!("constant has no literal payload");
                return Ok(None);
            }
        };

        let result_type = operation.result_type(0)?;
        let quantized = match QuantizedType::from_type(&result_type) {
            Some(quantized) => quantized,
            None => {
                debug!("qcast result {} is not quantized", result_type.rd());
                return Ok(None);
            }
        };
        let storage_type: Shared<dyn Type> =
            match QuantizedType::cast_to_storage_type(&result_type) {
                Some(storage_type) => storage_type,
                None => {
                    debug!("{} has no storage type", result_type.rd());
                    return Ok(None);
                }
            };
        let operand_type = operand.rd().typ()?;
        if !quantized.is_compatible_expressed_type(&operand_type, &result_type) {
            debug!(
                "{} is not compatible with {}",
                operand_type.rd(),
                result_type.rd()
            );
            return Ok(None);
        }
        let value = match quantize_attr(&*value, &quantized, &storage_type) {
            Some(value) => value,
            None => {
                debug!("payload cannot be quantized with {quantized}");
                return Ok(None);
            }
        };
        let location = Location::fused(vec![constant.rd().location(), operation.location()]);
        Ok(Some(Fold {
            constant,
            location,
            value,
        }))
    }
}

impl Rewrite for QuantizedConstRewrite {
    fn name(&self) -> &'static str {
        "quant_convert_const::QuantizedConstRewrite"
    }
    fn is_match(&self, op: &dyn Op) -> Result<bool> {
        Ok(op.as_any().is::<QuantizeCastOp>())
    }
    fn rewrite(&self, op: Shared<dyn Op>) -> Result<RewriteResult> {
        let fold = match self.analyze(&*op.rd())? {
            Some(fold) => fold,
            None => return Ok(RewriteResult::Unchanged),
        };
        let parent = match op.rd().operation().rd().parent() {
            Some(parent) => parent,
            None => return Ok(RewriteResult::Unchanged),
        };

        let mut operation = Operation::default();
        operation.set_parent(Some(parent.clone()));
        operation.set_location(fold.location);
        let new_const = ConstantOp::from_operation(operation);
        let name = parent.rd().unique_value_name();
        let result = new_const
            .operation()
            .rd()
            .add_new_op_result(&name, fold.value.typ());
        new_const.set_value(fold.value);
        let new_const: Shared<dyn Op> = Shared::new(new_const.into());
        result.set_defining_op(Some(new_const.clone()));
        op.rd().insert_before(new_const.clone());

        let operand = Shared::new(OpOperand::new(result.value()).into());
        let scast = StorageCastOp::from_operand(operand, op.rd().location());
        let scast: Shared<dyn Op> = Shared::new(scast.into());
        op.rd().replace(scast.clone());

        let users = fold.constant.rd().operation().rd().users();
        if let Users::OpOperands(users) = users {
            if users.is_empty() {
                fold.constant.rd().remove();
            }
        }
        Ok(RewriteResult::Changed(ChangedOp::new(scast)))
    }
}

/// `--quant-convert-const`
///
/// Fold constants that are quantized with `quant.qcast` into constants of
/// the storage type.
pub struct ConvertConst;

impl Pass for ConvertConst {
    const NAME: &'static str = "quant-convert-const";
    fn convert(op: Shared<dyn Op>) -> Result<RewriteResult> {
        let rewrites: Vec<&dyn Rewrite> = vec![&QuantizedConstRewrite];
        apply_rewrites_on_funcs(op, &rewrites)
    }
}
