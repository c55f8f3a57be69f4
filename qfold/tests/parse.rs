extern crate qfold;

use indoc::indoc;
use qfold::dialect::func::FuncOp;
use qfold::dialect::quant::QuantizeCastOp;
use qfold::frontend::DefaultParserDispatch;
use qfold::frontend::Parser;
use qfold::ir::ModuleOp;
use qfold::ir::Op;
use qfold::shared::SharedExt;
use qfold::tester::Tester;
use std::panic::Location;

#[test]
fn parse_quant_casts() {
    Tester::init_tracing();
    let src = indoc! {r#"
    module @model {
      func.func private @main(%arg0 : tensor<2xf32>) -> tensor<2xf32> {
        %0 = quant.qcast %arg0 : tensor<2xf32> to tensor<2x!quant.uniform<i8<-127:127>:f32:0, {0.5, 2.0:3}>> loc("model.mlir":3:10)
        %1 = quant.scast %0 : tensor<2x!quant.uniform<i8<-127:127>:f32:0, {0.5, 2.0:3}>> to tensor<2xi8>
        %2 = quant.scast %1 : tensor<2xi8> to tensor<2x!quant.uniform<i8<-127:127>:f32:0, {0.5, 2.0:3}>>
        %3 = quant.dcast %2 : tensor<2x!quant.uniform<i8<-127:127>:f32:0, {0.5, 2.0:3}>> to tensor<2xf32>
        return %3 : tensor<2xf32>
      }
    }
    "#};
    let (module, actual) = Tester::parse(src);
    Tester::verify(module.clone());
    Tester::check_lines_exact(&actual, src, Location::caller());

    let module = module.rd();
    let module = module.as_any().downcast_ref::<ModuleOp>().unwrap();
    assert_eq!(module.sym_name(), Some("model".to_string()));
    let func = module.first_op().unwrap();
    let func = func.rd();
    let func = func.as_any().downcast_ref::<FuncOp>().unwrap();
    assert_eq!(func.identifier(), Some("main".to_string()));
    let qcast = func.ops()[0].clone();
    assert!(qcast.rd().as_any().is::<QuantizeCastOp>());
}

#[test]
fn parse_constants() {
    Tester::init_tracing();
    let src = indoc! {"
    module {
      func.func @main() -> f32 {
        %0 = arith.constant 1.5 : f32
        %1 = arith.constant dense<[[1.0, 2.0], [3.0, 4.5]]> : tensor<2x2xf32>
        %2 = arith.constant dense<0.5> : tensor<4xf16>
        %3 = arith.constant sparse<[[0, 1], [1, 0]], [1.0, -2.0]> : tensor<2x2xf32>
        %4 = arith.constant 7 : ui8
        return %0 : f32
      }
    }
    "};
    let (module, actual) = Tester::parse(src);
    Tester::verify(module);
    Tester::check_lines_exact(&actual, src, Location::caller());
}

#[test]
fn qcast_operand_type_must_match() {
    let src = indoc! {"
    func.func @main(%arg0 : f32) -> !quant.uniform<u8:f32, 0.5> {
      %0 = quant.qcast %arg0 : f16 to !quant.uniform<u8:f32, 0.5>
      return %0 : !quant.uniform<u8:f32, 0.5>
    }
    "};
    let result = Parser::<DefaultParserDispatch>::parse(src);
    assert!(result.is_err());
}

#[test]
fn invalid_quantized_type() {
    let src = indoc! {"
    func.func @main(%arg0 : f32) -> !quant.uniform<u64:f32, 0.5> {
      %0 = quant.qcast %arg0 : f32 to !quant.uniform<u64:f32, 0.5>
      return %0 : !quant.uniform<u64:f32, 0.5>
    }
    "};
    let result = Parser::<DefaultParserDispatch>::parse(src);
    assert!(result.is_err());
}

#[test]
fn unknown_operation() {
    let src = indoc! {"
    func.func @main() {
      foo.bar
      return
    }
    "};
    let result = Parser::<DefaultParserDispatch>::parse(src);
    assert!(result.is_err());
}

fn parse_error(src: &str) -> String {
    match Parser::<DefaultParserDispatch>::parse(src) {
        Ok(_) => panic!("Expected an error"),
        Err(err) => format!("{err:#}"),
    }
}

#[test]
fn constant_type_errors_name_the_type() {
    let src = indoc! {"
    func.func @main() -> f32 {
      %0 = arith.constant 1.0 : tensor<2xf32>
      return %0 : f32
    }
    "};
    let err = parse_error(src);
    assert!(err.contains("Unsupported type for scalar: tensor<2xf32>"));

    let src = indoc! {"
    func.func @main() -> f32 {
      %0 = arith.constant dense<1.0> : f32
      return %0 : f32
    }
    "};
    let err = parse_error(src);
    assert!(err.contains("Expected tensor type, but got f32"));

    let src = indoc! {"
    func.func @main() -> tensor<1x!quant.uniform<u8:f32, 0.5>> {
      %0 = arith.constant dense<[1]> : tensor<1x!quant.uniform<u8:f32, 0.5>>
      return %0 : tensor<1x!quant.uniform<u8:f32, 0.5>>
    }
    "};
    let err = parse_error(src);
    assert!(err.contains("Unsupported element type for tensor literal: !quant.uniform<u8:f32, 0.5>"));
}

#[test]
fn parse_extreme_floats() {
    Tester::init_tracing();
    let src = indoc! {"
    module {
      func.func @main() -> f64 {
        %0 = arith.constant 1e300 : f64
        %1 = arith.constant -1e-300 : f64
        %2 = quant.qcast %0 : f64 to !quant.uniform<i8:f64, 1e-7>
        return %1 : f64
      }
    }
    "};
    let (module, actual) = Tester::parse(src);
    Tester::verify(module);
    Tester::check_lines_exact(&actual, src, Location::caller());
}
