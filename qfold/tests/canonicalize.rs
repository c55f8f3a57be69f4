extern crate qfold;

use indoc::indoc;
use qfold::dialect::arith;
use qfold::frontend::DefaultParserDispatch;
use qfold::frontend::Parser;
use qfold::ir::Op;
use qfold::shared::SharedExt;
use qfold::tester::Tester;
use std::panic::Location;

fn flags() -> Vec<&'static str> {
    vec!["--canonicalize"]
}

#[test]
fn determine_users() {
    let src = indoc! {"
    func.func @main(%arg0 : f32) -> f32 {
      %0 = arith.constant 1.0 : f32
      %1 = arith.constant 2.0 : f32
      return %1 : f32
    }
    "};

    let module = Parser::<DefaultParserDispatch>::parse(src).unwrap();
    Tester::verify(module.clone());
    let module = module.rd();

    let ops = module.ops();
    assert_eq!(ops.len(), 1);
    let func_op = ops[0].rd();
    let ops = func_op.ops();
    assert_eq!(ops.len(), 3);

    let op0 = ops[0].rd();
    let op0 = op0.as_any().downcast_ref::<arith::ConstantOp>().unwrap();
    let users = op0.operation().rd().users();
    assert_eq!(users.len(), 0);

    let op1 = ops[1].rd();
    let op1 = op1.as_any().downcast_ref::<arith::ConstantOp>().unwrap();
    let users = op1.operation().rd().users();
    assert_eq!(users.len(), 1);
}

#[test]
fn remove_unused_constants() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> f32 {
      %0 = arith.constant 1.0 : f32
      %1 = arith.constant 2.0 : f32
      return %1 : f32
    }
    "};
    let expected = indoc! {"
    module {
      func.func @main() -> f32 {
        %1 = arith.constant 2.0 : f32
        return %1 : f32
      }
    }
    "};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module);
    Tester::check_lines_exact(&actual, expected, Location::caller());
}

#[test]
fn fold_storage_cast_pair() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> tensor<2xi8> {
      %0 = arith.constant dense<[1, 2]> : tensor<2xi8>
      %1 = quant.scast %0 : tensor<2xi8> to tensor<2x!quant.uniform<i8:f32, 0.5>>
      %2 = quant.scast %1 : tensor<2x!quant.uniform<i8:f32, 0.5>> to tensor<2xi8>
      return %2 : tensor<2xi8>
    }
    "};
    let expected = indoc! {"
    module {
      func.func @main() -> tensor<2xi8> {
        %0 = arith.constant dense<[1, 2]> : tensor<2xi8>
        return %0 : tensor<2xi8>
      }
    }
    "};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module);
    Tester::check_lines_exact(&actual, expected, Location::caller());
}

#[test]
fn keep_storage_cast_to_other_type() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> tensor<2xui8> {
      %0 = arith.constant dense<[1, 2]> : tensor<2xi8>
      %1 = quant.scast %0 : tensor<2xi8> to tensor<2x!quant.uniform<i8:f32, 0.5>>
      %2 = quant.scast %1 : tensor<2x!quant.uniform<i8:f32, 0.5>> to tensor<2xui8>
      return %2 : tensor<2xui8>
    }
    "};
    let (_module, actual) = Tester::transform(flags(), src);
    assert!(actual.contains("%2 = quant.scast %1"));
}

#[test]
fn convert_then_canonicalize() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() {
      %0 = arith.constant dense<[0.0, 1.0]> : tensor<2xf32>
      %1 = quant.qcast %0 : tensor<2xf32> to tensor<2x!quant.uniform<u8:f32, 1.0>>
      return
    }
    "};
    let expected = indoc! {"
    module {
      func.func @main() {
        return
      }
    }
    "};
    let flags = vec!["--quant-convert-const", "--canonicalize"];
    let (module, actual) = Tester::transform(flags, src);
    Tester::verify(module);
    Tester::check_lines_exact(&actual, expected, Location::caller());
}
