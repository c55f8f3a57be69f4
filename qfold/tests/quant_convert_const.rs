extern crate qfold;

use indoc::indoc;
use qfold::tester::Tester;
use std::panic::Location;

fn flags() -> Vec<&'static str> {
    vec!["--quant-convert-const"]
}

#[test]
fn fold_dense_per_tensor() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> tensor<3xf32> {
      %0 = arith.constant dense<[0.0, 1.0, 2.0]> : tensor<3xf32>
      %1 = quant.qcast %0 : tensor<3xf32> to tensor<3x!quant.uniform<u8:f32, 1.0>>
      %2 = quant.dcast %1 : tensor<3x!quant.uniform<u8:f32, 1.0>> to tensor<3xf32>
      return %2 : tensor<3xf32>
    }
    "};
    let expected = indoc! {"
    module {
      func.func @main() -> tensor<3xf32> {
        %3 = arith.constant dense<[0, 1, 2]> : tensor<3xui8>
        %1 = quant.scast %3 : tensor<3xui8> to tensor<3x!quant.uniform<u8:f32, 1.0>>
        %2 = quant.dcast %1 : tensor<3x!quant.uniform<u8:f32, 1.0>> to tensor<3xf32>
        return %2 : tensor<3xf32>
      }
    }
    "};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module);
    Tester::check_lines_exact(&actual, expected, Location::caller());
}

#[test]
fn fold_scalar() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> f32 {
      %0 = arith.constant 3.0 : f32
      %1 = quant.qcast %0 : f32 to !quant.uniform<u8:f32, 0.5:1>
      %2 = quant.dcast %1 : !quant.uniform<u8:f32, 0.5:1> to f32
      return %2 : f32
    }
    "};
    let expected = indoc! {"
    %3 = arith.constant 7 : ui8
    %1 = quant.scast %3 : ui8 to !quant.uniform<u8:f32, 0.5:1>
    %2 = quant.dcast %1 : !quant.uniform<u8:f32, 0.5:1> to f32
    "};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module);
    Tester::check_lines_contain(&actual, expected, Location::caller());
    assert!(!actual.contains("arith.constant 3.0"));
}

#[test]
fn fold_signed_splat() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> tensor<2x2x!quant.uniform<i8:f32, 0.5:-1>> {
      %0 = arith.constant dense<1.0> : tensor<2x2xf32>
      %1 = quant.qcast %0 : tensor<2x2xf32> to tensor<2x2x!quant.uniform<i8:f32, 0.5:-1>>
      return %1 : tensor<2x2x!quant.uniform<i8:f32, 0.5:-1>>
    }
    "};
    let expected = indoc! {"
    %2 = arith.constant dense<1> : tensor<2x2xi8>
    %1 = quant.scast %2 : tensor<2x2xi8> to tensor<2x2x!quant.uniform<i8:f32, 0.5:-1>>
    return %1 : tensor<2x2x!quant.uniform<i8:f32, 0.5:-1>>
    "};
    let (_module, actual) = Tester::transform(flags(), src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn fold_clamps_to_storage_range() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> tensor<3x!quant.uniform<i8<-127:127>:f32, 1.0>> {
      %0 = arith.constant dense<[-500.0, 0.4, 500.0]> : tensor<3xf32>
      %1 = quant.qcast %0 : tensor<3xf32> to tensor<3x!quant.uniform<i8<-127:127>:f32, 1.0>>
      return %1 : tensor<3x!quant.uniform<i8<-127:127>:f32, 1.0>>
    }
    "};
    let expected = indoc! {"
    %2 = arith.constant dense<[-127, 0, 127]> : tensor<3xi8>
    "};
    let (_module, actual) = Tester::transform(flags(), src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn fold_per_axis() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> tensor<2x3x!quant.uniform<i8:f32:1, {1.0, 0.5, 0.25:1}>> {
      %0 = arith.constant dense<[[1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]> : tensor<2x3xf32>
      %1 = quant.qcast %0 : tensor<2x3xf32> to tensor<2x3x!quant.uniform<i8:f32:1, {1.0, 0.5, 0.25:1}>>
      return %1 : tensor<2x3x!quant.uniform<i8:f32:1, {1.0, 0.5, 0.25:1}>>
    }
    "};
    let expected = indoc! {"
    %2 = arith.constant dense<[[1, 2, 5], [2, 4, 9]]> : tensor<2x3xi8>
    %1 = quant.scast %2 : tensor<2x3xi8> to tensor<2x3x!quant.uniform<i8:f32:1, {1.0, 0.5, 0.25:1}>>
    "};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn fold_sparse() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> tensor<2x3x!quant.uniform<i8:f32, 0.5>> {
      %0 = arith.constant sparse<[[0, 1], [1, 2]], [1.0, 2.0]> : tensor<2x3xf32>
      %1 = quant.qcast %0 : tensor<2x3xf32> to tensor<2x3x!quant.uniform<i8:f32, 0.5>>
      return %1 : tensor<2x3x!quant.uniform<i8:f32, 0.5>>
    }
    "};
    let expected = indoc! {"
    %2 = arith.constant sparse<[[0, 1], [1, 2]], [2, 4]> : tensor<2x3xi8>
    %1 = quant.scast %2 : tensor<2x3xi8> to tensor<2x3x!quant.uniform<i8:f32, 0.5>>
    "};
    let (_module, actual) = Tester::transform(flags(), src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn fold_sparse_with_zero_point_becomes_dense() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> tensor<2x3x!quant.uniform<u8:f32, 0.5:128>> {
      %0 = arith.constant sparse<[[0, 1], [1, 2]], [1.0, 2.0]> : tensor<2x3xf32>
      %1 = quant.qcast %0 : tensor<2x3xf32> to tensor<2x3x!quant.uniform<u8:f32, 0.5:128>>
      return %1 : tensor<2x3x!quant.uniform<u8:f32, 0.5:128>>
    }
    "};
    let expected = indoc! {"
    %2 = arith.constant dense<[[128, 130, 128], [128, 128, 132]]> : tensor<2x3xui8>
    "};
    let (_module, actual) = Tester::transform(flags(), src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn fused_location() {
    Tester::init_tracing();
    let src = indoc! {r#"
    func.func @main() -> f32 {
      %0 = arith.constant 1.0 : f32 loc("model.mlir":2:3)
      %1 = quant.qcast %0 : f32 to !quant.uniform<u8:f32, 0.5> loc("model.mlir":3:3)
      %2 = quant.dcast %1 : !quant.uniform<u8:f32, 0.5> to f32
      return %2 : f32
    }
    "#};
    let expected = indoc! {r#"
    %3 = arith.constant 2 : ui8 loc(fused["model.mlir":2:3, "model.mlir":3:3])
    %1 = quant.scast %3 : ui8 to !quant.uniform<u8:f32, 0.5> loc("model.mlir":3:3)
    "#};
    let (_module, actual) = Tester::transform(flags(), src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn keep_constant_with_other_users() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> (tensor<2xf32>, tensor<2x!quant.uniform<u8:f32, 1.0>>) {
      %0 = arith.constant dense<[1.0, 2.0]> : tensor<2xf32>
      %1 = quant.qcast %0 : tensor<2xf32> to tensor<2x!quant.uniform<u8:f32, 1.0>>
      return %0, %1 : tensor<2xf32>, tensor<2x!quant.uniform<u8:f32, 1.0>>
    }
    "};
    let expected = indoc! {"
    %0 = arith.constant dense<[1.0, 2.0]> : tensor<2xf32>
    %2 = arith.constant dense<[1, 2]> : tensor<2xui8>
    %1 = quant.scast %2 : tensor<2xui8> to tensor<2x!quant.uniform<u8:f32, 1.0>>
    return %0, %1 : tensor<2xf32>, tensor<2x!quant.uniform<u8:f32, 1.0>>
    "};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn no_fold_without_constant() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main(%arg0 : f32) -> !quant.uniform<u8:f32, 0.5> {
      %0 = quant.qcast %arg0 : f32 to !quant.uniform<u8:f32, 0.5>
      return %0 : !quant.uniform<u8:f32, 0.5>
    }
    "};
    let expected = indoc! {"
    %0 = quant.qcast %arg0 : f32 to !quant.uniform<u8:f32, 0.5>
    "};
    let (_module, actual) = Tester::transform(flags(), src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
    assert!(!actual.contains("quant.scast"));
}

#[test]
fn no_fold_for_other_expressed_type() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> tensor<2x!quant.uniform<u8:f16, 1.0>> {
      %0 = arith.constant dense<[1.0, 2.0]> : tensor<2xf32>
      %1 = quant.qcast %0 : tensor<2xf32> to tensor<2x!quant.uniform<u8:f16, 1.0>>
      return %1 : tensor<2x!quant.uniform<u8:f16, 1.0>>
    }
    "};
    let (_module, actual) = Tester::transform(flags(), src);
    assert!(actual.contains("quant.qcast"));
    assert!(!actual.contains("quant.scast"));
}

#[test]
fn no_fold_for_float_result() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> f32 {
      %0 = arith.constant 1.0 : f32
      %1 = quant.qcast %0 : f32 to f32
      return %1 : f32
    }
    "};
    let (_module, actual) = Tester::transform(flags(), src);
    assert!(actual.contains("%1 = quant.qcast %0 : f32 to f32"));
    assert!(!actual.contains("quant.scast"));
}

#[test]
fn no_fold_for_wrong_channel_count() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> tensor<2x3x!quant.uniform<i8:f32:1, {1.0, 0.5}>> {
      %0 = arith.constant dense<[[1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]> : tensor<2x3xf32>
      %1 = quant.qcast %0 : tensor<2x3xf32> to tensor<2x3x!quant.uniform<i8:f32:1, {1.0, 0.5}>>
      return %1 : tensor<2x3x!quant.uniform<i8:f32:1, {1.0, 0.5}>>
    }
    "};
    let (_module, actual) = Tester::transform(flags(), src);
    assert!(actual.contains("quant.qcast"));
}

#[test]
fn fold_every_function() {
    Tester::init_tracing();
    let src = indoc! {"
    module {
      func.func @first() -> !quant.uniform<u8:f32, 1.0> {
        %0 = arith.constant 1.0 : f32
        %1 = quant.qcast %0 : f32 to !quant.uniform<u8:f32, 1.0>
        return %1 : !quant.uniform<u8:f32, 1.0>
      }
      func.func @second() -> !quant.uniform<u8:f32, 1.0> {
        %0 = arith.constant 2.0 : f32
        %1 = quant.qcast %0 : f32 to !quant.uniform<u8:f32, 1.0>
        return %1 : !quant.uniform<u8:f32, 1.0>
      }
    }
    "};
    let expected = indoc! {"
    func.func @first() -> !quant.uniform<u8:f32, 1.0> {
      %2 = arith.constant 1 : ui8
      %1 = quant.scast %2 : ui8 to !quant.uniform<u8:f32, 1.0>
    func.func @second() -> !quant.uniform<u8:f32, 1.0> {
      %2 = arith.constant 2 : ui8
      %1 = quant.scast %2 : ui8 to !quant.uniform<u8:f32, 1.0>
    "};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module);
    Tester::check_lines_contain(&actual, expected, Location::caller());
    assert!(!actual.contains("quant.qcast"));
}

#[test]
fn second_run_is_unchanged() {
    Tester::init_tracing();
    let src = indoc! {"
    func.func @main() -> f32 {
      %0 = arith.constant 1.0 : f32
      %1 = quant.qcast %0 : f32 to !quant.uniform<u8:f32, 1.0>
      %2 = quant.dcast %1 : !quant.uniform<u8:f32, 1.0> to f32
      return %2 : f32
    }
    "};
    let (_module, first) = Tester::transform(flags(), src);
    let (_module, second) = Tester::transform(flags(), &first);
    Tester::check_lines_exact(&second, &first, Location::caller());
}
