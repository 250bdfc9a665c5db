//! End-to-end scenarios driving the full pipeline from source text through
//! execution, plus the rejection scenarios each earlier phase is supposed
//! to catch before the VM ever sees them.

use corvid::Value;

#[test]
fn arithmetic_precedence() {
    let result = corvid::run("fn main() -> int { return 1 + 2 * 3; }").unwrap();
    assert_eq!(result, Some(Value::Int(7)));
}

#[test]
fn for_loop_with_postfix_increment_and_compound_assign() {
    let src = "
        fn main() -> int {
            int s = 0;
            for (int i = 0; i < 5; i++) {
                s += i;
            }
            return s;
        }
    ";
    let result = corvid::run(src).unwrap();
    assert_eq!(result, Some(Value::Int(10)));
}

#[test]
fn array_indexing() {
    let src = "
        fn main() -> int {
            int[] xs = [10, 20, 40];
            return xs[2];
        }
    ";
    let result = corvid::run(src).unwrap();
    assert_eq!(result, Some(Value::Int(40)));
}

#[test]
fn tuple_indexing() {
    let src = r#"
        fn main() -> str {
            (int, str) t = (1, "hi");
            return t[1];
        }
    "#;
    let result = corvid::run(src).unwrap();
    assert_eq!(result, Some(Value::Str("hi".to_string())));
}

#[test]
fn recursive_fibonacci() {
    let src = "
        fn fib(n: int) -> int {
            if (n < 2) {
                return n;
            } else {
                return fib(n - 1) + fib(n - 2);
            }
        }

        fn main() -> int {
            return fib(10);
        }
    ";
    let result = corvid::run(src).unwrap();
    assert_eq!(result, Some(Value::Int(55)));
}

#[test]
fn array_element_assignment() {
    let src = "
        fn main() -> int {
            int[] xs = [1, 2, 3];
            xs[1] = 9;
            return xs[1];
        }
    ";
    let result = corvid::run(src).unwrap();
    assert_eq!(result, Some(Value::Int(9)));
}

#[test]
fn elif_chain_picks_the_matching_branch() {
    let src = "
        fn classify(n: int) -> int {
            if (n < 0) {
                return -1;
            } elif (n == 0) {
                return 0;
            } elif (n < 10) {
                return 1;
            } else {
                return 2;
            }
        }

        fn main() -> int {
            return classify(5);
        }
    ";
    let result = corvid::run(src).unwrap();
    assert_eq!(result, Some(Value::Int(1)));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let src = "
        fn main() -> int {
            int z = 0;
            return 1 / z;
        }
    ";
    let err = corvid::run(src).unwrap_err();
    assert!(matches!(err, corvid::CorvidError::DivisionByZero { .. }));
}

#[test]
fn print_substitutes_template_arguments() {
    let src = r#"
        fn main() -> int {
            print("{} plus {} is {}", 1, 2, 3);
            return 0;
        }
    "#;
    let result = corvid::run(src).unwrap();
    assert_eq!(result, Some(Value::Int(0)));
}

// -- Rejection scenarios --

#[test]
fn tuple_element_assignment_is_rejected_by_semantic_analysis() {
    let src = r#"
        fn main() -> int {
            (int, str) t = (1, "hi");
            t[0] = 2;
            return 0;
        }
    "#;
    let err = corvid::parse_and_check(src).unwrap_err();
    assert!(matches!(
        err,
        corvid::CorvidError::TupleElementAssignment { .. }
    ));
}

#[test]
fn calling_an_undefined_function_is_rejected_by_semantic_analysis() {
    let src = "
        fn main() -> int {
            return ghost(1);
        }
    ";
    let err = corvid::parse_and_check(src).unwrap_err();
    assert!(matches!(err, corvid::CorvidError::UndefinedName { .. }));
}

#[test]
fn break_outside_a_loop_is_rejected_at_ir_generation() {
    let src = "
        fn main() -> int {
            break;
            return 0;
        }
    ";
    let program = corvid::parse_and_check(src).unwrap();
    let err = corvid::compile_checked(&program).unwrap_err();
    assert!(matches!(
        err,
        corvid::CorvidError::LoopControlOutsideLoop { .. }
    ));
}

#[test]
fn indexing_a_tuple_with_a_non_literal_is_rejected_by_semantic_analysis() {
    let src = r#"
        fn main() -> str {
            (int, str) t = (1, "hi");
            int i = 1;
            return t[i];
        }
    "#;
    let err = corvid::parse_and_check(src).unwrap_err();
    assert!(matches!(
        err,
        corvid::CorvidError::NonConstantTupleIndex { .. }
    ));
}

#[test]
fn non_bool_if_condition_is_rejected_by_semantic_analysis() {
    let src = "
        fn main() -> int {
            if (1 + 1) {
                return 1;
            }
            return 0;
        }
    ";
    let err = corvid::parse_and_check(src).unwrap_err();
    assert!(matches!(err, corvid::CorvidError::NonBoolCondition { .. }));
}

#[test]
fn checked_programs_with_no_remaining_errors_lower_cleanly() {
    let program = corvid::parse_and_check("fn main() -> int { return 1; }").unwrap();
    let tac = corvid::compile_checked(&program).unwrap();
    assert!(tac.to_string().contains("main:"));
}
