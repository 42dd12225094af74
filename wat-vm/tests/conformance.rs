//! End-to-end conformance-script scenarios, run the same way the CLI binary
//! does: parse a whole script, run every directive, check the tally.

use wat_vm::prelude::*;

fn run(text: &str) -> RunSummary {
    run_text(text).expect("script should parse and run without an internal error")
}

#[test]
fn arithmetic_function_passes_assert_return() {
    let summary = run(
        r#"
        (module
          (func (export "add") (param i32 i32) (result i32)
            (i32.add (local.get 0) (local.get 1))))
        (assert_return (invoke "add" (i32.const 2) (i32.const 2)) (i32.const 4))
        (assert_return (invoke "add" (i32.const -1) (i32.const 1)) (i32.const 0))
        "#,
    );
    assert_eq!(summary.passed, summary.total);
    assert_eq!(summary.total, 2);
}

#[test]
fn division_by_zero_satisfies_assert_trap() {
    let summary = run(
        r#"
        (module
          (func (export "bad") (result i32)
            (i32.div_s (i32.const 1) (i32.const 0))))
        (assert_trap (invoke "bad") "integer divide by zero")
        "#,
    );
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.total, 1);
}

#[test]
fn type_mismatch_is_caught_by_assert_invalid() {
    let summary = run(
        r#"
        (assert_invalid
          (module (func (export "bad") (result i32) (i64.const 1)))
          "type mismatch")
        "#,
    );
    assert_eq!(summary.passed, 1);
}

#[test]
fn branching_loop_sums_to_ten() {
    let summary = run(
        r#"
        (module
          (func (export "sum_to") (param i32) (result i32)
            (local $acc i32)
            (local $i i32)
            (local.set $i (local.get 0))
            (block $done
              (loop $continue
                (br_if $done (i32.eqz (local.get $i)))
                (local.set $acc (i32.add (local.get $acc) (local.get $i)))
                (local.set $i (i32.sub (local.get $i) (i32.const 1)))
                (br $continue)))
            (local.get $acc)))
        (assert_return (invoke "sum_to" (i32.const 4)) (i32.const 10))
        "#,
    );
    assert_eq!(summary.passed, 1);
}

#[test]
fn global_mutation_is_visible_across_calls() {
    let summary = run(
        r#"
        (module
          (global $counter (mut i32) (i32.const 0))
          (func (export "bump") (result i32)
            (global.set $counter (i32.add (global.get $counter) (i32.const 1)))
            (global.get $counter)))
        (assert_return (invoke "bump") (i32.const 1))
        (assert_return (invoke "bump") (i32.const 2))
        "#,
    );
    assert_eq!(summary.passed, summary.total);
    assert_eq!(summary.total, 2);
}

#[test]
fn memory_store_then_load_round_trips() {
    let summary = run(
        r#"
        (module
          (memory 1)
          (func (export "poke_and_peek") (result i32)
            (i32.store (i32.const 0) (i32.const 42))
            (i32.load (i32.const 0))))
        (assert_return (invoke "poke_and_peek") (i32.const 42))
        "#,
    );
    assert_eq!(summary.passed, 1);
}

#[test]
fn select_picks_first_operand_when_condition_is_true() {
    let summary = run(
        r#"
        (module
          (func (export "pick") (result i32)
            (select (i32.const 11) (i32.const 22) (i32.const 1))))
        (assert_return (invoke "pick") (i32.const 11))
        "#,
    );
    assert_eq!(summary.passed, 1);
}
