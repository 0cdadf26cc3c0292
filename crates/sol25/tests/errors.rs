//! Error classification tests: each runtime failure surfaces the exit code
//! the driver maps to the process status, and output produced before the
//! failure is preserved.

mod common;

use common::{block, class, class_lit, int, main_run, method, program, run_err, send, string, var};
use pretty_assertions::assert_eq;
use sol25::{CollectStringPrint, EmptyReader, LimitedTracker, NoopTracer, Runner};

#[test]
fn missing_main_is_31() {
    let xml = program(&class("Other", "Object", &method("run", &block(&[], &[]))));
    let err = Runner::new(&xml)
        .unwrap()
        .run(&mut EmptyReader, &mut CollectStringPrint::new())
        .unwrap_err();
    assert_eq!(err.exit_code(), 31);
}

#[test]
fn main_without_run_is_31() {
    let xml = program(&class("Main", "Object", &method("go", &block(&[], &[]))));
    let err = Runner::new(&xml)
        .unwrap()
        .run(&mut EmptyReader, &mut CollectStringPrint::new())
        .unwrap_err();
    assert_eq!(err.exit_code(), 31);
}

#[test]
fn run_with_parameters_is_31() {
    let xml = program(&class("Main", "Object", &method("run", &block(&["x"], &[]))));
    let err = Runner::new(&xml)
        .unwrap()
        .run(&mut EmptyReader, &mut CollectStringPrint::new())
        .unwrap_err();
    assert_eq!(err.exit_code(), 31);
}

#[test]
fn inherited_run_satisfies_the_entry_contract() {
    // `run` may be inherited; only its absence or arity is an error
    let classes = [
        class(
            "Base",
            "Object",
            &method("run", &block(&[], &[("p", send("print", &string("ok"), &[]))])),
        ),
        class("Main", "Base", ""),
    ]
    .concat();
    assert_eq!(common::run_ok(&program(&classes)), "ok");
}

#[test]
fn duplicate_class_fails_to_load_with_31() {
    let classes = [
        class("Main", "Object", &method("run", &block(&[], &[]))),
        class("Main", "Object", ""),
    ]
    .concat();
    let err = Runner::new(&program(&classes)).unwrap_err();
    assert_eq!(err.exit_code(), 31);
}

#[test]
fn undefined_variable_is_32() {
    let xml = main_run(&[("r", send("print", &var("ghost"), &[]))]);
    assert_eq!(run_err(&xml), (32, String::new()));
}

#[test]
fn assign_to_parameter_is_34() {
    let classes = [
        class("Main", "Object", &[
            method("run", &block(&[], &[("r", send("boom:", &var("self"), &[&int(5)]))])),
            method("boom:", &block(&["n"], &[("n", int(1))])),
        ]
        .concat()),
    ]
    .concat();
    let (code, _) = run_err(&program(&classes));
    assert_eq!(code, 34);
}

#[test]
fn assign_to_an_enclosing_parameter_from_a_block_is_34() {
    let inner = block(&[], &[("n", int(2))]);
    let classes = [
        class("Main", "Object", &[
            method("run", &block(&[], &[("r", send("boom:", &var("self"), &[&int(5)]))])),
            method("boom:", &block(&["n"], &[("r", send("value", &inner, &[]))])),
        ]
        .concat()),
    ]
    .concat();
    let (code, _) = run_err(&program(&classes));
    assert_eq!(code, 34);
}

#[test]
fn output_echoed_from_input_survives_a_failure() {
    let xml = main_run(&[
        ("p", send("print", &send("read", &class_lit("String"), &[]), &[])),
        ("r", send("divBy:", &int(1), &[&int(0)])),
    ]);
    assert_eq!(run_with_input_err(&xml, &["echoed"]), (53, "echoed".to_owned()));
}

fn run_with_input_err(xml: &str, lines: &[&str]) -> (u8, String) {
    let runner = Runner::new(xml).unwrap();
    let mut reader = sol25::QueueReader::new(lines.iter().copied());
    let mut print = CollectStringPrint::new();
    let err = runner.run(&mut reader, &mut print).unwrap_err();
    (err.exit_code(), print.into_output())
}

#[test]
fn output_before_the_error_is_preserved() {
    let xml = main_run(&[
        ("p", send("print", &string("before"), &[])),
        ("r", send("divBy:", &int(10), &[&int(0)])),
    ]);
    assert_eq!(run_err(&xml), (53, "before".to_owned()));
}

#[test]
fn unknown_selector_is_51() {
    let xml = main_run(&[("r", send("foo", &int(5), &[]))]);
    assert_eq!(run_err(&xml).0, 51);
}

#[test]
fn unknown_class_message_is_51() {
    // class tokens understand only new, from: and (String) read
    let xml = main_run(&[("r", send("read", &class_lit("Integer"), &[]))]);
    assert_eq!(run_err(&xml).0, 51);
}

#[test]
fn block_arity_mismatch_is_51() {
    let xml = main_run(&[
        ("blk", block(&["x"], &[("r", var("x"))])),
        ("r", send("value", &var("blk"), &[])),
    ]);
    assert_eq!(run_err(&xml).0, 51);
}

#[test]
fn value_send_to_a_non_block_is_51() {
    let xml = main_run(&[("r", send("value", &int(5), &[]))]);
    assert_eq!(run_err(&xml).0, 51);
}

#[test]
fn reading_an_absent_attribute_is_51() {
    let xml = main_run(&[
        ("o", send("new", &class_lit("Object"), &[])),
        ("r", send("missing", &var("o"), &[])),
    ]);
    assert_eq!(run_err(&xml).0, 51);
}

#[test]
fn attribute_writes_on_singletons_are_51() {
    let xml = main_run(&[("r", send("x:", &var("nil"), &[&int(1)]))]);
    assert_eq!(run_err(&xml).0, 51);
}

#[test]
fn block_may_not_be_instantiated() {
    let xml = main_run(&[("r", send("new", &class_lit("Block"), &[]))]);
    assert_eq!(run_err(&xml).0, 51);
}

#[test]
fn division_by_zero_is_53() {
    let xml = main_run(&[("r", send("divBy:", &int(10), &[&int(0)]))]);
    assert_eq!(run_err(&xml).0, 53);
}

#[test]
fn arithmetic_with_a_non_integer_argument_is_53() {
    let xml = main_run(&[("r", send("plus:", &int(1), &[&string("x")]))]);
    assert_eq!(run_err(&xml).0, 53);
}

#[test]
fn comparison_with_a_non_integer_argument_is_53() {
    let xml = main_run(&[("r", send("greaterThan:", &int(1), &[&var("nil")]))]);
    assert_eq!(run_err(&xml).0, 53);
}

#[test]
fn from_between_unrelated_classes_is_53() {
    let xml = main_run(&[("r", send("from:", &class_lit("Integer"), &[&string("abc")]))]);
    assert_eq!(run_err(&xml).0, 53);
}

#[test]
fn malformed_document_is_99() {
    assert_eq!(Runner::new("<program><surprise/></program>").unwrap_err().exit_code(), 99);
    assert_eq!(Runner::new("not xml at all").unwrap_err().exit_code(), 99);
}

#[test]
fn recursion_limit_exhaustion_is_99() {
    let classes = class("Main", "Object", &[
        method("run", &block(&[], &[("r", send("loop", &var("self"), &[]))])),
        method("loop", &block(&[], &[("r", send("loop", &var("self"), &[]))])),
    ]
    .concat());
    let runner = Runner::new(&program(&classes)).unwrap();
    let mut print = CollectStringPrint::new();
    let err = runner
        .run_with(&mut EmptyReader, &mut print, LimitedTracker::new(64), NoopTracer)
        .unwrap_err();
    assert_eq!(err.exit_code(), 99);
}

#[test]
fn failure_inside_a_loop_body_still_reports_its_own_code() {
    // frames pushed by the loop bodies are unwound before the error
    // surfaces; a leak would be reported as an internal error instead
    let condition = block(&[], &[("c", var("true"))]);
    let body = block(&[], &[("r", send("divBy:", &var("i"), &[&int(0)]))]);
    let xml = main_run(&[
        ("i", int(9)),
        ("w", send("whileTrue:", &condition, &[&body])),
    ]);
    assert_eq!(run_err(&xml).0, 53);
}

#[test]
fn whole_loops_keep_printing_before_failing() {
    // three iterations print, the fourth divides by zero: the printed
    // prefix survives the classified failure
    let condition = block(&[], &[("c", send("not", &send("greaterThan:", &var("i"), &[&int(3)]), &[]))]);
    let body = block(
        &[],
        &[
            ("p", send("print", &send("asString", &var("i"), &[]), &[])),
            ("i", send("plus:", &var("i"), &[&int(1)])),
        ],
    );
    let xml = main_run(&[
        ("i", int(1)),
        ("w", send("whileTrue:", &condition, &[&body])),
        ("r", send("divBy:", &int(1), &[&int(0)])),
    ]);
    assert_eq!(run_err(&xml), (53, "123".to_owned()));
}
