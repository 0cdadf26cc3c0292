//! Shared helpers for composing SOL25 AST documents and running them.

use sol25::{CollectStringPrint, EmptyReader, Runner};

pub fn program(classes: &str) -> String {
    format!(r#"<program language="SOL25">{classes}</program>"#)
}

pub fn class(name: &str, parent: &str, methods: &str) -> String {
    format!(r#"<class name="{name}" parent="{parent}">{methods}</class>"#)
}

pub fn method(selector: &str, body: &str) -> String {
    format!(r#"<method selector="{selector}">{body}</method>"#)
}

/// A block element; every statement is an assignment `var := expr`, ordered
/// by position.
pub fn block(params: &[&str], body: &[(&str, String)]) -> String {
    let arity = params.len();
    let params: String = params
        .iter()
        .enumerate()
        .map(|(i, name)| format!(r#"<parameter name="{name}" order="{}"/>"#, i + 1))
        .collect();
    let assigns: String = body
        .iter()
        .enumerate()
        .map(|(i, (var, expr))| {
            format!(
                r#"<assign order="{}"><var name="{var}"/><expr>{expr}</expr></assign>"#,
                i + 1
            )
        })
        .collect();
    format!(r#"<block arity="{arity}">{params}{assigns}</block>"#)
}

/// A whole program consisting of one `Main` class with a single `run`
/// method.
pub fn main_run(body: &[(&str, String)]) -> String {
    program(&class("Main", "Object", &method("run", &block(&[], body))))
}

pub fn int(value: i64) -> String {
    format!(r#"<literal class="Integer" value="{value}"/>"#)
}

pub fn string(value: &str) -> String {
    format!(r#"<literal class="String" value="{value}"/>"#)
}

pub fn class_lit(name: &str) -> String {
    format!(r#"<literal class="class" value="{name}"/>"#)
}

pub fn var(name: &str) -> String {
    format!(r#"<var name="{name}"/>"#)
}

pub fn send(selector: &str, receiver: &str, args: &[&str]) -> String {
    let args: String = args
        .iter()
        .enumerate()
        .map(|(i, arg)| format!(r#"<arg order="{}"><expr>{arg}</expr></arg>"#, i + 1))
        .collect();
    format!(r#"<send selector="{selector}"><expr>{receiver}</expr>{args}</send>"#)
}

/// Runs a program with no input and returns everything it printed.
pub fn run_ok(xml: &str) -> String {
    let runner = Runner::new(xml).expect("program should load");
    let mut print = CollectStringPrint::new();
    runner.run(&mut EmptyReader, &mut print).expect("program should run");
    print.into_output()
}

/// Runs a program expected to fail, returning the exit code and whatever
/// output was produced before the failure.
pub fn run_err(xml: &str) -> (u8, String) {
    let runner = Runner::new(xml).expect("program should load");
    let mut print = CollectStringPrint::new();
    let err = runner
        .run(&mut EmptyReader, &mut print)
        .expect_err("program should fail");
    (err.exit_code(), print.into_output())
}
