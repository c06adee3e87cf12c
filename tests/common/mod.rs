#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::interpreter::{stack_size_for, Interpreter};
use rox::{Lox, Report};

/// In‑memory `print` target that stays readable after being boxed into the
/// interpreter.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A session whose output can be inspected.
pub fn session() -> (Lox, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let lox = Lox::with_output(Box::new(buffer.clone()));
    (lox, buffer)
}

pub fn session_with_depth(depth: usize) -> (Lox, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let interpreter = Interpreter::with_output(Box::new(buffer.clone())).with_max_call_depth(depth);
    (Lox::from_interpreter(interpreter), buffer)
}

/// Runs `f` on a thread with as much stack as the binary gives an
/// interpreter capped at `max_call_depth`.
pub fn on_interpreter_stack<T, F>(max_call_depth: usize, f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    std::thread::Builder::new()
        .stack_size(stack_size_for(max_call_depth))
        .spawn(f)
        .expect("spawn interpreter thread")
        .join()
        .expect("interpreter thread panicked")
}

/// Run `source` in a fresh session; returns printed output and the report.
pub fn run(source: &str) -> (String, Report) {
    let (mut lox, buffer) = session();
    let report = lox.run(source);
    (buffer.contents(), report)
}

/// Printed output of a program expected to run cleanly.
pub fn output(source: &str) -> String {
    let (out, report) = run(source);
    assert!(
        report.errors.is_empty() && report.runtime_error.is_none(),
        "unexpected failure: {:?}",
        report
    );
    out
}

/// Message of the runtime error a program is expected to raise.
pub fn runtime_error(source: &str) -> String {
    let (_, report) = run(source);
    assert!(report.errors.is_empty(), "static errors: {:?}", report.errors);
    match report.runtime_error {
        Some(error) => error.to_string(),
        None => panic!("expected a runtime error"),
    }
}

/// Rendered syntax/static errors.
pub fn errors(source: &str) -> Vec<String> {
    let (_, report) = run(source);
    report.errors.iter().map(|e| e.to_string()).collect()
}

pub fn warnings(source: &str) -> Vec<String> {
    let (_, report) = run(source);
    report.warnings.iter().map(|w| w.to_string()).collect()
}
