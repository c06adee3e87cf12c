//! A tree‑walking interpreter for Lox.
//!
//! The pipeline is strictly linear:
//!
//! ```text
//! source ─► scanner ─► parser ─► analyzer ┐
//!                                resolver ┴─► interpreter
//! ```
//!
//! [`Lox`] owns everything that must survive between runs (globals, the
//! resolver's side table, the node‑id generator) so a REPL can feed it one
//! line at a time.
//!
//! ```
//! let mut lox = rox::Lox::with_output(Box::new(std::io::sink()));
//! let report = lox.run("var a = 1; print a + 2;");
//! assert_eq!(report.exit_code(), 0);
//! ```

pub mod analyzer;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stdlib;
pub mod stmt;
pub mod token;
pub mod value;

use std::collections::HashSet;
use std::io::Write;

use log::info;

use crate::analyzer::Analyzer;
use crate::error::{LoxError, Warning};
use crate::expr::NodeIds;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::stmt::Stmt;
use crate::token::Token;

/// Exit code for syntax and static errors.
pub const EXIT_STATIC: i32 = 64;

/// Exit code for an unrecovered runtime error.
pub const EXIT_RUNTIME: i32 = 70;

/// Everything one run produced besides program output.
#[derive(Debug, Default)]
pub struct Report {
    /// Syntax and static errors, in the order they were found.
    pub errors: Vec<LoxError>,
    pub warnings: Vec<Warning>,
    pub runtime_error: Option<LoxError>,
}

impl Report {
    pub fn exit_code(&self) -> i32 {
        if !self.errors.is_empty() {
            EXIT_STATIC
        } else if self.runtime_error.is_some() {
            EXIT_RUNTIME
        } else {
            0
        }
    }

    pub fn is_ok(&self) -> bool {
        self.exit_code() == 0
    }
}

/// Run context: one interpreter session.
pub struct Lox {
    interpreter: Interpreter,
    ids: NodeIds,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self::from_interpreter(Interpreter::new())
    }

    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self::from_interpreter(Interpreter::with_output(output))
    }

    pub fn from_interpreter(interpreter: Interpreter) -> Self {
        Lox {
            interpreter,
            ids: NodeIds::new(),
        }
    }

    /// Scan, parse, check and execute `source`.
    ///
    /// Syntax errors skip every later phase. Static errors from the analyzer
    /// and the resolver are merged (each distinct diagnostic once) and skip
    /// execution. Warnings never block.
    pub fn run(&mut self, source: &str) -> Report {
        let mut report = Report::default();

        let (tokens, lex_errors) = scanner::scan(source);
        report.errors.extend(lex_errors);

        let statements: Vec<Stmt> = match Parser::new(&tokens, &mut self.ids).parse() {
            Ok(statements) => statements,
            Err(errors) => {
                report.errors.extend(errors);
                return report;
            }
        };

        if !report.errors.is_empty() {
            return report;
        }

        let analysis = Analyzer::new().analyze(&statements);
        report.warnings = analysis.warnings;

        let mut seen: HashSet<String> = HashSet::new();
        let mut push_unique = |errors: &mut Vec<LoxError>, error: LoxError| {
            if seen.insert(error.to_string()) {
                errors.push(error);
            }
        };

        for error in analysis.errors {
            push_unique(&mut report.errors, error);
        }

        match Resolver::new().resolve(&statements) {
            Ok(resolutions) if report.errors.is_empty() => {
                self.interpreter.resolve(resolutions);
            }
            Ok(_) => {}
            Err(errors) => {
                for error in errors {
                    push_unique(&mut report.errors, error);
                }
            }
        }

        if !report.errors.is_empty() {
            info!("{} static error(s); not executing", report.errors.len());
            return report;
        }

        if let Err(error) = self.interpreter.interpret(&statements) {
            report.runtime_error = Some(error);
        }

        report
    }
}

/// Scan `source` into tokens plus every lexical error.
pub fn scan(source: &str) -> (Vec<Token>, Vec<LoxError>) {
    scanner::scan(source)
}

/// Scan and parse `source` with a throwaway id generator.
pub fn parse(source: &str) -> std::result::Result<Vec<Stmt>, Vec<LoxError>> {
    let (tokens, mut errors) = scanner::scan(source);
    let mut ids = NodeIds::new();

    match Parser::new(&tokens, &mut ids).parse() {
        Ok(statements) if errors.is_empty() => Ok(statements),
        Ok(_) => Err(errors),
        Err(parse_errors) => {
            errors.extend(parse_errors);
            Err(errors)
        }
    }
}
