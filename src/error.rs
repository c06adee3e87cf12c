//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! Every pass converts its failure modes into one of the variants defined
//! here. Three kinds never overlap:
//!
//! * [`LoxError::Syntax`] – lexing and parsing, recovered by panic mode.
//! * [`LoxError::Static`] – analyzer and resolver, collected for the whole
//!   program before execution is refused.
//! * [`LoxError::Runtime`] – evaluation, aborts the run.
//!
//! Warnings are advisory and live in [`Warning`], outside the error enum.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;

use log::info;
use thiserror::Error;

use crate::token::{Token, TokenType};

/// Where in the source a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The end of input.
    End,

    /// A specific lexeme.
    At(String),
}

impl Location {
    /// Location of `token`: `End` for the EOF token, its lexeme otherwise.
    pub fn of(token: &Token) -> Self {
        if token.token_type == TokenType::EOF {
            Location::End
        } else {
            Location::At(token.lexeme.clone())
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::End => write!(f, " at end"),
            Location::At(lexeme) => write!(f, " at '{}'", lexeme),
        }
    }
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical or syntactic error.
    #[error("[Line {line}] Error{location}: {message}")]
    Syntax {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,

        location: Location,
    },

    /// Static‑analysis or resolution failure.
    #[error("[Line {line}] Error{location}: {message}")]
    Static {
        message: String,
        line: usize,
        location: Location,
    },

    /// Runtime evaluation error.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, location: Location, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Syntax {
            message,
            line,
            location,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn syntax<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Syntax error: line={}, msg={}", token.line, message);

        LoxError::Syntax {
            message,
            line: token.line,
            location: Location::of(token),
        }
    }

    /// Helper constructor for the **analyzer** and **resolver**.
    pub fn static_at<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Static error: line={}, msg={}", token.line, message);

        LoxError::Static {
            message,
            line: token.line,
            location: Location::of(token),
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        LoxError::Runtime {
            message,
            line: token.line,
        }
    }
}

/// Advisory diagnostic produced by the analyzer; never blocks a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub line: usize,
    pub location: Location,
}

impl Warning {
    pub fn at<S: Into<String>>(token: &Token, msg: S) -> Self {
        Warning {
            message: msg.into(),
            line: token.line,
            location: Location::of(token),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Line {}] Warning{}: {}",
            self.line, self.location, self.message
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
