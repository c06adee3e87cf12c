use std::rc::Rc;

use crate::expr::{Expr, NodeId};
use crate::token::Token;

/// A function, method, getter, operator overload or anonymous function.
///
/// Shared behind an `Rc` so every closure created from it points at the same
/// body.
#[derive(Debug)]
pub struct FunctionDecl {
    /// Identity of the parameter/body scope.
    pub id: NodeId,

    /// Function name; the operator token for overloads, the `fun` keyword
    /// for anonymous functions.
    pub name: Token,

    pub params: Vec<Token>,

    pub body: Vec<Stmt>,

    /// Declared without a parameter list; invoked on property access.
    pub is_getter: bool,

    pub is_lambda: bool,
}

/// `class Name < Super { ... }`
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Token,

    /// Always an `ExprKind::Variable` when present.
    pub superclass: Option<Expr>,

    /// Instance methods.
    pub methods: Vec<Rc<FunctionDecl>>,

    /// `class`-prefixed static methods.
    pub class_methods: Vec<Rc<FunctionDecl>>,

    /// `class operator <op>(a, b)` overloads.
    pub operators: Vec<Rc<FunctionDecl>>,
}

/// Complete executable constructs. `for` loops are desugared by the parser
/// into `Block`/`While`.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block { id: NodeId, statements: Vec<Stmt> },

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While { condition: Expr, body: Box<Stmt> },

    /// Function declaration ‑ becomes a first‑class callable value.
    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Break(Token),

    Class(ClassDecl),
}
