//! Lint‑style semantic pass for the **Lox** interpreter.
//!
//! The analyzer never mutates the AST and computes no addresses; it only
//! walks the tree and collects diagnostics:
//!
//! * **errors** – misplaced `return`/`break`/`this`/`super`, same‑scope
//!   redeclaration, self‑inheritance, reads inside an own initializer;
//! * **warnings** – locals that are never read and declarations shadowing a
//!   built‑in.
//!
//! Every diagnostic in the program is collected; nothing aborts the walk.

use std::rc::Rc;

use crate::error::{LoxError, Warning};
use crate::expr::{Expr, ExprKind};
use crate::stmt::{ClassDecl, FunctionDecl, Stmt};
use crate::token::Token;
use log::{debug, info};

/// Names bound in the global table before any user code runs.
pub const BUILTINS: [&str; 3] = ["clock", "typeof", "Array"];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
    Lambda,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum VarState {
    Declared,
    Defined,
    Read,
}

/// Parameters are exempt from the unused‑variable lint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum VarKind {
    Param,
    Local,
}

#[derive(Debug)]
struct Binding {
    name: Token,
    state: VarState,
    kind: VarKind,
}

/// One block scope; bindings kept in declaration order so warnings come out
/// in source order.
#[derive(Debug, Default)]
struct Scope {
    bindings: Vec<Binding>,
}

impl Scope {
    fn find_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.bindings.iter_mut().rfind(|b| b.name.lexeme == name)
    }
}

/// Diagnostics produced by one analyzer walk.
#[derive(Debug, Default)]
pub struct Analysis {
    pub errors: Vec<LoxError>,
    pub warnings: Vec<Warning>,
}

pub struct Analyzer {
    /// Block scopes only; the top level is not a scope.
    scopes: Vec<Scope>,
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
    analysis: Analysis,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        info!("Analyzer instantiated");

        Analyzer {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
            analysis: Analysis::default(),
        }
    }

    /// Walk all top‑level statements and return what was found.
    pub fn analyze(mut self, statements: &[Stmt]) -> Analysis {
        info!(
            "Beginning analysis over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.stmt(stmt);
        }

        info!(
            "Analysis finished: {} error(s), {} warning(s)",
            self.analysis.errors.len(),
            self.analysis.warnings.len()
        );

        self.analysis
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.expr(expr),

            Stmt::Var { name, initializer } => {
                self.declare(name, VarKind::Local);
                if let Some(init) = initializer {
                    self.expr(init);
                }
                self.define(name);
            }

            Stmt::Block { statements, .. } => {
                self.begin_scope();
                for s in statements {
                    self.stmt(s);
                }
                self.end_scope();
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.stmt(then_branch);
                if let Some(eb) = else_branch {
                    self.stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.expr(condition);
                self.loop_depth += 1;
                self.stmt(body);
                self.loop_depth -= 1;
            }

            Stmt::Function(decl) => {
                self.declare(&decl.name, VarKind::Local);
                self.define(&decl.name);
                self.function(decl, FunctionType::Function);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(v) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.expr(v);
                }
            }

            Stmt::Break(keyword) => {
                if self.loop_depth == 0 {
                    self.error(keyword, "Can't break when not inside of a loop.");
                }
            }

            Stmt::Class(class) => self.class(class),
        }
    }

    fn class(&mut self, class: &ClassDecl) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(&class.name, VarKind::Local);
        self.define(&class.name);

        if let Some(superclass) = &class.superclass {
            if let ExprKind::Variable(super_name) = &superclass.kind {
                if super_name.lexeme == class.name.lexeme {
                    self.error(super_name, "A class can't inherit from itself.");
                }
            }

            self.current_class = ClassType::Subclass;
            self.expr(superclass);
        }

        for method in &class.methods {
            let kind = if is_initializer(method) {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.function(method, kind);
        }

        for method in class.class_methods.iter().chain(&class.operators) {
            self.function(method, FunctionType::Method);
        }

        self.current_class = enclosing_class;
    }

    fn function(&mut self, decl: &Rc<FunctionDecl>, kind: FunctionType) {
        debug!("Analyzing function '{}' as {:?}", decl.name.lexeme, kind);

        let enclosing_function = self.current_function;
        let enclosing_loops = self.loop_depth;
        self.current_function = kind;
        self.loop_depth = 0;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param, VarKind::Param);
            self.define(param);
        }
        for s in &decl.body {
            self.stmt(s);
        }
        self.end_scope();

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loops;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}

            ExprKind::Grouping(inner) => self.expr(inner),

            ExprKind::Unary { right, .. } => self.expr(right),

            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }

            ExprKind::Variable(name) => {
                let in_own_initializer = self
                    .scopes
                    .last_mut()
                    .and_then(|scope| scope.find_mut(&name.lexeme))
                    .is_some_and(|b| b.state == VarState::Declared);

                if in_own_initializer {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.mark_read(name);
            }

            ExprKind::Assign { name, value } => {
                self.expr(value);
                self.mark_read(name);
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.expr(callee);
                for arg in arguments {
                    self.expr(arg);
                }
            }

            ExprKind::Get { object, .. } => self.expr(object),

            ExprKind::Set { object, value, .. } => {
                self.expr(value);
                self.expr(object);
            }

            ExprKind::IndexGet { object, index, .. } => {
                self.expr(object);
                self.expr(index);
            }

            ExprKind::IndexSet {
                object,
                index,
                value,
                ..
            } => {
                self.expr(object);
                self.expr(index);
                self.expr(value);
            }

            ExprKind::This(keyword) => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                }
            }

            ExprKind::Super { keyword, .. } => match self.current_class {
                ClassType::None => self.error(keyword, "Can't use 'super' outside of a class."),
                ClassType::Class => {
                    self.error(keyword, "Can't use 'super' in a class with no superclass.")
                }
                ClassType::Subclass => {}
            },

            ExprKind::Lambda(decl) => self.function(decl, FunctionType::Lambda),

            ExprKind::Array { elements, .. } => {
                for e in elements {
                    self.expr(e);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn begin_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        for binding in scope.bindings {
            if binding.kind == VarKind::Local && binding.state != VarState::Read {
                let message = format!("Identifier '{}' is never used.", binding.name.lexeme);
                self.warn(&binding.name, message);
            }
        }
    }

    fn declare(&mut self, name: &Token, kind: VarKind) {
        let Some(scope) = self.scopes.last_mut() else {
            return; // global
        };

        let redeclared = scope.find_mut(&name.lexeme).is_some();

        scope.bindings.push(Binding {
            name: name.clone(),
            state: VarState::Declared,
            kind,
        });

        if redeclared {
            self.error(name, "Already a variable with this name in this scope.");
        }

        if BUILTINS.contains(&name.lexeme.as_str()) {
            let message = format!("Shadows built-in '{}'.", name.lexeme);
            self.warn(name, message);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(binding) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.bindings.iter_mut().rfind(|b| b.name.lexeme == name.lexeme))
        {
            binding.state = VarState::Defined;
        }
    }

    /// Innermost binding of `name` becomes read; unknown names are globals.
    fn mark_read(&mut self, name: &Token) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(binding) = scope
                .bindings
                .iter_mut()
                .rfind(|b| b.name.lexeme == name.lexeme)
            {
                binding.state = VarState::Read;
                return;
            }
        }

        debug!("'{}' assumed global", name.lexeme);
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.analysis.errors.push(LoxError::static_at(token, message));
    }

    fn warn(&mut self, token: &Token, message: String) {
        debug!("Warning at line {}: {}", token.line, message);
        self.analysis.warnings.push(Warning::at(token, message));
    }
}

/// Instance method named `init` declared with a parameter list.
pub fn is_initializer(method: &FunctionDecl) -> bool {
    method.name.lexeme == "init" && !method.is_getter
}
