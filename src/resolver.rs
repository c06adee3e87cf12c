//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes mirroring, frame for frame, the environments the
//!    interpreter will create at runtime.
//! 2. Assign every local a dense, 0‑based slot in declaration order and
//!    record, for each variable occurrence, its `(depth, slot)` address.
//! 3. Report the static errors that fall out of that walk (unbound
//!    `this`/`super`, reads inside an own initializer).
//!
//! Names found in no scope are left unresolved and looked up by name in the
//! global table at runtime. The top level is never a scope.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::LoxError;
use crate::expr::{Expr, ExprKind, NodeId};
use crate::stmt::{ClassDecl, FunctionDecl, Stmt};
use crate::token::Token;
use log::{debug, info};

/// Compile‑time address of a local: walk `depth` parents, then index `index`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    pub depth: usize,
    pub index: usize,
}

/// The side table handed to the interpreter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolutions {
    /// Variable‑reference node → address. Absent ⇒ global.
    pub locals: HashMap<NodeId, Slot>,

    /// Block / function node → number of slots its frame holds.
    pub scope_sizes: HashMap<NodeId, usize>,
}

impl Resolutions {
    pub fn slot(&self, id: NodeId) -> Option<Slot> {
        self.locals.get(&id).copied()
    }

    /// Fold `other` into `self`; ids never collide across runs.
    pub fn merge(&mut self, other: Resolutions) {
        self.locals.extend(other.locals);
        self.scope_sizes.extend(other.scope_sizes);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// One frame. `names[i]` is slot `i`; the flag is `true` once defined.
#[derive(Debug)]
struct Scope {
    /// Node whose slot count this frame reports (synthetic frames have none).
    owner: Option<NodeId>,
    names: Vec<(String, bool)>,
}

/// Resolver: tracks scopes and records binding addresses.
pub struct Resolver {
    scopes: Vec<Scope>,
    current_class: ClassType,
    resolutions: Resolutions,
    errors: Vec<LoxError>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            current_class: ClassType::None,
            resolutions: Resolutions::default(),
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Resolutions, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            info!(
                "Resolved {} local reference(s)",
                self.resolutions.locals.len()
            );
            Ok(self.resolutions)
        } else {
            Err(self.errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Class(class) => self.resolve_class(class),

            Stmt::Block { id, statements } => {
                self.begin_scope(Some(*id));
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // name is visible inside its own body
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { value, .. } => {
                if let Some(v) = value {
                    self.resolve_expr(v);
                }
            }

            Stmt::Break(_) => {}
        }
    }

    /// Frames: `[super]` → `this` → params/body, once for instance methods
    /// and once for static/operator methods.
    fn resolve_class(&mut self, class: &ClassDecl) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(&class.name);
        self.define(&class.name);

        if let Some(superclass) = &class.superclass {
            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);
        }

        let has_super = class.superclass.is_some();

        self.resolve_methods(&class.name, has_super, class.methods.iter());
        self.resolve_methods(
            &class.name,
            has_super,
            class.class_methods.iter().chain(&class.operators),
        );

        self.current_class = enclosing_class;
    }

    fn resolve_methods<'m>(
        &mut self,
        class_name: &Token,
        has_super: bool,
        methods: impl Iterator<Item = &'m Rc<FunctionDecl>>,
    ) {
        if has_super {
            self.begin_scope(None);
            self.define_synthetic("super", class_name.line);
        }

        for method in methods {
            self.begin_scope(None);
            self.define_synthetic("this", method.name.line);
            self.resolve_function(method);
            self.end_scope();
        }

        if has_super {
            self.end_scope();
        }
    }

    fn resolve_function(&mut self, decl: &FunctionDecl) {
        debug!("Resolving function '{}'", decl.name.lexeme);

        self.begin_scope(Some(decl.id));
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for s in &decl.body {
            self.resolve_stmt(s);
        }
        self.end_scope();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Variable(name) => {
                let in_own_initializer = self.scopes.last().is_some_and(|scope| {
                    scope
                        .names
                        .iter()
                        .rev()
                        .find(|(n, _)| *n == name.lexeme)
                        .is_some_and(|(_, defined)| !defined)
                });

                if in_own_initializer {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.resolve_local(expr.id, name);
            }

            ExprKind::Assign { name, value } => {
                self.resolve_expr(value);
                self.resolve_local(expr.id, name);
            }

            ExprKind::Literal(_) => {}

            ExprKind::Grouping(inner) => self.resolve_expr(inner),

            ExprKind::Unary { right, .. } => self.resolve_expr(right),

            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            ExprKind::Get { object, .. } => self.resolve_expr(object),

            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            ExprKind::IndexGet { object, index, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
            }

            ExprKind::IndexSet {
                object,
                index,
                value,
                ..
            } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
                self.resolve_expr(value);
            }

            ExprKind::This(keyword) => {
                if !self.resolve_local(expr.id, keyword) {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                }
            }

            ExprKind::Super { keyword, .. } => {
                if !self.resolve_local(expr.id, keyword) {
                    let message = match self.current_class {
                        ClassType::None => "Can't use 'super' outside of a class.",
                        _ => "Can't use 'super' in a class with no superclass.",
                    };
                    self.error(keyword, message);
                }
            }

            ExprKind::Lambda(decl) => self.resolve_function(decl),

            ExprKind::Array { elements, .. } => {
                for e in elements {
                    self.resolve_expr(e);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn begin_scope(&mut self, owner: Option<NodeId>) {
        self.scopes.push(Scope {
            owner,
            names: Vec::new(),
        });
    }

    fn end_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            if let Some(owner) = scope.owner {
                self.resolutions
                    .scope_sizes
                    .insert(owner, scope.names.len());
            }
        }
    }

    /// Allocate the next slot in the innermost scope. No‑op at top level.
    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.names.push((name.lexeme.clone(), false));
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(entry) = scope.names.iter_mut().rev().find(|(n, _)| *n == name.lexeme) {
                entry.1 = true;
            }
        }
    }

    fn define_synthetic(&mut self, name: &str, line: usize) {
        let token = Token::synthetic(name, line);
        self.declare(&token);
        self.define(&token);
    }

    /// Record the address of `name` for node `id`. Returns `false` when no
    /// scope binds it (global).
    fn resolve_local(&mut self, id: NodeId, name: &Token) -> bool {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(index) = scope.names.iter().rposition(|(n, _)| *n == name.lexeme) {
                debug!(
                    "Resolved '{}' (node {:?}) at depth {} slot {}",
                    name.lexeme, id, depth, index
                );
                self.resolutions.locals.insert(id, Slot { depth, index });
                return true;
            }
        }

        debug!("'{}' (node {:?}) left global", name.lexeme, id);
        false
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(LoxError::static_at(token, message));
    }
}
