//! Tree‑walking evaluator.
//!
//! Statements return a [`Flow`] so `return` and `break` propagate as plain
//! values through blocks, loops and calls; only genuine failures travel on
//! the `Err` side. Local variables are read through the resolver's
//! `(depth, slot)` table; everything else is a global looked up by name.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::analyzer::is_initializer;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprKind, LiteralValue, NodeId};
use crate::resolver::Resolutions;
use crate::stdlib;
use crate::stmt::{ClassDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::{Callable, LoxArray, LoxClass, LoxFunction, Value};

/// Nested calls allowed before `Stack overflow.` is raised.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1_000;

/// Host stack reserved for each allowed Lox call.
const STACK_PER_CALL: usize = 128 * 1024;

/// Host stack reserved regardless of call depth.
const BASE_STACK: usize = 8 * 1024 * 1024;

/// Stack size for a thread running an interpreter capped at
/// `max_call_depth` nested calls.
pub fn stack_size_for(max_call_depth: usize) -> usize {
    max_call_depth
        .saturating_mul(STACK_PER_CALL)
        .saturating_add(BASE_STACK)
}

/// Control flow out of a statement.
#[derive(Debug)]
pub enum Flow {
    /// Fall through to the next statement.
    Normal,
    /// Unwind to the nearest call.
    Return(Value),
    /// Unwind to the nearest loop.
    Break,
}

pub struct Interpreter {
    globals: HashMap<String, Value>,

    /// Top‑level frame. Declarations made while it is current go to `globals`.
    root: EnvRef,
    environment: EnvRef,

    resolutions: Resolutions,
    output: Box<dyn Write>,

    call_depth: usize,
    max_call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter printing to stdout, with the built‑ins defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let mut globals: HashMap<String, Value> = HashMap::new();
        for (name, value) in stdlib::globals() {
            debug!("Defining native function '{}'", name);
            globals.insert(name.to_string(), value);
        }

        let root: EnvRef = Environment::new().into_ref();

        Self {
            globals,
            environment: Rc::clone(&root),
            root,
            resolutions: Resolutions::default(),
            output,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Adopt the addresses computed for the next program.
    pub fn resolve(&mut self, resolutions: Resolutions) {
        debug!(
            "Merging {} resolved local(s)",
            resolutions.locals.len()
        );
        self.resolutions.merge(resolutions);
    }

    /// Slot capacity recorded for the frame of node `id`.
    pub fn scope_size(&self, id: NodeId, fallback: usize) -> usize {
        self.resolutions
            .scope_sizes
            .get(&id)
            .copied()
            .unwrap_or(fallback)
    }

    /// Runs a program, stopping at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        let result = statements
            .iter()
            .try_for_each(|stmt| self.execute(stmt).map(drop));

        // Output printed before a runtime error still reaches the sink.
        self.output.flush()?;
        result?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.define(name, value);
                Ok(Flow::Normal)
            }

            Stmt::Block { id, statements } => {
                let env = Environment::with_enclosing(
                    Rc::clone(&self.environment),
                    self.scope_size(*id, 0),
                );
                self.execute_block(statements, env.into_ref())
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.define(&decl.name, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Break(_) => Ok(Flow::Break),

            Stmt::Class(class) => {
                self.execute_class(class)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` with `env` as the current frame, restoring the
    /// previous frame afterwards, on error too.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, env);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_class(&mut self, class: &ClassDecl) -> Result<()> {
        debug!("Declaring class '{}'", class.name.lexeme);

        let slot = self.define(&class.name, Value::Nil);

        let superclass: Option<Rc<LoxClass>> = match &class.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(superclass) => Some(superclass),
                _ => {
                    let token = match &expr.kind {
                        ExprKind::Variable(name) => name,
                        _ => &class.name,
                    };
                    return Err(LoxError::runtime(token, "Superclass must be a class."));
                }
            },
            None => None,
        };

        // Frames binding `super` for instance and for static methods.
        let (instance_env, static_env) = match &superclass {
            Some(superclass) => {
                let super_meta = superclass
                    .metaclass
                    .as_ref()
                    .map_or(Value::Nil, |meta| Value::Class(Rc::clone(meta)));
                (
                    self.super_frame(Value::Class(Rc::clone(superclass))),
                    self.super_frame(super_meta),
                )
            }
            None => (Rc::clone(&self.environment), Rc::clone(&self.environment)),
        };

        let methods: HashMap<String, Rc<LoxFunction>> = class
            .methods
            .iter()
            .map(|decl| {
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&instance_env), is_initializer(decl));
                (decl.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let statics: HashMap<String, Rc<LoxFunction>> = class
            .class_methods
            .iter()
            .chain(&class.operators)
            .map(|decl| {
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&static_env), false);
                (decl.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let metaclass = LoxClass {
            name: format!("{} metaclass", class.name.lexeme),
            superclass: superclass.as_ref().and_then(|s| s.metaclass.clone()),
            methods: statics,
            metaclass: None,
        };

        let value = Value::Class(Rc::new(LoxClass {
            name: class.name.lexeme.clone(),
            superclass,
            methods,
            metaclass: Some(Rc::new(metaclass)),
        }));

        match slot {
            Some(index) => {
                Environment::assign_at(&self.environment, 0, index, value);
            }
            None => {
                self.globals.insert(class.name.lexeme.clone(), value);
            }
        }

        Ok(())
    }

    fn super_frame(&self, superclass: Value) -> EnvRef {
        let mut env = Environment::with_enclosing(Rc::clone(&self.environment), 1);
        env.define(superclass);
        env.into_ref()
    }

    /// Bind `name` in the current frame, or globally at top level. Returns
    /// the slot used, if any.
    fn define(&mut self, name: &Token, value: Value) -> Option<usize> {
        if Rc::ptr_eq(&self.environment, &self.root) {
            self.globals.insert(name.lexeme.clone(), value);
            None
        } else {
            Some(self.environment.borrow_mut().define(value))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match (&operator.token_type, right) {
                    (TokenType::MINUS, Value::Number(n)) => Ok(Value::Number(-n)),
                    (TokenType::MINUS, _) => {
                        Err(LoxError::runtime(operator, "Operand must be a number."))
                    }
                    (_, value) => Ok(Value::Bool(!value.is_truthy())),
                }
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary(left, operator, right)
            }

            ExprKind::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuit = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            ExprKind::Variable(name) => self.look_up(name, expr.id),

            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.assign(name, expr.id, value.clone())?;
                Ok(value)
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee, args, paren)
            }

            ExprKind::Get { object, name } => {
                let object = self.evaluate(object)?;
                self.get_property(object, name)
            }

            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.set_field(&name.lexeme, value.clone());
                Ok(value)
            }

            ExprKind::IndexGet {
                object,
                bracket,
                index,
            } => {
                let array = self.evaluate_array(object, bracket)?;
                let index = self.evaluate(index)?;

                array
                    .get(&index)
                    .map_err(|message| LoxError::runtime(bracket, message))
            }

            ExprKind::IndexSet {
                object,
                bracket,
                index,
                value,
            } => {
                let array = self.evaluate_array(object, bracket)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;

                array
                    .set(&index, value.clone())
                    .map_err(|message| LoxError::runtime(bracket, message))?;
                Ok(value)
            }

            ExprKind::This(keyword) => self.look_up(keyword, expr.id),

            ExprKind::Super { keyword, method } => self.super_method(keyword, method, expr.id),

            ExprKind::Lambda(decl) => {
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                Ok(Value::Function(Rc::new(function)))
            }

            ExprKind::Array { elements, .. } => {
                let mut values: Vec<Value> = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::Array(Rc::new(LoxArray::from_values(values))))
            }
        }
    }

    fn binary(&mut self, left: Value, operator: &Token, right: Value) -> Result<Value> {
        if let Some(result) = self.overloaded(&left, operator, &right)? {
            return Ok(result);
        }

        use TokenType as T;
        use Value::{Bool, Number};

        match (&operator.token_type, left, right) {
            (T::PLUS, Number(a), Number(b)) => Ok(Number(a + b)),
            (T::PLUS, Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (T::PLUS, _, _) => Err(LoxError::runtime(
                operator,
                "Operands must be two numbers or two strings.",
            )),

            (T::EQUAL_EQUAL, a, b) => Ok(Bool(a == b)),
            (T::BANG_EQUAL, a, b) => Ok(Bool(a != b)),

            (T::SLASH | T::PERCENT, Number(_), Number(b)) if b == 0.0 => {
                Err(LoxError::runtime(operator, "Division by zero."))
            }

            (T::MINUS, Number(a), Number(b)) => Ok(Number(a - b)),
            (T::STAR, Number(a), Number(b)) => Ok(Number(a * b)),
            (T::SLASH, Number(a), Number(b)) => Ok(Number(a / b)),
            (T::PERCENT, Number(a), Number(b)) => Ok(Number(a % b)),
            (T::GREATER, Number(a), Number(b)) => Ok(Bool(a > b)),
            (T::GREATER_EQUAL, Number(a), Number(b)) => Ok(Bool(a >= b)),
            (T::LESS, Number(a), Number(b)) => Ok(Bool(a < b)),
            (T::LESS_EQUAL, Number(a), Number(b)) => Ok(Bool(a <= b)),

            _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
        }
    }

    /// Dispatch to a `class operator` method when either operand is an
    /// instance whose class (left first) defines one.
    fn overloaded(&mut self, left: &Value, operator: &Token, right: &Value) -> Result<Option<Value>> {
        let found = [left, right].into_iter().find_map(|operand| match operand {
            Value::Instance(instance) => instance
                .class
                .find_static(&operator.lexeme)
                .map(|method| (Rc::clone(&instance.class), method)),
            _ => None,
        });

        let Some((class, method)) = found else {
            return Ok(None);
        };

        debug!(
            "Operator '{}' overloaded by class '{}'",
            operator.lexeme, class.name
        );

        let bound = method.bind(Value::Class(class));
        let result = self.invoke(&bound, vec![left.clone(), right.clone()], operator)?;
        Ok(Some(result))
    }

    fn look_up(&self, name: &Token, id: NodeId) -> Result<Value> {
        let value = match self.resolutions.slot(id) {
            Some(slot) => Environment::get_at(&self.environment, slot.depth, slot.index),
            None => self.globals.get(&name.lexeme).cloned(),
        };

        value.ok_or_else(|| {
            LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
        })
    }

    fn assign(&mut self, name: &Token, id: NodeId, value: Value) -> Result<()> {
        let assigned = match self.resolutions.slot(id) {
            Some(slot) => Environment::assign_at(&self.environment, slot.depth, slot.index, value),
            None => match self.globals.get_mut(&name.lexeme) {
                Some(global) => {
                    *global = value;
                    true
                }
                None => false,
            },
        };

        if assigned {
            Ok(())
        } else {
            Err(LoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    fn evaluate_array(&mut self, object: &Expr, bracket: &Token) -> Result<Rc<LoxArray>> {
        match self.evaluate(object)? {
            Value::Array(array) => Ok(array),
            _ => Err(LoxError::runtime(bracket, "Only arrays can be indexed.")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────

    fn get_property(&mut self, object: Value, name: &Token) -> Result<Value> {
        let method = match &object {
            Value::Instance(instance) => {
                if let Some(field) = instance.field(&name.lexeme) {
                    return Ok(field);
                }
                instance.class.find_method(&name.lexeme)
            }

            Value::Class(class) => class.find_static(&name.lexeme),

            Value::Array(array) => {
                return stdlib::array_member(array, &name.lexeme)
                    .ok_or_else(|| undefined_property(name));
            }

            _ => return Err(LoxError::runtime(name, "Only instances have properties.")),
        };

        match method {
            Some(method) => self.bound_member(method.bind(object), name),
            None => Err(undefined_property(name)),
        }
    }

    fn super_method(&mut self, keyword: &Token, method: &Token, id: NodeId) -> Result<Value> {
        let Some(slot) = self.resolutions.slot(id) else {
            return Err(LoxError::runtime(keyword, "Undefined variable 'super'."));
        };

        let superclass = Environment::get_at(&self.environment, slot.depth, 0);
        let this = slot
            .depth
            .checked_sub(1)
            .and_then(|depth| Environment::get_at(&self.environment, depth, 0))
            .unwrap_or(Value::Nil);

        let Some(Value::Class(superclass)) = superclass else {
            return Err(LoxError::runtime(keyword, "Superclass must be a class."));
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => self.bound_member(found.bind(this), method),
            None => Err(undefined_property(method)),
        }
    }

    /// Getters run on access; other methods become bound values.
    fn bound_member(&mut self, bound: LoxFunction, name: &Token) -> Result<Value> {
        if bound.is_getter() {
            self.invoke(&bound, Vec::new(), name)
        } else {
            Ok(Value::Function(Rc::new(bound)))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    fn call_value(&mut self, callee: Value, args: Vec<Value>, paren: &Token) -> Result<Value> {
        match callee {
            Value::Native(native) => self.invoke(native.as_ref(), args, paren),
            Value::Function(function) => self.invoke(function.as_ref(), args, paren),
            Value::Class(class) => self.invoke(&class, args, paren),
            _ => Err(LoxError::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Arity and depth checks around every call.
    fn invoke(&mut self, callable: &dyn Callable, args: Vec<Value>, paren: &Token) -> Result<Value> {
        if args.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    args.len()
                ),
            ));
        }

        if self.call_depth >= self.max_call_depth {
            return Err(LoxError::runtime(paren, "Stack overflow."));
        }

        self.call_depth += 1;
        let result = callable.call(self, args, paren);
        self.call_depth -= 1;

        result
    }
}

fn undefined_property(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined property '{}'.", name.lexeme))
}
