//! Runtime object model.
//!
//! [`Value`] is the single tagged type every expression evaluates to.
//! Reference kinds (functions, classes, instances, arrays) are `Rc`‑shared
//! so that mutation through one handle is visible through all of them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::token::Token;

/// Host behaviour of a native function. Failures carry only a message; the
/// interpreter attaches the call site.
pub type NativeFn = dyn Fn(&[Value]) -> std::result::Result<Value, String>;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Native(Rc<NativeFunction>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<LoxInstance>),
    Array(Rc<LoxArray>),
}

impl Value {
    /// `nil` and `false` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Name reported by `typeof`.
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "nil".into(),
            Value::Bool(_) => "boolean".into(),
            Value::Number(_) => "number".into(),
            Value::String(_) => "string".into(),
            Value::Native(_) | Value::Function(_) => "callable".into(),
            Value::Class(class) => class.name.clone(),
            Value::Instance(instance) => instance.class.name.clone(),
            Value::Array(_) => "array".into(),
        }
    }
}

impl PartialEq for Value {
    /// Value equality for primitives, identity for reference kinds.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Native(native) => write!(f, "<native fn {}>", native.name),

            Value::Function(function) => write!(f, "{}", function),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),

            Value::Array(array) => fmt_array(array, &mut Vec::new(), f),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

/// Anything that can appear before `(`.
pub trait Callable {
    fn arity(&self) -> usize;

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, paren: &Token)
        -> Result<Value>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Native functions
// ─────────────────────────────────────────────────────────────────────────────

pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + 'static,
    {
        NativeFunction {
            name: name.to_string(),
            arity,
            func: Box::new(func),
        }
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _: &mut Interpreter, arguments: Vec<Value>, paren: &Token) -> Result<Value> {
        (self.func)(&arguments).map_err(|message| LoxError::runtime(paren, message))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User functions
// ─────────────────────────────────────────────────────────────────────────────

/// A declaration closed over the frame active when it was evaluated.
pub struct LoxFunction {
    pub decl: Rc<FunctionDecl>,
    pub closure: EnvRef,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(decl: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        LoxFunction {
            decl,
            closure,
            is_initializer,
        }
    }

    pub fn is_getter(&self) -> bool {
        self.decl.is_getter
    }

    /// A copy whose closure is a fresh frame holding `this` at slot 0.
    pub fn bind(&self, this: Value) -> LoxFunction {
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure), 1);
        env.define(this);

        LoxFunction::new(Rc::clone(&self.decl), env.into_ref(), self.is_initializer)
    }

    fn bound_this(&self) -> Value {
        Environment::get_at(&self.closure, 0, 0).unwrap_or(Value::Nil)
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.decl.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, _: &Token) -> Result<Value> {
        let capacity = interpreter.scope_size(self.decl.id, arguments.len());
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure), capacity);

        for argument in arguments {
            env.define(argument);
        }

        let flow = interpreter.execute_block(&self.decl.body, env.into_ref())?;

        if self.is_initializer {
            return Ok(self.bound_this());
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break => Ok(Value::Nil),
        }
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decl.is_lambda {
            write!(f, "<fn>")
        } else {
            write!(f, "<fn {}>", self.decl.name.lexeme)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classes and instances
// ─────────────────────────────────────────────────────────────────────────────

pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,

    /// Holder of the static and operator methods; `None` on a metaclass.
    pub metaclass: Option<Rc<LoxClass>>,
}

impl LoxClass {
    /// Own methods first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass.as_ref()?.find_method(name)
    }

    /// Static (or operator) method lookup through the metaclass chain.
    pub fn find_static(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.metaclass.as_ref()?.find_method(name)
    }
}

impl Callable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        self.find_method("init")
            .filter(|init| init.is_initializer)
            .map_or(0, |init| init.arity())
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, paren: &Token) -> Result<Value> {
        let instance = Value::Instance(Rc::new(LoxInstance::new(Rc::clone(self))));

        if let Some(init) = self.find_method("init").filter(|init| init.is_initializer) {
            init.bind(instance.clone())
                .call(interpreter, arguments, paren)?;
        }

        Ok(instance)
    }
}

pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        LoxInstance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Arrays
// ─────────────────────────────────────────────────────────────────────────────

/// Largest length `Array(n)` will allocate.
pub const MAX_ARRAY_LEN: usize = 1 << 26;

/// Fixed‑length, mutable element storage.
pub struct LoxArray {
    elements: RefCell<Box<[Value]>>,
}

impl LoxArray {
    /// `size` slots, all `nil`. Fails instead of aborting when the storage
    /// cannot be allocated.
    pub fn new(size: usize) -> std::result::Result<Self, String> {
        if size > MAX_ARRAY_LEN {
            return Err("Array size too large.".to_string());
        }

        let mut values: Vec<Value> = Vec::new();
        values
            .try_reserve_exact(size)
            .map_err(|_| "Array size too large.".to_string())?;
        values.resize(size, Value::Nil);

        Ok(Self::from_values(values))
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        LoxArray {
            elements: RefCell::new(values.into_boxed_slice()),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: &Value) -> std::result::Result<Value, String> {
        let i = self.checked_index(index)?;
        Ok(self.elements.borrow()[i].clone())
    }

    pub fn set(&self, index: &Value, value: Value) -> std::result::Result<(), String> {
        let i = self.checked_index(index)?;
        self.elements.borrow_mut()[i] = value;
        Ok(())
    }

    /// Truncate to an integer and bounds‑check.
    fn checked_index(&self, index: &Value) -> std::result::Result<usize, String> {
        let Value::Number(n) = index else {
            return Err("Index must be a number.".to_string());
        };

        let i = n.trunc();
        if i.is_nan() || i < 0.0 || i >= self.len() as f64 {
            return Err("Index out of range.".to_string());
        }

        Ok(i as usize)
    }
}

/// `[a, b, c]`. `open` holds the arrays currently being printed further up;
/// reaching one of them again prints `[...]`.
fn fmt_array(
    array: &Rc<LoxArray>,
    open: &mut Vec<*const LoxArray>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    open.push(Rc::as_ptr(array));
    write!(f, "[")?;

    for (i, element) in array.elements.borrow().iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match element {
            Value::Array(inner) if open.contains(&Rc::as_ptr(inner)) => write!(f, "[...]")?,
            Value::Array(inner) => fmt_array(inner, open, f)?,
            other => write!(f, "{}", other)?,
        }
    }

    open.pop();
    write!(f, "]")
}
