//! Built‑in globals and array members.

use std::rc::Rc;

use chrono::Utc;
use log::debug;

use crate::value::{LoxArray, NativeFunction, Value};

/// `(name, value)` pairs installed into a fresh global table.
pub fn globals() -> Vec<(&'static str, Value)> {
    vec![
        ("clock", native("clock", 0, clock)),
        ("typeof", native("typeof", 1, type_of)),
        ("Array", native("Array", 1, array)),
    ]
}

fn native<F>(name: &str, arity: usize, func: F) -> Value
where
    F: Fn(&[Value]) -> Result<Value, String> + 'static,
{
    Value::Native(Rc::new(NativeFunction::new(name, arity, func)))
}

/// Seconds since the Unix epoch, with millisecond precision.
fn clock(_: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(Utc::now().timestamp_millis() as f64 / 1000.0))
}

fn type_of(args: &[Value]) -> Result<Value, String> {
    let name = args.first().map_or_else(|| "nil".to_string(), Value::type_name);
    Ok(Value::String(name))
}

fn array(args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::Number(n)) if n.is_finite() && *n >= 0.0 => {
            // Saturates; oversized requests are rejected by `LoxArray::new`.
            let size = n.trunc() as usize;
            debug!("Allocating array of {} slot(s)", size);
            Ok(Value::Array(Rc::new(LoxArray::new(size)?)))
        }
        _ => Err("Array size must be a non-negative number.".to_string()),
    }
}

/// `length`, `get` or `set` on `target`; `None` for any other name.
pub fn array_member(target: &Rc<LoxArray>, name: &str) -> Option<Value> {
    match name {
        "length" => Some(Value::Number(target.len() as f64)),

        "get" => {
            let target = Rc::clone(target);
            Some(native("get", 1, move |args| target.get(&args[0])))
        }

        "set" => {
            let target = Rc::clone(target);
            Some(native("set", 2, move |args| {
                target.set(&args[0], args[1].clone())?;
                Ok(args[1].clone())
            }))
        }

        _ => None,
    }
}
