//! Descriptors for callable kinds: function, lambda, builtin function
//!
//! Invoking a script function or lambda is interpreter work and happens
//! outside the runtime core; here the callables only need identity, truth,
//! and their display forms. Builtin functions are host closures and can be
//! invoked directly.

use crate::runtime::error::RtResult;
use crate::runtime::types::TypeDescriptor;
use crate::runtime::value::Value;

pub struct FunctionType;

impl TypeDescriptor for FunctionType {
    fn name(&self) -> &'static str {
        "function"
    }

    fn get_member(
        &self,
        this: &Value,
        name: &str,
    ) -> RtResult<Value> {
        if let Value::Function(def) = this {
            // Introspection members mirror the definition.
            match name {
                "name" => return Ok(Value::string(&def.name)),
                "arity" => return Ok(Value::int(def.params.len() as i64)),
                _ => {}
            }
        }
        Err(crate::runtime::error::RuntimeError::Attribute(format!(
            "Type 'function' has no member '{name}'"
        )))
    }
}

pub struct LambdaType;

impl TypeDescriptor for LambdaType {
    fn name(&self) -> &'static str {
        "lambda"
    }
}

pub struct BuiltinFnType;

impl TypeDescriptor for BuiltinFnType {
    fn name(&self) -> &'static str {
        "builtin_function"
    }

    fn call_method(
        &self,
        this: &Value,
        name: &str,
        args: &[Value],
    ) -> RtResult<Value> {
        // `f.call(args...)` is the one method builtins answer directly.
        if let (Value::Builtin(builtin), "call") = (this, name) {
            return (builtin.func)(args);
        }
        Err(crate::runtime::error::RuntimeError::Attribute(format!(
            "Type 'builtin_function' has no method '{name}'"
        )))
    }
}
