//! Type dispatch registry
//!
//! One descriptor per value variant, each implementing the uniform
//! [`TypeDescriptor`] protocol. This is the dynamic-dispatch substitute for
//! language-level operator overloading: every script-visible operation on a
//! value goes `value.op(..) -> descriptor.op(value, ..)`, and descriptors
//! override only the operations that make sense for their kind. The abstract
//! defaults report "unsupported operation" as typed errors.
//!
//! Descriptors are stateless unit structs held in `static` items, so the
//! whole registry exists before any code can race on it; there is no lazy
//! initialization to synchronize.

pub mod callable;
pub mod collection;
pub mod object;
pub mod scalar;
pub mod text;

pub use callable::{BuiltinFnType, FunctionType, LambdaType};
pub use collection::{DictType, ListType};
pub use object::{
    ClassType, ExceptionType, FileType, InstanceType, InterfaceType, ModuleType,
    NativeInstanceType, PromiseType,
};
pub use scalar::{BoolType, FloatType, IntType, NoneType};
pub use text::StrType;

use std::rc::Rc;

use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::value::Value;

/// The uniform operation protocol every value kind implements.
///
/// All methods take the value itself (and at most one operand) by handle; a
/// kind that does not support an operation inherits the default, which
/// reports a typed "unsupported" error naming the kind.
pub trait TypeDescriptor {
    /// The script-visible name of this kind.
    fn name(&self) -> &'static str;

    fn add(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        Err(self.unsupported_binary("+", this, other))
    }

    fn subtract(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        Err(self.unsupported_binary("-", this, other))
    }

    fn multiply(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        Err(self.unsupported_binary("*", this, other))
    }

    fn divide(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        Err(self.unsupported_binary("/", this, other))
    }

    fn modulo(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        Err(self.unsupported_binary("%", this, other))
    }

    fn power(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        Err(self.unsupported_binary("**", this, other))
    }

    fn negate(
        &self,
        this: &Value,
    ) -> RtResult<Value> {
        let _ = this;
        Err(RuntimeError::Type(format!(
            "Unsupported operand type for unary -: {}",
            self.name()
        )))
    }

    /// Truthiness. Everything is truthy unless its kind says otherwise.
    fn is_truthy(
        &self,
        this: &Value,
    ) -> bool {
        let _ = this;
        true
    }

    /// Equality. The default is reference identity.
    fn equals(
        &self,
        this: &Value,
        other: &Value,
    ) -> bool {
        identity_equals(this, other)
    }

    /// Three-way comparison: -1, 0, or 1. Incomparable pairs are errors.
    fn compare(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<i32> {
        let _ = this;
        Err(RuntimeError::Type(format!(
            "Cannot compare {} with {}",
            self.name(),
            other.type_name()
        )))
    }

    fn get_item(
        &self,
        this: &Value,
        index: &Value,
    ) -> RtResult<Value> {
        let _ = (this, index);
        Err(RuntimeError::Type(format!(
            "Type '{}' is not subscriptable",
            self.name()
        )))
    }

    fn set_item(
        &self,
        this: &Value,
        index: &Value,
        value: Value,
    ) -> RtResult<()> {
        let _ = (this, index, value);
        Err(RuntimeError::Type(format!(
            "Type '{}' does not support item assignment",
            self.name()
        )))
    }

    fn get_member(
        &self,
        this: &Value,
        name: &str,
    ) -> RtResult<Value> {
        let _ = this;
        Err(RuntimeError::Attribute(format!(
            "Type '{}' has no member '{}'",
            self.name(),
            name
        )))
    }

    fn set_member(
        &self,
        this: &Value,
        name: &str,
        value: Value,
    ) -> RtResult<()> {
        let _ = (this, value);
        Err(RuntimeError::Attribute(format!(
            "Type '{}' has no member '{}'",
            self.name(),
            name
        )))
    }

    fn call_method(
        &self,
        this: &Value,
        name: &str,
        args: &[Value],
    ) -> RtResult<Value> {
        let _ = (this, args);
        Err(RuntimeError::Attribute(format!(
            "Type '{}' has no method '{}'",
            self.name(),
            name
        )))
    }

    fn contains(
        &self,
        this: &Value,
        item: &Value,
    ) -> RtResult<bool> {
        let _ = (this, item);
        Err(RuntimeError::Type(format!(
            "Type '{}' does not support membership tests",
            self.name()
        )))
    }

    fn length(
        &self,
        this: &Value,
    ) -> RtResult<i64> {
        let _ = this;
        Err(RuntimeError::Type(format!(
            "Type '{}' has no length",
            self.name()
        )))
    }

    fn slice(
        &self,
        this: &Value,
        start: &Value,
        end: &Value,
        step: &Value,
    ) -> RtResult<Value> {
        let _ = (this, start, end, step);
        Err(RuntimeError::Type(format!(
            "Type '{}' does not support slicing",
            self.name()
        )))
    }

    #[doc(hidden)]
    fn unsupported_binary(
        &self,
        op: &str,
        this: &Value,
        other: &Value,
    ) -> RuntimeError {
        let _ = this;
        RuntimeError::Type(format!(
            "Unsupported operand types for {}: {} and {}",
            op,
            self.name(),
            other.type_name()
        ))
    }
}

// ============================================================================
// Registry
// ============================================================================

static NONE_TYPE: NoneType = NoneType;
static BOOL_TYPE: BoolType = BoolType;
static INT_TYPE: IntType = IntType;
static FLOAT_TYPE: FloatType = FloatType;
static STR_TYPE: StrType = StrType;
static LIST_TYPE: ListType = ListType;
static DICT_TYPE: DictType = DictType;
static FUNCTION_TYPE: FunctionType = FunctionType;
static LAMBDA_TYPE: LambdaType = LambdaType;
static BUILTIN_TYPE: BuiltinFnType = BuiltinFnType;
static CLASS_TYPE: ClassType = ClassType;
static INSTANCE_TYPE: InstanceType = InstanceType;
static INTERFACE_TYPE: InterfaceType = InterfaceType;
static EXCEPTION_TYPE: ExceptionType = ExceptionType;
static FILE_TYPE: FileType = FileType;
static PROMISE_TYPE: PromiseType = PromiseType;
static MODULE_TYPE: ModuleType = ModuleType;
static NATIVE_INSTANCE_TYPE: NativeInstanceType = NativeInstanceType;

/// Resolve a value's descriptor. Exhaustive over the closed variant set, so
/// adding a variant without a descriptor fails to compile.
pub fn descriptor_for(value: &Value) -> &'static dyn TypeDescriptor {
    match value {
        Value::None => &NONE_TYPE,
        Value::Bool(_) => &BOOL_TYPE,
        Value::Int(_) => &INT_TYPE,
        Value::Float(_) => &FLOAT_TYPE,
        Value::Str(_) => &STR_TYPE,
        Value::List(_) => &LIST_TYPE,
        Value::Dict(_) => &DICT_TYPE,
        Value::Function(_) => &FUNCTION_TYPE,
        Value::Lambda(_) => &LAMBDA_TYPE,
        Value::Builtin(_) => &BUILTIN_TYPE,
        Value::Class(_) => &CLASS_TYPE,
        Value::Instance(_) => &INSTANCE_TYPE,
        Value::Interface(_) => &INTERFACE_TYPE,
        Value::Exception(_) => &EXCEPTION_TYPE,
        Value::File(_) => &FILE_TYPE,
        Value::Promise(_) => &PROMISE_TYPE,
        Value::Module(_) => &MODULE_TYPE,
        Value::NativeInstance(_) => &NATIVE_INSTANCE_TYPE,
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Reference identity for shared variants, value identity for inline ones.
/// This is the `equals` fallback for kinds without their own notion of
/// equality.
pub(crate) fn identity_equals(
    a: &Value,
    b: &Value,
) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => Rc::ptr_eq(x, y),
        (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
        (Value::Dict(x), Value::Dict(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Lambda(x), Value::Lambda(y)) => Rc::ptr_eq(x, y),
        (Value::Builtin(x), Value::Builtin(y)) => Rc::ptr_eq(x, y),
        (Value::Class(x), Value::Class(y)) => Rc::ptr_eq(x, y),
        (Value::Instance(x), Value::Instance(y)) => Rc::ptr_eq(x, y),
        (Value::Interface(x), Value::Interface(y)) => Rc::ptr_eq(x, y),
        (Value::Exception(x), Value::Exception(y)) => Rc::ptr_eq(x, y),
        (Value::File(x), Value::File(y)) => Rc::ptr_eq(x, y),
        (Value::Promise(x), Value::Promise(y)) => x.ptr_eq(y),
        (Value::Module(x), Value::Module(y)) => Rc::ptr_eq(x, y),
        (Value::NativeInstance(x), Value::NativeInstance(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// A normalized slice plan over a sequence of known length.
#[derive(Debug)]
pub(crate) struct SlicePlan {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl SlicePlan {
    /// Indices selected by the plan, in order.
    pub fn indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut i = self.start;
        if self.step > 0 {
            while i < self.end {
                out.push(i as usize);
                i += self.step;
            }
        } else {
            while i > self.end {
                out.push(i as usize);
                i += self.step;
            }
        }
        out
    }
}

/// Resolve `[start:end:step]` operands against a sequence length.
///
/// `none` operands take their defaults (which flip when the step is
/// negative), negative indices wrap from the end, out-of-range bounds clamp,
/// and a zero step is a `ValueError`.
pub(crate) fn resolve_slice(
    len: i64,
    start: &Value,
    end: &Value,
    step: &Value,
) -> RtResult<SlicePlan> {
    let step = match step {
        Value::None => 1,
        Value::Int(i) => i.value,
        other => {
            return Err(RuntimeError::Type(format!(
                "Slice step must be an integer, got {}",
                other.type_name()
            )))
        }
    };
    if step == 0 {
        return Err(RuntimeError::Value("Slice step cannot be zero".to_string()));
    }

    let resolve_bound = |bound: &Value, default: i64| -> RtResult<i64> {
        match bound {
            Value::None => Ok(default),
            Value::Int(i) => {
                let mut idx = i.value;
                if idx < 0 {
                    idx += len;
                }
                Ok(if step > 0 {
                    idx.clamp(0, len)
                } else {
                    idx.clamp(-1, len - 1)
                })
            }
            other => Err(RuntimeError::Type(format!(
                "Slice index must be an integer, got {}",
                other.type_name()
            ))),
        }
    };

    let (default_start, default_end) = if step > 0 { (0, len) } else { (len - 1, -1) };
    Ok(SlicePlan {
        start: resolve_bound(start, default_start)?,
        end: resolve_bound(end, default_end)?,
        step,
    })
}

/// Wrap a possibly-negative sequence index and bounds-check it.
pub(crate) fn resolve_index(
    len: i64,
    index: i64,
    what: &str,
) -> RtResult<usize> {
    let idx = if index < 0 { index + len } else { index };
    if idx < 0 || idx >= len {
        return Err(RuntimeError::Index(format!("{what} index out of bounds")));
    }
    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_names_match_kinds() {
        assert_eq!(descriptor_for(&Value::None).name(), "none");
        assert_eq!(descriptor_for(&Value::int(1)).name(), "int");
        assert_eq!(descriptor_for(&Value::string("x")).name(), "string");
        assert_eq!(descriptor_for(&Value::list(vec![])).name(), "list");
    }

    #[test]
    fn test_default_operations_report_typed_errors() {
        let none = Value::None;
        assert!(matches!(
            none.add(&Value::int(1)).unwrap_err(),
            RuntimeError::Type(_)
        ));
        assert!(matches!(none.length().unwrap_err(), RuntimeError::Type(_)));
        assert!(matches!(
            none.get_member("x").unwrap_err(),
            RuntimeError::Attribute(_)
        ));
    }

    #[test]
    fn test_identity_equals_for_shared_payloads() {
        let a = Value::list(vec![Value::int(1)]);
        let alias = a.clone();
        let b = Value::list(vec![Value::int(1)]);
        assert!(identity_equals(&a, &alias));
        assert!(!identity_equals(&a, &b));
    }

    #[test]
    fn test_resolve_slice_defaults_flip_for_negative_step() {
        let plan = resolve_slice(5, &Value::None, &Value::None, &Value::int(-1)).unwrap();
        assert_eq!(plan.indices(), vec![4, 3, 2, 1, 0]);

        let plan = resolve_slice(5, &Value::int(1), &Value::int(4), &Value::None).unwrap();
        assert_eq!(plan.indices(), vec![1, 2, 3]);
    }

    #[test]
    fn test_resolve_slice_rejects_zero_step() {
        let err = resolve_slice(3, &Value::None, &Value::None, &Value::int(0)).unwrap_err();
        assert!(matches!(err, RuntimeError::Value(_)));
    }
}
