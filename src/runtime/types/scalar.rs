//! Descriptors for the scalar kinds: none, bool, int, float
//!
//! Integer arithmetic is where the kind machinery earns its keep: operands
//! promote through `promote_kinds`, results re-box into a kind that fits
//! (widening when the promoted kind is too small), and anything that cannot
//! be absorbed by a 64-bit kind raises `OverflowError` instead of wrapping.

use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::int_kind::{promote_kinds, smallest_kind_for_value, IntKind};
use crate::runtime::types::{identity_equals, TypeDescriptor};
use crate::runtime::value::{IntValue, Value};

/// Descriptor for the none value.
pub struct NoneType;

impl TypeDescriptor for NoneType {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_truthy(
        &self,
        _this: &Value,
    ) -> bool {
        false
    }

    fn equals(
        &self,
        _this: &Value,
        other: &Value,
    ) -> bool {
        matches!(other, Value::None)
    }
}

/// Descriptor for booleans.
pub struct BoolType;

impl TypeDescriptor for BoolType {
    fn name(&self) -> &'static str {
        "bool"
    }

    fn is_truthy(
        &self,
        this: &Value,
    ) -> bool {
        matches!(this, Value::Bool(true))
    }

    fn equals(
        &self,
        this: &Value,
        other: &Value,
    ) -> bool {
        identity_equals(this, other)
    }

    fn compare(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<i32> {
        match (this, other) {
            // false < true
            (Value::Bool(a), Value::Bool(b)) => Ok((*a as i32) - (*b as i32)),
            _ => Err(RuntimeError::Type(format!(
                "Cannot compare bool with {}",
                other.type_name()
            ))),
        }
    }
}

/// Re-box an arithmetic result: keep the promoted kind when the value fits,
/// otherwise widen to the smallest kind that holds it.
fn refit(
    value: i64,
    kind: IntKind,
) -> Value {
    let kind = if kind.value_fits(value) {
        kind
    } else {
        smallest_kind_for_value(value, kind.is_signed())
    };
    Value::int_with_kind(value, kind)
}

fn expect_int(this: &Value) -> IntValue {
    match this {
        Value::Int(i) => *i,
        other => unreachable!("int descriptor dispatched on {}", other.type_name()),
    }
}

fn expect_float(this: &Value) -> f64 {
    match this {
        Value::Float(v) => *v,
        other => unreachable!("float descriptor dispatched on {}", other.type_name()),
    }
}

/// Descriptor for kind-tagged integers.
pub struct IntType;

impl IntType {
    fn checked_op(
        op: &str,
        a: IntValue,
        b: IntValue,
        apply: fn(i64, i64) -> Option<i64>,
    ) -> RtResult<Value> {
        match apply(a.value, b.value) {
            Some(result) => Ok(refit(result, promote_kinds(a.kind, b.kind))),
            None => Err(RuntimeError::Overflow(format!(
                "Integer overflow in {op}: {} {op} {}",
                a.value, b.value
            ))),
        }
    }
}

impl TypeDescriptor for IntType {
    fn name(&self) -> &'static str {
        "int"
    }

    fn add(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_int(this);
        match other {
            Value::Int(b) => Self::checked_op("+", a, *b, i64::checked_add),
            Value::Float(b) => Ok(Value::Float(a.value as f64 + b)),
            _ => Err(self.unsupported_binary("+", this, other)),
        }
    }

    fn subtract(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_int(this);
        match other {
            Value::Int(b) => Self::checked_op("-", a, *b, i64::checked_sub),
            Value::Float(b) => Ok(Value::Float(a.value as f64 - b)),
            _ => Err(self.unsupported_binary("-", this, other)),
        }
    }

    fn multiply(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_int(this);
        match other {
            Value::Int(b) => Self::checked_op("*", a, *b, i64::checked_mul),
            Value::Float(b) => Ok(Value::Float(a.value as f64 * b)),
            // int * string repeats the string
            Value::Str(s) => {
                let count = a.value.max(0) as usize;
                Ok(Value::string(s.repeat(count)))
            }
            _ => Err(self.unsupported_binary("*", this, other)),
        }
    }

    fn divide(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_int(this);
        match other {
            Value::Int(b) => {
                if b.value == 0 {
                    return Err(RuntimeError::ZeroDivision("Division by zero".to_string()));
                }
                // Exact quotients stay integral; inexact ones promote to
                // float. checked_rem is None only for i64::MIN % -1, which
                // is exactly zero.
                let exact = a.value.checked_rem(b.value).map_or(true, |r| r == 0);
                if exact {
                    Self::checked_op("/", a, *b, i64::checked_div)
                } else {
                    Ok(Value::Float(a.value as f64 / b.value as f64))
                }
            }
            Value::Float(b) => {
                if *b == 0.0 {
                    return Err(RuntimeError::ZeroDivision("Division by zero".to_string()));
                }
                Ok(Value::Float(a.value as f64 / b))
            }
            _ => Err(self.unsupported_binary("/", this, other)),
        }
    }

    fn modulo(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_int(this);
        match other {
            Value::Int(b) => {
                if b.value == 0 {
                    return Err(RuntimeError::ZeroDivision("Modulo by zero".to_string()));
                }
                // i64::MIN % -1 is zero, though checked_rem declines to say
                // so.
                if b.value == -1 {
                    return Ok(refit(0, promote_kinds(a.kind, b.kind)));
                }
                Self::checked_op("%", a, *b, i64::checked_rem)
            }
            Value::Float(b) => {
                if *b == 0.0 {
                    return Err(RuntimeError::ZeroDivision("Modulo by zero".to_string()));
                }
                Ok(Value::Float((a.value as f64) % b))
            }
            _ => Err(self.unsupported_binary("%", this, other)),
        }
    }

    fn power(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_int(this);
        match other {
            Value::Int(b) => {
                // Negative exponents leave the integers.
                if b.value < 0 {
                    return Ok(Value::Float((a.value as f64).powf(b.value as f64)));
                }
                let exact = u32::try_from(b.value)
                    .ok()
                    .and_then(|exp| a.value.checked_pow(exp));
                match exact {
                    Some(result) => {
                        // Stay integral, widening past 32 bits before ever
                        // considering float.
                        let kind = promote_kinds(a.kind, b.kind);
                        Ok(refit(result, kind))
                    }
                    // Magnitude exceeds every integer kind.
                    None => Ok(Value::Float((a.value as f64).powf(b.value as f64))),
                }
            }
            Value::Float(b) => Ok(Value::Float((a.value as f64).powf(*b))),
            _ => Err(self.unsupported_binary("**", this, other)),
        }
    }

    fn negate(
        &self,
        this: &Value,
    ) -> RtResult<Value> {
        let a = expect_int(this);
        match a.value.checked_neg() {
            // Negating a kind's minimum widens instead of wrapping.
            Some(result) => Ok(refit(result, a.kind)),
            None => Err(RuntimeError::Overflow(format!(
                "Integer overflow negating {}",
                a.value
            ))),
        }
    }

    fn is_truthy(
        &self,
        this: &Value,
    ) -> bool {
        expect_int(this).value != 0
    }

    fn equals(
        &self,
        this: &Value,
        other: &Value,
    ) -> bool {
        let a = expect_int(this);
        match other {
            // Kind never matters for equality, only the payload.
            Value::Int(b) => a.value == b.value,
            Value::Float(b) => a.value as f64 == *b,
            _ => false,
        }
    }

    fn compare(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<i32> {
        let a = expect_int(this);
        match other {
            Value::Int(b) => Ok(match a.value.cmp(&b.value) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            }),
            Value::Float(b) => Ok(compare_floats(a.value as f64, *b)),
            _ => Err(RuntimeError::Type(format!(
                "Cannot compare int with {}",
                other.type_name()
            ))),
        }
    }
}

fn compare_floats(
    a: f64,
    b: f64,
) -> i32 {
    if a < b {
        -1
    } else if a > b {
        1
    } else {
        0
    }
}

/// Descriptor for 64-bit floats.
pub struct FloatType;

impl FloatType {
    fn other_as_f64(other: &Value) -> Option<f64> {
        match other {
            Value::Float(v) => Some(*v),
            Value::Int(i) => Some(i.value as f64),
            _ => None,
        }
    }
}

impl TypeDescriptor for FloatType {
    fn name(&self) -> &'static str {
        "float"
    }

    fn add(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_float(this);
        match Self::other_as_f64(other) {
            Some(b) => Ok(Value::Float(a + b)),
            None => Err(self.unsupported_binary("+", this, other)),
        }
    }

    fn subtract(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_float(this);
        match Self::other_as_f64(other) {
            Some(b) => Ok(Value::Float(a - b)),
            None => Err(self.unsupported_binary("-", this, other)),
        }
    }

    fn multiply(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_float(this);
        match Self::other_as_f64(other) {
            Some(b) => Ok(Value::Float(a * b)),
            None => Err(self.unsupported_binary("*", this, other)),
        }
    }

    fn divide(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_float(this);
        match Self::other_as_f64(other) {
            // Float division by zero raises, it never yields inf/NaN.
            Some(b) if b == 0.0 => {
                Err(RuntimeError::ZeroDivision("Division by zero".to_string()))
            }
            Some(b) => Ok(Value::Float(a / b)),
            None => Err(self.unsupported_binary("/", this, other)),
        }
    }

    fn modulo(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_float(this);
        match Self::other_as_f64(other) {
            Some(b) if b == 0.0 => Err(RuntimeError::ZeroDivision("Modulo by zero".to_string())),
            Some(b) => Ok(Value::Float(a % b)),
            None => Err(self.unsupported_binary("%", this, other)),
        }
    }

    fn power(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_float(this);
        match Self::other_as_f64(other) {
            Some(b) => Ok(Value::Float(a.powf(b))),
            None => Err(self.unsupported_binary("**", this, other)),
        }
    }

    fn negate(
        &self,
        this: &Value,
    ) -> RtResult<Value> {
        Ok(Value::Float(-expect_float(this)))
    }

    fn is_truthy(
        &self,
        this: &Value,
    ) -> bool {
        expect_float(this) != 0.0
    }

    fn equals(
        &self,
        this: &Value,
        other: &Value,
    ) -> bool {
        let a = expect_float(this);
        match other {
            Value::Float(b) => a == *b,
            Value::Int(b) => a == b.value as f64,
            _ => false,
        }
    }

    fn compare(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<i32> {
        let a = expect_float(this);
        match Self::other_as_f64(other) {
            Some(b) => Ok(compare_floats(a, b)),
            None => Err(RuntimeError::Type(format!(
                "Cannot compare float with {}",
                other.type_name()
            ))),
        }
    }
}
