//! Host <-> dynamic value conversion
//!
//! The two directions are asymmetric by design. Host-to-dynamic
//! ([`IntoValue`]) is total: every supported host type maps to exactly one
//! value variant. Dynamic-to-host ([`FromValue`]) is fallible: an integer
//! value converts to any integral host type that can hold its payload, floats
//! and integers interconvert where lossless, and a wrong dynamic kind is a
//! typed conversion error, never a silent default.

use indexmap::IndexMap;

use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::value::Value;

/// Host-to-dynamic conversion.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Dynamic-to-host conversion.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> RtResult<Self>;
}

fn expected(
    what: &str,
    got: &Value,
) -> RuntimeError {
    RuntimeError::Type(format!("Expected {}, got {}", what, got.type_name()))
}

// ============================================================================
// Scalars
// ============================================================================

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> RtResult<Self> {
        Ok(value.clone())
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::bool_of(self)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> RtResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            // Any other value converts through its truthiness.
            other => Ok(other.is_truthy()),
        }
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> RtResult<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            // Integers widen to float implicitly.
            Value::Int(i) => Ok(i.value as f64),
            other => Err(expected("number", other)),
        }
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self as f64)
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> RtResult<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> RtResult<Self> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(expected("string", other)),
        }
    }
}

macro_rules! impl_integer_conversions {
    ($($ty:ty),*) => {$(
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::int(self as i64)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: &Value) -> RtResult<Self> {
                match value {
                    Value::Int(i) => <$ty>::try_from(i.value).map_err(|_| {
                        RuntimeError::Type(format!(
                            "Integer {} does not fit in {}",
                            i.value,
                            stringify!($ty)
                        ))
                    }),
                    // Floats convert only when the conversion is lossless.
                    Value::Float(f) if f.fract() == 0.0 => {
                        let as_int = *f as i64;
                        if as_int as f64 == *f {
                            <$ty>::try_from(as_int).map_err(|_| {
                                RuntimeError::Type(format!(
                                    "Float {} does not fit in {}",
                                    f,
                                    stringify!($ty)
                                ))
                            })
                        } else {
                            Err(expected("integer", value))
                        }
                    }
                    other => Err(expected("integer", other)),
                }
            }
        }
    )*};
}

impl_integer_conversions!(i8, i16, i32, i64, u8, u16, u32);

// u64 is special: the dynamic payload is an i64, so only the non-negative
// half of the range round-trips.
impl IntoValue for u64 {
    fn into_value(self) -> Value {
        Value::int(self.min(i64::MAX as u64) as i64)
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> RtResult<Self> {
        match value {
            Value::Int(i) => u64::try_from(i.value).map_err(|_| {
                RuntimeError::Type(format!("Integer {} does not fit in u64", i.value))
            }),
            other => Err(expected("integer", other)),
        }
    }
}

// ============================================================================
// Containers
// ============================================================================

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::list(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> RtResult<Self> {
        match value {
            Value::List(elements) => {
                let elements = elements.borrow();
                let mut out = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    out.push(T::from_value(element).map_err(|e| {
                        RuntimeError::Type(format!(
                            "Failed to convert list item at index {index}: {e}"
                        ))
                    })?);
                }
                Ok(out)
            }
            other => Err(expected("list", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for IndexMap<String, T> {
    fn into_value(self) -> Value {
        let entries = self
            .into_iter()
            .map(|(k, v)| (k, v.into_value()))
            .collect();
        Value::dict(entries)
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    fn from_value(value: &Value) -> RtResult<Self> {
        match value {
            Value::Dict(entries) => {
                let entries = entries.borrow();
                let mut out = IndexMap::with_capacity(entries.len());
                for (key, entry) in entries.iter() {
                    out.insert(
                        key.clone(),
                        T::from_value(entry).map_err(|e| {
                            RuntimeError::Type(format!(
                                "Failed to convert dictionary value for key '{key}': {e}"
                            ))
                        })?,
                    );
                }
                Ok(out)
            }
            other => Err(expected("dictionary", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(inner) => inner.into_value(),
            None => Value::None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> RtResult<Self> {
        match value {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Non-erroring variant of [`FromValue`].
pub fn try_from_value<T: FromValue>(value: &Value) -> Option<T> {
    T::from_value(value).ok()
}

/// Strict arity check for native callables: a signature with N parameters
/// rejects any other argument count.
pub fn check_arity(
    what: &str,
    args: &[Value],
    expected: usize,
) -> RtResult<()> {
    if args.len() != expected {
        return Err(RuntimeError::Type(format!(
            "{} expects {} argument(s), got {}",
            what,
            expected,
            args.len()
        )));
    }
    Ok(())
}

/// Convert one positional argument, naming the callable and position on
/// failure.
pub fn arg<T: FromValue>(
    what: &str,
    args: &[Value],
    index: usize,
) -> RtResult<T> {
    let value = args.get(index).ok_or_else(|| {
        RuntimeError::Type(format!("{what} is missing argument {index}"))
    })?;
    T::from_value(value)
        .map_err(|e| RuntimeError::Type(format!("{what} argument {index}: {e}")))
}
