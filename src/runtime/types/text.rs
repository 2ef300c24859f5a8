//! String descriptor
//!
//! Strings are immutable: subscript reads return one-character strings and
//! item assignment is rejected. Concatenation coerces any right-hand operand
//! through its display form, with `none` rendering as the literal `"none"`.

use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::types::{resolve_slice, TypeDescriptor};
use crate::runtime::value::Value;

fn expect_str(this: &Value) -> &str {
    match this {
        Value::Str(s) => s,
        other => unreachable!("string descriptor dispatched on {}", other.type_name()),
    }
}

pub struct StrType;

impl TypeDescriptor for StrType {
    fn name(&self) -> &'static str {
        "string"
    }

    fn add(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_str(this);
        match other {
            Value::Str(b) => Ok(Value::string(format!("{a}{b}"))),
            Value::None => Ok(Value::string(format!("{a}none"))),
            other => Ok(Value::string(format!("{a}{other}"))),
        }
    }

    fn multiply(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        let a = expect_str(this);
        match other {
            // string * int repeats; a negative count yields the empty string
            Value::Int(count) => Ok(Value::string(a.repeat(count.value.max(0) as usize))),
            _ => Err(self.unsupported_binary("*", this, other)),
        }
    }

    fn is_truthy(
        &self,
        this: &Value,
    ) -> bool {
        !expect_str(this).is_empty()
    }

    fn equals(
        &self,
        this: &Value,
        other: &Value,
    ) -> bool {
        match other {
            Value::Str(b) => expect_str(this) == b.as_ref(),
            _ => false,
        }
    }

    fn compare(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<i32> {
        match other {
            Value::Str(b) => Ok(match expect_str(this).cmp(b.as_ref()) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            }),
            _ => Err(RuntimeError::Type(format!(
                "Cannot compare string with {}",
                other.type_name()
            ))),
        }
    }

    fn get_item(
        &self,
        this: &Value,
        index: &Value,
    ) -> RtResult<Value> {
        let chars: Vec<char> = expect_str(this).chars().collect();
        match index {
            Value::Int(i) => {
                let idx = i.value;
                if idx < 0 || idx >= chars.len() as i64 {
                    return Err(RuntimeError::Index("String index out of bounds".to_string()));
                }
                Ok(Value::string(chars[idx as usize].to_string()))
            }
            _ => Err(RuntimeError::Type("String index must be an integer".to_string())),
        }
    }

    fn set_item(
        &self,
        _this: &Value,
        _index: &Value,
        _value: Value,
    ) -> RtResult<()> {
        Err(RuntimeError::Type(
            "Strings are immutable and do not support item assignment".to_string(),
        ))
    }

    fn contains(
        &self,
        this: &Value,
        item: &Value,
    ) -> RtResult<bool> {
        match item {
            Value::Str(needle) => Ok(expect_str(this).contains(needle.as_ref())),
            _ => Ok(false),
        }
    }

    fn length(
        &self,
        this: &Value,
    ) -> RtResult<i64> {
        Ok(expect_str(this).chars().count() as i64)
    }

    fn slice(
        &self,
        this: &Value,
        start: &Value,
        end: &Value,
        step: &Value,
    ) -> RtResult<Value> {
        let chars: Vec<char> = expect_str(this).chars().collect();
        let plan = resolve_slice(chars.len() as i64, start, end, step)?;
        let sliced: String = plan.indices().into_iter().map(|i| chars[i]).collect();
        Ok(Value::string(sliced))
    }
}
