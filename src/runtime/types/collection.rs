//! List and dictionary descriptors
//!
//! Lists use integer subscripts with negative-index wrap; dictionaries are
//! string-keyed and additionally expose their keys as pseudo-members.
//!
//! List and dictionary equality is shallow by design: lists compare lengths
//! and element type names, dictionaries compare lengths only. Containment
//! delegates to each element's own `equals`, so scalar elements match by
//! value while nested composites fall back to the shallow rule. See
//! DESIGN.md for why this is preserved rather than deepened.

use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::types::{resolve_index, resolve_slice, TypeDescriptor};
use crate::runtime::value::Value;

pub struct ListType;

impl TypeDescriptor for ListType {
    fn name(&self) -> &'static str {
        "list"
    }

    fn add(
        &self,
        this: &Value,
        other: &Value,
    ) -> RtResult<Value> {
        match (this, other) {
            (Value::List(a), Value::List(b)) => {
                let mut combined = a.borrow().clone();
                combined.extend(b.borrow().iter().cloned());
                Ok(Value::list(combined))
            }
            _ => Err(RuntimeError::Type(
                "Unsupported operand types for list concatenation".to_string(),
            )),
        }
    }

    fn is_truthy(
        &self,
        this: &Value,
    ) -> bool {
        match this {
            Value::List(elements) => !elements.borrow().is_empty(),
            _ => true,
        }
    }

    fn equals(
        &self,
        this: &Value,
        other: &Value,
    ) -> bool {
        let (Value::List(a), Value::List(b)) = (this, other) else {
            return false;
        };
        let a = a.borrow();
        let b = b.borrow();
        if a.len() != b.len() {
            return false;
        }
        // Element type names only; values are not consulted.
        a.iter()
            .zip(b.iter())
            .all(|(x, y)| x.type_name() == y.type_name())
    }

    fn get_item(
        &self,
        this: &Value,
        index: &Value,
    ) -> RtResult<Value> {
        let Value::List(elements) = this else {
            unreachable!("list descriptor dispatched on {}", this.type_name());
        };
        match index {
            Value::Int(i) => {
                let elements = elements.borrow();
                let idx = resolve_index(elements.len() as i64, i.value, "List")?;
                Ok(elements[idx].clone())
            }
            _ => Err(RuntimeError::Type("List index must be an integer".to_string())),
        }
    }

    fn set_item(
        &self,
        this: &Value,
        index: &Value,
        value: Value,
    ) -> RtResult<()> {
        let Value::List(elements) = this else {
            unreachable!("list descriptor dispatched on {}", this.type_name());
        };
        match index {
            Value::Int(i) => {
                let mut elements = elements.borrow_mut();
                let idx = resolve_index(elements.len() as i64, i.value, "List")?;
                elements[idx] = value;
                Ok(())
            }
            _ => Err(RuntimeError::Type("List index must be an integer".to_string())),
        }
    }

    fn contains(
        &self,
        this: &Value,
        item: &Value,
    ) -> RtResult<bool> {
        let Value::List(elements) = this else {
            unreachable!("list descriptor dispatched on {}", this.type_name());
        };
        // Each element answers with its own notion of equality.
        Ok(elements.borrow().iter().any(|element| element.equals(item)))
    }

    fn length(
        &self,
        this: &Value,
    ) -> RtResult<i64> {
        match this {
            Value::List(elements) => Ok(elements.borrow().len() as i64),
            _ => unreachable!("list descriptor dispatched on {}", this.type_name()),
        }
    }

    fn slice(
        &self,
        this: &Value,
        start: &Value,
        end: &Value,
        step: &Value,
    ) -> RtResult<Value> {
        let Value::List(elements) = this else {
            unreachable!("list descriptor dispatched on {}", this.type_name());
        };
        let elements = elements.borrow();
        let plan = resolve_slice(elements.len() as i64, start, end, step)?;
        let sliced: Vec<Value> = plan
            .indices()
            .into_iter()
            .map(|i| elements[i].clone())
            .collect();
        Ok(Value::list(sliced))
    }
}

pub struct DictType;

fn expect_key(index: &Value) -> RtResult<String> {
    match index {
        Value::Str(s) => Ok(s.to_string()),
        other => Err(RuntimeError::Type(format!(
            "Dictionary keys must be strings, got {}",
            other.type_name()
        ))),
    }
}

impl TypeDescriptor for DictType {
    fn name(&self) -> &'static str {
        "dict"
    }

    fn is_truthy(
        &self,
        this: &Value,
    ) -> bool {
        match this {
            Value::Dict(entries) => !entries.borrow().is_empty(),
            _ => true,
        }
    }

    fn equals(
        &self,
        this: &Value,
        other: &Value,
    ) -> bool {
        // Length only, matching the list rule's shallowness.
        match (this, other) {
            (Value::Dict(a), Value::Dict(b)) => a.borrow().len() == b.borrow().len(),
            _ => false,
        }
    }

    fn get_item(
        &self,
        this: &Value,
        index: &Value,
    ) -> RtResult<Value> {
        let Value::Dict(entries) = this else {
            unreachable!("dict descriptor dispatched on {}", this.type_name());
        };
        let key = expect_key(index)?;
        entries
            .borrow()
            .get(&key)
            .cloned()
            .ok_or_else(|| RuntimeError::Key(format!("Key '{key}' not found in dictionary")))
    }

    fn set_item(
        &self,
        this: &Value,
        index: &Value,
        value: Value,
    ) -> RtResult<()> {
        let Value::Dict(entries) = this else {
            unreachable!("dict descriptor dispatched on {}", this.type_name());
        };
        let key = expect_key(index)?;
        entries.borrow_mut().insert(key, value);
        Ok(())
    }

    fn get_member(
        &self,
        this: &Value,
        name: &str,
    ) -> RtResult<Value> {
        let Value::Dict(entries) = this else {
            unreachable!("dict descriptor dispatched on {}", this.type_name());
        };
        entries
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::Attribute(format!("Dictionary has no member '{name}'")))
    }

    fn set_member(
        &self,
        this: &Value,
        name: &str,
        value: Value,
    ) -> RtResult<()> {
        let Value::Dict(entries) = this else {
            unreachable!("dict descriptor dispatched on {}", this.type_name());
        };
        entries.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }

    fn contains(
        &self,
        this: &Value,
        item: &Value,
    ) -> RtResult<bool> {
        let Value::Dict(entries) = this else {
            unreachable!("dict descriptor dispatched on {}", this.type_name());
        };
        // Membership means key membership; non-string probes match nothing.
        match item {
            Value::Str(key) => Ok(entries.borrow().contains_key(key.as_ref())),
            _ => Ok(false),
        }
    }

    fn length(
        &self,
        this: &Value,
    ) -> RtResult<i64> {
        match this {
            Value::Dict(entries) => Ok(entries.borrow().len() as i64),
            _ => unreachable!("dict descriptor dispatched on {}", this.type_name()),
        }
    }
}
