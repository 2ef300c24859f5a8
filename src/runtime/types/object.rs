//! Descriptors for object-like kinds
//!
//! Class objects, class instances, interfaces, exceptions, files, promises,
//! native modules, and wrapped native instances. Member resolution for
//! instances goes through the member map first and the class's method table
//! (own + inherited) second; wrapped native instances resolve through their
//! own binding table with the class-level table as the diagnostic fallback.

use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::types::TypeDescriptor;
use crate::runtime::value::Value;

pub struct ClassType;

impl TypeDescriptor for ClassType {
    fn name(&self) -> &'static str {
        "class"
    }

    fn get_member(
        &self,
        this: &Value,
        name: &str,
    ) -> RtResult<Value> {
        let Value::Class(class) = this else {
            unreachable!("class descriptor dispatched on {}", this.type_name());
        };
        class.find_method(name).ok_or_else(|| {
            RuntimeError::Attribute(format!("Class '{}' has no member '{}'", class.name, name))
        })
    }
}

pub struct InstanceType;

impl TypeDescriptor for InstanceType {
    fn name(&self) -> &'static str {
        "instance"
    }

    fn get_member(
        &self,
        this: &Value,
        name: &str,
    ) -> RtResult<Value> {
        let Value::Instance(instance) = this else {
            unreachable!("instance descriptor dispatched on {}", this.type_name());
        };
        if instance.has_member(name) {
            return instance.get_member(name);
        }
        instance.class.find_method(name).ok_or_else(|| {
            RuntimeError::Attribute(format!(
                "Member '{}' not found in instance of '{}'",
                name, instance.class.name
            ))
        })
    }

    fn set_member(
        &self,
        this: &Value,
        name: &str,
        value: Value,
    ) -> RtResult<()> {
        let Value::Instance(instance) = this else {
            unreachable!("instance descriptor dispatched on {}", this.type_name());
        };
        instance.set_member(name, value)
    }

    fn call_method(
        &self,
        this: &Value,
        name: &str,
        args: &[Value],
    ) -> RtResult<Value> {
        let Value::Instance(instance) = this else {
            unreachable!("instance descriptor dispatched on {}", this.type_name());
        };
        let method = instance.class.find_method(name).ok_or_else(|| {
            RuntimeError::Attribute(format!(
                "Method '{}' not found in class '{}'",
                name, instance.class.name
            ))
        })?;
        match method {
            // Host-implemented methods take the receiver as their first
            // argument and can run right here.
            Value::Builtin(builtin) => {
                let mut call_args = Vec::with_capacity(args.len() + 1);
                call_args.push(this.clone());
                call_args.extend_from_slice(args);
                (builtin.func)(&call_args)
            }
            // Script-defined bodies belong to the interpreter.
            _ => Err(RuntimeError::Type(format!(
                "Method '{}' is script-defined and requires the interpreter to call",
                name
            ))),
        }
    }
}

pub struct InterfaceType;

impl TypeDescriptor for InterfaceType {
    fn name(&self) -> &'static str {
        "interface"
    }
}

pub struct ExceptionType;

impl TypeDescriptor for ExceptionType {
    fn name(&self) -> &'static str {
        "exception"
    }

    fn get_member(
        &self,
        this: &Value,
        name: &str,
    ) -> RtResult<Value> {
        let Value::Exception(exception) = this else {
            unreachable!("exception descriptor dispatched on {}", this.type_name());
        };
        match name {
            "message" => Ok(Value::string(exception.error.message())),
            "type" => Ok(Value::string(exception.error.kind_name())),
            "cause" => Ok(exception.cause.clone().unwrap_or(Value::None)),
            _ => Err(RuntimeError::Attribute(format!(
                "Exception has no member '{name}'"
            ))),
        }
    }

    fn set_member(
        &self,
        _this: &Value,
        name: &str,
        _value: Value,
    ) -> RtResult<()> {
        Err(RuntimeError::Attribute(format!(
            "Exception member '{name}' is read-only"
        )))
    }
}

pub struct FileType;

impl TypeDescriptor for FileType {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get_member(
        &self,
        this: &Value,
        name: &str,
    ) -> RtResult<Value> {
        let Value::File(file) = this else {
            unreachable!("file descriptor dispatched on {}", this.type_name());
        };
        match name {
            "path" => Ok(Value::string(&file.path)),
            "mode" => Ok(Value::string(&file.mode)),
            _ => Err(RuntimeError::Attribute(format!(
                "File has no member '{name}'"
            ))),
        }
    }
}

pub struct PromiseType;

impl TypeDescriptor for PromiseType {
    fn name(&self) -> &'static str {
        "promise"
    }
}

pub struct ModuleType;

impl TypeDescriptor for ModuleType {
    fn name(&self) -> &'static str {
        "module"
    }

    fn get_member(
        &self,
        this: &Value,
        name: &str,
    ) -> RtResult<Value> {
        let Value::Module(module) = this else {
            unreachable!("module descriptor dispatched on {}", this.type_name());
        };
        // Only publicly exported symbols resolve through member access.
        if module.is_exported(name) {
            if let Some(value) = module.get_symbol(name) {
                return Ok(value);
            }
        }
        Err(RuntimeError::Attribute(format!(
            "Module '{}' has no exported symbol '{}'",
            module.name(),
            name
        )))
    }
}

pub struct NativeInstanceType;

impl TypeDescriptor for NativeInstanceType {
    fn name(&self) -> &'static str {
        "native_instance"
    }

    fn get_member(
        &self,
        this: &Value,
        name: &str,
    ) -> RtResult<Value> {
        let Value::NativeInstance(instance) = this else {
            unreachable!("native instance descriptor dispatched on {}", this.type_name());
        };
        instance.get_member(name)
    }

    fn set_member(
        &self,
        this: &Value,
        name: &str,
        value: Value,
    ) -> RtResult<()> {
        let Value::NativeInstance(instance) = this else {
            unreachable!("native instance descriptor dispatched on {}", this.type_name());
        };
        instance.set_member(name, value)
    }

    fn call_method(
        &self,
        this: &Value,
        name: &str,
        args: &[Value],
    ) -> RtResult<Value> {
        let Value::NativeInstance(instance) = this else {
            unreachable!("native instance descriptor dispatched on {}", this.type_name());
        };
        instance.call_method(name, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::{ClassDef, ClassInstance, MemberDecl};
    use indexmap::IndexMap;
    use std::rc::Rc;

    fn counter_class() -> Rc<ClassDef> {
        let mut methods = IndexMap::new();
        methods.insert(
            "bump".to_string(),
            Value::Builtin(Rc::new(crate::runtime::value::BuiltinFunction {
                name: "bump".to_string(),
                func: Rc::new(|args| {
                    let this = &args[0];
                    let current = this.get_member("count")?;
                    this.set_member("count", current.add(&Value::int(1))?)?;
                    this.get_member("count")
                }),
            })),
        );
        Rc::new(ClassDef {
            name: "Counter".to_string(),
            members: vec![MemberDecl {
                name: "count".to_string(),
                type_name: Some("int".to_string()),
                default: Some(Value::int(0)),
                is_const: false,
            }],
            methods,
            parent: None,
        })
    }

    #[test]
    fn test_instance_member_resolution() {
        let instance = Value::Instance(ClassInstance::new(counter_class()));
        assert!(instance.get_member("count").unwrap().equals(&Value::int(0)));
        // Methods resolve when no member shadows them.
        assert!(matches!(
            instance.get_member("bump").unwrap(),
            Value::Builtin(_)
        ));
        assert!(matches!(
            instance.get_member("nope").unwrap_err(),
            RuntimeError::Attribute(_)
        ));
    }

    #[test]
    fn test_builtin_method_call_gets_receiver() {
        let instance = Value::Instance(ClassInstance::new(counter_class()));
        assert!(instance
            .call_method("bump", &[])
            .unwrap()
            .equals(&Value::int(1)));
        assert!(instance
            .call_method("bump", &[])
            .unwrap()
            .equals(&Value::int(2)));
    }

    #[test]
    fn test_exception_synthetic_members() {
        let exc = Value::exception(
            RuntimeError::Key("missing".to_string()),
            Some(Value::string("ctx")),
        );
        assert!(exc
            .get_member("message")
            .unwrap()
            .equals(&Value::string("missing")));
        assert!(exc
            .get_member("type")
            .unwrap()
            .equals(&Value::string("KeyError")));
        assert!(exc.get_member("cause").unwrap().equals(&Value::string("ctx")));
        assert!(matches!(
            exc.set_member("message", Value::int(1)).unwrap_err(),
            RuntimeError::Attribute(_)
        ));
        // Exceptions are truthy like every other object.
        assert!(exc.is_truthy());
    }

    #[test]
    fn test_class_member_is_method_lookup() {
        let class = Value::Class(counter_class());
        assert!(matches!(class.get_member("bump").unwrap(), Value::Builtin(_)));
        assert!(class.get_member("count").is_err());
    }
}
