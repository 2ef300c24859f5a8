//! Wrapped host instances
//!
//! Each wrapped instance *owns* its bound accessor table, built once while
//! the constructor runs. There is no process-wide binding registry keyed by
//! raw pointers and no manual cleanup call: when the wrapper goes away, its
//! bindings (and through them the host object they close over) go with it.
//!
//! Member and method lookup order on a wrapped instance:
//! 1. the instance's own bindings;
//! 2. the class-level table, which exists only to produce the deterministic
//!    "not bound to instance" diagnostic, never default behavior.
//!
//! Unbound -> bound is the only transition, and it happens inside
//! `NativeClass::create_instance` before the wrapper is ever visible; there
//! is no rebind.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::api::native::{NativeClass, NativeFn, PropertyGetter, PropertySetter};
use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::value::Value;

/// The accessors bound to one specific host object.
#[derive(Default)]
pub struct InstanceBindings {
    getters: IndexMap<String, PropertyGetter>,
    setters: IndexMap<String, PropertySetter>,
    methods: IndexMap<String, NativeFn>,
}

impl InstanceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_getter(
        &mut self,
        name: impl Into<String>,
        getter: PropertyGetter,
    ) {
        self.getters.insert(name.into(), getter);
    }

    pub fn bind_setter(
        &mut self,
        name: impl Into<String>,
        setter: PropertySetter,
    ) {
        self.setters.insert(name.into(), setter);
    }

    pub fn bind_method(
        &mut self,
        name: impl Into<String>,
        method: NativeFn,
    ) {
        self.methods.insert(name.into(), method);
    }

    pub fn bind_property(
        &mut self,
        name: impl Into<String>,
        getter: PropertyGetter,
        setter: Option<PropertySetter>,
    ) {
        let name = name.into();
        self.bind_getter(name.clone(), getter);
        if let Some(setter) = setter {
            self.bind_setter(name, setter);
        }
    }

    pub fn has_getter(
        &self,
        name: &str,
    ) -> bool {
        self.getters.contains_key(name)
    }

    pub fn has_method(
        &self,
        name: &str,
    ) -> bool {
        self.methods.contains_key(name)
    }
}

/// A host object wrapped for script consumption.
pub struct NativeInstance {
    class: Rc<NativeClass>,
    bindings: InstanceBindings,
}

impl fmt::Debug for NativeInstance {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("NativeInstance")
            .field("class", &self.class.name())
            .finish()
    }
}

impl NativeInstance {
    pub fn new(
        class: Rc<NativeClass>,
        bindings: InstanceBindings,
    ) -> Self {
        Self { class, bindings }
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn class(&self) -> &Rc<NativeClass> {
        &self.class
    }

    /// Read a property through the bound getter.
    pub fn get_member(
        &self,
        name: &str,
    ) -> RtResult<Value> {
        if let Some(getter) = self.bindings.getters.get(name) {
            return getter();
        }
        if self.class.has_property(name) {
            return Err(self.not_bound(name));
        }
        Err(RuntimeError::Attribute(format!(
            "Member '{}' not found on '{}'",
            name,
            self.class.name()
        )))
    }

    /// Write a property through the bound setter.
    pub fn set_member(
        &self,
        name: &str,
        value: Value,
    ) -> RtResult<()> {
        if let Some(setter) = self.bindings.setters.get(name) {
            return setter(&value);
        }
        if self.class.has_property_setter(name) {
            return Err(self.not_bound(name));
        }
        Err(RuntimeError::Attribute(format!(
            "Member '{}' is not settable on '{}'",
            name,
            self.class.name()
        )))
    }

    /// Invoke a method through the bound table.
    pub fn call_method(
        &self,
        name: &str,
        args: &[Value],
    ) -> RtResult<Value> {
        if let Some(method) = self.bindings.methods.get(name) {
            return method(args);
        }
        if self.class.has_method(name) {
            return Err(self.not_bound(name));
        }
        Err(RuntimeError::Attribute(format!(
            "Method '{}' not found on '{}'",
            name,
            self.class.name()
        )))
    }

    fn not_bound(
        &self,
        name: &str,
    ) -> RuntimeError {
        RuntimeError::Type(format!(
            "'{}' of native class '{}' is not bound to instance",
            name,
            self.class.name()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::convert::{arg, check_arity};
    use crate::api::native::{native_fn, NativeClassExt};
    use std::cell::RefCell;

    /// The host type being exposed.
    struct Counter {
        x: i64,
    }

    /// A fully wired native class for `Counter`, the way a plugin would
    /// build one.
    fn counter_class() -> Rc<NativeClass> {
        let mut class = NativeClass::new("Counter");
        // Class-level declarations exist so unbound access has something
        // deterministic to say.
        class.add_property(
            "x",
            Rc::new(|| {
                Err(RuntimeError::Type(
                    "'x' of native class 'Counter' is not bound to instance".to_string(),
                ))
            }),
            Some(Rc::new(|_| {
                Err(RuntimeError::Type(
                    "'x' of native class 'Counter' is not bound to instance".to_string(),
                ))
            })),
        );
        class.add_method(
            "double",
            native_fn(|_| {
                Err(RuntimeError::Type(
                    "'double' of native class 'Counter' is not bound to instance".to_string(),
                ))
            }),
        );

        let constructor: crate::api::native::NativeConstructor = Rc::new(move |args| {
            check_arity("Counter", args, 1)?;
            let x: i64 = arg("Counter", args, 0)?;
            let host = Rc::new(RefCell::new(Counter { x }));

            // Post-construction binding: every accessor closes over this
            // specific host object.
            let mut bindings = InstanceBindings::new();
            let h = host.clone();
            bindings.bind_property(
                "x",
                Rc::new(move || Ok(Value::int(h.borrow().x))),
                Some({
                    let h = host.clone();
                    Rc::new(move |value: &Value| {
                        h.borrow_mut().x = crate::api::convert::FromValue::from_value(value)?;
                        Ok(())
                    })
                }),
            );
            let h = host.clone();
            bindings.bind_method(
                "double",
                native_fn(move |_| Ok(Value::int(h.borrow().x * 2))),
            );
            Ok(bindings)
        });

        class.set_constructor(constructor);
        Rc::new(class)
    }

    #[test]
    fn test_end_to_end_binding_contract() {
        let class = counter_class();
        let instance = class.create_instance(&[Value::int(5)]).unwrap();

        // Property read sees the constructed value.
        assert!(instance.get_member("x").unwrap().equals(&Value::int(5)));
        // Method call sees the same host object.
        assert!(instance
            .call_method("double", &[])
            .unwrap()
            .equals(&Value::int(10)));

        // Property write flows back into the host object.
        instance.set_member("x", Value::int(7)).unwrap();
        assert!(instance
            .call_method("double", &[])
            .unwrap()
            .equals(&Value::int(14)));
    }

    #[test]
    fn test_constructor_is_strict_about_arguments() {
        let class = counter_class();
        assert!(class.create_instance(&[]).is_err());
        assert!(class
            .create_instance(&[Value::int(1), Value::int(2)])
            .is_err());
        assert!(class.create_instance(&[Value::string("five")]).is_err());
    }

    #[test]
    fn test_unbound_instance_reports_deterministic_diagnostic() {
        let class = counter_class();
        // An instance assembled without bindings (bypassing the
        // constructor) must fail every declared access with the canonical
        // message, not arbitrary behavior.
        let bare = NativeInstance::new(class, InstanceBindings::new());
        let err = bare.get_member("x").unwrap_err();
        assert!(err.to_string().contains("not bound to instance"));
        let err = bare.call_method("double", &[]).unwrap_err();
        assert!(err.to_string().contains("not bound to instance"));
        // Undeclared names are a different, attribute-shaped error.
        assert!(matches!(
            bare.get_member("y").unwrap_err(),
            RuntimeError::Attribute(_)
        ));
    }

    #[test]
    fn test_each_instance_has_its_own_bindings() {
        let class = counter_class();
        let a = class.create_instance(&[Value::int(1)]).unwrap();
        let b = class.create_instance(&[Value::int(100)]).unwrap();

        a.set_member("x", Value::int(2)).unwrap();
        assert!(a.get_member("x").unwrap().equals(&Value::int(2)));
        // b's bindings close over a different host object.
        assert!(b.get_member("x").unwrap().equals(&Value::int(100)));
    }
}
