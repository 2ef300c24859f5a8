//! Native interop bridge integration tests
//!
//! The full construction-and-binding scenario from the embedding side: a
//! native class with one member and one method, exported through a module,
//! instantiated from "script" argument values.

use std::cell::RefCell;
use std::rc::Rc;

use kestrel::api::convert::{arg, check_arity, FromValue};
use kestrel::api::native::{native_fn, NativeClass, NativeClassExt, NativeModule};
use kestrel::api::wrapper::InstanceBindings;
use kestrel::engine::Engine;
use kestrel::runtime::value::Value;

/// The host type a plugin would be wrapping.
struct Gauge {
    x: i64,
}

fn gauge_class() -> NativeClass {
    let mut class = NativeClass::new("Gauge");
    class.set_description("A wrapped host object with one member and one method.");

    // Class-level declarations: the unbound fallback diagnostics.
    class.add_property(
        "x",
        Rc::new(|| {
            Err(kestrel::runtime::error::RuntimeError::Type(
                "'x' of native class 'Gauge' is not bound to instance".to_string(),
            ))
        }),
        Some(Rc::new(|_| {
            Err(kestrel::runtime::error::RuntimeError::Type(
                "'x' of native class 'Gauge' is not bound to instance".to_string(),
            ))
        })),
    );
    class.add_method(
        "double",
        native_fn(|_| {
            Err(kestrel::runtime::error::RuntimeError::Type(
                "'double' of native class 'Gauge' is not bound to instance".to_string(),
            ))
        }),
    );

    class.set_constructor(Rc::new(|args| {
        check_arity("Gauge", args, 1)?;
        let x: i64 = arg("Gauge", args, 0)?;
        let host = Rc::new(RefCell::new(Gauge { x }));

        let mut bindings = InstanceBindings::new();
        let h = host.clone();
        bindings.bind_property(
            "x",
            Rc::new(move || Ok(Value::int(h.borrow().x))),
            Some({
                let h = host.clone();
                Rc::new(move |value: &Value| {
                    h.borrow_mut().x = i64::from_value(value)?;
                    Ok(())
                })
            }),
        );
        let h = host.clone();
        bindings.bind_method("double", native_fn(move |_| Ok(Value::int(h.borrow().x * 2))));
        Ok(bindings)
    }));
    class
}

#[test]
fn construct_then_read_property_and_call_method() {
    let class = Rc::new(gauge_class());
    let instance = class.create_instance(&[Value::int(5)]).unwrap();

    assert!(instance.get_member("x").unwrap().equals(&Value::int(5)));
    assert!(instance
        .call_method("double", &[])
        .unwrap()
        .equals(&Value::int(10)));
}

#[test]
fn class_reaches_script_code_through_a_module() {
    let mut module = NativeModule::new("sensors");
    module.export_class("Gauge", gauge_class());
    module.export_constant("MAX_READING", Value::int(100));

    let mut engine = Engine::new();
    engine.register_module("sensors", module);

    let module_value = engine.get_module("sensors").unwrap();
    // Member access resolves the class as a callable constructor.
    let constructor = module_value.get_member("Gauge").unwrap();
    let instance = constructor.call_method("call", &[Value::int(7)]).unwrap();
    assert!(instance
        .call_method("double", &[])
        .unwrap()
        .equals(&Value::int(14)));

    assert!(module_value
        .get_member("MAX_READING")
        .unwrap()
        .equals(&Value::int(100)));
}

#[test]
fn wrapped_instances_flow_through_the_dispatch_protocol() {
    let class = Rc::new(gauge_class());
    let instance = class.create_instance(&[Value::int(3)]).unwrap();

    // Wrapped instances are truthy and identity-equal only to themselves.
    assert!(instance.is_truthy());
    let alias = instance.clone();
    assert!(instance.equals(&alias));
    let other = class.create_instance(&[Value::int(3)]).unwrap();
    assert!(!instance.equals(&other));

    // Property writes go through set_member like any other value.
    instance.set_member("x", Value::int(9)).unwrap();
    assert!(instance.get_member("x").unwrap().equals(&Value::int(9)));
}

#[test]
fn conversion_failures_surface_as_plugin_errors_not_panics() {
    let class = Rc::new(gauge_class());

    let err = class.create_instance(&[Value::string("five")]).unwrap_err();
    assert!(err.to_string().contains("argument 0"));

    let err = class.create_instance(&[]).unwrap_err();
    assert!(err.to_string().contains("expects 1 argument"));
}
