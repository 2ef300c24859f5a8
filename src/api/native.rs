//! Native class and module registry
//!
//! A [`NativeClass`] describes a host type exposed to scripts: one
//! constructor plus name-keyed tables of methods, static methods, and
//! property accessors. A [`NativeModule`] groups functions, classes,
//! constants, and variables behind an explicit exported-names set.
//!
//! The binding contract lives in [`NativeClass::create_instance`]:
//! construction is not complete until binding is complete. The registered
//! constructor must hand back the per-instance [`InstanceBindings`] for the
//! host object it just built; `create_instance` then wraps class and
//! bindings into the returned instance, so an unbound instance cannot be
//! produced by construction at all. Class-level tables remain only as the
//! deterministic "not bound to instance" fallback (see `api::wrapper`).

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::api::wrapper::{InstanceBindings, NativeInstance};
use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::value::{BuiltinFunction, Value};

/// A native function callable from script code.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> RtResult<Value>>;

/// A bound property read.
pub type PropertyGetter = Rc<dyn Fn() -> RtResult<Value>>;

/// A bound property write.
pub type PropertySetter = Rc<dyn Fn(&Value) -> RtResult<()>>;

/// A native class constructor: strict about arity and argument types, and
/// responsible for returning the bindings of the instance it constructed.
pub type NativeConstructor = Rc<dyn Fn(&[Value]) -> RtResult<InstanceBindings>>;

/// Wrap a closure as a [`NativeFn`].
pub fn native_fn(f: impl Fn(&[Value]) -> RtResult<Value> + 'static) -> NativeFn {
    Rc::new(f)
}

/// A host class exposed to scripts.
#[derive(Default)]
pub struct NativeClass {
    name: String,
    description: String,
    constructor: Option<NativeConstructor>,
    methods: IndexMap<String, NativeFn>,
    static_methods: IndexMap<String, NativeFn>,
    property_getters: IndexMap<String, PropertyGetter>,
    property_setters: IndexMap<String, PropertySetter>,
}

impl fmt::Debug for NativeClass {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("NativeClass")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field(
                "properties",
                &self.property_getters.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl NativeClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set_name(
        &mut self,
        name: impl Into<String>,
    ) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_description(
        &mut self,
        description: impl Into<String>,
    ) {
        self.description = description.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_constructor(
        &mut self,
        constructor: NativeConstructor,
    ) {
        self.constructor = Some(constructor);
    }

    pub fn add_method(
        &mut self,
        name: impl Into<String>,
        method: NativeFn,
    ) {
        self.methods.insert(name.into(), method);
    }

    pub fn add_static_method(
        &mut self,
        name: impl Into<String>,
        method: NativeFn,
    ) {
        self.static_methods.insert(name.into(), method);
    }

    pub fn add_property_getter(
        &mut self,
        name: impl Into<String>,
        getter: PropertyGetter,
    ) {
        self.property_getters.insert(name.into(), getter);
    }

    pub fn add_property_setter(
        &mut self,
        name: impl Into<String>,
        setter: PropertySetter,
    ) {
        self.property_setters.insert(name.into(), setter);
    }

    pub fn add_property(
        &mut self,
        name: impl Into<String>,
        getter: PropertyGetter,
        setter: Option<PropertySetter>,
    ) {
        let name = name.into();
        self.add_property_getter(name.clone(), getter);
        if let Some(setter) = setter {
            self.add_property_setter(name, setter);
        }
    }

    pub fn has_method(
        &self,
        name: &str,
    ) -> bool {
        self.methods.contains_key(name)
    }

    pub fn has_static_method(
        &self,
        name: &str,
    ) -> bool {
        self.static_methods.contains_key(name)
    }

    pub fn has_property(
        &self,
        name: &str,
    ) -> bool {
        self.property_getters.contains_key(name)
    }

    pub fn has_property_setter(
        &self,
        name: &str,
    ) -> bool {
        self.property_setters.contains_key(name)
    }

    pub fn get_method(
        &self,
        name: &str,
    ) -> Option<NativeFn> {
        self.methods.get(name).cloned()
    }

    pub fn get_static_method(
        &self,
        name: &str,
    ) -> Option<NativeFn> {
        self.static_methods.get(name).cloned()
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.property_getters.keys().map(String::as_str)
    }

}

/// Operations that need the class as a shared handle, because the produced
/// instance keeps a reference back to its class.
pub trait NativeClassExt {
    /// Construct a wrapped instance.
    ///
    /// Runs the registered constructor, which performs strict argument
    /// checking, builds the host object, and returns the bound accessors for
    /// that specific object. Only then is the instance assembled and handed
    /// to script code.
    fn create_instance(
        &self,
        args: &[Value],
    ) -> RtResult<Value>;

    /// Expose this class as a callable constructor value.
    fn constructor_value(&self) -> Value;
}

impl NativeClassExt for Rc<NativeClass> {
    fn create_instance(
        &self,
        args: &[Value],
    ) -> RtResult<Value> {
        let constructor = self.constructor.clone().ok_or_else(|| {
            RuntimeError::Type(format!(
                "Native class '{}' has no constructor",
                self.name
            ))
        })?;
        let bindings = constructor(args)?;
        debug!(class = %self.name, "native instance constructed and bound");
        Ok(Value::NativeInstance(Rc::new(NativeInstance::new(
            self.clone(),
            bindings,
        ))))
    }

    fn constructor_value(&self) -> Value {
        let class = self.clone();
        Value::Builtin(Rc::new(BuiltinFunction {
            name: class.name.clone(),
            func: Rc::new(move |args| class.create_instance(args)),
        }))
    }
}

/// A named collection of functions, classes, constants, and variables,
/// with an explicit public-export set.
#[derive(Default)]
pub struct NativeModule {
    name: String,
    version: String,
    description: String,
    author: String,
    functions: IndexMap<String, NativeFn>,
    classes: IndexMap<String, Rc<NativeClass>>,
    constants: IndexMap<String, Value>,
    variables: IndexMap<String, Value>,
    function_docs: IndexMap<String, String>,
    /// Names visible to importers; internal symbols stay out of this set.
    exports: HashSet<String>,
}

impl fmt::Debug for NativeModule {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("NativeModule")
            .field("name", &self.name)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .field("exports", &self.exports.len())
            .finish()
    }
}

impl NativeModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(
        &mut self,
        name: impl Into<String>,
    ) {
        self.name = name.into();
    }

    pub fn set_version(
        &mut self,
        version: impl Into<String>,
    ) {
        self.version = version.into();
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_description(
        &mut self,
        description: impl Into<String>,
    ) {
        self.description = description.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_author(
        &mut self,
        author: impl Into<String>,
    ) {
        self.author = author.into();
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    // ========================================================================
    // Exports
    // ========================================================================

    pub fn export_function(
        &mut self,
        name: impl Into<String>,
        func: NativeFn,
    ) {
        let name = name.into();
        self.functions.insert(name.clone(), func);
        self.exports.insert(name);
    }

    pub fn export_class(
        &mut self,
        name: impl Into<String>,
        mut class: NativeClass,
    ) {
        let name = name.into();
        class.set_name(name.clone());
        self.classes.insert(name.clone(), Rc::new(class));
        self.exports.insert(name);
    }

    pub fn export_constant(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) {
        let name = name.into();
        self.constants.insert(name.clone(), value);
        self.exports.insert(name);
    }

    pub fn export_variable(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) {
        let name = name.into();
        self.variables.insert(name.clone(), value);
        self.exports.insert(name);
    }

    /// Register a function without making it publicly visible.
    pub fn export_internal_function(
        &mut self,
        name: impl Into<String>,
        func: NativeFn,
    ) {
        self.functions.insert(name.into(), func);
    }

    /// Register a constant without making it publicly visible.
    pub fn export_internal_constant(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.constants.insert(name.into(), value);
    }

    pub fn set_function_doc(
        &mut self,
        name: impl Into<String>,
        doc: impl Into<String>,
    ) {
        self.function_docs.insert(name.into(), doc.into());
    }

    pub fn function_doc(
        &self,
        name: &str,
    ) -> &str {
        self.function_docs.get(name).map_or("", String::as_str)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn has_function(
        &self,
        name: &str,
    ) -> bool {
        self.functions.contains_key(name)
    }

    pub fn has_class(
        &self,
        name: &str,
    ) -> bool {
        self.classes.contains_key(name)
    }

    pub fn has_constant(
        &self,
        name: &str,
    ) -> bool {
        self.constants.contains_key(name)
    }

    pub fn has_variable(
        &self,
        name: &str,
    ) -> bool {
        self.variables.contains_key(name)
    }

    pub fn has_symbol(
        &self,
        name: &str,
    ) -> bool {
        self.has_function(name)
            || self.has_class(name)
            || self.has_constant(name)
            || self.has_variable(name)
    }

    pub fn is_exported(
        &self,
        name: &str,
    ) -> bool {
        self.exports.contains(name)
    }

    pub fn get_function(
        &self,
        name: &str,
    ) -> Option<NativeFn> {
        self.functions.get(name).cloned()
    }

    pub fn get_class(
        &self,
        name: &str,
    ) -> Option<Rc<NativeClass>> {
        self.classes.get(name).cloned()
    }

    pub fn get_constant(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.constants.get(name).cloned()
    }

    pub fn get_variable(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    pub fn set_variable(
        &mut self,
        name: &str,
        value: Value,
    ) -> RtResult<()> {
        match self.variables.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::Attribute(format!(
                "Module '{}' has no variable '{}'",
                self.name, name
            ))),
        }
    }

    /// Any symbol, reified as a value: functions become builtins, classes
    /// become callable constructors.
    pub fn get_symbol(
        &self,
        name: &str,
    ) -> Option<Value> {
        if let Some(func) = self.functions.get(name) {
            return Some(Value::Builtin(Rc::new(BuiltinFunction {
                name: format!("{}.{}", self.name, name),
                func: func.clone(),
            })));
        }
        if let Some(class) = self.classes.get(name) {
            return Some(class.constructor_value());
        }
        if let Some(constant) = self.constants.get(name) {
            return Some(constant.clone());
        }
        self.variables.get(name).cloned()
    }

    /// Names in the public export set.
    pub fn exported_symbols(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exports.iter().cloned().collect();
        names.sort();
        names
    }

    /// Every symbol name, exported or internal.
    pub fn all_symbols(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .functions
            .keys()
            .chain(self.classes.keys())
            .chain(self.constants.keys())
            .chain(self.variables.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Exported name -> value map, the payload of `import *`.
    pub fn exported_symbol_values(&self) -> IndexMap<String, Value> {
        self.exported_symbols()
            .into_iter()
            .filter_map(|name| self.get_symbol(&name).map(|value| (name, value)))
            .collect()
    }
}
