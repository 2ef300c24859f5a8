//! Runtime value model
//!
//! `Value` is the unified dynamically-typed handle every script-level entity
//! is represented as. It is a closed tagged union: scalar variants are inline
//! copies, composite variants share their payload through `Rc` with interior
//! mutability, so mutation of a list/dict/instance is visible to every holder
//! and the payload lives as long as its longest-lived holder.
//!
//! Operations are deliberately *not* implemented here. Every arithmetic,
//! comparison, subscript, member, containment, length, and slice call
//! forwards to the variant's type descriptor (see `runtime::types`); the thin
//! methods on `Value` exist only so callers can write `a.add(&b)?`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::api::native::{NativeFn, NativeModule};
use crate::api::wrapper::NativeInstance;
use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::int_kind::{smallest_kind_for_value, IntKind, DEFAULT_INT};
use crate::runtime::scheduler::Promise;
use crate::runtime::types::{self, TypeDescriptor};

/// Integer payload plus its kind tag.
///
/// Equality is by payload alone; the kind affects promotion, not identity.
#[derive(Debug, Clone, Copy)]
pub struct IntValue {
    pub value: i64,
    pub kind: IntKind,
}

impl IntValue {
    pub fn new(
        value: i64,
        kind: IntKind,
    ) -> Self {
        Self { value, kind }
    }
}

impl PartialEq for IntValue {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.value == other.value
    }
}

/// A function parameter declaration.
#[derive(Debug, Clone)]
pub struct Param {
    /// Parameter name, never empty.
    pub name: String,
    /// Declared type name, if any.
    pub type_name: Option<String>,
    /// Default value, if any.
    pub default: Option<Value>,
}

impl Param {
    /// Create a parameter; an empty name is a `ValueError`.
    pub fn new(
        name: impl Into<String>,
        type_name: Option<String>,
        default: Option<Value>,
    ) -> RtResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RuntimeError::Value(
                "Function parameter name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            type_name,
            default,
        })
    }
}

/// Opaque handle to a function body held by the (out-of-scope) interpreter.
///
/// The runtime core never looks inside; it only stores and hands it back.
pub type BodyId = u32;

/// A named script function definition.
#[derive(Debug)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    pub is_async: bool,
    pub body: BodyId,
}

/// An anonymous function with a captured environment.
#[derive(Debug)]
pub struct LambdaDef {
    pub params: Vec<Param>,
    pub is_async: bool,
    pub body: BodyId,
    /// Captured variables, written by the interpreter at closure creation.
    pub captured: RefCell<IndexMap<String, Value>>,
}

/// A host function exposed to scripts.
pub struct BuiltinFunction {
    pub name: String,
    pub func: NativeFn,
}

impl fmt::Debug for BuiltinFunction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("BuiltinFunction")
            .field("name", &self.name)
            .finish()
    }
}

/// A member variable declaration on a class.
#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub name: String,
    pub type_name: Option<String>,
    pub default: Option<Value>,
    pub is_const: bool,
}

/// A named class: member declarations, method table, optional single parent.
///
/// Created once when the class declaration is evaluated; shared by all
/// instances.
#[derive(Debug)]
pub struct ClassDef {
    pub name: String,
    pub members: Vec<MemberDecl>,
    pub methods: IndexMap<String, Value>,
    pub parent: Option<Rc<ClassDef>>,
}

impl ClassDef {
    /// Member declarations visible on an instance: inherited first, own
    /// declarations overriding same-named parent ones.
    pub fn effective_members(&self) -> Vec<MemberDecl> {
        let mut merged: IndexMap<String, MemberDecl> = IndexMap::new();
        if let Some(parent) = &self.parent {
            for decl in parent.effective_members() {
                merged.insert(decl.name.clone(), decl);
            }
        }
        for decl in &self.members {
            merged.insert(decl.name.clone(), decl.clone());
        }
        merged.into_values().collect()
    }

    /// Resolve a method through the inheritance chain.
    pub fn find_method(
        &self,
        name: &str,
    ) -> Option<Value> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }
        self.parent.as_ref().and_then(|p| p.find_method(name))
    }

    /// Resolve a member declaration, child declarations overriding parent
    /// ones.
    pub fn find_member_decl(
        &self,
        name: &str,
    ) -> Option<MemberDecl> {
        if let Some(decl) = self.members.iter().find(|m| m.name == name) {
            return Some(decl.clone());
        }
        self.parent.as_ref().and_then(|p| p.find_member_decl(name))
    }
}

/// An instantiated class: member map plus const bookkeeping.
#[derive(Debug)]
pub struct ClassInstance {
    pub class: Rc<ClassDef>,
    pub members: RefCell<IndexMap<String, Value>>,
    /// Names declared const somewhere in the chain.
    const_members: HashSet<String>,
    /// Const members that have received their one allowed assignment.
    assigned_consts: RefCell<HashSet<String>>,
}

impl ClassInstance {
    /// Instantiate a class. Every declared member (own + inherited) is
    /// present afterwards, defaulting to `none`; a const member with an
    /// explicit default counts as already assigned.
    pub fn new(class: Rc<ClassDef>) -> Rc<Self> {
        let mut members = IndexMap::new();
        let mut const_members = HashSet::new();
        let mut assigned_consts = HashSet::new();
        for decl in class.effective_members() {
            if decl.is_const {
                const_members.insert(decl.name.clone());
                if decl.default.is_some() {
                    assigned_consts.insert(decl.name.clone());
                }
            }
            members.insert(decl.name.clone(), decl.default.unwrap_or(Value::None));
        }
        Rc::new(Self {
            class,
            members: RefCell::new(members),
            const_members,
            assigned_consts: RefCell::new(assigned_consts),
        })
    }

    pub fn has_member(
        &self,
        name: &str,
    ) -> bool {
        self.members.borrow().contains_key(name)
    }

    pub fn get_member(
        &self,
        name: &str,
    ) -> RtResult<Value> {
        self.members.borrow().get(name).cloned().ok_or_else(|| {
            RuntimeError::Attribute(format!(
                "Member '{}' not found in instance of '{}'",
                name, self.class.name
            ))
        })
    }

    /// Assign a member. Const members accept exactly one assignment.
    pub fn set_member(
        &self,
        name: &str,
        value: Value,
    ) -> RtResult<()> {
        if !self.has_member(name) {
            return Err(RuntimeError::Attribute(format!(
                "Member '{}' not found in instance of '{}'",
                name, self.class.name
            )));
        }
        if self.const_members.contains(name) {
            let mut assigned = self.assigned_consts.borrow_mut();
            if assigned.contains(name) {
                return Err(RuntimeError::Type(format!(
                    "Cannot modify const member '{name}'"
                )));
            }
            assigned.insert(name.to_string());
        }
        // Declared member types are enforced on assignment; none always
        // passes so members can be cleared back to their unset state.
        if let Some(decl) = self.class.find_member_decl(name) {
            if let Some(expected) = &decl.type_name {
                let actual = value.type_name();
                if !matches!(value, Value::None) && *expected != actual {
                    return Err(RuntimeError::Type(format!(
                        "Type mismatch for member '{name}': expected {expected}, got {actual}"
                    )));
                }
            }
        }
        self.members.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }
}

/// A method signature required by an interface.
#[derive(Debug, Clone)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<String>,
}

/// A named interface: a set of required method signatures.
#[derive(Debug)]
pub struct InterfaceDef {
    pub name: String,
    pub methods: Vec<MethodSig>,
}

/// A raised error reified as a script value.
///
/// Exposes the synthetic read-only members `message`, `type`, and `cause`.
#[derive(Debug)]
pub struct ExceptionValue {
    pub error: RuntimeError,
    pub cause: Option<Value>,
}

/// A thin file handle value. The actual I/O wrapper lives with the embedder.
#[derive(Debug)]
pub struct FileHandle {
    pub path: String,
    pub mode: String,
}

/// The dynamically-typed handle for every script value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The none value
    #[default]
    None,

    /// Boolean
    Bool(bool),

    /// Integer with kind tag
    Int(IntValue),

    /// 64-bit float
    Float(f64),

    /// Immutable string
    Str(Rc<str>),

    /// Ordered, mutable, shared sequence
    List(Rc<RefCell<Vec<Value>>>),

    /// String-keyed, mutable, shared mapping
    Dict(Rc<RefCell<IndexMap<String, Value>>>),

    /// Named script function
    Function(Rc<FunctionDef>),

    /// Anonymous function with captures
    Lambda(Rc<LambdaDef>),

    /// Host function exposed to scripts
    Builtin(Rc<BuiltinFunction>),

    /// Class object
    Class(Rc<ClassDef>),

    /// Class instance
    Instance(Rc<ClassInstance>),

    /// Interface object
    Interface(Rc<InterfaceDef>),

    /// Raised error as a value
    Exception(Rc<ExceptionValue>),

    /// File handle
    File(Rc<FileHandle>),

    /// Settleable future handle
    Promise(Promise),

    /// Native module exposed by the interop bridge
    Module(Rc<NativeModule>),

    /// Wrapped host object from the interop bridge
    NativeInstance(Rc<NativeInstance>),
}

/// The two boolean values and the none value. All booleans and nones in the
/// system are indistinguishable copies of these constants.
pub const TRUE: Value = Value::Bool(true);
pub const FALSE: Value = Value::Bool(false);
pub const NONE: Value = Value::None;

impl Value {
    /// Make an integer value, auto-detecting the kind: the default kind when
    /// the payload fits, otherwise the smallest signed kind that holds it.
    pub fn int(value: i64) -> Value {
        let kind = if DEFAULT_INT.value_fits(value) {
            DEFAULT_INT
        } else {
            smallest_kind_for_value(value, true)
        };
        Value::Int(IntValue::new(value, kind))
    }

    /// Make an integer value with an explicit kind.
    pub fn int_with_kind(
        value: i64,
        kind: IntKind,
    ) -> Value {
        Value::Int(IntValue::new(value, kind))
    }

    pub fn float(value: f64) -> Value {
        Value::Float(value)
    }

    pub fn string(value: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(value.as_ref()))
    }

    pub fn bool_of(value: bool) -> Value {
        if value {
            TRUE
        } else {
            FALSE
        }
    }

    pub fn list(elements: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(elements)))
    }

    pub fn dict(entries: IndexMap<String, Value>) -> Value {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn exception(
        error: RuntimeError,
        cause: Option<Value>,
    ) -> Value {
        Value::Exception(Rc::new(ExceptionValue { error, cause }))
    }

    /// The script-visible type name of this value.
    ///
    /// Class instances report their class name; wrapped native instances
    /// report their native class name.
    pub fn type_name(&self) -> String {
        match self {
            Value::Instance(inst) => inst.class.name.clone(),
            Value::NativeInstance(inst) => inst.class_name().to_string(),
            other => other.kind_name().to_string(),
        }
    }

    /// The variant name, independent of any class identity.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Function(_) => "function",
            Value::Lambda(_) => "lambda",
            Value::Builtin(_) => "builtin_function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Interface(_) => "interface",
            Value::Exception(_) => "exception",
            Value::File(_) => "file",
            Value::Promise(_) => "promise",
            Value::Module(_) => "module",
            Value::NativeInstance(_) => "native_instance",
        }
    }

    /// The type descriptor implementing this value's operation protocol.
    ///
    /// Fixed at construction; a value never re-types.
    pub fn type_desc(&self) -> &'static dyn TypeDescriptor {
        types::descriptor_for(self)
    }

    // ========================================================================
    // Dispatch forwarding
    // ========================================================================

    pub fn add(
        &self,
        other: &Value,
    ) -> RtResult<Value> {
        self.type_desc().add(self, other)
    }

    pub fn subtract(
        &self,
        other: &Value,
    ) -> RtResult<Value> {
        self.type_desc().subtract(self, other)
    }

    pub fn multiply(
        &self,
        other: &Value,
    ) -> RtResult<Value> {
        self.type_desc().multiply(self, other)
    }

    pub fn divide(
        &self,
        other: &Value,
    ) -> RtResult<Value> {
        self.type_desc().divide(self, other)
    }

    pub fn modulo(
        &self,
        other: &Value,
    ) -> RtResult<Value> {
        self.type_desc().modulo(self, other)
    }

    pub fn power(
        &self,
        other: &Value,
    ) -> RtResult<Value> {
        self.type_desc().power(self, other)
    }

    pub fn negate(&self) -> RtResult<Value> {
        self.type_desc().negate(self)
    }

    pub fn is_truthy(&self) -> bool {
        self.type_desc().is_truthy(self)
    }

    pub fn equals(
        &self,
        other: &Value,
    ) -> bool {
        self.type_desc().equals(self, other)
    }

    pub fn compare(
        &self,
        other: &Value,
    ) -> RtResult<i32> {
        self.type_desc().compare(self, other)
    }

    pub fn get_item(
        &self,
        index: &Value,
    ) -> RtResult<Value> {
        self.type_desc().get_item(self, index)
    }

    pub fn set_item(
        &self,
        index: &Value,
        value: Value,
    ) -> RtResult<()> {
        self.type_desc().set_item(self, index, value)
    }

    pub fn get_member(
        &self,
        name: &str,
    ) -> RtResult<Value> {
        self.type_desc().get_member(self, name)
    }

    pub fn set_member(
        &self,
        name: &str,
        value: Value,
    ) -> RtResult<()> {
        self.type_desc().set_member(self, name, value)
    }

    pub fn contains(
        &self,
        item: &Value,
    ) -> RtResult<bool> {
        self.type_desc().contains(self, item)
    }

    pub fn length(&self) -> RtResult<i64> {
        self.type_desc().length(self)
    }

    pub fn slice(
        &self,
        start: &Value,
        end: &Value,
        step: &Value,
    ) -> RtResult<Value> {
        self.type_desc().slice(self, start, end, step)
    }

    /// Call a method on this value through its descriptor.
    pub fn call_method(
        &self,
        name: &str,
        args: &[Value],
    ) -> RtResult<Value> {
        self.type_desc().call_method(self, name, args)
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{}", i.value),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Str(s) => f.write_str(s),
            Value::List(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            Value::Dict(entries) => {
                // Keys render in sorted order regardless of insertion order.
                let entries = entries.borrow();
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                f.write_str("{")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, entries[key.as_str()])?;
                }
                f.write_str("}")
            }
            Value::Function(def) => write!(f, "<function {}>", def.name),
            Value::Lambda(_) => f.write_str("<lambda>"),
            Value::Builtin(b) => write!(f, "<builtin function {}>", b.name),
            Value::Class(c) => write!(f, "<class {}>", c.name),
            Value::Instance(inst) => write!(f, "<{} instance>", inst.class.name),
            Value::Interface(i) => write!(f, "<interface {}>", i.name),
            Value::Exception(e) => write!(f, "{}", e.error),
            Value::File(file) => write!(f, "<file {}>", file.path),
            Value::Promise(p) => f.write_str(&p.describe()),
            Value::Module(m) => write!(f, "<module {}>", m.name()),
            Value::NativeInstance(inst) => write!(f, "<{} instance>", inst.class_name()),
        }
    }
}

/// Format a float the way script code sees it.
///
/// Whole values render as `<int>.0`; everything else renders with up to 15
/// significant digits, trailing zeros stripped but at least one digit kept
/// after the point.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == value.trunc() && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        return format!("{}.0", value as i64);
    }

    let exponent = value.abs().log10().floor() as i32;
    if !(-4..15).contains(&exponent) {
        return format!("{value:e}");
    }
    let decimals = (14 - exponent).max(1) as usize;
    let mut formatted = format!("{value:.decimals$}");
    if formatted.contains('.') {
        while formatted.ends_with('0') {
            formatted.pop();
        }
        if formatted.ends_with('.') {
            formatted.push('0');
        }
    }
    formatted
}
