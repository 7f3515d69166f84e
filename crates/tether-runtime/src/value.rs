//! Script-side values.
//!
//! [`Value`] is the host view of whatever the embedded interpreter holds.
//! Handles ([`ScriptFunction`], [`Context`], [`NativeHandle`], channels)
//! compare by identity; data compares by content.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::chan::ScriptChan;
use crate::function::Builtin;
use crate::native::NativeValue;

/// A function defined in script code.
///
/// The body is interpreter-owned and opaque to the runtime; only the
/// [`crate::Evaluator`] knows how to run it.
#[derive(Clone)]
pub struct ScriptFunction {
    name: String,
    arity: usize,
    body: Arc<dyn Any + Send + Sync>,
}

impl ScriptFunction {
    pub fn new(name: impl Into<String>, arity: usize, body: impl Any + Send + Sync) -> Self {
        Self {
            name: name.into(),
            arity,
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn body<T: Any>(&self) -> Option<&T> {
        self.body.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptFunction({}/{})", self.name, self.arity)
    }
}

impl PartialEq for ScriptFunction {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A struct value with named fields in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.iter().find(|(name, _)| name == field).map(|(_, v)| v)
    }
}

/// A script object with named slots.
///
/// Slots are shared between clones; equality is identity.
#[derive(Debug, Clone)]
pub struct Context {
    slots: Arc<Vec<(String, Value)>>,
}

impl Context {
    pub fn new(slots: Vec<(String, Value)>) -> Self {
        Self {
            slots: Arc::new(slots),
        }
    }

    /// Builder-style slot insertion, replacing an existing slot of the same name.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        let slots = Arc::make_mut(&mut self.slots);
        match slots.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => slots.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn slots(&self) -> &[(String, Value)] {
        &self.slots
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A native value handed to the script without conversion.
///
/// Round-tripping a handle yields the very same allocation.
#[derive(Debug, Clone)]
pub struct NativeHandle {
    type_name: Arc<str>,
    value: Arc<NativeValue>,
}

impl NativeHandle {
    pub fn new(type_name: &str, value: NativeValue) -> Self {
        Self {
            type_name: Arc::from(type_name),
            value: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn value(&self) -> &NativeValue {
        &self.value
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl PartialEq for NativeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A value in the embedded interpreter.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    Record(Record),
    Function(ScriptFunction),
    /// A native function exposed to the script.
    Builtin(Builtin),
    Context(Context),
    Channel(ScriptChan),
    Native(NativeHandle),
    Error(String),
}

impl Value {
    /// Short type name as the interpreter would report it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Record(_) => "record",
            Self::Function(_) => "function",
            Self::Builtin(_) => "builtin",
            Self::Context(_) => "context",
            Self::Channel(_) => "channel",
            Self::Native(_) => "native",
            Self::Error(_) => "error",
        }
    }

    /// Descriptive type used in conversion error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Record(r) => format!("record {}", r.type_name),
            Self::Native(h) => format!("native {}", h.type_name()),
            Self::Function(f) => format!("function {}/{}", f.name(), f.arity()),
            other => other.type_name().to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a == b,
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Context(a), Self::Context(b)) => a == b,
            (Self::Channel(a), Self::Channel(b)) => a == b,
            (Self::Native(a), Self::Native(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}
