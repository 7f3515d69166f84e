//! Native-side values.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::chan::NativeChan;
use crate::error::ConversionError;
use crate::value::{NativeHandle, ScriptFunction, Value};

/// Signature of a callable native function.
pub type NativeCall =
    dyn Fn(&[NativeValue]) -> Result<Vec<NativeValue>, ConversionError> + Send + Sync;

/// A native function value.
///
/// When the function wraps a script function, `origin` remembers it so the
/// script gets its own function back instead of a second wrapper.
#[derive(Clone)]
pub struct NativeFunc {
    name: String,
    call: Arc<NativeCall>,
    origin: Option<ScriptFunction>,
}

impl NativeFunc {
    pub fn new(
        name: impl Into<String>,
        call: impl Fn(&[NativeValue]) -> Result<Vec<NativeValue>, ConversionError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            call: Arc::new(call),
            origin: None,
        }
    }

    pub(crate) fn wrapping(name: impl Into<String>, call: Arc<NativeCall>, origin: ScriptFunction) -> Self {
        Self {
            name: name.into(),
            call,
            origin: Some(origin),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[NativeValue]) -> Result<Vec<NativeValue>, ConversionError> {
        (self.call)(args)
    }

    pub fn origin(&self) -> Option<&ScriptFunction> {
        self.origin.as_ref()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for NativeFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "NativeFunc({} wrapping {:?})", self.name, origin),
            None => write!(f, "NativeFunc({})", self.name),
        }
    }
}

impl PartialEq for NativeFunc {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A native object that implements an interface.
pub trait NativeObject: Send + Sync + fmt::Debug {
    /// Qualified name of the implementing type.
    fn type_name(&self) -> &str;

    fn call_method(&self, method: &str, args: &[NativeValue]) -> Result<Vec<NativeValue>, ConversionError>;

    /// The script value this object was synthesized from, if any.
    fn script_value(&self) -> Option<Value> {
        None
    }
}

/// A value on the native side of the boundary.
///
/// `None` payloads are nil.
#[derive(Debug, Clone)]
pub enum NativeValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Slice(Vec<NativeValue>),
    Array(Vec<NativeValue>),
    Map(BTreeMap<String, NativeValue>),
    /// Field values in declared order.
    Struct(Vec<NativeValue>),
    Pointer(Option<Box<NativeValue>>),
    Func(Option<NativeFunc>),
    Chan(Option<NativeChan>),
    Interface(Option<Arc<dyn NativeObject>>),
    Error(Option<String>),
    /// A script value held by an `any`-typed slot.
    Dynamic(Value),
    /// A value of an opaque type, shared with the script side.
    Boxed(NativeHandle),
}

impl NativeValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Slice(_) => "slice",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
            Self::Pointer(_) => "pointer",
            Self::Func(_) => "func",
            Self::Chan(_) => "chan",
            Self::Interface(_) => "interface",
            Self::Error(_) => "error",
            Self::Dynamic(_) => "dynamic",
            Self::Boxed(_) => "boxed",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(
            self,
            Self::Pointer(None)
                | Self::Func(None)
                | Self::Chan(None)
                | Self::Interface(None)
                | Self::Error(None)
        )
    }
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Uint(a), Self::Uint(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Slice(a), Self::Slice(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Struct(a), Self::Struct(b)) => a == b,
            (Self::Pointer(a), Self::Pointer(b)) => a == b,
            (Self::Func(a), Self::Func(b)) => a == b,
            (Self::Chan(a), Self::Chan(b)) => a == b,
            (Self::Interface(a), Self::Interface(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            },
            (Self::Error(a), Self::Error(b)) => a == b,
            (Self::Dynamic(a), Self::Dynamic(b)) => a == b,
            (Self::Boxed(a), Self::Boxed(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_funcs_compare_by_identity() {
        let f = NativeFunc::new("double", |args| Ok(args.to_vec()));
        let g = NativeFunc::new("double", |args| Ok(args.to_vec()));
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
        assert_eq!(f.call(&[NativeValue::Int(2)]).unwrap(), vec![NativeValue::Int(2)]);
    }

    #[test]
    fn nil_values() {
        assert!(NativeValue::Pointer(None).is_nil());
        assert!(NativeValue::Error(None).is_nil());
        assert!(!NativeValue::Int(0).is_nil());
        assert!(!NativeValue::Pointer(Some(Box::new(NativeValue::Int(0)))).is_nil());
    }
}
