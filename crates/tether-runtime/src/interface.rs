//! Interface values across the boundary.
//!
//! A script object (a [`Context`]) becomes a native interface value when
//! every method of the interface is backed by a function slot of matching
//! arity. The slot is looked up by the method name, then by its snake_case
//! form.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tether_core::MethodShape;

use crate::error::ConversionError;
use crate::function::wrap_script_function;
use crate::native::{NativeFunc, NativeObject, NativeValue};
use crate::runtime::Runtime;
use crate::value::{Context, NativeHandle, Value};

/// A native interface implementation backed by script functions.
pub struct SynthesizedObject {
    interface: String,
    context: Context,
    methods: BTreeMap<String, NativeFunc>,
}

impl SynthesizedObject {
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

impl fmt::Debug for SynthesizedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesizedObject")
            .field("interface", &self.interface)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NativeObject for SynthesizedObject {
    fn type_name(&self) -> &str {
        &self.interface
    }

    fn call_method(&self, method: &str, args: &[NativeValue]) -> Result<Vec<NativeValue>, ConversionError> {
        match self.methods.get(method) {
            Some(func) => func.call(args),
            None => Err(ConversionError::Failure {
                detail: format!("{} has no method {method}", self.interface),
            }),
        }
    }

    fn script_value(&self) -> Option<Value> {
        Some(Value::Context(self.context.clone()))
    }
}

/// `ComputeArea` becomes `compute_area`, `HTTPGet` becomes `http_get`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Build a native implementation of `interface` from a script object.
pub fn synthesize(
    rt: &Runtime,
    interface: &str,
    methods: &[MethodShape],
    context: &Context,
) -> Result<SynthesizedObject, ConversionError> {
    let mut bound = BTreeMap::new();
    for method in methods {
        let expected_arity = method.func.params.len();
        let fail = |problem: String| ConversionError::InterfaceSynthesis {
            interface: interface.to_string(),
            method: method.name.clone(),
            expected_arity,
            problem,
        };
        let snake = snake_case(&method.name);
        let slot = context.get(&method.name).or_else(|| context.get(&snake));
        let function = match slot {
            Some(Value::Function(f)) if f.arity() == expected_arity => f.clone(),
            Some(Value::Function(f)) => {
                return Err(fail(format!("slot function takes {} arguments", f.arity())))
            }
            Some(other) => return Err(fail(format!("slot holds {}, not a function", other.describe()))),
            None => return Err(fail(format!("no slot named {} or {snake}", method.name))),
        };
        bound.insert(method.name.clone(), wrap_script_function(rt, &method.func, function));
    }
    Ok(SynthesizedObject {
        interface: interface.to_string(),
        context: context.clone(),
        methods: bound,
    })
}

pub(crate) fn interface_to_script(type_name: &str, v: &NativeValue) -> Result<Value, ConversionError> {
    match v {
        NativeValue::Interface(None) => Ok(Value::None),
        NativeValue::Interface(Some(obj)) => Ok(obj
            .script_value()
            .unwrap_or_else(|| Value::Native(NativeHandle::new(type_name, v.clone())))),
        NativeValue::Boxed(h) => Ok(Value::Native(h.clone())),
        other => Err(ConversionError::mismatch(type_name, other.kind_name())),
    }
}

pub(crate) fn interface_from_script(
    rt: &Runtime,
    type_name: &str,
    methods: &[MethodShape],
    v: &Value,
) -> Result<NativeValue, ConversionError> {
    match v {
        Value::None => Ok(NativeValue::Interface(None)),
        // Handles of another interface type are rejected even when they
        // wrap a live object.
        Value::Native(h) if h.type_name() == type_name => match h.value() {
            NativeValue::Interface(Some(obj)) => Ok(NativeValue::Interface(Some(Arc::clone(obj)))),
            native => Ok(native.clone()),
        },
        Value::Context(context) => {
            let object = synthesize(rt, type_name, methods, context)?;
            Ok(NativeValue::Interface(Some(Arc::new(object))))
        }
        other => Err(ConversionError::mismatch(type_name, other.describe())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_forms() {
        assert_eq!(snake_case("Area"), "area");
        assert_eq!(snake_case("ComputeArea"), "compute_area");
        assert_eq!(snake_case("HTTPGet"), "http_get");
        assert_eq!(snake_case("Read2D"), "read2_d");
        assert_eq!(snake_case("already_snake"), "already_snake");
    }
}
