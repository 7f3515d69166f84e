//! Function values across the boundary.
//!
//! Native functions reach the script as [`Builtin`]s; script functions reach
//! native code as [`NativeFunc`]s that call back through the evaluator.
//! Either kind converts back to the original object.

use std::fmt;
use std::sync::Arc;

use tether_core::{FuncShape, ShapeId, ShapeKind};

use crate::error::{ConversionError, ScriptError};
use crate::native::{NativeFunc, NativeValue};
use crate::runtime::Runtime;
use crate::value::{ScriptFunction, Value};

/// A native function callable from script code.
#[derive(Clone)]
pub struct Builtin {
    name: String,
    func: NativeFunc,
    signature: FuncShape,
    runtime: Runtime,
}

impl Builtin {
    pub fn new(runtime: &Runtime, name: impl Into<String>, func: NativeFunc, signature: FuncShape) -> Self {
        Self {
            name: name.into(),
            func,
            signature,
            runtime: runtime.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.signature.params.len()
    }

    pub fn native(&self) -> &NativeFunc {
        &self.func
    }

    /// Call from script code.
    ///
    /// Arity is checked before any argument is converted. A non-nil trailing
    /// error result is raised as [`ConversionError::Script`]; the remaining
    /// results come back as `None`, a single value, or a list.
    pub fn call(&self, args: Vec<Value>) -> Result<Value, ConversionError> {
        invoke_native(&self.runtime, &self.name, &self.signature, &args, |natives| {
            self.func.call(natives)
        })
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({}/{})", self.name, self.arity())
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.func.ptr_eq(&other.func)
    }
}

/// Convert script arguments, run `call`, and convert its results back.
pub(crate) fn invoke_native(
    rt: &Runtime,
    callee: &str,
    signature: &FuncShape,
    args: &[Value],
    call: impl FnOnce(&[NativeValue]) -> Result<Vec<NativeValue>, ConversionError>,
) -> Result<Value, ConversionError> {
    if args.len() != signature.params.len() {
        return Err(ConversionError::ArityMismatch {
            callee: callee.to_string(),
            expected: signature.params.len(),
            actual: args.len(),
        });
    }
    let mut natives = Vec::with_capacity(args.len());
    for (position, (arg, &shape)) in args.iter().zip(&signature.params).enumerate() {
        let native = rt
            .from_script(shape, arg)
            .map_err(|source| ConversionError::Argument {
                callee: callee.to_string(),
                position,
                source: Box::new(source),
            })?;
        natives.push(native);
    }

    let mut results = call(&natives)?;
    if results.len() != signature.results.len() {
        return Err(ConversionError::Failure {
            detail: format!(
                "{callee} returned {} results, declared {}",
                results.len(),
                signature.results.len()
            ),
        });
    }

    let mut shapes: Vec<ShapeId> = signature.results.clone();
    if let Some(&last) = shapes.last() {
        if matches!(rt.shape(last)?.kind, ShapeKind::Error) {
            shapes.pop();
            if let Some(NativeValue::Error(Some(message))) = results.pop() {
                return Err(ScriptError::new(format!("{callee}: {message}")).into());
            }
        }
    }

    let mut converted = results
        .iter()
        .zip(&shapes)
        .map(|(value, &shape)| rt.to_script(shape, value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match converted.len() {
        0 => Value::None,
        1 => converted.pop().unwrap_or(Value::None),
        _ => Value::List(converted),
    })
}

/// Wrap a script function so native code can call it.
///
/// Failures inside the script are reported to the error sink and the call
/// yields zero values for every declared result.
pub fn wrap_script_function(rt: &Runtime, signature: &FuncShape, function: ScriptFunction) -> NativeFunc {
    let runtime = rt.clone();
    let sig = signature.clone();
    let target = function.clone();
    let call = Arc::new(move |args: &[NativeValue]| -> Result<Vec<NativeValue>, ConversionError> {
        if args.len() != sig.params.len() {
            return Err(ConversionError::ArityMismatch {
                callee: target.name().to_string(),
                expected: sig.params.len(),
                actual: args.len(),
            });
        }
        let mut script_args = Vec::with_capacity(args.len());
        for (position, (arg, &shape)) in args.iter().zip(&sig.params).enumerate() {
            let value = runtime
                .to_script(shape, arg)
                .map_err(|source| ConversionError::Argument {
                    callee: target.name().to_string(),
                    position,
                    source: Box::new(source),
                })?;
            script_args.push(value);
        }
        match runtime.context().call(&target, script_args) {
            Ok(result) => unmarshal_results(&runtime, target.name(), &sig.results, result),
            Err(err) => {
                runtime.report(&ScriptError::new(format!("{}: {}", target.name(), err)).into());
                Ok(sig.results.iter().map(|&r| runtime.zero_value(r)).collect())
            }
        }
    });
    let name = function.name().to_string();
    NativeFunc::wrapping(name, call, function)
}

fn unmarshal_results(
    rt: &Runtime,
    callee: &str,
    results: &[ShapeId],
    value: Value,
) -> Result<Vec<NativeValue>, ConversionError> {
    match results {
        [] => Ok(Vec::new()),
        [single] => Ok(vec![rt.from_script(*single, &value)?]),
        many => {
            let items = match value {
                Value::List(items) if items.len() == many.len() => items,
                Value::List(items) => {
                    return Err(ConversionError::ArityMismatch {
                        callee: callee.to_string(),
                        expected: many.len(),
                        actual: items.len(),
                    })
                }
                _ => {
                    return Err(ConversionError::ArityMismatch {
                        callee: callee.to_string(),
                        expected: many.len(),
                        actual: 1,
                    })
                }
            };
            items
                .iter()
                .zip(many)
                .map(|(item, &shape)| rt.from_script(shape, item))
                .collect()
        }
    }
}

pub(crate) fn func_to_script(
    rt: &Runtime,
    type_name: &str,
    signature: &FuncShape,
    v: &NativeValue,
) -> Result<Value, ConversionError> {
    match v {
        NativeValue::Func(None) => Ok(Value::None),
        NativeValue::Func(Some(func)) => Ok(match func.origin() {
            Some(origin) => Value::Function(origin.clone()),
            None => Value::Builtin(Builtin::new(rt, func.name(), func.clone(), signature.clone())),
        }),
        other => Err(ConversionError::mismatch(type_name, other.kind_name())),
    }
}

pub(crate) fn func_from_script(
    rt: &Runtime,
    type_name: &str,
    signature: &FuncShape,
    v: &Value,
) -> Result<NativeValue, ConversionError> {
    match v {
        Value::None | Value::Int(0) => Ok(NativeValue::Func(None)),
        Value::Int(n) => Err(ConversionError::InvalidNilSentinel {
            type_name: type_name.to_string(),
            value: *n,
        }),
        Value::Builtin(builtin) => Ok(NativeValue::Func(Some(builtin.native().clone()))),
        Value::Function(function) => Ok(NativeValue::Func(Some(wrap_script_function(
            rt,
            signature,
            function.clone(),
        )))),
        Value::Native(h) if h.type_name() == type_name => Ok(h.value().clone()),
        other => Err(ConversionError::mismatch(type_name, other.describe())),
    }
}
