//! Conversion helpers composed by generated converters.
//!
//! Scalars convert directly. Composite helpers take the element converter
//! as a closure and wrap element failures with their position. Every
//! `*_from_script` helper for a named shape first accepts a [`Value::Native`]
//! handle of that exact type unchanged.

use std::collections::BTreeMap;

use tether_core::{FloatPrecision, Signedness};

use crate::error::ConversionError;
use crate::native::NativeValue;
use crate::value::{NativeHandle, Record, Value};

pub type Result<T> = std::result::Result<T, ConversionError>;

fn script_mismatch(expected: &str, actual: &Value) -> ConversionError {
    ConversionError::mismatch(expected, actual.describe())
}

fn native_mismatch(expected: &str, actual: &NativeValue) -> ConversionError {
    ConversionError::mismatch(expected, actual.kind_name())
}

fn at_index(i: usize, source: ConversionError) -> ConversionError {
    ConversionError::in_field(format!("[{i}]"), source)
}

/// A native handle of exactly `type_name`, unwrapped.
pub fn pass_through(v: &Value, type_name: &str) -> Option<NativeValue> {
    match v {
        Value::Native(h) if h.type_name() == type_name => Some(h.value().clone()),
        _ => None,
    }
}

pub fn bool_to_script(v: &NativeValue) -> Result<Value> {
    match v {
        NativeValue::Bool(b) => Ok(Value::Bool(*b)),
        other => Err(native_mismatch("bool", other)),
    }
}

pub fn bool_from_script(v: &Value) -> Result<NativeValue> {
    match v {
        Value::Bool(b) => Ok(NativeValue::Bool(*b)),
        other => Err(script_mismatch("bool", other)),
    }
}

pub fn int_to_script(v: &NativeValue) -> Result<Value> {
    match v {
        NativeValue::Int(i) => Ok(Value::Int(*i)),
        NativeValue::Uint(u) => Ok(Value::Int(*u as i64)),
        other => Err(native_mismatch("int", other)),
    }
}

/// Integers wrap to the target width like a native conversion would.
pub fn int_from_script(v: &Value, width: u8, signedness: Signedness) -> Result<NativeValue> {
    let raw = match v {
        Value::Int(i) => *i,
        other => {
            let expected = match signedness {
                Signedness::Signed => format!("int{width}"),
                Signedness::Unsigned => format!("uint{width}"),
            };
            return Err(script_mismatch(&expected, other));
        }
    };
    Ok(match signedness {
        Signedness::Signed => NativeValue::Int(match width {
            8 => raw as i8 as i64,
            16 => raw as i16 as i64,
            32 => raw as i32 as i64,
            _ => raw,
        }),
        Signedness::Unsigned => NativeValue::Uint(match width {
            8 => raw as u8 as u64,
            16 => raw as u16 as u64,
            32 => raw as u32 as u64,
            _ => raw as u64,
        }),
    })
}

pub fn float_to_script(v: &NativeValue) -> Result<Value> {
    match v {
        NativeValue::Float(f) => Ok(Value::Float(*f)),
        other => Err(native_mismatch("float", other)),
    }
}

/// Accepts integers as well as floats.
pub fn float_from_script(v: &Value, precision: FloatPrecision) -> Result<NativeValue> {
    let raw = match v {
        Value::Float(f) => *f,
        Value::Int(i) => *i as f64,
        other => {
            let expected = match precision {
                FloatPrecision::F32 => "float32",
                FloatPrecision::F64 => "float64",
            };
            return Err(script_mismatch(expected, other));
        }
    };
    Ok(NativeValue::Float(match precision {
        FloatPrecision::F32 => raw as f32 as f64,
        FloatPrecision::F64 => raw,
    }))
}

pub fn string_to_script(v: &NativeValue) -> Result<Value> {
    match v {
        NativeValue::String(s) => Ok(Value::String(s.clone())),
        other => Err(native_mismatch("string", other)),
    }
}

pub fn string_from_script(v: &Value) -> Result<NativeValue> {
    match v {
        Value::String(s) => Ok(NativeValue::String(s.clone())),
        other => Err(script_mismatch("string", other)),
    }
}

/// Zero-method interface: unwraps dynamic values, boxes everything else
/// that has no plain script form.
pub fn any_to_script(v: &NativeValue) -> Result<Value> {
    Ok(match v {
        NativeValue::Dynamic(value) => value.clone(),
        NativeValue::Boxed(h) => Value::Native(h.clone()),
        NativeValue::Bool(b) => Value::Bool(*b),
        NativeValue::Int(i) => Value::Int(*i),
        NativeValue::Uint(u) => Value::Int(*u as i64),
        NativeValue::Float(f) => Value::Float(*f),
        NativeValue::String(s) => Value::String(s.clone()),
        NativeValue::Error(Some(msg)) => Value::Error(msg.clone()),
        NativeValue::Interface(Some(obj)) => match obj.script_value() {
            Some(value) => value,
            None => Value::Native(NativeHandle::new(obj.type_name(), v.clone())),
        },
        nil if nil.is_nil() => Value::None,
        other => Value::Native(NativeHandle::new("any", other.clone())),
    })
}

pub fn any_from_script(v: &Value) -> Result<NativeValue> {
    Ok(NativeValue::Dynamic(v.clone()))
}

pub fn error_to_script(v: &NativeValue) -> Result<Value> {
    match v {
        NativeValue::Error(None) | NativeValue::Interface(None) => Ok(Value::None),
        NativeValue::Error(Some(msg)) => Ok(Value::Error(msg.clone())),
        other => Err(native_mismatch("error", other)),
    }
}

/// `None` is the nil error; strings become error messages.
pub fn error_from_script(v: &Value) -> Result<NativeValue> {
    match v {
        Value::None => Ok(NativeValue::Error(None)),
        Value::Error(msg) | Value::String(msg) => Ok(NativeValue::Error(Some(msg.clone()))),
        other => Err(script_mismatch("error", other)),
    }
}

pub fn slice_to_script(
    v: &NativeValue,
    type_name: &str,
    element: impl Fn(&NativeValue) -> Result<Value>,
) -> Result<Value> {
    match v {
        NativeValue::Slice(items) => items
            .iter()
            .enumerate()
            .map(|(i, e)| element(e).map_err(|err| at_index(i, err)))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        other => Err(native_mismatch(type_name, other)),
    }
}

/// `None` converts to an empty slice.
pub fn slice_from_script(
    v: &Value,
    type_name: &str,
    element: impl Fn(&Value) -> Result<NativeValue>,
) -> Result<NativeValue> {
    if let Some(native) = pass_through(v, type_name) {
        return Ok(native);
    }
    match v {
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, e)| element(e).map_err(|err| at_index(i, err)))
            .collect::<Result<Vec<_>>>()
            .map(NativeValue::Slice),
        Value::None => Ok(NativeValue::Slice(Vec::new())),
        other => Err(script_mismatch(type_name, other)),
    }
}

pub fn array_to_script(
    v: &NativeValue,
    type_name: &str,
    length: usize,
    element: impl Fn(&NativeValue) -> Result<Value>,
) -> Result<Value> {
    match v {
        NativeValue::Array(items) if items.len() != length => Err(ConversionError::LengthMismatch {
            type_name: type_name.to_string(),
            expected: length,
            actual: items.len(),
        }),
        NativeValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, e)| element(e).map_err(|err| at_index(i, err)))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        other => Err(native_mismatch(type_name, other)),
    }
}

/// The list length must equal the array length exactly.
pub fn array_from_script(
    v: &Value,
    type_name: &str,
    length: usize,
    element: impl Fn(&Value) -> Result<NativeValue>,
) -> Result<NativeValue> {
    if let Some(native) = pass_through(v, type_name) {
        return Ok(native);
    }
    match v {
        Value::List(items) if items.len() != length => Err(ConversionError::LengthMismatch {
            type_name: type_name.to_string(),
            expected: length,
            actual: items.len(),
        }),
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, e)| element(e).map_err(|err| at_index(i, err)))
            .collect::<Result<Vec<_>>>()
            .map(NativeValue::Array),
        other => Err(script_mismatch(type_name, other)),
    }
}

pub fn map_to_script(
    v: &NativeValue,
    type_name: &str,
    value: impl Fn(&NativeValue) -> Result<Value>,
) -> Result<Value> {
    match v {
        NativeValue::Map(entries) => {
            let mut dict = BTreeMap::new();
            for (key, e) in entries {
                let converted = value(e).map_err(|err| ConversionError::in_field(key.clone(), err))?;
                dict.insert(key.clone(), converted);
            }
            Ok(Value::Dict(dict))
        }
        other => Err(native_mismatch(type_name, other)),
    }
}

/// `None` converts to an empty map.
pub fn map_from_script(
    v: &Value,
    type_name: &str,
    value: impl Fn(&Value) -> Result<NativeValue>,
) -> Result<NativeValue> {
    if let Some(native) = pass_through(v, type_name) {
        return Ok(native);
    }
    match v {
        Value::Dict(entries) => {
            let mut map = BTreeMap::new();
            for (key, e) in entries {
                let converted = value(e).map_err(|err| ConversionError::in_field(key.clone(), err))?;
                map.insert(key.clone(), converted);
            }
            Ok(NativeValue::Map(map))
        }
        Value::None => Ok(NativeValue::Map(BTreeMap::new())),
        other => Err(script_mismatch(type_name, other)),
    }
}

/// A nil pointer becomes `None`; otherwise the pointee converts.
pub fn pointer_to_script(
    v: &NativeValue,
    type_name: &str,
    element: impl Fn(&NativeValue) -> Result<Value>,
) -> Result<Value> {
    match v {
        NativeValue::Pointer(None) => Ok(Value::None),
        NativeValue::Pointer(Some(pointee)) => element(pointee),
        other => Err(native_mismatch(type_name, other)),
    }
}

/// `None` and the integer `0` are nil; any other integer is rejected.
pub fn pointer_from_script(
    v: &Value,
    type_name: &str,
    element: impl Fn(&Value) -> Result<NativeValue>,
) -> Result<NativeValue> {
    if let Some(native) = pass_through(v, type_name) {
        return Ok(native);
    }
    match v {
        Value::None | Value::Int(0) => Ok(NativeValue::Pointer(None)),
        Value::Int(n) => Err(ConversionError::InvalidNilSentinel {
            type_name: type_name.to_string(),
            value: *n,
        }),
        other => Ok(NativeValue::Pointer(Some(Box::new(element(other)?)))),
    }
}

pub fn record_to_script(
    v: &NativeValue,
    type_name: &str,
    fields: &[&str],
    field: impl Fn(usize, &NativeValue) -> Result<Value>,
) -> Result<Value> {
    match v {
        NativeValue::Struct(values) if values.len() != fields.len() => {
            Err(ConversionError::LengthMismatch {
                type_name: type_name.to_string(),
                expected: fields.len(),
                actual: values.len(),
            })
        }
        NativeValue::Struct(values) => {
            let mut converted = Vec::with_capacity(values.len());
            for (i, (name, value)) in fields.iter().zip(values).enumerate() {
                let value = field(i, value).map_err(|err| ConversionError::in_field(*name, err))?;
                converted.push((name.to_string(), value));
            }
            Ok(Value::Record(Record::new(type_name, converted)))
        }
        other => Err(native_mismatch(type_name, other)),
    }
}

/// Accepts a record or a dict; every declared field must be present.
pub fn record_from_script(
    v: &Value,
    type_name: &str,
    fields: &[&str],
    field: impl Fn(usize, &Value) -> Result<NativeValue>,
) -> Result<NativeValue> {
    if let Some(native) = pass_through(v, type_name) {
        return Ok(native);
    }
    if !matches!(v, Value::Record(_) | Value::Dict(_)) {
        return Err(script_mismatch(type_name, v));
    }
    let mut values = Vec::with_capacity(fields.len());
    for (i, name) in fields.iter().enumerate() {
        let value = record_slot(v, name).ok_or_else(|| ConversionError::MissingField {
            type_name: type_name.to_string(),
            field: name.to_string(),
        })?;
        values.push(field(i, value).map_err(|err| ConversionError::in_field(*name, err))?);
    }
    Ok(NativeValue::Struct(values))
}

fn record_slot<'v>(v: &'v Value, name: &str) -> Option<&'v Value> {
    match v {
        Value::Record(r) => r.get(name),
        Value::Dict(d) => d.get(name),
        _ => None,
    }
}

/// Opaque values cross as handles; a boxed value keeps its handle.
pub fn opaque_to_script(v: &NativeValue, type_name: &str) -> Result<Value> {
    match v {
        NativeValue::Boxed(h) => Ok(Value::Native(h.clone())),
        other => Ok(Value::Native(NativeHandle::new(type_name, other.clone()))),
    }
}

/// Only a handle of the same opaque type converts back.
pub fn opaque_from_script(v: &Value, type_name: &str) -> Result<NativeValue> {
    match v {
        Value::Native(h) if h.type_name() == type_name => Ok(NativeValue::Boxed(h.clone())),
        other => Err(script_mismatch(type_name, other)),
    }
}
