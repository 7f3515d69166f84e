//! The conversion runtime.
//!
//! A [`Runtime`] owns the shape table of one generated module, the execution
//! context used to call back into scripts, and the bridge tables. It also
//! interprets shapes directly: generated converters delegate function,
//! channel and interface shapes to [`Runtime::to_script`] and
//! [`Runtime::from_script`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tether_core::{ChanDir, Shape, ShapeId, ShapeKind, ShapeTable};

use crate::bridge::{self, BridgeTable};
use crate::convert;
use crate::error::ConversionError;
use crate::eval::ExecutionContext;
use crate::function::{self, invoke_native};
use crate::interface;
use crate::names::TypeNames;
use crate::native::NativeValue;
use crate::sink::{self, ErrorSink};
use crate::value::Value;

/// The parts of a generated JSON manifest the runtime needs.
#[derive(Debug, Deserialize)]
struct Manifest {
    shapes: ShapeTable,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

struct Inner {
    shapes: ShapeTable,
    context: ExecutionContext,
    sink: Option<Arc<dyn ErrorSink>>,
    bridges: Mutex<HashMap<(ShapeId, ChanDir), Arc<BridgeTable>>>,
    names: TypeNames,
}

/// Shared handle; clones refer to the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<Inner>,
}

impl Runtime {
    /// Errors without a caller go to the process-wide sink.
    pub fn new(shapes: ShapeTable, context: ExecutionContext) -> Self {
        Self::build(shapes, context, None)
    }

    pub fn with_error_sink(shapes: ShapeTable, context: ExecutionContext, sink: Arc<dyn ErrorSink>) -> Self {
        Self::build(shapes, context, Some(sink))
    }

    /// Load the shape table and struct aliases from a generated manifest.
    pub fn from_manifest(json: &str, context: ExecutionContext) -> Result<Self, serde_json::Error> {
        let manifest: Manifest = serde_json::from_str(json)?;
        let rt = Self::new(manifest.shapes, context);
        for (alias, listing) in &manifest.aliases {
            rt.type_names().register_alias(alias, listing);
        }
        log::debug!(
            "loaded manifest: {} shapes, {} aliases",
            rt.shapes().len(),
            manifest.aliases.len()
        );
        Ok(rt)
    }

    fn build(shapes: ShapeTable, context: ExecutionContext, sink: Option<Arc<dyn ErrorSink>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                shapes,
                context,
                sink,
                bridges: Mutex::new(HashMap::new()),
                names: TypeNames::new(),
            }),
        }
    }

    pub fn shapes(&self) -> &ShapeTable {
        &self.inner.shapes
    }

    pub fn shape(&self, id: ShapeId) -> Result<&Shape, ConversionError> {
        self.inner.shapes.get(id).ok_or(ConversionError::UnknownShape(id))
    }

    pub fn shape_named(&self, name: &str) -> Option<ShapeId> {
        self.inner.shapes.find(name).map(|s| s.id)
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.inner.context
    }

    pub fn type_names(&self) -> &TypeNames {
        &self.inner.names
    }

    /// Report an error that has no caller to return to.
    pub fn report(&self, error: &ConversionError) {
        match &self.inner.sink {
            Some(sink) => sink.report(error),
            None => sink::report(error),
        }
    }

    /// The bridge table for channels of `element` in `direction`.
    pub fn bridge_table(&self, element: ShapeId, direction: ChanDir) -> Arc<BridgeTable> {
        let mut bridges = self.inner.bridges.lock();
        let table = bridges.entry((element, direction)).or_insert_with(|| {
            let name = self
                .inner
                .shapes
                .get(element)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| element.to_string());
            Arc::new(BridgeTable::new(element, name, direction))
        });
        Arc::clone(table)
    }

    /// Convert a native value to script form. Struct aliases in errors are
    /// spelled out with their fields.
    pub fn to_script(&self, id: ShapeId, v: &NativeValue) -> Result<Value, ConversionError> {
        self.convert_to(id, v).map_err(|e| self.inner.names.explain(e))
    }

    /// Convert a script value to native form; see [`to_script`](Self::to_script).
    pub fn from_script(&self, id: ShapeId, v: &Value) -> Result<NativeValue, ConversionError> {
        self.convert_from(id, v).map_err(|e| self.inner.names.explain(e))
    }

    fn convert_to(&self, id: ShapeId, v: &NativeValue) -> Result<Value, ConversionError> {
        let shape = self.shape(id)?;
        let name = shape.name.as_str();
        match &shape.kind {
            ShapeKind::Bool => convert::bool_to_script(v),
            ShapeKind::Int { .. } => convert::int_to_script(v),
            ShapeKind::Float { .. } => convert::float_to_script(v),
            ShapeKind::String => convert::string_to_script(v),
            ShapeKind::Any => convert::any_to_script(v),
            ShapeKind::Error => convert::error_to_script(v),
            ShapeKind::Slice { element } => convert::slice_to_script(v, name, |e| self.convert_to(*element, e)),
            ShapeKind::Array { element, length } => {
                convert::array_to_script(v, name, *length, |e| self.convert_to(*element, e))
            }
            ShapeKind::Map { value } => convert::map_to_script(v, name, |e| self.convert_to(*value, e)),
            ShapeKind::Pointer { element } => {
                convert::pointer_to_script(v, name, |e| self.convert_to(*element, e))
            }
            ShapeKind::Record { fields } => {
                let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                convert::record_to_script(v, name, &names, |i, f| match fields.get(i) {
                    Some(field) => self.convert_to(field.shape, f),
                    None => Err(ConversionError::Failure {
                        detail: format!("{name}: no field {i}"),
                    }),
                })
            }
            ShapeKind::Func(signature) => function::func_to_script(self, name, signature, v),
            ShapeKind::Chan { direction, element } => {
                bridge::chan_to_script(self, name, *element, *direction, v)
            }
            ShapeKind::Interface { .. } => interface::interface_to_script(name, v),
            ShapeKind::Opaque { .. } => convert::opaque_to_script(v, name),
        }
    }

    fn convert_from(&self, id: ShapeId, v: &Value) -> Result<NativeValue, ConversionError> {
        let shape = self.shape(id)?;
        let name = shape.name.as_str();
        match &shape.kind {
            ShapeKind::Bool => convert::bool_from_script(v),
            ShapeKind::Int { width, signedness } => convert::int_from_script(v, *width, *signedness),
            ShapeKind::Float { precision } => convert::float_from_script(v, *precision),
            ShapeKind::String => convert::string_from_script(v),
            ShapeKind::Any => convert::any_from_script(v),
            ShapeKind::Error => convert::error_from_script(v),
            ShapeKind::Slice { element } => {
                convert::slice_from_script(v, name, |e| self.convert_from(*element, e))
            }
            ShapeKind::Array { element, length } => {
                convert::array_from_script(v, name, *length, |e| self.convert_from(*element, e))
            }
            ShapeKind::Map { value } => convert::map_from_script(v, name, |e| self.convert_from(*value, e)),
            ShapeKind::Pointer { element } => {
                convert::pointer_from_script(v, name, |e| self.convert_from(*element, e))
            }
            ShapeKind::Record { fields } => {
                let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                convert::record_from_script(v, name, &names, |i, f| match fields.get(i) {
                    Some(field) => self.convert_from(field.shape, f),
                    None => Err(ConversionError::Failure {
                        detail: format!("{name}: no field {i}"),
                    }),
                })
            }
            ShapeKind::Func(signature) => function::func_from_script(self, name, signature, v),
            ShapeKind::Chan { direction, element } => {
                bridge::chan_from_script(self, name, *element, *direction, v)
            }
            ShapeKind::Interface { methods } => interface::interface_from_script(self, name, methods, v),
            ShapeKind::Opaque { .. } => convert::opaque_from_script(v, name),
        }
    }

    /// The zero value native code would see for `id`.
    pub fn zero_value(&self, id: ShapeId) -> NativeValue {
        let Ok(shape) = self.shape(id) else {
            return NativeValue::Dynamic(Value::None);
        };
        match &shape.kind {
            ShapeKind::Bool => NativeValue::Bool(false),
            ShapeKind::Int { signedness, .. } => match signedness {
                tether_core::Signedness::Signed => NativeValue::Int(0),
                tether_core::Signedness::Unsigned => NativeValue::Uint(0),
            },
            ShapeKind::Float { .. } => NativeValue::Float(0.0),
            ShapeKind::String => NativeValue::String(String::new()),
            ShapeKind::Slice { .. } => NativeValue::Slice(Vec::new()),
            ShapeKind::Array { element, length } => {
                NativeValue::Array((0..*length).map(|_| self.zero_value(*element)).collect())
            }
            ShapeKind::Map { .. } => NativeValue::Map(BTreeMap::new()),
            ShapeKind::Pointer { .. } => NativeValue::Pointer(None),
            ShapeKind::Func(_) => NativeValue::Func(None),
            ShapeKind::Chan { .. } => NativeValue::Chan(None),
            ShapeKind::Interface { .. } => NativeValue::Interface(None),
            ShapeKind::Any => NativeValue::Dynamic(Value::None),
            ShapeKind::Error => NativeValue::Error(None),
            ShapeKind::Record { fields } => {
                NativeValue::Struct(fields.iter().map(|f| self.zero_value(f.shape)).collect())
            }
            ShapeKind::Opaque { .. } => NativeValue::Dynamic(Value::None),
        }
    }

    /// Call a method on a native interface value held by the script.
    pub fn call_method(&self, target: &Value, method: &str, args: Vec<Value>) -> Result<Value, ConversionError> {
        let Value::Native(handle) = target else {
            return Err(ConversionError::mismatch("native interface value", target.describe()));
        };
        let NativeValue::Interface(Some(object)) = handle.value() else {
            return Err(ConversionError::mismatch("native interface value", target.describe()));
        };
        let shape = self
            .shape_named(handle.type_name())
            .map(|id| self.shape(id))
            .transpose()?;
        let Some(ShapeKind::Interface { methods }) = shape.map(|s| &s.kind) else {
            return Err(ConversionError::Failure {
                detail: format!("{} is not a known interface", handle.type_name()),
            });
        };
        let Some(found) = methods.iter().find(|m| m.name == method) else {
            return Err(ConversionError::Failure {
                detail: format!("{} has no method {method}", handle.type_name()),
            });
        };
        let callee = format!("{}.{method}", handle.type_name());
        invoke_native(self, &callee, &found.func, &args, |natives| {
            object.call_method(method, natives)
        })
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("shapes", &self.inner.shapes.len())
            .field("aliases", &self.inner.names.len())
            .finish()
    }
}
