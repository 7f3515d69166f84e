//! Runtime support for tether bindings.
//!
//! Generated converter modules call into this crate:
//!
//! - [`convert`]: conversion helpers composed by generated converters
//! - [`runtime`]: the shape interpreter, bridge tables, and error reporting
//! - [`function`] / [`interface`]: functions and interfaces across the boundary
//! - [`bridge`] / [`chan`]: channel pairing and forwarding workers
//! - [`sink`]: where errors without a caller end up

pub mod bridge;
pub mod chan;
pub mod convert;
pub mod error;
pub mod eval;
pub mod function;
pub mod interface;
pub mod names;
pub mod native;
pub mod runtime;
pub mod sink;
pub mod value;

pub use bridge::{BridgeState, BridgeTable};
pub use chan::{Chan, NativeChan, ScriptChan, SendError};
pub use error::{ConversionError, ScriptError};
pub use eval::{Evaluator, ExecutionContext, NoEvaluator};
pub use function::{wrap_script_function, Builtin};
pub use interface::{synthesize, SynthesizedObject};
pub use names::TypeNames;
pub use native::{NativeFunc, NativeObject, NativeValue};
pub use runtime::Runtime;
pub use sink::{CollectingSink, ErrorSink, LogSink};
pub use value::{Context, NativeHandle, Record, ScriptFunction, Value};

pub use tether_core::{ChanDir, FloatPrecision, ShapeId, Signedness};
