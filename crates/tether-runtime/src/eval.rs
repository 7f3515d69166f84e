//! The seam to the embedded interpreter.

use std::fmt;
use std::sync::Arc;

use crate::error::ScriptError;
use crate::value::{ScriptFunction, Value};

/// Runs script functions on behalf of native callers.
///
/// Implementations must be callable from any thread; bridge workers and
/// native code holding wrapped functions call in concurrently.
pub trait Evaluator: Send + Sync {
    /// Call `function` with already converted arguments. Several results
    /// come back as a [`Value::List`].
    fn call(&self, function: &ScriptFunction, args: Vec<Value>) -> Result<Value, ScriptError>;
}

/// Shared handle to the interpreter that owns the script functions.
#[derive(Clone)]
pub struct ExecutionContext {
    evaluator: Arc<dyn Evaluator>,
}

impl ExecutionContext {
    pub fn new(evaluator: impl Evaluator + 'static) -> Self {
        Self {
            evaluator: Arc::new(evaluator),
        }
    }

    pub fn from_arc(evaluator: Arc<dyn Evaluator>) -> Self {
        Self { evaluator }
    }

    pub fn call(&self, function: &ScriptFunction, args: Vec<Value>) -> Result<Value, ScriptError> {
        self.evaluator.call(function, args)
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExecutionContext")
    }
}

/// Evaluator for hosts that never call back into script code.
///
/// Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvaluator;

impl Evaluator for NoEvaluator {
    fn call(&self, function: &ScriptFunction, _args: Vec<Value>) -> Result<Value, ScriptError> {
        Err(ScriptError::new(format!(
            "no interpreter attached to call {}",
            function.name()
        )))
    }
}
