//! Error sink for failures that have no caller to return to.
//!
//! Bridge workers and wrapped script functions report here. The process-wide
//! sink logs through `log::error!` until replaced; a [`crate::Runtime`] may
//! carry its own sink instead.

use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::error::ConversionError;

pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &ConversionError);
}

/// Default sink: logs each error.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, error: &ConversionError) {
        log::error!("tether: {error}");
    }
}

/// Keeps every reported error for later inspection.
#[derive(Debug, Default)]
pub struct CollectingSink {
    errors: Mutex<Vec<ConversionError>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<ConversionError> {
        self.errors.lock().clone()
    }

    pub fn take(&self) -> Vec<ConversionError> {
        std::mem::take(&mut *self.errors.lock())
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, error: &ConversionError) {
        self.errors.lock().push(error.clone());
    }
}

static GLOBAL_SINK: OnceLock<RwLock<Arc<dyn ErrorSink>>> = OnceLock::new();

fn global() -> &'static RwLock<Arc<dyn ErrorSink>> {
    GLOBAL_SINK.get_or_init(|| RwLock::new(Arc::new(LogSink)))
}

/// Replace the process-wide sink, returning the previous one.
pub fn set_global_sink(sink: Arc<dyn ErrorSink>) -> Arc<dyn ErrorSink> {
    std::mem::replace(&mut *global().write(), sink)
}

pub fn global_sink() -> Arc<dyn ErrorSink> {
    Arc::clone(&*global().read())
}

/// Report to the process-wide sink.
pub fn report(error: &ConversionError) {
    let sink = global_sink();
    sink.report(error);
}
