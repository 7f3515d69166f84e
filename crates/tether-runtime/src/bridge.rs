//! Channel bridges.
//!
//! Each native channel that crosses the boundary is paired with one
//! [`ScriptChan`], and a dedicated worker thread moves values between the
//! two, converting each one. A pairing is registered under both channel ids
//! before its worker starts, so the same channel always maps to the same
//! counterpart. When either side closes, the worker drains what is
//! buffered, closes the other side, and removes the pairing.
//!
//! Script values are delivered to the native channel's delivery queue, which
//! the worker never reads, so a `Both` pairing forwards each value exactly
//! one way. Native code receiving on a `Both` channel competes with the
//! worker for values other native code sent.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::Select;
use parking_lot::Mutex;
use tether_core::{ChanDir, ShapeId};

use crate::chan::{NativeChan, ScriptChan};
use crate::error::ConversionError;
use crate::native::NativeValue;
use crate::runtime::Runtime;
use crate::value::Value;

/// Lifecycle of the pairing for one channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// No pairing.
    Absent,
    /// Paired; the worker is forwarding.
    Active,
    /// Both sides are closed; the worker is about to unregister.
    Terminated,
}

struct Pairing {
    native: NativeChan,
    script: ScriptChan,
    terminated: AtomicBool,
}

/// Pairings for one channel element shape and direction.
pub struct BridgeTable {
    element: ShapeId,
    element_name: String,
    direction: ChanDir,
    pairings: Mutex<BTreeMap<usize, Arc<Pairing>>>,
}

impl BridgeTable {
    pub(crate) fn new(element: ShapeId, element_name: impl Into<String>, direction: ChanDir) -> Self {
        Self {
            element,
            element_name: element_name.into(),
            direction,
            pairings: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn element(&self) -> ShapeId {
        self.element
    }

    pub fn direction(&self) -> ChanDir {
        self.direction
    }

    /// The script channel paired with `native`, created on first use.
    pub fn script_side(self: &Arc<Self>, rt: &Runtime, native: &NativeChan) -> ScriptChan {
        let mut pairings = self.pairings.lock();
        if let Some(existing) = pairings.get(&native.id()) {
            return existing.script.clone();
        }
        let pairing = Arc::new(Pairing {
            native: native.clone(),
            script: ScriptChan::new(),
            terminated: AtomicBool::new(false),
        });
        pairings.insert(pairing.native.id(), Arc::clone(&pairing));
        pairings.insert(pairing.script.id(), Arc::clone(&pairing));
        drop(pairings);
        self.start(rt, &pairing);
        pairing.script.clone()
    }

    /// The native channel paired with `script`, created on first use.
    pub fn native_side(self: &Arc<Self>, rt: &Runtime, script: &ScriptChan) -> NativeChan {
        let mut pairings = self.pairings.lock();
        if let Some(existing) = pairings.get(&script.id()) {
            return existing.native.clone();
        }
        let pairing = Arc::new(Pairing {
            native: NativeChan::unbounded(),
            script: script.clone(),
            terminated: AtomicBool::new(false),
        });
        pairings.insert(pairing.native.id(), Arc::clone(&pairing));
        pairings.insert(pairing.script.id(), Arc::clone(&pairing));
        drop(pairings);
        self.start(rt, &pairing);
        pairing.native.clone()
    }

    /// State of the pairing registered under a native or script channel id.
    pub fn state(&self, id: usize) -> BridgeState {
        match self.pairings.lock().get(&id) {
            None => BridgeState::Absent,
            Some(p) if p.terminated.load(Ordering::Acquire) => BridgeState::Terminated,
            Some(_) => BridgeState::Active,
        }
    }

    /// Number of live pairings.
    pub fn len(&self) -> usize {
        self.pairings.lock().len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.lock().is_empty()
    }

    fn start(self: &Arc<Self>, rt: &Runtime, pairing: &Arc<Pairing>) {
        let table = Arc::clone(self);
        let worker_rt = rt.clone();
        let worker_pairing = Arc::clone(pairing);
        let spawned = thread::Builder::new()
            .name("tether-bridge".into())
            .spawn(move || {
                table.run(&worker_rt, &worker_pairing);
                worker_pairing.terminated.store(true, Ordering::Release);
                table.remove(&worker_pairing);
            });
        if let Err(e) = spawned {
            log::error!("failed to start bridge worker for {}: {e}", self.element_name);
            self.remove(pairing);
            pairing.native.close();
            pairing.script.incoming().close();
            pairing.script.outgoing().close();
            rt.report(&ConversionError::Failure {
                detail: format!("bridge worker for {}: {e}", self.element_name),
            });
        }
    }

    fn remove(&self, pairing: &Arc<Pairing>) {
        let mut pairings = self.pairings.lock();
        for id in [pairing.native.id(), pairing.script.id()] {
            if pairings.get(&id).is_some_and(|p| Arc::ptr_eq(p, pairing)) {
                pairings.remove(&id);
            }
        }
    }

    fn run(&self, rt: &Runtime, pairing: &Pairing) {
        let native = &pairing.native;
        let script = &pairing.script;
        let reads_native = self.direction.forwards_to_script();
        log::debug!(
            "bridge for chan {} ({}) started",
            self.element_name,
            self.direction.label()
        );
        loop {
            let mut sel = Select::new();
            let native_rx = reads_native.then(|| sel.recv(native.receiver()));
            let native_closed = sel.recv(native.close_signal());
            let script_rx = sel.recv(script.outgoing().receiver());
            let script_closed = sel.recv(script.outgoing().close_signal());
            let op = sel.select();
            let index = op.index();

            if Some(index) == native_rx {
                if let Ok(value) = op.recv(native.receiver()) {
                    self.forward_to_script(rt, script, &value);
                }
            } else if index == native_closed {
                let _ = op.recv(native.close_signal());
                if reads_native {
                    while let Ok(value) = native.receiver().try_recv() {
                        self.forward_to_script(rt, script, &value);
                    }
                }
                script.incoming().close();
                script.outgoing().close();
                break;
            } else if index == script_rx {
                if let Ok(value) = op.recv(script.outgoing().receiver()) {
                    self.forward_to_native(rt, native, value);
                }
            } else if index == script_closed {
                let _ = op.recv(script.outgoing().close_signal());
                while let Some(value) = script.outgoing().try_recv() {
                    self.forward_to_native(rt, native, value);
                }
                native.close();
                script.incoming().close();
                break;
            }
        }
        log::debug!("bridge for chan {} stopped", self.element_name);
    }

    fn forward_to_script(&self, rt: &Runtime, script: &ScriptChan, value: &NativeValue) {
        match rt.to_script(self.element, value) {
            Ok(converted) => {
                if script.incoming().send(converted).is_err() {
                    log::debug!("dropped value for closed script chan {}", self.element_name);
                }
            }
            Err(e) => rt.report(&e),
        }
    }

    fn forward_to_native(&self, rt: &Runtime, native: &NativeChan, value: Value) {
        if !self.direction.forwards_to_native() {
            rt.report(&ConversionError::Protocol {
                detail: format!("send on receive-only chan {}", self.element_name),
            });
            return;
        }
        match rt.from_script(self.element, &value) {
            Ok(converted) => {
                if native.deliver(converted).is_err() {
                    log::debug!("dropped value for closed native chan {}", self.element_name);
                }
            }
            Err(e) => rt.report(&e),
        }
    }
}

pub(crate) fn chan_to_script(
    rt: &Runtime,
    type_name: &str,
    element: ShapeId,
    direction: ChanDir,
    v: &NativeValue,
) -> Result<Value, ConversionError> {
    match v {
        NativeValue::Chan(None) => Ok(Value::None),
        NativeValue::Chan(Some(native)) => {
            let table = rt.bridge_table(element, direction);
            Ok(Value::Channel(table.script_side(rt, native)))
        }
        other => Err(ConversionError::mismatch(type_name, other.kind_name())),
    }
}

pub(crate) fn chan_from_script(
    rt: &Runtime,
    type_name: &str,
    element: ShapeId,
    direction: ChanDir,
    v: &Value,
) -> Result<NativeValue, ConversionError> {
    match v {
        Value::None | Value::Int(0) => Ok(NativeValue::Chan(None)),
        Value::Int(n) => Err(ConversionError::InvalidNilSentinel {
            type_name: type_name.to_string(),
            value: *n,
        }),
        Value::Channel(script) => {
            let table = rt.bridge_table(element, direction);
            Ok(NativeValue::Chan(Some(table.native_side(rt, script))))
        }
        Value::Native(h) if h.type_name() == type_name => Ok(h.value().clone()),
        other => Err(ConversionError::mismatch(type_name, other.describe())),
    }
}
