//! Closable channels.
//!
//! A [`Chan`] is a crossbeam channel plus a close signal: closing drops the
//! signal's sender, which wakes every blocked sender and receiver. Receivers
//! drain buffered values before observing the close.
//!
//! Each channel also has a delivery queue. A bridge worker delivers script
//! values there and reads only the values native code sent, so it never
//! reads back its own sends. Receivers see both queues.

use std::fmt;
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Select, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::native::NativeValue;
use crate::value::Value;

/// Returned by [`Chan::send`] on a closed channel, carrying the value back.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("send on a closed channel")]
pub struct SendError<T>(pub T);

struct ChanInner<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    deliver_tx: Sender<T>,
    deliver_rx: Receiver<T>,
    close_tx: Mutex<Option<Sender<()>>>,
    close_rx: Receiver<()>,
    capacity: Option<usize>,
}

/// A multi-producer, multi-consumer channel that can be closed once.
pub struct Chan<T> {
    inner: Arc<ChanInner<T>>,
}

/// The native-side channel type.
pub type NativeChan = Chan<NativeValue>;

impl<T> Chan<T> {
    pub fn unbounded() -> Self {
        let (tx, rx) = channel::unbounded();
        Self::with_parts(tx, rx, None)
    }

    /// A buffered channel; capacity `0` is a rendezvous channel.
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = channel::bounded(capacity);
        Self::with_parts(tx, rx, Some(capacity))
    }

    fn with_parts(tx: Sender<T>, rx: Receiver<T>, capacity: Option<usize>) -> Self {
        let (close_tx, close_rx) = channel::bounded(0);
        let (deliver_tx, deliver_rx) = match capacity {
            Some(n) => channel::bounded(n),
            None => channel::unbounded(),
        };
        Self {
            inner: Arc::new(ChanInner {
                tx,
                rx,
                deliver_tx,
                deliver_rx,
                close_tx: Mutex::new(Some(close_tx)),
                close_rx,
                capacity,
            }),
        }
    }

    /// Stable identity of the channel, shared by all clones.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// `None` for unbounded channels.
    pub fn capacity(&self) -> Option<usize> {
        self.inner.capacity
    }

    /// Close the channel. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        self.inner.close_tx.lock().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.close_tx.lock().is_none()
    }

    /// Block until the value is accepted or the channel is closed.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        self.push(&self.inner.tx, value)
    }

    /// Send into the delivery queue, bypassing [`receiver`](Self::receiver).
    pub(crate) fn deliver(&self, value: T) -> Result<(), SendError<T>> {
        self.push(&self.inner.deliver_tx, value)
    }

    fn push(&self, tx: &Sender<T>, value: T) -> Result<(), SendError<T>> {
        if self.is_closed() {
            return Err(SendError(value));
        }
        let mut sel = Select::new();
        let send_op = sel.send(tx);
        sel.recv(&self.inner.close_rx);
        let op = sel.select();
        if op.index() == send_op {
            op.send(tx, value).map_err(|e| SendError(e.into_inner()))
        } else {
            let _ = op.recv(&self.inner.close_rx);
            Err(SendError(value))
        }
    }

    /// Block until a value arrives. `None` once the channel is closed and
    /// drained.
    pub fn recv(&self) -> Option<T> {
        if let Some(value) = self.try_recv() {
            return Some(value);
        }
        let mut sel = Select::new();
        let sent_op = sel.recv(&self.inner.rx);
        let delivered_op = sel.recv(&self.inner.deliver_rx);
        sel.recv(&self.inner.close_rx);
        let op = sel.select();
        let index = op.index();
        if index == sent_op {
            op.recv(&self.inner.rx).ok()
        } else if index == delivered_op {
            op.recv(&self.inner.deliver_rx).ok()
        } else {
            let _ = op.recv(&self.inner.close_rx);
            self.try_recv()
        }
    }

    pub fn try_recv(&self) -> Option<T> {
        match self.inner.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                self.inner.deliver_rx.try_recv().ok()
            }
        }
    }

    /// Number of buffered values.
    pub fn len(&self) -> usize {
        self.inner.rx.len() + self.inner.deliver_rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.rx.is_empty() && self.inner.deliver_rx.is_empty()
    }

    /// Values sent with [`send`](Self::send) only.
    pub(crate) fn receiver(&self) -> &Receiver<T> {
        &self.inner.rx
    }

    /// Becomes ready (disconnected) when the channel closes.
    pub(crate) fn close_signal(&self) -> &Receiver<()> {
        &self.inner.close_rx
    }
}

impl<T> Clone for Chan<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Chan<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> fmt::Debug for Chan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chan")
            .field("id", &format_args!("{:#x}", self.id()))
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The script-side endpoint of a channel bridge.
///
/// Script sends go to `outgoing`, script receives read `incoming`; the
/// bridge worker moves values between these and the native channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptChan {
    incoming: Chan<Value>,
    outgoing: Chan<Value>,
}

impl ScriptChan {
    pub fn new() -> Self {
        Self {
            incoming: Chan::unbounded(),
            outgoing: Chan::unbounded(),
        }
    }

    pub fn id(&self) -> usize {
        self.outgoing.id()
    }

    pub fn send(&self, value: Value) -> Result<(), SendError<Value>> {
        self.outgoing.send(value)
    }

    pub fn recv(&self) -> Option<Value> {
        self.incoming.recv()
    }

    pub fn try_recv(&self) -> Option<Value> {
        self.incoming.try_recv()
    }

    /// Close from the script side. Returns `true` only for the first close
    /// of either side.
    pub fn close(&self) -> bool {
        self.outgoing.close()
    }

    pub fn is_closed(&self) -> bool {
        self.outgoing.is_closed()
    }

    pub(crate) fn incoming(&self) -> &Chan<Value> {
        &self.incoming
    }

    pub(crate) fn outgoing(&self) -> &Chan<Value> {
        &self.outgoing
    }
}

impl Default for ScriptChan {
    fn default() -> Self {
        Self::new()
    }
}
