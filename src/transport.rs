// src/transport.rs

//! # Transport Seam
//!
//! The stack talks to the simulator and the operator through two small
//! traits: [`Subscriber`] (bounded-timeout receive of the newest frame on a
//! topic) and [`Publisher`] (fire-and-forget send). Any pub/sub library with
//! conflating subscriptions can sit behind them.
//!
//! [`LocalBus`] is the in-process implementation used by the demo and the
//! tests. Each subscription is a one-slot `crossbeam_channel`; publishing into
//! a full slot first drops the stale frame, so a subscriber only ever sees the
//! newest undelivered frame. A slot lives as long as its subscriber; once
//! the subscriber is dropped the bus forgets it on the next publish. Dropping
//! every handle to the bus disconnects its subscribers. Operator commands use
//! a request/reply pipe built from [`command_pipe`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::error::TransportError;

/// Receives frames from one subscribed topic.
pub trait Subscriber: Send {
    /// Waits at most `timeout` for the newest undelivered frame.
    fn recv_timeout(&self, timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

/// Publishes frames.
pub trait Publisher: Send {
    /// Sends one frame. Delivery is best effort.
    fn publish(&self, frame: &[u8]);
}

struct Slot {
    prefix: Vec<u8>,
    tx: Sender<Vec<u8>>,
    // Held by the publisher side so it can evict a stale frame.
    rx: Receiver<Vec<u8>>,
    subscriber: Weak<()>,
}

impl Slot {
    fn is_live(&self) -> bool {
        self.subscriber.strong_count() > 0
    }
}

/// In-process, topic-prefix routed bus with conflating subscriptions.
#[derive(Clone, Default)]
pub struct LocalBus {
    slots: Arc<Mutex<Vec<Slot>>>,
}

impl LocalBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to every frame that starts with `prefix`.
    pub fn subscribe(&self, prefix: &str) -> LocalSubscriber {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let token = Arc::new(());
        let mut slots = self.lock_slots();
        slots.retain(Slot::is_live);
        slots.push(Slot {
            prefix: prefix.as_bytes().to_vec(),
            tx,
            rx: rx.clone(),
            subscriber: Arc::downgrade(&token),
        });
        LocalSubscriber { rx, _token: token }
    }

    /// Number of live subscriptions.
    pub fn subscriptions(&self) -> usize {
        let mut slots = self.lock_slots();
        slots.retain(Slot::is_live);
        slots.len()
    }

    /// Returns a publisher handle onto this bus.
    pub fn publisher(&self) -> LocalPublisher {
        LocalPublisher { bus: self.clone() }
    }

    fn deliver(&self, frame: &[u8]) {
        let mut slots = self.lock_slots();
        slots.retain(Slot::is_live);
        for slot in slots.iter().filter(|slot| frame.starts_with(&slot.prefix)) {
            let mut pending = frame.to_vec();
            loop {
                match slot.tx.try_send(pending) {
                    Ok(()) | Err(TrySendError::Disconnected(_)) => break,
                    Err(TrySendError::Full(rejected)) => {
                        // Conflate: drop the undelivered frame and retry.
                        let _ = slot.rx.try_recv();
                        pending = rejected;
                    }
                }
            }
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Subscription handle returned by [`LocalBus::subscribe`].
pub struct LocalSubscriber {
    rx: Receiver<Vec<u8>>,
    _token: Arc<()>,
}

impl Subscriber for LocalSubscriber {
    fn recv_timeout(&self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => TransportError::Timeout,
            RecvTimeoutError::Disconnected => TransportError::Disconnected,
        })
    }
}

/// Publisher handle returned by [`LocalBus::publisher`].
#[derive(Clone)]
pub struct LocalPublisher {
    bus: LocalBus,
}

impl Publisher for LocalPublisher {
    fn publish(&self, frame: &[u8]) {
        self.bus.deliver(frame);
    }
}

/// A command together with the channel its reply goes to.
pub struct Request {
    /// Command text.
    pub command: Vec<u8>,
    reply: Sender<String>,
}

impl Request {
    /// Sends the reply. A client that stopped waiting is ignored.
    pub fn reply(self, reply: String) {
        let _ = self.reply.send(reply);
    }
}

/// Client half of a command pipe.
#[derive(Clone)]
pub struct CommandClient {
    tx: Sender<Request>,
}

impl CommandClient {
    /// Sends `command` and waits at most `timeout` for the reply.
    pub fn request(&self, command: &str, timeout: Duration) -> Result<String, TransportError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.tx
            .send(Request {
                command: command.as_bytes().to_vec(),
                reply: reply_tx,
            })
            .map_err(|_| TransportError::Disconnected)?;
        reply_rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => TransportError::Timeout,
            RecvTimeoutError::Disconnected => TransportError::Disconnected,
        })
    }
}

/// Server half of a command pipe.
pub struct CommandServer {
    rx: Receiver<Request>,
}

impl CommandServer {
    /// Waits at most `timeout` for the next request.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Request, TransportError> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => TransportError::Timeout,
            RecvTimeoutError::Disconnected => TransportError::Disconnected,
        })
    }
}

/// Creates a connected request/reply pair.
pub fn command_pipe() -> (CommandClient, CommandServer) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (CommandClient { tx }, CommandServer { rx })
}
