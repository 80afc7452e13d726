//! Hand-off of wand notifications from the transport's thread to the dispatcher task.
//!
//! The dispatcher task is the only owner of the hooks and the listener registry.
//! Registration changes and decoded readings reach it through one queue, so listeners
//! always observe registrations in the order they were made. A transport thread that
//! submits a reading blocks until every hook and listener for it has returned.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use futures::StreamExt;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::channel::oneshot;
use futures::executor::block_on;
use indexmap::IndexMap;
use log::{debug, error, trace, warn};
use tokio::spawn;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::device::decode::decode_reading;
use crate::device::transport::NotifyCallback;
use crate::device::types::{Characteristic, EventKind, Orientation, Reading};
use crate::error::{panic_message, DispatchError, WandError};

/// Per-wand handlers that run before the registered listeners. Every method defaults to a no-op.
pub trait WandHooks: Send + Sync + 'static {
    fn on_position(&self, _orientation: Orientation) {}

    fn on_button(&self, _pressed: bool) {}

    fn on_temperature(&self, _value: i16) {}

    fn on_battery(&self, _value: u8) {}

    /// Runs after the transport connected; an error aborts the connect.
    fn post_connect(&self, _address: &str) -> Result<(), WandError> {
        Ok(())
    }

    fn post_disconnect(&self, _address: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl WandHooks for NoHooks {}

pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

#[derive(Clone)]
pub enum Listener {
    Position(Callback<Orientation>),
    Button(Callback<bool>),
    Temperature(Callback<i16>),
    Battery(Callback<u8>),
}

impl Listener {
    pub fn position<F: Fn(Orientation) + Send + Sync + 'static>(callback: F) -> Self {
        Listener::Position(Arc::new(callback))
    }

    pub fn button<F: Fn(bool) + Send + Sync + 'static>(callback: F) -> Self {
        Listener::Button(Arc::new(callback))
    }

    pub fn temperature<F: Fn(i16) + Send + Sync + 'static>(callback: F) -> Self {
        Listener::Temperature(Arc::new(callback))
    }

    pub fn battery<F: Fn(u8) + Send + Sync + 'static>(callback: F) -> Self {
        Listener::Battery(Arc::new(callback))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Listener::Position(_) => EventKind::Position,
            Listener::Button(_) => EventKind::Button,
            Listener::Temperature(_) => EventKind::Temperature,
            Listener::Battery(_) => EventKind::Battery,
        }
    }

    fn call(&self, reading: &Reading) {
        match (self, *reading) {
            (Listener::Position(callback), Reading::Orientation(orientation)) => callback(orientation),
            (Listener::Button(callback), Reading::Button { pressed }) => callback(pressed),
            (Listener::Temperature(callback), Reading::Temperature { raw }) => callback(raw),
            (Listener::Battery(callback), Reading::Battery { raw }) => callback(raw),
            _ => {},
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listener::{:?}", self.kind())
    }
}

/// Keyed listeners per event kind. Invocation order is registration order; registering
/// again under an existing key replaces the callback in place.
#[derive(Debug, Default, Clone)]
pub struct ListenerRegistry {
    listeners: [IndexMap<String, Listener>; 4],
}

impl ListenerRegistry {
    pub fn register(&mut self, key: String, listener: Listener) -> Option<Listener> {
        self.listeners[listener.kind().index()].insert(key, listener)
    }

    pub fn unregister(&mut self, kind: EventKind, key: &str) -> Option<Listener> {
        self.listeners[kind.index()].shift_remove(key)
    }

    pub fn len(&self, kind: EventKind) -> usize {
        self.listeners[kind.index()].len()
    }

    pub fn keys(&self, kind: EventKind) -> impl Iterator<Item = &str> {
        self.listeners[kind.index()].keys().map(String::as_str)
    }

    pub fn notify(&self, reading: &Reading) {
        for listener in self.listeners[reading.kind().index()].values() {
            listener.call(reading);
        }
    }
}

fn run_handlers(hooks: &dyn WandHooks, registry: &ListenerRegistry, reading: &Reading) -> Result<(), DispatchError> {
    catch_unwind(AssertUnwindSafe(|| {
        match *reading {
            Reading::Orientation(orientation) => hooks.on_position(orientation),
            Reading::Button { pressed } => hooks.on_button(pressed),
            Reading::Temperature { raw } => hooks.on_temperature(raw),
            Reading::Battery { raw } => hooks.on_battery(raw),
        }
        registry.notify(reading);
    }))
    .map_err(|panic| DispatchError::HandlerPanicked {
        kind: reading.kind(),
        message: panic_message(&panic),
    })
}

enum Command {
    Register { key: String, listener: Listener },
    Unregister { kind: EventKind, key: String },
    SetHooks(Arc<dyn WandHooks>),
    Dispatch { reading: Reading, done: oneshot::Sender<Result<(), DispatchError>> },
}

/// Handle to a running dispatcher task.
#[derive(Clone)]
pub struct Dispatcher {
    sender: UnboundedSender<Command>,
}

impl Dispatcher {
    /// Spawns the dispatcher task on the current tokio runtime.
    ///
    /// The task ends with `Ok` once every handle is dropped or [`Dispatcher::close`] is
    /// called, and with the error of the first hook or listener that panicked.
    pub fn spawn(hooks: Arc<dyn WandHooks>) -> (Dispatcher, JoinHandle<Result<(), DispatchError>>) {
        let (sender, mut receiver) = unbounded::<Command>();

        let handle = spawn(async move {
            let mut hooks = hooks;
            let mut registry = ListenerRegistry::default();

            while let Some(command) = receiver.next().await {
                match command {
                    Command::Register { key, listener } => {
                        debug!("Registering {} listener {:?}", listener.kind(), key);
                        registry.register(key, listener);
                    },
                    Command::Unregister { kind, key } => {
                        if registry.unregister(kind, &key).is_some() {
                            debug!("Unregistered {} listener {:?}", kind, key);
                        }
                    },
                    Command::SetHooks(new_hooks) => {
                        hooks = new_hooks;
                    },
                    Command::Dispatch { reading, done } => {
                        let result = run_handlers(hooks.as_ref(), &registry, &reading);

                        // the submitter might have given up waiting, the result still stands
                        let _ = done.send(result.clone());

                        if let Err(err) = result {
                            error!("Stopping notification dispatcher: {}", err);
                            return Err(err);
                        }
                    },
                }
            }

            Ok(())
        });

        (Dispatcher { sender }, handle)
    }

    fn send(&self, command: Command) -> Result<(), DispatchError> {
        self.sender.unbounded_send(command).map_err(|_| DispatchError::Closed)
    }

    pub fn register(&self, key: String, listener: Listener) -> Result<(), DispatchError> {
        self.send(Command::Register { key, listener })
    }

    pub fn unregister(&self, kind: EventKind, key: String) -> Result<(), DispatchError> {
        self.send(Command::Unregister { kind, key })
    }

    pub fn set_hooks(&self, hooks: Arc<dyn WandHooks>) -> Result<(), DispatchError> {
        self.send(Command::SetHooks(hooks))
    }

    /// Runs the hooks and listeners for `reading`, blocking the calling thread until they finish.
    ///
    /// Must not be called from a thread that drives the dispatcher's runtime.
    pub fn dispatch(&self, reading: Reading) -> Result<(), DispatchError> {
        let (done, completion) = oneshot::channel();
        self.send(Command::Dispatch { reading, done })?;

        block_on(completion).map_err(|_| DispatchError::Closed)?
    }

    /// Entry point for the transport: decodes a raw notification and dispatches it.
    ///
    /// Notifications from characteristics that carry no events are ignored. A payload that
    /// fails to decode is logged and dropped without running any handler.
    pub fn handle_notification(&self, uuid: Uuid, data: &[u8]) -> Result<(), DispatchError> {
        let kind = match Characteristic::from_uuid(&uuid).and_then(EventKind::from_characteristic) {
            Some(kind) => kind,
            None => {
                trace!("Ignoring notification from {}", uuid);
                return Ok(());
            },
        };

        let reading = match decode_reading(kind, data) {
            Ok(reading) => reading,
            Err(err) => {
                warn!("Dropping {} notification: {}", kind, err);
                return Ok(());
            },
        };

        trace!("Dispatching {:?}", reading);
        self.dispatch(reading)
    }

    pub fn notify_callback(&self) -> NotifyCallback {
        let dispatcher = self.clone();
        Arc::new(move |uuid: Uuid, data: &[u8]| dispatcher.handle_notification(uuid, data))
    }

    /// Stops accepting commands; the task exits after draining what was already queued.
    pub fn close(&self) {
        self.sender.close_channel();
    }
}
