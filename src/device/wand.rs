use std::sync::Arc;
use log::{debug, info};
use tokio::task::JoinHandle;

use crate::device::constants::{COMMAND_KEEP_ALIVE, COMMAND_RESET_POSITION};
use crate::device::decode::{decode_battery, decode_button, decode_temperature};
use crate::device::dispatch::{Dispatcher, Listener, NoHooks, WandHooks};
use crate::device::encode::{led_payload, vibrate_payload};
use crate::device::transport::{NotifyCallback, Transport};
use crate::device::types::{Characteristic, ConnectionState, EventKind, PatternCode};
use crate::error::{DecodeError, DispatchError, ReadError, WandError};

/// One Kano wand, reached through a [`Transport`].
///
/// Notifications are handled by a dispatcher task spawned on the current tokio runtime
/// when the wand is created: first the [`WandHooks`], then every registered [`Listener`]
/// in registration order.
pub struct Wand {
    address: String,
    name: Option<String>,
    transport: Arc<dyn Transport>,
    hooks: Arc<dyn WandHooks>,
    dispatcher: Dispatcher,
    dispatcher_task: Option<JoinHandle<Result<(), DispatchError>>>,
    state: ConnectionState,
    subscribed: [bool; 4],
}

impl Wand {
    pub fn new(address: String, name: Option<String>, transport: Arc<dyn Transport>) -> Self {
        Wand::with_hooks(address, name, transport, Arc::new(NoHooks))
    }

    pub fn with_hooks(address: String, name: Option<String>, transport: Arc<dyn Transport>, hooks: Arc<dyn WandHooks>) -> Self {
        let (dispatcher, dispatcher_task) = Dispatcher::spawn(hooks.clone());

        Wand {
            address,
            name,
            transport,
            hooks,
            dispatcher,
            dispatcher_task: Some(dispatcher_task),
            state: ConnectionState::Disconnected,
            subscribed: [false; 4],
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.subscribed[kind.index()]
    }

    /// Replaces the hooks; readings dispatched after this call use the new hooks.
    pub fn set_hooks(&mut self, hooks: Arc<dyn WandHooks>) -> Result<(), WandError> {
        self.dispatcher.set_hooks(hooks.clone())?;
        self.hooks = hooks;
        Ok(())
    }

    pub async fn connect(&mut self) -> Result<(), WandError> {
        if self.is_connected() {
            return Err(WandError::AlreadyConnected { address: self.address.clone() });
        }

        info!("Connecting to {}...", self.display_name());

        let connected = self.transport.connect(&self.address).await
            .map_err(|source| WandError::Connection { address: self.address.clone(), source })?;
        if !connected {
            return Err(WandError::ConnectionRefused { address: self.address.clone() });
        }

        self.hooks.post_connect(&self.address)?;
        self.state = ConnectionState::Connected;

        info!("Connected to {}", self.display_name());
        Ok(())
    }

    /// Disconnects even if not connected. Notifications already handed to the dispatcher
    /// may still reach the listeners after this returns.
    ///
    /// The transport drops every subscription with the link, so all subscription flags are cleared.
    pub async fn disconnect(&mut self) -> Result<(), WandError> {
        let result = self.transport.disconnect(&self.address).await;

        self.hooks.post_disconnect(&self.address);
        self.state = ConnectionState::Disconnected;
        self.subscribed = [false; 4];

        info!("Disconnected from {}", self.display_name());
        result.map_err(|source| WandError::Connection { address: self.address.clone(), source })
    }

    async fn read(&self, characteristic: Characteristic) -> Result<Vec<u8>, WandError> {
        self.transport.read(&self.address, characteristic).await
            .map_err(|source| WandError::Read { characteristic, source: source.into() })
    }

    async fn read_string(&self, characteristic: Characteristic) -> Result<String, WandError> {
        let data = self.read(characteristic).await?;
        String::from_utf8(data)
            .map_err(|source| WandError::Read { characteristic, source: source.into() })
    }

    async fn read_decoded<V>(&self, characteristic: Characteristic, decode: fn(&[u8]) -> Result<V, DecodeError>) -> Result<V, WandError> {
        let data = self.read(characteristic).await?;
        decode(&data)
            .map_err(|source| WandError::Read { characteristic, source: ReadError::Decode { source } })
    }

    async fn write(&self, characteristic: Characteristic, data: &[u8]) -> Result<(), WandError> {
        debug!("Writing {:?} to {}", data, characteristic);
        self.transport.write(&self.address, characteristic, data, true).await
            .map_err(|source| WandError::Write { characteristic, source })
    }

    pub async fn organization(&self) -> Result<String, WandError> {
        self.read_string(Characteristic::Organization).await
    }

    pub async fn software_version(&self) -> Result<String, WandError> {
        self.read_string(Characteristic::Software).await
    }

    pub async fn hardware_version(&self) -> Result<String, WandError> {
        self.read_string(Characteristic::Hardware).await
    }

    /// The raw battery level byte as reported by the wand.
    pub async fn battery(&self) -> Result<u8, WandError> {
        self.read_decoded(Characteristic::Battery, decode_battery).await
    }

    pub async fn button(&self) -> Result<bool, WandError> {
        self.read_decoded(Characteristic::UserButton, decode_button).await
    }

    pub async fn temperature(&self) -> Result<i16, WandError> {
        self.read_decoded(Characteristic::Temperature, decode_temperature).await
    }

    pub async fn keep_alive(&self) -> Result<(), WandError> {
        self.write(Characteristic::KeepAlive, &COMMAND_KEEP_ALIVE).await
    }

    /// Accepts a [`crate::device::types::Pattern`] or a raw code, which is sent unchanged.
    pub async fn vibrate<P: Into<PatternCode>>(&self, pattern: P) -> Result<(), WandError> {
        self.write(Characteristic::Vibrator, &vibrate_payload(pattern.into())).await
    }

    /// `color` is a 24-bit hex value such as `#2185d0` or `0x2185d0`.
    pub async fn set_led(&self, color: &str, on: bool) -> Result<(), WandError> {
        let payload = led_payload(color, on)?;
        self.write(Characteristic::Led, &payload).await
    }

    pub async fn reset_position(&self) -> Result<(), WandError> {
        self.write(Characteristic::QuaternionsReset, &COMMAND_RESET_POSITION).await
    }

    pub async fn subscribe(&mut self, kind: EventKind) -> Result<(), WandError> {
        let characteristic = kind.characteristic();
        debug!("Subscribing to {} notifications", kind);

        self.transport.start_notify(&self.address, characteristic, self.dispatcher.notify_callback()).await
            .map_err(|source| WandError::Notify { characteristic, source })?;

        self.subscribed[kind.index()] = true;
        Ok(())
    }

    /// Stops notifications for `kind`. With `continue_notifications` the subscription flag
    /// stays as it was; delivery is still stopped at the transport.
    pub async fn unsubscribe(&mut self, kind: EventKind, continue_notifications: bool) -> Result<(), WandError> {
        let characteristic = kind.characteristic();
        debug!("Unsubscribing from {} notifications", kind);

        self.transport.stop_notify(&self.address, characteristic).await
            .map_err(|source| WandError::Notify { characteristic, source })?;

        if !continue_notifications {
            self.subscribed[kind.index()] = false;
        }
        Ok(())
    }

    pub async fn subscribe_position(&mut self) -> Result<(), WandError> {
        self.subscribe(EventKind::Position).await
    }

    pub async fn unsubscribe_position(&mut self, continue_notifications: bool) -> Result<(), WandError> {
        self.unsubscribe(EventKind::Position, continue_notifications).await
    }

    pub async fn subscribe_button(&mut self) -> Result<(), WandError> {
        self.subscribe(EventKind::Button).await
    }

    pub async fn unsubscribe_button(&mut self, continue_notifications: bool) -> Result<(), WandError> {
        self.unsubscribe(EventKind::Button, continue_notifications).await
    }

    pub async fn subscribe_temperature(&mut self) -> Result<(), WandError> {
        self.subscribe(EventKind::Temperature).await
    }

    pub async fn unsubscribe_temperature(&mut self, continue_notifications: bool) -> Result<(), WandError> {
        self.unsubscribe(EventKind::Temperature, continue_notifications).await
    }

    pub async fn subscribe_battery(&mut self) -> Result<(), WandError> {
        self.subscribe(EventKind::Battery).await
    }

    pub async fn unsubscribe_battery(&mut self, continue_notifications: bool) -> Result<(), WandError> {
        self.unsubscribe(EventKind::Battery, continue_notifications).await
    }

    /// Adds `listener` under `key`, replacing any listener of the same kind registered under that key.
    pub fn register<K: Into<String>>(&self, key: K, listener: Listener) -> Result<(), WandError> {
        Ok(self.dispatcher.register(key.into(), listener)?)
    }

    pub fn unregister<K: Into<String>>(&self, kind: EventKind, key: K) -> Result<(), WandError> {
        Ok(self.dispatcher.unregister(kind, key.into())?)
    }

    /// The callback handed to the transport for every subscription.
    pub fn notification_callback(&self) -> NotifyCallback {
        self.dispatcher.notify_callback()
    }

    /// Stops the dispatcher and reports the handler failure that ended it, if any.
    pub async fn shutdown(mut self) -> Result<(), WandError> {
        self.dispatcher.close();

        let task = match self.dispatcher_task.take() {
            Some(task) => task,
            None => return Ok(()),
        };

        match task.await {
            Ok(result) => Ok(result?),
            Err(_) => Err(DispatchError::Closed.into()),
        }
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

impl Drop for Wand {
    // Callbacks still held by the transport fail with `DispatchError::Closed` from here on
    fn drop(&mut self) {
        self.dispatcher.close();
    }
}
