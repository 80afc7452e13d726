use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use btleplug::api::{Central, Characteristic as BtleCharacteristic, Manager as _, Peripheral as _, ScanFilter, ValueNotification, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use tokio::runtime::Handle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::device::transport::{NotifyCallback, Transport};
use crate::device::types::{Advertisement, Characteristic};
use crate::error::TransportError;

type NotificationStream = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;
type CallbackMap = Arc<Mutex<HashMap<Uuid, NotifyCallback>>>;
type LinkMap = Arc<Mutex<HashMap<String, NotificationLink>>>;

// Notification delivery for one connected peripheral
struct NotificationLink {
    callbacks: CallbackMap,
    cancel: CancellationToken,
    pumping: bool,
}

impl NotificationLink {
    fn new() -> Self {
        NotificationLink {
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            cancel: CancellationToken::new(),
            pumping: false,
        }
    }
}

/// [`Transport`] backed by the platform BLE stack through btleplug.
pub struct BtleTransport {
    _manager: Manager,
    runtime: Handle,
    adapters: Vec<Adapter>,
    peripherals: Mutex<HashMap<String, Peripheral>>,
    links: LinkMap,
}

impl BtleTransport {
    /// Must be called from within a tokio runtime; notification threads drive their streams on it.
    pub async fn new() -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;

        for adapter in &adapters {
            info!("Using adapter {}", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));
        }

        Ok(BtleTransport {
            _manager: manager,
            runtime: Handle::current(),
            adapters,
            peripherals: Mutex::new(HashMap::new()),
            links: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn peripheral(&self, address: &str) -> Result<Peripheral, TransportError> {
        let peripherals = self.peripherals.lock().expect("Failed to lock peripherals");
        peripherals.get(address)
            .cloned()
            .ok_or_else(|| TransportError::UnknownPeripheral { address: address.to_string() })
    }

    fn characteristic(peripheral: &Peripheral, characteristic: Characteristic) -> Result<BtleCharacteristic, TransportError> {
        let uuid = characteristic.uuid();
        peripheral.characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(TransportError::MissingCharacteristic { uuid })
    }

    async fn scan(&self, timeout: Duration) -> Result<Vec<Advertisement>, TransportError> {
        for adapter in &self.adapters {
            adapter.start_scan(ScanFilter::default()).await?;
        }

        sleep(timeout).await;

        let mut found = Vec::new();

        for adapter in &self.adapters {
            if let Err(err) = adapter.stop_scan().await {
                warn!("Failed to stop scanning: {:?}", err);
            }

            let peripherals = match adapter.peripherals().await {
                Ok(v) => v,
                Err(err) => {
                    warn!("Failed to query BLE adapter for peripherals: {}", err);
                    continue;
                },
            };

            for peripheral in peripherals {
                match peripheral.properties().await {
                    Err(err) => {
                        warn!("Could not query peripheral for properties: {:?}", err);
                    },
                    Ok(None) => {
                        debug!("Peripheral has no properties");
                    },
                    Ok(Some(properties)) => {
                        let address = properties.address.to_string();
                        debug!("Discovered {} {:?}", address, properties.local_name);

                        found.push(Advertisement { address: address.clone(), name: properties.local_name });
                        self.peripherals.lock().expect("Failed to lock peripherals").insert(address, peripheral);
                    },
                }
            }
        }

        Ok(found)
    }

    async fn connect_peripheral(&self, address: &str) -> Result<bool, TransportError> {
        let peripheral = self.peripheral(address)?;

        info!("Connecting to {}...", address);
        peripheral.connect().await?;

        info!("Connected; Discovering services...");
        peripheral.discover_services().await?;

        Ok(peripheral.is_connected().await?)
    }

    async fn disconnect_peripheral(&self, address: &str) -> Result<(), TransportError> {
        if let Some(link) = self.links.lock().expect("Failed to lock notification links").remove(address) {
            // the pump thread may still be finishing a dispatch; it exits on its own
            link.cancel.cancel();
        }

        let peripheral = self.peripheral(address)?;
        if peripheral.is_connected().await? {
            peripheral.disconnect().await?;
        }
        Ok(())
    }

    async fn read_characteristic(&self, address: &str, characteristic: Characteristic) -> Result<Vec<u8>, TransportError> {
        let peripheral = self.peripheral(address)?;
        let btle_characteristic = Self::characteristic(&peripheral, characteristic)?;
        Ok(peripheral.read(&btle_characteristic).await?)
    }

    async fn write_characteristic(&self, address: &str, characteristic: Characteristic, data: &[u8], with_response: bool) -> Result<(), TransportError> {
        let peripheral = self.peripheral(address)?;
        let btle_characteristic = Self::characteristic(&peripheral, characteristic)?;
        let write_type = if with_response { WriteType::WithResponse } else { WriteType::WithoutResponse };
        Ok(peripheral.write(&btle_characteristic, data, write_type).await?)
    }

    async fn subscribe(&self, address: &str, characteristic: Characteristic, callback: NotifyCallback) -> Result<(), TransportError> {
        let peripheral = self.peripheral(address)?;
        let btle_characteristic = Self::characteristic(&peripheral, characteristic)?;

        let needs_pump = {
            let mut links = self.links.lock().expect("Failed to lock notification links");
            let link = links.entry(address.to_string()).or_insert_with(NotificationLink::new);
            link.callbacks.lock().expect("Failed to lock notification callbacks")
                .insert(characteristic.uuid(), callback);
            !link.pumping
        };

        // open the stream before subscribing so that no notification is missed
        let stream = if needs_pump { Some(peripheral.notifications().await?) } else { None };

        peripheral.subscribe(&btle_characteristic).await?;

        if let Some(stream) = stream {
            let mut links = self.links.lock().expect("Failed to lock notification links");
            if let Some(link) = links.get_mut(address) {
                if !link.pumping {
                    notification_pump(
                        address.to_string(),
                        self.runtime.clone(),
                        stream,
                        self.links.clone(),
                        link.callbacks.clone(),
                        link.cancel.clone(),
                    )?;
                    link.pumping = true;
                }
            }
        }

        Ok(())
    }

    async fn unsubscribe(&self, address: &str, characteristic: Characteristic) -> Result<(), TransportError> {
        if let Some(link) = self.links.lock().expect("Failed to lock notification links").get(address) {
            link.callbacks.lock().expect("Failed to lock notification callbacks").remove(&characteristic.uuid());
        }

        let peripheral = self.peripheral(address)?;
        let btle_characteristic = Self::characteristic(&peripheral, characteristic)?;
        Ok(peripheral.unsubscribe(&btle_characteristic).await?)
    }
}

// Delivers notifications to their callbacks on a dedicated thread. Each callback blocks the
// thread until its dispatch completes, which in turn holds back the btleplug stream.
//
// A callback that fails is dropped and the others keep receiving. When the stream ends the
// link is retired, so the next subscription for the address starts a new thread.
fn notification_pump(
    address: String,
    runtime: Handle,
    mut stream: NotificationStream,
    links: LinkMap,
    callbacks: CallbackMap,
    cancel: CancellationToken,
) -> Result<(), TransportError> {
    thread::Builder::new()
        .name(format!("wand-notify-{}", address))
        .spawn(move || {
            'mainloop: loop {
                let next = runtime.block_on(async {
                    tokio::select! {
                        _ = cancel.cancelled() => None,
                        notification = stream.next() => notification,
                    }
                });

                let notification = match next {
                    Some(notification) => notification,
                    None => break 'mainloop,
                };

                deliver(&address, &callbacks, notification.uuid, &notification.value);
            }

            retire_link(&links, &address, &callbacks);
            debug!("Notification thread for {} stopped", address);
        })?;

    Ok(())
}

fn deliver(address: &str, callbacks: &CallbackMap, uuid: Uuid, value: &[u8]) {
    let callback = callbacks.lock()
        .expect("Failed to lock notification callbacks")
        .get(&uuid)
        .cloned();

    if let Some(callback) = callback {
        if let Err(err) = callback(uuid, value) {
            error!("Notification delivery for {} {} stopped: {}", address, uuid, err);
            drop_callback(callbacks, &uuid, &callback);
        }
    }
}

// Removes the callback for `uuid` unless a new subscription has replaced it meanwhile
fn drop_callback(callbacks: &CallbackMap, uuid: &Uuid, failed: &NotifyCallback) {
    let mut callbacks = callbacks.lock().expect("Failed to lock notification callbacks");
    if callbacks.get(uuid).map_or(false, |current| Arc::ptr_eq(current, failed)) {
        callbacks.remove(uuid);
    }
}

// Forgets the link served by a stopped thread; a link created after a disconnect is kept
fn retire_link(links: &LinkMap, address: &str, callbacks: &CallbackMap) {
    let mut links = links.lock().expect("Failed to lock notification links");
    if links.get(address).map_or(false, |link| Arc::ptr_eq(&link.callbacks, callbacks)) {
        links.remove(address);
    }
}

impl Transport for BtleTransport {
    fn discover(&self, timeout: Duration) -> BoxFuture<'_, Result<Vec<Advertisement>, TransportError>> {
        self.scan(timeout).boxed()
    }

    fn connect<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<bool, TransportError>> {
        self.connect_peripheral(address).boxed()
    }

    fn disconnect<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        self.disconnect_peripheral(address).boxed()
    }

    fn read<'a>(&'a self, address: &'a str, characteristic: Characteristic) -> BoxFuture<'a, Result<Vec<u8>, TransportError>> {
        self.read_characteristic(address, characteristic).boxed()
    }

    fn write<'a>(&'a self, address: &'a str, characteristic: Characteristic, data: &'a [u8], with_response: bool) -> BoxFuture<'a, Result<(), TransportError>> {
        self.write_characteristic(address, characteristic, data, with_response).boxed()
    }

    fn start_notify<'a>(&'a self, address: &'a str, characteristic: Characteristic, callback: NotifyCallback) -> BoxFuture<'a, Result<(), TransportError>> {
        self.subscribe(address, characteristic, callback).boxed()
    }

    fn stop_notify<'a>(&'a self, address: &'a str, characteristic: Characteristic) -> BoxFuture<'a, Result<(), TransportError>> {
        self.unsubscribe(address, characteristic).boxed()
    }
}
