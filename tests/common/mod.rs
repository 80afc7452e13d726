#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use futures::future::BoxFuture;
use futures::FutureExt;
use kano_wand::device::transport::{NotifyCallback, Transport};
use kano_wand::device::types::{Advertisement, Characteristic};
use kano_wand::error::{DispatchError, TransportError};

pub struct MockState {
    pub advertisements: Vec<Advertisement>,
    pub connect_result: bool,
    pub fail_connect: bool,
    pub fail_disconnect: bool,
    pub connects: usize,
    pub disconnects: usize,
    pub values: HashMap<Characteristic, Vec<u8>>,
    pub writes: Vec<(Characteristic, Vec<u8>, bool)>,
    pub fail_writes: bool,
    pub callbacks: HashMap<Characteristic, NotifyCallback>,
}

impl Default for MockState {
    fn default() -> Self {
        MockState {
            advertisements: Vec::new(),
            connect_result: true,
            fail_connect: false,
            fail_disconnect: false,
            connects: 0,
            disconnects: 0,
            values: HashMap::new(),
            writes: Vec::new(),
            fail_writes: false,
            callbacks: HashMap::new(),
        }
    }
}

/// In-memory transport that records every call.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(MockTransport::default())
    }

    pub fn with<R, F: FnOnce(&mut MockState) -> R>(&self, f: F) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn callback(&self, characteristic: Characteristic) -> Option<NotifyCallback> {
        self.with(|state| state.callbacks.get(&characteristic).cloned())
    }
}

impl Transport for MockTransport {
    fn discover(&self, _timeout: Duration) -> BoxFuture<'_, Result<Vec<Advertisement>, TransportError>> {
        async move { Ok(self.with(|state| state.advertisements.clone())) }.boxed()
    }

    fn connect<'a>(&'a self, _address: &'a str) -> BoxFuture<'a, Result<bool, TransportError>> {
        async move {
            self.with(|state| {
                state.connects += 1;
                if state.fail_connect {
                    return Err(TransportError::Other("connection timed out".to_string()));
                }
                Ok(state.connect_result)
            })
        }.boxed()
    }

    fn disconnect<'a>(&'a self, _address: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            self.with(|state| {
                state.disconnects += 1;
                if state.fail_disconnect {
                    return Err(TransportError::Other("link already lost".to_string()));
                }
                state.callbacks.clear();
                Ok(())
            })
        }.boxed()
    }

    fn read<'a>(&'a self, _address: &'a str, characteristic: Characteristic) -> BoxFuture<'a, Result<Vec<u8>, TransportError>> {
        async move {
            self.with(|state| state.values.get(&characteristic).cloned())
                .ok_or(TransportError::MissingCharacteristic { uuid: characteristic.uuid() })
        }.boxed()
    }

    fn write<'a>(&'a self, _address: &'a str, characteristic: Characteristic, data: &'a [u8], with_response: bool) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            self.with(|state| {
                if state.fail_writes {
                    return Err(TransportError::Other("write rejected".to_string()));
                }
                state.writes.push((characteristic, data.to_vec(), with_response));
                Ok(())
            })
        }.boxed()
    }

    fn start_notify<'a>(&'a self, _address: &'a str, characteristic: Characteristic, callback: NotifyCallback) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            self.with(|state| state.callbacks.insert(characteristic, callback));
            Ok(())
        }.boxed()
    }

    fn stop_notify<'a>(&'a self, _address: &'a str, characteristic: Characteristic) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            self.with(|state| state.callbacks.remove(&characteristic));
            Ok(())
        }.boxed()
    }
}

/// Invokes `callback` from a blocking thread, the way a BLE stack delivers notifications.
pub async fn deliver(callback: &NotifyCallback, characteristic: Characteristic, data: &[u8]) -> Result<(), DispatchError> {
    let callback = callback.clone();
    let data = data.to_vec();
    tokio::task::spawn_blocking(move || callback(characteristic.uuid(), &data))
        .await
        .expect("Failed to join delivery thread")
}

pub fn advertisement(address: &str, name: &str) -> Advertisement {
    Advertisement { address: address.to_string(), name: Some(name.to_string()) }
}
