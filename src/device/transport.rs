use std::sync::Arc;
use std::time::Duration;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::device::types::{Advertisement, Characteristic};
use crate::error::{DispatchError, TransportError};

/// Called by the transport for every notification, on the transport's own thread.
/// The call blocks until the notification has been fully handled; an error is fatal
/// for the delivery of further notifications.
pub type NotifyCallback = Arc<dyn Fn(Uuid, &[u8]) -> Result<(), DispatchError> + Send + Sync>;

/// The BLE stack underneath a [`crate::device::wand::Wand`].
pub trait Transport: Send + Sync + 'static {
    fn discover(&self, timeout: Duration) -> BoxFuture<'_, Result<Vec<Advertisement>, TransportError>>;

    /// Returns whether the device is connected once the attempt completes.
    fn connect<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<bool, TransportError>>;

    fn disconnect<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<(), TransportError>>;

    fn read<'a>(
        &'a self,
        address: &'a str,
        characteristic: Characteristic,
    ) -> BoxFuture<'a, Result<Vec<u8>, TransportError>>;

    fn write<'a>(
        &'a self,
        address: &'a str,
        characteristic: Characteristic,
        data: &'a [u8],
        with_response: bool,
    ) -> BoxFuture<'a, Result<(), TransportError>>;

    fn start_notify<'a>(
        &'a self,
        address: &'a str,
        characteristic: Characteristic,
        callback: NotifyCallback,
    ) -> BoxFuture<'a, Result<(), TransportError>>;

    fn stop_notify<'a>(
        &'a self,
        address: &'a str,
        characteristic: Characteristic,
    ) -> BoxFuture<'a, Result<(), TransportError>>;
}
