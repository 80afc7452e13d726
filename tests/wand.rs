//! Connection state, reads, writes and subscriptions of the wand facade.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;
use kano_wand::device::types::{Characteristic, ConnectionState};
use kano_wand::error::{DispatchError, ReadError, WandError};
use kano_wand::{scan, EventKind, Pattern, Wand, WandFilter, WandHooks};

use common::{advertisement, deliver, MockTransport};

fn wand(transport: &Arc<MockTransport>) -> Wand {
    Wand::new("AA:BB".to_string(), Some("Kano-Wand-01".to_string()), transport.clone())
}

#[tokio::test]
async fn second_connect_fails_with_already_connected() {
    let transport = MockTransport::new();
    let mut wand = wand(&transport);
    assert_eq!(wand.connection_state(), ConnectionState::Disconnected);

    wand.connect().await.unwrap();
    assert!(wand.is_connected());

    assert!(matches!(wand.connect().await, Err(WandError::AlreadyConnected { .. })));
    assert_eq!(wand.connection_state(), ConnectionState::Connected);
    assert_eq!(transport.with(|state| state.connects), 1);

    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn refused_connection_stays_disconnected() {
    let transport = MockTransport::new();
    transport.with(|state| state.connect_result = false);
    let mut wand = wand(&transport);

    let err = wand.connect().await.unwrap_err();
    assert!(err.is_connection_error());
    assert_eq!(wand.connection_state(), ConnectionState::Disconnected);

    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn transport_failure_during_connect_is_a_connection_error() {
    let transport = MockTransport::new();
    transport.with(|state| state.fail_connect = true);
    let mut wand = wand(&transport);

    assert!(matches!(wand.connect().await, Err(WandError::Connection { .. })));
    assert_eq!(wand.connection_state(), ConnectionState::Disconnected);

    // the link came back, a retry succeeds
    transport.with(|state| state.fail_connect = false);
    wand.connect().await.unwrap();
    assert!(wand.is_connected());

    wand.shutdown().await.unwrap();
}

struct LifecycleHooks {
    fail_connect: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl WandHooks for LifecycleHooks {
    fn post_connect(&self, address: &str) -> Result<(), WandError> {
        self.calls.lock().unwrap().push(format!("connect:{}", address));
        if self.fail_connect {
            return Err(WandError::configuration("hook refused"));
        }
        Ok(())
    }

    fn post_disconnect(&self, address: &str) {
        self.calls.lock().unwrap().push(format!("disconnect:{}", address));
    }
}

#[tokio::test]
async fn failing_post_connect_hook_aborts_connect() {
    let transport = MockTransport::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let hooks = Arc::new(LifecycleHooks { fail_connect: true, calls: calls.clone() });
    let mut wand = Wand::with_hooks("AA:BB".to_string(), None, transport.clone(), hooks);

    assert!(matches!(wand.connect().await, Err(WandError::Configuration { .. })));
    assert!(!wand.is_connected());
    assert_eq!(*calls.lock().unwrap(), vec!["connect:AA:BB"]);

    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn disconnect_is_unconditional() {
    let transport = MockTransport::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let hooks = Arc::new(LifecycleHooks { fail_connect: false, calls: calls.clone() });
    let mut wand = Wand::with_hooks("AA:BB".to_string(), None, transport.clone(), hooks);

    wand.disconnect().await.unwrap();
    assert_eq!(wand.connection_state(), ConnectionState::Disconnected);

    wand.connect().await.unwrap();
    wand.disconnect().await.unwrap();
    assert_eq!(wand.connection_state(), ConnectionState::Disconnected);

    // reconnecting after a disconnect is allowed
    wand.connect().await.unwrap();

    assert_eq!(transport.with(|state| state.disconnects), 2);
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["disconnect:AA:BB", "connect:AA:BB", "disconnect:AA:BB", "connect:AA:BB"]
    );
    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_disconnect_still_runs_the_hook_and_disconnects() {
    let transport = MockTransport::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let hooks = Arc::new(LifecycleHooks { fail_connect: false, calls: calls.clone() });
    let mut wand = Wand::with_hooks("AA:BB".to_string(), None, transport.clone(), hooks);

    wand.connect().await.unwrap();
    wand.subscribe_battery().await.unwrap();
    transport.with(|state| state.fail_disconnect = true);

    let err = wand.disconnect().await.unwrap_err();
    assert!(matches!(err, WandError::Connection { .. }));
    assert_eq!(wand.connection_state(), ConnectionState::Disconnected);
    assert!(!wand.is_subscribed(EventKind::Battery));
    assert_eq!(*calls.lock().unwrap(), vec!["connect:AA:BB", "disconnect:AA:BB"]);

    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn disconnect_clears_subscriptions() {
    let transport = MockTransport::new();
    let mut wand = wand(&transport);

    wand.connect().await.unwrap();
    for kind in EventKind::ALL {
        wand.subscribe(kind).await.unwrap();
    }

    wand.disconnect().await.unwrap();
    for kind in EventKind::ALL {
        assert!(!wand.is_subscribed(kind));
    }

    // subscriptions are armed again after reconnecting
    wand.connect().await.unwrap();
    wand.subscribe_battery().await.unwrap();
    assert!(wand.is_subscribed(EventKind::Battery));
    assert!(!wand.is_subscribed(EventKind::Position));

    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn dropping_a_wand_closes_its_dispatcher() {
    let transport = MockTransport::new();
    let mut wand = wand(&transport);
    wand.subscribe_battery().await.unwrap();
    let callback = transport.callback(Characteristic::Battery).unwrap();

    deliver(&callback, Characteristic::Battery, &[0x10]).await.unwrap();

    drop(wand);
    assert_eq!(deliver(&callback, Characteristic::Battery, &[0x11]).await, Err(DispatchError::Closed));
}

#[tokio::test]
async fn reads_decode_typed_values() {
    let transport = MockTransport::new();
    transport.with(|state| {
        state.values.insert(Characteristic::Organization, b"Kano Computing".to_vec());
        state.values.insert(Characteristic::Software, b"1.2.3".to_vec());
        state.values.insert(Characteristic::Hardware, b"2".to_vec());
        state.values.insert(Characteristic::Battery, vec![0x64]);
        state.values.insert(Characteristic::UserButton, vec![0x01]);
        state.values.insert(Characteristic::Temperature, vec![0xE8, 0x03]);
    });
    let wand = wand(&transport);

    assert_eq!(wand.organization().await.unwrap(), "Kano Computing");
    assert_eq!(wand.software_version().await.unwrap(), "1.2.3");
    assert_eq!(wand.hardware_version().await.unwrap(), "2");
    assert_eq!(wand.battery().await.unwrap(), 0x64);
    assert!(wand.button().await.unwrap());
    assert_eq!(wand.temperature().await.unwrap(), 1000);

    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_reads_are_read_errors() {
    let transport = MockTransport::new();
    transport.with(|state| {
        state.values.insert(Characteristic::Temperature, vec![0xE8]);
        state.values.insert(Characteristic::Organization, vec![0xFF, 0xFE]);
    });
    let wand = wand(&transport);

    assert!(matches!(
        wand.temperature().await,
        Err(WandError::Read { characteristic: Characteristic::Temperature, source: ReadError::Decode { .. } })
    ));
    assert!(matches!(
        wand.organization().await,
        Err(WandError::Read { source: ReadError::Utf8 { .. }, .. })
    ));
    assert!(matches!(
        wand.battery().await,
        Err(WandError::Read { characteristic: Characteristic::Battery, source: ReadError::Transport { .. } })
    ));

    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn writes_send_fixed_payloads() {
    let transport = MockTransport::new();
    let wand = wand(&transport);

    wand.keep_alive().await.unwrap();
    wand.vibrate(Pattern::ShortLong).await.unwrap();
    wand.vibrate(9u8).await.unwrap();
    wand.set_led("#2185D0", true).await.unwrap();
    wand.set_led("0x000000", false).await.unwrap();
    wand.reset_position().await.unwrap();

    let writes = transport.with(|state| state.writes.clone());
    assert_eq!(writes, vec![
        (Characteristic::KeepAlive, vec![1], true),
        (Characteristic::Vibrator, vec![5], true),
        (Characteristic::Vibrator, vec![9], true),
        (Characteristic::Led, vec![1, 0x24, 0x3A], true),
        (Characteristic::Led, vec![0, 0x00, 0x00], true),
        (Characteristic::QuaternionsReset, vec![1], true),
    ]);

    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_led_color_is_not_written() {
    let transport = MockTransport::new();
    let wand = wand(&transport);

    assert!(matches!(wand.set_led("blue", true).await, Err(WandError::Configuration { .. })));
    assert!(transport.with(|state| state.writes.is_empty()));

    transport.with(|state| state.fail_writes = true);
    assert!(matches!(
        wand.keep_alive().await,
        Err(WandError::Write { characteristic: Characteristic::KeepAlive, .. })
    ));

    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn subscription_state_follows_subscribe_and_unsubscribe() {
    let transport = MockTransport::new();
    let mut wand = wand(&transport);

    for kind in EventKind::ALL {
        assert!(!wand.is_subscribed(kind));
        wand.subscribe(kind).await.unwrap();
        assert!(wand.is_subscribed(kind));
        assert!(transport.callback(kind.characteristic()).is_some());
    }

    wand.unsubscribe_position(false).await.unwrap();
    assert!(!wand.is_subscribed(EventKind::Position));

    // the flag is left alone, delivery is still stopped
    wand.unsubscribe_button(true).await.unwrap();
    assert!(wand.is_subscribed(EventKind::Button));
    assert!(transport.callback(Characteristic::UserButton).is_none());

    wand.shutdown().await.unwrap();
}

#[tokio::test]
async fn scan_returns_matching_wands() {
    let transport = MockTransport::new();
    transport.with(|state| {
        state.advertisements = vec![
            advertisement("AA:01", "Kano-Wand-01"),
            advertisement("AA:02", "Headphones"),
            advertisement("AA:03", "Kano-Wand-03"),
        ];
    });

    let wands = scan(transport.clone(), &WandFilter::default(), Duration::from_millis(10), true).await.unwrap();
    let addresses: Vec<_> = wands.iter().map(|wand| wand.address().to_string()).collect();
    assert_eq!(addresses, vec!["AA:01", "AA:03"]);
    assert!(wands.iter().all(Wand::is_connected));
    assert_eq!(transport.with(|state| state.connects), 2);

    let wands = scan(transport.clone(), &WandFilter::mac("aa:02"), Duration::from_millis(10), false).await.unwrap();
    assert_eq!(wands.len(), 1);
    assert_eq!(wands[0].name(), Some("Headphones"));
    assert!(!wands[0].is_connected());
}

#[tokio::test]
async fn scan_without_filter_is_a_configuration_error() {
    let transport = MockTransport::new();
    let filter = WandFilter { prefix: None, mac: None };

    let result = scan(transport, &filter, Duration::from_millis(10), false).await;
    assert!(matches!(result, Err(WandError::Configuration { .. })));
}
