use uuid::Uuid;

/**
 * Name prefix advertised by Kano wands, used when no other filter is given.
 */
pub const DEFAULT_NAME_PREFIX: &str = "Kano-Wand";

/**
 * How long (milliseconds) to scan for wands by default.
 */
pub const DEFAULT_SCAN_TIMEOUT: u64 = 2000;

/**
 * How often (milliseconds) the CLI sends a keep-alive while watching notifications.
 */
pub const DEFAULT_KEEP_ALIVE_INTERVAL: u64 = 10_000;

/**
 * LED color used when none is configured.
 */
pub const DEFAULT_LED_COLOR: &str = "0x2185d0";

// Info service: device metadata
pub const INFO_SERVICE: Uuid = Uuid::from_u128(0x64a70010_f691_4b93_a6f4_0968f5b648f8);
pub const ORGANIZATION_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a7000b_f691_4b93_a6f4_0968f5b648f8);
pub const SOFTWARE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70013_f691_4b93_a6f4_0968f5b648f8);
pub const HARDWARE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70001_f691_4b93_a6f4_0968f5b648f8);

// IO service
pub const IO_SERVICE: Uuid = Uuid::from_u128(0x64a70012_f691_4b93_a6f4_0968f5b648f8);
pub const BATTERY_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70007_f691_4b93_a6f4_0968f5b648f8);
pub const USER_BUTTON_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a7000d_f691_4b93_a6f4_0968f5b648f8);
pub const VIBRATOR_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70008_f691_4b93_a6f4_0968f5b648f8);
pub const LED_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70009_f691_4b93_a6f4_0968f5b648f8);
pub const KEEP_ALIVE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a7000f_f691_4b93_a6f4_0968f5b648f8);

// Sensor service
pub const SENSOR_SERVICE: Uuid = Uuid::from_u128(0x64a70011_f691_4b93_a6f4_0968f5b648f8);
pub const TEMPERATURE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70014_f691_4b93_a6f4_0968f5b648f8);
pub const QUATERNIONS_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70002_f691_4b93_a6f4_0968f5b648f8);
pub const QUATERNIONS_RESET_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70004_f691_4b93_a6f4_0968f5b648f8);
pub const MAGN_CALIBRATE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70021_f691_4b93_a6f4_0968f5b648f8);

pub const COMMAND_KEEP_ALIVE: [u8; 1] = [1];
pub const COMMAND_RESET_POSITION: [u8; 1] = [1];

/**
 * Payload sizes of the notification-bearing characteristics.
 */
pub const QUATERNIONS_PAYLOAD_LEN: usize = 8;
pub const TEMPERATURE_PAYLOAD_LEN: usize = 2;
pub const BUTTON_PAYLOAD_LEN: usize = 1;
pub const BATTERY_PAYLOAD_LEN: usize = 1;
