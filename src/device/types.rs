use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::device::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Info,
    IO,
    Sensor,
}

impl Service {
    pub fn uuid(&self) -> Uuid {
        match self {
            Service::Info => INFO_SERVICE,
            Service::IO => IO_SERVICE,
            Service::Sensor => SENSOR_SERVICE,
        }
    }
}

/// The GATT characteristics exposed by the wand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    Organization,
    Software,
    Hardware,
    Battery,
    UserButton,
    Vibrator,
    Led,
    KeepAlive,
    Temperature,
    Quaternions,
    QuaternionsReset,
    MagnCalibrate,
}

impl Characteristic {
    pub const ALL: [Characteristic; 12] = [
        Characteristic::Organization,
        Characteristic::Software,
        Characteristic::Hardware,
        Characteristic::Battery,
        Characteristic::UserButton,
        Characteristic::Vibrator,
        Characteristic::Led,
        Characteristic::KeepAlive,
        Characteristic::Temperature,
        Characteristic::Quaternions,
        Characteristic::QuaternionsReset,
        Characteristic::MagnCalibrate,
    ];

    pub fn uuid(&self) -> Uuid {
        match self {
            Characteristic::Organization => ORGANIZATION_CHARACTERISTIC,
            Characteristic::Software => SOFTWARE_CHARACTERISTIC,
            Characteristic::Hardware => HARDWARE_CHARACTERISTIC,
            Characteristic::Battery => BATTERY_CHARACTERISTIC,
            Characteristic::UserButton => USER_BUTTON_CHARACTERISTIC,
            Characteristic::Vibrator => VIBRATOR_CHARACTERISTIC,
            Characteristic::Led => LED_CHARACTERISTIC,
            Characteristic::KeepAlive => KEEP_ALIVE_CHARACTERISTIC,
            Characteristic::Temperature => TEMPERATURE_CHARACTERISTIC,
            Characteristic::Quaternions => QUATERNIONS_CHARACTERISTIC,
            Characteristic::QuaternionsReset => QUATERNIONS_RESET_CHARACTERISTIC,
            Characteristic::MagnCalibrate => MAGN_CALIBRATE_CHARACTERISTIC,
        }
    }

    pub fn service(&self) -> Service {
        match self {
            Characteristic::Organization
            | Characteristic::Software
            | Characteristic::Hardware => Service::Info,
            Characteristic::Battery
            | Characteristic::UserButton
            | Characteristic::Vibrator
            | Characteristic::Led
            | Characteristic::KeepAlive => Service::IO,
            Characteristic::Temperature
            | Characteristic::Quaternions
            | Characteristic::QuaternionsReset
            | Characteristic::MagnCalibrate => Service::Sensor,
        }
    }

    pub fn from_uuid(uuid: &Uuid) -> Option<Characteristic> {
        Characteristic::ALL.into_iter().find(|characteristic| characteristic.uuid() == *uuid)
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            Characteristic::Organization => "organization",
            Characteristic::Software => "software version",
            Characteristic::Hardware => "hardware version",
            Characteristic::Battery => "battery",
            Characteristic::UserButton => "user button",
            Characteristic::Vibrator => "vibrator",
            Characteristic::Led => "LED",
            Characteristic::KeepAlive => "keep-alive",
            Characteristic::Temperature => "temperature",
            Characteristic::Quaternions => "quaternions",
            Characteristic::QuaternionsReset => "quaternions reset",
            Characteristic::MagnCalibrate => "magnetometer calibration",
        };

        write!(f, "{}", result)
    }
}

/// The notifications a wand can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Position,
    Button,
    Temperature,
    Battery,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Position,
        EventKind::Button,
        EventKind::Temperature,
        EventKind::Battery,
    ];

    pub fn characteristic(&self) -> Characteristic {
        match self {
            EventKind::Position => Characteristic::Quaternions,
            EventKind::Button => Characteristic::UserButton,
            EventKind::Temperature => Characteristic::Temperature,
            EventKind::Battery => Characteristic::Battery,
        }
    }

    pub fn from_characteristic(characteristic: Characteristic) -> Option<EventKind> {
        EventKind::ALL.into_iter().find(|kind| kind.characteristic() == characteristic)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            EventKind::Position => 0,
            EventKind::Button => 1,
            EventKind::Temperature => 2,
            EventKind::Battery => 3,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            EventKind::Position => "position",
            EventKind::Button => "button",
            EventKind::Temperature => "temperature",
            EventKind::Battery => "battery",
        };

        write!(f, "{}", result)
    }
}

/// Orientation of the wand, each axis roughly within [-1000, 1000].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    pub x: i16,
    pub y: i16,
    pub pitch: i16,
    pub roll: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    Orientation(Orientation),
    Button { pressed: bool },
    Temperature { raw: i16 },
    Battery { raw: u8 },
}

impl Reading {
    pub fn kind(&self) -> EventKind {
        match self {
            Reading::Orientation(_) => EventKind::Position,
            Reading::Button { .. } => EventKind::Button,
            Reading::Temperature { .. } => EventKind::Temperature,
            Reading::Battery { .. } => EventKind::Battery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Regular = 1,
    Short = 2,
    Burst = 3,
    Long = 4,
    ShortLong = 5,
    ShortShort = 6,
    BigPause = 7,
}

impl Pattern {
    pub const ALL: [Pattern; 7] = [
        Pattern::Regular,
        Pattern::Short,
        Pattern::Burst,
        Pattern::Long,
        Pattern::ShortLong,
        Pattern::ShortShort,
        Pattern::BigPause,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Pattern::Regular => "regular",
            Pattern::Short => "short",
            Pattern::Burst => "burst",
            Pattern::Long => "long",
            Pattern::ShortLong => "short-long",
            Pattern::ShortShort => "short-short",
            Pattern::BigPause => "big-pause",
        }
    }
}

impl From<Pattern> for u8 {
    fn from(pattern: Pattern) -> u8 {
        pattern as u8
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Vibration code sent to the wand: either a named pattern or a raw code that is passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternCode {
    Named(Pattern),
    Raw(u8),
}

impl From<Pattern> for PatternCode {
    fn from(pattern: Pattern) -> Self {
        PatternCode::Named(pattern)
    }
}

impl From<u8> for PatternCode {
    fn from(code: u8) -> Self {
        PatternCode::Raw(code)
    }
}

impl From<PatternCode> for u8 {
    fn from(code: PatternCode) -> u8 {
        match code {
            PatternCode::Named(pattern) => pattern.into(),
            PatternCode::Raw(code) => code,
        }
    }
}

impl FromStr for PatternCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u8>() {
            return Ok(PatternCode::Raw(code));
        }

        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Pattern::ALL.into_iter()
            .find(|pattern| pattern.name() == normalized)
            .map(PatternCode::Named)
            .ok_or_else(|| format!("Unknown vibration pattern: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// A device seen during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub address: String,
    pub name: Option<String>,
}
