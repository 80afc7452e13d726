use std::any::Any;
use std::io;
use std::string::FromUtf8Error;
use std::str::Utf8Error;
use thiserror::Error;
use btleplug;
use serde_json;
use uuid::Uuid;

use crate::device::types::{Characteristic, EventKind};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

impl ConfigError {
    pub fn is_file_not_found_error(&self) -> bool {
        match self {
            ConfigError::IOError { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to initialize logging: {source}")]
    Logging { #[from] source: log::SetLoggerError },

    #[error("Failed to open log file: {source}")]
    LogFile { source: io::Error },

    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Failed to open the bluetooth stack: {source}")]
    Transport { #[from] source: TransportError },

    #[error("{source}")]
    Wand { #[from] source: WandError },

    #[error("No wand matched the scan filter")]
    NoWandFound,

    #[error("Failed to start the async runtime: {source}")]
    Runtime { source: io::Error },
}

/// Errors raised by a [`crate::device::transport::Transport`] implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Error communicating with device (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("No peripheral with address {address} has been discovered")]
    UnknownPeripheral { address: String },

    #[error("Characteristic {uuid} is not available on the device")]
    MissingCharacteristic { uuid: Uuid },

    #[error("Failed to start notification thread: {source}")]
    Io { #[from] source: io::Error },

    #[error("{0}")]
    Other(String),
}

/// A notification or read payload was too short for the value it carries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Payload for {field} is truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { field: &'static str, expected: usize, actual: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("A {kind} handler panicked: {message}")]
    HandlerPanicked { kind: EventKind, message: String },

    #[error("The notification dispatcher is no longer running")]
    Closed,
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("{source}")]
    Transport { #[from] source: TransportError },

    #[error("{source}")]
    Decode { #[from] source: DecodeError },

    #[error("Value is not valid utf-8: {source}")]
    Utf8 { #[from] source: FromUtf8Error },
}

#[derive(Error, Debug)]
pub enum WandError {
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Scanning for devices failed: {source}")]
    Discovery { source: TransportError },

    #[error("Transport reported that connecting to {address} failed")]
    ConnectionRefused { address: String },

    #[error("Connection to {address} failed: {source}")]
    Connection { address: String, source: TransportError },

    #[error("Already connected to {address}")]
    AlreadyConnected { address: String },

    #[error("Failed to read {characteristic}: {source}")]
    Read { characteristic: Characteristic, source: ReadError },

    #[error("Failed to write {characteristic}: {source}")]
    Write { characteristic: Characteristic, source: TransportError },

    #[error("Failed to change notifications for {characteristic}: {source}")]
    Notify { characteristic: Characteristic, source: TransportError },

    #[error("Notification dispatch failed: {source}")]
    Dispatch { #[from] source: DispatchError },
}

impl WandError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        WandError::Configuration { message: message.into() }
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, WandError::ConnectionRefused { .. } | WandError::Connection { .. })
    }
}

/// Renders the payload of a caught panic as text.
pub fn panic_message(error: &Box<dyn Any + Send + 'static>) -> String {
    if let Some(s) = error.downcast_ref::<&str>() {
        return s.to_string();
    }
    if let Some(s) = error.downcast_ref::<String>() {
        return s.clone();
    }

    format!("[{:?}]: ???", (**error).type_id())
}
