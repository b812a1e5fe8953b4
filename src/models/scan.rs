//! Scan model
//!
//! Raw scan events from the three input channels and the equipment record
//! the decoder classifies them into.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Input channel a scan arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    /// Symbol reader attached to a live video stream
    Camera,
    /// Barcode scanner that types its payload like a keyboard
    HardwareKeyboard,
    /// Typed submit or paste
    Manual,
}

impl fmt::Display for ScanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanSource::Camera => write!(f, "camera"),
            ScanSource::HardwareKeyboard => write!(f, "hardware_keyboard"),
            ScanSource::Manual => write!(f, "manual"),
        }
    }
}

/// One raw scan, alive only while it is buffered and decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub raw_text: String,
    pub source: ScanSource,
    pub received_at_ms: i64,
    /// Keystroke timing looked like a scanner burst (hardware keyboard only)
    pub burst: Option<bool>,
}

impl ScanEvent {
    pub fn new(raw_text: impl Into<String>, source: ScanSource, received_at_ms: i64) -> Self {
        Self {
            raw_text: raw_text.into(),
            source,
            received_at_ms,
            burst: None,
        }
    }

    /// Manual entry or paste
    pub fn manual(raw_text: impl Into<String>, received_at_ms: i64) -> Self {
        Self::new(raw_text, ScanSource::Manual, received_at_ms)
    }
}

/// Label convention the decoder recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagFormat {
    Mikrotik,
    TpLink,
    Cisco,
    /// Cisco tag whose serial carries the `FOC` factory prefix
    CiscoHardware,
    /// A bare MAC address and whatever surrounded it
    MacAddress,
    /// Nothing recognised; the raw text is the serial
    Raw,
}

/// Structured equipment record produced by the decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEquipment {
    pub raw_text: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    /// Never empty
    pub serial_number: String,
    pub mac_address: Option<String>,
    pub suggested_name: String,
    pub format: TagFormat,
}

impl ParsedEquipment {
    /// One-line summary for notifications
    pub fn summary(&self) -> String {
        match &self.manufacturer {
            Some(manufacturer) => format!("{} - SN {}", manufacturer, self.serial_number),
            None => format!("SN {}", self.serial_number),
        }
    }
}
