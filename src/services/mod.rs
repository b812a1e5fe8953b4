//! Services layer - client-side behavior
//!
//! This module contains the services of the Inventrack client:
//! - Session watchdog (token expiry, idle timeout, renewal, forced logout)
//! - Barcode channels (hardware keyboard, camera) and the vendor tag decoder
//! - Scan ingestion and user-facing notifications

pub mod camera;
pub mod clock;
pub mod decoder;
pub mod ingest;
pub mod messages;
pub mod notify;
pub mod scanner;
pub mod session_monitor;
pub mod token;

pub use camera::{
    preferred_device, CameraBackend, CameraError, CameraScanner, CaptureStream, VideoDevice,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use decoder::{decode, decode_event, placeholder_serial};
pub use ingest::{BellChime, Chime, ScanIngestor, ScanSink};
pub use notify::{Notification, NotificationLevel, NotificationLog, Notifier, TracingNotifier};
pub use scanner::{spawn_keyboard_listener, Key, KeystrokeBuffer};
pub use session_monitor::{
    CheckOutcome, MonitorHandle, SessionError, SessionHost, SessionMonitor, TokenRenewer,
};
pub use token::{expiry_millis, TokenError};
