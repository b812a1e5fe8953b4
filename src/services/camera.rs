//! Camera scanner channel
//!
//! The capture and symbol-reading plumbing lives behind [`CameraBackend`];
//! this module only picks a device, runs the read loop and guarantees the
//! capture stream is released before the scanner can start again.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::models::{ScanEvent, ScanSource};
use crate::services::clock::Clock;

/// Error types for the camera channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("No camera found")]
    NoDevice,

    #[error("Camera error: {0}")]
    Other(String),
}

impl CameraError {
    /// Map a DOM-style media error name onto a camera error
    pub fn from_dom_name(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                CameraError::PermissionDenied
            }
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => {
                CameraError::NoDevice
            }
            _ => CameraError::Other(format!("{name}: {message}")),
        }
    }
}

/// A video input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub id: String,
    pub label: String,
}

/// Enumerates and opens video inputs
#[async_trait]
pub trait CameraBackend: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<VideoDevice>, CameraError>;

    async fn open(&self, device: &VideoDevice) -> Result<Box<dyn CaptureStream>, CameraError>;
}

/// A live capture stream with a symbol reader attached
#[async_trait]
pub trait CaptureStream: Send {
    /// Next decoded symbol text, or `None` once the stream ends
    async fn next_symbol(&mut self) -> Option<String>;

    /// Stop all tracks and free the device
    fn release(&mut self);
}

/// Prefer a rear-facing camera, else the first device
pub fn preferred_device(devices: &[VideoDevice]) -> Option<&VideoDevice> {
    devices
        .iter()
        .find(|device| {
            let label = device.label.to_lowercase();
            ["back", "rear", "environment"]
                .iter()
                .any(|hint| label.contains(hint))
        })
        .or_else(|| devices.first())
}

struct RunningCapture {
    device: VideoDevice,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Runs one camera capture at a time
pub struct CameraScanner {
    backend: Arc<dyn CameraBackend>,
    clock: Arc<dyn Clock>,
    running: Option<RunningCapture>,
}

impl CameraScanner {
    pub fn new(backend: Arc<dyn CameraBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            running: None,
        }
    }

    /// Start capturing; any running capture is stopped first.
    ///
    /// Every decoded symbol is sent to `events` as a camera [`ScanEvent`].
    pub async fn start(
        &mut self,
        events: mpsc::Sender<ScanEvent>,
    ) -> Result<VideoDevice, CameraError> {
        self.stop().await;

        let devices = self.backend.list_devices().await?;
        let device = preferred_device(&devices)
            .cloned()
            .ok_or(CameraError::NoDevice)?;
        let mut stream = self.backend.open(&device).await?;
        tracing::info!(device = %device.label, "Camera capture started");

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let clock = Arc::clone(&self.clock);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    symbol = stream.next_symbol() => {
                        let Some(text) = symbol else { break };
                        let event = ScanEvent::new(text, ScanSource::Camera, clock.now_millis());
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }
            stream.release();
        });

        self.running = Some(RunningCapture {
            device: device.clone(),
            stop: stop_tx,
            task,
        });
        Ok(device)
    }

    /// Stop capturing. Returns once the stream has been released.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.stop.send(());
        if let Err(e) = running.task.await {
            tracing::warn!(error = %e, "Camera capture task ended abnormally");
        }
        tracing::info!(device = %running.device.label, "Camera capture stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    pub fn device(&self) -> Option<&VideoDevice> {
        self.running.as_ref().map(|running| &running.device)
    }
}

impl Drop for CameraScanner {
    fn drop(&mut self) {
        // The read loop releases the stream once it sees the signal
        if let Some(running) = self.running.take() {
            let _ = running.stop.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn device(id: &str, label: &str) -> VideoDevice {
        VideoDevice {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    struct FakeStream {
        symbols: mpsc::Receiver<String>,
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CaptureStream for FakeStream {
        async fn next_symbol(&mut self) -> Option<String> {
            self.symbols.recv().await
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeBackend {
        devices: Result<Vec<VideoDevice>, CameraError>,
        open_error: Option<CameraError>,
        feeds: Mutex<Vec<mpsc::Receiver<String>>>,
        opened: Mutex<Vec<String>>,
        released: Arc<AtomicUsize>,
    }

    impl FakeBackend {
        fn new(devices: Vec<VideoDevice>) -> Self {
            Self {
                devices: Ok(devices),
                open_error: None,
                feeds: Mutex::new(Vec::new()),
                opened: Mutex::new(Vec::new()),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn feed(&self) -> mpsc::Sender<String> {
            let (tx, rx) = mpsc::channel(8);
            self.feeds.lock().unwrap().push(rx);
            tx
        }
    }

    #[async_trait]
    impl CameraBackend for FakeBackend {
        async fn list_devices(&self) -> Result<Vec<VideoDevice>, CameraError> {
            self.devices.clone()
        }

        async fn open(&self, device: &VideoDevice) -> Result<Box<dyn CaptureStream>, CameraError> {
            if let Some(e) = &self.open_error {
                return Err(e.clone());
            }
            self.opened.lock().unwrap().push(device.id.clone());
            let symbols = self.feeds.lock().unwrap().remove(0);
            Ok(Box::new(FakeStream {
                symbols,
                released: Arc::clone(&self.released),
            }))
        }
    }

    #[test]
    fn test_prefers_rear_camera() {
        let devices = vec![
            device("1", "Integrated Webcam"),
            device("2", "Camera 2, facing BACK"),
            device("3", "environment"),
        ];
        assert_eq!(preferred_device(&devices).unwrap().id, "2");

        let devices = vec![device("1", "Front"), device("2", "USB Cam")];
        assert_eq!(preferred_device(&devices).unwrap().id, "1");

        assert!(preferred_device(&[]).is_none());
    }

    #[test]
    fn test_dom_error_mapping() {
        assert_eq!(
            CameraError::from_dom_name("NotAllowedError", "denied"),
            CameraError::PermissionDenied
        );
        assert_eq!(
            CameraError::from_dom_name("NotFoundError", "none"),
            CameraError::NoDevice
        );
        assert_eq!(
            CameraError::from_dom_name("NotReadableError", "busy"),
            CameraError::Other("NotReadableError: busy".to_string())
        );
    }

    #[tokio::test]
    async fn test_capture_emits_camera_events() {
        let backend = Arc::new(FakeBackend::new(vec![device("rear", "Rear Camera")]));
        let feed = backend.feed();
        let mut scanner = CameraScanner::new(backend.clone(), Arc::new(ManualClock::new(42)));
        let (tx, mut rx) = mpsc::channel(4);

        let chosen = scanner.start(tx).await.unwrap();
        assert_eq!(chosen.id, "rear");
        assert!(scanner.is_running());

        feed.send("SN:ABC MAC:AA:BB:CC:DD:EE:FF".to_string()).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.source, ScanSource::Camera);
        assert_eq!(event.received_at_ms, 42);

        scanner.stop().await;
        assert_eq!(backend.released.load(Ordering::SeqCst), 1);
        assert!(!scanner.is_running());
    }

    #[tokio::test]
    async fn test_restart_releases_previous_stream_first() {
        let backend = Arc::new(FakeBackend::new(vec![device("cam", "Camera")]));
        let _first_feed = backend.feed();
        let _second_feed = backend.feed();
        let mut scanner = CameraScanner::new(backend.clone(), Arc::new(ManualClock::new(0)));

        let (tx, _rx) = mpsc::channel(4);
        scanner.start(tx.clone()).await.unwrap();
        scanner.start(tx).await.unwrap();

        assert_eq!(backend.released.load(Ordering::SeqCst), 1);
        assert_eq!(backend.opened.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_start_errors() {
        let backend = Arc::new(FakeBackend::new(Vec::new()));
        let mut scanner = CameraScanner::new(backend, Arc::new(ManualClock::new(0)));
        let (tx, _rx) = mpsc::channel(1);
        assert_eq!(scanner.start(tx).await, Err(CameraError::NoDevice));

        let mut backend = FakeBackend::new(vec![device("cam", "Camera")]);
        backend.open_error = Some(CameraError::PermissionDenied);
        let mut scanner = CameraScanner::new(Arc::new(backend), Arc::new(ManualClock::new(0)));
        let (tx, _rx) = mpsc::channel(1);
        assert_eq!(scanner.start(tx).await, Err(CameraError::PermissionDenied));
        assert!(!scanner.is_running());
    }
}
