//! Scan ingestion
//!
//! Every channel ends here: decode, hand the record to the host, confirm.

use std::sync::Arc;

use crate::models::{Language, ParsedEquipment, ScanEvent};
use crate::services::decoder;
use crate::services::messages;
use crate::services::notify::{Notification, Notifier};

/// Receives decoded equipment, typically to prefill the item form
pub trait ScanSink: Send + Sync {
    fn accept(&self, parsed: ParsedEquipment, event: &ScanEvent);
}

/// Audible confirmation after a successful scan
pub trait Chime: Send + Sync {
    fn play(&self) -> anyhow::Result<()>;
}

/// Terminal bell
#[derive(Debug, Clone, Copy, Default)]
pub struct BellChime;

impl Chime for BellChime {
    fn play(&self) -> anyhow::Result<()> {
        use std::io::Write;
        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}

pub struct ScanIngestor {
    sink: Arc<dyn ScanSink>,
    notifier: Arc<dyn Notifier>,
    chime: Option<Arc<dyn Chime>>,
}

impl ScanIngestor {
    pub fn new(sink: Arc<dyn ScanSink>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            sink,
            notifier,
            chime: None,
        }
    }

    pub fn with_chime(mut self, chime: Arc<dyn Chime>) -> Self {
        self.chime = Some(chime);
        self
    }

    /// Decode one scan and deliver it
    pub fn ingest(&self, event: &ScanEvent, language: Language) -> ParsedEquipment {
        let parsed = decoder::decode_event(event);
        tracing::info!(
            source = %event.source,
            format = ?parsed.format,
            serial = %parsed.serial_number,
            burst = ?event.burst,
            "Scan decoded"
        );

        self.sink.accept(parsed.clone(), event);
        self.notifier
            .notify(Notification::success(messages::scan_succeeded(&parsed, language)));

        if let Some(chime) = &self.chime {
            if let Err(e) = chime.play() {
                tracing::debug!(error = %e, "Scan chime failed");
            }
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScanSource, TagFormat};
    use crate::services::notify::{NotificationLevel, NotificationLog};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        received: Mutex<Vec<(ParsedEquipment, ScanSource)>>,
    }

    impl ScanSink for CollectingSink {
        fn accept(&self, parsed: ParsedEquipment, event: &ScanEvent) {
            self.received.lock().unwrap().push((parsed, event.source));
        }
    }

    struct BrokenChime;

    impl Chime for BrokenChime {
        fn play(&self) -> anyhow::Result<()> {
            anyhow::bail!("no audio device")
        }
    }

    #[test]
    fn test_ingest_delivers_and_notifies() {
        let sink = Arc::new(CollectingSink::default());
        let notes = Arc::new(NotificationLog::new());
        let ingestor = ScanIngestor::new(sink.clone(), notes.clone());

        let event = ScanEvent::new(
            "Model:TL-R480 SN:123456 MAC:AABBCCDDEEFF",
            ScanSource::HardwareKeyboard,
            1,
        );
        let parsed = ingestor.ingest(&event, Language::En);

        assert_eq!(parsed.format, TagFormat::TpLink);
        let received = sink.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1, ScanSource::HardwareKeyboard);

        let entries = notes.entries();
        assert_eq!(entries[0].level, NotificationLevel::Success);
        assert!(entries[0].message.contains("TP-Link - SN 123456"));
    }

    #[test]
    fn test_chime_failure_is_ignored() {
        let sink = Arc::new(CollectingSink::default());
        let notes = Arc::new(NotificationLog::new());
        let ingestor =
            ScanIngestor::new(sink.clone(), notes).with_chime(Arc::new(BrokenChime));

        let parsed = ingestor.ingest(&ScanEvent::manual("random-label-007", 1), Language::Id);

        assert_eq!(parsed.serial_number, "random-label-007");
        assert_eq!(sink.received.lock().unwrap().len(), 1);
    }
}
