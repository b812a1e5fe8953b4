//! Keyboard-emulation scanner channel
//!
//! Hardware barcode readers "type" their payload as a fast burst of key
//! events, usually terminated by Enter. [`KeystrokeBuffer`] collects those
//! keys into one [`ScanEvent`]; [`spawn_keyboard_listener`] drives it from a
//! channel of key events using tokio timers for the idle flush.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::ScannerConfig;
use crate::models::{ScanEvent, ScanSource};
use crate::services::clock::Clock;

/// Share of fast inter-key gaps above which a burst looks machine-typed
pub const BURST_RATIO: f64 = 0.8;

/// One key event as seen by the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    /// Modifiers, arrows and the like; ignored
    Other,
}

/// Accumulates keystrokes while armed
#[derive(Debug)]
pub struct KeystrokeBuffer {
    config: ScannerConfig,
    armed: bool,
    buffer: String,
    last_key_ms: Option<i64>,
    gaps: Vec<i64>,
}

impl KeystrokeBuffer {
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            armed: false,
            buffer: String::new(),
            last_key_ms: None,
            gaps: Vec::new(),
        }
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Stop listening and drop anything buffered
    pub fn disarm(&mut self) {
        self.armed = false;
        self.reset();
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Feed one key. Returns a scan when Enter completes a non-empty buffer.
    pub fn on_key(&mut self, key: Key, at_ms: i64) -> Option<ScanEvent> {
        if !self.armed {
            return None;
        }
        match key {
            Key::Enter => {
                if self.buffer.is_empty() {
                    None
                } else {
                    Some(self.flush(at_ms))
                }
            }
            Key::Char(c) => {
                if let Some(last) = self.last_key_ms {
                    self.gaps.push(at_ms - last);
                }
                self.buffer.push(c);
                self.last_key_ms = Some(at_ms);
                None
            }
            Key::Other => None,
        }
    }

    /// Time at which the buffer goes idle, if anything is buffered
    pub fn idle_deadline_ms(&self) -> Option<i64> {
        if self.buffer.is_empty() {
            return None;
        }
        let idle = i64::try_from(self.config.idle_flush().as_millis()).unwrap_or(i64::MAX);
        self.last_key_ms.map(|last| last.saturating_add(idle))
    }

    /// Idle check.
    ///
    /// Once the idle gap has passed, a buffer longer than the minimum length is
    /// emitted as a scan; a shorter one is treated as stray typing and dropped.
    pub fn on_idle(&mut self, now_ms: i64) -> Option<ScanEvent> {
        let deadline = self.idle_deadline_ms()?;
        if now_ms < deadline {
            return None;
        }
        if self.buffer.chars().count() > self.config.min_flush_length {
            Some(self.flush(now_ms))
        } else {
            tracing::trace!(len = self.buffer.len(), "Dropping short keystroke buffer");
            self.reset();
            None
        }
    }

    /// Fraction of inter-key gaps faster than the burst interval
    pub fn burst_ratio(&self) -> Option<f64> {
        if self.gaps.is_empty() {
            return None;
        }
        let limit = self.config.burst_interval_ms as i64;
        let fast = self.gaps.iter().filter(|gap| **gap < limit).count();
        Some(fast as f64 / self.gaps.len() as f64)
    }

    fn flush(&mut self, at_ms: i64) -> ScanEvent {
        let burst = self.burst_ratio().map(|ratio| ratio >= BURST_RATIO);
        let mut event = ScanEvent::new(
            std::mem::take(&mut self.buffer),
            ScanSource::HardwareKeyboard,
            at_ms,
        );
        event.burst = burst;
        self.reset();
        tracing::debug!(len = event.raw_text.len(), ?burst, "Keystroke buffer flushed");
        event
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.last_key_ms = None;
        self.gaps.clear();
    }
}

/// Drive an armed [`KeystrokeBuffer`] from a key channel.
///
/// Key timestamps come from the tokio clock anchored at the wall clock, so
/// the idle flush and burst timing follow paused time in tests. The task ends
/// when either channel closes.
pub fn spawn_keyboard_listener(
    config: ScannerConfig,
    clock: Arc<dyn Clock>,
    mut keys: mpsc::Receiver<Key>,
    events: mpsc::Sender<ScanEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let origin = Instant::now();
        let base_ms = clock.now_millis();
        let now_ms = move || {
            base_ms + i64::try_from(origin.elapsed().as_millis()).unwrap_or(i64::MAX - base_ms)
        };

        let mut buffer = KeystrokeBuffer::new(config);
        buffer.arm();

        loop {
            let received = match buffer.idle_deadline_ms() {
                Some(deadline_ms) => {
                    let wait = Duration::from_millis((deadline_ms - base_ms).max(0) as u64);
                    match tokio::time::timeout_at(origin + wait, keys.recv()).await {
                        Ok(key) => key,
                        Err(_) => {
                            if let Some(event) = buffer.on_idle(now_ms()) {
                                if events.send(event).await.is_err() {
                                    break;
                                }
                            }
                            continue;
                        }
                    }
                }
                None => keys.recv().await,
            };

            let Some(key) = received else {
                break;
            };
            if let Some(event) = buffer.on_key(key, now_ms()) {
                if events.send(event).await.is_err() {
                    break;
                }
            }
        }
        tracing::debug!("Keyboard listener stopped");
    })
}
