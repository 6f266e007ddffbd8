//! Ambient transcript capture.
//!
//! Speech recognition belongs to the host platform. A [`SpeechSource`] streams
//! recognition events with platform-provided speaker labels; [`CaptureSession`]
//! owns the start/stop lifecycle and forwards final utterances to a sink.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{SpeakerRole, TranscriptSegment};

/// How long `stop` waits for the platform to flush buffered events.
const STOP_GRACE: Duration = Duration::from_secs(2);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Speech capture is not supported on this platform")]
    SpeechCaptureUnsupported,

    #[error("Speech platform error: {0}")]
    Platform(String),
}

/// One recognition event.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechEvent {
    /// Interim hypotheses are `false` and are never recorded
    pub is_final: bool,
    pub text: String,
    pub speaker: SpeakerRole,
}

impl SpeechEvent {
    pub fn final_text(speaker: SpeakerRole, text: &str) -> Self {
        Self {
            is_final: true,
            text: text.to_string(),
            speaker,
        }
    }

    pub fn interim(text: &str) -> Self {
        Self {
            is_final: false,
            text: text.to_string(),
            speaker: SpeakerRole::Unknown,
        }
    }

    /// The segment to record, if this event should be recorded at all.
    pub fn to_segment(&self) -> Option<TranscriptSegment> {
        let text = self.text.trim();
        if !self.is_final || text.is_empty() {
            return None;
        }
        Some(TranscriptSegment {
            speaker: self.speaker,
            text: text.to_string(),
        })
    }
}

/// Platform speech-to-text capability.
///
/// `start` returns a stream of events; the platform closes it once `stop`
/// has been called and buffered results are flushed.
pub trait SpeechSource: Send + Sync {
    fn is_supported(&self) -> bool;
    fn start(&self) -> Result<mpsc::UnboundedReceiver<SpeechEvent>, CaptureError>;
    fn stop(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
}

/// Start/stop lifecycle over a [`SpeechSource`].
///
/// Starting while recording and stopping while idle are no-ops.
pub struct CaptureSession {
    source: Arc<dyn SpeechSource>,
    pump: Option<JoinHandle<usize>>,
}

impl CaptureSession {
    pub fn new(source: Arc<dyn SpeechSource>) -> Self {
        Self { source, pump: None }
    }

    pub fn state(&self) -> CaptureState {
        if self.pump.is_some() {
            CaptureState::Recording
        } else {
            CaptureState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state() == CaptureState::Recording
    }

    pub fn is_supported(&self) -> bool {
        self.source.is_supported()
    }

    /// Begin streaming final utterances into `sink`.
    ///
    /// Returns `Ok(false)` if already recording. Fails immediately on a
    /// platform without speech support, before touching the platform.
    pub fn start<F>(&mut self, mut sink: F) -> Result<bool, CaptureError>
    where
        F: FnMut(TranscriptSegment) + Send + 'static,
    {
        if self.is_recording() {
            debug!("Capture already recording");
            return Ok(false);
        }
        if !self.source.is_supported() {
            warn!("Speech capture unsupported on this platform");
            return Err(CaptureError::SpeechCaptureUnsupported);
        }

        let mut events = self.source.start()?;
        self.pump = Some(tokio::spawn(async move {
            let mut recorded = 0;
            while let Some(event) = events.recv().await {
                if let Some(segment) = event.to_segment() {
                    sink(segment);
                    recorded += 1;
                }
            }
            recorded
        }));
        info!("Capture started");
        Ok(true)
    }

    /// Stop the platform and wait for buffered utterances to reach the sink.
    ///
    /// Returns `false` if nothing was recording.
    pub async fn stop(&mut self) -> bool {
        let Some(mut pump) = self.pump.take() else {
            debug!("Capture already idle");
            return false;
        };
        self.source.stop();
        match tokio::time::timeout(STOP_GRACE, &mut pump).await {
            Ok(Ok(recorded)) => info!("Capture stopped: {} utterances", recorded),
            Ok(Err(e)) => warn!("Capture task ended abnormally: {}", e),
            Err(_) => {
                warn!("Speech platform did not close its stream; abandoning it");
                pump.abort();
            }
        }
        true
    }

    /// Abort capture without waiting for buffered events.
    pub fn cancel(&mut self) {
        if let Some(pump) = self.pump.take() {
            self.source.stop();
            pump.abort();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// In-process speech source replaying scripted events.
///
/// Events queued with [`script`](Self::script) are delivered on start;
/// [`emit`](Self::emit) delivers more while recording.
pub struct ScriptedSpeechSource {
    supported: bool,
    scripted: Mutex<Vec<SpeechEvent>>,
    sender: Mutex<Option<mpsc::UnboundedSender<SpeechEvent>>>,
}

impl ScriptedSpeechSource {
    pub fn new() -> Self {
        Self {
            supported: true,
            scripted: Mutex::new(Vec::new()),
            sender: Mutex::new(None),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn script(self, events: Vec<SpeechEvent>) -> Self {
        *self.scripted.lock().unwrap_or_else(|e| e.into_inner()) = events;
        self
    }

    /// Deliver an event now. Returns `false` when not recording.
    pub fn emit(&self, event: SpeechEvent) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false)
    }
}

impl Default for ScriptedSpeechSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSource for ScriptedSpeechSource {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&self) -> Result<mpsc::UnboundedReceiver<SpeechEvent>, CaptureError> {
        if !self.supported {
            return Err(CaptureError::SpeechCaptureUnsupported);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        for event in self.scripted.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            tx.send(event.clone())
                .map_err(|e| CaptureError::Platform(e.to_string()))?;
        }
        *self.sender.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}
