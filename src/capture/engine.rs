//! Capture engine
//!
//! Owns the camera+microphone stream for the lifetime of one recording
//! session: acquisition, format negotiation, chunk accumulation, the hard
//! duration cap, finalization and hand-off to the upload pipeline. Device
//! handles are released on every exit path.

use super::asset::RecordingSession;
use super::device::{
    CaptureEvent, MediaDevice, MediaStream, RecordingModality, FALLBACK_MIME, MIME_PREFERENCES,
};
use crate::config::DisclosureConfig;
use crate::upload::{UploadPipeline, UploadResult};
use crate::utils::error::{DisclosureError, DisclosureResult};
use crate::utils::timer::TimerHandle;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

/// Current state of the capture engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    /// No capture in progress
    #[default]
    Idle,
    /// Waiting on device acquisition / permission prompt
    Acquiring,
    /// Actively recording
    Recording,
    /// Assembling the asset and running the upload
    Finalizing,
    /// Terminal: recording persisted
    Uploaded,
    /// Terminal: capture or upload failed
    Failed,
}

/// Events emitted during capture
#[derive(Debug, Clone)]
pub enum CaptureUpdate {
    /// Recording started
    Started,
    /// A chunk arrived; payload is the running chunk count
    ChunkAppended(usize),
    /// Recording stopped, finalization begins
    Stopped,
    /// Recording persisted; payload is the server reference
    Uploaded(Option<String>),
    /// Capture or upload failed
    Failed(DisclosureError),
}

#[derive(Debug, Default)]
struct EngineStatus {
    state: CaptureState,
    failure: Option<DisclosureError>,
}

#[derive(Default)]
struct EngineInner {
    session: Option<RecordingSession>,
    stream: Option<Box<dyn MediaStream>>,
    cap_timer: Option<TimerHandle>,
    pump: Option<JoinHandle<()>>,
}

/// Drives one recording session. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct CaptureEngine {
    config: DisclosureConfig,
    device: Arc<dyn MediaDevice>,
    pipeline: UploadPipeline,
    status: Arc<RwLock<EngineStatus>>,
    inner: Arc<Mutex<EngineInner>>,
    events: broadcast::Sender<CaptureUpdate>,
}

impl CaptureEngine {
    pub fn new(
        config: DisclosureConfig,
        device: Arc<dyn MediaDevice>,
        pipeline: UploadPipeline,
    ) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            config,
            device,
            pipeline,
            status: Arc::new(RwLock::new(EngineStatus::default())),
            inner: Arc::new(Mutex::new(EngineInner::default())),
            events,
        }
    }

    /// Get the current engine state
    pub fn state(&self) -> CaptureState {
        self.status.read().state
    }

    /// The failure that moved the engine to `Failed`, if any.
    pub fn last_failure(&self) -> Option<DisclosureError> {
        self.status.read().failure.clone()
    }

    /// Subscribe to capture events
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureUpdate> {
        self.events.subscribe()
    }

    /// Captured modalities under the configured constraints.
    pub fn modality(&self) -> RecordingModality {
        RecordingModality::from_constraints(&self.config.constraints)
    }

    /// Start recording.
    ///
    /// A duplicate start while already `acquiring` or `recording` is a
    /// no-op, so exactly one session exists per viewing session. Acquires
    /// the device, negotiates the encoding, begins 1 s chunking and arms
    /// the duration-cap timer.
    pub async fn start(&self) -> DisclosureResult<()> {
        {
            let mut status = self.status.write();
            match status.state {
                CaptureState::Acquiring | CaptureState::Recording => {
                    tracing::debug!("capture already active, ignoring start");
                    return Ok(());
                }
                CaptureState::Idle => status.state = CaptureState::Acquiring,
                other => {
                    return Err(DisclosureError::RecorderError(format!(
                        "capture engine already finished ({other:?})"
                    )))
                }
            }
        }

        tracing::info!("acquiring camera and microphone");
        let mut stream = match self.device.acquire(&self.config.constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(e.clone());
                return Err(e);
            }
        };

        // A cancel may have landed while we were suspended in acquisition;
        // its teardown must stick.
        if self.state() != CaptureState::Acquiring {
            tracing::debug!("capture cancelled during device acquisition");
            stream.release();
            return Err(self.cancel_failure());
        }

        let mime = MIME_PREFERENCES
            .iter()
            .copied()
            .find(|m| stream.supports_mime(m))
            .unwrap_or(FALLBACK_MIME);
        tracing::info!(mime_type = mime, "negotiated encoding");

        let (tx, rx) = mpsc::channel(64);
        if let Err(e) = stream.start(mime, self.config.chunk_interval(), tx).await {
            stream.release();
            self.fail(e.clone());
            return Err(e);
        }
        if self.state() != CaptureState::Acquiring {
            tracing::debug!("capture cancelled while starting the recorder");
            stream.release();
            return Err(self.cancel_failure());
        }

        {
            let mut inner = self.inner.lock().await;
            inner.session = Some(RecordingSession::new(mime));
            inner.stream = Some(stream);
            inner.pump = Some(self.spawn_pump(rx));

            let engine = self.clone();
            inner.cap_timer = Some(TimerHandle::once(self.config.max_capture(), async move {
                tracing::info!("duration cap reached, forcing stop");
                // Detached: stop() disarms this very timer, which must not
                // cancel the stop it forced.
                tokio::spawn(async move {
                    if let Err(e) = engine.stop().await {
                        tracing::warn!(error = %e, "cap-forced stop failed");
                    }
                });
            }));
        }

        // Only move to recording if nothing cancelled us while arming; a
        // lost race means the cancel already drained (or is about to drain)
        // what we stored, so drain again rather than resurrect.
        let armed = {
            let mut status = self.status.write();
            if status.state == CaptureState::Acquiring {
                status.state = CaptureState::Recording;
                true
            } else {
                false
            }
        };
        if !armed {
            tracing::debug!("capture cancelled while arming, tearing down");
            let mut inner = self.inner.lock().await;
            if let Some(timer) = inner.cap_timer.take() {
                timer.disarm();
            }
            if let Some(pump) = inner.pump.take() {
                pump.abort();
            }
            if let Some(mut stream) = inner.stream.take() {
                stream.release();
            }
            inner.session = None;
            drop(inner);
            return Err(self.cancel_failure());
        }

        let _ = self.events.send(CaptureUpdate::Started);
        tracing::info!("recording started");
        Ok(())
    }

    /// Failure to report when a cancel wins a race against `start()`.
    fn cancel_failure(&self) -> DisclosureError {
        self.last_failure()
            .unwrap_or_else(|| DisclosureError::RecorderError("capture cancelled".to_string()))
    }

    /// Stop recording, assemble the asset and run the upload pipeline.
    ///
    /// Only meaningful from `recording`; any other state returns `Ok(None)`
    /// so close/cancel races stay harmless. Device handles are released no
    /// matter how finalization turns out.
    pub async fn stop(&self) -> DisclosureResult<Option<UploadResult>> {
        {
            let mut status = self.status.write();
            if status.state != CaptureState::Recording {
                tracing::debug!(state = ?status.state, "stop outside recording, ignoring");
                return Ok(None);
            }
            status.state = CaptureState::Finalizing;
        }

        tracing::info!("stopping recording");
        let (stream, pump) = {
            let mut inner = self.inner.lock().await;
            if let Some(timer) = inner.cap_timer.take() {
                timer.disarm();
            }
            (inner.stream.take(), inner.pump.take())
        };

        if let Some(mut stream) = stream {
            stream.stop().await;
            // Let the pump drain the recorder's flush; a recorder that never
            // reports back must not wedge device release.
            if let Some(pump) = pump {
                if tokio::time::timeout(Duration::from_secs(5), pump).await.is_err() {
                    tracing::warn!("recorder did not flush in time");
                }
            }
            stream.release();
        }

        // The pump may have failed the engine while we were draining.
        if let Some(failure) = self.last_failure() {
            return Err(failure);
        }

        let session = self.inner.lock().await.session.take();
        let Some(session) = session else {
            let e = DisclosureError::RecorderError("no active session".to_string());
            self.fail(e.clone());
            return Err(e);
        };

        let _ = self.events.send(CaptureUpdate::Stopped);

        if session.chunks.is_empty() {
            tracing::warn!("recorder produced no chunks");
            self.fail(DisclosureError::EmptyCapture);
            return Err(DisclosureError::EmptyCapture);
        }

        let asset = session.finalize(self.modality());
        tracing::info!(
            duration_seconds = asset.duration_seconds,
            size_bytes = asset.bytes.len(),
            "capture finalized"
        );

        match self.pipeline.submit(&asset).await {
            Ok(result) => {
                self.status.write().state = CaptureState::Uploaded;
                let _ = self
                    .events
                    .send(CaptureUpdate::Uploaded(result.recording_ref.clone()));
                Ok(Some(result))
            }
            Err(e) => {
                self.fail(e.clone());
                Err(e)
            }
        }
    }

    /// Tear down without producing an asset: disarm the cap timer, abort
    /// the pump and release device handles. Used when the controlling
    /// context goes away; safe in any state, including racing an in-flight
    /// stop.
    pub async fn cancel(&self) {
        {
            let mut status = self.status.write();
            match status.state {
                CaptureState::Idle | CaptureState::Uploaded | CaptureState::Failed => {}
                _ => {
                    status.state = CaptureState::Failed;
                    status
                        .failure
                        .get_or_insert(DisclosureError::RecorderError(
                            "capture cancelled".to_string(),
                        ));
                }
            }
        }

        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.cap_timer.take() {
            timer.disarm();
        }
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        if let Some(mut stream) = inner.stream.take() {
            stream.release();
        }
        inner.session = None;
        tracing::debug!("capture engine cancelled");
    }

    fn fail(&self, error: DisclosureError) {
        {
            let mut status = self.status.write();
            status.state = CaptureState::Failed;
            status.failure = Some(error.clone());
        }
        tracing::warn!(error = %error, "capture failed");
        let _ = self.events.send(CaptureUpdate::Failed(error));
    }

    /// Consume recorder events in arrival order, keeping chunk order equal
    /// to temporal capture order.
    fn spawn_pump(&self, mut rx: mpsc::Receiver<CaptureEvent>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    CaptureEvent::Data(chunk) => {
                        if chunk.is_empty() {
                            continue;
                        }
                        let count = {
                            let mut inner = engine.inner.lock().await;
                            match inner.session.as_mut() {
                                Some(session) => {
                                    session.chunks.push(chunk);
                                    session.chunks.len()
                                }
                                None => continue,
                            }
                        };
                        let _ = engine.events.send(CaptureUpdate::ChunkAppended(count));
                    }
                    CaptureEvent::Stopped => break,
                    CaptureEvent::Error(msg) => {
                        // Mid-recording recorder fault: release immediately,
                        // the device must not stay held.
                        let mut inner = engine.inner.lock().await;
                        if let Some(timer) = inner.cap_timer.take() {
                            timer.disarm();
                        }
                        if let Some(mut stream) = inner.stream.take() {
                            stream.release();
                        }
                        drop(inner);
                        engine.fail(DisclosureError::RecorderError(msg));
                        break;
                    }
                }
            }
        })
    }
}
