//! Viewing session state machine
//!
//! Orchestrates the token controller and the capture engine over one linear
//! flow: confirm → requesting → countdown → disclosing → viewing, with
//! `expired` and `error` as terminal failures. Disclosure and capture are
//! coupled: the payload is only handed out with the recorder starting in
//! the same step.

use crate::capture::{CaptureEngine, CaptureState};
use crate::config::DisclosureConfig;
use crate::token::{DisclosurePayload, GrantService, TokenController};
use crate::upload::{UploadPipeline, UploadResult};
use crate::utils::error::{DisclosureError, DisclosureResult};
use crate::utils::timer::TimerHandle;
use crate::capture::device::MediaDevice;
use crate::upload::RecordingStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

/// Current stage of a viewing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewingState {
    /// Waiting for explicit user confirmation
    #[default]
    Confirm,
    /// Grant request in flight
    Requesting,
    /// Grant held, countdown running
    Countdown,
    /// Grant exchange in flight
    Disclosing,
    /// Payload disclosed; stable end-state while the session stays open
    Viewing,
    /// Terminal: countdown hit zero before disclosure
    Expired,
    /// Terminal: a controller failure at some stage
    Error,
}

/// Events emitted as the session advances
#[derive(Debug, Clone)]
pub enum ViewingEvent {
    StateChanged(ViewingState),
    /// Seconds remaining on the grant countdown
    CountdownTick(u64),
    /// Mandatory capture could not run; the disclosure stands
    CaptureMissing(DisclosureError),
}

/// Outcome of closing a viewing session.
#[derive(Debug, Clone)]
pub struct CloseOutcome {
    /// Upload pipeline result, when a recording was produced
    pub upload: Option<UploadResult>,
    /// Capture-side failure, recorded because capture is mandatory
    pub capture_failure: Option<DisclosureError>,
}

struct SessionInner {
    state: ViewingState,
    controller: TokenController,
    countdown: Option<TimerHandle>,
    last_error: Option<DisclosureError>,
    capture_failure: Option<DisclosureError>,
}

/// Handle to one disclosure viewing session. Cheap to clone; all clones
/// share state.
#[derive(Clone)]
pub struct ViewingSession {
    inner: Arc<Mutex<SessionInner>>,
    engine: CaptureEngine,
    events: broadcast::Sender<ViewingEvent>,
}

impl ViewingSession {
    pub fn new(
        config: DisclosureConfig,
        grants: Arc<dyn GrantService>,
        device: Arc<dyn MediaDevice>,
        store: Arc<dyn RecordingStore>,
    ) -> Self {
        let pipeline = UploadPipeline::new(store, config.min_encoded_len);
        let engine = CaptureEngine::new(config, device, pipeline);
        let (events, _) = broadcast::channel(100);
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                state: ViewingState::Confirm,
                controller: TokenController::new(grants),
                countdown: None,
                last_error: None,
                capture_failure: None,
            })),
            engine,
            events,
        }
    }

    /// Get the current session state
    pub async fn state(&self) -> ViewingState {
        self.inner.lock().await.state
    }

    /// Seconds left on the grant countdown.
    pub async fn remaining_seconds(&self) -> u64 {
        self.inner.lock().await.controller.remaining_seconds()
    }

    /// The failure that moved the session to `error`, if any.
    pub async fn last_error(&self) -> Option<DisclosureError> {
        self.inner.lock().await.last_error.clone()
    }

    /// Capture-side failure recorded for this session. The disclosed
    /// payload is never revoked by it, but capture is mandatory by policy
    /// so the failure is kept and reported.
    pub async fn capture_failure(&self) -> Option<DisclosureError> {
        self.inner.lock().await.capture_failure.clone()
    }

    /// State of the underlying capture engine.
    pub fn capture_state(&self) -> CaptureState {
        self.engine.state()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<ViewingEvent> {
        self.events.subscribe()
    }

    /// Explicit user confirmation: request a grant and start the countdown.
    pub async fn confirm(&self, resource_id: u64) -> DisclosureResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != ViewingState::Confirm {
            return Err(DisclosureError::NotEligible(format!(
                "confirm from {:?}",
                inner.state
            )));
        }

        self.transition(&mut inner, ViewingState::Requesting);
        match inner.controller.request_grant(resource_id).await {
            Ok(grant) => {
                tracing::info!(resource_id, grant_id = %grant.grant_id, "grant issued, countdown running");
            }
            Err(e) => {
                inner.last_error = Some(e.clone());
                self.transition(&mut inner, ViewingState::Error);
                return Err(e);
            }
        }

        self.transition(&mut inner, ViewingState::Countdown);
        inner.countdown = Some(self.spawn_countdown());
        Ok(())
    }

    /// Explicit reveal: exchange the grant and start the mandatory capture
    /// in the same step.
    ///
    /// Ownership of the payload moves to the caller; the session keeps no
    /// copy. A capture failure is recorded but does not revoke the
    /// disclosure.
    pub async fn reveal(&self) -> DisclosureResult<DisclosurePayload> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            ViewingState::Countdown => {}
            ViewingState::Expired => return Err(DisclosureError::Expired),
            other => {
                return Err(DisclosureError::NotEligible(format!("reveal from {other:?}")))
            }
        }

        self.transition(&mut inner, ViewingState::Disclosing);
        if let Some(countdown) = inner.countdown.take() {
            countdown.disarm();
        }

        let payload = match inner.controller.consume().await {
            Ok(payload) => payload,
            Err(e) => {
                let next = if e == DisclosureError::Expired {
                    ViewingState::Expired
                } else {
                    inner.last_error = Some(e.clone());
                    ViewingState::Error
                };
                self.transition(&mut inner, next);
                return Err(e);
            }
        };

        if let Err(capture_err) = self.engine.start().await {
            tracing::warn!(error = %capture_err, "mandatory capture could not start");
            inner.capture_failure = Some(capture_err.clone());
            let _ = self.events.send(ViewingEvent::CaptureMissing(capture_err));
        }

        self.transition(&mut inner, ViewingState::Viewing);
        Ok(payload)
    }

    /// Close the session: stop the capture and run the upload to
    /// completion, whether or not the caller keeps observing.
    pub async fn close(&self) -> CloseOutcome {
        {
            let mut inner = self.inner.lock().await;
            if let Some(countdown) = inner.countdown.take() {
                countdown.disarm();
            }
        }

        let upload = match self.engine.stop().await {
            Ok(result) => result,
            Err(e) => {
                let mut inner = self.inner.lock().await;
                inner.capture_failure = Some(e);
                None
            }
        };

        let capture_failure = self.inner.lock().await.capture_failure.clone();
        tracing::info!(
            uploaded = upload.is_some(),
            capture_failed = capture_failure.is_some(),
            "viewing session closed"
        );
        CloseOutcome {
            upload,
            capture_failure,
        }
    }

    /// Abandon the session without producing an asset: disarm timers and
    /// release device handles. Safe in any state, including racing an
    /// in-flight stop or upload.
    pub async fn cancel(&self) {
        {
            let mut inner = self.inner.lock().await;
            if let Some(countdown) = inner.countdown.take() {
                countdown.disarm();
            }
        }
        self.engine.cancel().await;
    }

    fn transition(&self, inner: &mut SessionInner, next: ViewingState) {
        tracing::debug!(from = ?inner.state, to = ?next, "viewing transition");
        inner.state = next;
        let _ = self.events.send(ViewingEvent::StateChanged(next));
    }

    /// 1 Hz countdown; hitting zero expires the session automatically.
    fn spawn_countdown(&self) -> TimerHandle {
        let session = self.clone();
        TimerHandle::repeating(Duration::from_secs(1), move || {
            let session = session.clone();
            async move {
                let mut inner = session.inner.lock().await;
                if inner.state != ViewingState::Countdown {
                    return false;
                }
                let remaining = inner.controller.tick();
                let _ = session.events.send(ViewingEvent::CountdownTick(remaining));
                if remaining == 0 {
                    tracing::info!("grant countdown reached zero before disclosure");
                    session.transition(&mut inner, ViewingState::Expired);
                    inner.countdown = None;
                    return false;
                }
                true
            }
        })
    }
}
