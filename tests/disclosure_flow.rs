//! End-to-end disclosure flow scenarios against mock collaborators,
//! on a paused-time runtime so grant windows and the duration cap run
//! deterministically.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use sealed_disclosure::capture::{CaptureEvent, CaptureState, MediaDevice, MediaStream};
use sealed_disclosure::config::{DisclosureConfig, MediaConstraints};
use sealed_disclosure::token::{DisclosurePayload, GrantService, GrantTicket};
use sealed_disclosure::upload::{RecordingInfo, RecordingStore, RecordingUpload, UploadReceipt};
use sealed_disclosure::utils::{DisclosureError, DisclosureResult};
use sealed_disclosure::viewing::{ViewingSession, ViewingState};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[derive(Default)]
struct StubGrantService {
    issued: Mutex<Vec<String>>,
    consumed: Mutex<Vec<String>>,
    next_token: AtomicU32,
}

#[async_trait]
impl GrantService for StubGrantService {
    async fn request_grant(&self, resource_id: u64) -> DisclosureResult<GrantTicket> {
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        let token = format!("view-{resource_id}-{n}");
        self.issued.lock().push(token.clone());
        Ok(GrantTicket {
            token,
            expires_in_seconds: 120,
        })
    }

    async fn consume_grant(
        &self,
        _resource_id: u64,
        token: &str,
    ) -> DisclosureResult<DisclosurePayload> {
        let mut consumed = self.consumed.lock();
        if consumed.iter().any(|t| t == token) {
            return Err(DisclosureError::AlreadyConsumed);
        }
        consumed.push(token.to_string());
        Ok(DisclosurePayload {
            case_detail: serde_json::json!({
                "case_number": "CASO-7",
                "title": "Sealed resolution",
            }),
            signers: vec!["judge-anon-1".to_string()],
            approvals: vec!["custodian-a".to_string(), "custodian-b".to_string()],
            reason: "court-ordered review".to_string(),
        })
    }
}

struct StubDevice {
    deny_permission: bool,
    released: Arc<AtomicBool>,
}

impl StubDevice {
    fn new() -> Self {
        Self {
            deny_permission: false,
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl MediaDevice for StubDevice {
    async fn acquire(
        &self,
        _constraints: &MediaConstraints,
    ) -> DisclosureResult<Box<dyn MediaStream>> {
        if self.deny_permission {
            return Err(DisclosureError::PermissionDenied(
                "user dismissed the prompt".to_string(),
            ));
        }
        Ok(Box::new(StubStream {
            stop: None,
            released: self.released.clone(),
        }))
    }
}

struct StubStream {
    stop: Option<watch::Sender<bool>>,
    released: Arc<AtomicBool>,
}

#[async_trait]
impl MediaStream for StubStream {
    fn supports_mime(&self, mime: &str) -> bool {
        mime == "video/webm;codecs=vp9,opus"
    }

    async fn start(
        &mut self,
        _mime: &str,
        chunk_interval: Duration,
        events: mpsc::Sender<CaptureEvent>,
    ) -> DisclosureResult<()> {
        let (tx, mut rx) = watch::channel(false);
        self.stop = Some(tx);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(chunk_interval) => {
                        if events.send(CaptureEvent::Data(vec![3u8; 4096])).await.is_err() {
                            break;
                        }
                    }
                    _ = rx.changed() => {
                        let _ = events.send(CaptureEvent::Stopped).await;
                        break;
                    }
                }
            }
        });
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(true);
        }
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct StubStore {
    uploads: Mutex<Vec<RecordingUpload>>,
}

#[async_trait]
impl RecordingStore for StubStore {
    async fn upload_recording(&self, upload: &RecordingUpload) -> DisclosureResult<UploadReceipt> {
        self.uploads.lock().push(upload.clone());
        Ok(UploadReceipt {
            accepted: true,
            recording_ref: Some(format!("rec-{}", self.uploads.lock().len())),
            sha256_hash: Some("deadbeef".to_string()),
            size_bytes: upload.recording_data.len() as u64,
        })
    }

    async fn list_recordings(&self) -> DisclosureResult<Vec<RecordingInfo>> {
        Ok(Vec::new())
    }

    async fn get_recording(&self, _id: &str) -> DisclosureResult<(RecordingInfo, String)> {
        Err(DisclosureError::NetworkError("not found".to_string()))
    }

    async fn delete_recording(&self, _id: &str) -> DisclosureResult<()> {
        Ok(())
    }
}

fn session_with(
    device: StubDevice,
    store: Arc<StubStore>,
    grants: Arc<StubGrantService>,
) -> ViewingSession {
    ViewingSession::new(
        DisclosureConfig::default(),
        grants,
        Arc::new(device),
        store,
    )
}

#[tokio::test(start_paused = true)]
async fn grant_expires_before_disclosure() -> Result<()> {
    let grants = Arc::new(StubGrantService::default());
    let session = session_with(StubDevice::new(), Arc::new(StubStore::default()), grants);

    session.confirm(7).await?;
    assert_eq!(session.state().await, ViewingState::Countdown);
    assert_eq!(session.remaining_seconds().await, 120);

    tokio::time::sleep(Duration::from_secs(125)).await;
    assert_eq!(session.state().await, ViewingState::Expired);

    let result = session.reveal().await;
    assert_eq!(result.unwrap_err(), DisclosureError::Expired);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn disclose_within_window_then_close_after_ten_seconds() -> Result<()> {
    let grants = Arc::new(StubGrantService::default());
    let store = Arc::new(StubStore::default());
    let device = StubDevice::new();
    let released = device.released.clone();
    let session = session_with(device, store.clone(), grants.clone());

    session.confirm(7).await?;
    // Half-second offset keeps the assertion clear of the tick boundary.
    tokio::time::sleep(Duration::from_millis(30_500)).await;
    assert_eq!(session.remaining_seconds().await, 90);

    let payload = session.reveal().await?;
    assert_eq!(payload.reason, "court-ordered review");
    assert_eq!(session.state().await, ViewingState::Viewing);
    assert_eq!(session.capture_state(), CaptureState::Recording);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let outcome = session.close().await;

    let upload = outcome.upload.expect("recording uploaded");
    assert!(upload.accepted);
    assert!(upload.recording_ref.is_some());
    assert!(outcome.capture_failure.is_none());
    assert!(released.load(Ordering::SeqCst));

    let uploads = store.uploads.lock();
    assert_eq!(uploads.len(), 1);
    assert!((9..=11).contains(&uploads[0].duration_seconds));
    assert_eq!(uploads[0].recording_type, "both");
    assert_eq!(uploads[0].mime_type, "video/webm;codecs=vp9,opus");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn permission_denied_still_discloses_but_flags_missing_capture() -> Result<()> {
    let grants = Arc::new(StubGrantService::default());
    let store = Arc::new(StubStore::default());
    let mut device = StubDevice::new();
    device.deny_permission = true;
    let session = session_with(device, store.clone(), grants);

    session.confirm(7).await?;
    let payload = session.reveal().await?;
    assert_eq!(payload.signers, vec!["judge-anon-1".to_string()]);

    assert_eq!(session.state().await, ViewingState::Viewing);
    assert_eq!(session.capture_state(), CaptureState::Failed);
    assert!(matches!(
        session.capture_failure().await,
        Some(DisclosureError::PermissionDenied(_))
    ));

    let outcome = session.close().await;
    assert!(outcome.upload.is_none());
    assert!(outcome.capture_failure.is_some());
    assert!(store.uploads.lock().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reveal_is_single_use_per_session() -> Result<()> {
    let grants = Arc::new(StubGrantService::default());
    let session = session_with(
        StubDevice::new(),
        Arc::new(StubStore::default()),
        grants.clone(),
    );

    session.confirm(7).await?;
    session.reveal().await?;

    // The flow is linear: a second reveal is out of sequence, and the
    // server was only ever asked once.
    let second = session.reveal().await;
    assert!(matches!(second, Err(DisclosureError::NotEligible(_))));
    assert_eq!(grants.consumed.lock().len(), 1);

    session.cancel().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn duration_cap_stops_an_open_session() -> Result<()> {
    let grants = Arc::new(StubGrantService::default());
    let store = Arc::new(StubStore::default());
    let session = session_with(StubDevice::new(), store.clone(), grants);

    session.confirm(7).await?;
    let _payload = session.reveal().await?;

    // The reviewer leaves the session open well past the cap.
    tokio::time::sleep(Duration::from_secs(200)).await;
    assert_eq!(session.capture_state(), CaptureState::Uploaded);

    let uploads = store.uploads.lock();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].duration_seconds <= 121);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_releases_device_mid_recording() -> Result<()> {
    let grants = Arc::new(StubGrantService::default());
    let store = Arc::new(StubStore::default());
    let device = StubDevice::new();
    let released = device.released.clone();
    let session = session_with(device, store.clone(), grants);

    session.confirm(7).await?;
    session.reveal().await?;
    tokio::time::sleep(Duration::from_secs(5)).await;

    session.cancel().await;
    assert!(released.load(Ordering::SeqCst));
    assert_eq!(session.capture_state(), CaptureState::Failed);
    assert!(store.uploads.lock().is_empty());
    Ok(())
}
