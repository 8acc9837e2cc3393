use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{ConnectivityMonitor, DetectionApi};
use crate::detect::{Announcement, Domain};
use crate::feedback::{Feedback, HapticKind};
use crate::frame::FrameSource;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::settings::ScanSettings;

use super::loop_worker::{
    apply_outcome, execute_cycle, record_cycle, scan_loop, CycleOutcome, ScanContext, ScanDisplay,
};
use super::session::ScanSession;

/// Owns the auto-detect lifecycle for one screen-equivalent: at most one
/// scan loop at a time, started only while the server is reachable,
/// stopped by cancelling the loop and joining it.
pub struct ScanController {
    api: Arc<dyn DetectionApi>,
    frames: Arc<dyn FrameSource>,
    feedback: Arc<dyn Feedback>,
    connectivity: Arc<ConnectivityMonitor>,
    scan_settings: ScanSettings,
    metrics: MetricsCollector,
    display_tx: Arc<watch::Sender<ScanDisplay>>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl ScanController {
    pub fn new(
        api: Arc<dyn DetectionApi>,
        frames: Arc<dyn FrameSource>,
        feedback: Arc<dyn Feedback>,
        connectivity: Arc<ConnectivityMonitor>,
        scan_settings: ScanSettings,
    ) -> Self {
        let (display_tx, _) = watch::channel(ScanDisplay::default());
        Self {
            api,
            frames,
            feedback,
            connectivity,
            scan_settings,
            metrics: MetricsCollector::new(),
            display_tx: Arc::new(display_tx),
            handle: None,
            cancel_token: None,
        }
    }

    /// Latest display state; an empty display means "nothing detected".
    pub fn display(&self) -> watch::Receiver<ScanDisplay> {
        self.display_tx.subscribe()
    }

    pub fn is_scanning(&self) -> bool {
        self.handle.is_some()
    }

    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.get_snapshot().await
    }

    /// Begin auto-detecting. Refused outright while the server is
    /// unreachable: no state changes, the user hears why.
    pub fn start(&mut self, domain: Domain) -> Result<()> {
        if self.handle.is_some() {
            bail!("scan already active");
        }
        if !self.connectivity.is_connected() {
            self.feedback.haptic(HapticKind::Error);
            self.feedback
                .speak("API not connected. Please check connection.", true);
            bail!("detection server is not reachable");
        }

        let session = ScanSession::new();
        info!("starting auto-detect session {} ({:?})", session.id, domain);

        self.feedback.haptic(HapticKind::Medium);
        self.feedback.speak("Scanning started", true);

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(scan_loop(
            session,
            self.context(domain),
            Duration::from_millis(self.scan_settings.interval_ms),
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Stop auto-detecting. An in-flight cycle is allowed to finish but its
    /// result is discarded; the displayed result is cleared.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        handle.await.context("scan loop task failed to join")?;

        self.display_tx.send_replace(ScanDisplay::default());
        self.feedback.haptic(HapticKind::Medium);
        self.feedback.speak("Scanning stopped", true);
        Ok(())
    }

    /// One manual capture outside the loop. Failures and empty results are
    /// surfaced to the user here, unlike in auto mode.
    pub async fn capture_once(&mut self, domain: Domain) -> Result<Option<Announcement>> {
        if self.handle.is_some() {
            bail!("auto-detect is running; stop it before a manual capture");
        }
        if !self.connectivity.is_connected() {
            self.feedback.haptic(HapticKind::Error);
            self.feedback
                .speak("API not connected. Please check connection.", true);
            bail!("detection server is not reachable");
        }

        let mut session = ScanSession::new();
        let ctx = self.context(domain);

        session.begin_cycle();
        let (outcome, timings) = execute_cycle(&ctx).await;
        session.end_cycle();

        let result = apply_outcome(&mut session, &ctx, &outcome, true);
        record_cycle(&ctx, timings, result).await;

        match outcome {
            CycleOutcome::Detection(announcement) => Ok(Some(announcement)),
            CycleOutcome::NoDetection => Ok(None),
            CycleOutcome::Failed(err) => Err(err),
        }
    }

    fn context(&self, domain: Domain) -> ScanContext {
        ScanContext {
            domain,
            api: Arc::clone(&self.api),
            frames: Arc::clone(&self.frames),
            feedback: Arc::clone(&self.feedback),
            display_tx: Arc::clone(&self.display_tx),
            metrics: self.metrics.clone(),
            max_upload_dim: self.scan_settings.max_upload_dim,
            cycle_timeout: Duration::from_secs(self.scan_settings.cycle_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::DetectionResponse;
    use crate::api::{ApiClient, ApiError};
    use crate::frame::Frame;
    use crate::settings::ApiSettings;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingFeedback {
        spoken: StdMutex<Vec<String>>,
        haptics: StdMutex<Vec<HapticKind>>,
    }

    impl Feedback for RecordingFeedback {
        fn speak(&self, text: &str, _interrupt: bool) {
            self.spoken.lock().unwrap().push(text.to_string());
        }

        fn haptic(&self, kind: HapticKind) {
            self.haptics.lock().unwrap().push(kind);
        }

        fn stop_speech(&self) {}
    }

    struct UnreachableApi;

    #[async_trait]
    impl DetectionApi for UnreachableApi {
        async fn detect(
            &self,
            _domain: Domain,
            _image: Vec<u8>,
            _file_name: &str,
        ) -> Result<DetectionResponse, ApiError> {
            Err(ApiError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }
    }

    struct NoFrames;

    #[async_trait]
    impl FrameSource for NoFrames {
        async fn capture(&self) -> anyhow::Result<Frame> {
            anyhow::bail!("no camera in tests")
        }
    }

    fn controller(feedback: Arc<RecordingFeedback>) -> ScanController {
        // A fresh monitor has never seen a health check, so it reads as
        // disconnected.
        let connectivity = Arc::new(ConnectivityMonitor::new(ApiClient::new(
            &ApiSettings::default(),
        )));
        ScanController::new(
            Arc::new(UnreachableApi),
            Arc::new(NoFrames),
            feedback,
            connectivity,
            crate::settings::ScanSettings::default(),
        )
    }

    #[tokio::test]
    async fn start_is_refused_while_disconnected() {
        let feedback = Arc::new(RecordingFeedback::default());
        let mut controller = controller(feedback.clone());

        assert!(controller.start(Domain::Color).is_err());
        assert!(!controller.is_scanning());

        assert!(feedback
            .haptics
            .lock()
            .unwrap()
            .contains(&HapticKind::Error));
        let spoken = feedback.spoken.lock().unwrap();
        assert!(spoken.iter().any(|s| s.contains("not connected")));
        // The refusal must not have spoken "Scanning started".
        assert!(!spoken.iter().any(|s| s.contains("started")));
    }

    #[tokio::test]
    async fn manual_capture_is_refused_while_disconnected() {
        let feedback = Arc::new(RecordingFeedback::default());
        let mut controller = controller(feedback.clone());

        assert!(controller.capture_once(Domain::Currency).await.is_err());
        assert!(feedback
            .haptics
            .lock()
            .unwrap()
            .contains(&HapticKind::Error));
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let feedback = Arc::new(RecordingFeedback::default());
        let mut controller = controller(feedback.clone());

        controller.stop().await.unwrap();
        assert!(feedback.spoken.lock().unwrap().is_empty());
    }
}
