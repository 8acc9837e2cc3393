use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::DetectionApi;
use crate::detect::{normalize, Announcement, Domain};
use crate::feedback::{Feedback, HapticKind};
use crate::frame::{bound_upload_size, FrameSource};
use crate::metrics::{CycleMetrics, CycleResult, MetricsCollector};

// Set to false to silence per-cycle logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

use super::session::ScanSession;

/// What the user-facing surface currently shows. NoDetection publishes an
/// empty display, clearing the previous result without speech.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanDisplay {
    pub label: String,
    pub color_hex: Option<String>,
}

impl ScanDisplay {
    fn from_announcement(announcement: &Announcement) -> Self {
        Self {
            label: announcement.display_label.clone(),
            color_hex: announcement.display_color_hex.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_empty()
    }
}

/// Everything one scanning session needs. Manual single captures share the
/// same context and cycle path without entering the loop.
pub(crate) struct ScanContext {
    pub domain: Domain,
    pub api: Arc<dyn DetectionApi>,
    pub frames: Arc<dyn FrameSource>,
    pub feedback: Arc<dyn Feedback>,
    pub display_tx: Arc<watch::Sender<ScanDisplay>>,
    pub metrics: MetricsCollector,
    pub max_upload_dim: u32,
    pub cycle_timeout: Duration,
}

pub(crate) enum CycleOutcome {
    Detection(Announcement),
    NoDetection,
    Failed(anyhow::Error),
}

#[derive(Debug, Default)]
pub(crate) struct CycleTimings {
    pub capture_ms: u64,
    pub upload_ms: u64,
    pub image_bytes: usize,
    pub total_ms: u64,
}

/// Interval-driven capture loop for one session.
///
/// Ticks that land while a cycle is in flight are dropped, never queued, so
/// cycle N+1 cannot start before N has fully completed. Cancellation exits
/// between cycles; a cycle already under way finishes and its result is
/// discarded without touching the session or the user.
pub(crate) async fn scan_loop(
    mut session: ScanSession,
    ctx: ScanContext,
    tick_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    session.arm();
    log_info!("scan session {} armed ({:?})", session.id, ctx.domain);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !session.begin_cycle() {
                    continue;
                }
                let (outcome, timings) = execute_cycle(&ctx).await;
                session.end_cycle();

                // A cycle resolving after stop is discarded untouched.
                if cancel_token.is_cancelled() {
                    break;
                }

                let result = apply_outcome(&mut session, &ctx, &outcome, false);
                record_cycle(&ctx, timings, result).await;
            }
            _ = cancel_token.cancelled() => break,
        }
    }

    session.disarm();
    log_info!("scan session {} stopped", session.id);
}

/// One bounded capture→upload→normalize pass.
pub(crate) async fn execute_cycle(ctx: &ScanContext) -> (CycleOutcome, CycleTimings) {
    let started = Instant::now();
    let mut timings = CycleTimings::default();

    let outcome = match timeout(ctx.cycle_timeout, detect_once(ctx, &mut timings)).await {
        Ok(outcome) => outcome,
        Err(_) => CycleOutcome::Failed(anyhow!(
            "cycle exceeded {}s",
            ctx.cycle_timeout.as_secs()
        )),
    };

    timings.total_ms = started.elapsed().as_millis() as u64;
    (outcome, timings)
}

async fn detect_once(ctx: &ScanContext, timings: &mut CycleTimings) -> CycleOutcome {
    let capture_start = Instant::now();
    let frame = match ctx.frames.capture().await {
        Ok(frame) => frame,
        Err(err) => return CycleOutcome::Failed(err.context("frame capture failed")),
    };
    let bytes = match frame.read().await {
        Ok(bytes) => bytes,
        Err(err) => return CycleOutcome::Failed(err),
    };
    timings.capture_ms = capture_start.elapsed().as_millis() as u64;

    let file_name = frame.file_name();
    let max_dim = ctx.max_upload_dim;
    let (bytes, file_name) = match tokio::task::spawn_blocking(move || {
        bound_upload_size(bytes, &file_name, max_dim)
    })
    .await
    {
        Ok(prepared) => prepared,
        Err(err) => return CycleOutcome::Failed(anyhow!("frame prepare worker join failed: {err}")),
    };
    timings.image_bytes = bytes.len();

    let upload_start = Instant::now();
    let result = ctx.api.detect(ctx.domain, bytes, &file_name).await;
    timings.upload_ms = upload_start.elapsed().as_millis() as u64;

    // The temp frame is released now that the upload completed or failed.
    drop(frame);

    match result {
        Ok(response) => match normalize(&response) {
            Some(announcement) => CycleOutcome::Detection(announcement),
            None => CycleOutcome::NoDetection,
        },
        Err(err) => CycleOutcome::Failed(err.into()),
    }
}

/// Route one cycle's outcome to the display, the gate, and the feedback
/// coordinator. Transient failures stay silent in auto mode; manual
/// captures surface them with speech and an error pulse.
pub(crate) fn apply_outcome(
    session: &mut ScanSession,
    ctx: &ScanContext,
    outcome: &CycleOutcome,
    manual: bool,
) -> CycleResult {
    match outcome {
        CycleOutcome::Detection(announcement) => {
            ctx.display_tx
                .send_replace(ScanDisplay::from_announcement(announcement));
            if session.admit(announcement) {
                ctx.feedback.haptic(HapticKind::Success);
                ctx.feedback.speak(&announcement.spoken_text, true);
                log_info!("announced '{}'", announcement.spoken_text);
                CycleResult::Announced
            } else {
                log_debug!("suppressed repeat '{}'", announcement.key);
                CycleResult::Deduplicated
            }
        }
        CycleOutcome::NoDetection => {
            ctx.display_tx.send_replace(ScanDisplay::default());
            if manual {
                ctx.feedback.haptic(HapticKind::Light);
                ctx.feedback.speak("Nothing detected.", true);
            }
            CycleResult::NoDetection
        }
        CycleOutcome::Failed(err) => {
            if manual {
                ctx.feedback.haptic(HapticKind::Error);
                ctx.feedback.speak("Detection failed. Please try again.", true);
                log_error!("manual capture failed: {err:#}");
            } else {
                log_warn!("cycle failed, next tick retries: {err:#}");
            }
            CycleResult::Failed
        }
    }
}

pub(crate) async fn record_cycle(ctx: &ScanContext, timings: CycleTimings, result: CycleResult) {
    ctx.metrics
        .record_cycle(CycleMetrics {
            timestamp: Utc::now(),
            capture_ms: timings.capture_ms,
            upload_ms: timings.upload_ms,
            total_ms: timings.total_ms,
            image_bytes: timings.image_bytes,
            result,
        })
        .await;
}
