use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleResult {
    Announced,
    Deduplicated,
    NoDetection,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleMetrics {
    pub timestamp: DateTime<Utc>,
    pub capture_ms: u64,
    pub upload_ms: u64,
    pub total_ms: u64,
    pub image_bytes: usize,
    pub result: CycleResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub recent_cycles: Vec<CycleMetrics>,
    pub cycle_count: u64,
    pub announced_count: u64,
    pub no_detection_count: u64,
    pub failure_count: u64,
}
