mod client;
mod connectivity;
pub mod types;

pub use client::{ApiClient, ApiError, DetectionApi, HEALTHY_STATUS};
pub use connectivity::ConnectivityMonitor;
