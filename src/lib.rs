pub mod api;
pub mod detect;
pub mod feedback;
pub mod frame;
pub mod metrics;
pub mod person;
pub mod scan;
pub mod settings;
mod utils;

pub use api::{ApiClient, ApiError, ConnectivityMonitor, DetectionApi};
pub use detect::{normalize, Announcement, Domain};
pub use feedback::{Feedback, FeedbackHandle, HapticKind};
pub use frame::{CommandFrameSource, DirectoryFrameSource, Frame, FrameSource};
pub use scan::{ScanController, ScanDisplay, ScanSession};
pub use settings::SettingsStore;
