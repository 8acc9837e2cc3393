mod controller;
mod loop_worker;
mod session;

pub use controller::ScanController;
pub use loop_worker::ScanDisplay;
pub use session::ScanSession;
