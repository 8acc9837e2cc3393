use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use super::client::ApiClient;

/// Reachability of the detection server.
///
/// State moves only through explicit [`refresh`](Self::refresh) calls —
/// on mode entry or user request — never from upload outcomes, and there
/// is no background re-probing: a disconnected monitor stays disconnected
/// until someone asks again.
pub struct ConnectivityMonitor {
    client: ApiClient,
    connected: AtomicBool,
    checking: AtomicBool,
}

impl ConnectivityMonitor {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            connected: AtomicBool::new(false),
            checking: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_checking(&self) -> bool {
        self.checking.load(Ordering::SeqCst)
    }

    /// Run one health check and record the result. A refresh that lands
    /// while another is in flight is suppressed and reports the last known
    /// state instead of stacking requests.
    pub async fn refresh(&self) -> bool {
        if self.checking.swap(true, Ordering::SeqCst) {
            return self.is_connected();
        }

        let ok = self.client.check_health().await;
        self.connected.store(ok, Ordering::SeqCst);
        self.checking.store(false, Ordering::SeqCst);

        info!(
            "health check against {}: {}",
            self.client.base_url(),
            if ok { "connected" } else { "disconnected" }
        );
        ok
    }
}
