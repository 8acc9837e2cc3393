use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::detect::Announcement;

/// State for one scanning session, owned exclusively by the scheduler.
///
/// `last_spoken_key` is the dedup fingerprint: it resets to `None` on every
/// arm/disarm transition so a restarted session always speaks its first
/// result, and only [`admit`](Self::admit) ever writes it.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
    auto_detecting: bool,
    in_flight: bool,
    last_spoken_key: Option<String>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            auto_detecting: false,
            in_flight: false,
            last_spoken_key: None,
        }
    }

    pub fn arm(&mut self) {
        self.auto_detecting = true;
        self.last_spoken_key = None;
    }

    pub fn disarm(&mut self) {
        self.auto_detecting = false;
        self.last_spoken_key = None;
    }

    pub fn is_auto_detecting(&self) -> bool {
        self.auto_detecting
    }

    /// Claim the single capture slot; `false` means a cycle is already in
    /// flight and this tick must be dropped.
    pub fn begin_cycle(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn end_cycle(&mut self) {
        self.in_flight = false;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Announcement gate: admit iff the key differs from the last spoken
    /// one, so the user hears changes immediately but never the same label
    /// twice in a row.
    pub fn admit(&mut self, announcement: &Announcement) -> bool {
        if self.last_spoken_key.as_deref() == Some(announcement.key.as_str()) {
            return false;
        }
        self.last_spoken_key = Some(announcement.key.clone());
        true
    }

    pub fn last_spoken_key(&self) -> Option<&str> {
        self.last_spoken_key.as_deref()
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}
