use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the detection server, no trailing slash.
    pub base_url: String,
    pub health_timeout_secs: u64,
    pub upload_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            health_timeout_secs: 4,
            upload_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub interval_ms: u64,
    pub cycle_timeout_secs: u64,
    /// Frames whose long edge exceeds this are downscaled before upload.
    pub max_upload_dim: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            cycle_timeout_secs: 20,
            max_upload_dim: 1280,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub enabled: bool,
    /// TTS command; the utterance is appended as the final argument.
    pub program: String,
    pub args: Vec<String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "espeak-ng".into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CaptureSettings {
    /// Camera capture command; the output frame path is appended as the
    /// final argument. Takes precedence over `spool_dir`.
    pub program: Option<String>,
    pub args: Vec<String>,
    /// Directory to drain frames from when no capture command is set.
    pub spool_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
struct UserSettings {
    api: ApiSettings,
    scan: ScanSettings,
    speech: SpeechSettings,
    capture: CaptureSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        let store = Self {
            path,
            data: RwLock::new(data),
        };

        // Seed a defaults file on first run so there is something to edit.
        if !store.path.exists() {
            let guard = store.data.read().unwrap();
            store.persist(&guard)?;
        }

        Ok(store)
    }

    pub fn api(&self) -> ApiSettings {
        self.data.read().unwrap().api.clone()
    }

    pub fn scan(&self) -> ScanSettings {
        self.data.read().unwrap().scan.clone()
    }

    pub fn speech(&self) -> SpeechSettings {
        self.data.read().unwrap().speech.clone()
    }

    pub fn capture(&self) -> CaptureSettings {
        self.data.read().unwrap().capture.clone()
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
