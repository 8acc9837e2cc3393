//! Speech and haptic dispatch for a user who cannot read the screen.
//!
//! All output runs on one dedicated feedback thread (the audio objects are
//! not `Send`), fed through a command channel. Speech is a single slot —
//! a new announcement replaces the current utterance rather than queueing
//! behind it.

mod haptics;
mod speech;

pub use haptics::HapticKind;

use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use log::warn;
use rodio::{OutputStream, Sink};

use crate::settings::SpeechSettings;

use haptics::HapticPulse;
use speech::CommandSpeech;

/// Seam between the scan loop and the real speaker/pulse hardware, so
/// tests can record what the user would have heard.
pub trait Feedback: Send + Sync {
    fn speak(&self, text: &str, interrupt: bool);
    fn haptic(&self, kind: HapticKind);
    fn stop_speech(&self);
}

enum FeedbackCommand {
    Speak { text: String, interrupt: bool },
    StopSpeech,
    Haptic(HapticKind),
}

#[derive(Clone)]
pub struct FeedbackHandle {
    tx: Arc<Mutex<Option<Sender<FeedbackCommand>>>>,
    speech: SpeechSettings,
}

impl FeedbackHandle {
    pub fn new(speech: SpeechSettings) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            speech,
        }
    }

    fn ensure_thread(&self) -> Result<Sender<FeedbackCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<FeedbackCommand>();
        let speech_settings = self.speech.clone();

        // Dedicated thread holding the non-Send speaker and audio sink
        thread::Builder::new()
            .name("feedback".to_string())
            .spawn(move || {
                let mut speaker = CommandSpeech::new(speech_settings);
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        FeedbackCommand::Speak { text, interrupt } => {
                            speaker.speak(&text, interrupt);
                        }
                        FeedbackCommand::StopSpeech => {
                            speaker.stop();
                        }
                        FeedbackCommand::Haptic(kind) => {
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                warn!("haptic pulse skipped: {}", err);
                                continue;
                            }
                            if let Some(ref s) = sink {
                                for spec in kind.pattern() {
                                    s.append(HapticPulse::new(spec));
                                }
                            }
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    fn send(&self, cmd: FeedbackCommand) {
        match self.ensure_thread() {
            Ok(tx) => {
                let _ = tx.send(cmd);
            }
            Err(err) => warn!("feedback unavailable: {}", err),
        }
    }
}

impl Feedback for FeedbackHandle {
    fn speak(&self, text: &str, interrupt: bool) {
        self.send(FeedbackCommand::Speak {
            text: text.to_string(),
            interrupt,
        });
    }

    fn haptic(&self, kind: HapticKind) {
        self.send(FeedbackCommand::Haptic(kind));
    }

    fn stop_speech(&self) {
        self.send(FeedbackCommand::StopSpeech);
    }
}
