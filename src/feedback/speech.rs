use std::process::{Child, Command, Stdio};

use log::warn;

use crate::settings::SpeechSettings;

/// Child-process TTS with a single utterance slot. An interrupting speak
/// kills whatever is still playing; a non-interrupting one is dropped if
/// the slot is busy — there is no queue to fall behind real time.
pub(crate) struct CommandSpeech {
    settings: SpeechSettings,
    child: Option<Child>,
}

impl CommandSpeech {
    pub(crate) fn new(settings: SpeechSettings) -> Self {
        Self {
            settings,
            child: None,
        }
    }

    pub(crate) fn speak(&mut self, text: &str, interrupt: bool) {
        if !self.settings.enabled || text.trim().is_empty() {
            return;
        }

        self.reap();
        if self.child.is_some() {
            if !interrupt {
                return;
            }
            self.stop();
        }

        match Command::new(&self.settings.program)
            .args(&self.settings.args)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => self.child = Some(child),
            Err(err) => warn!(
                "speech command '{}' failed to start: {}",
                self.settings.program, err
            ),
        }
    }

    pub(crate) fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Clear the slot if the last utterance already finished.
    fn reap(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if matches!(child.try_wait(), Ok(Some(_))) {
                self.child = None;
            }
        }
    }
}

impl Drop for CommandSpeech {
    fn drop(&mut self) {
        self.stop();
    }
}
