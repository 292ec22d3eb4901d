//! Voice feedback capability.

use std::sync::Mutex;

/// Host-supplied text-to-speech capability.
///
/// `announce` is fire-and-forget: the engine never waits on playback.
/// Implementations must replace any in-flight utterance rather than queue,
/// so spoken feedback never lags the session by more than one utterance.
pub trait Announcer: Send + Sync {
    fn announce(&self, text: &str);
}

/// Discards every announcement
#[derive(Debug, Default)]
pub struct NullAnnouncer;

impl Announcer for NullAnnouncer {
    fn announce(&self, _text: &str) {}
}

/// Test double recording everything it is asked to speak
#[derive(Debug, Default)]
pub struct RecordingAnnouncer {
    spoken: Mutex<Vec<String>>,
}

impl RecordingAnnouncer {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().expect("announcer lock").clone()
    }
}

impl Announcer for RecordingAnnouncer {
    fn announce(&self, text: &str) {
        self.spoken
            .lock()
            .expect("announcer lock")
            .push(text.to_string());
    }
}
