//! Audio capability interfaces.
//!
//! Audio is best-effort: frames are opaque byte blobs that travel as
//! [`Packet::AudioFrame`](edgeshare_core::Packet::AudioFrame). Capture and
//! playback backends live outside this crate; the node ships a
//! [`NullAudio`] backend and a recording playback for tests.

use std::sync::{mpsc, Mutex};

use thiserror::Error;
use tracing::trace;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio backend unavailable: {0}")]
    Unavailable(String),
    #[error("audio device error: {0}")]
    Device(String),
}

/// Produces encoded audio frames for the peer.
pub trait AudioCapture: Send + Sync {
    fn start(&self) -> Result<mpsc::Receiver<Vec<u8>>, AudioError>;
    fn stop(&self);
}

/// Plays frames received from the peer.
pub trait AudioPlayback: Send + Sync {
    fn play(&self, frame: &[u8]) -> Result<(), AudioError>;
}

/// Backend used when no audio device integration is present.
///
/// Capture refuses to start; playback discards frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioCapture for NullAudio {
    fn start(&self) -> Result<mpsc::Receiver<Vec<u8>>, AudioError> {
        Err(AudioError::Unavailable("no audio capture backend".into()))
    }

    fn stop(&self) {}
}

impl AudioPlayback for NullAudio {
    fn play(&self, frame: &[u8]) -> Result<(), AudioError> {
        trace!(len = frame.len(), "discarding audio frame");
        Ok(())
    }
}

/// Playback that records every frame, for tests.
#[derive(Debug, Default)]
pub struct RecordingAudioPlayback {
    pub frames: Mutex<Vec<Vec<u8>>>,
}

impl AudioPlayback for RecordingAudioPlayback {
    fn play(&self, frame: &[u8]) -> Result<(), AudioError> {
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(frame.to_vec());
        Ok(())
    }
}
