use std::path::Path;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(String),
    #[error("no track loaded")]
    NoTrackLoaded,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Observers are invoked synchronously on the thread that detects the event.
pub type TransportObserver = Arc<dyn Fn() + Send + Sync + 'static>;

/// Uniform playback transport over one backend.
///
/// Positions are backend-native `i64` units: MIDI ticks for the synthesis
/// adapter, milliseconds for the media adapter. A single control thread
/// issues all calls; implementations use interior mutability for their
/// locally tracked state.
pub trait MidiTransport: Send + Sync {
    /// Load a track. `Ok(false)` means the backend recognized the file as
    /// invalid for this backend; `Err` means an infrastructure failure.
    fn load(&self, path: &Path) -> Result<bool, TransportError>;

    /// Start or resume from the current position. No-op when already playing.
    fn play(&self) -> Result<(), TransportError>;

    /// Suspend playback, capturing the position so `play` resumes there.
    fn pause(&self) -> Result<(), TransportError>;

    /// Halt playback and reset the resumable position to the start.
    fn stop(&self) -> Result<(), TransportError>;

    /// Move to an absolute position. Out-of-range requests are silently
    /// ignored: no error, no state change.
    fn seek(&self, position: i64) -> Result<(), TransportError>;

    /// Current playback position.
    fn tell(&self) -> Result<i64, TransportError>;

    /// Total duration of the loaded track.
    fn length(&self) -> Result<i64, TransportError>;

    fn is_playing(&self) -> bool;
    fn is_paused(&self) -> bool;

    /// Drive backend notifications. Called periodically from the control
    /// thread; lifecycle observers fire synchronously inside this call (or
    /// inside `load` for backends that report load completion inline).
    fn poll(&self) -> Result<(), TransportError>;

    fn on_after_load(&self, observer: TransportObserver);
    fn on_after_stop(&self, observer: TransportObserver);
}
