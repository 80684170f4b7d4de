use std::path::Path;

use crate::types::{MediaNotification, MediaState, Millis};

#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    #[error("io error: {0}")]
    Io(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Surface of a media-playback backend. Positions are milliseconds.
///
/// Notifications accumulate inside the backend and are handed over in
/// arrival order by `take_notifications`; the same underlying stop may
/// surface as both `Stopped` and `Finished`.
pub trait MediaControlPort: Send + Sync {
    /// Load a file. `Ok(false)` means the backend could not decode it.
    fn load(&self, path: &Path) -> Result<bool, MediaError>;

    /// Release the loaded track and its file handle.
    fn unload(&self);

    fn play(&self) -> Result<(), MediaError>;
    fn pause(&self);
    fn stop(&self);

    fn seek(&self, position: Millis) -> Result<(), MediaError>;
    fn tell(&self) -> Millis;
    fn length(&self) -> Millis;

    fn set_volume(&self, volume: f32);

    fn playback_rate(&self) -> f32;
    fn set_playback_rate(&self, rate: f32);

    fn state(&self) -> MediaState;

    /// Drain pending notifications, oldest first.
    fn take_notifications(&self) -> Vec<MediaNotification>;
}
