use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{PlaybackStatus, Tick};

#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    #[error("io error: {0}")]
    Io(String),
    #[error("soundfont load failed: {0}")]
    SoundFontLoad(String),
    #[error("renderer error: {0}")]
    Renderer(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Reverb room parameters, applied globally to the synthesizer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReverbParams {
    pub room_size: f32,
    pub damping: f32,
    pub width: f32,
    pub level: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChorusWaveform {
    Sine,
    Triangle,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChorusParams {
    pub voice_count: u32,
    pub level: f32,
    pub speed_hz: f32,
    pub depth_ms: f32,
    pub waveform: ChorusWaveform,
}

/// Binding surface of the synthesis engine.
///
/// Positions are MIDI ticks. `play`/`stop`/`seek` operate on the engine's
/// own clock; `seek` is asynchronous while playing (the render thread
/// applies it), `seek_wait` blocks until the position lands near the
/// target or a bounded wait expires.
pub trait SynthPlayerPort: Send + Sync {
    /// Return the engine to its just-constructed state: no track, no
    /// pending seek, position zero, status `Ready`.
    fn reset(&self) -> Result<(), SynthError>;

    /// Parse a MIDI file and install it as the current track. A file the
    /// engine cannot parse leaves the player with status `Finished`; an
    /// unreadable file is an `Io` error.
    fn add(&self, path: &Path) -> Result<(), SynthError>;

    /// Begin rendering from `offset_ticks`.
    fn play(&self, offset_ticks: Tick) -> Result<(), SynthError>;

    /// Halt rendering and report the tick reached.
    fn stop(&self) -> Result<Tick, SynthError>;

    /// Request a reposition; returns the tick actually reached so far
    /// (the request may still be pending on the render thread).
    fn seek(&self, ticks: Tick) -> Result<Tick, SynthError>;

    /// `seek` plus a bounded poll until the position is within tolerance
    /// of the target.
    fn seek_wait(&self, ticks: Tick) -> Result<Tick, SynthError>;

    /// Current position in ticks.
    fn ticks(&self) -> Tick;

    fn status(&self) -> PlaybackStatus;

    fn duration_ticks(&self) -> Tick;

    /// Block until the engine reaches `Finished`.
    fn join(&self);

    fn all_notes_off(&self);

    /// Forwarded verbatim to the engine's master gain.
    fn set_gain(&self, gain: f32);

    /// Swap the SoundFont, preserving master gain. On failure the
    /// previous font stays active.
    fn set_soundfont(&self, path: &Path) -> Result<(), SynthError>;

    fn set_reverb(&self, params: ReverbParams);
    fn set_chorus(&self, params: ChorusParams);

    /// MIDI-scale (0..=127) reverb send on all channels.
    fn set_reverb_level(&self, level: u8);
    /// MIDI-scale (0..=127) chorus send on all channels.
    fn set_chorus_level(&self, level: u8);

    /// Arm offline rendering: the next `render_loop` writes to
    /// `file_name` instead of the live output.
    fn set_render_mode(&self, file_name: &Path, quality: f64) -> Result<(), SynthError>;

    /// Render the armed track to file, invoking `progress` with the
    /// cumulative frame count after each block. Returns total frames.
    fn render_loop(&self, progress: Option<&mut dyn FnMut(u64)>) -> Result<u64, SynthError>;
}
