use serde::{Deserialize, Serialize};

use crate::types::{DeviceId, Volume01};

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

/// Persisted application settings. Every field defaults so older files
/// keep loading after new fields appear.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub master_gain: Volume01,
    pub reverb_preset: Option<String>,
    pub loop_playback: bool,
    pub default_sf2_path: Option<String>,
    pub selected_audio_out: Option<DeviceId>,
    pub audio_buffer_size_frames: Option<u32>,
    pub render_quality: f64,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            master_gain: Volume01::new(0.7),
            reverb_preset: None,
            loop_playback: false,
            default_sf2_path: None,
            selected_audio_out: None,
            audio_buffer_size_frames: None,
            render_quality: 0.5,
        }
    }
}

pub trait StoragePort: Send + Sync {
    /// Missing settings file yields defaults, not an error.
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, settings: &SettingsDto) -> Result<(), StorageError>;
}
