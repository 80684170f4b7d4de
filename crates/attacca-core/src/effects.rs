use attacca_ports::synth::{ChorusParams, ChorusWaveform, ReverbParams};
use serde::{Deserialize, Serialize};

/// Fixed reverb presets, smallest room to largest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReverbPreset {
    Model1,
    Model2,
    Model3,
    Model4,
    Model5,
}

impl ReverbPreset {
    pub const ALL: [ReverbPreset; 5] = [
        ReverbPreset::Model1,
        ReverbPreset::Model2,
        ReverbPreset::Model3,
        ReverbPreset::Model4,
        ReverbPreset::Model5,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Model 1" => Some(ReverbPreset::Model1),
            "Model 2" => Some(ReverbPreset::Model2),
            "Model 3" => Some(ReverbPreset::Model3),
            "Model 4" => Some(ReverbPreset::Model4),
            "Model 5" => Some(ReverbPreset::Model5),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ReverbPreset::Model1 => "Model 1",
            ReverbPreset::Model2 => "Model 2",
            ReverbPreset::Model3 => "Model 3",
            ReverbPreset::Model4 => "Model 4",
            ReverbPreset::Model5 => "Model 5",
        }
    }

    pub fn params(self) -> ReverbParams {
        let (room_size, damping, width, level) = match self {
            ReverbPreset::Model1 => (0.2, 0.0, 0.5, 0.9),
            ReverbPreset::Model2 => (0.4, 0.2, 0.5, 0.8),
            ReverbPreset::Model3 => (0.6, 0.4, 0.5, 0.7),
            ReverbPreset::Model4 => (0.8, 0.7, 0.5, 0.6),
            ReverbPreset::Model5 => (0.8, 0.0, 0.5, 0.5),
        };
        ReverbParams {
            room_size,
            damping,
            width,
            level,
        }
    }
}

pub fn default_chorus() -> ChorusParams {
    ChorusParams {
        voice_count: 3,
        level: 2.0,
        speed_hz: 0.3,
        depth_ms: 8.0,
        waveform: ChorusWaveform::Sine,
    }
}
