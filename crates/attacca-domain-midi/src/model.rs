use attacca_ports::types::Tick;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempoPoint {
    pub tick: Tick,
    pub us_per_quarter: u32,
}

/// Timing skeleton of a parsed track: enough to convert ticks to wall
/// time without keeping the raw file around.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTiming {
    pub ppq: u16,
    pub tempo_points: Vec<TempoPoint>,
    pub duration_ticks: Tick,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiEventKind {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    Controller { controller: u8, value: u8 },
    ProgramChange { program: u8 },
    PitchBend { value: u16 },
}

/// A channel-voice event at an absolute tick, all tracks merged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub tick: Tick,
    pub channel: u8,
    pub kind: MidiEventKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiAnalysis {
    pub timing: ScoreTiming,
    pub events: Vec<ChannelEvent>,
}
