use crate::model::{ChannelEvent, MidiAnalysis, MidiEventKind, ScoreTiming, TempoPoint};
use attacca_ports::types::Tick;
use midly::{Fps, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum MidiAnalysisError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
}

pub fn analyze_midi_path(path: &Path) -> Result<MidiAnalysis, MidiAnalysisError> {
    let data = std::fs::read(path).map_err(|e| MidiAnalysisError::Io(e.to_string()))?;
    analyze_midi_bytes(&data)
}

pub fn analyze_midi_bytes(data: &[u8]) -> Result<MidiAnalysis, MidiAnalysisError> {
    let smf = Smf::parse(data).map_err(|e| MidiAnalysisError::Parse(e.to_string()))?;
    let (ppq, tempo_override) = match smf.header.timing {
        Timing::Metrical(ticks) => (ticks.as_int(), None),
        Timing::Timecode(fps, ticks_per_frame) => {
            let (ppq, us_per_quarter) = timecode_ppq_and_tempo(fps, ticks_per_frame);
            (ppq, Some(us_per_quarter))
        }
    };

    let mut tempo_points: BTreeMap<Tick, u32> = BTreeMap::new();
    let mut events: Vec<ChannelEvent> = Vec::new();
    let mut duration_ticks: Tick = 0;

    for track in &smf.tracks {
        let mut tick: Tick = 0;
        for event in track {
            tick += event.delta.as_int() as Tick;
            duration_ticks = duration_ticks.max(tick);
            match &event.kind {
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    let kind = match message {
                        MidiMessage::NoteOn { key, vel } => {
                            let note = key.as_int();
                            let velocity = vel.as_int();
                            if velocity == 0 {
                                Some(MidiEventKind::NoteOff { note })
                            } else {
                                Some(MidiEventKind::NoteOn { note, velocity })
                            }
                        }
                        MidiMessage::NoteOff { key, .. } => {
                            Some(MidiEventKind::NoteOff { note: key.as_int() })
                        }
                        MidiMessage::Controller { controller, value } => {
                            Some(MidiEventKind::Controller {
                                controller: controller.as_int(),
                                value: value.as_int(),
                            })
                        }
                        MidiMessage::ProgramChange { program } => {
                            Some(MidiEventKind::ProgramChange {
                                program: program.as_int(),
                            })
                        }
                        MidiMessage::PitchBend { bend } => Some(MidiEventKind::PitchBend {
                            value: bend.0.as_int(),
                        }),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        events.push(ChannelEvent {
                            tick,
                            channel,
                            kind,
                        });
                    }
                }
                TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                    tempo_points.insert(tick, us_per_quarter.as_int());
                }
                _ => {}
            }
        }
    }

    events.sort_by(|a, b| {
        a.tick
            .cmp(&b.tick)
            .then_with(|| event_rank(&a.kind).cmp(&event_rank(&b.kind)))
    });

    Ok(MidiAnalysis {
        timing: ScoreTiming {
            ppq,
            tempo_points: build_tempo_points(tempo_points, tempo_override),
            duration_ticks,
        },
        events,
    })
}

/// Setup messages sort before note-offs, note-offs before note-ons, so a
/// retriggered note at the same tick releases before it restrikes.
fn event_rank(kind: &MidiEventKind) -> u8 {
    match kind {
        MidiEventKind::ProgramChange { .. } => 0,
        MidiEventKind::Controller { .. } => 1,
        MidiEventKind::PitchBend { .. } => 2,
        MidiEventKind::NoteOff { .. } => 3,
        MidiEventKind::NoteOn { .. } => 4,
    }
}

fn build_tempo_points(
    tempo_points: BTreeMap<Tick, u32>,
    override_us_per_quarter: Option<u32>,
) -> Vec<TempoPoint> {
    if let Some(us_per_quarter) = override_us_per_quarter {
        return vec![TempoPoint {
            tick: 0,
            us_per_quarter,
        }];
    }

    let mut points: Vec<TempoPoint> = tempo_points
        .into_iter()
        .map(|(tick, us_per_quarter)| TempoPoint {
            tick,
            us_per_quarter,
        })
        .collect();

    if points.is_empty() || points[0].tick != 0 {
        points.insert(
            0,
            TempoPoint {
                tick: 0,
                us_per_quarter: 500_000,
            },
        );
    }

    points
}

fn timecode_ppq_and_tempo(fps: Fps, ticks_per_frame: u8) -> (u16, u32) {
    let ticks_per_frame = ticks_per_frame.max(1) as u16;
    match fps {
        Fps::Fps24 => (24 * ticks_per_frame, 1_000_000),
        Fps::Fps25 => (25 * ticks_per_frame, 1_000_000),
        Fps::Fps30 => (30 * ticks_per_frame, 1_000_000),
        Fps::Fps29 => (30 * ticks_per_frame, 1_001_000),
    }
}
