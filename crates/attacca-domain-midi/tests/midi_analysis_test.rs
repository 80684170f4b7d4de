use attacca_domain_midi::{analyze_midi_bytes, MidiEventKind};
use midly::num::{u14, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

fn build_midi(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
    let format = if tracks.len() == 1 {
        Format::SingleTrack
    } else {
        Format::Parallel
    };
    let smf = Smf {
        header: Header {
            format,
            timing: Timing::Metrical(480.into()),
        },
        tracks,
    };
    let mut data = Vec::new();
    smf.write(&mut data).expect("midi write should succeed");
    data
}

fn midi_event(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message,
        },
    }
}

fn end_of_track() -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

#[test]
fn analysis_defaults_tempo_when_file_has_none() {
    let track = vec![
        midi_event(
            0,
            MidiMessage::NoteOn {
                key: u7::new(60),
                vel: u7::new(100),
            },
        ),
        midi_event(
            480,
            MidiMessage::NoteOff {
                key: u7::new(60),
                vel: u7::new(64),
            },
        ),
        end_of_track(),
    ];

    let analysis = analyze_midi_bytes(&build_midi(vec![track])).expect("analysis should succeed");
    assert_eq!(analysis.timing.ppq, 480);
    assert_eq!(analysis.timing.tempo_points.len(), 1);
    assert_eq!(analysis.timing.tempo_points[0].tick, 0);
    assert_eq!(analysis.timing.tempo_points[0].us_per_quarter, 500_000);
    assert_eq!(analysis.timing.duration_ticks, 480);
}

#[test]
fn analysis_collects_tempo_changes_in_tick_order() {
    let track = vec![
        TrackEvent {
            delta: u28::new(960),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(250_000))),
        },
        end_of_track(),
    ];

    let analysis = analyze_midi_bytes(&build_midi(vec![track])).expect("analysis should succeed");
    let points = &analysis.timing.tempo_points;
    assert_eq!(points.len(), 2);
    assert_eq!((points[0].tick, points[0].us_per_quarter), (0, 500_000));
    assert_eq!((points[1].tick, points[1].us_per_quarter), (960, 250_000));
}

#[test]
fn analysis_merges_parallel_tracks_by_absolute_tick() {
    let first = vec![
        midi_event(
            480,
            MidiMessage::NoteOn {
                key: u7::new(60),
                vel: u7::new(100),
            },
        ),
        end_of_track(),
    ];
    let second = vec![
        midi_event(
            0,
            MidiMessage::NoteOn {
                key: u7::new(64),
                vel: u7::new(100),
            },
        ),
        midi_event(
            960,
            MidiMessage::NoteOff {
                key: u7::new(64),
                vel: u7::new(64),
            },
        ),
        end_of_track(),
    ];

    let analysis =
        analyze_midi_bytes(&build_midi(vec![first, second])).expect("analysis should succeed");
    let ticks: Vec<i64> = analysis.events.iter().map(|e| e.tick).collect();
    assert_eq!(ticks, vec![0, 480, 960]);
    assert_eq!(analysis.timing.duration_ticks, 960);
}

#[test]
fn analysis_turns_zero_velocity_noteon_into_noteoff() {
    let track = vec![
        midi_event(
            0,
            MidiMessage::NoteOn {
                key: u7::new(72),
                vel: u7::new(90),
            },
        ),
        midi_event(
            240,
            MidiMessage::NoteOn {
                key: u7::new(72),
                vel: u7::new(0),
            },
        ),
        end_of_track(),
    ];

    let analysis = analyze_midi_bytes(&build_midi(vec![track])).expect("analysis should succeed");
    assert!(matches!(
        analysis.events[1].kind,
        MidiEventKind::NoteOff { note: 72 }
    ));
}

#[test]
fn analysis_orders_setup_before_notes_at_same_tick() {
    let track = vec![
        midi_event(
            0,
            MidiMessage::NoteOn {
                key: u7::new(60),
                vel: u7::new(100),
            },
        ),
        midi_event(0, MidiMessage::ProgramChange { program: u7::new(5) }),
        midi_event(
            0,
            MidiMessage::Controller {
                controller: u7::new(7),
                value: u7::new(100),
            },
        ),
        midi_event(
            0,
            MidiMessage::PitchBend {
                bend: midly::PitchBend(u14::new(8192)),
            },
        ),
        end_of_track(),
    ];

    let analysis = analyze_midi_bytes(&build_midi(vec![track])).expect("analysis should succeed");
    let kinds: Vec<u8> = analysis
        .events
        .iter()
        .map(|e| match e.kind {
            MidiEventKind::ProgramChange { .. } => 0,
            MidiEventKind::Controller { .. } => 1,
            MidiEventKind::PitchBend { .. } => 2,
            MidiEventKind::NoteOff { .. } => 3,
            MidiEventKind::NoteOn { .. } => 4,
        })
        .collect();
    let mut sorted = kinds.clone();
    sorted.sort_unstable();
    assert_eq!(kinds, sorted);
}

#[test]
fn analysis_rejects_garbage_bytes() {
    assert!(analyze_midi_bytes(b"not a midi file").is_err());
}
