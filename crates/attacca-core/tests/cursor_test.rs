use attacca_core::ScoreCursor;
use attacca_domain_midi::{ChannelEvent, MidiEventKind};

fn note_on(tick: i64, note: u8) -> ChannelEvent {
    ChannelEvent {
        tick,
        channel: 0,
        kind: MidiEventKind::NoteOn {
            note,
            velocity: 100,
        },
    }
}

#[test]
fn windows_partition_the_event_list() {
    let mut cursor = ScoreCursor::new(vec![
        note_on(0, 60),
        note_on(100, 62),
        note_on(200, 64),
        note_on(300, 65),
    ]);

    assert_eq!(cursor.take_window(100).len(), 2);
    assert_eq!(cursor.take_window(100).len(), 0);
    assert_eq!(cursor.take_window(250).len(), 1);
    assert_eq!(cursor.take_window(1000).len(), 1);
    assert!(cursor.exhausted());
}

#[test]
fn seek_repositions_without_losing_events() {
    let mut cursor = ScoreCursor::new(vec![note_on(0, 60), note_on(100, 62), note_on(200, 64)]);

    cursor.take_window(1000);
    assert!(cursor.exhausted());

    cursor.seek(100);
    let window = cursor.take_window(1000);
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].tick, 100);
}

#[test]
fn seek_past_end_leaves_cursor_exhausted() {
    let mut cursor = ScoreCursor::new(vec![note_on(0, 60)]);
    cursor.seek(500);
    assert!(cursor.exhausted());
    assert_eq!(cursor.take_window(1000).len(), 0);
}

#[test]
fn unsorted_input_is_sorted_on_construction() {
    let mut cursor = ScoreCursor::new(vec![note_on(200, 64), note_on(0, 60), note_on(100, 62)]);
    let window = cursor.take_window(100);
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].tick, 0);
    assert_eq!(window[1].tick, 100);
}

#[test]
fn empty_cursor_is_exhausted() {
    let mut cursor = ScoreCursor::empty();
    assert!(cursor.is_empty());
    assert!(cursor.exhausted());
    assert_eq!(cursor.take_window(1000).len(), 0);
}
