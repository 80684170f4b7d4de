use attacca_core::{LoopAction, LoopState, MediaLoopMachine};
use attacca_ports::types::MediaNotification;

fn playing_machine(looping: bool) -> MediaLoopMachine {
    let mut machine = MediaLoopMachine::new();
    machine.set_looping(looping);
    machine.on_play();
    machine
}

#[test]
fn stopped_then_finished_restarts_exactly_once() {
    let mut machine = playing_machine(true);

    let action = machine.on_notification(MediaNotification::Stopped);
    assert_eq!(action, Some(LoopAction::Restart));
    machine.confirm_restart();

    let action = machine.on_notification(MediaNotification::Finished);
    assert_eq!(action, None);
    assert_eq!(machine.state(), LoopState::Playing);
}

#[test]
fn lone_finished_restarts() {
    let mut machine = playing_machine(true);

    let action = machine.on_notification(MediaNotification::Finished);
    assert_eq!(action, Some(LoopAction::Restart));
}

#[test]
fn doubled_finished_restarts_exactly_once() {
    let mut machine = playing_machine(true);

    assert_eq!(
        machine.on_notification(MediaNotification::Finished),
        Some(LoopAction::Restart)
    );
    machine.confirm_restart();
    assert_eq!(machine.on_notification(MediaNotification::Finished), None);
}

#[test]
fn second_track_end_restarts_again() {
    let mut machine = playing_machine(true);

    assert_eq!(
        machine.on_notification(MediaNotification::Stopped),
        Some(LoopAction::Restart)
    );
    machine.confirm_restart();
    assert_eq!(machine.on_notification(MediaNotification::Finished), None);

    // The restarted playback reaches its own end later.
    assert_eq!(
        machine.on_notification(MediaNotification::Stopped),
        Some(LoopAction::Restart)
    );
    machine.confirm_restart();
    assert_eq!(machine.on_notification(MediaNotification::Finished), None);
}

#[test]
fn not_looping_fires_after_stop_once() {
    let mut machine = playing_machine(false);

    assert_eq!(
        machine.on_notification(MediaNotification::Stopped),
        Some(LoopAction::FireAfterStop)
    );
    assert_eq!(machine.on_notification(MediaNotification::Finished), None);
    assert_eq!(machine.state(), LoopState::Stopped);
}

#[test]
fn explicit_stop_suppresses_restart() {
    let mut machine = playing_machine(true);
    machine.on_stop();

    assert_eq!(machine.on_notification(MediaNotification::Stopped), None);
    assert_eq!(machine.on_notification(MediaNotification::Finished), None);
    assert_eq!(machine.state(), LoopState::Stopped);
}

#[test]
fn loaded_fires_after_load() {
    let mut machine = MediaLoopMachine::new();
    assert_eq!(
        machine.on_notification(MediaNotification::Loaded),
        Some(LoopAction::FireAfterLoad)
    );
}

#[test]
fn pause_blocks_end_handling() {
    let mut machine = playing_machine(true);
    machine.on_pause();

    assert_eq!(machine.on_notification(MediaNotification::Stopped), None);
    assert_eq!(machine.state(), LoopState::Paused);
}
