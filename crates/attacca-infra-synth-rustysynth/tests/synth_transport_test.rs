use attacca_infra_synth_rustysynth::SynthTransport;
use attacca_ports::synth::{ChorusParams, ReverbParams, SynthError, SynthPlayerPort};
use attacca_ports::transport::MidiTransport;
use attacca_ports::types::{PlaybackStatus, Tick};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct FakeState {
    status: Option<PlaybackStatus>,
    tick: Tick,
    duration: Tick,
    parse_fails: bool,
    play_offsets: Vec<Tick>,
    seeks: Vec<Tick>,
    gains: Vec<f32>,
    render_calls: Vec<(PathBuf, f64)>,
    render_loop_runs: usize,
}

#[derive(Clone, Default)]
struct FakePlayer {
    state: Arc<Mutex<FakeState>>,
}

impl FakePlayer {
    fn with_duration(duration: Tick) -> Self {
        let player = Self::default();
        player.state.lock().duration = duration;
        player
    }

    fn finish(&self) {
        self.state.lock().status = Some(PlaybackStatus::Finished);
    }
}

impl SynthPlayerPort for FakePlayer {
    fn reset(&self) -> Result<(), SynthError> {
        let mut state = self.state.lock();
        state.status = Some(PlaybackStatus::Ready);
        state.tick = 0;
        Ok(())
    }

    fn add(&self, _path: &Path) -> Result<(), SynthError> {
        let mut state = self.state.lock();
        state.status = Some(if state.parse_fails {
            PlaybackStatus::Finished
        } else {
            PlaybackStatus::Ready
        });
        Ok(())
    }

    fn play(&self, offset_ticks: Tick) -> Result<(), SynthError> {
        let mut state = self.state.lock();
        state.play_offsets.push(offset_ticks);
        state.tick = offset_ticks;
        state.status = Some(PlaybackStatus::Playing);
        Ok(())
    }

    fn stop(&self) -> Result<Tick, SynthError> {
        let mut state = self.state.lock();
        state.status = Some(PlaybackStatus::Ready);
        Ok(state.tick)
    }

    fn seek(&self, ticks: Tick) -> Result<Tick, SynthError> {
        self.seek_wait(ticks)
    }

    fn seek_wait(&self, ticks: Tick) -> Result<Tick, SynthError> {
        let mut state = self.state.lock();
        state.seeks.push(ticks);
        state.tick = ticks;
        Ok(ticks)
    }

    fn ticks(&self) -> Tick {
        self.state.lock().tick
    }

    fn status(&self) -> PlaybackStatus {
        self.state.lock().status.unwrap_or(PlaybackStatus::Ready)
    }

    fn duration_ticks(&self) -> Tick {
        self.state.lock().duration
    }

    fn join(&self) {}

    fn all_notes_off(&self) {}

    fn set_gain(&self, gain: f32) {
        self.state.lock().gains.push(gain);
    }

    fn set_soundfont(&self, _path: &Path) -> Result<(), SynthError> {
        Ok(())
    }

    fn set_reverb(&self, _params: ReverbParams) {}
    fn set_chorus(&self, _params: ChorusParams) {}
    fn set_reverb_level(&self, _level: u8) {}
    fn set_chorus_level(&self, _level: u8) {}

    fn set_render_mode(&self, file_name: &Path, quality: f64) -> Result<(), SynthError> {
        self.state
            .lock()
            .render_calls
            .push((file_name.to_path_buf(), quality));
        Ok(())
    }

    fn render_loop(&self, _progress: Option<&mut dyn FnMut(u64)>) -> Result<u64, SynthError> {
        self.state.lock().render_loop_runs += 1;
        Ok(88_200)
    }
}

fn loaded_transport(duration: Tick) -> (SynthTransport, FakePlayer) {
    let player = FakePlayer::with_duration(duration);
    let transport = SynthTransport::new(Box::new(player.clone()));
    assert!(transport.load(Path::new("song.mid")).expect("load"));
    (transport, player)
}

#[test]
fn load_reports_invalid_file_as_false() {
    let player = FakePlayer::default();
    player.state.lock().parse_fails = true;
    let transport = SynthTransport::new(Box::new(player));

    assert!(!transport.load(Path::new("bad.mid")).expect("load"));
    assert!(transport.play().is_err());
}

#[test]
fn play_after_seek_and_pause_resumes_at_seek_target() {
    let (transport, player) = loaded_transport(10_000);

    transport.play().expect("play");
    transport.seek(5_000).expect("seek");
    transport.pause().expect("pause");
    assert!(transport.is_paused());

    transport.play().expect("play");
    let offsets = player.state.lock().play_offsets.clone();
    assert_eq!(offsets, vec![0, 5_000]);
}

#[test]
fn stop_resets_resume_position() {
    let (transport, player) = loaded_transport(10_000);

    transport.play().expect("play");
    transport.seek(5_000).expect("seek");
    transport.stop().expect("stop");
    assert!(!transport.is_paused());

    transport.play().expect("play");
    let offsets = player.state.lock().play_offsets.clone();
    assert_eq!(*offsets.last().expect("offset"), 0);
}

#[test]
fn out_of_range_seek_is_ignored() {
    let (transport, player) = loaded_transport(10_000);

    transport.seek(20_000).expect("seek");
    transport.seek(-1).expect("seek");
    assert!(player.state.lock().seeks.is_empty());
    assert!(!transport.is_paused());
}

#[test]
fn play_while_playing_is_a_no_op() {
    let (transport, player) = loaded_transport(10_000);

    transport.play().expect("play");
    transport.play().expect("play");
    assert_eq!(player.state.lock().play_offsets.len(), 1);
}

#[test]
fn gain_is_forwarded_verbatim() {
    let (transport, player) = loaded_transport(10_000);

    transport.set_gain(0.7);
    transport.set_gain(1.5);
    assert_eq!(player.state.lock().gains.clone(), vec![0.7, 1.5]);
}

#[test]
fn pause_at_tick_zero_is_indistinguishable_from_stopped() {
    let (transport, _player) = loaded_transport(10_000);

    transport.play().expect("play");
    transport.pause().expect("pause");
    assert!(!transport.is_paused());
}

#[test]
fn after_load_fires_per_successful_load() {
    let player = FakePlayer::with_duration(1_000);
    let transport = SynthTransport::new(Box::new(player));
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    transport.on_after_load(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    transport.load(Path::new("a.mid")).expect("load");
    transport.load(Path::new("b.mid")).expect("load");
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[test]
fn natural_finish_fires_after_stop_once() {
    let (transport, player) = loaded_transport(10_000);
    let stops = Arc::new(AtomicUsize::new(0));
    let counter = stops.clone();
    transport.on_after_stop(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    transport.play().expect("play");
    player.finish();
    transport.poll().expect("poll");
    transport.poll().expect("poll");
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[test]
fn explicit_stop_does_not_fire_after_stop() {
    let (transport, _player) = loaded_transport(10_000);
    let stops = Arc::new(AtomicUsize::new(0));
    let counter = stops.clone();
    transport.on_after_stop(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    transport.play().expect("play");
    transport.stop().expect("stop");
    transport.poll().expect("poll");
    assert_eq!(stops.load(Ordering::SeqCst), 0);
}

#[test]
fn render_arms_then_plays_from_start() {
    let (transport, player) = loaded_transport(10_000);

    let frames = transport
        .render_to_file(Path::new("out.wav"), 0.5, None)
        .expect("render");
    assert_eq!(frames, 88_200);

    let state = player.state.lock();
    assert_eq!(state.render_calls.len(), 1);
    assert_eq!(state.render_calls[0].1, 0.5);
    assert_eq!(*state.play_offsets.last().expect("offset"), 0);
    assert_eq!(state.render_loop_runs, 1);
}

#[test]
fn operations_without_a_track_report_no_track_loaded() {
    let transport = SynthTransport::new(Box::new(FakePlayer::default()));
    assert!(transport.play().is_err());
    assert!(transport.tell().is_err());
    assert!(transport.length().is_err());
    assert!(transport.seek(0).is_err());
}
