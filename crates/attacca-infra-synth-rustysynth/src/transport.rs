use attacca_core::{ReverbPreset, TransportHooks};
use attacca_ports::synth::{ChorusParams, SynthError, SynthPlayerPort};
use attacca_ports::transport::{MidiTransport, TransportError, TransportObserver};
use attacca_ports::types::{PlaybackStatus, Tick};
use parking_lot::Mutex;
use std::path::Path;
use tracing::info;

struct TransportState {
    duration_in_ticks: Tick,
    /// Resume position in ticks. Zero doubles as "not paused".
    pause_time: Tick,
    was_playing: bool,
    loaded: bool,
}

/// Transport contract over a `SynthPlayerPort`. Positions are ticks.
pub struct SynthTransport {
    player: Box<dyn SynthPlayerPort>,
    state: Mutex<TransportState>,
    hooks: TransportHooks,
}

impl SynthTransport {
    pub fn new(player: Box<dyn SynthPlayerPort>) -> Self {
        Self {
            player,
            state: Mutex::new(TransportState {
                duration_in_ticks: 0,
                pause_time: 0,
                was_playing: false,
                loaded: false,
            }),
            hooks: TransportHooks::new(),
        }
    }

    pub fn set_gain(&self, gain: f32) {
        self.player.set_gain(gain);
    }

    pub fn set_soundfont(&self, path: &Path) -> Result<(), TransportError> {
        self.player.set_soundfont(path).map_err(map_synth_err)?;
        self.state.lock().pause_time = 0;
        Ok(())
    }

    pub fn set_reverb_preset(&self, preset: ReverbPreset) {
        info!(preset = preset.name(), "applying reverb preset");
        self.player.set_reverb(preset.params());
    }

    pub fn set_chorus(&self, params: ChorusParams) {
        self.player.set_chorus(params);
    }

    pub fn set_reverb_level(&self, level: u8) {
        self.player.set_reverb_level(level);
    }

    pub fn set_chorus_level(&self, level: u8) {
        self.player.set_chorus_level(level);
    }

    /// Render the loaded track offline. Blocks until the file is
    /// written; the transport is left stopped at the end of the track.
    pub fn render_to_file(
        &self,
        file_name: &Path,
        quality: f64,
        progress: Option<&mut dyn FnMut(u64)>,
    ) -> Result<u64, TransportError> {
        if !self.state.lock().loaded {
            return Err(TransportError::NoTrackLoaded);
        }
        self.player
            .set_render_mode(file_name, quality)
            .map_err(map_synth_err)?;
        self.player.play(0).map_err(map_synth_err)?;
        self.player.render_loop(progress).map_err(map_synth_err)
    }

    pub fn join(&self) {
        self.player.join();
    }
}

impl MidiTransport for SynthTransport {
    fn load(&self, path: &Path) -> Result<bool, TransportError> {
        self.player.reset().map_err(map_synth_err)?;
        {
            let mut state = self.state.lock();
            state.pause_time = 0;
            state.was_playing = false;
            state.loaded = false;
        }

        self.player.add(path).map_err(map_synth_err)?;
        if self.player.status() == PlaybackStatus::Finished {
            return Ok(false);
        }

        {
            let mut state = self.state.lock();
            state.duration_in_ticks = self.player.duration_ticks();
            state.loaded = true;
        }
        self.hooks.notify_after_load();
        Ok(true)
    }

    fn play(&self) -> Result<(), TransportError> {
        if !self.state.lock().loaded {
            return Err(TransportError::NoTrackLoaded);
        }
        if self.player.status() == PlaybackStatus::Playing {
            return Ok(());
        }
        let offset = self.state.lock().pause_time;
        self.player.play(offset).map_err(map_synth_err)?;
        self.state.lock().was_playing = true;
        Ok(())
    }

    fn pause(&self) -> Result<(), TransportError> {
        if self.player.status() != PlaybackStatus::Playing {
            return Ok(());
        }
        let reached = self.player.stop().map_err(map_synth_err)?;
        self.state.lock().pause_time = reached;
        Ok(())
    }

    fn stop(&self) -> Result<(), TransportError> {
        if self.player.status() == PlaybackStatus::Playing {
            self.player.stop().map_err(map_synth_err)?;
        }
        let mut state = self.state.lock();
        state.pause_time = 0;
        state.was_playing = false;
        Ok(())
    }

    fn seek(&self, position: Tick) -> Result<(), TransportError> {
        let length = {
            let state = self.state.lock();
            if !state.loaded {
                return Err(TransportError::NoTrackLoaded);
            }
            state.duration_in_ticks
        };
        if position < 0 || position > length {
            return Ok(());
        }
        self.player.seek_wait(position).map_err(map_synth_err)?;
        // The resume position records the request, not the landing tick.
        self.state.lock().pause_time = position;
        Ok(())
    }

    fn tell(&self) -> Result<Tick, TransportError> {
        if !self.state.lock().loaded {
            return Err(TransportError::NoTrackLoaded);
        }
        Ok(self.player.ticks())
    }

    fn length(&self) -> Result<Tick, TransportError> {
        let state = self.state.lock();
        if !state.loaded {
            return Err(TransportError::NoTrackLoaded);
        }
        Ok(state.duration_in_ticks)
    }

    fn is_playing(&self) -> bool {
        self.player.status() == PlaybackStatus::Playing
    }

    fn is_paused(&self) -> bool {
        self.state.lock().pause_time > 0
    }

    fn poll(&self) -> Result<(), TransportError> {
        let finished = {
            let mut state = self.state.lock();
            if state.was_playing && self.player.status() == PlaybackStatus::Finished {
                state.was_playing = false;
                state.pause_time = 0;
                true
            } else {
                false
            }
        };
        if finished {
            self.hooks.notify_after_stop();
        }
        Ok(())
    }

    fn on_after_load(&self, observer: TransportObserver) {
        self.hooks.on_after_load(observer);
    }

    fn on_after_stop(&self, observer: TransportObserver) {
        self.hooks.on_after_stop(observer);
    }
}

fn map_synth_err(e: SynthError) -> TransportError {
    match e {
        SynthError::Io(message) => TransportError::Io(message),
        other => TransportError::Backend(other.to_string()),
    }
}
