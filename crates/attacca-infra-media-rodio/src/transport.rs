use attacca_core::{LoopAction, MediaLoopMachine, TransportHooks};
use attacca_ports::media::{MediaControlPort, MediaError};
use attacca_ports::transport::{MidiTransport, TransportError, TransportObserver};
use attacca_ports::types::{MediaState, Millis};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Some hosts drop the first moments of audio when playback starts
/// immediately after a stream opens.
const MACOS_START_DELAY: Duration = Duration::from_millis(400);
const DEFAULT_VOLUME: f32 = 0.9;

struct MediaTransportState {
    current_path: Option<PathBuf>,
    /// Stopping releases the backend's file handle, so the next play
    /// must load the track again.
    needs_reload: bool,
    machine: MediaLoopMachine,
    rate: f32,
}

/// Transport contract over a `MediaControlPort`. Positions are
/// milliseconds.
pub struct MediaTransport {
    control: Box<dyn MediaControlPort>,
    state: Mutex<MediaTransportState>,
    hooks: TransportHooks,
}

impl MediaTransport {
    pub fn new(control: Box<dyn MediaControlPort>) -> Self {
        Self {
            control,
            state: Mutex::new(MediaTransportState {
                current_path: None,
                needs_reload: false,
                machine: MediaLoopMachine::new(),
                rate: 1.0,
            }),
            hooks: TransportHooks::new(),
        }
    }

    pub fn set_looping(&self, looping: bool) {
        debug!(looping, "loop mode changed");
        self.state.lock().machine.set_looping(looping);
    }

    pub fn looping(&self) -> bool {
        self.state.lock().machine.looping()
    }

    pub fn set_volume(&self, volume: f32) {
        self.control.set_volume(volume);
    }

    pub fn playback_rate(&self) -> f32 {
        self.state.lock().rate
    }

    /// Rate changes while stopped do not stick on every backend, so the
    /// requested rate is remembered and reapplied on each play.
    pub fn set_playback_rate(&self, rate: f32) {
        self.state.lock().rate = rate;
        if self.control.state() == MediaState::Playing || !cfg!(target_os = "macos") {
            self.control.set_playback_rate(rate);
        }
    }

    pub fn supports_tempo_change_while_playing(&self) -> bool {
        true
    }

    fn start_playback(&self, state: &mut MediaTransportState) -> Result<(), TransportError> {
        if state.needs_reload {
            let path = state
                .current_path
                .clone()
                .ok_or(TransportError::NoTrackLoaded)?;
            let decoded = self.control.load(&path).map_err(map_media_err)?;
            if !decoded {
                return Err(TransportError::Backend(format!(
                    "reload failed: {}",
                    path.display()
                )));
            }
            // Internal reload; the after-load hook is for caller loads.
            self.control.take_notifications();
            state.needs_reload = false;
        }

        if cfg!(target_os = "macos") {
            std::thread::sleep(MACOS_START_DELAY);
        } else {
            self.control.set_volume(DEFAULT_VOLUME);
        }

        self.control.play().map_err(map_media_err)?;
        if (state.rate - 1.0).abs() > f32::EPSILON {
            self.control.set_playback_rate(state.rate);
        }
        state.machine.on_play();
        Ok(())
    }

    fn restart(&self, state: &mut MediaTransportState) {
        if self.control.state() == MediaState::Playing {
            match self.control.seek(0) {
                Ok(()) => state.machine.confirm_restart(),
                Err(e) => {
                    warn!(error = %e, "loop rewind failed");
                    state.machine.on_stop();
                }
            }
            return;
        }

        state.needs_reload = true;
        match self.start_playback(state) {
            Ok(()) => state.machine.confirm_restart(),
            Err(e) => {
                warn!(error = %e, "loop restart failed");
                state.machine.on_stop();
            }
        }
    }
}

impl MidiTransport for MediaTransport {
    fn load(&self, path: &Path) -> Result<bool, TransportError> {
        {
            let mut state = self.state.lock();
            state.machine.on_stop();
            state.current_path = None;
            state.needs_reload = false;

            let decoded = self.control.load(path).map_err(map_media_err)?;
            // Load completion is reported inline below.
            self.control.take_notifications();
            if !decoded {
                return Ok(false);
            }
            state.current_path = Some(path.to_path_buf());
        }
        self.hooks.notify_after_load();
        Ok(true)
    }

    fn play(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.current_path.is_none() {
            return Err(TransportError::NoTrackLoaded);
        }
        if self.control.state() == MediaState::Playing {
            return Ok(());
        }
        self.start_playback(&mut state)
    }

    fn pause(&self) -> Result<(), TransportError> {
        self.control.pause();
        self.state.lock().machine.on_pause();
        Ok(())
    }

    fn stop(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.machine.on_stop();
        self.control.stop();
        self.control.unload();
        state.needs_reload = true;
        Ok(())
    }

    fn seek(&self, position: Millis) -> Result<(), TransportError> {
        if self.state.lock().current_path.is_none() {
            return Err(TransportError::NoTrackLoaded);
        }
        if position < 0 || position > self.control.length() {
            return Ok(());
        }
        self.control.seek(position).map_err(map_media_err)
    }

    fn tell(&self) -> Result<Millis, TransportError> {
        if self.state.lock().current_path.is_none() {
            return Err(TransportError::NoTrackLoaded);
        }
        Ok(self.control.tell())
    }

    fn length(&self) -> Result<Millis, TransportError> {
        if self.state.lock().current_path.is_none() {
            return Err(TransportError::NoTrackLoaded);
        }
        Ok(self.control.length())
    }

    fn is_playing(&self) -> bool {
        self.control.state() == MediaState::Playing
    }

    fn is_paused(&self) -> bool {
        self.control.state() == MediaState::Paused
    }

    fn poll(&self) -> Result<(), TransportError> {
        let notifications = self.control.take_notifications();
        let mut after_load_fires = 0;
        let mut after_stop_fires = 0;

        {
            let mut state = self.state.lock();
            for notification in notifications {
                match state.machine.on_notification(notification) {
                    Some(LoopAction::FireAfterLoad) => after_load_fires += 1,
                    Some(LoopAction::Restart) => self.restart(&mut state),
                    Some(LoopAction::FireAfterStop) => {
                        state.needs_reload = true;
                        after_stop_fires += 1;
                    }
                    None => {}
                }
            }
        }

        for _ in 0..after_load_fires {
            self.hooks.notify_after_load();
        }
        for _ in 0..after_stop_fires {
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

fn map_media_err(e: MediaError) -> TransportError {
    match e {
        MediaError::Io(message) => TransportError::Io(message),
        MediaError::Backend(message) => TransportError::Backend(message),
    }
}
