use attacca_ports::types::MediaNotification;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Playing,
    Paused,
    /// A restart was requested and has not been confirmed yet.
    LoopPendingRestart,
}

/// What the transport must do in response to a drained notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopAction {
    FireAfterLoad,
    Restart,
    FireAfterStop,
}

/// Collapses a media backend's end-of-track notifications into at most
/// one `Restart` (looping) or one `FireAfterStop` (not looping) per
/// track end. Backends may report a single stop as both `Stopped` and
/// `Finished`; the second report of a cycle is swallowed.
///
/// All methods run on the control thread; the transport applies the
/// returned actions synchronously before draining further.
#[derive(Clone, Copy, Debug)]
pub struct MediaLoopMachine {
    state: LoopState,
    looping: bool,
    restarted_this_cycle: bool,
    stop_notified: bool,
}

impl MediaLoopMachine {
    pub fn new() -> Self {
        Self {
            state: LoopState::Stopped,
            looping: false,
            restarted_this_cycle: false,
            stop_notified: false,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn on_play(&mut self) {
        self.state = LoopState::Playing;
        self.restarted_this_cycle = false;
        self.stop_notified = false;
    }

    pub fn on_pause(&mut self) {
        if self.state == LoopState::Playing {
            self.state = LoopState::Paused;
        }
    }

    /// Explicit user stop. Clears cycle tracking so a later track end
    /// is reported fresh.
    pub fn on_stop(&mut self) {
        self.state = LoopState::Stopped;
        self.restarted_this_cycle = false;
        self.stop_notified = false;
    }

    /// The transport finished carrying out a `Restart`.
    pub fn confirm_restart(&mut self) {
        self.state = LoopState::Playing;
        self.restarted_this_cycle = true;
        self.stop_notified = false;
    }

    pub fn on_notification(&mut self, notification: MediaNotification) -> Option<LoopAction> {
        match notification {
            MediaNotification::Loaded => Some(LoopAction::FireAfterLoad),
            MediaNotification::Stopped => self.on_ended(),
            MediaNotification::Finished => self.on_ended(),
        }
    }

    fn on_ended(&mut self) -> Option<LoopAction> {
        if self.looping {
            if self.restarted_this_cycle {
                // Second report of the same track end.
                self.restarted_this_cycle = false;
                return None;
            }
            if matches!(self.state, LoopState::Playing) {
                self.state = LoopState::LoopPendingRestart;
                return Some(LoopAction::Restart);
            }
            None
        } else {
            if self.state == LoopState::Playing && !self.stop_notified {
                self.state = LoopState::Stopped;
                self.stop_notified = true;
                return Some(LoopAction::FireAfterStop);
            }
            None
        }
    }
}

impl Default for MediaLoopMachine {
    fn default() -> Self {
        Self::new()
    }
}
