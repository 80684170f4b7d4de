use attacca_ports::media::{MediaControlPort, MediaError};
use attacca_ports::types::{MediaNotification, MediaState, Millis};
use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

const COMMAND_POLL: Duration = Duration::from_millis(10);

enum MediaCmd {
    Load(PathBuf, mpsc::SyncSender<Result<bool, MediaError>>),
    Unload,
    Play(mpsc::SyncSender<Result<(), MediaError>>),
    Pause,
    Stop,
    Seek(Millis, mpsc::SyncSender<Result<(), MediaError>>),
    Tell(mpsc::SyncSender<Millis>),
    Length(mpsc::SyncSender<Millis>),
    SetVolume(f32),
    Rate(mpsc::SyncSender<f32>),
    SetRate(f32),
    State(mpsc::SyncSender<MediaState>),
    TakeNotifications(mpsc::SyncSender<Vec<MediaNotification>>),
    Shutdown,
}

/// Media backend over a rodio sink. The output stream and sink are not
/// `Send`, so a dedicated thread owns them and everything else talks to
/// it over a command channel.
///
/// A track that drains to its end is reported as `Stopped` followed by
/// `Finished`, mirroring backends that emit both for one stop. An
/// explicit `stop` emits neither.
pub struct RodioMediaControl {
    cmd_tx: Mutex<mpsc::Sender<MediaCmd>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RodioMediaControl {
    pub fn new() -> Result<Self, MediaError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let worker = std::thread::spawn(move || {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            run_worker(&stream, handle, cmd_rx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                cmd_tx: Mutex::new(cmd_tx),
                worker: Mutex::new(Some(worker)),
            }),
            Ok(Err(message)) => Err(MediaError::Backend(message)),
            Err(_) => Err(MediaError::Backend("media thread died".to_string())),
        }
    }

    fn send(&self, cmd: MediaCmd) {
        let _ = self.cmd_tx.lock().send(cmd);
    }

    fn request<T>(&self, make: impl FnOnce(mpsc::SyncSender<T>) -> MediaCmd) -> Option<T> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        self.send(make(reply_tx));
        reply_rx.recv().ok()
    }
}

impl MediaControlPort for RodioMediaControl {
    fn load(&self, path: &Path) -> Result<bool, MediaError> {
        self.request(|reply| MediaCmd::Load(path.to_path_buf(), reply))
            .unwrap_or_else(|| Err(MediaError::Backend("media thread stopped".to_string())))
    }

    fn unload(&self) {
        self.send(MediaCmd::Unload);
    }

    fn play(&self) -> Result<(), MediaError> {
        self.request(MediaCmd::Play)
            .unwrap_or_else(|| Err(MediaError::Backend("media thread stopped".to_string())))
    }

    fn pause(&self) {
        self.send(MediaCmd::Pause);
    }

    fn stop(&self) {
        self.send(MediaCmd::Stop);
    }

    fn seek(&self, position: Millis) -> Result<(), MediaError> {
        self.request(|reply| MediaCmd::Seek(position, reply))
            .unwrap_or_else(|| Err(MediaError::Backend("media thread stopped".to_string())))
    }

    fn tell(&self) -> Millis {
        self.request(MediaCmd::Tell).unwrap_or(0)
    }

    fn length(&self) -> Millis {
        self.request(MediaCmd::Length).unwrap_or(0)
    }

    fn set_volume(&self, volume: f32) {
        self.send(MediaCmd::SetVolume(volume));
    }

    fn playback_rate(&self) -> f32 {
        self.request(MediaCmd::Rate).unwrap_or(1.0)
    }

    fn set_playback_rate(&self, rate: f32) {
        self.send(MediaCmd::SetRate(rate));
    }

    fn state(&self) -> MediaState {
        self.request(MediaCmd::State).unwrap_or(MediaState::Stopped)
    }

    fn take_notifications(&self) -> Vec<MediaNotification> {
        self.request(MediaCmd::TakeNotifications).unwrap_or_default()
    }
}

impl Drop for RodioMediaControl {
    fn drop(&mut self) {
        self.send(MediaCmd::Shutdown);
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

struct WorkerState {
    sink: Option<Sink>,
    length_ms: Millis,
    mode: MediaState,
    volume: f32,
    rate: f32,
    notifications: Vec<MediaNotification>,
}

fn run_worker(
    _stream: &OutputStream,
    handle: rodio::OutputStreamHandle,
    cmd_rx: mpsc::Receiver<MediaCmd>,
) {
    let mut state = WorkerState {
        sink: None,
        length_ms: 0,
        mode: MediaState::Stopped,
        volume: 1.0,
        rate: 1.0,
        notifications: Vec::new(),
    };

    loop {
        let cmd = match cmd_rx.recv_timeout(COMMAND_POLL) {
            Ok(cmd) => Some(cmd),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        detect_drain(&mut state);

        match cmd {
            None => {}
            Some(MediaCmd::Load(path, reply)) => {
                let _ = reply.send(do_load(&mut state, &handle, &path));
            }
            Some(MediaCmd::Unload) => {
                if let Some(sink) = state.sink.take() {
                    sink.stop();
                }
                state.length_ms = 0;
                state.mode = MediaState::Stopped;
            }
            Some(MediaCmd::Play(reply)) => {
                let result = match state.sink.as_ref() {
                    Some(sink) => {
                        sink.play();
                        state.mode = MediaState::Playing;
                        Ok(())
                    }
                    None => Err(MediaError::Backend("no track loaded".to_string())),
                };
                let _ = reply.send(result);
            }
            Some(MediaCmd::Pause) => {
                if let Some(sink) = state.sink.as_ref() {
                    sink.pause();
                    if state.mode == MediaState::Playing {
                        state.mode = MediaState::Paused;
                    }
                }
            }
            Some(MediaCmd::Stop) => {
                // Mode flips first so the drain check cannot mistake
                // this for the track running out.
                state.mode = MediaState::Stopped;
                if let Some(sink) = state.sink.take() {
                    sink.stop();
                }
            }
            Some(MediaCmd::Seek(position, reply)) => {
                let result = match state.sink.as_ref() {
                    Some(sink) => sink
                        .try_seek(Duration::from_millis(position.max(0) as u64))
                        .map_err(|e| MediaError::Backend(e.to_string())),
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }
            Some(MediaCmd::Tell(reply)) => {
                let position = state
                    .sink
                    .as_ref()
                    .map(|sink| sink.get_pos().as_millis() as Millis)
                    .unwrap_or(0);
                let _ = reply.send(position);
            }
            Some(MediaCmd::Length(reply)) => {
                let _ = reply.send(state.length_ms);
            }
            Some(MediaCmd::SetVolume(volume)) => {
                state.volume = volume;
                if let Some(sink) = state.sink.as_ref() {
                    sink.set_volume(volume);
                }
            }
            Some(MediaCmd::Rate(reply)) => {
                let _ = reply.send(state.rate);
            }
            Some(MediaCmd::SetRate(rate)) => {
                state.rate = rate;
                if let Some(sink) = state.sink.as_ref() {
                    sink.set_speed(rate);
                }
            }
            Some(MediaCmd::State(reply)) => {
                let _ = reply.send(state.mode);
            }
            Some(MediaCmd::TakeNotifications(reply)) => {
                let _ = reply.send(std::mem::take(&mut state.notifications));
            }
            Some(MediaCmd::Shutdown) => break,
        }
    }
}

fn detect_drain(state: &mut WorkerState) {
    if state.mode != MediaState::Playing {
        return;
    }
    let drained = state.sink.as_ref().map(|sink| sink.empty()).unwrap_or(true);
    if drained {
        debug!("media sink drained");
        state.mode = MediaState::Stopped;
        state.notifications.push(MediaNotification::Stopped);
        state.notifications.push(MediaNotification::Finished);
    }
}

fn do_load(
    state: &mut WorkerState,
    handle: &rodio::OutputStreamHandle,
    path: &Path,
) -> Result<bool, MediaError> {
    if let Some(old) = state.sink.take() {
        old.stop();
    }
    state.length_ms = 0;
    state.mode = MediaState::Stopped;

    let file = File::open(path).map_err(|e| MediaError::Io(e.to_string()))?;
    let source = match Decoder::new(BufReader::new(file)) {
        Ok(source) => source,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "undecodable media file");
            return Ok(false);
        }
    };

    let length_ms = source
        .total_duration()
        .map(|d| d.as_millis() as Millis)
        .unwrap_or(0);

    let sink = Sink::try_new(handle).map_err(|e| MediaError::Backend(e.to_string()))?;
    sink.pause();
    sink.set_volume(state.volume);
    sink.set_speed(state.rate);
    sink.append(source);

    state.sink = Some(sink);
    state.length_ms = length_ms;
    state.notifications.push(MediaNotification::Loaded);
    debug!(path = %path.display(), length_ms, "media track loaded");
    Ok(true)
}
