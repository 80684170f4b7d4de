use attacca_core::{ScoreCursor, TempoMap};
use attacca_domain_midi::{analyze_midi_path, ChannelEvent, MidiAnalysisError, MidiEventKind};
use attacca_ports::audio::AudioRenderCallback;
use attacca_ports::synth::{ChorusParams, ReverbParams, SynthError, SynthPlayerPort};
use attacca_ports::types::{PlaybackStatus, SampleTime, Tick};
use parking_lot::Mutex;
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const SEEK_POLL: Duration = Duration::from_millis(10);
const SEEK_POLL_LIMIT: u32 = 100;
const SEEK_TOLERANCE_TICKS: Tick = 100;
const JOIN_POLL: Duration = Duration::from_millis(10);
const RENDER_BUFFER_FRAMES: usize = 4096;
const RENDER_TAIL_SECONDS: u32 = 2;
const MIDI_CHANNELS: i32 = 16;
const CC_REVERB_SEND: i32 = 91;
const CC_CHORUS_SEND: i32 = 93;

#[derive(Clone, Debug)]
struct RenderTarget {
    file_name: PathBuf,
    quality: f64,
}

struct PlayerInner {
    synth: Synthesizer,
    sound_font: Arc<SoundFont>,
    cursor: ScoreCursor,
    tempo_map: TempoMap,
    duration_ticks: Tick,
    position_samples: SampleTime,
    pending_seek: Option<Tick>,
    status: PlaybackStatus,
    render_target: Option<RenderTarget>,
}

/// Shared between the control thread and the audio thread. The audio
/// thread only ever `try_lock`s; a missed lock renders one silent block.
pub struct PlayerCore {
    sample_rate_hz: u32,
    inner: Mutex<PlayerInner>,
}

/// Sequencing synthesizer: owns the parsed track, converts the running
/// sample position to ticks, and feeds due events into rustysynth block
/// by block.
pub struct SynthPlayer {
    core: Arc<PlayerCore>,
}

impl SynthPlayer {
    pub fn new(sound_font: Arc<SoundFont>, sample_rate_hz: u32) -> Result<Self, SynthError> {
        let synth = build_synthesizer(&sound_font, sample_rate_hz)?;
        let inner = PlayerInner {
            synth,
            sound_font,
            cursor: ScoreCursor::empty(),
            tempo_map: TempoMap::new(480, Vec::new()),
            duration_ticks: 0,
            position_samples: 0,
            pending_seek: None,
            status: PlaybackStatus::Ready,
            render_target: None,
        };
        Ok(Self {
            core: Arc::new(PlayerCore {
                sample_rate_hz,
                inner: Mutex::new(inner),
            }),
        })
    }

    pub fn from_sf2_path(path: &Path, sample_rate_hz: u32) -> Result<Self, SynthError> {
        let sound_font = load_sound_font(path)?;
        Self::new(sound_font, sample_rate_hz)
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.core.sample_rate_hz
    }

    /// Callback to hand to an audio output stream.
    pub fn render_handle(&self) -> Arc<dyn AudioRenderCallback> {
        self.core.clone()
    }
}

fn load_sound_font(path: &Path) -> Result<Arc<SoundFont>, SynthError> {
    let mut file = File::open(path).map_err(|e| SynthError::SoundFontLoad(e.to_string()))?;
    let sound_font =
        SoundFont::new(&mut file).map_err(|e| SynthError::SoundFontLoad(e.to_string()))?;
    Ok(Arc::new(sound_font))
}

fn build_synthesizer(
    sound_font: &Arc<SoundFont>,
    sample_rate_hz: u32,
) -> Result<Synthesizer, SynthError> {
    let mut settings = SynthesizerSettings::new(sample_rate_hz as i32);
    settings.enable_reverb_and_chorus = true;
    Synthesizer::new(sound_font, &settings).map_err(|e| SynthError::Backend(e.to_string()))
}

impl PlayerCore {
    fn current_tick(&self, inner: &PlayerInner) -> Tick {
        inner
            .tempo_map
            .samples_to_tick(inner.position_samples, self.sample_rate_hz)
    }

    /// Sequence and render one block. Caller holds the inner lock.
    fn render_block(&self, inner: &mut PlayerInner, out_l: &mut [f32], out_r: &mut [f32]) {
        let frames = out_l.len().min(out_r.len());

        if let Some(target) = inner.pending_seek.take() {
            inner.cursor.seek(target);
            inner.position_samples = inner
                .tempo_map
                .tick_to_samples(target, self.sample_rate_hz);
        }

        let window_end = inner
            .tempo_map
            .samples_to_tick(inner.position_samples + frames as u64, self.sample_rate_hz);

        let PlayerInner { cursor, synth, .. } = inner;
        for event in cursor.take_window(window_end) {
            dispatch_event(synth, event);
        }

        inner.synth.render(&mut out_l[..frames], &mut out_r[..frames]);
        inner.position_samples += frames as u64;

        if inner.cursor.exhausted() && self.current_tick(inner) >= inner.duration_ticks {
            inner.status = PlaybackStatus::Finished;
        }
    }

    fn all_channels(synth: &mut Synthesizer, command: i32, data1: i32, data2: i32) {
        for channel in 0..MIDI_CHANNELS {
            synth.process_midi_message(channel, command, data1, data2);
        }
    }
}

fn dispatch_event(synth: &mut Synthesizer, event: &ChannelEvent) {
    let channel = event.channel as i32;
    match event.kind {
        MidiEventKind::NoteOn { note, velocity } => {
            synth.note_on(channel, note as i32, velocity as i32);
        }
        MidiEventKind::NoteOff { note } => {
            synth.note_off(channel, note as i32);
        }
        MidiEventKind::Controller { controller, value } => {
            synth.process_midi_message(channel, 0xB0, controller as i32, value as i32);
        }
        MidiEventKind::ProgramChange { program } => {
            synth.process_midi_message(channel, 0xC0, program as i32, 0);
        }
        MidiEventKind::PitchBend { value } => {
            synth.process_midi_message(
                channel,
                0xE0,
                (value & 0x7F) as i32,
                (value >> 7) as i32,
            );
        }
    }
}

impl AudioRenderCallback for PlayerCore {
    fn render(&self, _sample_time_start: SampleTime, out_l: &mut [f32], out_r: &mut [f32]) {
        out_l.fill(0.0);
        out_r.fill(0.0);

        let mut guard = match self.inner.try_lock() {
            Some(guard) => guard,
            None => return,
        };
        if guard.render_target.is_some() {
            return;
        }

        if guard.status == PlaybackStatus::Playing {
            self.render_block(&mut guard, out_l, out_r);
        } else {
            // Let releases ring out after stop or finish.
            let frames = out_l.len().min(out_r.len());
            guard.synth.render(&mut out_l[..frames], &mut out_r[..frames]);
        }
    }
}

impl SynthPlayerPort for SynthPlayer {
    fn reset(&self) -> Result<(), SynthError> {
        let mut inner = self.core.inner.lock();
        inner.synth.reset();
        inner.cursor = ScoreCursor::empty();
        inner.tempo_map = TempoMap::new(480, Vec::new());
        inner.duration_ticks = 0;
        inner.position_samples = 0;
        inner.pending_seek = None;
        inner.status = PlaybackStatus::Ready;
        inner.render_target = None;
        Ok(())
    }

    fn add(&self, path: &Path) -> Result<(), SynthError> {
        let analysis = match analyze_midi_path(path) {
            Ok(analysis) => analysis,
            Err(MidiAnalysisError::Io(message)) => return Err(SynthError::Io(message)),
            Err(MidiAnalysisError::Parse(message)) => {
                warn!(path = %path.display(), %message, "unparseable midi file");
                self.core.inner.lock().status = PlaybackStatus::Finished;
                return Ok(());
            }
        };

        debug!(
            path = %path.display(),
            events = analysis.events.len(),
            duration_ticks = analysis.timing.duration_ticks,
            "midi track added"
        );

        let mut inner = self.core.inner.lock();
        inner.tempo_map = TempoMap::new(analysis.timing.ppq, analysis.timing.tempo_points);
        inner.cursor = ScoreCursor::new(analysis.events);
        inner.duration_ticks = analysis.timing.duration_ticks;
        inner.position_samples = 0;
        inner.pending_seek = None;
        inner.status = PlaybackStatus::Ready;
        Ok(())
    }

    fn play(&self, offset_ticks: Tick) -> Result<(), SynthError> {
        let mut inner = self.core.inner.lock();
        inner.cursor.seek(offset_ticks);
        inner.position_samples = inner
            .tempo_map
            .tick_to_samples(offset_ticks, self.core.sample_rate_hz);
        inner.pending_seek = None;
        inner.status = PlaybackStatus::Playing;
        Ok(())
    }

    fn stop(&self) -> Result<Tick, SynthError> {
        let mut inner = self.core.inner.lock();
        inner.status = PlaybackStatus::Ready;
        inner.pending_seek = None;
        inner.synth.note_off_all(false);
        Ok(self.core.current_tick(&inner))
    }

    fn seek(&self, ticks: Tick) -> Result<Tick, SynthError> {
        let mut inner = self.core.inner.lock();
        if inner.status == PlaybackStatus::Playing {
            inner.synth.note_off_all(false);
            inner.pending_seek = Some(ticks);
            Ok(self.core.current_tick(&inner))
        } else {
            inner.cursor.seek(ticks);
            inner.position_samples = inner
                .tempo_map
                .tick_to_samples(ticks, self.core.sample_rate_hz);
            Ok(ticks)
        }
    }

    fn seek_wait(&self, ticks: Tick) -> Result<Tick, SynthError> {
        let mut reached = self.seek(ticks)?;
        for _ in 0..SEEK_POLL_LIMIT {
            if (reached - ticks).abs() <= SEEK_TOLERANCE_TICKS {
                return Ok(reached);
            }
            std::thread::sleep(SEEK_POLL);
            reached = self.ticks();
        }
        warn!(target_tick = ticks, reached, "seek did not settle in time");
        Ok(reached)
    }

    fn ticks(&self) -> Tick {
        let inner = self.core.inner.lock();
        self.core.current_tick(&inner)
    }

    fn status(&self) -> PlaybackStatus {
        self.core.inner.lock().status
    }

    fn duration_ticks(&self) -> Tick {
        self.core.inner.lock().duration_ticks
    }

    fn join(&self) {
        while self.status() != PlaybackStatus::Finished {
            std::thread::sleep(JOIN_POLL);
        }
    }

    fn all_notes_off(&self) {
        self.core.inner.lock().synth.note_off_all(false);
    }

    fn set_gain(&self, gain: f32) {
        self.core.inner.lock().synth.set_master_volume(gain);
    }

    fn set_soundfont(&self, path: &Path) -> Result<(), SynthError> {
        let sound_font = load_sound_font(path)?;
        let synth = build_synthesizer(&sound_font, self.core.sample_rate_hz)?;

        let mut inner = self.core.inner.lock();
        let gain = inner.synth.get_master_volume();
        inner.synth = synth;
        inner.synth.set_master_volume(gain);
        inner.sound_font = sound_font;
        Ok(())
    }

    fn set_reverb(&self, params: ReverbParams) {
        let level = (params.level.clamp(0.0, 1.0) * 127.0).round() as i32;
        let mut inner = self.core.inner.lock();
        PlayerCore::all_channels(&mut inner.synth, 0xB0, CC_REVERB_SEND, level);
    }

    fn set_chorus(&self, params: ChorusParams) {
        // Chorus level is on a 0..10 scale.
        let level = (params.level.clamp(0.0, 10.0) / 10.0 * 127.0).round() as i32;
        let mut inner = self.core.inner.lock();
        PlayerCore::all_channels(&mut inner.synth, 0xB0, CC_CHORUS_SEND, level);
    }

    fn set_reverb_level(&self, level: u8) {
        let mut inner = self.core.inner.lock();
        PlayerCore::all_channels(&mut inner.synth, 0xB0, CC_REVERB_SEND, level.min(127) as i32);
    }

    fn set_chorus_level(&self, level: u8) {
        let mut inner = self.core.inner.lock();
        PlayerCore::all_channels(&mut inner.synth, 0xB0, CC_CHORUS_SEND, level.min(127) as i32);
    }

    fn set_render_mode(&self, file_name: &Path, quality: f64) -> Result<(), SynthError> {
        let mut inner = self.core.inner.lock();
        inner.render_target = Some(RenderTarget {
            file_name: file_name.to_path_buf(),
            quality,
        });
        Ok(())
    }

    fn render_loop(&self, mut progress: Option<&mut dyn FnMut(u64)>) -> Result<u64, SynthError> {
        let mut inner = self.core.inner.lock();
        let target = inner
            .render_target
            .clone()
            .ok_or_else(|| SynthError::Renderer("render mode not armed".to_string()))?;

        debug!(
            file = %target.file_name.display(),
            quality = target.quality,
            "rendering track to wav"
        );

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: self.core.sample_rate_hz,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = match hound::WavWriter::create(&target.file_name, spec) {
            Ok(writer) => writer,
            Err(e) => {
                error!(file = %target.file_name.display(), error = %e, "wav create failed");
                inner.render_target = None;
                return Err(SynthError::Renderer(e.to_string()));
            }
        };

        let mut left = vec![0.0f32; RENDER_BUFFER_FRAMES];
        let mut right = vec![0.0f32; RENDER_BUFFER_FRAMES];
        let mut total_frames: u64 = 0;

        while inner.status == PlaybackStatus::Playing {
            self.core.render_block(&mut inner, &mut left, &mut right);
            write_frames(&mut writer, &left, &right)?;
            total_frames += RENDER_BUFFER_FRAMES as u64;
            if let Some(report) = progress.as_mut() {
                report(total_frames);
            }
        }

        let tail_frames = (self.core.sample_rate_hz * RENDER_TAIL_SECONDS) as u64;
        let mut rendered_tail: u64 = 0;
        while rendered_tail < tail_frames {
            inner.synth.render(&mut left, &mut right);
            write_frames(&mut writer, &left, &right)?;
            rendered_tail += RENDER_BUFFER_FRAMES as u64;
            total_frames += RENDER_BUFFER_FRAMES as u64;
            if let Some(report) = progress.as_mut() {
                report(total_frames);
            }
        }

        inner.render_target = None;
        writer
            .finalize()
            .map_err(|e| SynthError::Renderer(e.to_string()))?;
        Ok(total_frames)
    }
}

fn write_frames(
    writer: &mut hound::WavWriter<std::io::BufWriter<File>>,
    left: &[f32],
    right: &[f32],
) -> Result<(), SynthError> {
    for (l, r) in left.iter().zip(right.iter()) {
        let l = (l * 32767.0).clamp(-32768.0, 32767.0) as i16;
        let r = (r * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(l)
            .and_then(|_| writer.write_sample(r))
            .map_err(|e| SynthError::Renderer(e.to_string()))?;
    }
    Ok(())
}
