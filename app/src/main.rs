use attacca_core::ReverbPreset;
use attacca_infra_audio_cpal::CpalAudioOutputPort;
use attacca_infra_media_rodio::{MediaTransport, RodioMediaControl};
use attacca_infra_storage_fs::FsStorage;
use attacca_infra_synth_rustysynth::{SynthPlayer, SynthTransport};
use attacca_ports::audio::AudioOutputPort;
use attacca_ports::storage::{SettingsDto, StoragePort};
use attacca_ports::transport::MidiTransport;
use attacca_ports::types::{AudioConfig, DeviceId, Volume01};
use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const SAMPLE_RATE_HZ: u32 = 44_100;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct PlayOptions {
    track: PathBuf,
    sf2: Option<PathBuf>,
    gain: Option<f32>,
    reverb: Option<String>,
    rate: Option<f32>,
    device: Option<String>,
    looping: bool,
    media: bool,
}

struct RenderOptions {
    track: PathBuf,
    output: PathBuf,
    sf2: Option<PathBuf>,
    quality: Option<f64>,
}

fn usage(program: &str) -> String {
    format!(
        "attacca - MIDI playback transport\n\
         \n\
         Usage:\n\
         \x20 {program} play <file.mid> [--sf2 PATH] [--gain G] [--reverb NAME]\n\
         \x20                           [--rate R] [--device ID] [--loop] [--media]\n\
         \x20 {program} render <file.mid> <out.wav> [--sf2 PATH] [--quality Q]\n\
         \x20 {program} devices\n\
         \n\
         Options:\n\
         \x20 --sf2 PATH     SoundFont to synthesize with (persisted as default)\n\
         \x20 --gain G       Master gain, e.g. 0.7\n\
         \x20 --reverb NAME  Reverb preset: Model 1 .. Model 5\n\
         \x20 --rate R       Playback rate multiplier (media backend)\n\
         \x20 --device ID    Audio output device id (see `devices`)\n\
         \x20 --loop         Restart from the beginning when the track ends\n\
         \x20 --media        Use the media-decoder backend instead of the synthesizer"
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("attacca");

    match args.get(1).map(String::as_str) {
        Some("play") => {
            let options = parse_play(program, &args[2..])?;
            if options.media {
                run_media(options)
            } else {
                run_synth(options)
            }
        }
        Some("render") => run_render(parse_render(program, &args[2..])?),
        Some("devices") => run_devices(),
        Some("--help") | Some("-h") => {
            eprintln!("{}", usage(program));
            Ok(())
        }
        _ => {
            eprintln!("{}", usage(program));
            std::process::exit(2);
        }
    }
}

fn parse_play(program: &str, args: &[String]) -> Result<PlayOptions, Box<dyn Error>> {
    let mut track: Option<PathBuf> = None;
    let mut options = PlayOptions {
        track: PathBuf::new(),
        sf2: None,
        gain: None,
        reverb: None,
        rate: None,
        device: None,
        looping: false,
        media: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--sf2" => options.sf2 = Some(PathBuf::from(take_value(program, args, &mut i)?)),
            "--gain" => options.gain = Some(take_value(program, args, &mut i)?.parse()?),
            "--reverb" => options.reverb = Some(take_value(program, args, &mut i)?),
            "--rate" => options.rate = Some(take_value(program, args, &mut i)?.parse()?),
            "--device" => options.device = Some(take_value(program, args, &mut i)?),
            "--loop" => options.looping = true,
            "--media" => options.media = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}").into());
            }
            other => {
                if track.is_some() {
                    return Err(format!("unexpected argument: {other}").into());
                }
                track = Some(PathBuf::from(other));
            }
        }
        i += 1;
    }

    options.track = track.ok_or("play requires a track file")?;
    Ok(options)
}

fn parse_render(program: &str, args: &[String]) -> Result<RenderOptions, Box<dyn Error>> {
    let mut positional: Vec<PathBuf> = Vec::new();
    let mut sf2: Option<PathBuf> = None;
    let mut quality: Option<f64> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--sf2" => sf2 = Some(PathBuf::from(take_value(program, args, &mut i)?)),
            "--quality" => quality = Some(take_value(program, args, &mut i)?.parse()?),
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}").into());
            }
            other => positional.push(PathBuf::from(other)),
        }
        i += 1;
    }

    if positional.len() != 2 {
        return Err("render requires <file.mid> and <out.wav>".into());
    }
    let output = positional.pop().ok_or("render requires an output path")?;
    let track = positional.pop().ok_or("render requires a track file")?;
    Ok(RenderOptions {
        track,
        output,
        sf2,
        quality,
    })
}

fn take_value(program: &str, args: &[String], i: &mut usize) -> Result<String, Box<dyn Error>> {
    let flag = args[*i].clone();
    *i += 1;
    match args.get(*i) {
        Some(value) => Ok(value.clone()),
        None => {
            eprintln!("{}", usage(program));
            Err(format!("{flag} requires a value").into())
        }
    }
}

fn load_settings(storage: &FsStorage) -> SettingsDto {
    match storage.load_settings() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(error = %err, "settings unreadable, using defaults");
            SettingsDto::default()
        }
    }
}

fn resolve_sf2(cli: Option<PathBuf>, settings: &SettingsDto) -> Result<PathBuf, Box<dyn Error>> {
    if let Some(path) = cli {
        return Ok(path);
    }
    if let Some(path) = settings.default_sf2_path.as_ref() {
        return Ok(PathBuf::from(path));
    }
    Err("no SoundFont: pass --sf2 or set a default via a previous run".into())
}

fn run_synth(options: PlayOptions) -> Result<(), Box<dyn Error>> {
    let storage = FsStorage::default();
    let mut settings = load_settings(&storage);

    let sf2 = resolve_sf2(options.sf2.clone(), &settings)?;
    let gain = options.gain.unwrap_or_else(|| settings.master_gain.get());
    let reverb_name = options
        .reverb
        .clone()
        .or_else(|| settings.reverb_preset.clone());

    let player = SynthPlayer::from_sf2_path(&sf2, SAMPLE_RATE_HZ)?;
    let render = player.render_handle();

    let audio = CpalAudioOutputPort::new();
    let device_id = pick_device(&audio, options.device.as_deref(), &settings)?;
    let config = AudioConfig {
        sample_rate_hz: SAMPLE_RATE_HZ,
        channels: 2,
        buffer_size_frames: settings.audio_buffer_size_frames,
    };
    let stream = audio.open_output(&device_id, config, render)?;

    let transport = SynthTransport::new(Box::new(player));
    transport.set_gain(gain);
    if let Some(name) = reverb_name.as_deref() {
        match ReverbPreset::from_name(name) {
            Some(preset) => transport.set_reverb_preset(preset),
            None => return Err(format!("unknown reverb preset: {name}").into()),
        }
    }

    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    transport.on_after_stop(Arc::new(move || flag.store(true, Ordering::SeqCst)));

    if !transport.load(&options.track)? {
        return Err(format!("not a playable MIDI file: {}", options.track.display()).into());
    }
    info!(track = %options.track.display(), length_ticks = transport.length()?, "loaded");

    transport.play()?;
    loop {
        transport.poll()?;
        if finished.load(Ordering::SeqCst) {
            if options.looping {
                finished.store(false, Ordering::SeqCst);
                transport.play()?;
            } else {
                break;
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    transport.join();
    stream.close();

    settings.default_sf2_path = Some(sf2.to_string_lossy().into_owned());
    settings.master_gain = Volume01::new(gain);
    settings.reverb_preset = reverb_name;
    settings.loop_playback = options.looping;
    settings.selected_audio_out = Some(device_id);
    if let Err(err) = storage.save_settings(&settings) {
        tracing::warn!(error = %err, "failed to persist settings");
    }
    Ok(())
}

fn run_media(options: PlayOptions) -> Result<(), Box<dyn Error>> {
    let storage = FsStorage::default();
    let mut settings = load_settings(&storage);

    let control = RodioMediaControl::new()?;
    let transport = MediaTransport::new(Box::new(control));
    transport.set_looping(options.looping || settings.loop_playback);
    if let Some(rate) = options.rate {
        transport.set_playback_rate(rate);
    }

    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    transport.on_after_stop(Arc::new(move || flag.store(true, Ordering::SeqCst)));

    if !transport.load(&options.track)? {
        return Err(format!("cannot decode: {}", options.track.display()).into());
    }
    info!(track = %options.track.display(), length_ms = transport.length()?, "loaded");

    transport.play()?;
    while !finished.load(Ordering::SeqCst) {
        transport.poll()?;
        std::thread::sleep(POLL_INTERVAL);
    }

    settings.loop_playback = transport.looping();
    if let Err(err) = storage.save_settings(&settings) {
        tracing::warn!(error = %err, "failed to persist settings");
    }
    Ok(())
}

fn run_render(options: RenderOptions) -> Result<(), Box<dyn Error>> {
    let storage = FsStorage::default();
    let settings = load_settings(&storage);

    let sf2 = resolve_sf2(options.sf2, &settings)?;
    let quality = options.quality.unwrap_or(settings.render_quality);

    let player = SynthPlayer::from_sf2_path(&sf2, SAMPLE_RATE_HZ)?;
    let transport = SynthTransport::new(Box::new(player));
    transport.set_gain(settings.master_gain.get());
    if let Some(name) = settings.reverb_preset.as_deref() {
        if let Some(preset) = ReverbPreset::from_name(name) {
            transport.set_reverb_preset(preset);
        }
    }

    if !transport.load(&options.track)? {
        return Err(format!("not a playable MIDI file: {}", options.track.display()).into());
    }

    let mut last_report = 0u64;
    let mut progress = |frames: u64| {
        if frames >= last_report + SAMPLE_RATE_HZ as u64 * 10 {
            last_report = frames;
            info!(seconds = frames / SAMPLE_RATE_HZ as u64, "rendering");
        }
    };
    let frames = transport.render_to_file(&options.output, quality, Some(&mut progress))?;
    println!(
        "Wrote {} ({:.1}s)",
        options.output.display(),
        frames as f64 / SAMPLE_RATE_HZ as f64
    );
    Ok(())
}

fn run_devices() -> Result<(), Box<dyn Error>> {
    let audio = CpalAudioOutputPort::new();
    let devices = audio.list_outputs()?;
    if devices.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }
    for device in devices {
        println!(
            "{}\n    {} ch, {} Hz",
            device.id, device.default_config.channels, device.default_config.sample_rate_hz
        );
    }
    Ok(())
}

fn pick_device(
    audio: &CpalAudioOutputPort,
    cli: Option<&str>,
    settings: &SettingsDto,
) -> Result<DeviceId, Box<dyn Error>> {
    let devices = audio.list_outputs()?;

    if let Some(wanted) = cli {
        return devices
            .iter()
            .find(|d| d.id.0 == wanted)
            .map(|d| d.id.clone())
            .ok_or_else(|| format!("audio device not found: {wanted}").into());
    }

    // A remembered device that has since disappeared falls back to the first
    // available output.
    if let Some(saved) = settings.selected_audio_out.as_ref() {
        if let Some(device) = devices.iter().find(|d| &d.id == saved) {
            return Ok(device.id.clone());
        }
    }

    devices
        .first()
        .map(|d| d.id.clone())
        .ok_or_else(|| "no audio output devices available".into())
}
