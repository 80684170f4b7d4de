use attacca_infra_storage_fs::FsStorage;
use attacca_ports::storage::{SettingsDto, StoragePort};
use attacca_ports::types::{DeviceId, Volume01};
use std::path::PathBuf;

fn temp_base(label: &str) -> PathBuf {
    let unique = format!(
        "attacca-storage-{label}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    );
    std::env::temp_dir().join(unique)
}

#[test]
fn settings_survive_a_round_trip() {
    let base = temp_base("roundtrip");
    let storage = FsStorage::new(base.clone());

    let mut settings = SettingsDto::default();
    settings.master_gain = Volume01::new(0.4);
    settings.reverb_preset = Some("Model 3".to_string());
    settings.loop_playback = true;
    settings.default_sf2_path = Some("/fonts/general.sf2".to_string());
    settings.selected_audio_out = Some(DeviceId("cpal:Alsa:0:default".to_string()));
    settings.audio_buffer_size_frames = Some(512);
    settings.render_quality = 0.8;

    storage.save_settings(&settings).expect("save");
    let loaded = storage.load_settings().expect("load");

    assert_eq!(loaded.master_gain, settings.master_gain);
    assert_eq!(loaded.reverb_preset, settings.reverb_preset);
    assert_eq!(loaded.loop_playback, settings.loop_playback);
    assert_eq!(loaded.default_sf2_path, settings.default_sf2_path);
    assert_eq!(loaded.selected_audio_out, settings.selected_audio_out);
    assert_eq!(
        loaded.audio_buffer_size_frames,
        settings.audio_buffer_size_frames
    );
    assert_eq!(loaded.render_quality, settings.render_quality);

    std::fs::remove_dir_all(base).expect("cleanup");
}

#[test]
fn missing_file_yields_defaults() {
    let storage = FsStorage::new(temp_base("missing"));
    let settings = storage.load_settings().expect("load");

    assert_eq!(settings.master_gain, Volume01::new(0.7));
    assert!(!settings.loop_playback);
    assert_eq!(settings.render_quality, 0.5);
    assert!(settings.reverb_preset.is_none());
}

#[test]
fn unknown_and_absent_fields_are_tolerated() {
    let base = temp_base("partial");
    std::fs::create_dir_all(&base).expect("mkdir");
    std::fs::write(
        base.join("settings.json"),
        r#"{ "loop_playback": true, "future_field": 42 }"#,
    )
    .expect("write");

    let storage = FsStorage::new(base.clone());
    let settings = storage.load_settings().expect("load");

    assert!(settings.loop_playback);
    assert_eq!(settings.master_gain, Volume01::new(0.7));

    std::fs::remove_dir_all(base).expect("cleanup");
}
