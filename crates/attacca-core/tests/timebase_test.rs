use attacca_core::TempoMap;
use attacca_domain_midi::TempoPoint;
use pretty_assertions::assert_eq;

#[test]
fn default_tempo_is_two_beats_per_second() {
    let map = TempoMap::new(480, Vec::new());
    assert_eq!(map.tick_to_micros(480), 500_000);
    assert_eq!(map.tick_to_micros(960), 1_000_000);
    assert_eq!(map.micros_to_tick(1_000_000), 960);
}

#[test]
fn tempo_change_shifts_later_ticks() {
    let points = vec![
        TempoPoint {
            tick: 0,
            us_per_quarter: 500_000,
        },
        TempoPoint {
            tick: 480,
            us_per_quarter: 250_000,
        },
    ];
    let map = TempoMap::new(480, points);
    assert_eq!(map.tick_to_micros(480), 500_000);
    // One quarter at the doubled tempo.
    assert_eq!(map.tick_to_micros(960), 750_000);
    assert_eq!(map.micros_to_tick(750_000), 960);
}

#[test]
fn missing_leading_point_gets_default_tempo() {
    let points = vec![TempoPoint {
        tick: 960,
        us_per_quarter: 250_000,
    }];
    let map = TempoMap::new(480, points);
    assert_eq!(map.tick_to_micros(480), 500_000);
    assert_eq!(map.tick_to_micros(960), 1_000_000);
    assert_eq!(map.tick_to_micros(1440), 1_250_000);
}

#[test]
fn samples_round_trip_at_common_rate() {
    let map = TempoMap::new(480, Vec::new());
    let samples = map.tick_to_samples(960, 44_100);
    assert_eq!(samples, 44_100);
    assert_eq!(map.samples_to_tick(samples, 44_100), 960);
}

#[test]
fn negative_micros_clamp_to_sample_zero() {
    let map = TempoMap::new(480, Vec::new());
    assert_eq!(map.tick_to_samples(-100, 44_100), 0);
}
