use attacca_domain_midi::TempoPoint;
use attacca_ports::types::{SampleTime, Tick};

/// Piecewise-linear mapping between ticks and wall time, precomputed
/// into segments with absolute start offsets.
#[derive(Clone, Debug)]
pub struct TempoMap {
    ppq: u16,
    segments: Vec<TempoSegment>,
}

#[derive(Clone, Copy, Debug)]
struct TempoSegment {
    start_tick: Tick,
    start_us: i64,
    us_per_quarter: u32,
}

impl TempoMap {
    pub fn new(ppq: u16, mut points: Vec<TempoPoint>) -> Self {
        if points.is_empty() || points[0].tick != 0 {
            points.insert(
                0,
                TempoPoint {
                    tick: 0,
                    us_per_quarter: 500_000,
                },
            );
        }
        points.sort_by_key(|p| p.tick);

        let mut segments = Vec::with_capacity(points.len());
        let mut current_us = 0i64;
        for (idx, point) in points.iter().enumerate() {
            if idx > 0 {
                let prev = &points[idx - 1];
                let delta_ticks = point.tick - prev.tick;
                current_us += ticks_to_us(delta_ticks, prev.us_per_quarter, ppq);
            }
            segments.push(TempoSegment {
                start_tick: point.tick,
                start_us: current_us,
                us_per_quarter: point.us_per_quarter,
            });
        }

        Self { ppq, segments }
    }

    pub fn ppq(&self) -> u16 {
        self.ppq
    }

    pub fn tick_to_micros(&self, tick: Tick) -> i64 {
        let seg = self.segment_for_tick(tick);
        let delta_ticks = tick - seg.start_tick;
        seg.start_us + ticks_to_us(delta_ticks, seg.us_per_quarter, self.ppq)
    }

    pub fn micros_to_tick(&self, micros: i64) -> Tick {
        let seg = self.segment_for_micros(micros);
        let delta_us = micros - seg.start_us;
        let delta_ticks = us_to_ticks(delta_us, seg.us_per_quarter, self.ppq);
        seg.start_tick + delta_ticks
    }

    pub fn tick_to_samples(&self, tick: Tick, sample_rate_hz: u32) -> SampleTime {
        micros_to_samples(self.tick_to_micros(tick), sample_rate_hz)
    }

    pub fn samples_to_tick(&self, samples: SampleTime, sample_rate_hz: u32) -> Tick {
        self.micros_to_tick(samples_to_micros(samples, sample_rate_hz))
    }

    fn segment_for_tick(&self, tick: Tick) -> TempoSegment {
        let mut current = self.segments[0];
        for seg in &self.segments {
            if seg.start_tick > tick {
                break;
            }
            current = *seg;
        }
        current
    }

    fn segment_for_micros(&self, micros: i64) -> TempoSegment {
        let mut current = self.segments[0];
        for seg in &self.segments {
            if seg.start_us > micros {
                break;
            }
            current = *seg;
        }
        current
    }
}

fn ticks_to_us(ticks: Tick, us_per_quarter: u32, ppq: u16) -> i64 {
    let ticks = ticks as i128;
    let us_per_quarter = us_per_quarter as i128;
    let ppq = ppq.max(1) as i128;
    ((ticks * us_per_quarter) / ppq) as i64
}

fn us_to_ticks(us: i64, us_per_quarter: u32, ppq: u16) -> Tick {
    let us = us as i128;
    let us_per_quarter = us_per_quarter.max(1) as i128;
    let ppq = ppq as i128;
    ((us * ppq) / us_per_quarter) as Tick
}

fn micros_to_samples(micros: i64, sample_rate_hz: u32) -> SampleTime {
    if micros <= 0 {
        return 0;
    }
    let samples = (micros as f64 * sample_rate_hz as f64 / 1_000_000.0).round();
    samples as u64
}

fn samples_to_micros(samples: SampleTime, sample_rate_hz: u32) -> i64 {
    let micros = samples as f64 * 1_000_000.0 / sample_rate_hz as f64;
    micros.round() as i64
}
