//! Pure-data sound graphs
//!
//! A `SoundGraph` describes what the Web Audio backend would wire up: a set of
//! independent voices, each a source followed by an optional filter chain and
//! a gain stage. Graphs hold no device state, so the same graph can be played
//! by any backend or mixed to samples with [`SoundGraph::render_offline`].

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// One sample at `phase` (cycles, any range)
    fn sample(self, phase: f64) -> f32 {
        let p = phase.fract();
        let value = match self {
            Waveform::Sine => (p * TAU).sin(),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
        };
        value as f32
    }
}

/// A scheduled change on an automatable parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamEvent {
    /// Jump to `value` at `time`
    Set { value: f32, time: f64 },
    /// Linear ramp from the previous event, reaching `value` at `time`
    Linear { value: f32, time: f64 },
    /// Exponential ramp from the previous event, reaching `value` at `time`
    Exponential { value: f32, time: f64 },
}

impl ParamEvent {
    pub fn time(&self) -> f64 {
        match *self {
            ParamEvent::Set { time, .. }
            | ParamEvent::Linear { time, .. }
            | ParamEvent::Exponential { time, .. } => time,
        }
    }

    pub fn value(&self) -> f32 {
        match *self {
            ParamEvent::Set { value, .. }
            | ParamEvent::Linear { value, .. }
            | ParamEvent::Exponential { value, .. } => value,
        }
    }
}

/// Timeline of values for one parameter, evaluated like a Web Audio `AudioParam`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamAutomation {
    /// Value before the first event
    pub default: f32,
    events: Vec<ParamEvent>,
}

impl ParamAutomation {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            events: Vec::new(),
        }
    }

    /// Events in time order
    pub fn events(&self) -> &[ParamEvent] {
        &self.events
    }

    fn insert(&mut self, event: ParamEvent) -> &mut Self {
        // Keep time order; equal times stay in insertion order
        let at = self
            .events
            .iter()
            .position(|e| e.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(at, event);
        self
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(ParamEvent::Set { value, time })
    }

    pub fn linear_ramp_to(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(ParamEvent::Linear { value, time })
    }

    /// Exponential ramps need both ends non-zero and of the same sign;
    /// otherwise the value holds until `time` and then jumps
    pub fn exponential_ramp_to(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(ParamEvent::Exponential { value, time })
    }

    /// Time of the last scheduled event
    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(ParamEvent::time)
    }

    /// Parameter value at `t`
    pub fn value_at(&self, t: f64) -> f32 {
        let split = self.events.partition_point(|e| e.time() <= t);
        let (prev_value, prev_time) = match split.checked_sub(1) {
            Some(i) => (self.events[i].value(), self.events[i].time()),
            None => (self.default, 0.0),
        };

        let Some(next) = self.events.get(split) else {
            return prev_value;
        };

        let span = next.time() - prev_time;
        if span <= 0.0 {
            return prev_value;
        }
        let progress = ((t - prev_time) / span).clamp(0.0, 1.0) as f32;

        match *next {
            ParamEvent::Set { .. } => prev_value,
            ParamEvent::Linear { value, .. } => prev_value + (value - prev_value) * progress,
            ParamEvent::Exponential { value, .. } => {
                if prev_value == 0.0 || value == 0.0 || prev_value.signum() != value.signum() {
                    prev_value
                } else {
                    prev_value * (value / prev_value).powf(progress)
                }
            }
        }
    }
}

/// Biquad filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
    /// Boost (or cut) around the center frequency by `gain_db`
    Peaking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub kind: FilterKind,
    pub frequency: ParamAutomation,
    pub q: f32,
    pub gain_db: f32,
}

impl Filter {
    pub fn new(kind: FilterKind, frequency: f32, q: f32) -> Self {
        Self {
            kind,
            frequency: ParamAutomation::new(frequency),
            q,
            gain_db: 0.0,
        }
    }

    pub fn with_gain_db(mut self, gain_db: f32) -> Self {
        self.gain_db = gain_db;
        self
    }
}

/// Where a voice's signal comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Source {
    Oscillator {
        waveform: Waveform,
        /// Hz
        frequency: ParamAutomation,
        /// Cents
        detune: f32,
    },
    /// White noise buffer; the seed fixes its contents
    Noise { seed: u64 },
}

impl Source {
    pub fn oscillator(waveform: Waveform, frequency: f32) -> Self {
        Source::Oscillator {
            waveform,
            frequency: ParamAutomation::new(frequency),
            detune: 0.0,
        }
    }
}

/// Uniform white noise in [-1, 1), identical for a given seed
pub fn noise_samples(seed: u64, len: usize) -> Vec<f32> {
    let mut rng = Pcg32::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// One source -> filters -> gain chain, active from `start` to `stop`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub source: Source,
    pub filters: Vec<Filter>,
    pub gain: ParamAutomation,
    pub start: f64,
    pub stop: f64,
}

impl Voice {
    pub fn new(source: Source, start: f64, stop: f64) -> Self {
        Self {
            source,
            filters: Vec::new(),
            gain: ParamAutomation::new(1.0),
            start,
            stop,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn duration(&self) -> f64 {
        (self.stop - self.start).max(0.0)
    }

    /// Oscillator frequency automation, if this is an oscillator voice
    pub fn frequency_mut(&mut self) -> Option<&mut ParamAutomation> {
        match &mut self.source {
            Source::Oscillator { frequency, .. } => Some(frequency),
            Source::Noise { .. } => None,
        }
    }
}

/// A complete synthesized sound
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundGraph {
    pub voices: Vec<Voice>,
}

impl SoundGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    pub fn start(&self) -> f64 {
        self.voices.iter().map(|v| v.start).fold(f64::INFINITY, f64::min)
    }

    pub fn end(&self) -> f64 {
        self.voices.iter().map(|v| v.stop).fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Mix the graph to mono samples, starting at the earliest voice start
    pub fn render_offline(&self, sample_rate: u32) -> Vec<f32> {
        if self.voices.is_empty() || sample_rate == 0 {
            return Vec::new();
        }
        let origin = self.start();
        let len = ((self.end() - origin) * sample_rate as f64).ceil().max(0.0) as usize;
        let mut out = vec![0.0f32; len];

        for voice in &self.voices {
            render_voice(voice, origin, sample_rate, &mut out);
        }
        out
    }
}

fn render_voice(voice: &Voice, origin: f64, sample_rate: u32, out: &mut [f32]) {
    let rate = sample_rate as f64;
    let first = ((voice.start - origin) * rate).round().max(0.0) as usize;
    let last = (((voice.stop - origin) * rate).round().max(0.0) as usize).min(out.len());
    if first >= last {
        return;
    }

    let noise = match voice.source {
        Source::Noise { seed } => noise_samples(seed, last - first),
        Source::Oscillator { .. } => Vec::new(),
    };
    let mut filters: Vec<Biquad> = voice.filters.iter().map(|_| Biquad::default()).collect();
    let mut phase = 0.0f64;

    for (n, slot) in out[first..last].iter_mut().enumerate() {
        let t = origin + (first + n) as f64 / rate;

        let mut sample = match &voice.source {
            Source::Oscillator {
                waveform,
                frequency,
                detune,
            } => {
                let value = waveform.sample(phase);
                let hz = frequency.value_at(t) as f64 * 2f64.powf(*detune as f64 / 1200.0);
                phase += hz / rate;
                value
            }
            Source::Noise { .. } => noise[n],
        };

        for (state, filter) in filters.iter_mut().zip(&voice.filters) {
            let coeffs = BiquadCoefficients::new(
                filter.kind,
                filter.frequency.value_at(t),
                filter.q,
                filter.gain_db,
                sample_rate,
            );
            sample = state.process(&coeffs, sample);
        }

        *slot += sample * voice.gain.value_at(t);
    }
}

/// Normalized biquad coefficients (a0 = 1), RBJ cookbook formulas
#[derive(Debug, Clone, Copy)]
struct BiquadCoefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoefficients {
    fn new(kind: FilterKind, frequency: f32, q: f32, gain_db: f32, sample_rate: u32) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let w0 = std::f32::consts::TAU * frequency.clamp(1.0, nyquist * 0.99) / sample_rate as f32;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q.max(1e-4));

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::Lowpass => (
                (1.0 - cos) / 2.0,
                1.0 - cos,
                (1.0 - cos) / 2.0,
                1.0 + alpha,
                -2.0 * cos,
                1.0 - alpha,
            ),
            FilterKind::Highpass => (
                (1.0 + cos) / 2.0,
                -(1.0 + cos),
                (1.0 + cos) / 2.0,
                1.0 + alpha,
                -2.0 * cos,
                1.0 - alpha,
            ),
            FilterKind::Bandpass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos, 1.0 - alpha),
            FilterKind::Peaking => {
                let a = 10f32.powf(gain_db / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos,
                    1.0 - alpha / a,
                )
            }
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Direct form I filter state
#[derive(Debug, Clone, Copy, Default)]
struct Biquad {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    fn process(&mut self, c: &BiquadCoefficients, x: f32) -> f32 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}
