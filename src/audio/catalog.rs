//! Sound definitions and their synthesis
//!
//! Every effect is described by a small `SoundDefinition` and turned into a
//! fresh [`SoundGraph`] each time it plays. Synthesis is a pure function of
//! the definition, the start time and the RNG (noise seeds, creak jitter).

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::envelope::{Envelope, apply_envelope};
use super::graph::{Filter, FilterKind, ParamAutomation, SoundGraph, Source, Voice, Waveform};
use crate::sim::GameEvent;
use crate::theme::SoundFlavor;

/// Synthesis recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundKind {
    /// Noise bang, delayed echo and a swept ricochet tone
    Gunshot,
    /// Inharmonic resonant partials
    MetallicPing,
    /// Jittery sawtooth sweep
    Creak,
    /// Smooth pitch sweep
    Whistle,
    /// Several notes, optionally staggered into an arpeggio
    Chord,
    /// Formant-filtered voice ("yeehaw")
    Vocal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundDefinition {
    pub kind: SoundKind,
    /// Start (or fundamental) frequency in Hz
    pub frequency: f32,
    /// Sweep target in Hz
    pub end_frequency: f32,
    /// Partial ratios (ping), note frequencies (chord) or formants (vocal)
    pub partials: Vec<f32>,
    pub waveform: Waveform,
    /// Seconds
    pub duration: f64,
    pub volume: f32,
    pub envelope: Envelope,
    /// Seconds between chord note onsets
    #[serde(default)]
    pub stagger: f64,
}

impl SoundDefinition {
    pub fn new(kind: SoundKind, frequency: f32, duration: f64, volume: f32) -> Self {
        Self {
            kind,
            frequency,
            end_frequency: frequency,
            partials: Vec::new(),
            waveform: Waveform::Sine,
            duration,
            volume,
            envelope: Envelope::default(),
            stagger: 0.0,
        }
    }

    pub fn sweep_to(mut self, end_frequency: f32) -> Self {
        self.end_frequency = end_frequency;
        self
    }

    pub fn partials(mut self, partials: &[f32]) -> Self {
        self.partials = partials.to_vec();
        self
    }

    pub fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn stagger(mut self, stagger: f64) -> Self {
        self.stagger = stagger;
        self
    }
}

/// Sounds the game asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoundEvent {
    GameStart,
    WallBounce,
    PaddleBounce,
    BrickBreak,
    CavityBrick,
    PowerUpDrop,
    PowerUpCollect,
    MultiBall,
    CavityEnter,
    BallLost,
    LevelComplete,
    GameOver,
}

impl SoundEvent {
    pub const ALL: [SoundEvent; 12] = [
        SoundEvent::GameStart,
        SoundEvent::WallBounce,
        SoundEvent::PaddleBounce,
        SoundEvent::BrickBreak,
        SoundEvent::CavityBrick,
        SoundEvent::PowerUpDrop,
        SoundEvent::PowerUpCollect,
        SoundEvent::MultiBall,
        SoundEvent::CavityEnter,
        SoundEvent::BallLost,
        SoundEvent::LevelComplete,
        SoundEvent::GameOver,
    ];

    /// The sound a simulation event makes, if any
    pub fn from_game_event(event: &GameEvent) -> Option<Self> {
        match *event {
            GameEvent::GameStarted => Some(SoundEvent::GameStart),
            GameEvent::WallHit => Some(SoundEvent::WallBounce),
            GameEvent::PaddleHit => Some(SoundEvent::PaddleBounce),
            GameEvent::BrickDestroyed { cavity: true, .. } => Some(SoundEvent::CavityBrick),
            GameEvent::BrickDestroyed { cavity: false, .. } => Some(SoundEvent::BrickBreak),
            GameEvent::PowerUpSpawned(_) => Some(SoundEvent::PowerUpDrop),
            GameEvent::PowerUpCollected(_) => Some(SoundEvent::PowerUpCollect),
            GameEvent::MultiBall { spawned } if spawned > 0 => Some(SoundEvent::MultiBall),
            GameEvent::CavityEntered => Some(SoundEvent::CavityEnter),
            GameEvent::BallLost => Some(SoundEvent::BallLost),
            GameEvent::LevelComplete { .. } => Some(SoundEvent::LevelComplete),
            GameEvent::GameOver { .. } => Some(SoundEvent::GameOver),
            GameEvent::Paused
            | GameEvent::Resumed
            | GameEvent::MultiBall { .. }
            | GameEvent::CavityLeft
            | GameEvent::LifeLost { .. } => None,
        }
    }
}

/// Definitions keyed by event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundCatalog {
    definitions: BTreeMap<SoundEvent, SoundDefinition>,
}

const BELL_PARTIALS: [f32; 4] = [1.0, 2.76, 5.40, 8.93];

impl SoundCatalog {
    pub fn for_flavor(flavor: SoundFlavor) -> Self {
        match flavor {
            SoundFlavor::Western => Self::western(),
            SoundFlavor::Classic => Self::classic(),
        }
    }

    /// Gunshots, spurs and yeehaws
    pub fn western() -> Self {
        use SoundKind::*;
        let definitions = BTreeMap::from([
            (
                SoundEvent::GameStart,
                SoundDefinition::new(Vocal, 220.0, 0.8, 0.5)
                    .sweep_to(330.0)
                    .partials(&[800.0, 1150.0, 2900.0])
                    .waveform(Waveform::Sawtooth)
                    .envelope(Envelope::new(0.1, 0.2, 0.7, 0.3)),
            ),
            (
                SoundEvent::WallBounce,
                SoundDefinition::new(MetallicPing, 1200.0, 0.15, 0.2)
                    .partials(&BELL_PARTIALS[..3])
                    .waveform(Waveform::Triangle)
                    .envelope(Envelope::percussive()),
            ),
            (
                SoundEvent::PaddleBounce,
                SoundDefinition::new(Creak, 180.0, 0.2, 0.35)
                    .sweep_to(120.0)
                    .waveform(Waveform::Sawtooth)
                    .envelope(Envelope::percussive()),
            ),
            (
                SoundEvent::BrickBreak,
                SoundDefinition::new(Gunshot, 2400.0, 0.5, 0.5)
                    .sweep_to(600.0)
                    .envelope(Envelope::percussive()),
            ),
            (
                SoundEvent::CavityBrick,
                SoundDefinition::new(MetallicPing, 1800.0, 0.4, 0.35)
                    .partials(&BELL_PARTIALS)
                    .envelope(Envelope::percussive()),
            ),
            (
                SoundEvent::PowerUpDrop,
                SoundDefinition::new(Whistle, 1200.0, 0.4, 0.25).sweep_to(600.0),
            ),
            (
                SoundEvent::PowerUpCollect,
                SoundDefinition::new(Whistle, 700.0, 0.3, 0.3).sweep_to(1600.0),
            ),
            (
                SoundEvent::MultiBall,
                SoundDefinition::new(Chord, 392.0, 0.6, 0.3)
                    .partials(&[392.0, 493.88, 587.33])
                    .waveform(Waveform::Triangle)
                    .stagger(0.05),
            ),
            (
                SoundEvent::CavityEnter,
                SoundDefinition::new(Chord, 523.25, 0.8, 0.3)
                    .partials(&[523.25, 659.25, 783.99, 1046.5])
                    .waveform(Waveform::Triangle)
                    .stagger(0.06),
            ),
            (
                SoundEvent::BallLost,
                SoundDefinition::new(Creak, 300.0, 0.7, 0.4)
                    .sweep_to(80.0)
                    .waveform(Waveform::Sawtooth),
            ),
            (
                SoundEvent::LevelComplete,
                SoundDefinition::new(Chord, 261.63, 1.2, 0.35)
                    .partials(&[261.63, 329.63, 392.0, 523.25])
                    .waveform(Waveform::Triangle)
                    .envelope(Envelope::pad())
                    .stagger(0.15),
            ),
            (
                SoundEvent::GameOver,
                SoundDefinition::new(Vocal, 180.0, 1.2, 0.45)
                    .sweep_to(140.0)
                    .partials(&[700.0, 1100.0, 2600.0])
                    .waveform(Waveform::Sawtooth)
                    .envelope(Envelope::pad()),
            ),
        ]);
        Self { definitions }
    }

    /// Plain arcade bleeps
    pub fn classic() -> Self {
        use SoundKind::*;
        let bleep = |from: f32, to: f32, duration: f64| {
            SoundDefinition::new(Whistle, from, duration, 0.25)
                .sweep_to(to)
                .waveform(Waveform::Square)
                .envelope(Envelope::percussive())
        };
        let definitions = BTreeMap::from([
            (
                SoundEvent::GameStart,
                SoundDefinition::new(Chord, 523.25, 0.5, 0.3)
                    .partials(&[523.25, 659.25, 783.99])
                    .waveform(Waveform::Square)
                    .stagger(0.08),
            ),
            (SoundEvent::WallBounce, bleep(440.0, 440.0, 0.06)),
            (SoundEvent::PaddleBounce, bleep(220.0, 220.0, 0.08)),
            (SoundEvent::BrickBreak, bleep(660.0, 880.0, 0.1)),
            (
                SoundEvent::CavityBrick,
                SoundDefinition::new(MetallicPing, 1320.0, 0.25, 0.3)
                    .partials(&BELL_PARTIALS[..2])
                    .waveform(Waveform::Square)
                    .envelope(Envelope::percussive()),
            ),
            (SoundEvent::PowerUpDrop, bleep(880.0, 440.0, 0.2)),
            (SoundEvent::PowerUpCollect, bleep(440.0, 1320.0, 0.2)),
            (
                SoundEvent::MultiBall,
                SoundDefinition::new(Chord, 440.0, 0.4, 0.3)
                    .partials(&[440.0, 554.37, 659.25])
                    .waveform(Waveform::Square)
                    .stagger(0.04),
            ),
            (SoundEvent::CavityEnter, bleep(523.25, 1046.5, 0.3)),
            (SoundEvent::BallLost, bleep(330.0, 110.0, 0.5)),
            (
                SoundEvent::LevelComplete,
                SoundDefinition::new(Chord, 261.63, 1.0, 0.3)
                    .partials(&[261.63, 329.63, 392.0, 523.25])
                    .waveform(Waveform::Square)
                    .stagger(0.12),
            ),
            (
                SoundEvent::GameOver,
                SoundDefinition::new(Chord, 220.0, 1.2, 0.3)
                    .partials(&[440.0, 349.23, 293.66, 220.0])
                    .waveform(Waveform::Square)
                    .envelope(Envelope::pad())
                    .stagger(0.25),
            ),
        ]);
        Self { definitions }
    }

    pub fn get(&self, event: SoundEvent) -> Option<&SoundDefinition> {
        self.definitions.get(&event)
    }

    /// Replace (or add) one definition
    pub fn insert(&mut self, event: SoundEvent, definition: SoundDefinition) {
        self.definitions.insert(event, definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Build the graph for one play of `def` starting at `start` (backend seconds)
pub fn synthesize<R: Rng + ?Sized>(def: &SoundDefinition, start: f64, rng: &mut R) -> SoundGraph {
    let mut graph = SoundGraph::new();
    if def.duration <= 0.0 || def.volume <= 0.0 {
        return graph;
    }

    match def.kind {
        SoundKind::Gunshot => gunshot(&mut graph, def, start, rng),
        SoundKind::MetallicPing => metallic_ping(&mut graph, def, start),
        SoundKind::Creak => creak(&mut graph, def, start, rng),
        SoundKind::Whistle => whistle(&mut graph, def, start),
        SoundKind::Chord => chord(&mut graph, def, start),
        SoundKind::Vocal => vocal(&mut graph, def, start),
    }
    graph
}

fn gunshot<R: Rng + ?Sized>(graph: &mut SoundGraph, def: &SoundDefinition, start: f64, rng: &mut R) {
    let d = def.duration;

    // Bang: bright noise closing down fast
    let bang_len = d * 0.4;
    let mut filter = Filter::new(FilterKind::Lowpass, 4000.0, 1.0);
    filter
        .frequency
        .set_value_at(4000.0, start)
        .exponential_ramp_to(300.0, start + bang_len);
    let mut bang = Voice::new(Source::Noise { seed: rng.random() }, start, start + bang_len)
        .with_filter(filter);
    apply_envelope(&mut bang.gain, &Envelope::percussive(), start, bang_len, def.volume);
    graph.push(bang);

    // Echo off the canyon wall
    let echo_start = start + d * 0.25;
    let echo_len = d * 0.5;
    let mut echo = Voice::new(Source::Noise { seed: rng.random() }, echo_start, echo_start + echo_len)
        .with_filter(Filter::new(FilterKind::Lowpass, 1200.0, 0.7));
    apply_envelope(&mut echo.gain, &Envelope::percussive(), echo_start, echo_len, def.volume * 0.35);
    graph.push(echo);

    // Ricochet whine
    let ricochet_start = start + d * 0.1;
    let ricochet_len = d * 0.6;
    let mut ricochet = Voice::new(
        Source::oscillator(Waveform::Sine, def.frequency),
        ricochet_start,
        ricochet_start + ricochet_len,
    );
    if let Some(freq) = ricochet.frequency_mut() {
        freq.set_value_at(def.frequency, ricochet_start)
            .exponential_ramp_to(def.end_frequency, ricochet_start + ricochet_len);
    }
    apply_envelope(
        &mut ricochet.gain,
        &def.envelope,
        ricochet_start,
        ricochet_len,
        def.volume * 0.25,
    );
    graph.push(ricochet);
}

fn metallic_ping(graph: &mut SoundGraph, def: &SoundDefinition, start: f64) {
    let stop = start + def.duration;
    let ratios: &[f32] = if def.partials.is_empty() { &[1.0] } else { &def.partials };

    for (i, ratio) in ratios.iter().enumerate() {
        let hz = def.frequency * ratio;
        let mut voice = Voice::new(Source::oscillator(def.waveform, hz), start, stop)
            .with_filter(Filter::new(FilterKind::Bandpass, hz, 25.0));
        // Higher partials ring quieter and shorter
        let len = def.duration / (1.0 + i as f64 * 0.5);
        apply_envelope(&mut voice.gain, &def.envelope, start, len, def.volume / (i + 1) as f32);
        voice.stop = start + len;
        graph.push(voice);
    }
}

fn creak<R: Rng + ?Sized>(graph: &mut SoundGraph, def: &SoundDefinition, start: f64, rng: &mut R) {
    const STEPS: usize = 8;
    let stop = start + def.duration;
    let mut voice = Voice::new(Source::oscillator(def.waveform, def.frequency), start, stop)
        .with_filter(Filter::new(FilterKind::Lowpass, 1500.0, 2.0));

    if let Some(freq) = voice.frequency_mut() {
        for step in 0..STEPS {
            let k = step as f32 / STEPS as f32;
            let base = def.frequency + (def.end_frequency - def.frequency) * k;
            let jitter = 1.0 + rng.random_range(-0.15..0.15);
            freq.set_value_at(base * jitter, start + def.duration * k as f64);
        }
        freq.linear_ramp_to(def.end_frequency, stop);
    }
    apply_envelope(&mut voice.gain, &def.envelope, start, def.duration, def.volume);
    graph.push(voice);
}

fn whistle(graph: &mut SoundGraph, def: &SoundDefinition, start: f64) {
    let stop = start + def.duration;
    let mut voice = Voice::new(Source::oscillator(def.waveform, def.frequency), start, stop);
    if let Some(freq) = voice.frequency_mut() {
        freq.set_value_at(def.frequency, start)
            .exponential_ramp_to(def.end_frequency, stop);
    }
    apply_envelope(&mut voice.gain, &def.envelope, start, def.duration, def.volume);
    graph.push(voice);
}

fn chord(graph: &mut SoundGraph, def: &SoundDefinition, start: f64) {
    let notes: &[f32] = if def.partials.is_empty() {
        std::slice::from_ref(&def.frequency)
    } else {
        &def.partials
    };
    let stop = start + def.duration;
    let peak = def.volume / notes.len() as f32;

    for (i, &hz) in notes.iter().enumerate() {
        let onset = (start + def.stagger * i as f64).min(stop);
        if onset >= stop {
            break;
        }
        let mut voice = Voice::new(Source::oscillator(def.waveform, hz), onset, stop);
        apply_envelope(&mut voice.gain, &def.envelope, onset, stop - onset, peak);
        graph.push(voice);
    }
}

fn vocal(graph: &mut SoundGraph, def: &SoundDefinition, start: f64) {
    let stop = start + def.duration;
    let formants: &[f32] = if def.partials.is_empty() { &[800.0] } else { &def.partials };

    for (i, &formant) in formants.iter().enumerate() {
        // Spread the copies apart a few cents each for a chorus
        let spread = (i as f32 + 1.0) * 4.0;
        let detune = if i % 2 == 0 { spread } else { -spread };

        let mut voice = Voice::new(
            Source::Oscillator {
                waveform: def.waveform,
                frequency: ParamAutomation::new(def.frequency),
                detune,
            },
            start,
            stop,
        )
        .with_filter(Filter::new(FilterKind::Bandpass, formant, 8.0));

        if let Some(freq) = voice.frequency_mut() {
            // "Yee" rises to the target pitch, "haw" falls away
            freq.set_value_at(def.frequency, start)
                .linear_ramp_to(def.end_frequency, start + def.duration * 0.4)
                .linear_ramp_to(def.frequency * 0.9, stop);
        }
        apply_envelope(
            &mut voice.gain,
            &def.envelope,
            start,
            def.duration,
            def.volume / (i + 1) as f32,
        );
        graph.push(voice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::graph::ParamEvent;
    use crate::sim::PowerUpType;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_catalogs_cover_every_event() {
        for catalog in [SoundCatalog::western(), SoundCatalog::classic()] {
            for event in SoundEvent::ALL {
                assert!(catalog.get(event).is_some(), "{event:?}");
            }
        }
    }

    #[test]
    fn test_game_event_mapping() {
        assert_eq!(
            SoundEvent::from_game_event(&GameEvent::BrickDestroyed {
                cavity: true,
                chained: false
            }),
            Some(SoundEvent::CavityBrick)
        );
        assert_eq!(
            SoundEvent::from_game_event(&GameEvent::PowerUpCollected(PowerUpType::Slow)),
            Some(SoundEvent::PowerUpCollect)
        );
        assert_eq!(
            SoundEvent::from_game_event(&GameEvent::MultiBall { spawned: 0 }),
            None
        );
        assert_eq!(SoundEvent::from_game_event(&GameEvent::Paused), None);
    }

    #[test]
    fn test_gunshot_layers() {
        let catalog = SoundCatalog::western();
        let def = catalog.get(SoundEvent::BrickBreak).unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        let graph = synthesize(def, 10.0, &mut rng);

        assert_eq!(graph.voices.len(), 3);
        assert!(matches!(graph.voices[0].source, Source::Noise { .. }));
        assert!(matches!(graph.voices[1].source, Source::Noise { .. }));
        assert!(graph.voices[1].start > graph.voices[0].start, "echo is delayed");
        assert!(matches!(graph.voices[2].source, Source::Oscillator { .. }));
        assert_eq!(graph.start(), 10.0);
        assert!(graph.end() <= 10.0 + def.duration + 1e-9);
    }

    #[test]
    fn test_vocal_formants_are_detuned_and_peaked() {
        let catalog = SoundCatalog::western();
        let def = catalog.get(SoundEvent::GameStart).unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        let graph = synthesize(def, 0.0, &mut rng);

        assert_eq!(graph.voices.len(), def.partials.len());
        let mut detunes = Vec::new();
        for (voice, formant) in graph.voices.iter().zip(&def.partials) {
            assert_eq!(voice.filters.len(), 1);
            assert_eq!(voice.filters[0].kind, FilterKind::Bandpass);
            assert_eq!(voice.filters[0].frequency.default, *formant);
            if let Source::Oscillator { detune, .. } = voice.source {
                detunes.push(detune);
            }
        }
        detunes.dedup();
        assert_eq!(detunes.len(), def.partials.len());
    }

    #[test]
    fn test_synthesis_is_pure_given_rng() {
        let catalog = SoundCatalog::western();
        let def = catalog.get(SoundEvent::BallLost).unwrap();
        let a = synthesize(def, 2.0, &mut Pcg32::seed_from_u64(5));
        let b = synthesize(def, 2.0, &mut Pcg32::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_chord_stagger() {
        let def = SoundDefinition::new(SoundKind::Chord, 0.0, 1.0, 0.6)
            .partials(&[200.0, 300.0, 400.0])
            .stagger(0.1);
        let graph = synthesize(&def, 0.0, &mut Pcg32::seed_from_u64(0));
        let onsets: Vec<f64> = graph.voices.iter().map(|v| v.start).collect();
        assert_eq!(onsets, vec![0.0, 0.1, 0.2]);
        assert!(graph.voices.iter().all(|v| v.stop == 1.0));
    }

    #[test]
    fn test_whistle_sweeps() {
        let def = SoundDefinition::new(SoundKind::Whistle, 500.0, 0.5, 0.3).sweep_to(1000.0);
        let graph = synthesize(&def, 0.0, &mut Pcg32::seed_from_u64(0));
        let Source::Oscillator { frequency, .. } = &graph.voices[0].source else {
            panic!("whistle is an oscillator");
        };
        assert_eq!(
            frequency.events().last(),
            Some(&ParamEvent::Exponential {
                value: 1000.0,
                time: 0.5
            })
        );
    }

    #[test]
    fn test_silent_definition_yields_empty_graph() {
        let def = SoundDefinition::new(SoundKind::Whistle, 500.0, 0.5, 0.0);
        assert!(synthesize(&def, 0.0, &mut Pcg32::seed_from_u64(0)).is_empty());
    }

    #[test]
    fn test_rendered_sound_is_audible_and_bounded() {
        let catalog = SoundCatalog::western();
        let mut rng = Pcg32::seed_from_u64(9);
        for event in SoundEvent::ALL {
            let def = catalog.get(event).unwrap();
            let samples = synthesize(def, 0.0, &mut rng).render_offline(8000);
            assert!(!samples.is_empty(), "{event:?}");
            assert!(samples.iter().any(|s| s.abs() > 1e-4), "{event:?} is silent");
            assert!(samples.iter().all(|s| s.is_finite()), "{event:?}");
        }
    }
}
