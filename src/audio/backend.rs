//! Audio device abstraction
//!
//! The manager, music player and voice channel talk to an `AudioBackend`
//! rather than to Web Audio directly. `HeadlessBackend` keeps time by hand and
//! records what would have played; it backs the native build and the tests.

use std::collections::{BTreeMap, BTreeSet};

use super::graph::SoundGraph;
use super::{AudioError, Result};

/// Mixer bus; every bus feeds the master gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bus {
    Music,
    Sfx,
    Voice,
}

impl Bus {
    pub const ALL: [Bus; 3] = [Bus::Music, Bus::Sfx, Bus::Voice];

    pub fn index(self) -> usize {
        match self {
            Bus::Music => 0,
            Bus::Sfx => 1,
            Bus::Voice => 2,
        }
    }
}

/// Handle to a playing buffer source
pub type SourceId = u64;
/// Handle to a decoded buffer
pub type BufferId = u64;
/// Handle to an in-flight load request
pub type LoadId = u64;

/// Outcome of an asynchronous load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult {
    Ready {
        request: LoadId,
        buffer: BufferId,
        /// Seconds
        duration: f64,
    },
    Failed {
        request: LoadId,
        error: AudioError,
    },
}

impl LoadResult {
    pub fn request(&self) -> LoadId {
        match self {
            LoadResult::Ready { request, .. } | LoadResult::Failed { request, .. } => *request,
        }
    }
}

pub trait AudioBackend {
    /// Device clock in seconds
    fn current_time(&self) -> f64;

    /// Start (or resume) the device after a user gesture
    fn resume(&mut self) -> Result<()>;

    fn set_master_gain(&mut self, value: f32);

    /// Current gain of a bus
    fn bus_gain(&self, bus: Bus) -> f32;

    /// Jump a bus gain to `value` at time `at`
    fn set_bus_gain(&mut self, bus: Bus, value: f32, at: f64);

    /// Linear ramp of a bus gain from `from` at `start` to `to` at `end`
    fn ramp_bus_gain(&mut self, bus: Bus, from: f32, to: f32, start: f64, end: f64);

    /// Schedule every voice of `graph` on `bus`
    fn play_graph(&mut self, graph: &SoundGraph, bus: Bus) -> Result<()>;

    /// Begin fetching and decoding `path`; completion shows up in `poll_loads`
    fn request_load(&mut self, path: &str) -> LoadId;

    /// Drain finished loads
    fn poll_loads(&mut self) -> Vec<LoadResult>;

    /// Play a decoded buffer on `bus` from time `when`. Each decoded buffer
    /// plays once; the backend drops it afterwards.
    fn start_buffer(&mut self, bus: Bus, buffer: BufferId, when: f64) -> Result<SourceId>;

    /// Stop a buffer source. Stopping an unknown or already stopped source is
    /// a no-op.
    fn stop_source(&mut self, source: SourceId);

    /// Buffer sources on `bus` that are still playing
    fn active_sources(&self, bus: Bus) -> usize;
}

/// Lets the platform pick a backend at runtime
impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn resume(&mut self) -> Result<()> {
        (**self).resume()
    }

    fn set_master_gain(&mut self, value: f32) {
        (**self).set_master_gain(value)
    }

    fn bus_gain(&self, bus: Bus) -> f32 {
        (**self).bus_gain(bus)
    }

    fn set_bus_gain(&mut self, bus: Bus, value: f32, at: f64) {
        (**self).set_bus_gain(bus, value, at)
    }

    fn ramp_bus_gain(&mut self, bus: Bus, from: f32, to: f32, start: f64, end: f64) {
        (**self).ramp_bus_gain(bus, from, to, start, end)
    }

    fn play_graph(&mut self, graph: &SoundGraph, bus: Bus) -> Result<()> {
        (**self).play_graph(graph, bus)
    }

    fn request_load(&mut self, path: &str) -> LoadId {
        (**self).request_load(path)
    }

    fn poll_loads(&mut self) -> Vec<LoadResult> {
        (**self).poll_loads()
    }

    fn start_buffer(&mut self, bus: Bus, buffer: BufferId, when: f64) -> Result<SourceId> {
        (**self).start_buffer(bus, buffer, when)
    }

    fn stop_source(&mut self, source: SourceId) {
        (**self).stop_source(source)
    }

    fn active_sources(&self, bus: Bus) -> usize {
        (**self).active_sources(bus)
    }
}

#[derive(Debug, Clone)]
struct HeadlessSource {
    bus: Bus,
    ends_at: f64,
    stopped: bool,
}

/// Rate effects are mixed at to measure their level
pub const HEADLESS_SAMPLE_RATE: u32 = 8000;

/// Backend without a device: time advances only when told to
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    time: f64,
    resumed: bool,
    /// Refuse `resume` (simulates a blocked autoplay policy)
    pub deny_resume: bool,
    master_gain: f32,
    bus_gains: [f32; 3],
    /// Duration given to every successfully loaded buffer
    pub track_duration: f64,
    failing_paths: BTreeSet<String>,
    pending: Vec<(LoadId, String)>,
    buffers: BTreeMap<BufferId, f64>,
    sources: BTreeMap<SourceId, HeadlessSource>,
    graphs_played: [usize; 3],
    /// Loudest sample each bus has produced, after bus and master gain
    peaks: [f32; 3],
    ramps: usize,
    next_id: u64,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            resumed: false,
            deny_resume: false,
            master_gain: 1.0,
            bus_gains: [1.0; 3],
            track_duration: 120.0,
            failing_paths: BTreeSet::new(),
            pending: Vec::new(),
            buffers: BTreeMap::new(),
            sources: BTreeMap::new(),
            graphs_played: [0; 3],
            peaks: [0.0; 3],
            ramps: 0,
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Move the clock forward
    pub fn advance(&mut self, seconds: f64) {
        self.time += seconds.max(0.0);
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Make every load of `path` fail
    pub fn fail_path(&mut self, path: &str) {
        self.failing_paths.insert(path.to_string());
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn graphs_played(&self, bus: Bus) -> usize {
        self.graphs_played[bus.index()]
    }

    /// Loudest output sample of any effect played on `bus`
    pub fn peak_level(&self, bus: Bus) -> f32 {
        self.peaks[bus.index()]
    }

    /// Gain ramps scheduled so far
    pub fn ramp_count(&self) -> usize {
        self.ramps
    }

    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }
}

impl AudioBackend for HeadlessBackend {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn resume(&mut self) -> Result<()> {
        if self.deny_resume {
            return Err(AudioError::ContextUnavailable);
        }
        self.resumed = true;
        Ok(())
    }

    fn set_master_gain(&mut self, value: f32) {
        self.master_gain = value;
    }

    fn bus_gain(&self, bus: Bus) -> f32 {
        self.bus_gains[bus.index()]
    }

    fn set_bus_gain(&mut self, bus: Bus, value: f32, _at: f64) {
        self.bus_gains[bus.index()] = value;
    }

    fn ramp_bus_gain(&mut self, bus: Bus, _from: f32, to: f32, _start: f64, _end: f64) {
        // No device to interpolate on; report the target
        self.bus_gains[bus.index()] = to;
        self.ramps += 1;
    }

    fn play_graph(&mut self, graph: &SoundGraph, bus: Bus) -> Result<()> {
        if !self.resumed {
            return Err(AudioError::ContextUnavailable);
        }
        if graph.is_empty() {
            return Ok(());
        }
        let gain = self.bus_gains[bus.index()] * self.master_gain;
        let peak = graph
            .render_offline(HEADLESS_SAMPLE_RATE)
            .iter()
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
            * gain;
        let slot = bus.index();
        self.peaks[slot] = self.peaks[slot].max(peak);
        self.graphs_played[slot] += 1;
        Ok(())
    }

    fn request_load(&mut self, path: &str) -> LoadId {
        let id = self.next_id();
        self.pending.push((id, path.to_string()));
        id
    }

    fn poll_loads(&mut self) -> Vec<LoadResult> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .map(|(request, path)| {
                if self.failing_paths.contains(&path) {
                    LoadResult::Failed {
                        request,
                        error: AudioError::Load {
                            path,
                            reason: "not found".to_string(),
                        },
                    }
                } else {
                    let buffer = self.next_id();
                    self.buffers.insert(buffer, self.track_duration);
                    LoadResult::Ready {
                        request,
                        buffer,
                        duration: self.track_duration,
                    }
                }
            })
            .collect()
    }

    fn start_buffer(&mut self, bus: Bus, buffer: BufferId, when: f64) -> Result<SourceId> {
        let duration = self
            .buffers
            .remove(&buffer)
            .ok_or(AudioError::UnknownBuffer(buffer))?;
        let id = self.next_id();
        self.sources.insert(
            id,
            HeadlessSource {
                bus,
                ends_at: when.max(self.time) + duration,
                stopped: false,
            },
        );
        Ok(id)
    }

    fn stop_source(&mut self, source: SourceId) {
        if let Some(source) = self.sources.get_mut(&source) {
            source.stopped = true;
        }
    }

    fn active_sources(&self, bus: Bus) -> usize {
        self.sources
            .values()
            .filter(|s| s.bus == bus && !s.stopped && self.time < s.ends_at)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(backend: &mut HeadlessBackend, path: &str) -> BufferId {
        let request = backend.request_load(path);
        match backend.poll_loads().pop() {
            Some(LoadResult::Ready { request: r, buffer, .. }) if r == request => buffer,
            other => panic!("unexpected load result {other:?}"),
        }
    }

    #[test]
    fn test_effects_record_peak_level() {
        use crate::audio::graph::{Source, Voice, Waveform};

        let mut graph = SoundGraph::new();
        graph.push(Voice::new(Source::oscillator(Waveform::Square, 220.0), 0.0, 0.25));

        let mut backend = HeadlessBackend::new();
        backend.resume().unwrap();
        backend.set_master_gain(0.5);
        backend.play_graph(&graph, Bus::Sfx).unwrap();
        let loud = backend.peak_level(Bus::Sfx);
        assert!(loud > 0.25 && loud <= 0.5, "peak {loud}");
        assert_eq!(backend.peak_level(Bus::Music), 0.0);

        // A silenced bus still counts the effect but adds no level
        backend.set_bus_gain(Bus::Voice, 0.0, 0.0);
        backend.play_graph(&graph, Bus::Voice).unwrap();
        assert_eq!(backend.graphs_played(Bus::Voice), 1);
        assert_eq!(backend.peak_level(Bus::Voice), 0.0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut backend = HeadlessBackend::new();
        let buffer = loaded(&mut backend, "a.mp3");
        let source = backend.start_buffer(Bus::Music, buffer, 0.0).unwrap();
        assert_eq!(backend.active_sources(Bus::Music), 1);

        backend.stop_source(source);
        backend.stop_source(source);
        backend.stop_source(9999);
        assert_eq!(backend.active_sources(Bus::Music), 0);
    }

    #[test]
    fn test_sources_end_naturally() {
        let mut backend = HeadlessBackend::new();
        backend.track_duration = 2.0;
        let buffer = loaded(&mut backend, "a.mp3");
        backend.start_buffer(Bus::Voice, buffer, 0.0).unwrap();
        backend.advance(1.0);
        assert_eq!(backend.active_sources(Bus::Voice), 1);
        backend.advance(1.5);
        assert_eq!(backend.active_sources(Bus::Voice), 0);
    }

    #[test]
    fn test_failed_loads_report_path() {
        let mut backend = HeadlessBackend::new();
        backend.fail_path("missing.mp3");
        let request = backend.request_load("missing.mp3");
        let results = backend.poll_loads();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].request(), request);
        assert!(matches!(results[0], LoadResult::Failed { .. }));
        assert!(backend.poll_loads().is_empty());
    }

    #[test]
    fn test_unknown_buffer_is_an_error() {
        let mut backend = HeadlessBackend::new();
        assert_eq!(
            backend.start_buffer(Bus::Music, 42, 0.0),
            Err(AudioError::UnknownBuffer(42))
        );
    }

    #[test]
    fn test_graphs_need_a_resumed_device() {
        let mut backend = HeadlessBackend::new();
        let mut graph = SoundGraph::new();
        graph.push(crate::audio::graph::Voice::new(
            crate::audio::graph::Source::Noise { seed: 1 },
            0.0,
            0.1,
        ));
        assert!(backend.play_graph(&graph, Bus::Sfx).is_err());

        backend.resume().unwrap();
        backend.play_graph(&graph, Bus::Sfx).unwrap();
        assert_eq!(backend.graphs_played(Bus::Sfx), 1);
    }

    #[test]
    fn test_boxed_backend_forwards() {
        let mut backend: Box<dyn AudioBackend> = Box::new(HeadlessBackend::new());
        backend.resume().unwrap();
        backend.set_bus_gain(Bus::Music, 0.3, 0.0);
        assert_eq!(backend.bus_gain(Bus::Music), 0.3);

        let request = backend.request_load("track.mp3");
        let loads = backend.poll_loads();
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].request(), request);
    }
}
