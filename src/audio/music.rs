//! Background music playlist
//!
//! Tracks are streamed files played strictly one at a time, in order,
//! wrapping around. At most one music source exists: any path that starts a
//! track stops the previous source first.

use super::backend::{AudioBackend, Bus, LoadId, LoadResult, SourceId};

/// Linear fade applied to the very first track only
pub const FADE_IN_SECS: f64 = 3.0;
/// Silence between a track ending and the next one loading
pub const TRACK_GAP_SECS: f64 = 2.0;
/// Wait after a failed load before trying the next track
pub const RETRY_BACKOFF_SECS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MusicState {
    Stopped,
    Loading { request: LoadId, index: usize },
    Playing { index: usize, ends_at: f64 },
    /// Gap or backoff before loading `index`
    Waiting { until: f64, index: usize },
}

#[derive(Debug, Clone)]
pub struct MusicPlayer {
    tracks: Vec<String>,
    current_index: usize,
    state: MusicState,
    current_source: Option<SourceId>,
    /// Whether any track has ever started
    started_once: bool,
    /// Music bus level the fade-in ramps to
    volume: f32,
}

impl MusicPlayer {
    pub fn new(tracks: Vec<String>) -> Self {
        Self {
            tracks,
            current_index: 0,
            state: MusicState::Stopped,
            current_source: None,
            started_once: false,
            volume: 1.0,
        }
    }

    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&str> {
        self.tracks.get(self.current_index).map(String::as_str)
    }

    pub fn state(&self) -> MusicState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, MusicState::Playing { .. })
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn next_index(&self, index: usize) -> usize {
        if self.tracks.is_empty() {
            0
        } else {
            (index + 1) % self.tracks.len()
        }
    }

    /// Begin the playlist at the current index (no-op if already running)
    pub fn start<B: AudioBackend>(&mut self, backend: &mut B) {
        if self.tracks.is_empty() {
            log::warn!("No music tracks configured");
            return;
        }
        if self.state == MusicState::Stopped {
            self.load(backend, self.current_index);
        }
    }

    /// Stop playback and forget any pending load or timer
    pub fn stop<B: AudioBackend>(&mut self, backend: &mut B) {
        self.stop_current(backend);
        self.state = MusicState::Stopped;
    }

    /// Cut the current track immediately and move to the next one
    pub fn skip<B: AudioBackend>(&mut self, backend: &mut B) {
        if self.tracks.is_empty() {
            return;
        }
        self.stop_current(backend);
        let next = self.next_index(self.current_index);
        if self.state == MusicState::Stopped {
            self.current_index = next;
        } else {
            log::debug!("Skipping to track {next}");
            self.load(backend, next);
        }
    }

    fn stop_current<B: AudioBackend>(&mut self, backend: &mut B) {
        if let Some(source) = self.current_source.take() {
            backend.stop_source(source);
        }
    }

    fn load<B: AudioBackend>(&mut self, backend: &mut B, index: usize) {
        let Some(path) = self.tracks.get(index) else {
            return;
        };
        let request = backend.request_load(path);
        self.current_index = index;
        self.state = MusicState::Loading { request, index };
    }

    /// Feed a finished load. Returns false if the load was not ours (or is
    /// stale after a skip). While `ducked`, the voice channel owns the music
    /// bus gain and the first-track fade is skipped.
    pub fn handle_load<B: AudioBackend>(
        &mut self,
        backend: &mut B,
        result: &LoadResult,
        ducked: bool,
    ) -> bool {
        let MusicState::Loading { request, index } = self.state else {
            return false;
        };
        if result.request() != request {
            return false;
        }

        let now = backend.current_time();
        match result {
            LoadResult::Ready {
                buffer, duration, ..
            } => {
                // Never two music sources at once
                self.stop_current(backend);
                match backend.start_buffer(Bus::Music, *buffer, now) {
                    Ok(source) => {
                        self.current_source = Some(source);
                        self.state = MusicState::Playing {
                            index,
                            ends_at: now + duration,
                        };
                        if !self.started_once {
                            if !ducked {
                                backend.ramp_bus_gain(Bus::Music, 0.0, self.volume, now, now + FADE_IN_SECS);
                            }
                            self.started_once = true;
                        }
                        log::info!("Playing track {index}: {}", self.tracks[index]);
                    }
                    Err(e) => self.back_off(index, now, &e),
                }
            }
            LoadResult::Failed { error, .. } => self.back_off(index, now, error),
        }
        true
    }

    fn back_off(&mut self, index: usize, now: f64, error: &dyn std::fmt::Display) {
        log::warn!("Music track {index} failed ({error}), trying the next one");
        self.state = MusicState::Waiting {
            until: now + RETRY_BACKOFF_SECS,
            index: self.next_index(index),
        };
    }

    /// Advance timers: natural track end, gaps and retry backoff
    pub fn update<B: AudioBackend>(&mut self, backend: &mut B) {
        let now = backend.current_time();
        match self.state {
            MusicState::Playing { index, ends_at } if now >= ends_at => {
                self.stop_current(backend);
                self.state = MusicState::Waiting {
                    until: now + TRACK_GAP_SECS,
                    index: self.next_index(index),
                };
            }
            MusicState::Waiting { until, index } if now >= until => self.load(backend, index),
            _ => {}
        }
    }
}
