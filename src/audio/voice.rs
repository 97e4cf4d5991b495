//! Narration channel
//!
//! Voice clips play over the music on their own bus. While any clip is
//! playing the music bus is ducked, and once the last one has run its length
//! the music goes back to its configured level, whatever fade was in
//! progress when the first clip started.

use super::backend::{AudioBackend, Bus, LoadId, LoadResult, SourceId};

/// Music bus level while narration plays
pub const DUCK_LEVEL: f32 = 0.2;

#[derive(Debug, Clone, Default)]
pub struct VoiceChannel {
    pending: Vec<LoadId>,
    /// Playing clips and when they end (backend seconds)
    playing: Vec<(SourceId, f64)>,
    /// Music level to restore; set while ducked
    restore_level: Option<f32>,
}

impl VoiceChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a clip; it starts as soon as it has loaded
    pub fn play<B: AudioBackend>(&mut self, backend: &mut B, path: &str) -> LoadId {
        let request = backend.request_load(path);
        self.pending.push(request);
        request
    }

    pub fn is_ducking(&self) -> bool {
        self.restore_level.is_some()
    }

    pub fn is_playing(&self) -> bool {
        !self.playing.is_empty()
    }

    /// Change the level music returns to after ducking. Returns false when
    /// not ducked, in which case the caller should set the bus directly.
    pub fn set_restore_level(&mut self, level: f32) -> bool {
        match &mut self.restore_level {
            Some(restore) => {
                *restore = level;
                true
            }
            None => false,
        }
    }

    /// Feed a finished load. Returns false if it was not a voice clip.
    ///
    /// `music_level` is the level the music bus should sit at when nothing
    /// is ducking it; that is what gets restored afterwards.
    pub fn handle_load<B: AudioBackend>(
        &mut self,
        backend: &mut B,
        result: &LoadResult,
        music_level: f32,
    ) -> bool {
        let Some(slot) = self.pending.iter().position(|&r| r == result.request()) else {
            return false;
        };
        self.pending.swap_remove(slot);

        match result {
            LoadResult::Ready {
                buffer, duration, ..
            } => {
                let now = backend.current_time();
                match backend.start_buffer(Bus::Voice, *buffer, now) {
                    Ok(source) => {
                        self.duck(backend, now, music_level);
                        self.playing.push((source, now + duration));
                    }
                    Err(e) => log::warn!("Voice clip failed to start: {e}"),
                }
            }
            LoadResult::Failed { error, .. } => log::warn!("Voice clip failed to load: {error}"),
        }
        true
    }

    fn duck<B: AudioBackend>(&mut self, backend: &mut B, now: f64, music_level: f32) {
        if self.restore_level.is_none() {
            self.restore_level = Some(music_level);
            backend.set_bus_gain(Bus::Music, DUCK_LEVEL.min(music_level), now);
        }
    }

    /// Retire finished clips and un-duck once none remain
    pub fn update<B: AudioBackend>(&mut self, backend: &mut B) {
        let now = backend.current_time();
        let last_end = self.playing.iter().map(|&(_, end)| end).fold(now, f64::max);
        self.playing.retain(|&(_, ends_at)| ends_at > now);

        if self.playing.is_empty() {
            if let Some(level) = self.restore_level.take() {
                backend.set_bus_gain(Bus::Music, level, last_end);
            }
        }
    }

    /// Cut every clip and restore the music at once
    pub fn stop_all<B: AudioBackend>(&mut self, backend: &mut B) {
        for (source, _) in self.playing.drain(..) {
            backend.stop_source(source);
        }
        self.pending.clear();
        if let Some(level) = self.restore_level.take() {
            backend.set_bus_gain(Bus::Music, level, backend.current_time());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::HeadlessBackend;

    const MUSIC_LEVEL: f32 = 0.7;

    fn pump(voice: &mut VoiceChannel, backend: &mut HeadlessBackend) {
        for result in backend.poll_loads() {
            voice.handle_load(backend, &result, MUSIC_LEVEL);
        }
    }

    #[test]
    fn test_ducks_and_restores_prior_level() {
        let mut backend = HeadlessBackend::new();
        backend.track_duration = 1.5;
        backend.set_bus_gain(Bus::Music, 0.7, 0.0);

        let mut voice = VoiceChannel::new();
        voice.play(&mut backend, "howdy.mp3");
        pump(&mut voice, &mut backend);
        assert!(voice.is_ducking());
        assert_eq!(backend.bus_gain(Bus::Music), DUCK_LEVEL);

        backend.advance(1.0);
        voice.update(&mut backend);
        assert_eq!(backend.bus_gain(Bus::Music), DUCK_LEVEL);

        backend.advance(0.5);
        voice.update(&mut backend);
        assert!(!voice.is_ducking());
        assert_eq!(backend.bus_gain(Bus::Music), 0.7);
    }

    #[test]
    fn test_overlapping_clips_restore_after_last() {
        let mut backend = HeadlessBackend::new();
        backend.track_duration = 1.0;
        backend.set_bus_gain(Bus::Music, MUSIC_LEVEL, 0.0);

        let mut voice = VoiceChannel::new();
        voice.play(&mut backend, "one.mp3");
        pump(&mut voice, &mut backend);
        backend.advance(0.5);
        voice.play(&mut backend, "two.mp3");
        pump(&mut voice, &mut backend);

        backend.advance(0.6);
        voice.update(&mut backend);
        assert!(voice.is_ducking(), "second clip still playing");

        backend.advance(0.5);
        voice.update(&mut backend);
        assert_eq!(backend.bus_gain(Bus::Music), MUSIC_LEVEL);
    }

    #[test]
    fn test_volume_change_while_ducked() {
        let mut backend = HeadlessBackend::new();
        backend.track_duration = 1.0;
        let mut voice = VoiceChannel::new();
        assert!(!voice.set_restore_level(0.5));

        voice.play(&mut backend, "howdy.mp3");
        pump(&mut voice, &mut backend);
        assert!(voice.set_restore_level(0.5));

        backend.advance(1.0);
        voice.update(&mut backend);
        assert_eq!(backend.bus_gain(Bus::Music), 0.5);
    }

    #[test]
    fn test_failed_clip_does_not_duck() {
        let mut backend = HeadlessBackend::new();
        backend.fail_path("missing.mp3");
        let mut voice = VoiceChannel::new();
        voice.play(&mut backend, "missing.mp3");
        pump(&mut voice, &mut backend);
        assert!(!voice.is_ducking());
        assert_eq!(backend.bus_gain(Bus::Music), 1.0);
    }

    #[test]
    fn test_stop_all_restores() {
        let mut backend = HeadlessBackend::new();
        let mut voice = VoiceChannel::new();
        voice.play(&mut backend, "howdy.mp3");
        pump(&mut voice, &mut backend);
        voice.stop_all(&mut backend);
        assert_eq!(backend.active_sources(Bus::Voice), 0);
        assert_eq!(backend.bus_gain(Bus::Music), MUSIC_LEVEL);
    }

    #[test]
    fn test_restores_intended_level_not_live_gain() {
        let mut backend = HeadlessBackend::new();
        backend.track_duration = 1.0;
        // Partway through a fade-in
        backend.set_bus_gain(Bus::Music, 0.1, 0.0);

        let mut voice = VoiceChannel::new();
        voice.play(&mut backend, "howdy.mp3");
        pump(&mut voice, &mut backend);
        assert_eq!(backend.bus_gain(Bus::Music), DUCK_LEVEL);

        backend.advance(1.0);
        voice.update(&mut backend);
        assert_eq!(backend.bus_gain(Bus::Music), MUSIC_LEVEL);
    }
}
