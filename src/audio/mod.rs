//! Procedural audio
//!
//! Sound effects are synthesized from definitions (no sample assets); only
//! music and voice clips are streamed files. `AudioManager` is an explicit
//! service owned by the composition root and handed the game's events.

pub mod backend;
pub mod catalog;
pub mod envelope;
pub mod graph;
pub mod music;
pub mod voice;
#[cfg(target_arch = "wasm32")]
pub mod web;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use thiserror::Error;

pub use backend::{AudioBackend, BufferId, Bus, HeadlessBackend, LoadId, LoadResult, SourceId};
pub use catalog::{SoundCatalog, SoundDefinition, SoundEvent, SoundKind, synthesize};
pub use envelope::{Envelope, apply_envelope};
pub use graph::{ParamAutomation, SoundGraph};
pub use music::{MusicPlayer, MusicState};
pub use voice::VoiceChannel;

use crate::settings::Settings;
use crate::sim::GameEvent;
use crate::theme::Theme;

/// Audio errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No audio device, or the browser refused to start one
    #[error("audio context unavailable")]
    ContextUnavailable,

    /// The device refused to create a node
    #[error("failed to create {0} node")]
    NodeCreation(&'static str),

    /// Fetch or decode failure
    #[error("failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("unknown audio buffer {0}")]
    UnknownBuffer(BufferId),
}

/// Result type for audio operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Sound effects, music and narration behind one handle
pub struct AudioManager<B: AudioBackend> {
    backend: B,
    catalog: SoundCatalog,
    rng: Pcg32,
    /// Set by the first user gesture; until then nothing plays
    unlocked: bool,
    muted: bool,
    master_volume: f32,
    sfx_volume: f32,
    music_volume: f32,
    voice_volume: f32,
    music: MusicPlayer,
    /// Music asked for before unlock
    music_requested: bool,
    voice: VoiceChannel,
    voice_clips: Vec<String>,
}

impl<B: AudioBackend> AudioManager<B> {
    pub fn new(backend: B, theme: &Theme, seed: u64) -> Self {
        let music_volume = 0.7;
        let mut music = MusicPlayer::new(theme.music_tracks.clone());
        music.set_volume(music_volume);
        Self {
            backend,
            catalog: SoundCatalog::for_flavor(theme.sound_flavor),
            rng: Pcg32::seed_from_u64(seed),
            unlocked: false,
            muted: false,
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume,
            voice_volume: 1.0,
            music,
            music_requested: false,
            voice: VoiceChannel::new(),
            voice_clips: theme.voice_clips.clone(),
        }
    }

    /// Take volumes and mute state from user settings
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.set_master_volume(settings.master_volume);
        self.set_sfx_volume(settings.sfx_volume);
        self.set_music_volume(settings.music_volume);
        self.set_voice_volume(settings.voice_volume);
        self.set_muted(settings.muted);
    }

    /// Start the device. Call from a user gesture handler.
    pub fn unlock(&mut self) -> Result<()> {
        if self.unlocked {
            return Ok(());
        }
        self.backend.resume()?;
        self.unlocked = true;
        self.apply_gains();
        log::info!("Audio unlocked");

        if self.music_requested {
            self.music_requested = false;
            self.music.start(&mut self.backend);
        }
        Ok(())
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    fn apply_gains(&mut self) {
        let master = if self.muted { 0.0 } else { self.master_volume };
        self.backend.set_master_gain(master);
        let now = self.backend.current_time();
        self.backend.set_bus_gain(Bus::Sfx, self.sfx_volume, now);
        self.backend.set_bus_gain(Bus::Voice, self.voice_volume, now);
        if !self.voice.set_restore_level(self.music_volume) {
            self.backend.set_bus_gain(Bus::Music, self.music_volume, now);
        }
    }

    /// Play one effect now. Silently does nothing before unlock or while muted.
    pub fn play(&mut self, event: SoundEvent) {
        if !self.unlocked || self.muted {
            return;
        }
        let Some(definition) = self.catalog.get(event) else {
            return;
        };
        let graph = synthesize(definition, self.backend.current_time(), &mut self.rng);
        if let Err(e) = self.backend.play_graph(&graph, Bus::Sfx) {
            log::warn!("Failed to play {event:?}: {e}");
        }
    }

    /// Play whatever sounds a frame's events call for
    pub fn play_game_events(&mut self, events: &[GameEvent]) {
        for event in events.iter().filter_map(SoundEvent::from_game_event) {
            self.play(event);
        }
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
        if !self.muted {
            self.backend.set_master_gain(self.master_volume);
        }
    }

    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.sfx_volume = volume.clamp(0.0, 1.0);
        let now = self.backend.current_time();
        self.backend.set_bus_gain(Bus::Sfx, self.sfx_volume, now);
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.music_volume = volume.clamp(0.0, 1.0);
        self.music.set_volume(self.music_volume);
        if !self.voice.set_restore_level(self.music_volume) {
            let now = self.backend.current_time();
            self.backend.set_bus_gain(Bus::Music, self.music_volume, now);
        }
    }

    pub fn set_voice_volume(&mut self, volume: f32) {
        self.voice_volume = volume.clamp(0.0, 1.0);
        let now = self.backend.current_time();
        self.backend.set_bus_gain(Bus::Voice, self.voice_volume, now);
    }

    /// Mute zeroes the master gain; unmute restores the stored master volume
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        let gain = if muted { 0.0 } else { self.master_volume };
        self.backend.set_master_gain(gain);
    }

    /// Flip mute, returning the new state
    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn music_volume(&self) -> f32 {
        self.music_volume
    }

    /// Start the playlist (deferred until unlock)
    pub fn start_music(&mut self) {
        if self.unlocked {
            self.music.start(&mut self.backend);
        } else {
            self.music_requested = true;
        }
    }

    pub fn stop_music(&mut self) {
        self.music_requested = false;
        self.music.stop(&mut self.backend);
    }

    pub fn skip_track(&mut self) {
        if self.unlocked {
            self.music.skip(&mut self.backend);
        }
    }

    /// Play the theme's narration clip at `index`
    pub fn play_voice(&mut self, index: usize) -> Option<LoadId> {
        let path = self.voice_clips.get(index)?.clone();
        self.play_voice_clip(&path)
    }

    pub fn play_voice_clip(&mut self, path: &str) -> Option<LoadId> {
        if !self.unlocked || self.muted {
            return None;
        }
        Some(self.voice.play(&mut self.backend, path))
    }

    /// Once per frame: dispatch finished loads and run the music/voice timers
    pub fn update(&mut self) {
        if !self.unlocked {
            return;
        }
        for result in self.backend.poll_loads() {
            let ducked = self.voice.is_ducking();
            let claimed = self.music.handle_load(&mut self.backend, &result, ducked)
                || self.voice.handle_load(&mut self.backend, &result, self.music_volume);
            if !claimed {
                log::debug!("Dropping stale audio load {}", result.request());
            }
        }
        self.music.update(&mut self.backend);
        self.voice.update(&mut self.backend);
    }

    pub fn music(&self) -> &MusicPlayer {
        &self.music
    }

    pub fn voice(&self) -> &VoiceChannel {
        &self.voice
    }

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut SoundCatalog {
        &mut self.catalog
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> AudioManager<HeadlessBackend> {
        AudioManager::new(HeadlessBackend::new(), &Theme::western(), 1)
    }

    #[test]
    fn test_silent_until_unlocked() {
        let mut audio = manager();
        audio.play(SoundEvent::BrickBreak);
        assert_eq!(audio.backend().graphs_played(Bus::Sfx), 0);

        audio.unlock().unwrap();
        audio.play(SoundEvent::BrickBreak);
        assert_eq!(audio.backend().graphs_played(Bus::Sfx), 1);
    }

    #[test]
    fn test_blocked_unlock_stays_silent() {
        let mut backend = HeadlessBackend::new();
        backend.deny_resume = true;
        let mut audio = AudioManager::new(backend, &Theme::western(), 1);
        assert_eq!(audio.unlock(), Err(AudioError::ContextUnavailable));
        assert!(!audio.is_unlocked());
        audio.play(SoundEvent::WallBounce);
        assert_eq!(audio.backend().graphs_played(Bus::Sfx), 0);
    }

    #[test]
    fn test_mute_restores_master_volume() {
        let mut audio = manager();
        audio.unlock().unwrap();
        audio.set_master_volume(0.6);
        audio.set_muted(true);
        assert_eq!(audio.backend().master_gain(), 0.0);
        assert_eq!(audio.master_volume(), 0.6);

        audio.play(SoundEvent::WallBounce);
        assert_eq!(audio.backend().graphs_played(Bus::Sfx), 0);

        // Volume changes while muted are remembered, not applied
        audio.set_master_volume(0.4);
        assert_eq!(audio.backend().master_gain(), 0.0);

        assert!(!audio.toggle_mute());
        assert_eq!(audio.backend().master_gain(), 0.4);
    }

    #[test]
    fn test_game_events_map_to_sounds() {
        let mut audio = manager();
        audio.unlock().unwrap();
        audio.play_game_events(&[
            GameEvent::WallHit,
            GameEvent::LifeLost { lives: 2 },
            GameEvent::BallLost,
        ]);
        assert_eq!(audio.backend().graphs_played(Bus::Sfx), 2);
    }

    #[test]
    fn test_music_requested_before_unlock_starts_on_unlock() {
        let mut audio = manager();
        audio.start_music();
        audio.update();
        assert_eq!(audio.backend().pending_loads(), 0);

        audio.unlock().unwrap();
        audio.update();
        assert!(audio.music().is_playing());
        assert_eq!(audio.backend().active_sources(Bus::Music), 1);
    }

    #[test]
    fn test_starting_next_track_stops_previous() {
        let mut audio = manager();
        audio.unlock().unwrap();
        audio.start_music();
        audio.update();
        assert_eq!(audio.backend().active_sources(Bus::Music), 1);

        audio.skip_track();
        audio.update();
        assert_eq!(audio.backend().active_sources(Bus::Music), 1);
        assert_eq!(audio.music().current_index(), 1);
    }

    #[test]
    fn test_voice_ducks_music_volume() {
        let mut audio = manager();
        audio.unlock().unwrap();
        audio.backend_mut().track_duration = 2.0;
        audio.play_voice(0).unwrap();
        audio.update();
        assert_eq!(audio.backend().bus_gain(Bus::Music), voice::DUCK_LEVEL);

        // A volume change during narration lands after it
        audio.set_music_volume(0.5);
        assert_eq!(audio.backend().bus_gain(Bus::Music), voice::DUCK_LEVEL);

        audio.backend_mut().advance(2.0);
        audio.update();
        assert_eq!(audio.backend().bus_gain(Bus::Music), 0.5);
    }

    #[test]
    fn test_first_track_fades_to_default_music_volume() {
        let mut audio = manager();
        audio.unlock().unwrap();
        audio.start_music();
        audio.update();
        assert_eq!(audio.backend().ramp_count(), 1);
        assert_eq!(audio.backend().bus_gain(Bus::Music), audio.music_volume());
        assert_eq!(audio.music_volume(), 0.7);
    }

    #[test]
    fn test_first_track_loading_under_voice_stays_ducked() {
        let mut audio = manager();
        audio.unlock().unwrap();
        audio.backend_mut().track_duration = 2.0;
        audio.play_voice(0).unwrap();
        audio.update();
        assert!(audio.voice().is_ducking());

        audio.start_music();
        audio.update();
        assert!(audio.music().is_playing());
        assert_eq!(audio.backend().ramp_count(), 0);
        assert_eq!(audio.backend().bus_gain(Bus::Music), voice::DUCK_LEVEL);

        audio.backend_mut().advance(2.0);
        audio.update();
        assert!(!audio.voice().is_ducking());
        assert_eq!(audio.backend().bus_gain(Bus::Music), audio.music_volume());
    }

    #[test]
    fn test_voice_during_first_fade_restores_full_music_level() {
        let mut audio = manager();
        audio.unlock().unwrap();
        audio.backend_mut().track_duration = 2.0;
        audio.start_music();
        audio.update();
        assert_eq!(audio.backend().ramp_count(), 1);

        audio.play_voice(0).unwrap();
        audio.update();
        assert_eq!(audio.backend().bus_gain(Bus::Music), voice::DUCK_LEVEL);

        audio.backend_mut().advance(2.0);
        audio.update();
        assert_eq!(audio.backend().bus_gain(Bus::Music), 0.7);
    }

    #[test]
    fn test_unknown_voice_index() {
        let mut audio = manager();
        audio.unlock().unwrap();
        assert_eq!(audio.play_voice(99), None);
    }
}
