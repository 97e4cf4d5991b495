//! Game settings and preferences
//!
//! Persisted as JSON in LocalStorage, separately from the high scores.

use serde::{Deserialize, Serialize};

use crate::consts::{AI_DEFAULT_STRENGTH, MAX_PARTICLES};
use crate::sim::GameState;
use crate::theme::{Theme, ThemeKind};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => MAX_PARTICLES / 4,
            QualityPreset::Medium => MAX_PARTICLES,
            QualityPreset::High => MAX_PARTICLES * 2,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Which game variant to run
    pub theme: ThemeKind,

    // === Visual Effects ===
    /// Particle effects (brick bursts, cavity sparks)
    pub particles: bool,

    // === Gameplay ===
    /// Paddle follows the ball on its own
    pub ai_assist: bool,
    /// AI tracking strength (0.0 - 1.0)
    pub ai_strength: f32,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,
    /// Narration volume (0.0 - 1.0)
    pub voice_volume: f32,
    pub muted: bool,

    // === Accessibility ===
    /// Reduced motion (fewer particles)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            theme: ThemeKind::Western,

            particles: true,

            ai_assist: false,
            ai_strength: AI_DEFAULT_STRENGTH,

            // Audio
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,
            voice_volume: 1.0,
            muted: false,

            // Accessibility
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else if self.reduced_motion {
            self.quality.max_particles() / 2
        } else {
            self.quality.max_particles()
        }
    }

    pub fn theme(&self) -> Theme {
        Theme::from_kind(self.theme)
    }

    /// Push gameplay-relevant preferences into a running game
    pub fn apply_to(&self, state: &mut GameState) {
        state.max_particles = self.max_particles();
        state.particles.truncate(state.max_particles);
        state.paddle.ai_enabled = self.ai_assist;
        state.paddle.ai_strength = self.ai_strength.clamp(0.0, 1.0);
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "knockoff_arcade_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring corrupt settings: {e}"),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parsing() {
        assert_eq!(QualityPreset::from_str("HIGH"), Some(QualityPreset::High));
        assert_eq!(QualityPreset::from_str("med"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::from_str("ultra"), None);
        assert_eq!(QualityPreset::Low.as_str(), "Low");
    }

    #[test]
    fn test_particle_cap() {
        let mut settings = Settings::from_preset(QualityPreset::High);
        assert_eq!(settings.max_particles(), MAX_PARTICLES * 2);
        settings.reduced_motion = true;
        assert_eq!(settings.max_particles(), MAX_PARTICLES);
        settings.particles = false;
        assert_eq!(settings.max_particles(), 0);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"muted": true}"#).unwrap();
        assert!(settings.muted);
        assert_eq!(settings.master_volume, Settings::default().master_volume);
        assert_eq!(settings.theme, ThemeKind::Western);
    }

    #[test]
    fn test_apply_to_game() {
        let mut state = GameState::new(1, Theme::western());
        let settings = Settings {
            ai_assist: true,
            ai_strength: 3.0,
            quality: QualityPreset::Low,
            ..Settings::default()
        };
        settings.apply_to(&mut state);
        assert!(state.paddle.ai_enabled);
        assert_eq!(state.paddle.ai_strength, 1.0);
        assert_eq!(state.max_particles, MAX_PARTICLES / 4);
    }
}
