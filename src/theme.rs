//! Game variant configuration
//!
//! The Wild-West "Knockoff Arcade" and the plain "Super Breakout" share one
//! simulation; a `Theme` carries everything that differs between them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sim::PowerUpType;

/// Which sound catalog a theme plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SoundFlavor {
    #[default]
    Western,
    Classic,
}

/// Built-in variants, by name in saved settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThemeKind {
    #[default]
    Western,
    Classic,
}

/// Difficulty scaling knobs
///
/// Reserved: nothing in the simulation reads these yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    pub speed_increase_per_level: f32,
    pub max_speed_multiplier: f32,
    pub drop_chance_decay: f32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            speed_increase_per_level: 0.05,
            max_speed_multiplier: 2.0,
            drop_chance_decay: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    /// Row colors, top row first (0xRRGGBB)
    pub brick_colors: Vec<u32>,
    pub background_color: u32,
    /// Color used for cavity bursts and golden balls
    pub cavity_color: u32,
    pub power_up_colors: BTreeMap<PowerUpType, u32>,
    /// Icon image path per power-up
    pub power_up_icons: BTreeMap<PowerUpType, String>,
    /// Background music, played in order
    pub music_tracks: Vec<String>,
    /// Narration clips for the voice channel
    pub voice_clips: Vec<String>,
    pub sound_flavor: SoundFlavor,
    #[serde(default)]
    pub difficulty: DifficultyConfig,
    /// Reserved: levels meant to host a boss layout
    #[serde(default)]
    pub boss_levels: Vec<u32>,
}

impl Default for Theme {
    fn default() -> Self {
        Self::western()
    }
}

fn icon_paths(dir: &str) -> BTreeMap<PowerUpType, String> {
    PowerUpType::ALL
        .iter()
        .map(|&kind| (kind, format!("{dir}/{}.png", kind.key())))
        .collect()
}

impl Theme {
    pub fn from_kind(kind: ThemeKind) -> Self {
        match kind {
            ThemeKind::Western => Self::western(),
            ThemeKind::Classic => Self::classic(),
        }
    }

    /// Knockoff Arcade: dusty saloon palette, gunshots and yeehaws
    pub fn western() -> Self {
        Self {
            name: "Knockoff Arcade".to_string(),
            brick_colors: vec![
                0x8B4513, // saddle brown
                0xA0522D, // sienna
                0xCD853F, // peru
                0xD2691E, // chocolate
                0xDEB887, // burlywood
                0xB22222, // firebrick
                0x8B0000, // dark red
                0x556B2F, // olive drab
            ],
            background_color: 0x2B1B0E,
            cavity_color: 0xFFD700,
            power_up_colors: BTreeMap::from([
                (PowerUpType::MultiBall, 0xFFD700),
                (PowerUpType::WidePaddle, 0x8FBC8F),
                (PowerUpType::Magnetic, 0xB0C4DE),
                (PowerUpType::Fast, 0xFF4500),
                (PowerUpType::Slow, 0x4682B4),
                (PowerUpType::Pierce, 0xC0C0C0),
            ]),
            power_up_icons: icon_paths("assets/icons/western"),
            music_tracks: vec![
                "assets/music/dusty_trail.mp3".to_string(),
                "assets/music/saloon_stomp.mp3".to_string(),
                "assets/music/high_noon.mp3".to_string(),
            ],
            voice_clips: vec![
                "assets/voice/howdy.mp3".to_string(),
                "assets/voice/new_sheriff.mp3".to_string(),
            ],
            sound_flavor: SoundFlavor::Western,
            difficulty: DifficultyConfig::default(),
            boss_levels: vec![5, 10],
        }
    }

    /// Super Breakout: rainbow rows and plain arcade bleeps
    pub fn classic() -> Self {
        Self {
            name: "Super Breakout".to_string(),
            brick_colors: vec![
                0xFF0000, 0xFF7F00, 0xFFFF00, 0x00FF00, 0x0000FF, 0x4B0082, 0x9400D3, 0xFF1493,
            ],
            background_color: 0x000000,
            cavity_color: 0xFFD700,
            power_up_colors: BTreeMap::from([
                (PowerUpType::MultiBall, 0x00FFFF),
                (PowerUpType::WidePaddle, 0x00FF00),
                (PowerUpType::Magnetic, 0xFF00FF),
                (PowerUpType::Fast, 0xFF0000),
                (PowerUpType::Slow, 0x0000FF),
                (PowerUpType::Pierce, 0xFFFFFF),
            ]),
            power_up_icons: icon_paths("assets/icons/classic"),
            music_tracks: Vec::new(),
            voice_clips: Vec::new(),
            sound_flavor: SoundFlavor::Classic,
            difficulty: DifficultyConfig::default(),
            boss_levels: Vec::new(),
        }
    }

    pub fn power_up_color(&self, kind: PowerUpType) -> u32 {
        self.power_up_colors.get(&kind).copied().unwrap_or(0xFFFFFF)
    }

    pub fn power_up_icon(&self, kind: PowerUpType) -> Option<&str> {
        self.power_up_icons.get(&kind).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_power_up_has_color_and_icon() {
        for theme in [Theme::western(), Theme::classic()] {
            for kind in PowerUpType::ALL {
                assert!(theme.power_up_colors.contains_key(&kind), "{}: {kind:?}", theme.name);
                assert!(theme.power_up_icon(kind).is_some(), "{}: {kind:?}", theme.name);
            }
        }
    }

    #[test]
    fn test_from_kind() {
        assert_eq!(Theme::from_kind(ThemeKind::Classic).sound_flavor, SoundFlavor::Classic);
        assert_eq!(Theme::from_kind(ThemeKind::default()), Theme::default());
    }

    #[test]
    fn test_theme_json_round_trip() {
        let theme = Theme::western();
        let json = serde_json::to_string(&theme).unwrap();
        let back: Theme = serde_json::from_str(&json).unwrap();
        assert_eq!(back, theme);
    }
}
