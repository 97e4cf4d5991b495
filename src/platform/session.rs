use crate::audio::{AudioBackend, AudioManager};
use crate::consts::{LEGACY_FRAME_DT, MAX_FRAME_DT};
use crate::highscores::HighScores;
use crate::leaderboard::{Leaderboard, SubmissionOutcome, submit_final_score};
use crate::settings::Settings;
use crate::sim::{GameEvent, GamePhase, GameState, Snapshot, TickInput, tick};

use super::wall_clock_ms;

/// Narration clip indices in the theme's voice list
const VOICE_GREETING: usize = 0;
const VOICE_LEVEL_UP: usize = 1;

/// Turns animation-frame timestamps (ms) into clamped simulation deltas (s)
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous frame; the first frame gets a 60 Hz step
    pub fn delta(&mut self, now: f64) -> f32 {
        let dt = match self.last {
            Some(last) => ((now - last) / 1000.0) as f32,
            None => LEGACY_FRAME_DT,
        };
        self.last = Some(now);
        dt.clamp(0.0, MAX_FRAME_DT)
    }

    /// Forget the previous frame (after a tab was hidden, say)
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Keys the game responds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Start,
    Pause,
    Mute,
    SkipTrack,
    ToggleAssist,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_dom(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "a" | "A" => Some(Key::Left),
            "ArrowRight" | "d" | "D" => Some(Key::Right),
            " " | "Enter" => Some(Key::Start),
            "Escape" | "p" | "P" => Some(Key::Pause),
            "m" | "M" => Some(Key::Mute),
            "n" | "N" => Some(Key::SkipTrack),
            "i" | "I" => Some(Key::ToggleAssist),
            _ => None,
        }
    }
}

/// Result of the last finished game
#[derive(Debug, Clone, PartialEq)]
pub struct GameOverSummary {
    pub score: u64,
    pub level: u32,
    /// Place in the local table, if it made it
    pub local_rank: Option<usize>,
    pub online: SubmissionOutcome,
}

pub struct GameSession<B: AudioBackend> {
    pub state: GameState,
    pub audio: AudioManager<B>,
    pub settings: Settings,
    pub high_scores: HighScores,
    leaderboard: Option<Box<dyn Leaderboard>>,
    pub player_name: String,
    input: TickInput,
    clock: FrameClock,
    last_game_over: Option<GameOverSummary>,
}

impl<B: AudioBackend> GameSession<B> {
    pub fn new(backend: B, settings: Settings, high_scores: HighScores, seed: u64) -> Self {
        let theme = settings.theme();
        let mut state = GameState::new(seed, theme.clone());
        settings.apply_to(&mut state);

        let mut audio = AudioManager::new(backend, &theme, seed);
        audio.apply_settings(&settings);

        log::info!("{} ready (seed {seed})", theme.name);
        Self {
            state,
            audio,
            settings,
            high_scores,
            leaderboard: None,
            player_name: String::new(),
            input: TickInput::default(),
            clock: FrameClock::new(),
            last_game_over: None,
        }
    }

    pub fn with_leaderboard(mut self, board: Box<dyn Leaderboard>) -> Self {
        self.leaderboard = Some(board);
        self
    }

    /// First user gesture: start the audio device and the playlist
    pub fn unlock_audio(&mut self) {
        if self.audio.is_unlocked() {
            return;
        }
        match self.audio.unlock() {
            Ok(()) => self.audio.start_music(),
            Err(e) => log::warn!("Audio unavailable: {e}"),
        }
    }

    pub fn key_down(&mut self, key: Key) {
        self.unlock_audio();
        match key {
            Key::Left => self.input.left = true,
            Key::Right => self.input.right = true,
            Key::Start => self.input.start = true,
            Key::Pause => self.input.pause = true,
            Key::Mute => self.toggle_mute(),
            Key::SkipTrack => self.audio.skip_track(),
            Key::ToggleAssist => {
                self.settings.ai_assist = !self.settings.ai_assist;
                self.settings.apply_to(&mut self.state);
                self.settings.save();
                log::info!("AI assist: {}", self.settings.ai_assist);
            }
        }
    }

    pub fn key_up(&mut self, key: Key) {
        match key {
            Key::Left => self.input.left = false,
            Key::Right => self.input.right = false,
            _ => {}
        }
    }

    pub fn toggle_mute(&mut self) {
        self.settings.muted = self.audio.toggle_mute();
        self.settings.save();
    }

    /// Pause if a game is running (tab hidden, window blurred)
    pub fn auto_pause(&mut self) {
        if self.state.phase == GamePhase::Playing {
            self.input.pause = true;
            log::info!("Auto-paused");
        }
        self.clock.reset();
    }

    /// Run one animation frame at `now` (ms)
    pub fn frame(&mut self, now: f64) -> Vec<GameEvent> {
        let dt = self.clock.delta(now);
        let events = tick(&mut self.state, &self.input, dt, now);

        // One-shot inputs are consumed by a single tick
        self.input.start = false;
        self.input.pause = false;

        self.audio.play_game_events(&events);
        for event in &events {
            match *event {
                GameEvent::GameStarted if self.state.level == 1 => {
                    self.audio.play_voice(VOICE_GREETING);
                }
                GameEvent::LevelComplete { .. } => {
                    self.audio.play_voice(VOICE_LEVEL_UP);
                }
                GameEvent::GameOver { score, level } => self.record_game_over(score, level),
                _ => {}
            }
        }
        self.audio.update();
        events
    }

    fn record_game_over(&mut self, score: u64, level: u32) {
        let local_rank = self
            .high_scores
            .add_high_score(&self.player_name, score, level, wall_clock_ms());
        if let Some(rank) = local_rank {
            log::info!("New high score #{rank}: {score}");
            self.high_scores.save();
        }

        let online = match self.leaderboard.as_deref_mut() {
            Some(board) => submit_final_score(board, &self.player_name, score, level, wall_clock_ms()),
            None => SubmissionOutcome::LocalOnly {
                reason: "no leaderboard configured".to_string(),
            },
        };

        self.last_game_over = Some(GameOverSummary {
            score,
            level,
            local_rank,
            online,
        });
    }

    pub fn last_game_over(&self) -> Option<&GameOverSummary> {
        self.last_game_over.as_ref()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    /// Renderer payload; `{}` if serialization somehow fails
    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|e| {
            log::warn!("Snapshot serialization failed: {e}");
            "{}".to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Bus, HeadlessBackend};
    use crate::leaderboard::MemoryLeaderboard;

    fn session() -> GameSession<HeadlessBackend> {
        GameSession::new(HeadlessBackend::new(), Settings::default(), HighScores::new(), 42)
    }

    #[test]
    fn test_frame_clock_clamps() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.delta(1000.0), LEGACY_FRAME_DT);
        assert_eq!(clock.delta(1010.0), 0.01);
        assert_eq!(clock.delta(5000.0), MAX_FRAME_DT);
        assert_eq!(clock.delta(4000.0), 0.0);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(Key::from_dom("ArrowLeft"), Some(Key::Left));
        assert_eq!(Key::from_dom(" "), Some(Key::Start));
        assert_eq!(Key::from_dom("Escape"), Some(Key::Pause));
        assert_eq!(Key::from_dom("q"), None);
    }

    #[test]
    fn test_start_key_is_one_shot() {
        let mut session = session();
        session.key_down(Key::Start);
        session.frame(0.0);
        assert_eq!(session.state.phase, GamePhase::Playing);

        // Held start must not re-trigger anything while playing
        session.frame(16.0);
        assert_eq!(session.state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_first_key_unlocks_and_starts_music() {
        let mut session = session();
        assert!(!session.audio.is_unlocked());
        session.key_down(Key::Start);
        assert!(session.audio.is_unlocked());

        session.frame(0.0);
        assert!(session.audio.backend().graphs_played(Bus::Sfx) > 0);
        assert!(session.audio.music().is_playing());
    }

    #[test]
    fn test_held_keys_steer() {
        let mut session = session();
        session.key_down(Key::Start);
        session.frame(0.0);
        let x = session.state.paddle.pos.x;
        session.key_down(Key::Left);
        session.frame(16.0);
        session.frame(32.0);
        assert!(session.state.paddle.pos.x < x);

        session.key_up(Key::Left);
        session.frame(48.0);
        assert_eq!(session.state.paddle.vel.x, 0.0);
    }

    #[test]
    fn test_mute_key_persists_in_settings() {
        let mut session = session();
        session.key_down(Key::Mute);
        assert!(session.settings.muted);
        assert!(session.audio.is_muted());
    }

    #[test]
    fn test_game_over_records_scores() {
        let mut session = GameSession::new(
            HeadlessBackend::new(),
            Settings::default(),
            HighScores::new(),
            42,
        )
        .with_leaderboard(Box::new(MemoryLeaderboard::new()));
        session.player_name = "Calamity".to_string();

        session.key_down(Key::Start);
        session.frame(0.0);
        session.state.lives = 1;
        session.state.score = 2500;
        session.state.balls[0].pos.set(400.0, 700.0);
        session.state.balls[0].set_velocity(0.0, 100.0);
        session.frame(16.0);

        assert_eq!(session.state.phase, GamePhase::GameOver);
        let summary = session.last_game_over().unwrap();
        assert_eq!(summary.score, 2500);
        assert_eq!(summary.local_rank, Some(1));
        assert_eq!(
            summary.online,
            SubmissionOutcome::Ranked {
                rank: 1,
                is_new_record: true
            }
        );
        assert_eq!(session.high_scores.entries[0].name, "Calamity");
    }

    #[test]
    fn test_game_over_without_leaderboard_is_local_only() {
        let mut session = session();
        session.key_down(Key::Start);
        session.frame(0.0);
        session.state.lives = 1;
        session.state.score = 10;
        session.state.balls[0].pos.set(400.0, 700.0);
        session.state.balls[0].set_velocity(0.0, 100.0);
        session.frame(16.0);

        let summary = session.last_game_over().unwrap();
        assert!(matches!(summary.online, SubmissionOutcome::LocalOnly { .. }));
        assert_eq!(summary.local_rank, Some(1));
    }

    #[test]
    fn test_snapshot_json() {
        let session = session();
        let json: serde_json::Value = serde_json::from_str(&session.snapshot_json()).unwrap();
        assert_eq!(json["lives"], session.state.lives);
    }
}
