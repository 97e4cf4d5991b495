//! End-to-end scenarios: a session driven frame by frame against the
//! headless audio backend.

use knockoff_arcade::audio::{AudioBackend, Bus, HeadlessBackend};
use knockoff_arcade::consts::LEGACY_FRAME_DT;
use knockoff_arcade::platform::{GameSession, Key};
use knockoff_arcade::sim::{GameEvent, GamePhase};
use knockoff_arcade::theme::ThemeKind;
use knockoff_arcade::{HighScores, Settings};

const FRAME_MS: f64 = 1000.0 / 60.0;

fn assisted() -> Settings {
    Settings {
        ai_assist: true,
        ai_strength: 1.0,
        ..Settings::default()
    }
}

fn started(settings: Settings, seed: u64) -> GameSession<HeadlessBackend> {
    let mut session = GameSession::new(HeadlessBackend::new(), settings, HighScores::new(), seed);
    session.key_down(Key::Start);
    session.frame(0.0);
    assert_eq!(session.state.phase, GamePhase::Playing);
    session
}

/// Run `frames` frames after the first, returning every event
fn run(session: &mut GameSession<HeadlessBackend>, frames: u32) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for i in 1..=frames {
        session.audio.backend_mut().advance(f64::from(LEGACY_FRAME_DT));
        events.extend(session.frame(f64::from(i) * FRAME_MS));
    }
    events
}

fn balls_json(session: &GameSession<HeadlessBackend>) -> String {
    let snapshot: serde_json::Value = serde_json::from_str(&session.snapshot_json()).unwrap();
    snapshot["balls"].to_string()
}

#[test]
fn same_seed_same_game() {
    let mut a = started(assisted(), 2024);
    let mut b = started(assisted(), 2024);
    let events_a = run(&mut a, 900);
    let events_b = run(&mut b, 900);

    assert_eq!(events_a, events_b);
    assert_eq!(a.state.score, b.state.score);
    assert_eq!(a.snapshot_json(), b.snapshot_json());
}

#[test]
fn assisted_paddle_breaks_bricks() {
    let mut session = started(assisted(), 7);
    let events = run(&mut session, 60 * 20);

    assert!(session.state.score > 0);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::BrickDestroyed { .. }))
    );
    assert!(session.audio.backend().graphs_played(Bus::Sfx) > 0);
    assert!(session.audio.backend().peak_level(Bus::Sfx) > 0.0);
}

#[test]
fn pause_freezes_the_balls() {
    let mut session = started(Settings::default(), 3);
    run(&mut session, 5);

    session.key_down(Key::Pause);
    session.frame(6.0 * FRAME_MS);
    assert_eq!(session.state.phase, GamePhase::Paused);
    let frozen = balls_json(&session);

    session.frame(7.0 * FRAME_MS);
    session.frame(8.0 * FRAME_MS);
    assert_eq!(balls_json(&session), frozen);

    session.key_down(Key::Pause);
    session.frame(9.0 * FRAME_MS);
    session.frame(10.0 * FRAME_MS);
    assert_eq!(session.state.phase, GamePhase::Playing);
    assert_ne!(balls_json(&session), frozen);
}

#[test]
fn muted_settings_keep_effects_silent() {
    let settings = Settings {
        muted: true,
        ..assisted()
    };
    let mut session = started(settings, 11);
    run(&mut session, 300);

    assert!(session.audio.is_muted());
    assert_eq!(session.audio.backend().master_gain(), 0.0);
    assert_eq!(session.audio.backend().graphs_played(Bus::Sfx), 0);
    assert_eq!(session.audio.backend().peak_level(Bus::Sfx), 0.0);

    session.key_down(Key::Mute);
    assert!(!session.settings.muted);
    assert_eq!(session.audio.backend().master_gain(), session.settings.master_volume);
}

#[test]
fn western_music_plays_one_track_at_a_time() {
    let mut session = started(assisted(), 5);
    run(&mut session, 10);
    assert!(session.audio.music().is_playing());
    assert_eq!(session.audio.backend().active_sources(Bus::Music), 1);

    session.key_down(Key::SkipTrack);
    run(&mut session, 2);
    assert_eq!(session.audio.backend().active_sources(Bus::Music), 1);
    assert_eq!(session.audio.music().current_index(), 1);
}

#[test]
fn classic_theme_has_effects_but_no_music() {
    let settings = Settings {
        theme: ThemeKind::Classic,
        ..assisted()
    };
    let mut session = started(settings, 5);
    run(&mut session, 120);

    assert_eq!(session.state.theme.name, "Super Breakout");
    assert!(!session.audio.music().is_playing());
    assert_eq!(session.audio.backend().active_sources(Bus::Music), 0);
    assert!(session.audio.backend().graphs_played(Bus::Sfx) > 0);
}

#[test]
fn game_over_then_restart() {
    let mut session = started(Settings::default(), 9);
    session.player_name = "Doc".to_string();
    session.state.lives = 1;
    session.state.score = 900;
    session.state.balls[0].pos.set(400.0, 700.0);
    session.state.balls[0].set_velocity(0.0, 100.0);

    let events = run(&mut session, 1);
    assert!(events.contains(&GameEvent::GameOver {
        score: 900,
        level: 1
    }));
    assert_eq!(session.high_scores.top_score(), Some(900));

    session.key_down(Key::Start);
    run(&mut session, 1);
    assert_eq!(session.state.phase, GamePhase::Ready);
    assert_eq!(session.state.score, 0);
    // The table outlives the game
    assert_eq!(session.high_scores.displayable_list()[0].name, "Doc");
}
