//! Knockoff Arcade entry point
//!
//! The browser build boots through `platform::web::start`. Natively this runs
//! a headless, AI-driven game against the silent audio backend and logs what
//! happened: `knockoff-arcade [seed] [seconds]`.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use knockoff_arcade::audio::{Bus, HeadlessBackend};
    use knockoff_arcade::consts::LEGACY_FRAME_DT;
    use knockoff_arcade::leaderboard::MemoryLeaderboard;
    use knockoff_arcade::platform::{GameSession, Key};
    use knockoff_arcade::sim::{GameEvent, GamePhase};
    use knockoff_arcade::{HighScores, Settings};

    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(1);
    let seconds: f64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(120.0);
    log::info!("Knockoff Arcade (native) starting, seed {seed}, {seconds}s");

    let settings = Settings {
        ai_assist: true,
        ai_strength: 1.0,
        ..Settings::default()
    };
    let mut session = GameSession::new(HeadlessBackend::new(), settings, HighScores::load(), seed)
        .with_leaderboard(Box::new(MemoryLeaderboard::new()));
    session.player_name = "Autopilot".to_string();

    // Keyboard unlocks the audio on the first press, just like the browser
    session.key_down(Key::Start);

    let frame_ms = f64::from(LEGACY_FRAME_DT) * 1000.0;
    let frames = (seconds * 1000.0 / frame_ms) as u64;
    let mut bricks = 0u32;
    let mut levels = 0u32;
    let mut now = 0.0;

    for _ in 0..frames {
        session.audio.backend_mut().advance(f64::from(LEGACY_FRAME_DT));
        for event in session.frame(now) {
            match event {
                GameEvent::BrickDestroyed { .. } => bricks += 1,
                GameEvent::LevelComplete { level, bonus } => {
                    levels += 1;
                    log::info!("Level {level} cleared (+{bonus})");
                }
                GameEvent::LifeLost { lives } => log::info!("Life lost, {lives} left"),
                _ => {}
            }
        }
        if session.state.phase == GamePhase::GameOver {
            break;
        }
        now += frame_ms;
    }

    let backend = session.audio.backend();
    log::info!(
        "Score {} on level {} ({bricks} bricks, {levels} levels cleared)",
        session.state.score,
        session.state.level
    );
    log::info!(
        "Audio: {} effects played (peak {:.2}), music on track {}",
        backend.graphs_played(Bus::Sfx),
        backend.peak_level(Bus::Sfx),
        session.audio.music().current_index() + 1
    );
    if let Some(summary) = session.last_game_over() {
        log::info!(
            "Game over: local rank {:?}, online {:?}",
            summary.local_rank,
            summary.online
        );
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::start, this is just to satisfy the compiler
}
