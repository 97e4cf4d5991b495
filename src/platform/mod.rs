//! Platform layer
//!
//! `GameSession` is the composition root shared by the browser binding and
//! the native demo: it owns the game state, the injected audio service and
//! the score tables, and turns key presses and frame callbacks into ticks.

mod session;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use session::{FrameClock, GameOverSummary, GameSession, Key};

/// Wall-clock time in ms since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn wall_clock_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn wall_clock_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}
