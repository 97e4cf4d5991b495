//! Per-frame simulation tick
//!
//! Order within a frame is fixed: paddle, balls (including cavity
//! transitions), ball loss, pickups, collisions, level completion, particles.
//! Brick chains and cavity scoring depend on it.

use rand::Rng;

use super::ball::Axis;
use super::cavity::CavityTransition;
use super::collision::{ball_below_bottom, ball_hits_paddle};
use super::particles::{Burst, spawn_burst, update_particles};
use super::powerup::{Pickup, PowerUpType};
use super::state::{GameEvent, GamePhase, GameState};
use crate::consts::*;
use crate::multiplier_for_combo;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Held keys; both (or neither) means stop
    pub left: bool,
    pub right: bool,
    /// Launch from Ready, restart from GameOver
    pub start: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Points for one destroyed brick
#[inline]
pub fn brick_points(multiplier: u32, cavity_bonus: bool) -> u64 {
    let points = BRICK_POINTS * multiplier as u64;
    if cavity_bonus { points * 2 } else { points }
}

/// Advance the game by one frame
///
/// `dt` is the measured frame delta in seconds (clamped to `MAX_FRAME_DT`),
/// `now` the frame timestamp in milliseconds. All timed effects compare
/// against `now`.
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32, now: f64) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let dt = dt.clamp(0.0, MAX_FRAME_DT);
    state.now = now;

    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                events.push(GameEvent::Paused);
                return events;
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Playing;
                events.push(GameEvent::Resumed);
            }
            GamePhase::Ready | GamePhase::GameOver => {}
        }
    }

    match state.phase {
        GamePhase::Paused => return events,
        GamePhase::GameOver => {
            if input.start {
                let seed = state.seed.wrapping_add(1);
                state.restart(seed);
                log::info!("Restarted with seed {seed}");
            }
            return events;
        }
        GamePhase::Ready => {
            steer_paddle(state, input, dt, now);
            // Parked balls ride along with the paddle
            let (x, y) = state.reset_position();
            for ball in &mut state.balls {
                ball.pos.set(x, y);
            }
            update_particles(&mut state.particles, dt);

            if input.start {
                state.launch_parked_balls();
                state.phase = GamePhase::Playing;
                events.push(GameEvent::GameStarted);
            }
            return events;
        }
        GamePhase::Playing => {}
    }

    steer_paddle(state, input, dt, now);
    update_balls(state, dt, now, &mut events);

    if handle_ball_loss(state, &mut events) {
        update_particles(&mut state.particles, dt);
        return events;
    }

    update_pickups(state, dt, now, &mut events);
    resolve_collisions(state, now, &mut events);
    check_level_complete(state, &mut events);
    update_particles(&mut state.particles, dt);

    events
}

/// Keyboard (or AI) steering, paddle integration and the magnet
fn steer_paddle(state: &mut GameState, input: &TickInput, dt: f32, now: f64) {
    let paddle = &mut state.paddle;
    if !paddle.ai_enabled {
        match (input.left, input.right) {
            (true, false) => paddle.move_left(),
            (false, true) => paddle.move_right(),
            _ => paddle.stop(),
        }
    }

    paddle.update(dt, &state.bounds, &state.balls, now);
    paddle.apply_magnetic_force(&mut state.balls, now);
}

fn update_balls(state: &mut GameState, dt: f32, now: f64, events: &mut Vec<GameEvent>) {
    let cavity_floor = state.bricks.top();
    let gold = state.theme.cavity_color;

    for ball in &mut state.balls {
        let hits = ball.update(dt, &state.bounds, now);
        if hits.any() {
            events.push(GameEvent::WallHit);
        }

        let y = ball.pos.y;
        match ball.cavity.update(&mut ball.vel, y, cavity_floor, now) {
            Some(CavityTransition::Entered) => {
                state.score += CAVITY_BONUS;
                spawn_burst(
                    &mut state.particles,
                    &mut state.rng,
                    ball.pos,
                    Burst::cavity(gold),
                    state.max_particles,
                );
                events.push(GameEvent::CavityEntered);
                log::debug!("Ball {} entered the cavity", ball.id);
            }
            Some(CavityTransition::Left) => events.push(GameEvent::CavityLeft),
            Some(CavityTransition::Reentered) | Some(CavityTransition::Restored) | None => {}
        }
    }

    // Drop balls that fell out; their cavity bookkeeping goes with them
    let bounds = state.bounds;
    let mut lost = Vec::new();
    state.balls.retain(|ball| {
        if ball_below_bottom(ball.pos, ball.radius(), &bounds) {
            lost.push(ball.pos);
            false
        } else {
            true
        }
    });

    for pos in lost {
        let origin = crate::Vector2D::new(pos.x, bounds.height);
        spawn_burst(
            &mut state.particles,
            &mut state.rng,
            origin,
            Burst::ball_lost(),
            state.max_particles,
        );
        events.push(GameEvent::BallLost);
    }
}

/// Lose a life when the last ball is gone. Returns true on game over.
fn handle_ball_loss(state: &mut GameState, events: &mut Vec<GameEvent>) -> bool {
    if !state.balls.is_empty() {
        return false;
    }

    state.lives = state.lives.saturating_sub(1);
    events.push(GameEvent::LifeLost { lives: state.lives });

    if state.lives == 0 {
        state.phase = GamePhase::GameOver;
        state.pickups.clear();
        events.push(GameEvent::GameOver {
            score: state.score,
            level: state.level,
        });
        log::info!("Game over: score {} at level {}", state.score, state.level);
        return true;
    }

    state.spawn_ball_launched();
    log::debug!("Life lost, {} remaining", state.lives);
    false
}

fn update_pickups(state: &mut GameState, dt: f32, now: f64, events: &mut Vec<GameEvent>) {
    for pickup in &mut state.pickups {
        pickup.update(dt);
    }

    let paddle_box = state.paddle.bounds();
    let floor = state.bounds.height;
    let mut collected = Vec::new();
    state.pickups.retain(|pickup| {
        let bounds = pickup.bounds();
        if bounds.overlaps(&paddle_box) {
            collected.push((pickup.kind, bounds.center()));
            false
        } else {
            bounds.top() <= floor
        }
    });

    for (kind, center) in collected {
        apply_power_up(state, kind, now, events);
        state.score += PICKUP_BONUS;
        let color = state.theme.power_up_color(kind);
        spawn_burst(
            &mut state.particles,
            &mut state.rng,
            center,
            Burst::pickup(color),
            state.max_particles,
        );
        events.push(GameEvent::PowerUpCollected(kind));
    }
}

/// Apply a collected power-up to whatever it targets
pub fn apply_power_up(state: &mut GameState, kind: PowerUpType, now: f64, events: &mut Vec<GameEvent>) {
    let duration = kind.duration_ms();
    match kind {
        PowerUpType::MultiBall => {
            let spawned = state.spawn_multi_ball();
            events.push(GameEvent::MultiBall { spawned });
        }
        PowerUpType::WidePaddle | PowerUpType::Magnetic => {
            state.paddle.apply_power_up(kind, duration, now);
        }
        PowerUpType::Fast | PowerUpType::Slow | PowerUpType::Pierce => {
            for ball in &mut state.balls {
                ball.apply_power_up(kind, duration, now);
            }
        }
    }
    log::debug!("Power-up {kind:?} applied");
}

fn resolve_collisions(state: &mut GameState, now: f64, events: &mut Vec<GameEvent>) {
    let paddle_box = state.paddle.bounds();

    for i in 0..state.balls.len() {
        // --- PADDLE ---
        let ball = &state.balls[i];
        if ball_hits_paddle(ball.pos, ball.vel, ball.radius(), &paddle_box) {
            let hit = state.paddle.hit_position(ball.pos.x);
            let ball = &mut state.balls[i];
            ball.vel.x = hit * PADDLE_BOUNCE_SPEED;
            ball.vel.y = -ball.vel.y.abs();
            ball.pos.y = paddle_box.top() - ball.radius();
            state.paddle.add_glow(now);
            events.push(GameEvent::PaddleHit);
        }

        // --- BRICKS (at most one impact per ball per frame) ---
        let ball_box = state.balls[i].bounds().aabb;
        let impacted = state
            .bricks
            .bricks
            .iter()
            .position(|brick| brick.visible && ball_box.overlaps(&brick.bounds()));

        if let Some(index) = impacted {
            resolve_brick_hit(state, i, index, now, events);
        }
    }
}

/// Direction of travel along one axis as a grid step
#[inline]
fn step_sign(v: f32) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Destroy the impacted brick (and, for a piercing ball, the next two along
/// its path) then bounce the ball unless it is piercing
fn resolve_brick_hit(
    state: &mut GameState,
    ball_index: usize,
    brick_index: usize,
    now: f64,
    events: &mut Vec<GameEvent>,
) {
    let ball = &state.balls[ball_index];
    let piercing = ball.has_power_up(PowerUpType::Pierce, now);
    let cavity_bonus = ball.cavity.is_bonus();
    let (dx, dy) = (step_sign(ball.vel.x), step_sign(ball.vel.y));

    let mut chain = vec![brick_index];
    if piercing {
        let mut current = brick_index;
        while chain.len() < PIERCE_CHAIN_LENGTH {
            match state.bricks.step(current, dx, dy) {
                Some(next) if state.bricks.bricks[next].visible => {
                    chain.push(next);
                    current = next;
                }
                _ => break,
            }
        }
    }

    for (n, index) in chain.into_iter().enumerate() {
        destroy_brick(state, index, cavity_bonus, n == 0, events);
    }

    if !piercing {
        state.balls[ball_index].reverse(Axis::Y);
    }
}

fn destroy_brick(
    state: &mut GameState,
    index: usize,
    cavity_bonus: bool,
    may_drop: bool,
    events: &mut Vec<GameEvent>,
) {
    let brick = &mut state.bricks.bricks[index];
    brick.visible = false;
    brick.hits += 1;
    let center = brick.bounds().center();
    let color = brick.color;

    state.score += brick_points(state.multiplier, cavity_bonus);
    state.combo += 1;
    state.multiplier = multiplier_for_combo(state.combo);

    let burst = if cavity_bonus {
        Burst::cavity(state.theme.cavity_color)
    } else {
        Burst::brick(color)
    };
    spawn_burst(
        &mut state.particles,
        &mut state.rng,
        center,
        burst,
        state.max_particles,
    );
    events.push(GameEvent::BrickDestroyed {
        cavity: cavity_bonus,
        chained: !may_drop,
    });

    if may_drop
        && state.pickups.len() < MAX_PICKUPS
        && state.rng.random_bool(PICKUP_DROP_CHANCE)
    {
        let kind = PowerUpType::random(&mut state.rng);
        let id = state.next_entity_id();
        state.pickups.push(Pickup::new(id, kind, center));
        events.push(GameEvent::PowerUpSpawned(kind));
    }
}

fn check_level_complete(state: &mut GameState, events: &mut Vec<GameEvent>) {
    if !state.bricks.is_cleared() {
        return;
    }

    let bonus = state.level as u64 * LEVEL_BONUS;
    state.score += bonus;
    events.push(GameEvent::LevelComplete {
        level: state.level,
        bonus,
    });
    log::info!("Level {} cleared, +{bonus}", state.level);

    state.level += 1;
    state.combo = 0;
    state.multiplier = 1;
    state.bricks = super::bricks::BrickGrid::generate(state.level, &state.theme.brick_colors);
    state.pickups.clear();
    state.balls.clear();
    state.spawn_ball_launched();
}
