//! ADSR envelopes expressed as fractions of a sound's duration

use serde::{Deserialize, Serialize};

use super::graph::ParamAutomation;

/// Level exponential ramps decay to (exactly zero is unreachable)
pub const NEAR_ZERO: f32 = 0.001;

/// Attack, decay and release are fractions of the total duration; sustain is
/// a fraction of the peak level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Envelope {
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Instant attack, fast decay, no hold
    pub const fn percussive() -> Self {
        Self::new(0.01, 0.2, 0.3, 0.7)
    }

    /// Slow swell with a long hold
    pub const fn pad() -> Self {
        Self::new(0.2, 0.1, 0.7, 0.3)
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(0.05, 0.1, 0.6, 0.3)
    }
}

/// Schedule `env` on `param` for a sound lasting `duration` seconds from
/// `start`, peaking at `peak`
///
/// The release always ends at exactly `start + duration`; if attack and decay
/// would run into the release they are squeezed to fit.
pub fn apply_envelope(
    param: &mut ParamAutomation,
    env: &Envelope,
    start: f64,
    duration: f64,
    peak: f32,
) {
    let duration = duration.max(0.0);
    let release = env.release.clamp(0.0, 1.0) as f64;
    let release_start = start + duration * (1.0 - release);

    let attack_end = (start + duration * env.attack.max(0.0) as f64).min(release_start);
    let decay_end = (attack_end + duration * env.decay.max(0.0) as f64).min(release_start);
    let peak = peak.max(NEAR_ZERO);
    let sustain_level = (peak * env.sustain.clamp(0.0, 1.0)).max(NEAR_ZERO);

    param
        .set_value_at(0.0, start)
        .linear_ramp_to(peak, attack_end)
        .linear_ramp_to(sustain_level, decay_end)
        .set_value_at(sustain_level, release_start)
        .exponential_ramp_to(NEAR_ZERO, start + duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let mut gain = ParamAutomation::new(0.0);
        let env = Envelope::new(0.1, 0.2, 0.5, 0.4);
        apply_envelope(&mut gain, &env, 1.0, 2.0, 0.8);

        assert_eq!(gain.value_at(1.0), 0.0);
        assert!((gain.value_at(1.2) - 0.8).abs() < 1e-5, "peak after attack");
        assert!((gain.value_at(1.6) - 0.4).abs() < 1e-5, "sustain after decay");
        assert!((gain.value_at(2.0) - 0.4).abs() < 1e-5, "held");
        assert!(gain.value_at(2.5) < 0.4);
        assert!((gain.value_at(3.0) - NEAR_ZERO).abs() < 1e-6);
    }

    #[test]
    fn test_release_lands_on_end() {
        let mut gain = ParamAutomation::new(0.0);
        apply_envelope(&mut gain, &Envelope::percussive(), 0.5, 0.25, 1.0);
        assert_eq!(gain.end_time(), Some(0.75));
    }

    #[test]
    fn test_overlong_attack_is_squeezed() {
        let mut gain = ParamAutomation::new(0.0);
        let env = Envelope::new(0.9, 0.9, 0.5, 0.5);
        apply_envelope(&mut gain, &env, 0.0, 1.0, 1.0);

        let times: Vec<f64> = gain.events().iter().map(|e| e.time()).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(gain.end_time(), Some(1.0));
        assert!(gain.value_at(0.5) > 0.0);
    }
}
