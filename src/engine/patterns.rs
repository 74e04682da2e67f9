use super::entity::{Particle, Pattern};
use crate::color::ColorValue;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

pub const PEONY_COUNT: usize = 100;
pub const CROSS_COUNT: usize = 80;
pub const METEOR_COUNT: usize = 40;

pub const PEONY_GRAVITY: f32 = 0.06;
pub const CROSS_GRAVITY: f32 = 0.04;
pub const METEOR_GRAVITY: f32 = 0.15;

pub const PEONY_FRICTION: f32 = 0.96;
pub const CROSS_FRICTION: f32 = 0.97;
pub const METEOR_FRICTION: f32 = 0.99;

/// Share of cross particles that ride the four spokes.
pub const CROSS_AXIS_SHARE: f32 = 0.4;
pub const CROSS_AXIS_COLOR: &str = "#ffffff";

#[inline]
fn uniform(rng: &mut fastrand::Rng, lo: f32, hi: f32) -> f32 {
    lo + rng.f32() * (hi - lo)
}

impl Pattern {
    /// Append this pattern's burst at `(x, y)` to `out`.
    pub fn emit(
        self,
        x: f32,
        y: f32,
        color: &ColorValue,
        rng: &mut fastrand::Rng,
        out: &mut Vec<Particle>,
    ) {
        match self {
            Pattern::Peony => create_peony(x, y, color, rng, out),
            Pattern::Cross => create_cross(x, y, color, rng, out),
            Pattern::Meteor => create_meteor(x, y, color, rng, out),
        }
    }

    pub fn particle_count(self) -> usize {
        match self {
            Pattern::Peony => PEONY_COUNT,
            Pattern::Cross => CROSS_COUNT,
            Pattern::Meteor => METEOR_COUNT,
        }
    }
}

// Even spherical shell.
fn create_peony(x: f32, y: f32, color: &ColorValue, rng: &mut fastrand::Rng, out: &mut Vec<Particle>) {
    out.reserve(PEONY_COUNT);
    for _ in 0..PEONY_COUNT {
        let angle = rng.f32() * TAU;
        let speed = uniform(rng, 2.0, 7.0);

        out.push(Particle {
            x,
            y,
            vx: angle.cos() * speed,
            vy: angle.sin() * speed,
            alpha: 1.0,
            color: color.clone(),
            radius: uniform(rng, 1.0, 3.0),
            decay: uniform(rng, 0.01, 0.025),
            gravity: PEONY_GRAVITY,
            friction: PEONY_FRICTION,
            flicker: false,
        });
    }
}

// Four fast white flickering spokes inside a slow halo in the shell colour.
fn create_cross(x: f32, y: f32, color: &ColorValue, rng: &mut fastrand::Rng, out: &mut Vec<Particle>) {
    let white = ColorValue::from(CROSS_AXIS_COLOR);
    out.reserve(CROSS_COUNT);
    for _ in 0..CROSS_COUNT {
        let is_axis = rng.f32() < CROSS_AXIS_SHARE;
        let (angle, speed) = if is_axis {
            (rng.usize(0..4) as f32 * FRAC_PI_2, uniform(rng, 4.0, 12.0))
        } else {
            (rng.f32() * TAU, uniform(rng, 1.0, 4.0))
        };

        out.push(Particle {
            x,
            y,
            vx: angle.cos() * speed,
            vy: angle.sin() * speed,
            alpha: 1.0,
            color: if is_axis { white.clone() } else { color.clone() },
            radius: if is_axis { 2.5 } else { 1.5 },
            decay: uniform(rng, 0.01, 0.03),
            gravity: CROSS_GRAVITY,
            friction: CROSS_FRICTION,
            flicker: is_axis,
        });
    }
}

// Sparse heavy streaks: slight sideways drift, small upward kick, then a long fall.
fn create_meteor(x: f32, y: f32, color: &ColorValue, rng: &mut fastrand::Rng, out: &mut Vec<Particle>) {
    out.reserve(METEOR_COUNT);
    for _ in 0..METEOR_COUNT {
        // Upper half-plane (screen y grows downward).
        let angle = rng.f32() * PI + PI;
        let drift = rng.f32() * 2.0;

        out.push(Particle {
            x,
            y,
            vx: angle.cos() * drift,
            vy: -rng.f32() * 4.0,
            alpha: 1.0,
            color: color.clone(),
            radius: uniform(rng, 0.5, 2.0),
            decay: uniform(rng, 0.005, 0.015),
            gravity: METEOR_GRAVITY,
            friction: METEOR_FRICTION,
            flicker: false,
        });
    }
}
