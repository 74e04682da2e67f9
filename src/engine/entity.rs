use crate::color::ColorValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendered opacity factor for the dim half of a flicker.
pub const FLICKER_DIM: f32 = 0.3;

/// Burst recipe a rocket carries from launch to detonation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    Peony,
    Cross,
    Meteor,
}

impl Pattern {
    pub const ALL: [Pattern; 3] = [Pattern::Peony, Pattern::Cross, Pattern::Meteor];

    pub fn random(rng: &mut fastrand::Rng) -> Self {
        Self::ALL[rng.usize(0..Self::ALL.len())]
    }

    pub fn name(self) -> &'static str {
        match self {
            Pattern::Peony => "peony",
            Pattern::Cross => "cross",
            Pattern::Meteor => "meteor",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a caller asks for. `Random` is resolved once, when the rocket
/// is created, and never stored on a rocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatternChoice {
    #[default]
    Random,
    Fixed(Pattern),
}

impl PatternChoice {
    pub fn resolve(self, rng: &mut fastrand::Rng) -> Pattern {
        match self {
            PatternChoice::Random => Pattern::random(rng),
            PatternChoice::Fixed(pattern) => pattern,
        }
    }
}

impl From<Pattern> for PatternChoice {
    fn from(pattern: Pattern) -> Self {
        PatternChoice::Fixed(pattern)
    }
}

// Anything unrecognised falls back to Random.
impl From<&str> for PatternChoice {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "peony" => PatternChoice::Fixed(Pattern::Peony),
            "cross" => PatternChoice::Fixed(Pattern::Cross),
            "meteor" => PatternChoice::Fixed(Pattern::Meteor),
            _ => PatternChoice::Random,
        }
    }
}

impl From<String> for PatternChoice {
    fn from(value: String) -> Self {
        PatternChoice::from(value.as_str())
    }
}

impl From<PatternChoice> for String {
    fn from(choice: PatternChoice) -> Self {
        choice.to_string()
    }
}

impl fmt::Display for PatternChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternChoice::Random => f.write_str("random"),
            PatternChoice::Fixed(pattern) => pattern.fmt(f),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rocket {
    pub x: f32,
    pub y: f32,
    pub target_y: f32,
    pub color: ColorValue,
    pub speed: f32,
    pub pattern: Pattern,
}

impl Rocket {
    /// Move up one tick. Returns true once the burst height is reached.
    pub fn ascend(&mut self) -> bool {
        self.y -= self.speed;
        self.y <= self.target_y
    }
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub alpha: f32,
    pub color: ColorValue,
    pub radius: f32,
    pub decay: f32,
    pub gravity: f32,
    pub friction: f32,
    pub flicker: bool,
}

impl Particle {
    /// Advance one tick: drag, gravity, motion, fade.
    /// Returns false when the particle has burnt out.
    pub fn integrate(&mut self) -> bool {
        self.vx *= self.friction;
        self.vy *= self.friction;
        self.vy += self.gravity;
        self.x += self.vx;
        self.y += self.vy;
        self.alpha -= self.decay;

        self.alpha > 0.0
    }

    /// Opacity to paint with this frame. Never touches the stored alpha.
    pub fn render_alpha(&self, dim: bool) -> f32 {
        if self.flicker && dim {
            self.alpha * FLICKER_DIM
        } else {
            self.alpha
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spark(flicker: bool) -> Particle {
        Particle {
            x: 10.0,
            y: 10.0,
            vx: 2.0,
            vy: -1.0,
            alpha: 1.0,
            color: "#ffffff".into(),
            radius: 1.0,
            decay: 0.25,
            gravity: 0.5,
            friction: 0.5,
            flicker,
        }
    }

    #[test]
    fn integrate_applies_friction_before_gravity() {
        let mut p = spark(false);
        assert!(p.integrate());
        assert!((p.vx - 1.0).abs() < 1e-6);
        assert!((p.vy - 0.0).abs() < 1e-6);
        assert!((p.x - 11.0).abs() < 1e-6);
        assert!((p.y - 10.0).abs() < 1e-6);
        assert!((p.alpha - 0.75).abs() < 1e-6);
    }

    #[test]
    fn particle_dies_when_alpha_reaches_zero() {
        let mut p = spark(false);
        assert!(p.integrate());
        assert!(p.integrate());
        assert!(p.integrate());
        assert!(!p.integrate());
    }

    #[test]
    fn flicker_only_changes_rendered_alpha() {
        let p = spark(true);
        assert_eq!(p.render_alpha(false), 1.0);
        assert!((p.render_alpha(true) - FLICKER_DIM).abs() < 1e-6);
        assert_eq!(p.alpha, 1.0);

        let steady = spark(false);
        assert_eq!(steady.render_alpha(true), 1.0);
    }

    #[test]
    fn rocket_arrives_at_target() {
        let mut rocket = Rocket {
            x: 0.0,
            y: 20.0,
            target_y: 10.0,
            color: "#ff0000".into(),
            speed: 5.0,
            pattern: Pattern::Peony,
        };
        assert!(!rocket.ascend());
        assert!(rocket.ascend());
    }

    #[test]
    fn pattern_choice_parsing_is_lenient() {
        assert_eq!(PatternChoice::from("Peony"), PatternChoice::Fixed(Pattern::Peony));
        assert_eq!(PatternChoice::from(" cross "), PatternChoice::Fixed(Pattern::Cross));
        assert_eq!(PatternChoice::from("METEOR"), PatternChoice::Fixed(Pattern::Meteor));
        assert_eq!(PatternChoice::from("random"), PatternChoice::Random);
        assert_eq!(PatternChoice::from("willow"), PatternChoice::Random);
    }

    #[test]
    fn random_choice_resolves_to_every_pattern() {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            seen.insert(PatternChoice::Random.resolve(&mut rng));
        }
        assert_eq!(seen.len(), 3);
    }
}
