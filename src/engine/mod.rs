//! Rocket and particle simulation.
//!
//! The engine owns the live rockets and particles. `launch` is the only
//! way in from outside; everything else happens inside `step`, which runs
//! once per frame and paints onto a [`Canvas`].

pub mod entity;
pub mod patterns;

pub use entity::{Particle, Pattern, PatternChoice, Rocket};

use crate::canvas::Canvas;
use crate::color::{ColorValue, Palette};

pub const ROCKET_RADIUS: f32 = 2.0;
pub const DEFAULT_FADE_ALPHA: f32 = 0.2;
pub const DEFAULT_BACKDROP: &str = "#050505";

/// Default burst heights sit in the top 40% of the viewport, below this margin.
pub const TARGET_MARGIN: f32 = 50.0;
pub const TARGET_BAND: f32 = 0.4;

const MIN_ASCENT_SPEED: f32 = 5.0;
const ASCENT_SPEED_RANGE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Optional launch parameters; anything left `None` is randomised.
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    pub x: Option<f32>,
    pub target_y: Option<f32>,
    pub colors: Option<Vec<ColorValue>>,
    pub pattern: PatternChoice,
}

impl LaunchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, x: f32, target_y: f32) -> Self {
        self.x = Some(x);
        self.target_y = Some(target_y);
        self
    }

    pub fn with_colors(mut self, colors: Vec<ColorValue>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<PatternChoice>) -> Self {
        self.pattern = pattern.into();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub detonated: usize,
    pub expired: usize,
}

pub struct Engine {
    viewport: Viewport,
    palette: Palette,
    backdrop: ColorValue,
    fade_alpha: f32,
    rockets: Vec<Rocket>,
    particles: Vec<Particle>,
    rng: fastrand::Rng,
}

impl Engine {
    pub fn new(viewport: Viewport, palette: Palette) -> Self {
        Self {
            viewport,
            palette,
            backdrop: ColorValue::from(DEFAULT_BACKDROP),
            fade_alpha: DEFAULT_FADE_ALPHA,
            rockets: Vec::new(),
            particles: Vec::with_capacity(1024),
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Colour and strength of the per-frame trail overlay.
    pub fn with_fade(mut self, backdrop: ColorValue, alpha: f32) -> Self {
        self.backdrop = backdrop;
        self.fade_alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Track a new viewport. Live rockets and particles keep their coordinates.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn rockets(&self) -> &[Rocket] {
        &self.rockets
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub(crate) fn rng_mut(&mut self) -> &mut fastrand::Rng {
        &mut self.rng
    }

    /// Queue one rocket from the bottom edge.
    pub fn launch(&mut self, request: LaunchRequest) {
        let Viewport { width, height } = self.viewport;

        let x = request.x.unwrap_or_else(|| self.rng.f32() * width);
        let target_y = request
            .target_y
            .unwrap_or_else(|| self.rng.f32() * (height * TARGET_BAND) + TARGET_MARGIN);

        let color = match request.colors.as_deref() {
            Some(colors) if !colors.is_empty() => colors[self.rng.usize(0..colors.len())].clone(),
            _ => self.palette.choose(&mut self.rng).clone(),
        };
        let pattern = request.pattern.resolve(&mut self.rng);
        let speed = MIN_ASCENT_SPEED + self.rng.f32() * ASCENT_SPEED_RANGE;

        tracing::trace!(x, target_y, %color, %pattern, "launch");

        self.rockets.push(Rocket {
            x,
            y: height,
            target_y,
            color,
            speed,
            pattern,
        });
    }

    /// Advance one frame and paint it.
    pub fn step<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> StepReport {
        let mut report = StepReport::default();

        // Trails come from fading the previous frame, never from clearing it.
        canvas.fade(&self.backdrop, self.fade_alpha);

        let mut detonations = Vec::new();
        self.rockets.retain_mut(|rocket| {
            let arrived = rocket.ascend();
            canvas.fill_circle(rocket.x, rocket.y, ROCKET_RADIUS, &rocket.color, 1.0);
            if arrived {
                detonations.push((rocket.x, rocket.y, rocket.color.clone(), rocket.pattern));
            }
            !arrived
        });

        for (x, y, color, pattern) in detonations {
            pattern.emit(x, y, &color, &mut self.rng, &mut self.particles);
            report.detonated += 1;
        }

        let rng = &mut self.rng;
        self.particles.retain_mut(|particle| {
            if !particle.integrate() {
                report.expired += 1;
                return false;
            }
            let dim = particle.flicker && rng.bool();
            canvas.fill_circle(
                particle.x,
                particle.y,
                particle.radius,
                &particle.color,
                particle.render_alpha(dim),
            );
            true
        });

        report
    }
}

#[cfg(test)]
mod tests {
    use super::entity::FLICKER_DIM;
    use super::patterns::{PEONY_COUNT, PEONY_FRICTION, PEONY_GRAVITY};
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Op {
        Fade(String, f32),
        Circle(f32, f32, f32, String, f32),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl Canvas for Recorder {
        fn fade(&mut self, color: &ColorValue, alpha: f32) {
            self.ops.push(Op::Fade(color.to_string(), alpha));
        }

        fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: &ColorValue, alpha: f32) {
            self.ops.push(Op::Circle(x, y, radius, color.to_string(), alpha));
        }
    }

    fn engine() -> Engine {
        Engine::new(Viewport::new(800.0, 600.0), Palette::default()).with_seed(42)
    }

    #[test]
    fn launch_creates_one_rocket_at_bottom() {
        let mut engine = engine();
        engine.launch(LaunchRequest::new().at(120.0, 80.0).with_pattern(Pattern::Cross));
        let rockets = engine.rockets();
        assert_eq!(rockets.len(), 1);
        assert_eq!(rockets[0].x, 120.0);
        assert_eq!(rockets[0].y, 600.0);
        assert_eq!(rockets[0].target_y, 80.0);
        assert_eq!(rockets[0].pattern, Pattern::Cross);
        assert!((5.0..9.0).contains(&rockets[0].speed));
        assert!(engine.palette().colors().contains(&rockets[0].color));
    }

    #[test]
    fn default_launch_stays_in_bands() {
        let mut engine = engine();
        for _ in 0..200 {
            engine.launch(LaunchRequest::new());
        }
        for rocket in engine.rockets() {
            assert!((0.0..800.0).contains(&rocket.x));
            assert!((50.0..50.0 + 240.0).contains(&rocket.target_y));
        }
    }

    #[test]
    fn empty_color_override_uses_palette() {
        let mut engine = engine();
        engine.launch(LaunchRequest::new().with_colors(Vec::new()));
        assert!(engine.palette().colors().contains(&engine.rockets()[0].color));
    }

    #[test]
    fn fade_is_painted_before_anything_else() {
        let mut engine = engine();
        engine.launch(LaunchRequest::new().at(100.0, 100.0));
        let mut canvas = Recorder::default();
        engine.step(&mut canvas);
        assert_eq!(canvas.ops[0], Op::Fade(DEFAULT_BACKDROP.to_string(), DEFAULT_FADE_ALPHA));
        assert!(matches!(canvas.ops[1], Op::Circle(_, _, ROCKET_RADIUS, _, _)));
    }

    #[test]
    fn rocket_detonates_into_burst() {
        let mut engine = engine();
        engine.launch(
            LaunchRequest::new()
                .at(100.0, 100.0)
                .with_colors(vec!["#ABCDEF".into()])
                .with_pattern("peony"),
        );
        let mut canvas = Recorder::default();
        let mut ticks = 0;
        loop {
            let report = engine.step(&mut canvas);
            ticks += 1;
            if report.detonated > 0 {
                assert_eq!(report.detonated, 1);
                break;
            }
            assert_eq!(engine.rockets().len(), 1);
            assert!(ticks < 200, "rocket never arrived");
        }
        assert!(engine.rockets().is_empty());
        assert_eq!(engine.particles().len(), PEONY_COUNT);
        for p in engine.particles() {
            assert_eq!(p.color.as_str(), "#ABCDEF");
            assert_eq!(p.gravity, PEONY_GRAVITY);
            assert_eq!(p.friction, PEONY_FRICTION);
        }
    }

    #[test]
    fn expired_particles_are_not_painted() {
        let mut engine = engine();
        engine.particles.push(Particle {
            x: 1.0,
            y: 1.0,
            vx: 0.0,
            vy: 0.0,
            alpha: 0.05,
            color: "#ffffff".into(),
            radius: 1.0,
            decay: 0.1,
            gravity: 0.0,
            friction: 1.0,
            flicker: false,
        });
        let mut canvas = Recorder::default();
        let report = engine.step(&mut canvas);
        assert_eq!(report.expired, 1);
        assert!(engine.particles().is_empty());
        assert_eq!(canvas.ops.len(), 1);
    }

    #[test]
    fn flicker_particles_are_painted_at_random_alpha() {
        let mut engine = engine();
        let particle = |x: f32, flicker: bool| Particle {
            x,
            y: 10.0,
            vx: 0.0,
            vy: 0.0,
            alpha: 1.0,
            color: "#ffffff".into(),
            radius: 1.0,
            decay: 0.001,
            gravity: 0.0,
            friction: 1.0,
            flicker,
        };
        engine.particles.push(particle(1.0, true));
        engine.particles.push(particle(2.0, false));

        let (mut full, mut dimmed) = (0, 0);
        for _ in 0..20 {
            let mut canvas = Recorder::default();
            engine.step(&mut canvas);
            let stored: Vec<f32> = engine.particles().iter().map(|p| p.alpha).collect();
            for op in &canvas.ops {
                match op {
                    Op::Circle(x, _, _, _, alpha) if *x == 1.0 => {
                        if *alpha == stored[0] {
                            full += 1;
                        } else {
                            assert_eq!(*alpha, stored[0] * FLICKER_DIM);
                            dimmed += 1;
                        }
                    }
                    Op::Circle(_, _, _, _, alpha) => assert_eq!(*alpha, stored[1]),
                    Op::Fade(..) => {}
                }
            }
        }
        assert_eq!(full + dimmed, 20);
        assert!(full > 0 && dimmed > 0);
    }

    #[test]
    fn resize_leaves_entities_alone() {
        let mut engine = engine();
        engine.launch(LaunchRequest::new().at(300.0, 599.0).with_pattern(Pattern::Meteor));
        let mut canvas = Recorder::default();
        engine.step(&mut canvas);
        let before: Vec<_> = engine.particles().iter().map(|p| (p.x, p.y, p.vx, p.vy, p.alpha)).collect();
        assert!(!before.is_empty());

        engine.resize(100.0, 50.0);
        let after: Vec<_> = engine.particles().iter().map(|p| (p.x, p.y, p.vx, p.vy, p.alpha)).collect();
        assert_eq!(before, after);
        assert_eq!(engine.viewport(), Viewport::new(100.0, 50.0));
    }
}
