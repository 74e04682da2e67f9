//! The render loop host: ties the engine to a frame buffer, a frame clock
//! and the terminal's resize notifications, and adds the show's own
//! launches (periodic random rockets, the opening salvo after a wish).

use crate::canvas::FrameBuffer;
use crate::color::{self, ColorValue, Rgb};
use crate::config::{Config, ConfigError};
use crate::engine::{Engine, LaunchRequest, Pattern, PatternChoice, StepReport, TARGET_BAND, Viewport};
use crate::frame::{FrameClock, FrameRequest};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Salvo rockets burst a little lower than ordinary ones.
const SALVO_TARGET_MARGIN: f32 = 100.0;

/// Maps terminal cells to world units while the show listens for resizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeListener {
    scale: f32,
}

impl ResizeListener {
    /// Pixel grid (two pixels per cell row) for a terminal size.
    pub fn pixels(&self, cols: u16, rows: u16) -> (usize, usize) {
        (cols as usize, rows as usize * 2)
    }

    pub fn viewport(&self, cols: u16, rows: u16) -> Viewport {
        let (w, h) = self.pixels(cols, rows);
        Viewport::new(w as f32 * self.scale, h as f32 * self.scale)
    }
}

pub struct Show {
    engine: Engine,
    canvas: FrameBuffer,
    clock: FrameClock,
    background: Rgb,
    scale: f32,
    resize_listener: Option<ResizeListener>,
    auto_launch: Option<Duration>,
    next_auto_launch: Option<Instant>,
    salvo_size: usize,
    salvo_spacing: Duration,
    salvo: VecDeque<(Instant, LaunchRequest)>,
    selected: PatternChoice,
    totals: StepReport,
}

impl Show {
    pub fn from_config(config: &Config, cols: u16, rows: u16) -> Result<Self, ConfigError> {
        config.validate()?;
        let background = color::parse_hex(config.background.as_str())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let listener = ResizeListener { scale: config.scale };
        let (width, height) = listener.pixels(cols, rows);
        let canvas = FrameBuffer::new(width, height, config.scale, background);

        let mut engine = Engine::new(listener.viewport(cols, rows), config.palette.clone())
            .with_fade(config.background.clone(), config.fade_alpha);
        if let Some(seed) = config.seed {
            engine = engine.with_seed(seed);
        }

        Ok(Self {
            engine,
            canvas,
            clock: FrameClock::new(config.fps),
            background,
            scale: config.scale,
            resize_listener: None,
            auto_launch: (config.auto_launch_ms > 0).then(|| Duration::from_millis(config.auto_launch_ms)),
            next_auto_launch: None,
            salvo_size: config.salvo_size,
            salvo_spacing: Duration::from_millis(config.salvo_spacing_ms),
            salvo: VecDeque::new(),
            selected: config.pattern,
            totals: StepReport::default(),
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn canvas(&self) -> &FrameBuffer {
        &self.canvas
    }

    pub fn is_running(&self) -> bool {
        self.clock.pending().is_some()
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.clock.pending()
    }

    pub fn is_listening_for_resize(&self) -> bool {
        self.resize_listener.is_some()
    }

    /// Time until something needs doing, for the event poll.
    pub fn timeout(&self, now: Instant) -> Duration {
        self.clock.timeout(now).unwrap_or(Duration::from_millis(100))
    }

    pub fn selected(&self) -> PatternChoice {
        self.selected
    }

    pub fn select(&mut self, choice: PatternChoice) {
        self.selected = choice;
    }

    /// Request the first frame and start listening for resizes.
    pub fn start(&mut self, now: Instant) {
        self.resize_listener = Some(ResizeListener { scale: self.scale });
        self.clock.request(now);
        self.next_auto_launch = self.auto_launch.map(|every| now + every);
        tracing::info!(
            width = self.canvas.width(),
            height = self.canvas.height(),
            scale = self.scale,
            "show started"
        );
    }

    /// Cancel the pending frame and stop listening for resizes. Safe to repeat.
    pub fn teardown(&mut self) {
        let cancelled = self.clock.cancel();
        let detached = self.resize_listener.take();
        self.salvo.clear();
        self.next_auto_launch = None;
        if cancelled.is_some() || detached.is_some() {
            tracing::info!(
                detonated = self.totals.detonated,
                expired = self.totals.expired,
                "show stopped"
            );
        }
    }

    /// Follow a terminal resize. Only the surface changes; rockets and
    /// particles keep their coordinates. Ignored once torn down.
    pub fn on_resize(&mut self, cols: u16, rows: u16) -> bool {
        let Some(listener) = self.resize_listener else {
            return false;
        };
        let (width, height) = listener.pixels(cols, rows);
        self.canvas.resize(width, height, self.background);
        let viewport = listener.viewport(cols, rows);
        self.engine.resize(viewport.width, viewport.height);
        tracing::debug!(cols, rows, "resized");
        true
    }

    /// Launch with the currently selected pattern.
    pub fn launch(&mut self, request: LaunchRequest) {
        let request = if request.pattern == PatternChoice::Random {
            request.with_pattern(self.selected)
        } else {
            request
        };
        self.engine.launch(request);
    }

    /// Launch toward a terminal cell, e.g. a mouse click.
    pub fn launch_at_cell(&mut self, col: u16, row: u16, colors: Option<Vec<ColorValue>>) {
        let x = (col as f32 + 0.5) * self.scale;
        let y = (row as f32 * 2.0 + 1.0) * self.scale;
        let mut request = LaunchRequest::new().at(x, y);
        request.colors = colors;
        self.launch(request);
    }

    /// Queue the opening salvo. With no fixed pattern selected the salvo
    /// cycles through every pattern.
    pub fn queue_salvo(&mut self, now: Instant, colors: Vec<ColorValue>) {
        let Viewport { width, height } = self.engine.viewport();
        for i in 0..self.salvo_size {
            let rng = self.engine.rng_mut();
            let x = rng.f32() * width;
            let target_y = rng.f32() * (height * TARGET_BAND) + SALVO_TARGET_MARGIN;
            let pattern = match self.selected {
                PatternChoice::Random => Pattern::ALL[i % Pattern::ALL.len()],
                PatternChoice::Fixed(pattern) => pattern,
            };
            let request = LaunchRequest::new()
                .at(x, target_y)
                .with_colors(colors.clone())
                .with_pattern(pattern);
            self.salvo.push_back((now + self.salvo_spacing * i as u32, request));
        }
    }

    fn fire_scheduled(&mut self, now: Instant) {
        while self.salvo.front().is_some_and(|(due, _)| *due <= now) {
            if let Some((_, request)) = self.salvo.pop_front() {
                self.engine.launch(request);
            }
        }

        // Background launches ignore the selected pattern.
        if let (Some(every), Some(due)) = (self.auto_launch, self.next_auto_launch) {
            if now >= due {
                self.engine.launch(LaunchRequest::new());
                self.next_auto_launch = Some(now + every);
            }
        }
    }

    /// Run a frame if one is due. Returns true when the surface changed and
    /// should be presented; the next frame is requested before returning.
    pub fn frame(&mut self, now: Instant) -> bool {
        let Some(steps) = self.clock.fire(now) else {
            return false;
        };

        self.fire_scheduled(now);
        for _ in 0..steps {
            let report = self.engine.step(&mut self.canvas);
            self.totals.detonated += report.detonated;
            self.totals.expired += report.expired;
        }

        self.clock.request(now);
        steps > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            seed: Some(9),
            auto_launch_ms: 0,
            ..Default::default()
        }
    }

    fn started(now: Instant) -> Show {
        let mut show = Show::from_config(&config(), 80, 24).unwrap();
        show.start(now);
        show
    }

    #[test]
    fn viewport_follows_scale() {
        let show = Show::from_config(&config(), 80, 24).unwrap();
        assert_eq!(show.engine().viewport(), Viewport::new(640.0, 384.0));
        assert_eq!((show.canvas().width(), show.canvas().height()), (80, 48));
    }

    #[test]
    fn teardown_twice_leaves_nothing_pending() {
        let now = Instant::now();
        let mut show = started(now);
        assert!(show.is_running());
        assert!(show.is_listening_for_resize());

        show.teardown();
        show.teardown();
        assert!(show.pending_frame().is_none());
        assert!(!show.is_listening_for_resize());
        assert!(!show.frame(now + Duration::from_secs(1)));
        assert!(!show.on_resize(100, 40));
    }

    #[test]
    fn frames_chain_until_teardown() {
        let t0 = Instant::now();
        let mut show = started(t0);
        let step = Duration::from_secs_f64(1.0 / 60.0);
        let mut now = t0;
        for _ in 0..5 {
            now += step;
            assert!(show.frame(now));
            assert!(show.pending_frame().is_some());
        }
    }

    #[test]
    fn resize_keeps_particles_untouched() {
        let t0 = Instant::now();
        let mut show = started(t0);
        show.engine_mut().launch(LaunchRequest::new().at(100.0, 383.0).with_pattern(Pattern::Peony));
        assert!(show.frame(t0 + Duration::from_millis(17)));
        let before: Vec<_> = show.engine().particles().iter().map(|p| (p.x, p.y, p.vx, p.vy, p.alpha)).collect();
        assert_eq!(before.len(), 100);

        assert!(show.on_resize(40, 10));
        let after: Vec<_> = show.engine().particles().iter().map(|p| (p.x, p.y, p.vx, p.vy, p.alpha)).collect();
        assert_eq!(before, after);
        assert_eq!((show.canvas().width(), show.canvas().height()), (40, 20));
        assert_eq!(show.engine().viewport(), Viewport::new(320.0, 160.0));
    }

    #[test]
    fn salvo_cycles_patterns_and_uses_wish_colors() {
        let t0 = Instant::now();
        let mut show = started(t0);
        show.queue_salvo(t0, vec!["#00ff00".into()]);

        // Well past the last salvo slot (5 * 250ms).
        assert!(show.frame(t0 + Duration::from_secs(2)));
        let rockets = show.engine().rockets();
        assert_eq!(rockets.len(), 6);
        let patterns: Vec<_> = rockets.iter().map(|r| r.pattern).collect();
        assert_eq!(
            patterns,
            [Pattern::Peony, Pattern::Cross, Pattern::Meteor, Pattern::Peony, Pattern::Cross, Pattern::Meteor]
        );
        assert!(rockets.iter().all(|r| r.color.as_str() == "#00ff00"));
        assert!(rockets.iter().all(|r| r.target_y >= SALVO_TARGET_MARGIN));
    }

    #[test]
    fn salvo_rockets_are_spaced_out() {
        let t0 = Instant::now();
        let mut show = started(t0);
        show.queue_salvo(t0, vec!["#00ff00".into()]);
        assert!(show.frame(t0 + Duration::from_millis(17)));
        assert_eq!(show.engine().rockets().len(), 1);
    }

    #[test]
    fn auto_launch_fires_on_schedule() {
        let t0 = Instant::now();
        let cfg = Config { auto_launch_ms: 100, seed: Some(1), ..Default::default() };
        let mut show = Show::from_config(&cfg, 80, 24).unwrap();
        show.start(t0);

        show.frame(t0 + Duration::from_millis(50));
        assert!(show.engine().rockets().is_empty());
        show.frame(t0 + Duration::from_millis(120));
        assert_eq!(show.engine().rockets().len(), 1);
    }

    #[test]
    fn auto_launch_ignores_selected_pattern() {
        let t0 = Instant::now();
        let cfg = Config { auto_launch_ms: 10, seed: Some(3), ..Default::default() };
        let mut show = Show::from_config(&cfg, 80, 24).unwrap();
        show.start(t0);
        show.select(PatternChoice::Fixed(Pattern::Meteor));

        for i in 1..=30 {
            show.fire_scheduled(t0 + Duration::from_millis(10 * i));
        }
        let rockets = show.engine().rockets();
        assert_eq!(rockets.len(), 30);
        assert!(rockets.iter().any(|r| r.pattern != Pattern::Meteor));
    }

    #[test]
    fn click_launch_uses_selected_pattern() {
        let t0 = Instant::now();
        let mut show = started(t0);
        show.select(PatternChoice::Fixed(Pattern::Meteor));
        show.launch_at_cell(10, 5, None);
        let rocket = &show.engine().rockets()[0];
        assert_eq!(rocket.pattern, Pattern::Meteor);
        assert_eq!(rocket.x, 84.0);
        assert_eq!(rocket.target_y, 88.0);
    }
}
