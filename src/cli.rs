//! Command-line entry point: configuration, logging, the optional wish,
//! and the terminal event loop.

use crate::color::{ColorError, ColorValue, Palette, PaletteError};
use crate::config::{Config, ConfigError};
use crate::engine::{LaunchRequest, Pattern, PatternChoice};
use crate::show::Show;
use crate::terminal::{Presenter, TerminalGuard};
use crate::wish::{CurlClient, Language, WishResponse, WishService};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind};
use crossterm::terminal;
use std::fs::File;
use std::io::{BufWriter, stdout};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid --bg-color: {0}")]
    Background(#[from] ColorError),
    #[error("invalid --palette: {0}")]
    Palette(#[from] PaletteError),
    #[error("cannot start logging: {0}")]
    Logging(String),
}

/// Terminal fireworks with an optional generated New Year wish
#[derive(Parser, Debug)]
#[command(name = "lunarglow", version, about)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Background / trail colour as hex (e.g. 1a1b26)
    #[arg(long)]
    pub bg_color: Option<String>,

    /// Comma separated default palette (e.g. "#ff0000,#ffd700")
    #[arg(long, value_delimiter = ',')]
    pub palette: Option<Vec<String>>,

    /// Burst pattern: peony, cross, meteor or random
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Ask for a New Year wish and use its colours
    #[arg(short, long)]
    pub wish: Option<String>,

    /// Wish language: en or zh
    #[arg(short, long)]
    pub lang: Option<Language>,

    /// Seed for reproducible shows
    #[arg(long)]
    pub seed: Option<u64>,

    /// World units per terminal pixel
    #[arg(long)]
    pub scale: Option<f32>,

    /// Write logs here (the terminal itself is busy drawing)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// File settings first, flags on top.
    pub fn resolve_config(&self) -> Result<Config, AppError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        }
        .apply_env();

        if let Some(bg) = &self.bg_color {
            crate::color::parse_hex(bg)?;
            let hex = bg.trim_start_matches('#');
            config.background = ColorValue::new(format!("#{hex}"));
        }
        if let Some(colors) = &self.palette {
            let colors = colors
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(ColorValue::from)
                .collect();
            config.palette = Palette::new(colors)?;
        }
        if let Some(pattern) = &self.pattern {
            config.pattern = PatternChoice::from(pattern.as_str());
        }
        if let Some(lang) = self.lang {
            config.wish.language = lang;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(path: &Path) -> Result<(), AppError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    match run_with(cli) {
        Ok(wish) => {
            if let Some(wish) = wish {
                println!("{}\n{}", wish.theme, wish.message);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("lunarglow: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_with(cli: Cli) -> Result<Option<WishResponse>, AppError> {
    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }
    let mut config = cli.resolve_config()?;
    let language = config.wish.language;

    let wish = cli.wish.as_deref().map(|prompt| {
        eprintln!("{}", language.strings().loading);
        let service = WishService::new(config.wish.clone(), CurlClient::new(&config.wish));
        service.request_wish(prompt, language)
    });
    if let Some(palette) = wish.as_ref().and_then(WishResponse::palette) {
        config.palette = palette;
    }

    let mut guard = TerminalGuard::enter()?;
    let result = event_loop(&config, wish.as_ref());
    guard.restore()?;
    result?;

    Ok(wish)
}

fn caption(show: &Show, language: Language, wish: Option<&WishResponse>) -> String {
    let strings = language.strings();
    let pattern = strings.pattern_label(show.selected());
    let toggle = strings.lang_toggle;
    match wish {
        Some(wish) => format!("{} · {} · {} · [l] {}", wish.theme, wish.message, pattern, toggle),
        None => format!("{} · {} · {} · [l] {}", strings.title, strings.instruction, pattern, toggle),
    }
}

fn event_loop(config: &Config, wish: Option<&WishResponse>) -> Result<(), AppError> {
    let mut out = BufWriter::with_capacity(1024 * 64, stdout());
    let (cols, rows) = terminal::size()?;
    let mut language = config.wish.language;
    let wish_colors = wish.map(|w| w.colors.clone());

    let mut show = Show::from_config(config, cols, rows)?;
    let mut presenter = Presenter::new();

    let start = Instant::now();
    show.start(start);
    if let Some(colors) = &wish_colors {
        show.queue_salvo(start, colors.clone());
    }

    loop {
        if event::poll(show.timeout(Instant::now()))? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                    KeyCode::Char('1') => show.select(Pattern::Peony.into()),
                    KeyCode::Char('2') => show.select(Pattern::Cross.into()),
                    KeyCode::Char('3') => show.select(Pattern::Meteor.into()),
                    KeyCode::Char('0') => show.select(PatternChoice::Random),
                    KeyCode::Char('l') => {
                        language = language.toggled();
                        tracing::debug!(%language, "caption language");
                    }
                    KeyCode::Char(' ') => show.launch(LaunchRequest::new()),
                    _ => {}
                },
                Event::Mouse(mouse) => {
                    if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                        show.launch_at_cell(mouse.column, mouse.row, wish_colors.clone());
                    }
                }
                Event::Resize(cols, rows) => {
                    show.on_resize(cols, rows);
                }
                _ => {}
            }
        }

        if show.frame(Instant::now()) {
            let text = caption(&show, language, wish);
            presenter.present(show.canvas(), Some(&text), &mut out)?;
        }
    }

    show.teardown();
    Ok(())
}
