use crate::color::{self, ColorValue, Palette};
use crate::engine::{DEFAULT_BACKDROP, DEFAULT_FADE_ALPHA, PatternChoice};
use crate::wish::Language;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Wish generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WishConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    pub language: Language,
    pub referer: String,
    pub title: String,
    pub timeout_secs: u64,
}

impl Default for WishConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "anthropic/claude-3-haiku-20240307".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            language: Language::En,
            referer: "http://localhost:3000".to_string(),
            title: "Lunar Glow 2025".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Colours used when a launch does not bring its own.
    pub palette: Palette,
    /// Trail overlay colour, also the initial screen colour.
    pub background: ColorValue,
    pub fade_alpha: f32,
    /// World units per terminal pixel.
    pub scale: f32,
    pub fps: u32,
    /// Random launch cadence; 0 turns it off.
    pub auto_launch_ms: u64,
    pub salvo_size: usize,
    pub salvo_spacing_ms: u64,
    pub pattern: PatternChoice,
    pub seed: Option<u64>,
    pub wish: WishConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            background: ColorValue::from(DEFAULT_BACKDROP),
            fade_alpha: DEFAULT_FADE_ALPHA,
            scale: 8.0,
            fps: 60,
            auto_launch_ms: 2000,
            salvo_size: 6,
            salvo_spacing_ms: 250,
            pattern: PatternChoice::Random,
            seed: None,
            wish: WishConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// `OPENROUTER_MODEL` overrides the configured model.
    pub fn apply_env(mut self) -> Self {
        if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
            if !model.is_empty() {
                self.wish.model = model;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fps == 0 {
            return Err(ConfigError::Invalid("fps must be at least 1".to_string()));
        }
        if self.scale.is_nan() || self.scale <= 0.0 {
            return Err(ConfigError::Invalid("scale must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.fade_alpha) {
            return Err(ConfigError::Invalid("fade_alpha must be within 0..=1".to_string()));
        }
        color::parse_hex(self.background.as_str())
            .map_err(|e| ConfigError::Invalid(format!("background {}: {e}", self.background)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Pattern;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
palette = ["#abcdef", "#123456"]
pattern = "cross"
fps = 30

[wish]
language = "zh"
"##
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.palette.len(), 2);
        assert_eq!(config.pattern, PatternChoice::Fixed(Pattern::Cross));
        assert_eq!(config.fps, 30);
        assert_eq!(config.scale, 8.0);
        assert_eq!(config.wish.language, Language::Zh);
        assert_eq!(config.wish.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn unknown_pattern_means_random() {
        let config: Config = toml::from_str(r#"pattern = "willow""#).unwrap();
        assert_eq!(config.pattern, PatternChoice::Random);
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert!(toml::from_str::<Config>("palette = []").is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let config = Config { fps: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = Config { fade_alpha: 1.5, ..Default::default() };
        assert!(config.validate().is_err());

        let config = Config { background: "night".into(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn example_config_parses() {
        let config: Config = toml::from_str(include_str!("../lunarglow.example.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
