//! New Year wish generation.
//!
//! The simulation never talks to the network. This module sits outside it:
//! it asks a chat-completion endpoint for a message, a theme name and a
//! handful of colours, and always hands back something usable. Every
//! failure ends in the fixed fallback for the requested language.

use crate::color::{ColorValue, Palette};
use crate::config::WishConfig;
use crate::engine::{Pattern, PatternChoice};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::str::FromStr;
use thiserror::Error;

pub const FALLBACK_COLORS: [&str; 4] = ["#ff0000", "#ffd700", "#ffffff", "#ff4500"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown language '{0}', expected 'en' or 'zh'")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::En => "en",
            Language::Zh => "zh",
        })
    }
}

/// Interface text for one language.
pub struct UiStrings {
    pub title: &'static str,
    pub loading: &'static str,
    pub instruction: &'static str,
    pub peony: &'static str,
    pub cross: &'static str,
    pub meteor: &'static str,
    pub random: &'static str,
    /// Label for switching to the other language.
    pub lang_toggle: &'static str,
}

const EN_STRINGS: UiStrings = UiStrings {
    title: "Lunar Glow 2025",
    loading: "Consulting the Stars...",
    instruction: "Click anywhere to launch fireworks",
    peony: "Peony",
    cross: "Cross",
    meteor: "Meteor",
    random: "Random",
    lang_toggle: "中文",
};

const ZH_STRINGS: UiStrings = UiStrings {
    title: "2025 辰光烟火",
    loading: "星辰占卜中...",
    instruction: "点击屏幕发射烟花",
    peony: "牡丹",
    cross: "十字",
    meteor: "流星",
    random: "随机",
    lang_toggle: "English",
};

impl UiStrings {
    pub fn pattern_label(&self, choice: PatternChoice) -> &'static str {
        match choice {
            PatternChoice::Random => self.random,
            PatternChoice::Fixed(Pattern::Peony) => self.peony,
            PatternChoice::Fixed(Pattern::Cross) => self.cross,
            PatternChoice::Fixed(Pattern::Meteor) => self.meteor,
        }
    }
}

impl Language {
    pub fn strings(self) -> &'static UiStrings {
        match self {
            Language::En => &EN_STRINGS,
            Language::Zh => &ZH_STRINGS,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }

    pub fn english_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Zh => "Chinese",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishResponse {
    pub message: String,
    pub theme: String,
    pub colors: Vec<ColorValue>,
}

impl WishResponse {
    pub fn palette(&self) -> Option<Palette> {
        Palette::new(self.colors.clone()).ok()
    }
}

/// The fixed answer used whenever generation fails.
pub fn fallback(language: Language) -> WishResponse {
    let (message, theme) = match language {
        Language::Zh => ("愿新年的光芒为你带来喜悦与繁荣！✨", "经典庆典"),
        Language::En => (
            "May the light of the new year bring you joy and prosperity! ✨",
            "Classic Celebration",
        ),
    };
    WishResponse {
        message: message.to_string(),
        theme: theme.to_string(),
        colors: FALLBACK_COLORS.iter().map(|c| ColorValue::from(*c)).collect(),
    }
}

#[derive(Debug, Error)]
pub enum WishError {
    #[error("empty prompt")]
    EmptyPrompt,
    #[error("API key not configured (set {0})")]
    MissingApiKey(String),
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("completion API returned HTTP {0}")]
    Status(u16),
    #[error("no content in completion response")]
    EmptyContent,
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid wish structure: {0}")]
    InvalidStructure(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

/// Sends a chat request and returns the raw response body.
pub trait CompletionClient {
    fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String, WishError>;
}

pub fn build_prompt(prompt: &str, language: Language) -> String {
    let lang = language.english_name();
    format!(
        r##"User request: "{prompt} (Reply in {lang})".
Generate a poetic and inspiring New Year message. Adhere strictly to the requested language in the prompt.
Also provide a matching visual theme name and 3-5 hex colors that match this specific vibe for fireworks.

Return ONLY a JSON object with this exact structure:
{{
  "message": "Your inspiring message here (in {lang})",
  "theme": "Theme name (in {lang})",
  "colors": ["#ff0000", "#ffd700", "#ffffff", "#ff4500", "#00ff00"]
}}

The message should be 2-4 sentences, inspirational and poetic.
The theme should be a short descriptive name.
Provide 4-5 hex colors that match the theme and vibe."##
    )
}

/// Models like to wrap JSON in markdown fences.
fn strip_code_fences(content: &str) -> String {
    content.replace("```json", "").replace("```", "").trim().to_string()
}

/// Pull the wish out of a chat-completions response body.
pub fn parse_completion(body: &str) -> Result<WishResponse, WishError> {
    let completion: ChatCompletion = serde_json::from_str(body)?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(WishError::EmptyContent)?;

    let wish: WishResponse = serde_json::from_str(&strip_code_fences(&content))?;
    if wish.message.trim().is_empty() {
        return Err(WishError::InvalidStructure("message is empty"));
    }
    if wish.theme.trim().is_empty() {
        return Err(WishError::InvalidStructure("theme is empty"));
    }
    if wish.colors.is_empty() {
        return Err(WishError::InvalidStructure("colors is empty"));
    }
    Ok(wish)
}

pub struct WishService<C> {
    config: WishConfig,
    api_key: Option<String>,
    client: C,
}

impl<C: CompletionClient> WishService<C> {
    /// Reads the API key from the environment variable named in `config`.
    pub fn new(config: WishConfig, client: C) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok().filter(|key| !key.is_empty());
        Self { config, api_key, client }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Always resolves; failures are logged and replaced by the fallback.
    pub fn request_wish(&self, prompt: &str, language: Language) -> WishResponse {
        match self.try_request_wish(prompt, language) {
            Ok(wish) => {
                tracing::info!(theme = %wish.theme, colors = wish.colors.len(), "wish generated");
                wish
            }
            Err(err) => {
                tracing::warn!(%err, %language, "wish generation failed, using fallback");
                fallback(language)
            }
        }
    }

    pub fn try_request_wish(&self, prompt: &str, language: Language) -> Result<WishResponse, WishError> {
        if prompt.trim().is_empty() {
            return Err(WishError::EmptyPrompt);
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| WishError::MissingApiKey(self.config.api_key_env.clone()))?;

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(build_prompt(prompt.trim(), language)),
            }],
            temperature: 0.8,
            max_tokens: 500,
        };

        tracing::debug!(model = %request.model, %language, "requesting wish");
        let body = self.client.complete(api_key, &request)?;
        parse_completion(&body)
    }
}

/// Posts through the system `curl`. The request, including the bearer
/// token, goes over stdin as a curl config so it never shows up in argv.
pub struct CurlClient {
    endpoint: String,
    referer: String,
    title: String,
    timeout_secs: u64,
}

impl CurlClient {
    pub fn new(config: &WishConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            referer: config.referer.clone(),
            title: config.title.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    fn curl_config(&self, api_key: &str, body: &str) -> String {
        let mut cfg = String::new();
        let mut line = |key: &str, value: &str| {
            cfg.push_str(key);
            cfg.push_str(" = \"");
            cfg.push_str(&quote(value));
            cfg.push_str("\"\n");
        };
        line("url", &self.endpoint);
        line("request", "POST");
        line("header", &format!("Authorization: Bearer {api_key}"));
        line("header", "Content-Type: application/json");
        line("header", &format!("HTTP-Referer: {}", self.referer));
        line("header", &format!("X-Title: {}", self.title));
        line("data-binary", body);
        line("max-time", &self.timeout_secs.to_string());
        line("write-out", "\\n%{http_code}");
        cfg.push_str("silent\nshow-error\n");
        cfg
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// A child that cannot take its input is killed and reaped before the error
// goes back.
fn feed_stdin(child: &mut Child, input: &[u8]) -> Result<(), WishError> {
    let Some(mut stdin) = child.stdin.take() else {
        return Ok(());
    };
    if let Err(err) = stdin.write_all(input) {
        drop(stdin);
        let _ = child.kill();
        let _ = child.wait();
        return Err(WishError::Transport(err.to_string()));
    }
    Ok(())
}

impl CompletionClient for CurlClient {
    fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String, WishError> {
        let body = serde_json::to_string(request)?;

        let mut child = Command::new("curl")
            .args(["--config", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WishError::Transport(format!("cannot run curl: {e}")))?;

        feed_stdin(&mut child, self.curl_config(api_key, &body).as_bytes())?;

        let output = child
            .wait_with_output()
            .map_err(|e| WishError::Transport(e.to_string()))?;
        if !output.status.success() {
            return Err(WishError::Transport(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (payload, status) = stdout
            .rsplit_once('\n')
            .ok_or_else(|| WishError::Transport("missing HTTP status".to_string()))?;
        let status: u16 = status
            .trim()
            .parse()
            .map_err(|_| WishError::Transport(format!("bad HTTP status '{}'", status.trim())))?;
        if !(200..300).contains(&status) {
            return Err(WishError::Status(status));
        }
        Ok(payload.to_string())
    }
}
