use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_SPEECH_RATE: f32 = 0.85;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_plan_file")]
    pub plan_file: String,

    #[serde(default)]
    pub report_file: Option<String>,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub narrator: NarratorConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "default_true")]
    pub narrate_on_enable: bool,
    #[serde(default)]
    pub voice_on_start: bool,
    #[serde(default = "default_true")]
    pub finish_when_all_complete: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NarratorConfig {
    #[serde(default = "default_narrator_provider")]
    pub provider: String, // "command", "captions" or "none"
    #[serde(default)]
    pub command: CommandNarratorConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommandNarratorConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_rate_arg")]
    pub rate_arg: Option<String>,
    #[serde(default = "default_words_per_minute")]
    pub base_words_per_minute: u32,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_plan_file() -> String {
    "plan.json".to_string()
}
fn default_speech_rate() -> f32 {
    DEFAULT_SPEECH_RATE
}
fn default_true() -> bool {
    true
}
fn default_narrator_provider() -> String {
    "command".to_string()
}
fn default_program() -> String {
    "espeak-ng".to_string()
}
fn default_rate_arg() -> Option<String> {
    Some("-s".to_string())
}
fn default_words_per_minute() -> u32 {
    175
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan_file: default_plan_file(),
            report_file: None,
            session: SessionConfig::default(),
            narrator: NarratorConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            speech_rate: default_speech_rate(),
            narrate_on_enable: true,
            voice_on_start: false,
            finish_when_all_complete: true,
        }
    }
}

impl SessionConfig {
    /// Configured rate, or the default when it is not a usable multiplier.
    pub fn effective_speech_rate(&self) -> f32 {
        if self.speech_rate.is_finite() && self.speech_rate > 0.0 {
            self.speech_rate
        } else {
            DEFAULT_SPEECH_RATE
        }
    }
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            provider: default_narrator_provider(),
            command: CommandNarratorConfig::default(),
        }
    }
}

impl Default for CommandNarratorConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            rate_arg: default_rate_arg(),
            base_words_per_minute: default_words_per_minute(),
            extra_args: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
