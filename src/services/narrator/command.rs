use crate::core::config::CommandNarratorConfig;
use crate::services::narrator::Narrator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Speaks through a host TTS program (`espeak-ng`, `say`, `spd-say`...),
/// one child process per utterance.
///
/// A running child cannot be paused portably, so this backend keeps the
/// degraded `pause`/`resume` from the trait.
pub struct CommandNarrator {
    config: CommandNarratorConfig,
    program: PathBuf,
    child: Mutex<Option<Child>>,
}

impl CommandNarrator {
    /// Returns `None` when the program cannot be found.
    pub fn probe(config: CommandNarratorConfig) -> Option<Self> {
        let program = find_program(&config.program)?;
        info!("Using speech program {}", program.display());
        Some(Self::with_program(config, program))
    }

    pub fn with_program(config: CommandNarratorConfig, program: PathBuf) -> Self {
        Self {
            config,
            program,
            child: Mutex::new(None),
        }
    }

    pub fn words_per_minute(&self, rate: f32) -> u32 {
        let wpm = (self.config.base_words_per_minute as f32 * rate).round();
        if wpm.is_finite() && wpm >= 1.0 {
            wpm as u32
        } else {
            1
        }
    }

    pub fn build_args(&self, text: &str, rate: f32) -> Vec<String> {
        let mut args = self.config.extra_args.clone();
        if let Some(rate_arg) = &self.config.rate_arg {
            args.push(rate_arg.clone());
            args.push(self.words_per_minute(rate).to_string());
        }
        args.push(text.to_string());
        args
    }

    async fn kill(child: &mut Child) {
        if let Err(e) = child.kill().await {
            debug!("Speech process already gone: {}", e);
        }
    }
}

#[async_trait]
impl Narrator for CommandNarrator {
    fn name(&self) -> &'static str {
        "command"
    }

    fn is_supported(&self) -> bool {
        true
    }

    async fn is_speaking(&self) -> bool {
        let mut lock = self.child.lock().await;
        let finished = match lock.as_mut() {
            Some(child) => !matches!(child.try_wait(), Ok(None)),
            None => return false,
        };
        if finished {
            *lock = None;
        }
        !finished
    }

    async fn speak(&self, text: &str, rate: f32) -> Result<()> {
        let mut lock = self.child.lock().await;
        if let Some(mut previous) = lock.take() {
            Self::kill(&mut previous).await;
        }

        let child = Command::new(&self.program)
            .args(self.build_args(text, rate))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program.display()))?;
        *lock = Some(child);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut lock = self.child.lock().await;
        if let Some(mut child) = lock.take() {
            Self::kill(&mut child).await;
        }
        Ok(())
    }
}

/// Resolves `name` against `PATH` unless it already contains a directory.
pub fn find_program(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{name}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
