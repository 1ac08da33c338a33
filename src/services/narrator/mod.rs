use crate::core::config::NarratorConfig;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

/// Host text-to-speech capability.
///
/// Only one utterance plays at a time on the host, so a session shares a
/// single narrator behind `Arc` and `speak` always cancels what is playing.
/// Backends without pause support keep the default `pause`/`resume`, which
/// degrade to stop and no-op.
#[async_trait]
pub trait Narrator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fixed at construction. When false every call is a no-op.
    fn is_supported(&self) -> bool;

    fn supports_pause(&self) -> bool {
        false
    }

    async fn is_speaking(&self) -> bool;

    async fn speak(&self, text: &str, rate: f32) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    async fn pause(&self) -> Result<()> {
        self.stop().await
    }

    async fn resume(&self) -> Result<()> {
        Ok(())
    }
}

pub fn create_narrator(config: &NarratorConfig) -> Result<Arc<dyn Narrator>> {
    info!("Initializing narrator for provider: {}", config.provider);
    match config.provider.as_str() {
        "command" => match command::CommandNarrator::probe(config.command.clone()) {
            Some(narrator) => Ok(Arc::new(narrator)),
            None => {
                warn!(
                    "Speech program '{}' not found, voice guidance disabled",
                    config.command.program
                );
                Ok(Arc::new(silent::SilentNarrator))
            }
        },
        "captions" => Ok(Arc::new(captions::CaptionNarrator::stdout())),
        "none" => Ok(Arc::new(silent::SilentNarrator)),
        _ => Err(anyhow!("Unknown narrator provider: {}", config.provider)),
    }
}

pub mod captions;
pub mod command;
pub mod silent;
