use crate::services::narrator::Narrator;
use anyhow::Result;
use async_trait::async_trait;

/// Used when the host has no speech capability.
pub struct SilentNarrator;

#[async_trait]
impl Narrator for SilentNarrator {
    fn name(&self) -> &'static str {
        "silent"
    }

    fn is_supported(&self) -> bool {
        false
    }

    async fn is_speaking(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str, _rate: f32) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}
