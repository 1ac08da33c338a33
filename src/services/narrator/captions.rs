use crate::services::narrator::Narrator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::io::{self, Stdout, Write};
use std::sync::Mutex;

struct CaptionState<W> {
    out: W,
    speaking: bool,
    paused: bool,
}

/// Shows narration as caption lines instead of audio.
pub struct CaptionNarrator<W: Write + Send = Stdout> {
    state: Mutex<CaptionState<W>>,
}

impl CaptionNarrator<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> CaptionNarrator<W> {
    pub fn new(out: W) -> Self {
        Self {
            state: Mutex::new(CaptionState {
                out,
                speaking: false,
                paused: false,
            }),
        }
    }

    pub fn into_inner(self) -> W {
        match self.state.into_inner() {
            Ok(state) => state.out,
            Err(poisoned) => poisoned.into_inner().out,
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut CaptionState<W>) -> Result<T>) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("caption state lock poisoned"))?;
        f(&mut state)
    }
}

#[async_trait]
impl<W: Write + Send> Narrator for CaptionNarrator<W> {
    fn name(&self) -> &'static str {
        "captions"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn supports_pause(&self) -> bool {
        true
    }

    async fn is_speaking(&self) -> bool {
        self.with_state(|s| Ok(s.speaking && !s.paused))
            .unwrap_or(false)
    }

    async fn speak(&self, text: &str, rate: f32) -> Result<()> {
        self.with_state(|s| {
            s.speaking = true;
            s.paused = false;
            writeln!(s.out, "» {} (x{:.2})", text, rate)?;
            s.out.flush()?;
            Ok(())
        })
    }

    async fn stop(&self) -> Result<()> {
        self.with_state(|s| {
            s.speaking = false;
            s.paused = false;
            Ok(())
        })
    }

    async fn pause(&self) -> Result<()> {
        self.with_state(|s| {
            if s.speaking {
                s.paused = true;
            }
            Ok(())
        })
    }

    async fn resume(&self) -> Result<()> {
        self.with_state(|s| {
            s.paused = false;
            Ok(())
        })
    }
}
