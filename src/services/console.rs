use crate::core::plan::Step;
use crate::core::state::ProgressSnapshot;
use crate::services::session::{SessionHandle, SessionIntent};
use inquire::{InquireError, Select};
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    CompleteStep(u32),
    VoiceOn,
    VoiceOff,
    Pause,
    Resume,
    Finish,
    Close,
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuAction::CompleteStep(n) => write!(f, "Mark step {} complete", n),
            MenuAction::VoiceOn => write!(f, "Turn voice guidance on"),
            MenuAction::VoiceOff => write!(f, "Turn voice guidance off"),
            MenuAction::Pause => write!(f, "Pause"),
            MenuAction::Resume => write!(f, "Resume"),
            MenuAction::Finish => write!(f, "Finish session"),
            MenuAction::Close => write!(f, "Close"),
        }
    }
}

impl MenuAction {
    pub fn intent(&self) -> SessionIntent {
        match self {
            MenuAction::CompleteStep(n) => SessionIntent::CompleteStep(*n),
            MenuAction::VoiceOn | MenuAction::VoiceOff => SessionIntent::ToggleVoice,
            MenuAction::Pause | MenuAction::Resume => SessionIntent::TogglePause,
            MenuAction::Finish => SessionIntent::Finish,
            MenuAction::Close => SessionIntent::Close,
        }
    }
}

/// Choices for the current progress. Completion is offered only for the
/// current step while it is still open.
pub fn menu_options(snapshot: &ProgressSnapshot) -> Vec<MenuAction> {
    let mut options = Vec::new();

    if !snapshot.is_paused {
        if let Some(n) = snapshot.current_step_number {
            if !snapshot.is_current_completed() {
                options.push(MenuAction::CompleteStep(n));
            }
        }
    }

    if snapshot.is_voice_supported {
        options.push(if snapshot.is_voice_active {
            MenuAction::VoiceOff
        } else {
            MenuAction::VoiceOn
        });
    }

    options.push(if snapshot.is_paused {
        MenuAction::Resume
    } else {
        MenuAction::Pause
    });
    options.push(MenuAction::Finish);
    options.push(MenuAction::Close);
    options
}

pub fn render_step(step: Option<&Step>, snapshot: &ProgressSnapshot) -> String {
    let mut out = format!(
        "[{}] {}/{} steps done ({:.0}%)",
        snapshot.elapsed,
        snapshot.completed_steps.len(),
        snapshot.total_steps,
        snapshot.progress_fraction * 100.0
    );
    if snapshot.is_paused {
        out.push_str(" - paused");
    }
    if snapshot.is_voice_active {
        out.push_str(" - voice on");
    }

    if let Some(step) = step {
        out.push_str(&format!(
            "\n\nStep {} of {}: {}\n{}",
            snapshot.current_step_index + 1,
            snapshot.total_steps,
            step.category,
            step.instruction
        ));
        if !step.products.is_empty() {
            out.push_str(&format!("\nProducts: {}", step.products.join(", ")));
        }
        for tip in &step.tips {
            out.push_str(&format!("\nTip: {}", tip));
        }
    }
    out
}

/// Interactive loop. Blocks the calling thread, so run it under
/// `spawn_blocking`. Returns once the session is over.
pub fn run_console(handle: SessionHandle, steps: Arc<[Step]>) {
    let Some(mut snapshot) = handle.blocking_snapshot() else {
        return;
    };

    while !snapshot.phase.is_over() {
        let step = snapshot
            .current_step_number
            .and_then(|n| steps.iter().find(|s| s.step_number == n));
        println!("\n{}", render_step(step, &snapshot));

        let action = match Select::new("What next?", menu_options(&snapshot)).prompt() {
            Ok(action) => action,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                debug!("Menu cancelled");
                MenuAction::Close
            }
            Err(e) => {
                warn!("Error reading input, closing session: {}", e);
                MenuAction::Close
            }
        };

        match handle.blocking_send(action.intent()) {
            Some(next) => snapshot = next,
            None => return,
        }
    }
}
