use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
    Finished,
    Closed,
}

impl SessionPhase {
    pub fn is_over(&self) -> bool {
        matches!(self, SessionPhase::Finished | SessionPhase::Closed)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Finished,
    Closed,
}

/// What display surfaces read after every event.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProgressSnapshot {
    pub phase: SessionPhase,
    pub current_step_index: usize,
    pub current_step_number: Option<u32>,
    pub completed_steps: Vec<u32>,
    pub total_steps: usize,
    pub is_voice_active: bool,
    pub is_voice_supported: bool,
    pub is_paused: bool,
    pub elapsed_seconds: u64,
    pub elapsed: String, // MM:SS
    pub progress_fraction: f32,
}

impl ProgressSnapshot {
    pub fn is_current_completed(&self) -> bool {
        self.current_step_number
            .is_some_and(|n| self.completed_steps.contains(&n))
    }
}

/// Completion signal handed back to the caller when a session ends.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub elapsed_seconds: u64,
    pub elapsed: String,
    pub completed_steps: Vec<u32>,
    pub total_steps: usize,
}

impl SessionReport {
    pub fn all_steps_completed(&self) -> bool {
        self.total_steps > 0 && self.completed_steps.len() == self.total_steps
    }
}
