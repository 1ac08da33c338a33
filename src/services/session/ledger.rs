use crate::core::plan::Step;
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Ordered steps plus completion and position.
///
/// The step sequence is shared and never modified here. The current index only
/// moves forward, and only when the current step is completed.
#[derive(Debug, Clone)]
pub struct StepLedger {
    steps: Arc<[Step]>,
    completed: BTreeSet<u32>,
    current_index: usize,
}

impl StepLedger {
    pub fn new(steps: Arc<[Step]>) -> Self {
        Self {
            steps,
            completed: BTreeSet::new(),
            current_index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn current_step_index(&self) -> usize {
        self.current_index
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current_index)
    }

    pub fn step(&self, step_number: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }

    pub fn is_completed(&self, step_number: u32) -> bool {
        self.completed.contains(&step_number)
    }

    /// Marks a step complete. Returns true when the current index advanced.
    pub fn mark_completed(&mut self, step_number: u32) -> bool {
        if self.step(step_number).is_none() {
            debug!("Ignoring completion of unknown step {}", step_number);
            return false;
        }
        self.completed.insert(step_number);

        let is_current = self
            .current_step()
            .is_some_and(|s| s.step_number == step_number);
        if is_current && self.current_index + 1 < self.steps.len() {
            self.current_index += 1;
            return true;
        }
        false
    }

    /// Completed step numbers in ascending order.
    pub fn completed_steps(&self) -> Vec<u32> {
        self.completed.iter().copied().collect()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn all_completed(&self) -> bool {
        !self.steps.is_empty() && self.completed.len() == self.steps.len()
    }

    pub fn progress_fraction(&self) -> f32 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.completed.len() as f32 / self.steps.len() as f32
    }

    pub fn reset(&mut self) {
        self.completed.clear();
        self.current_index = 0;
    }
}
