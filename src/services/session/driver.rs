use crate::core::config::SessionConfig;
use crate::core::plan::Step;
use crate::core::state::{ProgressSnapshot, SessionOutcome, SessionPhase, SessionReport};
use crate::services::narrator::Narrator;
use crate::services::session::ledger::StepLedger;
use crate::services::session::timer::SessionTimer;
use crate::utils::time::format_elapsed;
use anyhow::Result;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;

pub type TickSink = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub speech_rate: f32,
    /// Narrate the current step as soon as voice is switched on.
    pub narrate_on_enable: bool,
    pub voice_on_start: bool,
    pub finish_when_all_complete: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            speech_rate: config.effective_speech_rate(),
            narrate_on_enable: config.narrate_on_enable,
            voice_on_start: config.voice_on_start,
            finish_when_all_complete: config.finish_when_all_complete,
        }
    }
}

/// Drives a user through a step plan with optional voice narration.
///
/// Every transition is a state update followed by best-effort narrator and
/// timer calls. Narrator failures are logged and never leak into the
/// progress state. Narration for a step is only requested after the ledger
/// points at that step.
pub struct GuidedSession {
    ledger: StepLedger,
    narrator: Arc<dyn Narrator>,
    timer: SessionTimer,
    on_tick: TickSink,
    settings: SessionSettings,
    phase: SessionPhase,
    is_voice_active: bool,
    is_paused: bool,
    elapsed_seconds: u64,
    // the step changed while paused and still needs to be narrated
    narration_pending: bool,
}

impl GuidedSession {
    pub fn new(steps: Arc<[Step]>, narrator: Arc<dyn Narrator>, settings: SessionSettings) -> Self {
        let is_voice_active = settings.voice_on_start && narrator.is_supported();
        Self {
            ledger: StepLedger::new(steps),
            narrator,
            timer: SessionTimer::new(),
            on_tick: Arc::new(|| {}),
            settings,
            phase: SessionPhase::Idle,
            is_voice_active,
            is_paused: false,
            elapsed_seconds: 0,
            narration_pending: false,
        }
    }

    /// Called by the timer once per tick. The owner turns it into `on_tick`.
    pub fn set_tick_sink<F>(&mut self, sink: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_tick = Arc::new(sink);
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn ledger(&self) -> &StepLedger {
        &self.ledger
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.ledger.current_step()
    }

    pub fn is_voice_active(&self) -> bool {
        self.is_voice_active
    }

    pub fn is_voice_supported(&self) -> bool {
        self.narrator.is_supported()
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed_seconds)
    }

    pub fn progress_fraction(&self) -> f32 {
        self.ledger.progress_fraction()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            phase: self.phase,
            current_step_index: self.ledger.current_step_index(),
            current_step_number: self.ledger.current_step().map(|s| s.step_number),
            completed_steps: self.ledger.completed_steps(),
            total_steps: self.ledger.len(),
            is_voice_active: self.is_voice_active,
            is_voice_supported: self.narrator.is_supported(),
            is_paused: self.is_paused,
            elapsed_seconds: self.elapsed_seconds,
            elapsed: self.elapsed_display(),
            progress_fraction: self.ledger.progress_fraction(),
        }
    }

    /// Report for the current state. A session that has not ended reports
    /// as closed.
    pub fn report(&self) -> SessionReport {
        let outcome = match self.phase {
            SessionPhase::Finished => SessionOutcome::Finished,
            _ => SessionOutcome::Closed,
        };
        SessionReport {
            outcome,
            elapsed_seconds: self.elapsed_seconds,
            elapsed: self.elapsed_display(),
            completed_steps: self.ledger.completed_steps(),
            total_steps: self.ledger.len(),
        }
    }

    pub async fn start_session(&mut self) {
        if self.phase == SessionPhase::Active {
            debug!("Restarting active session");
            guarded("stop", self.narrator.stop()).await;
        }
        self.timer.stop();
        self.ledger.reset();
        self.is_paused = false;
        self.elapsed_seconds = 0;
        self.narration_pending = false;

        if self.ledger.is_empty() {
            warn!("Plan has no steps, nothing to guide");
            self.phase = SessionPhase::Finished;
            return;
        }

        self.phase = SessionPhase::Active;
        self.start_timer();
        info!("Guided session started with {} steps", self.ledger.len());

        if self.is_voice_active {
            self.narrate_current_step().await;
        }
    }

    /// Counts one second unless paused or not running. Returns whether it
    /// counted.
    pub fn on_tick(&mut self) -> bool {
        if self.phase != SessionPhase::Active || self.is_paused {
            return false;
        }
        self.elapsed_seconds += 1;
        true
    }

    /// Returns the new voice state.
    pub async fn toggle_voice(&mut self) -> bool {
        if self.is_voice_active {
            self.is_voice_active = false;
            self.narration_pending = false;
            debug!("Voice guidance off");
            guarded("stop", self.narrator.stop()).await;
            return false;
        }

        self.is_voice_active = true;
        debug!("Voice guidance on");
        if self.settings.narrate_on_enable && self.phase == SessionPhase::Active {
            if self.is_paused {
                self.narration_pending = true;
            } else {
                self.narrate_current_step().await;
            }
        }
        true
    }

    /// Returns the new pause state. Ignored unless the session is active.
    pub async fn toggle_pause(&mut self) -> bool {
        if self.phase != SessionPhase::Active {
            debug!("Ignoring pause toggle in {:?} phase", self.phase);
            return self.is_paused;
        }

        if !self.is_paused {
            self.is_paused = true;
            self.timer.stop();
            info!("Session paused at {}", self.elapsed_display());
            guarded("pause", self.narrator.pause()).await;
            return true;
        }

        self.is_paused = false;
        self.start_timer();
        info!("Session resumed at {}", self.elapsed_display());
        if self.narration_pending && self.is_voice_active {
            self.narrate_current_step().await;
        } else {
            guarded("resume", self.narrator.resume()).await;
        }
        false
    }

    pub async fn complete_step(&mut self, step_number: u32) {
        if self.phase != SessionPhase::Active {
            debug!(
                "Ignoring completion of step {} in {:?} phase",
                step_number, self.phase
            );
            return;
        }

        let advanced = self.ledger.mark_completed(step_number);
        guarded("stop", self.narrator.stop()).await;

        if self.settings.finish_when_all_complete && self.ledger.all_completed() {
            info!("All {} steps completed", self.ledger.len());
            self.finish_session().await;
            return;
        }

        if advanced && self.is_voice_active {
            if self.is_paused {
                self.narration_pending = true;
            } else {
                self.narrate_current_step().await;
            }
        }
    }

    pub async fn finish_session(&mut self) -> SessionReport {
        self.end(SessionPhase::Finished).await
    }

    pub async fn close_session(&mut self) -> SessionReport {
        self.end(SessionPhase::Closed).await
    }

    async fn end(&mut self, phase: SessionPhase) -> SessionReport {
        self.timer.stop();
        guarded("stop", self.narrator.stop()).await;
        self.narration_pending = false;
        if !self.phase.is_over() {
            self.phase = phase;
            info!(
                "Session {:?} after {} with {}/{} steps",
                phase,
                self.elapsed_display(),
                self.ledger.completed_count(),
                self.ledger.len()
            );
        }
        self.report()
    }

    fn start_timer(&mut self) {
        let sink = self.on_tick.clone();
        self.timer.start(move || sink());
    }

    async fn narrate_current_step(&mut self) {
        self.narration_pending = false;
        if !self.narrator.is_supported() {
            return;
        }
        let Some(step) = self.ledger.current_step() else {
            return;
        };
        let text = step.narration();
        debug!("Narrating step {}", step.step_number);
        guarded("speak", self.narrator.speak(&text, self.settings.speech_rate)).await;
    }
}

async fn guarded(operation: &str, call: impl Future<Output = Result<()>>) {
    if let Err(e) = call.await {
        warn!("Narrator {} failed: {:#}", operation, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::narrator::testing::{NarratorCall, RecordingNarrator};

    fn three_steps() -> Arc<[Step]> {
        Arc::from(vec![
            Step::new(1, "Base", "Blend foundation outward."),
            Step::new(2, "Eyes", "Sweep a neutral shadow."),
            Step::new(3, "Lips", "Fill with colour."),
        ])
    }

    fn session_with(
        steps: Arc<[Step]>,
        settings: SessionSettings,
    ) -> (GuidedSession, Arc<RecordingNarrator>) {
        let narrator = Arc::new(RecordingNarrator::new());
        let session = GuidedSession::new(steps, narrator.clone(), settings);
        (session, narrator)
    }

    fn session() -> (GuidedSession, Arc<RecordingNarrator>) {
        session_with(three_steps(), SessionSettings::default())
    }

    fn ticks(session: &mut GuidedSession, n: usize) {
        for _ in 0..n {
            session.on_tick();
        }
    }

    #[tokio::test]
    async fn test_scenario_voice_off() {
        let (mut session, narrator) = session();
        session.start_session().await;
        assert_eq!(session.phase(), SessionPhase::Active);

        session.complete_step(1).await;
        session.complete_step(2).await;
        session.complete_step(3).await;

        assert_eq!(session.ledger().completed_steps(), vec![1, 2, 3]);
        assert_eq!(session.ledger().current_step_index(), 2);
        assert_eq!(session.progress_fraction(), 1.0);
        assert!(narrator.spoken().is_empty());

        // finishing on the last step tears everything down
        assert_eq!(session.phase(), SessionPhase::Finished);
        assert!(!session.is_timer_running());
    }

    #[tokio::test]
    async fn test_scenario_voice_on() {
        let (mut session, narrator) = session();
        assert!(session.toggle_voice().await);
        // not started yet, so nothing to narrate
        assert!(narrator.calls().is_empty());

        session.start_session().await;
        assert_eq!(
            narrator.spoken(),
            vec!["Step 1: Base. Blend foundation outward.".to_string()]
        );

        narrator.clear();
        session.complete_step(1).await;
        assert_eq!(session.ledger().current_step_index(), 1);
        assert_eq!(
            narrator.calls(),
            vec![
                NarratorCall::Stop,
                NarratorCall::Speak("Step 2: Eyes. Sweep a neutral shadow.".to_string(), 0.85),
            ]
        );
    }

    #[tokio::test]
    async fn test_scenario_pause_resume() {
        let (mut session, narrator) = session();
        session.start_session().await;

        ticks(&mut session, 5);
        assert_eq!(session.elapsed_seconds(), 5);

        assert!(session.toggle_pause().await);
        assert!(!session.is_timer_running());
        ticks(&mut session, 5);
        assert_eq!(session.elapsed_seconds(), 5);

        assert!(!session.toggle_pause().await);
        assert!(session.is_timer_running());
        ticks(&mut session, 5);
        assert_eq!(session.elapsed_seconds(), 10);
        assert_eq!(session.elapsed_display(), "00:10");

        assert_eq!(narrator.calls(), vec![NarratorCall::Pause, NarratorCall::Resume]);
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let (mut session, narrator) =
            session_with(Arc::from(Vec::<Step>::new()), SessionSettings::default());
        session.toggle_voice().await;
        session.start_session().await;

        assert!(session.current_step().is_none());
        assert_eq!(session.progress_fraction(), 0.0);
        assert_eq!(session.phase(), SessionPhase::Finished);
        assert!(!session.is_timer_running());

        session.complete_step(1).await;
        session.toggle_pause().await;
        assert!(!session.on_tick());
        assert!(narrator.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_voice_off_stops_narration() {
        let (mut session, narrator) = session();
        session.toggle_voice().await;
        session.start_session().await;
        assert!(narrator.is_speaking().await);

        assert!(!session.toggle_voice().await);
        assert!(!narrator.is_speaking().await);
        assert_eq!(narrator.calls().last(), Some(&NarratorCall::Stop));

        // completing steps with voice off narrates nothing new
        narrator.clear();
        session.complete_step(1).await;
        assert!(narrator.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_enabling_voice_narrates_current_step() {
        let (mut session, narrator) = session();
        session.start_session().await;
        session.complete_step(1).await;
        narrator.clear();

        session.toggle_voice().await;
        assert_eq!(
            narrator.spoken(),
            vec!["Step 2: Eyes. Sweep a neutral shadow.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_enabling_voice_can_wait_for_next_step() {
        let settings = SessionSettings {
            narrate_on_enable: false,
            ..Default::default()
        };
        let (mut session, narrator) = session_with(three_steps(), settings);
        session.start_session().await;

        session.toggle_voice().await;
        assert!(narrator.spoken().is_empty());

        session.complete_step(1).await;
        assert_eq!(narrator.spoken().len(), 1);
        assert!(narrator.spoken()[0].starts_with("Step 2: Eyes."));
    }

    #[tokio::test]
    async fn test_step_change_while_paused_narrates_on_resume() {
        let (mut session, narrator) = session();
        session.toggle_voice().await;
        session.start_session().await;
        session.toggle_pause().await;
        narrator.clear();

        session.complete_step(1).await;
        assert_eq!(narrator.calls(), vec![NarratorCall::Stop]);

        session.toggle_pause().await;
        assert_eq!(
            narrator.calls(),
            vec![
                NarratorCall::Stop,
                NarratorCall::Speak("Step 2: Eyes. Sweep a neutral shadow.".to_string(), 0.85),
            ]
        );
    }

    #[tokio::test]
    async fn test_complete_step_is_idempotent() {
        let (mut session, _narrator) = session();
        session.start_session().await;
        session.complete_step(1).await;
        let first = session.snapshot();
        session.complete_step(1).await;
        let second = session.snapshot();

        assert_eq!(first.current_step_index, second.current_step_index);
        assert_eq!(first.completed_steps, second.completed_steps);
    }

    #[tokio::test]
    async fn test_unknown_step_is_ignored() {
        let (mut session, _narrator) = session();
        session.start_session().await;
        session.complete_step(99).await;
        assert!(session.ledger().completed_steps().is_empty());
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[tokio::test]
    async fn test_last_step_without_auto_finish() {
        let settings = SessionSettings {
            finish_when_all_complete: false,
            ..Default::default()
        };
        let (mut session, _narrator) = session_with(three_steps(), settings);
        session.start_session().await;
        for n in 1..=3 {
            session.complete_step(n).await;
        }
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.ledger().current_step_index(), 2);

        let report = session.finish_session().await;
        assert_eq!(report.outcome, SessionOutcome::Finished);
        assert!(report.all_steps_completed());
    }

    #[tokio::test]
    async fn test_close_reports_and_tears_down() {
        let (mut session, narrator) = session();
        session.start_session().await;
        ticks(&mut session, 65);
        session.complete_step(1).await;
        narrator.clear();

        let report = session.close_session().await;
        assert_eq!(report.outcome, SessionOutcome::Closed);
        assert_eq!(report.elapsed, "01:05");
        assert_eq!(report.completed_steps, vec![1]);
        assert_eq!(report.total_steps, 3);
        assert_eq!(narrator.calls(), vec![NarratorCall::Stop]);
        assert!(!session.is_timer_running());

        // ticks and intents after the end change nothing
        assert!(!session.on_tick());
        session.complete_step(2).await;
        assert_eq!(session.report(), report);

        // ending twice keeps the first outcome
        let again = session.finish_session().await;
        assert_eq!(again.outcome, SessionOutcome::Closed);
    }

    #[tokio::test]
    async fn test_restart_resets_progress() {
        let (mut session, _narrator) = session();
        session.start_session().await;
        ticks(&mut session, 3);
        session.complete_step(1).await;
        session.toggle_pause().await;

        session.start_session().await;
        let snapshot = session.snapshot();
        assert_eq!(snapshot.current_step_index, 0);
        assert!(snapshot.completed_steps.is_empty());
        assert!(!snapshot.is_paused);
        assert_eq!(snapshot.elapsed_seconds, 0);
        assert!(session.is_timer_running());
    }

    #[tokio::test]
    async fn test_narrator_failures_do_not_corrupt_state() {
        let narrator = Arc::new(RecordingNarrator::failing());
        let mut session =
            GuidedSession::new(three_steps(), narrator.clone(), SessionSettings::default());
        session.toggle_voice().await;
        session.start_session().await;
        session.complete_step(1).await;
        session.toggle_pause().await;
        session.toggle_pause().await;
        session.toggle_voice().await;

        assert_eq!(session.ledger().current_step_index(), 1);
        assert_eq!(session.ledger().completed_steps(), vec![1]);
        assert!(!session.is_paused());
        assert!(!session.is_voice_active());
        assert!(!narrator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_voice_never_narrates() {
        let narrator = Arc::new(RecordingNarrator::unsupported());
        let settings = SessionSettings {
            voice_on_start: true,
            ..Default::default()
        };
        let mut session = GuidedSession::new(three_steps(), narrator.clone(), settings);
        assert!(!session.is_voice_active());
        assert!(!session.snapshot().is_voice_supported);

        session.start_session().await;
        session.toggle_voice().await;
        session.complete_step(1).await;
        assert!(narrator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_voice_on_start_setting() {
        let settings = SessionSettings {
            voice_on_start: true,
            speech_rate: 1.2,
            ..Default::default()
        };
        let (mut session, narrator) = session_with(three_steps(), settings);
        assert!(session.is_voice_active());
        session.start_session().await;
        assert_eq!(
            narrator.calls(),
            vec![NarratorCall::Speak(
                "Step 1: Base. Blend foundation outward.".to_string(),
                1.2
            )]
        );
    }

    #[tokio::test]
    async fn test_snapshot() {
        let (mut session, _narrator) = session();
        assert_eq!(session.snapshot().phase, SessionPhase::Idle);

        session.start_session().await;
        session.complete_step(1).await;
        ticks(&mut session, 7);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Active);
        assert_eq!(snapshot.current_step_index, 1);
        assert_eq!(snapshot.current_step_number, Some(2));
        assert_eq!(snapshot.completed_steps, vec![1]);
        assert_eq!(snapshot.total_steps, 3);
        assert_eq!(snapshot.elapsed, "00:07");
        assert!((snapshot.progress_fraction - 1.0 / 3.0).abs() < f32::EPSILON);
        assert!(!snapshot.is_current_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_feeds_tick_sink() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let (mut session, _narrator) = session();
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        session.set_tick_sink(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        session.start_session().await;
        tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
        session.toggle_pause().await;
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        session.toggle_pause().await;
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
