use crate::core::state::{ProgressSnapshot, SessionReport};
use crate::services::session::driver::GuidedSession;
use log::{debug, info};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionIntent {
    ToggleVoice,
    TogglePause,
    CompleteStep(u32),
    Finish,
    Close,
}

enum SessionMessage {
    Tick,
    Intent {
        intent: SessionIntent,
        reply: Option<oneshot::Sender<ProgressSnapshot>>,
    },
    Snapshot {
        reply: oneshot::Sender<ProgressSnapshot>,
    },
}

/// Cloneable handle for surfaces that talk to a running session.
///
/// Every call returns `None` once the session is over.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl SessionHandle {
    /// Applies an intent and returns the progress afterwards.
    pub async fn send(&self, intent: SessionIntent) -> Option<ProgressSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMessage::Intent {
                intent,
                reply: Some(reply),
            })
            .ok()?;
        rx.await.ok()
    }

    /// Same as `send`, for blocking threads. Must not be called from async code.
    pub fn blocking_send(&self, intent: SessionIntent) -> Option<ProgressSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMessage::Intent {
                intent,
                reply: Some(reply),
            })
            .ok()?;
        rx.blocking_recv().ok()
    }

    /// Queues an intent without waiting. Returns false if the session is over.
    pub fn notify(&self, intent: SessionIntent) -> bool {
        self.tx
            .send(SessionMessage::Intent {
                intent,
                reply: None,
            })
            .is_ok()
    }

    pub async fn snapshot(&self) -> Option<ProgressSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionMessage::Snapshot { reply }).ok()?;
        rx.await.ok()
    }

    pub fn blocking_snapshot(&self) -> Option<ProgressSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionMessage::Snapshot { reply }).ok()?;
        rx.blocking_recv().ok()
    }
}

/// Owns a `GuidedSession` and applies ticks and intents one at a time.
pub struct SessionRunner {
    session: GuidedSession,
    inbox: mpsc::UnboundedReceiver<SessionMessage>,
}

impl SessionRunner {
    pub fn new(mut session: GuidedSession) -> (Self, SessionHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();

        // A weak sender, so a running timer does not keep the inbox open
        // after every handle is gone.
        let ticker = tx.downgrade();
        session.set_tick_sink(move || {
            if let Some(tx) = ticker.upgrade() {
                let _ = tx.send(SessionMessage::Tick);
            }
        });

        (Self { session, inbox }, SessionHandle { tx })
    }

    /// Runs the session until it finishes, is closed, or every handle is
    /// dropped, and returns the completion report.
    pub async fn run(mut self) -> SessionReport {
        self.session.start_session().await;

        while !self.session.phase().is_over() {
            let Some(message) = self.inbox.recv().await else {
                info!("Session handles dropped, closing session");
                return self.session.close_session().await;
            };

            match message {
                SessionMessage::Tick => {
                    self.session.on_tick();
                }
                SessionMessage::Snapshot { reply } => {
                    let _ = reply.send(self.session.snapshot());
                }
                SessionMessage::Intent { intent, reply } => {
                    debug!("Applying {:?}", intent);
                    self.apply(intent).await;
                    if let Some(reply) = reply {
                        let _ = reply.send(self.session.snapshot());
                    }
                }
            }
        }

        self.session.report()
    }

    async fn apply(&mut self, intent: SessionIntent) {
        match intent {
            SessionIntent::ToggleVoice => {
                self.session.toggle_voice().await;
            }
            SessionIntent::TogglePause => {
                self.session.toggle_pause().await;
            }
            SessionIntent::CompleteStep(step_number) => {
                self.session.complete_step(step_number).await;
            }
            SessionIntent::Finish => {
                self.session.finish_session().await;
            }
            SessionIntent::Close => {
                self.session.close_session().await;
            }
        }
    }
}
