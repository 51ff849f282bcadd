//! Pane orchestration.
//!
//! Routes each submitted draft to the right flow: literal messages go to
//! the invoking pane's conversation, `/newpane` creates a conversation
//! and a pane for it, then delivers the argument as the first message.
//! All registry mutation happens on the caller's thread; bridge work runs
//! on spawned tasks that report back over an internal channel drained by
//! [`Orchestrator::process_events`].
//!
//! Ordering: each bound pane owns one outbox task that delivers its
//! messages strictly in submission order. Nothing is ever delivered to a
//! new conversation before its creation has resolved, because the first
//! message is only enqueued while handling the completion event.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bridge::{BridgeError, ConversationBridge};
use crate::command::{parse_submission, Submission};
use crate::config::ConfigId;
use crate::conversation::ConversationId;
use crate::pane::{PaneId, PaneRegistry};

/// What a submission did, so the input surface knows whether to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing happened; the draft stays as typed.
    Ignored,
    /// The draft went out as a message; clear it.
    MessageQueued,
    /// The draft started a new-pane command; clear it.
    PaneRequested,
}

/// User-facing notices produced while processing bridge events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneNotice {
    /// A new pane was opened and made active.
    PaneOpened { pane: PaneId },
    /// A `/newpane` command failed before its pane existed. `pane` is the
    /// invoking pane, when it still exists.
    CommandFailed {
        pane: Option<PaneId>,
        error: String,
    },
    /// A message could not be delivered. `pane` is absent when the pane
    /// was closed while the send was in flight.
    SendFailed {
        pane: Option<PaneId>,
        error: String,
    },
}

/// Completions reported back by spawned bridge tasks.
enum BridgeDone {
    Created {
        origin: PaneId,
        content: String,
        result: Result<ConversationId, BridgeError>,
    },
    SendFailed {
        pane: PaneId,
        error: BridgeError,
    },
}

/// Coordinates panes, drafts-in-flight, and the conversation bridge.
pub struct Orchestrator {
    bridge: Arc<dyn ConversationBridge>,
    panes: PaneRegistry,
    outboxes: HashMap<PaneId, mpsc::UnboundedSender<String>>,
    done_tx: mpsc::UnboundedSender<BridgeDone>,
    done_rx: mpsc::UnboundedReceiver<BridgeDone>,
}

impl Orchestrator {
    pub fn new(bridge: Arc<dyn ConversationBridge>) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            bridge,
            panes: PaneRegistry::new(),
            outboxes: HashMap::new(),
            done_tx,
            done_rx,
        }
    }

    /// The pane registry, read-only.
    pub fn panes(&self) -> &PaneRegistry {
        &self.panes
    }

    /// The single active pane, if any.
    pub fn active_pane(&self) -> Option<PaneId> {
        self.panes.active()
    }

    /// The pane whose input should hold focus: active AND bound to a
    /// conversation. Re-derived on every query, so it follows both
    /// activation changes and a binding resolving later.
    pub fn focused_pane(&self) -> Option<PaneId> {
        let active = self.panes.active()?;
        let pane = self.panes.get(active)?;
        pane.conversation().map(|_| active)
    }

    /// Mark a pane active. Unknown ids are a benign no-op.
    pub fn activate(&mut self, pane: PaneId) {
        self.panes.set_active(pane);
    }

    /// Close a pane.
    ///
    /// In-flight bridge work for the pane is not cancelled: its outbox
    /// drains whatever was already queued, and late completions against
    /// the gone pane are dropped when processed.
    pub fn close_pane(&mut self, pane: PaneId) {
        self.outboxes.remove(&pane);
        self.panes.remove(pane);
    }

    /// Open a conversation in a pane.
    ///
    /// With `open_in_new_pane`, a fresh pane is always created. Without
    /// it, an existing pane already showing the conversation is activated
    /// instead; bindings are never reassigned, so if no pane shows it a
    /// fresh pane is created anyway. The pane ends up active either way.
    pub fn open_conversation(
        &mut self,
        conversation: ConversationId,
        open_in_new_pane: bool,
    ) -> PaneId {
        if !open_in_new_pane {
            if let Some(existing) = self.panes.find_by_conversation(&conversation) {
                self.panes.set_active(existing);
                return existing;
            }
        }
        self.register_pane(conversation)
    }

    /// Handle one submitted draft from a pane.
    ///
    /// The caller clears the draft whenever the outcome is not
    /// [`SubmitOutcome::Ignored`]; a failed or lost send never restores
    /// it.
    pub fn submit(&mut self, pane: PaneId, draft: &str) -> SubmitOutcome {
        match parse_submission(draft) {
            Submission::Ignore => SubmitOutcome::Ignored,
            Submission::Message(text) => self.queue_message(pane, text),
            Submission::NewPane(content) => self.request_pane(pane, content),
        }
    }

    /// Queue a message onto the pane's conversation, preserving the
    /// pane's submission order.
    fn queue_message(&mut self, pane: PaneId, text: String) -> SubmitOutcome {
        // Stale pane or one whose conversation has not resolved yet:
        // keep the draft, do nothing
        if self
            .panes
            .get(pane)
            .and_then(|p| p.conversation())
            .is_none()
        {
            return SubmitOutcome::Ignored;
        }
        let Some(outbox) = self.outboxes.get(&pane) else {
            return SubmitOutcome::Ignored;
        };
        if outbox.send(text).is_err() {
            warn!(%pane, "outbox task gone, dropping submission");
            return SubmitOutcome::Ignored;
        }
        SubmitOutcome::MessageQueued
    }

    /// Start the create-then-deliver flow for `/newpane`.
    fn request_pane(&mut self, origin: PaneId, content: String) -> SubmitOutcome {
        if self.panes.get(origin).is_none() {
            return SubmitOutcome::Ignored;
        }

        // The spawned pane starts with the configuration of its origin
        let inherited = self.inherited_config(origin);

        let bridge = Arc::clone(&self.bridge);
        let done = self.done_tx.clone();
        debug!(%origin, "requesting conversation for new pane");
        tokio::spawn(async move {
            let result = bridge.create_conversation(inherited).await;
            let _ = done.send(BridgeDone::Created {
                origin,
                content,
                result,
            });
        });

        SubmitOutcome::PaneRequested
    }

    /// Configuration id of the conversation shown in `pane`, if any.
    fn inherited_config(&self, pane: PaneId) -> Option<ConfigId> {
        let conversation = self.panes.get(pane)?.conversation()?;
        let record = self.bridge.watch_conversation(conversation).ok()?;
        let config = record.borrow().config_id.clone();
        config
    }

    /// Drain completed bridge work, mutating the registry and returning
    /// notices for the user. Call this on every UI tick.
    pub fn process_events(&mut self) -> Vec<PaneNotice> {
        let mut notices = Vec::new();
        while let Ok(event) = self.done_rx.try_recv() {
            match event {
                BridgeDone::Created {
                    origin,
                    content,
                    result,
                } => match result {
                    Ok(conversation) => {
                        let pane = self.register_pane(conversation);
                        // The conversation resolved before we got here,
                        // so the first message is safe to deliver now
                        self.queue_message(pane, content);
                        debug!(%pane, "new pane opened");
                        notices.push(PaneNotice::PaneOpened { pane });
                    }
                    Err(e) => {
                        warn!(%origin, error = %e, "new pane command failed");
                        notices.push(PaneNotice::CommandFailed {
                            pane: self.panes.get(origin).map(|_| origin),
                            error: e.to_string(),
                        });
                    }
                },
                BridgeDone::SendFailed { pane, error } => {
                    warn!(%pane, error = %error, "message delivery failed");
                    notices.push(PaneNotice::SendFailed {
                        pane: self.panes.get(pane).map(|_| pane),
                        error: error.to_string(),
                    });
                }
            }
        }
        notices
    }

    /// Register a pane bound to `conversation`, start its outbox, and
    /// make it active.
    fn register_pane(&mut self, conversation: ConversationId) -> PaneId {
        let pane = self.panes.add(Some(conversation.clone()));
        let outbox = self.spawn_outbox(pane, conversation);
        self.outboxes.insert(pane, outbox);
        self.panes.set_active(pane);
        pane
    }

    /// One forwarder task per pane: messages go out strictly in the order
    /// they were queued. Dropping the sender lets the task drain and
    /// exit.
    fn spawn_outbox(
        &self,
        pane: PaneId,
        conversation: ConversationId,
    ) -> mpsc::UnboundedSender<String> {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let bridge = Arc::clone(&self.bridge);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if let Err(error) = bridge.send_message(&conversation, &text).await {
                    let _ = done.send(BridgeDone::SendFailed { pane, error });
                }
            }
        });
        tx
    }
}
