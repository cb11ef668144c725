//! Lifecycle of one live prompt.
//!
//! ```text
//!  Shown --(allow | deny | dismiss | background | teardown)--> Deciding --> Decided
//! ```
//!
//! Whatever ends the prompt, the first trigger claims the [`DecisionLatch`]
//! and is the only one that reaches the channel. Anything other than an
//! explicit allow writes [`Policy::Deny`], so the requester blocked on the
//! FIFO always gets an answer.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use rootprompt_protocol::Policy;
use rootprompt_protocol::RequestDescriptor;
use rootprompt_protocol::RequestKind;
use strum_macros::Display;

use crate::channel::ChannelError;
use crate::channel::DecisionSink;
use crate::duration::DurationSelector;
use crate::identity::AppIdentity;
use crate::latch::ClaimedDecision;
use crate::latch::DecisionLatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DecisionTrigger {
    AllowClicked,
    DenyClicked,
    /// Back, Esc, Ctrl+C: the prompt was closed without a choice.
    Dismissed,
    /// The prompt lost the foreground.
    Backgrounded,
    /// The broker is being torn down (signal, front-end failure, drop).
    Teardown,
}

impl DecisionTrigger {
    pub fn policy(self) -> Policy {
        match self {
            DecisionTrigger::AllowClicked => Policy::Allow,
            DecisionTrigger::DenyClicked
            | DecisionTrigger::Dismissed
            | DecisionTrigger::Backgrounded
            | DecisionTrigger::Teardown => Policy::Deny,
        }
    }

    pub fn is_explicit(self) -> bool {
        matches!(
            self,
            DecisionTrigger::AllowClicked | DecisionTrigger::DenyClicked
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PromptPhase {
    Shown,
    Deciding,
    Decided,
}

#[derive(Debug)]
pub enum PromptOutcome {
    Delivered {
        policy: Policy,
        trigger: DecisionTrigger,
    },
    /// The record could not be written. Not retried: the requester treats a
    /// missing answer the same way.
    DeliveryFailed {
        policy: Policy,
        trigger: DecisionTrigger,
        error: ChannelError,
    },
    /// A previous trigger already claimed the channel; nothing was written.
    AlreadyDecided { policy: Policy },
}

impl PromptOutcome {
    pub fn policy(&self) -> Policy {
        match self {
            PromptOutcome::Delivered { policy, .. }
            | PromptOutcome::DeliveryFailed { policy, .. }
            | PromptOutcome::AlreadyDecided { policy } => *policy,
        }
    }

    /// Transient message for the user, if this outcome needs one.
    pub fn notice(&self) -> Option<String> {
        match self {
            PromptOutcome::DeliveryFailed { error, .. } => Some(error.to_string()),
            PromptOutcome::Delivered { .. } | PromptOutcome::AlreadyDecided { .. } => None,
        }
    }
}

/// The parts of a live request the prompt needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivePrompt {
    pub uid: i32,
    pub pid: i32,
    pub channel: PathBuf,
}

impl LivePrompt {
    /// `None` for notifications, which never get a prompt.
    pub fn from_descriptor(descriptor: &RequestDescriptor) -> Option<Self> {
        match descriptor.kind() {
            RequestKind::Live { channel } => Some(Self {
                uid: descriptor.requesting_uid(),
                pid: descriptor.requesting_pid(),
                channel: channel.clone(),
            }),
            RequestKind::Notification { .. } => None,
        }
    }

    pub fn channel(&self) -> &Path {
        &self.channel
    }
}

pub struct PromptController {
    prompt: LivePrompt,
    identity: AppIdentity,
    duration: DurationSelector,
    latch: DecisionLatch,
    phase: PromptPhase,
    sink: Arc<dyn DecisionSink>,
}

impl PromptController {
    pub fn new(
        prompt: LivePrompt,
        identity: AppIdentity,
        duration: DurationSelector,
        sink: Arc<dyn DecisionSink>,
    ) -> Self {
        tracing::info!(
            uid = prompt.uid,
            pid = prompt.pid,
            package = %identity.package,
            "prompt shown"
        );
        Self {
            prompt,
            identity,
            duration,
            latch: DecisionLatch::new(),
            phase: PromptPhase::Shown,
            sink,
        }
    }

    pub fn prompt(&self) -> &LivePrompt {
        &self.prompt
    }

    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }

    pub fn duration(&self) -> &DurationSelector {
        &self.duration
    }

    /// Duration changes are only meaningful before a decision is claimed.
    pub fn duration_mut(&mut self) -> Option<&mut DurationSelector> {
        (self.phase == PromptPhase::Shown).then_some(&mut self.duration)
    }

    pub fn phase(&self) -> PromptPhase {
        self.phase
    }

    pub fn is_decided(&self) -> bool {
        self.latch.is_claimed()
    }

    /// Resolves the prompt, running the channel write on the blocking pool.
    ///
    /// The write is awaited, so once this returns the record has been
    /// written or has definitively failed.
    pub async fn decide(&mut self, trigger: DecisionTrigger) -> PromptOutcome {
        let decision = match self.begin(trigger) {
            Ok(decision) => decision,
            Err(outcome) => return outcome,
        };
        let sink = Arc::clone(&self.sink);
        let result = tokio::task::spawn_blocking(move || sink.deliver(decision.policy))
            .await
            .unwrap_or_else(|err| Err(ChannelError::Task(err.to_string())));
        self.complete(decision, result)
    }

    /// Same as [`PromptController::decide`] for callers outside a runtime.
    pub fn decide_blocking(&mut self, trigger: DecisionTrigger) -> PromptOutcome {
        let decision = match self.begin(trigger) {
            Ok(decision) => decision,
            Err(outcome) => return outcome,
        };
        let result = self.sink.deliver(decision.policy);
        self.complete(decision, result)
    }

    /// The on-cancel handler: denies unless something already decided.
    pub fn finalize(&mut self) -> PromptOutcome {
        self.decide_blocking(DecisionTrigger::Teardown)
    }

    fn begin(&mut self, trigger: DecisionTrigger) -> Result<ClaimedDecision, PromptOutcome> {
        match self.latch.claim(trigger) {
            Ok(decision) => {
                self.phase = PromptPhase::Deciding;
                tracing::info!(
                    uid = self.prompt.uid,
                    pid = self.prompt.pid,
                    policy = %decision.policy,
                    trigger = %decision.trigger,
                    duration = %self.duration.duration(),
                    "decision claimed"
                );
                Ok(decision)
            }
            Err(existing) => {
                tracing::debug!(
                    ignored = %trigger,
                    decided_by = %existing.trigger,
                    "prompt already decided"
                );
                Err(PromptOutcome::AlreadyDecided {
                    policy: existing.policy,
                })
            }
        }
    }

    fn complete(
        &mut self,
        decision: ClaimedDecision,
        result: Result<(), ChannelError>,
    ) -> PromptOutcome {
        self.phase = PromptPhase::Decided;
        match result {
            Ok(()) => PromptOutcome::Delivered {
                policy: decision.policy,
                trigger: decision.trigger,
            },
            Err(error) => {
                tracing::warn!(policy = %decision.policy, "decision not delivered: {error}");
                PromptOutcome::DeliveryFailed {
                    policy: decision.policy,
                    trigger: decision.trigger,
                    error,
                }
            }
        }
    }
}

impl Drop for PromptController {
    fn drop(&mut self) {
        if !self.latch.is_claimed() {
            tracing::warn!("prompt dropped without a decision, denying");
            let _ = self.finalize();
        }
    }
}
