//! Turns one activation into either a live prompt or an acknowledgment.

use std::io;
use std::sync::Arc;

use rootprompt_protocol::Activation;
use rootprompt_protocol::ActivationError;
use rootprompt_protocol::RequestDescriptor;
use rootprompt_protocol::RequestMode;

use crate::channel::ChannelFactory;
use crate::channel::FifoChannelFactory;
use crate::config::BrokerConfig;
use crate::controller::DecisionTrigger;
use crate::controller::LivePrompt;
use crate::controller::PromptController;
use crate::controller::PromptOutcome;
use crate::duration::DurationSelector;
use crate::frontend::PromptFrontend;
use crate::identity::AppDataDirResolver;
use crate::identity::AppIdentity;
use crate::identity::ChainResolver;
use crate::identity::IdentityResolver;
use crate::identity::PasswdResolver;
use crate::identity::resolve_or_placeholder;

/// Result of a notification activation: a line to show and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub identity: AppIdentity,
    pub authorized: bool,
}

impl Acknowledgement {
    pub fn message(&self) -> String {
        let verdict = if self.authorized {
            "authorized"
        } else {
            "rejected"
        };
        format!("{} {verdict}!", self.identity.display_name)
    }
}

pub enum Activated {
    Prompt(PromptController),
    Acknowledge(Acknowledgement),
}

#[derive(Debug)]
pub enum BrokerExit {
    Decided(PromptOutcome),
    /// The front-end broke before the user answered; the prompt was torn
    /// down and denied.
    FrontendFailed {
        outcome: PromptOutcome,
        error: io::Error,
    },
    Acknowledged(String),
}

impl BrokerExit {
    pub fn outcome(&self) -> Option<&PromptOutcome> {
        match self {
            BrokerExit::Decided(outcome) | BrokerExit::FrontendFailed { outcome, .. } => {
                Some(outcome)
            }
            BrokerExit::Acknowledged(_) => None,
        }
    }

    /// True when the user answered (or was acknowledged) and any decision
    /// reached the channel.
    pub fn is_success(&self) -> bool {
        match self {
            BrokerExit::Decided(outcome) => {
                !matches!(outcome, PromptOutcome::DeliveryFailed { .. })
            }
            BrokerExit::FrontendFailed { .. } => false,
            BrokerExit::Acknowledged(_) => true,
        }
    }
}

pub struct Broker {
    resolver: Arc<dyn IdentityResolver>,
    channels: Arc<dyn ChannelFactory>,
    max_duration_minutes: u32,
}

impl Broker {
    pub fn new(
        resolver: Arc<dyn IdentityResolver>,
        channels: Arc<dyn ChannelFactory>,
        max_duration_minutes: u32,
    ) -> Self {
        Self {
            resolver,
            channels,
            max_duration_minutes,
        }
    }

    /// Real FIFOs, package directories first and the user database second.
    pub fn from_config(config: &BrokerConfig) -> Self {
        let resolver = ChainResolver::new()
            .with(AppDataDirResolver::new(config.app_data_dir.clone()))
            .with(PasswdResolver);
        Self::new(
            Arc::new(resolver),
            Arc::new(FifoChannelFactory::new(config.fifo_open_timeout())),
            config.max_duration_minutes,
        )
    }

    /// Validates the activation and builds what should be shown.
    ///
    /// On error nothing has been opened or shown.
    pub fn prepare(&self, activation: &Activation) -> Result<Activated, ActivationError> {
        let descriptor = RequestDescriptor::from_activation(activation)?;
        Ok(self.activate(&descriptor))
    }

    fn activate(&self, descriptor: &RequestDescriptor) -> Activated {
        let identity = resolve_or_placeholder(self.resolver.as_ref(), descriptor.requesting_uid());
        match LivePrompt::from_descriptor(descriptor) {
            Some(prompt) => {
                let sink = self.channels.channel_for(prompt.channel());
                Activated::Prompt(PromptController::new(
                    prompt,
                    identity,
                    DurationSelector::new(self.max_duration_minutes),
                    sink,
                ))
            }
            None => {
                let ack = Acknowledgement {
                    identity,
                    authorized: descriptor.was_authorized(),
                };
                tracing::info!(
                    uid = descriptor.requesting_uid(),
                    authorized = ack.authorized,
                    "acknowledging notification"
                );
                Activated::Acknowledge(ack)
            }
        }
    }

    /// Runs one activation to completion.
    pub async fn run(
        &self,
        activation: &Activation,
        frontend: &mut dyn PromptFrontend,
    ) -> Result<BrokerExit, ActivationError> {
        let descriptor = RequestDescriptor::from_activation(activation)?;
        Ok(self.run_request(&descriptor, frontend).await)
    }

    /// Runs an already validated request to completion.
    ///
    /// A front-end failure is treated as teardown, so a live request always
    /// ends with exactly one record attempted.
    pub async fn run_request(
        &self,
        descriptor: &RequestDescriptor,
        frontend: &mut dyn PromptFrontend,
    ) -> BrokerExit {
        // Teardown must be observable before the identity lookup starts.
        let armed = match descriptor.mode() {
            RequestMode::LiveRequest => frontend.arm(),
            RequestMode::Notification => Ok(()),
        };
        match self.activate(descriptor) {
            Activated::Prompt(mut controller) => {
                let collected = match armed {
                    Ok(()) => frontend.collect(&mut controller).await,
                    Err(err) => Err(err),
                };
                let trigger = match &collected {
                    Ok(trigger) => *trigger,
                    Err(err) => {
                        tracing::error!("prompt front-end failed: {err}");
                        DecisionTrigger::Teardown
                    }
                };
                let outcome = controller.decide(trigger).await;
                if let Some(notice) = outcome.notice() {
                    frontend.notice(&notice);
                }
                match collected {
                    Ok(_) => BrokerExit::Decided(outcome),
                    Err(error) => BrokerExit::FrontendFailed { outcome, error },
                }
            }
            Activated::Acknowledge(ack) => {
                let message = ack.message();
                frontend.notice(&message);
                BrokerExit::Acknowledged(message)
            }
        }
    }
}
