//! Consent broker core: decides whether a pending root request is allowed and
//! answers the requester exactly once over its decision channel.

#![cfg(unix)]

mod broker;
pub mod channel;
pub mod config;
pub mod controller;
pub mod duration;
mod frontend;
pub mod identity;
mod latch;

pub use broker::Acknowledgement;
pub use broker::Activated;
pub use broker::Broker;
pub use broker::BrokerExit;
pub use channel::ChannelError;
pub use channel::ChannelFactory;
pub use channel::DecisionSink;
pub use channel::FifoChannel;
pub use channel::FifoChannelFactory;
pub use config::BrokerConfig;
pub use config::ConfigError;
pub use config::find_rootprompt_home;
pub use controller::DecisionTrigger;
pub use controller::LivePrompt;
pub use controller::PromptController;
pub use controller::PromptOutcome;
pub use controller::PromptPhase;
pub use duration::DurationSelector;
pub use duration::GrantDuration;
pub use duration::NotifyToggle;
pub use frontend::PromptFrontend;
pub use identity::AppIdentity;
pub use identity::IdentityResolver;
pub use latch::ClaimedDecision;
pub use latch::DecisionLatch;
