mod args;
pub mod hardening;
pub mod logging;

use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use rootprompt_broker::Broker;
use rootprompt_broker::BrokerConfig;
use rootprompt_broker::BrokerExit;
use rootprompt_broker::PromptFrontend;
use rootprompt_broker::find_rootprompt_home;
use rootprompt_protocol::ActivationError;
use rootprompt_protocol::RequestDescriptor;
use rootprompt_protocol::RequestMode;
use rootprompt_tui::TerminalFrontend;

pub use args::Cli;
pub use args::ExtraError;

/// Process exit status, as seen by whoever launched the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerStatus {
    /// A decision was delivered, or a notification was acknowledged.
    Done,
    /// A decision was made but could not be written to the channel.
    DeliveryFailed,
    /// The activation lacked `action` (or `fifo` for a live request).
    MalformedActivation,
    /// The broker could not start, or the prompt broke before an answer.
    StartupFailed,
}

impl BrokerStatus {
    pub fn code(self) -> u8 {
        match self {
            BrokerStatus::Done => 0,
            BrokerStatus::DeliveryFailed => 1,
            BrokerStatus::MalformedActivation => 2,
            BrokerStatus::StartupFailed => 3,
        }
    }

    pub fn from_exit(exit: &BrokerExit) -> Self {
        match exit {
            BrokerExit::FrontendFailed { .. } => BrokerStatus::StartupFailed,
            exit if exit.is_success() => BrokerStatus::Done,
            _ => BrokerStatus::DeliveryFailed,
        }
    }
}

impl From<BrokerStatus> for ExitCode {
    fn from(status: BrokerStatus) -> Self {
        ExitCode::from(status.code())
    }
}

fn resolve_home(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => find_rootprompt_home().context("could not locate the rootprompt home directory"),
    }
}

/// Runs one activation with the terminal front-end.
pub async fn run_main(cli: Cli) -> anyhow::Result<BrokerStatus> {
    let home = resolve_home(&cli)?;
    let config = BrokerConfig::load(&home)?;
    let mut frontend = TerminalFrontend::new(config.deny_on_focus_loss);
    run_with_frontend(cli, &home, config, &mut frontend).await
}

pub async fn run_with_frontend(
    cli: Cli,
    home: &Path,
    config: BrokerConfig,
    frontend: &mut dyn PromptFrontend,
) -> anyhow::Result<BrokerStatus> {
    let activation = match cli.activation() {
        Ok(activation) => activation,
        Err(err) => {
            frontend.notice(&err.to_string());
            return Ok(BrokerStatus::MalformedActivation);
        }
    };

    let descriptor = match RequestDescriptor::from_activation(&activation) {
        Ok(descriptor) => descriptor,
        // Without a mode there is nothing to show and nobody to answer.
        Err(ActivationError::MissingAction) => return Ok(BrokerStatus::MalformedActivation),
        Err(err @ ActivationError::MissingChannel) => {
            frontend.notice(&err.to_string());
            return Ok(BrokerStatus::MalformedActivation);
        }
    };

    // Notifications leave no trace on disk, so only live requests get a log
    // file. A broken log directory must not keep the requester waiting.
    let _log_guard = match descriptor.mode() {
        RequestMode::LiveRequest => match logging::init(&config.log_dir(home)) {
            Ok(guard) => Some(guard),
            Err(err) => {
                frontend.notice(&format!("logging disabled: {err}"));
                None
            }
        },
        RequestMode::Notification => None,
    };

    let broker = Broker::from_config(&config);
    let exit = broker.run_request(&descriptor, frontend).await;
    let status = BrokerStatus::from_exit(&exit);
    tracing::info!(?status, "broker finished");
    Ok(status)
}
