use std::process::ExitCode;

use clap::Parser;
use rootprompt_cli::BrokerStatus;
use rootprompt_cli::Cli;
use rootprompt_cli::run_main;

#[ctor::ctor]
fn pre_main() {
    rootprompt_cli::hardening::pre_main_hardening();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_main(cli).await {
        Ok(status) => status.into(),
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("rootprompt: {err:#}");
            }
            BrokerStatus::StartupFailed.into()
        }
    }
}
