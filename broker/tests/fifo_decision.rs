#![cfg(unix)]

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::io::Read;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rootprompt_broker::AppIdentity;
use rootprompt_broker::Broker;
use rootprompt_broker::BrokerExit;
use rootprompt_broker::DecisionTrigger;
use rootprompt_broker::FifoChannelFactory;
use rootprompt_broker::IdentityResolver;
use rootprompt_broker::PromptController;
use rootprompt_broker::PromptFrontend;
use rootprompt_broker::identity::IdentityError;
use rootprompt_protocol::Activation;
use rootprompt_protocol::Policy;
use tempfile::TempDir;

struct NoIdentity;

impl IdentityResolver for NoIdentity {
    fn resolve(&self, uid: i32) -> Result<AppIdentity, IdentityError> {
        Err(IdentityError::Unknown(uid))
    }
}

struct Answer {
    trigger: DecisionTrigger,
    notices: Vec<String>,
}

#[async_trait]
impl PromptFrontend for Answer {
    async fn collect(&mut self, _controller: &mut PromptController) -> io::Result<DecisionTrigger> {
        Ok(self.trigger)
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

fn answer(trigger: DecisionTrigger) -> Answer {
    Answer {
        trigger,
        notices: Vec::new(),
    }
}

fn mkfifo(path: &Path) -> io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())?;
    if unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Plays the requester: blocks on the FIFO until the broker closes it.
fn requester(path: PathBuf) -> JoinHandle<io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut record = Vec::new();
        File::open(path)?.read_to_end(&mut record)?;
        Ok(record)
    })
}

fn broker() -> Broker {
    Broker::new(
        Arc::new(NoIdentity),
        Arc::new(FifoChannelFactory::new(Duration::from_secs(5))),
        60,
    )
}

fn live_request(fifo: &Path) -> Activation {
    Activation::new()
        .with_str("action", "request")
        .with_int("uid", 10091)
        .with_int("pid", 4321)
        .with_str("fifo", fifo.to_string_lossy())
}

async fn decide_over_fifo(trigger: DecisionTrigger) -> anyhow::Result<Vec<u8>> {
    let dir = TempDir::new()?;
    let fifo = dir.path().join("fifo1");
    mkfifo(&fifo)?;
    let reader = requester(fifo.clone());

    let exit = broker()
        .run(&live_request(&fifo), &mut answer(trigger))
        .await?;
    assert!(exit.is_success(), "unexpected exit: {exit:?}");

    reader
        .join()
        .map_err(|_| anyhow::anyhow!("requester thread panicked"))?
        .map_err(Into::into)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn allow_writes_two() -> anyhow::Result<()> {
    let record = decide_over_fifo(DecisionTrigger::AllowClicked).await?;
    assert_eq!(record, vec![0x00, 0x00, 0x00, 0x02]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dismiss_writes_one() -> anyhow::Result<()> {
    let record = decide_over_fifo(DecisionTrigger::Dismissed).await?;
    assert_eq!(record, vec![0x00, 0x00, 0x00, 0x01]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backgrounding_writes_one() -> anyhow::Result<()> {
    let record = decide_over_fifo(DecisionTrigger::Backgrounded).await?;
    let record: [u8; 4] = record.as_slice().try_into()?;
    assert_eq!(Policy::from_record(record)?, Policy::Deny);
    Ok(())
}

#[tokio::test]
async fn notification_never_touches_the_filesystem() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let activation = Activation::new()
        .with_str("action", "result")
        .with_int("from.uid", 10091)
        .with_int("policy", 2)
        .with_str("fifo", dir.path().join("fifo1").to_string_lossy());
    let mut frontend = answer(DecisionTrigger::AllowClicked);

    let exit = broker().run(&activation, &mut frontend).await?;

    assert!(matches!(exit, BrokerExit::Acknowledged(ref m) if m.contains("authorized")));
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_fifo_is_reported_not_created() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let fifo = dir.path().join("fifo1");
    let mut frontend = answer(DecisionTrigger::AllowClicked);

    let exit = broker().run(&live_request(&fifo), &mut frontend).await?;

    assert!(!exit.is_success());
    assert_eq!(frontend.notices.len(), 1);
    assert!(frontend.notices[0].contains("does not exist"));
    assert!(!fifo.exists());
    Ok(())
}
