use std::future::Future;
use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use crossterm::event::Event;
use crossterm::event::EventStream;
use ratatui::backend::Backend;
use rootprompt_broker::DecisionTrigger;
use rootprompt_broker::PromptController;
use rootprompt_broker::PromptFrontend;
use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;
use tokio_stream::Stream;
use tokio_stream::StreamExt;

use crate::prompt_view::PromptView;
use crate::prompt_view::handle_key;
use crate::terminal;

type TeardownSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Shows the prompt inline in the controlling terminal.
pub struct TerminalFrontend {
    deny_on_focus_loss: bool,
    teardown: Option<TeardownSignal>,
}

impl TerminalFrontend {
    pub fn new(deny_on_focus_loss: bool) -> Self {
        Self {
            deny_on_focus_loss,
            teardown: None,
        }
    }
}

#[async_trait]
impl PromptFrontend for TerminalFrontend {
    fn arm(&mut self) -> io::Result<()> {
        if self.teardown.is_none() {
            self.teardown = Some(teardown_signals()?);
        }
        Ok(())
    }

    async fn collect(&mut self, controller: &mut PromptController) -> io::Result<DecisionTrigger> {
        let teardown = match self.teardown.take() {
            Some(teardown) => teardown,
            None => teardown_signals()?,
        };
        let mut terminal = terminal::init()?;
        let result = drive(
            &mut terminal,
            controller,
            EventStream::new(),
            teardown,
            self.deny_on_focus_loss,
        )
        .await;
        let _ = terminal.clear();
        terminal::restore()?;
        result
    }

    #[allow(clippy::print_stderr)]
    fn notice(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// Runs the prompt until a key, a focus change, a teardown signal or the end
/// of input resolves it. Never claims the decision itself.
pub(crate) async fn drive<B, S>(
    terminal: &mut ratatui::Terminal<B>,
    controller: &mut PromptController,
    mut events: S,
    teardown: impl Future<Output = ()>,
    deny_on_focus_loss: bool,
) -> io::Result<DecisionTrigger>
where
    B: Backend,
    S: Stream<Item = io::Result<Event>> + Unpin,
{
    tokio::pin!(teardown);
    loop {
        terminal.draw(|frame| {
            frame.render_widget_ref(&PromptView::new(controller), frame.area());
        })?;

        let event = tokio::select! {
            () = &mut teardown => return Ok(DecisionTrigger::Teardown),
            event = events.next() => event,
        };
        match event {
            Some(Ok(Event::Key(key_event))) => {
                if let Some(trigger) = handle_key(controller, key_event) {
                    return Ok(trigger);
                }
            }
            Some(Ok(Event::FocusLost)) if deny_on_focus_loss => {
                return Ok(DecisionTrigger::Backgrounded);
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => return Err(err),
            None => {
                tracing::warn!("terminal input closed before a decision");
                return Ok(DecisionTrigger::Teardown);
            }
        }
    }
}

fn teardown_signals() -> io::Result<TeardownSignal> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;
    Ok(Box::pin(async move {
        let name = tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = hangup.recv() => "SIGHUP",
            _ = interrupt.recv() => "SIGINT",
            _ = quit.recv() => "SIGQUIT",
        };
        tracing::info!(signal = name, "tearing down prompt");
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::Mutex;

    use crossterm::event::KeyCode;
    use crossterm::event::KeyEvent;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use rootprompt_broker::AppIdentity;
    use rootprompt_broker::ChannelError;
    use rootprompt_broker::DecisionSink;
    use rootprompt_broker::DurationSelector;
    use rootprompt_broker::GrantDuration;
    use rootprompt_broker::LivePrompt;
    use rootprompt_protocol::Policy;

    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<Policy>>,
    }

    impl DecisionSink for RecordingSink {
        fn deliver(&self, policy: Policy) -> Result<(), ChannelError> {
            if let Ok(mut writes) = self.writes.lock() {
                writes.push(policy);
            }
            Ok(())
        }
    }

    fn controller() -> PromptController {
        PromptController::new(
            LivePrompt {
                uid: 10091,
                pid: 4321,
                channel: PathBuf::from("/tmp/fifo1"),
            },
            AppIdentity::placeholder(),
            DurationSelector::new(60),
            Arc::new(RecordingSink::default()),
        )
    }

    fn key(code: KeyCode) -> io::Result<Event> {
        Ok(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    async fn run(
        events: Vec<io::Result<Event>>,
        deny_on_focus_loss: bool,
    ) -> io::Result<DecisionTrigger> {
        let mut controller = controller();
        let mut terminal = Terminal::new(TestBackend::new(70, 10))?;
        drive(
            &mut terminal,
            &mut controller,
            tokio_stream::iter(events),
            std::future::pending(),
            deny_on_focus_loss,
        )
        .await
    }

    #[tokio::test]
    async fn allow_key_resolves_after_slider_moves() -> anyhow::Result<()> {
        let mut controller = controller();
        let mut terminal = Terminal::new(TestBackend::new(70, 10))?;

        let trigger = drive(
            &mut terminal,
            &mut controller,
            tokio_stream::iter(vec![
                key(KeyCode::Right),
                key(KeyCode::Right),
                key(KeyCode::Char('a')),
                key(KeyCode::Char('d')),
            ]),
            std::future::pending(),
            true,
        )
        .await?;

        assert_eq!(trigger, DecisionTrigger::AllowClicked);
        assert_eq!(controller.duration().duration(), GrantDuration::Minutes(2));
        // Resolving is left to the broker.
        assert!(!controller.is_decided());
        let outcome = controller.decide(trigger).await;
        assert_eq!(outcome.policy(), Policy::Allow);
        Ok(())
    }

    #[tokio::test]
    async fn focus_loss_backgrounds_when_configured() -> anyhow::Result<()> {
        let trigger = run(vec![Ok(Event::FocusLost), key(KeyCode::Char('a'))], true).await?;
        assert_eq!(trigger, DecisionTrigger::Backgrounded);

        let trigger = run(vec![Ok(Event::FocusLost), key(KeyCode::Char('a'))], false).await?;
        assert_eq!(trigger, DecisionTrigger::AllowClicked);
        Ok(())
    }

    #[tokio::test]
    async fn closed_input_tears_down() -> anyhow::Result<()> {
        let trigger = run(vec![key(KeyCode::Left)], true).await?;
        assert_eq!(trigger, DecisionTrigger::Teardown);
        Ok(())
    }

    #[tokio::test]
    async fn input_errors_propagate() {
        let result = run(vec![Err(io::Error::other("tty gone"))], true).await;
        assert_eq!(
            result.err().map(|err| err.to_string()),
            Some("tty gone".to_string())
        );
    }

    #[tokio::test]
    async fn arm_installs_teardown_handlers_once() -> anyhow::Result<()> {
        let mut frontend = TerminalFrontend::new(true);
        assert!(frontend.teardown.is_none());

        frontend.arm()?;
        assert!(frontend.teardown.is_some());
        frontend.arm()?;
        assert!(frontend.teardown.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn teardown_signal_wins_over_pending_input() -> anyhow::Result<()> {
        let mut controller = controller();
        let mut terminal = Terminal::new(TestBackend::new(70, 10))?;

        let trigger = drive(
            &mut terminal,
            &mut controller,
            tokio_stream::pending::<io::Result<Event>>(),
            std::future::ready(()),
            true,
        )
        .await?;

        assert_eq!(trigger, DecisionTrigger::Teardown);
        Ok(())
    }
}
