use std::io;

use async_trait::async_trait;

use crate::controller::DecisionTrigger;
use crate::controller::PromptController;

/// Whatever presents a prompt to the user.
///
/// `collect` runs until something ends the prompt and reports what it was.
/// It may adjust the duration selector on the way. It must not call
/// `decide` itself; the broker owns delivery.
#[async_trait]
pub trait PromptFrontend: Send {
    /// Called once a live request is recognized, before the requester's
    /// identity is looked up. Installs whatever must observe teardown for the
    /// rest of the prompt's life. An error ends the prompt as a teardown.
    fn arm(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn collect(&mut self, controller: &mut PromptController) -> io::Result<DecisionTrigger>;

    /// Shows a short, non-interactive message (delivery failures, the
    /// notification acknowledgment).
    fn notice(&mut self, message: &str);
}
