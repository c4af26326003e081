use log::info;

use super::App;

// Implementation block for turn submission and session reset.
impl App {
    /// Submits the composer content as a new turn.
    ///
    /// Turns are serialized: while a reply is still streaming the input is
    /// left untouched and the status bar says so.
    pub(crate) fn submit_prompt(&mut self) {
        if self.exchange.is_busy() {
            self.status_message = format!("{} is still responding...", self.assistant_name);
            return;
        }
        if self.composer.buffer().trim().is_empty() {
            return;
        }
        let input = self.composer.take();
        if self
            .exchange
            .begin_turn(&mut self.conversation, &self.document, &input)
        {
            self.transcript.follow();
            self.status_message = format!("Waiting for {}...", self.model_name);
            info!("turn submitted ({} chars)", input.trim().chars().count());
        }
    }

    /// Clears the conversation, the persisted slot and the document context.
    pub(crate) fn reset_session(&mut self) {
        if self.exchange.is_busy() {
            self.status_message = String::from("Cannot reset while a reply is in flight.");
            return;
        }
        self.conversation.clear();
        self.document.clear();
        self.transcript.follow();
        self.status_message = String::from("Conversation cleared.");
        info!("session reset");
    }
}
