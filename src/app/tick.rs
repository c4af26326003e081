use super::App;
use crate::chat::exchange::TurnOutcome;

// Implementation block for tick-related logic in the App.
impl App {
    /// Called on every tick of the application loop.
    ///
    /// Drains events from the in-flight exchange (if any) and applies them
    /// to the conversation, then reports how the turn ended.
    pub fn on_tick(&mut self) {
        self.exchange.pump(&mut self.conversation);
        if let Some(outcome) = self.exchange.take_outcome() {
            self.status_message = match outcome {
                TurnOutcome::Completed => String::from("Reply received."),
                TurnOutcome::Failed => String::from("Reply failed, see the log for details."),
            };
        }
    }
}
