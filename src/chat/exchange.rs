//! One request/response turn against the completion endpoint.
//!
//! The controller owns the turn state machine
//! `Idle → Sending → Streaming → Finalizing → Idle` (with `Errored` also
//! draining back to `Idle`). The wire side of a turn runs as one spawned
//! task that pulls deltas from the response stream and forwards them over an
//! event channel; the controller applies those events on the UI task, which
//! is the single writer of the conversation store.

use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::chat::client::{CompletionBackend, RequestMessage};
use crate::chat::context::{DocumentContext, compose_outbound};
use crate::chat::message::{Message, Sender};
use crate::chat::store::ConversationStore;
use crate::chat::stream::{Delta, DeltaStream};

/// Marker appended to the placeholder while content is still streaming in.
/// A finalized message never contains it.
pub const CURSOR_MARKER: &str = "▌";

/// Fixed user-facing text shown when a turn fails.
pub const FAILURE_TEXT: &str = "Something went wrong. Please try again.";

/// Where the controller currently is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    Idle,
    Sending,
    Streaming,
    Finalizing,
    Errored,
}

/// How the last turn ended. Consumed by the shell for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed,
}

/// Events emitted by the wire task, applied in arrival order.
#[derive(Debug)]
enum ExchangeEvent {
    /// The endpoint accepted the request and the response stream is open.
    Opened,
    /// One content delta of the assistant reply.
    Delta(String),
    /// The stream ended (terminate sentinel or end-of-input).
    Closed,
    /// Transport or stream failure; carries the diagnostic detail.
    Failed(String),
}

/// Orchestrates one exchange at a time.
///
/// Precondition of the whole design: at most one turn is in flight.
/// `begin_turn` refuses while busy, so at most one placeholder/accumulator
/// pair can ever be live.
pub struct ExchangeController {
    backend: Arc<dyn CompletionBackend>,
    system_prompt: String,
    typing_indicator: String,
    phase: ExchangePhase,
    accumulator: String,
    last_outcome: Option<TurnOutcome>,
    events_tx: UnboundedSender<ExchangeEvent>,
    events_rx: UnboundedReceiver<ExchangeEvent>,
}

impl ExchangeController {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        system_prompt: String,
        assistant_name: &str,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            system_prompt,
            typing_indicator: format!("{assistant_name} is typing..."),
            phase: ExchangePhase::Idle,
            accumulator: String::new(),
            last_outcome: None,
            events_tx: tx,
            events_rx: rx,
        }
    }

    pub fn phase(&self) -> ExchangePhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != ExchangePhase::Idle
    }

    /// Returns and clears the outcome of the most recently finished turn.
    pub fn take_outcome(&mut self) -> Option<TurnOutcome> {
        self.last_outcome.take()
    }

    /// Starts a new turn. Returns `false` without touching the conversation
    /// when the trimmed input is empty or a turn is already in flight.
    ///
    /// On success the user message and the typing placeholder are appended
    /// (and persisted), and the wire task is spawned.
    pub fn begin_turn(
        &mut self,
        store: &mut ConversationStore,
        document: &DocumentContext,
        input: &str,
    ) -> bool {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            debug!("ignoring empty input");
            return false;
        }
        if self.is_busy() {
            warn!("turn refused, an exchange is already in flight");
            return false;
        }

        // Wire history is snapshotted before the new user message lands so
        // the combined outbound turn is not sent twice.
        let mut messages = Vec::with_capacity(store.len() + 2);
        messages.push(RequestMessage {
            role: "system",
            content: self.system_prompt.clone(),
        });
        for message in store.messages() {
            messages.push(RequestMessage {
                role: message.sender.wire_role(),
                content: message.content.clone(),
            });
        }
        messages.push(RequestMessage {
            role: "user",
            content: compose_outbound(trimmed, document),
        });

        store.append(Message::new(Sender::User, trimmed));
        store.append(Message::new(Sender::Assistant, self.typing_indicator.clone()));
        store.persist();

        self.accumulator.clear();
        self.phase = ExchangePhase::Sending;
        debug!(
            "exchange: Idle -> Sending via {} ({} wire messages)",
            self.backend.name(),
            messages.len()
        );

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            run_wire_turn(backend, messages, tx).await;
        });
        true
    }

    /// Drains pending wire events and applies them to the conversation.
    /// Returns `true` when anything changed.
    pub fn pump(&mut self, store: &mut ConversationStore) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event, store);
            changed = true;
        }
        changed
    }

    fn apply(&mut self, event: ExchangeEvent, store: &mut ConversationStore) {
        if self.phase == ExchangePhase::Idle {
            warn!("dropping wire event outside an active turn: {event:?}");
            return;
        }
        match event {
            ExchangeEvent::Opened => {
                debug!("exchange: Sending -> Streaming");
                self.phase = ExchangePhase::Streaming;
            }
            ExchangeEvent::Delta(text) => {
                self.accumulator.push_str(&text);
                let mut preview =
                    String::with_capacity(self.accumulator.len() + CURSOR_MARKER.len());
                preview.push_str(&self.accumulator);
                preview.push_str(CURSOR_MARKER);
                store.replace_last(Message::new(Sender::Assistant, preview));
            }
            ExchangeEvent::Closed => {
                debug!("exchange: Streaming -> Finalizing");
                self.phase = ExchangePhase::Finalizing;
                let finalized = self.accumulator.trim().to_string();
                store.replace_last(Message::new(Sender::Assistant, finalized));
                store.persist();
                self.accumulator.clear();
                self.last_outcome = Some(TurnOutcome::Completed);
                self.phase = ExchangePhase::Idle;
                debug!("exchange: Finalizing -> Idle");
            }
            ExchangeEvent::Failed(detail) => {
                warn!("exchange failed: {detail}");
                self.phase = ExchangePhase::Errored;
                store.replace_last(Message::new(Sender::Assistant, FAILURE_TEXT));
                store.persist();
                self.accumulator.clear();
                self.last_outcome = Some(TurnOutcome::Failed);
                self.phase = ExchangePhase::Idle;
                debug!("exchange: Errored -> Idle");
            }
        }
    }
}

/// The wire side of one turn: submit, then pull deltas until the stream
/// terminates, forwarding everything over the event channel.
async fn run_wire_turn(
    backend: Arc<dyn CompletionBackend>,
    messages: Vec<RequestMessage>,
    tx: UnboundedSender<ExchangeEvent>,
) {
    let chunks = match backend.open(messages).await {
        Ok(chunks) => chunks,
        Err(err) => {
            error!("completion request failed: {err}");
            let _ = tx.send(ExchangeEvent::Failed(err.to_string()));
            return;
        }
    };
    let _ = tx.send(ExchangeEvent::Opened);

    let mut deltas = DeltaStream::new(chunks);
    loop {
        match deltas.next_delta().await {
            Ok(Some(Delta::Content(text))) => {
                let _ = tx.send(ExchangeEvent::Delta(text));
            }
            // The terminate sentinel ends the turn even if more bytes
            // are still in flight behind it.
            Ok(Some(Delta::Terminate)) => break,
            Ok(Some(Delta::Unparsable(raw))) => {
                debug!("skipping malformed stream frame: {raw}");
            }
            Ok(None) => break,
            Err(err) => {
                error!("{err}");
                let _ = tx.send(ExchangeEvent::Failed(err.to_string()));
                return;
            }
        }
    }
    let _ = tx.send(ExchangeEvent::Closed);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::stream;

    use super::*;
    use crate::chat::client::{ByteStream, TransportError};
    use crate::chat::store::testing::MemorySlot;

    /// Backend that replays canned byte chunks and records the wire history.
    struct ScriptedBackend {
        chunks: Vec<String>,
        fail: bool,
        seen: Mutex<Option<Vec<RequestMessage>>>,
    }

    impl ScriptedBackend {
        fn replay(chunks: Vec<String>) -> Arc<Self> {
            Arc::new(Self {
                chunks,
                fail: false,
                seen: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                chunks: Vec::new(),
                fail: true,
                seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn open(&self, messages: Vec<RequestMessage>) -> Result<ByteStream, TransportError> {
            *self.seen.lock().unwrap() = Some(messages);
            if self.fail {
                return Err(TransportError::Send("connection refused".to_string()));
            }
            let items: Vec<Result<Vec<u8>, TransportError>> = self
                .chunks
                .iter()
                .map(|chunk| Ok(chunk.as_bytes().to_vec()))
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    fn controller(backend: Arc<ScriptedBackend>) -> ExchangeController {
        ExchangeController::new(backend, "You are helpful.".to_string(), "Murmur")
    }

    fn store() -> ConversationStore {
        ConversationStore::new(Box::new(MemorySlot::default()))
    }

    async fn drive_to_idle(controller: &mut ExchangeController, store: &mut ConversationStore) {
        for _ in 0..200 {
            controller.pump(store);
            if !controller.is_busy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("exchange did not settle");
    }

    fn content_frame(text: &str) -> String {
        format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{text}\"}}}}]}}\n\n")
    }

    #[tokio::test]
    async fn deltas_accumulate_into_a_finalized_reply() {
        let wire = format!(
            "{}{}data: [DONE]\n\n",
            content_frame("Hi"),
            content_frame(" there")
        );
        let backend = ScriptedBackend::replay(vec![wire]);
        let mut exchange = controller(Arc::clone(&backend));
        let mut store = store();

        assert!(exchange.begin_turn(&mut store, &DocumentContext::new(), "hello"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.last().unwrap().content, "Murmur is typing...");

        drive_to_idle(&mut exchange, &mut store).await;

        assert_eq!(store.len(), 2);
        let reply = store.last().unwrap();
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.content, "Hi there");
        assert!(!reply.content.contains(CURSOR_MARKER));
        assert_eq!(exchange.take_outcome(), Some(TurnOutcome::Completed));
    }

    #[tokio::test]
    async fn wire_history_has_system_first_and_combined_turn_last() {
        let backend = ScriptedBackend::replay(vec!["data: [DONE]\n\n".to_string()]);
        let mut exchange = controller(Arc::clone(&backend));
        let mut store = store();
        store.append(Message::new(Sender::User, "earlier question"));
        store.append(Message::new(Sender::Assistant, "earlier answer"));
        store.append(Message::new(Sender::System, "1 document uploaded."));

        let mut document = DocumentContext::new();
        document.set("doc body");
        assert!(exchange.begin_turn(&mut store, &document, "  new question  "));
        drive_to_idle(&mut exchange, &mut store).await;

        let seen = backend.seen.lock().unwrap().clone().unwrap();
        let roles: Vec<&str> = seen.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "system", "user"]);
        assert_eq!(seen[0].content, "You are helpful.");
        assert!(seen[4].content.starts_with("new question"));
        assert!(seen[4].content.ends_with("doc body"));
        // 進行中的那則使用者訊息不可重複出現。
        assert_eq!(
            seen.iter()
                .filter(|m| m.content.starts_with("new question"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn transport_failure_surfaces_the_fixed_failure_text() {
        let backend = ScriptedBackend::failing();
        let mut exchange = controller(backend);
        let mut store = store();
        store.append(Message::new(Sender::User, "old"));

        assert!(exchange.begin_turn(&mut store, &DocumentContext::new(), "hello"));
        drive_to_idle(&mut exchange, &mut store).await;

        // 原有一則 + 使用者訊息 + 占位訊息，不多不少。
        assert_eq!(store.len(), 3);
        assert_eq!(store.last().unwrap().content, FAILURE_TEXT);
        assert_eq!(exchange.take_outcome(), Some(TurnOutcome::Failed));
        assert!(!exchange.is_busy());
    }

    #[tokio::test]
    async fn unparsable_frames_do_not_touch_the_accumulator() {
        let wire = format!(
            "{}data: {{\"garbage\": tru\n\n{}data: [DONE]\n\n",
            content_frame("Hello"),
            content_frame("!")
        );
        let backend = ScriptedBackend::replay(vec![wire]);
        let mut exchange = controller(backend);
        let mut store = store();

        assert!(exchange.begin_turn(&mut store, &DocumentContext::new(), "hi"));
        drive_to_idle(&mut exchange, &mut store).await;

        assert_eq!(store.last().unwrap().content, "Hello!");
        assert_eq!(exchange.take_outcome(), Some(TurnOutcome::Completed));
    }

    #[tokio::test]
    async fn terminate_ends_the_turn_even_with_trailing_bytes() {
        let wire = format!("data: [DONE]\n\n{}", content_frame("ignored tail"));
        let backend = ScriptedBackend::replay(vec![wire]);
        let mut exchange = controller(backend);
        let mut store = store();

        assert!(exchange.begin_turn(&mut store, &DocumentContext::new(), "hi"));
        drive_to_idle(&mut exchange, &mut store).await;

        assert_eq!(store.last().unwrap().content, "");
        assert_eq!(exchange.take_outcome(), Some(TurnOutcome::Completed));
    }

    #[tokio::test]
    async fn busy_controller_refuses_a_second_turn() {
        let backend = ScriptedBackend::replay(vec!["data: [DONE]\n\n".to_string()]);
        let mut exchange = controller(backend);
        let mut store = store();

        assert!(exchange.begin_turn(&mut store, &DocumentContext::new(), "first"));
        assert!(!exchange.begin_turn(&mut store, &DocumentContext::new(), "second"));
        assert_eq!(store.len(), 2);

        drive_to_idle(&mut exchange, &mut store).await;
        assert!(exchange.begin_turn(&mut store, &DocumentContext::new(), "third"));
        drive_to_idle(&mut exchange, &mut store).await;
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_side_effects() {
        let backend = ScriptedBackend::replay(vec!["data: [DONE]\n\n".to_string()]);
        let mut exchange = controller(backend);
        let mut store = store();

        assert!(!exchange.begin_turn(&mut store, &DocumentContext::new(), "   \n  "));
        assert!(store.is_empty());
        assert!(!exchange.is_busy());
    }
}
