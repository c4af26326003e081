use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, warn};

use super::{App, Composer};
use crate::chat::client::HttpCompletionClient;
use crate::chat::config::ChatSettings;
use crate::chat::context::DocumentContext;
use crate::chat::document::PlainTextExtractor;
use crate::chat::exchange::ExchangeController;
use crate::chat::store::{ConversationStore, FileSlot};
use crate::definitions::FocusArea;
use crate::panels::transcript::TranscriptPanel;

/// Directory under the workspace root holding persisted state and the log.
pub const STATE_DIR: &str = ".murmur";

impl App {
    /// Creates a new instance of the `App` state.
    ///
    /// Loads the chat settings, restores the persisted conversation and
    /// wires up the HTTP completion backend.
    pub fn new(workspace_root: PathBuf) -> Result<Self> {
        let workspace_root = workspace_root.canonicalize().unwrap_or(workspace_root);
        debug!("initializing app in {}", workspace_root.display());

        let settings = ChatSettings::load(&workspace_root)?;
        let assistant_name = settings.assistant_name().to_string();
        let model_name = settings.api.model().to_string();

        let slot = FileSlot::new(workspace_root.join(STATE_DIR));
        let mut conversation = ConversationStore::new(Box::new(slot));
        conversation.load();

        let missing_key = settings.api.resolved_api_key().is_none();
        if missing_key {
            warn!("no API key configured, requests will be sent unauthenticated");
        }

        let backend = HttpCompletionClient::new(&settings.api)
            .context("building the completion client")?;
        let exchange = ExchangeController::new(
            Arc::new(backend),
            settings.api.system_prompt().to_string(),
            &assistant_name,
        );

        let status_message = if missing_key {
            String::from(
                "No API key found: set api.api_key in config/chat.toml or export GROQ_API_KEY",
            )
        } else {
            String::from("Enter to send | Ctrl+O attach document | Ctrl+L reset | Ctrl+Q quit")
        };

        Ok(Self {
            should_quit: false,
            focus: FocusArea::Composer,
            conversation,
            document: DocumentContext::new(),
            exchange,
            transcript: TranscriptPanel::new(),
            composer: Composer::new(),
            status_message,
            workspace_root,
            overlay: None,
            assistant_name,
            model_name,
            extractor: Box::new(PlainTextExtractor),
        })
    }
}
