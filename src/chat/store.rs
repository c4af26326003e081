//! Ordered conversation log and its load/save boundary.
//!
//! The store owns the visible transcript. Mutation surface is deliberately
//! narrow: `append` for new turns, `replace_last` for the single in-flight
//! placeholder, `clear` for an explicit reset. Persistence goes through an
//! opaque string-keyed slot so the storage location stays an implementation
//! detail of the caller.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::chat::message::Message;

/// Slot key under which the serialized conversation lives.
pub const CONVERSATION_KEY: &str = "messages";

/// An opaque string-keyed key-value persistence slot.
pub trait PersistenceSlot {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed slot: each key is stored as `<dir>/<key>.json`.
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl PersistenceSlot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading slot {}", path.display()))?;
        Ok(Some(raw))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating state directory {}", self.dir.display()))?;
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("writing slot {}", path.display()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("removing slot {}", path.display()))?;
        }
        Ok(())
    }
}

/// The ordered, append-only-with-in-place-update transcript.
pub struct ConversationStore {
    messages: Vec<Message>,
    slot: Box<dyn PersistenceSlot>,
}

impl ConversationStore {
    pub fn new(slot: Box<dyn PersistenceSlot>) -> Self {
        Self {
            messages: Vec::new(),
            slot,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Adds a message at the tail. Never fails.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Overwrites the tail message. On an empty conversation this is a
    /// logged no-op rather than an error.
    pub fn replace_last(&mut self, message: Message) {
        match self.messages.last_mut() {
            Some(last) => *last = message,
            None => warn!("replace_last on an empty conversation, ignoring"),
        }
    }

    /// Restores the transcript from the slot. Unreadable or malformed data
    /// yields an empty conversation instead of failing the session.
    pub fn load(&mut self) {
        match self.slot.read(CONVERSATION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Message>>(&raw) {
                Ok(messages) => {
                    debug!("restored {} messages", messages.len());
                    self.messages = messages;
                }
                Err(err) => {
                    warn!("stored conversation is malformed, starting empty: {err}");
                    self.messages.clear();
                }
            },
            Ok(None) => self.messages.clear(),
            Err(err) => {
                warn!("could not read stored conversation, starting empty: {err:#}");
                self.messages.clear();
            }
        }
    }

    /// Saves the full transcript to the slot. Failures are logged, never
    /// surfaced to the user.
    pub fn persist(&self) {
        match serde_json::to_string(&self.messages) {
            Ok(serialized) => {
                if let Err(err) = self.slot.write(CONVERSATION_KEY, &serialized) {
                    warn!("could not persist conversation: {err:#}");
                }
            }
            Err(err) => warn!("could not serialize conversation: {err}"),
        }
    }

    /// Empties the transcript and clears the persisted state.
    pub fn clear(&mut self) {
        self.messages.clear();
        if let Err(err) = self.slot.remove(CONVERSATION_KEY) {
            warn!("could not clear persisted conversation: {err:#}");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use anyhow::Result;

    use super::PersistenceSlot;

    /// In-memory slot for tests.
    #[derive(Default)]
    pub struct MemorySlot {
        entries: Mutex<HashMap<String, String>>,
    }

    impl MemorySlot {
        pub fn with_entry(key: &str, value: &str) -> Self {
            let slot = Self::default();
            slot.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            slot
        }
    }

    impl PersistenceSlot for MemorySlot {
        fn read(&self, key: &str) -> Result<Option<String>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        fn write(&self, key: &str, value: &str) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }
}
