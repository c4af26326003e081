use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};
use walkdir::{DirEntry, WalkDir};

use super::{App, DocumentPickerState, OverlayState};
use crate::chat::message::{Message, Sender};

/// How deep the document picker walks below the workspace root.
const PICKER_MAX_DEPTH: usize = 3;
/// Upper bound on listed entries, to keep the overlay usable in big trees.
const PICKER_MAX_ENTRIES: usize = 500;

// Implementation block for document ingestion.
impl App {
    /// Opens the document picker overlay with the files under the workspace.
    ///
    /// Refused while a reply is streaming: the placeholder must stay the
    /// last message until the turn is finalized.
    pub(crate) fn open_document_picker(&mut self) {
        if self.exchange.is_busy() {
            self.status_message = format!("{} is still responding...", self.assistant_name);
            return;
        }
        let entries = collect_documents(&self.workspace_root);
        if entries.is_empty() {
            self.status_message = String::from("No files found to attach.");
            return;
        }
        self.overlay = Some(OverlayState::DocumentPicker(DocumentPickerState::new(
            entries,
        )));
        self.status_message = String::from("Select a document (Enter to attach, Esc to cancel)");
    }

    /// Reads and extracts the chosen document.
    ///
    /// On success the excerpt becomes the active document context and a
    /// system message announces the upload. On failure nothing is set and
    /// the transcript stays untouched.
    pub(crate) fn ingest_document(&mut self, path: PathBuf) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("could not read {}: {err}", path.display());
                self.status_message = format!("Could not read {name}");
                return;
            }
        };

        match self.extractor.extract(&bytes) {
            Ok(text) => {
                info!(
                    "document ingested via {}: {} ({} chars)",
                    self.extractor.name(),
                    path.display(),
                    text.chars().count()
                );
                self.document.set(text);
                self.conversation
                    .append(Message::new(Sender::System, "1 document uploaded."));
                self.conversation.persist();
                self.status_message = format!("Attached {name}");
            }
            Err(err) => {
                error!("extraction failed for {}: {err:#}", path.display());
                self.status_message = format!("Could not extract text from {name}");
            }
        }
    }
}

/// 列出工作區下可供挑選的檔案，隱藏檔與狀態目錄除外。
fn collect_documents(root: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = WalkDir::new(root)
        .max_depth(PICKER_MAX_DEPTH)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .take(PICKER_MAX_ENTRIES)
        .collect();
    entries.sort();
    entries
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}
