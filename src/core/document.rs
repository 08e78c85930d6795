//! Document Store
//!
//! In-memory map of open documents. Every change supplies the complete new
//! text, so entries are replaced wholesale and never patched.

use std::collections::HashMap;

use thiserror::Error;
use tokio::task::AbortHandle;
use tower_lsp::lsp_types::Url;

use crate::core::diagnostics::Diagnostic;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document is not open: {0}")]
    UnknownDocument(Url),
    #[error("ignoring version {received} of {uri}, already at version {current}")]
    StaleVersion {
        uri: Url,
        current: i32,
        received: i32,
    },
}

/// State for each open document
#[derive(Debug)]
pub struct Document {
    pub text: String,
    pub version: i32,
    /// Bumped on every open, change and revalidation request; a validation
    /// cycle may only publish while its generation is still the current one.
    generation: u64,
    /// Diagnostics from the last cycle that was allowed to publish
    published: Vec<Diagnostic>,
    /// The cycle currently computing diagnostics, if any
    running: Option<AbortHandle>,
}

impl Document {
    /// Cancel the cycle in flight; its result would be discarded anyway
    fn supersede(&mut self, generation: u64) {
        if let Some(running) = self.running.take() {
            running.abort();
        }
        self.generation = generation;
    }
}

/// Copy of a document taken when a validation cycle starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub version: i32,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<Url, Document>,
    next_generation: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Create or replace the entry for `uri`
    pub fn open(&mut self, uri: Url, text: String, version: i32) -> Snapshot {
        let generation = self.bump();
        let snapshot = Snapshot {
            text: text.clone(),
            version,
            generation,
        };
        let previous = self.documents.insert(
            uri,
            Document {
                text,
                version,
                generation,
                published: Vec::new(),
                running: None,
            },
        );
        if let Some(mut previous) = previous {
            previous.supersede(generation);
        }
        snapshot
    }

    /// Replace the text of an open document. Without an explicit version the
    /// previous one is incremented; an explicit version older than the stored
    /// one is rejected and leaves the document untouched.
    pub fn update(
        &mut self,
        uri: &Url,
        text: String,
        version: Option<i32>,
    ) -> Result<Snapshot, DocumentError> {
        let current = self
            .documents
            .get(uri)
            .map(|doc| doc.version)
            .ok_or_else(|| DocumentError::UnknownDocument(uri.clone()))?;

        if let Some(received) = version.filter(|v| *v < current) {
            return Err(DocumentError::StaleVersion {
                uri: uri.clone(),
                current,
                received,
            });
        }

        let generation = self.bump();
        let doc = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| DocumentError::UnknownDocument(uri.clone()))?;

        doc.text = text;
        doc.version = version.unwrap_or(current.saturating_add(1));
        doc.supersede(generation);

        Ok(Snapshot {
            text: doc.text.clone(),
            version: doc.version,
            generation,
        })
    }

    /// Start a new request over unchanged text, superseding any in flight
    pub fn touch(&mut self, uri: &Url) -> Result<Snapshot, DocumentError> {
        let generation = self.bump();
        let doc = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| DocumentError::UnknownDocument(uri.clone()))?;
        doc.supersede(generation);

        Ok(Snapshot {
            text: doc.text.clone(),
            version: doc.version,
            generation,
        })
    }

    /// Remove the entry; closing an unknown document is a no-op
    pub fn close(&mut self, uri: &Url) -> Option<Document> {
        let mut doc = self.documents.remove(uri)?;
        if let Some(running) = doc.running.take() {
            running.abort();
        }
        Some(doc)
    }

    /// Attach the task computing `generation` to its document. A task that
    /// is already stale (superseded or closed) is cancelled right away.
    pub fn start_cycle(&mut self, uri: &Url, generation: u64, task: AbortHandle) -> bool {
        match self.documents.get_mut(uri) {
            Some(doc) if doc.generation == generation => {
                if let Some(previous) = doc.running.replace(task) {
                    previous.abort();
                }
                true
            }
            _ => {
                task.abort();
                false
            }
        }
    }

    /// Whether a cycle for `uri` is still computing
    pub fn in_flight(&self, uri: &Url) -> bool {
        self.documents
            .get(uri)
            .and_then(|doc| doc.running.as_ref())
            .is_some_and(|running| !running.is_finished())
    }

    pub fn get(&self, uri: &Url) -> Result<&str, DocumentError> {
        self.documents
            .get(uri)
            .map(|doc| doc.text.as_str())
            .ok_or_else(|| DocumentError::UnknownDocument(uri.clone()))
    }

    pub fn version(&self, uri: &Url) -> Result<i32, DocumentError> {
        self.documents
            .get(uri)
            .map(|doc| doc.version)
            .ok_or_else(|| DocumentError::UnknownDocument(uri.clone()))
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn is_current(&self, uri: &Url, generation: u64) -> bool {
        self.documents
            .get(uri)
            .is_some_and(|doc| doc.generation == generation)
    }

    /// Store the result of a cycle if it is still current. Returns `false`
    /// (and stores nothing) when the cycle has been superseded or the
    /// document was closed meanwhile.
    pub fn record_diagnostics(
        &mut self,
        uri: &Url,
        generation: u64,
        diagnostics: Vec<Diagnostic>,
    ) -> bool {
        match self.documents.get_mut(uri) {
            Some(doc) if doc.generation == generation => {
                doc.published = diagnostics;
                doc.running = None;
                true
            }
            _ => false,
        }
    }

    /// Diagnostics last published for `uri`, empty if none or not open
    pub fn published(&self, uri: &Url) -> &[Diagnostic] {
        self.documents
            .get(uri)
            .map(|doc| doc.published.as_slice())
            .unwrap_or(&[])
    }
}
