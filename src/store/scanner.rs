//! Corpus discovery and incremental indexing
//!
//! Walks a directory of text documents, detects changes by content hash,
//! and keeps the store's documents, FTS mirror, and embeddings in step
//! with the filesystem. Unchanged documents cost nothing beyond the hash;
//! documents whose embedding fails stay lexically searchable.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::Result;
use crate::search::types::TextEmbedder;
use crate::search::vector::{embedding_prompt, EmbeddingRole};
use crate::store::sqlite::{DocumentStore, StoredDocument};

/// File extensions treated as corpus documents.
pub const INDEXABLE_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Counters from one indexing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Documents written or rewritten
    pub indexed: usize,
    /// Documents skipped because their content hash matched
    pub unchanged: usize,
    /// Documents pruned because their file disappeared
    pub removed: usize,
    /// Changed documents that embedded successfully
    pub embedded: usize,
    /// Changed documents left without a vector
    pub embed_failures: usize,
}

pub struct Scanner {
    store: Arc<DocumentStore>,
    embedder: Arc<dyn TextEmbedder>,
}

impl Scanner {
    pub fn new(store: Arc<DocumentStore>, embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { store, embedder }
    }

    /// Index `root` incrementally: upsert new and changed documents,
    /// prune deleted ones, re-embed whatever changed.
    pub async fn index_directory(&self, root: &Path) -> Result<ScanOutcome> {
        let mut files = Vec::new();
        collect_files(root, root, &mut files)?;
        files.sort();

        let mut outcome = ScanOutcome::default();
        let mut changed: Vec<StoredDocument> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for relative in files {
            let absolute = root.join(&relative);
            let body = match std::fs::read_to_string(&absolute) {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!("skipping unreadable file {}: {err}", absolute.display());
                    continue;
                }
            };

            let id = relative.to_string_lossy().replace('\\', "/");
            seen.push(id.clone());

            let document = StoredDocument {
                title: extract_title(&body, &relative),
                path: absolute.to_string_lossy().to_string(),
                hash: content_hash(&body),
                body,
                id,
            };

            if self.store.document_hash(&document.id)?.as_deref() == Some(document.hash.as_str()) {
                outcome.unchanged += 1;
                // An earlier pass may have failed to embed this document
                // (model down, over-length input); retry it now.
                if !self.store.has_embedding(&document.id)? {
                    changed.push(document);
                }
                continue;
            }

            self.store.upsert_document(&document)?;
            outcome.indexed += 1;
            changed.push(document);
        }

        // Prune documents whose files are gone.
        for id in self.store.all_ids()? {
            if !seen.contains(&id) {
                self.store.remove_document(&id)?;
                outcome.removed += 1;
            }
        }

        self.embed_changed(&changed, &mut outcome).await?;
        Ok(outcome)
    }

    async fn embed_changed(&self, changed: &[StoredDocument], outcome: &mut ScanOutcome) -> Result<()> {
        if changed.is_empty() {
            return Ok(());
        }

        let prompts: Vec<String> = changed
            .iter()
            .map(|doc| embedding_prompt(EmbeddingRole::Document, &doc.body, Some(&doc.title)))
            .collect();

        let embeddings = self.embedder.embed(&prompts).await?;
        for (doc, embedding) in changed.iter().zip(embeddings) {
            match embedding {
                Some(vector) => {
                    self.store.put_embedding(&doc.id, &vector)?;
                    outcome.embedded += 1;
                }
                None => {
                    // Content changed but the re-embed failed: drop the
                    // stale vector so semantic search never serves it.
                    self.store.remove_embedding(&doc.id)?;
                    outcome.embed_failures += 1;
                    tracing::warn!("no embedding for {}; document stays lexical-only", doc.id);
                }
            }
        }
        Ok(())
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if is_indexable(&path) {
            if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_path_buf());
            }
        }
    }
    Ok(())
}

fn is_indexable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| INDEXABLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// First Markdown heading, falling back to the file stem.
fn extract_title(body: &str, relative: &Path) -> String {
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix('#') {
            let heading = heading.trim_start_matches('#').trim();
            if !heading.is_empty() {
                return heading.to_string();
            }
        }
    }

    relative
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "untitled".to_string())
}
