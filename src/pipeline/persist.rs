//! Deck persistence.
//!
//! Writers are atomic: bytes go to a sibling temp file which is then renamed
//! over the target, so a reader never sees a half-written deck.

use crate::error::DeckError;
use crate::output::Deck;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serialises a finished deck to a file.
#[async_trait]
pub trait DeckWriter: Send + Sync {
    async fn write(&self, deck: &Deck, path: &Path) -> Result<(), DeckError>;
}

/// Pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeckWriter;

#[async_trait]
impl DeckWriter for JsonDeckWriter {
    async fn write(&self, deck: &Deck, path: &Path) -> Result<(), DeckError> {
        let bytes = serde_json::to_vec_pretty(deck)?;
        write_atomic(path, &bytes).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

/// Write `bytes` to `path` via a temp file and rename, creating parents.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DeckError> {
    let fail = |e: std::io::Error| DeckError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            tokio::fs::create_dir_all(parent).await.map_err(fail)?;
            parent.to_path_buf()
        }
        None => PathBuf::from("."),
    };

    let target = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| DeckError::Internal(format!("write task panicked: {e}")))?
    .map_err(fail)
}
