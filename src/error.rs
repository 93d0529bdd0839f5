//! Error types for the doc2deck library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DeckError`] is **fatal**: the deck cannot be produced at all (the
//!   oracle broke its contract, the document could not be loaded, the output
//!   file could not be written). Returned as `Err(DeckError)` from the
//!   top-level `generate*` functions. No partial deck is ever returned
//!   alongside one.
//!
//! * [`AssetError`] is **non-fatal**: a single embedded asset was skipped
//!   (vector format, corrupt header, icon-sized, horizontal rule) but every
//!   other asset is fine. Collected in
//!   [`crate::pipeline::harvest::HarvestReport::skipped`] so callers can see
//!   what was dropped without losing the whole harvest to one bad image.
//!
//! Having no image at all is not an error: a deck may legitimately carry
//! zero pictures.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2deck library.
#[derive(Debug, Error)]
pub enum DeckError {
    // ── Document errors ───────────────────────────────────────────────────
    /// Document file could not be read.
    #[error("Failed to read document '{path}': {source}")]
    DocumentLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document manifest is not valid JSON or references missing data.
    #[error("Invalid document manifest '{path}': {detail}")]
    InvalidManifest { path: PathBuf, detail: String },

    /// The input extension is neither a manifest nor plain text.
    #[error("Unsupported document '{path}'\nExpected a .json manifest or a .txt/.md file.")]
    UnsupportedDocument { path: PathBuf },

    // ── Oracle errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The oracle returned something other than a non-empty sequence of
    /// well-formed slide specs.
    #[error("Slide oracle broke its contract: {detail}")]
    OracleContractViolation { detail: String },

    /// Every oracle attempt failed at the transport level.
    #[error("Slide oracle failed after {retries} retries: {detail}")]
    OracleFailed { retries: u32, detail: String },

    /// A single oracle call exceeded `api_timeout_secs`.
    #[error("Slide oracle call timed out after {secs}s")]
    OracleTimeout { secs: u64 },

    // ── Run errors ────────────────────────────────────────────────────────
    /// The whole run exceeded `run_timeout_secs`. Assets already persisted
    /// to the content store are left in place.
    #[error("Deck generation timed out after {secs}s")]
    Timeout { secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output deck file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not serialise the deck.
    #[error("Failed to serialise deck: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single embedded asset.
///
/// The harvest skips the asset and continues with its siblings.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum AssetError {
    /// Vector, motion, or otherwise unrecognised format.
    #[error("Container {container}, asset {ordinal}: unsupported format '{format}'")]
    UnsupportedFormat {
        container: usize,
        ordinal: usize,
        format: String,
    },

    /// The header could not be parsed for pixel dimensions.
    #[error("Container {container}, asset {ordinal}: decode failed: {detail}")]
    DecodeFailed {
        container: usize,
        ordinal: usize,
        detail: String,
    },

    /// Below the minimum edge length; usually an icon or bullet glyph.
    #[error("Container {container}, asset {ordinal}: {width}x{height} is below the minimum size")]
    TooSmall {
        container: usize,
        ordinal: usize,
        width: u32,
        height: u32,
    },

    /// Wider than the aspect cap; usually a horizontal rule.
    #[error("Container {container}, asset {ordinal}: {width}x{height} is too wide")]
    TooWide {
        container: usize,
        ordinal: usize,
        width: u32,
        height: u32,
    },

    /// The content store refused the bytes.
    #[error("Container {container}, asset {ordinal}: content store write failed: {detail}")]
    StoreFailed {
        container: usize,
        ordinal: usize,
        detail: String,
    },
}

impl AssetError {
    /// `true` for assets dropped by the size/aspect filters rather than by a
    /// failure. These are expected and only logged at debug level.
    pub fn is_filtered(&self) -> bool {
        matches!(self, AssetError::TooSmall { .. } | AssetError::TooWide { .. })
    }
}
