//! # doc2deck
//!
//! Turn a parsed document and its embedded images into a laid-out slide deck.
//!
//! ## Why this crate?
//!
//! Asking an LLM for a slide outline is the easy half. The hard half is
//! putting the document's own charts and figures on the right slides: this
//! crate harvests the embedded images, works out what each one shows from
//! the text around it, and assigns them to slides deterministically so
//! that no image appears twice and "see Figure 3" gets Figure 3.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Document
//!  │
//!  ├─ 1. Harvest  probe + filter embedded assets, persist to a content store
//!  ├─ 2. Context  caption / nearby text / keyword sentence per image
//!  ├─ 3. Outline  oracle (LLM) returns title + content slides as JSON
//!  ├─ 4. Match    exact figure number → fuzzy score → last resort
//!  ├─ 5. Layout   title, title+content, two-content; contain-fit pictures
//!  └─ 6. Output   positioned deck (EMU) + assignments + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2deck::{generate_deck, DeckConfig, DirectoryStore, Document};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = DeckConfig::default();
//!     let document = Document::load("report.json")?;
//!     let store = Arc::new(DirectoryStore::open("extracted")?);
//!     let output = generate_deck(&document, store, &config).await?;
//!     println!("{} slides, {} images placed",
//!         output.stats.slides,
//!         output.stats.images_placed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2deck` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! doc2deck = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod generate;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Audience, DeckConfig, DeckConfigBuilder, Tone};
pub use document::{Container, Document, EmbeddedAsset, FlowContainer, PageContainer, Rect, TextSpan};
pub use error::{AssetError, DeckError};
pub use generate::{generate_deck, generate_deck_sync, generate_deck_to_file, harvest_only};
pub use model::{AssignedSlide, ExtractedImage, LayoutKind, MatchKind, SlideSpec, SourceKind};
pub use output::{Deck, DeckOutput, DeckStats, Element, Picture, PositionedSlide, TextBox, TextParagraph, TextRole};
pub use pipeline::context::ContextExtractor;
pub use pipeline::harvest::{HarvestReport, ImageHarvester};
pub use pipeline::layout::{DeckLayoutEngine, DeckTemplate, LayoutTemplate, Region};
pub use pipeline::matcher::{MatcherState, SlideImageMatcher};
pub use pipeline::oracle::{LlmOracle, SlideOracle, StructureRequest};
pub use pipeline::persist::{DeckWriter, JsonDeckWriter};
pub use progress::{DeckProgressCallback, NoopProgressCallback, ProgressCallback};
pub use store::{ContentStore, DirectoryStore, MemoryStore};
