//! Top-level deck generation.
//!
//! [`generate_deck`] runs the whole pipeline and returns the positioned deck
//! together with the matcher's verdicts and run statistics. Use
//! [`generate_deck_to_file`] to also persist it, or [`harvest_only`] to
//! inspect the image pool without calling an oracle.

use crate::config::DeckConfig;
use crate::document::Document;
use crate::error::DeckError;
use crate::output::{DeckOutput, DeckStats};
use crate::pipeline::harvest::{HarvestReport, ImageHarvester};
use crate::pipeline::layout::DeckLayoutEngine;
use crate::pipeline::matcher::assign_images;
use crate::pipeline::oracle::{resolve_oracle, validate_outline, StructureRequest};
use crate::pipeline::persist::{DeckWriter, JsonDeckWriter};
use crate::store::ContentStore;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Build a slide deck from a document and its embedded images.
///
/// Retained images are written to `store` as a side effect; they stay there
/// even when the run later fails or times out.
///
/// # Errors
/// Returns `Err(DeckError)` only for fatal errors:
/// - no oracle/provider could be configured
/// - the oracle failed or broke its contract
/// - `run_timeout_secs` elapsed
///
/// Rejected assets and missing backing assets are reported through
/// [`DeckOutput::warnings`] instead.
pub async fn generate_deck(
    document: &Document,
    store: Arc<dyn ContentStore>,
    config: &DeckConfig,
) -> Result<DeckOutput, DeckError> {
    match config.run_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run(document, store, config))
            .await
            .map_err(|_| DeckError::Timeout { secs })?,
        None => run(document, store, config).await,
    }
}

async fn run(
    document: &Document,
    store: Arc<dyn ContentStore>,
    config: &DeckConfig,
) -> Result<DeckOutput, DeckError> {
    let total_start = Instant::now();
    info!("Starting deck generation: {}", document.name);

    // ── Step 1: Resolve oracle ───────────────────────────────────────────
    let oracle = resolve_oracle(config)?;

    // ── Step 2: Harvest images ───────────────────────────────────────────
    let harvest_start = Instant::now();
    let harvest = ImageHarvester::new(Arc::clone(&store), config)
        .harvest(document)
        .await?;
    let harvest_duration_ms = harvest_start.elapsed().as_millis() as u64;

    // ── Step 3: Structure content ────────────────────────────────────────
    let oracle_start = Instant::now();
    let request = StructureRequest::from_config(document.full_text(), config);
    let specs = oracle.generate(&request).await?;
    validate_outline(&specs)?;
    let oracle_duration_ms = oracle_start.elapsed().as_millis() as u64;
    info!("Outline has {} slides ({}ms)", specs.len(), oracle_duration_ms);
    if let Some(ref cb) = config.progress_callback {
        cb.on_structure_complete(specs.len());
    }

    // ── Step 4: Match images to slides ───────────────────────────────────
    let assignments = assign_images(&specs, &harvest.images, config);
    debug!(
        "{} of {} slides received an image",
        assignments.iter().filter(|a| a.has_image()).count(),
        assignments.len()
    );

    // ── Step 5: Layout ───────────────────────────────────────────────────
    let layout_start = Instant::now();
    let laid_out = DeckLayoutEngine::new(&config.template, &config.title_subtitle).layout(
        &assignments,
        &harvest.images,
        store.as_ref(),
    );
    let layout_duration_ms = layout_start.elapsed().as_millis() as u64;

    // ── Step 6: Assemble ─────────────────────────────────────────────────
    let deck = laid_out.deck;
    let images_placed = deck.picture_count();
    let mut warnings: Vec<String> = harvest.skipped.iter().map(|e| e.to_string()).collect();
    warnings.extend(laid_out.warnings);

    let stats = DeckStats {
        assets_seen: harvest.assets_seen,
        images_harvested: harvest.images.len(),
        assets_skipped: harvest.skipped.len(),
        slides: deck.slides.len(),
        images_placed,
        harvest_duration_ms,
        oracle_duration_ms,
        layout_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Deck complete: {} slides, {} images placed, {}ms total",
        stats.slides, stats.images_placed, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_deck_complete(stats.slides, images_placed);
    }

    Ok(DeckOutput {
        deck,
        assignments,
        images: harvest.images,
        stats,
        warnings,
    })
}

/// Generate a deck and write it to `output_path` as JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_deck_to_file(
    document: &Document,
    store: Arc<dyn ContentStore>,
    output_path: impl AsRef<Path>,
    config: &DeckConfig,
) -> Result<DeckOutput, DeckError> {
    let output = generate_deck(document, store, config).await?;
    JsonDeckWriter.write(&output.deck, output_path.as_ref()).await?;
    info!("Deck written to {}", output_path.as_ref().display());
    Ok(output)
}

/// Synchronous wrapper around [`generate_deck`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_deck_sync(
    document: &Document,
    store: Arc<dyn ContentStore>,
    config: &DeckConfig,
) -> Result<DeckOutput, DeckError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DeckError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_deck(document, store, config))
}

/// Harvest the image pool only.
///
/// Does not require an oracle, an LLM provider, or an API key.
pub async fn harvest_only(
    document: &Document,
    store: Arc<dyn ContentStore>,
    config: &DeckConfig,
) -> Result<HarvestReport, DeckError> {
    ImageHarvester::new(store, config).harvest(document).await
}
