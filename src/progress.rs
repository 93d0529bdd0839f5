//! Progress-callback trait for deck-generation events.
//!
//! Inject an [`Arc<dyn DeckProgressCallback>`] via
//! [`crate::config::DeckConfigBuilder::progress_callback`] to receive events
//! as the pipeline harvests assets and assigns images to slides.
//!
//! # Example
//!
//! ```rust
//! use doc2deck::{DeckConfig, DeckProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     retained: AtomicUsize,
//! }
//!
//! impl DeckProgressCallback for CountingCallback {
//!     fn on_asset_retained(&self, image_id: &str, _done: usize, _total: usize) {
//!         self.retained.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("kept {image_id}");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { retained: AtomicUsize::new(0) });
//! let config = DeckConfig::builder()
//!     .progress_callback(cb as Arc<dyn DeckProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it works through a run.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive from the task driving the run, in
/// document order.
pub trait DeckProgressCallback: Send + Sync {
    /// Called once before the first asset is probed.
    fn on_harvest_start(&self, total_assets: usize) {
        let _ = total_assets;
    }

    /// An asset passed every filter and was stored.
    fn on_asset_retained(&self, image_id: &str, done: usize, total: usize) {
        let _ = (image_id, done, total);
    }

    /// An asset was dropped.
    ///
    /// * `reason`: human-readable [`crate::error::AssetError`] text
    fn on_asset_skipped(&self, reason: &str, done: usize, total: usize) {
        let _ = (reason, done, total);
    }

    /// The oracle returned a valid outline.
    fn on_structure_complete(&self, slide_count: usize) {
        let _ = slide_count;
    }

    /// The matcher decided a slide (0 = title slide).
    fn on_slide_assigned(&self, slide_index: usize, total: usize, image_id: Option<&str>) {
        let _ = (slide_index, total, image_id);
    }

    /// Layout finished.
    fn on_deck_complete(&self, slide_count: usize, images_placed: usize) {
        let _ = (slide_count, images_placed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DeckProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DeckConfig`].
pub type ProgressCallback = Arc<dyn DeckProgressCallback>;
