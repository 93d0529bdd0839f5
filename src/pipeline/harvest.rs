//! Image harvest: turn a document's embedded assets into the image pool.
//!
//! Each asset goes through, in order:
//!
//! 1. format sniffing (vector and unknown formats are rejected)
//! 2. a header-only dimension probe (pixels are never decoded)
//! 3. the size/aspect filter (under 100 px on either edge, or wider than 10:1)
//! 4. persistence into the [`ContentStore`] under a stable id
//!
//! Steps 1–4 are CPU/IO bound and run on the blocking pool, several assets
//! at a time. Results are gathered back in document order so the pool order
//! and the ids never depend on scheduling. Context extraction runs last, on
//! the calling task, because it only reads text the document already holds.
//!
//! A failing asset is recorded as an [`AssetError`] and skipped; the harvest
//! itself only fails if a worker task panics.

use crate::config::DeckConfig;
use crate::document::{Container, Document, EmbeddedAsset};
use crate::error::{AssetError, DeckError};
use crate::model::{ExtractedImage, SourceKind};
use crate::pipeline::context::ContextExtractor;
use crate::progress::ProgressCallback;
use crate::store::ContentStore;
use futures::stream::{self, StreamExt, TryStreamExt};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Declared formats that are never raster images.
const VECTOR_FORMATS: &[&str] = &["svg", "svgz", "emf", "wmf", "pdf", "eps"];

/// Harvest outcome: kept images in document order plus every skip reason.
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    pub images: Vec<ExtractedImage>,
    pub skipped: Vec<AssetError>,
    pub assets_seen: usize,
}

/// Probes, filters, and stores embedded assets.
pub struct ImageHarvester {
    store: Arc<dyn ContentStore>,
    extractor: ContextExtractor,
    concurrency: usize,
    progress: Option<ProgressCallback>,
}

/// What a worker needs to know about one asset.
struct Job {
    container: usize,
    ordinal: usize,
    source: SourceKind,
    data: Arc<[u8]>,
    declared: Option<String>,
}

/// A retained, stored asset before context is attached.
struct Probed {
    id: String,
    width: u32,
    height: u32,
}

impl ImageHarvester {
    pub fn new(store: Arc<dyn ContentStore>, config: &DeckConfig) -> Self {
        Self {
            store,
            extractor: ContextExtractor::from_config(config),
            concurrency: config.concurrency.max(1),
            progress: config.progress_callback.clone(),
        }
    }

    pub async fn harvest(&self, document: &Document) -> Result<HarvestReport, DeckError> {
        // Ids use container position; `Container::index` may repeat when
        // `containers` is assembled directly.
        let located: Vec<(usize, &Container, &EmbeddedAsset)> = document
            .containers
            .iter()
            .enumerate()
            .flat_map(|(pos, c)| c.assets().iter().map(move |a| (pos, c, a)))
            .collect();
        let total = located.len();

        if let Some(ref cb) = self.progress {
            cb.on_harvest_start(total);
        }
        info!("Harvesting {} embedded assets from '{}'", total, document.name);

        let jobs = located.iter().map(|(pos, c, a)| Job {
            container: *pos,
            ordinal: a.ordinal(),
            source: c.source_kind(),
            data: Arc::clone(a.data()),
            declared: a.declared_format().map(str::to_string),
        });

        // `buffered` keeps completion order equal to submission order.
        let outcomes: Vec<Result<Probed, AssetError>> = stream::iter(jobs.map(|job| {
            let store = Arc::clone(&self.store);
            async move {
                tokio::task::spawn_blocking(move || probe_and_store(&job, store.as_ref()))
                    .await
                    .map_err(|e| DeckError::Internal(format!("Harvest task panicked: {}", e)))
            }
        }))
        .buffered(self.concurrency)
        .try_collect()
        .await?;

        let mut report = HarvestReport {
            assets_seen: total,
            ..Default::default()
        };

        for (done, ((pos, container, asset), outcome)) in located.iter().zip(outcomes).enumerate() {
            let done = done + 1;
            match outcome {
                Ok(probed) => {
                    let context = self.extractor.extract(container, asset);
                    let image = ExtractedImage::new(
                        probed.id,
                        *pos,
                        asset.ordinal(),
                        probed.width,
                        probed.height,
                        context,
                        container.source_kind(),
                    )
                    .ok_or_else(|| {
                        DeckError::Internal(format!(
                            "Probed dimensions {}x{} fail the size filter",
                            probed.width, probed.height
                        ))
                    })?;
                    debug!("Kept {} ({}x{})", image.id(), image.width(), image.height());
                    if let Some(ref cb) = self.progress {
                        cb.on_asset_retained(image.id(), done, total);
                    }
                    report.images.push(image);
                }
                Err(e) => {
                    if e.is_filtered() {
                        debug!("{}", e);
                    } else {
                        warn!("{}", e);
                    }
                    if let Some(ref cb) = self.progress {
                        cb.on_asset_skipped(&e.to_string(), done, total);
                    }
                    report.skipped.push(e);
                }
            }
        }

        info!(
            "Harvest kept {} of {} assets ({} skipped)",
            report.images.len(),
            total,
            report.skipped.len()
        );
        Ok(report)
    }
}

/// Stable pool id: `page{n}_img{m}.{ext}` or `doc{n}_image{m}.{ext}`, 1-based.
pub fn image_id(source: SourceKind, container: usize, ordinal: usize, ext: &str) -> String {
    match source {
        SourceKind::Page => format!("page{}_img{}.{}", container + 1, ordinal + 1, ext),
        SourceKind::Flow => format!("doc{}_image{}.{}", container + 1, ordinal + 1, ext),
    }
}

fn probe_and_store(job: &Job, store: &dyn ContentStore) -> Result<Probed, AssetError> {
    let (container, ordinal) = (job.container, job.ordinal);

    if let Some(declared) = job.declared.as_deref() {
        let declared = declared.trim_start_matches('.').to_ascii_lowercase();
        if VECTOR_FORMATS.contains(&declared.as_str()) {
            return Err(AssetError::UnsupportedFormat {
                container,
                ordinal,
                format: declared,
            });
        }
    }

    if job.data.is_empty() {
        return Err(AssetError::DecodeFailed {
            container,
            ordinal,
            detail: "asset has no data".into(),
        });
    }

    let format = sniff_format(&job.data).ok_or_else(|| AssetError::UnsupportedFormat {
        container,
        ordinal,
        format: job.declared.clone().unwrap_or_else(|| "unknown".into()),
    })?;

    let (width, height) = ImageReader::with_format(Cursor::new(&job.data[..]), format)
        .into_dimensions()
        .map_err(|e| AssetError::DecodeFailed {
            container,
            ordinal,
            detail: e.to_string(),
        })?;

    if width < ExtractedImage::MIN_DIMENSION || height < ExtractedImage::MIN_DIMENSION {
        return Err(AssetError::TooSmall {
            container,
            ordinal,
            width,
            height,
        });
    }
    if !ExtractedImage::dimensions_allowed(width, height) {
        return Err(AssetError::TooWide {
            container,
            ordinal,
            width,
            height,
        });
    }

    let ext = format.extensions_str().first().copied().unwrap_or("img");
    let id = image_id(job.source, container, ordinal, ext);
    store.put(&id, &job.data).map_err(|e| AssetError::StoreFailed {
        container,
        ordinal,
        detail: e.to_string(),
    })?;

    Ok(Probed { id, width, height })
}

/// Raster formats this build can probe.
fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    match image::guess_format(bytes).ok()? {
        f @ (ImageFormat::Png
        | ImageFormat::Jpeg
        | ImageFormat::Gif
        | ImageFormat::Bmp
        | ImageFormat::Tiff
        | ImageFormat::WebP) => Some(f),
        _ => None,
    }
}
