//! Core domain records shared by the pipeline stages.
//!
//! * [`ExtractedImage`]: produced by the harvester, read by the matcher and
//!   the layout engine. Immutable once built.
//! * [`SlideSpec`]: produced by the content-structuring oracle.
//! * [`AssignedSlide`]: the matcher's verdict for one slide.

use serde::{Deserialize, Serialize};

/// Which kind of container an image was harvested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Page-oriented container with geometry (PDF-like).
    Page,
    /// Paragraph-oriented container without geometry (DOCX-like).
    Flow,
}

/// A harvested, filtered, context-annotated image.
///
/// The binary payload lives in a [`crate::store::ContentStore`] under
/// [`ExtractedImage::id`]; this record only carries what matching and
/// layout need. Instances that violate the size rules cannot be built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedImage {
    id: String,
    container: usize,
    ordinal: usize,
    width: u32,
    height: u32,
    context: String,
    source: SourceKind,
}

impl ExtractedImage {
    /// Minimum accepted edge length, in pixels.
    pub const MIN_DIMENSION: u32 = 100;
    /// Maximum accepted `width / height` ratio.
    pub const MAX_ASPECT_RATIO: u32 = 10;

    /// Build an image record, or `None` when the dimensions break the
    /// size invariant (either edge under 100 px, or wider than 10:1).
    pub fn new(
        id: impl Into<String>,
        container: usize,
        ordinal: usize,
        width: u32,
        height: u32,
        context: impl Into<String>,
        source: SourceKind,
    ) -> Option<Self> {
        if !Self::dimensions_allowed(width, height) {
            return None;
        }
        Some(Self {
            id: id.into(),
            container,
            ordinal,
            width,
            height,
            context: context.into(),
            source,
        })
    }

    /// The size invariant, shared with the harvester's filters.
    pub fn dimensions_allowed(width: u32, height: u32) -> bool {
        width >= Self::MIN_DIMENSION
            && height >= Self::MIN_DIMENSION
            && u64::from(width) <= u64::from(height) * u64::from(Self::MAX_ASPECT_RATIO)
    }

    /// Content-store key; doubles as the generated file name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Index of the originating container in the document.
    pub fn container(&self) -> usize {
        self.container
    }

    /// 0-based position among the container's embedded assets.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel area, used by the title-image rule.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// `width / height`.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Best-effort description. Never null, may be empty.
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }
}

/// One slide as described by the content-structuring oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideSpec {
    pub title: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hint: Option<String>,
}

impl SlideSpec {
    pub fn new(title: impl Into<String>, bullets: Vec<String>) -> Self {
        Self {
            title: title.into(),
            bullets,
            image_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.image_hint = Some(hint.into());
        self
    }
}

/// Slide template chosen for a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// Opening slide: title, subtitle, optional corner image.
    Title,
    /// Title above a single bullet region.
    TitleAndContent,
    /// Title above bullets (left) and a picture (right).
    TwoContent,
}

/// How the matcher arrived at a slide's image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    /// Title-slide rule (keyword, largest area, or first image).
    Title,
    /// The slide referenced a figure/table number found in the context.
    ExactNumber { number: u32 },
    /// Fuzzy similarity cleared the acceptance threshold.
    Fuzzy { score: f64 },
    /// Nothing scored well enough; first unused image taken.
    LastResort,
    /// No image assigned.
    None,
}

/// The matcher's verdict for one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedSlide {
    pub spec: SlideSpec,
    /// Lookup key into the image pool; no ownership.
    pub image_id: Option<String>,
    pub layout: LayoutKind,
    pub matched_by: MatchKind,
}

impl AssignedSlide {
    pub fn has_image(&self) -> bool {
        self.image_id.is_some()
    }
}
