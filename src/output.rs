//! Output types: the positioned deck and run statistics.
//!
//! Everything here is plain serialisable data. Geometry is in EMU
//! (English Metric Units, 914 400 per inch), the native unit of slide-deck
//! formats, so a writer can copy coordinates across without rounding.

use crate::model::{AssignedSlide, ExtractedImage, LayoutKind};
use crate::pipeline::layout::Region;
use serde::{Deserialize, Serialize};

/// A fully positioned slide deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    /// Slide width in EMU.
    pub width: i64,
    /// Slide height in EMU.
    pub height: i64,
    pub slides: Vec<PositionedSlide>,
}

impl Deck {
    /// Number of pictures placed across all slides.
    pub fn picture_count(&self) -> usize {
        self.slides
            .iter()
            .flat_map(|s| s.elements.iter())
            .filter(|e| matches!(e, Element::Picture(_)))
            .count()
    }
}

/// One slide with absolute element placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedSlide {
    /// 0-based position in the deck; 0 is the title slide.
    pub index: usize,
    pub layout: LayoutKind,
    pub elements: Vec<Element>,
}

impl PositionedSlide {
    pub fn picture(&self) -> Option<&Picture> {
        self.elements.iter().find_map(|e| match e {
            Element::Picture(p) => Some(p),
            Element::Text(_) => None,
        })
    }

    pub fn text_box(&self, role: TextRole) -> Option<&TextBox> {
        self.elements.iter().find_map(|e| match e {
            Element::Text(t) if t.role == role => Some(t),
            _ => None,
        })
    }
}

/// Something drawn on a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Text(TextBox),
    Picture(Picture),
}

/// What a text box holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    Title,
    Subtitle,
    Body,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub role: TextRole,
    pub rect: Region,
    pub paragraphs: Vec<TextParagraph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextParagraph {
    pub text: String,
    /// `None` keeps the template's default size.
    pub font_size_pt: Option<u32>,
    pub bold: bool,
    /// Rendered with the template's bullet glyph.
    pub bullet: bool,
    pub space_after_pt: Option<u32>,
}

impl TextParagraph {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size_pt: None,
            bold: false,
            bullet: false,
            space_after_pt: None,
        }
    }
}

/// An image drawn from the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Picture {
    /// Content-store key of the image.
    pub image_id: String,
    pub rect: Region,
}

/// Timing and counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckStats {
    /// Embedded assets seen in the document.
    pub assets_seen: usize,
    /// Assets that became images in the pool.
    pub images_harvested: usize,
    /// Assets rejected by filters or failures.
    pub assets_skipped: usize,
    /// Slides in the deck, title slide included.
    pub slides: usize,
    /// Pictures actually placed.
    pub images_placed: usize,
    pub harvest_duration_ms: u64,
    pub oracle_duration_ms: u64,
    pub layout_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckOutput {
    pub deck: Deck,
    /// The matcher's per-slide verdicts, in deck order.
    pub assignments: Vec<AssignedSlide>,
    /// The harvested image pool, in document order.
    pub images: Vec<ExtractedImage>,
    pub stats: DeckStats,
    /// Non-fatal problems (skipped assets, missing backing assets).
    pub warnings: Vec<String>,
}
