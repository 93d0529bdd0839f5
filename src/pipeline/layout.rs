//! Deck layout: turn per-slide assignments into absolute geometry.
//!
//! Three slide shapes exist:
//!
//! * **title**: title and subtitle regions; an assigned image sits in the
//!   bottom-right corner, its width capped at a fraction of the slide width
//! * **title + content**: title above a single bullet region
//! * **two content**: bullets left, picture right
//!
//! Pictures inside a region use *contain-fit*: scale to the limiting
//! dimension, keep the aspect ratio, never crop, centre on both axes.
//!
//! A template whose two-content layout lacks two body regions still gets a
//! two-column slide: an explicit text box on the left and a picture on the
//! right half, placed with the same contain-fit rule.

use crate::error::DeckError;
use crate::model::{AssignedSlide, ExtractedImage, LayoutKind};
use crate::output::{Deck, Element, Picture, PositionedSlide, TextBox, TextParagraph, TextRole};
use crate::store::ContentStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

pub const EMU_PER_INCH: i64 = 914_400;

const TITLE_FONT_PT: u32 = 40;
const BODY_FONT_PT: u32 = 24;
const FALLBACK_BULLET_SPACING_PT: u32 = 12;

/// Inches to EMU, rounded to the nearest unit.
pub fn inches(v: f64) -> i64 {
    (v * EMU_PER_INCH as f64).round() as i64
}

/// Axis-aligned rectangle in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Region {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build from inch measurements.
    pub fn from_inches(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(inches(left), inches(top), inches(width), inches(height))
    }

    pub fn right(&self) -> i64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.top + self.height
    }

    pub fn contains(&self, other: &Region) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Scale a `src_width`×`src_height` picture to fit inside `region` without
/// cropping, then centre it.
pub fn contain_fit(src_width: u32, src_height: u32, region: Region) -> Region {
    let aspect = f64::from(src_width) / f64::from(src_height);
    let region_aspect = region.width as f64 / region.height as f64;

    let (width, height) = if region_aspect > aspect {
        let h = region.height;
        ((h as f64 * aspect) as i64, h)
    } else {
        let w = region.width;
        (w, (w as f64 / aspect) as i64)
    };

    Region::new(
        region.left + (region.width - width) / 2,
        region.top + (region.height - height) / 2,
        width,
        height,
    )
}

/// Placeholder regions of one slide layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutTemplate {
    pub title: Region,
    /// Non-title regions in placeholder order.
    pub bodies: Vec<Region>,
}

/// Slide size and the three layouts the engine uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckTemplate {
    pub slide_width: i64,
    pub slide_height: i64,
    /// `bodies[0]`, when present, holds the subtitle.
    pub title_slide: LayoutTemplate,
    pub title_and_content: LayoutTemplate,
    pub two_content: LayoutTemplate,
    /// Cap on the title-slide picture width, as a fraction of slide width.
    pub title_image_width_fraction: f64,
    /// Gap between the title-slide picture and the slide edges.
    pub edge_margin: i64,
}

impl Default for DeckTemplate {
    fn default() -> Self {
        Self::widescreen()
    }
}

impl DeckTemplate {
    /// 13.333 in × 7.5 in (16:9).
    pub fn widescreen() -> Self {
        Self {
            slide_width: inches(13.333),
            slide_height: inches(7.5),
            title_slide: LayoutTemplate {
                title: Region::from_inches(1.0, 2.33, 11.33, 1.6),
                bodies: vec![Region::from_inches(2.0, 4.1, 9.33, 1.1)],
            },
            title_and_content: LayoutTemplate {
                title: Region::from_inches(0.5, 0.3, 12.33, 1.25),
                bodies: vec![Region::from_inches(0.5, 1.75, 12.33, 5.25)],
            },
            two_content: LayoutTemplate {
                title: Region::from_inches(0.5, 0.3, 12.33, 1.25),
                bodies: vec![
                    Region::from_inches(0.5, 1.75, 6.0, 5.25),
                    Region::from_inches(6.83, 1.75, 6.0, 5.25),
                ],
            },
            title_image_width_fraction: 0.375,
            edge_margin: inches(0.5),
        }
    }

    pub fn validate(&self) -> Result<(), DeckError> {
        if self.slide_width <= 0 || self.slide_height <= 0 {
            return Err(DeckError::InvalidConfig(
                "Slide dimensions must be positive".into(),
            ));
        }
        if !(self.title_image_width_fraction > 0.0 && self.title_image_width_fraction <= 1.0) {
            return Err(DeckError::InvalidConfig(format!(
                "Title image width fraction must be within (0, 1], got {}",
                self.title_image_width_fraction
            )));
        }
        if self.edge_margin < 0 || 2 * self.edge_margin >= self.slide_height {
            return Err(DeckError::InvalidConfig(
                "Edge margin must leave room on the slide".into(),
            ));
        }
        if self.title_and_content.bodies.is_empty() {
            return Err(DeckError::InvalidConfig(
                "Title-and-content layout needs a body region".into(),
            ));
        }
        let all = [&self.title_slide, &self.title_and_content, &self.two_content];
        let degenerate = all
            .iter()
            .flat_map(|l| std::iter::once(&l.title).chain(l.bodies.iter()))
            .any(|r| !r.is_positive());
        if degenerate {
            return Err(DeckError::InvalidConfig(
                "Layout regions must have positive width and height".into(),
            ));
        }
        Ok(())
    }

    fn full_slide(&self) -> Region {
        Region::new(0, 0, self.slide_width, self.slide_height)
    }
}

/// Deck plus anything that went wrong along the way.
#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub deck: Deck,
    pub warnings: Vec<String>,
}

/// Computes slide geometry from the matcher's assignments.
#[derive(Debug, Clone)]
pub struct DeckLayoutEngine<'a> {
    template: &'a DeckTemplate,
    subtitle: &'a str,
}

impl<'a> DeckLayoutEngine<'a> {
    pub fn new(template: &'a DeckTemplate, subtitle: &'a str) -> Self {
        Self { template, subtitle }
    }

    /// Lay out every slide. An assigned image that is missing from the pool
    /// or from the store is dropped from its slide only.
    pub fn layout(
        &self,
        slides: &[AssignedSlide],
        pool: &[ExtractedImage],
        store: &dyn ContentStore,
    ) -> LayoutResult {
        let by_id: HashMap<&str, &ExtractedImage> = pool.iter().map(|i| (i.id(), i)).collect();
        let mut warnings = Vec::new();

        let positioned = slides
            .iter()
            .enumerate()
            .map(|(index, slide)| {
                let image = slide.image_id.as_deref().and_then(|id| {
                    let found = by_id.get(id).copied().filter(|_| store.contains(id));
                    if found.is_none() {
                        let msg = format!("Slide {}: image '{}' has no backing asset; placed without picture", index + 1, id);
                        warn!("{}", msg);
                        warnings.push(msg);
                    }
                    found
                });

                match slide.layout {
                    LayoutKind::Title => self.title_slide(index, slide, image),
                    LayoutKind::TitleAndContent | LayoutKind::TwoContent => match image {
                        Some(img) => self.two_content_slide(index, slide, img),
                        None => self.content_slide(index, slide),
                    },
                }
            })
            .collect();

        LayoutResult {
            deck: Deck {
                width: self.template.slide_width,
                height: self.template.slide_height,
                slides: positioned,
            },
            warnings,
        }
    }

    fn title_slide(
        &self,
        index: usize,
        slide: &AssignedSlide,
        image: Option<&ExtractedImage>,
    ) -> PositionedSlide {
        let t = &self.template.title_slide;
        let mut elements = vec![Element::Text(TextBox {
            role: TextRole::Title,
            rect: t.title,
            paragraphs: vec![TextParagraph::plain(slide.spec.title.clone())],
        })];

        if let Some(rect) = t.bodies.first() {
            elements.push(Element::Text(TextBox {
                role: TextRole::Subtitle,
                rect: *rect,
                paragraphs: vec![TextParagraph::plain(self.subtitle)],
            }));
        }

        if let Some(img) = image {
            let rect = self.title_image_rect(img);
            debug!("Title image {} at {:?}", img.id(), rect);
            elements.push(Element::Picture(Picture {
                image_id: img.id().to_string(),
                rect,
            }));
        }

        PositionedSlide {
            index,
            layout: LayoutKind::Title,
            elements,
        }
    }

    /// Bottom-right corner, width capped, height from the aspect ratio.
    fn title_image_rect(&self, img: &ExtractedImage) -> Region {
        let tpl = self.template;
        let margin = tpl.edge_margin;
        let max_width = (tpl.slide_width as f64 * tpl.title_image_width_fraction) as i64;
        let max_height = tpl.slide_height - 2 * margin;

        let mut width = max_width;
        let mut height = (width as f64 / img.aspect_ratio()) as i64;
        if height > max_height {
            let fitted = contain_fit(img.width(), img.height(), Region::new(0, 0, max_width, max_height));
            width = fitted.width;
            height = fitted.height;
        }

        Region::new(
            tpl.slide_width - width - margin,
            tpl.slide_height - height - margin,
            width,
            height,
        )
    }

    fn content_slide(&self, index: usize, slide: &AssignedSlide) -> PositionedSlide {
        let t = &self.template.title_and_content;
        let mut elements = vec![title_box(t.title, &slide.spec.title)];
        if let Some(body) = t.bodies.first() {
            elements.push(bullet_box(*body, &slide.spec.bullets));
        }
        PositionedSlide {
            index,
            layout: LayoutKind::TitleAndContent,
            elements,
        }
    }

    fn two_content_slide(
        &self,
        index: usize,
        slide: &AssignedSlide,
        img: &ExtractedImage,
    ) -> PositionedSlide {
        let t = &self.template.two_content;
        let mut elements = vec![title_box(t.title, &slide.spec.title)];

        let picture_region = if let [left, right, ..] = t.bodies.as_slice() {
            elements.push(bullet_box(*left, &slide.spec.bullets));
            *right
        } else {
            debug!("Two-content template has {} body regions; drawing explicit boxes", t.bodies.len());
            elements.push(fallback_text_box(&slide.spec.bullets));
            self.fallback_picture_region()
        };

        let rect = contain_fit(img.width(), img.height(), picture_region);
        debug!("Slide {} image {} at {:?}", index + 1, img.id(), rect);
        elements.push(Element::Picture(Picture {
            image_id: img.id().to_string(),
            rect,
        }));

        PositionedSlide {
            index,
            layout: LayoutKind::TwoContent,
            elements,
        }
    }

    /// Right half of the slide below the title band.
    fn fallback_picture_region(&self) -> Region {
        let slide = self.template.full_slide();
        Region::new(
            slide.width / 2 + inches(0.25),
            inches(1.5),
            slide.width / 2 - inches(0.5),
            slide.height - inches(2.0),
        )
    }
}

fn title_box(rect: Region, title: &str) -> Element {
    Element::Text(TextBox {
        role: TextRole::Title,
        rect,
        paragraphs: vec![TextParagraph {
            text: title.to_string(),
            font_size_pt: Some(TITLE_FONT_PT),
            bold: true,
            bullet: false,
            space_after_pt: None,
        }],
    })
}

fn bullet_box(rect: Region, bullets: &[String]) -> Element {
    Element::Text(TextBox {
        role: TextRole::Body,
        rect,
        paragraphs: bullets
            .iter()
            .map(|b| TextParagraph {
                text: b.trim().to_string(),
                font_size_pt: Some(BODY_FONT_PT),
                bold: false,
                bullet: true,
                space_after_pt: None,
            })
            .collect(),
    })
}

/// Explicit text box with hand-drawn bullet glyphs.
fn fallback_text_box(bullets: &[String]) -> Element {
    Element::Text(TextBox {
        role: TextRole::Body,
        rect: Region::from_inches(0.5, 1.5, 6.0, 5.0),
        paragraphs: bullets
            .iter()
            .map(|b| TextParagraph {
                text: format!("• {}", b.trim()),
                font_size_pt: Some(BODY_FONT_PT),
                bold: false,
                bullet: false,
                space_after_pt: Some(FALLBACK_BULLET_SPACING_PT),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchKind, SlideSpec, SourceKind};
    use crate::store::MemoryStore;

    fn img(id: &str, w: u32, h: u32) -> ExtractedImage {
        ExtractedImage::new(id, 0, 0, w, h, "", SourceKind::Page).unwrap()
    }

    fn assigned(layout: LayoutKind, image: Option<&str>) -> AssignedSlide {
        AssignedSlide {
            spec: SlideSpec::new("Heading", vec!["  first ".into(), "second".into()]),
            image_id: image.map(str::to_string),
            layout,
            matched_by: MatchKind::None,
        }
    }

    fn store_with(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for id in ids {
            store.put(id, b"x").unwrap();
        }
        store
    }

    #[test]
    fn contain_fit_wide_image_fills_width() {
        let region = Region::new(100, 200, 1000, 1000);
        let r = contain_fit(400, 200, region);
        assert_eq!(r, Region::new(100, 450, 1000, 500));
    }

    #[test]
    fn contain_fit_tall_image_fills_height() {
        let region = Region::new(0, 0, 1000, 500);
        let r = contain_fit(100, 400, region);
        assert_eq!(r.height, 500);
        assert_eq!(r.width, 125);
        assert_eq!(r.left, (1000 - 125) / 2);
        assert_eq!(r.top, 0);
    }

    #[test]
    fn contain_fit_never_leaves_region() {
        let region = Region::from_inches(6.83, 1.75, 6.0, 5.25);
        for (w, h) in [(100, 100), (1000, 100), (100, 1000), (1920, 1080), (333, 777)] {
            let r = contain_fit(w, h, region);
            assert!(region.contains(&r), "{w}x{h} → {r:?}");
            let src = f64::from(w) / f64::from(h);
            let got = r.width as f64 / r.height as f64;
            assert!((src - got).abs() / src < 0.01, "aspect drift for {w}x{h}");
        }
    }

    #[test]
    fn widescreen_template_is_valid() {
        DeckTemplate::widescreen().validate().unwrap();
    }

    #[test]
    fn invalid_template_is_rejected() {
        let mut t = DeckTemplate::widescreen();
        t.title_image_width_fraction = 0.0;
        assert!(t.validate().is_err());

        let mut t = DeckTemplate::widescreen();
        t.title_and_content.bodies.clear();
        assert!(t.validate().is_err());
    }

    #[test]
    fn title_image_sits_bottom_right() {
        let tpl = DeckTemplate::widescreen();
        let engine = DeckLayoutEngine::new(&tpl, "Document Summary");
        let pool = vec![img("logo.png", 400, 200)];
        let store = store_with(&["logo.png"]);
        let out = engine.layout(&[assigned(LayoutKind::Title, Some("logo.png"))], &pool, &store);

        let slide = &out.deck.slides[0];
        let pic = slide.picture().unwrap();
        let expected_w = (tpl.slide_width as f64 * 0.375) as i64;
        assert_eq!(pic.rect.width, expected_w);
        assert_eq!(pic.rect.height, (expected_w as f64 / 2.0) as i64);
        assert_eq!(pic.rect.right(), tpl.slide_width - tpl.edge_margin);
        assert_eq!(pic.rect.bottom(), tpl.slide_height - tpl.edge_margin);
        assert_eq!(
            slide.text_box(TextRole::Subtitle).unwrap().paragraphs[0].text,
            "Document Summary"
        );
    }

    #[test]
    fn tall_title_image_is_capped_by_height() {
        let tpl = DeckTemplate::widescreen();
        let engine = DeckLayoutEngine::new(&tpl, "");
        let pool = vec![img("tall.png", 100, 2000)];
        let store = store_with(&["tall.png"]);
        let out = engine.layout(&[assigned(LayoutKind::Title, Some("tall.png"))], &pool, &store);
        let pic = out.deck.slides[0].picture().unwrap();
        assert!(pic.rect.top >= tpl.edge_margin);
        assert!(tpl.full_slide().contains(&pic.rect));
    }

    #[test]
    fn content_slide_without_image() {
        let tpl = DeckTemplate::widescreen();
        let engine = DeckLayoutEngine::new(&tpl, "");
        let out = engine.layout(&[assigned(LayoutKind::TitleAndContent, None)], &[], &MemoryStore::new());
        let slide = &out.deck.slides[0];
        assert_eq!(slide.layout, LayoutKind::TitleAndContent);
        assert!(slide.picture().is_none());

        let title = slide.text_box(TextRole::Title).unwrap();
        assert_eq!(title.paragraphs[0].font_size_pt, Some(40));
        assert!(title.paragraphs[0].bold);

        let body = slide.text_box(TextRole::Body).unwrap();
        assert_eq!(body.rect, tpl.title_and_content.bodies[0]);
        assert_eq!(body.paragraphs[0].text, "first");
        assert_eq!(body.paragraphs[0].font_size_pt, Some(24));
    }

    #[test]
    fn two_content_slide_places_picture_right() {
        let tpl = DeckTemplate::widescreen();
        let engine = DeckLayoutEngine::new(&tpl, "");
        let pool = vec![img("chart.png", 800, 600)];
        let store = store_with(&["chart.png"]);
        let out = engine.layout(&[assigned(LayoutKind::TwoContent, Some("chart.png"))], &pool, &store);
        let slide = &out.deck.slides[0];

        let right = tpl.two_content.bodies[1];
        let pic = slide.picture().unwrap();
        assert_eq!(pic.rect, contain_fit(800, 600, right));
        assert_eq!(
            slide.text_box(TextRole::Body).unwrap().rect,
            tpl.two_content.bodies[0]
        );
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn single_region_template_uses_explicit_boxes() {
        let mut tpl = DeckTemplate::widescreen();
        tpl.two_content.bodies.truncate(1);
        let engine = DeckLayoutEngine::new(&tpl, "");
        let pool = vec![img("chart.png", 800, 600)];
        let store = store_with(&["chart.png"]);
        let out = engine.layout(&[assigned(LayoutKind::TwoContent, Some("chart.png"))], &pool, &store);
        let slide = &out.deck.slides[0];

        let body = slide.text_box(TextRole::Body).unwrap();
        assert_eq!(body.rect, Region::from_inches(0.5, 1.5, 6.0, 5.0));
        assert_eq!(body.paragraphs[0].text, "• first");
        assert_eq!(body.paragraphs[0].space_after_pt, Some(12));

        let half = Region::new(
            tpl.slide_width / 2 + inches(0.25),
            inches(1.5),
            tpl.slide_width / 2 - inches(0.5),
            tpl.slide_height - inches(2.0),
        );
        let pic = slide.picture().unwrap();
        assert_eq!(pic.rect, contain_fit(800, 600, half));
        assert!(half.contains(&pic.rect));
    }

    #[test]
    fn missing_backing_asset_drops_only_the_picture() {
        let tpl = DeckTemplate::widescreen();
        let engine = DeckLayoutEngine::new(&tpl, "");
        let pool = vec![img("gone.png", 800, 600), img("here.png", 800, 600)];
        let store = store_with(&["here.png"]);
        let slides = [
            assigned(LayoutKind::TwoContent, Some("gone.png")),
            assigned(LayoutKind::TwoContent, Some("here.png")),
        ];
        let out = engine.layout(&slides, &pool, &store);

        assert_eq!(out.deck.slides.len(), 2);
        assert_eq!(out.deck.slides[0].layout, LayoutKind::TitleAndContent);
        assert!(out.deck.slides[0].picture().is_none());
        assert!(out.deck.slides[1].picture().is_some());
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("gone.png"));
        assert_eq!(out.deck.picture_count(), 1);
    }
}
