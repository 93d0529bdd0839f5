//! Slide/image assignment: at most one image per slide, each image used once.
//!
//! Matching is a deterministic greedy walk in document order. The title slide
//! picks first; every content slide then tries, in order:
//!
//! 1. **exact number**: the slide (or its image hint) mentions "figure 3" and
//!    an unused image's context carries the same figure/table number
//! 2. **fuzzy**: the best sequence-similarity score between the slide text
//!    and each unused image's context, plus a bonus per shared domain keyword,
//!    accepted only when strictly above the threshold
//! 3. **last resort**: the first unused image, regardless of relevance
//!
//! Consumption is tracked in a [`MatcherState`] owned by the caller for one
//! run; a slide that comes later can never take an image an earlier slide
//! used. Matching has no failure mode: a slide may simply get no image.

use crate::config::DeckConfig;
use crate::model::{AssignedSlide, ExtractedImage, LayoutKind, MatchKind, SlideSpec};
use crate::pipeline::context::{referenced_numbers, REFERENCE_RE};
use crate::pipeline::similarity;
use crate::progress::ProgressCallback;
use std::collections::HashSet;
use tracing::debug;

/// Context words that mark an image as a good title-slide picture.
const TITLE_KEYWORDS: [&str; 5] = ["logo", "title", "cover", "header", "main"];

/// Words that earn the fuzzy bonus when both sides contain them.
const DOMAIN_KEYWORDS: [&str; 11] = [
    "chart",
    "graph",
    "plot",
    "diagram",
    "screenshot",
    "illustration",
    "figure",
    "table",
    "image",
    "photo",
    "picture",
];

/// Image ids consumed so far in one deck-generation run.
#[derive(Debug, Default, Clone)]
pub struct MatcherState {
    used: HashSet<String>,
}

impl MatcherState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    pub fn mark_used(&mut self, id: &str) {
        self.used.insert(id.to_string());
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }
}

/// Fuzzy scoring knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    /// Scores must be strictly greater than this to be accepted.
    pub threshold: f64,
    /// Added once per shared domain keyword, without a cap.
    pub keyword_bonus: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            keyword_bonus: 0.2,
        }
    }
}

impl ScoringPolicy {
    pub fn from_config(config: &DeckConfig) -> Self {
        Self {
            threshold: config.fuzzy_threshold,
            keyword_bonus: config.keyword_bonus,
        }
    }

    pub fn accepts(&self, score: f64) -> bool {
        score > self.threshold
    }

    /// Similarity of two already-lowercased strings plus keyword bonuses.
    pub fn score(&self, slide_context: &str, image_context: &str) -> f64 {
        let base = similarity::ratio(slide_context, image_context);
        let shared = DOMAIN_KEYWORDS
            .iter()
            .filter(|k| slide_context.contains(*k) && image_context.contains(*k))
            .count();
        base + self.keyword_bonus * shared as f64
    }
}

/// Assigns images from a fixed pool to slides.
#[derive(Debug, Clone)]
pub struct SlideImageMatcher<'p> {
    pool: &'p [ExtractedImage],
    policy: ScoringPolicy,
}

impl<'p> SlideImageMatcher<'p> {
    pub fn new(pool: &'p [ExtractedImage], policy: ScoringPolicy) -> Self {
        Self { pool, policy }
    }

    fn unused<'s>(&'s self, state: &'s MatcherState) -> impl Iterator<Item = &'p ExtractedImage> + 's {
        self.pool.iter().filter(move |img| !state.is_used(img.id()))
    }

    /// Title-slide picture: a logo-like context, else the largest image,
    /// else the first one. Marks the pick as used.
    pub fn select_title_image(&self, state: &mut MatcherState) -> Option<&'p ExtractedImage> {
        let pick = self
            .unused(state)
            .find(|img| {
                let ctx = img.context().to_lowercase();
                TITLE_KEYWORDS.iter().any(|k| ctx.contains(k))
            })
            .or_else(|| {
                let mut largest: Option<&'p ExtractedImage> = None;
                for img in self.unused(state) {
                    if largest.is_none_or(|best| img.area() > best.area()) {
                        largest = Some(img);
                    }
                }
                largest
            })
            .or_else(|| self.unused(state).next());

        if let Some(img) = pick {
            state.mark_used(img.id());
        }
        pick
    }

    /// Choose an image for one content slide and mark it used.
    pub fn match_slide(
        &self,
        spec: &SlideSpec,
        state: &mut MatcherState,
    ) -> (Option<&'p ExtractedImage>, MatchKind) {
        let slide_context = slide_context(spec);

        let mut numbers = spec
            .image_hint
            .as_deref()
            .map(|h| referenced_numbers(&h.to_lowercase()))
            .unwrap_or_default();
        for n in referenced_numbers(&slide_context) {
            if !numbers.contains(&n) {
                numbers.push(n);
            }
        }

        let (pick, kind) = match self.exact_number(&numbers, state) {
            Some((img, number)) => (Some(img), MatchKind::ExactNumber { number }),
            None => match self.best_fuzzy(&slide_context, state) {
                Some((img, score)) if self.policy.accepts(score) => {
                    (Some(img), MatchKind::Fuzzy { score })
                }
                _ => match self.unused(state).next() {
                    Some(img) => (Some(img), MatchKind::LastResort),
                    None => (None, MatchKind::None),
                },
            },
        };

        if let Some(img) = pick {
            state.mark_used(img.id());
        }
        (pick, kind)
    }

    /// First unused image (pool order) whose context cites one of `numbers`.
    fn exact_number(
        &self,
        numbers: &[u32],
        state: &MatcherState,
    ) -> Option<(&'p ExtractedImage, u32)> {
        if numbers.is_empty() {
            return None;
        }
        self.unused(state).find_map(|img| {
            let ctx = img.context().to_lowercase();
            REFERENCE_RE
                .captures_iter(&ctx)
                .filter_map(|caps| caps.get(2)?.as_str().parse::<u32>().ok())
                .find(|n| numbers.contains(n))
                .map(|n| (img, n))
        })
    }

    /// Highest-scoring unused image; the earliest wins ties.
    fn best_fuzzy(
        &self,
        slide_context: &str,
        state: &MatcherState,
    ) -> Option<(&'p ExtractedImage, f64)> {
        let mut best: Option<(&'p ExtractedImage, f64)> = None;
        for img in self.unused(state) {
            let ctx = if img.context().is_empty() {
                img.id().to_lowercase()
            } else {
                img.context().to_lowercase()
            };
            let score = self.policy.score(slide_context, &ctx);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((img, score));
            }
        }
        best
    }

    /// Assign images to a whole outline. `specs[0]` is the title slide.
    pub fn assign(
        &self,
        specs: &[SlideSpec],
        state: &mut MatcherState,
        progress: Option<&ProgressCallback>,
    ) -> Vec<AssignedSlide> {
        let total = specs.len();
        let mut slides = Vec::with_capacity(total);
        let Some((title, content)) = specs.split_first() else {
            return slides;
        };

        let title_image = self.select_title_image(state);
        debug!(
            "Title slide '{}' → {}",
            title.title,
            title_image.map_or("no image", |i| i.id())
        );
        if let Some(cb) = progress {
            cb.on_slide_assigned(0, total, title_image.map(|i| i.id()));
        }
        slides.push(AssignedSlide {
            spec: title.clone(),
            image_id: title_image.map(|i| i.id().to_string()),
            layout: LayoutKind::Title,
            matched_by: if title_image.is_some() {
                MatchKind::Title
            } else {
                MatchKind::None
            },
        });

        for (offset, spec) in content.iter().enumerate() {
            let (image, kind) = self.match_slide(spec, state);
            debug!(
                "Slide {} '{}' → {} ({:?})",
                offset + 1,
                spec.title,
                image.map_or("no image", |i| i.id()),
                kind
            );
            if let Some(cb) = progress {
                cb.on_slide_assigned(offset + 1, total, image.map(|i| i.id()));
            }
            slides.push(AssignedSlide {
                spec: spec.clone(),
                image_id: image.map(|i| i.id().to_string()),
                layout: if image.is_some() {
                    LayoutKind::TwoContent
                } else {
                    LayoutKind::TitleAndContent
                },
                matched_by: kind,
            });
        }

        slides
    }
}

/// `lowercase(title) + " " + lowercase(bullets joined by spaces)`.
pub fn slide_context(spec: &SlideSpec) -> String {
    format!(
        "{} {}",
        spec.title.to_lowercase(),
        spec.bullets.join(" ").to_lowercase()
    )
}

/// Run the matcher over `specs` with a fresh, run-scoped state.
pub fn assign_images(
    specs: &[SlideSpec],
    pool: &[ExtractedImage],
    config: &DeckConfig,
) -> Vec<AssignedSlide> {
    let mut state = MatcherState::new();
    SlideImageMatcher::new(pool, ScoringPolicy::from_config(config)).assign(
        specs,
        &mut state,
        config.progress_callback.as_ref(),
    )
}
