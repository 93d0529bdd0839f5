//! Context extraction: a best-effort description for one embedded image.
//!
//! The matcher can only be as good as the text attached to each image, so
//! this stage tries progressively weaker sources and keeps the first one
//! that yields something:
//!
//! 1. a caption explicitly numbered for this image (`Figure 2: …` for the
//!    second image of the container)
//! 2. positional pairing: the caption at the image's position (figure
//!    captions are listed before table captions), else the last caption
//! 3. page containers: text rendered in a band above and below the image
//! 4. flow containers: the referencing paragraph and its neighbours
//! 5. the first container sentence mentioning a figure-like keyword
//! 6. the first characters of the container text
//!
//! Every step is a pure function of the container, so extraction is
//! deterministic.

use crate::config::DeckConfig;
use crate::document::{Container, EmbeddedAsset, FlowContainer, PageContainer, Rect};
use once_cell::sync::Lazy;
use regex::Regex;

/// `<Label><Number>[.:]?<description>`, a figure caption.
static FIGURE_CAPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(figure|fig\.?)\s*(\d+)[.:]?\s*([^\n.]+)").expect("valid figure caption regex")
});

/// `<Label><Number>[.:]?<description>`, a table caption.
static TABLE_CAPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(table)\s*(\d+)[.:]?\s*([^\n.]+)").expect("valid table caption regex")
});

/// `<label><number>`, a reference to a figure or table, e.g. "see fig. 3".
pub(crate) static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(figure|fig\.?|table)\s*(\d+)\b").expect("valid reference regex")
});

/// Words that make a sentence likely to describe an illustration.
const ILLUSTRATION_KEYWORDS: [&str; 12] = [
    "figure",
    "table",
    "chart",
    "graph",
    "image",
    "diagram",
    "illustration",
    "photo",
    "plot",
    "map",
    "screenshot",
    "picture",
];

static SENTENCE_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"));

/// A detected caption, normalised to `"<Label> <Number>: <description>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub number: u32,
    pub text: String,
}

/// Figure captions in reading order, followed by table captions in
/// reading order.
pub fn detect_captions(text: &str) -> Vec<Caption> {
    [&*FIGURE_CAPTION_RE, &*TABLE_CAPTION_RE]
        .into_iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| {
            let label = caps.get(1)?.as_str();
            let number: u32 = caps.get(2)?.as_str().parse().ok()?;
            let description = caps.get(3)?.as_str().trim();
            Some(Caption {
                number,
                text: format!("{label} {number}: {description}"),
            })
        })
        .collect()
}

/// Figure/table numbers referenced anywhere in `text`, in order of
/// appearance, without duplicates.
pub fn referenced_numbers(text: &str) -> Vec<u32> {
    let mut numbers = Vec::new();
    for caps in REFERENCE_RE.captures_iter(text) {
        if let Some(n) = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()) {
            if !numbers.contains(&n) {
                numbers.push(n);
            }
        }
    }
    numbers
}

/// Derives the context string attached to each harvested image.
#[derive(Debug, Clone)]
pub struct ContextExtractor {
    window: f64,
    max_chars: usize,
    fallback_chars: usize,
}

impl Default for ContextExtractor {
    fn default() -> Self {
        Self {
            window: 200.0,
            max_chars: 200,
            fallback_chars: 150,
        }
    }
}

impl ContextExtractor {
    pub fn from_config(config: &DeckConfig) -> Self {
        Self {
            window: config.context_window,
            max_chars: config.context_max_chars,
            fallback_chars: config.fallback_chars,
        }
    }

    /// Context for `asset`, which must belong to `container`. Never fails;
    /// returns an empty string only when the container has no text at all.
    pub fn extract(&self, container: &Container, asset: &EmbeddedAsset) -> String {
        let captions = detect_captions(container.text());
        let ordinal = asset.ordinal();

        if let Some(c) = captions.iter().find(|c| c.number as usize == ordinal + 1) {
            return c.text.clone();
        }
        if let Some(c) = captions.get(ordinal).or_else(|| captions.last()) {
            return c.text.clone();
        }

        let nearby = match container {
            Container::Page(page) => container
                .bounding_box(asset)
                .map(|bbox| self.geometric_window(page, &bbox)),
            Container::Flow(flow) => asset
                .anchor()
                .map(|anchor| self.paragraph_window(flow, anchor)),
        };
        if let Some(text) = nearby.filter(|t| !t.is_empty()) {
            return text;
        }

        self.keyword_or_prefix(container.text())
    }

    /// Text rendered within `window` units above and below the image,
    /// horizontally clipped to the image.
    fn geometric_window(&self, page: &PageContainer, bbox: &Rect) -> String {
        let above = Rect::new(bbox.x0, bbox.y0 - self.window, bbox.x1, bbox.y0);
        let below = Rect::new(bbox.x0, bbox.y1, bbox.x1, bbox.y1 + self.window);

        let collect = |band: &Rect| {
            page.spans()
                .iter()
                .filter(|s| s.bbox.intersects(band))
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        };

        let joined = format!("{} {}", collect(&above), collect(&below));
        truncate_chars(joined.trim(), self.max_chars)
    }

    /// The anchor paragraph with one neighbour either side; when that is
    /// blank, a ±3 window reduced to its most descriptive sentence.
    fn paragraph_window(&self, flow: &FlowContainer, anchor: usize) -> String {
        let paragraphs = flow.paragraphs();
        if anchor >= paragraphs.len() {
            return String::new();
        }

        let narrow = join_window(paragraphs, anchor, 1);
        if !narrow.trim().is_empty() {
            return narrow.trim().to_string();
        }

        let wide = join_window(paragraphs, anchor, 3);
        self.keyword_or_prefix(&wide)
    }

    /// Steps 5 and 6: a keyword sentence, else the text prefix.
    fn keyword_or_prefix(&self, text: &str) -> String {
        if let Some(sentence) = keyword_sentence(text) {
            return truncate_chars(sentence, self.max_chars);
        }
        truncate_chars(text.trim(), self.fallback_chars)
    }
}

fn join_window(paragraphs: &[String], center: usize, radius: usize) -> String {
    let start = center.saturating_sub(radius);
    let end = (center + radius + 1).min(paragraphs.len());
    paragraphs[start..end].join(" ")
}

fn keyword_sentence(text: &str) -> Option<&str> {
    SENTENCE_SPLIT_RE
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .find(|s| {
            let lower = s.to_lowercase();
            ILLUSTRATION_KEYWORDS.iter().any(|k| lower.contains(k))
        })
}

/// First `max` characters of `s`, never splitting a code point.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextSpan;

    fn asset() -> EmbeddedAsset {
        EmbeddedAsset::new(vec![0u8])
    }

    #[test]
    fn figure_captions_precede_table_captions() {
        let caps = detect_captions("Table 2: Costs.\nSee below.\nFig. 1 - Growth over time\nfigure 3. Map");
        let texts: Vec<&str> = caps.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Fig. 1: - Growth over time", "figure 3: Map", "Table 2: Costs"]
        );
        assert_eq!(caps[2].number, 2);
    }

    #[test]
    fn figure_caption_beats_earlier_table_caption() {
        let page = PageContainer::new(0, "Table 5: Costs\nFigure 7: Growth").with_asset(asset());
        let c = Container::from(page);
        assert_eq!(
            ContextExtractor::default().extract(&c, &c.assets()[0]),
            "Figure 7: Growth"
        );
    }

    #[test]
    fn same_number_prefers_figure_over_table() {
        let page = PageContainer::new(0, "Table 1: Headcount\nFigure 1: Org chart").with_asset(asset());
        let c = Container::from(page);
        assert_eq!(
            ContextExtractor::default().extract(&c, &c.assets()[0]),
            "Figure 1: Org chart"
        );
    }

    #[test]
    fn referenced_numbers_dedups() {
        assert_eq!(
            referenced_numbers("see figure 3 and Fig.3, then table 12"),
            vec![3, 12]
        );
        assert!(referenced_numbers("nothing to see").is_empty());
    }

    #[test]
    fn references_match_inside_compound_words() {
        assert_eq!(referenced_numbers("see subtable 3"), vec![3]);
        assert_eq!(referenced_numbers("figure 03"), vec![3]);
        assert!(referenced_numbers("table 3a").is_empty());
    }

    #[test]
    fn numbered_caption_wins_over_position() {
        let page = PageContainer::new(0, "Figure 2: Second chart\nFigure 1: First chart")
            .with_asset(asset())
            .with_asset(asset());
        let c = Container::from(page);
        let x = ContextExtractor::default();
        assert_eq!(x.extract(&c, &c.assets()[0]), "Figure 1: First chart");
        assert_eq!(x.extract(&c, &c.assets()[1]), "Figure 2: Second chart");
    }

    #[test]
    fn positional_pairing_falls_back_to_last_caption() {
        let page = PageContainer::new(0, "Table 7: Only caption")
            .with_asset(asset())
            .with_asset(asset())
            .with_asset(asset());
        let c = Container::from(page);
        let x = ContextExtractor::default();
        assert_eq!(x.extract(&c, &c.assets()[2]), "Table 7: Only caption");
    }

    #[test]
    fn geometric_window_reads_text_around_image() {
        let bbox = Rect::new(100.0, 300.0, 400.0, 500.0);
        let page = PageContainer::new(0, "Quarterly numbers")
            .with_span(TextSpan::new("Above the image", Rect::new(100.0, 250.0, 300.0, 262.0)))
            .with_span(TextSpan::new("Far away", Rect::new(100.0, 20.0, 300.0, 32.0)))
            .with_span(TextSpan::new("Beside it", Rect::new(450.0, 350.0, 550.0, 362.0)))
            .with_span(TextSpan::new("Below the image", Rect::new(120.0, 520.0, 300.0, 532.0)))
            .with_asset(asset().with_bbox(bbox));
        let c = Container::from(page);
        let ctx = ContextExtractor::default().extract(&c, &c.assets()[0]);
        assert_eq!(ctx, "Above the image Below the image");
    }

    #[test]
    fn geometric_window_is_truncated() {
        let long = "x".repeat(500);
        let page = PageContainer::new(0, "")
            .with_span(TextSpan::new(long, Rect::new(0.0, 0.0, 10.0, 10.0)))
            .with_asset(asset().with_bbox(Rect::new(0.0, 20.0, 10.0, 30.0)));
        let c = Container::from(page);
        assert_eq!(ContextExtractor::default().extract(&c, &c.assets()[0]).len(), 200);
    }

    #[test]
    fn paragraph_adjacency_uses_neighbours() {
        let flow = FlowContainer::new(
            0,
            vec!["Intro".into(), "Sales rose".into(), "".into(), "in Q3".into(), "Outro".into()],
        )
        .with_asset(asset().with_anchor(2));
        let c = Container::from(flow);
        assert_eq!(
            ContextExtractor::default().extract(&c, &c.assets()[0]),
            "Sales rose  in Q3"
        );
    }

    #[test]
    fn blank_neighbourhood_widens_to_keyword_sentence() {
        let flow = FlowContainer::new(
            0,
            vec![
                "Background. The diagram shows the flow".into(),
                "Unrelated".into(),
                "".into(),
                "".into(),
                "".into(),
            ],
        )
        .with_asset(asset().with_anchor(3));
        let c = Container::from(flow);
        assert_eq!(
            ContextExtractor::default().extract(&c, &c.assets()[0]),
            "The diagram shows the flow Unrelated"
        );
    }

    #[test]
    fn keyword_sentence_fallback() {
        let page = PageContainer::new(0, "We met in May. The photo shows the team! Thanks.")
            .with_asset(asset());
        let c = Container::from(page);
        assert_eq!(
            ContextExtractor::default().extract(&c, &c.assets()[0]),
            "The photo shows the team"
        );
    }

    #[test]
    fn prefix_fallback() {
        let text = "a".repeat(400);
        let page = PageContainer::new(0, text).with_asset(asset());
        let c = Container::from(page);
        let ctx = ContextExtractor::default().extract(&c, &c.assets()[0]);
        assert_eq!(ctx.chars().count(), 150);
    }

    #[test]
    fn empty_container_gives_empty_context() {
        let c = Container::from(PageContainer::new(0, "").with_asset(asset()));
        assert_eq!(ContextExtractor::default().extract(&c, &c.assets()[0]), "");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn extraction_is_deterministic() {
        let page = PageContainer::new(0, "The chart compares regions. More text.")
            .with_asset(asset());
        let c = Container::from(page);
        let x = ContextExtractor::default();
        let first = x.extract(&c, &c.assets()[0]);
        for _ in 0..5 {
            assert_eq!(x.extract(&c, &c.assets()[0]), first);
        }
    }
}
