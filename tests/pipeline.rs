//! Integration tests for the full deck pipeline.
//!
//! The oracle is scripted, images are synthetic PNGs and the content store
//! lives in memory or a temp dir, so nothing here touches the network.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use doc2deck::{
    generate_deck, generate_deck_sync, generate_deck_to_file, harvest_only, ContentStore, Deck,
    DeckConfig, DeckError, DeckProgressCallback, DirectoryStore, Document, EmbeddedAsset,
    LayoutKind, MatchKind, MemoryStore, PageContainer, SlideOracle, SlideSpec, StructureRequest,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Returns a fixed outline and remembers the request it was given.
struct ScriptedOracle {
    slides: Vec<SlideSpec>,
    seen: Mutex<Option<StructureRequest>>,
}

impl ScriptedOracle {
    fn new(slides: Vec<SlideSpec>) -> Arc<Self> {
        Arc::new(Self {
            slides,
            seen: Mutex::new(None),
        })
    }
}

#[async_trait]
impl SlideOracle for ScriptedOracle {
    async fn generate(&self, request: &StructureRequest) -> Result<Vec<SlideSpec>, DeckError> {
        *self.seen.lock().unwrap() = Some(request.clone());
        Ok(self.slides.clone())
    }
}

struct SlowOracle;

#[async_trait]
impl SlideOracle for SlowOracle {
    async fn generate(&self, _request: &StructureRequest) -> Result<Vec<SlideSpec>, DeckError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(vec![SlideSpec::new("Late", vec![])])
    }
}

/// Three pages:
/// - A: captioned "Figure 1", plus a 50×50 icon that must be filtered out
/// - B: no caption, described by a keyword sentence
/// - C: no text at all, the largest image
fn report_document() -> Document {
    let p1 = PageContainer::new(0, "Introduction to the company.\nFigure 1: Regional revenue breakdown")
        .with_asset(EmbeddedAsset::new(png(300, 200)))
        .with_asset(EmbeddedAsset::new(png(50, 50)));
    let p2 = PageContainer::new(1, "Customer satisfaction survey results diagram.")
        .with_asset(EmbeddedAsset::new(png(240, 180)));
    let p3 = PageContainer::new(2, "").with_asset(EmbeddedAsset::new(png(800, 600)));
    Document::new("annual-report", vec![p1.into(), p2.into(), p3.into()])
}

fn report_outline() -> Vec<SlideSpec> {
    vec![
        SlideSpec::new("Annual Report 2024", vec![]),
        SlideSpec::new(
            "Regional Revenue",
            vec!["See Figure 1 for the breakdown".into(), "EMEA grew fastest".into()],
        ),
        SlideSpec::new(
            "Customer Satisfaction",
            vec!["Survey results diagram shows trends".into()],
        ),
    ]
}

fn config_with(oracle: Arc<dyn SlideOracle>) -> DeckConfig {
    DeckConfig::builder().oracle(oracle).build().unwrap()
}

// ── End-to-end ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn assigns_exact_fuzzy_and_title_images() {
    let oracle = ScriptedOracle::new(report_outline());
    let config = config_with(oracle.clone());
    let store = Arc::new(MemoryStore::new());

    let out = generate_deck(&report_document(), store.clone(), &config)
        .await
        .unwrap();

    let ids: Vec<Option<&str>> = out.assignments.iter().map(|a| a.image_id.as_deref()).collect();
    assert_eq!(
        ids,
        vec![
            Some("page3_img1.png"),
            Some("page1_img1.png"),
            Some("page2_img1.png"),
        ]
    );
    assert_eq!(out.assignments[0].matched_by, MatchKind::Title);
    assert_eq!(out.assignments[1].matched_by, MatchKind::ExactNumber { number: 1 });
    assert!(matches!(out.assignments[2].matched_by, MatchKind::Fuzzy { score } if score > 0.3));

    assert_eq!(out.deck.slides.len(), 3);
    assert_eq!(out.deck.slides[0].layout, LayoutKind::Title);
    assert_eq!(out.deck.slides[1].layout, LayoutKind::TwoContent);
    assert_eq!(out.deck.picture_count(), 3);

    assert_eq!(out.stats.assets_seen, 4);
    assert_eq!(out.stats.images_harvested, 3);
    assert_eq!(out.stats.assets_skipped, 1);
    assert_eq!(out.stats.images_placed, 3);
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].contains("50x50"));
    assert_eq!(store.len(), 3);

    let seen = oracle.seen.lock().unwrap().clone().unwrap();
    assert!(seen.document_text.contains("Regional revenue breakdown"));
    assert!(seen.document_text.contains("Customer satisfaction"));
}

#[tokio::test]
async fn no_image_is_used_twice() {
    let mut outline = report_outline();
    for i in 0..5 {
        outline.push(SlideSpec::new(format!("Extra {i}"), vec!["figure chart".into()]));
    }
    let config = config_with(ScriptedOracle::new(outline));

    let out = generate_deck(&report_document(), Arc::new(MemoryStore::new()), &config)
        .await
        .unwrap();

    let mut ids: Vec<&str> = out
        .assignments
        .iter()
        .filter_map(|a| a.image_id.as_deref())
        .collect();
    let before = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), before);
    assert_eq!(before, 3);
    assert!(out.assignments[3..]
        .iter()
        .all(|a| a.matched_by == MatchKind::None && a.layout == LayoutKind::TitleAndContent));
}

#[tokio::test]
async fn identical_runs_assign_identically() {
    let config = config_with(ScriptedOracle::new(report_outline()));
    let a = generate_deck(&report_document(), Arc::new(MemoryStore::new()), &config)
        .await
        .unwrap();
    let b = generate_deck(&report_document(), Arc::new(MemoryStore::new()), &config)
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_string(&a.assignments).unwrap(),
        serde_json::to_string(&b.assignments).unwrap()
    );
    assert_eq!(a.deck, b.deck);
}

#[tokio::test]
async fn plain_text_document_gets_text_only_deck() {
    let doc = Document::from_plain_text("notes", "First idea.\n\nSecond idea.");
    let config = config_with(ScriptedOracle::new(report_outline()));

    let out = generate_deck(&doc, Arc::new(MemoryStore::new()), &config)
        .await
        .unwrap();

    assert_eq!(out.deck.picture_count(), 0);
    assert!(out.assignments.iter().all(|a| !a.has_image()));
    assert_eq!(out.deck.slides[1].layout, LayoutKind::TitleAndContent);
    assert!(out.warnings.is_empty());
}

// ── Failure modes ────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_outline_is_a_contract_violation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deck.json");
    let config = config_with(ScriptedOracle::new(vec![]));

    let err = generate_deck_to_file(&report_document(), Arc::new(MemoryStore::new()), &path, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, DeckError::OracleContractViolation { .. }));
    assert!(!path.exists(), "no partial deck may be written");
}

#[tokio::test]
async fn blank_title_is_a_contract_violation() {
    let config = config_with(ScriptedOracle::new(vec![SlideSpec::new("  ", vec![])]));
    let err = generate_deck(&report_document(), Arc::new(MemoryStore::new()), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, DeckError::OracleContractViolation { .. }));
}

#[tokio::test]
async fn run_timeout_is_enforced() {
    let config = DeckConfig::builder()
        .oracle(Arc::new(SlowOracle))
        .run_timeout_secs(1)
        .build()
        .unwrap();
    let store = Arc::new(MemoryStore::new());

    let err = generate_deck(&report_document(), store.clone(), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, DeckError::Timeout { secs: 1 }));
    // Harvested assets stay behind.
    assert_eq!(store.len(), 3);
}

/// Accepts writes but forgets one key.
struct LossyStore {
    inner: MemoryStore,
    lost: &'static str,
}

impl ContentStore for LossyStore {
    fn put(&self, key: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.inner.put(key, bytes)
    }

    fn contains(&self, key: &str) -> bool {
        key != self.lost && self.inner.contains(key)
    }
}

#[tokio::test]
async fn missing_backing_asset_only_drops_that_picture() {
    let config = config_with(ScriptedOracle::new(report_outline()));
    let store = Arc::new(LossyStore {
        inner: MemoryStore::new(),
        lost: "page1_img1.png",
    });

    let out = generate_deck(&report_document(), store, &config).await.unwrap();

    assert_eq!(out.assignments[1].image_id.as_deref(), Some("page1_img1.png"));
    assert!(out.deck.slides[1].picture().is_none());
    assert_eq!(out.deck.slides[1].layout, LayoutKind::TitleAndContent);
    assert_eq!(out.deck.picture_count(), 2);
    assert_eq!(out.stats.images_placed, 2);
    assert!(out.warnings.iter().any(|w| w.contains("page1_img1.png")));
}

// ── Files and progress ───────────────────────────────────────────────────────

#[tokio::test]
async fn deck_file_and_store_directory_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(DirectoryStore::open(dir.path().join("images")).unwrap());
    let path = dir.path().join("out").join("deck.json");
    let config = config_with(ScriptedOracle::new(report_outline()));

    let out = generate_deck_to_file(&report_document(), store, &path, &config)
        .await
        .unwrap();

    let back: Deck = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back, out.deck);
    for img in &out.images {
        assert!(dir.path().join("images").join(img.id()).exists());
    }
}

#[derive(Default)]
struct Counting {
    retained: AtomicUsize,
    skipped: AtomicUsize,
    assigned: AtomicUsize,
    completed: AtomicUsize,
}

impl DeckProgressCallback for Counting {
    fn on_asset_retained(&self, _image_id: &str, _done: usize, _total: usize) {
        self.retained.fetch_add(1, Ordering::SeqCst);
    }

    fn on_asset_skipped(&self, _reason: &str, _done: usize, _total: usize) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    fn on_slide_assigned(&self, _slide_index: usize, _total: usize, _image_id: Option<&str>) {
        self.assigned.fetch_add(1, Ordering::SeqCst);
    }

    fn on_deck_complete(&self, _slide_count: usize, _images_placed: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_events_are_reported() {
    let cb = Arc::new(Counting::default());
    let config = DeckConfig::builder()
        .oracle(ScriptedOracle::new(report_outline()))
        .progress_callback(cb.clone())
        .build()
        .unwrap();

    generate_deck(&report_document(), Arc::new(MemoryStore::new()), &config)
        .await
        .unwrap();

    assert_eq!(cb.retained.load(Ordering::SeqCst), 3);
    assert_eq!(cb.skipped.load(Ordering::SeqCst), 1);
    assert_eq!(cb.assigned.load(Ordering::SeqCst), 3);
    assert_eq!(cb.completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn harvest_only_needs_no_oracle() {
    let report = harvest_only(&report_document(), Arc::new(MemoryStore::new()), &DeckConfig::default())
        .await
        .unwrap();
    assert_eq!(report.images.len(), 3);
    assert_eq!(report.images[0].context(), "Figure 1: Regional revenue breakdown");
    assert_eq!(
        report.images[1].context(),
        "Customer satisfaction survey results diagram."
    );
    assert_eq!(report.images[2].context(), "");
}

#[test]
fn sync_wrapper_runs_pipeline() {
    let config = config_with(ScriptedOracle::new(report_outline()));
    let out = generate_deck_sync(&report_document(), Arc::new(MemoryStore::new()), &config).unwrap();
    assert_eq!(out.deck.slides.len(), 3);
}
