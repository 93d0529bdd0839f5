//! Document access: ordered containers with text, embedded assets, and
//! (for page-like containers) geometry.
//!
//! Raw format parsing (PDF, DOCX) is outside this crate. Callers either build
//! a [`Document`] directly from their own parser's output, or describe it in
//! a JSON manifest and load it with [`Document::load`].
//!
//! Both container kinds expose the same capability surface ([`Container::text`],
//! [`Container::assets`], [`Container::bounding_box`]), so the rest of the
//! pipeline never branches on the document's file type.
//!
//! ## Manifest format
//!
//! ```json
//! {
//!   "name": "quarterly-report",
//!   "containers": [
//!     {
//!       "kind": "page",
//!       "text": "Figure 1: Revenue by region ...",
//!       "spans": [{ "text": "Revenue grew", "bbox": { "x0": 72, "y0": 90, "x1": 300, "y1": 104 } }],
//!       "assets": [{ "path": "img/p1_0.png", "bbox": { "x0": 72, "y0": 120, "x1": 520, "y1": 400 } }]
//!     },
//!     {
//!       "kind": "flow",
//!       "paragraphs": ["Intro", "The chart below ...", ""],
//!       "assets": [{ "path": "img/chart.png", "anchor": 2 }]
//!     }
//!   ]
//! }
//! ```
//!
//! Asset paths are resolved relative to the manifest file. A page container
//! without `text` uses its spans joined by newlines.

use crate::error::DeckError;
use crate::model::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Axis-aligned rectangle in document units, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// `true` when the two rectangles share a region of non-zero area.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }
}

/// A run of text rendered at a known position on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub bbox: Rect,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// An embedded binary asset with a back-reference to its container.
#[derive(Debug, Clone)]
pub struct EmbeddedAsset {
    ordinal: usize,
    data: Arc<[u8]>,
    declared_format: Option<String>,
    bbox: Option<Rect>,
    anchor: Option<usize>,
}

impl EmbeddedAsset {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            ordinal: 0,
            data: data.into(),
            declared_format: None,
            bbox: None,
            anchor: None,
        }
    }

    /// Format as declared by the source document (e.g. file extension).
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.declared_format = Some(format.into());
        self
    }

    /// Placement on the page (page containers only).
    pub fn with_bbox(mut self, bbox: Rect) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Index of the paragraph that references this asset (flow containers only).
    pub fn with_anchor(mut self, paragraph: usize) -> Self {
        self.anchor = Some(paragraph);
        self
    }

    /// 0-based position among the container's assets.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    pub fn declared_format(&self) -> Option<&str> {
        self.declared_format.as_deref()
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }
}

/// Page-oriented container (PDF-like): text plus geometry.
#[derive(Debug, Clone)]
pub struct PageContainer {
    index: usize,
    text: String,
    spans: Vec<TextSpan>,
    assets: Vec<EmbeddedAsset>,
}

impl PageContainer {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            spans: Vec::new(),
            assets: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: TextSpan) -> Self {
        self.spans.push(span);
        self
    }

    pub fn with_asset(mut self, asset: EmbeddedAsset) -> Self {
        push_asset(&mut self.assets, asset);
        self
    }

    pub fn spans(&self) -> &[TextSpan] {
        &self.spans
    }
}

/// Paragraph-oriented container (DOCX-like): ordered paragraphs, no geometry.
#[derive(Debug, Clone)]
pub struct FlowContainer {
    index: usize,
    paragraphs: Vec<String>,
    text: String,
    assets: Vec<EmbeddedAsset>,
}

impl FlowContainer {
    pub fn new(index: usize, paragraphs: Vec<String>) -> Self {
        let text = paragraphs.join("\n");
        Self {
            index,
            paragraphs,
            text,
            assets: Vec::new(),
        }
    }

    pub fn with_asset(mut self, asset: EmbeddedAsset) -> Self {
        push_asset(&mut self.assets, asset);
        self
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }
}

fn push_asset(assets: &mut Vec<EmbeddedAsset>, mut asset: EmbeddedAsset) {
    asset.ordinal = assets.len();
    assets.push(asset);
}

/// One container of a document. Both variants share the same surface.
#[derive(Debug, Clone)]
pub enum Container {
    Page(PageContainer),
    Flow(FlowContainer),
}

impl Container {
    /// Position of this container in the document.
    pub fn index(&self) -> usize {
        match self {
            Container::Page(p) => p.index,
            Container::Flow(f) => f.index,
        }
    }

    fn set_index(&mut self, index: usize) {
        match self {
            Container::Page(p) => p.index = index,
            Container::Flow(f) => f.index = index,
        }
    }

    /// Plain text of the whole container.
    pub fn text(&self) -> &str {
        match self {
            Container::Page(p) => &p.text,
            Container::Flow(f) => &f.text,
        }
    }

    /// Embedded assets in traversal order.
    pub fn assets(&self) -> &[EmbeddedAsset] {
        match self {
            Container::Page(p) => &p.assets,
            Container::Flow(f) => &f.assets,
        }
    }

    /// Placement of `asset` when the container has geometry.
    pub fn bounding_box(&self, asset: &EmbeddedAsset) -> Option<Rect> {
        match self {
            Container::Page(_) => asset.bbox,
            Container::Flow(_) => None,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        match self {
            Container::Page(_) => SourceKind::Page,
            Container::Flow(_) => SourceKind::Flow,
        }
    }
}

impl From<PageContainer> for Container {
    fn from(p: PageContainer) -> Self {
        Container::Page(p)
    }
}

impl From<FlowContainer> for Container {
    fn from(f: FlowContainer) -> Self {
        Container::Flow(f)
    }
}

/// A parsed document: an ordered list of containers.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub containers: Vec<Container>,
}

impl Document {
    /// Containers are renumbered by position, so every container of the
    /// document has a distinct index.
    pub fn new(name: impl Into<String>, mut containers: Vec<Container>) -> Self {
        for (position, c) in containers.iter_mut().enumerate() {
            c.set_index(position);
        }
        Self {
            name: name.into(),
            containers,
        }
    }

    /// Text handed to the content-structuring oracle.
    pub fn full_text(&self) -> String {
        self.containers
            .iter()
            .map(Container::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Total number of embedded assets across all containers.
    pub fn asset_count(&self) -> usize {
        self.containers.iter().map(|c| c.assets().len()).sum()
    }

    /// A single flow container built from plain text; paragraphs are split
    /// at blank lines. Plain text carries no images.
    pub fn from_plain_text(name: impl Into<String>, text: &str) -> Self {
        let mut paragraphs = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    paragraphs.push(current.join("\n"));
                    current.clear();
                }
            } else {
                current.push(line);
            }
        }
        if !current.is_empty() {
            paragraphs.push(current.join("\n"));
        }
        Self::new(name, vec![FlowContainer::new(0, paragraphs).into()])
    }

    /// Load a document from disk: `.json` manifests and `.txt`/`.md` text.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Self::from_manifest_file(path),
            Some("txt") | Some("md") => {
                let text = std::fs::read_to_string(path).map_err(|e| DeckError::DocumentLoad {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                Ok(Self::from_plain_text(file_stem(path), &text))
            }
            _ => Err(DeckError::UnsupportedDocument {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Load a JSON manifest; asset paths resolve relative to its directory.
    pub fn from_manifest_file(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| DeckError::DocumentLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&raw).map_err(|e| DeckError::InvalidManifest {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = manifest.name.clone().unwrap_or_else(|| file_stem(path));
        Ok(manifest.into_document(name, &base))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

// ── Manifest (de)serialisation ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Manifest {
    name: Option<String>,
    containers: Vec<ManifestContainer>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ManifestContainer {
    Page {
        text: Option<String>,
        #[serde(default)]
        spans: Vec<TextSpan>,
        #[serde(default)]
        assets: Vec<ManifestAsset>,
    },
    Flow {
        paragraphs: Vec<String>,
        #[serde(default)]
        assets: Vec<ManifestAsset>,
    },
}

#[derive(Debug, Deserialize)]
struct ManifestAsset {
    path: PathBuf,
    format: Option<String>,
    bbox: Option<Rect>,
    anchor: Option<usize>,
}

impl Manifest {
    fn into_document(self, name: String, base: &Path) -> Document {
        let containers = self
            .containers
            .into_iter()
            .enumerate()
            .map(|(index, c)| match c {
                ManifestContainer::Page {
                    text,
                    spans,
                    assets,
                } => {
                    let text = text.unwrap_or_else(|| {
                        spans
                            .iter()
                            .map(|s| s.text.as_str())
                            .collect::<Vec<_>>()
                            .join("\n")
                    });
                    let mut page = PageContainer::new(index, text);
                    page.spans = spans;
                    for a in assets {
                        page = page.with_asset(a.load(base));
                    }
                    Container::Page(page)
                }
                ManifestContainer::Flow { paragraphs, assets } => {
                    let mut flow = FlowContainer::new(index, paragraphs);
                    for a in assets {
                        flow = flow.with_asset(a.load(base));
                    }
                    Container::Flow(flow)
                }
            })
            .collect();
        Document::new(name, containers)
    }
}

impl ManifestAsset {
    /// An unreadable asset file becomes an empty payload; the harvester
    /// then skips it like any other undecodable asset.
    fn load(self, base: &Path) -> EmbeddedAsset {
        let full = base.join(&self.path);
        let data: Vec<u8> = match std::fs::read(&full) {
            Ok(bytes) => {
                debug!("Loaded asset {} ({} bytes)", full.display(), bytes.len());
                bytes
            }
            Err(e) => {
                warn!("Cannot read asset {}: {}", full.display(), e);
                Vec::new()
            }
        };
        let declared = self.format.or_else(|| {
            self.path
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
        });

        let mut asset = EmbeddedAsset::new(data);
        asset.declared_format = declared;
        asset.bbox = self.bbox;
        asset.anchor = self.anchor;
        asset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn assets_get_sequential_ordinals() {
        let page = PageContainer::new(0, "text")
            .with_asset(EmbeddedAsset::new(vec![1u8]))
            .with_asset(EmbeddedAsset::new(vec![2u8]));
        let c = Container::from(page);
        let ordinals: Vec<usize> = c.assets().iter().map(|a| a.ordinal()).collect();
        assert_eq!(ordinals, vec![0, 1]);
    }

    #[test]
    fn document_renumbers_containers_by_position() {
        let doc = Document::new(
            "d",
            vec![
                PageContainer::new(0, "a").into(),
                PageContainer::new(0, "b").into(),
                FlowContainer::new(7, vec!["c".into()]).into(),
            ],
        );
        let indices: Vec<usize> = doc.containers.iter().map(Container::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn flow_containers_have_no_geometry() {
        let asset = EmbeddedAsset::new(vec![0u8]).with_bbox(Rect::new(0.0, 0.0, 1.0, 1.0));
        let flow = Container::from(FlowContainer::new(0, vec!["p".into()]).with_asset(asset));
        assert!(flow.bounding_box(&flow.assets()[0]).is_none());
        assert_eq!(flow.source_kind(), SourceKind::Flow);
    }

    #[test]
    fn plain_text_splits_paragraphs_at_blank_lines() {
        let doc = Document::from_plain_text("notes", "First line\nstill first\n\n\nSecond\n");
        match &doc.containers[0] {
            Container::Flow(f) => {
                assert_eq!(f.paragraphs(), &["First line\nstill first", "Second"]);
            }
            Container::Page(_) => panic!("expected flow container"),
        }
        assert_eq!(doc.asset_count(), 0);
    }

    #[test]
    fn rect_intersection_excludes_touching_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let err = Document::load("slides.pdf").unwrap_err();
        assert!(matches!(err, DeckError::UnsupportedDocument { .. }));
    }

    #[test]
    fn manifest_resolves_assets_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pic.png"), b"not really a png").unwrap();
        let manifest_path = dir.path().join("doc.json");
        let mut f = std::fs::File::create(&manifest_path).unwrap();
        write!(
            f,
            r#"{{
                "containers": [
                    {{ "kind": "page",
                       "spans": [{{ "text": "Hello", "bbox": {{ "x0": 0, "y0": 0, "x1": 10, "y1": 10 }} }}],
                       "assets": [{{ "path": "pic.png" }}, {{ "path": "missing.png" }}] }},
                    {{ "kind": "flow", "paragraphs": ["a", "b"] }}
                ]
            }}"#
        )
        .unwrap();

        let doc = Document::load(&manifest_path).unwrap();
        assert_eq!(doc.name, "doc");
        assert_eq!(doc.containers.len(), 2);
        assert_eq!(doc.containers[0].text(), "Hello");
        let assets = doc.containers[0].assets();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].declared_format(), Some("png"));
        assert_eq!(&assets[0].data()[..], b"not really a png");
        assert!(assets[1].data().is_empty());
        assert_eq!(doc.full_text(), "Hello\na\nb");
    }

    #[test]
    fn manifest_with_bad_json_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("doc.json");
        std::fs::write(&p, "{ not json").unwrap();
        let err = Document::load(&p).unwrap_err();
        assert!(matches!(err, DeckError::InvalidManifest { .. }));
    }
}
