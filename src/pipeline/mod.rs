//! Pipeline stages for document-to-deck generation.
//!
//! Each submodule implements one step and is testable on its own; only
//! [`oracle`] talks to the network.
//!
//! ## Data Flow
//!
//! ```text
//! document ──▶ harvest ──▶ oracle ──▶ matcher ──▶ layout ──▶ persist
//!  (assets)    (pool)     (outline)  (assign)    (EMU)      (JSON)
//! ```
//!
//! 1. [`harvest`]: probe, filter and store embedded assets; attaches
//!    [`context`] text to each retained image
//! 2. [`oracle`]:  turn document text into a validated slide outline
//! 3. [`matcher`]: give each slide at most one unused image, scored with
//!    [`similarity`]
//! 4. [`layout`]:  place text and pictures on each slide
//! 5. [`persist`]: write the deck atomically

pub mod context;
pub mod harvest;
pub mod layout;
pub mod matcher;
pub mod oracle;
pub mod persist;
pub mod similarity;
