//! Rendering backends.
//!
//! Three implementations of one per-row contract: take a normalized record,
//! a backend-specific layout, and an output path, and write one image
//! artifact. Dispatch over the backend tag lives in the generation
//! orchestrator and is exhaustive by construction.

pub mod canvas;
pub mod html;
pub mod svg;

pub use html::HtmlRenderer;
