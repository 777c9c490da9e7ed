///! Final Year Brethren card generation
///!
///! Turns tabular student records into per-row rendered image artifacts
///! through one of three interchangeable backends: procedural raster
///! drawing, HTML rendered in a headless browser, or vector markup with
///! placeholder substitution.

pub mod generator;
pub mod image_input;
pub mod logging;
pub mod record;
pub mod render;
pub mod roster;
pub mod template;

pub use generator::{GenerationRequest, GenerationSummary, Generator, OutputFormat};
pub use record::{ColumnMapping, StudentRecord};
