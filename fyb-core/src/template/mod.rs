///! Template catalogue
///!
///! Backend-tagged layout descriptors and the fixed registry of built-in
///! designs. Registry contents are defined once at process start; lookup by
///! name never fails the caller (unknown names fall back to the default
///! design).

mod builtin;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Name of the design returned for unknown lookups.
pub const DEFAULT_TEMPLATE: &str = "default";

/// Rendering backend discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Canvas,
    Html,
    Svg,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Canvas => "canvas",
            TemplateKind::Html => "html",
            TemplateKind::Svg => "svg",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "canvas" => Some(TemplateKind::Canvas),
            "html" => Some(TemplateKind::Html),
            "svg" => Some(TemplateKind::Svg),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named design with its backend-specific layout data.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateConfig {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub spec: TemplateSpec,
}

impl TemplateConfig {
    pub fn kind(&self) -> TemplateKind {
        match self.spec {
            TemplateSpec::Canvas(_) => TemplateKind::Canvas,
            TemplateSpec::Html(_) => TemplateKind::Html,
            TemplateSpec::Svg(_) => TemplateKind::Svg,
        }
    }

    pub fn width(&self) -> u32 {
        match &self.spec {
            TemplateSpec::Canvas(spec) => spec.width,
            TemplateSpec::Html(spec) => spec.capture.viewport_width,
            TemplateSpec::Svg(spec) => spec.width,
        }
    }

    pub fn height(&self) -> u32 {
        match &self.spec {
            TemplateSpec::Canvas(spec) => spec.height,
            TemplateSpec::Html(spec) => spec.capture.viewport_height,
            TemplateSpec::Svg(spec) => spec.height,
        }
    }
}

/// Backend-specific layout data. The tag is closed: render dispatch is an
/// exhaustive match over these three variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TemplateSpec {
    Canvas(CanvasTemplate),
    Html(HtmlTemplate),
    Svg(SvgTemplate),
}

/// Layout for the procedural raster backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasTemplate {
    pub width: u32,
    pub height: u32,
    pub background_color: String,
    pub photo: PhotoFrame,
    pub fields: Vec<FieldLayout>,
    pub decorations: Vec<Decoration>,
}

/// Photo placement and border for the canvas backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoFrame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub corner_radius: f32,
    pub border_width: f32,
    pub border_color: String,
}

/// One positioned text field on a canvas design.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLayout {
    pub key: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    pub bold: bool,
    pub color: String,
    pub align: TextAlign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<usize>,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Decorative primitive, painted in declaration order below the photo and
/// text fields.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Decoration {
    #[serde(rename_all = "camelCase")]
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: String,
    },
    #[serde(rename_all = "camelCase")]
    Circle {
        x: f32,
        y: f32,
        radius: f32,
        color: String,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        x: f32,
        y: f32,
        text: String,
        font_size: f32,
        color: String,
    },
}

/// Layout for the markup + screenshot backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlTemplate {
    pub template_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_override: Option<String>,
    pub capture: CaptureOptions,
    #[serde(skip)]
    pub fallback: &'static str,
}

/// Screenshot parameters for the markup backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device_scale_factor: f64,
    pub format: CaptureFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    pub full_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<ClipRect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    Png,
    Jpeg,
    Webp,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClipRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Layout for the vector markup backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SvgTemplate {
    pub width: u32,
    pub height: u32,
    pub template_path: String,
    pub placeholders: Vec<PlaceholderBinding>,
    #[serde(skip)]
    pub fallback: &'static str,
}

/// (target element, substitution kind, source field) triple consumed by the
/// vector backend.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceholderBinding {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PlaceholderKind,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderKind {
    Text,
    Image,
    Attr,
}

static REGISTRY: OnceLock<Vec<TemplateConfig>> = OnceLock::new();

fn registry() -> &'static [TemplateConfig] {
    REGISTRY.get_or_init(builtin::all)
}

/// Look up a design by name; unknown names resolve to the default design.
pub fn get(name: &str) -> &'static TemplateConfig {
    registry()
        .iter()
        .find(|t| t.name == name)
        .unwrap_or_else(|| {
            registry()
                .iter()
                .find(|t| t.name == DEFAULT_TEMPLATE)
                .expect("default template is always registered")
        })
}

/// Names of all registered designs, in registration order.
pub fn list() -> Vec<&'static str> {
    registry().iter().map(|t| t.name.as_str()).collect()
}

/// All designs using the given backend, in registration order.
pub fn list_by_kind(kind: TemplateKind) -> Vec<&'static TemplateConfig> {
    registry().iter().filter(|t| t.kind() == kind).collect()
}

/// All registered designs.
pub fn all() -> &'static [TemplateConfig] {
    registry()
}

/// Resolve a template document, trying the path as given, relative to the
/// working directory, and relative to the executable, before falling back to
/// the compiled-in default document.
pub async fn resolve_template_source(template_path: &str, fallback: &'static str) -> String {
    let mut candidates: Vec<PathBuf> = vec![PathBuf::from(template_path)];
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(template_path));
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join(template_path));
        }
    }

    for candidate in candidates {
        if !candidate.is_file() {
            continue;
        }
        match tokio::fs::read_to_string(&candidate).await {
            Ok(content) => {
                tracing::debug!("Loaded template from {}", candidate.display());
                return content;
            }
            Err(e) => {
                tracing::warn!("Failed to read template {}: {}", candidate.display(), e);
            }
        }
    }

    tracing::debug!("Using embedded template for '{}'", template_path);
    fallback.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_name_falls_back_to_default() {
        let fallback = get("nonexistent");
        let default = get(DEFAULT_TEMPLATE);
        assert_eq!(fallback.name, default.name);
        assert_eq!(
            serde_json::to_value(fallback).unwrap(),
            serde_json::to_value(default).unwrap()
        );
    }

    #[test]
    fn test_registry_contains_all_backends() {
        let names = list();
        assert!(names.contains(&"default"));
        assert!(names.contains(&"modern"));
        assert!(names.contains(&"minimal"));
        assert!(names.contains(&"glamour"));
        assert!(names.contains(&"badge"));

        assert_eq!(list_by_kind(TemplateKind::Canvas).len(), 2);
        assert_eq!(list_by_kind(TemplateKind::Html).len(), 2);
        assert_eq!(list_by_kind(TemplateKind::Svg).len(), 1);
    }

    #[test]
    fn test_kind_tag_serialization() {
        let badge = get("badge");
        let value = serde_json::to_value(badge).unwrap();
        assert_eq!(value["type"], "svg");
        assert_eq!(value["name"], "badge");
        assert!(value["placeholders"].is_array());
    }

    #[tokio::test]
    async fn test_missing_file_uses_embedded_fallback() {
        let source = resolve_template_source("templates/does/not/exist.hbs", "embedded").await;
        assert_eq!(source, "embedded");
    }
}
