///! Vector markup renderer
///!
///! Applies ID-addressed placeholder substitutions to an SVG template and
///! writes the document verbatim or rasterized, depending on the requested
///! output extension. The document is parsed to locate target elements and
///! mutations are applied as byte-range splices into the source text, so
///! untouched markup survives byte-for-byte.

use anyhow::{Context, Result};
use std::ops::Range;
use std::path::Path;

use crate::image_input::resolve_image_input;
use crate::record::StudentRecord;
use crate::template::{self, PlaceholderBinding, PlaceholderKind, SvgTemplate};

/// Render one record through the vector template and write the result to
/// `output_path`.
pub async fn render(
    record: &StudentRecord,
    template: &SvgTemplate,
    output_path: &Path,
) -> Result<()> {
    let mut working = record.clone();

    let input = [&record.photo_path, &record.photo_url, &record.photo_base64]
        .into_iter()
        .find(|value| !value.is_empty())
        .map(String::as_str);
    if let Some(resolved) = resolve_image_input(input).await {
        working.photo_url = resolved;
    }

    let source =
        template::resolve_template_source(&template.template_path, template.fallback).await;
    let document = apply_placeholders(&source, &working, &template.placeholders)?;

    let extension = output_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if extension == "svg" {
        tokio::fs::write(output_path, document.as_bytes())
            .await
            .with_context(|| format!("Failed to write SVG to {}", output_path.display()))?;
    } else {
        let pixmap = rasterize(&document)?;
        write_pixmap(pixmap, &extension, output_path).await?;
    }

    Ok(())
}

/// Apply every placeholder binding to the document. Bindings whose target
/// element is absent, or whose source field is empty, are skipped.
fn apply_placeholders(
    source: &str,
    record: &StudentRecord,
    placeholders: &[PlaceholderBinding],
) -> Result<String> {
    let document = roxmltree::Document::parse(source).context("Failed to parse vector template")?;

    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    for binding in placeholders {
        let Some(node) = document
            .descendants()
            .find(|n| n.attribute("id") == Some(binding.id.as_str()))
        else {
            tracing::debug!("Placeholder target '{}' not found in template", binding.id);
            continue;
        };

        let value = record.field(&binding.field).unwrap_or("");
        if value.is_empty() {
            continue;
        }

        match binding.kind {
            PlaceholderKind::Text => edits.push(text_edit(source, node, value)),
            PlaceholderKind::Image => {
                edits.push(attribute_edit(source, node, "href", value));
                // older consumers still read the namespaced alias
                edits.push(attribute_edit(source, node, "xlink:href", value));
            }
            PlaceholderKind::Attr => {
                if let Some(attribute) = &binding.attribute {
                    edits.push(attribute_edit(source, node, attribute, value));
                }
            }
        }
    }

    // apply back-to-front so earlier byte offsets stay valid; when two
    // bindings claim the same span, the first one wins
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut output = source.to_string();
    let mut applied_start = source.len() + 1;
    for (range, replacement) in edits {
        if range.end > applied_start {
            continue;
        }
        applied_start = range.start;
        output.replace_range(range, &replacement);
    }

    Ok(output)
}

/// Replace the element's inner content with escaped text.
fn text_edit(source: &str, node: roxmltree::Node, value: &str) -> (Range<usize>, String) {
    if let (Some(first), Some(last)) = (node.first_child(), node.last_child()) {
        return (first.range().start..last.range().end, escape_xml(value));
    }

    // empty element: <t/> is rebuilt, <t></t> gets the text inserted
    let range = node.range();
    let element = &source[range.clone()];
    if let Some(stripped) = element.strip_suffix("/>") {
        let rebuilt = format!(
            "{}>{}</{}>",
            stripped.trim_end(),
            escape_xml(value),
            node.tag_name().name()
        );
        (range, rebuilt)
    } else if let Some(close) = element.rfind("</") {
        let position = range.start + close;
        (position..position, escape_xml(value))
    } else {
        (range.end..range.end, escape_xml(value))
    }
}

/// Replace an existing attribute in place, or insert it right after the tag
/// name. Matching considers the source spelling so namespaced names like
/// `xlink:href` resolve.
fn attribute_edit(
    source: &str,
    node: roxmltree::Node,
    name: &str,
    value: &str,
) -> (Range<usize>, String) {
    for attribute in node.attributes() {
        let spelled = attribute_spelling(source, attribute.range());
        if spelled == name || attribute.name() == name {
            return (
                attribute.range(),
                format!("{}=\"{}\"", spelled, escape_xml(value)),
            );
        }
    }

    let range = node.range();
    let position = range.start + 1 + node.tag_name().name().len();
    (position..position, format!(" {}=\"{}\"", name, escape_xml(value)))
}

fn attribute_spelling(source: &str, range: Range<usize>) -> &str {
    let raw = &source[range];
    raw.split('=').next().unwrap_or(raw).trim()
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Rasterize the SVG document into a pixmap.
fn rasterize(svg_content: &str) -> Result<resvg::tiny_skia::Pixmap> {
    use resvg::tiny_skia;
    use resvg::usvg::{fontdb, Options, Tree};

    let mut fontdb = fontdb::Database::new();
    fontdb.load_fonts_dir("fonts");
    fontdb.load_system_fonts();
    tracing::debug!("Loaded {} font faces for rasterization", fontdb.len());

    let mut options = Options::default();
    options.font_family = "Arial".to_string();
    options.fontdb = std::sync::Arc::new(fontdb);

    let tree = Tree::from_str(svg_content, &options).context("Failed to parse SVG")?;

    let size = tree.size();
    let width = size.width() as u32;
    let height = size.height() as u32;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).context("Failed to create pixmap")?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    Ok(pixmap)
}

async fn write_pixmap(
    pixmap: resvg::tiny_skia::Pixmap,
    extension: &str,
    output_path: &Path,
) -> Result<()> {
    if extension.is_empty() || extension == "png" {
        pixmap
            .save_png(output_path)
            .context("Failed to save PNG")?;
        return Ok(());
    }

    let width = pixmap.width();
    let height = pixmap.height();
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    let canvas =
        image::RgbaImage::from_raw(width, height, rgba).context("Pixmap dimensions out of range")?;

    let encoded = super::canvas::encode_image(&canvas, extension)?;
    tokio::fs::write(output_path, encoded)
        .await
        .with_context(|| format!("Failed to write image to {}", output_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="400" height="500">
  <text id="student-name" x="200" y="55">Student Name</text>
  <text id="student-department" x="200" y="325">Department</text>
  <image id="student-photo" x="130" y="115" width="140" height="170" href="" xlink:href=""/>
  <rect id="accent" x="0" y="0" width="10" height="10" fill="#000"/>
</svg>"##;

    fn binding(id: &str, kind: PlaceholderKind, field: &str) -> PlaceholderBinding {
        PlaceholderBinding {
            id: id.to_string(),
            kind,
            field: field.to_string(),
            attribute: None,
        }
    }

    #[test]
    fn test_text_substitution_touches_only_target() {
        let mut record = StudentRecord::default();
        record.name = "Ada Lovelace".to_string();

        let bindings = vec![binding("student-name", PlaceholderKind::Text, "name")];
        let output = apply_placeholders(TEMPLATE, &record, &bindings).unwrap();

        assert_eq!(
            output,
            TEMPLATE.replace(">Student Name<", ">Ada Lovelace<")
        );
    }

    #[test]
    fn test_text_substitution_escapes_markup() {
        let mut record = StudentRecord::default();
        record.name = "Ada & Co <3".to_string();

        let bindings = vec![binding("student-name", PlaceholderKind::Text, "name")];
        let output = apply_placeholders(TEMPLATE, &record, &bindings).unwrap();

        assert!(output.contains(">Ada &amp; Co &lt;3<"));
    }

    #[test]
    fn test_image_substitution_sets_both_reference_attributes() {
        let mut record = StudentRecord::default();
        record.photo_url = "data:image/png;base64,AAA".to_string();

        let bindings = vec![binding("student-photo", PlaceholderKind::Image, "photoUrl")];
        let output = apply_placeholders(TEMPLATE, &record, &bindings).unwrap();

        assert!(output.contains(r#"href="data:image/png;base64,AAA""#));
        assert!(output.contains(r#"xlink:href="data:image/png;base64,AAA""#));
        // the text placeholders are untouched
        assert!(output.contains(">Student Name<"));
    }

    #[test]
    fn test_attr_substitution_sets_named_attribute() {
        let mut record = StudentRecord::default();
        record.extra.insert("accentColor".to_string(), "#ff6b6b".to_string());

        let bindings = vec![PlaceholderBinding {
            id: "accent".to_string(),
            kind: PlaceholderKind::Attr,
            field: "accentColor".to_string(),
            attribute: Some("fill".to_string()),
        }];
        let output = apply_placeholders(TEMPLATE, &record, &bindings).unwrap();

        assert!(output.contains(r##"<rect id="accent" x="0" y="0" width="10" height="10" fill="#ff6b6b"/>"##));
    }

    #[test]
    fn test_missing_target_and_empty_value_are_skipped() {
        let mut record = StudentRecord::default();
        record.name = "Ada".to_string();

        let bindings = vec![
            binding("no-such-id", PlaceholderKind::Text, "name"),
            // department is empty, so its binding is a no-op
            binding("student-department", PlaceholderKind::Text, "department"),
        ];
        let output = apply_placeholders(TEMPLATE, &record, &bindings).unwrap();
        assert_eq!(output, TEMPLATE);
    }

    #[test]
    fn test_text_substitution_into_empty_element() {
        let source = r#"<svg xmlns="http://www.w3.org/2000/svg"><text id="slot" x="1" y="2"/></svg>"#;
        let mut record = StudentRecord::default();
        record.name = "Ada".to_string();

        let bindings = vec![binding("slot", PlaceholderKind::Text, "name")];
        let output = apply_placeholders(source, &record, &bindings).unwrap();

        assert!(output.contains(r#"<text id="slot" x="1" y="2">Ada</text>"#));
    }

    #[test]
    fn test_attr_insertion_when_attribute_absent() {
        let source = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="slot" width="10" height="10"/></svg>"#;
        let mut record = StudentRecord::default();
        record.extra.insert("tone".to_string(), "#123456".to_string());

        let bindings = vec![PlaceholderBinding {
            id: "slot".to_string(),
            kind: PlaceholderKind::Attr,
            field: "tone".to_string(),
            attribute: Some("fill".to_string()),
        }];
        let output = apply_placeholders(source, &record, &bindings).unwrap();

        assert!(output.contains(r##"<rect fill="#123456" id="slot" width="10" height="10"/>"##));
    }

    #[test]
    fn test_multiple_bindings_apply_in_one_pass() {
        let mut record = StudentRecord::default();
        record.name = "Ada".to_string();
        record.department = "Mathematics".to_string();

        let bindings = vec![
            binding("student-name", PlaceholderKind::Text, "name"),
            binding("student-department", PlaceholderKind::Text, "department"),
        ];
        let output = apply_placeholders(TEMPLATE, &record, &bindings).unwrap();

        assert!(output.contains(">Ada<"));
        assert!(output.contains(">Mathematics<"));
    }
}
