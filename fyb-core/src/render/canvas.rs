///! Procedural raster renderer
///!
///! Draws the card directly onto a pixel buffer: background, decorative
///! primitives, a clipped and bordered photo region, and positioned
///! word-wrapped text fields.

use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use rusttype::{point, Font, Scale};
use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

use crate::record::StudentRecord;
use crate::template::{CanvasTemplate, Decoration, FieldLayout, PhotoFrame, TextAlign};

const LINE_HEIGHT_FACTOR: f32 = 1.2;
const PLACEHOLDER_BG: Rgba<u8> = Rgba([221, 221, 221, 255]);
const PLACEHOLDER_FG: Rgba<u8> = Rgba([153, 153, 153, 255]);
const PLACEHOLDER_TEXT: &str = "No Photo";
const PLACEHOLDER_FONT_SIZE: f32 = 16.0;
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Render one record onto a raster card and write it to `output_path`.
pub async fn render(
    record: &StudentRecord,
    template: &CanvasTemplate,
    output_path: &Path,
) -> Result<()> {
    let fonts = fonts()?;
    let background = parse_color(&template.background_color)
        .with_context(|| format!("Invalid background color '{}'", template.background_color))?;

    let mut canvas: RgbaImage =
        ImageBuffer::from_pixel(template.width, template.height, background);

    draw_decorations(&mut canvas, &template.decorations, fonts);
    draw_photo(&mut canvas, record, &template.photo, fonts);
    draw_fields(&mut canvas, record, &template.fields, fonts);

    let extension = output_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let encoded = encode_image(&canvas, &extension)?;
    tokio::fs::write(output_path, encoded)
        .await
        .with_context(|| format!("Failed to write image to {}", output_path.display()))?;
    Ok(())
}

/// Encode a pixel buffer for the given file extension (png unless the
/// extension says otherwise; JPEG drops the alpha channel).
pub(crate) fn encode_image(canvas: &RgbaImage, extension: &str) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    match extension {
        "jpeg" | "jpg" => {
            let rgb = image::DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
            rgb.write_to(&mut buffer, image::ImageFormat::Jpeg)
                .context("Failed to encode JPEG")?;
        }
        "webp" => {
            canvas
                .write_to(&mut buffer, image::ImageFormat::WebP)
                .context("Failed to encode WebP")?;
        }
        _ => {
            canvas
                .write_to(&mut buffer, image::ImageFormat::Png)
                .context("Failed to encode PNG")?;
        }
    }
    Ok(buffer.into_inner())
}

// ── fonts ────────────────────────────────────────────────────────────────

struct FontSet {
    regular: Font<'static>,
    bold: Option<Font<'static>>,
}

impl FontSet {
    fn for_weight(&self, bold: bool) -> &Font<'static> {
        if bold {
            self.bold.as_ref().unwrap_or(&self.regular)
        } else {
            &self.regular
        }
    }
}

fn fonts() -> Result<&'static FontSet> {
    static FONTS: OnceLock<Option<FontSet>> = OnceLock::new();
    FONTS
        .get_or_init(load_fonts)
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No usable font face found (looked in ./fonts and system fonts)"))
}

fn load_fonts() -> Option<FontSet> {
    let mut db = fontdb::Database::new();
    db.load_fonts_dir("fonts");
    db.load_system_fonts();
    tracing::debug!("Loaded {} font faces", db.len());

    let regular = query_face(&db, fontdb::Weight::NORMAL)?;
    let bold = query_face(&db, fontdb::Weight::BOLD);
    Some(FontSet { regular, bold })
}

fn query_face(db: &fontdb::Database, weight: fontdb::Weight) -> Option<Font<'static>> {
    let query = fontdb::Query {
        families: &[fontdb::Family::Name("Arial"), fontdb::Family::SansSerif],
        weight,
        ..fontdb::Query::default()
    };
    let id = db.query(&query)?;
    let (source, index) = db.face_source(id)?;
    let data = match source {
        fontdb::Source::Binary(data) => data.as_ref().as_ref().to_vec(),
        fontdb::Source::File(path) => std::fs::read(path).ok()?,
        fontdb::Source::SharedFile(path, _) => std::fs::read(path).ok()?,
    };
    Font::try_from_vec_and_index(data, index)
}

// ── drawing layers ───────────────────────────────────────────────────────

fn draw_decorations(canvas: &mut RgbaImage, decorations: &[Decoration], fonts: &FontSet) {
    for decoration in decorations {
        match decoration {
            Decoration::Rectangle { x, y, width, height, color } => {
                fill_rect(canvas, *x, *y, *width, *height, color_or(color, BLACK));
            }
            Decoration::Circle { x, y, radius, color } => {
                fill_circle(canvas, *x, *y, *radius, color_or(color, BLACK));
            }
            Decoration::Text { x, y, text, font_size, color } => {
                draw_text(canvas, &fonts.regular, *font_size, *x, *y, color_or(color, BLACK), text);
            }
        }
    }
}

fn draw_photo(canvas: &mut RgbaImage, record: &StudentRecord, frame: &PhotoFrame, fonts: &FontSet) {
    // legacy sheets carry the path under a bare `photo` column
    let photo_path = if !record.photo_path.is_empty() {
        record.photo_path.clone()
    } else {
        record.extra.get("photo").cloned().unwrap_or_default()
    };

    if photo_path.is_empty() || !Path::new(&photo_path).is_file() {
        if !photo_path.is_empty() {
            tracing::warn!("Photo not found for '{}': {}", record.name, photo_path);
        }
        draw_photo_placeholder(canvas, frame, fonts);
        return;
    }

    match image::open(&photo_path) {
        Ok(photo) => {
            let resized = image::imageops::resize(
                &photo.to_rgba8(),
                frame.width as u32,
                frame.height as u32,
                image::imageops::FilterType::Lanczos3,
            );
            overlay_rounded(canvas, &resized, frame);
            stroke_photo_border(canvas, frame);
        }
        Err(e) => {
            tracing::warn!("Could not load photo {}: {}", photo_path, e);
            draw_photo_placeholder(canvas, frame, fonts);
        }
    }
}

fn draw_photo_placeholder(canvas: &mut RgbaImage, frame: &PhotoFrame, fonts: &FontSet) {
    fill_rounded_rect(canvas, frame, PLACEHOLDER_BG);

    let center_x = frame.x + frame.width / 2.0;
    let center_y = frame.y + frame.height / 2.0;
    let text_x = center_x - text_width(&fonts.regular, PLACEHOLDER_FONT_SIZE, PLACEHOLDER_TEXT) / 2.0;
    draw_text(
        canvas,
        &fonts.regular,
        PLACEHOLDER_FONT_SIZE,
        text_x,
        center_y,
        PLACEHOLDER_FG,
        PLACEHOLDER_TEXT,
    );

    stroke_photo_border(canvas, frame);
}

fn stroke_photo_border(canvas: &mut RgbaImage, frame: &PhotoFrame) {
    if frame.border_width <= 0.0 {
        return;
    }
    let color = color_or(&frame.border_color, BLACK);
    let x0 = frame.x.max(0.0) as i32;
    let y0 = frame.y.max(0.0) as i32;
    let x1 = ((frame.x + frame.width) as i32).min(canvas.width() as i32);
    let y1 = ((frame.y + frame.height) as i32).min(canvas.height() as i32);
    let w = frame.width as i32;
    let h = frame.height as i32;
    let r = frame.corner_radius as i32;
    let bw = frame.border_width as i32;
    let inner_r = (r - bw).max(0);

    for py in y0..y1 {
        for px in x0..x1 {
            let lx = px - frame.x as i32;
            let ly = py - frame.y as i32;
            let in_outer = rounded_rect_contains(lx, ly, w, h, r);
            let in_inner = rounded_rect_contains(lx - bw, ly - bw, w - 2 * bw, h - 2 * bw, inner_r);
            if in_outer && !in_inner {
                canvas.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

fn draw_fields(canvas: &mut RgbaImage, record: &StudentRecord, fields: &[FieldLayout], fonts: &FontSet) {
    for field in fields {
        let value = record.field(&field.key).unwrap_or("");
        if value.is_empty() {
            if field.required {
                tracing::warn!(
                    "Required field '{}' is missing for student '{}'",
                    field.key,
                    record.name
                );
            }
            continue;
        }

        let font = fonts.for_weight(field.bold);
        let color = color_or(&field.color, BLACK);
        let text = format!("{}: {}", field.label, value);
        let lines = wrap_text(&text, field.width, |line| {
            text_width(font, field.font_size, line)
        });
        let max_lines = field.max_lines.unwrap_or(lines.len());
        let line_height = field.font_size * LINE_HEIGHT_FACTOR;

        for (index, line) in lines.iter().take(max_lines).enumerate() {
            let y = field.y + index as f32 * line_height;
            let x = match field.align {
                TextAlign::Left => field.x,
                TextAlign::Center => {
                    field.x + (field.width - text_width(font, field.font_size, line)) / 2.0
                }
                TextAlign::Right => field.x + field.width - text_width(font, field.font_size, line),
            };
            draw_text(canvas, font, field.font_size, x, y, color, line);
        }
    }
}

// ── primitives ───────────────────────────────────────────────────────────

fn fill_rect(canvas: &mut RgbaImage, x: f32, y: f32, width: f32, height: f32, color: Rgba<u8>) {
    let x0 = x.max(0.0) as u32;
    let y0 = y.max(0.0) as u32;
    let x1 = ((x + width).max(0.0) as u32).min(canvas.width());
    let y1 = ((y + height).max(0.0) as u32).min(canvas.height());
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px, py, color);
        }
    }
}

fn fill_circle(canvas: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: Rgba<u8>) {
    let x0 = ((cx - radius).max(0.0)) as u32;
    let y0 = ((cy - radius).max(0.0)) as u32;
    let x1 = (((cx + radius) + 1.0).max(0.0) as u32).min(canvas.width());
    let y1 = (((cy + radius) + 1.0).max(0.0) as u32).min(canvas.height());
    for py in y0..y1 {
        for px in x0..x1 {
            let dx = px as f32 + 0.5 - cx;
            let dy = py as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= radius * radius {
                canvas.put_pixel(px, py, color);
            }
        }
    }
}

fn fill_rounded_rect(canvas: &mut RgbaImage, frame: &PhotoFrame, color: Rgba<u8>) {
    let x0 = frame.x.max(0.0) as i32;
    let y0 = frame.y.max(0.0) as i32;
    let x1 = ((frame.x + frame.width) as i32).min(canvas.width() as i32);
    let y1 = ((frame.y + frame.height) as i32).min(canvas.height() as i32);
    for py in y0..y1 {
        for px in x0..x1 {
            let lx = px - frame.x as i32;
            let ly = py - frame.y as i32;
            if rounded_rect_contains(lx, ly, frame.width as i32, frame.height as i32, frame.corner_radius as i32) {
                canvas.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

fn overlay_rounded(canvas: &mut RgbaImage, photo: &RgbaImage, frame: &PhotoFrame) {
    let w = frame.width as i32;
    let h = frame.height as i32;
    let r = frame.corner_radius as i32;
    for ly in 0..h {
        for lx in 0..w {
            if !rounded_rect_contains(lx, ly, w, h, r) {
                continue;
            }
            let px = frame.x as i32 + lx;
            let py = frame.y as i32 + ly;
            if px < 0 || py < 0 || px >= canvas.width() as i32 || py >= canvas.height() as i32 {
                continue;
            }
            if lx >= photo.width() as i32 || ly >= photo.height() as i32 {
                continue;
            }
            let source = photo.get_pixel(lx as u32, ly as u32);
            blend_pixel(canvas, px, py, *source, source.0[3] as f32 / 255.0);
        }
    }
}

fn rounded_rect_contains(x: i32, y: i32, w: i32, h: i32, r: i32) -> bool {
    if x < 0 || y < 0 || x >= w || y >= h {
        return false;
    }
    if r <= 0 {
        return true;
    }
    if x >= r && x < w - r {
        return true;
    }
    if y >= r && y < h - r {
        return true;
    }
    let (cx, cy) = if x < r {
        if y < r { (r - 1, r - 1) } else { (r - 1, h - r) }
    } else if y < r {
        (w - r, r - 1)
    } else {
        (w - r, h - r)
    };
    let dx = x - cx;
    let dy = y - cy;
    dx * dx + dy * dy <= r * r
}

fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, alpha: f32) {
    if alpha <= 0.0 || x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= canvas.width() || y >= canvas.height() {
        return;
    }
    let dst = canvas.get_pixel_mut(x, y);
    let inv = 1.0 - alpha;
    dst.0[0] = (color.0[0] as f32 * alpha + dst.0[0] as f32 * inv) as u8;
    dst.0[1] = (color.0[1] as f32 * alpha + dst.0[1] as f32 * inv) as u8;
    dst.0[2] = (color.0[2] as f32 * alpha + dst.0[2] as f32 * inv) as u8;
    dst.0[3] = 255;
}

// ── text ─────────────────────────────────────────────────────────────────

fn text_width(font: &Font<'static>, px: f32, text: &str) -> f32 {
    let scale = Scale::uniform(px);
    font.layout(text, scale, point(0.0, 0.0))
        .map(|glyph| glyph.unpositioned().h_metrics().advance_width)
        .sum()
}

/// Draw a single line with its alphabetic baseline at `baseline_y`.
fn draw_text(
    canvas: &mut RgbaImage,
    font: &Font<'static>,
    px: f32,
    x: f32,
    baseline_y: f32,
    color: Rgba<u8>,
    text: &str,
) {
    let scale = Scale::uniform(px);
    for glyph in font.layout(text, scale, point(x, baseline_y)) {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, coverage| {
                blend_pixel(canvas, gx as i32 + bb.min.x, gy as i32 + bb.min.y, color, coverage);
            });
        }
    }
}

/// Greedy word wrap against a measured pixel width. A single word wider than
/// the limit still occupies its own line.
fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if measure(&candidate) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ── colors ───────────────────────────────────────────────────────────────

fn parse_color(value: &str) -> Result<Rgba<u8>> {
    let hex = value.trim().trim_start_matches('#');
    let (r, g, b) = match hex.len() {
        3 => {
            let digit = |i: usize| -> Result<u8> {
                let d = u8::from_str_radix(&hex[i..i + 1], 16)
                    .with_context(|| format!("Invalid color: {}", value))?;
                Ok(d * 17)
            };
            (digit(0)?, digit(1)?, digit(2)?)
        }
        6 => {
            let pair = |i: usize| -> Result<u8> {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .with_context(|| format!("Invalid color: {}", value))
            };
            (pair(0)?, pair(2)?, pair(4)?)
        }
        _ => anyhow::bail!("Invalid color: {}", value),
    };
    Ok(Rgba([r, g, b, 255]))
}

fn color_or(value: &str, fallback: Rgba<u8>) -> Rgba<u8> {
    match parse_color(value) {
        Ok(color) => color,
        Err(_) => {
            tracing::warn!("Invalid color '{}', using fallback", value);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_breaks_on_measured_width() {
        let measure = |s: &str| s.chars().count() as f32 * 10.0;
        let lines = wrap_text("aaa bbb ccc ddd", 100.0, measure);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn test_wrap_text_keeps_overlong_word_on_one_line() {
        let measure = |s: &str| s.chars().count() as f32 * 10.0;
        let lines = wrap_text("supercalifragilistic ok", 100.0, measure);
        assert_eq!(lines, vec!["supercalifragilistic", "ok"]);
    }

    #[test]
    fn test_wrap_text_single_short_line() {
        let measure = |s: &str| s.chars().count() as f32 * 10.0;
        assert_eq!(wrap_text("hi there", 100.0, measure), vec!["hi there"]);
    }

    #[test]
    fn test_parse_color_six_digit() {
        assert_eq!(parse_color("#2c3e50").unwrap(), Rgba([0x2c, 0x3e, 0x50, 255]));
        assert_eq!(parse_color("#ffffff").unwrap(), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_parse_color_three_digit() {
        assert_eq!(parse_color("#333").unwrap(), Rgba([0x33, 0x33, 0x33, 255]));
        assert_eq!(parse_color("#f0a").unwrap(), Rgba([0xff, 0x00, 0xaa, 255]));
    }

    #[test]
    fn test_parse_color_rejects_garbage() {
        assert!(parse_color("red").is_err());
        assert!(parse_color("#12345").is_err());
    }

    #[test]
    fn test_rounded_rect_contains_cuts_corners() {
        // inside the body
        assert!(rounded_rect_contains(50, 50, 100, 100, 10));
        // the very corner pixel is outside the rounding
        assert!(!rounded_rect_contains(0, 0, 100, 100, 10));
        // on-axis edges are inside
        assert!(rounded_rect_contains(50, 0, 100, 100, 10));
        assert!(rounded_rect_contains(0, 50, 100, 100, 10));
        // out of bounds
        assert!(!rounded_rect_contains(-1, 50, 100, 100, 10));
        assert!(!rounded_rect_contains(100, 50, 100, 100, 10));
    }

    #[test]
    fn test_encode_image_png_signature() {
        let canvas: RgbaImage = ImageBuffer::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let bytes = encode_image(&canvas, "png").unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }

    #[test]
    fn test_encode_image_jpeg_signature() {
        let canvas: RgbaImage = ImageBuffer::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let bytes = encode_image(&canvas, "jpg").unwrap();
        assert_eq!(&bytes[..2], &[0xff, 0xd8]);
    }
}
