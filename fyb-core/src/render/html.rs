///! Markup + screenshot renderer
///!
///! Interpolates a page template with the record, loads it in a shared
///! headless browser, and captures a per-row screenshot. One browser
///! instance is lazily started and reused across rows; a fresh tab is opened
///! and closed per row so page state cannot leak between rows.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::image_input::resolve_image_input;
use crate::record::StudentRecord;
use crate::template::{self, CaptureFormat, HtmlTemplate};

// The browser window is sized once at launch; per-template dimensions are
// applied through the capture clip.
const WINDOW_SIZE: (u32, u32) = (1920, 1200);

pub struct HtmlRenderer {
    browser: Mutex<Option<Browser>>,
    handlebars: Handlebars<'static>,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self {
            browser: Mutex::new(None),
            handlebars: Handlebars::new(),
        }
    }

    /// Render one record through the page template and write the screenshot
    /// to `output_path`.
    pub async fn render(
        &self,
        record: &StudentRecord,
        template: &HtmlTemplate,
        output_path: &Path,
    ) -> Result<()> {
        let document = self.build_document(record, template).await?;

        // No way to hand the browser a document directly, so round-trip
        // through a temp file and a file:// navigation.
        let page_path = std::env::temp_dir().join(format!("fyb_page_{}.html", Uuid::now_v7()));
        tokio::fs::write(&page_path, &document)
            .await
            .context("Failed to write interim page file")?;

        let result = self.capture(template, &page_path, output_path).await;

        if let Err(e) = tokio::fs::remove_file(&page_path).await {
            tracing::warn!("Failed to remove interim page {}: {}", page_path.display(), e);
        }

        result
    }

    /// Start the shared browser if it is not already running. A failure
    /// here is a resource error, not a per-row error.
    pub fn ensure_started(&self) -> Result<()> {
        self.browser().map(|_| ())
    }

    /// Close the shared browser. Safe to call more than once; the next
    /// render after a shutdown starts a fresh instance.
    pub fn shutdown(&self) {
        let mut guard = self.browser.lock().expect("browser handle poisoned");
        if guard.take().is_some() {
            tracing::info!("Closed headless browser");
        }
    }

    fn browser(&self) -> Result<Browser> {
        let mut guard = self.browser.lock().expect("browser handle poisoned");
        if guard.is_none() {
            tracing::info!("Starting headless browser");
            let launch_options = LaunchOptions {
                headless: true,
                sandbox: false,
                window_size: Some(WINDOW_SIZE),
                ..Default::default()
            };
            let browser =
                Browser::new(launch_options).context("Failed to launch headless browser")?;
            *guard = Some(browser);
        }
        Ok(guard.as_ref().expect("browser just initialized").clone())
    }

    async fn build_document(
        &self,
        record: &StudentRecord,
        template: &HtmlTemplate,
    ) -> Result<String> {
        let working = merge_photo(record).await;

        let source =
            template::resolve_template_source(&template.template_path, template.fallback).await;
        let source = match &template.style_override {
            Some(css) => inject_style(&source, css),
            None => source,
        };

        render_markup(&self.handlebars, &source, &working)
    }

    async fn capture(
        &self,
        template: &HtmlTemplate,
        page_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        let browser = self.browser()?;
        let tab = browser.new_tab().context("Failed to open page")?;

        let result = self
            .capture_on_tab(&tab, template, page_path, output_path)
            .await;

        if let Err(e) = tab.close(true) {
            tracing::warn!("Failed to close page: {}", e);
        }

        result
    }

    async fn capture_on_tab(
        &self,
        tab: &Arc<Tab>,
        template: &HtmlTemplate,
        page_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        let capture = &template.capture;

        let url = format!("file://{}", page_path.display());
        tab.navigate_to(&url).context("Failed to load page content")?;
        tab.wait_until_navigated()
            .context("Failed to wait for page load")?;

        if let Some(delay_ms) = capture.delay_ms {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if let Some(selector) = &capture.wait_for_selector {
            tab.wait_for_element(selector)
                .with_context(|| format!("Timed out waiting for selector '{}'", selector))?;
        }

        let format = match capture.format {
            CaptureFormat::Png => Page::CaptureScreenshotFormatOption::Png,
            CaptureFormat::Jpeg => Page::CaptureScreenshotFormatOption::Jpeg,
            CaptureFormat::Webp => Page::CaptureScreenshotFormatOption::Webp,
        };
        // quality only applies to JPEG captures
        let quality = match capture.format {
            CaptureFormat::Jpeg => capture.quality,
            _ => None,
        };
        let clip = if let Some(clip) = &capture.clip {
            Some(Page::Viewport {
                x: clip.x,
                y: clip.y,
                width: clip.width,
                height: clip.height,
                scale: capture.device_scale_factor,
            })
        } else if capture.full_page {
            None
        } else {
            Some(Page::Viewport {
                x: 0.0,
                y: 0.0,
                width: capture.viewport_width as f64,
                height: capture.viewport_height as f64,
                scale: capture.device_scale_factor,
            })
        };

        let screenshot = tab
            .capture_screenshot(format, quality, clip, true)
            .context("Failed to capture screenshot")?;

        tokio::fs::write(output_path, &screenshot)
            .await
            .with_context(|| format!("Failed to write screenshot to {}", output_path.display()))?;

        Ok(())
    }
}

/// Produce the renderer-local record copy with the photo resolved for page
/// interpolation: inline data lands in `photo_base64` (bare payload), any
/// other resolved reference lands in `photo_url`.
async fn merge_photo(record: &StudentRecord) -> StudentRecord {
    let mut working = record.clone();

    let input = [&record.photo_path, &record.photo_url, &record.photo_base64]
        .into_iter()
        .find(|value| !value.is_empty())
        .map(String::as_str);

    if let Some(resolved) = resolve_image_input(input).await {
        if resolved.starts_with("data:") {
            // a still-set photo_url keeps precedence in the template
            working.photo_base64 = resolved
                .split_once(',')
                .map(|(_, payload)| payload.to_string())
                .unwrap_or(resolved);
        } else {
            working.photo_url = resolved;
        }
    }

    working
}

fn render_markup(
    handlebars: &Handlebars<'static>,
    source: &str,
    record: &StudentRecord,
) -> Result<String> {
    handlebars
        .render_template(source, record)
        .context("Failed to interpolate page template")
}

fn inject_style(document: &str, css: &str) -> String {
    let style = format!("<style>{}</style>", css);
    match document.find("</head>") {
        Some(position) => format!("{}{}{}", &document[..position], style, &document[position..]),
        None => format!("{}{}", style, document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTO_TEMPLATE: &str = "{{#if photoUrl}}<img src=\"{{photoUrl}}\">{{else}}{{#if photoBase64}}<img src=\"data:image/jpeg;base64,{{photoBase64}}\">{{else}}<div>No Photo</div>{{/if}}{{/if}}";

    #[test]
    fn test_markup_prefers_photo_url() {
        let handlebars = Handlebars::new();
        let mut record = StudentRecord::default();
        record.photo_url = "https://example.com/ada.jpg".to_string();
        record.photo_base64 = "AAAA".to_string();

        let html = render_markup(&handlebars, PHOTO_TEMPLATE, &record).unwrap();
        assert_eq!(html, "<img src=\"https://example.com/ada.jpg\">");
    }

    #[test]
    fn test_markup_falls_back_to_base64() {
        let handlebars = Handlebars::new();
        let mut record = StudentRecord::default();
        record.photo_base64 = "AAAA".to_string();

        let html = render_markup(&handlebars, PHOTO_TEMPLATE, &record).unwrap();
        assert_eq!(html, "<img src=\"data:image/jpeg;base64,AAAA\">");
    }

    #[test]
    fn test_markup_placeholder_without_photo() {
        let handlebars = Handlebars::new();
        let record = StudentRecord::default();

        let html = render_markup(&handlebars, PHOTO_TEMPLATE, &record).unwrap();
        assert_eq!(html, "<div>No Photo</div>");
    }

    #[test]
    fn test_markup_interpolates_extras() {
        let handlebars = Handlebars::new();
        let mut record = StudentRecord::default();
        record.name = "Ada Lovelace".to_string();
        record
            .extra
            .insert("Matric Number".to_string(), "2019/12345".to_string());

        let html = render_markup(
            &handlebars,
            "<h1>{{name}}</h1><p>{{[Matric Number]}}</p>",
            &record,
        )
        .unwrap();
        assert_eq!(html, "<h1>Ada Lovelace</h1><p>2019/12345</p>");
    }

    #[tokio::test]
    async fn test_merge_photo_splits_data_uri() {
        let mut record = StudentRecord::default();
        record.photo_path = "data:image/png;base64,iVBOR".to_string();

        let working = merge_photo(&record).await;
        assert_eq!(working.photo_base64, "iVBOR");
        assert_eq!(working.photo_url, "");
    }

    #[tokio::test]
    async fn test_merge_photo_missing_input_is_noop() {
        let record = StudentRecord::default();
        let working = merge_photo(&record).await;
        assert_eq!(working.photo_base64, "");
        assert_eq!(working.photo_url, "");
    }

    #[test]
    fn test_inject_style_before_head_close() {
        let document = "<html><head><title>x</title></head><body></body></html>";
        let injected = inject_style(document, "body { color: red; }");
        assert_eq!(
            injected,
            "<html><head><title>x</title><style>body { color: red; }</style></head><body></body></html>"
        );
    }

    #[test]
    fn test_inject_style_without_head() {
        let injected = inject_style("<div></div>", "p {}");
        assert_eq!(injected, "<style>p {}</style><div></div>");
    }
}
