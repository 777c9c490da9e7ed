///! Photo input resolution
///!
///! Normalizes a photo reference (inline data URI, remote URL, or local file
///! path) into an inline-encoded data URI. Unresolvable input yields `None`
///! rather than an error, so renderer call sites stay free of error handling
///! for the common "no photo" case.

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::Path;

/// Resolve a photo reference into a `data:` URI.
///
/// Classification order: already-inline data is returned unchanged; URLs are
/// fetched and re-encoded; existing local files are read and re-encoded with
/// a MIME type inferred from the extension. Anything else resolves to `None`
/// with a warning.
pub async fn resolve_image_input(input: Option<&str>) -> Option<String> {
    let input = input?;
    if input.is_empty() {
        return None;
    }

    if input.starts_with("data:image/") {
        return Some(input.to_string());
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        return match fetch_as_data_uri(input).await {
            Ok(data_uri) => Some(data_uri),
            Err(e) => {
                tracing::error!("Failed to fetch image from URL {}: {:#}", input, e);
                None
            }
        };
    }

    let path = Path::new(input);
    if path.is_file() {
        return match file_as_data_uri(path).await {
            Ok(data_uri) => Some(data_uri),
            Err(e) => {
                tracing::error!("Failed to read image file {}: {:#}", path.display(), e);
                None
            }
        };
    }

    tracing::warn!("Image not found or invalid: {}", input);
    None
}

async fn fetch_as_data_uri(url: &str) -> Result<String> {
    let response = reqwest::get(url).await.context("Request failed")?;
    if !response.status().is_success() {
        anyhow::bail!("HTTP error: {}", response.status());
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();

    let bytes = response.bytes().await.context("Failed to read response body")?;

    Ok(format!("data:{};base64,{}", content_type, BASE64.encode(&bytes)))
}

async fn file_as_data_uri(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!(
        "data:{};base64,{}",
        mime_for_extension(path),
        BASE64.encode(&bytes)
    ))
}

fn mime_for_extension(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inline_data_is_returned_unchanged() {
        let inline = "data:image/png;base64,iVBORw0KGgo=";
        let resolved = resolve_image_input(Some(inline)).await;
        assert_eq!(resolved.as_deref(), Some(inline));
    }

    #[tokio::test]
    async fn test_missing_input_resolves_to_none() {
        assert_eq!(resolve_image_input(None).await, None);
        assert_eq!(resolve_image_input(Some("")).await, None);
        assert_eq!(resolve_image_input(Some("/no/such/photo.png")).await, None);
    }

    #[tokio::test]
    async fn test_local_file_gets_extension_mime() {
        let path = std::env::temp_dir().join("fyb_resolver_test.png");
        tokio::fs::write(&path, b"not-really-a-png").await.unwrap();

        let resolved = resolve_image_input(Some(path.to_str().unwrap())).await.unwrap();
        assert!(resolved.starts_with("data:image/png;base64,"));

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_unreachable_url_resolves_to_none() {
        // port 9 (discard) is not listening; the fetch fails without panicking
        let resolved = resolve_image_input(Some("http://127.0.0.1:9/photo.jpg")).await;
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_for_extension(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_for_extension(Path::new("a.gif")), "image/gif");
        assert_eq!(mime_for_extension(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_for_extension(Path::new("photo")), "image/jpeg");
    }
}
