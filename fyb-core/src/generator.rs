///! Generation orchestrator
///!
///! End-to-end driver: resolves the template, normalizes all rows, and
///! dispatches each row to the backend matching the template's type tag.
///! A single row's failure never ends the run; the shared browser resource
///! is released once after the last row.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::record::ColumnMapping;
use crate::render::{self, HtmlRenderer};
use crate::roster;
use crate::template::{self, TemplateKind, TemplateSpec};

/// Parameters for one end-to-end run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub csv_path: PathBuf,
    pub output_dir: PathBuf,
    pub template_name: String,
    pub column_mapping: Option<ColumnMapping>,
    pub output_format: Option<OutputFormat>,
}

/// Per-run completion state.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GenerationSummary {
    pub total: usize,
    pub generated: usize,
    pub failed: usize,
}

/// Supported output artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
    Svg,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Png,
        OutputFormat::Jpeg,
        OutputFormat::Webp,
        OutputFormat::Svg,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported output format '{0}', expected one of: png, jpeg, webp, svg")]
pub struct FormatError(String);

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            "svg" => Ok(OutputFormat::Svg),
            _ => Err(FormatError(value.to_string())),
        }
    }
}

/// End-to-end card generation over one CSV roster.
pub struct Generator {
    html: HtmlRenderer,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self {
            html: HtmlRenderer::new(),
        }
    }

    /// Run one generation request. Rows are processed strictly in input
    /// order; per-row failures are logged and counted, never propagated.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationSummary> {
        tracing::info!("Starting generation run");

        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .context("Failed to create output directory")?;

        let template = template::get(&request.template_name);
        tracing::info!("Using template: {} ({})", template.name, template.kind());

        let records =
            roster::load_records(&request.csv_path, request.column_mapping.as_ref()).await?;
        tracing::info!("Found {} students", records.len());

        let format = request
            .output_format
            .unwrap_or_else(|| default_format(template.kind()));

        // an engine that cannot start at all is fatal, unlike per-row
        // render failures
        if !records.is_empty() && matches!(template.spec, TemplateSpec::Html(_)) {
            self.html
                .ensure_started()
                .context("Failed to start rendering engine")?;
        }

        let mut summary = GenerationSummary {
            total: records.len(),
            ..Default::default()
        };

        for (index, record) in records.iter().enumerate() {
            let stem = if record.name.is_empty() {
                format!("student_{}", index + 1)
            } else {
                sanitize_file_name(&record.name)
            };
            let output_path = request
                .output_dir
                .join(format!("{}.{}", stem, format.extension()));

            let outcome = match &template.spec {
                TemplateSpec::Canvas(spec) => render::canvas::render(record, spec, &output_path).await,
                TemplateSpec::Html(spec) => self.html.render(record, spec, &output_path).await,
                TemplateSpec::Svg(spec) => render::svg::render(record, spec, &output_path).await,
            };

            match outcome {
                Ok(()) => {
                    summary.generated += 1;
                    tracing::info!("Generated: {}", output_path.display());
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!("Failed to generate card for '{}': {:#}", record.name, e);
                }
            }
        }

        self.html.shutdown();

        tracing::info!(
            "Generation complete: {}/{} cards written",
            summary.generated,
            summary.total
        );
        Ok(summary)
    }

    /// Ordered raw column names of a source file.
    pub async fn csv_headers(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        roster::read_headers(path).await
    }

    /// Release the shared browser, if one was started. Idempotent.
    pub fn shutdown(&self) {
        self.html.shutdown();
    }
}

/// Per-backend default artifact format.
pub fn default_format(kind: TemplateKind) -> OutputFormat {
    match kind {
        TemplateKind::Svg => OutputFormat::Svg,
        TemplateKind::Canvas | TemplateKind::Html => OutputFormat::Png,
    }
}

/// Derive a file stem from a student name: every non-ASCII-alphanumeric
/// character becomes an underscore, letters are lowercased.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Jane O'Brien!!"), "jane_o_brien__");
        assert_eq!(sanitize_file_name("John Doe"), "john_doe");
        assert_eq!(sanitize_file_name("ADA-99"), "ada_99");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("JPEG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("webp".parse::<OutputFormat>().unwrap(), OutputFormat::Webp);
        assert_eq!("svg".parse::<OutputFormat>().unwrap(), OutputFormat::Svg);
        assert!("bmp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_default_formats() {
        assert_eq!(default_format(TemplateKind::Canvas), OutputFormat::Png);
        assert_eq!(default_format(TemplateKind::Html), OutputFormat::Png);
        assert_eq!(default_format(TemplateKind::Svg), OutputFormat::Svg);
    }

    #[tokio::test]
    async fn test_generate_svg_batch_tolerates_bad_photo() {
        let run_dir = std::env::temp_dir().join(format!("fyb_gen_{}", uuid::Uuid::now_v7()));
        let csv_path = run_dir.join("students.csv");
        let output_dir = run_dir.join("out");
        tokio::fs::create_dir_all(&run_dir).await.unwrap();

        // row 2 points at a photo that does not exist; the run must still
        // produce all three artifacts
        let csv = "name,department,stateOfOrigin,photoPath\n\
                   John Doe,Computer Science,Lagos,\n\
                   Jane Smith,Physics,Abuja,/no/such/photo.png\n\
                   Ada Lovelace,Mathematics,Ogun,\n";
        tokio::fs::write(&csv_path, csv).await.unwrap();

        let generator = Generator::new();
        let request = GenerationRequest {
            csv_path: csv_path.clone(),
            output_dir: output_dir.clone(),
            template_name: "badge".to_string(),
            column_mapping: None,
            output_format: None,
        };
        let summary = generator.generate(&request).await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.generated, 3);
        assert_eq!(summary.failed, 0);

        for stem in ["john_doe", "jane_smith", "ada_lovelace"] {
            let path = output_dir.join(format!("{}.svg", stem));
            assert!(path.is_file(), "missing artifact: {}", path.display());
        }

        let jane = tokio::fs::read_to_string(output_dir.join("jane_smith.svg"))
            .await
            .unwrap();
        assert!(jane.contains("Jane Smith"));

        tokio::fs::remove_dir_all(&run_dir).await.ok();
    }

    #[tokio::test]
    async fn test_generate_fails_on_missing_csv() {
        let generator = Generator::new();
        let request = GenerationRequest {
            csv_path: PathBuf::from("/no/such/roster.csv"),
            output_dir: std::env::temp_dir().join("fyb_gen_missing"),
            template_name: "badge".to_string(),
            column_mapping: None,
            output_format: None,
        };
        assert!(generator.generate(&request).await.is_err());
    }
}
