use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use fyb_core::generator::{GenerationRequest, Generator, OutputFormat};
use fyb_core::record::{self, ColumnMapping};
use fyb_core::template::{self, TemplateKind};

#[derive(Parser, Debug)]
#[command(name = "fyb", version, about = "Final Year Brethren card generator")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate cards from CSV data.
    Generate(GenerateArgs),
    /// List available templates.
    Templates(TemplatesArgs),
    /// Show the column headers of a CSV file.
    Headers(HeadersArgs),
    /// Write a sample column mapping file.
    InitConfig(InitConfigArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Path to the CSV file.
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory.
    #[arg(short, long)]
    output: PathBuf,

    /// Template name.
    #[arg(short, long, default_value = "default")]
    template: String,

    /// Output format (png, jpeg, webp, svg). Defaults to the template
    /// backend's native format.
    #[arg(short, long)]
    format: Option<String>,

    /// Path to a column mapping JSON file. Takes precedence over the
    /// individual column options.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV column holding the student name.
    #[arg(long, default_value = "name")]
    name_column: String,

    /// CSV column holding the photo path, URL, or inline data.
    #[arg(long, default_value = "photoPath")]
    photo_column: String,

    /// CSV column holding the department.
    #[arg(long, default_value = "department")]
    department_column: String,

    /// CSV column holding the state of origin.
    #[arg(long, default_value = "stateOfOrigin")]
    state_column: String,
}

#[derive(Parser, Debug)]
struct TemplatesArgs {
    /// Filter by backend type (canvas, html, svg).
    #[arg(short = 't', long = "type")]
    kind: Option<String>,
}

#[derive(Parser, Debug)]
struct HeadersArgs {
    /// Path to the CSV file.
    #[arg(short, long)]
    input: PathBuf,
}

#[derive(Parser, Debug)]
struct InitConfigArgs {
    /// Output path for the mapping file.
    #[arg(short, long, default_value = "column-mapping.json")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    fyb_core::logging::init_console("info");

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args).await,
        Command::Templates(args) => cmd_templates(args),
        Command::Headers(args) => cmd_headers(args).await,
        Command::InitConfig(args) => cmd_init_config(args).await,
    }
}

async fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let column_mapping = if let Some(config_path) = &args.config {
        record::load_mapping(config_path).await?
    } else {
        let mut mapping = ColumnMapping::new();
        mapping.insert("name".to_string(), args.name_column.clone());
        mapping.insert("photoPath".to_string(), args.photo_column.clone());
        mapping.insert("department".to_string(), args.department_column.clone());
        mapping.insert("stateOfOrigin".to_string(), args.state_column.clone());
        mapping
    };

    let output_format = match &args.format {
        Some(value) => Some(value.parse::<OutputFormat>()?),
        None => None,
    };

    let request = GenerationRequest {
        csv_path: args.input,
        output_dir: args.output,
        template_name: args.template,
        column_mapping: Some(column_mapping),
        output_format,
    };

    let generator = Generator::new();
    let result = generator.generate(&request).await;
    generator.shutdown();

    let summary = result?;
    println!(
        "Generation complete: {} of {} cards written ({} failed)",
        summary.generated, summary.total, summary.failed
    );
    Ok(())
}

fn cmd_templates(args: TemplatesArgs) -> Result<()> {
    match &args.kind {
        Some(value) => {
            let kind = TemplateKind::parse(value)
                .with_context(|| format!("Unknown template type '{}'", value))?;
            println!("Available {} templates:", kind);
            for config in template::list_by_kind(kind) {
                println!("  - {}: {}", config.name, config.description);
            }
        }
        None => {
            println!("Available templates:");
            for name in template::list() {
                let config = template::get(name);
                println!("  - {} ({}): {}", config.name, config.kind(), config.description);
            }
        }
    }
    Ok(())
}

async fn cmd_headers(args: HeadersArgs) -> Result<()> {
    let generator = Generator::new();
    let headers = generator.csv_headers(&args.input).await?;

    println!("CSV Headers:");
    for (index, header) in headers.iter().enumerate() {
        println!("  {}. {}", index + 1, header);
    }
    Ok(())
}

async fn cmd_init_config(args: InitConfigArgs) -> Result<()> {
    tokio::fs::write(&args.output, record::SAMPLE_MAPPING_JSON)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("Sample config created: {}", args.output.display());
    println!("Edit this file to match your CSV column names.");
    println!("Photo fields support file paths, URLs, or inline base64 data.");
    Ok(())
}
