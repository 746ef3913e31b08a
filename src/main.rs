//! # gridform CLI
//!
//! Usage:
//!   gridform posting.xlsx other.xlsx --out-dir ./out
//!   gridform --batch uploads.json
//!   gridform --font ipaexg.ttf --font-family IPA posting.xlsx
//!   gridform --print-template > form.json

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gridform::convert::{parse_batch, ConvertOutcome, Converter};
use gridform::font::FontContext;
use gridform::form::Form;
use gridform::template::{default_template, default_template_json, FormTemplate};
use gridform::GridformError;

#[derive(Debug, Parser)]
#[command(name = "gridform", version, about = "Render XLSX sheets into fixed-layout PDF forms")]
struct Cli {
    /// Workbooks to convert.
    paths: Vec<PathBuf>,

    /// JSON array of {"name", "data"} entries with base64 workbook payloads.
    #[arg(long)]
    batch: Option<PathBuf>,

    /// Directory for the PDFs (default: your downloads directory).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Form template JSON (default: the built-in job posting form).
    #[arg(long)]
    template: Option<PathBuf>,

    /// TrueType font to embed.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Family name to register the font under (default: the template's font).
    #[arg(long, requires = "font")]
    font_family: Option<String>,

    /// Print the built-in template and exit.
    #[arg(long)]
    print_template: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridform=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.print_template {
        print!("{}", default_template_json());
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(outcomes) => {
            for outcome in &outcomes {
                eprintln!(
                    "✓ {} → {} ({} page(s))",
                    outcome.source,
                    outcome.path.display(),
                    outcome.pages
                );
                for warning in outcome.warnings() {
                    eprintln!("  ! {}", warning);
                }
                for failure in &outcome.report.failures {
                    eprintln!("  ✗ page {}: {}", failure.page, failure.error);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Vec<ConvertOutcome>, GridformError> {
    let template = match &cli.template {
        Some(path) => FormTemplate::from_json(&fs::read_to_string(path)?)?,
        None => default_template()?,
    };

    let mut fonts = FontContext::new();
    if let Some(path) = &cli.font {
        let family = cli.font_family.clone().unwrap_or_else(|| template.font.clone());
        fonts.registry_mut().register(&family, fs::read(path)?)?;
        tracing::info!(family = %family, path = %path.display(), "registered font");
    }

    let out_dir = match cli.out_dir {
        Some(dir) => dir,
        None => dirs::download_dir().ok_or(GridformError::NoOutputDir)?,
    };
    let converter = Converter::new(Form::new(template, fonts), out_dir);

    let mut outcomes = Vec::new();
    if let Some(batch) = &cli.batch {
        let files = parse_batch(&fs::read_to_string(batch)?)?;
        outcomes.extend(converter.convert_batch(&files)?);
    }
    for path in &cli.paths {
        outcomes.push(converter.convert_path(path)?);
    }
    if outcomes.is_empty() {
        tracing::warn!("nothing to convert; pass workbook paths or --batch");
    }
    Ok(outcomes)
}
