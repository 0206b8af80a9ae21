//! CLI binary for receipt2data.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints the pipeline result as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use receipt2data::{recognize_image, recognize_pdf, ExtractionConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Recognize a receipt photo
  receipt2data receipt.jpg

  # Recognize page 2 of a PDF invoice
  receipt2data --page 2 invoice.pdf

  # Compact JSON for piping
  receipt2data --compact receipt.png | jq .invoiceData

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY      Engine API key. Without it, results degrade to
                       success=false instead of erroring.

EXIT STATUS:
  0  result produced (even a degraded one)
  1  fatal input error: file missing/unreadable, or a PDF page that could
     neither be rasterized nor read from its text layer
"#;

/// Extract structured invoice data from receipt images and PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "receipt2data",
    version,
    about = "Extract structured invoice data from receipt images and PDFs",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image (jpg/png/gif/webp) or PDF file path.
    input: PathBuf,

    /// PDF page to recognize (1-based). Ignored for images.
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// OCR model for the dedicated recognition endpoint.
    #[arg(long, env = "RECEIPT2DATA_OCR_MODEL")]
    ocr_model: Option<String>,

    /// Chat model for fallback transcription and structuring.
    #[arg(long, env = "RECEIPT2DATA_CHAT_MODEL")]
    chat_model: Option<String>,

    /// Retries per engine call after the first attempt.
    #[arg(long, env = "RECEIPT2DATA_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-engine-call timeout in seconds.
    #[arg(long, env = "RECEIPT2DATA_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Rasterization DPI for PDF pages (72-400).
    #[arg(long, env = "RECEIPT2DATA_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Explicit path to the pdftoppm binary.
    #[arg(long, env = "RECEIPT2DATA_PDFTOPPM")]
    pdftoppm: Option<PathBuf>,

    /// Single-line JSON output instead of pretty-printed.
    #[arg(long)]
    compact: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except the JSON result and errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    let is_pdf = cli
        .input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    let result = if is_pdf {
        recognize_pdf(&cli.input, cli.page, &config)
            .await
            .context("PDF recognition failed")?
    } else {
        recognize_image(&cli.input, &config)
            .await
            .context("image recognition failed")?
    };

    let json = if cli.compact {
        serde_json::to_string(&result)
    } else {
        serde_json::to_string_pretty(&result)
    }
    .context("failed to serialize result")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(json.as_bytes())
        .and_then(|_| handle.write_all(b"\n"))
        .context("failed to write to stdout")?;

    if !cli.quiet && !result.success {
        eprintln!(
            "recognition degraded: {}",
            result.error.as_deref().unwrap_or("unknown cause")
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .raster_dpi(cli.dpi);

    if let Some(ref model) = cli.ocr_model {
        builder = builder.ocr_model(model);
    }
    if let Some(ref model) = cli.chat_model {
        builder = builder.chat_model(model);
    }
    if let Some(ref path) = cli.pdftoppm {
        builder = builder.pdftoppm_path(path);
    }

    builder.build().context("invalid configuration")
}
