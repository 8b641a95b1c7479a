use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use ledgerstruct::export::{Exporter, JsonExporter, MarkdownExporter};
use ledgerstruct::ocr::OcrResult;
use ledgerstruct::provenance::RecordCandidateSet;
use ledgerstruct::table::{builtin_templates, read_layout_row};
use ledgerstruct::{process_document, PageOutcome, PageSide, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "ledgerstruct")]
#[command(version, about = "Template-locked table extraction and token provenance for scanned parish ledgers", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the ledger table and provenance artifacts from one OCR result
    Extract {
        /// OCR result JSON file
        input: PathBuf,

        #[command(flatten)]
        options: ExtractOptions,

        /// Record classification output (one set, or an array with one entry per page)
        #[arg(long)]
        candidates: Option<PathBuf>,

        /// Output directory (default: ./<input_name>_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Extract several OCR results with the same options
    Batch {
        /// OCR result JSON files
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        options: ExtractOptions,

        /// Base output directory for all results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the built-in templates as JSON
    Templates,
}

#[derive(clap::Args, Debug, Clone)]
struct ExtractOptions {
    /// Record type used to pick a built-in template (baptism, marriage, funeral)
    #[arg(short, long)]
    record_type: Option<String>,

    /// External layout row JSON file; takes precedence over built-in templates
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Which side of the ledger spread the scan shows
    #[arg(long, value_enum, default_value_t = Side::Full)]
    page_side: Side,

    /// Output format(s) to generate
    #[arg(short, long, value_enum, default_values_t = vec![Format::Json])]
    format: Vec<Format>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Side {
    Left,
    Right,
    Full,
}

impl From<Side> for PageSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => PageSide::Left,
            Side::Right => PageSide::Right,
            Side::Full => PageSide::Full,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Format {
    Json,
    Markdown,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "ledgerstruct=warn",
        1 => "ledgerstruct=info",
        _ => "ledgerstruct=debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Extract {
            input,
            options,
            candidates,
            output,
            quiet,
        } => extract_single(&input, &options, candidates.as_deref(), output, quiet),
        Commands::Batch {
            inputs,
            options,
            output,
        } => extract_batch(inputs, &options, output),
        Commands::Templates => show_templates(),
    }
}

fn open_file(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn load_config(options: &ExtractOptions) -> Result<PipelineConfig> {
    let mut config =
        PipelineConfig::new(options.record_type.clone()).with_page_side(options.page_side.into());
    if let Some(layout) = &options.layout {
        let row = read_layout_row(open_file(layout)?)
            .with_context(|| format!("Invalid layout row: {}", layout.display()))?;
        config = config.with_external_layout(row);
    }
    Ok(config)
}

fn load_candidates(path: Option<&Path>) -> Result<Vec<Option<RecordCandidateSet>>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    RecordCandidateSet::read_per_page(open_file(path)?)
        .with_context(|| format!("Invalid record candidates: {}", path.display()))
}

fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ocr".to_string());
    PathBuf::from(format!("{}_output", stem))
}

fn export_pages(pages: &[PageOutcome], output_dir: &Path, formats: &[Format]) -> Result<()> {
    let recorded_at = Utc::now();
    for format in formats {
        match format {
            Format::Json => JsonExporter::new(output_dir.to_path_buf()).export(pages, recorded_at)?,
            Format::Markdown => {
                MarkdownExporter::new(output_dir.to_path_buf()).export(pages, recorded_at)?
            }
        }
    }
    Ok(())
}

fn extract_single(
    input: &Path,
    options: &ExtractOptions,
    candidates: Option<&Path>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }
    let output_dir = output.unwrap_or_else(|| default_output_dir(input));

    let config = load_config(options)?;
    let candidates = load_candidates(candidates)?;
    let ocr = OcrResult::from_reader(open_file(input)?)
        .with_context(|| format!("Failed to read OCR result: {}", input.display()))?;

    if !quiet {
        println!("[*] Processing: {} ({} page(s))", input.display(), ocr.pages.len());
    }

    let pages = process_document(&ocr, &config, &candidates);
    export_pages(&pages, &output_dir, &options.format)
        .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;

    if !quiet {
        for page in &pages {
            println!(
                "    page {}: template={} rows={} coverage={:.2} orphans={} ambiguous={}",
                page.page_idx + 1,
                page.template_match
                    .selected_template_id
                    .as_deref()
                    .unwrap_or("none"),
                page.table.data_rows,
                page.table_provenance.cell_coverage_rate,
                page.table_provenance.token_orphans_count,
                page.table.ambiguous_tokens,
            );
        }
        println!("[✓] Done! Results saved to: {}", output_dir.display());
    }
    Ok(())
}

fn extract_batch(
    inputs: Vec<PathBuf>,
    options: &ExtractOptions,
    output: Option<PathBuf>,
) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }
    let base_output = output.unwrap_or_else(|| PathBuf::from("batch_output"));
    fs::create_dir_all(&base_output)
        .with_context(|| format!("Failed to create: {}", base_output.display()))?;

    let mut failed = 0;
    for (i, input) in inputs.iter().enumerate() {
        println!("[{}/{}] {}", i + 1, inputs.len(), input.display());
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("input_{}", i + 1));
        match extract_single(input, options, None, Some(base_output.join(stem)), true) {
            Ok(()) => println!("  [✓] Success"),
            Err(e) => {
                eprintln!("  [✗] Failed: {:#}", e);
                failed += 1;
            }
        }
    }

    println!("\n[*] Summary: {} succeeded, {} failed", inputs.len() - failed, failed);
    if failed > 0 {
        anyhow::bail!("{} file(s) failed to process", failed);
    }
    Ok(())
}

fn show_templates() -> Result<()> {
    let json = serde_json::to_string_pretty(builtin_templates())?;
    println!("{json}");
    Ok(())
}
