//! taiyaku CLI - bilingual paragraph tables from parallel PDFs

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use taiyaku::{
    failing_stage, Alignment, ExtractOrder, FragmentSource, JsonFormat, LanguageProfile,
    OutputFormat, PdfDocument, Pipeline, PipelineOptions, Side, SpreadSplitter,
};

#[derive(Parser)]
#[command(name = "taiyaku")]
#[command(author = "iyulab")]
#[command(version)]
#[command(
    about = "Build row-aligned bilingual paragraph tables from parallel PDFs",
    long_about = None
)]
struct Cli {
    /// Source-language PDF
    #[arg(value_name = "SOURCE")]
    source: Option<PathBuf>,

    /// Target-language PDF
    #[arg(value_name = "TARGET")]
    target: Option<PathBuf>,

    /// Output file (format from extension, CSV otherwise)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Align two parallel PDFs into a two-column table
    Align {
        /// Source-language PDF
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Target-language PDF
        #[arg(value_name = "TARGET")]
        target: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (defaults to the output extension, then CSV)
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Split two-page spreads into logical pages
    Split {
        /// Input PDF file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output PDF file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Dump one document's reconstructed paragraphs as JSON
    #[command(alias = "para")]
    Paragraphs {
        /// Input PDF file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Document language
        #[arg(long, value_enum, default_value = "ja")]
        lang: Lang,

        /// Do not split spreads
        #[arg(long)]
        no_spread: bool,

        /// Merge threshold in page units
        #[arg(long, value_name = "F")]
        threshold: Option<f32>,

        /// Read fragments in content-stream order
        #[arg(long)]
        native_order: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

/// Flags shared by every aligning command.
#[derive(Args, Default)]
struct PipelineArgs {
    /// JSON options file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not split spreads
    #[arg(long)]
    no_spread: bool,

    /// Merge threshold in page units
    #[arg(long, value_name = "F")]
    threshold: Option<f32>,

    /// Source document language
    #[arg(long, value_enum)]
    source_lang: Option<Lang>,

    /// Target document language
    #[arg(long, value_enum)]
    target_lang: Option<Lang>,

    /// Regex for paragraphs to drop
    #[arg(long, value_name = "RE")]
    noise_pattern: Option<String>,

    /// Read fragments in content-stream order
    #[arg(long)]
    native_order: bool,

    /// Align up to the shorter document, then report the mismatch
    #[arg(long)]
    lenient: bool,

    /// Process pages in parallel
    #[arg(long)]
    parallel: bool,

    /// Header label of the source column
    #[arg(long, value_name = "LABEL")]
    source_label: Option<String>,

    /// Header label of the target column
    #[arg(long, value_name = "LABEL")]
    target_label: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Comma-separated values
    Csv,
    /// JSON with row heights
    Json,
    /// Markdown table
    #[value(alias = "md")]
    Markdown,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputFormat::Csv,
            Format::Json => OutputFormat::Json,
            Format::Markdown => OutputFormat::Markdown,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Lang {
    /// Japanese terminators
    Ja,
    /// English terminators
    En,
}

impl From<Lang> for LanguageProfile {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::Ja => LanguageProfile::japanese(),
            Lang::En => LanguageProfile::english(),
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Align {
            source,
            target,
            output,
            format,
            compact,
            pipeline,
        }) => cmd_align(&source, &target, output.as_deref(), format, compact, &pipeline),
        Some(Commands::Split { input, output }) => cmd_split(&input, &output),
        Some(Commands::Paragraphs {
            input,
            lang,
            no_spread,
            threshold,
            native_order,
            output,
        }) => cmd_paragraphs(
            &input,
            lang,
            no_spread,
            threshold,
            native_order,
            output.as_deref(),
        ),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => match (cli.source, cli.target) {
            // Default behavior: align if both inputs are provided
            (Some(source), Some(target)) => cmd_align(
                &source,
                &target,
                cli.output.as_deref(),
                None,
                false,
                &PipelineArgs::default(),
            ),
            _ => {
                println!("{}", "Usage: taiyaku <SOURCE> <TARGET> [OUTPUT]".yellow());
                println!("       taiyaku --help for more information");
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        match e.downcast_ref::<taiyaku::Error>() {
            Some(err) => eprintln!(
                "{} [{}]: {}",
                "Error".red().bold(),
                failing_stage(err),
                err
            ),
            None => eprintln!("{}: {}", "Error".red().bold(), e),
        }
        std::process::exit(1);
    }
}

fn build_options(args: &PipelineArgs) -> Result<PipelineOptions, Box<dyn std::error::Error>> {
    let mut options = match &args.config {
        Some(path) => PipelineOptions::from_json_file(path)?,
        None => PipelineOptions::default(),
    };

    if args.no_spread {
        options = options.with_spread(false);
    }
    if let Some(threshold) = args.threshold {
        options = options.with_merge_threshold(threshold);
    }
    if let Some(lang) = args.source_lang {
        options = options.with_source_profile(lang.into());
    }
    if let Some(lang) = args.target_lang {
        options = options.with_target_profile(lang.into());
    }
    if let Some(ref pattern) = args.noise_pattern {
        options = options.with_noise_pattern(pattern.clone());
    }
    if args.native_order {
        options = options.native_order();
    }
    if args.lenient {
        options = options.lenient();
    }
    if args.parallel {
        options = options.with_parallel(true);
    }
    if let Some(ref label) = args.source_label {
        options.emit.source_label = label.clone();
    }
    if let Some(ref label) = args.target_label {
        options.emit.target_label = label.clone();
    }

    Ok(options)
}

fn cmd_align(
    source: &Path,
    target: &Path,
    output: Option<&Path>,
    format: Option<Format>,
    compact: bool,
    args: &PipelineArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = build_options(args)?;
    if compact {
        options.emit = options.emit.with_json_format(JsonFormat::Compact);
    }
    let format: OutputFormat = match format {
        Some(f) => f.into(),
        None => output
            .and_then(|path| OutputFormat::from_extension(path))
            .unwrap_or_default(),
    };

    let pipeline = Pipeline::new(options)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message("Opening documents...");
    let source_doc = pipeline.open_file(source)?;
    let target_doc = pipeline.open_file(target)?;

    let alignment = if pipeline.options().parallel {
        pb.set_message("Aligning pages...");
        let alignment = pipeline.run(&source_doc, &target_doc);
        pb.finish_and_clear();
        alignment?
    } else {
        align_with_progress(&pipeline, &source_doc, &target_doc, &pb)?
    };

    let content = alignment.render(format, &pipeline.options().emit)?;

    if let Some(path) = output {
        fs::write(path, &content)?;
        println!(
            "{} {} ({} pages, {} rows)",
            "Saved to".green(),
            path.display(),
            alignment.page_count(),
            alignment.table().len()
        );
    } else {
        println!("{}", content);
    }

    Ok(())
}

fn align_with_progress(
    pipeline: &Pipeline,
    source: &PdfDocument,
    target: &PdfDocument,
    spinner: &ProgressBar,
) -> Result<Alignment, Box<dyn std::error::Error>> {
    spinner.finish_and_clear();

    let mut aligner = pipeline.aligner(source, target);
    let pb = ProgressBar::new(aligner.page_count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    for record in aligner.by_ref() {
        match record {
            Ok(record) => {
                pb.set_message(format!("page {}", record.page_index));
                pb.inc(1);
            }
            Err(err) => {
                pb.abandon();
                let done = aligner.completed().len();
                if done > 0 {
                    log::warn!("{} pages aligned before the failure", done);
                }
                return Err(err.into());
            }
        }
    }
    pb.finish_with_message("Done!");

    Ok(Alignment::from_records(aligner.into_records()))
}

fn cmd_split(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let pages = SpreadSplitter::new().split_file(input, output)?;
    println!(
        "{} {} ({} logical pages)",
        "Saved to".green(),
        output.display(),
        pages
    );
    Ok(())
}

fn cmd_paragraphs(
    input: &Path,
    lang: Lang,
    no_spread: bool,
    threshold: Option<f32>,
    native_order: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = PipelineOptions::new()
        .with_spread(!no_spread)
        .with_source_profile(lang.into());
    if let Some(threshold) = threshold {
        options = options.with_merge_threshold(threshold);
    }
    if native_order {
        options = options.native_order();
    }

    let pipeline = Pipeline::new(options)?;
    let doc = pipeline.open_file(input)?;
    let pages = pipeline.paragraphs(&doc, Side::Source)?;
    let json = serde_json::to_string_pretty(&pages)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = PdfDocument::open(input)?;
    let physical_pages = doc.page_count();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), doc.version());
    println!("{}: {}", "Pages".bold(), physical_pages);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if doc.raw().is_encrypted() { "Yes" } else { "No" }
    );
    if let Some(title) = doc.title() {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Ok((width, height)) = doc.page_size(0) {
        println!("{}: {:.1} x {:.1}", "Page size".bold(), width, height);
    }

    println!();
    println!("{}", "Extraction".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let order = match doc.options().order {
        ExtractOrder::ReadingOrder => "reading",
        ExtractOrder::Native => "native",
    };
    println!("{}: {}", "Order".bold(), order);
    println!(
        "{}: {}",
        "Logical pages (split)".bold(),
        physical_pages * 2
    );

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "taiyaku".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Bilingual paragraph table builder");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/taiyaku".dimmed());
    println!("License: MIT");
}
