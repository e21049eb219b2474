//! qbank CLI - question bank extraction and export tool

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use qbank::selection::{pick, select};
use qbank::{
    parse_file_with_options, ExportEngine, ExportEvent, ExportFormat, ExportOptions,
    ExportSession, ImageCache, ImageProcessor, NoProgress, NumberingMode, ParseOptions,
    ParsedDocument, Selection,
};

#[derive(Parser)]
#[command(name = "qbank")]
#[command(version)]
#[command(about = "Extract delimited questions from DOCX files and export them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Block delimiters shared by every command that parses a document.
#[derive(clap::Args)]
struct DelimiterArgs {
    /// Paragraph text opening a question block
    #[arg(long, env = "QBANK_START", default_value = qbank::parser::DEFAULT_START_DELIMITER)]
    start: String,

    /// Paragraph text closing a question block
    #[arg(long, env = "QBANK_END", default_value = qbank::parser::DEFAULT_END_DELIMITER)]
    end: String,
}

impl DelimiterArgs {
    fn parse_options(&self) -> ParseOptions {
        ParseOptions::new().with_delimiters(&self.start, &self.end)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show question and image counts and parse anomalies
    Info {
        /// Input DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the parse report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        delimiters: DelimiterArgs,
    },

    /// List the first line of every question
    #[command(alias = "ls")]
    List {
        /// Input DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Only list questions containing this text
        #[arg(short, long)]
        search: Option<String>,

        #[command(flatten)]
        delimiters: DelimiterArgs,
    },

    /// Export selected questions to one format
    Export {
        /// Input DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Output format (default: from the output extension)
        #[arg(short, long, value_enum, env = "QBANK_FORMAT")]
        format: Option<FormatArg>,

        /// Question numbering in the output
        #[arg(long, value_enum, env = "QBANK_NUMBERING", default_value = "original")]
        numbering: NumberingArg,

        /// Label preceding question numbers
        #[arg(long, env = "QBANK_LABEL", default_value = qbank::renumber::DEFAULT_LABEL)]
        label: String,

        /// Leave images out of the output
        #[arg(long)]
        no_images: bool,

        /// Question numbers to export (e.g., "1,3,5-7")
        #[arg(long)]
        select: Option<String>,

        /// Only export questions containing this text
        #[arg(short, long)]
        search: Option<String>,

        /// Export N questions picked at random
        #[arg(long, value_name = "N")]
        random: Option<usize>,

        /// Seed for --random
        #[arg(long, requires = "random")]
        seed: Option<u64>,

        #[command(flatten)]
        delimiters: DelimiterArgs,
    },

    /// Export all questions to every format
    Convert {
        /// Input DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Question numbering in the output
        #[arg(long, value_enum, env = "QBANK_NUMBERING", default_value = "original")]
        numbering: NumberingArg,

        #[command(flatten)]
        delimiters: DelimiterArgs,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Word document
    Docx,
    /// A4 PDF document
    Pdf,
    /// Plain text
    Txt,
    /// Self-contained HTML page
    Html,
    /// JSON records with base64 images
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Docx => ExportFormat::Docx,
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Txt => ExportFormat::Txt,
            FormatArg::Html => ExportFormat::Html,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum NumberingArg {
    /// Keep the numbers found in the document
    Original,
    /// Renumber 1, 2, 3, ... in export order
    Sequential,
}

impl From<NumberingArg> for NumberingMode {
    fn from(mode: NumberingArg) -> Self {
        match mode {
            NumberingArg::Original => NumberingMode::Original,
            NumberingArg::Sequential => NumberingMode::Sequential,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info {
            input,
            json,
            delimiters,
        } => cmd_info(&input, json, &delimiters),
        Commands::List {
            input,
            search,
            delimiters,
        } => cmd_list(&input, search.as_deref(), &delimiters),
        Commands::Export {
            input,
            output,
            format,
            numbering,
            label,
            no_images,
            select,
            search,
            random,
            seed,
            delimiters,
        } => build_criteria(select.as_deref(), search, random, seed).and_then(|criteria| {
            let format = resolve_format(format, &output)?;
            let options = ExportOptions::new(format)
                .with_numbering(numbering.into())
                .with_label(label)
                .with_images(!no_images);
            cmd_export(&input, &output, options, &criteria, &delimiters)
        }),
        Commands::Convert {
            input,
            output,
            numbering,
            delimiters,
        } => cmd_convert(&input, output.as_deref(), numbering, &delimiters),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_criteria(
    select: Option<&str>,
    search: Option<String>,
    random: Option<usize>,
    seed: Option<u64>,
) -> Result<Vec<Selection>, Box<dyn std::error::Error>> {
    let mut criteria = Vec::new();
    if let Some(spec) = select {
        criteria.push(Selection::parse(spec)?);
    }
    if let Some(needle) = search {
        criteria.push(Selection::search(needle));
    }
    if let Some(count) = random {
        criteria.push(Selection::random(count, seed));
    }
    Ok(criteria)
}

fn resolve_format(
    format: Option<FormatArg>,
    output: &Path,
) -> Result<ExportFormat, Box<dyn std::error::Error>> {
    match format {
        Some(format) => Ok(format.into()),
        None => ExportFormat::from_path(output).ok_or_else(|| {
            format!(
                "Cannot infer format from {}; use --format",
                output.display()
            )
            .into()
        }),
    }
}

fn parse(input: &Path, delimiters: &DelimiterArgs) -> qbank::Result<ParsedDocument> {
    let doc = parse_file_with_options(input, delimiters.parse_options())?;
    log::info!(
        "Parsed {} questions with {} images from {}",
        doc.question_count(),
        doc.image_count(),
        input.display()
    );
    Ok(doc)
}

fn cmd_info(
    input: &Path,
    json: bool,
    delimiters: &DelimiterArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = parse(input, delimiters)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc.report)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    if let Ok(format) = qbank::detect_format_from_path(input) {
        println!("{}: {}", "Format".bold(), format);
    }
    println!("{}: {}", "Paragraphs".bold(), doc.report.paragraphs);
    println!("{}: {}", "Blocks".bold(), doc.report.blocks);
    println!("{}: {}", "Questions".bold(), doc.question_count());
    println!("{}: {}", "Images".bold(), doc.image_count());

    println!();
    println!("{}", "Anomalies".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    if doc.report.is_clean() {
        println!("{}", "None".green());
    } else {
        for anomaly in &doc.report.anomalies {
            println!("  {} {}", "!".yellow().bold(), anomaly);
        }
    }

    Ok(())
}

fn cmd_list(
    input: &Path,
    search: Option<&str>,
    delimiters: &DelimiterArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = parse(input, delimiters)?;

    let criteria: Vec<Selection> = search.map(Selection::search).into_iter().collect();
    let indices = select(&doc.questions, &criteria)?;

    for &i in &indices {
        let question = &doc.questions[i];
        let images = match question.image_count() {
            0 => String::new(),
            n => format!(" ({} images)", n).dimmed().to_string(),
        };
        println!("{:>4}. {}{}", (i + 1).to_string().bold(), question.title(), images);
    }

    println!(
        "\n{} of {} questions",
        indices.len().to_string().green().bold(),
        doc.question_count()
    );

    Ok(())
}

fn cmd_export(
    input: &Path,
    output: &Path,
    options: ExportOptions,
    criteria: &[Selection],
    delimiters: &DelimiterArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = parse(input, delimiters)?;
    let indices = select(&doc.questions, criteria)?;
    let questions = pick(&doc.questions, &indices);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Exporting {} questions...", questions.len()));

    let format = options.format;
    let session = ExportSession::default();
    let handle = session.spawn(questions, options, output)?;

    for event in handle.events() {
        match event {
            ExportEvent::Progress(pct) => pb.set_position(pct as u64),
            ExportEvent::Finished(_) => pb.finish_with_message("Done!"),
            ExportEvent::Failed(msg) => pb.abandon_with_message(msg.red().to_string()),
        }
    }

    let summary = handle.wait()?;

    println!(
        "\n{} {} questions as {} to {}",
        "Exported".green().bold(),
        summary.questions,
        format,
        output.display()
    );
    if summary.images_embedded > 0 {
        println!(
            "  {} {} images ({} scaled)",
            "├─".dimmed(),
            summary.images_embedded,
            summary.images_scaled
        );
    }
    if summary.images_replaced > 0 {
        println!(
            "  {} {} images replaced by placeholders",
            "├─".dimmed(),
            summary.images_replaced.to_string().yellow()
        );
    }
    if format == ExportFormat::Pdf {
        println!("  {} {} pages", "├─".dimmed(), summary.pages);
    }
    println!("  {} {} bytes", "└─".dimmed(), summary.bytes_written);

    Ok(())
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    numbering: NumberingArg,
    delimiters: &DelimiterArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{}_export", stem))
    });

    fs::create_dir_all(&output_dir)?;

    let pb = ProgressBar::new(ExportFormat::ALL.len() as u64 + 1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    // one cache so every format reuses decoded and scaled images
    let processor = ImageProcessor::with_cache(Arc::new(ImageCache::new()));

    pb.set_message("Parsing DOCX...");
    let doc = qbank::DocxParser::open_with_options(input, delimiters.parse_options())?
        .with_processor(processor.clone())
        .parse();
    pb.inc(1);

    let engine = ExportEngine::with_defaults().with_processor(processor);
    let mut written = Vec::new();
    for format in ExportFormat::ALL {
        pb.set_message(format!("Generating {}...", format));
        let options = ExportOptions::new(format).with_numbering(numbering.into());
        let filename = format!("questions.{}", format.extension());
        engine.export(
            &doc.questions,
            &options,
            &output_dir.join(&filename),
            &mut NoProgress,
        )?;
        written.push(filename);
        pb.inc(1);
    }

    pb.finish_with_message("Done!");

    println!("\n{}", "Output files:".green().bold());
    for (i, filename) in written.iter().enumerate() {
        let branch = if i + 1 == written.len() { "└─" } else { "├─" };
        println!("  {} {}", branch.dimmed(), filename);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "qbank".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Question bank extraction and export tool");
    println!();
    println!("Formats: DOCX, PDF, TXT, HTML, JSON");
    println!("License: MIT");
}
