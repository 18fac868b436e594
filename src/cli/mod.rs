//! # CLI Module
//!
//! Command-line interface for the slide curator.
//!
//! ## Usage
//! ```bash
//! # List a capture folder in slide order
//! slide-curate scan ~/captures/lecture-3
//!
//! # Keep only watermarked frames, collapse repeats, write lecture-3.pdf
//! slide-curate curate ~/captures/lecture-3 --watermark logo.png
//!
//! # Drop frames WITH the watermark instead, skip deduplication
//! slide-curate curate ~/captures/lecture-3 --watermark ad.png --invert --no-dedup
//!
//! # JSON summary for scripting
//! slide-curate curate ~/captures/lecture-3 --output-format json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use slide_curator::core::orchestrator::{
    CuratorConfig, TaskOrchestrator, TaskOutcome, TaskRequest, WatermarkScope,
};
use slide_curator::core::ordering::display_name;
use slide_curator::core::session::CurationSession;
use slide_curator::error::{CuratorError, Result, TaskError};
use slide_curator::events::{
    AssemblyEvent, CatalogEvent, DedupEvent, Event, EventChannel, EventReceiver, LogLevel,
    TaskEvent, WatermarkEvent,
};
use std::path::PathBuf;

/// Slide Curator - turn captured slides into one clean PDF
#[derive(Parser, Debug)]
#[command(name = "slide-curate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load, filter and deduplicate a folder, then write the PDF
    Curate {
        /// Folder of captured slide images
        folder: PathBuf,

        /// Watermark template image; enables the watermark filter
        #[arg(short, long)]
        watermark: Option<PathBuf>,

        /// Watermark match threshold (0.10-1.00)
        #[arg(long, default_value = "0.80")]
        watermark_threshold: f32,

        /// Which images the watermark filter looks at
        #[arg(long, default_value = "all")]
        scope: Scope,

        /// Exclude images that DO contain the watermark
        #[arg(long)]
        invert: bool,

        /// Largest hash distance at which frames count as repeats (0-64)
        #[arg(short, long, default_value = "15")]
        dedup_threshold: u32,

        /// Skip frame deduplication
        #[arg(long)]
        no_dedup: bool,

        /// Output PDF (default: <folder>/<folder name>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "pretty")]
        output_format: OutputFormat,

        /// Show every per-image decision
        #[arg(short, long)]
        verbose: bool,
    },

    /// Load a folder and list it in slide order
    Scan {
        /// Folder of captured slide images
        folder: PathBuf,

        /// Output format
        #[arg(long, default_value = "pretty")]
        output_format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scope {
    /// Every image in the folder
    All,
    /// Only images still selected
    Selected,
}

impl From<Scope> for WatermarkScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::All => WatermarkScope::All,
            Scope::Selected => WatermarkScope::SelectedOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Curate {
            folder,
            watermark,
            watermark_threshold,
            scope,
            invert,
            dedup_threshold,
            no_dedup,
            output,
            output_format,
            verbose,
        } => {
            let config = CuratorConfig::builder()
                .watermark_threshold(watermark_threshold)
                .dedup_threshold(dedup_threshold)
                .build()?;
            let options = CurateOptions {
                watermark: watermark.map(|template| (template, scope.into(), invert)),
                dedup: !no_dedup,
                output,
            };
            run_curate(config, folder, options, output_format, verbose)
        }
        Commands::Scan {
            folder,
            output_format,
        } => run_scan(folder, output_format),
    }
}

struct CurateOptions {
    watermark: Option<(PathBuf, WatermarkScope, bool)>,
    dedup: bool,
    output: Option<PathBuf>,
}

/// What `curate` did, for the final report
#[derive(Debug, Default, Serialize)]
struct CurateReport {
    folder: PathBuf,
    total: usize,
    selected: usize,
    filtered: usize,
    watermark_excluded: Option<Vec<PathBuf>>,
    dedup_excluded: Option<Vec<PathBuf>>,
    output: Option<PathBuf>,
    pages: usize,
    skipped: Vec<PathBuf>,
}

/// Drives one orchestrator and one session from the foreground thread
struct Driver {
    orchestrator: TaskOrchestrator,
    receiver: EventReceiver,
    session: CurationSession,
    progress: Option<ProgressBar>,
    term: Term,
    verbose: bool,
}

impl Driver {
    fn new(config: CuratorConfig, format: OutputFormat, verbose: bool) -> Self {
        let (sender, receiver) = EventChannel::new();
        let progress = matches!(format, OutputFormat::Pretty).then(|| {
            let pb = ProgressBar::new(0);
            if let Ok(bar) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(bar.progress_chars("█▓░"));
            }
            pb
        });

        Self {
            session: CurationSession::new(config.clone()),
            orchestrator: TaskOrchestrator::new(config, sender),
            receiver,
            progress,
            term: Term::stderr(),
            verbose,
        }
    }

    /// Dispatch `request` and pump events until its terminal event.
    fn run_task(&mut self, request: TaskRequest) -> Result<TaskOutcome> {
        let id = self.orchestrator.dispatch(request)?;

        while let Some(event) = self.receiver.recv() {
            self.session.handle_event(&event);
            self.render(&event);

            if let Event::Task(task) = event {
                if task.id() != id {
                    continue;
                }
                match task {
                    TaskEvent::Started { .. } => {}
                    TaskEvent::Completed { outcome, .. } => return Ok(outcome),
                    TaskEvent::Failed {
                        kind,
                        error,
                        message,
                        ..
                    } => {
                        return Err(CuratorError::Task(TaskError::Failed {
                            task: kind.to_string(),
                            kind: error,
                            message,
                        }))
                    }
                }
            }
        }

        Err(CuratorError::Task(TaskError::InternalFault {
            task: id.to_string(),
            message: "event stream closed before the task finished".to_string(),
        }))
    }

    fn render(&self, event: &Event) {
        let Some(pb) = &self.progress else {
            return;
        };

        match event {
            Event::Catalog(CatalogEvent::Listed { items }) => restart(pb, items.len(), "loading"),
            Event::Watermark(WatermarkEvent::Started { candidates, .. }) => {
                restart(pb, *candidates, "watermark")
            }
            Event::Dedup(DedupEvent::Started { candidates, .. }) => {
                restart(pb, candidates.saturating_sub(1), "deduplicating")
            }
            Event::Assembly(AssemblyEvent::Started { pages }) => restart(pb, *pages, "writing PDF"),
            Event::Catalog(CatalogEvent::ThumbnailDecoded { path, .. })
            | Event::Catalog(CatalogEvent::DecodeFailed { path, .. })
            | Event::Watermark(WatermarkEvent::Decision { path, .. })
            | Event::Watermark(WatermarkEvent::Failed { path, .. })
            | Event::Dedup(DedupEvent::Compared { current: path, .. })
            | Event::Dedup(DedupEvent::Skipped { current: path, .. })
            | Event::Assembly(AssemblyEvent::PageAdded { path, .. })
            | Event::Assembly(AssemblyEvent::PageSkipped { path, .. }) => {
                pb.inc(1);
                if self.verbose {
                    pb.set_message(display_name(path));
                }
            }
            Event::Log(line) => match line.level {
                LogLevel::Info if !self.verbose => {}
                LogLevel::Info => pb.println(line.message.clone()),
                LogLevel::Warning => pb.println(style(&line.message).yellow().to_string()),
                LogLevel::Error => pb.println(style(&line.message).red().to_string()),
            },
            Event::Task(TaskEvent::Completed { .. } | TaskEvent::Failed { .. }) => {
                pb.finish_and_clear();
            }
            _ => {}
        }
    }
}

fn restart(pb: &ProgressBar, len: usize, message: &'static str) {
    pb.reset();
    pb.set_length(len as u64);
    pb.set_message(message);
}

fn run_curate(
    config: CuratorConfig,
    folder: PathBuf,
    options: CurateOptions,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let mut driver = Driver::new(config, format, verbose);

    if matches!(format, OutputFormat::Pretty) {
        print_header(&driver.term);
    }

    driver.run_task(driver.session.load_request(&folder))?;

    let mut report = CurateReport {
        folder: folder.clone(),
        ..Default::default()
    };

    if let Some((template, scope, invert)) = options.watermark {
        let request = driver
            .session
            .watermark_request(&template, scope, invert, None)?;
        if let TaskOutcome::Detected { result, .. } = driver.run_task(request)? {
            report.watermark_excluded = Some(result.excluded);
        }
    }

    if options.dedup {
        let request = driver.session.dedup_request(None)?;
        if let TaskOutcome::Detected { result, .. } = driver.run_task(request)? {
            report.dedup_excluded = Some(result.excluded);
        }
    }

    let stats = driver.session.stats();
    report.total = stats.total;
    report.selected = stats.selected;
    report.filtered = stats.filtered;

    let request = driver.session.assemble_request(options.output)?;
    if let TaskOutcome::Assembled(assembled) = driver.run_task(request)? {
        report.output = Some(assembled.output);
        report.pages = assembled.pages;
        report.skipped = assembled.skipped;
    }

    match format {
        OutputFormat::Pretty => print_pretty_report(&driver.term, &report),
        OutputFormat::Json => print_json(&report),
    }

    Ok(())
}

/// One listed item, for `scan`
#[derive(Debug, Serialize)]
struct ScanEntry {
    name: String,
    path: PathBuf,
    decoded: bool,
    width: Option<u32>,
    height: Option<u32>,
}

fn run_scan(folder: PathBuf, format: OutputFormat) -> Result<()> {
    let mut driver = Driver::new(CuratorConfig::default(), format, false);

    if matches!(format, OutputFormat::Pretty) {
        print_header(&driver.term);
    }

    driver.run_task(driver.session.load_request(&folder))?;

    let entries: Vec<ScanEntry> = driver
        .session
        .catalog()
        .iter()
        .map(|item| ScanEntry {
            name: item.display_name.clone(),
            path: item.path.clone(),
            decoded: item.thumbnail.is_some(),
            width: item.thumbnail.as_ref().map(|t| t.width),
            height: item.thumbnail.as_ref().map(|t| t.height),
        })
        .collect();

    match format {
        OutputFormat::Pretty => {
            let term = &driver.term;
            term.write_line(&format!(
                "{} {} images in {}",
                style("✓").green().bold(),
                style(entries.len()).cyan(),
                folder.display()
            ))
            .ok();
            term.write_line("").ok();
            for (i, entry) in entries.iter().enumerate() {
                let marker = if entry.decoded {
                    style("○").dim().to_string()
                } else {
                    style("✗").red().to_string()
                };
                term.write_line(&format!("  {:>4} {} {}", i + 1, marker, entry.name))
                    .ok();
            }
        }
        OutputFormat::Json => print_json(&entries),
    }

    Ok(())
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Slide Curator").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn print_pretty_report(term: &Term, report: &CurateReport) {
    term.write_line(&format!("{} Curation Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images loaded from {}",
        style(report.total).cyan(),
        report.folder.display()
    ))
    .ok();

    if let Some(excluded) = &report.watermark_excluded {
        term.write_line(&format!(
            "  {} excluded by the watermark filter",
            style(excluded.len()).yellow()
        ))
        .ok();
    }
    if let Some(excluded) = &report.dedup_excluded {
        term.write_line(&format!(
            "  {} repeated frames collapsed",
            style(excluded.len()).yellow()
        ))
        .ok();
    }

    term.write_line(&format!(
        "  {} selected, {} filtered",
        style(report.selected).cyan(),
        style(report.filtered).dim()
    ))
    .ok();

    for path in &report.skipped {
        term.write_line(&format!(
            "  {} skipped unreadable page {}",
            style("!").yellow(),
            display_name(path)
        ))
        .ok();
    }

    if let Some(output) = &report.output {
        term.write_line("").ok();
        term.write_line(&format!(
            "  {} pages written to {}",
            style(report.pages).green().bold(),
            style(output.display()).underlined()
        ))
        .ok();
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}
