use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

use notemark::batch::{self, BatchConfig, BatchReport, NoteReport};
use notemark::config::{self, AnnotatorOptions, FeatureConfig, SectionConfig};
use notemark::discovery::{self, DiscoveryConfig};
use notemark::reader::ReaderConfig;
use notemark::{MultiPatternAnnotator, SectionAnnotator};

#[derive(Parser, Debug)]
#[command(name = "notemark")]
#[command(about = "Highlight regex features and section breaks in clinical notes")]
#[command(version)]
struct Cli {
    /// Log debug detail (match counts, suppressed overlaps)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Highlight feature expressions in notes
    Features {
        /// Feature file with keywords and expressions
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Highlight and classify section breaks in notes
    Sections {
        /// Section file with the break expression and section names
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the color legend and validity of every feature expression
    Legend {
        /// Feature file with keywords and expressions
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Note files, or directories scanned recursively
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// File-name glob used when scanning directories
    #[arg(long, default_value = "*.txt")]
    file_pattern: String,

    /// Tag grammar override (JSON with open_tag / close_tag)
    #[arg(long)]
    tags: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Abort on first error
    #[arg(long)]
    fail_fast: bool,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,
}

async fn collect_inputs(run: &RunArgs) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in &run.inputs {
        if input.is_dir() {
            let discovery_config = DiscoveryConfig {
                fail_fast: run.fail_fast,
                file_pattern: run.file_pattern.clone(),
            };
            let found = discovery::collect_discovered_notes(input, discovery_config).await?;
            for file in found {
                match file.error {
                    None => paths.push(file.path),
                    Some(error) => warn!("Skipping {}: {}", file.path.display(), error),
                }
            }
        } else if input.exists() || !run.fail_fast {
            paths.push(input.clone());
        } else {
            anyhow::bail!("Input does not exist: {}", input.display());
        }
    }
    Ok(paths)
}

fn progress_bar(run: &RunArgs, len: usize) -> ProgressBar {
    if run.no_progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn batch_config(run: &RunArgs) -> BatchConfig {
    BatchConfig {
        reader: ReaderConfig {
            fail_fast: run.fail_fast,
            ..ReaderConfig::default()
        },
        ..BatchConfig::default()
    }
}

fn tag_options(run: &RunArgs) -> Result<AnnotatorOptions> {
    match &run.tags {
        Some(path) => config::load_json(path),
        None => Ok(AnnotatorOptions::default()),
    }
}

fn write_report(report: &BatchReport, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match out {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn tick(pb: &ProgressBar) -> impl FnMut(&NoteReport) + '_ {
    move |report| {
        pb.set_message(report.path.clone());
        pb.inc(1);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!(?cli, "Parsed CLI arguments");

    match cli.command {
        Command::Legend { config } => {
            let features: FeatureConfig = config::load_json(&config)?;
            let patterns = features.pattern_set();
            let annotator = MultiPatternAnnotator::with_default_grammar(&patterns);
            println!("{}", serde_json::to_string_pretty(&annotator.legend())?);
            for descriptor in patterns.descriptors().iter().filter(|d| !d.is_valid) {
                warn!("Invalid expression {:?}: {}", descriptor.name, descriptor.raw_regex);
            }
        }
        Command::Features { config, run } => {
            let features: FeatureConfig = config::load_json(&config)?;
            let patterns = features.pattern_set();
            let annotator = MultiPatternAnnotator::new(&patterns, tag_options(&run)?.grammar());

            let paths = collect_inputs(&run).await?;
            let pb = progress_bar(&run, paths.len());
            let report =
                batch::annotate_features(&paths, &annotator, &batch_config(&run), tick(&pb))
                    .await?;
            pb.finish_and_clear();

            info!("Annotated {} notes ({} failed)", report.notes.len(), report.notes_failed);
            write_report(&report, run.out.as_deref())?;
        }
        Command::Sections { config, run } => {
            let sections: SectionConfig = config::load_json(&config)?;
            let section_break = sections.section_break()?;
            let candidates = sections.candidates();
            let annotator =
                SectionAnnotator::new(&section_break, &candidates, tag_options(&run)?.grammar());

            let paths = collect_inputs(&run).await?;
            let pb = progress_bar(&run, paths.len());
            let report =
                batch::annotate_sections(&paths, &annotator, &batch_config(&run), tick(&pb))
                    .await?;
            pb.finish_and_clear();

            info!("Annotated {} notes ({} failed)", report.notes.len(), report.notes_failed);
            write_report(&report, run.out.as_deref())?;
        }
    }

    Ok(())
}
