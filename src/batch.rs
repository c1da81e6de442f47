// WHY: Batch highlighting over many note files for the CLI; reads overlap while
// annotation itself stays a pure per-note call

use anyhow::Result;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::annotator::MultiPatternAnnotator;
use crate::palette::LegendEntry;
use crate::reader::{NoteReader, ReaderConfig};
use crate::section::{SectionAnnotator, SectionBoundary};
use crate::text::TextBlock;

/// Per-note result
#[derive(Serialize, Debug, Clone)]
pub struct NoteReport {
    /// File path as given or discovered
    pub path: String,
    /// Marked-up note; absent when reading failed
    pub markup: Option<TextBlock>,
    /// Matches per configured pattern slot (feature runs only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub counts: Vec<usize>,
    /// Classified boundaries (section runs only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub boundaries: Vec<SectionBoundary>,
    /// Annotation time in milliseconds
    pub processing_time_ms: u64,
    /// Read error if the note could not be loaded
    pub error: Option<String>,
}

impl NoteReport {
    fn failed(path: String, error: Option<String>) -> Self {
        Self {
            path,
            markup: None,
            counts: Vec::new(),
            boundaries: Vec::new(),
            processing_time_ms: 0,
            error,
        }
    }
}

/// Whole-run output: legend plus one report per note
#[derive(Serialize, Debug, Clone)]
pub struct BatchReport {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legend: Vec<LegendEntry>,
    pub notes: Vec<NoteReport>,
    pub notes_failed: usize,
}

/// Options shared by both batch runs
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub reader: ReaderConfig,
    /// Notes read concurrently
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            reader: ReaderConfig::default(),
            concurrency: num_cpus::get().max(1),
        }
    }
}

/// Read each note and hand its block to `annotate`, preserving input order
async fn run_batch<F, D>(
    paths: &[PathBuf],
    config: &BatchConfig,
    mut on_done: D,
    annotate: F,
) -> Result<Vec<NoteReport>>
where
    F: Fn(&TextBlock) -> NoteReport,
    D: FnMut(&NoteReport),
{
    let reader = NoteReader::new(config.reader.clone());
    let reader = &reader;

    let mut results = Box::pin(
        stream::iter(paths)
            .map(|path| async move { reader.read_note(path).await })
            .buffered(config.concurrency.max(1)),
    );

    let mut reports = Vec::with_capacity(paths.len());
    while let Some(read) = results.next().await {
        let (note, stats) = read?;
        let report = match note {
            Some(note) => {
                let start = std::time::Instant::now();
                let mut report = annotate(&note.block);
                report.path = note.path.display().to_string();
                report.processing_time_ms = start.elapsed().as_millis() as u64;
                debug!("Annotated {} in {}ms", report.path, report.processing_time_ms);
                report
            }
            None => NoteReport::failed(stats.file_path, stats.read_error),
        };
        on_done(&report);
        reports.push(report);
    }
    Ok(reports)
}

fn summarize(legend: Vec<LegendEntry>, notes: Vec<NoteReport>) -> BatchReport {
    let notes_failed = notes.iter().filter(|n| n.error.is_some()).count();
    info!("Batch complete: {} notes, {} failed", notes.len(), notes_failed);
    BatchReport {
        legend,
        notes,
        notes_failed,
    }
}

/// Highlight feature matches in every note
pub async fn annotate_features(
    paths: &[PathBuf],
    annotator: &MultiPatternAnnotator<'_>,
    config: &BatchConfig,
    on_done: impl FnMut(&NoteReport),
) -> Result<BatchReport> {
    info!("Annotating features in {} notes", paths.len());
    let notes = run_batch(paths, config, on_done, |block| {
        let counts = block.texts().fold(Vec::new(), |mut acc: Vec<usize>, text| {
            let segment_counts = annotator.count_matches(text);
            if acc.is_empty() {
                acc = segment_counts;
            } else {
                acc.iter_mut().zip(segment_counts).for_each(|(a, c)| *a += c);
            }
            acc
        });
        NoteReport {
            markup: Some(annotator.annotate(block)),
            counts,
            ..NoteReport::failed(String::new(), None)
        }
    })
    .await?;
    Ok(summarize(annotator.legend(), notes))
}

/// Highlight section boundaries in every note
pub async fn annotate_sections(
    paths: &[PathBuf],
    annotator: &SectionAnnotator<'_>,
    config: &BatchConfig,
    on_done: impl FnMut(&NoteReport),
) -> Result<BatchReport> {
    info!("Annotating sections in {} notes", paths.len());
    let notes = run_batch(paths, config, on_done, |block| NoteReport {
        markup: Some(block.map_text(|text| annotator.annotate(text))),
        boundaries: block.texts().flat_map(|text| annotator.boundaries(text)).collect(),
        ..NoteReport::failed(String::new(), None)
    })
    .await?;
    Ok(summarize(Vec::new(), notes))
}
