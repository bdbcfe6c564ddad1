//! Top-level orchestration: discover, filter, infer, write back.

use std::path::PathBuf;

use log::{info, warn};

use crate::config::ConfigError;
use crate::enrichment::client::YearInferenceClient;
use crate::enrichment::TextGenerator;
use crate::media_file_discovery::{list_candidates, DiscoveryError};
use crate::metadata_tags::{read_track_record, write_track_year, TrackRecord};

/// Inputs for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    /// Stop after filtering: no credential lookup, network call or write.
    pub dry_run: bool,
}

/// Counters gathered over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub discovered: usize,
    pub unreadable: usize,
    pub missing_year: usize,
    pub enriched: usize,
    pub inference_failures: usize,
    pub rate_limited: bool,
    pub written: usize,
    pub write_failures: usize,
}

/// Conditions that end the run with a failure status.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("issue listing files: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("unable to create inference client: {0}")]
    Config(#[from] ConfigError),
}

/// Reads every path and keeps the records that have no year yet.
pub(crate) fn select_missing_year(paths: &[PathBuf], report: &mut RunReport) -> Vec<TrackRecord> {
    let mut missing_year = Vec::new();
    for path in paths {
        match read_track_record(path) {
            Ok(record) if record.is_missing_year() => missing_year.push(record),
            Ok(_) => {}
            Err(err) => {
                warn!("Error reading tags: {}", err);
                report.unreadable += 1;
            }
        }
    }
    report.missing_year = missing_year.len();
    missing_year
}

fn log_selection(report: &RunReport, records: &[TrackRecord]) {
    info!(
        "Found {} mp3 file(s), {} unreadable, {} missing a year",
        report.discovered, report.unreadable, report.missing_year
    );
    for record in records {
        info!(
            "Missing year: artist={:?} title={:?} album={:?} file={}",
            record.artist,
            record.title,
            record.album,
            record.path.display()
        );
    }
}

/// Writes the years of `records[index]` for each index in `enriched`.
pub(crate) fn write_back(records: &[TrackRecord], enriched: &[usize], report: &mut RunReport) {
    for record in enriched.iter().filter_map(|&index| records.get(index)) {
        if record.is_missing_year() {
            continue;
        }
        match write_track_year(&record.path, &record.year) {
            Ok(()) => {
                info!("Set year {} on {}", record.year, record.path.display());
                report.written += 1;
            }
            Err(err) => {
                warn!("Unable to add year to file: {}", err);
                report.write_failures += 1;
            }
        }
    }
}

/// Runs the whole pipeline.
///
/// `connect` is called on every run that is not a dry run, even when no file
/// needs a year, so a missing credential always fails the run. A dry run never
/// needs one.
pub fn run_pipeline<F, G>(options: &RunOptions, connect: F) -> Result<RunReport, RunError>
where
    F: FnOnce() -> Result<G, ConfigError>,
    G: TextGenerator,
{
    let mut report = RunReport::default();

    let paths = list_candidates(&options.root)?;
    report.discovered = paths.len();

    let mut records = select_missing_year(&paths, &mut report);
    log_selection(&report, &records);

    if options.dry_run {
        info!("Dry run: skipping AI lookup");
        return Ok(report);
    }
    let client = YearInferenceClient::new(connect()?);
    if records.is_empty() {
        info!("Nothing to enrich");
        return Ok(report);
    }

    let outcome = client.enrich_batch(&mut records);
    report.enriched = outcome.enriched.len();
    report.inference_failures = outcome.failed;
    report.rate_limited = outcome.rate_limited;

    write_back(&records, &outcome.enriched, &mut report);
    Ok(report)
}
