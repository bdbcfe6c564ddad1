//! Per-track and batch year inference on top of a [`TextGenerator`].

use log::{debug, error, info, warn};

use crate::enrichment::query::build_query;
use crate::enrichment::response::{parse_inferred_tag, InferredTag, ResponseParseError};
use crate::enrichment::{GenerationError, TextGenerator};
use crate::metadata_tags::TrackRecord;

/// Instruction pinning the model's role and exact output shape.
pub const SYSTEM_PROMPT: &str = "You are an API that returns the year a song or album was released. \
You will receive a JSON object containing the artist name and the title or album name of a recording. \
Respond with exactly a single JSON object of the form {\"year\": \"<value>\"}, where <value> is the \
release year or an ISO-8601 release date such as 2025-06-06. No markdown, no extra text.";

#[derive(Debug, thiserror::Error)]
pub enum InferError {
    #[error("failed to build query: {0}")]
    Query(#[source] serde_json::Error),
    #[error("unable to query model: {0}")]
    Generation(#[from] GenerationError),
    #[error("unable to parse response: {0}")]
    Response(#[from] ResponseParseError),
}

impl InferError {
    /// Returns `true` when no further records should be sent this run.
    pub fn is_batch_aborting(&self) -> bool {
        matches!(self, Self::Generation(error) if error.is_rate_limited())
    }
}

/// Result of one `enrich_batch` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Indices of records whose year was filled in, in input order.
    pub enriched: Vec<usize>,
    /// Records processed before the batch ended.
    pub attempted: usize,
    /// Soft per-record failures.
    pub failed: usize,
    /// Set when a rate limit stopped the batch early.
    pub rate_limited: bool,
}

fn record_label(record: &TrackRecord) -> String {
    format!(
        "{} - {} ({})",
        record.artist,
        record.title,
        record.path.display()
    )
}

/// Drives the enrichment round trip against one generator.
pub struct YearInferenceClient<G: TextGenerator> {
    generator: G,
}

impl<G: TextGenerator> YearInferenceClient<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Asks the model for the release year of `record`. Does not touch the record.
    pub fn infer(&self, record: &TrackRecord) -> Result<InferredTag, InferError> {
        let query = build_query(record).map_err(InferError::Query)?;
        let user_text = String::from_utf8_lossy(&query);
        let response = self.generator.generate(SYSTEM_PROMPT, &user_text)?;
        Ok(parse_inferred_tag(&response)?)
    }

    /// Fills in missing years in input order, one model call per record.
    ///
    /// A rate limit stops the batch immediately; years gathered before it are
    /// kept. Any other failure is logged and only skips that record.
    pub fn enrich_batch(&self, records: &mut [TrackRecord]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let total = records.len();

        for (index, record) in records.iter_mut().enumerate() {
            outcome.attempted += 1;
            match self.infer(record) {
                Ok(tag) => {
                    debug!(
                        "Enrichment[{}]: inferred year {}",
                        record_label(record),
                        tag.year
                    );
                    record.year = tag.year;
                    outcome.enriched.push(index);
                }
                Err(err) if err.is_batch_aborting() => {
                    error!(
                        "Enrichment[{}]: {}; abandoning the remaining {} record(s)",
                        record_label(record),
                        err,
                        total - index - 1
                    );
                    outcome.rate_limited = true;
                    break;
                }
                Err(err) => {
                    warn!("Enrichment[{}]: {}", record_label(record), err);
                    outcome.failed += 1;
                }
            }
        }

        info!(
            "Enrichment finished: {} enriched, {} failed, {} attempted{}",
            outcome.enriched.len(),
            outcome.failed,
            outcome.attempted,
            if outcome.rate_limited {
                " (stopped by rate limit)"
            } else {
                ""
            }
        );
        outcome
    }
}
