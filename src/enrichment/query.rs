use serde::Serialize;

use crate::metadata_tags::TrackRecord;

/// Fields of a track exposed to the inference service.
#[derive(Debug, Serialize)]
pub struct EnrichmentQuery<'a> {
    pub title: &'a str,
    pub artist: &'a str,
    pub album: &'a str,
    /// Always sent empty; the service fills it in.
    pub year: &'a str,
}

impl<'a> EnrichmentQuery<'a> {
    pub fn from_record(record: &'a TrackRecord) -> Self {
        Self {
            title: &record.title,
            artist: &record.artist,
            album: &record.album,
            year: "",
        }
    }
}

/// Serializes the query payload for `record` as compact JSON.
pub fn build_query(record: &TrackRecord) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&EnrichmentQuery::from_record(record))
}
