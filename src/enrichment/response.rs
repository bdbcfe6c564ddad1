//! Raw model reply shapes and the tolerant year parser.

use serde::Deserialize;

const MAX_SNIPPET_CHARS: usize = 120;

/// Reply body of a `generateContent` call, reduced to what the parser reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One content part. Anything that is not plain text lands in `Other`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    Other(serde_json::Value),
}

/// The service's answer for one track.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InferredTag {
    pub year: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseParseError {
    #[error("no candidates returned")]
    NoCandidates,
    #[error("no parts returned")]
    NoParts,
    #[error("first part is not text")]
    NonTextPart,
    #[error("no json returned ({text}): {source}")]
    InvalidJson {
        text: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("returned year is empty")]
    EmptyYear,
}

fn snippet(text: &str) -> String {
    text.chars().take(MAX_SNIPPET_CHARS).collect()
}

/// Extracts the year from the first candidate's first part.
///
/// The part must be text which, once trimmed, is exactly one JSON object of
/// the form `{"year": "..."}`.
pub fn parse_inferred_tag(
    response: &GenerateContentResponse,
) -> Result<InferredTag, ResponseParseError> {
    let candidate = response
        .candidates
        .first()
        .ok_or(ResponseParseError::NoCandidates)?;
    let part = candidate
        .content
        .as_ref()
        .and_then(|content| content.parts.first())
        .ok_or(ResponseParseError::NoParts)?;
    let Part::Text { text } = part else {
        return Err(ResponseParseError::NonTextPart);
    };

    let trimmed = text.trim();
    let parsed: InferredTag =
        serde_json::from_str(trimmed).map_err(|source| ResponseParseError::InvalidJson {
            text: snippet(trimmed),
            source,
        })?;
    let year = parsed.year.trim();
    if year.is_empty() {
        return Err(ResponseParseError::EmptyYear);
    }

    Ok(InferredTag {
        year: year.to_string(),
    })
}
