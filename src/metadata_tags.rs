//! ID3v2 tag reader/writer backed by `lofty`.

use std::path::{Path, PathBuf};

use lofty::config::{ParseOptions, ParsingMode, WriteOptions};
use lofty::error::LoftyError;
use lofty::file::{AudioFile, TaggedFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag, TagType};
use log::debug;

/// Known tag state of one audio file, held in memory for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackRecord {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Empty when the release year is unknown.
    pub year: String,
    pub path: PathBuf,
}

impl TrackRecord {
    pub fn is_missing_year(&self) -> bool {
        self.year.trim().is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to read tags from {path}: {source}")]
pub struct TagReadError {
    pub path: PathBuf,
    #[source]
    pub source: LoftyError,
}

#[derive(Debug, thiserror::Error)]
pub enum TagWriteError {
    #[error("refusing to write an empty year to {0}")]
    EmptyYear(PathBuf),
    #[error("failed to reopen {path} for writing: {source}")]
    Reopen {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },
    #[error("no writable ID3v2 tag available for {0}")]
    Unsupported(PathBuf),
    #[error("failed to save tags to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },
}

fn tag_parse_options(read_cover_art: bool) -> ParseOptions {
    ParseOptions::new()
        .read_properties(false)
        .read_cover_art(read_cover_art)
        .parsing_mode(ParsingMode::BestAttempt)
}

// `Probe` owns the only file handle and is consumed by `read`, so the handle
// is closed before this returns on both the success and error paths.
fn read_tagged_file(path: &Path, read_cover_art: bool) -> Result<TaggedFile, LoftyError> {
    Probe::open(path)?
        .options(tag_parse_options(read_cover_art))
        .read()
}

fn trimmed_value<F>(tag: Option<&Tag>, extractor: F) -> String
where
    F: Fn(&Tag) -> Option<String>,
{
    tag.and_then(extractor)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// Reads title/artist/album/year from the file's ID3v2 tag.
///
/// A readable file without an ID3v2 block yields a record whose fields are all
/// empty.
pub fn read_track_record(path: &Path) -> Result<TrackRecord, TagReadError> {
    let tagged_file = read_tagged_file(path, false).map_err(|source| TagReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let tag = tagged_file.tag(TagType::Id3v2);
    if tag.is_none() {
        debug!("No ID3v2 tag present in {}", path.display());
    }

    let title = trimmed_value(tag, |tag| tag.title().map(|value| value.into_owned()));
    let artist = trimmed_value(tag, |tag| tag.artist().map(|value| value.into_owned()));
    let album = trimmed_value(tag, |tag| tag.album().map(|value| value.into_owned()));
    let year = trimmed_value(tag, |tag| {
        tag.get_string(ItemKey::Year)
            .filter(|value| !value.trim().is_empty())
            .or_else(|| tag.get_string(ItemKey::RecordingDate))
            .map(str::to_string)
    });

    Ok(TrackRecord {
        title,
        artist,
        album,
        year,
        path: path.to_path_buf(),
    })
}

/// Replaces the year of the file's ID3v2 tag, creating the tag if needed.
///
/// Every other item of the tag, cover art included, is written back unchanged.
pub fn write_track_year(path: &Path, year: &str) -> Result<(), TagWriteError> {
    let year = year.trim();
    if year.is_empty() {
        return Err(TagWriteError::EmptyYear(path.to_path_buf()));
    }

    let mut tagged_file = read_tagged_file(path, true).map_err(|source| TagWriteError::Reopen {
        path: path.to_path_buf(),
        source,
    })?;
    if tagged_file.tag(TagType::Id3v2).is_none() {
        tagged_file.insert_tag(Tag::new(TagType::Id3v2));
    }

    let tag = tagged_file
        .tag_mut(TagType::Id3v2)
        .ok_or_else(|| TagWriteError::Unsupported(path.to_path_buf()))?;
    tag.remove_key(ItemKey::Year);
    tag.remove_key(ItemKey::RecordingDate);
    if !tag.insert_text(ItemKey::RecordingDate, year.to_string()) {
        return Err(TagWriteError::Unsupported(path.to_path_buf()));
    }

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .map_err(|source| TagWriteError::Save {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Wrote year {} to {}", year, path.display());
    Ok(())
}
