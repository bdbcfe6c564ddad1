use std::path::{Path, PathBuf};

use log::debug;

/// Only files with exactly this extension are picked up (case-sensitive).
pub const SUPPORTED_AUDIO_EXTENSION: &str = "mp3";

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("directory {0} does not exist")]
    NotFound(PathBuf),
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == SUPPORTED_AUDIO_EXTENSION)
        .unwrap_or(false)
}

fn walk_error(path: &Path, source: std::io::Error) -> DiscoveryError {
    DiscoveryError::Walk {
        path: path.to_path_buf(),
        source,
    }
}

/// Lists every supported audio file below `root`, depth first.
///
/// Entries within one directory are visited in lexical order. Any I/O error
/// hit while walking aborts the whole listing.
pub fn list_candidates(root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let root_metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(DiscoveryError::NotFound(root.to_path_buf()));
        }
        Err(err) => return Err(walk_error(root, err)),
    };
    if !root_metadata.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }

    let mut pending_directories = vec![root.to_path_buf()];
    let mut tracks = Vec::new();

    while let Some(directory) = pending_directories.pop() {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&directory).map_err(|err| walk_error(&directory, err))? {
            let entry = entry.map_err(|err| walk_error(&directory, err))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|err| walk_error(&path, err))?;
            entries.push((path, file_type));
        }
        entries.sort_unstable_by(|left, right| left.0.cmp(&right.0));

        let mut subdirectories = Vec::new();
        for (path, file_type) in entries {
            if file_type.is_dir() {
                subdirectories.push(path);
                continue;
            }

            if file_type.is_file() && is_supported_audio_file(&path) {
                tracks.push(path);
            }
        }
        // Reversed so the lexically first subdirectory is popped next.
        pending_directories.extend(subdirectories.into_iter().rev());
    }

    debug!("Discovered {} audio files under {}", tracks.len(), root.display());
    Ok(tracks)
}
