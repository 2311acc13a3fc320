use thiserror::Error;

/// Failure taxonomy for a cast load.
///
/// Only `MissingArchive`, `MalformedHeader` and `Io` (while reading the
/// header) abort a load. Per-entry and per-line failures are absorbed
/// where they occur and surfaced through `log::warn!`, so a library with
/// one corrupt member still loads the rest.
#[derive(Debug, Error)]
pub enum CastError {
    #[error("no archive bound to cast library")]
    MissingArchive,

    #[error("config record too short: {len} bytes")]
    MalformedHeader { len: usize },

    #[error("malformed cast entry {id}: {reason}")]
    MalformedEntry { id: u16, reason: String },

    #[error("malformed font map line: {line:?}")]
    MalformedFontLine { line: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CastError {
    pub fn entry(id: u16, reason: impl Into<String>) -> CastError {
        CastError::MalformedEntry {
            id,
            reason: reason.into(),
        }
    }
}
