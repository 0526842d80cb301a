use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Rating must be between 0 and 100, got {0}")]
    RatingOutOfRange(i64),

    #[error("Unsupported file format '{format}': {}", path.display())]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("Invalid RATING field '{value}' in {}", path.display())]
    InvalidRatingField { path: PathBuf, value: String },

    #[error("{tag_type} tag in {} cannot hold {field}", path.display())]
    FieldRejected {
        path: PathBuf,
        field: String,
        tag_type: String,
    },

    #[error("Could not find library source")]
    MissingLibrarySource,

    #[error("Track not found in Music: {0}")]
    TrackNotFound(String),

    #[error("Music automation is only available on macOS")]
    UnsupportedPlatform,
}
