use std::fmt;

use crate::error::SyncError;
use crate::metadata::TagFile;
use crate::models::{LibraryTrack, RatingKind};

pub const NO_RATING: &str = "☆☆☆☆☆";

/// Name of the field MPEG-4 files keep their 0-5 rating in.
pub const MP4_RATING_FIELD: &str = "RATING";

/// Five-level star scale shared by both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stars {
    None,
    One,
    Two,
    Three,
    Four,
    Five,
}

impl Stars {
    pub fn count(&self) -> u8 {
        match self {
            Stars::None => 0,
            Stars::One => 1,
            Stars::Two => 2,
            Stars::Three => 3,
            Stars::Four => 4,
            Stars::Five => 5,
        }
    }
}

impl fmt::Display for Stars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stars::None => f.write_str(NO_RATING),
            stars => f.write_str(&"★".repeat(stars.count() as usize)),
        }
    }
}

/// Buckets a 0-100 percentage: [0,10) none, [10,30) one star, ... [90,100] five.
pub fn stars_for(percentage: i64) -> Result<Stars, SyncError> {
    Ok(match percentage {
        p if p < 0 => return Err(SyncError::RatingOutOfRange(p)),
        p if p < 10 => Stars::None,
        p if p < 30 => Stars::One,
        p if p < 50 => Stars::Two,
        p if p < 70 => Stars::Three,
        p if p < 90 => Stars::Four,
        p if p <= 100 => Stars::Five,
        p => return Err(SyncError::RatingOutOfRange(p)),
    })
}

/// Truncating conversion of a 0.0-1.0 fraction; a missing value counts as 0.
pub fn percentage_from_fraction(fraction: Option<f32>) -> i64 {
    (fraction.unwrap_or(0.0) * 100.0) as i64
}

pub fn fraction_from_percentage(percentage: i64) -> f32 {
    percentage as f32 / 100.0
}

/// Library-side rating as a percentage. Album-derived ratings count as unrated.
pub fn library_percentage(track: &LibraryTrack) -> i64 {
    match track.rating_kind {
        RatingKind::User => track.rating,
        RatingKind::Computed => 0,
    }
}

/// How a given audio format stores its rating in the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingCodec {
    /// MPEG-4: 0-5 scale in the `RATING` freeform field.
    Mp4Field,
    /// MPEG (mp3): normalized popularity.
    Popularity,
    Unsupported,
}

impl RatingCodec {
    pub fn for_format(short_name: &str) -> Self {
        match short_name {
            "MPEG-4" => RatingCodec::Mp4Field,
            "MPEG" => RatingCodec::Popularity,
            _ => RatingCodec::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != RatingCodec::Unsupported
    }

    /// Reads the tag-side rating as a 0.0-1.0 fraction.
    pub fn read(&self, tag: &dyn TagFile) -> Result<f32, SyncError> {
        match self {
            RatingCodec::Mp4Field => match tag.additional_field(MP4_RATING_FIELD) {
                Some(value) => value
                    .trim()
                    .parse::<f64>()
                    .map(|stars| (stars / 5.0) as f32)
                    .map_err(|_| SyncError::InvalidRatingField {
                        path: tag.path().to_path_buf(),
                        value,
                    }),
                None => Ok(0.0),
            },
            RatingCodec::Popularity => Ok(tag.popularity().unwrap_or(0.0)),
            RatingCodec::Unsupported => Err(unsupported(tag)),
        }
    }

    /// Writes a 0-100 library percentage into the tag. Does not save.
    pub fn write(&self, tag: &mut dyn TagFile, percentage: i64) -> Result<(), SyncError> {
        match self {
            RatingCodec::Mp4Field => {
                tag.set_additional_field(MP4_RATING_FIELD, (percentage / 20).to_string())
            }
            RatingCodec::Popularity => tag.set_popularity(fraction_from_percentage(percentage)),
            RatingCodec::Unsupported => Err(unsupported(tag)),
        }
    }
}

fn unsupported(tag: &dyn TagFile) -> SyncError {
    SyncError::UnsupportedFormat {
        path: tag.path().to_path_buf(),
        format: tag.audio_format().short_name,
    }
}
