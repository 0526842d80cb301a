use serde::Deserialize;
use std::path::PathBuf;

/// Which part of the library a run walks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackScope {
    All,
    Selected,
}

impl TrackScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackScope::All => "all",
            TrackScope::Selected => "selected",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    File,
    Url,
    Shared,
    Cd,
    #[serde(other)]
    Other,
}

/// Where a library rating came from. Only `User` ratings are compared.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RatingKind {
    User,
    Computed,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LibraryTrack {
    pub persistent_id: String, // Music's Persistent ID
    pub kind: TrackKind,
    pub location: Option<PathBuf>,
    pub name: String,
    pub artist: Option<String>,
    pub rating: i64, // 0-100
    pub rating_kind: RatingKind,
}

impl LibraryTrack {
    /// "Artist - Name", the prefix of every report line.
    pub fn label(&self) -> String {
        format!("{} - {}", self.artist.as_deref().unwrap_or(""), self.name)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Library,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub kind: SourceKind,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Playlist {
    pub persistent_id: String,
    pub name: String,
}
