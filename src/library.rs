use anyhow::Result;

use crate::models::{LibraryTrack, Playlist, Source, TrackScope};

/// Port over the music application's automation interface.
///
/// The production implementation is `apple_music::AppleMusic`; tests use the
/// generated `MockMusicLibrary`.
#[cfg_attr(test, mockall::automock)]
pub trait MusicLibrary {
    fn tracks(&self, scope: TrackScope) -> Result<Vec<LibraryTrack>>;

    /// Sets a user rating (0-100) on the track.
    fn set_rating(&self, track: &LibraryTrack, rating: i64) -> Result<()>;

    fn sources(&self) -> Result<Vec<Source>>;

    fn playlists(&self, source: &Source) -> Result<Vec<Playlist>>;

    fn create_playlist(&self, name: &str, source: &Source) -> Result<Playlist>;

    fn add_to_playlist(&self, playlist: &Playlist, track: &LibraryTrack) -> Result<()>;
}
