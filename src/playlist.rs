use anyhow::Result;
use log::info;

use crate::error::SyncError;
use crate::library::MusicLibrary;
use crate::models::{Playlist, SourceKind};

/// Finds a playlist named exactly `name` in the library source, creating it
/// there if none matches.
pub fn resolve_or_create_playlist<L: MusicLibrary + ?Sized>(
    library: &L,
    name: &str,
) -> Result<Playlist> {
    let source = library
        .sources()?
        .into_iter()
        .find(|s| s.kind == SourceKind::Library)
        .ok_or(SyncError::MissingLibrarySource)?;

    if let Some(existing) = library
        .playlists(&source)?
        .into_iter()
        .find(|p| p.name == name)
    {
        info!("Using existing playlist {}", name);
        return Ok(existing);
    }

    info!("Creating playlist {} in {}", name, source.name);
    library.create_playlist(name, &source)
}
