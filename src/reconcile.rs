use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fmt;
use std::io::Write;

use crate::error::SyncError;
use crate::library::MusicLibrary;
use crate::metadata::{TagFile, TagStore};
use crate::models::{LibraryTrack, Playlist, TrackKind, TrackScope};
use crate::playlist::resolve_or_create_playlist;
use crate::rating::{library_percentage, percentage_from_fraction, stars_for, RatingCodec, Stars};

/// What a run is allowed to look at and change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOptions {
    pub scope_selected: bool,
    pub dry_run: bool,
    /// On conflicting ratings the tag wins instead of the library.
    pub force_update: bool,
    pub dump: bool,
    pub sync_ratings: bool,
    pub sync_tags: bool,
    pub playlist: Option<String>,
    /// Touch the playlist even when `dry_run` is set.
    pub playlist_in_dry_run: bool,
    pub skip_unsupported: bool,
}

impl SyncOptions {
    pub fn scope(&self) -> TrackScope {
        if self.scope_selected {
            TrackScope::Selected
        } else {
            TrackScope::All
        }
    }

    fn playlist_enabled(&self) -> bool {
        !self.dry_run || self.playlist_in_dry_run
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub processed: usize,
    pub skipped: usize,
    pub unsupported: usize,
    pub library_updates: usize,
    pub tag_updates: usize,
    pub playlist_additions: usize,
    pub text_mismatches: usize,
    pub tags_saved: usize,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} library ratings, {} tag ratings, {} added to playlist, {} text mismatches",
            self.processed,
            self.skipped + self.unsupported,
            self.library_updates,
            self.tag_updates,
            self.playlist_additions,
            self.text_mismatches
        )
    }
}

/// Which side gets overwritten when the star buckets differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    TagToLibrary,
    LibraryToTag,
}

pub struct Reconciler<'a, L: MusicLibrary, T: TagStore, W: Write> {
    library: &'a L,
    tags: &'a T,
    options: &'a SyncOptions,
    out: W,
    playlist: Option<Playlist>,
    summary: SyncSummary,
}

impl<'a, L: MusicLibrary, T: TagStore, W: Write> Reconciler<'a, L, T, W> {
    pub fn new(library: &'a L, tags: &'a T, options: &'a SyncOptions, out: W) -> Self {
        Self {
            library,
            tags,
            options,
            out,
            playlist: None,
            summary: SyncSummary::default(),
        }
    }

    /// One pass over the configured tracks. Any error aborts the pass.
    pub fn run(mut self) -> Result<SyncSummary> {
        let scope = self.options.scope();
        let tracks = self.library.tracks(scope)?;
        writeln!(self.out, "Processing {} tracks", tracks.len())?;
        if self.options.dry_run {
            writeln!(self.out, "Dry run: no changes will be written")?;
        }
        info!("Processing {} {} tracks", tracks.len(), scope.as_str());

        if let Some(name) = &self.options.playlist {
            if self.options.playlist_enabled() {
                self.playlist = Some(resolve_or_create_playlist(self.library, name)?);
            } else {
                writeln!(self.out, "Dry run: playlist {name} left untouched")?;
            }
        }

        for track in &tracks {
            self.process_track(track)?;
        }

        writeln!(self.out, "Done: {}", self.summary)?;
        info!("Sync finished: {}", self.summary);
        Ok(self.summary)
    }

    fn process_track(&mut self, track: &LibraryTrack) -> Result<()> {
        if track.kind != TrackKind::File {
            debug!("Skipping {:?} track {}", track.kind, track.label());
            self.summary.skipped += 1;
            return Ok(());
        }
        let Some(path) = track.location.as_deref() else {
            warn!("{}: no file location, skipping", track.label());
            self.summary.skipped += 1;
            return Ok(());
        };

        let mut tag = self.tags.open(path)?;
        self.summary.processed += 1;

        let codec = RatingCodec::for_format(&tag.audio_format().short_name);
        let tag_rating = if self.options.sync_ratings || self.options.dump {
            self.read_tag_rating(codec, &*tag)?
        } else {
            None
        };

        let mut tag_changed = false;
        if self.options.sync_ratings {
            if let Some(fraction) = tag_rating {
                tag_changed = self.sync_rating(track, &mut *tag, codec, fraction)?;
            }
        }

        if self.options.sync_tags {
            self.compare_text(track, &*tag)?;
        }

        if self.options.dump {
            // Show the rating the file is about to be saved with
            let dump_rating = if tag_changed {
                Some(codec.read(&*tag)?)
            } else {
                tag_rating
            };
            let stars = dump_rating
                .map(|fraction| stars_for(percentage_from_fraction(Some(fraction))))
                .transpose()
                .with_context(|| format!("Bad rating in {}", path.display()))?;
            dump_tag(&mut self.out, &*tag, stars)?;
        }

        if tag_changed {
            tag.save()?;
            self.summary.tags_saved += 1;
            debug!("Saved tag of {}", path.display());
        }
        Ok(())
    }

    /// `Ok(None)` only when the format is unsupported and skipping is allowed.
    fn read_tag_rating(&mut self, codec: RatingCodec, tag: &dyn TagFile) -> Result<Option<f32>> {
        match codec.read(tag) {
            Ok(fraction) => Ok(Some(fraction)),
            Err(err @ SyncError::UnsupportedFormat { .. }) if self.options.skip_unsupported => {
                warn!("{}, skipping rating", err);
                self.summary.unsupported += 1;
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns whether the in-memory tag was modified.
    fn sync_rating(
        &mut self,
        track: &LibraryTrack,
        tag: &mut dyn TagFile,
        codec: RatingCodec,
        tag_fraction: f32,
    ) -> Result<bool> {
        let library_rating = library_percentage(track);
        let tag_rating = percentage_from_fraction(Some(tag_fraction));

        let library_stars = stars_for(library_rating)
            .with_context(|| format!("Bad library rating for {}", track.label()))?;
        let tag_stars = stars_for(tag_rating)
            .with_context(|| format!("Bad tag rating in {}", tag.path().display()))?;

        if library_stars == tag_stars {
            return Ok(false);
        }

        let label = track.label();
        let direction = if library_stars == Stars::None {
            writeln!(self.out, "{label}: set library rating to {tag_stars}")?;
            Direction::TagToLibrary
        } else if tag_stars == Stars::None {
            writeln!(self.out, "{label}: set tag rating to {library_stars}")?;
            Direction::LibraryToTag
        } else if self.options.force_update {
            writeln!(
                self.out,
                "{label}: update library rating {library_stars} => {tag_stars}"
            )?;
            Direction::TagToLibrary
        } else {
            writeln!(
                self.out,
                "{label}: update tag rating {tag_stars} => {library_stars}"
            )?;
            Direction::LibraryToTag
        };

        let mut tag_changed = false;
        match direction {
            Direction::TagToLibrary => {
                self.summary.library_updates += 1;
                if !self.options.dry_run {
                    self.library.set_rating(track, tag_rating)?;
                }
            }
            Direction::LibraryToTag => {
                self.summary.tag_updates += 1;
                if !self.options.dry_run {
                    codec.write(tag, library_rating)?;
                    tag_changed = true;
                }
            }
        }

        if let Some(playlist) = &self.playlist {
            self.library.add_to_playlist(playlist, track)?;
            self.summary.playlist_additions += 1;
        }

        Ok(tag_changed)
    }

    /// Reports title/artist differences. Text fields are never rewritten.
    fn compare_text(&mut self, track: &LibraryTrack, tag: &dyn TagFile) -> Result<()> {
        let label = track.label();
        let tag_title = tag.title().unwrap_or_default();
        if track.name != tag_title {
            writeln!(
                self.out,
                "{label}: tag title '{tag_title}' differs from library '{}'",
                track.name
            )?;
            self.summary.text_mismatches += 1;
        }

        let library_artist = track.artist.clone().unwrap_or_default();
        let tag_artist = tag.artist().unwrap_or_default();
        if library_artist != tag_artist {
            writeln!(
                self.out,
                "{label}: tag artist '{tag_artist}' differs from library '{library_artist}'"
            )?;
            self.summary.text_mismatches += 1;
        }
        Ok(())
    }
}

/// Prints everything known about a tag: path, formats, rating and raw fields.
pub fn dump_tag<W: Write + ?Sized>(
    out: &mut W,
    tag: &dyn TagFile,
    stars: Option<Stars>,
) -> Result<()> {
    let format = tag.audio_format();
    writeln!(out, "File path: {}", tag.path().display())?;
    writeln!(out, "Audio format: {} ({})", format.name, format.short_name)?;
    match stars {
        Some(stars) => writeln!(out, "Rating: {stars}")?,
        None => writeln!(out, "Rating: n/a (unsupported format)")?,
    }
    for metadata in tag.metadata_formats() {
        writeln!(
            out,
            "Metadata format: {} (short: {})",
            metadata.name, metadata.short_name
        )?;
    }
    for (key, value) in tag.additional_fields() {
        writeln!(out, "[{key}]: {value}")?;
    }
    Ok(())
}
