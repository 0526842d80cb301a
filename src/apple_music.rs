use anyhow::{Context, Result};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

use crate::error::SyncError;
use crate::library::MusicLibrary;
use crate::models::{LibraryTrack, Playlist, RatingKind, Source, TrackKind, TrackScope};

const CONNECT_SCRIPT: &str = r#"
function run(argv) {
    const app = Application('Music');
    if (!app.running()) app.launch();
    return app.version();
}
"#;

// Property reads are batched per track so one osascript call covers the run.
const TRACKS_SCRIPT: &str = r#"
function run(argv) {
    const app = Application('Music');
    const tracks = argv[0] === 'selected' ? app.selection() : app.libraryPlaylists[0].tracks();
    const kinds = { fileTrack: 'file', urlTrack: 'url', sharedTrack: 'shared', audioCDTrack: 'cd' };

    return JSON.stringify(tracks.map(function (t) {
        const cls = t.class();
        let location = null;
        if (cls === 'fileTrack') {
            try {
                const loc = t.location();
                location = loc ? loc.toString() : null;
            } catch (e) {
                // File missing on disk
            }
        }
        return {
            persistentId: t.persistentID(),
            kind: kinds[cls] || cls,
            location: location,
            name: t.name(),
            artist: t.artist(),
            rating: t.rating(),
            ratingKind: t.ratingKind()
        };
    }));
}
"#;

const SET_RATING_SCRIPT: &str = r#"
function run(argv) {
    const app = Application('Music');
    const tracks = app.tracks.whose({ persistentID: argv[0] });
    if (tracks.length === 0) return 'missing';
    tracks[0].rating = Number(argv[1]);
    return 'ok';
}
"#;

const SOURCES_SCRIPT: &str = r#"
function run(argv) {
    const app = Application('Music');
    return JSON.stringify(app.sources().map(function (s) {
        return { id: s.id(), name: s.name(), kind: s.kind() };
    }));
}
"#;

const PLAYLISTS_SCRIPT: &str = r#"
function run(argv) {
    const app = Application('Music');
    const source = app.sources.byId(Number(argv[0]));
    return JSON.stringify(source.userPlaylists().map(function (p) {
        return { persistentId: p.persistentID(), name: p.name() };
    }));
}
"#;

const CREATE_PLAYLIST_SCRIPT: &str = r#"
function run(argv) {
    const app = Application('Music');
    const source = app.sources.byId(Number(argv[1]));
    const p = app.make({ new: 'userPlaylist', at: source, withProperties: { name: argv[0] } });
    return JSON.stringify({ persistentId: p.persistentID(), name: p.name() });
}
"#;

const ADD_TO_PLAYLIST_SCRIPT: &str = r#"
function run(argv) {
    const app = Application('Music');
    const playlists = app.userPlaylists.whose({ persistentID: argv[0] });
    const tracks = app.tracks.whose({ persistentID: argv[1] });
    if (playlists.length === 0 || tracks.length === 0) return 'missing';
    app.duplicate(tracks[0], { to: playlists[0] });
    return 'ok';
}
"#;

/// Track as emitted by `TRACKS_SCRIPT`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalTrack {
    persistent_id: String,
    kind: TrackKind,
    location: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    rating: i64,
    rating_kind: RatingKind,
}

impl ExternalTrack {
    fn into_track(self) -> LibraryTrack {
        LibraryTrack {
            persistent_id: self.persistent_id,
            kind: self.kind,
            location: self.location.as_deref().map(decode_location),
            name: self.name.unwrap_or_default(),
            artist: self.artist.filter(|a| !a.is_empty()),
            rating: self.rating,
            rating_kind: self.rating_kind,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalPlaylist {
    persistent_id: String,
    name: String,
}

impl From<ExternalPlaylist> for Playlist {
    fn from(p: ExternalPlaylist) -> Self {
        Playlist {
            persistent_id: p.persistent_id,
            name: p.name,
        }
    }
}

/// Handle to a running Music app, driven through JavaScript for Automation.
pub struct AppleMusic {
    version: String,
}

impl AppleMusic {
    /// Launches Music if needed. Every later call goes to the same app.
    pub fn connect() -> Result<Self> {
        let version = run_jxa(CONNECT_SCRIPT, &[]).context("Failed to connect to Music")?;
        info!("Connected to Music {}", version);
        Ok(Self { version })
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl MusicLibrary for AppleMusic {
    fn tracks(&self, scope: TrackScope) -> Result<Vec<LibraryTrack>> {
        let raw = run_jxa(TRACKS_SCRIPT, &[scope.as_str()])
            .with_context(|| format!("Failed to list {} tracks", scope.as_str()))?;
        parse_tracks(&raw)
    }

    fn set_rating(&self, track: &LibraryTrack, rating: i64) -> Result<()> {
        debug!("Setting rating of {} to {}", track.persistent_id, rating);
        let rating = rating.to_string();
        let status = run_jxa(SET_RATING_SCRIPT, &[track.persistent_id.as_str(), rating.as_str()])
            .with_context(|| format!("Failed to set rating of {}", track.label()))?;
        expect_ok(&status, &track.persistent_id)
    }

    fn sources(&self) -> Result<Vec<Source>> {
        let raw = run_jxa(SOURCES_SCRIPT, &[]).context("Failed to list sources")?;
        parse_json(&raw, "sources")
    }

    fn playlists(&self, source: &Source) -> Result<Vec<Playlist>> {
        let source_id = source.id.to_string();
        let raw = run_jxa(PLAYLISTS_SCRIPT, &[source_id.as_str()])
            .with_context(|| format!("Failed to list playlists of {}", source.name))?;
        let playlists: Vec<ExternalPlaylist> = parse_json(&raw, "playlists")?;
        Ok(playlists.into_iter().map(Playlist::from).collect())
    }

    fn create_playlist(&self, name: &str, source: &Source) -> Result<Playlist> {
        let source_id = source.id.to_string();
        let raw = run_jxa(CREATE_PLAYLIST_SCRIPT, &[name, source_id.as_str()])
            .with_context(|| format!("Failed to create playlist {name}"))?;
        let playlist: ExternalPlaylist = parse_json(&raw, "playlist")?;
        Ok(playlist.into())
    }

    fn add_to_playlist(&self, playlist: &Playlist, track: &LibraryTrack) -> Result<()> {
        let status = run_jxa(
            ADD_TO_PLAYLIST_SCRIPT,
            &[playlist.persistent_id.as_str(), track.persistent_id.as_str()],
        )
        .with_context(|| format!("Failed to add {} to {}", track.label(), playlist.name))?;
        expect_ok(&status, &track.persistent_id)
    }
}

fn parse_tracks(raw: &str) -> Result<Vec<LibraryTrack>> {
    let tracks: Vec<ExternalTrack> = parse_json(raw, "tracks")?;
    Ok(tracks.into_iter().map(ExternalTrack::into_track).collect())
}

fn parse_json<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("Failed to parse {what} returned by Music"))
}

fn expect_ok(status: &str, persistent_id: &str) -> Result<()> {
    if status == "ok" {
        Ok(())
    } else {
        Err(SyncError::TrackNotFound(persistent_id.to_string()).into())
    }
}

/// Music reports POSIX paths, but older libraries hand back `file://` URLs.
fn decode_location(location: &str) -> PathBuf {
    if location.starts_with("file://") {
        if let Some(path) = Url::parse(location).ok().and_then(|url| url.to_file_path().ok()) {
            return path;
        }
    }
    PathBuf::from(location)
}

#[cfg(target_os = "macos")]
fn run_jxa(script: &str, args: &[&str]) -> Result<String> {
    use std::process::Command;

    let output = Command::new("osascript")
        .arg("-l")
        .arg("JavaScript")
        .arg("-e")
        .arg(script)
        .args(args)
        .output()
        .context("Failed to run osascript")?;

    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow::anyhow!("JXA script failed: {}", err.trim()));
    }

    let stdout = String::from_utf8(output.stdout).context("osascript output is not UTF-8")?;
    Ok(stdout.trim().to_string())
}

#[cfg(not(target_os = "macos"))]
fn run_jxa(_script: &str, _args: &[&str]) -> Result<String> {
    Err(SyncError::UnsupportedPlatform.into())
}
