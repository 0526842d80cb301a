use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::SyncError;
use crate::metadata::{FormatInfo, TagFile, TagStore};
use crate::models::{LibraryTrack, RatingKind, TrackKind};

pub fn file_track(id: &str, path: &str, rating: i64) -> LibraryTrack {
    LibraryTrack {
        persistent_id: id.to_string(),
        kind: TrackKind::File,
        location: Some(PathBuf::from(path)),
        name: format!("Song {id}"),
        artist: Some("Artist".to_string()),
        rating,
        rating_kind: RatingKind::User,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeTagData {
    pub format: FormatInfo,
    pub metadata_formats: Vec<FormatInfo>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub popularity: Option<f32>,
    pub fields: Vec<(String, String)>,
    pub saves: usize,
    /// Setters fail the way lofty does for a tag that cannot hold the item.
    pub read_only: bool,
}

impl FakeTagData {
    fn with_format(format: FormatInfo, metadata: FormatInfo) -> Self {
        Self {
            format,
            metadata_formats: vec![metadata],
            title: None,
            artist: None,
            popularity: None,
            fields: Vec::new(),
            saves: 0,
            read_only: false,
        }
    }

    pub fn mp4() -> Self {
        Self::with_format(
            FormatInfo::new("MPEG-4", "MPEG-4 Part 14"),
            FormatInfo::new("ilst", "MPEG-4 ilst atom"),
        )
    }

    pub fn mpeg() -> Self {
        Self::with_format(
            FormatInfo::new("MPEG", "MPEG Audio"),
            FormatInfo::new("ID3v2", "ID3v2.4"),
        )
    }

    pub fn flac() -> Self {
        Self::with_format(
            FormatInfo::new("FLAC", "Free Lossless Audio Codec"),
            FormatInfo::new("Vorbis", "Vorbis Comments"),
        )
    }

    pub fn with_field(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_popularity(mut self, popularity: f32) -> Self {
        self.popularity = Some(popularity);
        self
    }

    pub fn rejecting_writes(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_text(mut self, title: &str, artist: &str) -> Self {
        self.title = Some(title.to_string());
        self.artist = Some(artist.to_string());
        self
    }
}

type Files = Rc<RefCell<HashMap<PathBuf, FakeTagData>>>;

/// In-memory `TagStore`; saved tags are written back into the shared map.
#[derive(Clone, Default)]
pub struct FakeTagStore {
    files: Files,
    opened: Rc<Cell<usize>>,
}

impl FakeTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, data: FakeTagData) {
        self.files.borrow_mut().insert(PathBuf::from(path), data);
    }

    pub fn get(&self, path: &str) -> FakeTagData {
        self.files.borrow()[Path::new(path)].clone()
    }

    pub fn opened(&self) -> usize {
        self.opened.get()
    }
}

impl TagStore for FakeTagStore {
    fn open(&self, path: &Path) -> Result<Box<dyn TagFile>> {
        self.opened.set(self.opened.get() + 1);
        let data = self
            .files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("No such file: {}", path.display()))?;
        Ok(Box::new(FakeTagFile {
            path: path.to_path_buf(),
            data,
            files: self.files.clone(),
        }))
    }
}

pub struct FakeTagFile {
    path: PathBuf,
    data: FakeTagData,
    files: Files,
}

impl FakeTagFile {
    pub fn new(path: &str, data: FakeTagData) -> Self {
        Self {
            path: PathBuf::from(path),
            data,
            files: Files::default(),
        }
    }
}

impl FakeTagFile {
    fn check_writable(&self, field: &str) -> Result<(), SyncError> {
        if self.data.read_only {
            return Err(SyncError::FieldRejected {
                path: self.path.clone(),
                field: field.to_string(),
                tag_type: self.data.format.short_name.clone(),
            });
        }
        Ok(())
    }
}

impl TagFile for FakeTagFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn audio_format(&self) -> FormatInfo {
        self.data.format.clone()
    }

    fn metadata_formats(&self) -> Vec<FormatInfo> {
        self.data.metadata_formats.clone()
    }

    fn title(&self) -> Option<String> {
        self.data.title.clone()
    }

    fn artist(&self) -> Option<String> {
        self.data.artist.clone()
    }

    fn popularity(&self) -> Option<f32> {
        self.data.popularity
    }

    fn set_popularity(&mut self, popularity: f32) -> Result<(), SyncError> {
        self.check_writable("POPM")?;
        self.data.popularity = Some(popularity);
        Ok(())
    }

    fn additional_fields(&self) -> Vec<(String, String)> {
        self.data.fields.clone()
    }

    fn set_additional_field(&mut self, key: &str, value: String) -> Result<(), SyncError> {
        self.check_writable(key)?;
        match self.data.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.data.fields.push((key.to_string(), value)),
        }
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        self.data.saves += 1;
        self.files
            .borrow_mut()
            .insert(self.path.clone(), self.data.clone());
        Ok(())
    }
}
