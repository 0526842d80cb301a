use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::file::FileType;
use lofty::prelude::*;
use lofty::read_from_path;
use lofty::tag::{ItemKey, ItemValue, Tag, TagItem, TagType};
use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::rating::{percentage_from_fraction, stars_for, Stars};

/// iTunes-style freeform atoms are exposed without this prefix.
const MP4_FREEFORM_PREFIX: &str = "----:com.apple.iTunes:";

/// Owner written into new POPM frames.
const POPM_EMAIL: &str = "Windows Media Player 9 Series";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    pub short_name: String,
    pub name: String,
}

impl FormatInfo {
    pub fn new(short_name: &str, name: &str) -> Self {
        Self {
            short_name: short_name.to_string(),
            name: name.to_string(),
        }
    }
}

/// An audio file's tag loaded into memory. Setters only touch the in-memory
/// copy until `save` is called.
pub trait TagFile {
    fn path(&self) -> &Path;
    fn audio_format(&self) -> FormatInfo;
    /// Every tag container present in the file (ID3v2, ilst, ...).
    fn metadata_formats(&self) -> Vec<FormatInfo>;
    fn title(&self) -> Option<String>;
    fn artist(&self) -> Option<String>;
    /// Normalized 0.0-1.0 popularity, if the format has one.
    fn popularity(&self) -> Option<f32>;
    fn set_popularity(&mut self, popularity: f32) -> Result<(), SyncError>;
    /// Raw fields with no generic mapping, in tag order.
    fn additional_fields(&self) -> Vec<(String, String)>;
    fn set_additional_field(&mut self, key: &str, value: String) -> Result<(), SyncError>;
    fn save(&mut self) -> Result<()>;

    fn additional_field(&self, key: &str) -> Option<String> {
        self.additional_fields()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Opens tags by file path.
pub trait TagStore {
    fn open(&self, path: &Path) -> Result<Box<dyn TagFile>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagStore;

impl TagStore for LoftyTagStore {
    fn open(&self, path: &Path) -> Result<Box<dyn TagFile>> {
        Ok(Box::new(LoftyTagFile::read(path)?))
    }
}

pub struct LoftyTagFile {
    path: PathBuf,
    file_type: FileType,
    /// Every tag in the file as read, primary first. Text comes from here.
    tags: Vec<Tag>,
    /// The tag ratings and raw fields go to, and the one `save` writes.
    tag: Tag,
}

impl LoftyTagFile {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let tagged_file = read_from_path(path)
            .with_context(|| format!("Failed to read file {}", path.display()))?;

        let primary = tagged_file.primary_tag_type();
        let mut tags = tagged_file.tags().to_vec();
        tags.sort_by_key(|t| t.tag_type() != primary);

        // Ratings on MP3 live in ID3v2 only
        let tag = match tagged_file.file_type() {
            FileType::Mpeg => tagged_file
                .tag(TagType::Id3v2)
                .cloned()
                .unwrap_or_else(|| Tag::new(TagType::Id3v2)),
            _ => tagged_file
                .primary_tag()
                .or_else(|| tagged_file.first_tag())
                .cloned()
                .unwrap_or_else(|| Tag::new(primary)),
        };

        Ok(Self {
            path: path.to_path_buf(),
            file_type: tagged_file.file_type(),
            tags,
            tag,
        })
    }

    fn popm_frame(&self) -> Option<Vec<u8>> {
        match self.tag.get(&ItemKey::Popularimeter)?.value() {
            ItemValue::Binary(frame) => Some(frame.clone()),
            _ => None,
        }
    }

    fn rejected(&self, field: &str) -> SyncError {
        SyncError::FieldRejected {
            path: self.path.clone(),
            field: field.to_string(),
            tag_type: format!("{:?}", self.tag.tag_type()),
        }
    }
}

impl TagFile for LoftyTagFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn audio_format(&self) -> FormatInfo {
        file_format_info(self.file_type)
    }

    fn metadata_formats(&self) -> Vec<FormatInfo> {
        self.tags.iter().map(|t| tag_format_info(t.tag_type())).collect()
    }

    fn title(&self) -> Option<String> {
        self.tags
            .iter()
            .find_map(|t| t.title().map(|title| title.into_owned()))
    }

    fn artist(&self) -> Option<String> {
        self.tags
            .iter()
            .find_map(|t| t.artist().map(|artist| artist.into_owned()))
    }

    fn popularity(&self) -> Option<f32> {
        self.popm_frame()
            .as_deref()
            .and_then(popm_rating)
            .map(popm_to_fraction)
    }

    fn set_popularity(&mut self, popularity: f32) -> Result<(), SyncError> {
        if self.tag.tag_type() != TagType::Id3v2 {
            return Err(self.rejected("POPM"));
        }
        let byte = fraction_to_popm(popularity);
        let mut frame = self.popm_frame().unwrap_or_else(|| {
            let mut frame = POPM_EMAIL.as_bytes().to_vec();
            frame.push(0);
            frame
        });
        let slot = frame.iter().position(|b| *b == 0).map(|end| end + 1);
        match slot {
            Some(i) if i < frame.len() => frame[i] = byte,
            Some(_) => frame.push(byte),
            None => {
                frame.push(0);
                frame.push(byte);
            }
        }

        let item = TagItem::new(ItemKey::Popularimeter, ItemValue::Binary(frame));
        if !self.tag.insert(item) {
            return Err(self.rejected("POPM"));
        }
        Ok(())
    }

    fn additional_fields(&self) -> Vec<(String, String)> {
        self.tag
            .items()
            .filter_map(|item| match item.key() {
                ItemKey::Unknown(raw) => Some((
                    raw.strip_prefix(MP4_FREEFORM_PREFIX).unwrap_or(raw).to_string(),
                    display_value(item.value()),
                )),
                _ => None,
            })
            .collect()
    }

    fn set_additional_field(&mut self, key: &str, value: String) -> Result<(), SyncError> {
        // Unknown keys never pass `Tag::insert`; these formats store them as-is on save
        let raw = match self.tag.tag_type() {
            TagType::Mp4Ilst => format!("{MP4_FREEFORM_PREFIX}{key}"),
            TagType::Id3v2 | TagType::VorbisComments | TagType::Ape => key.to_string(),
            _ => return Err(self.rejected(key)),
        };
        self.tag
            .insert_unchecked(TagItem::new(ItemKey::Unknown(raw), ItemValue::Text(value)));
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        self.tag
            .save_to_path(&self.path, WriteOptions::default())
            .with_context(|| format!("Failed to save tags to {}", self.path.display()))
    }
}

fn display_value(value: &ItemValue) -> String {
    match value {
        ItemValue::Text(text) | ItemValue::Locator(text) => text.clone(),
        ItemValue::Binary(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

fn file_format_info(file_type: FileType) -> FormatInfo {
    match file_type {
        FileType::Mpeg => FormatInfo::new("MPEG", "MPEG Audio"),
        FileType::Mp4 => FormatInfo::new("MPEG-4", "MPEG-4 Part 14"),
        FileType::Flac => FormatInfo::new("FLAC", "Free Lossless Audio Codec"),
        FileType::Aiff => FormatInfo::new("AIFF", "Audio Interchange File Format"),
        FileType::Wav => FormatInfo::new("WAV", "Waveform Audio"),
        other => {
            let name = format!("{other:?}");
            FormatInfo::new(&name.to_uppercase(), &name)
        }
    }
}

fn tag_format_info(tag_type: TagType) -> FormatInfo {
    match tag_type {
        TagType::Id3v1 => FormatInfo::new("ID3v1", "ID3v1.1"),
        TagType::Id3v2 => FormatInfo::new("ID3v2", "ID3v2.4"),
        TagType::Mp4Ilst => FormatInfo::new("ilst", "MPEG-4 ilst atom"),
        TagType::Ape => FormatInfo::new("APE", "APEv2"),
        TagType::VorbisComments => FormatInfo::new("Vorbis", "Vorbis Comments"),
        other => {
            let name = format!("{other:?}");
            FormatInfo::new(&name, &name)
        }
    }
}

/// Rating byte of a POPM frame body (`email\0 rating counter`).
fn popm_rating(frame: &[u8]) -> Option<u8> {
    let end = frame.iter().position(|b| *b == 0)?;
    frame.get(end + 1).copied()
}

/// Windows Media Player ranges: 1-31 one star up to 224-255 five stars.
pub fn popm_to_fraction(byte: u8) -> f32 {
    let stars: u8 = match byte {
        0 => 0,
        1..=31 => 1,
        32..=95 => 2,
        96..=159 => 3,
        160..=223 => 4,
        _ => 5,
    };
    stars as f32 / 5.0
}

pub fn fraction_to_popm(fraction: f32) -> u8 {
    let percentage = percentage_from_fraction(Some(fraction)).clamp(0, 100);
    match stars_for(percentage).unwrap_or(Stars::None) {
        Stars::None => 0,
        Stars::One => 1,
        Stars::Two => 64,
        Stars::Three => 128,
        Stars::Four => 196,
        Stars::Five => 255,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::RatingCodec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn in_memory(path: &str, file_type: FileType, tag: Tag) -> LoftyTagFile {
        LoftyTagFile {
            path: PathBuf::from(path),
            file_type,
            tags: vec![tag.clone()],
            tag,
        }
    }

    /// Twenty silent MPEG-1 Layer III frames followed by an ID3v1 tag.
    fn mp3_with_id3v1(title: &str, artist: &str) -> NamedTempFile {
        let mut bytes = Vec::new();
        for _ in 0..20 {
            let mut frame = vec![0xFF, 0xFB, 0x90, 0x00];
            frame.resize(417, 0);
            bytes.extend(frame);
        }

        let field = |text: &str, len: usize| {
            let mut field = text.as_bytes().to_vec();
            field.resize(len, 0);
            field
        };
        bytes.extend(b"TAG");
        bytes.extend(field(title, 30));
        bytes.extend(field(artist, 30));
        bytes.extend(field("", 30));
        bytes.extend(field("", 4));
        bytes.extend(field("", 30));
        bytes.push(255);

        let mut file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_popm_byte_round_trip() {
        for stars in 0..=5u8 {
            let fraction = stars as f32 / 5.0;
            assert_eq!(popm_to_fraction(fraction_to_popm(fraction)), fraction);
        }
    }

    #[test]
    fn test_popm_ranges() {
        assert_eq!(popm_to_fraction(0), 0.0);
        assert_eq!(popm_to_fraction(31), 0.2);
        assert_eq!(popm_to_fraction(32), 0.4);
        assert_eq!(popm_to_fraction(196), 0.8);
        assert_eq!(popm_to_fraction(255), 1.0);
    }

    #[test]
    fn test_popm_rating_byte() {
        let mut frame = b"someone@example.com".to_vec();
        frame.extend([0, 196, 0, 0, 0, 7]);
        assert_eq!(popm_rating(&frame), Some(196));
        assert_eq!(popm_rating(b"no terminator"), None);
        assert_eq!(popm_rating(b"truncated\0"), None);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(file_format_info(FileType::Mpeg).short_name, "MPEG");
        assert_eq!(file_format_info(FileType::Mp4).short_name, "MPEG-4");
        assert_eq!(tag_format_info(TagType::Id3v2).short_name, "ID3v2");
    }

    #[test]
    fn test_read_missing_file_fails() {
        let err = LoftyTagStore
            .open(Path::new("/definitely/not/here.mp3"))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("/definitely/not/here.mp3"));
    }

    #[test]
    fn test_mp4_rating_field_is_stored_as_freeform_atom() {
        let mut file = in_memory("/m/a.m4a", FileType::Mp4, Tag::new(TagType::Mp4Ilst));

        RatingCodec::Mp4Field.write(&mut file, 80).unwrap();
        assert_eq!(file.additional_field("RATING").as_deref(), Some("4"));
        assert!(file
            .tag
            .get(&ItemKey::Unknown("----:com.apple.iTunes:RATING".to_string()))
            .is_some());
        assert_eq!(RatingCodec::Mp4Field.read(&file).unwrap(), 0.8);

        // A second write replaces the field
        RatingCodec::Mp4Field.write(&mut file, 40).unwrap();
        assert_eq!(file.additional_fields(), vec![("RATING".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_id3v2_popularity_write_then_read() {
        let mut file = in_memory("/m/a.mp3", FileType::Mpeg, Tag::new(TagType::Id3v2));
        assert_eq!(file.popularity(), None);

        RatingCodec::Popularity.write(&mut file, 80).unwrap();
        assert_eq!(popm_rating(&file.popm_frame().unwrap()), Some(196));
        assert_eq!(RatingCodec::Popularity.read(&file).unwrap(), 0.8);

        RatingCodec::Popularity.write(&mut file, 20).unwrap();
        assert_eq!(RatingCodec::Popularity.read(&file).unwrap(), 0.2);
    }

    #[test]
    fn test_tag_that_cannot_hold_the_rating_is_an_error() {
        let mut file = in_memory("/m/a.flac", FileType::Flac, Tag::new(TagType::VorbisComments));
        match file.set_popularity(0.6) {
            Err(SyncError::FieldRejected { path, field, .. }) => {
                assert_eq!(path, PathBuf::from("/m/a.flac"));
                assert_eq!(field, "POPM");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let mut file = in_memory("/m/a.mp3", FileType::Mpeg, Tag::new(TagType::Id3v1));
        let err = file.set_additional_field("RATING", "3".into()).unwrap_err();
        assert!(err.to_string().contains("/m/a.mp3"));
        assert!(file.additional_fields().is_empty());
    }

    #[test]
    fn test_id3v1_text_survives_without_id3v2() {
        let mp3 = mp3_with_id3v1("Song A", "Artist");
        let file = LoftyTagFile::read(mp3.path()).unwrap();

        assert_eq!(file.audio_format().short_name, "MPEG");
        assert_eq!(file.title().as_deref(), Some("Song A"));
        assert_eq!(file.artist().as_deref(), Some("Artist"));
        let formats: Vec<String> = file.metadata_formats().into_iter().map(|f| f.short_name).collect();
        assert_eq!(formats, vec!["ID3v1"]);
        assert_eq!(file.popularity(), None);
    }

    #[test]
    fn test_mp3_popularity_saved_and_reopened() {
        let mp3 = mp3_with_id3v1("Song A", "Artist");
        let mut file = LoftyTagStore.open(mp3.path()).unwrap();
        RatingCodec::Popularity.write(&mut *file, 60).unwrap();
        file.save().unwrap();

        let reopened = LoftyTagStore.open(mp3.path()).unwrap();
        assert_eq!(RatingCodec::Popularity.read(&*reopened).unwrap(), 0.6);
        assert_eq!(reopened.title().as_deref(), Some("Song A"));
        assert!(reopened
            .metadata_formats()
            .iter()
            .any(|f| f.short_name == "ID3v2"));
    }
}
