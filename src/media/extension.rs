//! Suffix-based media classification.

use std::fmt;
use std::path::Path;

/// Category hint telling the classifier which suffix list applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Audio,
    Video,
    Thumbnail,
}

/// Suffixes accepted as audio. Containers are included because they may
/// carry an audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Wav,
    Mp4,
    Mov,
    Webm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoFormat {
    Mp4,
    Mov,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpg,
    Jpeg,
    Png,
}

/// Media kind derived from a file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio(AudioFormat),
    Video(VideoFormat),
    Image(ImageFormat),
    Invalid,
}

const AUDIO_SUFFIXES: [(&str, AudioFormat); 6] = [
    ("mp3", AudioFormat::Mp3),
    ("flac", AudioFormat::Flac),
    ("wav", AudioFormat::Wav),
    ("mp4", AudioFormat::Mp4),
    ("mov", AudioFormat::Mov),
    ("webm", AudioFormat::Webm),
];

const VIDEO_SUFFIXES: [(&str, VideoFormat); 2] =
    [("mp4", VideoFormat::Mp4), ("mov", VideoFormat::Mov)];

const THUMBNAIL_SUFFIXES: [(&str, ImageFormat); 3] = [
    ("jpg", ImageFormat::Jpg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
];

impl AudioFormat {
    pub fn suffix(self) -> &'static str {
        lookup_suffix(&AUDIO_SUFFIXES, self)
    }

    /// True for container formats that may also hold a video track.
    pub fn is_container(self) -> bool {
        matches!(self, AudioFormat::Mp4 | AudioFormat::Mov | AudioFormat::Webm)
    }
}

impl VideoFormat {
    pub fn suffix(self) -> &'static str {
        lookup_suffix(&VIDEO_SUFFIXES, self)
    }
}

impl ImageFormat {
    pub fn suffix(self) -> &'static str {
        lookup_suffix(&THUMBNAIL_SUFFIXES, self)
    }
}

impl MediaKind {
    pub fn audio(self) -> Option<AudioFormat> {
        match self {
            MediaKind::Audio(format) => Some(format),
            _ => None,
        }
    }

    pub fn video(self) -> Option<VideoFormat> {
        match self {
            MediaKind::Video(format) => Some(format),
            _ => None,
        }
    }

    pub fn image(self) -> Option<ImageFormat> {
        match self {
            MediaKind::Image(format) => Some(format),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio(format) => write!(f, "audio/{}", format.suffix()),
            MediaKind::Video(format) => write!(f, "video/{}", format.suffix()),
            MediaKind::Image(format) => write!(f, "image/{}", format.suffix()),
            MediaKind::Invalid => f.write_str("invalid"),
        }
    }
}

fn lookup_suffix<T: PartialEq + Copy>(table: &[(&'static str, T)], value: T) -> &'static str {
    table
        .iter()
        .find(|(_, v)| *v == value)
        .map(|(suffix, _)| *suffix)
        .unwrap_or("")
}

/// Final `.`-delimited segment of the file name, if any.
fn suffix_of(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    let (_, suffix) = name.rsplit_once('.')?;
    (!suffix.is_empty()).then_some(suffix)
}

/// Classify `path` against the suffix list of `category`.
///
/// Matching is case-sensitive and uses only the last suffix segment, so
/// `mix.final.mp3` is audio and `song.MP3` is invalid.
pub fn classify(path: impl AsRef<Path>, category: MediaCategory) -> MediaKind {
    let Some(suffix) = suffix_of(path.as_ref()) else {
        return MediaKind::Invalid;
    };

    fn find<T: Copy>(table: &[(&str, T)], suffix: &str) -> Option<T> {
        table.iter().find(|(s, _)| *s == suffix).map(|(_, v)| *v)
    }

    let kind = match category {
        MediaCategory::Audio => find(&AUDIO_SUFFIXES, suffix).map(MediaKind::Audio),
        MediaCategory::Video => find(&VIDEO_SUFFIXES, suffix).map(MediaKind::Video),
        MediaCategory::Thumbnail => find(&THUMBNAIL_SUFFIXES, suffix).map(MediaKind::Image),
    };
    kind.unwrap_or(MediaKind::Invalid)
}
