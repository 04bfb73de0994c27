//! Stage kinds and their typed configuration.

use crate::defaults;
use crate::engine::PropertyValue;
use crate::media::{AudioFormat, ImageFormat};
use crate::params::EffectParameters;
use std::fmt;
use std::path::PathBuf;

/// Role of a stage in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Source,
    Decoder,
    Effect,
    Converter,
    Resampler,
    Encoder,
    Muxer,
    Sink,
    Queue,
    ImageDecoder,
    ImageFreezer,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Source => "source",
            StageKind::Decoder => "decoder",
            StageKind::Effect => "effect",
            StageKind::Converter => "converter",
            StageKind::Resampler => "resampler",
            StageKind::Encoder => "encoder",
            StageKind::Muxer => "muxer",
            StageKind::Sink => "sink",
            StageKind::Queue => "queue",
            StageKind::ImageDecoder => "image-decoder",
            StageKind::ImageFreezer => "image-freezer",
        };
        f.write_str(name)
    }
}

/// Audio encoders; exactly one is chosen per audio-only output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderKind {
    Mp3,
    Flac,
    Wav,
}

impl EncoderKind {
    /// Encoder for an output format. Containers have no audio-only encoder.
    pub fn for_format(format: AudioFormat) -> Option<Self> {
        match format {
            AudioFormat::Mp3 => Some(EncoderKind::Mp3),
            AudioFormat::Flac => Some(EncoderKind::Flac),
            AudioFormat::Wav => Some(EncoderKind::Wav),
            AudioFormat::Mp4 | AudioFormat::Mov | AudioFormat::Webm => None,
        }
    }

    pub fn factory(self) -> &'static str {
        match self {
            EncoderKind::Mp3 => "lamemp3enc",
            EncoderKind::Flac => "flacenc",
            EncoderKind::Wav => "wavenc",
        }
    }
}

/// Media type a converter operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Media {
    Audio,
    Video,
}

/// Typed configuration of one stage. Determines the stage kind, the engine
/// factory and which properties are applied.
#[derive(Debug, Clone, PartialEq)]
pub enum StageConfig {
    FileSource { location: PathBuf },
    Decoder,
    Converter(Media),
    Resampler,
    PitchTempo { pitch: f32, tempo: f32 },
    BassBoost { gain_db: f64 },
    Reverb { delay_ns: u64, intensity: f32, feedback: f32 },
    Encoder(EncoderKind),
    QuickTimeMuxer,
    Queue,
    ImageDecoder(ImageFormat),
    ImageFreezer { frame_cap: i32 },
    FileSink { location: PathBuf },
}

impl StageConfig {
    /// The three effect stages, in tail order.
    pub fn effects(params: &EffectParameters) -> [StageConfig; 3] {
        [
            StageConfig::PitchTempo {
                pitch: params.pitch(),
                tempo: params.tempo(),
            },
            StageConfig::Reverb {
                delay_ns: params.reverb_delay_ns(),
                intensity: params.reverb_intensity(),
                feedback: params.reverb_feedback(),
            },
            StageConfig::BassBoost {
                gain_db: f64::from(params.bass_boost_db()),
            },
        ]
    }

    pub fn kind(&self) -> StageKind {
        match self {
            StageConfig::FileSource { .. } => StageKind::Source,
            StageConfig::Decoder => StageKind::Decoder,
            StageConfig::Converter(_) => StageKind::Converter,
            StageConfig::Resampler => StageKind::Resampler,
            StageConfig::PitchTempo { .. }
            | StageConfig::BassBoost { .. }
            | StageConfig::Reverb { .. } => StageKind::Effect,
            StageConfig::Encoder(_) => StageKind::Encoder,
            StageConfig::QuickTimeMuxer => StageKind::Muxer,
            StageConfig::Queue => StageKind::Queue,
            StageConfig::ImageDecoder(_) => StageKind::ImageDecoder,
            StageConfig::ImageFreezer { .. } => StageKind::ImageFreezer,
            StageConfig::FileSink { .. } => StageKind::Sink,
        }
    }

    /// Engine factory implementing this stage.
    pub fn factory(&self) -> &'static str {
        match self {
            StageConfig::FileSource { .. } => "filesrc",
            StageConfig::Decoder => "decodebin",
            StageConfig::Converter(Media::Audio) => "audioconvert",
            StageConfig::Converter(Media::Video) => "videoconvert",
            StageConfig::Resampler => "audioresample",
            StageConfig::PitchTempo { .. } => "pitch",
            StageConfig::BassBoost { .. } => "equalizer-10bands",
            StageConfig::Reverb { .. } => "audioecho",
            StageConfig::Encoder(kind) => kind.factory(),
            StageConfig::QuickTimeMuxer => "qtmux",
            StageConfig::Queue => "queue",
            StageConfig::ImageDecoder(ImageFormat::Jpg | ImageFormat::Jpeg) => "jpegdec",
            StageConfig::ImageDecoder(ImageFormat::Png) => "pngdec",
            StageConfig::ImageFreezer { .. } => "imagefreeze",
            StageConfig::FileSink { .. } => "filesink",
        }
    }

    /// Properties applied before activation, typed as the engine expects.
    pub fn properties(&self) -> Vec<(String, PropertyValue)> {
        match self {
            StageConfig::FileSource { location } | StageConfig::FileSink { location } => {
                vec![("location".to_string(), PropertyValue::Path(location.clone()))]
            }
            StageConfig::PitchTempo { pitch, tempo } => vec![
                ("pitch".to_string(), PropertyValue::F32(*pitch)),
                ("tempo".to_string(), PropertyValue::F32(*tempo)),
            ],
            StageConfig::BassBoost { gain_db } => defaults::BASS_BANDS
                .map(|band| (format!("band{band}"), PropertyValue::F64(*gain_db)))
                .collect(),
            StageConfig::Reverb {
                delay_ns,
                intensity,
                feedback,
            } => vec![
                ("delay".to_string(), PropertyValue::U64(*delay_ns)),
                ("intensity".to_string(), PropertyValue::F32(*intensity)),
                ("feedback".to_string(), PropertyValue::F32(*feedback)),
            ],
            StageConfig::ImageFreezer { frame_cap } => {
                vec![("num-buffers".to_string(), PropertyValue::I32(*frame_cap))]
            }
            StageConfig::Decoder
            | StageConfig::Converter(_)
            | StageConfig::Resampler
            | StageConfig::Encoder(_)
            | StageConfig::QuickTimeMuxer
            | StageConfig::Queue
            | StageConfig::ImageDecoder(_) => Vec::new(),
        }
    }
}

/// A stage owned by one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct StageNode {
    pub name: String,
    pub config: StageConfig,
}

impl StageNode {
    pub fn kind(&self) -> StageKind {
        self.config.kind()
    }
}
