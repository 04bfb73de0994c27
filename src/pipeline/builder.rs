//! Request validation and stage graph assembly.

use crate::defaults;
use crate::engine::{Engine, PortRef};
use crate::error::{NightcoreError, Result};
use crate::media::{
    self, AudioFormat, ImageFormat, MediaCategory, VideoFormat, check_input, check_output,
};
use crate::params::EffectParameters;
use crate::pipeline::graph::Pipeline;
use crate::pipeline::mux;
use crate::pipeline::stage::{EncoderKind, Media, StageConfig};
use std::path::{Path, PathBuf};
use tracing::info;

/// Processing mode of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Audio file in, effected audio file out.
    Transcode,
    /// Audio plus a still image in, QuickTime video out.
    ThumbnailVideo,
    /// Video in, sped-up video out.
    SpeedUpVideo,
}

impl Mode {
    fn pipeline_name(self) -> &'static str {
        match self {
            Mode::Transcode => "nightcore-transcode",
            Mode::ThumbnailVideo => "nightcore-thumbnail",
            Mode::SpeedUpVideo => "nightcore-speed-up",
        }
    }
}

/// Files touched by a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoPaths {
    pub input: PathBuf,
    /// Still image, thumbnail mode only.
    pub thumbnail: Option<PathBuf>,
    pub output: PathBuf,
}

impl IoPaths {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            thumbnail: None,
            output: output.into(),
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<PathBuf>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }
}

/// One immutable processing request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub mode: Mode,
    pub params: EffectParameters,
    pub io: IoPaths,
}

/// The formats a validated request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Transcode {
        input: AudioFormat,
        encoder: EncoderKind,
    },
    ThumbnailVideo {
        input: AudioFormat,
        image: ImageFormat,
    },
    SpeedUpVideo {
        input: AudioFormat,
        output: VideoFormat,
    },
}

impl Request {
    pub fn new(mode: Mode, params: EffectParameters, io: IoPaths) -> Self {
        Self { mode, params, io }
    }

    fn thumbnail_path(&self) -> Result<&Path> {
        self.io
            .thumbnail
            .as_deref()
            .ok_or_else(|| NightcoreError::InvalidInputFilePath {
                path: PathBuf::new(),
            })
    }

    /// Check every path and extension without touching the engine.
    ///
    /// Paths are checked before extensions: input(s), output, input
    /// extension, output extension, thumbnail extension.
    pub fn validate(&self) -> Result<Plan> {
        check_input(&self.io.input)?;
        if self.mode == Mode::ThumbnailVideo {
            check_input(self.thumbnail_path()?)?;
        }
        check_output(&self.io.output)?;

        let input = media::classify(&self.io.input, MediaCategory::Audio)
            .audio()
            .ok_or_else(|| NightcoreError::InvalidInputExtension {
                path: self.io.input.clone(),
            })?;
        let bad_output = || NightcoreError::InvalidOutputExtension {
            path: self.io.output.clone(),
        };

        match self.mode {
            Mode::Transcode => {
                let encoder = media::classify(&self.io.output, MediaCategory::Audio)
                    .audio()
                    .and_then(EncoderKind::for_format)
                    .ok_or_else(bad_output)?;
                Ok(Plan::Transcode { input, encoder })
            }
            Mode::ThumbnailVideo => {
                let output = media::classify(&self.io.output, MediaCategory::Video).video();
                if output != Some(VideoFormat::Mov) {
                    return Err(bad_output());
                }
                let thumbnail = self.thumbnail_path()?;
                let image = media::classify(thumbnail, MediaCategory::Thumbnail)
                    .image()
                    .ok_or_else(|| NightcoreError::InvalidThumbnailExtension {
                        path: thumbnail.to_path_buf(),
                    })?;
                Ok(Plan::ThumbnailVideo { input, image })
            }
            Mode::SpeedUpVideo => {
                if !input.is_container() {
                    return Err(NightcoreError::InvalidInputExtension {
                        path: self.io.input.clone(),
                    });
                }
                let output = media::classify(&self.io.output, MediaCategory::Video)
                    .video()
                    .ok_or_else(bad_output)?;
                Ok(Plan::SpeedUpVideo { input, output })
            }
        }
    }
}

/// Validate `request` and assemble its pipeline on `engine`.
///
/// Nothing is created when validation fails. A failure half way through
/// assembly releases the stages created so far.
pub fn build(engine: &dyn Engine, request: &Request) -> Result<Pipeline> {
    let plan = request.validate()?;
    info!(mode = ?request.mode, plan = ?plan, "request validated");

    let pipeline = match plan {
        Plan::Transcode { encoder, .. } => assemble_transcode(engine, request, encoder)?,
        Plan::ThumbnailVideo { image, .. } => assemble_thumbnail(engine, request, image)?,
        Plan::SpeedUpVideo { .. } => {
            return Err(NightcoreError::Unimplemented {
                mode: "video speed-up",
            });
        }
    };

    info!(
        pipeline = pipeline.name(),
        stages = pipeline.nodes().len(),
        edges = pipeline.edges().len(),
        "pipeline assembled"
    );
    Ok(pipeline)
}

fn assemble_transcode(
    engine: &dyn Engine,
    request: &Request,
    encoder: EncoderKind,
) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new(engine, request.mode.pipeline_name())?;
    let mut chain = vec![add_audio_chain(&mut pipeline, request)?];
    if encoder == EncoderKind::Flac {
        pipeline.add_stage("flac_convert", StageConfig::Converter(Media::Audio))?;
        chain.push("flac_convert");
    }
    pipeline.add_stage("encoder", StageConfig::Encoder(encoder))?;
    add_file_sink(&mut pipeline, &request.io.output)?;
    chain.extend(["encoder", "sink"]);
    pipeline.link_chain(&chain)?;
    Ok(pipeline)
}

fn assemble_thumbnail(
    engine: &dyn Engine,
    request: &Request,
    image: ImageFormat,
) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new(engine, request.mode.pipeline_name())?;
    let tail = add_audio_chain(&mut pipeline, request)?;
    pipeline.add_stage("audio_mux_convert", StageConfig::Converter(Media::Audio))?;
    pipeline.add_stage("audio_queue", StageConfig::Queue)?;
    pipeline.link_chain(&[tail, "audio_mux_convert", "audio_queue"])?;
    add_video_branch(&mut pipeline, request.thumbnail_path()?, image)?;

    pipeline.add_stage("mux", StageConfig::QuickTimeMuxer)?;
    mux::attach(&mut pipeline, "audio_queue", "mux")?;
    mux::attach(&mut pipeline, "video_queue", "mux")?;
    add_file_sink(&mut pipeline, &request.io.output)?;
    pipeline.link("mux", "sink")?;
    Ok(pipeline)
}

/// source -> decoder ~> convert -> resample -> pitch -> reverb -> bass.
///
/// Returns the name of the last stage of the chain.
fn add_audio_chain(pipeline: &mut Pipeline, request: &Request) -> Result<&'static str> {
    pipeline.add_stage(
        "source",
        StageConfig::FileSource {
            location: request.io.input.clone(),
        },
    )?;
    pipeline.add_stage("decoder", StageConfig::Decoder)?;
    pipeline.add_stage("convert", StageConfig::Converter(Media::Audio))?;
    pipeline.add_stage("resample", StageConfig::Resampler)?;

    let [pitch, reverb, bass] = StageConfig::effects(&request.params);
    pipeline.add_stage("pitch", pitch)?;
    pipeline.add_stage("reverb", reverb)?;
    pipeline.add_stage("bass", bass)?;

    pipeline.link("source", "decoder")?;
    pipeline.defer_link("decoder", PortRef::sink("convert"))?;
    pipeline.link_chain(&["convert", "resample", "pitch", "reverb", "bass"])?;
    Ok("bass")
}

/// image source -> image decoder -> video convert -> freeze -> video queue.
fn add_video_branch(pipeline: &mut Pipeline, image_path: &Path, format: ImageFormat) -> Result<()> {
    pipeline.add_stage(
        "image_source",
        StageConfig::FileSource {
            location: image_path.to_path_buf(),
        },
    )?;
    pipeline.add_stage("image_decoder", StageConfig::ImageDecoder(format))?;
    pipeline.add_stage("video_convert", StageConfig::Converter(Media::Video))?;
    pipeline.add_stage(
        "freeze",
        StageConfig::ImageFreezer {
            frame_cap: defaults::FREEZE_FRAME_CAP,
        },
    )?;
    pipeline.add_stage("video_queue", StageConfig::Queue)?;
    pipeline.link_chain(&[
        "image_source",
        "image_decoder",
        "video_convert",
        "freeze",
        "video_queue",
    ])
}

fn add_file_sink(pipeline: &mut Pipeline, output: &Path) -> Result<()> {
    pipeline.add_stage(
        "sink",
        StageConfig::FileSink {
            location: output.to_path_buf(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;
    use crate::error::ErrorKind;
    use crate::pipeline::graph::EdgeKind;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        /// Existing file with some bytes in it.
        fn file(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, b"data").unwrap();
            path
        }

        /// Path that does not exist yet.
        fn out(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }
    }

    fn request(mode: Mode, io: IoPaths) -> Request {
        Request::new(mode, EffectParameters::default(), io)
    }

    fn kind_of(engine: &MockEngine, request: &Request) -> ErrorKind {
        match build(engine, request) {
            Ok(_) => ErrorKind::Success,
            Err(e) => e.kind(),
        }
    }

    #[test]
    fn test_transcode_mp3_graph() {
        let fx = Fixture::new();
        let engine = MockEngine::new();
        let req = request(
            Mode::Transcode,
            IoPaths::new(fx.file("song.flac"), fx.out("song.mp3")),
        );
        let pipeline = build(&engine, &req).unwrap();

        let ledger = engine.ledger();
        assert_eq!(ledger.factory_of("encoder"), Some("lamemp3enc"));
        assert!(!ledger.has_stage("flac_convert"));
        assert!(ledger.links_stages("source", "decoder"));
        assert!(ledger.links_stages("bass", "encoder"));
        assert!(ledger.links_stages("encoder", "sink"));
        assert_eq!(ledger.stream_handlers, ["decoder"]);

        let deferred: Vec<_> = pipeline
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Deferred)
            .collect();
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].sink, PortRef::sink("convert"));
        assert!(!ledger.is_linked(&PortRef::sink("convert")));
    }

    #[test]
    fn test_transcode_flac_adds_converter() {
        let fx = Fixture::new();
        let engine = MockEngine::new();
        let req = request(
            Mode::Transcode,
            IoPaths::new(fx.file("song.mp3"), fx.out("song.flac")),
        );
        let _pipeline = build(&engine, &req).unwrap();

        let ledger = engine.ledger();
        assert_eq!(ledger.factory_of("encoder"), Some("flacenc"));
        assert!(ledger.links_stages("bass", "flac_convert"));
        assert!(ledger.links_stages("flac_convert", "encoder"));
    }

    #[test]
    fn test_exactly_one_encoder() {
        let fx = Fixture::new();
        for (name, factory) in [
            ("o.mp3", "lamemp3enc"),
            ("o.flac", "flacenc"),
            ("o.wav", "wavenc"),
        ] {
            let engine = MockEngine::new();
            let req = request(Mode::Transcode, IoPaths::new(fx.file("in.wav"), fx.out(name)));
            let _pipeline = build(&engine, &req).unwrap();
            let encoders: Vec<_> = engine
                .ledger()
                .stages
                .iter()
                .filter(|(_, f)| f.ends_with("enc"))
                .map(|(_, f)| f.clone())
                .collect();
            assert_eq!(encoders, [factory]);
        }
    }

    #[test]
    fn test_effect_properties_reach_the_engine() {
        let fx = Fixture::new();
        let engine = MockEngine::new();
        let params = EffectParameters::new(crate::params::RawEffectParameters {
            pitch: 1.2,
            tempo: 1.1,
            bass_boost_db: 4.0,
            reverb_delay_ms: 80,
            reverb_intensity: 0.2,
            reverb_feedback: 0.1,
        })
        .unwrap();
        let req = Request::new(
            Mode::Transcode,
            params,
            IoPaths::new(fx.file("in.mp3"), fx.out("out.wav")),
        );
        let _pipeline = build(&engine, &req).unwrap();

        let ledger = engine.ledger();
        assert_eq!(
            ledger.property("pitch", "pitch"),
            Some(&crate::engine::PropertyValue::F32(1.2))
        );
        assert_eq!(
            ledger.property("reverb", "delay"),
            Some(&crate::engine::PropertyValue::U64(80_000_000))
        );
        assert_eq!(
            ledger.property("bass", "band4"),
            Some(&crate::engine::PropertyValue::F64(4.0))
        );
    }

    #[test]
    fn test_thumbnail_graph() {
        let fx = Fixture::new();
        let engine = MockEngine::new();
        let req = request(
            Mode::ThumbnailVideo,
            IoPaths::new(fx.file("song.mp3"), fx.out("clip.mov")).with_thumbnail(fx.file("art.png")),
        );
        let _pipeline = build(&engine, &req).unwrap();

        let ledger = engine.ledger();
        assert_eq!(ledger.factory_of("image_decoder"), Some("pngdec"));
        assert_eq!(ledger.factory_of("mux"), Some("qtmux"));
        assert!(!ledger.has_stage("encoder"));
        assert!(ledger.links_stages("bass", "audio_mux_convert"));
        assert!(ledger.links_stages("audio_mux_convert", "audio_queue"));
        assert!(!ledger.links_stages("bass", "audio_queue"));
        assert_eq!(ledger.factory_of("audio_mux_convert"), Some("audioconvert"));
        assert!(ledger.links_stages("audio_queue", "mux"));
        assert!(ledger.links_stages("video_queue", "mux"));
        assert!(ledger.links_stages("mux", "sink"));
        assert_eq!(
            ledger.property("freeze", "num-buffers"),
            Some(&crate::engine::PropertyValue::I32(2000))
        );
    }

    #[test]
    fn test_validation_order() {
        let fx = Fixture::new();
        let engine = MockEngine::new();

        // Missing input wins over a bad output extension.
        let req = request(
            Mode::Transcode,
            IoPaths::new(fx.out("missing.mp3"), fx.out("out.mp4")),
        );
        assert_eq!(kind_of(&engine, &req), ErrorKind::InvalidInputFilePath);

        let req = request(
            Mode::Transcode,
            IoPaths::new(fx.file("in.mp3"), fx.out("no_such_dir/out.mp3")),
        );
        assert_eq!(kind_of(&engine, &req), ErrorKind::InvalidOutputFilePath);

        let req = request(Mode::Transcode, IoPaths::new(fx.file("in.ogg"), fx.out("out.mp4")));
        assert_eq!(kind_of(&engine, &req), ErrorKind::InvalidInputExtension);

        let req = request(Mode::Transcode, IoPaths::new(fx.file("in.mp3"), fx.out("out.mp4")));
        assert_eq!(kind_of(&engine, &req), ErrorKind::InvalidOutputExtension);

        assert_eq!(engine.ledger().stages_created, 0);
    }

    #[test]
    fn test_thumbnail_validation() {
        let fx = Fixture::new();
        let engine = MockEngine::new();

        let req = request(
            Mode::ThumbnailVideo,
            IoPaths::new(fx.file("a.mp3"), fx.out("v.mov")).with_thumbnail(fx.file("art.gif")),
        );
        assert_eq!(kind_of(&engine, &req), ErrorKind::InvalidThumbnailExtension);

        let req = request(
            Mode::ThumbnailVideo,
            IoPaths::new(fx.file("a.mp3"), fx.out("v.mp4")).with_thumbnail(fx.file("art.jpg")),
        );
        assert_eq!(kind_of(&engine, &req), ErrorKind::InvalidOutputExtension);

        let req = request(
            Mode::ThumbnailVideo,
            IoPaths::new(fx.file("a.mp3"), fx.out("v.mov")),
        );
        assert_eq!(kind_of(&engine, &req), ErrorKind::InvalidInputFilePath);

        assert_eq!(engine.ledger().stages_created, 0);
    }

    #[test]
    fn test_speed_up_validates_then_is_unimplemented() {
        let fx = Fixture::new();
        let engine = MockEngine::new();

        let req = request(
            Mode::SpeedUpVideo,
            IoPaths::new(fx.file("clip.mp3"), fx.out("fast.mp4")),
        );
        assert_eq!(kind_of(&engine, &req), ErrorKind::InvalidInputExtension);

        let req = request(
            Mode::SpeedUpVideo,
            IoPaths::new(fx.file("clip.webm"), fx.out("fast.webm")),
        );
        assert_eq!(kind_of(&engine, &req), ErrorKind::InvalidOutputExtension);

        let req = request(
            Mode::SpeedUpVideo,
            IoPaths::new(fx.file("clip.webm"), fx.out("fast.mov")),
        );
        assert_eq!(kind_of(&engine, &req), ErrorKind::Unimplemented);
        assert_eq!(engine.ledger().sessions, 0);
    }

    #[test]
    fn test_creation_failure_releases_partial_graph() {
        let fx = Fixture::new();
        let engine = MockEngine::new().without_factory("audioecho");
        let req = request(Mode::Transcode, IoPaths::new(fx.file("in.mp3"), fx.out("o.wav")));
        assert_eq!(kind_of(&engine, &req), ErrorKind::CannotCreateElements);

        let ledger = engine.ledger();
        assert!(ledger.stages_created > 0);
        assert!(ledger.stages.is_empty());
        assert!(ledger.released);
    }

    #[test]
    fn test_link_failure_is_reported() {
        let fx = Fixture::new();
        let engine = MockEngine::new().failing_link("pitch", "reverb");
        let req = request(Mode::Transcode, IoPaths::new(fx.file("in.mp3"), fx.out("o.wav")));
        assert_eq!(kind_of(&engine, &req), ErrorKind::CannotLinkElements);
        assert!(engine.ledger().stages.is_empty());
    }
}
