//! Request entry points, one per processing mode.
//!
//! Each call validates, assembles, runs and releases exactly one pipeline and
//! reports a single [`Outcome`].

use crate::engine::Engine;
use crate::error::{Outcome, outcome_kind};
use crate::params::EffectParameters;
use crate::pipeline::{self, IoPaths, Mode, Request};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Run one fully described request.
pub fn run_request(engine: &dyn Engine, request: &Request) -> Outcome {
    info!(
        mode = ?request.mode,
        input = %request.io.input.display(),
        output = %request.io.output.display(),
        engine = engine.name(),
        "processing request"
    );
    let outcome = pipeline::build(engine, request).and_then(pipeline::Pipeline::run);
    info!(outcome = %outcome_kind(&outcome), "request finished");
    outcome
}

/// Apply the effects to an audio file and write an audio file.
///
/// The output suffix selects the encoder (mp3, flac or wav).
pub fn transcode(
    engine: &dyn Engine,
    params: EffectParameters,
    input: &Path,
    output: &Path,
) -> Outcome {
    let request = Request::new(Mode::Transcode, params, IoPaths::new(input, output));
    run_request(engine, &request)
}

/// Apply the effects to an audio file and mux it with a still image into a
/// QuickTime (`.mov`) video.
pub fn transcode_with_thumbnail(
    engine: &dyn Engine,
    params: EffectParameters,
    input_audio: &Path,
    input_image: &Path,
    output: &Path,
) -> Outcome {
    let io = IoPaths::new(input_audio, output).with_thumbnail(input_image);
    run_request(engine, &Request::new(Mode::ThumbnailVideo, params, io))
}

/// Validate a video speed-up request. Processing itself is not available yet,
/// so a valid request ends in `Unimplemented`.
pub fn speed_up_video(
    engine: &dyn Engine,
    params: EffectParameters,
    input_video: &Path,
    output_video: &Path,
) -> Outcome {
    let request = Request::new(
        Mode::SpeedUpVideo,
        params,
        IoPaths::new(input_video, output_video),
    );
    run_request(engine, &request)
}

/// Dump `params` as `key = value` lines into `dir`.
pub fn save_parameters(params: &EffectParameters, dir: &Path) -> io::Result<PathBuf> {
    let path = params.save_to_dir(dir)?;
    info!(path = %path.display(), "parameters saved");
    Ok(path)
}
