//! Default values and engine limits shared across the crate.

/// Default pitch ratio (unchanged pitch).
pub const PITCH: f32 = 1.0;

/// Default tempo ratio (unchanged speed).
pub const TEMPO: f32 = 1.0;

/// Default bass boost in dB.
pub const BASS_BOOST_DB: f32 = 0.0;

/// Default reverb delay in milliseconds.
pub const REVERB_DELAY_MS: u64 = 0;

/// Default reverb intensity.
pub const REVERB_INTENSITY: f32 = 0.0;

/// Default reverb feedback.
pub const REVERB_FEEDBACK: f32 = 0.0;

/// Longest reverb delay the echo stage accepts, in milliseconds.
///
/// The echo stage allocates its delay line for one second by default; keeping
/// the delay at half of that leaves room for the feedback tail.
pub const REVERB_DELAY_MAX_MS: u64 = 500;

/// Nanoseconds per millisecond (the echo stage takes its delay in ns).
pub const NS_PER_MS: u64 = 1_000_000;

/// Equalizer bands that carry the bass boost (roughly 60 Hz to 470 Hz on a
/// ten-band equalizer).
pub const BASS_BANDS: std::ops::RangeInclusive<u8> = 1..=4;

/// Number of frames the image freezer emits for a thumbnail video.
pub const FREEZE_FRAME_CAP: i32 = 2000;

/// Type prefix a decoded stream must carry to be bound to the converter.
pub const RAW_AUDIO_TYPE: &str = "audio/x-raw";

/// File name of the parameter dump written by `--save-params`.
pub const PARAMS_FILE_NAME: &str = "nightcore_params.toml";

/// Default directory for parameter dumps.
pub const PARAMS_DIR: &str = "./";
