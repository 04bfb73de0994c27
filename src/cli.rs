//! Command-line interface for nightcore
//!
//! Provides argument parsing using clap derive macros.

use crate::config::Config;
use crate::params::RawEffectParameters;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Nightcore-style audio transformation
#[derive(Parser, Debug)]
#[command(
    name = "nightcore",
    version,
    about = "Pitch, speed up, bass boost and reverb audio files"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: stage and link details, -vv: everything)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Save the effect parameters after processing
    #[arg(long, global = true)]
    pub save_params: bool,

    /// Directory for saved parameters (default: ./)
    #[arg(long, global = true, value_name = "DIR")]
    pub params_dir: Option<PathBuf>,
}

/// Effect flags shared by every processing command.
///
/// Unset flags fall back to the `[effects]` section of the config file.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct EffectArgs {
    /// Pitch ratio (>= 1.0)
    #[arg(short, long, value_name = "RATIO")]
    pub pitch: Option<f32>,

    /// Tempo ratio (>= 1.0)
    #[arg(short, long, value_name = "RATIO")]
    pub speed: Option<f32>,

    /// Bass boost in dB (>= 0.0)
    #[arg(short, long, value_name = "DB")]
    pub bass: Option<f32>,

    /// Reverb delay in milliseconds (0-500)
    #[arg(short = 'd', long, value_name = "MS")]
    pub reverb_delay: Option<u64>,

    /// Reverb intensity (>= 0.0)
    #[arg(short = 'r', long, value_name = "LEVEL")]
    pub reverb_intensity: Option<f32>,

    /// Reverb feedback (>= 0.0)
    #[arg(short = 'f', long, value_name = "LEVEL")]
    pub reverb_feedback: Option<f32>,
}

impl EffectArgs {
    /// Layer the flags over `base`.
    pub fn apply(&self, base: RawEffectParameters) -> RawEffectParameters {
        RawEffectParameters {
            pitch: self.pitch.unwrap_or(base.pitch),
            tempo: self.speed.unwrap_or(base.tempo),
            bass_boost_db: self.bass.unwrap_or(base.bass_boost_db),
            reverb_delay_ms: self.reverb_delay.unwrap_or(base.reverb_delay_ms),
            reverb_intensity: self.reverb_intensity.unwrap_or(base.reverb_intensity),
            reverb_feedback: self.reverb_feedback.unwrap_or(base.reverb_feedback),
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply the effects to an audio file (output: mp3, flac or wav)
    Transcode {
        /// Input audio file (mp3, flac, wav, mp4, mov, webm)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        #[command(flatten)]
        effects: EffectArgs,
    },

    /// Apply the effects and render a still-image video (output: mov)
    Thumbnail {
        /// Input audio file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Still image (jpg, jpeg, png)
        #[arg(short, long, value_name = "FILE")]
        thumbnail: PathBuf,

        /// Output video file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        #[command(flatten)]
        effects: EffectArgs,
    },

    /// Speed up a video (input: mp4, mov, webm; output: mp4, mov)
    SpeedUp {
        /// Input video file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output video file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        #[command(flatten)]
        effects: EffectArgs,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}

impl Cli {
    /// Configuration file in effect: `--config` or the default location.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Apply the global parameter-dump flags to `config`.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if self.save_params {
            config.params.save = true;
        }
        if let Some(dir) = &self.params_dir {
            config.params.dir = dir.clone();
        }
        config
    }

    /// Log filter directive for the verbosity flags.
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "nightcore=info",
            1 => "nightcore=debug",
            _ => "trace",
        }
    }
}
