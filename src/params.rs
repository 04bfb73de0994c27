//! Validated effect parameters for one processing request.

use crate::defaults;
use crate::error::{NightcoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Unvalidated effect values as they come from flags or config files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEffectParameters {
    pub pitch: f32,
    pub tempo: f32,
    pub bass_boost_db: f32,
    pub reverb_delay_ms: u64,
    pub reverb_intensity: f32,
    pub reverb_feedback: f32,
}

impl Default for RawEffectParameters {
    fn default() -> Self {
        Self {
            pitch: defaults::PITCH,
            tempo: defaults::TEMPO,
            bass_boost_db: defaults::BASS_BOOST_DB,
            reverb_delay_ms: defaults::REVERB_DELAY_MS,
            reverb_intensity: defaults::REVERB_INTENSITY,
            reverb_feedback: defaults::REVERB_FEEDBACK,
        }
    }
}

/// Effect configuration that satisfies every bound.
///
/// Only obtainable through [`EffectParameters::new`] (or `TryFrom`), so a
/// value of this type is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectParameters {
    pitch: f32,
    tempo: f32,
    bass_boost_db: f32,
    reverb_delay_ms: u64,
    reverb_intensity: f32,
    reverb_feedback: f32,
}

fn at_least(field: &'static str, value: f32, min: f32) -> Result<()> {
    // Written as a negated `>=` so NaN is rejected too.
    if !(value >= min) {
        return Err(NightcoreError::InvalidValueRange {
            field,
            message: format!("must be >= {min:.1}, got {value}"),
        });
    }
    Ok(())
}

impl EffectParameters {
    /// Validate `raw` as a whole. Nothing is constructed if any field is out
    /// of range.
    pub fn new(raw: RawEffectParameters) -> Result<Self> {
        at_least("pitch", raw.pitch, 1.0)?;
        at_least("tempo", raw.tempo, 1.0)?;
        at_least("bass_boost_db", raw.bass_boost_db, 0.0)?;
        if raw.reverb_delay_ms > defaults::REVERB_DELAY_MAX_MS {
            return Err(NightcoreError::InvalidValueRange {
                field: "reverb_delay_ms",
                message: format!(
                    "must be between 0 and {}, got {}",
                    defaults::REVERB_DELAY_MAX_MS,
                    raw.reverb_delay_ms
                ),
            });
        }
        at_least("reverb_intensity", raw.reverb_intensity, 0.0)?;
        at_least("reverb_feedback", raw.reverb_feedback, 0.0)?;

        Ok(Self {
            pitch: raw.pitch,
            tempo: raw.tempo,
            bass_boost_db: raw.bass_boost_db,
            reverb_delay_ms: raw.reverb_delay_ms,
            reverb_intensity: raw.reverb_intensity,
            reverb_feedback: raw.reverb_feedback,
        })
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    pub fn bass_boost_db(&self) -> f32 {
        self.bass_boost_db
    }

    pub fn reverb_delay_ms(&self) -> u64 {
        self.reverb_delay_ms
    }

    /// Reverb delay in the unit the echo stage expects.
    pub fn reverb_delay_ns(&self) -> u64 {
        self.reverb_delay_ms * defaults::NS_PER_MS
    }

    pub fn reverb_intensity(&self) -> f32 {
        self.reverb_intensity
    }

    pub fn reverb_feedback(&self) -> f32 {
        self.reverb_feedback
    }

    /// Write the parameters as `key = value` lines into `dir`.
    ///
    /// Returns the path of the written file.
    pub fn save_to_dir(&self, dir: &Path) -> io::Result<PathBuf> {
        let contents = toml::to_string(self).map_err(io::Error::other)?;
        fs::create_dir_all(dir)?;
        let path = dir.join(defaults::PARAMS_FILE_NAME);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Read a dump written by [`save_to_dir`](Self::save_to_dir), validating it again.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let raw: RawEffectParameters = toml::from_str(&contents)?;
        Ok(Self::new(raw)?)
    }
}

impl Default for EffectParameters {
    fn default() -> Self {
        let raw = RawEffectParameters::default();
        Self {
            pitch: raw.pitch,
            tempo: raw.tempo,
            bass_boost_db: raw.bass_boost_db,
            reverb_delay_ms: raw.reverb_delay_ms,
            reverb_intensity: raw.reverb_intensity,
            reverb_feedback: raw.reverb_feedback,
        }
    }
}

impl TryFrom<RawEffectParameters> for EffectParameters {
    type Error = NightcoreError;

    fn try_from(raw: RawEffectParameters) -> Result<Self> {
        Self::new(raw)
    }
}
