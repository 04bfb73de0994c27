use anyhow::Result;
use clap::{CommandFactory, Parser};
use nightcore::app::{run_request, save_parameters};
use nightcore::cli::{Cli, Commands, ConfigAction, EffectArgs};
use nightcore::config::Config;
use nightcore::engine::Engine;
use nightcore::error::{NightcoreError, Outcome};
#[cfg(test)]
use nightcore::error::{ErrorKind, outcome_kind};
use nightcore::params::EffectParameters;
use nightcore::pipeline::{IoPaths, Mode, Request};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);
    tracing::debug!(version = %nightcore::version_string(), "starting");

    match &cli.command {
        Commands::Transcode {
            input,
            output,
            effects,
        } => process(&cli, Mode::Transcode, effects, IoPaths::new(input, output))
            .map(|o| report(&o)),
        Commands::Thumbnail {
            input,
            thumbnail,
            output,
            effects,
        } => {
            let io = IoPaths::new(input, output).with_thumbnail(thumbnail);
            process(&cli, Mode::ThumbnailVideo, effects, io).map(|o| report(&o))
        }
        Commands::SpeedUp {
            input,
            output,
            effects,
        } => process(&cli, Mode::SpeedUpVideo, effects, IoPaths::new(input, output))
            .map(|o| report(&o)),
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => {
                    let config = load_config(&cli)?;
                    print!("{}", config.to_toml()?);
                }
                ConfigAction::Path => println!("{}", cli.config_path().display()),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "nightcore",
                &mut std::io::stdout(),
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the verbosity flags.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config), which must exist
/// 2. Default config path (~/.config/nightcore/config.toml)
/// 3. Built-in defaults
///
/// Environment variables and global flags are layered on top.
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };
    Ok(cli.apply_overrides(config.with_env_overrides()))
}

/// Run one processing request.
///
/// Parameters are validated before the engine is opened.
fn process(cli: &Cli, mode: Mode, effects: &EffectArgs, io: IoPaths) -> Result<Outcome> {
    let config = load_config(cli)?;
    let params = match EffectParameters::new(effects.apply(config.effects)) {
        Ok(params) => params,
        Err(e) => return Ok(Err(e)),
    };
    let engine = open_engine()?;

    let outcome: Outcome = run_request(engine.as_ref(), &Request::new(mode, params, io));
    if outcome.is_ok()
        && config.params.save
        && let Err(e) = save_parameters(&params, &config.params.dir)
    {
        tracing::warn!(dir = %config.params.dir.display(), error = %e, "could not save parameters");
    }

    Ok(outcome)
}

#[cfg(feature = "gstreamer")]
fn open_engine() -> Result<Box<dyn Engine>> {
    use nightcore::engine::gst::GstEngine;

    let engine = GstEngine::new()?;
    let missing = engine.missing_factories(&[
        "filesrc",
        "decodebin",
        "audioconvert",
        "audioresample",
        "pitch",
        "equalizer-10bands",
        "audioecho",
    ]);
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "GStreamer plugins missing, processing will fail");
    }
    Ok(Box::new(engine))
}

#[cfg(not(feature = "gstreamer"))]
fn open_engine() -> Result<Box<dyn Engine>> {
    anyhow::bail!(
        "nightcore was built without a processing engine; rebuild with `--features gstreamer`"
    )
}

/// Print the failure line and pick the exit code.
fn report(outcome: &Outcome) -> ExitCode {
    let Err(error) = outcome else {
        return ExitCode::SUCCESS;
    };
    let line = failure_line(error);
    if std::io::stderr().is_terminal() {
        eprintln!("{}", line.red());
    } else {
        eprintln!("{line}");
    }
    ExitCode::from(error.kind().code())
}

fn failure_line(error: &NightcoreError) -> String {
    let kind = error.kind();
    format!("Error {}: {} ({error})", kind.code(), kind.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_parameters_reported_before_engine() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "").unwrap();
        let input = dir.path().join("song.mp3");
        fs::write(&input, b"data").unwrap();

        let cli = Cli::try_parse_from([
            "nightcore",
            "--config",
            config.to_str().unwrap(),
            "transcode",
            "-i",
            input.to_str().unwrap(),
            "-o",
            dir.path().join("out.flac").to_str().unwrap(),
            "-p",
            "0.5",
        ])
        .unwrap();
        let Commands::Transcode {
            input,
            output,
            effects,
        } = &cli.command
        else {
            panic!("expected transcode");
        };

        let outcome =
            process(&cli, Mode::Transcode, effects, IoPaths::new(input, output)).unwrap();
        assert_eq!(outcome_kind(&outcome), ErrorKind::InvalidValueRange);
    }

    #[test]
    fn test_failure_line_names_kind() {
        let error = NightcoreError::Unimplemented {
            mode: "video speed-up",
        };
        assert_eq!(
            failure_line(&error),
            "Error 11: Mode not implemented (video speed-up is not implemented)"
        );
    }
}
