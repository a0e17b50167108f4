use anyhow::{Context, Result};
use clap::Parser;
use faceprobe_core::{
    load_model_set, AuthenticationSession, Decision, MatchPolicy, Matcher, OnnxExtractor,
    SessionPolicy, SessionReport,
};
use faceprobe_hw::Camera;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

mod config;
mod report;
mod still;

use config::Config;
use still::StillImage;

#[derive(Parser)]
#[command(name = "faceprobe", about = "Live biometric authentication probe")]
struct Cli {
    /// Config file path (default: /etc/faceprobe/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// V4L2 camera device, e.g. /dev/video2
    #[arg(short, long)]
    device: Option<String>,

    /// Enrollment model file
    #[arg(short, long)]
    model_file: Option<PathBuf>,

    /// Probe a still image instead of the camera
    #[arg(long, conflicts_with = "device")]
    image: Option<PathBuf>,

    /// Certainty threshold (maximum accepted score)
    #[arg(long)]
    certainty: Option<f64>,

    /// Maximum capture attempts
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Emit the full report as JSON
    #[arg(long)]
    json: bool,

    /// List available capture devices and exit
    #[arg(long)]
    list_devices: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.camera_device = device.clone();
        }
        if let Some(model_file) = &self.model_file {
            config.model_file = model_file.clone();
        }
        if let Some(certainty) = self.certainty {
            config.certainty = certainty;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("faceprobe: {err:#}");
            ExitCode::from(3)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.list_devices {
        for dev in faceprobe_hw::list_devices() {
            println!("{}\t{} ({})", dev.path, dev.name, dev.driver);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate()?;

    // Models load first: a session with nothing enrolled aborts before
    // the camera is ever touched.
    let models = load_model_set(&config.model_file).context("loading enrolled models")?;

    let mut extractor = OnnxExtractor::load(&config.detector_model, &config.encoder_model)
        .context("loading extraction models")?;

    let session = AuthenticationSession::new(
        models,
        Matcher::new(MatchPolicy {
            certainty: config.certainty,
            scale_factor: config.score_scale,
            suggestion_margin: 0.5,
        }),
        session_policy(&config, cli.image.is_some()),
    );

    let outcome: SessionReport = if let Some(image_path) = &cli.image {
        let mut source = StillImage::open(image_path)?;
        session.run(&mut source, &mut extractor)?
    } else {
        let mut source =
            Camera::open(&config.camera_device).context("opening camera device")?;
        session.run(&mut source, &mut extractor)?
    };

    if cli.json {
        println!("{}", report::render_json(&outcome)?);
    } else {
        print!("{}", report::render_human(&outcome, config.certainty));
    }

    Ok(match outcome.decision {
        Decision::Accept => ExitCode::SUCCESS,
        Decision::Reject => ExitCode::from(1),
        Decision::Inconclusive => ExitCode::from(2),
    })
}

/// Retry policy for the session. A still image never changes between
/// attempts, so retrying (and sleeping) against one is pointless.
fn session_policy(config: &Config, still_probe: bool) -> SessionPolicy {
    if still_probe {
        return SessionPolicy {
            max_attempts: 1,
            retry_delay: Duration::ZERO,
            min_brightness: config.min_brightness,
        };
    }
    SessionPolicy {
        max_attempts: config.max_attempts,
        retry_delay: Duration::from_secs_f64(config.retry_delay_secs),
        min_brightness: config.min_brightness,
    }
}
