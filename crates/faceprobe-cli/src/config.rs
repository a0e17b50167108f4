//! Probe configuration: TOML file with defaults, overridden by CLI flags.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "/etc/faceprobe/config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// V4L2 device path.
    pub camera_device: String,
    /// Enrollment model file (JSON array of label/data records).
    pub model_file: PathBuf,
    /// ONNX face detection model.
    pub detector_model: PathBuf,
    /// ONNX face encoding model.
    pub encoder_model: PathBuf,
    /// Maximum acceptable normalized score for a positive match.
    pub certainty: f64,
    /// Distance-to-score multiplier.
    pub score_scale: f64,
    /// Capture attempts before giving up as inconclusive.
    pub max_attempts: u32,
    /// Pause between capture attempts, in seconds.
    pub retry_delay_secs: f64,
    /// Minimum mean frame luminance (0–255) to analyze a frame.
    pub min_brightness: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_device: "/dev/video2".to_string(),
            model_file: PathBuf::from("/var/lib/faceprobe/models.dat"),
            detector_model: PathBuf::from("/usr/share/faceprobe/detector.onnx"),
            encoder_model: PathBuf::from("/usr/share/faceprobe/encoder.onnx"),
            certainty: 4.0,
            score_scale: 10.0,
            max_attempts: 10,
            retry_delay_secs: 0.3,
            min_brightness: 30.0,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or the default location. A missing
    /// file at the default location yields defaults; an explicitly given
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !path.exists() {
            if required {
                bail!("config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config at {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            bail!("max_attempts must be at least 1");
        }
        if self.retry_delay_secs < 0.0 {
            bail!("retry_delay_secs must not be negative");
        }
        if self.score_scale <= 0.0 {
            bail!("score_scale must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_reference_policy() {
        let config = Config::default();
        assert_eq!(config.certainty, 4.0);
        assert_eq!(config.score_scale, 10.0);
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.retry_delay_secs, 0.3);
        assert_eq!(config.min_brightness, 30.0);
    }

    #[test]
    fn partial_file_overlays_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "certainty = 3.5\ncamera_device = \"/dev/video0\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.certainty, 3.5);
        assert_eq!(config.camera_device, "/dev/video0");
        // untouched fields keep their defaults
        assert_eq!(config.max_attempts, 10);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/faceprobe.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "certianty = 3.5").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn zero_attempts_fails_validation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_attempts = 0").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }
}
