//! Converter configuration.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with QCLASS_ prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, ConvertResult};

/// Default cap on each captured output stream of a child process (16 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: u64 = 16 * 1024 * 1024;

/// Settings for one converter session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Interpreter used for the sandbox and the renderer.
    pub python: PathBuf,

    /// Directory where program and image files are created.
    pub work_dir: PathBuf,

    /// Limit for one conversion (program run and rendering), in seconds.
    /// `None` waits indefinitely.
    pub timeout_secs: Option<u64>,

    /// Raster resolution for typeset output.
    pub dpi: u32,

    /// Font size for typeset output.
    pub font_size: u32,

    /// Typeset with a LaTeX installation instead of mathtext.
    pub use_tex: bool,

    /// Append the aggregate result line to matrix output.
    pub show_result: bool,

    /// Largest stdout or stderr a child may produce before it is killed.
    pub max_output_bytes: u64,

    /// Host environment variables forwarded into child processes.
    pub env_passthrough: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            work_dir: std::env::temp_dir(),
            timeout_secs: Some(120),
            dpi: 200,
            font_size: 9,
            use_tex: true,
            show_result: false,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            env_passthrough: ["PATH", "HOME", "PYTHONPATH", "VIRTUAL_ENV", "LANG"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl ConverterConfig {
    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_secs = timeout.map(|t| t.as_secs());
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_font_size(mut self, size: u32) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_use_tex(mut self, use_tex: bool) -> Self {
        self.use_tex = use_tex;
        self
    }

    pub fn with_show_result(mut self, show: bool) -> Self {
        self.show_result = show;
        self
    }

    pub fn with_max_output_bytes(mut self, limit: u64) -> Self {
        self.max_output_bytes = limit;
        self
    }

    /// Conversion time limit.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConvertResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConvertError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;

        let config: ConverterConfig = serde_yaml_ng::from_str(&contents)
            .map_err(|e| ConvertError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment variable overrides.
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Load configuration with the following precedence:
    /// 1. Environment variables
    /// 2. File, if provided
    /// 3. Defaults
    pub fn load(config_file: Option<&Path>) -> ConvertResult<Self> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        }
        .apply_env();

        config.validate()?;
        Ok(config)
    }

    /// Override fields from `QCLASS_*` environment variables.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Override fields using `lookup` as the environment.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(python) = lookup("QCLASS_PYTHON") {
            self.python = PathBuf::from(python);
        }
        if let Some(dir) = lookup("QCLASS_WORK_DIR") {
            self.work_dir = PathBuf::from(dir);
        }
        if let Some(timeout) = lookup("QCLASS_TIMEOUT") {
            match timeout.trim() {
                "none" | "" => self.timeout_secs = None,
                value => {
                    if let Ok(secs) = value.parse() {
                        self.timeout_secs = Some(secs);
                    }
                }
            }
        }
        if let Some(dpi) = lookup("QCLASS_DPI") {
            if let Ok(val) = dpi.parse() {
                self.dpi = val;
            }
        }
        if let Some(limit) = lookup("QCLASS_MAX_OUTPUT_BYTES") {
            if let Ok(val) = limit.parse() {
                self.max_output_bytes = val;
            }
        }
        if let Some(use_tex) = lookup("QCLASS_USE_TEX") {
            self.use_tex = matches!(use_tex.trim(), "1" | "true" | "yes" | "on");
        }
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> ConvertResult<()> {
        if self.python.as_os_str().is_empty() {
            return Err(ConvertError::Config("python interpreter path is empty".into()));
        }
        if self.dpi == 0 {
            return Err(ConvertError::Config("dpi must be positive".into()));
        }
        if self.font_size == 0 {
            return Err(ConvertError::Config("font_size must be positive".into()));
        }
        if self.max_output_bytes == 0 {
            return Err(ConvertError::Config("max_output_bytes must be positive".into()));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConvertError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }
}
