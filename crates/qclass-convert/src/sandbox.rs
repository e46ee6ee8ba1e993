//! Isolated execution of synthesized programs.
//!
//! Programs are written to a freshly named file in the work directory and run
//! as a separate interpreter process. The sandbox never inspects what the
//! program prints; it only carries stdout and stderr back to the caller.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::config::{ConverterConfig, DEFAULT_MAX_OUTPUT_BYTES};
use crate::error::{ConvertError, ConvertResult};
use crate::input::{GENERATED_NAME_LEN, random_letters};

/// Path of the image produced for a program: `<program_path>.png`.
pub fn image_path(program: &Path) -> PathBuf {
    let mut path: OsString = program.as_os_str().to_owned();
    path.push(".png");
    PathBuf::from(path)
}

/// Captured output of one program run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Decoded standard output.
    pub stdout: String,

    /// Decoded standard error.
    pub stderr: String,

    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(0),
        }
    }
}

/// Runs a program file to completion and returns what it printed.
///
/// Implementations suspend the caller until the child exits and apply no
/// time limit of their own.
#[async_trait]
pub trait ProgramRunner: Send + Sync {
    async fn run(&self, program: &Path) -> ConvertResult<ProcessOutput>;
}

/// A uniquely named program file, removed on `cleanup` or drop.
///
/// The handle also owns the `<program>.png` a run may leave behind: once the
/// program has been written, dropping the handle removes that image unless
/// [`ProgramFile::keep_image`] was called. Only files this handle created are
/// ever removed on drop.
#[derive(Debug)]
pub struct ProgramFile {
    path: PathBuf,
    created: bool,
    written: bool,
    image_kept: bool,
}

impl ProgramFile {
    /// Pick a fresh random name in `dir`. Nothing is written yet.
    pub fn reserve(dir: &Path) -> Self {
        let name = format!("{}.py", random_letters(GENERATED_NAME_LEN));
        Self::at(dir.join(name))
    }

    /// Use an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            created: false,
            written: false,
            image_kept: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the run is expected to leave its image.
    pub fn image_path(&self) -> PathBuf {
        image_path(&self.path)
    }

    /// Write the program text. Fails rather than overwrite an existing file.
    pub async fn write(&mut self, code: &str) -> ConvertResult<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await?;
        self.created = true;
        self.written = true;
        file.write_all(code.as_bytes()).await?;
        file.flush().await?;
        debug!("Wrote program to {}", self.path.display());
        Ok(())
    }

    /// Hand the image over to the caller; drop will leave it in place.
    pub fn keep_image(&mut self) -> PathBuf {
        self.image_kept = true;
        self.image_path()
    }

    /// Remove the program file. Returns false if it was already gone.
    pub async fn cleanup(&mut self) -> bool {
        self.created = false;
        match fs::remove_file(&self.path).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not remove {}: {}", self.path.display(), e);
                false
            }
        }
    }
}

impl Drop for ProgramFile {
    fn drop(&mut self) {
        if self.created {
            let _ = std::fs::remove_file(&self.path);
        }
        if self.written && !self.image_kept {
            let image = self.image_path();
            if image.is_file() && std::fs::remove_file(&image).is_ok() {
                debug!("Removed unclaimed image {}", image.display());
            }
        }
    }
}

/// Runs programs with a Python interpreter in a cleared environment.
#[derive(Debug, Clone)]
pub struct PythonSandbox {
    interpreter: PathBuf,
    work_dir: PathBuf,
    env_passthrough: Vec<String>,
    max_output_bytes: u64,
}

impl PythonSandbox {
    pub fn new(interpreter: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            work_dir: work_dir.into(),
            env_passthrough: Vec::new(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(&config.python, &config.work_dir)
            .with_env_passthrough(config.env_passthrough.clone())
            .with_max_output_bytes(config.max_output_bytes)
    }

    /// Host environment variables forwarded into the child.
    pub fn with_env_passthrough(mut self, vars: Vec<String>) -> Self {
        self.env_passthrough = vars;
        self
    }

    /// Cap on each captured stream; a child that prints more is killed.
    pub fn with_max_output_bytes(mut self, limit: u64) -> Self {
        self.max_output_bytes = limit;
        self
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    fn command(&self, program: &Path) -> Command {
        let mut cmd = isolated_command(&self.interpreter, &self.work_dir, &self.env_passthrough);
        cmd.arg(program);
        cmd
    }
}

/// A child command with a cleared environment, null stdin, piped output and
/// a headless plotting backend. The child is killed if the awaiting future
/// is dropped.
pub(crate) fn isolated_command(
    interpreter: &Path,
    work_dir: &Path,
    env_passthrough: &[String],
) -> Command {
    let mut cmd = Command::new(interpreter);
    cmd.current_dir(work_dir)
        .env_clear()
        .envs(
            env_passthrough
                .iter()
                .filter_map(|key| std::env::var_os(key).map(|value| (key.clone(), value))),
        )
        .env("MPLBACKEND", "Agg")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Wait for `child` while draining both output streams, each capped at
/// `limit` bytes. A child that exceeds the cap is killed.
pub(crate) async fn capture_output(mut child: Child, limit: u64) -> ConvertResult<Output> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let streams = tokio::try_join!(
        read_capped(stdout, limit, "stdout"),
        read_capped(stderr, limit, "stderr"),
    );
    let (stdout, stderr) = match streams {
        Ok(streams) => streams,
        Err(e) => {
            if let Err(kill) = child.kill().await {
                warn!("Could not kill child process: {}", kill);
            }
            return Err(e);
        }
    };

    let status = child.wait().await?;
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

async fn read_capped<R>(stream: Option<R>, limit: u64, name: &str) -> ConvertResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(stream) = stream {
        stream.take(limit.saturating_add(1)).read_to_end(&mut buf).await?;
    }
    if buf.len() as u64 > limit {
        return Err(ConvertError::Process(format!(
            "{name} exceeded {limit} bytes, process killed"
        )));
    }
    Ok(buf)
}

#[async_trait]
impl ProgramRunner for PythonSandbox {
    async fn run(&self, program: &Path) -> ConvertResult<ProcessOutput> {
        debug!(
            "Running {} with {}",
            program.display(),
            self.interpreter.display()
        );

        let child = self.command(program).spawn().map_err(|e| {
            ConvertError::Process(format!(
                "failed to run {}: {}",
                self.interpreter.display(),
                e
            ))
        })?;
        let output = capture_output(child, self.max_output_bytes).await?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}
