//! Rasterization of typeset markup.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::config::ConverterConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::interpret::error_summary;
use crate::sandbox::{capture_output, isolated_command};

/// Renders one line of math markup onto a tightly cropped PNG.
#[async_trait]
pub trait MathRenderer: Send + Sync {
    /// Render `latex` to `output` and return the written path.
    async fn render(&self, latex: &str, output: &Path) -> ConvertResult<PathBuf>;
}

/// Invoked as `python -c RENDER_SCRIPT <latex> <output> <dpi> <font_size> <use_tex>`.
/// Markup travels as an argument so it never has to be escaped into source.
const RENDER_SCRIPT: &str = r#"import sys
import matplotlib as mpl
mpl.use("Agg")
import matplotlib.pyplot as plt

latex, output, dpi, font_size, use_tex = sys.argv[1:6]
mpl.rcParams["font.size"] = int(font_size)
if use_tex == "1":
    mpl.rcParams["text.usetex"] = True
    mpl.rcParams["text.latex.preamble"] = r"\usepackage{amsmath}"

fig = plt.figure()
fig.text(0, 0, f"${latex}$")
fig.savefig(output, dpi=int(dpi), bbox_inches="tight")
plt.close(fig)
"#;

/// Typesets with matplotlib in a separate interpreter process.
#[derive(Debug, Clone)]
pub struct MatplotlibRenderer {
    python: PathBuf,
    work_dir: PathBuf,
    dpi: u32,
    font_size: u32,
    use_tex: bool,
    env_passthrough: Vec<String>,
    max_output_bytes: u64,
}

impl MatplotlibRenderer {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            python: config.python.clone(),
            work_dir: config.work_dir.clone(),
            dpi: config.dpi,
            font_size: config.font_size,
            use_tex: config.use_tex,
            env_passthrough: config.env_passthrough.clone(),
            max_output_bytes: config.max_output_bytes,
        }
    }

    fn args(&self, latex: &str, output: &Path) -> Vec<String> {
        vec![
            "-c".to_string(),
            RENDER_SCRIPT.to_string(),
            latex.to_string(),
            output.to_string_lossy().into_owned(),
            self.dpi.to_string(),
            self.font_size.to_string(),
            if self.use_tex { "1" } else { "0" }.to_string(),
        ]
    }
}

#[async_trait]
impl MathRenderer for MatplotlibRenderer {
    async fn render(&self, latex: &str, output: &Path) -> ConvertResult<PathBuf> {
        debug!("Rendering {} bytes of markup to {}", latex.len(), output.display());

        let child = isolated_command(&self.python, &self.work_dir, &self.env_passthrough)
            .args(self.args(latex, output))
            .spawn()
            .map_err(|e| {
                ConvertError::Render(format!("failed to run {}: {}", self.python.display(), e))
            })?;
        let result = capture_output(child, self.max_output_bytes).await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ConvertError::Render(error_summary(&stderr)));
        }

        if !output.exists() {
            return Err(ConvertError::ArtifactNotFound(output.to_path_buf()));
        }

        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let renderer = MatplotlibRenderer::from_config(&ConverterConfig::default().with_dpi(300));
        let args = renderer.args(r"\frac{1}{2}", Path::new("/tmp/a.py.png"));

        assert_eq!(args[0], "-c");
        assert!(args[1].contains("bbox_inches=\"tight\""));
        assert_eq!(&args[2..], [r"\frac{1}{2}", "/tmp/a.py.png", "300", "9", "1"]);
    }

    #[test]
    fn test_script_reads_all_arguments() {
        assert!(RENDER_SCRIPT.contains("sys.argv[1:6]"));
        assert!(RENDER_SCRIPT.contains(r"\usepackage{amsmath}"));
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConverterConfig::default()
            .with_python("/nonexistent/python-qclass")
            .with_work_dir(dir.path());
        let renderer = MatplotlibRenderer::from_config(&config);

        let err = renderer
            .render("x", &dir.path().join("out.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Render(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConverterConfig::default()
            .with_python("/bin/false")
            .with_work_dir(dir.path());
        let renderer = MatplotlibRenderer::from_config(&config);

        let output = dir.path().join("out.png");
        let err = renderer.render("x", &output).await.unwrap_err();
        assert!(matches!(err, ConvertError::Render(_)));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_endless_output_is_cut_off() {
        // `yes` echoes its arguments forever
        if !Path::new("/usr/bin/yes").exists() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let config = ConverterConfig::default()
            .with_python("/usr/bin/yes")
            .with_work_dir(dir.path())
            .with_max_output_bytes(4096);
        let renderer = MatplotlibRenderer::from_config(&config);

        let err = renderer
            .render("x", &dir.path().join("out.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Process(_)));
    }
}
