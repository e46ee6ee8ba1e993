//! Convert command implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use qclass_convert::{ConverterConfig, ConverterModel};

use super::common::{RequestArgs, load_config};

/// Overrides applied on top of the loaded configuration.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub python: Option<String>,
    pub timeout: Option<u64>,
    pub dpi: Option<u32>,
    pub no_tex: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: ConverterConfig) -> ConverterConfig {
        if let Some(python) = &self.python {
            config = config.with_python(python);
        }
        if let Some(secs) = self.timeout {
            // 0 disables the limit
            let timeout = (secs > 0).then(|| Duration::from_secs(secs));
            config = config.with_timeout(timeout);
        }
        if let Some(dpi) = self.dpi {
            config = config.with_dpi(dpi);
        }
        if self.no_tex {
            config = config.with_use_tex(false);
        }
        config
    }
}

/// Execute the convert command.
pub async fn execute(
    config_path: Option<&str>,
    request: &RequestArgs,
    overrides: &ConfigOverrides,
    output: Option<&str>,
) -> Result<()> {
    let config = overrides.apply(load_config(config_path)?);
    config.validate()?;

    println!(
        "{} Converting {} to {}",
        style("→").cyan().bold(),
        style(request.from).green(),
        style(request.to).green()
    );

    let mut model = ConverterModel::new(config);
    request.apply(&mut model)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.set_message("Running conversion...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = tokio::select! {
        result = model.convert_and_draw() => Some(result.map(Path::to_path_buf)),
        _ = tokio::signal::ctrl_c() => None,
    };
    spinner.finish_and_clear();

    let image = match outcome {
        Some(Ok(image)) => image,
        Some(Err(e)) => {
            anyhow::bail!("{} ({e})", e.kind().user_message());
        }
        None => {
            model.shutdown();
            anyhow::bail!("Interrupted");
        }
    };
    tracing::debug!("Rendered {}", image.display());

    let saved = match model.take_result_image() {
        Some(result) => save_image(result, output)?,
        None => image,
    };
    model.shutdown();

    println!(
        "{} Result image: {}",
        style("✓").green().bold(),
        style(saved.display()).cyan()
    );

    Ok(())
}

/// Copy the result to `output` (dropping the original), or keep it in place.
fn save_image(result: qclass_convert::ResultImage, output: Option<&str>) -> Result<PathBuf> {
    let Some(output) = output else {
        return Ok(result.keep());
    };

    let target = PathBuf::from(output);
    std::fs::copy(result.path(), &target)
        .with_context(|| format!("Failed to write output file: {output}"))?;
    result.remove();
    Ok(target)
}
