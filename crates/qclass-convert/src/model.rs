//! Conversion orchestrator.
//!
//! [`ConverterModel`] owns the current from/to selection, the input
//! descriptor and expression text, and at most one live result image. It
//! drives one conversion at a time through synthesis, sandboxed execution,
//! output interpretation and rendering.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::ConverterConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::input::{ConversionRequest, InputDescriptor};
use crate::interpret::{Interpretation, interpret};
use crate::render::{MathRenderer, MatplotlibRenderer};
use crate::representation::Representation;
use crate::sandbox::{ProcessOutput, ProgramFile, ProgramRunner, PythonSandbox};
use crate::synth;

/// Owned handle to a generated image. The file is deleted when the handle is
/// removed or dropped, unless it has been kept.
#[derive(Debug)]
pub struct ResultImage {
    path: PathBuf,
    kept: bool,
}

impl ResultImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kept: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the image now. Returns false if it was already gone.
    pub fn remove(mut self) -> bool {
        self.kept = true;
        remove_image(&self.path)
    }

    /// Give up ownership; the file stays on disk.
    pub fn keep(mut self) -> PathBuf {
        self.kept = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ResultImage {
    fn drop(&mut self) {
        if !self.kept {
            remove_image(&self.path);
        }
    }
}

fn remove_image(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Removed {}", path.display());
            true
        }
        Err(e) => {
            warn!("Could not remove {}: {}", path.display(), e);
            false
        }
    }
}

/// The conversion orchestrator.
pub struct ConverterModel {
    config: ConverterConfig,
    runner: Box<dyn ProgramRunner>,
    renderer: Box<dyn MathRenderer>,
    from: Representation,
    to: Representation,
    input: Option<InputDescriptor>,
    expression_text: String,
    show_result: bool,
    result_image: Option<ResultImage>,
}

impl ConverterModel {
    /// Orchestrator backed by a Python sandbox and matplotlib renderer.
    pub fn new(config: ConverterConfig) -> Self {
        let runner = PythonSandbox::from_config(&config);
        let renderer = MatplotlibRenderer::from_config(&config);
        Self::with_components(config, runner, renderer)
    }

    /// Orchestrator with custom execution and rendering components.
    pub fn with_components(
        config: ConverterConfig,
        runner: impl ProgramRunner + 'static,
        renderer: impl MathRenderer + 'static,
    ) -> Self {
        let show_result = config.show_result;
        Self {
            config,
            runner: Box::new(runner),
            renderer: Box::new(renderer),
            from: Representation::None,
            to: Representation::None,
            input: None,
            expression_text: String::new(),
            show_result,
            result_image: None,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn from_expression(&self) -> Representation {
        self.from
    }

    /// Change the source representation. Rejected without changing state if
    /// the resulting pair could not be converted.
    pub fn set_from_expression(&mut self, value: Representation) -> ConvertResult<()> {
        check_pair(value, self.to)?;
        self.from = value;
        info!("from expression changed to {}", value);
        Ok(())
    }

    pub fn to_expression(&self) -> Representation {
        self.to
    }

    /// Change the target representation. Rejected without changing state if
    /// the resulting pair could not be converted.
    pub fn set_to_expression(&mut self, value: Representation) -> ConvertResult<()> {
        check_pair(self.from, value)?;
        self.to = value;
        info!("to expression changed to {}", value);
        Ok(())
    }

    /// Change both ends at once.
    pub fn select(&mut self, from: Representation, to: Representation) -> ConvertResult<()> {
        check_pair(from, to)?;
        self.from = from;
        self.to = to;
        info!("conversion changed to {} -> {}", from, to);
        Ok(())
    }

    pub fn input_data(&self) -> Option<&InputDescriptor> {
        self.input.as_ref()
    }

    pub fn set_input_data(&mut self, value: InputDescriptor) {
        info!("input_data changed to {}", value);
        self.input = Some(value);
    }

    pub fn expression_text(&self) -> &str {
        &self.expression_text
    }

    pub fn set_expression_text(&mut self, value: impl Into<String>) {
        self.expression_text = value.into();
        debug!("expression_text changed ({} bytes)", self.expression_text.len());
    }

    pub fn show_result(&self) -> bool {
        self.show_result
    }

    pub fn set_show_result(&mut self, value: bool) {
        self.show_result = value;
    }

    /// Path of the live result image, if any.
    pub fn result_img_path(&self) -> Option<&Path> {
        self.result_image.as_ref().map(ResultImage::path)
    }

    /// Hand the live result image to the caller.
    pub fn take_result_image(&mut self) -> Option<ResultImage> {
        self.result_image.take()
    }

    /// Compose and validate a request from the current state.
    pub fn request(&self) -> ConvertResult<ConversionRequest> {
        let input = self
            .input
            .clone()
            .ok_or_else(|| ConvertError::MissingInput("input data is not set".into()))?;

        ConversionRequest::new(
            self.from,
            self.to,
            input,
            self.expression_text.clone(),
            self.show_result,
        )
    }

    /// The program the current state would run from `program_path`.
    pub fn synthesize_program(&self, program_path: &Path) -> ConvertResult<String> {
        Ok(synth::synthesize(&self.request()?, program_path))
    }

    /// Convert the current expression and draw the result.
    ///
    /// On success the previous image is deleted and the new one becomes the
    /// live result. The configured timeout covers both the program run and
    /// the rendering. The program file, and any image a failed or cancelled
    /// run left behind, are removed whatever the outcome.
    pub async fn convert_and_draw(&mut self) -> ConvertResult<&Path> {
        let request = self.request()?;

        fs::create_dir_all(&self.config.work_dir).await?;
        let work_dir = fs::canonicalize(&self.config.work_dir).await?;

        let mut program = ProgramFile::reserve(&work_dir);
        let code = synth::synthesize(&request, program.path());
        program.write(&code).await?;

        info!(
            "Running {} -> {} conversion from {}",
            request.source(),
            request.target(),
            program.path().display()
        );
        let started = Instant::now();

        let work = async {
            let output = self.runner.run(program.path()).await?;
            self.draw(&request, output, program.path()).await
        };
        let drawn = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or_else(|_| Err(ConvertError::Timeout(limit))),
            None => work.await,
        };

        if !program.cleanup().await {
            warn!("Program file {} was already removed", program.path().display());
        }
        info!("Conversion finished in {:?}", started.elapsed());

        // On error, dropping `program` removes any partial image.
        let image = drawn?;
        program.keep_image();

        self.remove_result_img_path();
        info!("result img path changed to {}", image.display());
        Ok(self.result_image.insert(ResultImage::new(image)).path())
    }

    async fn draw(
        &self,
        request: &ConversionRequest,
        output: ProcessOutput,
        program: &Path,
    ) -> ConvertResult<PathBuf> {
        if !output.stdout.is_empty() {
            debug!("output {}", output.stdout.trim_end());
        }

        match interpret(request.target(), &output, program)? {
            Interpretation::Image(path) => Ok(path),
            Interpretation::Markup { latex, output } => self.renderer.render(&latex, &output).await,
        }
    }

    /// Delete the live result image, if any. Idempotent.
    pub fn remove_result_img_path(&mut self) {
        if let Some(image) = self.result_image.take() {
            image.remove();
        }
    }

    /// Release everything this session created.
    pub fn shutdown(&mut self) {
        self.remove_result_img_path();
    }
}

fn check_pair(from: Representation, to: Representation) -> ConvertResult<()> {
    if from.is_none() || to.is_none() {
        return Ok(());
    }
    if from == Representation::Matrix && to == Representation::Dirac {
        return Err(ConvertError::RuleViolation { from, to });
    }
    if !from.can_convert_to(to) {
        return Err(ConvertError::IllegalConversion { from, to });
    }
    Ok(())
}
