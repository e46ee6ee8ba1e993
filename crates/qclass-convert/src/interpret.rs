//! Interpretation of captured program output.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{ConvertError, ConvertResult};
use crate::representation::Representation;
use crate::sandbox::{ProcessOutput, image_path};

/// Marker of a Python syntax error in stderr.
pub const SYNTAX_ERROR_MARKER: &str = "SyntaxError";

/// Marker of a Python name-resolution error in stderr.
pub const NAME_ERROR_MARKER: &str = "NameError";

/// What a finished run left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// The program saved the image itself.
    Image(PathBuf),

    /// The program printed markup that still has to be typeset into `output`.
    Markup { latex: String, output: PathBuf },
}

/// Decide what a run of `program` targeting `target` produced.
pub fn interpret(
    target: Representation,
    output: &ProcessOutput,
    program: &Path,
) -> ConvertResult<Interpretation> {
    let stderr = output.stderr.trim();

    if stderr.contains(SYNTAX_ERROR_MARKER) {
        return Err(ConvertError::Syntax(error_summary(stderr)));
    }
    if stderr.contains(NAME_ERROR_MARKER) {
        return Err(ConvertError::Name(error_summary(stderr)));
    }
    if !stderr.is_empty() {
        warn!("Program wrote to stderr: {}", stderr);
    }

    let image = image_path(program);

    if target == Representation::Circuit {
        if image.exists() {
            return Ok(Interpretation::Image(image));
        }
        return Err(missing_output(output, image));
    }

    let latex = flatten_markup(&output.stdout);
    if latex.is_empty() {
        return Err(missing_output(output, image));
    }

    Ok(Interpretation::Markup {
        latex,
        output: image,
    })
}

/// Collapse newlines (which break the typesetting engine) and trim.
pub fn flatten_markup(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace('\n', " ")
        .trim()
        .to_string()
}

/// Last non-empty line of a traceback, e.g. `SyntaxError: invalid syntax`.
pub fn error_summary(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn missing_output(output: &ProcessOutput, artifact: PathBuf) -> ConvertError {
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        return ConvertError::Process(error_summary(stderr));
    }
    match output.exit_code {
        Some(0) | None => ConvertError::ArtifactNotFound(artifact),
        Some(code) => ConvertError::Process(format!("program exited with status {code}")),
    }
}
