//! Error handling for the conversion worker.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::representation::Representation;

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors that can occur while converting and drawing an expression.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Matrix cannot be converted to Dirac notation directly.
    #[error(
        "Expression converting rule error: Matrix cannot convert to dirac notation directly ({from} -> {to})"
    )]
    RuleViolation {
        from: Representation,
        to: Representation,
    },

    /// The pair is not an edge of the conversion table.
    #[error("Illegal conversion: {from} -> {to}")]
    IllegalConversion {
        from: Representation,
        to: Representation,
    },

    /// A required input (selection, descriptor, expression) is absent.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Input is present but unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The expression raised a `SyntaxError` in the sandbox.
    #[error("Syntax error in expression: {0}")]
    Syntax(String),

    /// The expression raised a `NameError` in the sandbox.
    #[error("Undefined name in expression: {0}")]
    Name(String),

    /// The child process could not be spawned or failed without output.
    #[error("Process error: {0}")]
    Process(String),

    /// The program run and rendering exceeded the configured limit.
    #[error("Conversion timed out after {0:?}")]
    Timeout(Duration),

    /// An expected output artifact was not produced.
    #[error("Artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// The typesetting renderer failed.
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// User-visible message class for a failed conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Rule,
    Unsupported,
    Syntax,
    Name,
    File,
    Input,
    Process,
    Timeout,
    Render,
    Config,
}

impl FailureKind {
    /// Human-readable message shown to the user for this class of failure.
    pub fn user_message(self) -> &'static str {
        match self {
            FailureKind::Rule => {
                "This conversion is not allowed. Matrix cannot be converted to Dirac notation directly."
            }
            FailureKind::Unsupported => {
                "This conversion is not supported. Pick a target offered for the source notation."
            }
            FailureKind::Syntax => "The expression contains a syntax error.",
            FailureKind::Name => {
                "The expression refers to an undefined name. Check the value name."
            }
            FailureKind::File => "A required file is missing or could not be accessed.",
            FailureKind::Input => "The input value is missing or invalid.",
            FailureKind::Process => "The conversion process failed.",
            FailureKind::Timeout => "The conversion took too long and was stopped.",
            FailureKind::Render => "The result could not be rendered.",
            FailureKind::Config => "The converter configuration is invalid.",
        }
    }
}

impl ConvertError {
    /// Classify this error into its user-visible message class.
    pub fn kind(&self) -> FailureKind {
        match self {
            ConvertError::RuleViolation { .. } => FailureKind::Rule,
            ConvertError::IllegalConversion { .. } => FailureKind::Unsupported,
            ConvertError::MissingInput(_) | ConvertError::InvalidInput(_) => FailureKind::Input,
            ConvertError::Syntax(_) => FailureKind::Syntax,
            ConvertError::Name(_) => FailureKind::Name,
            ConvertError::Process(_) => FailureKind::Process,
            ConvertError::Timeout(_) => FailureKind::Timeout,
            ConvertError::ArtifactNotFound(_) | ConvertError::Io(_) => FailureKind::File,
            ConvertError::Render(_) => FailureKind::Render,
            ConvertError::Config(_) => FailureKind::Config,
        }
    }
}
