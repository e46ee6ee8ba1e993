//! Shared helpers for CLI commands.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use qclass_convert::{ConverterConfig, ConverterModel, InputDescriptor, Representation};

/// Selection and input flags shared by `convert` and `synth`.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Source representation (circuit, matrix, dirac)
    #[arg(short, long)]
    pub from: Representation,

    /// Target representation (circuit, matrix, dirac)
    #[arg(short, long)]
    pub to: Representation,

    /// File holding the expression ("-" for stdin)
    #[arg(short, long, conflicts_with = "expression")]
    pub input: Option<String>,

    /// Expression text given inline
    #[arg(short, long)]
    pub expression: Option<String>,

    /// Variable the circuit expression is bound to (matrix input generates one if omitted)
    #[arg(long)]
    pub value_name: Option<String>,

    /// Number of qubits for matrix input
    #[arg(long, default_value = "1")]
    pub qubits: u32,

    /// Append measurements to a circuit built from a matrix
    #[arg(long)]
    pub measure: bool,

    /// Append the aggregate result to matrix output
    #[arg(long)]
    pub show_result: bool,
}

impl RequestArgs {
    /// Input descriptor for the selected source representation.
    pub fn input_descriptor(&self) -> InputDescriptor {
        match self.from {
            Representation::Matrix => {
                let input = InputDescriptor::matrix(self.qubits, self.measure);
                match &self.value_name {
                    Some(name) => input.with_value_name(name),
                    None => input,
                }
            }
            Representation::Dirac => InputDescriptor::dirac(),
            _ => InputDescriptor::circuit(
                self.value_name
                    .clone()
                    .unwrap_or_else(|| "quantum_circuit".to_string()),
            ),
        }
    }

    /// Fill a model's setters from these flags.
    pub fn apply(&self, model: &mut ConverterModel) -> Result<()> {
        let expression = read_expression(self.input.as_deref(), self.expression.as_deref())?;

        model.select(self.from, self.to)?;
        model.set_input_data(self.input_descriptor());
        model.set_expression_text(expression);
        if self.show_result {
            model.set_show_result(true);
        }
        Ok(())
    }
}

/// Read expression text from inline text, a file, or stdin (`-`).
pub fn read_expression(input: Option<&str>, expression: Option<&str>) -> Result<String> {
    if let Some(text) = expression {
        return Ok(text.to_string());
    }

    match input {
        Some("-") => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read expression from stdin")?;
            Ok(text)
        }
        Some(path) => {
            if !Path::new(path).exists() {
                anyhow::bail!("File not found: {path}");
            }
            fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
        }
        None => {
            anyhow::bail!("No expression given. Use --input FILE, --input - or --expression TEXT")
        }
    }
}

/// Default config location (~/.qclass/config.yaml).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".qclass").join("config.yaml"))
}

/// Load configuration from `path`, or from the default location if it exists.
pub fn load_config(path: Option<&str>) -> Result<ConverterConfig> {
    let file = match path {
        Some(path) => Some(PathBuf::from(path)),
        None => default_config_path().filter(|p| p.exists()),
    };

    Ok(ConverterConfig::load(file.as_deref())?)
}
