//! Input descriptors and validated conversion requests.

use std::fmt;

use rand::Rng;

use crate::error::{ConvertError, ConvertResult};
use crate::representation::Representation;

/// Length of generated value and file names.
pub const GENERATED_NAME_LEN: usize = 10;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random ASCII-letter string. Letters only so the result is always a valid
/// identifier as well as a file name.
pub fn random_letters(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

/// Whether `name` can be used as a Python variable name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Parameters each source representation needs beyond the expression text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDescriptor {
    /// The expression builds a circuit bound to `value_name`.
    Circuit { value_name: String },

    /// The expression is a matrix literal, assigned to a generated name.
    Matrix {
        value_name: String,
        num_qubits: u32,
        measure: bool,
    },

    /// The expression text is a self-contained bra-ket string.
    Dirac,
}

impl InputDescriptor {
    /// Circuit input bound to the given variable name.
    pub fn circuit(value_name: impl Into<String>) -> Self {
        InputDescriptor::Circuit {
            value_name: value_name.into(),
        }
    }

    /// Matrix input with a freshly generated value name.
    pub fn matrix(num_qubits: u32, measure: bool) -> Self {
        InputDescriptor::Matrix {
            value_name: random_letters(GENERATED_NAME_LEN),
            num_qubits,
            measure,
        }
    }

    /// Dirac notation input.
    pub fn dirac() -> Self {
        InputDescriptor::Dirac
    }

    /// Replace the value name. No-op for Dirac input.
    pub fn with_value_name(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            InputDescriptor::Circuit { value_name }
            | InputDescriptor::Matrix { value_name, .. } => {
                *value_name = name.into();
            }
            InputDescriptor::Dirac => {}
        }
        self
    }

    /// Representation this descriptor belongs to.
    pub fn representation(&self) -> Representation {
        match self {
            InputDescriptor::Circuit { .. } => Representation::Circuit,
            InputDescriptor::Matrix { .. } => Representation::Matrix,
            InputDescriptor::Dirac => Representation::Dirac,
        }
    }

    /// Variable name the expression value is bound to, if any.
    pub fn value_name(&self) -> Option<&str> {
        match self {
            InputDescriptor::Circuit { value_name }
            | InputDescriptor::Matrix { value_name, .. } => Some(value_name),
            InputDescriptor::Dirac => None,
        }
    }
}

impl fmt::Display for InputDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputDescriptor::Circuit { value_name } => write!(f, "value_name : {value_name}"),
            InputDescriptor::Matrix {
                value_name,
                num_qubits,
                measure,
            } => write!(
                f,
                "value_name : {value_name}, num_qubits : {num_qubits}, measure : {measure}"
            ),
            InputDescriptor::Dirac => f.write_str("dirac"),
        }
    }
}

/// A validated conversion request. Holding one guarantees the synthesizer
/// can handle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    source: Representation,
    target: Representation,
    input: InputDescriptor,
    expression: String,
    show_result: bool,
}

impl ConversionRequest {
    /// Validate and compose a request.
    pub fn new(
        source: Representation,
        target: Representation,
        input: InputDescriptor,
        expression: impl Into<String>,
        show_result: bool,
    ) -> ConvertResult<Self> {
        if source.is_none() {
            return Err(ConvertError::MissingInput(
                "source representation is not selected".into(),
            ));
        }
        if target.is_none() {
            return Err(ConvertError::MissingInput(
                "target representation is not selected".into(),
            ));
        }
        if source == Representation::Matrix && target == Representation::Dirac {
            return Err(ConvertError::RuleViolation {
                from: source,
                to: target,
            });
        }
        if !source.can_convert_to(target) {
            return Err(ConvertError::IllegalConversion {
                from: source,
                to: target,
            });
        }
        if input.representation() != source {
            return Err(ConvertError::InvalidInput(format!(
                "{} input given for {source} source",
                input.representation()
            )));
        }
        if let Some(name) = input.value_name() {
            if !is_identifier(name) {
                return Err(ConvertError::InvalidInput(format!(
                    "'{name}' is not a valid value name"
                )));
            }
        }
        if let InputDescriptor::Matrix { num_qubits: 0, .. } = input {
            return Err(ConvertError::InvalidInput(
                "number of qubits must be positive".into(),
            ));
        }

        let expression = expression.into();
        if expression.trim().is_empty() {
            return Err(ConvertError::MissingInput("expression text is empty".into()));
        }

        Ok(Self {
            source,
            target,
            input,
            expression,
            show_result,
        })
    }

    pub fn source(&self) -> Representation {
        self.source
    }

    pub fn target(&self) -> Representation {
        self.target
    }

    pub fn input(&self) -> &InputDescriptor {
        &self.input
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn show_result(&self) -> bool {
        self.show_result
    }

    /// Source and target are the same: re-render without converting.
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }
}
