//! Supported notations and the conversion edges between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// A notation an expression can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Representation {
    /// Quantum circuit built with the circuit library.
    Circuit,
    /// Unitary matrix literal.
    Matrix,
    /// Bra-ket notation string.
    Dirac,
    /// Nothing selected yet. Never a valid endpoint for execution.
    None,
}

/// Ordered conversion edges. The first target of each row is the default
/// selection offered for that source.
const CONVERSION_EDGES: &[(Representation, &[Representation])] = &[
    (
        Representation::Circuit,
        &[Representation::Dirac, Representation::Matrix],
    ),
    (Representation::Matrix, &[Representation::Circuit]),
    (Representation::Dirac, &[Representation::Matrix]),
    (Representation::None, &[Representation::None]),
];

impl Representation {
    /// All representations in declaration order.
    pub const ALL: [Representation; 4] = [
        Representation::Circuit,
        Representation::Matrix,
        Representation::Dirac,
        Representation::None,
    ];

    /// Tag used when naming a conversion, e.g. `QC_TO_MATRIX`.
    pub fn tag(self) -> &'static str {
        match self {
            Representation::Circuit => "QC",
            Representation::Matrix => "MATRIX",
            Representation::Dirac => "BRA_KET",
            Representation::None => "NONE",
        }
    }

    /// Upper-case display name.
    pub fn name(self) -> &'static str {
        match self {
            Representation::Circuit => "CIRCUIT",
            Representation::Matrix => "MATRIX",
            Representation::Dirac => "DIRAC",
            Representation::None => "NONE",
        }
    }

    /// Targets this representation may be converted to, in display order.
    pub fn legal_targets(self) -> &'static [Representation] {
        CONVERSION_EDGES
            .iter()
            .find(|(source, _)| *source == self)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    /// Whether `self -> target` can be executed. Identity conversions are
    /// re-renders and always allowed for concrete representations.
    pub fn can_convert_to(self, target: Representation) -> bool {
        if self.is_none() || target.is_none() {
            return false;
        }
        self == target || self.legal_targets().contains(&target)
    }

    /// Whether this is the `NONE` placeholder.
    pub fn is_none(self) -> bool {
        self == Representation::None
    }

    /// Name of the conversion-service operation for `self -> target`.
    pub fn conversion_type(self, target: Representation) -> String {
        format!("{}_TO_{}", self.tag(), target.tag())
    }
}

/// The full edge table, in order.
pub fn conversion_edges() -> &'static [(Representation, &'static [Representation])] {
    CONVERSION_EDGES
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Representation {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "circuit" | "qc" => Ok(Representation::Circuit),
            "matrix" => Ok(Representation::Matrix),
            "dirac" | "bra_ket" | "braket" => Ok(Representation::Dirac),
            "none" => Ok(Representation::None),
            other => Err(ConvertError::InvalidInput(format!(
                "unknown representation '{other}' (expected circuit, matrix, dirac)"
            ))),
        }
    }
}
