//! Program synthesis for conversion requests.
//!
//! A request is turned into a self-contained Python program made of four
//! sections, joined with `\n`:
//!
//! 1. the user's expression (matrix literals are bound to their value name)
//! 2. imports of the conversion service and `array_to_latex`
//! 3. the conversion call (omitted for identity requests)
//! 4. rendering statements for the target representation
//!
//! Synthesis is pure: the same request and program path always produce the
//! same text.

use std::path::Path;

use crate::input::{ConversionRequest, InputDescriptor};
use crate::representation::Representation;
use crate::sandbox::image_path;

/// Import line for the conversion service.
pub const CONVERTER_IMPORT: &str = "from qiskit_class_converter import ConversionService";

/// Import line for LaTeX rendering of arrays.
pub const ARRAY_TO_LATEX_IMPORT: &str = "from qiskit.visualization import array_to_latex";

/// Conversion option attached when the target is a circuit.
const CIRCUIT_TARGET_OPTION: &str = "{'label': 'unitary gate'}";

/// Conversion option attached for every other target.
const DEFAULT_OPTION: &str = "{'print': 'raw'}";

/// Generate the program for `request`, to be executed from `program_path`.
pub fn synthesize(request: &ConversionRequest, program_path: &Path) -> String {
    let sections = [
        expression_code(request),
        CONVERTER_IMPORT.to_string(),
        ARRAY_TO_LATEX_IMPORT.to_string(),
        conversion_code(request),
        visualization_code(request, program_path),
    ];

    sections
        .into_iter()
        .filter(|section| !section.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// The user's expression as it appears in the program.
pub fn expression_code(request: &ConversionRequest) -> String {
    match request.input() {
        InputDescriptor::Circuit { .. } => request.expression().to_string(),
        InputDescriptor::Matrix { value_name, .. } => {
            format!("{value_name} = {}", request.expression())
        }
        // Bra-ket text is not Python; it is passed to the converter as a literal.
        InputDescriptor::Dirac => String::new(),
    }
}

/// Conversion-service construction and invocation. Empty for identity requests.
pub fn conversion_code(request: &ConversionRequest) -> String {
    if request.is_identity() {
        return String::new();
    }

    let option = if request.target() == Representation::Circuit {
        CIRCUIT_TARGET_OPTION
    } else {
        DEFAULT_OPTION
    };

    let mut lines = vec![format!(
        "converter = ConversionService(conversion_type='{}', option={option})",
        request.source().conversion_type(request.target())
    )];

    match request.input() {
        InputDescriptor::Circuit { value_name } => {
            lines.push(format!(
                "result = converter.convert(input_value={value_name})"
            ));
        }
        InputDescriptor::Matrix {
            value_name,
            num_qubits,
            measure,
        } => {
            lines.push("from qiskit import QuantumCircuit".to_string());
            lines.push(format!(
                "result = converter.convert(input_value={value_name})"
            ));
            lines.push(format!("quantum_circuit = QuantumCircuit({num_qubits})"));
            lines.push(
                "quantum_circuit.append(result, list(range(result.num_qubits)))".to_string(),
            );
            if *measure {
                lines.push("quantum_circuit.measure_all()".to_string());
            }
        }
        InputDescriptor::Dirac => {
            lines.push(format!(
                "result = converter.convert(input_value={})",
                quote_python(request.expression().trim(), '\'')
            ));
        }
    }

    lines.join("\n")
}

/// Statements that render the result (or, for identity requests, the input).
pub fn visualization_code(request: &ConversionRequest, program_path: &Path) -> String {
    let image = quote_python(&image_path(program_path).to_string_lossy(), '"');

    if request.is_identity() {
        return match request.input() {
            InputDescriptor::Circuit { value_name } => {
                format!(r#"{value_name}.draw(output="mpl").savefig({image}, bbox_inches="tight")"#)
            }
            InputDescriptor::Matrix { value_name, .. } => {
                format!("print(array_to_latex({value_name}, source=True))")
            }
            InputDescriptor::Dirac => {
                format!("print({})", quote_python(request.expression().trim(), '\''))
            }
        };
    }

    match request.target() {
        Representation::Matrix => {
            let mut lines = vec![
                "for gate, name in zip(reversed(result['gate']), reversed(result['name'])):",
                "\totimes=' \\\\otimes '",
                concat!(
                    "\t",
                    r"print('\stackrel{' + otimes.join(name[1]) +'}' + f'{{{gate}}}')"
                ),
            ];
            if request.show_result() {
                lines.push(r#"print(f"= \stackrel{{result}}{{{result['result']}}}")"#);
            }
            lines.join("\n")
        }
        Representation::Circuit => {
            format!(r#"quantum_circuit.draw(output="mpl").savefig({image}, bbox_inches="tight")"#)
        }
        Representation::Dirac => "print(result)".to_string(),
        Representation::None => String::new(),
    }
}

/// Quote `text` as a single-line Python string literal.
pub fn quote_python(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
