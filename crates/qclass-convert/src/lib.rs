//! Expression conversion and rendering worker.
//!
//! This crate converts between three notations of a quantum operation (a
//! circuit, a matrix, and a Dirac bra-ket string) and renders the result as
//! a PNG image.
//!
//! # Overview
//!
//! A conversion runs as a small pipeline:
//! 1. **Validation**: the from/to pair must be an edge of the conversion table
//! 2. **Synthesis**: a self-contained Python program is generated from the
//!    user's expression and the requested conversion
//! 3. **Execution**: the program runs in a child interpreter with a cleared
//!    environment, and its output is captured
//! 4. **Rendering**: circuit diagrams are saved by the program itself; matrix
//!    and Dirac output is typeset from the captured markup
//!
//! # Conversion Table
//!
//! | From | To |
//! |------|----|
//! | CIRCUIT | DIRAC, MATRIX |
//! | MATRIX | CIRCUIT |
//! | DIRAC | MATRIX |
//!
//! Matrix cannot be converted to Dirac notation directly. Converting a
//! representation to itself re-renders the input.
//!
//! # Example
//!
//! ```ignore
//! use qclass_convert::{ConverterConfig, ConverterModel, InputDescriptor, Representation};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut model = ConverterModel::new(ConverterConfig::from_env());
//!     model.set_from_expression(Representation::Circuit)?;
//!     model.set_to_expression(Representation::Matrix)?;
//!     model.set_input_data(InputDescriptor::circuit("quantum_circuit"));
//!     model.set_expression_text(
//!         "from qiskit import QuantumCircuit\n\
//!          quantum_circuit = QuantumCircuit(2)\n\
//!          quantum_circuit.x(0)\n\
//!          quantum_circuit.cx(0, 1)",
//!     );
//!
//!     let image = model.convert_and_draw().await?;
//!     println!("Rendered: {}", image.display());
//!
//!     model.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Trust Boundary
//!
//! Expression text is executed verbatim. The sandbox clears the child's
//! environment, runs it from the work directory with no stdin, and kills it
//! when the configured timeout elapses or when it prints more than
//! `max_output_bytes` on either stream. It does not restrict filesystem or
//! network access.

pub mod config;
pub mod error;
pub mod input;
pub mod interpret;
pub mod model;
pub mod render;
pub mod representation;
pub mod sandbox;
pub mod synth;

// Re-exports
pub use config::ConverterConfig;
pub use error::{ConvertError, ConvertResult, FailureKind};
pub use input::{ConversionRequest, InputDescriptor};
pub use interpret::{Interpretation, interpret};
pub use model::{ConverterModel, ResultImage};
pub use render::{MathRenderer, MatplotlibRenderer};
pub use representation::{Representation, conversion_edges};
pub use sandbox::{ProcessOutput, ProgramFile, ProgramRunner, PythonSandbox};
pub use synth::synthesize;
