//! End-to-end conversion tests.
//!
//! These drive `ConverterModel::convert_and_draw` with fake program runners
//! and renderers, so they need neither a Python installation nor LaTeX.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use qclass_convert::{
    ConvertError, ConvertResult, ConverterConfig, ConverterModel, FailureKind, InputDescriptor,
    MathRenderer, ProcessOutput, ProgramRunner, Representation,
};

const QUANTUM_CIRCUIT_CODE: &str = "from qiskit import QuantumCircuit

quantum_circuit = QuantumCircuit(2, 2)
quantum_circuit.x(0)
quantum_circuit.cx(0, 1)";

const MATRIX_CODE: &str = "[[1, 0, 0, 0],
[0, 0, 0, 1],
[0, 0, 1, 0],
[0, 1, 0, 0]]";

/// What the fake runner saw for one run.
#[derive(Debug, Clone)]
struct SeenRun {
    program: PathBuf,
    source: String,
}

/// Records every program it is asked to run and replies with canned output.
/// When `draws_image` is set it first writes `<program>.png`, like a real
/// circuit-drawing program would.
#[derive(Clone)]
struct FakeRunner {
    output: ProcessOutput,
    draws_image: bool,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<SeenRun>>>,
}

impl FakeRunner {
    fn new(stdout: &str, stderr: &str) -> Self {
        Self {
            output: ProcessOutput::new(stdout, stderr),
            draws_image: false,
            delay: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn drawing() -> Self {
        Self {
            draws_image: true,
            ..Self::new("", "")
        }
    }

    fn sleeping(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new("x", "")
        }
    }

    fn runs(&self) -> Vec<SeenRun> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgramRunner for FakeRunner {
    async fn run(&self, program: &Path) -> ConvertResult<ProcessOutput> {
        let source = std::fs::read_to_string(program)?;
        self.seen.lock().unwrap().push(SeenRun {
            program: program.to_path_buf(),
            source,
        });

        if self.draws_image {
            let mut image = program.as_os_str().to_owned();
            image.push(".png");
            std::fs::write(PathBuf::from(image), b"\x89PNG")?;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.output.clone())
    }
}

/// Writes the markup it receives into the output file.
#[derive(Clone, Default)]
struct FakeRenderer {
    rendered: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl MathRenderer for FakeRenderer {
    async fn render(&self, latex: &str, output: &Path) -> ConvertResult<PathBuf> {
        self.rendered.lock().unwrap().push(latex.to_string());
        std::fs::write(output, latex)?;
        Ok(output.to_path_buf())
    }
}

/// Never finishes typesetting.
struct HangingRenderer;

#[async_trait]
impl MathRenderer for HangingRenderer {
    async fn render(&self, _latex: &str, output: &Path) -> ConvertResult<PathBuf> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(output.to_path_buf())
    }
}

fn config(dir: &Path) -> ConverterConfig {
    ConverterConfig::default().with_work_dir(dir)
}

fn circuit_to_matrix(model: &mut ConverterModel) {
    model
        .select(Representation::Circuit, Representation::Matrix)
        .unwrap();
    model.set_input_data(InputDescriptor::circuit("quantum_circuit"));
    model.set_expression_text(QUANTUM_CIRCUIT_CODE);
}

#[tokio::test]
async fn test_circuit_to_matrix_cleans_up_program() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new("\\stackrel{X}{A}\n\\stackrel{CX}{B}\n", "");
    let renderer = FakeRenderer::default();
    let mut model =
        ConverterModel::with_components(config(dir.path()), runner.clone(), renderer.clone());
    circuit_to_matrix(&mut model);

    let image = model.convert_and_draw().await.unwrap().to_path_buf();

    let runs = runner.runs();
    assert_eq!(runs.len(), 1);
    let program = &runs[0].program;
    assert!(!program.exists(), "program file must be removed");
    assert!(image.exists());
    assert_eq!(image, PathBuf::from(format!("{}.png", program.display())));
    assert_eq!(
        renderer.rendered.lock().unwrap().as_slice(),
        ["\\stackrel{X}{A} \\stackrel{CX}{B}"]
    );

    assert!(runs[0].source.contains(
        "converter = ConversionService(conversion_type='QC_TO_MATRIX', option={'print': 'raw'})\n\
         result = converter.convert(input_value=quantum_circuit)"
    ));
}

#[tokio::test]
async fn test_matrix_to_circuit_returns_drawn_image() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::drawing();
    let renderer = FakeRenderer::default();
    let mut model =
        ConverterModel::with_components(config(dir.path()), runner.clone(), renderer.clone());

    model.set_from_expression(Representation::Matrix).unwrap();
    model.set_to_expression(Representation::Circuit).unwrap();
    model.set_input_data(InputDescriptor::matrix(2, true).with_value_name("value_name"));
    model.set_expression_text(MATRIX_CODE);

    let image = model.convert_and_draw().await.unwrap().to_path_buf();
    let runs = runner.runs();
    let program = &runs[0].program;

    assert!(image.exists());
    assert!(!program.exists());
    assert!(renderer.rendered.lock().unwrap().is_empty());

    let source = &runs[0].source;
    assert!(source.starts_with("value_name = [[1, 0, 0, 0],"));
    assert!(source.contains(
        "converter = ConversionService(conversion_type='MATRIX_TO_QC', option={'label': 'unitary gate'})"
    ));
    assert!(source.contains("from qiskit import QuantumCircuit"));
    assert!(source.contains(
        "quantum_circuit.append(result, list(range(result.num_qubits)))\nquantum_circuit.measure_all()"
    ));
    assert!(source.ends_with(&format!(
        r#"quantum_circuit.draw(output="mpl").savefig("{}", bbox_inches="tight")"#,
        image.display()
    )));
}

#[tokio::test]
async fn test_syntax_error_still_removes_program() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new("", "SyntaxError: invalid syntax");
    let mut model = ConverterModel::with_components(
        config(dir.path()),
        runner.clone(),
        FakeRenderer::default(),
    );
    circuit_to_matrix(&mut model);

    let err = model.convert_and_draw().await.unwrap_err();
    assert!(matches!(err, ConvertError::Syntax(_)));
    assert_eq!(err.kind(), FailureKind::Syntax);

    let runs = runner.runs();
    assert!(!runs[0].program.exists());
    assert!(model.result_img_path().is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_name_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new("", "NameError: name 'quantum_circuit' is not defined");
    let mut model =
        ConverterModel::with_components(config(dir.path()), runner, FakeRenderer::default());
    circuit_to_matrix(&mut model);

    let err = model.convert_and_draw().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Name);
}

#[tokio::test]
async fn test_new_result_replaces_previous_image() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = ConverterModel::with_components(
        config(dir.path()),
        FakeRunner::new("|00>", ""),
        FakeRenderer::default(),
    );
    circuit_to_matrix(&mut model);

    let first = model.convert_and_draw().await.unwrap().to_path_buf();
    let second = model.convert_and_draw().await.unwrap().to_path_buf();

    assert_ne!(first, second);
    assert!(!first.exists());
    assert!(second.exists());
    assert_eq!(model.result_img_path(), Some(second.as_path()));

    model.remove_result_img_path();
    assert!(!second.exists());
    model.remove_result_img_path();
    assert!(model.result_img_path().is_none());
}

#[tokio::test]
async fn test_taken_image_outlives_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = ConverterModel::with_components(
        config(dir.path()),
        FakeRunner::new("|00>", ""),
        FakeRenderer::default(),
    );
    circuit_to_matrix(&mut model);
    model.convert_and_draw().await.unwrap();

    let image = model.take_result_image().unwrap().keep();
    model.shutdown();
    drop(model);
    assert!(image.exists());
}

#[tokio::test]
async fn test_shutdown_removes_image() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = ConverterModel::with_components(
        config(dir.path()),
        FakeRunner::new("|00>", ""),
        FakeRenderer::default(),
    );
    circuit_to_matrix(&mut model);
    let image = model.convert_and_draw().await.unwrap().to_path_buf();

    model.shutdown();
    assert!(!image.exists());
}

#[tokio::test(start_paused = true)]
async fn test_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::sleeping(Duration::from_secs(3600));
    let config = config(dir.path()).with_timeout(Some(Duration::from_secs(5)));
    let mut model =
        ConverterModel::with_components(config, runner.clone(), FakeRenderer::default());
    circuit_to_matrix(&mut model);

    let err = model.convert_and_draw().await.unwrap_err();
    assert!(matches!(err, ConvertError::Timeout(d) if d == Duration::from_secs(5)));
    assert!(!runner.runs()[0].program.exists());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_covers_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new("\\stackrel{X}{A}", "");
    let config = config(dir.path()).with_timeout(Some(Duration::from_secs(5)));
    let mut model = ConverterModel::with_components(config, runner.clone(), HangingRenderer);
    circuit_to_matrix(&mut model);

    let started = tokio::time::Instant::now();
    let err = model.convert_and_draw().await.unwrap_err();

    assert!(matches!(err, ConvertError::Timeout(d) if d == Duration::from_secs(5)));
    assert_eq!(err.kind(), FailureKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(60));
    assert!(model.result_img_path().is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_conversion_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner {
        delay: Some(Duration::from_secs(3600)),
        ..FakeRunner::drawing()
    };
    let config = config(dir.path()).with_timeout(None);
    let mut model =
        ConverterModel::with_components(config, runner.clone(), FakeRenderer::default());
    model
        .select(Representation::Matrix, Representation::Circuit)
        .unwrap();
    model.set_input_data(InputDescriptor::matrix(2, false).with_value_name("value_name"));
    model.set_expression_text(MATRIX_CODE);

    // Dropping the in-flight conversion, as an interrupt does.
    let cancelled = tokio::time::timeout(Duration::from_secs(1), model.convert_and_draw()).await;
    assert!(cancelled.is_err());

    let program = &runner.runs()[0].program;
    assert!(!program.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(model.result_img_path().is_none());
}

#[tokio::test]
async fn test_invalid_request_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new("x", "");
    let mut model = ConverterModel::with_components(
        config(dir.path()),
        runner.clone(),
        FakeRenderer::default(),
    );

    model
        .select(Representation::Circuit, Representation::Matrix)
        .unwrap();
    model.set_expression_text(QUANTUM_CIRCUIT_CODE);
    let err = model.convert_and_draw().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Input);

    model.set_input_data(InputDescriptor::dirac());
    let err = model.convert_and_draw().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Input);

    assert!(runner.runs().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_identity_rerender_has_no_conversion_call() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new("\\begin{bmatrix} 0 & 1 \\\\ 1 & 0 \\end{bmatrix}", "");
    let mut model = ConverterModel::with_components(
        config(dir.path()),
        runner.clone(),
        FakeRenderer::default(),
    );

    model
        .select(Representation::Matrix, Representation::Matrix)
        .unwrap();
    model.set_input_data(InputDescriptor::matrix(1, false).with_value_name("pauli_x"));
    model.set_expression_text("[[0, 1], [1, 0]]");

    model.convert_and_draw().await.unwrap();
    let source = &runner.runs()[0].source;
    assert!(!source.contains("ConversionService("));
    assert!(source.ends_with("print(array_to_latex(pauli_x, source=True))"));
}
