//! Synth command implementation.
//!
//! Prints the program a conversion would run, without running it.

use std::path::PathBuf;

use anyhow::Result;
use console::style;
use qclass_convert::ConverterModel;

use super::common::{RequestArgs, load_config};

/// Execute the synth command.
pub fn execute(
    config_path: Option<&str>,
    request: &RequestArgs,
    program: Option<&str>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let program_path = match program {
        Some(path) => PathBuf::from(path),
        None => config.work_dir.join("program.py"),
    };

    let mut model = ConverterModel::new(config);
    request.apply(&mut model)?;
    let source = model.synthesize_program(&program_path)?;

    eprintln!(
        "{} {} -> {} ({})",
        style("→").cyan().bold(),
        style(request.from).green(),
        style(request.to).green(),
        style(program_path.display()).dim()
    );
    println!("{source}");

    Ok(())
}
