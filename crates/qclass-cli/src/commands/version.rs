//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - circuit, matrix and Dirac notation converter",
        style("qclass").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qclass-convert  Program synthesis, sandboxed execution and rendering");
    println!("  qclass-cli      Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style("https://github.com/qiskit-classroom/qclass").underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
