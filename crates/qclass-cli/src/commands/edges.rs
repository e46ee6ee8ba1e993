//! Edges command implementation.

use anyhow::Result;
use console::style;
use qclass_convert::{Representation, conversion_edges};
use serde::Serialize;

/// One row of the conversion table.
#[derive(Debug, Serialize)]
struct Edge {
    from: Representation,
    to: Vec<Representation>,
}

fn edges() -> Vec<Edge> {
    conversion_edges()
        .iter()
        .filter(|(from, _)| !from.is_none())
        .map(|(from, targets)| Edge {
            from: *from,
            to: targets.to_vec(),
        })
        .collect()
}

/// Execute the edges command.
pub fn execute(json: bool) -> Result<()> {
    let edges = edges();

    if json {
        println!("{}", serde_json::to_string_pretty(&edges)?);
        return Ok(());
    }

    println!("{}", style("Conversions:").bold());
    println!();
    for edge in &edges {
        let targets: Vec<String> = edge.to.iter().map(|t| t.to_string()).collect();
        println!(
            "  {:<10} {} {}",
            style(edge.from).cyan(),
            style("→").dim(),
            targets.join(", ")
        );
    }
    println!();
    println!(
        "{} Matrix cannot be converted to Dirac notation directly.",
        style("Note:").yellow()
    );

    Ok(())
}
