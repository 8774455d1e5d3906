//! Inspect command implementation.

use anyhow::Result;
use console::style;

use super::common::load_circuit;

/// Execute the inspect command.
pub fn execute(circuit: &str) -> Result<()> {
    let spec = load_circuit(circuit)?;
    let n = spec.num_units();
    // Feature lengths that encode onto exactly n units.
    let min_features = if n == 1 { 1 } else { (1usize << (n - 1)) + 1 };
    let max_features = 1usize << n;

    println!("{} {}", style("Circuit").cyan().bold(), style(circuit).green());
    print!("{spec}");
    println!(
        "  Accepts {}..={} features per sample",
        min_features, max_features
    );

    Ok(())
}
