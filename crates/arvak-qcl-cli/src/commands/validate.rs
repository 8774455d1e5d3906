//! Validate command implementation.

use anyhow::Result;
use console::style;

use arvak_qcl::{SamplingSchedule, validate, validate_exact};

use super::common::{load_dataset, load_model};

/// Execute the validate command.
pub fn execute(data: &str, model: &str, measurements: usize, exact: bool) -> Result<()> {
    let samples = load_dataset(data)?;
    let model = load_model(model)?;
    let schedule = SamplingSchedule::whole(samples.len());

    let rate = if exact {
        validate_exact(&model, &samples, &schedule)?
    } else {
        validate(&model, &samples, 0.0, measurements, &schedule)?
    };

    let mode = if exact {
        "exact".to_string()
    } else {
        format!("{measurements} measurements/sample")
    };
    println!(
        "{} Miss rate {} over {} samples ({})",
        style("✓").green().bold(),
        style(format!("{rate:.4}")).yellow(),
        samples.len(),
        style(mode).dim()
    );

    Ok(())
}
